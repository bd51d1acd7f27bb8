use thiserror::Error;

/// Failures talking to Domo or the leasing sync endpoint
#[derive(Debug, Error)]
pub enum DomoError {
    #[error("Domo credentials are not configured (set DOMO_CLIENT_ID and DOMO_CLIENT_SECRET)")]
    MissingCredentials,

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{url} returned {status}: {body}")]
    Status { url: String, status: u16, body: String },

    #[error("CSV parse error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON parse error in {context}: {source}")]
    Json {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unexpected payload: {0}")]
    Payload(String),
}

impl DomoError {
    pub fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    /// Build a status error, truncating long bodies.
    pub fn status(url: impl Into<String>, status: u16, body: String) -> Self {
        let body = if body.len() > 500 {
            let mut cut = 500;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            format!("{}...", &body[..cut])
        } else {
            body
        };
        Self::Status {
            url: url.into(),
            status,
            body,
        }
    }
}

pub type Result<T> = std::result::Result<T, DomoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_body_is_truncated() {
        let err = DomoError::status("http://x", 500, "é".repeat(400));
        match err {
            DomoError::Status { body, .. } => {
                assert!(body.ends_with("..."));
                assert!(body.len() <= 503);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_credentials_message_names_variables() {
        let msg = DomoError::MissingCredentials.to_string();
        assert!(msg.contains("DOMO_CLIENT_ID"));
    }
}
