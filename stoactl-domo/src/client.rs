//! Domo REST client: OAuth client-credentials, dataset metadata and CSV export.

use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use serde::Deserialize;
use stoactl_core::config::DomoSection;
use stoactl_core::leasing::RawRow;
use tokio::sync::Mutex;

use crate::csv_rows::parse_csv;
use crate::error::{DomoError, Result};

pub const DEFAULT_API_BASE: &str = "https://api.domo.com";

/// Refresh this long before the token actually expires.
const TOKEN_SKEW: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_TTL: u64 = 3600;

/// Token and metadata calls are small.
pub const TOKEN_TIMEOUT: Duration = Duration::from_secs(30);
/// Exports of the large datasets can take minutes.
pub const EXPORT_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DatasetMeta {
    #[serde(default)]
    rows: Option<u64>,
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Domo API client
pub struct DomoClient {
    client: Client,
    base_url: String,
    client_id: String,
    client_secret: String,
    token: Mutex<Option<CachedToken>>,
}

impl DomoClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token: Mutex::new(None),
        }
    }

    /// Build from the `[domo]` config section; fails when credentials are blank.
    pub fn from_config(section: &DomoSection) -> Result<Self> {
        let (id, secret) = section.credentials().ok_or(DomoError::MissingCredentials)?;
        Ok(Self::new(&section.api_base, id, secret))
    }

    /// Bearer token, fetched once and reused until shortly before expiry.
    pub async fn access_token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let url = format!("{}/oauth/token", self.base_url);
        tracing::debug!(url = %url, "requesting Domo access token");
        let response = self
            .client
            .post(&url)
            .query(&[("grant_type", "client_credentials"), ("scope", "data")])
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await?;
        let response = check_status(&url, response).await?;
        let body: TokenResponse = response.json().await?;

        let ttl = Duration::from_secs(body.expires_in.unwrap_or(DEFAULT_TOKEN_TTL));
        let expires_at = Instant::now() + ttl.saturating_sub(TOKEN_SKEW);
        *cached = Some(CachedToken {
            value: body.access_token.clone(),
            expires_at,
        });
        Ok(body.access_token)
    }

    /// Row count Domo reports for a dataset, if it reports one.
    pub async fn dataset_row_count(&self, dataset_id: &str) -> Result<Option<u64>> {
        let token = self.access_token().await?;
        let url = format!("{}/v1/datasets/{}", self.base_url, dataset_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&token)
            .timeout(TOKEN_TIMEOUT)
            .send()
            .await?;
        let response = check_status(&url, response).await?;
        let meta: DatasetMeta = response.json().await?;
        Ok(meta.rows)
    }

    /// Export a dataset as CSV and parse it into rows.
    pub async fn export_dataset(&self, dataset_id: &str) -> Result<Vec<RawRow>> {
        let token = self.access_token().await?;
        let url = format!("{}/v1/datasets/{}/data", self.base_url, dataset_id);
        let started = Instant::now();
        let response = self
            .client
            .get(&url)
            .query(&[("includeHeader", "true"), ("format", "csv")])
            .bearer_auth(&token)
            .header("Accept", "text/csv")
            .timeout(EXPORT_TIMEOUT)
            .send()
            .await?;
        let response = check_status(&url, response).await?;
        let text = response.text().await?;
        let rows = parse_csv(&text)?;
        tracing::info!(
            dataset_id,
            rows = rows.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "exported Domo dataset"
        );
        Ok(rows)
    }
}

pub(crate) async fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(DomoError::status(url, status.as_u16(), body))
}
