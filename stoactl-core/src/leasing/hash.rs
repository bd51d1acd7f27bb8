//! Content fingerprints for sync dedup and HTTP caching.

use serde_json::Value;
use sha2::{Digest, Sha256};

use super::row::RawRow;

/// Rows that participate in the dataset fingerprint.
pub const HASH_SAMPLE_ROWS: usize = 50;

/// Cheap fingerprint of a dataset: row count plus the first 50 rows.
///
/// The push client sends this on the last chunk and the server recomputes
/// it for single-request syncs, so both sides must agree byte for byte.
pub fn data_hash(rows: &[RawRow]) -> String {
    let sample: Vec<Value> = rows
        .iter()
        .take(HASH_SAMPLE_ROWS)
        .map(|r| Value::String(Value::Object(r.clone()).to_string()))
        .collect();

    let mut payload = rows.len().to_string();
    payload.push_str(&Value::Array(sample).to_string());
    short_sha256(payload.as_bytes())
}

/// Strong ETag (quoted) for a response body.
pub fn etag_for(body: &[u8]) -> String {
    format!("\"{}\"", short_sha256(body))
}

/// Whether an `If-None-Match` header value matches `etag`.
///
/// Handles lists, weak validators and `*`.
pub fn etag_matches(if_none_match: &str, etag: &str) -> bool {
    if_none_match.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.trim_start_matches("W/") == etag
    })
}

fn short_sha256(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = hex::encode(digest);
    hex.truncate(32);
    hex
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(n: usize) -> Vec<RawRow> {
        (0..n)
            .map(|i| json!({"Property": "Heights", "Unit": i}).as_object().cloned().unwrap())
            .collect()
    }

    #[test]
    fn hash_is_32_hex_chars() {
        let h = data_hash(&rows(3));
        assert_eq!(h.len(), 32);
        assert!(h.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn hash_changes_with_length() {
        assert_ne!(data_hash(&rows(60)), data_hash(&rows(61)));
    }

    #[test]
    fn hash_ignores_rows_past_sample() {
        let a = rows(80);
        let mut b = rows(80);
        b[70].insert("Unit".into(), json!("changed"));
        assert_eq!(data_hash(&a), data_hash(&b));

        let mut c = rows(80);
        c[10].insert("Unit".into(), json!("changed"));
        assert_ne!(data_hash(&a), data_hash(&c));
    }

    #[test]
    fn etag_matching() {
        let tag = etag_for(b"{}");
        assert!(etag_matches(&tag, &tag));
        assert!(etag_matches(&format!("W/{tag}"), &tag));
        assert!(etag_matches(&format!("\"other\", {tag}"), &tag));
        assert!(etag_matches("*", &tag));
        assert!(!etag_matches("\"other\"", &tag));
    }
}
