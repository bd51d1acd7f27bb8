//! Blob storage for uploaded banking files.
//!
//! Keys look like `projects/{project_id}/{uuid}-{file name}`. The backend
//! is picked from configuration: Azure when a container URL is set,
//! otherwise a directory on local disk.

mod azure;
mod local;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use stoactl_core::config::StorageSection;
use thiserror::Error;
use uuid::Uuid;

pub use azure::AzureBlobStore;
pub use local::LocalFileStore;

const MAX_FILE_NAME: usize = 200;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid storage key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("blob request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("blob service returned {status} for '{key}'")]
    Status { key: String, status: u16 },
}

#[async_trait]
pub trait FileStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Bytes, content_type: Option<&str>) -> Result<(), StorageError>;

    async fn get(&self, key: &str) -> Result<Bytes, StorageError>;

    /// Deleting a missing object is not an error.
    async fn delete(&self, key: &str) -> Result<(), StorageError>;

    /// Human-readable backend description for startup logs.
    fn describe(&self) -> String;
}

/// Build the configured store.
pub fn from_config(section: &StorageSection) -> Arc<dyn FileStore> {
    match section.azure_container_url.as_deref().filter(|u| !u.trim().is_empty()) {
        Some(url) => Arc::new(AzureBlobStore::new(
            url,
            section.azure_sas_token.as_deref().unwrap_or_default(),
        )),
        None => Arc::new(LocalFileStore::new(section.root.clone())),
    }
}

/// Keep `[A-Za-z0-9._-]`, replace everything else with `_`.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .take(MAX_FILE_NAME)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "file".to_owned()
    } else {
        cleaned.to_owned()
    }
}

/// Fresh storage key for a project upload.
pub fn object_key(project_id: i32, file_name: &str) -> String {
    format!(
        "projects/{project_id}/{}-{}",
        Uuid::new_v4(),
        sanitize_file_name(file_name)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn sanitize_replaces_unsafe_characters() {
        assert_eq!(sanitize_file_name("Term Sheet (v2).pdf"), "Term_Sheet__v2_.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "_.._etc_passwd");
        assert_eq!(sanitize_file_name("   "), "file");
        assert_eq!(sanitize_file_name("..."), "file");
    }

    #[test]
    fn object_key_layout() {
        let key = object_key(42, "loan docs.zip");
        assert!(key.starts_with("projects/42/"));
        assert!(key.ends_with("-loan_docs.zip"));
        assert_eq!(key.split('/').count(), 3);
    }

    #[test]
    fn config_selects_backend() {
        let mut section = StorageSection {
            root: PathBuf::from("/tmp/stoactl-files"),
            azure_container_url: None,
            azure_sas_token: None,
        };
        assert!(from_config(&section).describe().starts_with("local"));

        section.azure_container_url = Some("https://acct.blob.core.windows.net/files".into());
        section.azure_sas_token = Some("sv=2024&sig=abc".into());
        assert!(from_config(&section).describe().starts_with("azure"));
    }
}
