use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, StatusCode};

use super::{FileStore, StorageError};

/// Azure Blob Storage container addressed with a SAS token
#[derive(Debug, Clone)]
pub struct AzureBlobStore {
    http: Client,
    container_url: String,
    sas_token: String,
}

impl AzureBlobStore {
    pub fn new(container_url: &str, sas_token: &str) -> Self {
        Self {
            http: Client::new(),
            container_url: container_url.trim_end_matches('/').to_owned(),
            sas_token: sas_token.trim_start_matches('?').to_owned(),
        }
    }

    fn blob_url(&self, key: &str) -> String {
        if self.sas_token.is_empty() {
            format!("{}/{}", self.container_url, key)
        } else {
            format!("{}/{}?{}", self.container_url, key, self.sas_token)
        }
    }

    fn check(key: &str, status: StatusCode) -> Result<(), StorageError> {
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(key.to_owned()));
        }
        if !status.is_success() {
            return Err(StorageError::Status {
                key: key.to_owned(),
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl FileStore for AzureBlobStore {
    async fn put(&self, key: &str, bytes: Bytes, content_type: Option<&str>) -> Result<(), StorageError> {
        let response = self
            .http
            .put(self.blob_url(key))
            .header("x-ms-blob-type", "BlockBlob")
            .header(
                reqwest::header::CONTENT_TYPE,
                content_type.unwrap_or("application/octet-stream"),
            )
            .body(bytes)
            .send()
            .await?;
        Self::check(key, response.status())
    }

    async fn get(&self, key: &str) -> Result<Bytes, StorageError> {
        let response = self.http.get(self.blob_url(key)).send().await?;
        Self::check(key, response.status())?;
        Ok(response.bytes().await?)
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let response = self.http.delete(self.blob_url(key)).send().await?;
        match Self::check(key, response.status()) {
            Err(StorageError::NotFound(_)) => Ok(()),
            other => other,
        }
    }

    fn describe(&self) -> String {
        format!("azure:{}", self.container_url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_url_appends_sas() {
        let store = AzureBlobStore::new("https://acct.blob.core.windows.net/files/", "?sv=1&sig=x");
        assert_eq!(
            store.blob_url("projects/1/a.pdf"),
            "https://acct.blob.core.windows.net/files/projects/1/a.pdf?sv=1&sig=x"
        );
        let open = AzureBlobStore::new("http://localhost:10000/c", "");
        assert_eq!(open.blob_url("k"), "http://localhost:10000/c/k");
    }
}
