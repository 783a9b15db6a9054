use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use uuid::Uuid;

use crate::error::HttpError;

/// Literal path segment shared by public object URLs. Both URL construction
/// and parsing depend on this exact prefix; a URL that diverges from it is
/// rejected as invalid.
pub const PUBLIC_OBJECT_PREFIX: &str = "/storage/v1/object/public/";

/// Client for the external object store (Supabase-compatible storage REST
/// API).
///
/// Uploads return public URLs; deletes parse the bucket and path back out of
/// such a URL. The client knows nothing about which database row an
/// attachment belongs to - callers persist the returned URL themselves.
///
/// Cloning is cheap because reqwest::Client uses Arc internally.
#[derive(Debug, Clone)]
pub struct StorageClient {
    conn: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl StorageClient {
    pub fn new(conn: reqwest::Client, base_url: String, service_key: String) -> Self {
        Self {
            conn,
            base_url,
            service_key,
        }
    }

    /// Storage path for a new object: `{folder}/{uuid}.{ext}`.
    ///
    /// The extension is whatever follows the last dot of the original
    /// filename (the whole name when there is no dot); the uuid makes
    /// every stored object unique regardless of what clients upload.
    pub fn object_path(folder: Option<&str>, filename: &str) -> String {
        let extension = filename.rsplit('.').next().unwrap_or(filename);
        match folder {
            Some(folder) => format!("{}/{}.{}", folder, Uuid::new_v4(), extension),
            None => format!("{}.{}", Uuid::new_v4(), extension),
        }
    }

    /// Public download URL for a stored object.
    pub fn public_url(&self, bucket: &str, path: &str) -> String {
        format!("{}{}{}/{}", self.base_url, PUBLIC_OBJECT_PREFIX, bucket, path)
    }

    /// Split a public URL back into (bucket, path).
    ///
    /// The URL must start with this store's base followed by the exact
    /// public-object prefix; anything else is not ours to delete.
    pub fn parse_public_url<'a>(&self, url: &'a str) -> Result<(&'a str, &'a str), HttpError> {
        let prefix = format!("{}{}", self.base_url, PUBLIC_OBJECT_PREFIX);

        let bucket_and_path = url
            .strip_prefix(prefix.as_str())
            .ok_or_else(|| HttpError::bad_request("Invalid attachment URL"))?;

        bucket_and_path
            .split_once('/')
            .filter(|(bucket, path)| !bucket.is_empty() && !path.is_empty())
            .ok_or_else(|| HttpError::bad_request("Invalid attachment URL"))
    }

    /// Upload a file and return its public URL.
    pub async fn upload(
        &self,
        bytes: Vec<u8>,
        filename: &str,
        bucket: &str,
        folder: Option<&str>,
    ) -> Result<String, HttpError> {
        let path = Self::object_path(folder, filename);
        let endpoint = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);

        let response = self
            .conn
            .post(endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.service_key))
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Storage upload request failed: {}", e);
                HttpError::server_error("Attachment upload failed")
            })?;

        if !response.status().is_success() {
            tracing::error!("Storage upload rejected with status {}", response.status());
            return Err(HttpError::server_error("Attachment upload failed"));
        }

        Ok(self.public_url(bucket, &path))
    }

    /// Delete a previously uploaded file by its public URL.
    pub async fn delete(&self, url: &str) -> Result<(), HttpError> {
        let (bucket, path) = self.parse_public_url(url)?;
        let endpoint = format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path);

        let response = self
            .conn
            .delete(endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", self.service_key))
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Storage delete request failed: {}", e);
                HttpError::server_error("Error deleting attachment")
            })?;

        if !response.status().is_success() {
            tracing::error!("Storage delete rejected with status {}", response.status());
            return Err(HttpError::server_error("Error deleting attachment"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> StorageClient {
        StorageClient::new(
            reqwest::Client::new(),
            "https://project.supabase.example".to_string(),
            "service-key".to_string(),
        )
    }

    #[test]
    fn object_path_keeps_extension_and_folder() {
        let path = StorageClient::object_path(Some("submissions"), "report.pdf");
        assert!(path.starts_with("submissions/"));
        assert!(path.ends_with(".pdf"));

        let path = StorageClient::object_path(None, "notes.txt");
        assert!(!path.contains('/'));
        assert!(path.ends_with(".txt"));
    }

    #[test]
    fn public_url_then_parse_roundtrip() {
        let client = client();
        let url = client.public_url("assignment-submissions", "submissions/abc.pdf");
        assert_eq!(
            url,
            "https://project.supabase.example/storage/v1/object/public/assignment-submissions/submissions/abc.pdf"
        );

        let (bucket, path) = client.parse_public_url(&url).unwrap();
        assert_eq!(bucket, "assignment-submissions");
        assert_eq!(path, "submissions/abc.pdf");
    }

    #[test]
    fn foreign_urls_are_rejected() {
        let client = client();
        assert!(client
            .parse_public_url("https://elsewhere.example/storage/v1/object/public/bucket/f.pdf")
            .is_err());
        assert!(client
            .parse_public_url("https://project.supabase.example/storage/v1/object/bucket/f.pdf")
            .is_err());
    }

    #[test]
    fn url_without_object_path_is_rejected() {
        let client = client();
        assert!(client
            .parse_public_url("https://project.supabase.example/storage/v1/object/public/bucketonly")
            .is_err());
    }
}
