//! HTTP client for the folio backend: blob uploads, posts and settings.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, UploadError};
use crate::post::{Post, PostCollection, Settings};

/// Opaque bearer credential issued by the identity provider.
///
/// Attached verbatim to write requests; never inspected.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn header_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Endpoint configuration, usually read from the `[api]` table of the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base of the JSON API, e.g. `http://localhost:3001/api`.
    pub base_url: String,
    /// Prefix for relative asset URLs returned by uploads.
    pub asset_base_url: String,
    pub token: Option<String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3001/api".into(),
            asset_base_url: "http://localhost:3001/".into(),
            token: None,
        }
    }
}

/// A file picked for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub name: String,
    /// Declared media type, e.g. `image/png` or `audio/mpeg`.
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its media type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| UploadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_owned());
        let content_type = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_owned();
        Ok(Self {
            name,
            content_type,
            bytes,
        })
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    url: Option<String>,
    error: Option<String>,
}

/// Interpret an upload endpoint response.
///
/// Success needs a 2xx status and a `url` in the body. Anything else is an
/// error carrying the server's `error` message when it sent one.
pub fn parse_upload_response(status: u16, body: &[u8]) -> Result<String, UploadError> {
    let parsed: Option<UploadResponse> = serde_json::from_slice(body).ok();
    let success = (200..300).contains(&status);

    if !success {
        let message = parsed
            .and_then(|r| r.error)
            .unwrap_or_else(|| "Upload failed".to_owned());
        return Err(UploadError::Rejected { status, message });
    }

    match parsed.and_then(|r| r.url) {
        Some(url) if !url.is_empty() => Ok(url),
        _ => Err(UploadError::MissingUrl),
    }
}

/// Join a base URL and a path segment with exactly one slash between them.
pub fn join_url(base: &str, path: &str) -> String {
    if base.is_empty() {
        return path.to_owned();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Client for the folio backend.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    config: ApiConfig,
    token: Option<BearerToken>,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let token = config.token.clone().filter(|t| !t.is_empty()).map(BearerToken::new);
        Self {
            client: reqwest::Client::new(),
            config,
            token,
        }
    }

    pub fn with_token(mut self, token: BearerToken) -> Self {
        self.token = Some(token);
        self
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }

    /// Whether write operations can be attempted at all.
    pub fn is_authorized(&self) -> bool {
        self.token.is_some()
    }

    fn endpoint(&self, path: &str) -> String {
        join_url(&self.config.base_url, path)
    }

    /// Upload a file to the blob store, returning the URL it answered with.
    pub async fn upload(&self, file: &UploadFile) -> Result<String, UploadError> {
        let token = self.token.as_ref().ok_or(UploadError::Unauthorized)?;
        tracing::debug!(target: "folio::client", name = %file.name, size = file.bytes.len(), "uploading");
        let part = reqwest::multipart::Part::bytes(file.bytes.clone())
            .file_name(file.name.clone())
            .mime_str(&file.content_type)?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("upload"))
            .header(http::header::AUTHORIZATION, token.header_value())
            .multipart(form)
            .send()
            .await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?;

        let result = parse_upload_response(status, &body);
        match &result {
            Ok(url) => tracing::debug!(target: "folio::client", status, %url, "upload accepted"),
            Err(e) => tracing::warn!(target: "folio::client", status, error = %e, "upload rejected"),
        }
        result
    }

    /// Fetch all posts. An empty store answers `[]`.
    pub async fn fetch_posts(&self) -> Result<PostCollection, ClientError> {
        let response = self.client.get(self.endpoint("posts")).send().await?;
        let body = Self::check(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Replace the stored post list.
    pub async fn save_posts(&self, posts: &[Post]) -> Result<(), ClientError> {
        let token = self.token.as_ref().ok_or(ClientError::Unauthorized)?;
        let response = self
            .client
            .post(self.endpoint("posts"))
            .header(http::header::AUTHORIZATION, token.header_value())
            .json(posts)
            .send()
            .await?;
        Self::check(response).await?;
        tracing::info!(target: "folio::client", count = posts.len(), "posts saved");
        Ok(())
    }

    pub async fn fetch_settings(&self) -> Result<Settings, ClientError> {
        let response = self.client.get(self.endpoint("settings")).send().await?;
        let body = Self::check(response).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    pub async fn save_settings(&self, settings: &Settings) -> Result<(), ClientError> {
        let token = self.token.as_ref().ok_or(ClientError::Unauthorized)?;
        let response = self
            .client
            .post(self.endpoint("settings"))
            .header(http::header::AUTHORIZATION, token.header_value())
            .json(settings)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response) -> Result<Vec<u8>, ClientError> {
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        if status.is_success() {
            return Ok(body);
        }
        #[derive(Deserialize)]
        struct ErrorBody {
            error: String,
        }
        let message = serde_json::from_slice::<ErrorBody>(&body)
            .map(|b| b.error)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("error").to_owned());
        Err(ClientError::Status {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_success() {
        let url = parse_upload_response(200, br#"{"url":"uploads/cat.png"}"#).unwrap();
        assert_eq!(url, "uploads/cat.png");
    }

    #[test]
    fn test_upload_server_error_message() {
        let err = parse_upload_response(500, br#"{"error":"disk full"}"#).unwrap_err();
        assert!(matches!(err, UploadError::Rejected { status: 500, .. }));
        assert!(err.to_string().contains("disk full"));
    }

    #[test]
    fn test_upload_error_without_payload() {
        let err = parse_upload_response(413, b"<html>too large</html>").unwrap_err();
        assert_eq!(err.to_string(), "Upload failed");
    }

    #[test]
    fn test_upload_success_without_url_is_failure() {
        let err = parse_upload_response(200, br#"{"ok":true}"#).unwrap_err();
        assert!(matches!(err, UploadError::MissingUrl));
        let err = parse_upload_response(201, b"not json").unwrap_err();
        assert!(matches!(err, UploadError::MissingUrl));
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h/api", "upload"), "http://h/api/upload");
        assert_eq!(join_url("http://h/api/", "/upload"), "http://h/api/upload");
        assert_eq!(join_url("", "uploads/a.png"), "uploads/a.png");
    }

    #[test]
    fn test_token_is_redacted_and_verbatim() {
        let token = BearerToken::new("abc.def.ghi");
        assert_eq!(token.header_value(), "Bearer abc.def.ghi");
        assert!(!format!("{token:?}").contains("abc"));
    }

    #[tokio::test]
    async fn test_upload_without_token_fails_locally() {
        let client = ApiClient::new(ApiConfig::default());
        assert!(!client.is_authorized());
        let file = UploadFile::new("a.png", "image/png", vec![1, 2, 3]);
        let err = client.upload(&file).await.unwrap_err();
        assert!(matches!(err, UploadError::Unauthorized));
    }

    #[tokio::test]
    async fn test_save_posts_without_token_fails_locally() {
        let client = ApiClient::new(ApiConfig {
            token: Some(String::new()),
            ..ApiConfig::default()
        });
        let err = client.save_posts(&[]).await.unwrap_err();
        assert!(matches!(err, ClientError::Unauthorized));
    }
}
