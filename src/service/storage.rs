//! Project backend seams: token verification, object storage and asset
//! downloads.

use super::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// Resolves a bearer token to a user id.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// `Ok(None)` when the token does not belong to a user.
    async fn user_id(&self, token: &str) -> ServiceResult<Option<String>>;
}

/// Public object storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> ServiceResult<()>;

    fn public_url(&self, path: &str) -> String;
}

/// Downloads images by URL.
#[async_trait]
pub trait AssetFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> ServiceResult<Vec<u8>>;
}

/// `{user}/{unix_millis}-{uuid}.jpg`
pub fn storage_path(user_id: &str, now: DateTime<Utc>, id: Uuid) -> String {
    format!("{user_id}/{}-{id}.jpg", now.timestamp_millis())
}

/// Decodes a `data:` URL carrying base64. `None` for any other URL.
fn decode_data_url(url: &str) -> Option<ServiceResult<Vec<u8>>> {
    let rest = url.strip_prefix("data:")?;
    let (_, payload) = rest.split_once(";base64,")?;
    Some(
        STANDARD
            .decode(payload)
            .map_err(|e| ServiceError::fetch(e.to_string())),
    )
}

// ============================================================================
// Supabase
// ============================================================================

#[derive(Deserialize)]
struct AuthUser {
    id: String,
}

/// Auth and storage against a Supabase project, using the service key.
#[derive(Debug, Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    url: String,
    service_key: String,
    bucket: String,
}

impl SupabaseClient {
    pub fn new(
        http: reqwest::Client,
        url: impl Into<String>,
        service_key: impl Into<String>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            http,
            url: url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl AuthProvider for SupabaseClient {
    async fn user_id(&self, token: &str) -> ServiceResult<Option<String>> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.url))
            .header("apikey", &self.service_key)
            .bearer_auth(token)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::debug!(status = response.status().as_u16(), "token rejected");
            return Ok(None);
        }
        let user: AuthUser = response.json().await?;
        Ok(Some(user.id).filter(|id| !id.is_empty()))
    }
}

#[async_trait]
impl ObjectStore for SupabaseClient {
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> ServiceResult<()> {
        tracing::info!(path, bytes = bytes.len(), bucket = %self.bucket, "uploading object");
        let response = self
            .http
            .post(format!("{}/storage/v1/object/{}/{}", self.url, self.bucket, path))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .header("x-upsert", "false")
            .body(bytes)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(str::to_string))
                .unwrap_or(body);
            tracing::error!(path, status = status.as_u16(), %message, "upload failed");
            return Err(ServiceError::upload(message));
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/storage/v1/object/public/{}/{}", self.url, self.bucket, path)
    }
}

/// [`AssetFetcher`] over HTTP. `data:` URLs are decoded in place.
#[derive(Debug, Clone, Default)]
pub struct HttpFetcher {
    http: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl AssetFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> ServiceResult<Vec<u8>> {
        if let Some(decoded) = decode_data_url(url) {
            return decoded;
        }

        tracing::debug!(url, "downloading image");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::fetch(
                status.canonical_reason().unwrap_or(status.as_str()).to_string(),
            ));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn storage_paths_are_per_user_and_unique() {
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();
        let id = Uuid::nil();
        assert_eq!(
            storage_path("user-1", now, id),
            "user-1/1700000000123-00000000-0000-0000-0000-000000000000.jpg"
        );
        assert_ne!(
            storage_path("u", now, Uuid::new_v4()),
            storage_path("u", now, Uuid::new_v4())
        );
    }

    #[test]
    fn public_urls_point_into_the_bucket() {
        let client = SupabaseClient::new(
            reqwest::Client::new(),
            "https://proj.supabase.co/",
            "service",
            "christmas-images",
        );
        assert_eq!(
            client.public_url("u/1-a.jpg"),
            "https://proj.supabase.co/storage/v1/object/public/christmas-images/u/1-a.jpg"
        );
    }

    #[tokio::test]
    async fn data_urls_are_decoded_without_network() {
        let fetcher = HttpFetcher::default();
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"png"));
        assert_eq!(fetcher.fetch(&url).await.unwrap(), b"png");

        let err = fetcher.fetch("data:image/png;base64,!!").await.unwrap_err();
        assert!(matches!(err, ServiceError::Fetch(_)));
    }
}
