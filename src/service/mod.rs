//! The `christmas-transform` backend function.
//!
//! [`TransformService::handle`] is transport-agnostic: it takes the method,
//! headers and raw body of one request and always produces a [`Reply`].
//! [`server`] mounts it on an axum router.

pub mod config;
pub mod error;
pub mod meshy;
pub mod pipeline;
pub mod poll;
pub mod server;
pub mod storage;

pub use config::{
    ConfigError, MissingKeyPolicy, PipelineMode, ServiceConfig, UploadFailurePolicy,
};
pub use error::{ServiceError, ServiceResult};
pub use meshy::{MeshyClient, TaskApi, TaskKind, TaskRecord, TaskStatus};
pub use pipeline::VendorOutput;
pub use poll::{PollPolicy, poll_until_done};
pub use storage::{AssetFetcher, AuthProvider, HttpFetcher, ObjectStore, SupabaseClient};

use crate::filter::resolve_prompt;
use crate::protocol::{Degradation, TransformRequest, TransformResponse};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, header};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::sync::Arc;
use std::time::Instant;

const ALLOW_METHODS: &str = "POST, OPTIONS";
const ALLOW_HEADERS: &str = "authorization, content-type";

// ============================================================================
// Reply
// ============================================================================

/// A finished HTTP reply.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Reply {
    fn cors_preflight() -> Self {
        let mut headers = cors_headers();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        Self {
            status: StatusCode::OK,
            headers,
            body: Vec::new(),
        }
    }

    fn json<T: serde::Serialize>(status: StatusCode, value: &T) -> Self {
        let mut headers = cors_headers();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let body = match serde_json::to_vec(value) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(error = %e, "failed to serialize reply");
                return Self {
                    status: StatusCode::INTERNAL_SERVER_ERROR,
                    headers,
                    body: br#"{"error":"Transformation failed"}"#.to_vec(),
                };
            }
        };
        Self { status, headers, body }
    }

    fn error(err: &ServiceError) -> Self {
        Self::json(err.status(), &err.body())
    }
}

fn cors_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    headers
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

/// Strips an optional `data:<mime>;base64,` prefix.
fn strip_data_url(payload: &str) -> &str {
    match payload.strip_prefix("data:") {
        Some(rest) => rest.split_once(',').map(|(_, data)| data).unwrap_or(rest),
        None => payload,
    }
}

// ============================================================================
// Service
// ============================================================================

/// Request handler and its collaborators.
pub struct TransformService {
    config: ServiceConfig,
    auth: Arc<dyn AuthProvider>,
    store: Arc<dyn ObjectStore>,
    fetcher: Arc<dyn AssetFetcher>,
    /// `None` when no vendor key is configured.
    vendor: Option<Arc<dyn TaskApi>>,
}

impl TransformService {
    pub fn new(
        config: ServiceConfig,
        auth: Arc<dyn AuthProvider>,
        store: Arc<dyn ObjectStore>,
        fetcher: Arc<dyn AssetFetcher>,
        vendor: Option<Arc<dyn TaskApi>>,
    ) -> Self {
        Self {
            config,
            auth,
            store,
            fetcher,
            vendor,
        }
    }

    /// Wires the HTTP collaborators described by `config`.
    pub fn from_config(config: ServiceConfig) -> Self {
        let http = reqwest::Client::new();
        let supabase = Arc::new(SupabaseClient::new(
            http.clone(),
            config.supabase_url.as_str(),
            config.service_role_key.as_str(),
            config.bucket.as_str(),
        ));
        let vendor = config.meshy_api_key.as_ref().map(|key| {
            Arc::new(MeshyClient::new(
                http.clone(),
                config.meshy_api_base.as_str(),
                key.as_str(),
            )) as Arc<dyn TaskApi>
        });
        if vendor.is_none() {
            tracing::warn!(policy = ?config.missing_key, "MESHY_API_KEY not configured");
        }

        Self::new(
            config,
            supabase.clone(),
            supabase,
            Arc::new(HttpFetcher::new(http)),
            vendor,
        )
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Handles one request. Never fails: errors become JSON error replies.
    pub async fn handle(&self, method: &Method, headers: &HeaderMap, body: &[u8]) -> Reply {
        if method == Method::OPTIONS {
            return Reply::cors_preflight();
        }
        if method != Method::POST {
            return Reply::error(&ServiceError::MethodNotAllowed);
        }

        match self.transform(headers, body).await {
            Ok(response) => {
                tracing::info!(
                    url = %response.url,
                    duration_ms = response.duration_ms,
                    degraded = ?response.degraded,
                    "transformation completed"
                );
                Reply::json(StatusCode::OK, &response)
            }
            Err(err) => {
                match err.status() {
                    s if s.is_server_error() => tracing::error!(error = %err, "transform failed"),
                    _ => tracing::warn!(error = %err, "transform rejected"),
                }
                Reply::error(&err)
            }
        }
    }

    async fn transform(&self, headers: &HeaderMap, body: &[u8]) -> ServiceResult<TransformResponse> {
        let token = bearer_token(headers).ok_or(ServiceError::Unauthorized)?;
        let user_id = self
            .auth
            .user_id(token)
            .await?
            .ok_or(ServiceError::Unauthorized)?;

        let request: TransformRequest = serde_json::from_slice(body)
            .map_err(|e| ServiceError::validation(format!("Invalid request body: {e}")))?;
        if !request.has_image() {
            return Err(ServiceError::validation("Image data required"));
        }
        if request.filters.is_empty() {
            return Err(ServiceError::validation("At least one filter required"));
        }

        let started = Instant::now();
        let prompt = resolve_prompt(request.prompt.as_deref(), &request.filters);
        tracing::info!(user_id = %user_id, filters = ?request.filters, %prompt, "transform requested");

        if self.vendor.is_none() && self.config.missing_key == MissingKeyPolicy::Reject {
            return Err(ServiceError::MissingApiKey);
        }

        let image_base64 = self.resolve_image(&request).await?;
        tracing::debug!(len = image_base64.len(), "image payload ready");

        let Some(vendor) = self.vendor.as_deref() else {
            return self
                .pass_through(&user_id, &request, &image_base64, started)
                .await;
        };

        let output = pipeline::run(
            vendor,
            self.config.pipeline,
            &image_base64,
            &prompt,
            self.config.poll_interval,
        )
        .await?;

        let bytes = self.fetcher.fetch(&output.output_url).await?;
        let path = storage::storage_path(&user_id, chrono::Utc::now(), uuid::Uuid::new_v4());

        let mut response = TransformResponse {
            url: String::new(),
            path: None,
            duration_ms: 0,
            task_id: Some(output.task_id),
            model_url: output.model_url,
            textured_model_url: output.textured_model_url,
            degraded: None,
        };

        match self.store.upload(&path, bytes, "image/jpeg").await {
            Ok(()) => {
                response.url = self.store.public_url(&path);
                response.path = Some(path);
            }
            Err(err) => match self.config.upload_failure {
                UploadFailurePolicy::Fail => return Err(err),
                UploadFailurePolicy::RemoteUrl => {
                    tracing::warn!(error = %err, "upload failed, returning vendor url");
                    response.url = output.output_url;
                    response.degraded = Some(Degradation::UploadFailed);
                }
            },
        }

        response.duration_ms = started.elapsed().as_millis() as u64;
        Ok(response)
    }

    /// Base64 of the inline payload, or of the downloaded `imageUrl`.
    async fn resolve_image(&self, request: &TransformRequest) -> ServiceResult<String> {
        match request.inline_image() {
            Some(inline) => Ok(strip_data_url(inline).to_string()),
            None => {
                let url = request.remote_image().unwrap_or_default();
                Ok(STANDARD.encode(self.fetcher.fetch(url).await?))
            }
        }
    }

    /// Stores the original photo when no vendor is available.
    async fn pass_through(
        &self,
        user_id: &str,
        request: &TransformRequest,
        image_base64: &str,
        started: Instant,
    ) -> ServiceResult<TransformResponse> {
        tracing::warn!("MESHY_API_KEY not configured, returning original image");
        let bytes = STANDARD
            .decode(image_base64)
            .map_err(|_| ServiceError::validation("Invalid image data"))?;
        let path = storage::storage_path(user_id, chrono::Utc::now(), uuid::Uuid::new_v4());

        let (url, path) = match self.store.upload(&path, bytes, "image/jpeg").await {
            Ok(()) => (self.store.public_url(&path), Some(path)),
            Err(err) => match (self.config.upload_failure, request.remote_image()) {
                (UploadFailurePolicy::RemoteUrl, Some(url)) => {
                    tracing::warn!(error = %err, "upload failed, returning source url");
                    (url.to_string(), None)
                }
                _ => return Err(err),
            },
        };

        Ok(TransformResponse {
            url,
            path,
            duration_ms: started.elapsed().as_millis() as u64,
            task_id: None,
            model_url: None,
            textured_model_url: None,
            degraded: Some(Degradation::VendorNotConfigured),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorBody;
    use crate::service::pipeline::tests::FakeVendor;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    struct FakeAuth;

    #[async_trait]
    impl AuthProvider for FakeAuth {
        async fn user_id(&self, token: &str) -> ServiceResult<Option<String>> {
            Ok((token == "good").then(|| "user-1".to_string()))
        }
    }

    #[derive(Default)]
    struct FakeStore {
        fail: bool,
        uploads: Mutex<Vec<(String, Vec<u8>)>>,
    }

    #[async_trait]
    impl ObjectStore for FakeStore {
        async fn upload(&self, path: &str, bytes: Vec<u8>, _ct: &str) -> ServiceResult<()> {
            if self.fail {
                return Err(ServiceError::upload("bucket unavailable"));
            }
            self.uploads.lock().unwrap().push((path.to_string(), bytes));
            Ok(())
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://cdn/{path}")
        }
    }

    struct FakeFetcher;

    #[async_trait]
    impl AssetFetcher for FakeFetcher {
        async fn fetch(&self, url: &str) -> ServiceResult<Vec<u8>> {
            match url {
                "https://missing" => Err(ServiceError::fetch("Not Found")),
                _ => Ok(format!("bytes of {url}").into_bytes()),
            }
        }
    }

    struct Harness {
        store: Arc<FakeStore>,
        vendor: Arc<FakeVendor>,
        service: TransformService,
    }

    fn harness(with_vendor: bool, store: FakeStore, tweak: impl FnOnce(&mut ServiceConfig)) -> Harness {
        let mut config = ServiceConfig::new("https://proj", "service");
        config.poll_interval = Some(Duration::ZERO);
        tweak(&mut config);

        let store = Arc::new(store);
        let vendor = Arc::new(FakeVendor::succeeding());
        let service = TransformService::new(
            config,
            Arc::new(FakeAuth),
            store.clone(),
            Arc::new(FakeFetcher),
            with_vendor.then(|| vendor.clone() as Arc<dyn TaskApi>),
        );
        Harness { store, vendor, service }
    }

    fn auth() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer good"));
        headers
    }

    fn body(request: &TransformRequest) -> Vec<u8> {
        request.to_json().unwrap().into_bytes()
    }

    fn santa() -> TransformRequest {
        TransformRequest::new(["santa"]).with_image_base64(STANDARD.encode(b"photo"))
    }

    async fn post(h: &Harness, request: &TransformRequest) -> Reply {
        h.service.handle(&Method::POST, &auth(), &body(request)).await
    }

    fn error_of(reply: &Reply) -> ErrorBody {
        serde_json::from_slice(&reply.body).unwrap()
    }

    fn response_of(reply: &Reply) -> TransformResponse {
        serde_json::from_slice(&reply.body).unwrap()
    }

    #[tokio::test]
    async fn options_is_a_cors_preflight() {
        let h = harness(true, FakeStore::default(), |_| {});
        let reply = h.service.handle(&Method::OPTIONS, &HeaderMap::new(), b"").await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_METHODS], "POST, OPTIONS");
        assert_eq!(
            reply.headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "authorization, content-type"
        );
    }

    #[tokio::test]
    async fn other_methods_are_rejected() {
        let h = harness(true, FakeStore::default(), |_| {});
        let reply = h.service.handle(&Method::GET, &auth(), b"").await;
        assert_eq!(reply.status, StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[tokio::test]
    async fn unknown_token_is_unauthorized() {
        let h = harness(true, FakeStore::default(), |_| {});
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer bad"));
        let reply = h.service.handle(&Method::POST, &headers, &body(&santa())).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
        assert_eq!(error_of(&reply).error, "Unauthorized");

        let reply = h.service.handle(&Method::POST, &HeaderMap::new(), &body(&santa())).await;
        assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn validation_errors() {
        let h = harness(true, FakeStore::default(), |_| {});

        let reply = post(&h, &TransformRequest::new(["santa"])).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(error_of(&reply).error, "Image data required");

        let no_filters = TransformRequest::new(Vec::<String>::new()).with_image_base64("AAAA");
        let reply = post(&h, &no_filters).await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert_eq!(error_of(&reply).error, "At least one filter required");

        let reply = h.service.handle(&Method::POST, &auth(), b"not json").await;
        assert_eq!(reply.status, StatusCode::BAD_REQUEST);
        assert!(h.vendor.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn model_pipeline_stores_the_preview() {
        let h = harness(true, FakeStore::default(), |_| {});
        let reply = post(&h, &santa()).await;
        assert_eq!(reply.status, StatusCode::OK);
        assert_eq!(reply.headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(reply.headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

        let response = response_of(&reply);
        let path = response.path.clone().unwrap();
        assert!(path.starts_with("user-1/") && path.ends_with(".jpg"));
        assert_eq!(response.url, format!("https://cdn/{path}"));
        assert_eq!(response.task_id.as_deref(), Some("image-to-3d-task"));
        assert_eq!(response.model_url.as_deref(), Some("https://vendor/model.glb"));
        assert_eq!(response.textured_model_url.as_deref(), Some("https://vendor/textured.glb"));
        assert!(!response.is_degraded());

        let uploads = h.store.uploads.lock().unwrap();
        assert_eq!(uploads.len(), 1);
        assert_eq!(uploads[0].1, b"bytes of https://vendor/thumb.png");
    }

    #[tokio::test]
    async fn prompt_defaults_to_generated_text() {
        let h = harness(true, FakeStore::default(), |_| {});
        post(&h, &santa()).await;
        let created = h.vendor.created.lock().unwrap();
        match &created[1] {
            meshy::TaskRequest::TextToTexture(req) => {
                assert!(req.prompt.starts_with("Transform this photo with Christmas holiday theme"));
                assert!(req.prompt.contains("Santa hat"));
            }
            other => panic!("unexpected task {other:?}"),
        }
    }

    #[tokio::test]
    async fn remote_image_is_fetched_and_encoded() {
        let h = harness(true, FakeStore::default(), |c| c.pipeline = PipelineMode::ImageToImage);
        let request = TransformRequest::new(["snow"]).with_image_url("https://photos/a.jpg");
        let reply = post(&h, &request).await;
        assert_eq!(reply.status, StatusCode::OK);

        let created = h.vendor.created.lock().unwrap();
        match &created[0] {
            meshy::TaskRequest::ImageToImage(req) => {
                let expected = STANDARD.encode(b"bytes of https://photos/a.jpg");
                assert_eq!(req.image_url, format!("data:image/jpeg;base64,{expected}"));
            }
            other => panic!("unexpected task {other:?}"),
        }
        assert_eq!(response_of(&reply).model_url, None);
    }

    #[tokio::test]
    async fn failed_remote_fetch_is_a_server_error() {
        let h = harness(true, FakeStore::default(), |_| {});
        let request = TransformRequest::new(["snow"]).with_image_url("https://missing");
        let reply = post(&h, &request).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            error_of(&reply).detail.as_deref(),
            Some("Failed to fetch image: Not Found")
        );
    }

    #[tokio::test]
    async fn missing_key_rejects_when_configured() {
        let h = harness(false, FakeStore::default(), |c| c.missing_key = MissingKeyPolicy::Reject);
        let reply = post(&h, &santa()).await;
        assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error_of(&reply).error, "Meshy API not configured");
        assert!(h.store.uploads.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_key_rejects_before_fetching_remote_image() {
        let h = harness(false, FakeStore::default(), |c| c.missing_key = MissingKeyPolicy::Reject);
        let request = TransformRequest::new(["santa"]).with_image_url("https://missing");
        let reply = post(&h, &request).await;
        assert_eq!(reply.status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error_of(&reply).error, "Meshy API not configured");
    }

    #[tokio::test]
    async fn missing_key_passes_the_original_through() {
        let h = harness(false, FakeStore::default(), |_| {});
        let reply = post(&h, &santa()).await;
        assert_eq!(reply.status, StatusCode::OK);

        let response = response_of(&reply);
        assert_eq!(response.degraded, Some(Degradation::VendorNotConfigured));
        assert!(response.task_id.is_none());
        assert_eq!(h.store.uploads.lock().unwrap()[0].1, b"photo");
    }

    #[tokio::test]
    async fn upload_failure_degrades_to_vendor_url() {
        let store = FakeStore {
            fail: true,
            ..Default::default()
        };
        let h = harness(true, store, |_| {});
        let reply = post(&h, &santa()).await;
        assert_eq!(reply.status, StatusCode::OK);

        let response = response_of(&reply);
        assert_eq!(response.url, "https://vendor/thumb.png");
        assert_eq!(response.path, None);
        assert_eq!(response.degraded, Some(Degradation::UploadFailed));
    }

    #[tokio::test]
    async fn upload_failure_fails_when_configured() {
        let store = FakeStore {
            fail: true,
            ..Default::default()
        };
        let h = harness(true, store, |c| c.upload_failure = UploadFailurePolicy::Fail);
        let reply = post(&h, &santa()).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = error_of(&reply);
        assert_eq!(body.error, "Upload failed");
        assert_eq!(body.detail.as_deref(), Some("bucket unavailable"));
    }

    #[tokio::test]
    async fn vendor_failure_is_reported_with_detail() {
        let mut vendor = FakeVendor::succeeding();
        vendor.model.status = TaskStatus::Failed;
        let service = TransformService::new(
            ServiceConfig::new("https://proj", "service"),
            Arc::new(FakeAuth),
            Arc::new(FakeStore::default()),
            Arc::new(FakeFetcher),
            Some(Arc::new(vendor)),
        );
        let reply = service.handle(&Method::POST, &auth(), &body(&santa())).await;
        assert_eq!(reply.status, StatusCode::INTERNAL_SERVER_ERROR);
        let body = error_of(&reply);
        assert_eq!(body.error, "Transformation failed");
        assert_eq!(body.detail.as_deref(), Some("Meshy 3D task failed: Unknown error"));
    }

    #[test]
    fn data_url_prefix_is_stripped() {
        assert_eq!(strip_data_url("data:image/jpeg;base64,AAAA"), "AAAA");
        assert_eq!(strip_data_url("AAAA"), "AAAA");
    }
}
