use super::{Reply, TransformService};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use std::net::SocketAddr;
use std::sync::Arc;

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

async fn handle(
    State(service): State<Arc<TransformService>>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Reply {
    service.handle(&method, &headers, &body).await
}

/// Largest accepted request body. Base64 phone photos routinely exceed
/// axum's 2 MB default.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Routes the function under its bare name and its Supabase-style path.
pub fn router(service: Arc<TransformService>) -> Router {
    Router::new()
        .route("/", any(handle))
        .route("/christmas-transform", any(handle))
        .route("/functions/v1/christmas-transform", any(handle))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(service)
}

/// Serves [`router`] on `addr` until the process stops.
pub async fn serve(addr: SocketAddr, service: Arc<TransformService>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "transform function listening");
    axum::serve(listener, router(service)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorBody;
    use crate::service::{
        AssetFetcher, AuthProvider, ObjectStore, ServiceConfig, ServiceResult,
    };
    use async_trait::async_trait;
    use axum::http::{StatusCode, header};

    struct NobodyAuth;

    #[async_trait]
    impl AuthProvider for NobodyAuth {
        async fn user_id(&self, _token: &str) -> ServiceResult<Option<String>> {
            Ok(None)
        }
    }

    struct NullStore;

    #[async_trait]
    impl ObjectStore for NullStore {
        async fn upload(&self, _path: &str, _bytes: Vec<u8>, _ct: &str) -> ServiceResult<()> {
            Ok(())
        }

        fn public_url(&self, path: &str) -> String {
            format!("https://cdn/{path}")
        }
    }

    struct NullFetcher;

    #[async_trait]
    impl AssetFetcher for NullFetcher {
        async fn fetch(&self, _url: &str) -> ServiceResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn large_photo_bodies_reach_the_handler() {
        let service = Arc::new(TransformService::new(
            ServiceConfig::new("https://proj", "service"),
            Arc::new(NobodyAuth),
            Arc::new(NullStore),
            Arc::new(NullFetcher),
            None,
        ));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, router(service)).await });

        let photo = "A".repeat(3 * 1024 * 1024);
        let body = format!(r#"{{"imageBase64":"{photo}","filters":["santa"]}}"#);
        let response = reqwest::Client::new()
            .post(format!("http://{addr}/christmas-transform"))
            .bearer_auth("stranger")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let error: ErrorBody = response.json().await.unwrap();
        assert_eq!(error.error, "Unauthorized");
    }

    #[test]
    fn reply_converts_to_response() {
        let mut headers = HeaderMap::new();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, "*".parse().unwrap());
        let reply = Reply {
            status: StatusCode::CREATED,
            headers,
            body: b"{}".to_vec(),
        };
        let response = reply.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }
}
