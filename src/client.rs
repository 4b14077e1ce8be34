//! Client side of the transform function: one remote call per request,
//! tracked through an idle / loading / success / error state.

use crate::protocol::{ErrorBody, TransformRequest, TransformResponse};
use async_trait::async_trait;

/// Default name of the deployed transform function.
pub const DEFAULT_FUNCTION_NAME: &str = "christmas-transform";

// ============================================================================
// Invoker
// ============================================================================

/// Errors from invoking the remote function.
#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    /// The function answered with a non-2xx status.
    #[error("{message}")]
    Function { status: u16, message: String },

    #[error("network request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Issues the single remote call behind a transform.
#[async_trait]
pub trait FunctionInvoker: Send + Sync {
    async fn invoke(&self, request: &TransformRequest) -> Result<TransformResponse, InvokeError>;
}

#[async_trait]
impl<T: FunctionInvoker + ?Sized> FunctionInvoker for std::sync::Arc<T> {
    async fn invoke(&self, request: &TransformRequest) -> Result<TransformResponse, InvokeError> {
        (**self).invoke(request).await
    }
}

/// Where the deployed function lives and how to authenticate to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionsConfig {
    /// Project base URL, e.g. `https://abc.supabase.co`.
    pub project_url: String,
    pub anon_key: String,
    /// Signed-in user's session token. Falls back to the anon key.
    pub access_token: Option<String>,
    pub function_name: String,
}

impl FunctionsConfig {
    pub fn new(project_url: impl Into<String>, anon_key: impl Into<String>) -> Self {
        Self {
            project_url: project_url.into(),
            anon_key: anon_key.into(),
            access_token: None,
            function_name: DEFAULT_FUNCTION_NAME.to_string(),
        }
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_function_name(mut self, name: impl Into<String>) -> Self {
        self.function_name = name.into();
        self
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/functions/v1/{}",
            self.project_url.trim_end_matches('/'),
            self.function_name
        )
    }

    fn bearer(&self) -> &str {
        self.access_token.as_deref().unwrap_or(&self.anon_key)
    }
}

/// [`FunctionInvoker`] over HTTPS.
#[derive(Debug, Clone)]
pub struct FunctionsHttp {
    http: reqwest::Client,
    config: FunctionsConfig,
}

impl FunctionsHttp {
    pub fn new(config: FunctionsConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(http: reqwest::Client, config: FunctionsConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &FunctionsConfig {
        &self.config
    }
}

#[async_trait]
impl FunctionInvoker for FunctionsHttp {
    async fn invoke(&self, request: &TransformRequest) -> Result<TransformResponse, InvokeError> {
        let response = self
            .http
            .post(self.config.endpoint())
            .bearer_auth(self.config.bearer())
            .header("apikey", &self.config.anon_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let message = match serde_json::from_str::<ErrorBody>(&body) {
                Ok(error) => error.message().to_string(),
                Err(_) if !body.trim().is_empty() => body.trim().to_string(),
                Err(_) => status
                    .canonical_reason()
                    .unwrap_or("Failed to transform image")
                    .to_string(),
            };
            return Err(InvokeError::Function {
                status: status.as_u16(),
                message,
            });
        }

        Ok(TransformResponse::from_json(&body)?)
    }
}

// ============================================================================
// Transform client
// ============================================================================

/// Inputs of a transform request as the editor holds them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformParams {
    /// Local URI of the captured image, for logging only.
    pub image_uri: String,
    pub image_base64: String,
    pub filters: Vec<String>,
    pub prompt: Option<String>,
}

/// Request lifecycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TransformState {
    #[default]
    Idle,
    Loading,
    Success(TransformResponse),
    Error(String),
}

/// Rewrites known backend and transport failures into friendlier text.
///
/// Matching is case-insensitive; unrecognised messages come back verbatim.
pub fn friendly_message(raw: &str) -> String {
    let lower = raw.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    if has(&["meshy_api_key", "not configured"]) {
        "AI transformation is not configured yet. Ask the app owner to add the MESHY_API_KEY."
            .to_string()
    } else if has(&["timeout", "took too long"]) {
        "The AI transformation took too long. Please try again in a moment.".to_string()
    } else if has(&["unauthorized", "401", "bearer token"]) {
        "Your session has expired. Please sign in again.".to_string()
    } else if has(&["network request failed", "network error"]) {
        "Network error. Check your connection and try again.".to_string()
    } else {
        raw.to_string()
    }
}

/// Drives one transform at a time and remembers how the last one went.
pub struct TransformClient<I> {
    invoker: I,
    state: TransformState,
}

impl<I: FunctionInvoker> TransformClient<I> {
    pub fn new(invoker: I) -> Self {
        Self {
            invoker,
            state: TransformState::Idle,
        }
    }

    pub fn invoker(&self) -> &I {
        &self.invoker
    }

    pub fn state(&self) -> &TransformState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, TransformState::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            TransformState::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn data(&self) -> Option<&TransformResponse> {
        match &self.state {
            TransformState::Success(response) => Some(response),
            _ => None,
        }
    }

    /// Returns to idle without touching the network.
    pub fn reset(&mut self) {
        self.state = TransformState::Idle;
    }

    /// Validates, then performs exactly one remote call.
    ///
    /// Returns the result on success. On failure the message is available
    /// from [`error`](Self::error) and `None` is returned.
    pub async fn transform(&mut self, params: TransformParams) -> Option<TransformResponse> {
        if params.image_base64.is_empty() {
            self.state = TransformState::Error("Image data is required".to_string());
            return None;
        }
        if params.filters.is_empty() {
            self.state =
                TransformState::Error("Please select at least one Christmas filter".to_string());
            return None;
        }

        self.state = TransformState::Loading;
        tracing::info!(uri = %params.image_uri, filters = ?params.filters, "requesting transform");

        let mut request = TransformRequest::new(params.filters).with_image_base64(params.image_base64);
        request.prompt = params.prompt;

        match self.invoker.invoke(&request).await {
            Ok(response) => {
                tracing::info!(url = %response.url, duration_ms = response.duration_ms, "transform succeeded");
                self.state = TransformState::Success(response.clone());
                Some(response)
            }
            Err(err) => {
                tracing::warn!(error = %err, "transform failed");
                self.state = TransformState::Error(friendly_message(&err.to_string()));
                None
            }
        }
    }
}
