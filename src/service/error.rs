use super::meshy::TaskKind;
use crate::protocol::ErrorBody;
use axum::http::StatusCode;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Everything that can abort a transform request.
#[derive(thiserror::Error, Debug)]
pub enum ServiceError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Unauthorized")]
    Unauthorized,

    #[error("{0}")]
    Validation(String),

    #[error("MESHY_API_KEY not configured")]
    MissingApiKey,

    #[error("Meshy {kind} API error: {status} - {body}")]
    Vendor {
        kind: TaskKind,
        status: u16,
        body: String,
    },

    #[error("Failed to check {kind} task status: {status}")]
    StatusCheck { kind: TaskKind, status: u16 },

    #[error("No task ID returned from Meshy {kind} API")]
    MissingTaskId { kind: TaskKind },

    #[error("Meshy {kind} task failed: {detail}")]
    TaskFailed { kind: TaskKind, detail: String },

    #[error("Unknown {kind} task status: {status}")]
    UnknownStatus { kind: TaskKind, status: String },

    #[error("No output URL in completed {kind} task")]
    MissingOutput { kind: TaskKind },

    #[error("{kind} task timeout: {kind} generation took too long")]
    Timeout { kind: TaskKind },

    #[error("Failed to fetch image: {0}")]
    Fetch(String),

    #[error("{0}")]
    Upload(String),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn fetch(msg: impl Into<String>) -> Self {
        Self::Fetch(msg.into())
    }

    pub fn upload(msg: impl Into<String>) -> Self {
        Self::Upload(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::MissingApiKey => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// The `error` field of the reply body.
    pub fn summary(&self) -> String {
        match self {
            Self::MethodNotAllowed | Self::Unauthorized | Self::Validation(_) => self.to_string(),
            Self::MissingApiKey => "Meshy API not configured".to_string(),
            Self::Upload(_) => "Upload failed".to_string(),
            _ => "Transformation failed".to_string(),
        }
    }

    pub fn body(&self) -> ErrorBody {
        let body = ErrorBody::new(self.summary());
        match self {
            Self::MethodNotAllowed => body.with_detail("Only POST and OPTIONS are supported"),
            Self::Unauthorized => body.with_detail("A valid bearer token is required"),
            Self::Validation(message) => body.with_detail(message.clone()),
            Self::MissingApiKey => body.with_detail(
                "Please add MESHY_API_KEY to Supabase environment variables to enable AI transformations",
            ),
            _ => body.with_detail(self.to_string()),
        }
    }
}
