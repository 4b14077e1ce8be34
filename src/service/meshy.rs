//! The AI vendor's task API: create a task, then read it back until it
//! reaches a terminal status.

use super::error::{ServiceError, ServiceResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default vendor endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.meshy.ai";

// ============================================================================
// Task kinds and statuses
// ============================================================================

/// The vendor task families this service drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    ImageTo3d,
    TextToTexture,
    ImageToImage,
}

impl TaskKind {
    /// Path segment under `/v1/`.
    pub fn path(self) -> &'static str {
        match self {
            TaskKind::ImageTo3d => "image-to-3d",
            TaskKind::TextToTexture => "text-to-texture",
            TaskKind::ImageToImage => "image-to-image",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::ImageTo3d => "3D",
            TaskKind::TextToTexture => "texture",
            TaskKind::ImageToImage => "image",
        })
    }
}

/// Status string reported by the vendor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum TaskStatus {
    Pending,
    InProgress,
    InQueue,
    Succeeded,
    Failed,
    Other(String),
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => TaskStatus::Pending,
            "IN_PROGRESS" => TaskStatus::InProgress,
            "IN_QUEUE" => TaskStatus::InQueue,
            "SUCCEEDED" => TaskStatus::Succeeded,
            "FAILED" => TaskStatus::Failed,
            _ => TaskStatus::Other(s),
        }
    }
}

impl TaskStatus {
    /// True for statuses that warrant another poll.
    pub fn is_running(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::InProgress | TaskStatus::InQueue)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::InQueue => "IN_QUEUE",
            TaskStatus::Succeeded => "SUCCEEDED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Other(s) => s,
        })
    }
}

// ============================================================================
// Records
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ModelUrls {
    #[serde(default)]
    pub glb: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct TaskError {
    #[serde(default)]
    pub message: Option<String>,
}

/// A task as returned by a status read.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskRecord {
    #[serde(default)]
    pub id: Option<String>,
    pub status: TaskStatus,
    #[serde(default)]
    pub model_urls: Option<ModelUrls>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    #[serde(default)]
    pub task_error: Option<TaskError>,
    /// Older responses report failures as a bare string.
    #[serde(default)]
    pub error: Option<String>,
}

impl TaskRecord {
    /// A record with only a status, handy for fakes.
    pub fn with_status(status: TaskStatus) -> Self {
        Self {
            id: None,
            status,
            model_urls: None,
            thumbnail_url: None,
            image_urls: Vec::new(),
            task_error: None,
            error: None,
        }
    }

    pub fn glb(&self) -> Option<&str> {
        self.model_urls
            .as_ref()
            .and_then(|m| m.glb.as_deref())
            .filter(|u| !u.is_empty())
    }

    /// Preview image: the thumbnail, else the first generated image.
    pub fn preview(&self) -> Option<&str> {
        self.thumbnail_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .or_else(|| self.image_urls.first().map(String::as_str))
    }

    pub fn failure_detail(&self) -> String {
        self.task_error
            .as_ref()
            .and_then(|e| e.message.clone())
            .filter(|m| !m.is_empty())
            .or_else(|| self.error.clone().filter(|m| !m.is_empty()))
            .unwrap_or_else(|| "Unknown error".to_string())
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageTo3dRequest {
    pub image_url: String,
    pub enable_pbr: bool,
    pub surface_mode: &'static str,
    pub model_resolution: &'static str,
}

impl ImageTo3dRequest {
    pub fn new(image_url: impl Into<String>) -> Self {
        Self {
            image_url: image_url.into(),
            enable_pbr: true,
            surface_mode: "organic",
            model_resolution: "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextToTextureRequest {
    pub model_url: String,
    pub prompt: String,
    pub art_style: &'static str,
    pub negative_prompt: &'static str,
}

impl TextToTextureRequest {
    pub fn new(model_url: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model_url: model_url.into(),
            prompt: prompt.into(),
            art_style: "realistic",
            negative_prompt: "blurry, low quality, distorted",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageToImageRequest {
    pub image_url: String,
    pub prompt: String,
}

/// Body of a task creation call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaskRequest {
    ImageTo3d(ImageTo3dRequest),
    TextToTexture(TextToTextureRequest),
    ImageToImage(ImageToImageRequest),
}

impl TaskRequest {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskRequest::ImageTo3d(_) => TaskKind::ImageTo3d,
            TaskRequest::TextToTexture(_) => TaskKind::TextToTexture,
            TaskRequest::ImageToImage(_) => TaskKind::ImageToImage,
        }
    }
}

// ============================================================================
// API
// ============================================================================

/// Vendor task operations.
#[async_trait]
pub trait TaskApi: Send + Sync {
    /// Creates a task and returns its identifier.
    async fn create(&self, request: &TaskRequest) -> ServiceResult<String>;

    /// Reads a task's current state.
    async fn get(&self, kind: TaskKind, id: &str) -> ServiceResult<TaskRecord>;
}

#[derive(Deserialize)]
struct Created {
    #[serde(default)]
    result: Option<String>,
}

/// [`TaskApi`] over the vendor's HTTPS API.
#[derive(Debug, Clone)]
pub struct MeshyClient {
    http: reqwest::Client,
    base: String,
    api_key: String,
}

impl MeshyClient {
    pub fn new(http: reqwest::Client, base: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        }
    }

    fn url(&self, kind: TaskKind) -> String {
        format!("{}/v1/{}", self.base, kind.path())
    }
}

#[async_trait]
impl TaskApi for MeshyClient {
    async fn create(&self, request: &TaskRequest) -> ServiceResult<String> {
        let kind = request.kind();
        tracing::info!(%kind, "creating vendor task");

        let response = self
            .http
            .post(self.url(kind))
            .bearer_auth(&self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%kind, status = status.as_u16(), %body, "vendor rejected task");
            return Err(ServiceError::Vendor {
                kind,
                status: status.as_u16(),
                body,
            });
        }

        let created: Created = response.json().await?;
        let id = created
            .result
            .filter(|id| !id.is_empty())
            .ok_or(ServiceError::MissingTaskId { kind })?;
        tracing::info!(%kind, task_id = %id, "vendor task created");
        Ok(id)
    }

    async fn get(&self, kind: TaskKind, id: &str) -> ServiceResult<TaskRecord> {
        let response = self
            .http
            .get(format!("{}/{}", self.url(kind), id))
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%kind, status = status.as_u16(), %body, "vendor status check failed");
            return Err(ServiceError::StatusCheck {
                kind,
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }
}
