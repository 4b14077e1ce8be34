//! Vendor task chains that turn a photo into a festive image.
//!
//! `image-to-3d` builds a model from the photo and then textures it with
//! the prompt. `image-to-image` asks for a restyled picture directly.

use super::config::PipelineMode;
use super::error::{ServiceError, ServiceResult};
use super::meshy::{
    ImageTo3dRequest, ImageToImageRequest, TaskApi, TaskKind, TaskRequest, TextToTextureRequest,
};
use super::poll::{PollPolicy, poll_until_done};
use std::time::Duration;

/// Result of a completed vendor chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VendorOutput {
    /// Image to download and store.
    pub output_url: String,
    pub task_id: String,
    pub model_url: Option<String>,
    pub textured_model_url: Option<String>,
}

/// Runs the configured chain against `api`.
///
/// `poll_interval` overrides the per-kind polling interval when set.
pub async fn run(
    api: &dyn TaskApi,
    mode: PipelineMode,
    image_base64: &str,
    prompt: &str,
    poll_interval: Option<Duration>,
) -> ServiceResult<VendorOutput> {
    let policy = |kind| {
        let policy = PollPolicy::for_kind(kind);
        match poll_interval {
            Some(interval) => policy.with_interval(interval),
            None => policy,
        }
    };
    let image_url = format!("data:image/jpeg;base64,{image_base64}");

    match mode {
        PipelineMode::ImageTo3d => {
            let kind = TaskKind::ImageTo3d;
            let task_id = api
                .create(&TaskRequest::ImageTo3d(ImageTo3dRequest::new(image_url)))
                .await?;
            let model = poll_until_done(api, kind, &task_id, policy(kind)).await?;
            let model_url = model
                .glb()
                .map(str::to_string)
                .ok_or(ServiceError::MissingOutput { kind })?;
            let output_url = model.preview().unwrap_or(&model_url).to_string();

            let kind = TaskKind::TextToTexture;
            let texture_id = api
                .create(&TaskRequest::TextToTexture(TextToTextureRequest::new(
                    model_url.as_str(),
                    prompt,
                )))
                .await?;
            let textured = poll_until_done(api, kind, &texture_id, policy(kind)).await?;
            let textured_model_url = textured
                .glb()
                .map(str::to_string)
                .ok_or(ServiceError::MissingOutput { kind })?;

            Ok(VendorOutput {
                output_url,
                task_id,
                model_url: Some(model_url),
                textured_model_url: Some(textured_model_url),
            })
        }
        PipelineMode::ImageToImage => {
            let kind = TaskKind::ImageToImage;
            let task_id = api
                .create(&TaskRequest::ImageToImage(ImageToImageRequest {
                    image_url,
                    prompt: prompt.to_string(),
                }))
                .await?;
            let record = poll_until_done(api, kind, &task_id, policy(kind)).await?;
            let output_url = record
                .image_urls
                .first()
                .map(String::as_str)
                .or_else(|| record.preview())
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .ok_or(ServiceError::MissingOutput { kind })?;

            Ok(VendorOutput {
                output_url,
                task_id,
                model_url: None,
                textured_model_url: None,
            })
        }
    }
}
