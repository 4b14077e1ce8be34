use super::error::{ServiceError, ServiceResult};
use super::meshy::{TaskApi, TaskKind, TaskRecord, TaskStatus};
use std::time::Duration;

/// How often and how long a vendor task is polled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    /// Model generation: up to ten minutes.
    pub const MODEL: Self = Self {
        max_attempts: 120,
        interval: Duration::from_secs(3),
    };

    pub const TEXTURE: Self = Self {
        max_attempts: 60,
        interval: Duration::from_secs(2),
    };

    pub const IMAGE: Self = Self {
        max_attempts: 60,
        interval: Duration::from_secs(2),
    };

    pub fn for_kind(kind: TaskKind) -> Self {
        match kind {
            TaskKind::ImageTo3d => Self::MODEL,
            TaskKind::TextToTexture => Self::TEXTURE,
            TaskKind::ImageToImage => Self::IMAGE,
        }
    }

    pub fn with_interval(self, interval: Duration) -> Self {
        Self { interval, ..self }
    }
}

/// Reads task `id` until it succeeds, fails, reports an unknown status or
/// runs out of attempts.
///
/// There is no sleep after the final attempt.
pub async fn poll_until_done(
    api: &dyn TaskApi,
    kind: TaskKind,
    id: &str,
    policy: PollPolicy,
) -> ServiceResult<TaskRecord> {
    for attempt in 1..=policy.max_attempts {
        let record = api.get(kind, id).await?;
        tracing::debug!(%kind, task_id = id, attempt, status = %record.status, "polled vendor task");

        match &record.status {
            TaskStatus::Succeeded => {
                tracing::info!(%kind, task_id = id, attempt, "vendor task succeeded");
                return Ok(record);
            }
            TaskStatus::Failed => {
                return Err(ServiceError::TaskFailed {
                    kind,
                    detail: record.failure_detail(),
                });
            }
            status if status.is_running() => {
                if attempt < policy.max_attempts {
                    tokio::time::sleep(policy.interval).await;
                }
            }
            other => {
                return Err(ServiceError::UnknownStatus {
                    kind,
                    status: other.to_string(),
                });
            }
        }
    }

    tracing::warn!(%kind, task_id = id, attempts = policy.max_attempts, "vendor task timed out");
    Err(ServiceError::Timeout { kind })
}
