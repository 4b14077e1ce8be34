use super::meshy::DEFAULT_API_BASE;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_BUCKET: &str = "christmas-images";

/// Errors from reading the service environment.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {var}")]
    Invalid { var: &'static str, value: String },
}

/// Which vendor chain produces the festive image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PipelineMode {
    #[default]
    ImageTo3d,
    ImageToImage,
}

/// What to do when no vendor key is configured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MissingKeyPolicy {
    /// Store the original photo and report the degradation.
    #[default]
    PassThrough,
    /// Answer 503.
    Reject,
}

/// What to do when storing the vendor output fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UploadFailurePolicy {
    /// Return the vendor's own URL and report the degradation.
    #[default]
    RemoteUrl,
    /// Answer 500.
    Fail,
}

macro_rules! parse_names {
    ($ty:ty { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s.trim().to_ascii_lowercase().as_str() {
                    $($name => Ok($variant),)+
                    _ => Err(s.to_string()),
                }
            }
        }
    };
}

parse_names!(PipelineMode {
    "image-to-3d" => PipelineMode::ImageTo3d,
    "image-to-image" => PipelineMode::ImageToImage,
});

parse_names!(MissingKeyPolicy {
    "pass-through" => MissingKeyPolicy::PassThrough,
    "reject" => MissingKeyPolicy::Reject,
});

parse_names!(UploadFailurePolicy {
    "remote-url" => UploadFailurePolicy::RemoteUrl,
    "fail" => UploadFailurePolicy::Fail,
});

/// Settings of the transform function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub supabase_url: String,
    pub service_role_key: String,
    pub meshy_api_key: Option<String>,
    pub meshy_api_base: String,
    pub bucket: String,
    pub pipeline: PipelineMode,
    pub missing_key: MissingKeyPolicy,
    pub upload_failure: UploadFailurePolicy,
    /// Replaces every stage's polling interval when set.
    pub poll_interval: Option<Duration>,
}

impl ServiceConfig {
    pub fn new(supabase_url: impl Into<String>, service_role_key: impl Into<String>) -> Self {
        Self {
            supabase_url: supabase_url.into(),
            service_role_key: service_role_key.into(),
            meshy_api_key: None,
            meshy_api_base: DEFAULT_API_BASE.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
            pipeline: PipelineMode::default(),
            missing_key: MissingKeyPolicy::default(),
            upload_failure: UploadFailurePolicy::default(),
            poll_interval: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Reads settings through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        let required = |var: &'static str| get(var).ok_or(ConfigError::Missing(var));

        let mut config = Self::new(
            required("SUPABASE_URL")?,
            required("SUPABASE_SERVICE_ROLE_KEY")?,
        );
        config.meshy_api_key = get("MESHY_API_KEY");
        if let Some(base) = get("MESHY_API_BASE") {
            config.meshy_api_base = base;
        }
        if let Some(bucket) = get("TRANSFORM_BUCKET") {
            config.bucket = bucket;
        }
        if let Some(value) = get("TRANSFORM_PIPELINE") {
            config.pipeline = parse("TRANSFORM_PIPELINE", &value)?;
        }
        if let Some(value) = get("TRANSFORM_MISSING_KEY") {
            config.missing_key = parse("TRANSFORM_MISSING_KEY", &value)?;
        }
        if let Some(value) = get("TRANSFORM_UPLOAD_FAILURE") {
            config.upload_failure = parse("TRANSFORM_UPLOAD_FAILURE", &value)?;
        }
        if let Some(value) = get("TRANSFORM_POLL_INTERVAL_MS") {
            let millis: u64 = parse("TRANSFORM_POLL_INTERVAL_MS", &value)?;
            config.poll_interval = Some(Duration::from_millis(millis));
        }

        tracing::debug!(
            pipeline = ?config.pipeline,
            vendor_configured = config.meshy_api_key.is_some(),
            bucket = %config.bucket,
            "service configuration loaded"
        );
        Ok(config)
    }
}

fn parse<T: FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        var,
        value: value.to_string(),
    })
}
