//! Configuration types for sticker-dl

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Workspace settings (per-job temporary storage)
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Directory under which per-job workspaces are created (default: "./tmp")
    #[serde(default = "default_workspace_root")]
    pub root: PathBuf,
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_workspace_root(),
        }
    }
}

/// Worker-pool sizes for the two pipeline stages
///
/// The pools are process-wide: concurrently running jobs share the same
/// permits, bounding total resource pressure rather than per-job fairness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    /// Maximum concurrent fetches (default: 15; fetch is I/O-bound)
    #[serde(default = "default_fetch_workers")]
    pub fetch_workers: usize,

    /// Maximum concurrent conversions (default: 5, intentionally lower than
    /// `fetch_workers` because conversion is CPU/process-bound)
    #[serde(default = "default_convert_workers")]
    pub convert_workers: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self {
            fetch_workers: default_fetch_workers(),
            convert_workers: default_convert_workers(),
        }
    }
}

/// Retry configuration for transient failures
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempt budget for remote fetch/metadata operations (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff unit: attempt `n` waits `backoff_unit * n` unless the
    /// failure carries a server-specified delay (default: 1 second)
    #[serde(default = "default_backoff_unit", with = "duration_serde")]
    pub backoff_unit: Duration,

    /// Attempt budget for uploads, direct or per chunk (default: 5)
    #[serde(default = "default_upload_attempts")]
    pub upload_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_unit: default_backoff_unit(),
            upload_attempts: default_upload_attempts(),
        }
    }
}

/// Archive delivery settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Transport size limit per upload in bytes; archives larger than this
    /// are split into sequentially numbered parts (default: 50,000,000)
    #[serde(default = "default_part_size")]
    pub part_size: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            part_size: default_part_size(),
        }
    }
}

/// External converter settings (script table and source format)
///
/// Conversion scripts live at `{script_dir}/{platform}/lottie_to_{format}.sh`
/// and are resolved once at startup; an unsupported host fails fast.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConverterConfig {
    /// Directory containing per-platform conversion scripts (default: "lib")
    #[serde(default = "default_script_dir")]
    pub script_dir: PathBuf,

    /// File extension of the source assets (default: "tgs")
    #[serde(default = "default_source_extension")]
    pub source_extension: String,

    /// Platform override, e.g. "linux_amd64"; detected from the host when None
    #[serde(default)]
    pub platform: Option<String>,
}

impl Default for ConverterConfig {
    fn default() -> Self {
        Self {
            script_dir: default_script_dir(),
            source_extension: default_source_extension(),
            platform: None,
        }
    }
}

/// Main configuration for the pipeline
///
/// Fields are organized into logical sub-configs. All sub-config fields are
/// flattened for serialization, so the JSON format stays flat (no nesting),
/// and every field has a default — `Config::default()` works out of the box.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Per-job workspace settings
    #[serde(flatten)]
    pub workspace: WorkspaceConfig,

    /// Worker-pool sizes
    #[serde(flatten)]
    pub concurrency: ConcurrencyConfig,

    /// Retry budgets and backoff
    #[serde(default)]
    pub retry: RetryConfig,

    /// Archive delivery limits
    #[serde(flatten)]
    pub delivery: DeliveryConfig,

    /// External converter settings
    #[serde(flatten)]
    pub converter: ConverterConfig,
}

impl Config {
    /// Load configuration from a JSON file
    ///
    /// Missing fields fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| Error::Config {
            message: format!("failed to parse {}: {}", path.display(), e),
            key: None,
        })
    }

    /// Validate settings that would otherwise fail deep inside a job
    pub fn validate(&self) -> Result<()> {
        if self.concurrency.fetch_workers == 0 {
            return Err(Error::Config {
                message: "fetch_workers must be at least 1".into(),
                key: Some("fetch_workers".into()),
            });
        }
        if self.concurrency.convert_workers == 0 {
            return Err(Error::Config {
                message: "convert_workers must be at least 1".into(),
                key: Some("convert_workers".into()),
            });
        }
        if self.retry.max_attempts == 0 {
            return Err(Error::Config {
                message: "max_attempts must be at least 1".into(),
                key: Some("retry.max_attempts".into()),
            });
        }
        if self.retry.upload_attempts == 0 {
            return Err(Error::Config {
                message: "upload_attempts must be at least 1".into(),
                key: Some("retry.upload_attempts".into()),
            });
        }
        if self.delivery.part_size == 0 {
            return Err(Error::Config {
                message: "part_size must be at least 1 byte".into(),
                key: Some("part_size".into()),
            });
        }
        Ok(())
    }
}

fn default_workspace_root() -> PathBuf {
    PathBuf::from("./tmp")
}

fn default_fetch_workers() -> usize {
    15
}

fn default_convert_workers() -> usize {
    5
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_unit() -> Duration {
    Duration::from_secs(1)
}

fn default_upload_attempts() -> u32 {
    5
}

fn default_part_size() -> u64 {
    50_000_000
}

fn default_script_dir() -> PathBuf {
    PathBuf::from("lib")
}

fn default_source_extension() -> String {
    "tgs".to_string()
}

// Duration serialization helper (seconds as u64)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
