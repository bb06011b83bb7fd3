//! Core types for the sticker pipeline

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifies one fetchable asset in the remote store
///
/// Immutable once created; identity (`unique_id`) is unique within a job.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    /// Opaque ID used to fetch the asset from the remote store
    pub remote_id: String,
    /// Stable unique ID, used for local file names and archive paths
    pub unique_id: String,
    /// Name of the collection (sticker set) the asset belongs to
    pub collection: String,
}

/// Output format produced by the converter
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Animated GIF
    Gif,
    /// PNG (first frame)
    Png,
    /// Animated WebP
    Webp,
    /// Animated PNG
    Apng,
}

impl OutputFormat {
    /// Lowercase name, used both as file extension and archive subfolder
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Gif => "gif",
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
            OutputFormat::Apng => "apng",
        }
    }

    /// All supported formats, in tool-table resolution order
    pub fn all() -> [OutputFormat; 4] {
        [
            OutputFormat::Gif,
            OutputFormat::Png,
            OutputFormat::Webp,
            OutputFormat::Apng,
        ]
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Conversion parameters, fixed for the duration of a job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionParams {
    /// Target output format
    pub format: OutputFormat,
    /// Output quality percentage, clamped to [1, 100] at invocation time
    pub quality: u8,
    /// Output width in pixels; 0 together with `height == 0` means
    /// source-native dimensions, resolved by the converter
    pub width: u32,
    /// Output height in pixels (see `width`)
    pub height: u32,
    /// Output frame rate
    pub frame_rate: u32,
}

impl ConversionParams {
    /// Quality clamped into the converter's accepted range [1, 100]
    pub fn clamped_quality(&self) -> u8 {
        self.quality.clamp(1, 100)
    }

    /// True when the caller asked for source-native output dimensions
    pub fn native_dimensions(&self) -> bool {
        self.width == 0 && self.height == 0
    }
}

/// Whether a job covers one asset or a whole collection
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// One asset
    Single,
    /// An ordered collection of assets, filtered for convertibility first
    Set,
}

/// Whether a job converts assets or only exports the source files
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Fetch, convert, and package converted outputs alongside originals
    Convert,
    /// Fetch and package the source files only (no conversion)
    Export,
}

/// One end-to-end request: a set of assets plus one parameter set
///
/// Created when a request is accepted; all of its state lives in memory and
/// is dropped when the orchestrator returns.
#[derive(Clone, Debug)]
pub struct Job {
    /// Caller-assigned ID, unique across concurrently running jobs; the
    /// workspace directory name is derived from it
    pub id: String,
    /// Assets to process, in delivery order
    pub assets: Vec<AssetRef>,
    /// Conversion parameters shared by every asset in the job
    pub params: ConversionParams,
    /// Single asset or whole set
    pub mode: JobMode,
    /// Convert or export-only
    pub kind: JobKind,
}

/// Metadata for one remote asset, as reported by the store
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AssetMetadata {
    /// Size of the asset in bytes
    pub byte_size: u64,
    /// Whether the asset is convertible (e.g., an animated sticker)
    pub is_eligible: bool,
}

/// Outcome of fetching one asset
///
/// A failed fetch is recorded, not raised: the asset is excluded from later
/// stages and the job continues with the rest.
#[derive(Clone, Debug)]
pub struct FetchResult {
    /// The asset this result belongs to
    pub asset: AssetRef,
    /// Where the fetched bytes were written (only meaningful when ok)
    pub local_path: PathBuf,
    /// Why the fetch failed, if it did
    pub error: Option<String>,
}

impl FetchResult {
    /// True when the asset was fetched successfully
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Outcome of converting one asset; same exclusion-not-abort policy as
/// [`FetchResult`]
#[derive(Clone, Debug)]
pub struct ConvertResult {
    /// The asset this result belongs to
    pub asset: AssetRef,
    /// Where the converted output was written (only meaningful when ok)
    pub local_path: PathBuf,
    /// Why the conversion failed, if it did
    pub error: Option<String>,
}

impl ConvertResult {
    /// True when the asset was converted successfully
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
