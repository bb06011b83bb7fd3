//! Trait and request type for the conversion capability

use crate::error::Result;
use crate::types::OutputFormat;
use async_trait::async_trait;
use std::path::PathBuf;

/// One conversion invocation
#[derive(Clone, Debug)]
pub struct ConvertRequest {
    /// Path to the fetched source file
    pub input: PathBuf,
    /// Path the converted output must be written to
    pub output: PathBuf,
    /// Output width in pixels; 0 together with `height == 0` means
    /// source-native dimensions, resolved by the converter
    pub width: u32,
    /// Output height in pixels (see `width`)
    pub height: u32,
    /// Output frame rate
    pub frame_rate: u32,
    /// Output quality percentage; clamped to [1, 100] before invocation
    pub quality: u8,
    /// Target output format
    pub format: OutputFormat,
}

/// Trait for converting one source asset into the target format
///
/// Conversion is blocking, process-bound work; implementations must run it
/// in a dedicated execution slot (e.g. `spawn_blocking`) so it never
/// occupies the cooperative scheduler driving fetch and upload I/O.
///
/// # Examples
///
/// ```no_run
/// use sticker_dl::converter::{CliConverter, Converter, ConvertRequest};
/// use sticker_dl::config::ConverterConfig;
/// use sticker_dl::types::OutputFormat;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let converter = CliConverter::resolve(&ConverterConfig::default())?;
/// converter
///     .convert(&ConvertRequest {
///         input: "u1.tgs".into(),
///         output: "u1.gif".into(),
///         width: 512,
///         height: 512,
///         frame_rate: 60,
///         quality: 90,
///         format: OutputFormat::Gif,
///     })
///     .await?;
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert one asset
    ///
    /// # Errors
    ///
    /// Returns an error if the converter exits non-zero, cannot be spawned,
    /// or the requested format has no tooling on this host. Conversion
    /// failures are absorbed per-asset by the pipeline, never retried.
    async fn convert(&self, request: &ConvertRequest) -> Result<()>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
