//! # sticker-dl
//!
//! Batch pipeline that fetches animation assets from a remote store,
//! converts them to raster/animated formats through external per-platform
//! tools, packages the results into a structured zip archive, and delivers
//! the archive over a size-limited transport, splitting it into parts when
//! needed.
//!
//! ## Architecture
//!
//! A [`Pipeline`] is constructed once per process with three injected
//! capabilities:
//!
//! - [`RemoteStore`] — where assets and their metadata come from
//! - [`Converter`](converter::Converter) — turns one source file into one
//!   output file ([`CliConverter`](converter::CliConverter) shells out to
//!   the per-platform conversion scripts)
//! - [`Feedback`] — progress notifications and binary delivery to the
//!   requester
//!
//! Each [`Job`](types::Job) then runs through four stages inside a
//! throwaway per-job [`Workspace`]: fetch (bounded fan-out with retries),
//! convert (bounded fan-out, no retries), archive (manifest + zip), and
//! delivery (direct or chunked upload). Per-asset failures are absorbed so
//! one bad asset never sinks its siblings; the job fails only when nothing
//! is left to deliver or a job-scoped step breaks.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use sticker_dl::config::Config;
//! use sticker_dl::converter::CliConverter;
//! use sticker_dl::pipeline::Pipeline;
//!
//! # async fn example(
//! #     store: Arc<dyn sticker_dl::store::RemoteStore>,
//! #     feedback: Arc<dyn sticker_dl::feedback::Feedback>,
//! #     job: sticker_dl::types::Job,
//! # ) -> Result<(), sticker_dl::error::Error> {
//! let config = Config::default();
//! let converter = Arc::new(CliConverter::resolve(&config.converter)?);
//! let pipeline = Pipeline::new(config, store, converter)?;
//! pipeline.run_job(&job, feedback).await?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

pub mod config;
pub mod converter;
pub mod error;
pub mod feedback;
pub mod pipeline;
pub mod retry;
pub mod store;
pub mod types;
pub mod workspace;

pub use config::Config;
pub use error::{Error, Result};
pub use feedback::{BinaryPayload, Feedback};
pub use pipeline::Pipeline;
pub use store::RemoteStore;
pub use types::{AssetRef, ConversionParams, Job, JobKind, JobMode, OutputFormat};
pub use workspace::Workspace;
