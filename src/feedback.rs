//! Feedback channel capability
//!
//! The pipeline reports progress and delivers binaries through this trait.
//! Text notifications are best-effort fire-and-forget; binary sends are the
//! delivery primitive and their failures matter (they are retried and can
//! fail the job).

use crate::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;

/// One binary to send over the delivery channel
#[derive(Clone, Debug)]
pub enum BinaryPayload {
    /// A file on disk, sent whole (direct upload of the archive)
    File(PathBuf),
    /// An in-memory part with its transport-visible file name (split upload)
    Bytes {
        /// Name the receiver sees, e.g. `pack.zip.part01`
        name: String,
        /// The part's bytes
        data: Vec<u8>,
    },
}

impl BinaryPayload {
    /// Transport-visible name of the payload
    pub fn name(&self) -> String {
        match self {
            BinaryPayload::File(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            BinaryPayload::Bytes { name, .. } => name.clone(),
        }
    }
}

/// Capability for reporting back to the requester
#[async_trait]
pub trait Feedback: Send + Sync {
    /// Send a status line; best-effort, failures are swallowed by the
    /// implementation
    async fn notify(&self, text: &str);

    /// Send one binary with a caption
    ///
    /// Takes the payload by reference so a retried send does not re-clone
    /// chunk data.
    ///
    /// # Errors
    ///
    /// Returns an error if the transport rejects the upload; transient
    /// failures (rate limits, timeouts) are retried by the caller.
    async fn send_binary(&self, payload: &BinaryPayload, caption: &str) -> Result<()>;
}
