//! Delivery stage — direct upload or chunked split of the finished archive
//!
//! Archives at or under the configured part size go out as a single file.
//! Larger ones are split into fixed-size parts streamed sequentially, each
//! uploaded under the upload retry budget, followed by a reconstruction
//! transcript telling the recipient how to reassemble the original file.

use crate::error::{Error, Result};
use crate::feedback::{BinaryPayload, Feedback};
use crate::retry::{self, RetryPolicy};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// One contiguous byte range of the archive, half-open `[start, end)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PartSpec {
    /// Zero-based part index
    pub index: usize,
    /// First byte of the part
    pub start: u64,
    /// One past the last byte of the part
    pub end: u64,
}

impl PartSpec {
    /// Length of the part in bytes
    pub fn len(&self) -> u64 {
        self.end - self.start
    }

    /// Whether the part covers no bytes
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Split geometry for one archive
#[derive(Clone, Debug)]
pub struct DeliveryPlan {
    /// Total archive size in bytes
    pub total_size: u64,
    /// Maximum bytes per part
    pub part_size: u64,
    /// The parts, in index order; every part but the last is exactly
    /// `part_size` bytes
    pub parts: Vec<PartSpec>,
}

impl DeliveryPlan {
    /// Compute the plan for an archive of `total_size` bytes
    ///
    /// An archive at or under `part_size` yields a single part covering the
    /// whole file.
    pub fn compute(total_size: u64, part_size: u64) -> Self {
        let count = if total_size == 0 {
            1
        } else {
            total_size.div_ceil(part_size).max(1)
        };
        let parts = (0..count)
            .map(|i| PartSpec {
                index: i as usize,
                start: i * part_size,
                end: ((i + 1) * part_size).min(total_size),
            })
            .collect();
        Self {
            total_size,
            part_size,
            parts,
        }
    }

    /// Whether the archive must be delivered in parts
    pub fn is_split(&self) -> bool {
        self.parts.len() > 1
    }
}

/// File name for one part: `{archive}.partNN`, zero-based
pub fn part_name(archive_name: &str, index: usize) -> String {
    format!("{archive_name}.part{index:02}")
}

/// Per-platform commands that reassemble a split archive
#[derive(Clone, Debug)]
pub struct ReconstructionTranscript {
    /// `copy /b` command for Windows shells
    pub windows: String,
    /// `cat` command for Linux shells
    pub linux: String,
    /// `cat` command for macOS shells
    pub macos: String,
}

impl ReconstructionTranscript {
    /// Build the transcript for `archive_name` reassembled from `parts`
    /// (in index order)
    pub fn new(archive_name: &str, parts: &[String]) -> Self {
        let windows = format!("copy /b {} {}", parts.join(" + "), archive_name);
        let unix = format!("cat {} > {}", parts.join(" "), archive_name);
        Self {
            windows,
            linux: unix.clone(),
            macos: unix,
        }
    }

    /// Render the transcript as one notification message
    pub fn to_message(&self) -> String {
        format!(
            "All parts uploaded. Run the command for your platform in the \
             directory containing the parts to rebuild the archive:\n\
             Windows: {}\nLinux: {}\nmacOS: {}",
            self.windows, self.linux, self.macos
        )
    }
}

/// Uploads one finished archive, splitting it when it exceeds the part size
pub(crate) struct ChunkedDelivery {
    /// Retry budget for each upload call
    pub policy: RetryPolicy,
    /// Maximum bytes per uploaded file
    pub part_size: u64,
}

impl ChunkedDelivery {
    /// Deliver `archive` with `caption`, splitting if necessary
    ///
    /// # Errors
    ///
    /// Returns an error when the archive cannot be sized or read, or when an
    /// upload exhausts its retries. A failed part aborts the remaining parts.
    pub async fn deliver(
        &self,
        archive: &Path,
        caption: &str,
        feedback: &Arc<dyn Feedback>,
    ) -> Result<()> {
        let total_size = tokio::fs::metadata(archive).await?.len();
        let plan = DeliveryPlan::compute(total_size, self.part_size);

        if !plan.is_split() {
            tracing::info!(
                archive = %archive.display(),
                bytes = total_size,
                "uploading archive"
            );
            let payload = BinaryPayload::File(archive.to_path_buf());
            return retry::execute(&self.policy, || feedback.send_binary(&payload, caption))
                .await;
        }

        let archive_name = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| Error::Packaging {
                archive: archive.to_path_buf(),
                reason: "archive path has no file name".to_string(),
            })?;
        let part_count = plan.parts.len();
        tracing::info!(
            archive = %archive.display(),
            bytes = total_size,
            parts = part_count,
            "splitting archive for delivery"
        );
        feedback
            .notify(&format!(
                "Archive is {:.1} MB, splitting into {} parts...",
                total_size as f64 / 1_000_000.0,
                part_count
            ))
            .await;

        // Sequential read keeps at most one part's bytes in memory.
        let mut file = tokio::fs::File::open(archive).await?;
        let mut names = Vec::with_capacity(part_count);
        for part in &plan.parts {
            let mut data = vec![0u8; part.len() as usize];
            file.read_exact(&mut data).await?;

            let name = part_name(&archive_name, part.index);
            names.push(name.clone());
            let payload = BinaryPayload::Bytes { name, data };
            let part_caption = format!("{caption}\n(Part {} of {})", part.index + 1, part_count);
            retry::execute(&self.policy, || feedback.send_binary(&payload, &part_caption))
                .await?;
        }

        let transcript = ReconstructionTranscript::new(&archive_name, &names);
        feedback.notify(&transcript.to_message()).await;
        Ok(())
    }
}
