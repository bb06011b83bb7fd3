//! Archive stage — manifest assembly and zip creation
//!
//! The manifest is computed from the fetch and convert result sets, joined
//! by unique id in the job's asset order. An asset that failed anywhere
//! upstream simply contributes no entries; only a manifest with nothing in
//! it at all aborts the job.

use crate::error::{Error, Result};
use crate::types::{ConvertResult, FetchResult, Job, JobKind, JobMode};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

/// One file destined for the archive
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Path inside the archive, `/`-separated
    pub internal_path: String,
    /// File on disk holding the bytes
    pub source_path: PathBuf,
}

/// Name of the archive for one job
///
/// Set jobs are named after the collection, single-asset jobs additionally
/// carry the asset's unique id. Export archives get the source extension as
/// a suffix so they never collide with a converted archive of the same
/// collection.
pub fn archive_file_name(job: &Job, source_extension: &str) -> String {
    let collection = job
        .assets
        .first()
        .map(|a| a.collection.as_str())
        .unwrap_or(job.id.as_str());
    match (job.mode, job.kind) {
        (JobMode::Set, JobKind::Convert) => format!("{collection}.zip"),
        (JobMode::Single, JobKind::Convert) => {
            let uid = job.assets.first().map(|a| a.unique_id.as_str()).unwrap_or("asset");
            format!("{collection}_{uid}.zip")
        }
        (JobMode::Set, JobKind::Export) => format!("{collection}_{source_extension}.zip"),
        (JobMode::Single, JobKind::Export) => {
            let uid = job.assets.first().map(|a| a.unique_id.as_str()).unwrap_or("asset");
            format!("{collection}_{uid}_{source_extension}.zip")
        }
    }
}

/// Assemble the archive manifest for one job
///
/// Convert jobs lay assets out as `{collection}/{format}/{uid}.{format}`
/// with the source file alongside under `{collection}/original/`; the
/// original is included only when its conversion succeeded. Export jobs
/// carry the originals only.
pub fn build_manifest(
    job: &Job,
    fetched: &[FetchResult],
    converted: &[ConvertResult],
    source_extension: &str,
) -> Vec<ManifestEntry> {
    let fetch_ok: HashMap<&str, &FetchResult> = fetched
        .iter()
        .filter(|f| f.is_ok())
        .map(|f| (f.asset.unique_id.as_str(), f))
        .collect();
    let convert_ok: HashMap<&str, &ConvertResult> = converted
        .iter()
        .filter(|c| c.is_ok())
        .map(|c| (c.asset.unique_id.as_str(), c))
        .collect();

    let mut manifest = Vec::new();
    for asset in &job.assets {
        let uid = asset.unique_id.as_str();
        let collection = &asset.collection;
        match job.kind {
            JobKind::Convert => {
                // Conversion implies a successful fetch, so both entries
                // appear together or not at all.
                if let (Some(conv), Some(fetch)) = (convert_ok.get(uid), fetch_ok.get(uid)) {
                    let format = job.params.format.as_str();
                    manifest.push(ManifestEntry {
                        internal_path: format!("{collection}/{format}/{uid}.{format}"),
                        source_path: conv.local_path.clone(),
                    });
                    manifest.push(ManifestEntry {
                        internal_path: format!(
                            "{collection}/original/{uid}.{source_extension}"
                        ),
                        source_path: fetch.local_path.clone(),
                    });
                }
            }
            JobKind::Export => {
                if let Some(fetch) = fetch_ok.get(uid) {
                    manifest.push(ManifestEntry {
                        internal_path: format!(
                            "{collection}/original/{uid}.{source_extension}"
                        ),
                        source_path: fetch.local_path.clone(),
                    });
                }
            }
        }
    }
    manifest
}

/// Write the manifest into a zip archive at `archive_path`
///
/// Runs on the blocking pool; the zip crate's writer is synchronous.
///
/// # Errors
///
/// Returns [`Error::Packaging`] when the manifest is empty or any entry
/// cannot be read or written.
pub async fn write_archive(
    archive_path: PathBuf,
    manifest: Vec<ManifestEntry>,
) -> Result<PathBuf> {
    if manifest.is_empty() {
        return Err(Error::Packaging {
            archive: archive_path,
            reason: "archive would be empty: no assets completed processing".to_string(),
        });
    }

    let path = archive_path.clone();
    let entries = manifest.len();
    tokio::task::spawn_blocking(move || -> Result<PathBuf> {
        let packaging = |reason: String| Error::Packaging {
            archive: path.clone(),
            reason,
        };

        let file = std::fs::File::create(&path)
            .map_err(|e| packaging(format!("failed to create archive: {e}")))?;
        let mut zip = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &manifest {
            zip.start_file(entry.internal_path.clone(), options)
                .map_err(|e| packaging(format!("failed to add {}: {e}", entry.internal_path)))?;
            let mut source = std::fs::File::open(&entry.source_path).map_err(|e| {
                packaging(format!(
                    "failed to read {}: {e}",
                    entry.source_path.display()
                ))
            })?;
            std::io::copy(&mut source, &mut zip)
                .map_err(|e| packaging(format!("failed to write {}: {e}", entry.internal_path)))?;
        }
        zip.finish()
            .map_err(|e| packaging(format!("failed to finalize archive: {e}")))?
            .flush()
            .map_err(|e| packaging(format!("failed to flush archive: {e}")))?;

        tracing::info!(archive = %path.display(), entries, "wrote archive");
        Ok(path)
    })
    .await
    .map_err(|e| Error::Packaging {
        archive: archive_path,
        reason: format!("archive task panicked: {e}"),
    })?
}
