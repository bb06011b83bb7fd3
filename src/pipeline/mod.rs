//! Job pipeline: fetch, convert, archive, deliver
//!
//! [`Pipeline`] is the long-lived orchestrator. It owns the process-wide
//! worker pools and the injected capabilities (remote store, converter) and
//! drives one [`Job`](crate::types::Job) at a time per call, many calls
//! concurrently. Per-asset failures are absorbed inside the stages; the
//! orchestrator only fails a job when nothing remains to deliver or when a
//! job-scoped step (workspace, archive, upload) fails.

mod archive;
mod convert;
mod delivery;
mod fetch;

pub use archive::{ManifestEntry, archive_file_name, build_manifest, write_archive};
pub use delivery::{DeliveryPlan, PartSpec, ReconstructionTranscript, part_name};

use crate::config::Config;
use crate::converter::Converter;
use crate::error::{Error, Result};
use crate::feedback::Feedback;
use crate::retry;
use crate::store::RemoteStore;
use crate::types::{AssetRef, Job, JobKind, JobMode};
use crate::workspace::Workspace;
use convert::ConvertStage;
use delivery::ChunkedDelivery;
use fetch::FetchStage;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Long-lived job orchestrator
///
/// Construct once per process; the fetch and convert pools are shared by
/// every job the pipeline runs.
pub struct Pipeline {
    config: Config,
    store: Arc<dyn RemoteStore>,
    converter: Arc<dyn Converter>,
    fetch_slots: Arc<Semaphore>,
    convert_slots: Arc<Semaphore>,
}

impl Pipeline {
    /// Build a pipeline from validated configuration and injected
    /// capabilities
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the configuration is invalid.
    pub fn new(
        config: Config,
        store: Arc<dyn RemoteStore>,
        converter: Arc<dyn Converter>,
    ) -> Result<Self> {
        config.validate()?;
        let fetch_slots = Arc::new(Semaphore::new(config.concurrency.fetch_workers));
        let convert_slots = Arc::new(Semaphore::new(config.concurrency.convert_workers));
        tracing::info!(
            fetch_workers = config.concurrency.fetch_workers,
            convert_workers = config.concurrency.convert_workers,
            converter = converter.name(),
            "pipeline ready"
        );
        Ok(Self {
            config,
            store,
            converter,
            fetch_slots,
            convert_slots,
        })
    }

    /// The pipeline's configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run one job end to end
    ///
    /// The workspace is removed on every exit path. A failed job is reported
    /// through `feedback` as a single failure message and the error is also
    /// returned to the caller.
    ///
    /// # Errors
    ///
    /// Returns the first job-scoped failure: workspace creation, no eligible
    /// assets, empty archive, or an exhausted upload.
    pub async fn run_job(&self, job: &Job, feedback: Arc<dyn Feedback>) -> Result<()> {
        tracing::info!(
            job_id = %job.id,
            assets = job.assets.len(),
            mode = ?job.mode,
            kind = ?job.kind,
            "starting job"
        );

        let workspace = match Workspace::create(&self.config.workspace.root, &job.id) {
            Ok(ws) => ws,
            Err(e) => {
                tracing::error!(job_id = %job.id, error = %e, "failed to create workspace");
                feedback
                    .notify(&format!("Job {} failed: {}", job.id, e))
                    .await;
                return Err(e);
            }
        };

        let outcome = self.execute(job, &workspace, &feedback).await;
        if let Err(e) = &outcome {
            tracing::error!(job_id = %job.id, error = %e, "job failed");
            feedback
                .notify(&format!("Job {} failed: {}", job.id, e))
                .await;
        } else {
            tracing::info!(job_id = %job.id, "job completed");
        }
        workspace.teardown().await;
        outcome
    }

    async fn execute(
        &self,
        job: &Job,
        workspace: &Workspace,
        feedback: &Arc<dyn Feedback>,
    ) -> Result<()> {
        let assets = self.eligible_assets(job, feedback).await?;

        let fetched = FetchStage {
            store: Arc::clone(&self.store),
            slots: Arc::clone(&self.fetch_slots),
            policy: self.config.retry.policy(),
            source_extension: self.config.converter.source_extension.clone(),
        }
        .fetch_all(&assets, workspace, Arc::clone(feedback))
        .await;

        let converted = match job.kind {
            JobKind::Convert => {
                ConvertStage {
                    converter: Arc::clone(&self.converter),
                    slots: Arc::clone(&self.convert_slots),
                }
                .convert_all(&fetched, &job.params, workspace, Arc::clone(feedback))
                .await
            }
            JobKind::Export => Vec::new(),
        };

        feedback.notify("Packaging results...").await;
        let source_extension = &self.config.converter.source_extension;
        let manifest = build_manifest(job, &fetched, &converted, source_extension);
        let archive_name = archive_file_name(job, source_extension);
        let archive = write_archive(workspace.join(&archive_name), manifest).await?;

        let caption = match job.kind {
            JobKind::Convert => {
                format!("Task completed: {} -> {}", archive_name, job.params.format)
            }
            JobKind::Export => format!("Export completed: {archive_name}"),
        };
        ChunkedDelivery {
            policy: self.config.retry.upload_policy(),
            part_size: self.config.delivery.part_size,
        }
        .deliver(&archive, &caption, feedback)
        .await
    }

    /// Resolve the assets a job will actually process
    ///
    /// Set jobs are filtered through the store's eligibility metadata first;
    /// an asset whose metadata cannot be read is skipped like an ineligible
    /// one. Single jobs take their asset as-is.
    async fn eligible_assets(
        &self,
        job: &Job,
        feedback: &Arc<dyn Feedback>,
    ) -> Result<Vec<AssetRef>> {
        let assets = match job.mode {
            JobMode::Single => job.assets.clone(),
            JobMode::Set => {
                let policy = self.config.retry.policy();
                let mut eligible = Vec::with_capacity(job.assets.len());
                for asset in &job.assets {
                    let metadata = retry::execute(&policy, || {
                        self.store.metadata(&asset.remote_id)
                    })
                    .await;
                    match metadata {
                        Ok(m) if m.is_eligible => eligible.push(asset.clone()),
                        Ok(_) => {
                            tracing::debug!(
                                unique_id = %asset.unique_id,
                                "skipping ineligible asset"
                            );
                            feedback
                                .notify(&format!(
                                    "Skipping asset {}: not convertible",
                                    asset.unique_id
                                ))
                                .await;
                        }
                        Err(e) => {
                            tracing::warn!(
                                unique_id = %asset.unique_id,
                                error = %e,
                                "skipping asset with unreadable metadata"
                            );
                            feedback
                                .notify(&format!(
                                    "Skipping asset {}: {}",
                                    asset.unique_id, e
                                ))
                                .await;
                        }
                    }
                }
                eligible
            }
        };
        if assets.is_empty() {
            return Err(Error::NoEligibleAssets);
        }
        Ok(assets)
    }
}
