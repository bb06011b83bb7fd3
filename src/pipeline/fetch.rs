//! Fetch stage — bounded-concurrency download of a job's assets
//!
//! Fan-out/fan-in: every asset is fetched under a shared semaphore, each
//! fetch wrapped in the retry executor. A fetch that exhausts its retries is
//! recorded and logged, never raised — siblings and the job continue.

use crate::feedback::Feedback;
use crate::retry::{self, RetryPolicy};
use crate::store::RemoteStore;
use crate::types::{AssetRef, FetchResult};
use crate::workspace::Workspace;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Progress notification cadence: every 5th asset by input position
pub(crate) const PROGRESS_EVERY: usize = 5;

/// Bounded-concurrency fetch over a job's asset list
pub(crate) struct FetchStage {
    /// Remote store the assets are fetched from
    pub store: Arc<dyn RemoteStore>,
    /// Process-wide fetch permits, shared across concurrently running jobs
    pub slots: Arc<Semaphore>,
    /// Retry budget for each individual fetch
    pub policy: RetryPolicy,
    /// File extension of the source assets
    pub source_extension: String,
}

impl FetchStage {
    /// Local file name for one asset
    fn local_name(&self, asset: &AssetRef) -> String {
        format!("{}.{}", asset.unique_id, self.source_extension)
    }

    /// Fetch every asset, returning one result per asset in input order
    ///
    /// Completes only once every asset has either succeeded or exhausted its
    /// retries.
    pub async fn fetch_all(
        &self,
        assets: &[AssetRef],
        workspace: &Workspace,
        feedback: Arc<dyn Feedback>,
    ) -> Vec<FetchResult> {
        let total = assets.len();

        // Pre-filled with a placeholder so an aborted task still yields a
        // failed record instead of a hole in the barrier.
        let mut results: Vec<FetchResult> = assets
            .iter()
            .map(|asset| FetchResult {
                asset: asset.clone(),
                local_path: workspace.join(&self.local_name(asset)),
                error: Some("fetch task aborted".to_string()),
            })
            .collect();

        let mut tasks: JoinSet<(usize, FetchResult)> = JoinSet::new();
        for (index, asset) in assets.iter().enumerate() {
            let asset = asset.clone();
            let dest = workspace.join(&self.local_name(&asset));
            let store = Arc::clone(&self.store);
            let slots = Arc::clone(&self.slots);
            let policy = self.policy;
            let feedback = Arc::clone(&feedback);

            tasks.spawn(async move {
                let _permit = match slots.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            index,
                            FetchResult {
                                asset,
                                local_path: dest,
                                error: Some("fetch worker pool closed".to_string()),
                            },
                        );
                    }
                };

                if index % PROGRESS_EVERY == 0 {
                    feedback
                        .notify(&format!("Downloading asset {}/{}...", index + 1, total))
                        .await;
                }

                let outcome = retry::execute(&policy, || {
                    let store = Arc::clone(&store);
                    let remote_id = asset.remote_id.clone();
                    let dest = dest.clone();
                    async move { store.fetch_to(&remote_id, &dest).await }
                })
                .await;

                let result = match outcome {
                    Ok(()) => {
                        tracing::info!(unique_id = %asset.unique_id, "fetched asset");
                        FetchResult {
                            asset,
                            local_path: dest,
                            error: None,
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            unique_id = %asset.unique_id,
                            error = %e,
                            "failed to fetch asset"
                        );
                        FetchResult {
                            asset,
                            local_path: dest,
                            error: Some(e.to_string()),
                        }
                    }
                };
                (index, result)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, result)) => results[index] = result,
                Err(e) => tracing::error!(error = %e, "fetch task panicked"),
            }
        }

        results
    }
}
