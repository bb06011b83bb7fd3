//! Convert stage — bounded-concurrency conversion of fetched assets
//!
//! Consumes only the successful fetch results. Conversion failures are
//! absorbed per-asset exactly like fetch failures; a conversion is never
//! retried because a converter rarely fails transiently.

use super::fetch::PROGRESS_EVERY;
use crate::converter::{ConvertRequest, Converter};
use crate::feedback::Feedback;
use crate::types::{ConversionParams, ConvertResult, FetchResult};
use crate::workspace::Workspace;
use std::sync::Arc;
use tokio::sync::Semaphore;

/// Bounded-concurrency conversion over a job's fetched assets
pub(crate) struct ConvertStage {
    /// Conversion backend
    pub converter: Arc<dyn Converter>,
    /// Process-wide conversion permits, shared across concurrently running
    /// jobs
    pub slots: Arc<Semaphore>,
}

impl ConvertStage {
    /// Convert every successfully fetched asset
    ///
    /// Returns one result per *successful* fetch, in fetch order. Assets
    /// whose fetch failed are not represented here; the archiver joins the
    /// two result sets by unique id.
    pub async fn convert_all(
        &self,
        fetched: &[FetchResult],
        params: &ConversionParams,
        workspace: &Workspace,
        feedback: Arc<dyn Feedback>,
    ) -> Vec<ConvertResult> {
        let inputs: Vec<&FetchResult> = fetched.iter().filter(|f| f.is_ok()).collect();
        let total = inputs.len();

        let mut handles = Vec::with_capacity(total);
        for (index, fetch) in inputs.iter().enumerate() {
            let asset = fetch.asset.clone();
            let input = fetch.local_path.clone();
            let output =
                workspace.join(&format!("{}.{}", asset.unique_id, params.format.as_str()));
            let converter = Arc::clone(&self.converter);
            let slots = Arc::clone(&self.slots);
            let feedback = Arc::clone(&feedback);
            let params = *params;

            handles.push(tokio::spawn(async move {
                let _permit = match slots.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return ConvertResult {
                            asset,
                            local_path: output,
                            error: Some("convert worker pool closed".to_string()),
                        };
                    }
                };

                if index % PROGRESS_EVERY == 0 {
                    feedback
                        .notify(&format!("Converting asset {}/{}...", index + 1, total))
                        .await;
                }

                let request = ConvertRequest {
                    input,
                    output: output.clone(),
                    width: params.width,
                    height: params.height,
                    frame_rate: params.frame_rate,
                    quality: params.clamped_quality(),
                    format: params.format,
                };

                match converter.convert(&request).await {
                    Ok(()) => {
                        tracing::info!(unique_id = %asset.unique_id, "converted asset");
                        ConvertResult {
                            asset,
                            local_path: output,
                            error: None,
                        }
                    }
                    Err(e) => {
                        tracing::error!(
                            unique_id = %asset.unique_id,
                            error = %e,
                            "failed to convert asset"
                        );
                        ConvertResult {
                            asset,
                            local_path: output,
                            error: Some(e.to_string()),
                        }
                    }
                }
            }));
        }

        // join_all preserves spawn order, so results align with `inputs`.
        let joined = futures::future::join_all(handles).await;
        joined
            .into_iter()
            .zip(inputs)
            .map(|(outcome, fetch)| match outcome {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "convert task panicked");
                    ConvertResult {
                        asset: fetch.asset.clone(),
                        local_path: workspace
                            .join(&format!("{}.{}", fetch.asset.unique_id, params.format.as_str())),
                        error: Some("convert task aborted".to_string()),
                    }
                }
            })
            .collect()
    }
}
