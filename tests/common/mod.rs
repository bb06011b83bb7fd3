//! Shared fixtures for the pipeline integration tests
//!
//! Everything external is replaced by in-memory fakes injected through the
//! crate's capability traits, so the tests exercise the real pipeline with
//! no network and no conversion binaries.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use sticker_dl::config::Config;
use sticker_dl::converter::{ConvertRequest, Converter};
use sticker_dl::error::{Error, Result};
use sticker_dl::feedback::{BinaryPayload, Feedback};
use sticker_dl::store::RemoteStore;
use sticker_dl::types::{
    AssetMetadata, AssetRef, ConversionParams, Job, JobKind, JobMode, OutputFormat,
};

/// In-memory remote store: a map of remote id to bytes plus eligibility
pub struct MockStore {
    assets: HashMap<String, (Vec<u8>, bool)>,
    fail_fetch: HashSet<String>,
}

impl MockStore {
    pub fn new() -> Self {
        Self {
            assets: HashMap::new(),
            fail_fetch: HashSet::new(),
        }
    }

    pub fn with_asset(mut self, remote_id: &str, bytes: &[u8], eligible: bool) -> Self {
        self.assets
            .insert(remote_id.to_string(), (bytes.to_vec(), eligible));
        self
    }

    /// Make every fetch of `remote_id` fail with a transport error
    pub fn failing_fetch(mut self, remote_id: &str) -> Self {
        self.fail_fetch.insert(remote_id.to_string());
        self
    }
}

#[async_trait]
impl RemoteStore for MockStore {
    async fn metadata(&self, remote_id: &str) -> Result<AssetMetadata> {
        let (bytes, eligible) = self
            .assets
            .get(remote_id)
            .ok_or_else(|| Error::Transport(format!("unknown asset {remote_id}")))?;
        Ok(AssetMetadata {
            byte_size: bytes.len() as u64,
            is_eligible: *eligible,
        })
    }

    async fn fetch_to(&self, remote_id: &str, dest: &Path) -> Result<()> {
        if self.fail_fetch.contains(remote_id) {
            return Err(Error::Transport(format!("connection reset: {remote_id}")));
        }
        let (bytes, _) = self
            .assets
            .get(remote_id)
            .ok_or_else(|| Error::Transport(format!("unknown asset {remote_id}")))?;
        tokio::fs::write(dest, bytes).await?;
        Ok(())
    }
}

/// Converter stub that prefixes the source bytes with a marker
pub struct StubConverter {
    fail_ids: HashSet<String>,
}

pub const CONVERTED_MARKER: &[u8] = b"CONVERTED:";

impl StubConverter {
    pub fn new() -> Self {
        Self {
            fail_ids: HashSet::new(),
        }
    }

    /// Make conversion of the asset with this unique id fail
    pub fn failing(mut self, unique_id: &str) -> Self {
        self.fail_ids.insert(unique_id.to_string());
        self
    }
}

#[async_trait]
impl Converter for StubConverter {
    async fn convert(&self, request: &ConvertRequest) -> Result<()> {
        let stem = request
            .input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if self.fail_ids.contains(&stem) {
            return Err(Error::Converter {
                unique_id: stem,
                reason: "converter exited with exit status: 1: boom".to_string(),
            });
        }
        let source = tokio::fs::read(&request.input).await?;
        let mut out = CONVERTED_MARKER.to_vec();
        out.extend_from_slice(&source);
        tokio::fs::write(&request.output, out).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "stub"
    }
}

/// Feedback sink recording every notification and upload
///
/// File payloads are read from disk at send time, before the workspace is
/// torn down, so assertions can inspect the delivered bytes afterwards.
pub struct RecordingFeedback {
    pub notes: Mutex<Vec<String>>,
    pub deliveries: Mutex<Vec<Delivery>>,
}

pub struct Delivery {
    pub name: String,
    pub bytes: Vec<u8>,
    pub caption: String,
}

impl RecordingFeedback {
    pub fn new() -> Self {
        Self {
            notes: Mutex::new(Vec::new()),
            deliveries: Mutex::new(Vec::new()),
        }
    }

    pub fn notes(&self) -> Vec<String> {
        self.notes.lock().unwrap().clone()
    }
}

#[async_trait]
impl Feedback for RecordingFeedback {
    async fn notify(&self, text: &str) {
        self.notes.lock().unwrap().push(text.to_string());
    }

    async fn send_binary(&self, payload: &BinaryPayload, caption: &str) -> Result<()> {
        let bytes = match payload {
            BinaryPayload::File(path) => tokio::fs::read(path).await?,
            BinaryPayload::Bytes { data, .. } => data.clone(),
        };
        self.deliveries.lock().unwrap().push(Delivery {
            name: payload.name(),
            bytes,
            caption: caption.to_string(),
        });
        Ok(())
    }
}

/// Config rooted in a throwaway directory, with fast retries
pub fn test_config(workspace_root: &Path) -> Config {
    let mut config = Config::default();
    config.workspace.root = workspace_root.to_path_buf();
    config.retry.backoff_unit = Duration::from_millis(1);
    config
}

pub fn asset(i: usize, collection: &str) -> AssetRef {
    AssetRef {
        remote_id: format!("remote-{i}"),
        unique_id: format!("u{i}"),
        collection: collection.to_string(),
    }
}

pub fn job(id: &str, assets: Vec<AssetRef>, mode: JobMode, kind: JobKind) -> Job {
    Job {
        id: id.to_string(),
        assets,
        params: ConversionParams {
            format: OutputFormat::Gif,
            quality: 90,
            width: 0,
            height: 0,
            frame_rate: 60,
        },
        mode,
        kind,
    }
}
