//! Remote asset store capability
//!
//! The pipeline never talks to a concrete transport; it consumes this trait.
//! Implementations wrap whatever messaging platform or blob store hosts the
//! assets, and tests inject in-memory fakes through the same seam.

use crate::error::Result;
use crate::types::AssetMetadata;
use async_trait::async_trait;
use std::path::Path;

/// Capability for looking up and downloading remote assets
///
/// Both operations may fail transiently ([`crate::Error::RateLimited`],
/// [`crate::Error::Timeout`], [`crate::Error::Transport`]); callers wrap
/// them in [`crate::retry::execute`]. Implementations must therefore be
/// safe to invoke repeatedly for the same asset.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Look up size and convertibility of one asset
    ///
    /// # Errors
    ///
    /// Returns an error if the asset cannot be resolved or the store is
    /// unreachable; transient failures are retried by the caller.
    async fn metadata(&self, remote_id: &str) -> Result<AssetMetadata>;

    /// Download one asset's bytes to `dest`
    ///
    /// A partially written `dest` from a failed attempt may be overwritten
    /// by the next attempt.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails or `dest` cannot be written;
    /// transient failures are retried by the caller.
    async fn fetch_to(&self, remote_id: &str, dest: &Path) -> Result<()>;
}
