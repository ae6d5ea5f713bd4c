//! Volume plugin capability set.
//!
//! [`VolumePlugin`] is the surface the protocol dispatcher drives. It knows
//! nothing about GlusterFS; [`MountedVolumeDriver`](crate::lifecycle::MountedVolumeDriver)
//! is the implementation that combines it with a [`VolumeDriver`](crate::driver::VolumeDriver).

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::VolumeError;
use crate::types::{Capability, Volume};

/// Operations exposed to the orchestrator, one per plugin verb.
#[async_trait]
pub trait VolumePlugin: Send + Sync {
    /// Register a volume. Idempotent for identical options.
    async fn create(&self, name: &str, options: HashMap<String, String>)
    -> Result<(), VolumeError>;

    /// Forget a volume that has no active mounts.
    async fn remove(&self, name: &str) -> Result<(), VolumeError>;

    /// Add a consumer, mounting on the first one. Returns the mountpoint.
    async fn mount(&self, name: &str, id: &str) -> Result<PathBuf, VolumeError>;

    /// Drop a consumer, unmounting after the last one.
    async fn unmount(&self, name: &str, id: &str) -> Result<(), VolumeError>;

    /// Current mountpoint, `None` while not mounted.
    async fn path(&self, name: &str) -> Result<Option<PathBuf>, VolumeError>;

    async fn get(&self, name: &str) -> Result<Volume, VolumeError>;

    async fn list(&self) -> Result<Vec<Volume>, VolumeError>;

    fn capabilities(&self) -> Capability;
}
