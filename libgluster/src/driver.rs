//! Driver hook trait.
//!
//! A [`VolumeDriver`] supplies the filesystem-specific policy that the generic
//! reference-counted lifecycle in [`crate::lifecycle`] calls into:
//!
//! 1. **Validate** — reject bad create requests before any state changes.
//! 2. **MountOptions** — build the mount utility arguments (0→1 only).
//! 3. **PreMount** — check the mountpoint before the mount utility runs.
//! 4. **PostMount** — best-effort verification once the mount has run.

use async_trait::async_trait;

use crate::error::VolumeError;
use crate::types::{CreateRequest, MountRequest, Scope};

/// Filesystem-specific hooks plugged into the mount lifecycle.
#[async_trait]
pub trait VolumeDriver: Send + Sync {
    /// Validate a create request. Called once per `Create`.
    fn validate(&self, req: &CreateRequest) -> Result<(), VolumeError>;

    /// Arguments for the mount utility. Called once per physical mount.
    fn mount_options(&self, req: &CreateRequest) -> Vec<String>;

    /// Runs before the mount utility. An error aborts the mount.
    async fn pre_mount(&self, req: &MountRequest) -> Result<(), VolumeError>;

    /// Runs after a successful mount. Cannot fail the mount.
    async fn post_mount(&self, req: &MountRequest);

    /// Visibility of the volumes this driver serves.
    fn scope(&self) -> Scope {
        Scope::Local
    }
}
