//! External mount and unmount utilities.
//!
//! The lifecycle never mounts anything itself; it calls a [`Mounter`]. The
//! production implementation shells out to the GlusterFS FUSE client and to
//! `umount`. Hangs in either utility are not bounded here.

use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use crate::error::VolumeError;

/// Invokes the mount and unmount utilities.
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Mount with `args`, followed by `mountpoint` as the final argument.
    async fn mount(&self, args: &[String], mountpoint: &Path) -> Result<(), VolumeError>;

    /// Unmount whatever is mounted at `mountpoint`.
    async fn unmount(&self, mountpoint: &Path) -> Result<(), VolumeError>;
}

/// [`Mounter`] that runs external programs.
#[derive(Debug, Clone)]
pub struct CommandMounter {
    mount_program: PathBuf,
    unmount_program: PathBuf,
}

impl Default for CommandMounter {
    fn default() -> Self {
        Self::new("glusterfs", "umount")
    }
}

impl CommandMounter {
    pub fn new(mount_program: impl Into<PathBuf>, unmount_program: impl Into<PathBuf>) -> Self {
        Self {
            mount_program: mount_program.into(),
            unmount_program: unmount_program.into(),
        }
    }
}

async fn run(program: &Path, cmd: &mut Command, what: String) -> Result<(), VolumeError> {
    debug!(?cmd, "running external utility");
    let output = cmd.output().await.map_err(|e| {
        VolumeError::mount_caused_by(format!("{what}: failed to run {}", program.display()), e)
    })?;
    check_output(&output).map_err(|cause| VolumeError::mount_caused_by(what, cause))
}

/// Render a failed command's stderr, or its exit status when stderr is empty.
fn check_output(output: &Output) -> Result<(), String> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim();
    if stderr.is_empty() {
        Err(output.status.to_string())
    } else {
        Err(stderr.to_owned())
    }
}

#[async_trait]
impl Mounter for CommandMounter {
    #[instrument(skip(self))]
    async fn mount(&self, args: &[String], mountpoint: &Path) -> Result<(), VolumeError> {
        let mut cmd = Command::new(&self.mount_program);
        cmd.args(args).arg(mountpoint);
        run(
            &self.mount_program,
            &mut cmd,
            format!("mounting {}", mountpoint.display()),
        )
        .await
    }

    #[instrument(skip(self))]
    async fn unmount(&self, mountpoint: &Path) -> Result<(), VolumeError> {
        let mut cmd = Command::new(&self.unmount_program);
        cmd.arg(mountpoint);
        run(
            &self.unmount_program,
            &mut cmd,
            format!("unmounting {}", mountpoint.display()),
        )
        .await
    }
}
