//! Process bootstrap: socket placement and the secure-management marker.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::net::UnixListener;
use tracing::{debug, info};

/// Owner and group read-write.
const SOCKET_MODE: u32 = 0o660;
const SOCKET_DIR_MODE: u32 = 0o755;

/// Bind the plugin socket at `path`, replacing any stale socket left by a
/// previous run.
pub fn bind_socket(path: &Path) -> Result<UnixListener> {
    if let Some(dir) = path.parent() {
        if !dir.exists() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create socket directory {}", dir.display()))?;
            fs::set_permissions(dir, fs::Permissions::from_mode(SOCKET_DIR_MODE)).with_context(
                || format!("Failed to set permissions on {}", dir.display()),
            )?;
        }
    }

    match fs::remove_file(path) {
        Ok(()) => debug!(socket = %path.display(), "removed stale socket"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e)
                .with_context(|| format!("Failed to remove existing socket {}", path.display()));
        }
    }

    let listener = UnixListener::bind(path)
        .with_context(|| format!("Failed to bind Unix socket {}", path.display()))?;
    fs::set_permissions(path, fs::Permissions::from_mode(SOCKET_MODE))
        .with_context(|| format!("Failed to set socket permissions on {}", path.display()))?;

    info!(socket = %path.display(), "plugin socket bound");
    Ok(listener)
}

/// Create or remove the GlusterFS secure-access marker.
pub fn apply_secure_management(enabled: bool, marker: &Path) -> Result<()> {
    if enabled {
        if let Some(dir) = marker.parent() {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
        }
        fs::write(marker, b"")
            .with_context(|| format!("Failed to create {}", marker.display()))?;
        info!(marker = %marker.display(), "secure management enabled");
        return Ok(());
    }

    match fs::remove_file(marker) {
        Ok(()) => info!(marker = %marker.display(), "secure management disabled"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to remove {}", marker.display()));
        }
    }
    Ok(())
}

/// Make sure the mount root exists before the first volume is mounted.
pub fn ensure_root(root: &Path) -> Result<()> {
    fs::create_dir_all(root)
        .with_context(|| format!("Failed to create mount root {}", root.display()))
}
