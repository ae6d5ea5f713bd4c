mod bootstrap;
mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use libgluster::{CommandMounter, GlusterFsDriver, MountedVolumeDriver, PluginServer};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Args, PluginConfig};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = PluginConfig::from(Args::parse());
    init_tracing(config.log_json);

    if !nix::unistd::getuid().is_root() {
        warn!("not running as root, mounting GlusterFS volumes will likely fail");
    }
    if config.servers.is_empty() {
        info!("no process-wide servers, volumes must set servers or glusteropts");
    } else {
        info!(servers = ?config.servers, "using process-wide servers");
    }

    bootstrap::apply_secure_management(config.secure_management, &config.secure_access_file)?;
    bootstrap::ensure_root(&config.root)?;

    let plugin = Arc::new(MountedVolumeDriver::new(
        GlusterFsDriver::new(config.servers.clone()),
        CommandMounter::new(&config.mount_program, &config.unmount_program),
        &config.root,
    ));

    let listener = bootstrap::bind_socket(&config.socket)?;
    PluginServer::new(listener, plugin)
        .serve_with_shutdown(shutdown_signal())
        .await
        .context("volume plugin server failed")?;

    if let Err(e) = std::fs::remove_file(&config.socket) {
        warn!(socket = %config.socket.display(), error = %e, "failed to remove socket on exit");
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
