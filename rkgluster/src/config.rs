//! Command-line and environment configuration.
//!
//! Every flag has an environment fallback so the daemon can be configured
//! from a plugin `config.json` `Env` section as well as from the command line.

use std::path::PathBuf;

use clap::Parser;
use libgluster::resolver::parse_server_list;

#[derive(Parser, Debug)]
#[command(name = "rkgluster")]
#[command(version, about = "Docker volume plugin for GlusterFS", long_about = None)]
pub struct Args {
    /// Comma-separated list of GlusterFS servers used for every volume
    #[arg(long, env = "SERVERS", default_value = "")]
    pub servers: String,

    /// Mount root of the volume plugin
    #[arg(long, env = "GLUSTER_ROOT", default_value = "/mnt/glusterfs")]
    pub root: PathBuf,

    /// Unix socket the plugin listens on
    #[arg(
        long,
        env = "GLUSTER_PLUGIN_SOCKET",
        default_value = "/run/docker/plugins/glusterfs.sock"
    )]
    pub socket: PathBuf,

    /// Enable GlusterFS secure management (TLS on the management path)
    #[arg(long, env = "SECURE_MANAGEMENT")]
    pub secure_management: bool,

    /// Marker file GlusterFS checks to enable secure management
    #[arg(
        long,
        env = "GLUSTER_SECURE_ACCESS_FILE",
        default_value = "/var/lib/glusterd/secure-access"
    )]
    pub secure_access_file: PathBuf,

    /// Program invoked to mount a volume
    #[arg(long, env = "GLUSTER_MOUNT_PROGRAM", default_value = "glusterfs")]
    pub mount_program: PathBuf,

    /// Program invoked to unmount a volume
    #[arg(long, env = "GLUSTER_UNMOUNT_PROGRAM", default_value = "umount")]
    pub unmount_program: PathBuf,

    /// Emit logs as JSON
    #[arg(long, env = "GLUSTER_LOG_JSON")]
    pub log_json: bool,
}

/// Validated daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    /// Process-wide server list; empty means per-volume options are required.
    pub servers: Vec<String>,
    pub root: PathBuf,
    pub socket: PathBuf,
    pub secure_management: bool,
    pub secure_access_file: PathBuf,
    pub mount_program: PathBuf,
    pub unmount_program: PathBuf,
    pub log_json: bool,
}

impl From<Args> for PluginConfig {
    fn from(args: Args) -> Self {
        Self {
            servers: parse_server_list(&args.servers),
            root: args.root,
            socket: args.socket,
            secure_management: args.secure_management,
            secure_access_file: args.secure_access_file,
            mount_program: args.mount_program,
            unmount_program: args.unmount_program,
            log_json: args.log_json,
        }
    }
}
