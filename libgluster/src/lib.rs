//! # libgluster — GlusterFS volume plugin core
//!
//! `libgluster` lets Docker containers mount GlusterFS volumes through the
//! volume plugin protocol. It follows the RK8s conventions (Tokio async
//! runtime, `tracing` for observability, `thiserror` for structured errors).
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`types`] | Request model: `CreateRequest`, `MountRequest`, `Volume`, `Capability`. |
//! | [`error`] | [`VolumeError`] covering validation, mount and state failures. |
//! | [`resolver`] | Mount argument resolution for the `glusterfs` client. |
//! | [`driver`] | [`VolumeDriver`] trait — validate / mount-options / pre- and post-mount hooks. |
//! | [`backend`] | Concrete drivers (GlusterFS). |
//! | [`mounter`] | [`Mounter`] trait and the external-command implementation. |
//! | [`lifecycle`] | Reference-counted mount state machine. |
//! | [`plugin`] | [`VolumePlugin`] trait — the verb set the dispatcher drives. |
//! | [`protocol`] | Wire shapes of the Docker volume plugin protocol. |
//! | [`transport`] | HTTP-over-Unix-socket server built on `axum`. |

pub mod backend;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod mounter;
pub mod plugin;
pub mod protocol;
pub mod resolver;
pub mod transport;
pub mod types;

pub use backend::glusterfs::GlusterFsDriver;
pub use driver::VolumeDriver;
pub use error::{ErrorKind, VolumeError};
pub use lifecycle::MountedVolumeDriver;
pub use mounter::{CommandMounter, Mounter};
pub use plugin::VolumePlugin;
pub use transport::PluginServer;
pub use types::*;
