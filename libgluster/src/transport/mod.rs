//! Unix-socket transport for the Docker volume plugin protocol.
//!
//! [`PluginServer`](server::PluginServer) serves HTTP/1.1 on an already bound
//! [`tokio::net::UnixListener`] and routes each verb to a
//! [`VolumePlugin`](crate::plugin::VolumePlugin).

pub mod server;

pub use server::{PluginListener, PluginServer};
