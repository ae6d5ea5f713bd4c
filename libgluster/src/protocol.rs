//! Docker volume plugin wire protocol.
//!
//! Every verb is an HTTP `POST` to `/VolumeDriver.<Verb>` (or
//! `/Plugin.Activate`) carrying one JSON object and answered with one JSON
//! object. Field names are PascalCase as Docker expects them.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::types::{Capability, Volume};

/// Content type used for every plugin response.
pub const PLUGIN_CONTENT_TYPE: &str = "application/vnd.docker.plugins.v1+json";

/// Interface category advertised by `Plugin.Activate`.
pub const VOLUME_DRIVER: &str = "VolumeDriver";

pub const ACTIVATE_PATH: &str = "/Plugin.Activate";
pub const CREATE_PATH: &str = "/VolumeDriver.Create";
pub const REMOVE_PATH: &str = "/VolumeDriver.Remove";
pub const MOUNT_PATH: &str = "/VolumeDriver.Mount";
pub const UNMOUNT_PATH: &str = "/VolumeDriver.Unmount";
pub const PATH_PATH: &str = "/VolumeDriver.Path";
pub const GET_PATH: &str = "/VolumeDriver.Get";
pub const LIST_PATH: &str = "/VolumeDriver.List";
pub const CAPABILITIES_PATH: &str = "/VolumeDriver.Capabilities";

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// `VolumeDriver.Create` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CreateVolumeRequest {
    #[serde(rename = "Name")]
    pub name: String,
    /// Docker sends `null` when no `-o` options were given.
    #[serde(rename = "Opts", default)]
    pub opts: Option<HashMap<String, String>>,
}

/// Request carrying only a volume name: `Remove`, `Path`, `Get`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NameRequest {
    #[serde(rename = "Name")]
    pub name: String,
}

/// `VolumeDriver.Mount` / `VolumeDriver.Unmount` request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MountVolumeRequest {
    #[serde(rename = "Name")]
    pub name: String,
    /// Caller identity, unique per consumer container.
    #[serde(rename = "ID", default)]
    pub id: String,
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// Response for `Plugin.Activate`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivateResponse {
    #[serde(rename = "Implements")]
    pub implements: Vec<String>,
}

impl Default for ActivateResponse {
    fn default() -> Self {
        Self {
            implements: vec![VOLUME_DRIVER.to_owned()],
        }
    }
}

/// Response carrying only an error string: `Create`, `Remove`, `Unmount`,
/// and any failed verb.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    #[serde(rename = "Err")]
    pub err: String,
}

impl ErrorResponse {
    pub fn new(err: impl Into<String>) -> Self {
        Self { err: err.into() }
    }
}

/// Response for `Mount` and `Path`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct MountpointResponse {
    #[serde(rename = "Mountpoint")]
    pub mountpoint: String,
    #[serde(rename = "Err")]
    pub err: String,
}

impl MountpointResponse {
    pub fn new(mountpoint: Option<&Path>) -> Self {
        Self {
            mountpoint: mountpoint
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            err: String::new(),
        }
    }
}

/// Volume as reported by `Get` and `List`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WireVolume {
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Mountpoint")]
    pub mountpoint: String,
    #[serde(rename = "Status", default, skip_serializing_if = "HashMap::is_empty")]
    pub status: HashMap<String, serde_json::Value>,
}

impl From<&Volume> for WireVolume {
    fn from(v: &Volume) -> Self {
        Self {
            name: v.name.clone(),
            mountpoint: v
                .mountpoint
                .as_deref()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            status: v.status(),
        }
    }
}

/// Response for `Get`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GetResponse {
    #[serde(rename = "Volume")]
    pub volume: WireVolume,
    #[serde(rename = "Err")]
    pub err: String,
}

/// Response for `List`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ListResponse {
    #[serde(rename = "Volumes")]
    pub volumes: Vec<WireVolume>,
    #[serde(rename = "Err")]
    pub err: String,
}

/// Response for `Capabilities`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapabilitiesResponse {
    #[serde(rename = "Capabilities")]
    pub capabilities: Capability,
}
