//! Core request and volume types.
//!
//! These are the in-process shapes the driver hooks and the lifecycle work
//! with. The wire shapes that Docker sends and expects live in
//! [`crate::protocol`].

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::VolumeError;

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Request to create a named volume.
///
/// `name` may carry a GlusterFS subdirectory after the first `/`, e.g.
/// `"vol/a/b"` mounts `/a/b` inside volume `vol`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateRequest {
    /// Volume name, optionally followed by `/<subdir>`.
    pub name: String,
    /// Driver options (`servers`, `glusteropts`).
    pub options: HashMap<String, String>,
}

impl CreateRequest {
    pub fn new(name: impl Into<String>, options: HashMap<String, String>) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// Check the required fields, reporting the first one that is missing.
    pub fn validate(&self) -> Result<(), VolumeError> {
        if self.name.is_empty() {
            return Err(VolumeError::validation("volume name cannot be empty"));
        }
        Ok(())
    }
}

/// Request to mount a volume at a concrete mountpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountRequest {
    /// Volume name.
    pub name: String,
    /// Absolute mountpoint path.
    pub mountpoint: PathBuf,
}

impl MountRequest {
    pub fn new(name: impl Into<String>, mountpoint: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            mountpoint: mountpoint.into(),
        }
    }

    /// Check the required fields, reporting the first one that is missing or
    /// invalid.
    pub fn validate(&self) -> Result<(), VolumeError> {
        if self.name.is_empty() {
            return Err(VolumeError::validation("volume name cannot be empty"));
        }
        if self.mountpoint.as_os_str().is_empty() {
            return Err(VolumeError::validation("mount point cannot be empty"));
        }
        if !self.mountpoint.is_absolute() {
            return Err(VolumeError::validation(format!(
                "mount point {} must be an absolute path",
                self.mountpoint.display()
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Volume state
// ---------------------------------------------------------------------------

/// Lifecycle state of a known volume.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VolumeState {
    /// Record exists, nothing mounted.
    Created,
    /// Mounted with at least one consumer.
    Mounted,
}

impl fmt::Display for VolumeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => f.write_str("created"),
            Self::Mounted => f.write_str("mounted"),
        }
    }
}

/// Point-in-time view of a volume record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Volume {
    pub name: String,
    /// Set only while the volume is mounted.
    pub mountpoint: Option<PathBuf>,
    pub refcount: usize,
    pub state: VolumeState,
}

impl Volume {
    /// Status map reported to the orchestrator by `Get` and `List`.
    pub fn status(&self) -> HashMap<String, serde_json::Value> {
        HashMap::from([
            ("refcount".to_owned(), serde_json::Value::from(self.refcount)),
            (
                "state".to_owned(),
                serde_json::Value::from(self.state.to_string()),
            ),
        ])
    }
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Whether volumes are visible on one node or across the cluster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Local,
    Global,
}

/// Driver capabilities advertised to the orchestrator.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Capability {
    #[serde(rename = "Scope")]
    pub scope: Scope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_requires_name() {
        let req = CreateRequest::default();
        assert_eq!(
            req.validate(),
            Err(VolumeError::validation("volume name cannot be empty"))
        );

        let req = CreateRequest::new("test", HashMap::new());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn mount_request_checks_fields_in_order() {
        let req = MountRequest::new("", "");
        assert_eq!(
            req.validate(),
            Err(VolumeError::validation("volume name cannot be empty"))
        );

        let req = MountRequest::new("test", "");
        assert_eq!(
            req.validate(),
            Err(VolumeError::validation("mount point cannot be empty"))
        );

        let req = MountRequest::new("test", "relative/dir");
        assert!(matches!(req.validate(), Err(VolumeError::Validation(_))));

        let req = MountRequest::new("test", "/mnt/glusterfs/test");
        assert!(req.validate().is_ok());
    }

    #[test]
    fn volume_status() {
        let vol = Volume {
            name: "data".into(),
            mountpoint: Some(PathBuf::from("/mnt/glusterfs/x")),
            refcount: 2,
            state: VolumeState::Mounted,
        };
        let status = vol.status();
        assert_eq!(status["refcount"], serde_json::json!(2));
        assert_eq!(status["state"], serde_json::json!("mounted"));
    }

    #[test]
    fn capability_serializes_scope() {
        let cap = Capability {
            scope: Scope::Global,
        };
        let json = serde_json::to_string(&cap).expect("serialize");
        assert_eq!(json, r#"{"Scope":"global"}"#);
    }
}
