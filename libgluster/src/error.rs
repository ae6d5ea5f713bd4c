//! Volume plugin error types.
//!
//! Every failure in `libgluster` is a [`VolumeError`]. The rendered message is
//! what the dispatcher places in the `Err` field of a plugin response, so the
//! `Display` output is part of the wire contract.

use thiserror::Error;

/// Broad classification of a [`VolumeError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or contradictory request. Never retried.
    Validation,
    /// A mountpoint check or an external mount/unmount invocation failed.
    Mount,
    /// The operation is invalid for the current lifecycle state.
    State,
    /// Anything else.
    Internal,
}

/// Unified error type for volume plugin operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VolumeError {
    /// The request failed validation.
    #[error("validation error: {0}")]
    Validation(String),

    /// A mount-related operation failed, optionally because of `cause`.
    #[error("mount error: {message}{}", caused_by(.cause))]
    Mount {
        /// What was being attempted.
        message: String,
        /// Rendered underlying failure, if any.
        cause: Option<String>,
    },

    /// No record exists for the named volume.
    #[error("volume {0} not found")]
    NotFound(String),

    /// The volume has no active mounts.
    #[error("volume {0} is not mounted")]
    NotMounted(String),

    /// The volume still has active mounts.
    #[error("volume {name} is in use ({refcount} active mounts)")]
    InUse {
        /// Volume name.
        name: String,
        /// Active mount count at the time of the call.
        refcount: usize,
    },

    /// The volume was already created with a different set of options.
    #[error("volume {0} already exists with different options")]
    AlreadyExists(String),

    /// An unclassified internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

fn caused_by(cause: &Option<String>) -> String {
    match cause {
        Some(c) => format!(" (caused by: {c})"),
        None => String::new(),
    }
}

impl VolumeError {
    /// Create a [`VolumeError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a [`VolumeError::Mount`] without an underlying cause.
    pub fn mount(message: impl Into<String>) -> Self {
        Self::Mount {
            message: message.into(),
            cause: None,
        }
    }

    /// Create a [`VolumeError::Mount`] wrapping anything that implements
    /// [`std::fmt::Display`].
    pub fn mount_caused_by<E: std::fmt::Display>(message: impl Into<String>, cause: E) -> Self {
        Self::Mount {
            message: message.into(),
            cause: Some(cause.to_string()),
        }
    }

    /// Create a [`VolumeError::Internal`] from anything that implements
    /// [`std::fmt::Display`].
    pub fn internal<E: std::fmt::Display>(e: E) -> Self {
        Self::Internal(e.to_string())
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Mount { .. } => ErrorKind::Mount,
            Self::NotFound(_)
            | Self::NotMounted(_)
            | Self::InUse { .. }
            | Self::AlreadyExists(_) => ErrorKind::State,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_display() {
        let err = VolumeError::validation("test error");
        assert_eq!(err.to_string(), "validation error: test error");
        assert_eq!(VolumeError::validation("").to_string(), "validation error: ");
    }

    #[test]
    fn mount_display_with_and_without_cause() {
        let err = VolumeError::mount("mount point /mnt/x is not accessible");
        assert_eq!(
            err.to_string(),
            "mount error: mount point /mnt/x is not accessible"
        );

        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = VolumeError::mount_caused_by("mount point /mnt/x is not accessible", io);
        assert_eq!(
            err.to_string(),
            "mount error: mount point /mnt/x is not accessible (caused by: no such file)"
        );
    }

    #[test]
    fn kinds() {
        assert_eq!(VolumeError::validation("x").kind(), ErrorKind::Validation);
        assert_eq!(VolumeError::mount("x").kind(), ErrorKind::Mount);
        assert_eq!(VolumeError::NotMounted("v".into()).kind(), ErrorKind::State);
        assert_eq!(
            VolumeError::InUse {
                name: "v".into(),
                refcount: 2
            }
            .kind(),
            ErrorKind::State
        );
        assert_eq!(VolumeError::internal("boom").kind(), ErrorKind::Internal);
    }

    #[test]
    fn in_use_display() {
        let err = VolumeError::InUse {
            name: "data".into(),
            refcount: 3,
        };
        assert_eq!(err.to_string(), "volume data is in use (3 active mounts)");
    }
}
