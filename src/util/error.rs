//! Error types for the sampling engine.

use thiserror::Error;

use crate::core::Frame;
use crate::scene::ObjectId;

/// Main error type for sampling operations.
///
/// Sparse data (a missing pose channel, a material slot the sample does not
/// carry) is never reported through this type; those lookups return `None`.
#[derive(Error, Debug)]
pub enum Error {
    /// A bone matrix was attached before the object's sample existed.
    #[error("No sample for object {object} at frame {frame}")]
    MissingSample { object: ObjectId, frame: Frame },

    /// Object referenced by name does not exist in the scene
    #[error("Object not found: {0}")]
    UnknownObject(String),

    /// Bone referenced by name does not exist in the owning skeleton
    #[error("Bone '{bone}' not found in object '{object}'")]
    UnknownBone { object: String, bone: String },

    /// Material referenced by name does not exist in the scene
    #[error("Material not found: {0}")]
    UnknownMaterial(String),

    /// Scene description is structurally invalid
    #[error("Invalid scene: {0}")]
    InvalidScene(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an "other" error from a string.
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Create an invalid scene error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidScene(msg.into())
    }
}

/// Result type alias for sampling operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::MissingSample { object: ObjectId(3), frame: 12 };
        assert!(e.to_string().contains("3"));
        assert!(e.to_string().contains("12"));

        let e = Error::UnknownBone { object: "Rig".into(), bone: "hand.L".into() };
        assert!(e.to_string().contains("hand.L"));
        assert!(e.to_string().contains("Rig"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_err = serde_json::from_str::<u32>("not json").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
