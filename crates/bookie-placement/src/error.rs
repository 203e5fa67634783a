//! Error types for topology mutations

use thiserror::Error;

/// Result type for topology operations
pub type TopologyResult<T> = Result<T, TopologyError>;

/// Topology error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// The node itself is unacceptable (bad name, bad location, rack value)
    #[error("illegal node '{path}': {reason}")]
    IllegalArgument { path: String, reason: String },

    /// The node is well-formed but clashes with the current tree
    #[error("invalid network topology at '{path}': {reason}")]
    InvalidTopology { path: String, reason: String },
}

impl TopologyError {
    /// Create an illegal argument error
    pub fn illegal_argument(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::IllegalArgument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid topology error
    pub fn invalid_topology(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTopology {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Offending node path
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::IllegalArgument { path, .. } | Self::InvalidTopology { path, .. } => path,
        }
    }

    /// Check if this is an illegal argument error
    #[must_use]
    pub const fn is_illegal_argument(&self) -> bool {
        matches!(self, Self::IllegalArgument { .. })
    }

    /// Check if this is an invalid topology error
    #[must_use]
    pub const fn is_invalid_topology(&self) -> bool {
        matches!(self, Self::InvalidTopology { .. })
    }
}
