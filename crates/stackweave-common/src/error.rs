//! Unified error taxonomy for the stackweave workspace.
//!
//! Every failure is fatal to the current composition run. Each variant
//! carries enough context (unit, logical id, path, identifier) for the
//! operator to locate the offending source fragment.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type shared across the workspace.
#[derive(Debug, Error)]
pub enum StackweaveError {
    /// A fragment, skeleton or API document is structurally invalid.
    #[error("malformed fragment for unit \"{unit}\": {reason}")]
    MalformedFragment {
        /// Unit (or shared document owner) whose document is invalid.
        unit: String,
        /// Description of the structural problem.
        reason: String,
    },

    /// A placeholder token has no binding.
    #[error("unresolved placeholder {{{{{identifier}}}}} in unit \"{unit}\"")]
    UnresolvedPlaceholder {
        /// Unit being resolved.
        unit: String,
        /// Identifier inside the token.
        identifier: String,
    },

    /// A placeholder token is not well formed (unterminated or bad identifier).
    #[error("invalid placeholder in unit \"{unit}\": {text}")]
    InvalidPlaceholder {
        /// Unit being resolved.
        unit: String,
        /// Offending text, starting at the opening delimiter.
        text: String,
    },

    /// Two owners computed the same logical resource id.
    #[error("duplicate resource \"{logical_id}\" declared by \"{first}\" and \"{second}\"")]
    DuplicateResource {
        /// Colliding logical id.
        logical_id: String,
        /// Owner that inserted the id first.
        first: String,
        /// Owner that attempted to insert it again.
        second: String,
    },

    /// Two owners declared the same `(path, method)` pair.
    #[error("duplicate route {method} {path} declared by \"{first}\" and \"{second}\"")]
    DuplicateRoute {
        /// URL path.
        path: String,
        /// HTTP method or path-item key.
        method: String,
        /// Owner that declared the route first.
        first: String,
        /// Owner that attempted to declare it again.
        second: String,
    },

    /// A reference points at a logical id that is not declared.
    #[error("dangling reference in \"{resource}\": \"{target}\" is not declared")]
    DanglingReference {
        /// Resource (or API location) holding the reference.
        resource: String,
        /// Missing target.
        target: String,
    },

    /// Resources reference each other in a cycle.
    #[error("circular dependency between resources: {}", .resources.join(" -> "))]
    CircularDependency {
        /// Resources participating in the cycle.
        resources: Vec<String>,
    },

    /// A fragment overrides a skeleton value with a different one while
    /// strict divergence checking is enabled.
    #[error("unit \"{unit}\" overrides skeleton value at {path} with a different value")]
    DivergentOverride {
        /// Unit holding the override.
        unit: String,
        /// Dotted path of the diverging value.
        path: String,
    },

    /// An I/O operation on an input or output artifact failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path where the I/O error occurred.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("invalid configuration: {message}")]
    Config {
        /// Description of the invalid configuration.
        message: String,
    },

    /// Serialization of an output artifact failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },
}

impl StackweaveError {
    /// Builds an [`StackweaveError::Io`] from a path and an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Builds a [`StackweaveError::MalformedFragment`].
    pub fn malformed(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedFragment {
            unit: unit.into(),
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StackweaveError {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialization {
            message: source.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for StackweaveError {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Serialization {
            message: source.to_string(),
        }
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, StackweaveError>;
