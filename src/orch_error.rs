//! Crate-wide error taxonomy for the orchestration core.
//!
//! Every component above the Container-Engine Adapter returns [`OrchError`]
//! rather than inventing its own error type. [`DockerError`](crate::errors::DockerError)
//! values raised by C1 convert into [`OrchError::Runtime`], preserving the
//! original as the error source.

use std::time::Duration;
use thiserror::Error;

use crate::errors::DockerError;

/// Result type alias used throughout the orchestration core.
pub type OrchResult<T> = Result<T, OrchError>;

/// The nine-kind error taxonomy shared by every orchestration component.
#[derive(Debug, Error)]
pub enum OrchError {
    /// A named service group / network / template / channel / container was not found.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// The kind of record that was looked up (e.g. "service group", "network template").
        kind: &'static str,
        /// The name that was not found.
        name: String,
    },

    /// Creation conflicted with an existing record of the same unique name.
    #[error("{kind} already exists: {name}")]
    AlreadyExists {
        /// The kind of record that conflicted.
        kind: &'static str,
        /// The conflicting name.
        name: String,
    },

    /// A parsed descriptor violates a data-model invariant, or carries unknown fields.
    #[error("validation failed: {message}")]
    Validation {
        /// Human-readable description of the violated invariant.
        message: String,
    },

    /// The dependency graph has a cycle, or a required dependency's wait failed.
    #[error("dependency error: {message}")]
    Dependency {
        /// Description of the dependency failure.
        message: String,
    },

    /// The underlying container engine, network, or volume operation failed.
    #[error("runtime error: {message}")]
    Runtime {
        /// Description of the runtime failure.
        message: String,
        /// The underlying Docker-adapter error, when one triggered this variant.
        #[source]
        source: Option<DockerError>,
    },

    /// A publish or reachability probe failed on a communication channel.
    #[error("transport error on channel {channel}: {message}")]
    Transport {
        /// Name of the channel involved.
        channel: String,
        /// Description of the transport failure.
        message: String,
    },

    /// No available dependency source exists for a requested ecosystem.
    #[error("no available source for ecosystem {ecosystem}: {message}")]
    Source {
        /// The ecosystem that has no available source.
        ecosystem: String,
        /// Description of why no source was available.
        message: String,
    },

    /// A bounded wait exhausted its deadline.
    #[error("operation {operation} timed out after {elapsed:?}")]
    Timeout {
        /// The operation that timed out.
        operation: String,
        /// How long the operation waited before timing out.
        elapsed: Duration,
    },

    /// A programming error; always logged with a trace.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal fault.
        message: String,
    },
}

impl OrchError {
    /// Build a [`OrchError::NotFound`].
    pub fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// Build a [`OrchError::AlreadyExists`].
    pub fn already_exists(kind: &'static str, name: impl Into<String>) -> Self {
        Self::AlreadyExists {
            kind,
            name: name.into(),
        }
    }

    /// Build a [`OrchError::Validation`].
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Build a [`OrchError::Dependency`].
    pub fn dependency(message: impl Into<String>) -> Self {
        Self::Dependency {
            message: message.into(),
        }
    }

    /// Build a [`OrchError::Runtime`] with no underlying Docker-adapter error.
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
            source: None,
        }
    }

    /// Build a [`OrchError::Transport`].
    pub fn transport(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            channel: channel.into(),
            message: message.into(),
        }
    }

    /// Build a [`OrchError::Source`].
    pub fn source(ecosystem: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Source {
            ecosystem: ecosystem.into(),
            message: message.into(),
        }
    }

    /// Build a [`OrchError::Timeout`].
    pub fn timeout(operation: impl Into<String>, elapsed: Duration) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed,
        }
    }

    /// Build a [`OrchError::Internal`].
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the error category for grouping, logging, and JSON `code` fields.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::AlreadyExists { .. } => "already_exists",
            Self::Validation { .. } => "validation",
            Self::Dependency { .. } => "dependency",
            Self::Runtime { .. } => "runtime",
            Self::Transport { .. } => "transport",
            Self::Source { .. } => "source",
            Self::Timeout { .. } => "timeout",
            Self::Internal { .. } => "internal",
        }
    }

    /// Whether a caller might reasonably retry the operation that produced this error.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. } | Self::Transport { .. } | Self::Source { .. }
        )
    }
}

impl From<DockerError> for OrchError {
    fn from(err: DockerError) -> Self {
        Self::Runtime {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_match_taxonomy() {
        assert_eq!(
            OrchError::not_found("service group", "demo").category(),
            "not_found"
        );
        assert_eq!(
            OrchError::already_exists("network", "net1").category(),
            "already_exists"
        );
        assert_eq!(OrchError::validation("bad").category(), "validation");
        assert_eq!(OrchError::dependency("cycle").category(), "dependency");
        assert_eq!(OrchError::runtime("boom").category(), "runtime");
        assert_eq!(
            OrchError::transport("k1", "unreachable").category(),
            "transport"
        );
        assert_eq!(OrchError::source("pypi", "none online").category(), "source");
        assert_eq!(
            OrchError::timeout("probe", Duration::from_secs(2)).category(),
            "timeout"
        );
        assert_eq!(OrchError::internal("bug").category(), "internal");
    }

    #[test]
    fn docker_error_converts_to_runtime() {
        let docker_err = DockerError::container_not_found("c1");
        let orch_err: OrchError = docker_err.into();
        assert_eq!(orch_err.category(), "runtime");
        assert!(orch_err.to_string().contains("c1"));
    }

    #[test]
    fn recoverability_matches_category() {
        assert!(OrchError::timeout("x", Duration::from_secs(1)).is_recoverable());
        assert!(!OrchError::validation("bad").is_recoverable());
        assert!(!OrchError::not_found("service", "x").is_recoverable());
    }
}
