//! Error types for the timing and composition engine

use serde::{Deserialize, Serialize};

/// How far an unresolved reference reaches when it is retried.
///
/// Href-level problems require the element to be registered again; time-value
/// problems only need their dependency edges rewired.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ErrorSeverity {
    Href,
    TimeValue,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum AnimationError {
    /// Malformed or inconsistent animation configuration
    #[error("Invalid animation on '{element}': {reason}")]
    InvalidAnimation { element: String, reason: String },

    /// A referenced element or syncbase cannot be found yet
    #[error("Unresolved reference '{reference}' from '{element}' ({severity:?})")]
    UnresolvedDependency {
        element: String,
        reference: String,
        severity: ErrorSeverity,
    },

    /// Allocation failure while growing engine storage
    #[error("Resource exhausted while {context}")]
    ResourceExhausted { context: String },

    /// Lifecycle command not valid in the current clock state
    #[error("Command {command} is not valid while the clock is {state}")]
    InvalidCommand { command: String, state: String },

    #[error("Unknown element: {id}")]
    UnknownElement { id: String },

    #[error("An observer is already attached to this workplace")]
    ObserverAlreadySet,

    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },
}

impl AnimationError {
    pub fn invalid(element: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidAnimation {
            element: element.into(),
            reason: reason.into(),
        }
    }

    pub fn exhausted(context: impl Into<String>) -> Self {
        Self::ResourceExhausted {
            context: context.into(),
        }
    }

    /// Recoverable errors degrade the affected element and never abort an update.
    #[inline]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidAnimation { .. }
                | Self::UnresolvedDependency { .. }
                | Self::InvalidCommand { .. }
                | Self::UnknownElement { .. }
        )
    }

    /// Get error category for logging
    #[inline]
    pub fn category(&self) -> &'static str {
        match self {
            Self::InvalidAnimation { .. } => "animation",
            Self::UnresolvedDependency { .. } => "dependency",
            Self::ResourceExhausted { .. } => "resource",
            Self::InvalidCommand { .. } => "command",
            Self::UnknownElement { .. } => "registry",
            Self::ObserverAlreadySet => "observer",
            Self::SerializationError { .. } => "serialization",
        }
    }
}

impl From<std::collections::TryReserveError> for AnimationError {
    fn from(err: std::collections::TryReserveError) -> Self {
        Self::ResourceExhausted {
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for AnimationError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

/// Result type for engine operations
pub type AnimationResult<T> = Result<T, AnimationError>;
