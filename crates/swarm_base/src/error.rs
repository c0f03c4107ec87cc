//! The error taxonomy shared by the compiler and the runtime.
//!
//! Static analyses accumulate these instead of returning early, so a user
//! sees every name and type error from a single pass. Runtime errors inside a
//! worker are caught at the job boundary and recorded on the job record; they
//! never unwind the worker loop.

use crate::position::Position;
use thiserror::Error;

/// What went wrong during name analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameErrorKind {
    Undeclared,
    Redeclaration,
    SharedViolation,
}

impl std::fmt::Display for NameErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameErrorKind::Undeclared => write!(f, "use of undeclared identifier"),
            NameErrorKind::Redeclaration => write!(f, "redeclaration in the same scope"),
            NameErrorKind::SharedViolation => {
                write!(f, "`shared` modifier on a non-assignable site")
            }
        }
    }
}

/// Every failure mode in the Swarm pipeline.
#[derive(Debug, Clone, Error)]
pub enum SwarmError {
    #[error("{position} parse error: {message}")]
    Parse { position: Position, message: String },

    #[error("invalid access of free symbol `{name}`")]
    FreeSymbol { name: String },

    #[error("{position} {kind}: {message}")]
    Name {
        position: Position,
        kind: NameErrorKind,
        message: String,
    },

    #[error("{position} type mismatch: {message}")]
    TypeMismatch { position: Position, message: String },

    #[error("{position} ambiguous type: {message}")]
    TypeAmbiguous { position: Position, message: String },

    #[error("{position} runtime error: {message}")]
    Runtime { position: Position, message: String },

    #[error("timed out acquiring lock `{name}`")]
    LockTimeout { name: String },

    #[error("queue execution failed: {reason}")]
    QueueExecution { reason: String },

    #[error("serialization error: {message}")]
    Serialization { message: String },
}

impl SwarmError {
    pub fn runtime(position: Position, message: impl Into<String>) -> Self {
        SwarmError::Runtime {
            position,
            message: message.into(),
        }
    }

    pub fn serialization(message: impl Into<String>) -> Self {
        SwarmError::Serialization {
            message: message.into(),
        }
    }

    /// The source position the error points at, when it has one.
    pub fn position(&self) -> Option<&Position> {
        match self {
            SwarmError::Parse { position, .. }
            | SwarmError::Name { position, .. }
            | SwarmError::TypeMismatch { position, .. }
            | SwarmError::TypeAmbiguous { position, .. }
            | SwarmError::Runtime { position, .. } => Some(position),
            _ => None,
        }
    }

    /// True for errors produced by the static analyses.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            SwarmError::Name { .. }
                | SwarmError::TypeMismatch { .. }
                | SwarmError::TypeAmbiguous { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, SwarmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_error_renders_kind_and_position() {
        let err = SwarmError::Name {
            position: Position::new("main.swarm", 2, 2, 5, 8),
            kind: NameErrorKind::Undeclared,
            message: "x".into(),
        };
        let text = err.to_string();
        assert!(text.contains("[main.swarm 2:5]"));
        assert!(text.contains("undeclared"));
    }

    #[test]
    fn static_predicate_excludes_runtime_kinds() {
        let name = SwarmError::Name {
            position: Position::unknown(),
            kind: NameErrorKind::Redeclaration,
            message: "x".into(),
        };
        assert!(name.is_static());
        assert!(!SwarmError::FreeSymbol { name: "x".into() }.is_static());
    }
}
