//! Source location tracking for error reporting.
//!
//! A [`Position`] names a contiguous region of a source file using 1-based
//! line/column coordinates. Every AST node and every symbol declaration
//! carries one, so diagnostics and runtime failures can point at the exact
//! construct that produced them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A line/column region in a source file.
///
/// Positions are immutable once constructed. The `file` field is informational
/// and does not participate in the wire encoding; a position deserialized from
/// a job payload reports an empty file name.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    pub file: String,
    pub start_line: usize,
    pub end_line: usize,
    pub start_col: usize,
    pub end_col: usize,
}

impl Position {
    pub fn new(
        file: impl Into<String>,
        start_line: usize,
        end_line: usize,
        start_col: usize,
        end_col: usize,
    ) -> Self {
        Self {
            file: file.into(),
            start_line,
            end_line,
            start_col,
            end_col,
        }
    }

    /// A position for nodes that have no source counterpart, such as values
    /// synthesized by the interpreter.
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Covers from the start of `self` to the end of `other`.
    pub fn merge(&self, other: &Position) -> Position {
        Position {
            file: self.file.clone(),
            start_line: self.start_line.min(other.start_line),
            end_line: self.end_line.max(other.end_line),
            start_col: if self.start_line <= other.start_line {
                self.start_col
            } else {
                other.start_col
            },
            end_col: if self.end_line >= other.end_line {
                self.end_col
            } else {
                other.end_col
            },
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.file.is_empty() {
            write!(f, "[{}:{}]", self.start_line, self.start_col)
        } else {
            write!(f, "[{} {}:{}]", self.file, self.start_line, self.start_col)
        }
    }
}
