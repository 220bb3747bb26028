//! Errors raised at the edges of the engine.
//!
//! Inference and unification are total, so the only failures are malformed
//! text (caught by the parser) and values that break the value model's own
//! invariants (caught by the registry before inference starts).
use std::fmt;

/// 1-based location inside the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at {position}{}", path_suffix(.path))]
pub struct ParseError {
    pub position: Position,
    /// Where deserialization stopped, when it got past the document root.
    pub path: Option<String>,
    pub message: String,
}

impl ParseError {
    pub(crate) fn from_serde(err: serde_json::Error, path: Option<String>, line_offset: usize) -> Self {
        Self {
            position: Position { line: err.line() + line_offset, column: err.column() },
            path,
            message: strip_location(&err.to_string()),
        }
    }
}

fn path_suffix(path: &Option<String>) -> String {
    match path {
        Some(p) => format!(" (at JSON path {p})"),
        None => String::new(),
    }
}

// serde_json appends " at line L column C" to every message; we carry the
// position separately.
fn strip_location(msg: &str) -> String {
    match msg.rfind(" at line ") {
        Some(ix) => msg[..ix].to_string(),
        None => msg.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// The same attribute name appeared twice within one object observation.
    #[error("duplicate attribute `{name}` in object at {path}")]
    DuplicateAttribute { path: String, name: String },
}
