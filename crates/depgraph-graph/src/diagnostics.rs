//! Non-fatal findings recorded while building a graph.
//!
//! None of these stop a build. A malformed file is skipped; everything
//! else only means an edge is missing or a declaration was overwritten.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A call or import usage matched no node.
    UnresolvedReference,
    /// Two declarations produced the same node id; the later one won.
    DuplicateIdentifier,
    /// A file entry could not be used and was left out of the graph.
    MalformedSummary,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::UnresolvedReference => "unresolved",
            Self::DuplicateIdentifier => "duplicate",
            Self::MalformedSummary => "malformed",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// File the finding belongs to.
    pub file: String,
    pub message: String,
}

impl Diagnostic {
    pub fn unresolved_call(file: &str, callee: &str, caller: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnresolvedReference,
            file: file.to_string(),
            message: format!("unresolved call `{}` from `{}`", callee, caller),
        }
    }

    pub fn unresolved_usage(file: &str, candidate: &str, import: &str) -> Self {
        Self {
            kind: DiagnosticKind::UnresolvedReference,
            file: file.to_string(),
            message: format!("unresolved import usage `{}` via `{}`", candidate, import),
        }
    }

    pub fn duplicate(file: &str, id: &str) -> Self {
        Self {
            kind: DiagnosticKind::DuplicateIdentifier,
            file: file.to_string(),
            message: format!("duplicate identifier `{}`, later declaration kept", id),
        }
    }

    pub fn malformed(file: &str, reason: impl fmt::Display) -> Self {
        Self {
            kind: DiagnosticKind::MalformedSummary,
            file: file.to_string(),
            message: reason.to_string(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.file, self.message)
    }
}
