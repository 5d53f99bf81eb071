//! Edge types for the dependency graph.
//!
//! Containment edges mirror the input hierarchy and always exist. Call and
//! import-usage edges are best effort: a reference that cannot be resolved
//! simply has no edge.

use serde::{Deserialize, Serialize};

/// The type of relationship between two nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// File owns import, class owns method.
    Containment,

    /// Function or method A calls B.
    Call,

    /// An import is exercised by a call into its target module.
    ImportUsage,
}

impl std::fmt::Display for EdgeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Containment => "containment",
            Self::Call => "call",
            Self::ImportUsage => "import_usage",
        };
        write!(f, "{}", s)
    }
}

/// An edge with its endpoint ids, for export and rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    pub kind: EdgeKind,
}

impl GraphEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            kind,
        }
    }
}
