//! Node selection for the rendering side.
//!
//! Selecting a node yields its kind, label and a kind-specific payload:
//! the signature of a callable, the methods of a class, the declared path
//! of an import. File nodes have nothing to show and select to `None`.

use crate::error::GraphError;
use crate::graph::DepGraph;
use crate::node::{NodeKind, NodeMeta};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDetail {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
    pub info: NodeMeta,
}

impl DepGraph {
    /// Looks up the detail payload for `id`.
    ///
    /// Errors if the id is unknown; returns `None` for File nodes.
    pub fn select(&self, id: &str) -> Result<Option<NodeDetail>, GraphError> {
        let node = self.require(id)?;
        if node.kind == NodeKind::File {
            return Ok(None);
        }
        Ok(Some(NodeDetail {
            id: node.id.clone(),
            label: node.label.clone(),
            kind: node.kind,
            info: node.meta.clone(),
        }))
    }
}
