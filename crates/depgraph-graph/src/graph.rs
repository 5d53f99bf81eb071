//! Core graph data structure.
//!
//! `DepGraph` wraps a petgraph `DiGraph` and keeps an id index next to it.
//! Node indexes follow insertion order, which the fallback resolver relies
//! on: iterating nodes always yields file order, then declaration order.

use crate::edge::{EdgeKind, GraphEdge};
use crate::error::GraphError;
use crate::node::{Node, NodeKind};
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Index of a node in the graph.
pub type NodeId = NodeIndex;

/// The project dependency graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "GraphRepr")]
pub struct DepGraph {
    pub(crate) graph: DiGraph<Node, EdgeKind>,

    /// Maps string ids to node indexes.
    #[serde(skip)]
    id_index: HashMap<String, NodeId>,

    /// Maps file ids to the nodes they declare, in insertion order.
    #[serde(skip)]
    file_index: HashMap<String, Vec<NodeId>>,
}

/// Serialized form: just the petgraph; indexes are rebuilt on load.
#[derive(Deserialize)]
struct GraphRepr {
    graph: DiGraph<Node, EdgeKind>,
}

impl From<GraphRepr> for DepGraph {
    fn from(repr: GraphRepr) -> Self {
        let mut g = DepGraph {
            graph: repr.graph,
            ..Default::default()
        };
        g.reindex();
        g
    }
}

impl DepGraph {
    /// Creates a new empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a node, or replaces the node that already has its id.
    ///
    /// Replacement keeps the original position in insertion order and
    /// drops containment edges into the old node; the caller re-links the
    /// new one. If the kind changes, containment edges out of the old node
    /// go too. Returns the index and the replaced node, if any.
    pub fn add_node(&mut self, node: Node) -> (NodeId, Option<Node>) {
        if let Some(&index) = self.id_index.get(&node.id) {
            let old_file = self.graph[index].file_id().to_string();
            let new_file = node.file_id().to_string();
            let kind_changed = self.graph[index].kind != node.kind;
            let replaced = std::mem::replace(&mut self.graph[index], node);

            if old_file != new_file {
                if let Some(list) = self.file_index.get_mut(&old_file) {
                    list.retain(|&i| i != index);
                }
                self.file_index.entry(new_file).or_default().push(index);
            }

            let mut stale: Vec<EdgeIndex> = self
                .graph
                .edges_directed(index, Direction::Incoming)
                .filter(|e| *e.weight() == EdgeKind::Containment)
                .map(|e| e.id())
                .collect();
            if kind_changed {
                stale.extend(
                    self.graph
                        .edges_directed(index, Direction::Outgoing)
                        .filter(|e| *e.weight() == EdgeKind::Containment)
                        .map(|e| e.id()),
                );
            }
            // remove_edge swaps the last edge into the hole, so go high to low
            stale.sort_unstable_by(|a, b| b.cmp(a));
            stale.dedup();
            for edge in stale {
                self.graph.remove_edge(edge);
            }

            return (index, Some(replaced));
        }

        let id = node.id.clone();
        let file = node.file_id().to_string();
        let index = self.graph.add_node(node);
        self.id_index.insert(id, index);
        self.file_index.entry(file).or_default().push(index);
        (index, None)
    }

    /// Adds an edge between two existing nodes.
    ///
    /// Returns false without touching the graph if either id is unknown or
    /// the same edge already exists.
    pub fn add_edge(&mut self, source: &str, target: &str, kind: EdgeKind) -> bool {
        match (self.get_index(source), self.get_index(target)) {
            (Some(from), Some(to)) => self.add_edge_by_index(from, to, kind),
            _ => false,
        }
    }

    pub(crate) fn add_edge_by_index(&mut self, from: NodeId, to: NodeId, kind: EdgeKind) -> bool {
        let exists = self
            .graph
            .edges_connecting(from, to)
            .any(|e| *e.weight() == kind);
        if exists {
            return false;
        }
        self.graph.add_edge(from, to, kind);
        true
    }

    /// Returns true if a node with this id exists.
    pub fn contains(&self, id: &str) -> bool {
        self.id_index.contains_key(id)
    }

    /// Gets a node by its string id.
    pub fn get_by_id(&self, id: &str) -> Option<&Node> {
        let index = self.id_index.get(id)?;
        self.graph.node_weight(*index)
    }

    /// Gets a node by its string id, or fails with [`GraphError::NodeNotFound`].
    pub fn require(&self, id: &str) -> Result<&Node, GraphError> {
        self.get_by_id(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.to_string()))
    }

    /// Gets a node by its graph index.
    pub fn get(&self, index: NodeId) -> Option<&Node> {
        self.graph.node_weight(index)
    }

    /// Gets the node index for a string id.
    pub fn get_index(&self, id: &str) -> Option<NodeId> {
        self.id_index.get(id).copied()
    }

    /// Finds all nodes declared in a file (including the File node itself).
    pub fn find_by_file(&self, file: &str) -> Vec<&Node> {
        self.file_index
            .get(file)
            .map(|indexes| {
                indexes
                    .iter()
                    .filter_map(|idx| self.graph.node_weight(*idx))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Nodes with an edge of `kind` into `index`.
    pub fn sources_of(&self, index: NodeId, kind: EdgeKind) -> Vec<&Node> {
        self.neighbors(index, kind, Direction::Incoming)
    }

    /// Nodes reached from `index` by an edge of `kind`.
    pub fn targets_of(&self, index: NodeId, kind: EdgeKind) -> Vec<&Node> {
        self.neighbors(index, kind, Direction::Outgoing)
    }

    fn neighbors(&self, index: NodeId, kind: EdgeKind, dir: Direction) -> Vec<&Node> {
        let mut edges: Vec<_> = self
            .graph
            .edges_directed(index, dir)
            .filter(|e| *e.weight() == kind)
            .map(|e| (e.id(), if dir == Direction::Outgoing { e.target() } else { e.source() }))
            .collect();
        // petgraph walks adjacency lists newest first
        edges.sort_by_key(|(edge, _)| *edge);
        edges
            .into_iter()
            .filter_map(|(_, n)| self.graph.node_weight(n))
            .collect()
    }

    /// Gets nodes that call the given node.
    pub fn get_callers(&self, index: NodeId) -> Vec<&Node> {
        self.sources_of(index, EdgeKind::Call)
    }

    /// Gets nodes that this node calls.
    pub fn get_callees(&self, index: NodeId) -> Vec<&Node> {
        self.targets_of(index, EdgeKind::Call)
    }

    /// Returns the number of nodes.
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// Returns the number of edges.
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Counts edges of one kind.
    pub fn edge_count_of(&self, kind: EdgeKind) -> usize {
        self.graph.edge_weights().filter(|k| **k == kind).count()
    }

    /// Iterates over all nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.graph.node_weights()
    }

    /// Iterates over all node indexes in insertion order.
    pub fn node_indexes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.graph.node_indices()
    }

    /// Returns all edges with source and target ids, in creation order.
    pub fn export_edges(&self) -> Vec<GraphEdge> {
        self.graph
            .edge_references()
            .map(|edge_ref| GraphEdge {
                source: self.graph[edge_ref.source()].id.clone(),
                target: self.graph[edge_ref.target()].id.clone(),
                kind: *edge_ref.weight(),
            })
            .collect()
    }

    /// Returns graph statistics.
    pub fn stats(&self) -> GraphStats {
        let count = |kind: NodeKind| self.nodes().filter(|n| n.kind == kind).count();
        GraphStats {
            node_count: self.node_count(),
            edge_count: self.edge_count(),
            files: count(NodeKind::File),
            callables: count(NodeKind::Function) + count(NodeKind::Method),
            call_edges: self.edge_count_of(EdgeKind::Call),
            usage_edges: self.edge_count_of(EdgeKind::ImportUsage),
        }
    }

    fn reindex(&mut self) {
        self.id_index.clear();
        self.file_index.clear();
        for index in self.graph.node_indices() {
            let node = &self.graph[index];
            self.id_index.insert(node.id.clone(), index);
            self.file_index
                .entry(node.file_id().to_string())
                .or_default()
                .push(index);
        }
    }
}

/// Graph statistics for the info endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub files: usize,
    pub callables: usize,
    pub call_edges: usize,
    pub usage_edges: usize,
}
