use crate::graph::{DepGraph, NodeId};
use crate::node::NodeKind;
use std::collections::HashMap;

/// Project-wide index of callables for fallback call resolution.
///
/// A Function matches callee `c` when its id ends with `::c`; a Method
/// matches when its id ends with `.c`. Among all matches the one inserted
/// first into the graph wins. For plain callee names this is a lookup on
/// the last id segment; names containing `.` or `:` fall back to a scan.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    /// Callable nodes in graph insertion order.
    callables: Vec<NodeId>,

    /// Last id segment to the first callable carrying it.
    by_name: HashMap<String, NodeId>,
}

impl SymbolTable {
    /// Creates a new empty symbol table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Indexes every callable of a fully built node set.
    pub fn from_graph(graph: &DepGraph) -> Self {
        let mut table = Self::new();
        for index in graph.node_indexes() {
            let Some(node) = graph.get(index) else {
                continue;
            };
            let key = match node.kind {
                NodeKind::Function => node.id.rsplit("::").next(),
                NodeKind::Method => node.id.rsplit('.').next(),
                _ => None,
            };
            if let Some(key) = key {
                table.insert(key.to_string(), index);
            }
        }
        table
    }

    /// Registers a callable. Earlier registrations win on lookup.
    pub fn insert(&mut self, key: String, id: NodeId) {
        self.callables.push(id);
        self.by_name.entry(key).or_insert(id);
    }

    /// Returns the first callable matching `callee` in insertion order.
    pub fn first_match(&self, graph: &DepGraph, callee: &str) -> Option<NodeId> {
        if !callee.contains(['.', ':']) {
            return self.by_name.get(callee).copied();
        }

        let function_suffix = format!("::{}", callee);
        let method_suffix = format!(".{}", callee);
        self.callables.iter().copied().find(|&index| {
            graph.get(index).is_some_and(|node| match node.kind {
                NodeKind::Function => node.id.ends_with(&function_suffix),
                NodeKind::Method => node.id.ends_with(&method_suffix),
                _ => false,
            })
        })
    }

    /// Number of indexed callables.
    pub(crate) fn len(&self) -> usize {
        self.callables.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use depgraph_core::FunctionDecl;

    #[test]
    fn test_first_match_in_insertion_order() {
        let mut g = DepGraph::new();
        g.add_node(Node::file("a.py"));
        g.add_node(Node::method("a.py", "K", &FunctionDecl::new("run")));
        g.add_node(Node::function("a.py", &FunctionDecl::new("run")));
        g.add_node(Node::file("b.py"));
        g.add_node(Node::function("b.py", &FunctionDecl::new("helper")));

        let table = SymbolTable::from_graph(&g);
        assert_eq!(table.len(), 3);

        let run = table.first_match(&g, "run").unwrap();
        assert_eq!(g.get(run).unwrap().id, "a.py::K.run");

        let helper = table.first_match(&g, "helper").unwrap();
        assert_eq!(g.get(helper).unwrap().id, "b.py::helper");

        assert!(table.first_match(&g, "missing").is_none());
    }

    #[test]
    fn test_dotted_callee_uses_literal_suffix() {
        let mut g = DepGraph::new();
        g.add_node(Node::file("a.py"));
        g.add_node(Node::method("a.py", "K", &FunctionDecl::new("run")));
        g.add_node(Node::function("a.py", &FunctionDecl::new("v2.run")));
        let table = SymbolTable::from_graph(&g);

        // `K.run` is not a suffix of `a.py::K.run` once the `.` is prepended
        assert!(table.first_match(&g, "K.run").is_none());
        let hit = table.first_match(&g, "v2.run").unwrap();
        assert_eq!(g.get(hit).unwrap().id, "a.py::v2.run");
    }
}
