//! Call reference resolution.
//!
//! Resolution sits behind [`CallResolver`] so node construction never
//! depends on how calls are linked. [`HeuristicResolver`] is the default
//! two-tier policy:
//!
//! 1. **Qualified.** A call with a qualifier looks for the first import in
//!    its file that binds that name. If one exists the result is final:
//!    `<import path>::<callee>` if that node exists, otherwise unresolved
//!    (the import points outside the project).
//! 2. **Fallback.** Unqualified calls, and qualified calls whose qualifier
//!    no import binds (`self.x()`, `obj.x()`), take the first Function or
//!    Method in graph insertion order whose id ends in `::<callee>` or
//!    `.<callee>` respectively. There is no scoring and no preference for
//!    the caller's own file; order of the input decides.

use crate::graph::{DepGraph, NodeId};
use crate::symbol_table::SymbolTable;
use depgraph_core::{CallRef, ValidFile};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Which tier produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionTier {
    Qualified,
    Fallback,
}

/// Why a call produced no edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// The qualifier names an import with no project path.
    ExternalImport { import: String },
    /// The import has a path but the candidate id is not in the graph.
    MissingTarget { candidate: String },
    /// Nothing in the project matches the callee name.
    NoMatch,
}

/// Outcome of resolving one call reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved { target: NodeId, tier: ResolutionTier },
    Unresolved(Unresolved),
}

/// A call reference together with where it was made.
#[derive(Debug, Clone, Copy)]
pub struct CallSite<'a> {
    /// Id of the calling function or method.
    pub caller: &'a str,
    /// The caller's file, for import lookup.
    pub file: &'a ValidFile<'a>,
    pub call: &'a CallRef,
}

/// Resolves call references to graph nodes.
///
/// Implementations only read the graph; edges are added by the builder.
pub trait CallResolver {
    fn resolve(&self, graph: &DepGraph, site: &CallSite<'_>) -> Resolution;
}

/// The default name-and-import heuristic.
#[derive(Debug, Clone)]
pub struct HeuristicResolver {
    symbols: SymbolTable,
}

impl HeuristicResolver {
    /// Indexes a graph whose node set is complete.
    pub fn index(graph: &DepGraph) -> Self {
        let symbols = SymbolTable::from_graph(graph);
        debug!("Indexed {} callables for resolution", symbols.len());
        Self { symbols }
    }

    /// Tier 1. `None` means no import binds the qualifier, so the call
    /// goes on to the fallback tier.
    fn resolve_qualified(
        &self,
        graph: &DepGraph,
        file: &ValidFile<'_>,
        qualifier: &str,
        callee: &str,
    ) -> Option<Resolution> {
        let import = file.import_for(qualifier)?;
        let Some(path) = import.target_path() else {
            return Some(Resolution::Unresolved(Unresolved::ExternalImport {
                import: import.name.clone(),
            }));
        };

        let candidate = format!("{}::{}", path, callee);
        Some(match graph.get_index(&candidate) {
            Some(target) => Resolution::Resolved {
                target,
                tier: ResolutionTier::Qualified,
            },
            None => Resolution::Unresolved(Unresolved::MissingTarget { candidate }),
        })
    }

    /// Tier 2.
    fn resolve_fallback(&self, graph: &DepGraph, callee: &str) -> Resolution {
        match self.symbols.first_match(graph, callee) {
            Some(target) => Resolution::Resolved {
                target,
                tier: ResolutionTier::Fallback,
            },
            None => Resolution::Unresolved(Unresolved::NoMatch),
        }
    }
}

impl CallResolver for HeuristicResolver {
    fn resolve(&self, graph: &DepGraph, site: &CallSite<'_>) -> Resolution {
        let callee = site.call.name.as_str();
        if let Some(qualifier) = site.call.qualifier() {
            if let Some(resolution) = self.resolve_qualified(graph, site.file, qualifier, callee) {
                return resolution;
            }
        }
        self.resolve_fallback(graph, callee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;
    use depgraph_core::{FileSummary, FunctionDecl, ImportDecl, ImportEntry};

    fn graph_with(nodes: Vec<Node>) -> DepGraph {
        let mut g = DepGraph::new();
        for n in nodes {
            g.add_node(n);
        }
        g
    }

    fn resolve(g: &DepGraph, file: &FileSummary, call: CallRef) -> Resolution {
        let valid = file.validate().unwrap();
        let resolver = HeuristicResolver::index(g);
        let site = CallSite {
            caller: "a.py::f",
            file: &valid,
            call: &call,
        };
        resolver.resolve(g, &site)
    }

    #[test]
    fn test_qualified_hit() {
        let g = graph_with(vec![
            Node::function("a.py", &FunctionDecl::new("helper")),
            Node::function("b.py", &FunctionDecl::new("helper")),
        ]);
        let file = FileSummary::new("a.py").with_import(ImportDecl::new("b").with_path("b.py"));

        let res = resolve(&g, &file, CallRef::qualified("b", "helper"));
        assert_eq!(
            res,
            Resolution::Resolved {
                target: g.get_index("b.py::helper").unwrap(),
                tier: ResolutionTier::Qualified
            }
        );
    }

    #[test]
    fn test_qualified_miss_does_not_fall_back() {
        let g = graph_with(vec![Node::function("a.py", &FunctionDecl::new("pow"))]);
        let file = FileSummary::new("a.py")
            .with_import(ImportEntry::Statement("import math".into()))
            .with_import(ImportDecl::new("b").with_path("b.py"));

        assert_eq!(
            resolve(&g, &file, CallRef::qualified("math", "pow")),
            Resolution::Unresolved(Unresolved::ExternalImport { import: "math".into() })
        );
        assert_eq!(
            resolve(&g, &file, CallRef::qualified("b", "pow")),
            Resolution::Unresolved(Unresolved::MissingTarget {
                candidate: "b.py::pow".into()
            })
        );
    }

    #[test]
    fn test_unknown_qualifier_falls_back() {
        let g = graph_with(vec![Node::method("a.py", "K", &FunctionDecl::new("size"))]);
        let file = FileSummary::new("a.py");

        let res = resolve(&g, &file, CallRef::qualified("self", "size"));
        let expected = g.get_index("a.py::K.size").unwrap();
        assert!(matches!(
            res,
            Resolution::Resolved { target, tier: ResolutionTier::Fallback } if target == expected
        ));
    }

    #[test]
    fn test_fallback_first_match_wins() {
        let g = graph_with(vec![
            Node::function("z.py", &FunctionDecl::new("mean")),
            Node::function("a.py", &FunctionDecl::new("mean")),
        ]);
        let file = FileSummary::new("a.py");

        // insertion order, not same-file preference
        let res = resolve(&g, &file, CallRef::local("mean"));
        assert_eq!(
            res,
            Resolution::Resolved {
                target: g.get_index("z.py::mean").unwrap(),
                tier: ResolutionTier::Fallback
            }
        );
        assert_eq!(
            resolve(&g, &file, CallRef::local("median")),
            Resolution::Unresolved(Unresolved::NoMatch)
        );
    }
}
