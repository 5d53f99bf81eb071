//! Import usage aggregation.
//!
//! For each import of a file, the callee names reached through that import
//! are collected from every function and method of the file. Each distinct
//! name that exists as `<import path>::<name>` gets one usage edge from the
//! import node.

use crate::diagnostics::Diagnostic;
use crate::edge::EdgeKind;
use crate::graph::DepGraph;
use crate::node::{symbol_id, NodeKind};
use depgraph_core::{ImportDecl, ValidFile};
use indexmap::IndexSet;
use tracing::debug;

/// Distinct callee names accessed through `import`, in first-seen order.
pub fn used_names<'a>(file: &ValidFile<'a>, import: &ImportDecl) -> IndexSet<&'a str> {
    file.call_refs()
        .filter(|call| call.qualifier().is_some_and(|q| import.declares(q)))
        .map(|call| call.name.as_str())
        .collect()
}

/// True while the import's id still names an Import node. A later
/// declaration with the same name takes the id over.
pub(crate) fn is_live_import(graph: &DepGraph, file: &str, import: &ImportDecl) -> bool {
    graph
        .get_by_id(&symbol_id(file, &import.name))
        .is_some_and(|node| node.kind == NodeKind::Import)
}

/// Adds usage edges for every import of one file.
///
/// Imports without a target path are skipped silently; they name modules
/// outside the project. Returns the number of edges added.
pub fn link_import_usage(
    graph: &mut DepGraph,
    file: &ValidFile<'_>,
    diagnostics: &mut Vec<Diagnostic>,
) -> usize {
    let mut added = 0;

    for import in &file.imports {
        let Some(path) = import.target_path() else {
            continue;
        };
        if !is_live_import(graph, file.path, import) {
            continue;
        }
        let import_id = symbol_id(file.path, &import.name);

        for name in used_names(file, import) {
            let candidate = symbol_id(path, name);
            if !graph.contains(&candidate) {
                debug!("No usage target {} for {}", candidate, import_id);
                diagnostics.push(Diagnostic::unresolved_usage(file.path, &candidate, &import_id));
                continue;
            }
            if graph.add_edge(&import_id, &candidate, EdgeKind::ImportUsage) {
                added += 1;
            }
        }
    }

    added
}
