//! Graph builder for constructing the dependency graph from summaries.
//!
//! Building is two-phase and whole-project. [`GraphBuilder`] adds the nodes
//! of every file (plus their containment edges); only by consuming it with
//! [`GraphBuilder::finish_nodes`] does one get a [`Linker`], which resolves
//! calls and import usages. Edges may point into any file, so the node set
//! has to be complete before the first reference is looked up.

use crate::diagnostics::Diagnostic;
use crate::edge::EdgeKind;
use crate::graph::DepGraph;
use crate::node::{method_id, symbol_id, Node, NodeKind};
use crate::resolver::{CallResolver, CallSite, HeuristicResolver, Resolution, Unresolved};
use crate::usage::{is_live_import, link_import_usage};
use depgraph_core::{
    FileSummary, FunctionDecl, ParsedSummary, ProjectSummary, SummaryError, ValidFile,
};
use indexmap::map::Entry;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Counters describing one build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildStats {
    pub files: usize,
    pub rejected_files: usize,
    pub calls_resolved: usize,
    pub calls_unresolved: usize,
    pub usage_edges: usize,
}

/// A finished graph and everything noticed while building it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildOutput {
    pub graph: DepGraph,
    pub diagnostics: Vec<Diagnostic>,
    pub stats: BuildStats,
}

/// Phase one: node construction.
///
/// Call [`add_project`](Self::add_project), then
/// [`finish_nodes`](Self::finish_nodes).
pub struct GraphBuilder<'s> {
    graph: DepGraph,
    files: Vec<ValidFile<'s>>,
    diagnostics: Vec<Diagnostic>,
    stats: BuildStats,
}

/// A node waiting to be inserted, with the node that contains it.
struct Staged {
    node: Node,
    container: Option<String>,
}

impl Default for GraphBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'s> GraphBuilder<'s> {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self {
            graph: DepGraph::new(),
            files: Vec::new(),
            diagnostics: Vec::new(),
            stats: BuildStats::default(),
        }
    }

    /// Adds every file of a project summary.
    ///
    /// When several entries share a file path the last entry replaces the
    /// earlier ones whole; each dropped entry is reported as a duplicate.
    pub fn add_project(&mut self, summary: &'s ProjectSummary) {
        let mut last_entry: HashMap<&str, usize> = HashMap::new();
        for (position, file) in summary.files.iter().enumerate() {
            last_entry.insert(file.file_name.as_str(), position);
        }

        for (position, file) in summary.files.iter().enumerate() {
            let path = file.file_name.as_str();
            if !path.trim().is_empty() && last_entry.get(path) != Some(&position) {
                warn!("Superseded summary entry for {}", path);
                self.diagnostics.push(Diagnostic::duplicate(path, path));
                continue;
            }
            self.add_file(file);
        }
    }

    /// Adds the nodes of one file.
    ///
    /// A malformed file is recorded as a diagnostic and contributes nothing.
    /// Returns whether the file was accepted.
    fn add_file(&mut self, file: &'s FileSummary) -> bool {
        let valid = match file.validate() {
            Ok(valid) => valid,
            Err(e) => {
                self.reject(&e);
                return false;
            }
        };

        let staged = self.stage_file(&valid);
        for Staged { node, container } in staged.into_values() {
            let id = node.id.clone();
            let (index, replaced) = self.graph.add_node(node);
            if replaced.is_some() {
                // same id declared by an earlier file entry
                warn!("Duplicate identifier across entries: {}", id);
                self.diagnostics.push(Diagnostic::duplicate(valid.path, &id));
            }

            if let Some(container) = container {
                let owns = self
                    .graph
                    .get_by_id(&container)
                    .is_some_and(|c| matches!(c.kind, NodeKind::File | NodeKind::Class));
                if owns {
                    if let Some(from) = self.graph.get_index(&container) {
                        self.graph
                            .add_edge_by_index(from, index, EdgeKind::Containment);
                    }
                }
            }
        }

        debug!("Added nodes for {}", valid.path);
        self.stats.files += 1;
        self.files.push(valid);
        true
    }

    /// Records a file entry that never made it into the build.
    pub fn reject(&mut self, error: &SummaryError) {
        warn!("Skipping malformed file: {}", error);
        let diagnostic = match error {
            SummaryError::Malformed { file, reason } => Diagnostic::malformed(file, reason),
            other => Diagnostic::malformed("<summary>", other),
        };
        self.diagnostics.push(diagnostic);
        self.stats.rejected_files += 1;
    }

    /// Builds the node records of one file, by category: the file, then
    /// imports, then classes each followed by its methods, then functions.
    ///
    /// Ids colliding within the file keep the first position and take the
    /// record staged last. Categories are staged in the fixed order above,
    /// so a function beats a class or import of the same name wherever
    /// either was declared.
    fn stage_file(&mut self, file: &ValidFile<'_>) -> IndexMap<String, Staged> {
        let mut staged = IndexMap::new();
        let path = file.path;

        self.stage(&mut staged, path, Node::file(path), None);

        for import in &file.imports {
            self.stage(&mut staged, path, Node::import(path, import), Some(path.to_string()));
        }

        for class in file.classes {
            let class_id = symbol_id(path, &class.name);
            self.stage(&mut staged, path, Node::class(path, &class.name, &class.methods), None);
            for method in &class.methods {
                self.stage(
                    &mut staged,
                    path,
                    Node::method(path, &class.name, method),
                    Some(class_id.clone()),
                );
            }
        }

        for function in file.functions {
            self.stage(&mut staged, path, Node::function(path, function), None);
        }

        staged
    }

    fn stage(
        &mut self,
        staged: &mut IndexMap<String, Staged>,
        file: &str,
        node: Node,
        container: Option<String>,
    ) {
        match staged.entry(node.id.clone()) {
            Entry::Occupied(mut slot) => {
                warn!("Duplicate identifier in {}: {}", file, node.id);
                self.diagnostics.push(Diagnostic::duplicate(file, &node.id));
                *slot.get_mut() = Staged { node, container };
            }
            Entry::Vacant(slot) => {
                slot.insert(Staged { node, container });
            }
        }
    }

    /// Ends node construction. Every node of every file now exists.
    ///
    /// Imports whose id was taken over by another declaration are dropped
    /// here, so phase two neither resolves through them nor links their
    /// usages.
    pub fn finish_nodes(mut self) -> Linker<'s> {
        for file in &mut self.files {
            let path = file.path;
            let graph = &self.graph;
            file.imports.retain(|import| {
                let live = is_live_import(graph, path, import);
                if !live {
                    debug!("Import {} in {} lost its node", import.name, path);
                }
                live
            });
        }

        info!(
            "Node phase complete: {} files, {} nodes",
            self.stats.files,
            self.graph.node_count()
        );
        Linker {
            graph: self.graph,
            files: self.files,
            diagnostics: self.diagnostics,
            stats: self.stats,
        }
    }

    /// Runs both phases with the default resolver.
    pub fn build(self) -> BuildOutput {
        self.finish_nodes().resolve_edges()
    }
}

/// Phase two: reference resolution over a complete node set.
pub struct Linker<'s> {
    graph: DepGraph,
    files: Vec<ValidFile<'s>>,
    diagnostics: Vec<Diagnostic>,
    stats: BuildStats,
}

impl<'s> Linker<'s> {
    /// The complete node set, for constructing a custom resolver.
    pub fn graph(&self) -> &DepGraph {
        &self.graph
    }

    /// Resolves edges with the default [`HeuristicResolver`].
    pub fn resolve_edges(self) -> BuildOutput {
        let resolver = HeuristicResolver::index(self.graph());
        self.resolve_edges_with(&resolver)
    }

    /// Resolves call and import-usage edges with the given resolver.
    ///
    /// Per file: function calls, then method calls, then import usages.
    pub fn resolve_edges_with<R: CallResolver + ?Sized>(self, resolver: &R) -> BuildOutput {
        let Linker {
            mut graph,
            files,
            mut diagnostics,
            mut stats,
        } = self;

        for file in &files {
            for function in file.functions {
                let caller = symbol_id(file.path, &function.name);
                link_calls(&mut graph, resolver, file, &caller, function, &mut diagnostics, &mut stats);
            }

            for class in file.classes {
                for method in &class.methods {
                    let caller = method_id(file.path, &class.name, &method.name);
                    link_calls(&mut graph, resolver, file, &caller, method, &mut diagnostics, &mut stats);
                }
            }

            stats.usage_edges += link_import_usage(&mut graph, file, &mut diagnostics);
        }

        info!(
            "Edge phase complete: {} resolved calls, {} unresolved, {} usage edges",
            stats.calls_resolved, stats.calls_unresolved, stats.usage_edges
        );

        BuildOutput {
            graph,
            diagnostics,
            stats,
        }
    }
}

fn link_calls<R: CallResolver + ?Sized>(
    graph: &mut DepGraph,
    resolver: &R,
    file: &ValidFile<'_>,
    caller: &str,
    decl: &FunctionDecl,
    diagnostics: &mut Vec<Diagnostic>,
    stats: &mut BuildStats,
) {
    let Some(from) = graph.get_index(caller) else {
        return;
    };
    // a later declaration of another kind may have taken this id
    if !graph.get(from).is_some_and(|n| n.kind.is_callable()) {
        return;
    }

    for call in &decl.function_calls {
        let site = CallSite { caller, file, call };
        match resolver.resolve(graph, &site) {
            Resolution::Resolved { target, tier } => {
                debug!("{} -> {} ({:?})", caller, call.name, tier);
                graph.add_edge_by_index(from, target, EdgeKind::Call);
                stats.calls_resolved += 1;
            }
            Resolution::Unresolved(reason) => {
                match &reason {
                    Unresolved::ExternalImport { import } => {
                        debug!("{} calls {} through external import {}", caller, call.name, import)
                    }
                    Unresolved::MissingTarget { candidate } => {
                        debug!("{} calls missing {}", caller, candidate)
                    }
                    Unresolved::NoMatch => debug!("{} calls unknown {}", caller, call.name),
                }
                diagnostics.push(Diagnostic::unresolved_call(file.path, &call.name, caller));
                stats.calls_unresolved += 1;
            }
        }
    }
}

/// Builds a graph from a whole project summary.
pub fn build_graph(summary: &ProjectSummary) -> BuildOutput {
    let mut builder = GraphBuilder::new();
    builder.add_project(summary);
    builder.build()
}

/// Builds a graph from a leniently parsed summary, carrying its rejected
/// entries over as diagnostics.
pub fn build_parsed(parsed: &ParsedSummary) -> BuildOutput {
    let mut builder = GraphBuilder::new();
    for error in &parsed.rejected {
        builder.reject(error);
    }
    builder.add_project(&parsed.summary);
    builder.build()
}
