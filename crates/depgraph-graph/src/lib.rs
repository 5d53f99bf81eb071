//! Depgraph Graph - symbol resolution and dependency graph construction
//!
//! This crate turns validated file summaries into a graph of declared
//! symbols and the relationships between them.
//!
//! # Architecture
//!
//! Construction is two-phase and whole-project:
//! - [`GraphBuilder`] adds File, Import, Class, Method and Function nodes for
//!   every file, with containment edges
//! - [`Linker`] resolves call references through a [`CallResolver`] and adds
//!   import usage edges
//!
//! The graph uses petgraph internally with an id index and a per-file index.
//!
//! # Example
//!
//! ```no_run
//! use depgraph_core::{CallRef, FileSummary, FunctionDecl, ProjectSummary};
//! use depgraph_graph::build_graph;
//!
//! let summary = ProjectSummary {
//!     files: vec![FileSummary::new("a.py")
//!         .with_function(FunctionDecl::new("f").with_call(CallRef::local("g")))
//!         .with_function(FunctionDecl::new("g"))],
//! };
//!
//! let output = build_graph(&summary);
//! let callees = output.graph.get_callees(output.graph.get_index("a.py::f").unwrap());
//! assert_eq!(callees[0].id, "a.py::g");
//! ```

mod builder;
mod diagnostics;
mod edge;
mod error;
mod graph;
mod node;
mod resolver;
mod selection;
mod store;
mod symbol_table;
mod usage;

pub use builder::{build_graph, build_parsed, BuildOutput, BuildStats, GraphBuilder, Linker};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use edge::{EdgeKind, GraphEdge};
pub use error::GraphError;
pub use graph::{DepGraph, GraphStats, NodeId};
pub use node::{method_id, symbol_id, MethodSummary, Node, NodeKind, NodeMeta, Signature};
pub use resolver::{
    CallResolver, CallSite, HeuristicResolver, Resolution, ResolutionTier, Unresolved,
};
pub use selection::NodeDetail;
pub use store::{GraphStore, StoreError};
pub use symbol_table::SymbolTable;
pub use usage::{link_import_usage, used_names};
