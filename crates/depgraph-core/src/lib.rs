//! Depgraph Core - symbol summaries
//!
//! This crate defines the contract between an external code analyzer and the
//! graph builder: per-file summaries of imports, functions, classes and the
//! calls they make. It also owns summary validation, the legacy
//! import-statement parser, the on-disk summary cache and workspace config.
//!
//! # Example
//!
//! ```
//! use depgraph_core::{CallRef, FileSummary, FunctionDecl, ImportDecl};
//!
//! let file = FileSummary::new("a.py")
//!     .with_import(ImportDecl::new("b").with_path("b.py"))
//!     .with_function(FunctionDecl::new("f").with_call(CallRef::qualified("b", "helper")));
//!
//! let valid = file.validate().unwrap();
//! assert!(valid.import_for("b").is_some());
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod import;
pub mod summary;

pub use cache::{CachedSummary, SummaryCache};
pub use config::DepgraphConfig;
pub use error::{Result, SummaryError};
pub use import::{parse_import_statement, ImportDecl, ImportEntry};
pub use summary::{
    CallRef, ClassDecl, FileSummary, FunctionDecl, MethodDecl, Parameter, ParsedSummary,
    ProjectSummary, ValidFile,
};
