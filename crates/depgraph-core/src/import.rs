//! Import declarations.
//!
//! The canonical shape is structured: a local name, an optional path to the
//! project file it resolves to, and any extra names it binds. Older analyzer
//! output sends whole statements instead (`"import math"`); those are parsed
//! here into declarations without a path, so they never link into the project.

use crate::error::{Result, SummaryError};
use serde::{Deserialize, Serialize};

/// A structured import declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    /// Local name of the import. Also the last segment of its node id.
    #[serde(default)]
    pub name: String,

    /// Project file the import resolves to, if the analyzer found one.
    #[serde(default)]
    pub path: Option<String>,

    /// Additional local names bound by the same declaration
    /// (`import a as x`, `from m import f, g`).
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ImportDecl {
    /// Creates an import with no resolved path.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            aliases: Vec::new(),
        }
    }

    /// Sets the resolved target path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Adds a local alias.
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Returns true if `local` is one of the names this import binds.
    pub fn declares(&self, local: &str) -> bool {
        self.name == local || self.aliases.iter().any(|a| a == local)
    }

    /// The resolved target path, ignoring empty strings.
    pub fn target_path(&self) -> Option<&str> {
        self.path.as_deref().filter(|p| !p.is_empty())
    }
}

/// An import as it appears on the wire: structured, or a raw statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ImportEntry {
    Declared(ImportDecl),
    Statement(String),
}

impl ImportEntry {
    /// Normalizes the entry into one or more structured declarations.
    ///
    /// A single statement such as `import os, sys` yields several.
    pub fn to_decls(&self) -> Result<Vec<ImportDecl>> {
        match self {
            ImportEntry::Declared(decl) => Ok(vec![decl.clone()]),
            ImportEntry::Statement(stmt) => parse_import_statement(stmt),
        }
    }
}

impl From<ImportDecl> for ImportEntry {
    fn from(decl: ImportDecl) -> Self {
        ImportEntry::Declared(decl)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Statement parsing
// ─────────────────────────────────────────────────────────────────────────────

/// Parses a Python-style import statement.
///
/// Supported forms:
/// - `import a`, `import a.b`, `import a as x`, `import a, b as y`
/// - `from m import f`, `from m import f as g, h`, `from m import (f, g)`
/// - `from m import *`
pub fn parse_import_statement(statement: &str) -> Result<Vec<ImportDecl>> {
    let stmt = statement.trim().trim_end_matches(';').trim();
    let invalid = || SummaryError::ImportStatement(statement.to_string());

    if let Some(rest) = stmt.strip_prefix("from ") {
        let (module, names) = rest.split_once(" import ").ok_or_else(invalid)?;
        let module = module.trim();
        if !is_dotted_name(module) {
            return Err(invalid());
        }

        let mut decl = ImportDecl::new(module);
        let names = names.trim().trim_start_matches('(').trim_end_matches(')');
        for item in names.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if item == "*" {
                continue;
            }
            let (_, local) = split_alias(item).ok_or_else(invalid)?;
            decl.aliases.push(local.to_string());
        }
        return Ok(vec![decl]);
    }

    let rest = stmt.strip_prefix("import ").ok_or_else(invalid)?;
    let mut decls = Vec::new();
    for item in rest.split(',').map(str::trim) {
        let (module, local) = split_alias(item).ok_or_else(invalid)?;
        let mut decl = ImportDecl::new(module);
        if local != module {
            decl.aliases.push(local.to_string());
        } else if let Some((head, _)) = module.split_once('.') {
            // `import a.b` binds `a` as well
            decl.aliases.push(head.to_string());
        }
        decls.push(decl);
    }

    if decls.is_empty() {
        return Err(invalid());
    }
    Ok(decls)
}

/// Splits `name as alias` into `(name, alias)`; a bare name is its own alias.
fn split_alias(item: &str) -> Option<(&str, &str)> {
    let (name, local) = match item.split_once(" as ") {
        Some((name, alias)) => (name.trim(), alias.trim()),
        None => (item, item),
    };
    if is_dotted_name(name) && is_dotted_name(local) {
        Some((name, local))
    } else {
        None
    }
}

fn is_dotted_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
}
