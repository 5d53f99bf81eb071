//! Node types for the dependency graph.
//!
//! Node ids are paths built from ancestry, so they are readable and stable
//! across rebuilds:
//!
//! | kind     | id                          |
//! |----------|-----------------------------|
//! | File     | `<file>`                    |
//! | Import   | `<file>::<name>`            |
//! | Function | `<file>::<name>`            |
//! | Class    | `<file>::<Class>`           |
//! | Method   | `<file>::<Class>.<method>`  |

use depgraph_core::{FunctionDecl, ImportDecl, Parameter};
use serde::{Deserialize, Serialize};

/// The kind of a declared symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    File,
    Import,
    Class,
    Method,
    Function,
}

impl NodeKind {
    /// Functions and methods: the nodes that make calls.
    pub fn is_callable(&self) -> bool {
        matches!(self, NodeKind::Function | NodeKind::Method)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::File => "file",
            Self::Import => "import",
            Self::Class => "class",
            Self::Method => "method",
            Self::Function => "function",
        };
        write!(f, "{}", s)
    }
}

/// Parameters and return type of a callable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub parameters: Vec<Parameter>,
    pub return_type: Option<String>,
}

impl Signature {
    pub fn of(decl: &FunctionDecl) -> Self {
        Self {
            parameters: decl.parameters.clone(),
            return_type: decl.return_type.clone(),
        }
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p.name)?;
            if let Some(ty) = &p.param_type {
                write!(f, ": {}", ty)?;
            }
            if let Some(default) = &p.default_value {
                write!(f, " = {}", default)?;
            }
        }
        write!(f, ")")?;
        if let Some(ret) = &self.return_type {
            write!(f, " -> {}", ret)?;
        }
        Ok(())
    }
}

/// A method as listed on its class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSummary {
    pub name: String,
    pub signature: Signature,
}

/// Kind-specific payload carried by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMeta {
    /// Files carry nothing.
    Empty,
    /// Functions and methods.
    Callable(Signature),
    /// Classes list their methods.
    Class { methods: Vec<MethodSummary> },
    /// Imports carry the project file they resolve to, if any.
    Import { path: Option<String> },
}

/// A declared symbol in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    /// Globally unique id, see the module docs.
    pub id: String,
    pub kind: NodeKind,
    /// Display label (the bare declared name, or the file name for files).
    pub label: String,
    /// Declaring file. `None` only for File nodes.
    pub parent: Option<String>,
    pub meta: NodeMeta,
}

impl Node {
    pub fn file(path: &str) -> Self {
        let label = path
            .rsplit(['/', '\\'])
            .find(|s| !s.is_empty())
            .unwrap_or(path);
        Self {
            id: path.to_string(),
            kind: NodeKind::File,
            label: label.to_string(),
            parent: None,
            meta: NodeMeta::Empty,
        }
    }

    pub fn import(file: &str, decl: &ImportDecl) -> Self {
        Self {
            id: format!("{}::{}", file, decl.name),
            kind: NodeKind::Import,
            label: decl.name.clone(),
            parent: Some(file.to_string()),
            meta: NodeMeta::Import {
                path: decl.target_path().map(str::to_string),
            },
        }
    }

    pub fn class(file: &str, name: &str, methods: &[FunctionDecl]) -> Self {
        Self {
            id: format!("{}::{}", file, name),
            kind: NodeKind::Class,
            label: name.to_string(),
            parent: Some(file.to_string()),
            meta: NodeMeta::Class {
                methods: methods
                    .iter()
                    .map(|m| MethodSummary {
                        name: m.name.clone(),
                        signature: Signature::of(m),
                    })
                    .collect(),
            },
        }
    }

    pub fn method(file: &str, class: &str, decl: &FunctionDecl) -> Self {
        Self {
            id: method_id(file, class, &decl.name),
            kind: NodeKind::Method,
            label: decl.name.clone(),
            parent: Some(file.to_string()),
            meta: NodeMeta::Callable(Signature::of(decl)),
        }
    }

    pub fn function(file: &str, decl: &FunctionDecl) -> Self {
        Self {
            id: symbol_id(file, &decl.name),
            kind: NodeKind::Function,
            label: decl.name.clone(),
            parent: Some(file.to_string()),
            meta: NodeMeta::Callable(Signature::of(decl)),
        }
    }

    /// The declaring file: the parent, or the node itself for files.
    pub fn file_id(&self) -> &str {
        self.parent.as_deref().unwrap_or(&self.id)
    }

    pub fn signature(&self) -> Option<&Signature> {
        match &self.meta {
            NodeMeta::Callable(sig) => Some(sig),
            _ => None,
        }
    }
}

/// Id of a file-level symbol (function, import, class).
pub fn symbol_id(file: &str, name: &str) -> String {
    format!("{}::{}", file, name)
}

/// Id of a method.
pub fn method_id(file: &str, class: &str, method: &str) -> String {
    format!("{}::{}.{}", file, class, method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        let f = FunctionDecl::new("mean");
        assert_eq!(Node::function("u.py", &f).id, "u.py::mean");
        assert_eq!(Node::method("u.py", "Stats", &f).id, "u.py::Stats.mean");
        assert_eq!(Node::class("u.py", "Stats", &[]).id, "u.py::Stats");
        assert_eq!(Node::import("u.py", &ImportDecl::new("math")).id, "u.py::math");
    }

    #[test]
    fn test_file_label() {
        let node = Node::file("/home/me/proj/geometry_utils.py");
        assert_eq!(node.label, "geometry_utils.py");
        assert_eq!(node.parent, None);
        assert_eq!(node.file_id(), "/home/me/proj/geometry_utils.py");
        assert_eq!(Node::file("plain.py").label, "plain.py");
    }

    #[test]
    fn test_signature_display() {
        let decl = FunctionDecl::new("volume")
            .with_parameter(Parameter::typed("a", "float"))
            .with_parameter(Parameter {
                name: "c".into(),
                param_type: Some("float".into()),
                default_value: Some("0".into()),
            })
            .with_return_type("float");
        let sig = Signature::of(&decl);
        assert_eq!(sig.to_string(), "(a: float, c: float = 0) -> float");
    }

    #[test]
    fn test_import_meta_drops_empty_path() {
        let decl = ImportDecl::new("b").with_path("");
        assert_eq!(
            Node::import("a.py", &decl).meta,
            NodeMeta::Import { path: None }
        );
    }
}
