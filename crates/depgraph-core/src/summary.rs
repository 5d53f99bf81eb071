//! The symbol summary wire contract.
//!
//! An external analyzer describes each source file as a list of imports,
//! top-level functions and classes. Every callable carries its parameters,
//! return type and the calls it makes. This is all the graph builder sees;
//! it never reads source text.

use crate::error::{Result, SummaryError};
use crate::import::{ImportDecl, ImportEntry};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A whole-project summary: one entry per analyzed file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    #[serde(default)]
    pub files: Vec<FileSummary>,
}

/// One file's declarations, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    /// Path of the file. Becomes the id of its File node.
    #[serde(default)]
    pub file_name: String,

    #[serde(default)]
    pub imports: Vec<ImportEntry>,

    #[serde(default)]
    pub functions: Vec<FunctionDecl>,

    #[serde(default)]
    pub classes: Vec<ClassDecl>,
}

/// A function or method declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionDecl {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub parameters: Vec<Parameter>,

    #[serde(default)]
    pub return_type: Option<String>,

    /// Outgoing call references, in the order the analyzer found them.
    #[serde(default, alias = "calls")]
    pub function_calls: Vec<CallRef>,
}

/// Methods share the function shape.
pub type MethodDecl = FunctionDecl;

/// A class and its methods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassDecl {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

/// A single declared parameter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub param_type: Option<String>,

    #[serde(default)]
    pub default_value: Option<String>,
}

/// A call made from a function or method body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallRef {
    /// The callee name (`sqrt` in `math.sqrt(x)`).
    #[serde(default)]
    pub name: String,

    /// The local import name the call went through (`math` in `math.sqrt(x)`).
    #[serde(default, rename = "import_name", alias = "qualifier")]
    pub qualifier: Option<String>,
}

impl FunctionDecl {
    /// Creates a declaration with no parameters, return type or calls.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_return_type(mut self, return_type: impl Into<String>) -> Self {
        self.return_type = Some(return_type.into());
        self
    }

    pub fn with_call(mut self, call: CallRef) -> Self {
        self.function_calls.push(call);
        self
    }
}

impl ClassDecl {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: Vec::new(),
        }
    }

    pub fn with_method(mut self, method: MethodDecl) -> Self {
        self.methods.push(method);
        self
    }
}

impl Parameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: None,
            default_value: None,
        }
    }

    pub fn typed(name: impl Into<String>, param_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: Some(param_type.into()),
            default_value: None,
        }
    }
}

impl CallRef {
    /// An unqualified call.
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: None,
        }
    }

    /// A call accessed through an import (`qualifier.name`).
    pub fn qualified(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            qualifier: Some(qualifier.into()),
        }
    }

    /// The qualifier, treating an empty string as absent.
    pub fn qualifier(&self) -> Option<&str> {
        self.qualifier.as_deref().filter(|q| !q.is_empty())
    }
}

impl FileSummary {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            ..Default::default()
        }
    }

    pub fn with_import(mut self, import: impl Into<ImportEntry>) -> Self {
        self.imports.push(import.into());
        self
    }

    pub fn with_function(mut self, function: FunctionDecl) -> Self {
        self.functions.push(function);
        self
    }

    pub fn with_class(mut self, class: ClassDecl) -> Self {
        self.classes.push(class);
        self
    }

    /// Checks every required field and normalizes imports.
    ///
    /// Node ids are built from names, so any missing name makes the whole
    /// file unusable.
    pub fn validate(&self) -> Result<ValidFile<'_>> {
        let file = self.file_name.as_str();
        if file.trim().is_empty() {
            return Err(SummaryError::malformed("<unnamed>", "missing file_name"));
        }

        let mut imports = Vec::with_capacity(self.imports.len());
        for entry in &self.imports {
            let decls = entry
                .to_decls()
                .map_err(|e| SummaryError::malformed(file, e.to_string()))?;
            for decl in decls {
                if decl.name.is_empty() {
                    return Err(SummaryError::malformed(file, "import without a name"));
                }
                imports.push(decl);
            }
        }

        for function in &self.functions {
            check_callable(file, "function", function)?;
        }

        for class in &self.classes {
            if class.name.is_empty() {
                return Err(SummaryError::malformed(file, "class without a name"));
            }
            for method in &class.methods {
                check_callable(file, "method", method)?;
            }
        }

        Ok(ValidFile {
            path: file,
            imports,
            functions: &self.functions,
            classes: &self.classes,
        })
    }
}

fn check_callable(file: &str, what: &str, decl: &FunctionDecl) -> Result<()> {
    if decl.name.is_empty() {
        return Err(SummaryError::malformed(file, format!("{} without a name", what)));
    }
    if decl.parameters.iter().any(|p| p.name.is_empty()) {
        return Err(SummaryError::malformed(
            file,
            format!("{} `{}` has a parameter without a name", what, decl.name),
        ));
    }
    if decl.function_calls.iter().any(|c| c.name.is_empty()) {
        return Err(SummaryError::malformed(
            file,
            format!("{} `{}` has a call without a callee name", what, decl.name),
        ));
    }
    Ok(())
}

/// A file summary that passed validation, with imports normalized.
#[derive(Debug, Clone)]
pub struct ValidFile<'a> {
    pub path: &'a str,
    pub imports: Vec<ImportDecl>,
    pub functions: &'a [FunctionDecl],
    pub classes: &'a [ClassDecl],
}

impl<'a> ValidFile<'a> {
    /// First import (declaration order) binding `local`.
    pub fn import_for(&self, local: &str) -> Option<&ImportDecl> {
        self.imports.iter().find(|imp| imp.declares(local))
    }

    /// Every call reference in the file: functions first, then class
    /// methods, each in declaration order.
    pub fn call_refs(&self) -> impl Iterator<Item = &'a CallRef> {
        let functions = self.functions;
        let classes = self.classes;
        functions
            .iter()
            .chain(classes.iter().flat_map(|c| c.methods.iter()))
            .flat_map(|f| f.function_calls.iter())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Lenient loading
// ─────────────────────────────────────────────────────────────────────────────

/// A project summary plus the entries that could not be read.
#[derive(Debug, Default)]
pub struct ParsedSummary {
    pub summary: ProjectSummary,
    pub rejected: Vec<SummaryError>,
}

#[derive(Deserialize)]
struct RawProject {
    #[serde(default)]
    files: Vec<Value>,
}

impl ProjectSummary {
    /// Parses a project summary, tolerating individual bad file entries.
    ///
    /// Invalid JSON at the top level is an error; a file entry with the wrong
    /// shape is reported in [`ParsedSummary::rejected`] and skipped.
    pub fn from_json(json: &str) -> Result<ParsedSummary> {
        let raw: RawProject = serde_json::from_str(json)?;
        Ok(Self::from_values(raw.files))
    }

    /// Builds a summary from already-decoded file entries.
    pub fn from_values(values: Vec<Value>) -> ParsedSummary {
        let mut parsed = ParsedSummary::default();
        for (index, value) in values.into_iter().enumerate() {
            match file_from_value(value, index) {
                Ok(file) => parsed.summary.files.push(file),
                Err(e) => parsed.rejected.push(e),
            }
        }
        parsed
    }

    /// Total number of declared symbols, excluding files.
    pub fn symbol_count(&self) -> usize {
        self.files
            .iter()
            .map(|f| {
                f.imports.len()
                    + f.functions.len()
                    + f.classes.iter().map(|c| 1 + c.methods.len()).sum::<usize>()
            })
            .sum()
    }
}

/// Decodes one file entry, naming it as well as possible on failure.
pub(crate) fn file_from_value(value: Value, index: usize) -> Result<FileSummary> {
    let label = value
        .get("file_name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| format!("files[{}]", index));

    serde_json::from_value(value).map_err(|e| SummaryError::malformed(label, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "files": [
            {
                "file_name": "a.py",
                "imports": [{"name": "b", "path": "b.py"}, "import math"],
                "functions": [
                    {
                        "name": "f",
                        "parameters": [{"name": "x", "param_type": "int", "default_value": null}],
                        "return_type": "int",
                        "function_calls": [
                            {"name": "helper", "import_name": "b"},
                            {"name": "sqrt", "import_name": "math"},
                            {"name": "g"}
                        ]
                    }
                ],
                "classes": [
                    {"name": "K", "methods": [{"name": "run", "parameters": [{"name": "self"}]}]}
                ]
            },
            {"file_name": "b.py", "functions": [{"name": "helper"}]}
        ]
    }"#;

    #[test]
    fn test_parse_sample() {
        let parsed = ProjectSummary::from_json(SAMPLE).unwrap();
        assert!(parsed.rejected.is_empty());
        let files = &parsed.summary.files;
        assert_eq!(files.len(), 2);
        assert_eq!(files[0].functions[0].function_calls.len(), 3);
        assert_eq!(files[0].functions[0].function_calls[0].qualifier(), Some("b"));
        assert_eq!(files[0].functions[0].function_calls[2].qualifier(), None);
        assert!(files[1].imports.is_empty());
        assert_eq!(parsed.summary.symbol_count(), 2 + 1 + 2 + 1);
    }

    #[test]
    fn test_validate_normalizes_imports() {
        let parsed = ProjectSummary::from_json(SAMPLE).unwrap();
        let valid = parsed.summary.files[0].validate().unwrap();
        assert_eq!(valid.path, "a.py");
        assert_eq!(valid.imports.len(), 2);
        assert_eq!(valid.import_for("b").and_then(|i| i.target_path()), Some("b.py"));
        assert_eq!(valid.import_for("math").and_then(|i| i.target_path()), None);
        assert!(valid.import_for("os").is_none());
    }

    #[test]
    fn test_bad_entry_is_rejected_alone() {
        let json = r#"{"files": [
            {"file_name": "ok.py"},
            {"file_name": "bad.py", "functions": 7}
        ]}"#;
        let parsed = ProjectSummary::from_json(json).unwrap();
        assert_eq!(parsed.summary.files.len(), 1);
        assert_eq!(parsed.rejected.len(), 1);
        assert!(parsed.rejected[0].to_string().contains("bad.py"));
    }

    #[test]
    fn test_missing_names_are_malformed() {
        let file = FileSummary::new("x.py").with_function(FunctionDecl::new(""));
        assert!(matches!(file.validate(), Err(SummaryError::Malformed { .. })));

        let file = FileSummary::new("");
        assert!(file.validate().is_err());

        let file = FileSummary::new("x.py")
            .with_class(ClassDecl::new("C").with_method(FunctionDecl::new("m").with_call(CallRef::local(""))));
        assert!(file.validate().is_err());

        let file = FileSummary::new("x.py").with_import(ImportEntry::Statement("#include".into()));
        assert!(file.validate().is_err());
    }

    #[test]
    fn test_call_refs_order() {
        let file = FileSummary::new("x.py")
            .with_class(ClassDecl::new("C").with_method(FunctionDecl::new("m").with_call(CallRef::local("second"))))
            .with_function(FunctionDecl::new("f").with_call(CallRef::local("first")));
        let valid = file.validate().unwrap();
        let names: Vec<_> = valid.call_refs().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn test_qualifier_alias_on_wire() {
        let call: CallRef = serde_json::from_str(r#"{"name": "pow", "qualifier": "math"}"#).unwrap();
        assert_eq!(call.qualifier(), Some("math"));
        let empty: CallRef = serde_json::from_str(r#"{"name": "pow", "import_name": ""}"#).unwrap();
        assert_eq!(empty.qualifier(), None);
    }
}
