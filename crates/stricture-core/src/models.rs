//! Shared typed models used across adapters, the project context, and rules.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Number of lines in `source`: 0 for empty input, otherwise one more than the
/// number of `\n` bytes.
pub fn count_lines(source: &[u8]) -> usize {
    if source.is_empty() {
        return 0;
    }
    1 + source.iter().filter(|&&b| b == b'\n').count()
}

/// Convert any path to forward-slash form.
pub fn to_slash(path: &str) -> String {
    path.replace('\\', "/")
}

// ---------------------------------------------------------------------------
// 1. UnifiedFileModel
// ---------------------------------------------------------------------------

/// Language-neutral summary of one parsed source file.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UnifiedFileModel {
    pub path: String,
    pub language: String,
    pub is_test_file: bool,
    #[serde(skip)]
    pub source: Vec<u8>,
    pub line_count: usize,
    pub imports: Vec<ImportDecl>,
    pub exports: Vec<ExportDecl>,
    pub functions: Vec<FuncModel>,
    pub types: Vec<TypeModel>,
    pub classes: Vec<ClassModel>,
    pub test_cases: Vec<TestCase>,
    /// Source files this test file declares it exercises.
    pub test_targets: Vec<String>,
    pub json_tags: Vec<JsonTag>,
}

impl UnifiedFileModel {
    /// Start a model for `path` holding a private copy of `source`.
    pub fn new(path: &str, language: &str, is_test_file: bool, source: &[u8]) -> Self {
        Self {
            path: to_slash(path),
            language: language.to_string(),
            is_test_file,
            source: source.to_vec(),
            line_count: count_lines(source),
            ..Self::default()
        }
    }

    pub fn source_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.source)
    }

    /// Functions declared at the top level plus methods of every class.
    pub fn all_functions(&self) -> impl Iterator<Item = &FuncModel> {
        self.functions
            .iter()
            .chain(self.classes.iter().flat_map(|c| c.methods.iter()))
    }

    /// Last path segment without its directory.
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

// ---------------------------------------------------------------------------
// 2. Imports and exports
// ---------------------------------------------------------------------------

/// An import statement.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportDecl {
    pub path: String,
    pub alias: Option<String>,
    pub names: Vec<String>,
    pub is_default: bool,
    pub start_line: usize,
    pub end_line: usize,
}

/// An exported declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportDecl {
    pub name: String,
    /// One of "function", "class", "interface", "type", "enum", "const",
    /// "var", "value".
    pub kind: String,
    pub is_default: bool,
    pub start_line: usize,
    pub end_line: usize,
}

// ---------------------------------------------------------------------------
// 3. Functions
// ---------------------------------------------------------------------------

/// A function or method.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FuncModel {
    pub name: String,
    pub receiver: Option<String>,
    pub params: Vec<ParamModel>,
    pub returns: Vec<String>,
    pub is_exported: bool,
    pub is_test: bool,
    /// Called symbols, `receiver.name` when a receiver is present.
    pub calls: Vec<String>,
    pub error_exits: Vec<ErrorExit>,
    pub line_count: usize,
    pub complexity: usize,
    pub start_line: usize,
    pub end_line: usize,
}

/// A single parameter of a function or method.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamModel {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
}

/// An error return, throw, or raise site.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorExit {
    pub kind: String,
    pub message: Option<String>,
    pub start_line: usize,
}

// ---------------------------------------------------------------------------
// 4. Types and classes
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TypeKind {
    #[default]
    Struct,
    Interface,
    Type,
    Enum,
}

/// A type definition (struct, interface, alias, or enum).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeModel {
    pub name: String,
    pub kind: TypeKind,
    pub fields: Vec<FieldModel>,
    pub methods: Vec<String>,
    pub is_exported: bool,
    pub start_line: usize,
    pub end_line: usize,
}

/// A struct field, interface property, or class field.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldModel {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: Option<String>,
    pub is_exported: bool,
    pub json_tag: Option<String>,
    pub start_line: usize,
}

/// A class in an object-oriented language.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassModel {
    pub name: String,
    pub is_exported: bool,
    pub methods: Vec<FuncModel>,
    pub fields: Vec<FieldModel>,
    pub implements: Vec<String>,
    pub start_line: usize,
    pub end_line: usize,
}

// ---------------------------------------------------------------------------
// 5. Tests
// ---------------------------------------------------------------------------

/// A test function or test block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestCase {
    pub name: String,
    /// The function under test, when it can be inferred from the name.
    pub target_function: Option<String>,
    pub assertions: Vec<Assertion>,
    pub mocks: Vec<Mock>,
    pub start_line: usize,
    pub end_line: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub kind: String,
    pub subject: String,
    pub expected: Option<String>,
    pub start_line: usize,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mock {
    pub target: String,
    pub kind: String,
    pub start_line: usize,
}

/// A `json:"..."` struct tag.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonTag {
    pub field_name: String,
    pub json_name: String,
    pub options: Vec<String>,
    pub start_line: usize,
}

// ---------------------------------------------------------------------------
// 6. Violations
// ---------------------------------------------------------------------------

/// A rule finding. `rule_id` and `severity` are never empty once emitted by
/// the engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub rule_id: String,
    pub severity: String,
    pub message: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: Option<usize>,
    pub start_column: Option<usize>,
    pub end_column: Option<usize>,
    pub context: Option<ViolationContext>,
}

impl Violation {
    pub fn new(
        rule_id: &str,
        severity: &str,
        file_path: &str,
        start_line: usize,
        message: impl Into<String>,
    ) -> Self {
        Self {
            rule_id: rule_id.to_string(),
            severity: severity.to_string(),
            message: message.into(),
            file_path: file_path.to_string(),
            start_line: start_line.max(1),
            ..Self::default()
        }
    }

    pub fn with_end_line(mut self, end_line: usize) -> Self {
        self.end_line = Some(end_line);
        self
    }

    pub fn with_suggested_fix(mut self, fix: impl Into<String>) -> Self {
        self.context_mut().suggested_fix = Some(fix.into());
        self
    }

    pub fn with_snippet(mut self, snippet: impl Into<String>) -> Self {
        self.context_mut().snippet = Some(snippet.into());
        self
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.context_mut()
            .metadata
            .insert(key.to_string(), value.into());
        self
    }

    fn context_mut(&mut self) -> &mut ViolationContext {
        self.context.get_or_insert_with(ViolationContext::default)
    }
}

/// Optional detail attached to a violation for exporters.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ViolationContext {
    pub snippet: Option<String>,
    pub suggested_fix: Option<String>,
    pub references: Vec<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

/// Why a file or rule could not be fully analysed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    ParseFailure,
    UnsupportedLanguage,
    FileTooLarge,
    AdapterPanic,
    RulePanic,
    ManifestNotFound,
    ManifestInvalid,
    Io,
}

/// A non-fatal problem recorded during a run. Ordered by path, kind, then
/// message.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: String,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: &str, kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            kind,
            message: message.into(),
        }
    }
}
