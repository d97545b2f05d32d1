//! Go adapter.
//!
//! Top-level declarations are anchored at column zero (`func`, `type`,
//! `const`, `var`); `import`, `const` and `var` blocks are tracked until their
//! closing parenthesis.

use std::sync::LazyLock;

use regex::Regex;

use super::imports::{resolve_go, FileIndex};
use super::lexical::{
    base_name, brace_block_end, build_parameters, complexity, extract_calls, split_returns,
    strip_comments, CommentStyle,
};
use super::{covers_targets, prepare, AdapterConfig, LanguageAdapter, WorkBudget};
use crate::errors::StrictureResult;
use crate::models::{
    Assertion, ErrorExit, ExportDecl, FieldModel, FuncModel, ImportDecl, JsonTag, Mock, TestCase,
    TypeKind, TypeModel, UnifiedFileModel,
};

// ---------------------------------------------------------------------------
// Compiled regex patterns
// ---------------------------------------------------------------------------

static IMPORT_SINGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?:([A-Za-z_.][A-Za-z0-9_]*)\s+)?"([^"]+)""#).unwrap()
});

static IMPORT_BLOCK_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s*\(").unwrap());

static IMPORT_BLOCK_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:([A-Za-z_.][A-Za-z0-9_]*)\s+)?"([^"]+)""#).unwrap()
});

static BLOCK_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\)").unwrap());

static TYPE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^type\s+([A-Za-z_][A-Za-z0-9_]*)(?:\[[^\]]*\])?\s*=?\s*(struct|interface)?\b(.*)$")
        .unwrap()
});

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s+([^`\s][^`]*?)\s*(?:`([^`]*)`)?\s*$").unwrap()
});

static JSON_TAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"json:"([^"]*)""#).unwrap());

static INTERFACE_METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap());

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^func\s+([A-Za-z_][A-Za-z0-9_]*)\s*(?:\[[^\]]*\])?\s*\(([^)]*)\)\s*(.*)$").unwrap()
});

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^func\s*\(\s*(?:[A-Za-z_][A-Za-z0-9_]*\s+)?\*?\s*([A-Za-z_][A-Za-z0-9_]*)(?:\[[^\]]*\])?\s*\)\s*([A-Za-z_][A-Za-z0-9_]*)\s*\(([^)]*)\)\s*(.*)$",
    )
    .unwrap()
});

static VALUE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(const|var)\s+([A-Za-z_][A-Za-z0-9_]*)\b").unwrap());

static VALUE_BLOCK_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(const|var)\s*\(").unwrap());

static VALUE_BLOCK_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s+([A-Za-z_][A-Za-z0-9_]*)\b").unwrap());

// -- Error exits --

static ERRORS_NEW_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\berrors\.New\(\s*"([^"]*)""#).unwrap());

static ERRORF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bfmt\.Errorf\(\s*"([^"]*)""#).unwrap());

static RETURN_ERR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*return\b.*\berr\b").unwrap());

static PANIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\bpanic\(\s*(?:"([^"]*)")?"#).unwrap());

// -- Tests --

static TEST_FUNC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*testing\.T\b").unwrap());

static TESTIFY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:assert|require)\.([A-Za-z]+)\(\s*t\s*,\s*([^,()]+(?:\([^)]*\))?)(?:\s*,\s*([^,()]+(?:\([^)]*\))?))?")
        .unwrap()
});

static IF_COMPARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*if\s+(?:.*;\s*)?(.+?)\s*(!=|==)\s*(.+?)\s*\{\s*$").unwrap());

static T_FAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bt\.(?:Errorf|Fatalf|Error|Fatal|Fail|FailNow)\(").unwrap());

static EXPECT_MOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b([A-Za-z_][A-Za-z0-9_]*)\.EXPECT\(\)\.([A-Za-z_][A-Za-z0-9_]*)").unwrap()
});

static NEW_MOCK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bNewMock([A-Za-z_][A-Za-z0-9_]*)\(").unwrap());

static HTTPTEST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bhttptest\.New(Server|Recorder|Request)\(").unwrap());

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct GoAdapter;

impl LanguageAdapter for GoAdapter {
    fn name(&self) -> &'static str {
        "go"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".go"]
    }

    fn is_test_file(&self, path: &str) -> bool {
        base_name(&path.replace('\\', "/"))
            .to_ascii_lowercase()
            .ends_with("_test.go")
    }

    fn parse(
        &self,
        path: &str,
        source: &[u8],
        config: &AdapterConfig,
    ) -> StrictureResult<UnifiedFileModel> {
        let mut prepared = prepare(self.name(), path, source, config)?;
        let mut model =
            UnifiedFileModel::new(&prepared.path, "go", self.is_test_file(&prepared.path), source);
        let text = if config.include_comments {
            prepared.text.clone()
        } else {
            strip_comments(&prepared.text, CommentStyle::CFamily)
        };
        let lines: Vec<&str> = text.lines().collect();
        extract(&mut model, &lines, &mut prepared.budget)?;
        if model.is_test_file {
            model.test_targets = covers_targets(&prepared.text);
        }
        Ok(model)
    }

    fn resolve_import(
        &self,
        from_path: &str,
        import: &ImportDecl,
        index: &FileIndex,
    ) -> Option<String> {
        resolve_go(from_path, &import.path, index)
    }
}

pub fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_uppercase())
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, PartialEq, Eq)]
enum Block {
    None,
    Import,
    Value(&'static str),
}

fn extract(
    model: &mut UnifiedFileModel,
    lines: &[&str],
    budget: &mut WorkBudget,
) -> StrictureResult<()> {
    let mut block = Block::None;

    for (idx, line) in lines.iter().enumerate() {
        budget.tick(&model.path)?;
        let line_no = idx + 1;

        match block {
            Block::Import => {
                if BLOCK_END_RE.is_match(line) {
                    block = Block::None;
                } else if let Some(caps) = IMPORT_BLOCK_LINE_RE.captures(line) {
                    model.imports.push(import_decl(&caps, line_no));
                }
                continue;
            }
            Block::Value(kind) => {
                if BLOCK_END_RE.is_match(line) {
                    block = Block::None;
                } else if let Some(caps) = VALUE_BLOCK_LINE_RE.captures(line) {
                    push_value_export(model, kind, &caps[1], line_no);
                }
                continue;
            }
            Block::None => {}
        }

        if IMPORT_BLOCK_START_RE.is_match(line) {
            block = Block::Import;
            continue;
        }
        if let Some(caps) = IMPORT_SINGLE_RE.captures(line) {
            model.imports.push(import_decl(&caps, line_no));
            continue;
        }
        if let Some(caps) = VALUE_BLOCK_START_RE.captures(line) {
            block = Block::Value(if &caps[1] == "const" { "const" } else { "var" });
            continue;
        }
        if let Some(caps) = VALUE_RE.captures(line) {
            let kind = if &caps[1] == "const" { "const" } else { "var" };
            push_value_export(model, kind, &caps[2], line_no);
            continue;
        }
        if let Some(caps) = TYPE_RE.captures(line) {
            extract_type(model, lines, idx, &caps);
            continue;
        }
        if let Some(caps) = METHOD_RE.captures(line) {
            let func = build_function(
                model,
                lines,
                idx,
                &caps[2],
                Some(caps[1].to_string()),
                &caps[3],
                caps.get(4).map(|m| m.as_str()),
            );
            model.functions.push(func);
            continue;
        }
        if let Some(caps) = FUNCTION_RE.captures(line) {
            let func = build_function(
                model,
                lines,
                idx,
                &caps[1],
                None,
                &caps[2],
                caps.get(3).map(|m| m.as_str()),
            );
            if func.is_exported {
                model.exports.push(ExportDecl {
                    name: func.name.clone(),
                    kind: "function".to_string(),
                    is_default: false,
                    start_line: func.start_line,
                    end_line: func.end_line,
                });
            }
            if func.is_test {
                model.test_cases.push(test_case(&func, lines));
            }
            model.functions.push(func);
        }
    }

    // Attach method names to their receiver types.
    for func in &model.functions {
        let Some(receiver) = &func.receiver else { continue };
        if let Some(ty) = model.types.iter_mut().find(|t| &t.name == receiver) {
            ty.methods.push(func.name.clone());
        }
    }
    Ok(())
}

fn import_decl(caps: &regex::Captures<'_>, line_no: usize) -> ImportDecl {
    let path = caps[2].to_string();
    let alias = caps.get(1).map(|m| m.as_str().to_string());
    let name = alias
        .clone()
        .unwrap_or_else(|| path.rsplit('/').next().unwrap_or(&path).to_string());
    ImportDecl {
        path,
        alias,
        names: vec![name],
        is_default: false,
        start_line: line_no,
        end_line: line_no,
    }
}

fn push_value_export(model: &mut UnifiedFileModel, kind: &str, name: &str, line_no: usize) {
    if !is_exported(name) {
        return;
    }
    model.exports.push(ExportDecl {
        name: name.to_string(),
        kind: kind.to_string(),
        is_default: false,
        start_line: line_no,
        end_line: line_no,
    });
}

fn extract_type(
    model: &mut UnifiedFileModel,
    lines: &[&str],
    idx: usize,
    caps: &regex::Captures<'_>,
) {
    let name = caps[1].to_string();
    let kind = match caps.get(2).map(|m| m.as_str()) {
        Some("struct") => TypeKind::Struct,
        Some("interface") => TypeKind::Interface,
        _ => TypeKind::Type,
    };
    let end = if kind == TypeKind::Type {
        idx
    } else {
        brace_block_end(lines, idx, 0)
    };

    let mut ty = TypeModel {
        name: name.clone(),
        kind,
        is_exported: is_exported(&name),
        start_line: idx + 1,
        end_line: end + 1,
        ..TypeModel::default()
    };

    for (offset, line) in lines[idx + 1..end.max(idx + 1).min(lines.len())]
        .iter()
        .enumerate()
    {
        let line_no = idx + 2 + offset;
        match kind {
            TypeKind::Struct => {
                let Some(field_caps) = FIELD_RE.captures(line) else {
                    continue;
                };
                let field_name = field_caps[1].to_string();
                let json = field_caps
                    .get(3)
                    .and_then(|tag| JSON_TAG_RE.captures(tag.as_str()))
                    .map(|j| j[1].to_string());
                if let Some(raw) = &json {
                    let mut parts = raw.split(',');
                    let json_name = match parts.next() {
                        Some(n) if !n.is_empty() => n.to_string(),
                        _ => field_name.clone(),
                    };
                    model.json_tags.push(JsonTag {
                        field_name: field_name.clone(),
                        json_name,
                        options: parts.map(str::to_string).collect(),
                        start_line: line_no,
                    });
                }
                ty.fields.push(FieldModel {
                    is_exported: is_exported(&field_name),
                    name: field_name,
                    type_: Some(field_caps[2].trim().to_string()),
                    json_tag: json,
                    start_line: line_no,
                });
            }
            TypeKind::Interface => {
                if let Some(m) = INTERFACE_METHOD_RE.captures(line) {
                    ty.methods.push(m[1].to_string());
                }
            }
            _ => {}
        }
    }

    if ty.is_exported {
        model.exports.push(ExportDecl {
            name: ty.name.clone(),
            kind: if kind == TypeKind::Interface {
                "interface"
            } else {
                "type"
            }
            .to_string(),
            is_default: false,
            start_line: ty.start_line,
            end_line: ty.end_line,
        });
    }
    model.types.push(ty);
}

fn build_function(
    model: &UnifiedFileModel,
    lines: &[&str],
    idx: usize,
    name: &str,
    receiver: Option<String>,
    params_raw: &str,
    tail: Option<&str>,
) -> FuncModel {
    let end = brace_block_end(lines, idx, 3);
    let body = &lines[idx..=end];
    let returns_raw = tail.map(|t| match t.rfind('{') {
        Some(brace) => &t[..brace],
        None => t,
    });
    let is_test = model.is_test_file
        && receiver.is_none()
        && name.starts_with("Test")
        && TEST_FUNC_RE.is_match(params_raw);

    FuncModel {
        name: name.to_string(),
        is_exported: is_exported(name),
        receiver,
        params: build_parameters(params_raw, "go"),
        returns: split_returns(returns_raw),
        is_test,
        calls: extract_calls(body),
        error_exits: error_exits(body, idx),
        line_count: end - idx + 1,
        complexity: complexity(body, false),
        start_line: idx + 1,
        end_line: end + 1,
    }
}

fn error_exits(body: &[&str], first_idx: usize) -> Vec<ErrorExit> {
    let mut exits = Vec::new();
    for (offset, line) in body.iter().enumerate() {
        let start_line = first_idx + offset + 1;
        if let Some(caps) = ERRORS_NEW_RE.captures(line) {
            exits.push(ErrorExit {
                kind: "errors.New".to_string(),
                message: Some(caps[1].to_string()),
                start_line,
            });
        } else if let Some(caps) = ERRORF_RE.captures(line) {
            exits.push(ErrorExit {
                kind: "fmt.Errorf".to_string(),
                message: Some(caps[1].to_string()),
                start_line,
            });
        } else if RETURN_ERR_RE.is_match(line) {
            exits.push(ErrorExit {
                kind: "return".to_string(),
                message: None,
                start_line,
            });
        } else if let Some(caps) = PANIC_RE.captures(line) {
            exits.push(ErrorExit {
                kind: "panic".to_string(),
                message: caps.get(1).map(|m| m.as_str().to_string()),
                start_line,
            });
        }
    }
    exits
}

fn test_case(func: &FuncModel, lines: &[&str]) -> TestCase {
    let body = &lines[func.start_line - 1..func.end_line];
    let target = func
        .name
        .trim_start_matches("Test")
        .split('_')
        .next()
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    let mut assertions = Vec::new();
    let mut mocks = Vec::new();
    let mut pending_compare: Option<(String, String)> = None;

    for (offset, line) in body.iter().enumerate() {
        let line_no = func.start_line + offset;

        for caps in TESTIFY_RE.captures_iter(line) {
            let first = caps[2].trim().to_string();
            let (subject, expected) = match caps.get(3) {
                Some(second) => (second.as_str().trim().to_string(), Some(first)),
                None => (first, None),
            };
            assertions.push(Assertion {
                kind: caps[1].to_string(),
                subject,
                expected,
                start_line: line_no,
            });
        }

        if let Some(caps) = IF_COMPARE_RE.captures(line) {
            pending_compare = Some((caps[1].to_string(), caps[3].to_string()));
        } else if T_FAIL_RE.is_match(line) {
            if let Some((subject, expected)) = pending_compare.take() {
                let kind = if expected == "nil" || subject == "nil" {
                    "nil_check"
                } else {
                    "compare"
                };
                assertions.push(Assertion {
                    kind: kind.to_string(),
                    subject,
                    expected: Some(expected),
                    start_line: line_no,
                });
            }
        } else if !line.trim().is_empty() {
            pending_compare = None;
        }

        for caps in EXPECT_MOCK_RE.captures_iter(line) {
            mocks.push(Mock {
                target: format!("{}.{}", &caps[1], &caps[2]),
                kind: "expect".to_string(),
                start_line: line_no,
            });
        }
        for caps in NEW_MOCK_RE.captures_iter(line) {
            mocks.push(Mock {
                target: caps[1].to_string(),
                kind: "mock".to_string(),
                start_line: line_no,
            });
        }
        for caps in HTTPTEST_RE.captures_iter(line) {
            mocks.push(Mock {
                target: caps[1].to_string(),
                kind: "httptest".to_string(),
                start_line: line_no,
            });
        }
    }

    TestCase {
        name: func.name.clone(),
        target_function: target,
        assertions,
        mocks,
        start_line: func.start_line,
        end_line: func.end_line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, source: &str) -> UnifiedFileModel {
        GoAdapter
            .parse(path, source.as_bytes(), &AdapterConfig::default())
            .unwrap()
    }

    const SERVICE: &str = r#"package billing

import (
	"errors"
	"fmt"
	store "github.com/acme/shop/internal/store"
	_ "github.com/lib/pq"
)

import "strings"

const MaxItems = 10

var (
	DefaultCurrency = "EUR"
	internalFlag    = true
)

// Invoice is billed.
type Invoice struct {
	ID        string `json:"id"`
	CreatedAt int64  `json:"created_at,omitempty"`
	note      string
}

type Repository interface {
	Save(inv Invoice) error
	Find(id string) (Invoice, error)
}

type Amount = int64

func (s *Service) Create(id string, total int) (*Invoice, error) {
	if id == "" {
		return nil, errors.New("missing id")
	}
	if total < 0 && strict {
		return nil, fmt.Errorf("bad total %d", total)
	}
	inv := &Invoice{ID: strings.TrimSpace(id)}
	if err := store.Save(inv); err != nil {
		return nil, err
	}
	return inv, nil
}

func helper(a, b int) int {
	return a + b
}
"#;

    #[test]
    fn test_go_imports_with_aliases() {
        let model = parse("internal/billing/service.go", SERVICE);
        let paths: Vec<&str> = model.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["errors", "fmt", "github.com/acme/shop/internal/store", "github.com/lib/pq", "strings"]
        );
        assert_eq!(model.imports[2].alias.as_deref(), Some("store"));
        assert_eq!(model.imports[3].alias.as_deref(), Some("_"));
        assert_eq!(model.imports[4].start_line, 10);
    }

    #[test]
    fn test_go_types_fields_and_json_tags() {
        let model = parse("internal/billing/service.go", SERVICE);
        let invoice = model.types.iter().find(|t| t.name == "Invoice").unwrap();
        assert_eq!(invoice.kind, TypeKind::Struct);
        assert_eq!(invoice.fields.len(), 3);
        assert!(!invoice.fields[2].is_exported);
        assert_eq!(model.json_tags.len(), 2);
        assert_eq!(model.json_tags[1].json_name, "created_at");
        assert_eq!(model.json_tags[1].options, vec!["omitempty".to_string()]);

        let repo = model.types.iter().find(|t| t.name == "Repository").unwrap();
        assert_eq!(repo.kind, TypeKind::Interface);
        assert_eq!(repo.methods, vec!["Save".to_string(), "Find".to_string()]);

        let amount = model.types.iter().find(|t| t.name == "Amount").unwrap();
        assert_eq!(amount.kind, TypeKind::Type);
    }

    #[test]
    fn test_go_functions_and_methods() {
        let model = parse("internal/billing/service.go", SERVICE);
        let create = model.functions.iter().find(|f| f.name == "Create").unwrap();
        assert_eq!(create.receiver.as_deref(), Some("Service"));
        assert_eq!(create.params.len(), 2);
        assert_eq!(create.returns, vec!["*Invoice".to_string(), "error".to_string()]);
        assert!(create.calls.contains(&"errors.New".to_string()));
        assert!(create.calls.contains(&"store.Save".to_string()));
        let kinds: Vec<&str> = create.error_exits.iter().map(|e| e.kind.as_str()).collect();
        assert_eq!(kinds, vec!["errors.New", "fmt.Errorf", "return"]);
        assert_eq!(create.error_exits[0].message.as_deref(), Some("missing id"));
        assert_eq!(create.complexity, 5);
        assert_eq!(create.line_count, 13);

        let helper = model.functions.iter().find(|f| f.name == "helper").unwrap();
        assert!(!helper.is_exported);
        assert_eq!(helper.params[0].type_.as_deref(), Some("int"));
    }

    #[test]
    fn test_go_exports() {
        let model = parse("internal/billing/service.go", SERVICE);
        let names: Vec<&str> = model.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["MaxItems", "DefaultCurrency", "Invoice", "Repository", "Amount"]
        );
    }

    #[test]
    fn test_go_comments_hide_declarations() {
        let source = "package x\n// func Hidden() {}\n/*\ntype Gone struct{}\n*/\n";
        let model = parse("x.go", source);
        assert!(model.functions.is_empty());
        assert!(model.types.is_empty());

        let config = AdapterConfig {
            include_comments: true,
            ..AdapterConfig::default()
        };
        let model = GoAdapter.parse("x.go", source.as_bytes(), &config).unwrap();
        assert!(model.types.iter().any(|t| t.name == "Gone"));
    }

    #[test]
    fn test_go_test_cases_and_assertions() {
        let source = r#"package billing

func TestCreate_Empty(t *testing.T) {
	ctrl := gomock.NewController(t)
	repo := NewMockRepository(ctrl)
	repo.EXPECT().Save(gomock.Any())
	got, err := svc.Create("")
	if err == nil {
		t.Fatal("expected error")
	}
	assert.Equal(t, "x", got.ID)
	assert.NotNil(t, got)
}

func helperForTests() {}
"#;
        let model = parse("internal/billing/service_test.go", source);
        assert!(model.is_test_file);
        assert_eq!(model.test_cases.len(), 1);
        let case = &model.test_cases[0];
        assert_eq!(case.target_function.as_deref(), Some("Create"));
        let kinds: Vec<&str> = case.assertions.iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, vec!["nil_check", "Equal", "NotNil"]);
        assert_eq!(case.assertions[1].subject, "got.ID");
        assert_eq!(case.assertions[1].expected.as_deref(), Some("\"x\""));
        assert_eq!(case.mocks.len(), 2);
        assert_eq!(case.mocks[1].target, "repo.Save");
    }

    #[test]
    fn test_go_is_test_file() {
        assert!(GoAdapter.is_test_file("a/b_test.go"));
        assert!(GoAdapter.is_test_file("a\\B_TEST.GO"));
        assert!(!GoAdapter.is_test_file("a/b.go"));
        assert!(!GoAdapter.is_test_file(""));
    }

    #[test]
    fn test_go_empty_source() {
        let model = parse("empty.go", "");
        assert_eq!(model.line_count, 0);
        assert!(model.functions.is_empty());
    }
}
