//! Python adapter. Blocks are delimited by indentation.

use std::sync::LazyLock;

use regex::Regex;

use super::imports::{resolve_python, FileIndex};
use super::lexical::{
    base_name, build_parameters, complexity, extract_calls, indent_block_end, indent_of,
    normalize_type_name, split_top_level, strip_comments, throw_exits, CommentStyle,
};
use super::{covers_targets, prepare, AdapterConfig, LanguageAdapter, WorkBudget};
use crate::errors::StrictureResult;
use crate::models::{
    to_slash, Assertion, ClassModel, ExportDecl, FieldModel, FuncModel, ImportDecl, Mock,
    TestCase, UnifiedFileModel,
};

// ---------------------------------------------------------------------------
// Compiled regex patterns
// ---------------------------------------------------------------------------

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+([\w.]+(?:\s+as\s+\w+)?(?:\s*,\s*[\w.]+(?:\s+as\s+\w+)?)*)\s*$").unwrap());

static FROM_IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*from\s+(\.*[\w.]*)\s+import\s+(.+?)\s*$").unwrap());

static ALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^__all__\s*(?::[^=]*)?=\s*(.*)$").unwrap());

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"['"]([^'"]+)['"]"#).unwrap());

static DEF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:async\s+)?def\s+([A-Za-z_]\w*)\s*\((.*)\)\s*(?:->\s*([^:]+?))?\s*:").unwrap()
});

static DEF_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:async\s+)?def\s+[A-Za-z_]\w*\s*\(").unwrap());

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*class\s+([A-Za-z_]\w*)\s*(?:\(([^)]*)\))?\s*:").unwrap()
});

static SELF_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bself\.([A-Za-z_]\w*)\s*(?::\s*([^=]+?))?\s*=[^=]").unwrap()
});

static CLASS_ATTR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z_]\w*)\s*(?::\s*([^=]+?))?\s*(=\s*[^=].*)?$").unwrap()
});

// -- Tests --

static ASSERT_STMT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*assert\s+(.+?)\s*$").unwrap());

static UNITTEST_ASSERT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bself\.(assert\w+|fail\w*)\(([^)]*)\)?").unwrap());

static RAISES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bpytest\.raises\(\s*([\w.]+)").unwrap());

static MOCK_ASSERT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([\w.]+)\.(assert_\w+)\(([^)]*)\)?").unwrap());

static PATCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:mock\.|mocker\.|unittest\.mock\.)?patch(\.object|\.dict)?\(\s*([^,)]+)"#).unwrap()
});

static MOCK_CTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\b([A-Za-z_]\w*)\s*=\s*)?\b(?:mock\.)?(MagicMock|AsyncMock|Mock|create_autospec)\(").unwrap()
});

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct PythonAdapter;

impl LanguageAdapter for PythonAdapter {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".py"]
    }

    fn is_test_file(&self, path: &str) -> bool {
        let normalized = to_slash(path).to_ascii_lowercase();
        let name = base_name(&normalized);
        name.ends_with(".py") && (name.starts_with("test_") || name.ends_with("_test.py"))
    }

    fn parse(
        &self,
        path: &str,
        source: &[u8],
        config: &AdapterConfig,
    ) -> StrictureResult<UnifiedFileModel> {
        let mut prepared = prepare(self.name(), path, source, config)?;
        let mut model = UnifiedFileModel::new(
            &prepared.path,
            "python",
            self.is_test_file(&prepared.path),
            source,
        );
        let text = if config.include_comments {
            prepared.text.clone()
        } else {
            strip_comments(&prepared.text, CommentStyle::Hash)
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
        resolve_python(from_path, &import.path, &import.names, index)
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

struct OpenClass {
    index: usize,
    body_indent: usize,
    end: usize,
}

fn extract(
    model: &mut UnifiedFileModel,
    lines: &[&str],
    budget: &mut WorkBudget,
) -> StrictureResult<()> {
    let mut classes: Vec<OpenClass> = Vec::new();
    let mut dunder_all: Option<Vec<String>> = None;
    let mut pending: Option<(usize, String)> = None;
    let mut pending_all: Option<String> = None;

    for (idx, line) in lines.iter().enumerate() {
        budget.tick(&model.path)?;
        let line_no = idx + 1;

        if let Some(mut acc) = pending_all.take() {
            acc.push(' ');
            acc.push_str(line.trim());
            if acc.contains(']') || acc.contains(')') {
                dunder_all = Some(quoted_names(&acc));
            } else {
                pending_all = Some(acc);
            }
            continue;
        }
        if let Some((start, mut acc)) = pending.take() {
            acc.push(' ');
            acc.push_str(line.trim());
            if acc.contains(')') {
                if let Some(caps) = FROM_IMPORT_RE.captures(&acc) {
                    model
                        .imports
                        .push(from_import(&caps[1], &caps[2], start + 1, line_no));
                }
            } else if idx - start < 64 {
                pending = Some((start, acc));
            }
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }
        while classes.last().is_some_and(|c| idx > c.end) {
            classes.pop();
        }
        let indent = indent_of(line);

        if let Some(caps) = FROM_IMPORT_RE.captures(line) {
            let names = caps[2].trim();
            if names.starts_with('(') && !names.contains(')') {
                pending = Some((idx, line.trim().to_string()));
            } else {
                model
                    .imports
                    .push(from_import(&caps[1], names, line_no, line_no));
            }
            continue;
        }
        if let Some(caps) = IMPORT_RE.captures(line) {
            for item in caps[1].split(',') {
                let (path, alias) = match item.trim().split_once(" as ") {
                    Some((p, a)) => (p.trim(), Some(a.trim().to_string())),
                    None => (item.trim(), None),
                };
                model.imports.push(ImportDecl {
                    path: path.to_string(),
                    alias,
                    start_line: line_no,
                    end_line: line_no,
                    ..ImportDecl::default()
                });
            }
            continue;
        }
        if indent == 0 {
            if let Some(caps) = ALL_RE.captures(line) {
                let value = caps[1].trim();
                let closed = value.contains(']') || value.contains(')');
                if closed || !(value.starts_with('[') || value.starts_with('(')) {
                    dunder_all = Some(quoted_names(value));
                } else {
                    pending_all = Some(value.to_string());
                }
                continue;
            }
        }

        let member_of = classes
            .last()
            .filter(|c| indent == c.body_indent)
            .map(|c| c.index);
        if indent != 0 && member_of.is_none() {
            continue;
        }

        if let Some(caps) = CLASS_RE.captures(line) {
            let end = indent_block_end(lines, idx);
            let name = caps[1].to_string();
            let implements: Vec<String> = caps
                .get(2)
                .map(|bases| {
                    split_top_level(bases.as_str(), ',')
                        .into_iter()
                        .map(str::trim)
                        .filter(|b| !b.is_empty() && !b.contains('=') && *b != "object")
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();
            let body_indent = lines[idx + 1..=end.max(idx)]
                .iter()
                .find(|l| !l.trim().is_empty())
                .map_or(indent + 4, |l| indent_of(l));
            model.classes.push(ClassModel {
                is_exported: member_of.is_none() && !name.starts_with('_'),
                name,
                implements,
                start_line: line_no,
                end_line: end + 1,
                ..ClassModel::default()
            });
            let class_index = model.classes.len() - 1;
            collect_instance_fields(model, lines, idx, end, class_index);
            classes.push(OpenClass {
                index: class_index,
                body_indent,
                end,
            });
            continue;
        }

        if DEF_START_RE.is_match(line) {
            let end = indent_block_end(lines, idx);
            let Some(func) = build_function(model, lines, idx, end, member_of) else {
                continue;
            };
            if func.is_test {
                model.test_cases.push(test_case(lines, idx, end, &func));
            }
            match member_of {
                Some(class_index) => model.classes[class_index].methods.push(func),
                None => model.functions.push(func),
            }
            continue;
        }

        if let Some(class_index) = member_of {
            if let Some(caps) = CLASS_ATTR_RE.captures(line) {
                if caps.get(2).is_none() && caps.get(3).is_none() {
                    continue;
                }
                let name = caps[1].to_string();
                let class = &mut model.classes[class_index];
                if !class.fields.iter().any(|f| f.name == name) {
                    class.fields.push(FieldModel {
                        is_exported: !name.starts_with('_'),
                        name,
                        type_: normalize_type_name(caps.get(2).map(|m| m.as_str())),
                        json_tag: None,
                        start_line: line_no,
                    });
                }
            }
        }
    }

    collect_exports(model, dunder_all);
    Ok(())
}

fn quoted_names(raw: &str) -> Vec<String> {
    QUOTED_RE
        .captures_iter(raw)
        .map(|c| c[1].to_string())
        .collect()
}

fn from_import(module: &str, names: &str, start_line: usize, end_line: usize) -> ImportDecl {
    let names: Vec<String> = names
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .split(',')
        .filter_map(|item| {
            let item = item.trim();
            let name = item.split_once(" as ").map_or(item, |(n, _)| n.trim());
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect();
    ImportDecl {
        path: module.to_string(),
        alias: None,
        names,
        is_default: false,
        start_line,
        end_line,
    }
}

/// `self.x = ...` assignments anywhere in the class body.
fn collect_instance_fields(
    model: &mut UnifiedFileModel,
    lines: &[&str],
    start: usize,
    end: usize,
    class_index: usize,
) {
    let class = &mut model.classes[class_index];
    for (offset, line) in lines[start..=end].iter().enumerate() {
        for caps in SELF_ATTR_RE.captures_iter(line) {
            let name = caps[1].to_string();
            if class.fields.iter().any(|f| f.name == name) {
                continue;
            }
            class.fields.push(FieldModel {
                is_exported: !name.starts_with('_'),
                name,
                type_: normalize_type_name(caps.get(2).map(|m| m.as_str())),
                json_tag: None,
                start_line: start + offset + 1,
            });
        }
    }
}

fn build_function(
    model: &UnifiedFileModel,
    lines: &[&str],
    idx: usize,
    end: usize,
    member_of: Option<usize>,
) -> Option<FuncModel> {
    // Join a multi-line signature up to the line holding the closing `:`.
    let mut signature = String::new();
    for line in &lines[idx..=end] {
        signature.push_str(line.trim());
        signature.push(' ');
        if DEF_RE.is_match(&signature) {
            break;
        }
    }
    let caps = DEF_RE.captures(&signature)?;
    let name = caps[1].to_string();
    let mut params = build_parameters(&caps[2], "python");
    params.retain(|p| p.name != "/");

    let receiver = member_of.map(|i| model.classes[i].name.clone());
    let owner_exported = member_of.map_or(true, |i| model.classes[i].is_exported);
    let is_test = model.is_test_file && name.starts_with("test");
    let body = &lines[idx..=end];
    Some(FuncModel {
        is_exported: owner_exported && !name.starts_with('_'),
        is_test,
        receiver,
        params,
        returns: normalize_type_name(caps.get(3).map(|m| m.as_str()))
            .into_iter()
            .collect(),
        calls: extract_calls(body),
        error_exits: throw_exits(body, idx),
        line_count: end - idx + 1,
        complexity: complexity(body, true),
        start_line: idx + 1,
        end_line: end + 1,
        name,
    })
}

/// Split `assert <expr>` into (kind, subject, expected).
fn classify_assert(expr: &str) -> (String, String, Option<String>) {
    let expr = split_top_level(expr, ',')[0].trim();
    let pair = |op: &str, kind: &str| {
        expr.split_once(op).map(|(l, r)| {
            (
                kind.to_string(),
                l.trim().to_string(),
                Some(r.trim().to_string()),
            )
        })
    };
    if let Some(rest) = expr.strip_prefix("not ") {
        return ("falsy".to_string(), rest.trim().to_string(), None);
    }
    if let Some(subject) = expr.strip_suffix(" is not None") {
        return ("is_not_none".to_string(), subject.trim().to_string(), None);
    }
    if let Some(subject) = expr.strip_suffix(" is None") {
        return (
            "is_none".to_string(),
            subject.trim().to_string(),
            Some("None".to_string()),
        );
    }
    if expr.starts_with("isinstance(") {
        return ("isinstance".to_string(), expr.to_string(), None);
    }
    pair(" == ", "equal")
        .or_else(|| pair(" != ", "not_equal"))
        .or_else(|| pair(" not in ", "not_in"))
        .or_else(|| pair(" in ", "in"))
        .or_else(|| pair(" is not ", "is_not"))
        .or_else(|| pair(" is ", "is"))
        .or_else(|| pair(" >= ", "compare"))
        .or_else(|| pair(" <= ", "compare"))
        .or_else(|| pair(" > ", "compare"))
        .or_else(|| pair(" < ", "compare"))
        .unwrap_or_else(|| ("truthy".to_string(), expr.to_string(), None))
}

fn test_case(lines: &[&str], idx: usize, end: usize, func: &FuncModel) -> TestCase {
    let mut assertions = Vec::new();
    let mut mocks = Vec::new();

    // Decorators above the definition count toward the test.
    let mut first = idx;
    while first > 0 && lines[first - 1].trim_start().starts_with('@') {
        first -= 1;
    }

    for (offset, line) in lines[first..=end].iter().enumerate() {
        let line_no = first + offset + 1;
        if let Some(caps) = ASSERT_STMT_RE.captures(line) {
            let (kind, subject, expected) = classify_assert(&caps[1]);
            assertions.push(Assertion {
                kind,
                subject,
                expected,
                start_line: line_no,
            });
        }
        for caps in UNITTEST_ASSERT_RE.captures_iter(line) {
            let args = split_top_level(&caps[2], ',');
            assertions.push(Assertion {
                kind: caps[1].to_string(),
                subject: args.first().map_or("", |a| a.trim()).to_string(),
                expected: args.get(1).map(|a| a.trim().to_string()),
                start_line: line_no,
            });
        }
        for caps in RAISES_RE.captures_iter(line) {
            assertions.push(Assertion {
                kind: "raises".to_string(),
                subject: caps[1].to_string(),
                expected: None,
                start_line: line_no,
            });
        }
        for caps in MOCK_ASSERT_RE.captures_iter(line) {
            let args = caps[3].trim();
            assertions.push(Assertion {
                kind: caps[2].to_string(),
                subject: caps[1].to_string(),
                expected: (!args.is_empty()).then(|| args.to_string()),
                start_line: line_no,
            });
        }
        for caps in PATCH_RE.captures_iter(line) {
            let kind = match caps.get(1).map(|m| m.as_str()) {
                Some(".object") => "patch.object",
                Some(".dict") => "patch.dict",
                _ => "patch",
            };
            mocks.push(Mock {
                target: caps[2].trim().trim_matches(['\'', '"']).to_string(),
                kind: kind.to_string(),
                start_line: line_no,
            });
        }
        for caps in MOCK_CTOR_RE.captures_iter(line) {
            let target = caps.get(1).map_or(&caps[2], |m| m.as_str());
            mocks.push(Mock {
                target: target.to_string(),
                kind: caps[2].to_string(),
                start_line: line_no,
            });
        }
    }

    TestCase {
        name: func.name.clone(),
        target_function: target_of(&func.name, &func.calls),
        assertions,
        mocks,
        start_line: idx + 1,
        end_line: end + 1,
    }
}

/// The longest called name that the test name (minus `test_`) starts with.
fn target_of(test_name: &str, calls: &[String]) -> Option<String> {
    let rest = test_name
        .strip_prefix("test_")
        .or_else(|| test_name.strip_prefix("test"))?;
    calls
        .iter()
        .map(|c| c.rsplit('.').next().unwrap_or(c))
        .filter(|name| !name.is_empty() && rest.starts_with(name))
        .max_by_key(|name| name.len())
        .map(str::to_string)
}

fn collect_exports(model: &mut UnifiedFileModel, dunder_all: Option<Vec<String>>) {
    let kind_of = |model: &UnifiedFileModel, name: &str| {
        if model.functions.iter().any(|f| f.name == name) {
            "function"
        } else if model.classes.iter().any(|c| c.name == name) {
            "class"
        } else {
            "value"
        }
    };
    let mut exports: Vec<ExportDecl> = Vec::new();
    match dunder_all {
        Some(names) => {
            for name in names {
                let line = model
                    .functions
                    .iter()
                    .find(|f| f.name == name)
                    .map(|f| f.start_line)
                    .or_else(|| {
                        model
                            .classes
                            .iter()
                            .find(|c| c.name == name)
                            .map(|c| c.start_line)
                    })
                    .unwrap_or(1);
                exports.push(ExportDecl {
                    kind: kind_of(model, &name).to_string(),
                    name,
                    is_default: false,
                    start_line: line,
                    end_line: line,
                });
            }
        }
        None => {
            let functions = model
                .functions
                .iter()
                .filter(|f| f.is_exported)
                .map(|f| (f.name.clone(), "function", f.start_line));
            let classes = model
                .classes
                .iter()
                .filter(|c| c.is_exported)
                .map(|c| (c.name.clone(), "class", c.start_line));
            let mut found: Vec<(String, &str, usize)> = functions.chain(classes).collect();
            found.sort_by_key(|(_, _, line)| *line);
            exports.extend(found.into_iter().map(|(name, kind, line)| ExportDecl {
                name,
                kind: kind.to_string(),
                is_default: false,
                start_line: line,
                end_line: line,
            }));
        }
    }
    model.exports = exports;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, source: &str) -> UnifiedFileModel {
        PythonAdapter
            .parse(path, source.as_bytes(), &AdapterConfig::default())
            .unwrap()
    }

    const MODULE: &str = r#"import os
import collections.abc as cabc, json
from .models import Invoice, Ledger as L
from ..shared import (
    money,
    clock,
)

# def commented_out(): pass


class InvoiceService(BaseService, metaclass=ABCMeta):
    retries: int = 3
    _cache = {}

    def __init__(self, repo: Repo, *, clock=None):
        self.repo = repo
        self._clock = clock

    def create(self, customer_id: str, amount: float) -> Invoice:
        if not customer_id or amount <= 0:
            raise ValueError("invalid invoice")
        for item in self.items:
            if item.bad:
                continue
        return self.repo.save(Invoice(customer_id, amount))

    def _audit(self):
        pass


def load_invoice(invoice_id,
                 strict: bool = False) -> "Invoice":
    return Invoice.get(invoice_id)


def _helper():
    return None
"#;

    #[test]
    fn test_python_imports() {
        let model = parse("billing/service.py", MODULE);
        let paths: Vec<&str> = model.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["os", "collections.abc", "json", ".models", "..shared"]
        );
        assert_eq!(model.imports[1].alias.as_deref(), Some("cabc"));
        assert_eq!(model.imports[3].names, vec!["Invoice", "Ledger"]);
        let shared = &model.imports[4];
        assert_eq!(shared.names, vec!["money", "clock"]);
        assert_eq!((shared.start_line, shared.end_line), (4, 7));
    }

    #[test]
    fn test_python_classes_and_methods() {
        let model = parse("billing/service.py", MODULE);
        assert_eq!(model.classes.len(), 1);
        let class = &model.classes[0];
        assert_eq!(class.name, "InvoiceService");
        assert_eq!(class.implements, vec!["BaseService"]);
        let methods: Vec<&str> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["__init__", "create", "_audit"]);

        let init = &class.methods[0];
        let params: Vec<&str> = init.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(params, vec!["repo", "clock"]);
        assert!(!init.is_exported);

        let create = &class.methods[1];
        assert_eq!(create.receiver.as_deref(), Some("InvoiceService"));
        assert!(create.is_exported);
        assert_eq!(create.returns, vec!["Invoice".to_string()]);
        assert_eq!(create.error_exits.len(), 1);
        assert_eq!(create.error_exits[0].kind, "raise");
        assert_eq!(create.error_exits[0].message.as_deref(), Some("invalid invoice"));
        // if, or, for, if
        assert_eq!(create.complexity, 5);
        assert!(create.calls.contains(&"repo.save".to_string()));

        let fields: Vec<&str> = class.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["repo", "_clock", "retries", "_cache"]);
        let retries = class.fields.iter().find(|f| f.name == "retries").unwrap();
        assert_eq!(retries.type_.as_deref(), Some("int"));
        assert!(!class.fields[1].is_exported);
    }

    #[test]
    fn test_python_functions_and_exports() {
        let model = parse("billing/service.py", MODULE);
        let names: Vec<&str> = model.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["load_invoice", "_helper"]);
        let load = &model.functions[0];
        assert_eq!(load.params.len(), 2);
        assert_eq!(load.params[1].type_.as_deref(), Some("bool"));
        assert_eq!(load.line_count, 3);
        assert_eq!(load.returns, vec!["\"Invoice\"".to_string()]);

        let exports: Vec<(&str, &str)> = model
            .exports
            .iter()
            .map(|e| (e.name.as_str(), e.kind.as_str()))
            .collect();
        assert_eq!(
            exports,
            vec![("InvoiceService", "class"), ("load_invoice", "function")]
        );
    }

    #[test]
    fn test_python_dunder_all_overrides_exports() {
        let source = "__all__ = [\n    'public_api',\n    \"_private_but_listed\",\n]\n\ndef public_api():\n    pass\n\ndef other():\n    pass\n";
        let model = parse("pkg/api.py", source);
        let names: Vec<&str> = model.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["public_api", "_private_but_listed"]);
        assert_eq!(model.exports[0].kind, "function");
        assert_eq!(model.exports[0].start_line, 6);
    }

    #[test]
    fn test_python_is_test_file() {
        let adapter = PythonAdapter;
        assert!(adapter.is_test_file("tests/test_invoice.py"));
        assert!(adapter.is_test_file("billing/invoice_test.py"));
        assert!(!adapter.is_test_file("billing/testing.py"));
        assert!(!adapter.is_test_file("billing/contest.py"));
    }

    #[test]
    fn test_python_test_cases() {
        let source = r#"# @covers billing/service.py
from unittest import mock

import pytest


@mock.patch("billing.service.clock")
def test_create_invoice(clock):
    repo = mock.MagicMock()
    service = InvoiceService(repo)
    invoice = service.create_invoice("c1", 10)
    assert invoice is not None
    assert invoice.total == 10
    repo.save.assert_called_once_with(invoice)


class TestLedger(unittest.TestCase):
    def test_post(self):
        with pytest.raises(ValueError):
            post(None)
        self.assertEqual(balance(), 0)
"#;
        let model = parse("tests/test_service.py", source);
        assert_eq!(model.test_targets, vec!["billing/service.py".to_string()]);
        assert_eq!(model.test_cases.len(), 2);

        let first = &model.test_cases[0];
        assert_eq!(first.name, "test_create_invoice");
        assert_eq!(first.target_function.as_deref(), Some("create_invoice"));
        let kinds: Vec<&str> = first.assertions.iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, vec!["is_not_none", "equal", "assert_called_once_with"]);
        assert_eq!(first.assertions[1].subject, "invoice.total");
        assert_eq!(first.assertions[1].expected.as_deref(), Some("10"));
        let mocks: Vec<(&str, &str)> = first
            .mocks
            .iter()
            .map(|m| (m.kind.as_str(), m.target.as_str()))
            .collect();
        assert_eq!(
            mocks,
            vec![("patch", "billing.service.clock"), ("MagicMock", "repo")]
        );

        let second = &model.test_cases[1];
        assert_eq!(second.name, "test_post");
        assert_eq!(second.target_function.as_deref(), Some("post"));
        let kinds: Vec<&str> = second.assertions.iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, vec!["raises", "assertEqual"]);
        assert!(model.classes[0].methods[0].is_test);
    }

    #[test]
    fn test_python_classify_assert() {
        assert_eq!(classify_assert("x").0, "truthy");
        assert_eq!(classify_assert("not x").0, "falsy");
        assert_eq!(classify_assert("x is None").0, "is_none");
        assert_eq!(classify_assert("a in b, 'msg'").0, "in");
        assert_eq!(classify_assert("len(x) >= 2").0, "compare");
        assert_eq!(classify_assert("isinstance(x, int)").0, "isinstance");
    }
}
