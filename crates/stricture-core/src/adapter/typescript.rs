//! TypeScript / JavaScript adapter.
//!
//! One adapter serves `.ts/.tsx/.js/.jsx/.mjs/.cjs`; JavaScript files carry
//! the `javascript` language tag. Classes are tracked on a stack together
//! with their body depth so methods are only recognised directly inside a
//! class body.

use std::sync::LazyLock;

use regex::Regex;

use super::imports::{resolve_typescript, FileIndex};
use super::lexical::{
    base_name, brace_block_end, brace_delta, build_parameters, complexity, extension_of,
    extract_calls, normalize_type_name, split_top_level, strip_comments,
    throw_exits, CommentStyle,
};
use super::{covers_targets, prepare, AdapterConfig, LanguageAdapter, WorkBudget};
use crate::errors::StrictureResult;
use crate::models::{
    to_slash, Assertion, ClassModel, ExportDecl, FieldModel, FuncModel, ImportDecl, Mock,
    TestCase, TypeKind, TypeModel, UnifiedFileModel,
};

// ---------------------------------------------------------------------------
// Compiled regex patterns
// ---------------------------------------------------------------------------

// -- Imports --

static IMPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*import\s+(?:type\s+)?(.+?)\s+from\s+['"]([^'"]+)['"]"#).unwrap()
});

static IMPORT_OPEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(?:type\s+)?(?:[A-Za-z_$][\w$]*\s*,\s*)?\{[^}]*$").unwrap());

static IMPORT_SIDE_EFFECT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^\s*import\s+['"]([^'"]+)['"]"#).unwrap());

static EXPORT_FROM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*export\s+(?:type\s+)?(\*(?:\s+as\s+[A-Za-z_$][\w$]*)?|\{[^}]*\})\s*from\s+['"]([^'"]+)['"]"#,
    )
    .unwrap()
});

static REQUIRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?:\b(?:const|let|var)\s+(?:([A-Za-z_$][\w$]*)|\{([^}]*)\})\s*=\s*)?\brequire\(\s*['"]([^'"]+)['"]\s*\)"#,
    )
    .unwrap()
});

// -- Exports --

static EXPORT_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*export\s+(default\s+)?(?:declare\s+)?(?:abstract\s+)?(?:async\s+)?(function\*?|class|interface|type|const\s+enum|enum|const|let|var)\s+([A-Za-z_$][\w$]*)",
    )
    .unwrap()
});

static EXPORT_DEFAULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*export\s+default\s+(?:async\s+)?(?:function\*?\s*\(|class\s*\{|([A-Za-z_$][\w$]*))")
        .unwrap()
});

static EXPORT_LIST_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*export\s*\{([^}]*)\}\s*;?\s*$").unwrap());

static CJS_DEFAULT_EXPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*module\.exports\s*=").unwrap());

static CJS_NAMED_EXPORT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=").unwrap()
});

// -- Declarations --

static FUNCTION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(?:default\s+)?(?:declare\s+)?(?:async\s+)?function\*?\s+([A-Za-z_$][\w$]*)\s*(?:<[^>]*>)?\s*\(([^)]*)\)\s*(?::\s*([^{]+))?",
    )
    .unwrap()
});

static ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(?:const|let|var)\s+([A-Za-z_$][\w$]*)\s*(?::\s*[^=]+)?=\s*(?:async\s+)?(?:\(([^)]*)\)|([A-Za-z_$][\w$]*))\s*(?::\s*([^=]+?))?\s*=>",
    )
    .unwrap()
});

static CLASS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(?:default\s+)?(?:declare\s+)?(?:abstract\s+)?class\s+([A-Za-z_$][\w$]*)(?:<[^>]*>)?(?:\s+extends\s+([A-Za-z_$][\w$.]*)(?:<[^>]*>)?)?(?:\s+implements\s+([^{]+))?",
    )
    .unwrap()
});

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|private|protected|static|readonly|async|override|abstract|get|set)\s+)*)\*?([A-Za-z_$#][\w$]*)\s*(?:<[^>]*>)?\s*\(([^)]*)\)\s*(?::\s*([^{;]+))?\s*\{",
    )
    .unwrap()
});

static CLASS_ARROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|private|protected|static|readonly)\s+)*)([A-Za-z_$#][\w$]*)\s*=\s*(?:async\s+)?\(([^)]*)\)\s*(?::\s*([^=]+?))?\s*=>",
    )
    .unwrap()
});

static CLASS_FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|private|protected|static|readonly|declare|override)\s+)*)([A-Za-z_$#][\w$]*)\s*[?!]?\s*(?::\s*([^=;]+?))?\s*(?:=\s*[^;]*)?;\s*$",
    )
    .unwrap()
});

static INTERFACE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(export\s+)?(?:declare\s+)?interface\s+([A-Za-z_$][\w$]*)(?:<[^>]*>)?(?:\s+extends\s+([^{]+))?",
    )
    .unwrap()
});

static TYPE_ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(export\s+)?(?:declare\s+)?type\s+([A-Za-z_$][\w$]*)(?:<[^>]*>)?\s*=\s*(.*)$")
        .unwrap()
});

static ENUM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(export\s+)?(?:declare\s+)?(?:const\s+)?enum\s+([A-Za-z_$][\w$]*)").unwrap()
});

static PROPERTY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:readonly\s+)?([A-Za-z_$][\w$]*|'[^']+'|"[^"]+")\??\s*:\s*([^;,]+?)\s*[;,]?\s*$"#,
    )
    .unwrap()
});

static MEMBER_METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z_$][\w$]*)\??\s*(?:<[^>]*>)?\s*\(").unwrap());

static ENUM_MEMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([A-Za-z_$][\w$]*)\s*(?:=\s*[^,]+)?,?\s*$").unwrap());

// -- Tests --

static TEST_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*(?:it|test)(?:\.(?:only|skip|concurrent))?(?:\.each\s*(?:\([^)]*\)|`[^`]*`))?\s*\(\s*['"`]([^'"`]*)['"`]"#,
    )
    .unwrap()
});

static DESCRIBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*describe(?:\.(?:only|skip))?\s*\(\s*['"`]([^'"`]*)['"`]"#).unwrap()
});

static EXPECT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bexpect\((.*?)\)((?:\.(?:not|resolves|rejects))*)\.(to[A-Za-z]+)\(([^)]*)\)")
        .unwrap()
});

static ASSERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\bassert(?:\.([A-Za-z]+))?\(\s*([^,)]+)(?:,\s*([^,)]+))?").unwrap()
});

static MOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:jest|vi|sinon)\.(fn|mock|doMock|spyOn|stub|spy)\(\s*([^,)]*)").unwrap()
});

fn is_control_keyword(name: &str) -> bool {
    matches!(
        name,
        "if" | "for" | "while" | "switch" | "catch" | "function" | "return" | "with" | "do"
    )
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct TypeScriptAdapter;

impl LanguageAdapter for TypeScriptAdapter {
    fn name(&self) -> &'static str {
        "typescript"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"]
    }

    fn is_test_file(&self, path: &str) -> bool {
        let normalized = to_slash(path).to_ascii_lowercase();
        let name = base_name(&normalized);
        name.contains(".test.")
            || name.contains(".spec.")
            || normalized.starts_with("__tests__/")
            || normalized.contains("/__tests__/")
    }

    fn parse(
        &self,
        path: &str,
        source: &[u8],
        config: &AdapterConfig,
    ) -> StrictureResult<UnifiedFileModel> {
        let mut prepared = prepare(self.name(), path, source, config)?;
        let language = match extension_of(&prepared.path).as_str() {
            ".js" | ".jsx" | ".mjs" | ".cjs" => "javascript",
            _ => "typescript",
        };
        let mut model = UnifiedFileModel::new(
            &prepared.path,
            language,
            self.is_test_file(&prepared.path),
            source,
        );
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
        resolve_typescript(from_path, &import.path, index)
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

struct OpenClass {
    index: usize,
    body_depth: i32,
    end: usize,
}

fn extract(
    model: &mut UnifiedFileModel,
    lines: &[&str],
    budget: &mut WorkBudget,
) -> StrictureResult<()> {
    let mut depth = 0i32;
    let mut classes: Vec<OpenClass> = Vec::new();
    let mut pending_import: Option<(usize, String)> = None;
    let mut describes: Vec<(String, usize, usize)> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        budget.tick(&model.path)?;
        let line_no = idx + 1;
        let before = depth;
        depth += brace_delta(line);
        while classes.last().is_some_and(|c| idx > c.end) {
            classes.pop();
        }

        // Multi-line `import { ... } from '...'`.
        if let Some((start, mut acc)) = pending_import.take() {
            acc.push(' ');
            acc.push_str(line.trim());
            if let Some(caps) = IMPORT_FROM_RE.captures(&acc) {
                model
                    .imports
                    .push(import_from(&caps[1], &caps[2], start + 1, line_no));
            } else if idx - start < 64 {
                pending_import = Some((start, acc));
            }
            continue;
        }

        if extract_import(model, line, line_no) {
            continue;
        }
        if IMPORT_OPEN_RE.is_match(line) {
            pending_import = Some((idx, line.trim().to_string()));
            continue;
        }

        extract_exports(model, line, line_no);

        if let Some(caps) = DESCRIBE_RE.captures(line) {
            let end = brace_block_end(lines, idx, 3);
            describes.push((caps[1].to_string(), idx, end));
        }
        if model.is_test_file {
            if let Some(caps) = TEST_RE.captures(line) {
                let enclosing = describes
                    .iter()
                    .rev()
                    .find(|(_, start, end)| *start < idx && idx <= *end)
                    .map(|(title, _, _)| title.as_str());
                let case = test_case(lines, idx, &caps[1], enclosing);
                model.test_cases.push(case);
                continue;
            }
        }

        // Class members.
        if let Some(open) = classes.last() {
            if before == open.body_depth {
                let class_index = open.index;
                extract_member(model, lines, idx, class_index);
                continue;
            }
            if before > open.body_depth {
                continue;
            }
        }

        if before != 0 {
            continue;
        }

        if let Some(caps) = CLASS_RE.captures(line) {
            let end = brace_block_end(lines, idx, 2);
            let mut implements: Vec<String> = Vec::new();
            if let Some(parent) = caps.get(3) {
                implements.push(parent.as_str().to_string());
            }
            if let Some(list) = caps.get(4) {
                implements.extend(
                    split_top_level(list.as_str(), ',')
                        .into_iter()
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty()),
                );
            }
            model.classes.push(ClassModel {
                name: caps[2].to_string(),
                is_exported: caps.get(1).is_some(),
                implements,
                start_line: line_no,
                end_line: end + 1,
                ..ClassModel::default()
            });
            classes.push(OpenClass {
                index: model.classes.len() - 1,
                body_depth: before + 1,
                end,
            });
            continue;
        }
        if let Some(caps) = INTERFACE_RE.captures(line) {
            let ty = interface_type(lines, idx, &caps[2], caps.get(1).is_some());
            model.types.push(ty);
            continue;
        }
        if let Some(caps) = ENUM_RE.captures(line) {
            let ty = enum_type(lines, idx, &caps[2], caps.get(1).is_some());
            model.types.push(ty);
            continue;
        }
        if let Some(caps) = TYPE_ALIAS_RE.captures(line) {
            let object_literal = caps[3].trim_start().starts_with('{');
            let mut ty = if object_literal {
                interface_type(lines, idx, &caps[2], caps.get(1).is_some())
            } else {
                TypeModel {
                    name: caps[2].to_string(),
                    is_exported: caps.get(1).is_some(),
                    start_line: line_no,
                    end_line: line_no,
                    ..TypeModel::default()
                }
            };
            ty.kind = TypeKind::Type;
            model.types.push(ty);
            continue;
        }
        if let Some(caps) = FUNCTION_RE.captures(line) {
            let func = build_function(
                lines,
                idx,
                &caps[2],
                None,
                caps.get(3).map_or("", |m| m.as_str()),
                caps.get(4).map(|m| m.as_str()),
                caps.get(1).is_some(),
            );
            model.functions.push(func);
            continue;
        }
        if let Some(caps) = ARROW_RE.captures(line) {
            let params = caps
                .get(3)
                .or_else(|| caps.get(4))
                .map_or("", |m| m.as_str());
            let func = build_function(
                lines,
                idx,
                &caps[2],
                None,
                params,
                caps.get(5).map(|m| m.as_str()),
                caps.get(1).is_some(),
            );
            model.functions.push(func);
        }
    }
    Ok(())
}

/// Single-line import forms. Returns true when the line was an import.
fn extract_import(model: &mut UnifiedFileModel, line: &str, line_no: usize) -> bool {
    if let Some(caps) = IMPORT_FROM_RE.captures(line) {
        model
            .imports
            .push(import_from(&caps[1], &caps[2], line_no, line_no));
        return true;
    }
    if let Some(caps) = IMPORT_SIDE_EFFECT_RE.captures(line) {
        model.imports.push(ImportDecl {
            path: caps[1].to_string(),
            start_line: line_no,
            end_line: line_no,
            ..ImportDecl::default()
        });
        return true;
    }
    if let Some(caps) = EXPORT_FROM_RE.captures(line) {
        let clause = caps[1].trim();
        let mut decl = import_from(clause, &caps[2], line_no, line_no);
        if clause.starts_with('{') {
            for name in named_bindings(clause) {
                push_export(model, &name.1, "value", false, line_no);
            }
        } else if let Some(ns) = &decl.alias {
            push_export(model, ns, "value", false, line_no);
        }
        decl.is_default = false;
        model.imports.push(decl);
        return true;
    }
    let mut matched = false;
    for caps in REQUIRE_RE.captures_iter(line) {
        let names = match (caps.get(1), caps.get(2)) {
            (Some(default), _) => vec![default.as_str().to_string()],
            (None, Some(list)) => named_bindings(&format!("{{{}}}", list.as_str()))
                .into_iter()
                .map(|(imported, _)| imported)
                .collect(),
            _ => Vec::new(),
        };
        model.imports.push(ImportDecl {
            path: caps[3].to_string(),
            alias: None,
            is_default: caps.get(1).is_some(),
            names,
            start_line: line_no,
            end_line: line_no,
        });
        matched = true;
    }
    matched
}

/// `(imported, local)` pairs of a `{ a, b as c }` clause.
fn named_bindings(clause: &str) -> Vec<(String, String)> {
    let inner = clause
        .trim()
        .trim_start_matches('{')
        .trim_end_matches('}');
    inner
        .split(',')
        .filter_map(|item| {
            let item = item.trim().trim_start_matches("type ").trim();
            if item.is_empty() {
                return None;
            }
            let (imported, local) = match item.split_once(" as ") {
                Some((i, l)) => (i.trim(), l.trim()),
                None => (item, item),
            };
            Some((imported.to_string(), local.to_string()))
        })
        .collect()
}

fn import_from(clause: &str, path: &str, start_line: usize, end_line: usize) -> ImportDecl {
    let mut decl = ImportDecl {
        path: path.to_string(),
        start_line,
        end_line,
        ..ImportDecl::default()
    };
    let clause = clause.trim();
    let (head, named) = match clause.find('{') {
        Some(brace) => (clause[..brace].trim().trim_end_matches(','), Some(&clause[brace..])),
        None => (clause, None),
    };
    for part in head.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Some(ns) = part.strip_prefix('*') {
            decl.alias = ns
                .trim()
                .strip_prefix("as")
                .map(|a| a.trim().to_string())
                .filter(|a| !a.is_empty());
        } else {
            decl.is_default = true;
            decl.names.push(part.to_string());
        }
    }
    if let Some(named) = named {
        decl.names
            .extend(named_bindings(named).into_iter().map(|(imported, _)| imported));
    }
    decl
}

fn push_export(model: &mut UnifiedFileModel, name: &str, kind: &str, is_default: bool, line: usize) {
    model.exports.push(ExportDecl {
        name: name.to_string(),
        kind: kind.to_string(),
        is_default,
        start_line: line,
        end_line: line,
    });
}

fn extract_exports(model: &mut UnifiedFileModel, line: &str, line_no: usize) {
    if let Some(caps) = EXPORT_DECL_RE.captures(line) {
        let kind = match &caps[2] {
            "class" => "class",
            "interface" => "interface",
            "type" => "type",
            "enum" => "enum",
            k if k.starts_with("function") => "function",
            k if k.ends_with("enum") => "enum",
            "const" if ARROW_RE.is_match(line) => "function",
            "const" => "const",
            _ => "var",
        };
        push_export(model, &caps[3], kind, caps.get(1).is_some(), line_no);
    } else if let Some(caps) = EXPORT_DEFAULT_RE.captures(line) {
        let name = caps.get(1).map_or("default", |m| m.as_str());
        push_export(model, name, "value", true, line_no);
    } else if let Some(caps) = EXPORT_LIST_RE.captures(line) {
        for (_, exported) in named_bindings(&caps[1]) {
            let is_default = exported == "default";
            push_export(model, &exported, "value", is_default, line_no);
        }
    } else if CJS_DEFAULT_EXPORT_RE.is_match(line) {
        push_export(model, "default", "value", true, line_no);
    } else if let Some(caps) = CJS_NAMED_EXPORT_RE.captures(line) {
        push_export(model, &caps[1], "value", false, line_no);
    }
}

fn extract_member(model: &mut UnifiedFileModel, lines: &[&str], idx: usize, class_index: usize) {
    let line = lines[idx];
    let class_name = model.classes[class_index].name.clone();
    let class_exported = model.classes[class_index].is_exported;

    let method = METHOD_RE
        .captures(line)
        .filter(|c| !is_control_keyword(&c[2]))
        .or_else(|| CLASS_ARROW_RE.captures(line));
    if let Some(caps) = method {
        let modifiers = caps.get(1).map_or("", |m| m.as_str());
        let name = &caps[2];
        let visible = !modifiers.contains("private") && !modifiers.contains("protected");
        let func = build_function(
            lines,
            idx,
            name,
            Some(class_name),
            caps.get(3).map_or("", |m| m.as_str()),
            caps.get(4).map(|m| m.as_str()),
            class_exported && visible && !name.starts_with('#'),
        );
        model.classes[class_index].methods.push(func);
        return;
    }

    if let Some(caps) = CLASS_FIELD_RE.captures(line) {
        let name = caps[2].to_string();
        if is_control_keyword(&name) || name == "break" || name == "continue" {
            return;
        }
        let modifiers = caps.get(1).map_or("", |m| m.as_str());
        model.classes[class_index].fields.push(FieldModel {
            is_exported: !modifiers.contains("private") && !name.starts_with('#'),
            name,
            type_: normalize_type_name(caps.get(3).map(|m| m.as_str())),
            json_tag: None,
            start_line: idx + 1,
        });
    }
}

fn build_function(
    lines: &[&str],
    idx: usize,
    name: &str,
    receiver: Option<String>,
    params_raw: &str,
    returns_raw: Option<&str>,
    is_exported: bool,
) -> FuncModel {
    let end = brace_block_end(lines, idx, 3);
    let body = &lines[idx..=end];
    FuncModel {
        name: name.to_string(),
        receiver,
        params: build_parameters(params_raw, "typescript"),
        returns: normalize_type_name(returns_raw).into_iter().collect(),
        is_exported,
        is_test: false,
        calls: extract_calls(body),
        error_exits: throw_exits(body, idx),
        line_count: end - idx + 1,
        complexity: complexity(body, false),
        start_line: idx + 1,
        end_line: end + 1,
    }
}

/// Interface or object-literal type with its direct members.
fn interface_type(lines: &[&str], idx: usize, name: &str, exported: bool) -> TypeModel {
    let end = brace_block_end(lines, idx, 2);
    let mut ty = TypeModel {
        name: name.to_string(),
        kind: TypeKind::Interface,
        is_exported: exported,
        start_line: idx + 1,
        end_line: end + 1,
        ..TypeModel::default()
    };
    let mut depth = brace_delta(lines[idx]);
    for (offset, line) in lines[(idx + 1).min(end)..end].iter().enumerate() {
        let before = depth;
        depth += brace_delta(line);
        if before != 1 {
            continue;
        }
        if let Some(caps) = PROPERTY_RE.captures(line) {
            let field_name = caps[1].trim_matches(['\'', '"']).to_string();
            ty.fields.push(FieldModel {
                name: field_name,
                type_: normalize_type_name(Some(&caps[2])),
                is_exported: true,
                json_tag: None,
                start_line: idx + offset + 2,
            });
        } else if let Some(caps) = MEMBER_METHOD_RE.captures(line) {
            ty.methods.push(caps[1].to_string());
        }
    }
    ty
}

fn enum_type(lines: &[&str], idx: usize, name: &str, exported: bool) -> TypeModel {
    let end = brace_block_end(lines, idx, 2);
    let mut ty = TypeModel {
        name: name.to_string(),
        kind: TypeKind::Enum,
        is_exported: exported,
        start_line: idx + 1,
        end_line: end + 1,
        ..TypeModel::default()
    };
    for (offset, line) in lines[(idx + 1).min(end)..end].iter().enumerate() {
        if let Some(caps) = ENUM_MEMBER_RE.captures(line) {
            ty.fields.push(FieldModel {
                name: caps[1].to_string(),
                type_: None,
                is_exported: exported,
                json_tag: None,
                start_line: idx + offset + 2,
            });
        }
    }
    ty
}

fn test_case(lines: &[&str], idx: usize, name: &str, describe: Option<&str>) -> TestCase {
    let end = brace_block_end(lines, idx, 3);
    let mut assertions = Vec::new();
    let mut mocks = Vec::new();

    for (offset, line) in lines[idx..=end].iter().enumerate() {
        let line_no = idx + offset + 1;
        for caps in EXPECT_RE.captures_iter(line) {
            let chain = caps[2].trim_start_matches('.');
            let kind = if chain.is_empty() {
                caps[3].to_string()
            } else {
                format!("{}.{}", chain, &caps[3])
            };
            let expected = caps[4].trim();
            assertions.push(Assertion {
                kind,
                subject: caps[1].trim().to_string(),
                expected: (!expected.is_empty()).then(|| expected.to_string()),
                start_line: line_no,
            });
        }
        for caps in ASSERT_RE.captures_iter(line) {
            let kind = match caps.get(1) {
                Some(method) => format!("assert.{}", method.as_str()),
                None => "assert".to_string(),
            };
            assertions.push(Assertion {
                kind,
                subject: caps[2].trim().to_string(),
                expected: caps.get(3).map(|m| m.as_str().trim().to_string()),
                start_line: line_no,
            });
        }
        for caps in MOCK_RE.captures_iter(line) {
            let target = caps[2].trim().trim_matches(['\'', '"', '`']);
            mocks.push(Mock {
                target: if target.is_empty() { "fn" } else { target }.to_string(),
                kind: caps[1].to_string(),
                start_line: line_no,
            });
        }
    }

    let target_function = describe
        .filter(|d| !d.is_empty() && d.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '$'))
        .map(str::to_string);

    TestCase {
        name: name.to_string(),
        target_function,
        assertions,
        mocks,
        start_line: idx + 1,
        end_line: end + 1,
    }
}
