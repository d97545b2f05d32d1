//! Java adapter.
//!
//! Types are tracked on a stack keyed by brace depth, as in the TypeScript
//! adapter. Annotation-only lines are buffered and attached to the next
//! declaration.

use std::sync::LazyLock;

use regex::Regex;

use super::imports::{resolve_java, FileIndex};
use super::lexical::{
    base_name, brace_block_end, brace_delta, build_parameters, complexity, extract_calls,
    normalize_type_name, split_top_level, strip_comments, throw_exits, CommentStyle,
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

static IMPORT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*import\s+(?:static\s+)?([\w.]+(?:\.\*)?)\s*;").unwrap());

static ANNOTATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@([\w.]+)(?:\([^)]*\))?\s*").unwrap());

static TYPE_DECL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|protected|private|static|final|abstract|sealed|non-sealed|strictfp)\s+)*)(class|interface|enum|record)\s+([A-Za-z_]\w*)",
    )
    .unwrap()
});

static EXTENDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bextends\s+(.+?)(?:\s+implements\b|\s+permits\b|\s*\{|\s*$)").unwrap());

static IMPLEMENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bimplements\s+(.+?)(?:\s+permits\b|\s*\{|\s*$)").unwrap());

static RECORD_COMPONENTS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\brecord\s+\w+(?:<[^>]*>)?\s*\(([^)]*)\)").unwrap());

static METHOD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|protected|private|static|final|abstract|synchronized|native|default|strictfp)\s+)*)(?:<[^>]+>\s+)?([\w.$]+(?:<[^()]*>)?(?:\[\])*)\s+([A-Za-z_$]\w*)\s*\(([^)]*)\)?",
    )
    .unwrap()
});

static CONSTRUCTOR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*((?:(?:public|protected|private)\s+)*)([A-Z]\w*)\s*\(([^)]*)\)?").unwrap()
});

static FIELD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*((?:(?:public|protected|private|static|final|transient|volatile)\s+)*)([\w.$]+(?:<[^;=]*>)?(?:\[\])*)\s+([A-Za-z_$]\w*)\s*(?:=[^;]*)?;",
    )
    .unwrap()
});

// -- Tests --

static JUNIT_ASSERT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Assertions\.|Assert\.)?(assert[A-Z]\w*|fail)\((.*)\)\s*;").unwrap()
});

static ASSERTJ_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\bassertThat\((.*?)\)\.(\w+)\((.*?)\)\s*[;.]").unwrap());

static MOCKITO_CREATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Mockito\.)?(mockStatic|mockConstruction|mock|spy)\(\s*([\w.]+?)(?:\.class)?\s*[,)]").unwrap()
});

static WHEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:Mockito\.)?(when|given)\(\s*([\w.]+)\(").unwrap());

static VERIFY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Mockito\.)?(verify|then)\(\s*(\w+)(?:\s*,[^)]*(?:\([^)]*\))?[^)]*)?\)\.(\w+)\(").unwrap()
});

const TEST_ANNOTATIONS: [&str; 4] = ["Test", "ParameterizedTest", "RepeatedTest", "TestFactory"];

fn is_statement_keyword(word: &str) -> bool {
    matches!(
        word,
        "return" | "throw" | "new" | "else" | "case" | "yield" | "package" | "import" | "assert"
    )
}

fn is_modifier(word: &str) -> bool {
    matches!(
        word,
        "public"
            | "protected"
            | "private"
            | "static"
            | "final"
            | "abstract"
            | "synchronized"
            | "native"
            | "default"
            | "strictfp"
    )
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

pub struct JavaAdapter;

impl LanguageAdapter for JavaAdapter {
    fn name(&self) -> &'static str {
        "java"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[".java"]
    }

    fn is_test_file(&self, path: &str) -> bool {
        let normalized = to_slash(path);
        let name = base_name(&normalized);
        name.ends_with("Test.java") || name.ends_with("Tests.java")
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
            "java",
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
        _from_path: &str,
        import: &ImportDecl,
        index: &FileIndex,
    ) -> Option<String> {
        resolve_java(&import.path, index)
    }
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Owner {
    Class(usize),
    Type(usize),
}

struct OpenType {
    owner: Owner,
    name: String,
    exported: bool,
    interface: bool,
    body_depth: i32,
    end: usize,
}

/// Split leading annotations off a line: `(annotation names, rest)`.
fn take_annotations(line: &str) -> (Vec<String>, &str) {
    let mut names = Vec::new();
    let mut rest = line;
    while let Some(caps) = ANNOTATION_RE.captures(rest) {
        let Some(whole) = caps.get(0) else { break };
        let name = caps[1].rsplit('.').next().unwrap_or(&caps[1]).to_string();
        // `@interface` declares an annotation type, not an annotation.
        if name == "interface" {
            break;
        }
        names.push(name);
        rest = &rest[whole.end()..];
    }
    (names, rest)
}

fn extract(
    model: &mut UnifiedFileModel,
    lines: &[&str],
    budget: &mut WorkBudget,
) -> StrictureResult<()> {
    let mut depth = 0i32;
    let mut stack: Vec<OpenType> = Vec::new();
    let mut annotations: Vec<String> = Vec::new();

    for (idx, line) in lines.iter().enumerate() {
        budget.tick(&model.path)?;
        let line_no = idx + 1;
        let before = depth;
        depth += brace_delta(line);
        while stack.last().is_some_and(|t| idx > t.end) {
            stack.pop();
        }
        if line.trim().is_empty() {
            continue;
        }

        if before == 0 {
            if let Some(caps) = IMPORT_RE.captures(line) {
                let path = caps[1].to_string();
                let last = path.rsplit('.').next().unwrap_or(&path).to_string();
                model.imports.push(ImportDecl {
                    path,
                    alias: None,
                    names: vec![last],
                    is_default: false,
                    start_line: line_no,
                    end_line: line_no,
                });
                continue;
            }
        }

        let (inline, decl) = take_annotations(line);
        if decl.trim().is_empty() {
            annotations.extend(inline);
            continue;
        }
        let mut pending = std::mem::take(&mut annotations);
        pending.extend(inline);

        let parent = stack.last().map(|t| (t.body_depth, t.name.clone(), t.exported, t.interface, t.owner));
        let at_member_depth = matches!(parent, Some((body, ..)) if before == body);
        if !(before == 0 || at_member_depth) {
            continue;
        }

        if let Some(caps) = TYPE_DECL_RE.captures(decl) {
            let modifiers = caps.get(1).map_or("", |m| m.as_str());
            let keyword = &caps[2];
            let name = caps[3].to_string();
            let end = brace_block_end(lines, idx, 3);
            let exported = if at_member_depth {
                parent.as_ref().is_some_and(|p| p.2) && modifiers.contains("public")
            } else {
                modifiers.contains("public")
            };
            let owner = match keyword {
                "interface" | "enum" => {
                    let ty = type_decl(lines, idx, end, decl, &name, keyword, exported);
                    model.types.push(ty);
                    Owner::Type(model.types.len() - 1)
                }
                _ => {
                    let class = class_decl(decl, &name, exported, idx, end);
                    model.classes.push(class);
                    Owner::Class(model.classes.len() - 1)
                }
            };
            if before == 0 && exported {
                model.exports.push(ExportDecl {
                    name: name.clone(),
                    kind: keyword.to_string(),
                    is_default: false,
                    start_line: line_no,
                    end_line: end + 1,
                });
            }
            stack.push(OpenType {
                owner,
                name,
                exported,
                interface: keyword == "interface",
                body_depth: before + 1,
                end,
            });
            continue;
        }

        let Some((_, owner_name, owner_exported, owner_interface, owner)) = parent else {
            continue;
        };
        if !at_member_depth {
            continue;
        }
        member(
            model,
            lines,
            idx,
            decl,
            &pending,
            MemberOwner {
                owner,
                name: &owner_name,
                exported: owner_exported,
                interface: owner_interface,
            },
        );
    }
    Ok(())
}

fn class_decl(decl: &str, name: &str, exported: bool, idx: usize, end: usize) -> ClassModel {
    let mut implements = Vec::new();
    for re in [&*EXTENDS_RE, &*IMPLEMENTS_RE] {
        if let Some(caps) = re.captures(decl) {
            implements.extend(
                split_top_level(&caps[1], ',')
                    .into_iter()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            );
        }
    }
    let fields = RECORD_COMPONENTS_RE
        .captures(decl)
        .map(|caps| {
            build_parameters(&caps[1], "java")
                .into_iter()
                .map(|p| FieldModel {
                    name: p.name,
                    type_: p.type_,
                    is_exported: true,
                    json_tag: None,
                    start_line: idx + 1,
                })
                .collect()
        })
        .unwrap_or_default();
    ClassModel {
        name: name.to_string(),
        is_exported: exported,
        methods: Vec::new(),
        fields,
        implements,
        start_line: idx + 1,
        end_line: end + 1,
    }
}

/// Interface (method names) or enum (constants as fields).
fn type_decl(
    lines: &[&str],
    idx: usize,
    end: usize,
    decl: &str,
    name: &str,
    keyword: &str,
    exported: bool,
) -> TypeModel {
    let mut ty = TypeModel {
        name: name.to_string(),
        kind: if keyword == "enum" {
            TypeKind::Enum
        } else {
            TypeKind::Interface
        },
        is_exported: exported,
        start_line: idx + 1,
        end_line: end + 1,
        ..TypeModel::default()
    };
    if keyword == "enum" {
        let mut body: Vec<(usize, &str)> = Vec::new();
        if let Some(brace) = decl.find('{') {
            body.push((idx, &decl[brace + 1..]));
        }
        body.extend((idx + 1..end).map(|i| (i, lines[i])));
        'constants: for (line_idx, text) in body {
            let (constants, done) = match text.find(';') {
                Some(semi) => (&text[..semi], true),
                None => (text.trim_end_matches('}'), false),
            };
            for item in split_top_level(constants, ',') {
                let item = item.trim();
                let constant: String = item
                    .chars()
                    .take_while(|c| c.is_alphanumeric() || *c == '_')
                    .collect();
                if !constant.is_empty() && constant.chars().next().is_some_and(char::is_uppercase) {
                    ty.fields.push(FieldModel {
                        name: constant,
                        type_: None,
                        is_exported: exported,
                        json_tag: None,
                        start_line: line_idx + 1,
                    });
                }
            }
            if done {
                break 'constants;
            }
        }
    }
    ty
}

struct MemberOwner<'a> {
    owner: Owner,
    name: &'a str,
    exported: bool,
    interface: bool,
}

fn member(
    model: &mut UnifiedFileModel,
    lines: &[&str],
    idx: usize,
    decl: &str,
    annotations: &[String],
    owner: MemberOwner<'_>,
) {
    let signature = joined_signature(lines, idx, decl);

    let method = METHOD_RE
        .captures(&signature)
        .filter(|c| {
            !is_statement_keyword(&c[2]) && !is_modifier(&c[2]) && !is_statement_keyword(&c[3])
        })
        .map(|c| {
            (
                c.get(1).map_or("", |m| m.as_str()).to_string(),
                c[3].to_string(),
                c.get(4).map_or("", |m| m.as_str()).to_string(),
                Some(c[2].to_string()),
            )
        })
        .or_else(|| {
            CONSTRUCTOR_RE
                .captures(&signature)
                .filter(|c| &c[2] == owner.name)
                .map(|c| {
                    (
                        c.get(1).map_or("", |m| m.as_str()).to_string(),
                        c[2].to_string(),
                        c.get(3).map_or("", |m| m.as_str()).to_string(),
                        None,
                    )
                })
        });

    if let Some((modifiers, name, params, return_type)) = method {
        let visible = if owner.interface {
            !modifiers.contains("private")
        } else {
            modifiers.contains("public")
        };
        let end = brace_block_end(lines, idx, 4);
        let body = &lines[idx..=end];
        let is_test = model.is_test_file
            && (annotations.iter().any(|a| TEST_ANNOTATIONS.contains(&a.as_str()))
                || (name.starts_with("test") && modifiers.contains("public")));
        let func = FuncModel {
            receiver: Some(owner.name.to_string()),
            params: build_parameters(&params, "java"),
            returns: return_type
                .filter(|r| r != "void")
                .and_then(|r| normalize_type_name(Some(&r)))
                .into_iter()
                .collect(),
            is_exported: owner.exported && visible,
            is_test,
            calls: extract_calls(body),
            error_exits: throw_exits(body, idx),
            line_count: end - idx + 1,
            complexity: complexity(body, false),
            start_line: idx + 1,
            end_line: end + 1,
            name,
        };
        if is_test {
            model.test_cases.push(test_case(lines, idx, end, &func));
        }
        match owner.owner {
            Owner::Class(i) => model.classes[i].methods.push(func),
            Owner::Type(i) => model.types[i].methods.push(func.name),
        }
        return;
    }

    field(model, idx, decl, owner);
}

fn field(model: &mut UnifiedFileModel, idx: usize, decl: &str, owner: MemberOwner<'_>) {
    let Owner::Class(class_index) = owner.owner else {
        return;
    };
    let Some(caps) = FIELD_RE.captures(decl) else {
        return;
    };
    if is_statement_keyword(&caps[2]) {
        return;
    }
    let modifiers = caps.get(1).map_or("", |m| m.as_str());
    model.classes[class_index].fields.push(FieldModel {
        name: caps[3].to_string(),
        type_: normalize_type_name(Some(&caps[2])),
        is_exported: modifiers.contains("public"),
        json_tag: None,
        start_line: idx + 1,
    });
}

/// The declaration line joined with continuation lines until the parameter
/// list closes.
fn joined_signature(lines: &[&str], idx: usize, decl: &str) -> String {
    let mut signature = decl.trim().to_string();
    if !signature.contains('(') || signature.contains(')') {
        return signature;
    }
    for line in lines.iter().skip(idx + 1).take(12) {
        signature.push(' ');
        signature.push_str(line.trim());
        if line.contains(')') {
            break;
        }
    }
    signature
}

fn test_case(lines: &[&str], idx: usize, end: usize, func: &FuncModel) -> TestCase {
    let mut assertions = Vec::new();
    let mut mocks = Vec::new();
    for (offset, line) in lines[idx..=end].iter().enumerate() {
        let line_no = idx + offset + 1;
        if let Some(caps) = ASSERTJ_RE.captures(line) {
            let expected = caps[3].trim();
            assertions.push(Assertion {
                kind: format!("assertThat.{}", &caps[2]),
                subject: caps[1].trim().to_string(),
                expected: (!expected.is_empty()).then(|| expected.to_string()),
                start_line: line_no,
            });
        } else if let Some(caps) = JUNIT_ASSERT_RE.captures(line) {
            let args = split_top_level(&caps[2], ',');
            let args: Vec<&str> = args.iter().map(|a| a.trim()).collect();
            // JUnit puts the expected value first for two-operand asserts.
            let (subject, expected) = match args.as_slice() {
                [] => (String::new(), None),
                [only] => (only.to_string(), None),
                [first, second, ..] if &caps[1] != "assertThat" => {
                    (second.to_string(), Some(first.to_string()))
                }
                [first, second, ..] => (first.to_string(), Some(second.to_string())),
            };
            assertions.push(Assertion {
                kind: caps[1].to_string(),
                subject,
                expected,
                start_line: line_no,
            });
        }
        for caps in MOCKITO_CREATE_RE.captures_iter(line) {
            mocks.push(Mock {
                target: caps[2].to_string(),
                kind: caps[1].to_string(),
                start_line: line_no,
            });
        }
        for caps in WHEN_RE.captures_iter(line) {
            mocks.push(Mock {
                target: caps[2].to_string(),
                kind: caps[1].to_string(),
                start_line: line_no,
            });
        }
        for caps in VERIFY_RE.captures_iter(line) {
            mocks.push(Mock {
                target: format!("{}.{}", &caps[2], &caps[3]),
                kind: caps[1].to_string(),
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

/// The longest called method whose name prefixes the test name, ignoring a
/// leading `test` and case.
fn target_of(test_name: &str, calls: &[String]) -> Option<String> {
    let rest = test_name
        .strip_prefix("test")
        .unwrap_or(test_name)
        .trim_start_matches('_')
        .to_ascii_lowercase();
    calls
        .iter()
        .map(|c| c.rsplit('.').next().unwrap_or(c))
        .filter(|name| !name.is_empty() && rest.starts_with(&name.to_ascii_lowercase()))
        .max_by_key(|name| name.len())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(path: &str, source: &str) -> UnifiedFileModel {
        JavaAdapter
            .parse(path, source.as_bytes(), &AdapterConfig::default())
            .unwrap()
    }

    const SERVICE: &str = r#"package com.acme.billing;

import java.util.List;
import static com.acme.util.Money.round;
import com.acme.store.*;

/** Invoices. class Hidden {} */
@Service
public class InvoiceService extends BaseService implements Billing, AutoCloseable {
    private final InvoiceRepository repo;
    public static final int MAX_ITEMS = 50;
    private List<Invoice> cache = new ArrayList<>();

    public InvoiceService(InvoiceRepository repo) {
        this.repo = repo;
    }

    @Override
    public Invoice create(String customerId,
                          long amount) throws BillingException {
        if (customerId == null || amount <= 0) {
            throw new BillingException("invalid invoice");
        }
        return repo.save(new Invoice(customerId, amount));
    }

    private void audit() {
        logger.info("audit");
    }

    public void close() {}
}

interface Billing {
    Invoice create(String customerId, long amount) throws BillingException;
}

public enum Currency {
    EUR("eur"), USD("usd");

    private final String code;
}
"#;

    #[test]
    fn test_java_imports() {
        let model = parse("src/main/java/com/acme/billing/InvoiceService.java", SERVICE);
        let paths: Vec<&str> = model.imports.iter().map(|i| i.path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["java.util.List", "com.acme.util.Money.round", "com.acme.store.*"]
        );
        assert_eq!(model.imports[0].names, vec!["List"]);
    }

    #[test]
    fn test_java_class_members() {
        let model = parse("src/main/java/com/acme/billing/InvoiceService.java", SERVICE);
        assert_eq!(model.classes.len(), 1);
        let class = &model.classes[0];
        assert_eq!(class.name, "InvoiceService");
        assert!(class.is_exported);
        assert_eq!(class.implements, vec!["BaseService", "Billing", "AutoCloseable"]);

        let methods: Vec<&str> = class.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(methods, vec!["InvoiceService", "create", "audit", "close"]);

        let create = &class.methods[1];
        assert!(create.is_exported);
        assert_eq!(create.receiver.as_deref(), Some("InvoiceService"));
        let params: Vec<(&str, Option<&str>)> = create
            .params
            .iter()
            .map(|p| (p.name.as_str(), p.type_.as_deref()))
            .collect();
        assert_eq!(params, vec![("customerId", Some("String")), ("amount", Some("long"))]);
        assert_eq!(create.returns, vec!["Invoice".to_string()]);
        assert_eq!(create.error_exits.len(), 1);
        assert_eq!(create.error_exits[0].message.as_deref(), Some("invalid invoice"));
        assert_eq!(create.complexity, 3);
        assert!(create.calls.contains(&"repo.save".to_string()));
        assert_eq!(create.start_line, 19);
        assert_eq!(create.end_line, 25);

        assert!(!class.methods[2].is_exported);
        assert!(class.methods[2].returns.is_empty());

        let fields: Vec<(&str, bool)> = class
            .fields
            .iter()
            .map(|f| (f.name.as_str(), f.is_exported))
            .collect();
        assert_eq!(
            fields,
            vec![("repo", false), ("MAX_ITEMS", true), ("cache", false)]
        );
        assert_eq!(class.fields[2].type_.as_deref(), Some("List<Invoice>"));
    }

    #[test]
    fn test_java_types_and_exports() {
        let model = parse("src/main/java/com/acme/billing/InvoiceService.java", SERVICE);
        let billing = model.types.iter().find(|t| t.name == "Billing").unwrap();
        assert_eq!(billing.kind, TypeKind::Interface);
        assert!(!billing.is_exported);
        assert_eq!(billing.methods, vec!["create".to_string()]);

        let currency = model.types.iter().find(|t| t.name == "Currency").unwrap();
        assert_eq!(currency.kind, TypeKind::Enum);
        let constants: Vec<&str> = currency.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(constants, vec!["EUR", "USD"]);

        let exports: Vec<(&str, &str)> = model
            .exports
            .iter()
            .map(|e| (e.name.as_str(), e.kind.as_str()))
            .collect();
        assert_eq!(exports, vec![("InvoiceService", "class"), ("Currency", "enum")]);
    }

    #[test]
    fn test_java_record_components() {
        let model = parse("src/Point.java", "public record Point(int x, int y) implements Shape {\n}\n");
        let class = &model.classes[0];
        let fields: Vec<&str> = class.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fields, vec!["x", "y"]);
        assert_eq!(class.implements, vec!["Shape"]);
    }

    #[test]
    fn test_java_is_test_file() {
        let adapter = JavaAdapter;
        assert!(adapter.is_test_file("src/test/java/InvoiceServiceTest.java"));
        assert!(adapter.is_test_file("src/test/java/InvoiceServiceTests.java"));
        assert!(!adapter.is_test_file("src/main/java/Testing.java"));
    }

    #[test]
    fn test_java_test_cases() {
        let source = r#"// @covers src/main/java/com/acme/billing/InvoiceService.java
package com.acme.billing;

class InvoiceServiceTest {
    @Mock
    private InvoiceRepository repo;

    @Test
    void createReturnsInvoice() {
        InvoiceRepository repo = mock(InvoiceRepository.class);
        when(repo.save(any())).thenReturn(invoice);
        Invoice result = service.create("c1", 10);
        assertNotNull(result);
        assertEquals(10, result.getAmount());
        assertThat(result.getCustomer()).isEqualTo("c1");
        verify(repo).save(any());
    }

    @ParameterizedTest
    @ValueSource(ints = {1, 2})
    void rejects(int amount) {
        assertThrows(BillingException.class, () -> service.create(null, amount));
    }

    private Invoice helper() {
        return null;
    }
}
"#;
        let model = parse("src/test/java/com/acme/billing/InvoiceServiceTest.java", source);
        assert_eq!(
            model.test_targets,
            vec!["src/main/java/com/acme/billing/InvoiceService.java".to_string()]
        );
        assert_eq!(model.test_cases.len(), 2);

        let first = &model.test_cases[0];
        assert_eq!(first.name, "createReturnsInvoice");
        assert_eq!(first.target_function.as_deref(), Some("create"));
        let kinds: Vec<&str> = first.assertions.iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(kinds, vec!["assertNotNull", "assertEquals", "assertThat.isEqualTo"]);
        assert_eq!(first.assertions[1].subject, "result.getAmount()");
        assert_eq!(first.assertions[1].expected.as_deref(), Some("10"));
        let mocks: Vec<(&str, &str)> = first
            .mocks
            .iter()
            .map(|m| (m.kind.as_str(), m.target.as_str()))
            .collect();
        assert_eq!(
            mocks,
            vec![
                ("mock", "InvoiceRepository"),
                ("when", "repo.save"),
                ("verify", "repo.save"),
            ]
        );

        let second = &model.test_cases[1];
        assert_eq!(second.name, "rejects");
        assert_eq!(second.assertions[0].kind, "assertThrows");

        let class = &model.classes[0];
        assert_eq!(class.fields[0].name, "repo");
        assert!(!class.methods[2].is_test);
    }
}
