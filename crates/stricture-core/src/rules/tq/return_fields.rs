use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::Regex;

use crate::context::ProjectContext;
use crate::models::{Assertion, FieldModel, TestCase, TypeKind, UnifiedFileModel, Violation};
use crate::rules::options::str_list_option;
use crate::rules::{violation, Rule, RuleConfig};

use super::resolve_target;

/// `.field` accesses and `["field"]` subscripts.
static MEMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\.\s*([A-Za-z_][A-Za-z0-9_]*)|\[\s*['"]([^'"]+)['"]\s*\]"#).unwrap()
});

/// Generic containers whose type argument is what the caller inspects.
const WRAPPERS: &[&str] = &[
    "Promise",
    "Optional",
    "Observable",
    "CompletableFuture",
    "Future",
    "Mono",
    "Awaitable",
    "ResponseEntity",
];

const NON_RECORD_TYPES: &[&str] = &[
    "error", "void", "None", "null", "undefined", "any", "unknown", "object", "Object",
];

/// Bare type name behind pointers, slices, unions and wrapper generics:
/// `*Invoice`, `Promise<UserDTO>`, `Optional["Invoice"]`.
fn unwrap_type(raw: &str) -> Option<&str> {
    let mut ty = raw.trim();
    ty = ty
        .split('|')
        .map(str::trim)
        .find(|part| !NON_RECORD_TYPES.contains(part))
        .unwrap_or(ty);
    loop {
        ty = ty.trim_start_matches(['*', '&']).trim();
        if let Some(rest) = ty.strip_prefix("[]") {
            ty = rest;
            continue;
        }
        let Some(open) = ty.find(['<', '[']) else {
            break;
        };
        let outer = ty[..open].rsplit('.').next().unwrap_or(&ty[..open]);
        if !WRAPPERS.contains(&outer) {
            ty = &ty[..open];
            break;
        }
        let close = ty.rfind(['>', ']'])?;
        if close <= open {
            return None;
        }
        ty = &ty[open + 1..close];
    }
    let ty = ty.trim().trim_matches(['"', '\'']);
    let name = ty.rsplit('.').next().unwrap_or(ty);
    let valid = !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
        && !NON_RECORD_TYPES.contains(&name);
    valid.then_some(name)
}

fn returned_type(returns: &[String]) -> Option<&str> {
    returns.iter().find_map(|r| unwrap_type(r))
}

/// Fields of the struct, interface or class called `name`, looked up in
/// `preferred` first.
fn fields_of<'a>(
    context: &'a ProjectContext,
    preferred: &'a UnifiedFileModel,
    name: &str,
) -> Option<&'a [FieldModel]> {
    std::iter::once(preferred)
        .chain(context.files().values())
        .find_map(|file| {
            file.types
                .iter()
                .filter(|t| t.kind != TypeKind::Enum)
                .find(|t| t.name == name)
                .map(|t| t.fields.as_slice())
                .or_else(|| {
                    file.classes
                        .iter()
                        .find(|c| c.name == name)
                        .map(|c| c.fields.as_slice())
                })
        })
}

/// Lowercased member names an assertion reads; `getTotal()` reads `total`.
fn members(assertion: &Assertion) -> Vec<String> {
    std::iter::once(assertion.subject.as_str())
        .chain(assertion.expected.as_deref())
        .flat_map(|text| MEMBER_RE.captures_iter(text))
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)))
        .map(|m| {
            let name = m.as_str();
            let bare = ["get", "is"].iter().find_map(|prefix| {
                name.strip_prefix(prefix)
                    .filter(|rest| rest.starts_with(|c: char| c.is_ascii_uppercase()))
            });
            bare.unwrap_or(name).to_ascii_lowercase()
        })
        .collect()
}

/// An equality check on the value itself, e.g. `assert.Equal(t, want, got)`.
fn compares_whole_value(assertion: &Assertion) -> bool {
    let kind = assertion.kind.to_ascii_lowercase();
    kind.contains("equal")
        && !kind.contains("not")
        && assertion.expected.is_some()
        && !MEMBER_RE.is_match(&assertion.subject)
}

fn field_matches(field: &FieldModel, asserted: &BTreeSet<String>) -> bool {
    asserted.contains(&field.name.to_ascii_lowercase())
        || field
            .json_tag
            .as_deref()
            .is_some_and(|tag| asserted.contains(&tag.to_ascii_lowercase()))
}

/// `TQ-return-type-verified`: tests that inspect a returned record check all
/// of its fields, or compare the whole value.
///
/// Assertions are pooled across the file's cases for the same target. A
/// group with no field assertions at all is left to other rules. Fields in
/// `ignoreFields` and names starting with `_` are skipped.
pub struct ReturnTypeVerified;

impl ReturnTypeVerified {
    fn check_target(
        &self,
        file: &UnifiedFileModel,
        context: &ProjectContext,
        config: &RuleConfig,
        target: &str,
        cases: &[&TestCase],
    ) -> Option<Violation> {
        let (source, func) = resolve_target(context, &file.path, target)?;
        let type_name = returned_type(&func.returns)?;
        let ignored = str_list_option(config, "ignoreFields").unwrap_or_default();
        let fields: Vec<&FieldModel> = fields_of(context, source, type_name)?
            .iter()
            .filter(|f| !f.name.starts_with('_') && !ignored.contains(&f.name))
            .collect();
        if fields.is_empty() {
            return None;
        }

        let assertions: Vec<&Assertion> = cases.iter().flat_map(|c| c.assertions.iter()).collect();
        if assertions.iter().any(|a| compares_whole_value(a)) {
            return None;
        }
        let asserted: BTreeSet<String> = assertions.iter().flat_map(|a| members(a)).collect();
        let (covered, missing): (Vec<&FieldModel>, Vec<&FieldModel>) =
            fields.iter().copied().partition(|f| field_matches(f, &asserted));
        if covered.is_empty() || missing.is_empty() {
            return None;
        }
        let mut missing: Vec<String> = missing.iter().map(|f| f.name.clone()).collect();
        missing.sort();

        Some(
            violation(
                self,
                config,
                file,
                cases[0].start_line,
                format!(
                    "Return type {type_name} has {} fields but test only asserts {}, missing: {}",
                    fields.len(),
                    covered.len(),
                    missing.join(",")
                ),
            )
            .with_suggested_fix("Add assertions for the currently unverified return fields.")
            .with_metadata("function", target.to_string())
            .with_metadata("missing", missing),
        )
    }
}

impl Rule for ReturnTypeVerified {
    fn id(&self) -> &'static str {
        "TQ-return-type-verified"
    }

    fn category(&self) -> &'static str {
        "tq"
    }

    fn description(&self) -> &'static str {
        "Ensure tests assert all important return fields"
    }

    fn why(&self) -> &'static str {
        "Partial assertions allow silent contract drift in returned objects."
    }

    fn needs_project_context(&self) -> bool {
        true
    }

    fn check(
        &self,
        file: &UnifiedFileModel,
        context: Option<&ProjectContext>,
        config: &RuleConfig,
    ) -> Vec<Violation> {
        let Some(context) = context else {
            return Vec::new();
        };
        let mut by_target: BTreeMap<&str, Vec<&TestCase>> = BTreeMap::new();
        for case in &file.test_cases {
            if let Some(target) = case.target_function.as_deref() {
                by_target.entry(target).or_default().push(case);
            }
        }
        by_target
            .into_iter()
            .filter_map(|(target, cases)| self.check_target(file, context, config, target, &cases))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::arch::test_support::context;

    const GO_SOURCE: &str = "package billing\n\ntype Invoice struct {\n\tID       string\n\tTotal    int\n\tCurrency string\n\tStatus   string\n}\n\nfunc Create(amount int) (*Invoice, error) {\n\treturn &Invoice{Total: amount}, nil\n}\n";

    fn check(ctx: &ProjectContext, path: &str, config: &RuleConfig) -> Vec<Violation> {
        ReturnTypeVerified.check(ctx.file(path).unwrap(), Some(ctx), config)
    }

    #[test]
    fn test_partial_field_assertions() {
        let tests = "package billing\n\nfunc TestCreate(t *testing.T) {\n\tgot, err := Create(10)\n\trequire.NoError(t, err)\n\tassert.Equal(t, 10, got.Total)\n\tassert.Equal(t, \"EUR\", got.Currency)\n}\n";
        let ctx = context(&[("billing/invoice.go", GO_SOURCE), ("billing/invoice_test.go", tests)]);
        let violations = check(&ctx, "billing/invoice_test.go", &RuleConfig::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].start_line, 3);
        assert_eq!(
            violations[0].message,
            "Return type Invoice has 4 fields but test only asserts 2, missing: ID,Status"
        );

        let ignoring = RuleConfig::default().with_option("ignoreFields", serde_json::json!(["ID", "Status"]));
        assert!(check(&ctx, "billing/invoice_test.go", &ignoring).is_empty());
    }

    #[test]
    fn test_whole_value_comparison_passes() {
        let tests = "package billing\n\nfunc TestCreate(t *testing.T) {\n\tgot, _ := Create(10)\n\tassert.Equal(t, 10, got.Total)\n\tassert.Equal(t, want, got)\n}\n";
        let ctx = context(&[("billing/invoice.go", GO_SOURCE), ("billing/invoice_test.go", tests)]);
        assert!(check(&ctx, "billing/invoice_test.go", &RuleConfig::default()).is_empty());
    }

    #[test]
    fn test_typescript_promise_return() {
        let source = "export interface UserDTO {\n  id: string;\n  name: string;\n  email: string;\n}\n\nexport async function loadUser(id: string): Promise<UserDTO> {\n  return api.get(id);\n}\n";
        let partial = "describe('loadUser', () => {\n  it('loads the name', async () => {\n    const user = await loadUser('u1');\n    expect(user.name).toBe('ada');\n  });\n});\n";
        let ctx = context(&[("src/users.ts", source), ("src/users.test.ts", partial)]);
        let violations = check(&ctx, "src/users.test.ts", &RuleConfig::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "Return type UserDTO has 3 fields but test only asserts 1, missing: email,id"
        );

        let existence_only = "describe('loadUser', () => {\n  it('loads', async () => {\n    expect(await loadUser('u1')).toBeDefined();\n  });\n});\n";
        let ctx = context(&[("src/users.ts", source), ("src/users.test.ts", existence_only)]);
        assert!(check(&ctx, "src/users.test.ts", &RuleConfig::default()).is_empty());
    }

    #[test]
    fn test_unwrap_type_and_members() {
        assert_eq!(unwrap_type("*Invoice"), Some("Invoice"));
        assert_eq!(unwrap_type("Promise<UserDTO>"), Some("UserDTO"));
        assert_eq!(unwrap_type("Optional[\"Invoice\"]"), Some("Invoice"));
        assert_eq!(unwrap_type("[]*billing.Invoice"), Some("Invoice"));
        assert_eq!(unwrap_type("UserDTO | null"), Some("UserDTO"));
        assert_eq!(unwrap_type("List<Invoice>"), Some("List"));
        assert_eq!(unwrap_type("error"), None);
        assert_eq!(returned_type(&["error".to_string()]), None);

        let getter = Assertion {
            kind: "assertEquals".to_string(),
            subject: "invoice.getTotal()".to_string(),
            expected: Some("5".to_string()),
            start_line: 1,
        };
        assert_eq!(members(&getter), vec!["total".to_string()]);
        assert!(!compares_whole_value(&getter));
    }
}
