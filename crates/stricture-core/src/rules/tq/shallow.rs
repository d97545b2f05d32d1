use crate::context::ProjectContext;
use crate::models::{Assertion, TestCase, UnifiedFileModel, Violation};
use crate::rules::{violation, Rule, RuleConfig};

/// Assertion kinds that only prove a value exists.
const SHALLOW_KINDS: &[&str] = &[
    // go
    "NotNil",
    "NotEmpty",
    "NotZero",
    "nil_check",
    // typescript / javascript
    "toBeDefined",
    "toBeTruthy",
    "not.toBeNull",
    "not.toBeUndefined",
    "not.toBeFalsy",
    "assert",
    "assert.ok",
    "assert.exists",
    // python and java
    "assertTrue",
    // python
    "truthy",
    "is_not_none",
    "assertIsNotNone",
    // java
    "assertNotNull",
    "assertThat.isNotNull",
    "assertThat.isNotEmpty",
];

fn is_shallow(assertion: &Assertion) -> bool {
    SHALLOW_KINDS.contains(&assertion.kind.as_str())
}

/// How the assertion reads in source, e.g. `assert.NotNil` for testify.
fn display_kind(language: &str, kind: &str) -> String {
    if language == "go" && kind.starts_with(|c: char| c.is_ascii_uppercase()) {
        format!("assert.{kind}")
    } else {
        kind.to_string()
    }
}

fn value_assertion(language: &str) -> &'static str {
    match language {
        "go" => "assert.Equal",
        "typescript" | "javascript" => "toEqual",
        "python" => "assert ==",
        "java" => "assertEquals",
        _ => "an equality assertion",
    }
}

/// `TQ-no-shallow-assertions`: every test case must verify at least one
/// concrete value.
pub struct NoShallowAssertions;

impl NoShallowAssertions {
    fn check_case(
        &self,
        file: &UnifiedFileModel,
        case: &TestCase,
        config: &RuleConfig,
    ) -> Option<Violation> {
        let fix = "Assert concrete expected values, not only that an object exists.";
        if case.assertions.is_empty() {
            return Some(
                violation(
                    self,
                    config,
                    file,
                    case.start_line,
                    format!("Test case '{}' has no assertions", case.name),
                )
                .with_end_line(case.end_line)
                .with_suggested_fix(fix),
            );
        }
        if !case.assertions.iter().all(is_shallow) {
            return None;
        }
        let first = &case.assertions[0];
        Some(
            violation(
                self,
                config,
                file,
                first.start_line,
                format!(
                    "Shallow assertion {} only checks existence, replace with {} to verify value",
                    display_kind(&file.language, &first.kind),
                    value_assertion(&file.language)
                ),
            )
            .with_suggested_fix(fix)
            .with_metadata("test", case.name.clone())
            .with_metadata("subject", first.subject.clone()),
        )
    }
}

impl Rule for NoShallowAssertions {
    fn id(&self) -> &'static str {
        "TQ-no-shallow-assertions"
    }

    fn category(&self) -> &'static str {
        "tq"
    }

    fn description(&self) -> &'static str {
        "Reject assertions that only check existence"
    }

    fn why(&self) -> &'static str {
        "Shallow assertions hide regressions because they never verify actual values."
    }

    fn needs_project_context(&self) -> bool {
        false
    }

    fn check(
        &self,
        file: &UnifiedFileModel,
        _context: Option<&ProjectContext>,
        config: &RuleConfig,
    ) -> Vec<Violation> {
        file.test_cases
            .iter()
            .filter_map(|case| self.check_case(file, case, config))
            .collect()
    }
}
