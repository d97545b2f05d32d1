use std::collections::BTreeMap;

use crate::context::ProjectContext;
use crate::models::{Assertion, ErrorExit, TestCase, UnifiedFileModel, Violation};
use crate::rules::{violation, Rule, RuleConfig};

use super::{name_words, resolve_target};

/// Test name words that announce a negative path.
const NEGATIVE_WORDS: &[&str] = &[
    "bad",
    "denied",
    "empty",
    "err",
    "error",
    "errors",
    "exception",
    "fail",
    "failed",
    "fails",
    "failure",
    "forbidden",
    "invalid",
    "malformed",
    "missing",
    "negative",
    "panic",
    "panics",
    "raise",
    "raises",
    "reject",
    "rejected",
    "rejects",
    "throw",
    "throws",
    "timeout",
    "unauthorized",
    "wrong",
];

/// Substrings of assertion kinds that check a failure was produced.
const ERROR_ASSERTION_MARKERS: &[&str] = &["error", "throw", "raise", "reject", "panic"];

fn asserts_failure(assertion: &Assertion) -> bool {
    let kind = assertion.kind.to_ascii_lowercase();
    // NoError, not.toThrow, assertDoesNotThrow
    if kind.starts_with("no") || kind.contains("not") {
        return false;
    }
    ERROR_ASSERTION_MARKERS.iter().any(|m| kind.contains(m))
}

fn exercises_error_path(case: &TestCase) -> bool {
    name_words(&case.name)
        .iter()
        .any(|w| NEGATIVE_WORDS.contains(&w.as_str()))
        || case.assertions.iter().any(asserts_failure)
}

fn describe_exit(exit: &ErrorExit) -> &str {
    exit.message
        .as_deref()
        .filter(|m| !m.trim().is_empty())
        .unwrap_or(&exit.kind)
}

/// `TQ-error-path-coverage`: a function with explicit error exits needs at
/// least one test that drives it into a failure.
///
/// Coverage is judged across every test file mapped to the function's
/// source; the report lands once, on the first of those files that targets
/// the function.
pub struct ErrorPathCoverage;

impl Rule for ErrorPathCoverage {
    fn id(&self) -> &'static str {
        "TQ-error-path-coverage"
    }

    fn category(&self) -> &'static str {
        "tq"
    }

    fn description(&self) -> &'static str {
        "Require tests for explicit error exits"
    }

    fn why(&self) -> &'static str {
        "Uncovered error paths are a common source of production outages."
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
        if !file.is_test_file {
            return Vec::new();
        }

        let mut by_target: BTreeMap<&str, Vec<&TestCase>> = BTreeMap::new();
        for case in &file.test_cases {
            if let Some(target) = case.target_function.as_deref() {
                by_target.entry(target).or_default().push(case);
            }
        }

        let mut violations = Vec::new();
        for (target, cases) in by_target {
            let Some((source, func)) = resolve_target(context, &file.path, target) else {
                continue;
            };
            let Some(exit) = func.error_exits.first() else {
                continue;
            };

            let targeting: Vec<&UnifiedFileModel> = context
                .tests_for_source(&source.path)
                .into_iter()
                .filter_map(|path| context.file(path))
                .filter(|test| {
                    test.test_cases
                        .iter()
                        .any(|c| c.target_function.as_deref() == Some(target))
                })
                .collect();
            let covered = targeting.iter().any(|test| {
                test.test_cases
                    .iter()
                    .filter(|c| c.target_function.as_deref() == Some(target))
                    .any(exercises_error_path)
            });
            if covered {
                continue;
            }
            if targeting.first().is_some_and(|owner| owner.path != file.path) {
                continue;
            }

            violations.push(
                violation(
                    self,
                    config,
                    file,
                    cases[0].start_line,
                    format!(
                        "Function '{target}' has error exit at line {} but no test covers this path: {}",
                        exit.start_line,
                        describe_exit(exit)
                    ),
                )
                .with_suggested_fix(
                    "Add a negative-path test that triggers and validates this error condition.",
                )
                .with_metadata("source", source.path.clone())
                .with_metadata("error_exits", func.error_exits.len()),
            );
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::arch::test_support::context;

    const SERVICE: &str = r#"package users

import "errors"

func Create(id string) error {
	if id == "" {
		return errors.New("Create: empty id")
	}
	return nil
}

func Rename(id string) string {
	return id
}
"#;

    fn check(ctx: &ProjectContext, path: &str) -> Vec<Violation> {
        ErrorPathCoverage.check(ctx.file(path).unwrap(), Some(ctx), &RuleConfig::default())
    }

    #[test]
    fn test_happy_path_only_is_reported() {
        let tests = "package users\n\nfunc TestCreate(t *testing.T) {\n\terr := Create(\"u1\")\n\tassert.Nil(t, err)\n}\n\nfunc TestRename(t *testing.T) {\n\tassert.Equal(t, \"a\", Rename(\"a\"))\n}\n";
        let ctx = context(&[("users/service.go", SERVICE), ("users/service_test.go", tests)]);
        let violations = check(&ctx, "users/service_test.go");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].start_line, 3);
        assert_eq!(
            violations[0].message,
            "Function 'Create' has error exit at line 7 but no test covers this path: Create: empty id"
        );
    }

    #[test]
    fn test_negative_name_or_error_assertion_covers() {
        let by_name = "package users\n\nfunc TestCreate(t *testing.T) {\n\tassert.Nil(t, Create(\"u1\"))\n}\n\nfunc TestCreate_EmptyID(t *testing.T) {\n\tCreate(\"\")\n}\n";
        let ctx = context(&[("users/service.go", SERVICE), ("users/service_test.go", by_name)]);
        assert!(check(&ctx, "users/service_test.go").is_empty());

        let by_assertion = "package users\n\nfunc TestCreate(t *testing.T) {\n\terr := Create(\"\")\n\tassert.EqualError(t, err, \"Create: empty id\")\n}\n";
        let ctx = context(&[("users/service.go", SERVICE), ("users/service_test.go", by_assertion)]);
        assert!(check(&ctx, "users/service_test.go").is_empty());

        let no_error = "package users\n\nfunc TestCreate(t *testing.T) {\n\tassert.NoError(t, Create(\"u1\"))\n}\n";
        let ctx = context(&[("users/service.go", SERVICE), ("users/service_test.go", no_error)]);
        assert_eq!(check(&ctx, "users/service_test.go").len(), 1);
    }

    #[test]
    fn test_typescript_throw_covered_by_to_throw() {
        let source = "export function parse(raw: string): number {\n  if (!raw) {\n    throw new Error('Parse: empty input');\n  }\n  return Number(raw);\n}\n";
        let happy = "describe('parse', () => {\n  it('reads numbers', () => {\n    expect(parse('1')).toBe(1);\n  });\n});\n";
        let ctx = context(&[("src/parse.ts", source), ("src/parse.test.ts", happy)]);
        let violations = check(&ctx, "src/parse.test.ts");
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].start_line, 2);
        assert!(violations[0].message.contains("error exit at line 3"));

        let negative = "describe('parse', () => {\n  it('reads numbers', () => {\n    expect(parse('1')).toBe(1);\n  });\n  it('guards input', () => {\n    expect(() => parse('')).toThrow('Parse: empty input');\n  });\n});\n";
        let ctx = context(&[("src/parse.ts", source), ("src/parse.test.ts", negative)]);
        assert!(check(&ctx, "src/parse.test.ts").is_empty());
    }

    #[test]
    fn test_untargeted_cases_and_missing_context() {
        let tests = "package users\n\nfunc TestSomethingElse(t *testing.T) {}\n";
        let ctx = context(&[("users/service.go", SERVICE), ("users/service_test.go", tests)]);
        assert!(check(&ctx, "users/service_test.go").is_empty());
        assert!(ErrorPathCoverage
            .check(ctx.file("users/service_test.go").unwrap(), None, &RuleConfig::default())
            .is_empty());
    }
}
