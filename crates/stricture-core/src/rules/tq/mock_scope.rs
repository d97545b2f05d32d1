use crate::context::ProjectContext;
use crate::models::{Mock, TestCase, UnifiedFileModel, Violation};
use crate::rules::conv::language_family;
use crate::rules::{violation, Rule, RuleConfig};

/// File-wide calls that undo spies and stubs in jest, vitest and sinon.
const SCRIPT_RESTORES: &[&str] = &[
    "mockRestore",
    "restoreAllMocks",
    "restoreMocks",
    ".restore()",
];

/// Calls that stop a patcher started with `.start()`.
const PATCH_STOPS: &[&str] = &[".stop()", "stopall()", "addCleanup("];

/// How a mock that outlives its statement gets cleaned up.
enum Cleanup {
    /// Anywhere in the file, e.g. an `afterEach` hook.
    InFile(&'static [&'static str]),
    /// Inside the test case that created it.
    InCase(&'static str),
}

/// Cleanup a mock needs, or `None` when its scope ends on its own.
fn required_cleanup(language: &str, mock: &Mock, line: &str) -> Option<Cleanup> {
    let line = line.trim();
    match (language, mock.kind.as_str()) {
        ("typescript" | "javascript", "spyOn" | "stub" | "spy") => {
            Some(Cleanup::InFile(SCRIPT_RESTORES))
        }
        ("python", kind) if kind.starts_with("patch") => {
            let scoped =
                line.starts_with('@') || line.starts_with("with ") || line.contains("mocker.");
            (!scoped).then_some(Cleanup::InFile(PATCH_STOPS))
        }
        ("go", "httptest") if mock.target == "Server" => Some(Cleanup::InCase(".Close()")),
        ("java", "mockStatic" | "mockConstruction") => {
            let scoped = line.starts_with("try (") || line.starts_with("try(");
            (!scoped).then_some(Cleanup::InCase(".close()"))
        }
        _ => None,
    }
}

/// `TQ-mock-scope`: mocks that patch shared state are undone before the
/// next test runs.
pub struct MockScope;

impl MockScope {
    fn check_case(
        &self,
        file: &UnifiedFileModel,
        lines: &[&str],
        source: &str,
        case: &TestCase,
        config: &RuleConfig,
    ) -> Vec<Violation> {
        let language = language_family(&file.language);
        let case_body = lines
            .get(case.start_line.saturating_sub(1)..case.end_line.min(lines.len()))
            .unwrap_or(&[])
            .join("\n");

        case.mocks
            .iter()
            .filter(|mock| {
                let line = lines.get(mock.start_line.saturating_sub(1)).copied().unwrap_or("");
                match required_cleanup(&language, mock, line) {
                    None => false,
                    Some(Cleanup::InFile(calls)) => !calls.iter().any(|c| source.contains(c)),
                    Some(Cleanup::InCase(call)) => !case_body.contains(call),
                }
            })
            .map(|mock| {
                violation(
                    self,
                    config,
                    file,
                    mock.start_line,
                    format!(
                        "Mock {} created by {} in test '{}' is not cleaned up, causing test pollution",
                        mock.target, mock.kind, case.name
                    ),
                )
                .with_suggested_fix("Limit mock scope to each test and reset in cleanup hooks.")
                .with_metadata("kind", mock.kind.clone())
            })
            .collect()
    }
}

impl Rule for MockScope {
    fn id(&self) -> &'static str {
        "TQ-mock-scope"
    }

    fn category(&self) -> &'static str {
        "tq"
    }

    fn description(&self) -> &'static str {
        "Ensure mocks are scoped and cleaned up per test"
    }

    fn why(&self) -> &'static str {
        "Leaky mocks create flaky suites and hidden coupling across tests."
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
        if file.test_cases.iter().all(|c| c.mocks.is_empty()) {
            return Vec::new();
        }
        let source = file.source_text();
        let lines: Vec<&str> = source.lines().collect();
        file.test_cases
            .iter()
            .flat_map(|case| self.check_case(file, &lines, &source, case, config))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterConfig, AdapterRegistry};

    fn check(path: &str, src: &str) -> Vec<Violation> {
        let file = AdapterRegistry::with_defaults()
            .parse(path, src.as_bytes(), &AdapterConfig::default())
            .unwrap();
        MockScope.check(&file, None, &RuleConfig::default())
    }

    #[test]
    fn test_typescript_spy_needs_restore() {
        let leaky = "describe('clock', () => {\n  it('freezes time', () => {\n    jest.spyOn(Date, 'now');\n    jest.fn();\n    expect(now()).toBe(1);\n  });\n});\n";
        let violations = check("src/clock.test.ts", leaky);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].start_line, 3);
        assert_eq!(
            violations[0].message,
            "Mock Date created by spyOn in test 'freezes time' is not cleaned up, causing test pollution"
        );

        let restored = format!("afterEach(() => jest.restoreAllMocks());\n{leaky}");
        assert!(check("src/clock.test.ts", &restored).is_empty());
    }

    #[test]
    fn test_python_started_patch_needs_stop() {
        let src = "def test_charge():\n    patcher = patch('billing.gateway')\n    gateway = patcher.start()\n    assert charge(1) == 2\n\n\ndef test_refund():\n    with patch('billing.gateway'):\n        assert refund(1) == 0\n";
        let violations = check("tests/test_billing.py", src);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].start_line, 2);
        assert!(violations[0].message.starts_with("Mock billing.gateway created by patch"));

        let stopped = src.replace(
            "    assert charge(1) == 2\n",
            "    assert charge(1) == 2\n    patcher.stop()\n",
        );
        assert!(check("tests/test_billing.py", &stopped).is_empty());
    }

    #[test]
    fn test_go_server_must_close() {
        let src = "package api\n\nfunc TestFetch(t *testing.T) {\n\tsrv := httptest.NewServer(handler)\n\trec := httptest.NewRecorder()\n\tassert.Equal(t, 200, fetch(srv.URL, rec))\n}\n\nfunc TestList(t *testing.T) {\n\tsrv := httptest.NewServer(handler)\n\tdefer srv.Close()\n\tassert.Equal(t, 200, list(srv.URL))\n}\n";
        let violations = check("api/client_test.go", src);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].start_line, 4);
        assert!(violations[0].message.contains("in test 'TestFetch'"));
    }

    #[test]
    fn test_java_static_mock_outside_try() {
        let src = "package com.acme;\n\nclass ClockTest {\n    @Test\n    void leaks() {\n        MockedStatic<Clock> clock = mockStatic(Clock.class);\n        assertEquals(1, now());\n    }\n\n    @Test\n    void scoped() {\n        try (MockedStatic<Clock> clock = mockStatic(Clock.class)) {\n            assertEquals(1, now());\n        }\n    }\n}\n";
        let violations = check("src/test/java/com/acme/ClockTest.java", src);
        let lines: Vec<usize> = violations.iter().map(|v| v.start_line).collect();
        assert_eq!(lines, vec![6]);
    }
}
