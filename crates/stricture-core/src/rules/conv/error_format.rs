use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::adapter::lexical::base_name;
use crate::context::ProjectContext;
use crate::models::{UnifiedFileModel, Violation};
use crate::rules::options::{str_list_option, usize_option};
use crate::rules::{violation, Rule, RuleConfig};

static GO_ERRORF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"fmt\.Errorf\(\s*("(?:\\.|[^"\\])*"|`[^`]*`)\s*[,)]"#).unwrap()
});
static GO_ERRORS_NEW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"errors\.New\(\s*("(?:\\.|[^"\\])*"|`[^`]*`)\s*\)"#).unwrap()
});
static NEW_ERROR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"new\s+([A-Za-z_][A-Za-z0-9_]*)\s*\(\s*("(?:\\.|[^"\\])*"|'(?:\\.|[^'\\])*'|`[^`]*`)\s*\)"#,
    )
    .unwrap()
});
static OPERATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[A-Za-z][A-Za-z0-9]*|[A-Z][A-Z0-9_]*)$").unwrap());

const TARGET_ERRORF: &str = "fmt.Errorf";
const TARGET_ERRORS_NEW: &str = "errors.New";
const TARGET_NEW_ERROR: &str = "new Error";
const TARGET_CUSTOM_ERROR: &str = "throw new .*Error";
const DEFAULT_TARGETS: &[&str] = &[
    TARGET_ERRORF,
    TARGET_ERRORS_NEW,
    TARGET_NEW_ERROR,
    TARGET_CUSTOM_ERROR,
];

/// Runtime error types whose messages are not ours to format.
const BUILTIN_ERRORS: &[&str] = &[
    "TypeError",
    "RangeError",
    "ReferenceError",
    "SyntaxError",
    "EvalError",
    "URIError",
    "AggregateError",
];

const DEFAULT_MIN_SEGMENTS: usize = 2;

/// Message text of a quoted literal and whether it is a template.
fn literal_message(literal: &str) -> (&str, bool) {
    let bytes = literal.as_bytes();
    if bytes.len() < 2 || bytes[0] != bytes[bytes.len() - 1] {
        return (literal, false);
    }
    match bytes[0] {
        b'`' => (&literal[1..literal.len() - 1], true),
        b'"' | b'\'' => (&literal[1..literal.len() - 1], false),
        _ => (literal, false),
    }
}

/// `OPERATION: ROOT_CAUSE[. RECOVERY_ACTION]` with at least `min_segments`
/// parts. Templates containing `:` are accepted as-is.
fn is_structured(message: &str, min_segments: usize, is_template: bool) -> bool {
    let trimmed = message.trim();
    if trimmed.is_empty() {
        return false;
    }
    if is_template && trimmed.contains(':') {
        return true;
    }
    let Some((operation, body)) = trimmed.split_once(':') else {
        return false;
    };
    let operation = operation.trim();
    let body = body.trim();
    if !OPERATION_RE.is_match(operation) || body.is_empty() {
        return false;
    }
    let (root, recovery) = match body.split_once('.') {
        Some((root, recovery)) => (root.trim(), recovery.trim()),
        None => (body, ""),
    };
    if root.is_empty() {
        return false;
    }
    let segments = if recovery.is_empty() { 2 } else { 3 };
    segments >= min_segments
}

fn checks_error_type(error_type: &str, targets: &[String]) -> bool {
    let enabled = |t: &str| targets.iter().any(|x| x == t);
    if BUILTIN_ERRORS.contains(&error_type) {
        false
    } else if error_type == "Error" {
        enabled(TARGET_NEW_ERROR)
    } else {
        error_type.ends_with("Error") && enabled(TARGET_CUSTOM_ERROR)
    }
}

/// `Operation: describe root cause. Describe recovery action.` with the
/// operation derived from the file stem.
fn suggested_message(path: &str) -> String {
    let name = base_name(path);
    let stem = name.split_once('.').map_or(name, |(stem, _)| stem);
    let operation: String = stem
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let lower = part.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    let operation = if operation.is_empty() {
        "Operation".to_string()
    } else {
        operation
    };
    format!("{operation}: describe root cause. Describe recovery action.")
}

/// `CONV-error-format`: error messages built at error exits read
/// `{OPERATION}: {ROOT_CAUSE}. {RECOVERY_ACTION}`.
pub struct ErrorFormat;

impl ErrorFormat {
    /// Messages on one source line that fail the format.
    fn bad_messages<'a>(
        line: &'a str,
        language: &str,
        targets: &[String],
        min_segments: usize,
    ) -> Vec<&'a str> {
        let enabled = |t: &str| targets.iter().any(|x| x == t);
        let mut literals: Vec<&str> = Vec::new();
        if language == "go" {
            if enabled(TARGET_ERRORF) {
                literals.extend(
                    GO_ERRORF_RE
                        .captures_iter(line)
                        .filter_map(|c| c.get(1))
                        .map(|m| m.as_str()),
                );
            }
            if enabled(TARGET_ERRORS_NEW) {
                literals.extend(
                    GO_ERRORS_NEW_RE
                        .captures_iter(line)
                        .filter_map(|c| c.get(1))
                        .map(|m| m.as_str()),
                );
            }
        }
        for caps in NEW_ERROR_RE.captures_iter(line) {
            if let (Some(ty), Some(literal)) = (caps.get(1), caps.get(2)) {
                if checks_error_type(ty.as_str(), targets) {
                    literals.push(literal.as_str());
                }
            }
        }
        literals
            .into_iter()
            .map(literal_message)
            .filter(|(message, is_template)| !is_structured(message, min_segments, *is_template))
            .map(|(message, _)| message)
            .collect()
    }
}

impl Rule for ErrorFormat {
    fn id(&self) -> &'static str {
        "CONV-error-format"
    }

    fn category(&self) -> &'static str {
        "conv"
    }

    fn description(&self) -> &'static str {
        "Enforce consistent error message format"
    }

    fn why(&self) -> &'static str {
        "Consistent error format makes logs searchable and tells users how to recover."
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
        let exit_lines: BTreeSet<usize> = file
            .all_functions()
            .flat_map(|f| f.error_exits.iter().map(|e| e.start_line))
            .collect();
        if exit_lines.is_empty() {
            return Vec::new();
        }

        let min_segments = usize_option(config, "minSegments")
            .filter(|n| (2..=3).contains(n))
            .unwrap_or(DEFAULT_MIN_SEGMENTS);
        let targets = str_list_option(config, "applyTo")
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect());
        let language = super::language_family(&file.language);
        let source = file.source_text();
        let lines: Vec<&str> = source.lines().collect();
        let suggested = suggested_message(&file.path);

        let mut violations = Vec::new();
        for line_no in exit_lines {
            let Some(line) = lines.get(line_no.saturating_sub(1)) else {
                continue;
            };
            for message in Self::bad_messages(line, &language, &targets, min_segments) {
                violations.push(
                    violation(
                        self,
                        config,
                        file,
                        line_no,
                        format!(
                            "Error message '{message}' does not follow format: {{OPERATION}}: {{ROOT_CAUSE}}. {{RECOVERY_ACTION}}"
                        ),
                    )
                    .with_suggested_fix(format!("Rewrite as: '{suggested}'.")),
                );
            }
        }
        violations
    }
}
