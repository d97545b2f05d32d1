//! Inline suppression directives.
//!
//! ```text
//! // stricture-disable-file [IDs]
//! // stricture-disable-next-line [IDs]
//! // stricture-disable [IDs]   ...   // stricture-enable [IDs]
//! ```
//!
//! IDs are comma or space separated and an optional `:` may follow the
//! directive. No IDs means every rule. Anything after `--` is a reason.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::models::Violation;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DirectiveKind {
    DisableFile,
    DisableNextLine,
    Disable,
    Enable,
}

/// Longest prefix first so `disable` never shadows the others.
const DIRECTIVES: &[(&str, DirectiveKind)] = &[
    ("stricture-disable-next-line", DirectiveKind::DisableNextLine),
    ("stricture-disable-file", DirectiveKind::DisableFile),
    ("stricture-disable", DirectiveKind::Disable),
    ("stricture-enable", DirectiveKind::Enable),
];

#[derive(Debug, PartialEq, Eq)]
struct Directive {
    kind: DirectiveKind,
    /// Empty means all rules.
    rule_ids: Vec<String>,
}

fn parse_directive(line: &str) -> Option<Directive> {
    let idx = line.find("stricture-")?;
    let fragment = line[idx..].trim();
    let (prefix, kind) = DIRECTIVES
        .iter()
        .find(|(prefix, _)| fragment.starts_with(prefix))?;

    let mut remainder = fragment[prefix.len()..].trim();
    remainder = remainder.strip_prefix(':').unwrap_or(remainder).trim();
    if let Some(reason) = remainder.find("--") {
        remainder = remainder[..reason].trim();
    }
    let rule_ids = remainder
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    Some(Directive {
        kind: *kind,
        rule_ids,
    })
}

/// Per-file suppression state, queried by (rule, line).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SuppressionPolicy {
    file_all: bool,
    file_rules: BTreeSet<String>,
    line_all: BTreeSet<usize>,
    line_rules: BTreeMap<usize, BTreeSet<String>>,
}

impl SuppressionPolicy {
    /// Scan `source` for directives.
    pub fn compile(source: &str) -> Self {
        let mut policy = Self::default();
        let mut active_all = false;
        let mut active_rules: BTreeSet<String> = BTreeSet::new();

        for (idx, line) in source.split('\n').enumerate() {
            let line_no = idx + 1;
            if active_all {
                policy.line_all.insert(line_no);
            }
            for rule_id in &active_rules {
                policy.add_line_rule(line_no, rule_id);
            }

            let Some(directive) = parse_directive(line) else {
                continue;
            };
            let all = directive.rule_ids.is_empty();
            match directive.kind {
                DirectiveKind::DisableFile if all => policy.file_all = true,
                DirectiveKind::DisableFile => policy.file_rules.extend(directive.rule_ids),
                DirectiveKind::DisableNextLine if all => {
                    policy.line_all.insert(line_no + 1);
                }
                DirectiveKind::DisableNextLine => {
                    for rule_id in &directive.rule_ids {
                        policy.add_line_rule(line_no + 1, rule_id);
                    }
                }
                DirectiveKind::Disable if all => active_all = true,
                DirectiveKind::Disable => active_rules.extend(directive.rule_ids),
                DirectiveKind::Enable if all => {
                    active_all = false;
                    active_rules.clear();
                }
                DirectiveKind::Enable => {
                    for rule_id in &directive.rule_ids {
                        active_rules.remove(rule_id);
                    }
                }
            }
        }
        policy
    }

    fn add_line_rule(&mut self, line: usize, rule_id: &str) {
        self.line_rules
            .entry(line)
            .or_default()
            .insert(rule_id.to_string());
    }

    pub fn is_empty(&self) -> bool {
        !self.file_all
            && self.file_rules.is_empty()
            && self.line_all.is_empty()
            && self.line_rules.is_empty()
    }

    pub fn is_suppressed(&self, rule_id: &str, line: usize) -> bool {
        self.file_all
            || self.file_rules.contains(rule_id)
            || self.line_all.contains(&line)
            || self
                .line_rules
                .get(&line)
                .is_some_and(|rules| rules.contains(rule_id))
    }
}

/// Drop violations suppressed by their file's policy. Files without a
/// policy entry keep all their violations.
pub fn apply_suppressions(
    violations: Vec<Violation>,
    policies: &HashMap<String, SuppressionPolicy>,
) -> (Vec<Violation>, usize) {
    let before = violations.len();
    let kept: Vec<Violation> = violations
        .into_iter()
        .filter(|v| {
            !policies
                .get(&v.file_path)
                .is_some_and(|p| p.is_suppressed(&v.rule_id, v.start_line))
        })
        .collect();
    let suppressed = before - kept.len();
    (kept, suppressed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_directive_forms() {
        assert_eq!(parse_directive("let x = 1;"), None);
        assert_eq!(parse_directive("// stricture-unknown"), None);

        let d = parse_directive("// stricture-disable-next-line: CONV-file-naming, TQ-no-shallow-assertions -- legacy").unwrap();
        assert_eq!(d.kind, DirectiveKind::DisableNextLine);
        assert_eq!(d.rule_ids, vec!["CONV-file-naming", "TQ-no-shallow-assertions"]);

        let d = parse_directive("# stricture-disable -- generated").unwrap();
        assert_eq!(d.kind, DirectiveKind::Disable);
        assert!(d.rule_ids.is_empty());

        let d = parse_directive("/* stricture-disable-file ARCH-max-file-lines */").unwrap();
        assert_eq!(d.kind, DirectiveKind::DisableFile);
        assert_eq!(d.rule_ids, vec!["ARCH-max-file-lines", "*/"]);
    }

    #[test]
    fn test_disable_next_line_specific_rule() {
        let policy = SuppressionPolicy::compile("// stricture-disable-next-line CONV-file-naming\nx\n");
        assert!(policy.is_suppressed("CONV-file-naming", 2));
        assert!(!policy.is_suppressed("CONV-file-naming", 3));
        assert!(!policy.is_suppressed("ARCH-max-file-lines", 2));
    }

    #[test]
    fn test_disable_next_line_all_rules() {
        let policy = SuppressionPolicy::compile("// stricture-disable-next-line\nx\n");
        assert!(policy.is_suppressed("CONV-file-naming", 2));
        assert!(policy.is_suppressed("TQ-no-shallow-assertions", 2));
        assert!(!policy.is_suppressed("TQ-no-shallow-assertions", 1));
    }

    #[test]
    fn test_disable_enable_block() {
        let src = "// stricture-disable TQ-no-shallow-assertions\nline1\n// stricture-enable TQ-no-shallow-assertions\nline2\n";
        let policy = SuppressionPolicy::compile(src);
        assert!(!policy.is_suppressed("TQ-no-shallow-assertions", 1));
        assert!(policy.is_suppressed("TQ-no-shallow-assertions", 2));
        assert!(!policy.is_suppressed("TQ-no-shallow-assertions", 4));
        assert!(!policy.is_suppressed("CONV-file-naming", 2));
    }

    #[test]
    fn test_disable_all_until_enable_all() {
        let src = "a\n// stricture-disable\nb\nc\n// stricture-enable\nd\n";
        let policy = SuppressionPolicy::compile(src);
        assert!(policy.is_suppressed("ARCH-import-boundary", 3));
        assert!(policy.is_suppressed("CONV-file-naming", 4));
        assert!(!policy.is_suppressed("CONV-file-naming", 6));
    }

    #[test]
    fn test_disable_file() {
        let all = SuppressionPolicy::compile("// stricture-disable-file\nx\n");
        assert!(all.is_suppressed("CONV-file-naming", 1));
        assert!(all.is_suppressed("ARCH-import-boundary", 10));

        let one = SuppressionPolicy::compile("x\n// stricture-disable-file CTR-manifest-conformance\n");
        assert!(one.is_suppressed("CTR-manifest-conformance", 1));
        assert!(!one.is_suppressed("CTR-json-tag-match", 1));
        assert!(SuppressionPolicy::compile("plain\n").is_empty());
    }

    #[test]
    fn test_apply_suppressions() {
        let mut policies = HashMap::new();
        policies.insert(
            "a.go".to_string(),
            SuppressionPolicy::compile("// stricture-disable-next-line R1\nx\n"),
        );
        let violations = vec![
            Violation::new("R1", "error", "a.go", 2, "suppressed"),
            Violation::new("R2", "error", "a.go", 2, "kept"),
            Violation::new("R1", "error", "b.go", 2, "other file"),
        ];
        let (kept, suppressed) = apply_suppressions(violations, &policies);
        assert_eq!(suppressed, 1);
        let messages: Vec<&str> = kept.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(messages, vec!["kept", "other file"]);
    }
}
