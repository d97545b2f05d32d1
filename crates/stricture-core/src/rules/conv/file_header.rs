use regex::Regex;

use crate::adapter::lexical::base_name;
use crate::context::ProjectContext;
use crate::models::{UnifiedFileModel, Violation};
use crate::rules::options::{str_list_option, str_option};
use crate::rules::{violation, Rule, RuleConfig, SEVERITY_OFF};

use super::language_family;

/// Accepted between the file name and the purpose when no `separators`
/// option is given: an em dash or a hyphen.
const DEFAULT_SEPARATORS: &[&str] = &["\u{2014}", "-"];

fn comment_prefix(language: &str) -> Option<&'static str> {
    match language {
        "go" | "typescript" | "javascript" | "java" => Some("//"),
        "python" => Some("#"),
        _ => None,
    }
}

/// First line that is neither blank nor a shebang.
fn first_meaningful_line(source: &str) -> (usize, &str) {
    source
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .find(|(_, line)| !line.is_empty() && !line.starts_with("#!"))
        .unwrap_or((1, ""))
}

/// `CONV-file-header`: every file opens with `<comment> <file name> - <purpose>`.
/// Off unless configured; `pattern` replaces the default shape with a regex
/// in which `{filename}` stands for the escaped file name.
pub struct FileHeader;

impl FileHeader {
    fn has_header(line: &str, prefix: &str, name: &str, config: &RuleConfig) -> bool {
        if let Some(pattern) = str_option(config, "pattern") {
            let expanded = pattern.replace("{filename}", &regex::escape(name));
            return match Regex::new(&expanded) {
                Ok(re) => re.is_match(line),
                Err(err) => {
                    tracing::warn!(pattern, error = %err, "Invalid file header pattern");
                    true
                }
            };
        }
        let separators = str_list_option(config, "separators")
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect());
        let Some(rest) = line
            .strip_prefix(prefix)
            .map(str::trim_start)
            .and_then(|rest| rest.strip_prefix(name))
        else {
            return false;
        };
        let rest = rest.trim_start();
        separators.iter().any(|sep| {
            rest.strip_prefix(sep.as_str())
                .is_some_and(|purpose| !purpose.trim().is_empty())
        })
    }
}

impl Rule for FileHeader {
    fn id(&self) -> &'static str {
        "CONV-file-header"
    }

    fn category(&self) -> &'static str {
        "conv"
    }

    fn description(&self) -> &'static str {
        "Require file header comments"
    }

    fn why(&self) -> &'static str {
        "File headers provide quick context about a file's purpose."
    }

    fn default_severity(&self) -> &'static str {
        SEVERITY_OFF
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
        let Some(prefix) = comment_prefix(&language_family(&file.language)) else {
            return Vec::new();
        };
        let name = base_name(&file.path);
        let source = file.source_text();
        let (line_no, first) = first_meaningful_line(&source);
        if Self::has_header(first, prefix, name, config) {
            return Vec::new();
        }
        vec![violation(
            self,
            config,
            file,
            line_no,
            format!("File missing header comment, expected format: '{prefix} {{filename}} - {{purpose}}'"),
        )
        .with_suggested_fix(format!(
            "Add header comment at line 1 with format: '{prefix} {name} - {{purpose}}'."
        ))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(path: &str, language: &str, src: &str, config: &RuleConfig) -> Vec<Violation> {
        let file = UnifiedFileModel::new(path, language, false, src.as_bytes());
        FileHeader.check(&file, None, config)
    }

    #[test]
    fn test_default_header_shapes() {
        let config = RuleConfig::with_severity("error");
        assert!(check("pkg/store.go", "go", "// store.go - persistence\npackage pkg\n", &config)
            .is_empty());
        assert!(check(
            "pkg/store.go",
            "go",
            "\n// store.go \u{2014} persistence\npackage pkg\n",
            &config
        )
        .is_empty());
        assert!(check(
            "app/jobs.py",
            "python",
            "#!/usr/bin/env python\n# jobs.py - background jobs\n",
            &config
        )
        .is_empty());

        let violations = check("src/cart.ts", "typescript", "// cart.ts\nexport {};\n", &config);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, "error");
        assert_eq!(
            violations[0].message,
            "File missing header comment, expected format: '// {filename} - {purpose}'"
        );
        assert_eq!(
            violations[0].context.as_ref().unwrap().suggested_fix.as_deref(),
            Some("Add header comment at line 1 with format: '// cart.ts - {purpose}'.")
        );
        assert_eq!(
            check("pkg/store.go", "go", "// other.go - x\n", &config).len(),
            1
        );
    }

    #[test]
    fn test_custom_pattern() {
        let config = RuleConfig::with_severity("warn")
            .with_option("pattern", r"^// Copyright \d{4} .* \({filename}\)$");
        assert!(check("src/cart.ts", "typescript", "// Copyright 2024 Acme (cart.ts)\n", &config)
            .is_empty());
        assert_eq!(check("src/cart.ts", "typescript", "// cart.ts - cart\n", &config).len(), 1);
    }

    #[test]
    fn test_off_by_default() {
        assert_eq!(FileHeader.default_severity(), SEVERITY_OFF);
        assert!(check("README.md", "markdown", "hello", &RuleConfig::default()).is_empty());
    }
}
