use crate::context::ProjectContext;
use crate::models::{UnifiedFileModel, Violation};
use crate::rules::options::{bool_option, usize_option};
use crate::rules::{violation, Rule, RuleConfig};

pub const DEFAULT_MAX_FILE_LINES: usize = 800;

/// `ARCH-max-file-lines`: option `max` (default 800); test files are exempt
/// unless `include_tests` is set.
pub struct MaxFileLines;

impl Rule for MaxFileLines {
    fn id(&self) -> &'static str {
        "ARCH-max-file-lines"
    }

    fn category(&self) -> &'static str {
        "arch"
    }

    fn description(&self) -> &'static str {
        "Keep file size within configured limits"
    }

    fn why(&self) -> &'static str {
        "Oversized files hide responsibilities and increase review risk."
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
        if file.is_test_file && !bool_option(config, "include_tests").unwrap_or(false) {
            return Vec::new();
        }
        let max = usize_option(config, "max")
            .filter(|m| *m > 0)
            .unwrap_or(DEFAULT_MAX_FILE_LINES);
        if file.line_count <= max {
            return Vec::new();
        }
        vec![violation(
            self,
            config,
            file,
            max + 1,
            format!(
                "File has {} lines, exceeds maximum configured {max}",
                file.line_count
            ),
        )
        .with_end_line(file.line_count)
        .with_suggested_fix("Split this file into smaller focused units below the configured maximum.")
        .with_metadata("lines", file.line_count)
        .with_metadata("max", max)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file_with_lines(path: &str, lines: usize, is_test: bool) -> UnifiedFileModel {
        let source = "x\n".repeat(lines.saturating_sub(1));
        UnifiedFileModel::new(path, "go", is_test, source.as_bytes())
    }

    #[test]
    fn test_default_limit() {
        let ok = file_with_lines("a.go", 800, false);
        assert_eq!(ok.line_count, 800);
        assert!(MaxFileLines.check(&ok, None, &RuleConfig::default()).is_empty());

        let long = file_with_lines("a.go", 801, false);
        let violations = MaxFileLines.check(&long, None, &RuleConfig::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].start_line, 801);
        assert_eq!(violations[0].message, "File has 801 lines, exceeds maximum configured 800");
    }

    #[test]
    fn test_configured_max_and_tests() {
        let config = RuleConfig::with_severity("warn").with_option("max", 10);
        let test_file = file_with_lines("a_test.go", 20, true);
        assert!(MaxFileLines.check(&test_file, None, &config).is_empty());

        let config = config.with_option("include_tests", true);
        let violations = MaxFileLines.check(&test_file, None, &config);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].severity, "warn");
        assert_eq!(violations[0].end_line, Some(20));
    }
}
