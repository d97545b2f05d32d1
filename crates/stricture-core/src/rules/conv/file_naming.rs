use crate::adapter::lexical::base_name;
use crate::context::ProjectContext;
use crate::models::{UnifiedFileModel, Violation};
use crate::rules::options::str_option;
use crate::rules::{violation, Rule, RuleConfig};

use super::{convert_to_style, style_pattern, STYLE_KEBAB, STYLE_PASCAL, STYLE_SNAKE};

/// Compound extensions kept intact; longer suffixes first.
const MULTI_EXTENSIONS: &[&str] = &[
    ".test.tsx",
    ".test.ts",
    ".test.jsx",
    ".test.js",
    ".spec.tsx",
    ".spec.ts",
    ".spec.jsx",
    ".spec.js",
    ".d.tsx",
    ".d.ts",
    ".test.go",
    ".spec.go",
    ".test.py",
    ".spec.py",
];

/// Names that are fixed by their toolchain.
const RESERVED_STEMS: &[&str] = &["__init__", "__main__", "package-info", "module-info"];

fn default_style(language: &str) -> Option<&'static str> {
    match language.to_ascii_lowercase().as_str() {
        "go" | "golang" | "python" => Some(STYLE_SNAKE),
        "typescript" | "javascript" | "tsx" | "jsx" => Some(STYLE_KEBAB),
        "java" | "kotlin" => Some(STYLE_PASCAL),
        _ => None,
    }
}

/// Split a file name into stem and (possibly compound) extension.
fn split_file_name(name: &str) -> (&str, &str) {
    if let Some(ext) = MULTI_EXTENSIONS.iter().find(|ext| name.ends_with(*ext)) {
        return (&name[..name.len() - ext.len()], &name[name.len() - ext.len()..]);
    }
    match name.rfind('.') {
        Some(idx) if idx > 0 => (&name[..idx], &name[idx..]),
        _ => (name, ""),
    }
}

/// `CONV-file-naming`: file names follow the language convention or the
/// configured `style`.
pub struct FileNaming;

impl Rule for FileNaming {
    fn id(&self) -> &'static str {
        "CONV-file-naming"
    }

    fn category(&self) -> &'static str {
        "conv"
    }

    fn description(&self) -> &'static str {
        "Enforce file naming convention"
    }

    fn why(&self) -> &'static str {
        "Inconsistent naming makes files hard to find and breaks tooling assumptions."
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
        let Some(style) = str_option(config, "style").or_else(|| default_style(&file.language))
        else {
            return Vec::new();
        };
        let Some(pattern) = style_pattern(style) else {
            return Vec::new();
        };
        let name = base_name(&file.path);
        let (stem, ext) = split_file_name(name);
        if stem.is_empty() || RESERVED_STEMS.contains(&stem) || pattern.is_match(stem) {
            return Vec::new();
        }
        let suggested = format!("{}{ext}", convert_to_style(stem, style));
        vec![violation(
            self,
            config,
            file,
            1,
            format!("File name '{name}' does not match convention '{style}', should be '{suggested}'"),
        )
        .with_suggested_fix(format!("Rename to '{suggested}' using {style}."))
        .with_metadata("suggested", suggested)]
    }
}
