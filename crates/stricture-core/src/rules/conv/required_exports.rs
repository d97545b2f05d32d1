use std::collections::BTreeSet;

use globset::{GlobBuilder, GlobMatcher};
use serde_json::Value;
use tracing::warn;

use crate::adapter::lexical::base_name;
use crate::context::ProjectContext;
use crate::models::{UnifiedFileModel, Violation};
use crate::rules::options::value_as_str_list;
use crate::rules::{violation, Rule, RuleConfig};

/// `*` and `?` stay inside one path segment, like shell globs.
fn matcher(pattern: &str) -> Option<GlobMatcher> {
    match GlobBuilder::new(pattern).literal_separator(true).build() {
        Ok(glob) => Some(glob.compile_matcher()),
        Err(err) => {
            warn!(pattern, error = %err, "Invalid required-exports pattern");
            None
        }
    }
}

struct RequiredPattern {
    matcher: GlobMatcher,
    required: Vec<String>,
}

/// `patterns: { <path glob>: { required: [names] } }`, sorted by glob.
fn required_patterns(config: &RuleConfig) -> Vec<RequiredPattern> {
    let Some(patterns) = config.options.get("patterns").and_then(Value::as_object) else {
        return Vec::new();
    };
    let mut keys: Vec<&String> = patterns.keys().collect();
    keys.sort();
    keys.into_iter()
        .filter_map(|pattern| {
            let required = patterns
                .get(pattern)?
                .get("required")
                .and_then(value_as_str_list)
                .filter(|r| !r.is_empty())?;
            Some(RequiredPattern {
                matcher: matcher(pattern)?,
                required,
            })
        })
        .collect()
}

fn satisfied(exports: &BTreeSet<&str>, required: &str) -> bool {
    if !required.contains('*') {
        return exports.contains(required);
    }
    matcher(required).is_some_and(|m| exports.iter().any(|name| m.is_match(name)))
}

/// `CONV-required-exports`: files matching a configured path glob export
/// every name listed for it. Names may use `*`.
pub struct RequiredExports;

impl Rule for RequiredExports {
    fn id(&self) -> &'static str {
        "CONV-required-exports"
    }

    fn category(&self) -> &'static str {
        "conv"
    }

    fn description(&self) -> &'static str {
        "Require configured exports for matching modules"
    }

    fn why(&self) -> &'static str {
        "Missing required exports break module contracts and cause integration failures."
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
        let path = file.path.trim_start_matches("./");
        let matched: Vec<RequiredPattern> = required_patterns(config)
            .into_iter()
            .filter(|p| p.matcher.is_match(path))
            .collect();
        if matched.is_empty() {
            return Vec::new();
        }

        let exports: BTreeSet<&str> = file
            .exports
            .iter()
            .map(|e| e.name.trim())
            .filter(|name| !name.is_empty())
            .collect();
        let module = base_name(path);
        matched
            .iter()
            .flat_map(|p| p.required.iter())
            .filter(|required| !satisfied(&exports, required))
            .map(|required| {
                violation(
                    self,
                    config,
                    file,
                    1,
                    format!(
                        "Module '{module}' missing required export '{required}', expected in configured modules"
                    ),
                )
                .with_suggested_fix(format!("Add export for '{required}' in {module}."))
            })
            .collect()
    }
}
