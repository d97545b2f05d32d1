//! Rule contract, per-rule configuration and the rule registry.
//!
//! Rules are grouped in four families: `arch` (architecture), `conv`
//! (conventions), `tq` (test quality) and `ctr` (cross-language contracts).
//! Every rule is a pure function of the file model, the optional project
//! context and its [`RuleConfig`].

pub mod arch;
pub mod conv;
pub mod ctr;
pub mod options;
pub mod tq;

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::context::ProjectContext;
use crate::errors::{StrictureError, StrictureResult};
use crate::models::{UnifiedFileModel, Violation};

pub const SEVERITY_ERROR: &str = "error";
pub const SEVERITY_WARN: &str = "warn";
pub const SEVERITY_OFF: &str = "off";

/// A lint rule.
///
/// `check` must not mutate anything and has no error channel: a rule that
/// cannot evaluate returns no violations. When `needs_project_context` is
/// false the caller may pass `None` for the context.
pub trait Rule: Send + Sync {
    /// Unique identifier, e.g. `"ARCH-no-circular-deps"`.
    fn id(&self) -> &'static str;

    /// Lowercase family: `arch`, `conv`, `tq` or `ctr`.
    fn category(&self) -> &'static str;

    fn description(&self) -> &'static str;

    fn why(&self) -> &'static str;

    fn default_severity(&self) -> &'static str {
        SEVERITY_ERROR
    }

    fn needs_project_context(&self) -> bool;

    /// Rules that compare code against the manifest are skipped for the
    /// whole run when no valid manifest is loaded.
    fn needs_manifest(&self) -> bool {
        false
    }

    fn check(
        &self,
        file: &UnifiedFileModel,
        context: Option<&ProjectContext>,
        config: &RuleConfig,
    ) -> Vec<Violation>;
}

// ---------------------------------------------------------------------------
// RuleConfig
// ---------------------------------------------------------------------------

/// Configured severity plus free-form options for one rule.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleConfig {
    pub severity: String,
    pub options: BTreeMap<String, serde_json::Value>,
}

impl RuleConfig {
    pub fn with_severity(severity: &str) -> Self {
        Self {
            severity: severity.to_string(),
            options: BTreeMap::new(),
        }
    }

    pub fn with_option(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.to_string(), value.into());
        self
    }

    /// The configured severity, or the rule default when blank. Never empty.
    pub fn resolve_severity(&self, rule: &dyn Rule) -> String {
        let configured = self.severity.trim();
        if configured.is_empty() {
            rule.default_severity().to_string()
        } else {
            configured.to_string()
        }
    }

    pub fn is_off(&self) -> bool {
        self.severity.trim().eq_ignore_ascii_case(SEVERITY_OFF)
    }
}

/// Start a violation of `rule` in `file` with the resolved severity.
pub(crate) fn violation(
    rule: &dyn Rule,
    config: &RuleConfig,
    file: &UnifiedFileModel,
    line: usize,
    message: impl Into<String>,
) -> Violation {
    Violation::new(
        rule.id(),
        &config.resolve_severity(rule),
        &file.path,
        line,
        message,
    )
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Rules in registration order, unique by ID.
#[derive(Default)]
pub struct RuleRegistry {
    rules: IndexMap<String, Box<dyn Rule>>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `rule`. Fails with `DuplicateRule` when the ID is taken.
    pub fn register<R: Rule + 'static>(&mut self, rule: R) -> StrictureResult<()> {
        self.register_boxed(Box::new(rule))
    }

    pub fn register_boxed(&mut self, rule: Box<dyn Rule>) -> StrictureResult<()> {
        let id = rule.id().to_string();
        if self.rules.contains_key(&id) {
            return Err(StrictureError::DuplicateRule(id));
        }
        self.rules.insert(id, rule);
        Ok(())
    }

    pub fn all(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.values().map(|r| r.as_ref())
    }

    pub fn by_id(&self, id: &str) -> Option<&dyn Rule> {
        self.rules.get(id).map(|r| r.as_ref())
    }

    pub fn by_category(&self, category: &str) -> Vec<&dyn Rule> {
        self.all().filter(|r| r.category() == category).collect()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// Every built-in rule, in the order CONV, ARCH, TQ, CTR.
pub fn default_rules() -> Vec<Box<dyn Rule>> {
    vec![
        Box::new(conv::FileNaming),
        Box::new(conv::ExportNaming),
        Box::new(conv::TestFileLocation),
        Box::new(conv::ErrorFormat),
        Box::new(conv::RequiredExports),
        Box::new(conv::FileHeader),
        Box::new(arch::NoCircularDeps),
        Box::new(arch::DependencyDirection),
        Box::new(arch::ImportBoundary),
        Box::new(arch::ModuleBoundary),
        Box::new(arch::MaxFileLines),
        Box::new(arch::LayerViolation),
        Box::new(tq::NoShallowAssertions),
        Box::new(tq::ErrorPathCoverage),
        Box::new(tq::ReturnTypeVerified),
        Box::new(tq::MockScope),
        Box::new(ctr::JsonTagMatch),
        Box::new(ctr::ManifestConformance),
    ]
}

pub fn default_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    for rule in default_rules() {
        if let Err(err) = registry.register_boxed(rule) {
            tracing::warn!(error = %err, "Built-in rule not registered");
        }
    }
    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str, &'static str);

    impl Rule for Fixed {
        fn id(&self) -> &'static str {
            self.0
        }
        fn category(&self) -> &'static str {
            self.1
        }
        fn description(&self) -> &'static str {
            "fixed"
        }
        fn why(&self) -> &'static str {
            "fixed"
        }
        fn default_severity(&self) -> &'static str {
            SEVERITY_WARN
        }
        fn needs_project_context(&self) -> bool {
            false
        }
        fn check(
            &self,
            _file: &UnifiedFileModel,
            _context: Option<&ProjectContext>,
            _config: &RuleConfig,
        ) -> Vec<Violation> {
            Vec::new()
        }
    }

    #[test]
    fn test_resolve_severity() {
        let rule = Fixed("X-one", "arch");
        assert_eq!(RuleConfig::default().resolve_severity(&rule), "warn");
        assert_eq!(RuleConfig::with_severity("  ").resolve_severity(&rule), "warn");
        assert_eq!(RuleConfig::with_severity("error").resolve_severity(&rule), "error");
        assert!(RuleConfig::with_severity("OFF").is_off());
        assert!(!RuleConfig::with_severity("warn").is_off());
    }

    #[test]
    fn test_registry_order_and_lookup() {
        let mut registry = RuleRegistry::new();
        registry.register(Fixed("B-rule", "conv")).unwrap();
        registry.register(Fixed("A-rule", "arch")).unwrap();
        registry.register(Fixed("C-rule", "arch")).unwrap();

        let ids: Vec<&str> = registry.all().map(|r| r.id()).collect();
        assert_eq!(ids, vec!["B-rule", "A-rule", "C-rule"]);
        assert_eq!(registry.by_id("A-rule").map(|r| r.id()), Some("A-rule"));
        assert!(registry.by_id("a-rule").is_none());
        let arch: Vec<&str> = registry.by_category("arch").iter().map(|r| r.id()).collect();
        assert_eq!(arch, vec!["A-rule", "C-rule"]);
        assert!(registry.by_category("ARCH").is_empty());
    }

    #[test]
    fn test_registry_rejects_duplicate_id() {
        let mut registry = RuleRegistry::new();
        registry.register(Fixed("X", "arch")).unwrap();
        let err = registry.register(Fixed("X", "conv")).unwrap_err();
        assert!(matches!(err, StrictureError::DuplicateRule(id) if id == "X"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_registry_catalogue() {
        let registry = default_registry();
        let ids: Vec<&str> = registry.ids().collect();
        assert_eq!(
            ids,
            vec![
                "CONV-file-naming",
                "CONV-export-naming",
                "CONV-test-file-location",
                "CONV-error-format",
                "CONV-required-exports",
                "CONV-file-header",
                "ARCH-no-circular-deps",
                "ARCH-dependency-direction",
                "ARCH-import-boundary",
                "ARCH-module-boundary",
                "ARCH-max-file-lines",
                "ARCH-layer-violation",
                "TQ-no-shallow-assertions",
                "TQ-error-path-coverage",
                "TQ-return-type-verified",
                "TQ-mock-scope",
                "CTR-json-tag-match",
                "CTR-manifest-conformance",
            ]
        );
        for rule in registry.all() {
            assert!(rule.id().to_ascii_lowercase().starts_with(rule.category()));
            let expected = if rule.id() == "CONV-file-header" { "off" } else { "error" };
            assert_eq!(rule.default_severity(), expected);
            assert!(!rule.description().is_empty());
            assert!(!rule.why().is_empty());
        }
        let manifest_rules: Vec<&str> = registry
            .all()
            .filter(|r| r.needs_manifest())
            .map(|r| r.id())
            .collect();
        assert_eq!(manifest_rules, vec!["CTR-manifest-conformance"]);
    }
}
