//! Analysis configuration (`.stricture.yml`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_yaml::Value as YamlValue;

use crate::adapter::AdapterConfig;
use crate::errors::{StrictureError, StrictureResult};
use crate::rules::{RuleConfig, RuleRegistry, SEVERITY_ERROR, SEVERITY_OFF, SEVERITY_WARN};

pub const DEFAULT_CONFIG_FILE: &str = ".stricture.yml";
pub const DEFAULT_CONFIG_VERSION: &str = "1.0";

/// Everything one analysis run is configured with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub version: String,
    pub adapter: AdapterConfig,
    /// Manifest path, relative to the analysis root.
    pub manifest: Option<String>,
    /// Declared module boundaries: name -> path prefixes.
    pub modules: BTreeMap<String, Vec<String>>,
    /// Parallel workers; 0 uses the rayon default.
    pub workers: usize,
    pub rules: BTreeMap<String, RuleConfig>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            version: DEFAULT_CONFIG_VERSION.to_string(),
            adapter: AdapterConfig::default(),
            manifest: None,
            modules: BTreeMap::new(),
            workers: 0,
            rules: BTreeMap::new(),
        }
    }
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct RawConfig {
    version: Option<String>,
    adapter: AdapterConfig,
    manifest: Option<String>,
    modules: BTreeMap<String, YamlValue>,
    workers: usize,
    rules: BTreeMap<String, YamlValue>,
}

impl AnalysisConfig {
    /// Parse YAML text. Blank input yields the default configuration.
    pub fn from_yaml_str(text: &str) -> StrictureResult<Self> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let raw: RawConfig = serde_yaml::from_str(text)
            .map_err(|e| StrictureError::ConfigInvalid(format!("parse config yaml: {e}")))?;

        let mut config = Self {
            adapter: raw.adapter,
            manifest: raw.manifest.filter(|m| !m.trim().is_empty()),
            workers: raw.workers,
            ..Self::default()
        };
        if let Some(version) = raw.version.filter(|v| !v.trim().is_empty()) {
            config.version = version.trim().to_string();
        }
        for (name, value) in raw.modules {
            let prefixes = match value {
                YamlValue::String(prefix) => vec![prefix],
                YamlValue::Sequence(items) => items
                    .into_iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect(),
                _ => {
                    return Err(StrictureError::ConfigInvalid(format!(
                        "module {name}: expected a path or a list of paths"
                    )))
                }
            };
            config.modules.insert(name, prefixes);
        }
        for (id, value) in raw.rules {
            let rule = parse_rule_entry(value)
                .map_err(|msg| StrictureError::ConfigInvalid(format!("rule {id}: {msg}")))?;
            config.rules.insert(id, rule);
        }
        Ok(config)
    }

    /// Read and parse a config file. A missing file is `ConfigNotFound`.
    pub fn load(path: impl AsRef<Path>) -> StrictureResult<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StrictureError::ConfigNotFound(path.display().to_string()));
            }
            Err(err) => {
                return Err(StrictureError::ConfigInvalid(format!(
                    "read {}: {err}",
                    path.display()
                )))
            }
        };
        Self::from_yaml_str(&text)
    }

    /// The configuration of `rule_id`; an unconfigured rule gets the default.
    pub fn rule_config(&self, rule_id: &str) -> RuleConfig {
        self.rules.get(rule_id).cloned().unwrap_or_default()
    }

    pub fn is_rule_enabled(&self, rule_id: &str) -> bool {
        !self.rules.get(rule_id).is_some_and(RuleConfig::is_off)
    }

    /// Configured rule IDs that no registered rule implements, sorted.
    pub fn unknown_rule_ids(&self, registry: &RuleRegistry) -> Vec<String> {
        self.rules
            .keys()
            .filter(|id| registry.by_id(id).is_none())
            .cloned()
            .collect()
    }

    /// The manifest location resolved against `root`.
    pub fn manifest_path(&self, root: &Path) -> Option<PathBuf> {
        self.manifest.as_deref().map(|m| root.join(m.trim()))
    }
}

/// `error | warn | off`, case-insensitive, `warning` read as `warn`.
pub fn normalize_severity(raw: &str) -> Result<String, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "error" => Ok(SEVERITY_ERROR.to_string()),
        "warn" | "warning" => Ok(SEVERITY_WARN.to_string()),
        "off" => Ok(SEVERITY_OFF.to_string()),
        _ => Err(format!("invalid severity {raw:?} (valid: error|warn|off)")),
    }
}

fn yaml_to_json(value: &YamlValue) -> Result<serde_json::Value, String> {
    serde_json::to_value(value).map_err(|e| format!("unsupported option value: {e}"))
}

fn options_from(value: &YamlValue) -> Result<BTreeMap<String, serde_json::Value>, String> {
    match yaml_to_json(value)? {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        serde_json::Value::Null => Ok(BTreeMap::new()),
        _ => Err("options must be a mapping".to_string()),
    }
}

/// A rule entry: bare severity, `[severity, {options}]`, or a mapping with
/// optional `severity` and either inline options or an `options` mapping.
fn parse_rule_entry(value: YamlValue) -> Result<RuleConfig, String> {
    match value {
        YamlValue::Null => Ok(RuleConfig::default()),
        YamlValue::String(severity) => Ok(RuleConfig::with_severity(&normalize_severity(&severity)?)),
        YamlValue::Sequence(items) => {
            let Some(first) = items.first() else {
                return Err("array config must include severity as first item".to_string());
            };
            let severity = first
                .as_str()
                .ok_or_else(|| "first array item must be severity string".to_string())?;
            let mut rule = RuleConfig::with_severity(&normalize_severity(severity)?);
            if let Some(options) = items.get(1) {
                rule.options = options_from(options)?;
            }
            Ok(rule)
        }
        YamlValue::Mapping(map) => {
            let mut rule = RuleConfig::default();
            let mut explicit_options = None;
            for (key, value) in &map {
                let Some(key) = key.as_str() else {
                    continue;
                };
                match key {
                    "severity" => {
                        let severity = value
                            .as_str()
                            .ok_or_else(|| "severity must be a string".to_string())?;
                        rule.severity = normalize_severity(severity)?;
                    }
                    "options" => explicit_options = Some(options_from(value)?),
                    _ => {
                        rule.options.insert(key.to_string(), yaml_to_json(value)?);
                    }
                }
            }
            if let Some(options) = explicit_options {
                rule.options = options;
            }
            Ok(rule)
        }
        other => Err(format!("unsupported rule config {other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::default_registry;
    use serde_json::json;

    const FULL: &str = r#"
version: "2.0"
adapter:
  max_file_size: 2048
  timeout: 50
manifest: .stricture-manifest.yml
modules:
  billing: [src/billing]
  auth: src/auth
workers: 4
rules:
  ARCH-max-file-lines: WARNING
  CONV-file-naming: off
  TQ-no-shallow-assertions: [error, { strict: true }]
  ARCH-dependency-direction:
    severity: error
    layers:
      - { name: domain, paths: [src/auth] }
      - application
  ARCH-import-boundary:
    severity: warn
    modules: { x: [a] }
    options:
      public: [api]
  CTR-unknown: warn
"#;

    #[test]
    fn test_blank_input_is_default() {
        let config = AnalysisConfig::from_yaml_str("  \n").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.version, "1.0");
        assert_eq!(config.adapter.max_file_size, 1024 * 1024);
    }

    #[test]
    fn test_full_config() {
        let config = AnalysisConfig::from_yaml_str(FULL).unwrap();
        assert_eq!(config.version, "2.0");
        assert_eq!(config.adapter.max_file_size, 2048);
        assert_eq!(config.adapter.timeout, 50);
        assert!(!config.adapter.include_comments);
        assert_eq!(config.manifest.as_deref(), Some(".stricture-manifest.yml"));
        assert_eq!(config.modules["auth"], vec!["src/auth".to_string()]);
        assert_eq!(config.modules["billing"], vec!["src/billing".to_string()]);
        assert_eq!(config.workers, 4);

        assert_eq!(config.rule_config("ARCH-max-file-lines").severity, "warn");
        assert!(!config.is_rule_enabled("CONV-file-naming"));
        assert!(config.is_rule_enabled("ARCH-no-circular-deps"));

        let tq = config.rule_config("TQ-no-shallow-assertions");
        assert_eq!(tq.severity, "error");
        assert_eq!(tq.options["strict"], json!(true));

        let direction = config.rule_config("ARCH-dependency-direction");
        assert_eq!(
            direction.options["layers"],
            json!([{ "name": "domain", "paths": ["src/auth"] }, "application"])
        );
        assert!(!direction.options.contains_key("severity"));

        let boundary = config.rule_config("ARCH-import-boundary");
        assert_eq!(boundary.severity, "warn");
        assert_eq!(boundary.options.len(), 1);
        assert_eq!(boundary.options["public"], json!(["api"]));

        assert_eq!(
            config.unknown_rule_ids(&default_registry()),
            vec!["CTR-unknown".to_string()]
        );
    }

    #[test]
    fn test_invalid_severity_is_rejected() {
        for text in [
            "rules:\n  ARCH-max-file-lines: fatal\n",
            "rules:\n  ARCH-max-file-lines: []\n",
            "rules:\n  ARCH-max-file-lines: [3]\n",
            "rules:\n  ARCH-max-file-lines: { severity: 2 }\n",
            "rules:\n  ARCH-max-file-lines: 7\n",
        ] {
            let err = AnalysisConfig::from_yaml_str(text).unwrap_err();
            assert!(matches!(err, StrictureError::ConfigInvalid(_)), "{text}");
        }
    }

    #[test]
    fn test_malformed_yaml_is_invalid() {
        let err = AnalysisConfig::from_yaml_str("rules: [unclosed").unwrap_err();
        assert!(matches!(err, StrictureError::ConfigInvalid(_)));
    }

    #[test]
    fn test_load_from_disk_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = AnalysisConfig::load(dir.path().join(DEFAULT_CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, StrictureError::ConfigNotFound(_)));

        let path = dir.path().join(DEFAULT_CONFIG_FILE);
        std::fs::write(&path, "rules:\n  ARCH-max-file-lines: [warn, { max: 300 }]\n").unwrap();
        let config = AnalysisConfig::load(&path).unwrap();
        assert_eq!(config.rule_config("ARCH-max-file-lines").options["max"], json!(300));
        assert_eq!(config.manifest_path(dir.path()), None);
    }

    #[test]
    fn test_normalize_severity() {
        assert_eq!(normalize_severity(" Error ").unwrap(), "error");
        assert_eq!(normalize_severity("warning").unwrap(), "warn");
        assert_eq!(normalize_severity("OFF").unwrap(), "off");
        assert!(normalize_severity("").is_err());
    }
}
