use std::collections::BTreeSet;

use serde_json::Value;

use crate::context::ProjectContext;
use crate::models::{ExportDecl, UnifiedFileModel, Violation};
use crate::rules::{violation, Rule, RuleConfig};

use super::{
    convert_to_style, language_family, matches_style, normalize_style, STYLE_CAMEL, STYLE_PASCAL,
    STYLE_SNAKE, STYLE_UPPER_SNAKE,
};

/// Export categories that carry their own naming convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SymbolKind {
    Function,
    Class,
    Type,
    Constant,
}

impl SymbolKind {
    fn of(export: &ExportDecl) -> Option<Self> {
        match export.kind.as_str() {
            "function" | "func" | "method" => Some(Self::Function),
            "class" | "record" => Some(Self::Class),
            "interface" | "type" | "enum" | "struct" | "alias" => Some(Self::Type),
            "const" | "var" | "let" | "value" => Some(Self::Constant),
            _ => None,
        }
    }

    fn option_key(self) -> &'static str {
        match self {
            Self::Function => "exportedFunctions",
            Self::Class => "exportedClasses",
            Self::Type => "exportedTypes",
            Self::Constant => "exportedConstants",
        }
    }
}

fn default_convention(language: &str, kind: SymbolKind) -> Option<&'static str> {
    match (language, kind) {
        ("go", _) => Some(STYLE_PASCAL),
        ("typescript" | "javascript" | "java", SymbolKind::Function) => Some(STYLE_CAMEL),
        ("typescript" | "javascript" | "java", SymbolKind::Constant) => Some(STYLE_UPPER_SNAKE),
        ("python", SymbolKind::Function) => Some(STYLE_SNAKE),
        // Module-level Python names cannot be told apart from constants.
        ("python", SymbolKind::Constant) => None,
        (_, SymbolKind::Class | SymbolKind::Type) => Some(STYLE_PASCAL),
        _ => None,
    }
}

fn configured(options: &serde_json::Map<String, Value>, key: &str) -> Option<&'static str> {
    options.get(key).and_then(Value::as_str).and_then(normalize_style)
}

/// Convention for `kind`: the per-language option block wins over the
/// top-level option, which wins over the language default.
fn convention_for(config: &RuleConfig, language: &str, kind: SymbolKind) -> Option<&'static str> {
    let key = kind.option_key();
    let nested = match language {
        "javascript" => config.options.get("typescript"),
        other => config.options.get(other),
    };
    nested
        .and_then(Value::as_object)
        .and_then(|block| configured(block, key))
        .or_else(|| {
            config
                .options
                .get(key)
                .and_then(Value::as_str)
                .and_then(normalize_style)
        })
        .or_else(|| default_convention(language, kind))
}

/// `CONV-export-naming`: exported symbols follow the naming convention of
/// their kind.
pub struct ExportNaming;

impl Rule for ExportNaming {
    fn id(&self) -> &'static str {
        "CONV-export-naming"
    }

    fn category(&self) -> &'static str {
        "conv"
    }

    fn description(&self) -> &'static str {
        "Enforce naming conventions for exported/public symbols"
    }

    fn why(&self) -> &'static str {
        "Inconsistent export names make imports confusing and break IDE autocomplete."
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
        let language = language_family(&file.language);
        let mut seen: BTreeSet<(&str, usize)> = BTreeSet::new();
        let mut violations = Vec::new();

        for export in &file.exports {
            let name = export.name.trim();
            if name.is_empty() || export.is_default || name == "default" {
                continue;
            }
            if !seen.insert((name, export.start_line)) {
                continue;
            }
            let Some(kind) = SymbolKind::of(export) else {
                continue;
            };
            let Some(style) = convention_for(config, &language, kind) else {
                continue;
            };
            if matches_style(name, style) {
                continue;
            }
            let suggested = convert_to_style(name, style);
            violations.push(
                violation(
                    self,
                    config,
                    file,
                    export.start_line.max(1),
                    format!(
                        "Export '{name}' does not follow convention '{style}', should be '{suggested}'"
                    ),
                )
                .with_suggested_fix(format!("Rename to '{suggested}' following {style}."))
                .with_metadata("suggested", suggested),
            );
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{AdapterConfig, AdapterRegistry};
    use serde_json::json;

    fn check(path: &str, src: &str, config: &RuleConfig) -> Vec<Violation> {
        let file = AdapterRegistry::with_defaults()
            .parse(path, src.as_bytes(), &AdapterConfig::default())
            .unwrap();
        ExportNaming.check(&file, None, config)
    }

    #[test]
    fn test_typescript_defaults() {
        let src = "export function LoadUser() {}\nexport const loadCart = () => 1;\nexport const maxItems = 3;\nexport const MAX_ITEMS = 3;\nexport class cartStore {}\nexport interface CartItem {}\nexport default function () {}\n";
        let violations = check("src/cart.ts", src, &RuleConfig::default());
        let found: Vec<(usize, &str)> = violations
            .iter()
            .map(|v| (v.start_line, v.message.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (1, "Export 'LoadUser' does not follow convention 'camelCase', should be 'loadUser'"),
                (3, "Export 'maxItems' does not follow convention 'UPPER_SNAKE_CASE', should be 'MAX_ITEMS'"),
                (5, "Export 'cartStore' does not follow convention 'PascalCase', should be 'CartStore'"),
            ]
        );
        assert_eq!(
            violations[0].context.as_ref().unwrap().suggested_fix.as_deref(),
            Some("Rename to 'loadUser' following camelCase.")
        );
    }

    #[test]
    fn test_go_exports_accept_acronyms() {
        let src = "package api\n\nconst MAX_RETRIES = 3\n\ntype HTTPClient struct{}\n\nfunc NewHTTPClient() *HTTPClient { return nil }\n";
        let violations = check("api/client.go", src, &RuleConfig::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].start_line, 3);
        assert!(violations[0].message.ends_with("should be 'MaxRetries'"));
    }

    #[test]
    fn test_python_functions_are_snake_case() {
        let src = "def load_user(user_id):\n    return user_id\n\n\ndef saveUser(user):\n    return user\n\n\nclass user_repo:\n    pass\n";
        let violations = check("app/users.py", src, &RuleConfig::default());
        let names: Vec<&str> = violations.iter().map(|v| v.message.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Export 'saveUser' does not follow convention 'snake_case', should be 'save_user'",
                "Export 'user_repo' does not follow convention 'PascalCase', should be 'UserRepo'",
            ]
        );
    }

    #[test]
    fn test_options_override_defaults_per_language() {
        let src = "export const maxItems = 3;\nexport function LoadUser() {}\n";
        let config = RuleConfig::default()
            .with_option("exportedConstants", "camelCase")
            .with_option("typescript", json!({ "exportedFunctions": "PascalCase" }));
        assert!(check("src/cart.ts", src, &config).is_empty());

        let ignored = RuleConfig::default().with_option("exportedConstants", "SCREAMING");
        assert_eq!(check("src/cart.ts", src, &ignored).len(), 2);
    }
}
