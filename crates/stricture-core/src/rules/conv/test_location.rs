use serde_json::Value;

use crate::adapter::imports::parent_dir;
use crate::adapter::lexical::base_name;
use crate::context::ProjectContext;
use crate::models::{UnifiedFileModel, Violation};
use crate::rules::options::{str_option, value_as_str_list};
use crate::rules::{violation, Rule, RuleConfig};

use super::language_family;

const STRATEGY_COLOCATED: &str = "colocated";
const STRATEGY_MIRRORED: &str = "mirrored";
const STRATEGY_SUBFOLDER: &str = "subfolder";

const SUBFOLDER: &str = "__tests__";

fn default_suffixes(language: &str) -> &'static [&'static str] {
    match language {
        "go" => &["_test.go"],
        "typescript" => &[".test.ts", ".spec.ts", ".test.tsx", ".spec.tsx"],
        "javascript" => &[".test.js", ".spec.js", ".test.jsx", ".spec.jsx"],
        "python" => &["_test.py"],
        "java" => &["Test.java"],
        _ => &[],
    }
}

fn strategy(config: &RuleConfig) -> &'static str {
    match str_option(config, "strategy").map(str::to_ascii_lowercase).as_deref() {
        Some(STRATEGY_MIRRORED) => STRATEGY_MIRRORED,
        Some(STRATEGY_SUBFOLDER) => STRATEGY_SUBFOLDER,
        _ => STRATEGY_COLOCATED,
    }
}

/// Configured `suffixes.<language>` list, else the language default.
fn suffixes(config: &RuleConfig, language: &str) -> Vec<String> {
    config
        .options
        .get("suffixes")
        .and_then(Value::as_object)
        .and_then(|by_language| by_language.get(language))
        .and_then(value_as_str_list)
        .filter(|list| !list.is_empty())
        .unwrap_or_else(|| {
            default_suffixes(language)
                .iter()
                .map(|s| s.to_string())
                .collect()
        })
}

/// The file name marks a test: a configured suffix, or the `test_` prefix
/// pytest also collects.
fn has_test_name(path: &str, language: &str, suffixes: &[String]) -> bool {
    if suffixes.iter().any(|s| path.ends_with(s.as_str())) {
        return true;
    }
    let name = base_name(path);
    language == "python" && name.starts_with("test_") && name.ends_with(".py")
}

fn looks_like_test(file: &UnifiedFileModel, language: &str, suffixes: &[String]) -> bool {
    if file.is_test_file || has_test_name(&file.path, language, suffixes) {
        return true;
    }
    let path = file.path.as_str();
    match language {
        "go" => path.ends_with("_test.go"),
        "typescript" | "javascript" => path.contains(".test.") || path.contains(".spec."),
        "python" => base_name(path).ends_with("_test.py"),
        "java" => path.ends_with("Test.java"),
        _ => false,
    }
}

fn in_tests_root(path: &str) -> bool {
    path.starts_with("tests/") || path.starts_with("test/")
}

fn in_subfolder(path: &str) -> bool {
    path.starts_with("__tests__/") || path.contains("/__tests__/")
}

fn matches_strategy(path: &str, strategy: &str) -> bool {
    match strategy {
        STRATEGY_MIRRORED => in_tests_root(path),
        STRATEGY_SUBFOLDER => in_subfolder(path),
        _ => !in_tests_root(path) && !in_subfolder(path),
    }
}

/// Where `path` belongs under `strategy`.
fn expected_path(path: &str, strategy: &str) -> String {
    let without_root = path
        .strip_prefix("tests/")
        .or_else(|| path.strip_prefix("test/"));
    match strategy {
        STRATEGY_MIRRORED => match without_root {
            Some(rest) => format!("tests/{rest}"),
            None => {
                let rest = path.strip_prefix("src/").unwrap_or(path);
                format!("tests/{}", rest.replacen("/__tests__/", "/", 1))
            }
        },
        STRATEGY_SUBFOLDER => {
            if in_subfolder(path) {
                return path.to_string();
            }
            let (dir, name) = match without_root {
                Some(rest) => {
                    let dir = parent_dir(rest);
                    let dir = if dir.is_empty() {
                        "src".to_string()
                    } else {
                        format!("src/{dir}")
                    };
                    (dir, base_name(rest))
                }
                None => (parent_dir(path).to_string(), base_name(path)),
            };
            if dir.is_empty() {
                format!("{SUBFOLDER}/{name}")
            } else {
                format!("{dir}/{SUBFOLDER}/{name}")
            }
        }
        _ => match without_root {
            Some(rest) => format!("src/{rest}"),
            None => path.replacen("/__tests__/", "/", 1),
        },
    }
}

fn dir_label(path: &str) -> &str {
    match parent_dir(path) {
        "" => ".",
        dir => dir,
    }
}

/// `CONV-test-file-location`: test files carry a test suffix and live where
/// the configured `strategy` puts them (`colocated`, `mirrored` under
/// `tests/`, or `subfolder` in `__tests__/`).
pub struct TestFileLocation;

impl Rule for TestFileLocation {
    fn id(&self) -> &'static str {
        "CONV-test-file-location"
    }

    fn category(&self) -> &'static str {
        "conv"
    }

    fn description(&self) -> &'static str {
        "Enforce where test files live relative to source files"
    }

    fn why(&self) -> &'static str {
        "Scattered test files make test discovery and coverage analysis unreliable."
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
        let suffixes = suffixes(config, &language);
        if suffixes.is_empty() || !looks_like_test(file, &language, &suffixes) {
            return Vec::new();
        }
        let path = file.path.trim_start_matches("./");
        let name = base_name(path);

        if !has_test_name(path, &language, &suffixes) {
            return vec![violation(
                self,
                config,
                file,
                1,
                format!(
                    "Test file '{name}' does not end with a test suffix ({})",
                    suffixes.join(", ")
                ),
            )
            .with_suggested_fix(format!("Rename to '{name}{}'.", suffixes[0]))];
        }

        let strategy = strategy(config);
        if matches_strategy(path, strategy) {
            return Vec::new();
        }
        let expected = expected_path(path, strategy);
        let expected_dir = dir_label(&expected);
        vec![violation(
            self,
            config,
            file,
            1,
            format!(
                "Test file '{name}' is in '{}', should be in '{expected_dir}' per convention",
                dir_label(path)
            ),
        )
        .with_suggested_fix(format!("Move test file to '{expected_dir}'."))
        .with_metadata("expected", expected.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(path: &str, language: &str, is_test: bool) -> UnifiedFileModel {
        UnifiedFileModel::new(path, language, is_test, b"")
    }

    fn messages(file: &UnifiedFileModel, config: &RuleConfig) -> Vec<String> {
        TestFileLocation
            .check(file, None, config)
            .into_iter()
            .map(|v| v.message)
            .collect()
    }

    #[test]
    fn test_colocated_default() {
        let config = RuleConfig::default();
        assert!(messages(&model("src/cart/cart.test.ts", "typescript", true), &config).is_empty());
        assert!(messages(&model("pkg/users/user_test.go", "go", true), &config).is_empty());
        assert!(messages(&model("src/cart/cart.ts", "typescript", false), &config).is_empty());
        assert_eq!(
            messages(&model("tests/cart/cart.test.ts", "typescript", true), &config),
            vec!["Test file 'cart.test.ts' is in 'tests/cart', should be in 'src/cart' per convention"]
        );
        assert_eq!(
            messages(&model("src/cart/__tests__/cart.test.ts", "typescript", true), &config),
            vec!["Test file 'cart.test.ts' is in 'src/cart/__tests__', should be in 'src/cart' per convention"]
        );
    }

    #[test]
    fn test_mirrored_and_subfolder_strategies() {
        let mirrored = RuleConfig::default().with_option("strategy", "Mirrored");
        assert!(messages(&model("tests/test_users.py", "python", true), &mirrored).is_empty());
        let violations =
            TestFileLocation.check(&model("src/cart/cart.test.ts", "typescript", true), None, &mirrored);
        assert_eq!(
            violations[0].message,
            "Test file 'cart.test.ts' is in 'src/cart', should be in 'tests/cart' per convention"
        );
        assert_eq!(
            violations[0].context.as_ref().unwrap().suggested_fix.as_deref(),
            Some("Move test file to 'tests/cart'.")
        );

        let subfolder = RuleConfig::default().with_option("strategy", "subfolder");
        assert!(messages(&model("src/cart/__tests__/cart.test.ts", "typescript", true), &subfolder)
            .is_empty());
        assert_eq!(
            messages(&model("tests/cart/cart.test.ts", "typescript", true), &subfolder),
            vec!["Test file 'cart.test.ts' is in 'tests/cart', should be in 'src/cart/__tests__' per convention"]
        );
        assert_eq!(expected_path("cart.test.ts", STRATEGY_SUBFOLDER), "__tests__/cart.test.ts");
    }

    #[test]
    fn test_missing_suffix_and_custom_suffixes() {
        let config = RuleConfig::default();
        assert_eq!(
            messages(&model("src/main/java/com/acme/CartCheck.java", "java", true), &config),
            vec!["Test file 'CartCheck.java' does not end with a test suffix (Test.java)"]
        );

        let custom = RuleConfig::default()
            .with_option("suffixes", json!({ "java": ["Check.java", "Test.java"] }));
        assert!(
            messages(&model("src/main/java/com/acme/CartCheck.java", "java", true), &custom)
                .is_empty()
        );
    }
}
