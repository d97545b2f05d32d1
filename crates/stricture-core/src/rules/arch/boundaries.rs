use serde_json::Value;

use super::{dir_segments, file_edges, module_dir, relative_to};
use crate::adapter::lexical::base_name;
use crate::context::builder::has_path_prefix;
use crate::context::ProjectContext;
use crate::models::{UnifiedFileModel, Violation};
use crate::rules::options::{str_list_option, value_as_str_list};
use crate::rules::{violation, Rule, RuleConfig};

const PUBLIC_DIRS: &[&str] = &["api", "public"];
const INTERNAL_SEGMENTS: &[&str] = &["internal", "private", "impl"];

fn trim_prefix(prefix: &str) -> &str {
    let prefix = prefix.trim();
    prefix
        .strip_prefix("./")
        .unwrap_or(prefix)
        .trim_end_matches('/')
}

// ---------------------------------------------------------------------------
// ARCH-import-boundary
// ---------------------------------------------------------------------------

struct ModuleSpec {
    name: String,
    paths: Vec<String>,
    public: Option<Vec<String>>,
}

/// `modules` option: `name -> {paths, public}`, in name order.
fn parse_modules(config: &RuleConfig) -> Vec<ModuleSpec> {
    let Some(Value::Object(map)) = config.options.get("modules") else {
        return Vec::new();
    };
    let mut specs: Vec<ModuleSpec> = map
        .iter()
        .filter_map(|(name, spec)| {
            let paths = match spec {
                Value::Object(fields) => fields.get("paths").and_then(value_as_str_list)?,
                other => value_as_str_list(other)?,
            };
            let public = spec.get("public").and_then(value_as_str_list);
            Some(ModuleSpec {
                name: name.clone(),
                paths,
                public,
            })
        })
        .collect();
    specs.sort_by(|a, b| a.name.cmp(&b.name));
    specs
}

/// Module name of `path` and the path relative to the module root.
struct Membership<'a> {
    name: String,
    relative: String,
    public: Option<&'a [String]>,
}

fn membership<'a>(
    path: &str,
    context: &ProjectContext,
    specs: &'a [ModuleSpec],
) -> Option<Membership<'a>> {
    if !specs.is_empty() {
        return specs.iter().find_map(|spec| {
            let root = spec.paths.iter().find(|p| has_path_prefix(path, p))?;
            Some(Membership {
                name: spec.name.clone(),
                relative: relative_to(path, trim_prefix(root)).to_string(),
                public: spec.public.as_deref(),
            })
        });
    }
    let module = context.module_of(path).filter(|m| *m != ".")?;
    let dir = module_dir(context, module, path);
    Some(Membership {
        name: module.to_string(),
        relative: relative_to(path, &dir).to_string(),
        public: None,
    })
}

/// Files directly in the module root, package entry points, and anything
/// under `api/` or `public/`.
fn is_default_public(relative: &str) -> bool {
    let dirs = dir_segments(relative);
    if dirs.is_empty() || PUBLIC_DIRS.contains(&dirs[0]) {
        return true;
    }
    let name = base_name(relative);
    name.starts_with("index.") || name == "__init__.py"
}

fn is_public(target: &str, member: &Membership<'_>) -> bool {
    match member.public {
        Some(list) => list.iter().any(|p| {
            let p = trim_prefix(p);
            has_path_prefix(&member.relative, p) || has_path_prefix(target, p)
        }),
        None => is_default_public(&member.relative),
    }
}

/// `ARCH-import-boundary`: imports into another module must land on that
/// module's public files.
pub struct ImportBoundary;

impl Rule for ImportBoundary {
    fn id(&self) -> &'static str {
        "ARCH-import-boundary"
    }

    fn category(&self) -> &'static str {
        "arch"
    }

    fn description(&self) -> &'static str {
        "Prevent cross-module imports that violate boundaries"
    }

    fn why(&self) -> &'static str {
        "Module boundaries reduce accidental coupling between teams and deploy units."
    }

    fn needs_project_context(&self) -> bool {
        true
    }

    fn check(
        &self,
        file: &UnifiedFileModel,
        context: Option<&ProjectContext>,
        config: &RuleConfig,
    ) -> Vec<Violation> {
        let Some(context) = context else {
            return Vec::new();
        };
        let specs = parse_modules(config);
        let source = membership(&file.path, context, &specs);
        let from = source.as_ref().map_or("root", |m| m.name.as_str());

        file_edges(file, context)
            .filter_map(|(target, line)| {
                let member = membership(target, context, &specs)?;
                if source.as_ref().is_some_and(|s| s.name == member.name)
                    || is_public(target, &member)
                {
                    return None;
                }
                Some(
                    violation(
                        self,
                        config,
                        file,
                        line,
                        format!(
                            "Import from {from} module to {} module crosses module boundary, '{target}' is not part of its public interface",
                            member.name
                        ),
                    )
                    .with_suggested_fix("Route access through the target module's published API package.")
                    .with_metadata("target", target),
                )
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ARCH-module-boundary
// ---------------------------------------------------------------------------

/// `ARCH-module-boundary`: another module's `internal`, `private` or `impl`
/// directories are off limits. Option `internal` replaces the segment list.
pub struct ModuleBoundary;

impl Rule for ModuleBoundary {
    fn id(&self) -> &'static str {
        "ARCH-module-boundary"
    }

    fn category(&self) -> &'static str {
        "arch"
    }

    fn description(&self) -> &'static str {
        "Require access through module public APIs"
    }

    fn why(&self) -> &'static str {
        "Direct internal imports bypass contract checks and break encapsulation."
    }

    fn needs_project_context(&self) -> bool {
        true
    }

    fn check(
        &self,
        file: &UnifiedFileModel,
        context: Option<&ProjectContext>,
        config: &RuleConfig,
    ) -> Vec<Violation> {
        let Some(context) = context else {
            return Vec::new();
        };
        let internal: Vec<String> = str_list_option(config, "internal")
            .unwrap_or_else(|| INTERNAL_SEGMENTS.iter().map(|s| s.to_string()).collect());
        let from = context.module_of(&file.path);

        file_edges(file, context)
            .filter_map(|(target, line)| {
                let module = context.module_of(target).filter(|m| *m != ".")?;
                if from == Some(module) {
                    return None;
                }
                let dir = module_dir(context, module, target);
                let crosses = dir_segments(relative_to(target, &dir))
                    .iter()
                    .any(|segment| internal.iter().any(|i| i == segment));
                crosses.then(|| {
                    violation(
                        self,
                        config,
                        file,
                        line,
                        format!(
                            "Access to {module} module must go through public API, not direct import of {target}"
                        ),
                    )
                    .with_suggested_fix("Import the module's exported API package instead of internal paths.")
                    .with_metadata("target", target)
                })
            })
            .collect()
    }
}
