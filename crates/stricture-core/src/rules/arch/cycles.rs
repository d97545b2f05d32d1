use crate::context::ProjectContext;
use crate::models::{UnifiedFileModel, Violation};
use crate::rules::{violation, Rule, RuleConfig};

/// `ARCH-no-circular-deps`: each distinct cycle is reported once, on its
/// lexicographically smallest file.
pub struct NoCircularDeps;

impl Rule for NoCircularDeps {
    fn id(&self) -> &'static str {
        "ARCH-no-circular-deps"
    }

    fn category(&self) -> &'static str {
        "arch"
    }

    fn description(&self) -> &'static str {
        "Disallow circular dependencies"
    }

    fn why(&self) -> &'static str {
        "Dependency cycles make builds brittle and block independent evolution of modules."
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
        context
            .cycles()
            .iter()
            .filter(|cycle| cycle.first() == Some(&file.path))
            .map(|cycle| {
                let next = cycle.get(1).unwrap_or(&cycle[0]);
                let line = context.import_line(&file.path, next).unwrap_or(1);
                let mut path: Vec<&str> = cycle.iter().map(String::as_str).collect();
                path.push(&cycle[0]);
                violation(
                    self,
                    config,
                    file,
                    line,
                    format!("Circular dependency detected: {}", path.join(" -> ")),
                )
                .with_suggested_fix(
                    "Break the cycle by extracting shared abstractions into a lower-level package.",
                )
                .with_metadata("cycle", cycle.clone())
            })
            .collect()
    }
}
