use serde_json::Value;

use super::{dir_segments, file_edges};
use crate::adapter::lexical::base_name;
use crate::context::builder::has_path_prefix;
use crate::context::ProjectContext;
use crate::models::{UnifiedFileModel, Violation};
use crate::rules::options::{str_list_option, value_as_str_list};
use crate::rules::{violation, Rule, RuleConfig};

// ---------------------------------------------------------------------------
// ARCH-dependency-direction
// ---------------------------------------------------------------------------

struct Layer {
    name: String,
    /// Path prefixes; empty means "any directory segment named `name`".
    paths: Vec<String>,
}

/// Ordered `layers` option: bare names or `{name, paths}` maps.
fn parse_layers(config: &RuleConfig) -> Vec<Layer> {
    let Some(Value::Array(items)) = config.options.get("layers") else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(name) => Some(Layer {
                name: name.trim().to_string(),
                paths: Vec::new(),
            }),
            Value::Object(map) => Some(Layer {
                name: map.get("name")?.as_str()?.trim().to_string(),
                paths: map
                    .get("paths")
                    .and_then(value_as_str_list)
                    .unwrap_or_default(),
            }),
            _ => None,
        })
        .filter(|layer| !layer.name.is_empty())
        .collect()
}

fn layer_of(layers: &[Layer], path: &str) -> Option<usize> {
    layers.iter().position(|layer| {
        if layer.paths.is_empty() {
            dir_segments(path).contains(&layer.name.as_str())
        } else {
            layer.paths.iter().any(|p| has_path_prefix(path, p))
        }
    })
}

/// `ARCH-dependency-direction`: imports must not point from a later layer
/// back to an earlier one in the configured `layers` order.
pub struct DependencyDirection;

impl Rule for DependencyDirection {
    fn id(&self) -> &'static str {
        "ARCH-dependency-direction"
    }

    fn category(&self) -> &'static str {
        "arch"
    }

    fn description(&self) -> &'static str {
        "Enforce dependency flow between architectural layers"
    }

    fn why(&self) -> &'static str {
        "Directional dependencies keep higher-level policies independent of low-level details."
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
        let layers = parse_layers(config);
        let Some(from) = layer_of(&layers, &file.path) else {
            return Vec::new();
        };
        let order: Vec<&str> = layers.iter().map(|l| l.name.as_str()).collect();
        file_edges(file, context)
            .filter_map(|(target, line)| {
                let to = layer_of(&layers, target)?;
                (from > to).then(|| {
                    violation(
                        self,
                        config,
                        file,
                        line,
                        format!(
                            "Import from {} to {} violates dependency flow, allowed direction: {}",
                            layers[from].name,
                            layers[to].name,
                            order.join(" -> ")
                        ),
                    )
                    .with_suggested_fix(
                        "Move the dependency behind an interface so imports follow the allowed layer direction.",
                    )
                    .with_metadata("target", target)
                })
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// ARCH-layer-violation
// ---------------------------------------------------------------------------

const SERVICE_WORDS: &[&str] = &["service", "services", "usecase", "usecases"];

/// Import paths (or their prefixes) of data-access libraries.
const PERSISTENCE_IMPORTS: &[&str] = &[
    "database/sql",
    "gorm",
    "sqlx",
    "pgx",
    "mongo-driver",
    "typeorm",
    "prisma",
    "@prisma/client",
    "sequelize",
    "mongoose",
    "knex",
    "pg",
    "mysql",
    "mysql2",
    "sqlalchemy",
    "psycopg2",
    "pymongo",
    "django.db",
    "java.sql",
    "javax.persistence",
    "jakarta.persistence",
    "org.hibernate",
    "org.springframework.jdbc",
];

/// Call sites that run queries directly.
const PERSISTENCE_CALLS: &[&str] = &[
    "db.Query",
    "db.QueryRow",
    "db.Exec",
    "db.Raw",
    "tx.Exec",
    "cursor.execute",
    "session.query",
    "session.execute",
    "createQueryBuilder",
    "executeQuery",
    "executeUpdate",
    "prepareStatement",
];

fn is_service_layer(path: &str) -> bool {
    if dir_segments(path)
        .iter()
        .any(|d| SERVICE_WORDS.contains(&d.to_ascii_lowercase().as_str()))
    {
        return true;
    }
    let name = base_name(path).to_ascii_lowercase();
    let stem = name.rsplit_once('.').map_or(name.as_str(), |(stem, _)| stem);
    stem.split(['.', '_', '-'])
        .any(|token| SERVICE_WORDS.iter().any(|w| token.ends_with(w)))
}

fn import_matches(import: &str, concern: &str) -> bool {
    import == concern
        || import.starts_with(&format!("{concern}/"))
        || import.starts_with(&format!("{concern}."))
        || import.ends_with(&format!("/{concern}"))
}

fn call_matches(call: &str, concern: &str) -> bool {
    if concern.contains('.') {
        call == concern
    } else {
        call == concern || call.rsplit('.').next() == Some(concern)
    }
}

/// `ARCH-layer-violation`: service-layer files must not import or call
/// persistence concerns directly. Option `persistence` replaces the default
/// list of import prefixes and call names.
pub struct LayerViolation;

impl LayerViolation {
    fn leak(
        &self,
        config: &RuleConfig,
        file: &UnifiedFileModel,
        line: usize,
        concern: &str,
    ) -> Violation {
        violation(
            self,
            config,
            file,
            line,
            format!(
                "Service layer directly uses persistence concern '{concern}', violates layer responsibility"
            ),
        )
        .with_suggested_fix(
            "Move persistence concerns into repository/infrastructure layer abstractions.",
        )
    }
}

impl Rule for LayerViolation {
    fn id(&self) -> &'static str {
        "ARCH-layer-violation"
    }

    fn category(&self) -> &'static str {
        "arch"
    }

    fn description(&self) -> &'static str {
        "Disallow layer responsibility leaks"
    }

    fn why(&self) -> &'static str {
        "Layer purity preserves clear ownership and testability."
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
        if file.is_test_file || !is_service_layer(&file.path) {
            return Vec::new();
        }
        let configured = str_list_option(config, "persistence");
        let (imports, calls): (Vec<&str>, Vec<&str>) = match &configured {
            Some(list) => {
                let list: Vec<&str> = list.iter().map(String::as_str).collect();
                (list.clone(), list)
            }
            None => (PERSISTENCE_IMPORTS.to_vec(), PERSISTENCE_CALLS.to_vec()),
        };

        let mut violations = Vec::new();
        for import in &file.imports {
            if let Some(concern) = imports.iter().find(|c| import_matches(&import.path, c)) {
                violations.push(self.leak(config, file, import.start_line, concern));
            }
        }
        for func in file.all_functions() {
            if let Some(concern) = calls
                .iter()
                .find(|c| func.calls.iter().any(|call| call_matches(call, c)))
            {
                violations.push(
                    self.leak(config, file, func.start_line, concern)
                        .with_metadata("function", func.name.clone()),
                );
            }
        }
        violations
    }
}
