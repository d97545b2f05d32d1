//! Cross-language contract rules.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::context::ProjectContext;
use crate::models::{TypeKind, UnifiedFileModel, Violation};
use crate::rules::{violation, Rule, RuleConfig};

// ---------------------------------------------------------------------------
// CTR-json-tag-match
// ---------------------------------------------------------------------------

fn is_ts_family(language: &str) -> bool {
    matches!(language, "typescript" | "javascript")
}

/// Lowercase with separators removed, so `created_at` ~ `createdAt`.
fn loose_name(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// TypeScript shapes by name: (file, field names). The first file in path
/// order wins when a name is declared twice.
fn typescript_shapes(context: &ProjectContext) -> BTreeMap<&str, (&str, Vec<&str>)> {
    let mut shapes: BTreeMap<&str, (&str, Vec<&str>)> = BTreeMap::new();
    for file in context.files().values().filter(|f| is_ts_family(&f.language)) {
        let types = file
            .types
            .iter()
            .filter(|t| t.kind == TypeKind::Interface || t.kind == TypeKind::Type)
            .map(|t| (t.name.as_str(), &t.fields));
        let classes = file.classes.iter().map(|c| (c.name.as_str(), &c.fields));
        for (name, fields) in types.chain(classes) {
            shapes.entry(name).or_insert_with(|| {
                (
                    file.path.as_str(),
                    fields.iter().map(|f| f.name.as_str()).collect(),
                )
            });
        }
    }
    shapes
}

/// `CTR-json-tag-match`: JSON tags on Go structs must name a field of the
/// TypeScript type with the same name.
pub struct JsonTagMatch;

impl Rule for JsonTagMatch {
    fn id(&self) -> &'static str {
        "CTR-json-tag-match"
    }

    fn category(&self) -> &'static str {
        "ctr"
    }

    fn description(&self) -> &'static str {
        "Ensure Go JSON tags match TypeScript fields"
    }

    fn why(&self) -> &'static str {
        "JSON tag mismatches cause serialization bugs across language boundaries."
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
        if file.language != "go" || file.is_test_file {
            return Vec::new();
        }
        let shapes = typescript_shapes(context);
        let mut violations = Vec::new();
        for ty in file.types.iter().filter(|t| t.kind == TypeKind::Struct) {
            let Some((ts_path, ts_fields)) = shapes.get(ty.name.as_str()) else {
                continue;
            };
            for field in &ty.fields {
                let Some(tag) = field.json_tag.as_deref() else {
                    continue;
                };
                let json_name = match tag.split(',').next() {
                    Some("-") => continue,
                    Some(name) if !name.is_empty() => name,
                    _ => field.name.as_str(),
                };
                if ts_fields.contains(&json_name) {
                    continue;
                }
                let near = ts_fields
                    .iter()
                    .find(|f| loose_name(f) == loose_name(json_name));
                let message = match near {
                    Some(ts_field) => format!(
                        "Go struct '{}' JSON tag '{json_name}' does not match TypeScript field '{ts_field}'",
                        ty.name
                    ),
                    None => format!(
                        "Go struct '{}' JSON tag '{json_name}' has no matching field on TypeScript type '{}'",
                        ty.name, ty.name
                    ),
                };
                violations.push(
                    violation(self, config, file, field.start_line, message)
                        .with_suggested_fix(
                            "Align JSON tags and TypeScript field names for wire compatibility.",
                        )
                        .with_metadata("typescript_file", *ts_path),
                );
            }
        }
        violations
    }
}

// ---------------------------------------------------------------------------
// CTR-manifest-conformance
// ---------------------------------------------------------------------------

static GO_ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b[A-Za-z_]\w*\.(Get|Post|Put|Patch|Delete|Head|Options|GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS)\(\s*"(/[^"]*)""#,
    )
    .unwrap()
});

static GO_HANDLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(?:HandleFunc|Handle)\(\s*"(?:([A-Z]+)\s+)?(/[^"]*)""#).unwrap()
});

static TS_ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"\b(?:app|router|server|api|routes|route|fastify)\.(get|post|put|patch|delete|head|options|all)\(\s*['"`](/[^'"`]*)['"`]"#,
    )
    .unwrap()
});

static PY_ROUTE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*@\w+\.(get|post|put|patch|delete|head|options|route|api_route)\(\s*['"](/[^'"]*)['"](.*)$"#)
        .unwrap()
});

static PY_METHODS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"methods\s*=\s*[\[(]([^\])]*)[\])]").unwrap());

static JAVA_MAPPING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"^\s*@(Get|Post|Put|Patch|Delete|Request)Mapping\s*(?:\(\s*(?:(?:value|path)\s*=\s*)?\{?\s*"([^"]*)"(.*))?"#,
    )
    .unwrap()
});

static JAVA_METHOD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"RequestMethod\.([A-Z]+)").unwrap());

static JAVA_CLASS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:class|interface|record)\s+[A-Za-z_]").unwrap());

/// An HTTP route registration; an empty method accepts any method.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Route {
    method: String,
    endpoint: String,
    line: usize,
}

fn route(method: &str, endpoint: &str, line: usize) -> Route {
    let method = method.to_ascii_uppercase();
    Route {
        method: if method == "ALL" { String::new() } else { method },
        endpoint: endpoint.to_string(),
        line,
    }
}

fn join_endpoint(prefix: &str, path: &str) -> String {
    if prefix.is_empty() {
        return path.to_string();
    }
    format!(
        "{}/{}",
        prefix.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
    .trim_end_matches('/')
    .to_string()
}

fn find_routes(file: &UnifiedFileModel) -> Vec<Route> {
    let text = file.source_text();
    let mut routes = Vec::new();
    let mut java_prefix = String::new();
    let mut java_class_seen = false;

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;
        match file.language.as_str() {
            "go" => {
                for caps in GO_ROUTE_RE.captures_iter(line) {
                    routes.push(route(&caps[1], &caps[2], line_no));
                }
                for caps in GO_HANDLE_RE.captures_iter(line) {
                    let method = caps.get(1).map_or("", |m| m.as_str());
                    routes.push(route(method, &caps[2], line_no));
                }
            }
            "typescript" | "javascript" => {
                for caps in TS_ROUTE_RE.captures_iter(line) {
                    routes.push(route(&caps[1], &caps[2], line_no));
                }
            }
            "python" => {
                let Some(caps) = PY_ROUTE_RE.captures(line) else {
                    continue;
                };
                let verb = &caps[1];
                if verb == "route" || verb == "api_route" {
                    let methods: Vec<String> = PY_METHODS_RE
                        .captures(&caps[3])
                        .map(|m| {
                            m[1].split(',')
                                .map(|s| s.trim().trim_matches(['\'', '"']).to_string())
                                .filter(|s| !s.is_empty())
                                .collect()
                        })
                        .unwrap_or_default();
                    if methods.is_empty() {
                        routes.push(route("GET", &caps[2], line_no));
                    }
                    for method in methods {
                        routes.push(route(&method, &caps[2], line_no));
                    }
                } else {
                    routes.push(route(verb, &caps[2], line_no));
                }
            }
            "java" => {
                if JAVA_CLASS_RE.is_match(line) {
                    java_class_seen = true;
                    continue;
                }
                let Some(caps) = JAVA_MAPPING_RE.captures(line) else {
                    continue;
                };
                let path = caps.get(2).map_or("", |m| m.as_str());
                let rest = caps.get(3).map_or("", |m| m.as_str());
                let method = match &caps[1] {
                    "Request" => JAVA_METHOD_RE
                        .captures(rest)
                        .map(|m| m[1].to_string())
                        .unwrap_or_default(),
                    verb => verb.to_string(),
                };
                if !java_class_seen && &caps[1] == "Request" {
                    java_prefix = path.to_string();
                    continue;
                }
                let endpoint = join_endpoint(&java_prefix, path);
                let endpoint = if endpoint.is_empty() { "/".to_string() } else { endpoint };
                routes.push(route(&method, &endpoint, line_no));
            }
            _ => return routes,
        }
    }
    routes
}

/// `CTR-manifest-conformance`: every HTTP route the code registers must be
/// declared as a contract in the manifest.
pub struct ManifestConformance;

impl Rule for ManifestConformance {
    fn id(&self) -> &'static str {
        "CTR-manifest-conformance"
    }

    fn category(&self) -> &'static str {
        "ctr"
    }

    fn description(&self) -> &'static str {
        "Ensure code matches declared manifest contracts"
    }

    fn why(&self) -> &'static str {
        "Manifest drift erodes trust in declared API and schema ownership."
    }

    fn needs_project_context(&self) -> bool {
        true
    }

    fn needs_manifest(&self) -> bool {
        true
    }

    fn check(
        &self,
        file: &UnifiedFileModel,
        context: Option<&ProjectContext>,
        config: &RuleConfig,
    ) -> Vec<Violation> {
        let Some(manifest) = context.and_then(ProjectContext::manifest) else {
            return Vec::new();
        };
        if file.is_test_file {
            return Vec::new();
        }
        find_routes(file)
            .into_iter()
            .filter(|r| {
                if r.method.is_empty() {
                    !manifest.contracts.iter().any(|c| c.matches(&c.method, &r.endpoint))
                } else {
                    manifest.find_contract(&r.method, &r.endpoint).is_none()
                }
            })
            .map(|r| {
                let method = if r.method.is_empty() { "ANY" } else { r.method.as_str() };
                violation(
                    self,
                    config,
                    file,
                    r.line,
                    format!(
                        "Route {method} {} is not declared in the manifest",
                        r.endpoint
                    ),
                )
                .with_suggested_fix(
                    "Update manifest or code so declared contracts and implementation match.",
                )
                .with_metadata("method", method)
                .with_metadata("endpoint", r.endpoint.clone())
            })
            .collect()
    }
}
