//! Builds a [`ProjectContext`] from the complete set of parsed files.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use tracing::debug;

use super::graph::{find_cycles, transpose};
use super::ProjectContext;
use crate::adapter::imports::{normalize_posix_path, parent_dir};
use crate::adapter::lexical::base_name;
use crate::adapter::{AdapterRegistry, FileIndex};
use crate::manifest::Manifest;
use crate::models::UnifiedFileModel;

/// Leading directories that never name a module.
const SOURCE_ROOTS: &[&str] = &["src", "lib", "app", "pkg", "internal", "cmd", "source"];

const TS_SOURCE_EXTENSIONS: &[&str] = &[".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

pub struct ProjectContextBuilder<'a> {
    registry: &'a AdapterRegistry,
    declared_modules: BTreeMap<String, Vec<String>>,
    manifest: Option<Manifest>,
}

/// Edges of one file: (target, import line, resolved).
type FileEdges = (String, Vec<(String, usize, bool)>);

impl<'a> ProjectContextBuilder<'a> {
    pub fn new(registry: &'a AdapterRegistry) -> Self {
        Self {
            registry,
            declared_modules: BTreeMap::new(),
            manifest: None,
        }
    }

    /// Module name -> path prefixes. Declared modules take precedence over
    /// directory grouping.
    pub fn with_declared_modules(mut self, modules: BTreeMap<String, Vec<String>>) -> Self {
        self.declared_modules = modules;
        self
    }

    pub fn with_manifest(mut self, manifest: Option<Manifest>) -> Self {
        self.manifest = manifest;
        self
    }

    /// Aggregate `models` into an immutable context. Input order does not
    /// matter; for duplicate paths the last model wins.
    pub fn build(self, models: Vec<UnifiedFileModel>) -> ProjectContext {
        let files: BTreeMap<String, UnifiedFileModel> =
            models.into_iter().map(|m| (m.path.clone(), m)).collect();
        let index = FileIndex::new(files.keys().cloned());

        let per_file: Vec<FileEdges> = files
            .par_iter()
            .map(|(path, model)| (path.clone(), self.resolve_edges(path, model, &index)))
            .collect();

        let mut dependency_graph: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut unresolved: BTreeMap<String, Vec<String>> = BTreeMap::new();
        let mut import_lines: BTreeMap<(String, String), usize> = BTreeMap::new();
        for (path, edges) in per_file {
            let mut targets: BTreeSet<String> = BTreeSet::new();
            let mut missing: BTreeSet<String> = BTreeSet::new();
            for (target, line, resolved) in edges {
                import_lines
                    .entry((path.clone(), target.clone()))
                    .and_modify(|l| *l = (*l).min(line))
                    .or_insert(line);
                if !resolved {
                    missing.insert(target.clone());
                }
                targets.insert(target);
            }
            if !missing.is_empty() {
                unresolved.insert(path.clone(), missing.into_iter().collect());
            }
            dependency_graph.insert(path, targets.into_iter().collect());
        }
        let reverse_deps = transpose(&dependency_graph);

        let mut module_by_file: BTreeMap<String, String> = BTreeMap::new();
        let mut module_boundaries: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for path in files.keys() {
            let module = module_for_path(path, &self.declared_modules);
            module_boundaries
                .entry(module.clone())
                .or_default()
                .push(path.clone());
            module_by_file.insert(path.clone(), module);
        }

        let test_source_map = build_test_source_map(&files, &dependency_graph);
        let cycles = find_cycles(&dependency_graph);

        let edge_count: usize = dependency_graph.values().map(Vec::len).sum();
        let unresolved_count: usize = unresolved.values().map(Vec::len).sum();
        debug!(
            files = files.len(),
            edges = edge_count,
            unresolved = unresolved_count,
            modules = module_boundaries.len(),
            tests = test_source_map.len(),
            cycles = cycles.len(),
            "Project context built"
        );

        ProjectContext {
            files,
            dependency_graph,
            reverse_deps,
            unresolved,
            import_lines,
            module_boundaries,
            module_by_file,
            test_source_map,
            cycles,
            manifest: self.manifest,
        }
    }

    fn resolve_edges(
        &self,
        path: &str,
        model: &UnifiedFileModel,
        index: &FileIndex,
    ) -> Vec<(String, usize, bool)> {
        let adapter = self.registry.for_path(path);
        model
            .imports
            .iter()
            .filter(|import| !import.path.trim().is_empty())
            .filter_map(|import| {
                let resolved = adapter.and_then(|a| a.resolve_import(path, import, index));
                let (target, ok) = match resolved {
                    Some(target) => (target, true),
                    None => (import.path.clone(), false),
                };
                (target != path).then_some((target, import.start_line, ok))
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Module boundaries
// ---------------------------------------------------------------------------

/// True when `prefix` names `path` itself or one of its parent directories.
pub(crate) fn has_path_prefix(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim();
    let prefix = prefix.strip_prefix("./").unwrap_or(prefix).trim_end_matches('/');
    prefix.is_empty() || path == prefix || path.starts_with(&format!("{prefix}/"))
}

/// Module name of `path`: the first declared module (by name) with a
/// matching path prefix, else the first directory below the conventional
/// source roots, else `"."`.
pub fn module_for_path(path: &str, declared: &BTreeMap<String, Vec<String>>) -> String {
    if let Some((name, _)) = declared
        .iter()
        .find(|(_, prefixes)| prefixes.iter().any(|p| has_path_prefix(path, p)))
    {
        return name.clone();
    }
    let segments: Vec<&str> = path.split('/').collect();
    let dirs = &segments[..segments.len().saturating_sub(1)];
    let mut i = 0;
    while i < dirs.len() {
        if SOURCE_ROOTS.contains(&dirs[i]) {
            i += 1;
        } else if matches!(dirs[i], "main" | "test") && dirs.get(i + 1) == Some(&"java") {
            i += 2;
        } else {
            break;
        }
    }
    dirs.get(i).map_or_else(|| ".".to_string(), |d| d.to_string())
}

// ---------------------------------------------------------------------------
// Test / source map
// ---------------------------------------------------------------------------

fn build_test_source_map(
    files: &BTreeMap<String, UnifiedFileModel>,
    graph: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, Vec<String>> {
    let is_source = |path: &str| files.get(path).is_some_and(|m| !m.is_test_file);
    let mut map = BTreeMap::new();
    for (path, model) in files.iter().filter(|(_, m)| m.is_test_file) {
        let mut sources: BTreeSet<String> = model
            .test_targets
            .iter()
            .filter(|t| is_source(t))
            .cloned()
            .collect();
        if let Some(found) = convention_candidates(path).into_iter().find(|c| is_source(c)) {
            sources.insert(found);
        }
        if let Some(targets) = graph.get(path) {
            sources.extend(targets.iter().filter(|t| is_source(t)).cloned());
        }
        map.insert(path.clone(), sources.into_iter().collect());
    }
    map
}

/// Source file names a test file name points at, preferred first.
fn source_names_for_test(name: &str) -> Vec<String> {
    if let Some(stem) = name.strip_suffix("_test.go") {
        return vec![format!("{stem}.go")];
    }
    if let Some(stem) = name.strip_suffix("Tests.java").or_else(|| name.strip_suffix("Test.java")) {
        return vec![format!("{stem}.java")];
    }
    if name.ends_with(".py") {
        if let Some(rest) = name.strip_prefix("test_") {
            return vec![rest.to_string()];
        }
        if let Some(stem) = name.strip_suffix("_test.py") {
            return vec![format!("{stem}.py")];
        }
        return Vec::new();
    }
    for affix in [".test.", ".spec."] {
        if let Some(pos) = name.find(affix) {
            let stem = &name[..pos];
            let own_ext = &name[pos + affix.len() - 1..];
            let mut names = vec![format!("{stem}{own_ext}")];
            for ext in TS_SOURCE_EXTENSIONS {
                let candidate = format!("{stem}{ext}");
                if !names.contains(&candidate) {
                    names.push(candidate);
                }
            }
            return names;
        }
    }
    // A file under `__tests__/` without an affix mirrors its source name.
    vec![name.to_string()]
}

/// Directories that mirror a test directory: `test` -> `main`,
/// `tests` -> `src` or dropped, `__tests__` dropped.
fn mirrored_dirs(dir: &str) -> Vec<String> {
    let segments: Vec<&str> = if dir.is_empty() {
        Vec::new()
    } else {
        dir.split('/').collect()
    };
    let mut out: Vec<String> = Vec::new();
    let mut push = |parts: Vec<&str>| {
        let joined = parts.join("/");
        if !out.contains(&joined) {
            out.push(joined);
        }
    };
    for (i, segment) in segments.iter().enumerate() {
        let replaced = |with: Option<&'static str>| {
            let mut parts = segments.clone();
            match with {
                Some(w) => parts[i] = w,
                None => {
                    parts.remove(i);
                }
            }
            parts
        };
        match *segment {
            "test" => push(replaced(Some("main"))),
            "tests" => {
                push(replaced(Some("src")));
                push(replaced(None));
            }
            "__tests__" => push(replaced(None)),
            _ => {}
        }
    }
    out
}

fn convention_candidates(test_path: &str) -> Vec<String> {
    let dir = parent_dir(test_path);
    let names = source_names_for_test(base_name(test_path));
    let mut dirs = vec![dir.to_string()];
    dirs.extend(mirrored_dirs(dir));
    let mut candidates = Vec::new();
    for d in &dirs {
        for name in &names {
            let candidate = if d.is_empty() {
                name.clone()
            } else {
                normalize_posix_path(&format!("{d}/{name}"))
            };
            if candidate != test_path && !candidates.contains(&candidate) {
                candidates.push(candidate);
            }
        }
    }
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AdapterConfig;

    fn parse_all(registry: &AdapterRegistry, files: &[(&str, &str)]) -> Vec<UnifiedFileModel> {
        files
            .iter()
            .map(|(path, src)| {
                registry
                    .parse(path, src.as_bytes(), &AdapterConfig::default())
                    .unwrap()
            })
            .collect()
    }

    const LAYERED: &[(&str, &str)] = &[
        (
            "src/logistics/shipment.ts",
            "import { Invoice } from '../billing/invoice';\nexport const ship = (i: Invoice) => i;\n",
        ),
        (
            "src/billing/invoice.ts",
            "import { session } from '../auth/session';\nimport './invoice';\nexport class Invoice {}\n",
        ),
        (
            "src/auth/session.ts",
            "import { randomUUID } from 'crypto';\nexport const session = () => randomUUID();\n",
        ),
        (
            "src/billing/invoice.test.ts",
            "import { Invoice } from './invoice';\nit('works', () => { expect(new Invoice()).toEqual({}); });\n",
        ),
    ];

    #[test]
    fn test_build_dependency_graph_and_transpose() {
        let registry = AdapterRegistry::with_defaults();
        let ctx = ProjectContextBuilder::new(&registry).build(parse_all(&registry, LAYERED));

        assert_eq!(ctx.files().len(), 4);
        assert_eq!(
            ctx.dependencies("src/logistics/shipment.ts"),
            &["src/billing/invoice.ts".to_string()]
        );
        // Self import dropped.
        assert_eq!(
            ctx.dependencies("src/billing/invoice.ts"),
            &["src/auth/session.ts".to_string()]
        );
        // Unresolved import kept verbatim.
        assert_eq!(ctx.dependencies("src/auth/session.ts"), &["crypto".to_string()]);
        assert_eq!(ctx.unresolved_imports("src/auth/session.ts"), &["crypto".to_string()]);
        assert_eq!(
            ctx.dependents("src/billing/invoice.ts"),
            &[
                "src/billing/invoice.test.ts".to_string(),
                "src/logistics/shipment.ts".to_string()
            ]
        );
        assert_eq!(
            ctx.import_line("src/billing/invoice.ts", "src/auth/session.ts"),
            Some(1)
        );

        for (a, targets) in ctx.dependency_graph() {
            for b in targets {
                assert!(ctx.dependents(b).contains(a));
            }
        }
        for (b, sources) in ctx.reverse_deps() {
            for a in sources {
                assert!(ctx.dependencies(a).contains(b));
            }
        }
        assert!(ctx.cycles().is_empty());
    }

    #[test]
    fn test_build_is_order_independent() {
        let registry = AdapterRegistry::with_defaults();
        let forward = ProjectContextBuilder::new(&registry).build(parse_all(&registry, LAYERED));
        let mut reversed_input = parse_all(&registry, LAYERED);
        reversed_input.reverse();
        let backward = ProjectContextBuilder::new(&registry).build(reversed_input);
        assert_eq!(forward.dependency_graph(), backward.dependency_graph());
        assert_eq!(forward.reverse_deps(), backward.reverse_deps());
        assert_eq!(forward.module_boundaries(), backward.module_boundaries());
        assert_eq!(forward.test_source_map(), backward.test_source_map());
    }

    #[test]
    fn test_module_boundaries_by_directory() {
        let registry = AdapterRegistry::with_defaults();
        let ctx = ProjectContextBuilder::new(&registry).build(parse_all(&registry, LAYERED));
        let modules: Vec<&str> = ctx.module_boundaries().keys().map(String::as_str).collect();
        assert_eq!(modules, vec!["auth", "billing", "logistics"]);
        assert_eq!(
            ctx.module_boundaries()["billing"],
            vec![
                "src/billing/invoice.test.ts".to_string(),
                "src/billing/invoice.ts".to_string()
            ]
        );
        assert_eq!(ctx.module_of("src/auth/session.ts"), Some("auth"));
    }

    #[test]
    fn test_module_for_path_conventions() {
        let none = BTreeMap::new();
        assert_eq!(module_for_path("internal/billing/invoice.go", &none), "billing");
        assert_eq!(
            module_for_path("src/main/java/com/acme/Invoice.java", &none),
            "com"
        );
        assert_eq!(module_for_path("main.go", &none), ".");
        assert_eq!(module_for_path("src/index.ts", &none), ".");
        assert_eq!(module_for_path("web/app.ts", &none), "web");

        let mut declared = BTreeMap::new();
        declared.insert("payments".to_string(), vec!["./src/billing/".to_string()]);
        assert_eq!(module_for_path("src/billing/invoice.ts", &declared), "payments");
        assert_eq!(module_for_path("src/billingx/a.ts", &declared), "billingx");
    }

    #[test]
    fn test_declared_modules_take_precedence() {
        let registry = AdapterRegistry::with_defaults();
        let mut declared = BTreeMap::new();
        declared.insert(
            "core".to_string(),
            vec!["src/auth".to_string(), "src/billing".to_string()],
        );
        let ctx = ProjectContextBuilder::new(&registry)
            .with_declared_modules(declared)
            .build(parse_all(&registry, LAYERED));
        assert_eq!(ctx.module_of("src/auth/session.ts"), Some("core"));
        assert_eq!(ctx.module_of("src/billing/invoice.ts"), Some("core"));
        assert_eq!(ctx.module_of("src/logistics/shipment.ts"), Some("logistics"));
    }

    #[test]
    fn test_test_source_map_conventions() {
        let registry = AdapterRegistry::with_defaults();
        let files: &[(&str, &str)] = &[
            ("internal/billing/invoice.go", "package billing\n"),
            ("internal/billing/invoice_test.go", "package billing\n"),
            ("src/main/java/com/acme/Ledger.java", "package com.acme;\npublic class Ledger {}\n"),
            ("src/test/java/com/acme/LedgerTest.java", "package com.acme;\nclass LedgerTest {}\n"),
            ("src/ledger.py", "def post():\n    pass\n"),
            ("tests/test_ledger.py", "def test_post():\n    assert post() == 1\n"),
            ("web/cart.tsx", "export const Cart = () => null;\n"),
            ("web/__tests__/cart.tsx", "it('renders', () => {});\n"),
            ("web/util.ts", "export const x = 1;\n"),
            ("web/other.spec.ts", "// @covers web/util.ts\n// @covers web/missing.ts\n"),
        ];
        let ctx = ProjectContextBuilder::new(&registry).build(parse_all(&registry, files));
        let map = ctx.test_source_map();
        assert_eq!(
            map["internal/billing/invoice_test.go"],
            vec!["internal/billing/invoice.go".to_string()]
        );
        assert_eq!(
            map["src/test/java/com/acme/LedgerTest.java"],
            vec!["src/main/java/com/acme/Ledger.java".to_string()]
        );
        assert_eq!(map["tests/test_ledger.py"], vec!["src/ledger.py".to_string()]);
        assert_eq!(map["web/__tests__/cart.tsx"], vec!["web/cart.tsx".to_string()]);
        assert_eq!(map["web/other.spec.ts"], vec!["web/util.ts".to_string()]);
        assert!(!map.contains_key("web/util.ts"));
        assert_eq!(ctx.tests_for_source("web/util.ts"), vec!["web/other.spec.ts"]);
        for sources in map.values() {
            for source in sources {
                assert!(!ctx.file(source).unwrap().is_test_file);
            }
        }
    }

    #[test]
    fn test_cycles_are_detected_and_broken() {
        let registry = AdapterRegistry::with_defaults();
        let cyclic: &[(&str, &str)] = &[
            ("src/a.ts", "import { b } from './b';\n"),
            ("src/b.ts", "import { c } from './c';\n"),
            ("src/c.ts", "import { a } from './a';\n"),
        ];
        let ctx = ProjectContextBuilder::new(&registry).build(parse_all(&registry, cyclic));
        assert_eq!(
            ctx.cycles(),
            &[vec![
                "src/a.ts".to_string(),
                "src/b.ts".to_string(),
                "src/c.ts".to_string()
            ]]
        );

        let acyclic: &[(&str, &str)] = &[
            ("src/a.ts", "import { b } from './b';\n"),
            ("src/b.ts", "import { c } from './c';\n"),
            ("src/c.ts", "export const c = 1;\n"),
        ];
        let ctx = ProjectContextBuilder::new(&registry).build(parse_all(&registry, acyclic));
        assert!(ctx.cycles().is_empty());
    }

    #[test]
    fn test_context_carries_manifest() {
        let registry = AdapterRegistry::with_defaults();
        let manifest =
            Manifest::parse(b"manifest_version: '1'\ncontracts:\n  - id: a\n").unwrap();
        let ctx = ProjectContextBuilder::new(&registry)
            .with_manifest(Some(manifest))
            .build(Vec::new());
        assert_eq!(ctx.manifest().map(|m| m.contracts.len()), Some(1));
        assert!(ctx.files().is_empty());
    }
}
