//! The three-phase analysis run: parse every input, build the project
//! context once, then run every enabled rule against every file.

use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::adapter::AdapterRegistry;
use crate::config::AnalysisConfig;
use crate::context::{ProjectContext, ProjectContextBuilder};
use crate::discovery::{collect_sources, DiscoveryOptions, SourceInput};
use crate::errors::{StrictureError, StrictureResult};
use crate::manifest::{Manifest, DEFAULT_MANIFEST_FILE};
use crate::models::{Diagnostic, DiagnosticKind, UnifiedFileModel, Violation};
use crate::rules::{Rule, RuleConfig, RuleRegistry};
use crate::suppression::{apply_suppressions, SuppressionPolicy};

/// Outcome of one run.
#[derive(Clone, Debug, Default, Serialize)]
pub struct AnalysisReport {
    /// Sorted by file, line, column, rule, then message.
    pub violations: Vec<Violation>,
    pub diagnostics: Vec<Diagnostic>,
    /// Manifest-gated rules that did not run.
    pub skipped_rules: Vec<String>,
    pub files_analyzed: usize,
    /// Violations dropped by inline directives.
    pub suppressed: usize,
    pub elapsed_ms: u64,
}

impl AnalysisReport {
    pub fn error_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == crate::rules::SEVERITY_ERROR)
            .count()
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }
}

/// Result of parsing one input.
enum Parsed {
    Model(Box<UnifiedFileModel>, Option<SuppressionPolicy>),
    Failed(Diagnostic),
}

/// An enabled rule paired with its resolved configuration.
struct ActiveRule<'r> {
    rule: &'r dyn Rule,
    config: RuleConfig,
}

pub struct Engine {
    adapters: AdapterRegistry,
    rules: RuleRegistry,
    config: AnalysisConfig,
    root: Option<PathBuf>,
    manifest: Option<Manifest>,
}

impl Engine {
    pub fn new(adapters: AdapterRegistry, rules: RuleRegistry, config: AnalysisConfig) -> Self {
        for id in config.unknown_rule_ids(&rules) {
            warn!(rule = %id, "Configured rule is not registered");
        }
        Self {
            adapters,
            rules,
            config,
            root: None,
            manifest: None,
        }
    }

    /// Directory that relative manifest paths resolve against.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Use an already loaded manifest instead of reading one from disk.
    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Discover sources under `root` and analyse them.
    pub fn run_dir(&self, root: &Path) -> StrictureResult<AnalysisReport> {
        let discovered = collect_sources(root, &self.adapters, &DiscoveryOptions::new())?;
        let mut report = self.analyze(discovered.sources, Some(root));
        if !discovered.diagnostics.is_empty() {
            report.diagnostics.extend(discovered.diagnostics);
            report.diagnostics.sort();
        }
        Ok(report)
    }

    /// Analyse in-memory inputs.
    pub fn run(&self, inputs: Vec<SourceInput>) -> AnalysisReport {
        self.analyze(inputs, self.root.as_deref())
    }

    fn analyze(&self, inputs: Vec<SourceInput>, root: Option<&Path>) -> AnalysisReport {
        let started = Instant::now();
        let pool = build_pool(self.config.workers);
        let mut report = AnalysisReport::default();

        // ---------------------------------------------------------------
        // Phase 1: parse
        // ---------------------------------------------------------------
        let parsed = run_parallel(pool.as_ref(), &inputs, |input| self.parse_one(input));
        drop(inputs);

        let mut models = Vec::with_capacity(parsed.len());
        let mut policies: HashMap<String, SuppressionPolicy> = HashMap::new();
        for outcome in parsed {
            match outcome {
                Parsed::Model(model, policy) => {
                    if let Some(policy) = policy {
                        policies.insert(model.path.clone(), policy);
                    }
                    models.push(*model);
                }
                Parsed::Failed(diagnostic) => report.diagnostics.push(diagnostic),
            }
        }
        report.files_analyzed = models.len();

        // ---------------------------------------------------------------
        // Phase 2: project context
        // ---------------------------------------------------------------
        let active = self.active_rules();
        let needs_manifest = active.iter().any(|a| a.rule.needs_manifest());
        let manifest = if needs_manifest {
            match self.resolve_manifest(root) {
                Ok(manifest) => Some(manifest),
                Err(diagnostic) => {
                    warn!(
                        path = %diagnostic.path,
                        message = %diagnostic.message,
                        "Manifest unavailable, skipping manifest rules"
                    );
                    report.diagnostics.push(diagnostic);
                    None
                }
            }
        } else {
            None
        };
        let (active, skipped): (Vec<ActiveRule>, Vec<ActiveRule>) = active
            .into_iter()
            .partition(|a| manifest.is_some() || !a.rule.needs_manifest());
        report.skipped_rules = skipped.iter().map(|a| a.rule.id().to_string()).collect();

        let builder = ProjectContextBuilder::new(&self.adapters)
            .with_declared_modules(self.config.modules.clone())
            .with_manifest(manifest);
        let context = match &pool {
            Some(pool) => pool.install(|| builder.build(models)),
            None => builder.build(models),
        };

        // ---------------------------------------------------------------
        // Phase 3: rules
        // ---------------------------------------------------------------
        let files: Vec<&UnifiedFileModel> = context.files().values().collect();
        let results = run_parallel(pool.as_ref(), &files, |file| {
            check_file(file, &context, &active)
        });
        let mut violations = Vec::new();
        for (file_violations, file_diagnostics) in results {
            violations.extend(file_violations);
            report.diagnostics.extend(file_diagnostics);
        }

        let (mut violations, suppressed) = apply_suppressions(violations, &policies);
        violations.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        report.violations = violations;
        report.suppressed = suppressed;
        report.diagnostics.sort();
        report.elapsed_ms = millis(started.elapsed());

        info!(
            files = report.files_analyzed,
            violations = report.violations.len(),
            suppressed = report.suppressed,
            diagnostics = report.diagnostics.len(),
            skipped_rules = report.skipped_rules.len(),
            elapsed_ms = report.elapsed_ms,
            "Analysis complete"
        );
        report
    }

    fn parse_one(&self, input: &SourceInput) -> Parsed {
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            self.adapters
                .parse(&input.path, &input.source, &self.config.adapter)
        }));
        match outcome {
            Ok(Ok(model)) => {
                debug!(
                    path = %model.path,
                    language = %model.language,
                    lines = model.line_count,
                    "Parsed file"
                );
                let policy = SuppressionPolicy::compile(&model.source_text());
                let policy = (!policy.is_empty()).then_some(policy);
                Parsed::Model(Box::new(model), policy)
            }
            Ok(Err(err)) => {
                warn!(path = %input.path, error = %err, "Parse failed");
                Parsed::Failed(diagnostic_for(&input.path, &err))
            }
            Err(payload) => {
                let message = panic_message(payload);
                warn!(path = %input.path, panic = %message, "Adapter panicked");
                Parsed::Failed(Diagnostic::new(
                    &input.path,
                    DiagnosticKind::AdapterPanic,
                    format!("adapter panicked: {message}"),
                ))
            }
        }
    }

    /// Registered rules whose resolved severity is not `off`, in
    /// registration order.
    fn active_rules(&self) -> Vec<ActiveRule<'_>> {
        self.rules
            .all()
            .filter_map(|rule| {
                let mut config = self.config.rule_config(rule.id());
                config.severity = config.resolve_severity(rule);
                (!config.is_off()).then_some(ActiveRule { rule, config })
            })
            .collect()
    }

    fn resolve_manifest(&self, root: Option<&Path>) -> Result<Manifest, Diagnostic> {
        if let Some(manifest) = &self.manifest {
            return manifest
                .validate()
                .map(|()| manifest.clone())
                .map_err(|err| diagnostic_for(DEFAULT_MANIFEST_FILE, &err));
        }
        let path = match (&self.config.manifest, root) {
            (Some(configured), Some(root)) => root.join(configured.trim()),
            (Some(configured), None) => PathBuf::from(configured.trim()),
            (None, Some(root)) => root.join(DEFAULT_MANIFEST_FILE),
            (None, None) => {
                return Err(Diagnostic::new(
                    DEFAULT_MANIFEST_FILE,
                    DiagnosticKind::ManifestNotFound,
                    "no manifest configured",
                ))
            }
        };
        let label = root
            .and_then(|r| path.strip_prefix(r).ok())
            .unwrap_or(path.as_path())
            .to_string_lossy()
            .replace('\\', "/");
        Manifest::load(&path).map_err(|err| match err {
            StrictureError::ManifestNotFound(_) => {
                Diagnostic::new(&label, DiagnosticKind::ManifestNotFound, err.to_string())
            }
            other => Diagnostic::new(&label, DiagnosticKind::ManifestInvalid, other.to_string()),
        })
    }
}

fn check_file(
    file: &UnifiedFileModel,
    context: &ProjectContext,
    rules: &[ActiveRule<'_>],
) -> (Vec<Violation>, Vec<Diagnostic>) {
    let mut violations = Vec::new();
    let mut diagnostics = Vec::new();
    for active in rules {
        let ctx = active.rule.needs_project_context().then_some(context);
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            active.rule.check(file, ctx, &active.config)
        }));
        match outcome {
            Ok(found) => violations.extend(found.into_iter().map(|mut v| {
                if v.rule_id.is_empty() {
                    v.rule_id = active.rule.id().to_string();
                }
                if v.severity.is_empty() {
                    v.severity = active.config.severity.clone();
                }
                v
            })),
            Err(payload) => {
                let message = panic_message(payload);
                warn!(
                    path = %file.path,
                    rule = active.rule.id(),
                    panic = %message,
                    "Rule panicked"
                );
                diagnostics.push(Diagnostic::new(
                    &file.path,
                    DiagnosticKind::RulePanic,
                    format!("rule {} panicked: {message}", active.rule.id()),
                ));
            }
        }
    }
    (violations, diagnostics)
}

fn sort_key(v: &Violation) -> (&str, usize, usize, &str, &str) {
    (
        v.file_path.as_str(),
        v.start_line,
        v.start_column.unwrap_or(0),
        v.rule_id.as_str(),
        v.message.as_str(),
    )
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn diagnostic_for(path: &str, err: &StrictureError) -> Diagnostic {
    let kind = match err {
        StrictureError::ParseFailure(_) => DiagnosticKind::ParseFailure,
        StrictureError::UnsupportedLanguage(_) => DiagnosticKind::UnsupportedLanguage,
        StrictureError::FileTooLarge { .. } => DiagnosticKind::FileTooLarge,
        StrictureError::ManifestNotFound(_) => DiagnosticKind::ManifestNotFound,
        StrictureError::ManifestInvalid(_) => DiagnosticKind::ManifestInvalid,
        _ => DiagnosticKind::Io,
    };
    Diagnostic::new(path, kind, err.to_string())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// A dedicated pool, or `None` to run sequentially when it cannot be built.
/// Zero workers lets rayon pick the thread count.
fn build_pool(workers: usize) -> Option<ThreadPool> {
    match rayon::ThreadPoolBuilder::new().num_threads(workers).build() {
        Ok(pool) => Some(pool),
        Err(err) => {
            warn!(error = %err, "Thread pool unavailable, running sequentially");
            None
        }
    }
}

fn run_parallel<T, R, F>(pool: Option<&ThreadPool>, items: &[T], f: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(&T) -> R + Sync + Send,
{
    match pool {
        Some(pool) => pool.install(|| items.par_iter().map(&f).collect()),
        None => items.iter().map(&f).collect(),
    }
}
