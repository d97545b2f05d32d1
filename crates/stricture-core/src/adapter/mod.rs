//! Language adapters: the capability trait, its registry, and the shared
//! pre-flight checks every `parse` performs.

pub mod go;
pub mod imports;
pub mod java;
pub mod lexical;
pub mod python;
pub mod typescript;

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::{StrictureError, StrictureResult};
use crate::models::{to_slash, ImportDecl, UnifiedFileModel};

pub use imports::FileIndex;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

pub const DEFAULT_MAX_FILE_SIZE: u64 = 1024 * 1024;

/// Options every adapter honours.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Keep comment text visible to declaration matching.
    pub include_comments: bool,
    /// Reject sources larger than this many bytes; 0 disables the limit.
    pub max_file_size: u64,
    /// Work budget per parse in milliseconds; 0 disables the budget.
    pub timeout: u64,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            include_comments: false,
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            timeout: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Work budget
// ---------------------------------------------------------------------------

/// Lines scanned between two clock reads.
const BUDGET_CHECK_INTERVAL: usize = 256;

/// Wall-clock bound on a single adapter invocation.
#[derive(Clone, Debug)]
pub struct WorkBudget {
    deadline: Option<Instant>,
    timeout_ms: u64,
    ticks: usize,
}

impl WorkBudget {
    pub fn start(config: &AdapterConfig) -> Self {
        let deadline = (config.timeout > 0)
            .then(|| Instant::now() + Duration::from_millis(config.timeout));
        Self {
            deadline,
            timeout_ms: config.timeout,
            ticks: 0,
        }
    }

    pub fn unlimited() -> Self {
        Self {
            deadline: None,
            timeout_ms: 0,
            ticks: 0,
        }
    }

    /// A budget that ends at `deadline`.
    pub fn until(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            timeout_ms: 0,
            ticks: 0,
        }
    }

    /// Count one unit of work, reading the clock every
    /// `BUDGET_CHECK_INTERVAL` units.
    pub fn tick(&mut self, path: &str) -> StrictureResult<()> {
        self.ticks += 1;
        if self.ticks % BUDGET_CHECK_INTERVAL != 0 {
            return Ok(());
        }
        self.check(path)
    }

    pub fn check(&self, path: &str) -> StrictureResult<()> {
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                Err(StrictureError::ParseFailure(format!(
                    "work budget exhausted for {path} after {} ms ({} lines scanned)",
                    self.timeout_ms, self.ticks
                )))
            }
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Adapter trait
// ---------------------------------------------------------------------------

/// A per-language extractor producing [`UnifiedFileModel`]s.
///
/// Implementations must be pure: `parse` and `is_test_file` never touch the
/// filesystem and never panic, whatever bytes they are given.
pub trait LanguageAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    /// Lowercase extensions including the dot, e.g. `".go"`.
    fn extensions(&self) -> &'static [&'static str];

    fn is_test_file(&self, path: &str) -> bool;

    fn parse(
        &self,
        path: &str,
        source: &[u8],
        config: &AdapterConfig,
    ) -> StrictureResult<UnifiedFileModel>;

    /// Map an import of `from_path` onto an analyzed file.
    fn resolve_import(
        &self,
        _from_path: &str,
        _import: &ImportDecl,
        _index: &FileIndex,
    ) -> Option<String> {
        None
    }
}

/// Validated inputs shared by every adapter's `parse`.
pub struct Prepared {
    pub path: String,
    pub text: String,
    pub budget: WorkBudget,
}

/// Trim and normalize the path, enforce `max_file_size`, decode the source,
/// and start the work budget.
pub fn prepare(
    adapter: &str,
    path: &str,
    source: &[u8],
    config: &AdapterConfig,
) -> StrictureResult<Prepared> {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return Err(StrictureError::ParseFailure(format!(
            "parse {adapter} file: empty path"
        )));
    }
    let size = source.len() as u64;
    if config.max_file_size > 0 && size > config.max_file_size {
        return Err(StrictureError::FileTooLarge {
            path: to_slash(trimmed),
            size,
            limit: config.max_file_size,
        });
    }
    Ok(Prepared {
        path: to_slash(trimmed),
        text: String::from_utf8_lossy(source).into_owned(),
        budget: WorkBudget::start(config),
    })
}

static COVERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@covers\s+([A-Za-z0-9_./\\-]+)").unwrap());

/// Source files a test file names explicitly with `@covers <path>`,
/// in order of first appearance.
pub fn covers_targets(raw_text: &str) -> Vec<String> {
    let mut targets: Vec<String> = Vec::new();
    for caps in COVERS_RE.captures_iter(raw_text) {
        let target = to_slash(&caps[1]);
        if !targets.contains(&target) {
            targets.push(target);
        }
    }
    targets
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Adapters keyed by file extension. A later registration takes over any
/// extension an earlier one claimed.
#[derive(Default)]
pub struct AdapterRegistry {
    adapters: Vec<Box<dyn LanguageAdapter>>,
    by_extension: HashMap<String, usize>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Go, TypeScript/JavaScript, Python and Java.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(go::GoAdapter);
        registry.register(typescript::TypeScriptAdapter);
        registry.register(python::PythonAdapter);
        registry.register(java::JavaAdapter);
        registry
    }

    pub fn register<A: LanguageAdapter + 'static>(&mut self, adapter: A) {
        let slot = self.adapters.len();
        for ext in adapter.extensions() {
            if let Some(previous) = self.by_extension.insert(ext.to_ascii_lowercase(), slot) {
                tracing::debug!(
                    extension = %ext,
                    previous = self.adapters[previous].name(),
                    adapter = adapter.name(),
                    "Adapter extension overridden"
                );
            }
        }
        self.adapters.push(Box::new(adapter));
    }

    /// The adapter registered for the path's (case-insensitive) extension.
    pub fn for_path(&self, path: &str) -> Option<&dyn LanguageAdapter> {
        let ext = lexical::extension_of(&to_slash(path.trim()));
        if ext.is_empty() {
            return None;
        }
        self.by_extension
            .get(&ext)
            .map(|&slot| self.adapters[slot].as_ref())
    }

    pub fn is_supported(&self, path: &str) -> bool {
        self.for_path(path).is_some()
    }

    pub fn adapters(&self) -> impl Iterator<Item = &dyn LanguageAdapter> {
        self.adapters.iter().map(|a| a.as_ref())
    }

    /// Parse `source` with the adapter registered for `path`.
    pub fn parse(
        &self,
        path: &str,
        source: &[u8],
        config: &AdapterConfig,
    ) -> StrictureResult<UnifiedFileModel> {
        let adapter = self
            .for_path(path)
            .ok_or_else(|| StrictureError::UnsupportedLanguage(to_slash(path.trim())))?;
        adapter.parse(path, source, config)
    }
}
