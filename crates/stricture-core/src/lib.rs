//! Stricture core library: a multi-language static-analysis engine.
//!
//! Source files are parsed by per-language adapters into a shared
//! [`UnifiedFileModel`], aggregated once into a [`ProjectContext`]
//! (dependency graph, module boundaries, test-to-source map, cycles), and
//! then checked by architecture, convention, test-quality and contract
//! rules. The [`Engine`] runs the three phases in parallel and returns an
//! [`AnalysisReport`].

pub mod adapter;
pub mod config;
pub mod context;
pub mod discovery;
pub mod errors;
pub mod manifest;
pub mod models;
pub mod pipeline;
pub mod rules;
pub mod suppression;

pub use adapter::{AdapterConfig, AdapterRegistry, LanguageAdapter};
pub use config::AnalysisConfig;
pub use context::{ProjectContext, ProjectContextBuilder};
pub use discovery::{collect_sources, FileRecord, SourceInput};
pub use errors::{StrictureError, StrictureResult};
pub use manifest::Manifest;
pub use models::{Diagnostic, DiagnosticKind, UnifiedFileModel, Violation};
pub use pipeline::{AnalysisReport, Engine};
pub use rules::{default_registry, Rule, RuleConfig, RuleRegistry};
