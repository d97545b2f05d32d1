//! Whole-project view shared by every cross-file rule.
//!
//! A [`ProjectContext`] is built once per run by [`ProjectContextBuilder`]
//! after all files are parsed and is read-only afterwards. Every map is a
//! `BTreeMap` and every value list is sorted, so iteration order is stable.

pub mod builder;
pub mod graph;

use std::collections::BTreeMap;

use crate::manifest::Manifest;
use crate::models::UnifiedFileModel;

pub use builder::{module_for_path, ProjectContextBuilder};

#[derive(Debug, Default)]
pub struct ProjectContext {
    files: BTreeMap<String, UnifiedFileModel>,
    dependency_graph: BTreeMap<String, Vec<String>>,
    reverse_deps: BTreeMap<String, Vec<String>>,
    unresolved: BTreeMap<String, Vec<String>>,
    import_lines: BTreeMap<(String, String), usize>,
    module_boundaries: BTreeMap<String, Vec<String>>,
    module_by_file: BTreeMap<String, String>,
    test_source_map: BTreeMap<String, Vec<String>>,
    cycles: Vec<Vec<String>>,
    manifest: Option<Manifest>,
}

impl ProjectContext {
    pub fn files(&self) -> &BTreeMap<String, UnifiedFileModel> {
        &self.files
    }

    pub fn file(&self, path: &str) -> Option<&UnifiedFileModel> {
        self.files.get(path)
    }

    pub fn contains_file(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    /// File path -> sorted import targets. A target is an analyzed file path
    /// when resolution succeeded, else the verbatim import string.
    pub fn dependency_graph(&self) -> &BTreeMap<String, Vec<String>> {
        &self.dependency_graph
    }

    /// Exact transpose of [`Self::dependency_graph`].
    pub fn reverse_deps(&self) -> &BTreeMap<String, Vec<String>> {
        &self.reverse_deps
    }

    pub fn dependencies(&self, path: &str) -> &[String] {
        self.dependency_graph
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn dependents(&self, path: &str) -> &[String] {
        self.reverse_deps.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Resolved targets of `path` that are analyzed files.
    pub fn file_dependencies<'a>(&'a self, path: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.dependencies(path)
            .iter()
            .map(String::as_str)
            .filter(|target| self.files.contains_key(*target))
    }

    /// Import specifiers of `path` that no resolver could place.
    pub fn unresolved_imports(&self, path: &str) -> &[String] {
        self.unresolved.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First source line of the import that produced `from -> to`.
    pub fn import_line(&self, from: &str, to: &str) -> Option<usize> {
        self.import_lines
            .get(&(from.to_string(), to.to_string()))
            .copied()
    }

    /// Module name -> sorted member files.
    pub fn module_boundaries(&self) -> &BTreeMap<String, Vec<String>> {
        &self.module_boundaries
    }

    pub fn module_of(&self, path: &str) -> Option<&str> {
        self.module_by_file.get(path).map(String::as_str)
    }

    /// Test file -> sorted source files it exercises.
    pub fn test_source_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.test_source_map
    }

    pub fn sources_for_test(&self, test_path: &str) -> &[String] {
        self.test_source_map
            .get(test_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Test files whose mapping includes `source_path`, sorted.
    pub fn tests_for_source(&self, source_path: &str) -> Vec<&str> {
        self.test_source_map
            .iter()
            .filter(|(_, sources)| sources.iter().any(|s| s == source_path))
            .map(|(test, _)| test.as_str())
            .collect()
    }

    /// Distinct dependency cycles, each starting at its smallest file.
    pub fn cycles(&self) -> &[Vec<String>] {
        &self.cycles
    }

    /// The validated manifest, when one was loaded for this run.
    pub fn manifest(&self) -> Option<&Manifest> {
        self.manifest.as_ref()
    }

    pub fn edge_count(&self) -> usize {
        self.dependency_graph.values().map(Vec::len).sum()
    }
}
