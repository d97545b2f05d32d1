//! Source-tree walking for a run.

use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::adapter::AdapterRegistry;
use crate::errors::{StrictureError, StrictureResult};
use crate::models::{to_slash, Diagnostic, DiagnosticKind};

pub const IGNORE_FILE_NAME: &str = ".strictureignore";

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &[".git", "node_modules", "vendor", "dist", "build"];

/// One file handed to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceInput {
    /// Root-relative, forward-slash path.
    pub path: String,
    pub source: Vec<u8>,
}

impl SourceInput {
    pub fn new(path: &str, source: impl Into<Vec<u8>>) -> Self {
        Self {
            path: to_slash(path.trim()),
            source: source.into(),
        }
    }
}

/// Identity of a discovered file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub language: String,
    /// Lowercase hex SHA-256 of the file bytes.
    pub content_hash: String,
    pub size_bytes: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Directory names skipped in addition to the built-in list.
    pub exclude_dirs: Vec<String>,
    /// Honour `.gitignore` files.
    pub git_ignore: bool,
}

impl DiscoveryOptions {
    pub fn new() -> Self {
        Self {
            exclude_dirs: Vec::new(),
            git_ignore: true,
        }
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything found under a root, sorted by path.
#[derive(Debug, Default)]
pub struct Discovered {
    pub sources: Vec<SourceInput>,
    pub records: Vec<FileRecord>,
    /// Files that matched an adapter but could not be read.
    pub diagnostics: Vec<Diagnostic>,
}

pub fn content_hash(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

/// Walk `root` and read every file some adapter in `registry` handles.
pub fn collect_sources(
    root: &Path,
    registry: &AdapterRegistry,
    options: &DiscoveryOptions,
) -> StrictureResult<Discovered> {
    if !root.is_dir() {
        return Err(StrictureError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("analysis root {} is not a directory", root.display()),
        )));
    }
    let excluded = options.exclude_dirs.clone();
    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .git_ignore(options.git_ignore)
        .git_exclude(options.git_ignore)
        .require_git(false)
        .add_custom_ignore_filename(IGNORE_FILE_NAME)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if !is_dir || entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            !SKIPPED_DIRS.contains(&name.as_ref())
                && !excluded.iter().any(|d| d.as_str() == name.as_ref())
        })
        .build();

    let mut found = Discovered::default();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(err) => {
                debug!(error = %err, "Skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_some_and(|t| t.is_file()) {
            continue;
        }
        let path = entry.path();
        let rel = to_slash(&path.strip_prefix(root).unwrap_or(path).to_string_lossy());
        let Some(adapter) = registry.for_path(&rel) else {
            continue;
        };
        match std::fs::read(path) {
            Ok(bytes) => {
                found.records.push(FileRecord {
                    path: rel.clone(),
                    language: adapter.name().to_string(),
                    content_hash: content_hash(&bytes),
                    size_bytes: bytes.len() as u64,
                });
                found.sources.push(SourceInput {
                    path: rel,
                    source: bytes,
                });
            }
            Err(err) => found
                .diagnostics
                .push(Diagnostic::new(&rel, DiagnosticKind::Io, format!("read {rel}: {err}"))),
        }
    }

    found.sources.sort_by(|a, b| a.path.cmp(&b.path));
    found.records.sort_by(|a, b| a.path.cmp(&b.path));
    found.diagnostics.sort();
    debug!(
        root = %root.display(),
        files = found.sources.len(),
        "Collected sources"
    );
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn paths(found: &Discovered) -> Vec<&str> {
        found.sources.iter().map(|s| s.path.as_str()).collect()
    }

    #[test]
    fn test_collects_supported_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, "src/b.ts", "export const b = 1;\n");
        write(root, "src/a.go", "package a\n");
        write(root, "README.md", "# readme\n");
        write(root, "node_modules/lib/index.ts", "x\n");
        write(root, "vendor/dep/dep.go", "package dep\n");
        write(root, "pkg/dist/out.py", "x = 1\n");

        let found = collect_sources(root, &AdapterRegistry::with_defaults(), &DiscoveryOptions::new())
            .unwrap();
        assert_eq!(paths(&found), vec!["src/a.go", "src/b.ts"]);
        assert_eq!(found.records[0].language, "go");
        assert_eq!(found.records[1].language, "typescript");
        assert_eq!(found.records[0].size_bytes, 10);
        assert!(found.diagnostics.is_empty());
    }

    #[test]
    fn test_honours_ignore_files() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(root, ".gitignore", "generated/\n");
        write(root, IGNORE_FILE_NAME, "*.gen.go\n");
        write(root, "generated/api.go", "package api\n");
        write(root, "svc/model.gen.go", "package svc\n");
        write(root, "svc/model.go", "package svc\n");
        write(root, "legacy/old.py", "x = 1\n");

        let options = DiscoveryOptions {
            exclude_dirs: vec!["legacy".to_string()],
            ..DiscoveryOptions::new()
        };
        let found = collect_sources(root, &AdapterRegistry::with_defaults(), &options).unwrap();
        assert_eq!(paths(&found), vec!["svc/model.go"]);
    }

    #[test]
    fn test_content_hash_is_sha256_hex() {
        assert_eq!(
            content_hash(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(content_hash(b"abc").len(), 64);
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(collect_sources(&missing, &AdapterRegistry::with_defaults(), &DiscoveryOptions::new())
            .is_err());
    }
}
