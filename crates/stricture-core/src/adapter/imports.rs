//! Import resolution from language-specific import specifiers to analyzed
//! files.
//!
//! Resolution never touches the filesystem: every candidate is checked
//! against the [`FileIndex`] of files that are part of the current run.

use std::collections::{BTreeMap, BTreeSet};

use super::lexical::base_name;

// ---------------------------------------------------------------------------
// File index
// ---------------------------------------------------------------------------

/// The set of analyzed file paths, grouped by directory.
#[derive(Clone, Debug, Default)]
pub struct FileIndex {
    files: BTreeSet<String>,
    by_dir: BTreeMap<String, Vec<String>>,
}

impl FileIndex {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let files: BTreeSet<String> = paths.into_iter().map(Into::into).collect();
        let mut by_dir: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for path in &files {
            by_dir
                .entry(parent_dir(path).to_string())
                .or_default()
                .push(path.clone());
        }
        Self { files, by_dir }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.iter().map(String::as_str)
    }

    /// Files directly inside `dir`, sorted.
    pub fn files_in_dir(&self, dir: &str) -> &[String] {
        self.by_dir.get(dir).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dirs(&self) -> impl Iterator<Item = &str> {
        self.by_dir.keys().map(String::as_str)
    }

    /// First path (sorted) equal to `suffix` or ending in `/suffix`.
    pub fn find_by_suffix(&self, suffix: &str) -> Option<&str> {
        if let Some(hit) = self.files.get(suffix) {
            return Some(hit.as_str());
        }
        let needle = format!("/{suffix}");
        self.paths().find(|p| p.ends_with(&needle))
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// Resolve `.` and `..` segments of a forward-slash path.
pub fn normalize_posix_path(path: &str) -> String {
    let mut stack: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                stack.pop();
            }
            _ => stack.push(part),
        }
    }
    stack.join("/")
}

/// Directory part of a forward-slash path, `""` for files at the root.
pub fn parent_dir(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

fn join(dir: &str, rel: &str) -> String {
    if dir.is_empty() {
        normalize_posix_path(rel)
    } else {
        normalize_posix_path(&format!("{dir}/{rel}"))
    }
}

// ---------------------------------------------------------------------------
// Resolvers
// ---------------------------------------------------------------------------

/// Python dotted or relative module to `x.py` or `x/__init__.py`.
///
/// Absolute modules are also probed under `src/`, and `from pkg import mod`
/// falls back to the submodule file when `pkg` itself is not analyzed.
pub fn resolve_python(
    source_path: &str,
    module_name: &str,
    names: &[String],
    index: &FileIndex,
) -> Option<String> {
    if module_name.is_empty() {
        return None;
    }
    let mut bases: Vec<String> = Vec::new();
    if module_name.starts_with('.') {
        let levels = module_name.chars().take_while(|&c| c == '.').count();
        let suffix = &module_name[levels..];
        let mut base_dir = parent_dir(source_path).to_string();
        for _ in 0..levels.saturating_sub(1) {
            base_dir = parent_dir(&base_dir).to_string();
        }
        bases.push(if suffix.is_empty() {
            base_dir
        } else {
            join(&base_dir, &suffix.replace('.', "/"))
        });
    } else {
        let base = module_name.replace('.', "/");
        bases.push(format!("src/{base}"));
        bases.insert(0, base);
    }

    for base in &bases {
        let candidates = [format!("{base}.py"), format!("{base}/__init__.py")];
        if let Some(found) = candidates.into_iter().find(|c| index.contains(c)) {
            return Some(found);
        }
    }
    let first_name = names.first()?;
    bases
        .iter()
        .map(|base| join(base, &format!("{first_name}.py")))
        .find(|c| index.contains(c))
}

/// Java class, static member, or wildcard import by package path suffix.
pub fn resolve_java(module_name: &str, index: &FileIndex) -> Option<String> {
    let module_name = module_name.trim_start_matches("static ").trim();
    if let Some(stripped) = module_name.strip_suffix(".*") {
        let package_dir = stripped.replace('.', "/");
        let needle = format!("/{package_dir}");
        return index
            .dirs()
            .filter(|d| *d == package_dir || d.ends_with(&needle))
            .flat_map(|d| index.files_in_dir(d))
            .find(|p| p.ends_with(".java"))
            .cloned();
    }
    let candidate = format!("{}.java", module_name.replace('.', "/"));
    if let Some(found) = index.find_by_suffix(&candidate) {
        return Some(found.to_string());
    }
    // `import static a.b.C.member;` names a member of class `C`.
    let (owner, _) = module_name.rsplit_once('.')?;
    let candidate = format!("{}.java", owner.replace('.', "/"));
    index.find_by_suffix(&candidate).map(str::to_string)
}

const TS_EXTENSIONS: [&str; 6] = [".ts", ".tsx", ".js", ".jsx", ".mjs", ".cjs"];

/// Relative TypeScript / JavaScript specifier with extension and `index`
/// probing. A `.js` specifier also matches its `.ts` source.
pub fn resolve_typescript(
    source_path: &str,
    module_name: &str,
    index: &FileIndex,
) -> Option<String> {
    if !module_name.starts_with('.') {
        return None;
    }
    let resolved_base = join(parent_dir(source_path), module_name);

    let mut candidates = vec![resolved_base.clone()];
    for ext in TS_EXTENSIONS {
        if let Some(stem) = resolved_base.strip_suffix(ext) {
            candidates.push(format!("{stem}.ts"));
            candidates.push(format!("{stem}.tsx"));
        }
    }
    for ext in TS_EXTENSIONS {
        candidates.push(format!("{resolved_base}{ext}"));
    }
    for ext in TS_EXTENSIONS {
        candidates.push(format!("{resolved_base}/index{ext}"));
    }
    candidates.into_iter().find(|c| index.contains(c))
}

/// Go package import to the first non-test file of the matching directory.
///
/// Relative imports are joined to the importing directory. Module paths are
/// matched by the longest analyzed directory that is a path suffix of the
/// import, since the module root is not known without `go.mod`.
pub fn resolve_go(source_path: &str, module_name: &str, index: &FileIndex) -> Option<String> {
    let dir = if module_name.starts_with('.') {
        join(parent_dir(source_path), module_name)
    } else {
        index
            .dirs()
            .filter(|d| !d.is_empty())
            .filter(|d| module_name == *d || module_name.ends_with(&format!("/{d}")))
            .max_by_key(|d| d.len())?
            .to_string()
    };
    let files = index.files_in_dir(&dir);
    files
        .iter()
        .filter(|p| p.ends_with(".go"))
        .find(|p| !base_name(p).ends_with("_test.go"))
        .or_else(|| files.iter().find(|p| p.ends_with(".go")))
        .cloned()
}
