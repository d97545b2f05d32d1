//! Architecture rules: dependency cycles, layering, module boundaries and
//! file size.

mod boundaries;
mod cycles;
mod file_lines;
mod layers;

pub use boundaries::{ImportBoundary, ModuleBoundary};
pub use cycles::NoCircularDeps;
pub use file_lines::MaxFileLines;
pub use layers::{DependencyDirection, LayerViolation};

use crate::context::ProjectContext;
use crate::models::UnifiedFileModel;

/// Edges from `file` to other analyzed files with the line of the import
/// that produced each one.
fn file_edges<'a>(
    file: &'a UnifiedFileModel,
    context: &'a ProjectContext,
) -> impl Iterator<Item = (&'a str, usize)> + 'a {
    context
        .file_dependencies(&file.path)
        .map(move |target| (target, context.import_line(&file.path, target).unwrap_or(1)))
}

/// Directory segments of a forward-slash path, without the file name.
fn dir_segments(path: &str) -> Vec<&str> {
    let mut segments: Vec<&str> = path.split('/').collect();
    segments.pop();
    segments
}

/// Directory that holds `module`'s files: the path up to the segment named
/// after the module, else the deepest directory shared by all members.
fn module_dir(context: &ProjectContext, module: &str, path: &str) -> String {
    let dirs = dir_segments(path);
    if let Some(pos) = dirs.iter().position(|d| *d == module) {
        return dirs[..=pos].join("/");
    }
    let members = context
        .module_boundaries()
        .get(module)
        .map(Vec::as_slice)
        .unwrap_or(&[]);
    let mut common: Vec<&str> = dirs;
    for member in members {
        let other = dir_segments(member);
        let shared = common
            .iter()
            .zip(other.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }
    common.join("/")
}

/// `path` relative to `dir`, or `path` itself when it is not below `dir`.
fn relative_to<'a>(path: &'a str, dir: &str) -> &'a str {
    if dir.is_empty() {
        return path;
    }
    path.strip_prefix(dir)
        .and_then(|rest| rest.strip_prefix('/'))
        .unwrap_or(path)
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::BTreeMap;

    use crate::adapter::{AdapterConfig, AdapterRegistry};
    use crate::context::{ProjectContext, ProjectContextBuilder};

    pub fn context(files: &[(&str, &str)]) -> ProjectContext {
        context_with_modules(files, BTreeMap::new())
    }

    pub fn context_with_modules(
        files: &[(&str, &str)],
        modules: BTreeMap<String, Vec<String>>,
    ) -> ProjectContext {
        let registry = AdapterRegistry::with_defaults();
        let models = files
            .iter()
            .map(|(path, src)| {
                registry
                    .parse(path, src.as_bytes(), &AdapterConfig::default())
                    .unwrap()
            })
            .collect();
        ProjectContextBuilder::new(&registry)
            .with_declared_modules(modules)
            .build(models)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::context;
    use super::*;

    #[test]
    fn test_module_dir_by_segment_and_common_prefix() {
        let ctx = context(&[
            ("src/billing/invoice.ts", ""),
            ("src/billing/internal/store.ts", ""),
        ]);
        assert_eq!(
            module_dir(&ctx, "billing", "src/billing/internal/store.ts"),
            "src/billing"
        );
        assert_eq!(module_dir(&ctx, "core", "a/b/c.ts"), "a/b");
        assert_eq!(relative_to("src/billing/internal/store.ts", "src/billing"), "internal/store.ts");
        assert_eq!(relative_to("other/x.ts", "src/billing"), "other/x.ts");
    }
}
