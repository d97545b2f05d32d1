//! Test-quality rules.
//!
//! Per-file rules read only the test cases the adapters extracted. The
//! coverage rules also follow each case's `target_function` into the source
//! files the project context maps to the test file.

mod error_paths;
mod mock_scope;
mod return_fields;
mod shallow;

pub use error_paths::ErrorPathCoverage;
pub use mock_scope::MockScope;
pub use return_fields::ReturnTypeVerified;
pub use shallow::NoShallowAssertions;

use crate::context::ProjectContext;
use crate::models::{FuncModel, UnifiedFileModel};

/// The function named `name` in a source file mapped to `test_path`.
/// Methods count; the first source in map order wins.
fn resolve_target<'a>(
    context: &'a ProjectContext,
    test_path: &str,
    name: &str,
) -> Option<(&'a UnifiedFileModel, &'a FuncModel)> {
    context
        .sources_for_test(test_path)
        .iter()
        .filter_map(|path| context.file(path))
        .find_map(|source| {
            source
                .all_functions()
                .find(|f| f.name == name)
                .map(|func| (source, func))
        })
}

/// Lowercase words of a test name: `TestCreate_EmptyID` and
/// `"rejects an empty id"` both split on case changes and punctuation.
fn name_words(name: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        current.extend(c.to_lowercase());
        prev_lower = c.is_lowercase() || c.is_ascii_digit();
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}
