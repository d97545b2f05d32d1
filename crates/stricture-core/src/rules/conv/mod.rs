//! Convention rules: file and export naming, error message shape, test file
//! placement, file headers and required exports.

mod error_format;
mod export_naming;
mod file_header;
mod file_naming;
mod required_exports;
mod test_location;

pub use error_format::ErrorFormat;
pub use export_naming::ExportNaming;
pub use file_header::FileHeader;
pub use file_naming::FileNaming;
pub use required_exports::RequiredExports;
pub use test_location::TestFileLocation;

use std::sync::LazyLock;

use regex::Regex;

pub const STYLE_KEBAB: &str = "kebab-case";
pub const STYLE_SNAKE: &str = "snake_case";
pub const STYLE_CAMEL: &str = "camelCase";
pub const STYLE_PASCAL: &str = "PascalCase";
pub const STYLE_UPPER_SNAKE: &str = "UPPER_SNAKE_CASE";

static KEBAB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)*$").unwrap());
static SNAKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*(_[a-z0-9]+)*$").unwrap());
static CAMEL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z][a-zA-Z0-9]*$").unwrap());
static PASCAL_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Z][a-zA-Z0-9]*$").unwrap());
static UPPER_SNAKE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z][A-Z0-9]*(_[A-Z0-9]+)*$").unwrap());

fn style_pattern(style: &str) -> Option<&'static Regex> {
    match style {
        STYLE_KEBAB => Some(&*KEBAB_RE),
        STYLE_SNAKE => Some(&*SNAKE_RE),
        STYLE_CAMEL => Some(&*CAMEL_RE),
        STYLE_PASCAL => Some(&*PASCAL_RE),
        STYLE_UPPER_SNAKE => Some(&*UPPER_SNAKE_RE),
        _ => None,
    }
}

/// Canonical style name for a configured value, `None` when unknown.
fn normalize_style(raw: &str) -> Option<&'static str> {
    match raw.trim() {
        STYLE_KEBAB => Some(STYLE_KEBAB),
        STYLE_SNAKE => Some(STYLE_SNAKE),
        STYLE_CAMEL => Some(STYLE_CAMEL),
        STYLE_PASCAL => Some(STYLE_PASCAL),
        STYLE_UPPER_SNAKE | "upper_snake_case" | "UPPER_SNAKE" => Some(STYLE_UPPER_SNAKE),
        _ => None,
    }
}

/// Language names folded onto the four adapter families.
pub(crate) fn language_family(language: &str) -> String {
    match language.trim().to_ascii_lowercase().as_str() {
        "golang" => "go".to_string(),
        "tsx" => "typescript".to_string(),
        "jsx" => "javascript".to_string(),
        other => other.to_string(),
    }
}

/// Words of a name, split on `-`, `_`, case changes and letter/digit
/// boundaries, all lowercase.
fn split_words(name: &str) -> Vec<String> {
    for sep in ['-', '_'] {
        if name.contains(sep) {
            return name
                .split(sep)
                .map(str::trim)
                .filter(|w| !w.is_empty())
                .map(str::to_lowercase)
                .collect();
        }
    }
    let chars: Vec<char> = name.chars().collect();
    let mut words = Vec::new();
    let mut start = 0;
    for i in 1..chars.len() {
        let (prev, curr) = (chars[i - 1], chars[i]);
        let boundary = (prev.is_lowercase() && curr.is_uppercase())
            || (prev.is_uppercase()
                && curr.is_uppercase()
                && chars.get(i + 1).is_some_and(|c| c.is_lowercase()))
            || (prev.is_ascii_digit() && curr.is_alphabetic())
            || (prev.is_alphabetic() && curr.is_ascii_digit());
        if boundary {
            words.push(chars[start..i].iter().collect::<String>().to_lowercase());
            start = i;
        }
    }
    if start < chars.len() {
        words.push(chars[start..].iter().collect::<String>().to_lowercase());
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// `name` rewritten in `style`.
pub fn convert_to_style(name: &str, style: &str) -> String {
    let words = split_words(name);
    if words.is_empty() {
        return name.to_string();
    }
    match style {
        STYLE_KEBAB => words.join("-"),
        STYLE_SNAKE => words.join("_"),
        STYLE_UPPER_SNAKE => words.join("_").to_uppercase(),
        STYLE_CAMEL => {
            let mut out = words[0].clone();
            out.extend(words[1..].iter().map(|w| capitalize(w)));
            out
        }
        STYLE_PASCAL => words.iter().map(|w| capitalize(w)).collect(),
        _ => name.to_string(),
    }
}

/// Whether `name` is written in `style`. Unknown styles accept everything.
pub fn matches_style(name: &str, style: &str) -> bool {
    style_pattern(style).map_or(true, |pattern| pattern.is_match(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_words() {
        assert_eq!(split_words("userService"), vec!["user", "service"]);
        assert_eq!(split_words("HTTPClient"), vec!["http", "client"]);
        assert_eq!(split_words("getAPIKey"), vec!["get", "api", "key"]);
        assert_eq!(split_words("v2Handler"), vec!["v", "2", "handler"]);
        assert_eq!(split_words("user-service"), vec!["user", "service"]);
        assert_eq!(split_words("User_Service"), vec!["user", "service"]);
    }

    #[test]
    fn test_convert_to_style() {
        assert_eq!(convert_to_style("userService", STYLE_KEBAB), "user-service");
        assert_eq!(convert_to_style("user-service", STYLE_SNAKE), "user_service");
        assert_eq!(convert_to_style("user_service", STYLE_CAMEL), "userService");
        assert_eq!(convert_to_style("user_service", STYLE_PASCAL), "UserService");
        assert_eq!(convert_to_style("maxRetries", STYLE_UPPER_SNAKE), "MAX_RETRIES");
    }

    #[test]
    fn test_matches_style_tolerates_acronyms() {
        assert!(matches_style("HTTPClient", STYLE_PASCAL));
        assert!(matches_style("getAPIKey", STYLE_CAMEL));
        assert!(matches_style("MAX_RETRIES", STYLE_UPPER_SNAKE));
        assert!(!matches_style("maxRetries", STYLE_UPPER_SNAKE));
        assert!(!matches_style("load_user", STYLE_CAMEL));
        assert!(matches_style("anything", "Train-Case"));
    }

    #[test]
    fn test_normalize_style_aliases() {
        assert_eq!(normalize_style("upper_snake_case"), Some(STYLE_UPPER_SNAKE));
        assert_eq!(normalize_style(" camelCase "), Some(STYLE_CAMEL));
        assert_eq!(normalize_style("SCREAMING"), None);
    }
}
