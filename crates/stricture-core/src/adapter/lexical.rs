//! Line-oriented lexical helpers shared by every language adapter.
//!
//! None of these functions understand a grammar. They blank comments, count
//! braces outside of quotes, find the end of brace- or indent-delimited
//! blocks, and scan call sites with a single regex.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ErrorExit, ParamModel};

// ---------------------------------------------------------------------------
// Comment stripping
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentStyle {
    /// `//` line comments and `/* */` block comments.
    CFamily,
    /// `#` line comments.
    Hash,
}

/// Replace comment text with spaces, keeping newlines so line numbers hold.
///
/// String literals are skipped so `"http://x"` survives. Single and double
/// quoted strings end at the first unescaped quote or at a newline; backtick
/// strings (C family) and triple-quoted strings (hash style) may span lines.
pub fn strip_comments(source: &str, style: CommentStyle) -> String {
    let chars: Vec<char> = source.chars().collect();
    let mut out = String::with_capacity(source.len());
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match style {
            CommentStyle::CFamily if c == '/' && next == Some('/') => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
                continue;
            }
            CommentStyle::CFamily if c == '/' && next == Some('*') => {
                out.push_str("  ");
                i += 2;
                while i < chars.len() {
                    if chars[i] == '*' && chars.get(i + 1) == Some(&'/') {
                        out.push_str("  ");
                        i += 2;
                        break;
                    }
                    out.push(if chars[i] == '\n' { '\n' } else { ' ' });
                    i += 1;
                }
                continue;
            }
            CommentStyle::Hash if c == '#' => {
                while i < chars.len() && chars[i] != '\n' {
                    out.push(' ');
                    i += 1;
                }
                continue;
            }
            _ => {}
        }

        if c == '"' || c == '\'' || (c == '`' && style == CommentStyle::CFamily) {
            let triple = style == CommentStyle::Hash
                && next == Some(c)
                && chars.get(i + 2) == Some(&c);
            let end = if triple {
                skip_triple_string(&chars, i, c)
            } else {
                skip_string(&chars, i, c, c == '`')
            };
            out.extend(&chars[i..end]);
            i = end;
            continue;
        }

        out.push(c);
        i += 1;
    }
    out
}

/// Index just past the string literal starting at `start`.
fn skip_string(chars: &[char], start: usize, quote: char, multiline: bool) -> usize {
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' if quote != '`' => i += 2,
            '\n' if !multiline => return i,
            ch if ch == quote => return i + 1,
            _ => i += 1,
        }
    }
    chars.len()
}

fn skip_triple_string(chars: &[char], start: usize, quote: char) -> usize {
    let mut i = start + 3;
    while i < chars.len() {
        if chars[i] == '\\' {
            i += 2;
            continue;
        }
        if chars[i] == quote && chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote)
        {
            return i + 3;
        }
        i += 1;
    }
    chars.len()
}

// ---------------------------------------------------------------------------
// Block detection
// ---------------------------------------------------------------------------

/// Visit every `{` and `}` on the line that is not inside a quoted literal.
fn for_each_brace(line: &str, mut visit: impl FnMut(char)) {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for ch in line.chars() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '{' | '}' => visit(ch),
            _ => {}
        }
    }
}

/// Net brace depth change of one line, ignoring braces in quotes.
pub fn brace_delta(line: &str) -> i32 {
    let mut delta = 0;
    for_each_brace(line, |ch| {
        if ch == '{' {
            delta += 1;
        } else {
            delta -= 1;
        }
    });
    delta
}

/// Zero-based index of the line that closes the brace block opened at or
/// after `start`.
///
/// A declaration with no body (terminated by `;` before any `{`, or with no
/// `{` within `lookahead` lines) ends on its own line.
pub fn brace_block_end(lines: &[&str], start: usize, lookahead: usize) -> usize {
    let mut depth = 0i32;
    let mut opened = false;
    for (idx, line) in lines.iter().enumerate().skip(start) {
        let mut closed_at_zero = false;
        for_each_brace(line, |ch| {
            if closed_at_zero {
                return;
            }
            if ch == '{' {
                depth += 1;
                opened = true;
            } else {
                depth -= 1;
                if opened && depth <= 0 {
                    closed_at_zero = true;
                }
            }
        });
        if closed_at_zero {
            return idx;
        }
        if !opened && (line.trim_end().ends_with(';') || idx - start >= lookahead) {
            return start;
        }
    }
    lines.len().saturating_sub(1).max(start)
}

/// Leading whitespace width, counting a tab as four columns.
pub fn indent_of(line: &str) -> usize {
    let mut width = 0;
    for ch in line.chars() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => break,
        }
    }
    width
}

/// Zero-based index of the last line of the indentation block whose header is
/// at `start`. Blank lines never end a block.
pub fn indent_block_end(lines: &[&str], start: usize) -> usize {
    let Some(header) = lines.get(start) else {
        return start;
    };
    let base = indent_of(header);
    let mut last = start;
    let mut paren_depth = paren_delta(header);
    for (idx, line) in lines.iter().enumerate().skip(start + 1) {
        if line.trim().is_empty() {
            continue;
        }
        // Continuation lines of a multi-line signature belong to the header.
        if paren_depth > 0 {
            paren_depth += paren_delta(line);
            last = idx;
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        last = idx;
    }
    last
}

fn paren_delta(line: &str) -> i32 {
    line.chars().fold(0, |acc, ch| match ch {
        '(' | '[' => acc + 1,
        ')' | ']' => acc - 1,
        _ => acc,
    })
}

// ---------------------------------------------------------------------------
// Call sites and complexity
// ---------------------------------------------------------------------------

static CALL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:([A-Za-z_][A-Za-z0-9_]*)\s*\.\s*)?([A-Za-z_][A-Za-z0-9_]*)\s*\(").unwrap()
});

static BRANCH_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:if|elif|for|while|case|catch|except)\b|&&|\|\|").unwrap()
});

static PY_BOOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:and|or)\b").unwrap());

/// Keywords that look like calls but are not.
fn is_call_keyword(name: &str) -> bool {
    matches!(
        name,
        "if" | "elif"
            | "for"
            | "while"
            | "switch"
            | "return"
            | "new"
            | "function"
            | "func"
            | "def"
            | "class"
            | "catch"
            | "except"
            | "with"
            | "not"
            | "and"
            | "or"
            | "in"
            | "await"
            | "yield"
            | "typeof"
            | "sizeof"
            | "throw"
            | "raise"
            | "assert"
            | "lambda"
            | "super"
    )
}

/// Called symbols in a body, first occurrence order, `receiver.name` when a
/// receiver is written. The first line is a declaration and is skipped.
pub fn extract_calls(body: &[&str]) -> Vec<String> {
    let mut calls: Vec<String> = Vec::new();
    for line in body.iter().skip(1) {
        for caps in CALL_RE.captures_iter(line) {
            let Some(name) = caps.get(2) else { continue };
            let name = name.as_str();
            if is_call_keyword(name) {
                continue;
            }
            let match_start = caps.get(0).map(|m| m.start()).unwrap_or(0);
            let prefix = line[..match_start].trim_end();
            if prefix.ends_with("def")
                || prefix.ends_with("function")
                || prefix.ends_with("func")
                || prefix.ends_with("class")
                || prefix.ends_with("new")
            {
                continue;
            }
            let symbol = match caps.get(1) {
                Some(receiver) => format!("{}.{}", receiver.as_str(), name),
                None => name.to_string(),
            };
            if !calls.contains(&symbol) {
                calls.push(symbol);
            }
        }
    }
    calls
}

static THROW_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\b(throw|raise)\b\s*(?:new\s+)?([A-Za-z_][A-Za-z0-9_.]*)?\s*(?:\(\s*["'`]([^"'`]*)["'`])?"#)
        .unwrap()
});

/// `throw` / `raise` sites in a body. The message is the first string
/// argument, else the exception type.
pub fn throw_exits(body: &[&str], first_idx: usize) -> Vec<ErrorExit> {
    let mut exits = Vec::new();
    for (offset, line) in body.iter().enumerate() {
        let Some(caps) = THROW_RE.captures(line) else {
            continue;
        };
        let message = caps
            .get(3)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str().to_string());
        exits.push(ErrorExit {
            kind: caps[1].to_string(),
            message,
            start_line: first_idx + offset + 1,
        });
    }
    exits
}

/// Cyclomatic complexity estimate: 1 + branch points in the body.
pub fn complexity(body: &[&str], python: bool) -> usize {
    body.iter()
        .map(|line| {
            let branches = BRANCH_RE.find_iter(line).count();
            if python {
                branches + PY_BOOL_RE.find_iter(line).count()
            } else {
                branches
            }
        })
        .sum::<usize>()
        + 1
}

// ---------------------------------------------------------------------------
// Parameters and type names
// ---------------------------------------------------------------------------

/// Split on `sep` outside of `()`, `[]`, `{}` and `<>` nesting.
pub fn split_top_level(raw: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut begin = 0;
    for (idx, ch) in raw.char_indices() {
        match ch {
            '(' | '[' | '{' | '<' => depth += 1,
            ')' | ']' | '}' | '>' => depth -= 1,
            c if c == sep && depth <= 0 => {
                parts.push(&raw[begin..idx]);
                begin = idx + c.len_utf8();
            }
            _ => {}
        }
    }
    parts.push(&raw[begin..]);
    parts
}

/// Parse a raw parameter list into named, optionally typed parameters.
///
/// - `typescript` / `python`: `name: Type = default`
/// - `go`: `name Type`, with grouped names (`a, b int`) sharing the type
/// - anything else (Java): the last token is the name
pub fn build_parameters(params_raw: &str, language: &str) -> Vec<ParamModel> {
    let trimmed = params_raw.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    let mut params: Vec<ParamModel> = Vec::new();
    for chunk in split_top_level(trimmed, ',') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        let (name, type_) = match language {
            "typescript" | "javascript" | "python" => {
                let without_default = split_top_level(chunk, '=')[0].trim();
                match without_default.split_once(':') {
                    Some((n, t)) => (n.trim().to_string(), normalize_type_name(Some(t))),
                    None => (without_default.to_string(), None),
                }
            }
            "go" => {
                let mut parts = chunk.split_whitespace();
                let Some(first) = parts.next() else { continue };
                let rest: Vec<&str> = parts.collect();
                let t = if rest.is_empty() {
                    None
                } else {
                    Some(rest.join(" "))
                };
                (first.to_string(), t)
            }
            _ => {
                let parts: Vec<&str> = chunk
                    .split_whitespace()
                    .filter(|p| !p.starts_with('@') && *p != "final")
                    .collect();
                let Some((last, head)) = parts.split_last() else {
                    continue;
                };
                let t = if head.is_empty() {
                    None
                } else {
                    Some(head.join(" "))
                };
                (last.to_string(), t)
            }
        };
        let name = name
            .trim_start_matches("...")
            .trim_start_matches('*')
            .trim_end_matches('?')
            .replace("...", "");
        if name.is_empty() || (language == "python" && (name == "self" || name == "cls")) {
            continue;
        }
        params.push(ParamModel { name, type_ });
    }

    if language == "go" {
        let mut carried: Option<String> = None;
        for param in params.iter_mut().rev() {
            match &param.type_ {
                Some(t) => carried = Some(t.clone()),
                None => param.type_ = carried.clone(),
            }
        }
    }
    params
}

/// Normalize a type name: trim whitespace and trailing semicolons or braces.
/// Returns `None` if the result is empty or the input is `None`.
pub fn normalize_type_name(type_name: Option<&str>) -> Option<String> {
    let raw = type_name?;
    let normalized = raw.trim().trim_end_matches(['{', ';']).trim();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Split a return clause such as `(int, error)` or `Promise<User>` into
/// individual return types.
pub fn split_returns(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = normalize_type_name(raw) else {
        return Vec::new();
    };
    let inner = raw
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(&raw);
    split_top_level(inner, ',')
        .into_iter()
        .filter_map(|part| {
            let part = part.trim();
            // Named Go results: `(n int, err error)`.
            let type_part = match part.split_once(' ') {
                Some((name, t)) if is_identifier(name) && name != "chan" => t.trim(),
                _ => part,
            };
            normalize_type_name(Some(type_part))
        })
        .collect()
}

fn is_identifier(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| c.is_alphanumeric() || c == '_')
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

/// File name component of a forward-slash path.
pub fn base_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Lowercased extension including the dot, or `""`.
pub fn extension_of(path: &str) -> String {
    let name = base_name(path);
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx..].to_ascii_lowercase(),
        _ => String::new(),
    }
}

/// First quoted literal on the line, without its quotes.
pub fn first_quoted(line: &str) -> Option<&str> {
    let start = line.find(['"', '\'', '`'])?;
    let quote = line[start..].chars().next()?;
    let rest = &line[start + 1..];
    let end = rest.find(quote)?;
    Some(&rest[..end])
}
