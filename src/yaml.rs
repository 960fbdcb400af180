//! Restricted YAML-subset parser for `.apr/` configuration files.
//!
//! The on-disk format is deliberately small: flat `key: value` pairs, one
//! level of nesting, and literal block scalars (`key: |`). Parsing is a
//! line classifier over [`LineKind`] tokens rather than a full YAML
//! implementation; anything outside the subset classifies as `Other` and is
//! skipped. Missing files and missing keys yield empty results, never
//! errors, so callers can compose lookups over files that may not exist yet.

use std::path::Path;

/// One classified input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    /// `key: value` (value may be empty).
    Key {
        key: &'a str,
        value: &'a str,
        indent: usize,
    },
    /// `key: |`, the start of a literal block scalar.
    BlockStart { key: &'a str, indent: usize },
    Blank,
    Comment,
    /// Anything outside the subset (list items, flow syntax, tabs).
    Other,
}

/// Classify a single line.
///
/// A key token is `[A-Za-z0-9_-]+` immediately followed by `:` and either
/// end-of-line or a space. Only the first such token counts; a colon inside
/// the value (URLs, timestamps) never starts a new key.
pub fn classify(line: &str) -> LineKind<'_> {
    let indent = line.len() - line.trim_start_matches(' ').len();
    let rest = &line[indent..];

    if rest.trim().is_empty() {
        return LineKind::Blank;
    }
    if rest.starts_with('#') {
        return LineKind::Comment;
    }
    if rest.starts_with('\t') {
        return LineKind::Other;
    }

    let Some(colon) = rest.find(':') else {
        return LineKind::Other;
    };
    let key = &rest[..colon];
    if key.is_empty()
        || !key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return LineKind::Other;
    }
    let after = &rest[colon + 1..];
    if !(after.is_empty() || after.starts_with(' ')) {
        return LineKind::Other;
    }

    let value = after.trim();
    if value == "|" {
        LineKind::BlockStart { key, indent }
    } else {
        LineKind::Key { key, value, indent }
    }
}

/// Strip one layer of matching surrounding quotes from a scalar.
fn strip_quotes(value: &str) -> &str {
    let bytes = value.as_bytes();
    if bytes.len() >= 2 {
        let (first, last) = (bytes[0], bytes[bytes.len() - 1]);
        if first == last && (first == b'"' || first == b'\'') {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Look up a scalar value in parsed text.
///
/// `key` is either a top-level name (`default_workflow`) or a one-level
/// dotted path (`oracle.model`). Returns an empty string when the key is
/// absent. Surrounding quotes are stripped; embedded colons are preserved.
pub fn get_value(key: &str, text: &str) -> String {
    if let Some((section, child)) = key.split_once('.') {
        return get_nested_value(section, child, text);
    }

    for line in text.lines() {
        if let LineKind::Key {
            key: k,
            value,
            indent: 0,
        } = classify(line)
            && k == key
        {
            return strip_quotes(value).to_string();
        }
    }
    String::new()
}

fn get_nested_value(section: &str, child: &str, text: &str) -> String {
    let mut in_section = false;
    for line in text.lines() {
        match classify(line) {
            LineKind::Key { key, value, indent } => {
                if indent == 0 {
                    if in_section {
                        break;
                    }
                    // An empty-valued top-level key opens a mapping section.
                    in_section = key == section && value.is_empty();
                } else if in_section && key == child {
                    return strip_quotes(value).to_string();
                }
            }
            LineKind::BlockStart { indent: 0, .. } | LineKind::Other if in_section => break,
            _ => {}
        }
    }
    String::new()
}

/// Extract a literal block scalar (`key: |`).
///
/// The block runs until the next line whose indentation is ≤ the key's own
/// indentation (the next key at that level) or end of input. Lines are
/// dedented to the block's base indentation; interior indentation deeper
/// than the base is preserved verbatim. Returns an empty string when the key
/// has no block.
pub fn get_block(key: &str, text: &str) -> String {
    let mut lines = text.lines();
    let key_indent = loop {
        let Some(line) = lines.next() else {
            return String::new();
        };
        if let LineKind::BlockStart { key: k, indent } = classify(line)
            && k == key
        {
            break indent;
        }
    };

    let mut collected: Vec<&str> = Vec::new();
    for line in lines {
        let trimmed = line.trim_start_matches(' ');
        if trimmed.is_empty() {
            collected.push("");
            continue;
        }
        let indent = line.len() - trimmed.len();
        if indent <= key_indent {
            break;
        }
        collected.push(line);
    }

    let base = collected
        .iter()
        .filter(|l| !l.is_empty())
        .map(|l| l.len() - l.trim_start_matches(' ').len())
        .min()
        .unwrap_or(0);

    let mut out: Vec<&str> = collected
        .iter()
        .map(|l| if l.is_empty() { "" } else { &l[base..] })
        .collect();
    while out.last() == Some(&"") {
        out.pop();
    }
    out.join("\n")
}

/// Read a file's contents, treating a missing file as empty input.
pub fn load(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap_or_default()
}

/// `get_value` against a file that may not exist.
pub fn get_value_from(key: &str, path: &Path) -> String {
    get_value(key, &load(path))
}

/// `get_block` against a file that may not exist.
pub fn get_block_from(key: &str, path: &Path) -> String {
    get_block(key, &load(path))
}
