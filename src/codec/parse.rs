// src/codec/parse.rs

use std::sync::LazyLock;

use regex::Regex;

/// Grouping punctuation dropped from every line.
static PARENS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[()]").expect("valid regex"));

/// Leading annotation such as `player: `.
static LABEL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^.*: ").expect("valid regex"));

/// Field separator: a comma, optionally followed by whitespace.
static SEPARATOR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r",\s*").expect("valid regex"));

/// One non-empty line of a descriptor, split into raw tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DescriptorRow {
    /// 1-based line number in the source text.
    pub line: usize,
    pub fields: Vec<String>,
}

/// Parsed form of a descriptor file: rows of raw tokens, in source order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DescriptorRecord {
    pub rows: Vec<DescriptorRow>,
}

/// Split descriptor text into rows of tokens.
///
/// Parsing never fails; whether the tokens are numbers is decided when
/// encoding.
pub fn parse_descriptor(content: &str) -> DescriptorRecord {
    let rows = content
        .split('\n')
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| DescriptorRow {
            line: idx + 1,
            fields: split_fields(line),
        })
        .collect();

    DescriptorRecord { rows }
}

fn split_fields(line: &str) -> Vec<String> {
    let line = line.trim_end_matches('\r');
    let without_parens = PARENS.replace_all(line, "");
    let cleaned = LABEL.replace(&without_parens, "");

    SEPARATOR
        .split(cleaned.trim())
        .map(|t| t.trim().to_string())
        .collect()
}
