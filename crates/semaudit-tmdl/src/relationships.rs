//! `relationships.tmdl` parsing
//!
//! The file is a flat list of `relationship <id>` blocks, each carrying
//! `fromColumn`, `toColumn` and optional cardinality / `isActive` properties.

use regex::Regex;
use semaudit_core::{RelationType, Relationship};
use std::sync::LazyLock;

static BLOCK_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*relationship\s+(\S+)").expect("valid regex"));
static FROM_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*fromColumn:\s*(.+?)\s*$").expect("valid regex"));
static TO_COLUMN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*toColumn:\s*(.+?)\s*$").expect("valid regex"));
static FROM_CARDINALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"fromCardinality:\s*(\w+)").expect("valid regex"));
static TO_CARDINALITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"toCardinality:\s*(\w+)").expect("valid regex"));
static IS_ACTIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)isActive:\s*(false|true)").expect("valid regex"));

/// Result of parsing a relationships file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationshipBlocks {
    /// Relationships in file order
    pub relationships: Vec<Relationship>,

    /// Ids of blocks missing `fromColumn` or `toColumn`
    pub incomplete: Vec<String>,
}

/// Parse the content of a relationships file
pub fn parse_relationships(content: &str) -> RelationshipBlocks {
    let mut result = RelationshipBlocks::default();

    let headers: Vec<_> = BLOCK_HEADER.captures_iter(content).collect();

    for (i, header) in headers.iter().enumerate() {
        let (Some(whole), Some(id)) = (header.get(0), header.get(1)) else {
            continue;
        };

        let end = headers
            .get(i + 1)
            .and_then(|next| next.get(0))
            .map(|m| m.start())
            .unwrap_or(content.len());
        let block = &content[whole.end()..end];

        match parse_block(block) {
            Some(relationship) => result.relationships.push(relationship),
            None => result.incomplete.push(id.as_str().to_string()),
        }
    }

    result
}

fn parse_block(block: &str) -> Option<Relationship> {
    let from = FROM_COLUMN.captures(block)?.get(1)?.as_str();
    let to = TO_COLUMN.captures(block)?.get(1)?.as_str();

    let (from_table, from_column) = split_qualified_ref(from);
    let (to_table, to_column) = split_qualified_ref(to);

    let from_card = FROM_CARDINALITY
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());
    let to_card = TO_CARDINALITY
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str());

    let active = IS_ACTIVE
        .captures(block)
        .and_then(|c| c.get(1))
        .map(|m| !m.as_str().eq_ignore_ascii_case("false"))
        .unwrap_or(true);

    Some(Relationship {
        from_table,
        from_column,
        to_table,
        to_column,
        relation_type: RelationType::from_cardinality(from_card, to_card),
        active,
    })
}

/// Split a qualified column reference into `(table, column)`.
///
/// The split happens at the last dot outside single quotes, so
/// `'Sales Data'.'Unit.Price'` yields `("Sales Data", "Unit.Price")`.
/// A reference without a dot yields the column `Unknown`.
pub fn split_qualified_ref(reference: &str) -> (String, String) {
    let reference = reference.trim();

    let mut in_quotes = false;
    let mut last_dot = None;
    for (idx, ch) in reference.char_indices() {
        match ch {
            '\'' => in_quotes = !in_quotes,
            '.' if !in_quotes => last_dot = Some(idx),
            _ => {}
        }
    }

    match last_dot {
        Some(idx) => (
            clean_identifier(&reference[..idx]),
            clean_identifier(&reference[idx + 1..]),
        ),
        None => (clean_identifier(reference), "Unknown".to_string()),
    }
}

/// Trim whitespace and quoting from a TMDL identifier
pub(crate) fn clean_identifier(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(|c| c == '\'' || c == '"').trim();
    trimmed.replace("''", "'")
}
