//! Tolerant parsing of the model's categorization reply.
//!
//! The reply grammar is `Category: <name>` then `Confidence: <decimal>`,
//! but models separate the two with either a comma or a newline. One
//! pattern accepts both layouts; anything else is a parse failure so the
//! caller can record an auditable error instead of guessing.

use std::sync::LazyLock;

use regex::Regex;

/// Captures the name between `Category:` and the next comma/newline, then a
/// decimal after `Confidence:`. Both literal tokens must appear in this
/// order.
static RESPONSE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"Category:\s*(?P<name>[^,\n]+?)\s*[,\n]\s*Confidence:\s*(?P<confidence>[0-9]+(?:\.[0-9]+)?)",
    )
    .unwrap_or_else(|error| panic!("response pattern should compile: {error}"))
});

/// A category suggestion extracted from the model reply.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedCategorization {
    /// Suggested category name, trimmed.
    pub category_name: String,
    /// Model-reported confidence. Parsed as-is; out-of-range values are not
    /// a parse failure and are left for the caller to judge.
    pub confidence: f64,
}

/// Extracts a category name and confidence from the model's free-text
/// reply, or `None` when the reply does not match the expected grammar.
#[must_use]
pub fn parse_categorization(text: &str) -> Option<ParsedCategorization> {
    let captures = RESPONSE_PATTERN.captures(text)?;
    let category_name = captures.name("name")?.as_str().trim().to_owned();
    let confidence = captures.name("confidence")?.as_str().parse::<f64>().ok()?;

    Some(ParsedCategorization {
        category_name,
        confidence,
    })
}
