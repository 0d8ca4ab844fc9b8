//! Text sanitizer applied to untrusted strings before they reach a write path.
//!
//! The sanitizer lowers the chance that a crafted string survives into a
//! downstream consumer. It is not an injection-proof escape mechanism; values
//! still travel to the graph as query parameters, never inside a template.
//!
//! Processing order is fixed:
//! 1. truncate to [`MAX_SANITIZED_CHARS`] characters
//! 2. drop Unicode control characters
//! 3. replace every suspicious literal with a single space, one literal at a
//!    time in table order, so later literals see the output of earlier ones
//! 4. collapse whitespace runs and trim

use std::sync::LazyLock;

use aho_corasick::{AhoCorasick, MatchKind};

/// Upper bound on sanitizer output, in characters.
pub const MAX_SANITIZED_CHARS: usize = 4096;

/// Literal substrings replaced by a space. Matching is case-sensitive.
///
/// No entry contains whitespace: a replacement can never splice two halves of
/// the input into a new match, which keeps [`sanitize`] idempotent. For the
/// same reason a literal absent from the input stays absent through every
/// replacement.
pub const SUSPICIOUS_LITERALS: &[&str] = &[
    // Cypher clauses and procedure namespaces that mutate or escape the graph
    "MATCH",
    "MERGE",
    "CREATE",
    "DETACH",
    "DELETE",
    "REMOVE",
    "SET",
    "DROP",
    "CALL",
    "LOAD",
    "FOREACH",
    "apoc.",
    "dbms.",
    // SQL
    "SELECT",
    "INSERT",
    "UPDATE",
    "UNION",
    "TABLE",
    "ALTER",
    "TRUNCATE",
    "EXEC",
    // comments and statement terminators
    "--",
    "/*",
    "*/",
    "//",
    ";",
    // script tags
    "<script",
    "</script",
    // scripting calls
    "javascript:",
    "eval(",
    "setTimeout(",
    "setInterval(",
    "Function(",
];

/// Finds which literals occur at all. Overlapping search, so a literal hidden
/// inside another match is still reported.
static SUSPICIOUS_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::builder()
        .match_kind(MatchKind::Standard)
        .build(SUSPICIOUS_LITERALS)
        .expect("suspicious literal table")
});

/// Sanitize a piece of text. Pure and total.
pub fn sanitize(text: &str) -> String {
    let mut cleaned: String = text
        .chars()
        .take(MAX_SANITIZED_CHARS)
        .filter(|c| !c.is_control())
        .collect();

    let mut present = vec![false; SUSPICIOUS_LITERALS.len()];
    for m in SUSPICIOUS_MATCHER.find_overlapping_iter(&cleaned) {
        present[m.pattern().as_usize()] = true;
    }
    for (literal, _) in SUSPICIOUS_LITERALS
        .iter()
        .zip(present)
        .filter(|(_, present)| *present)
    {
        cleaned = cleaned.replace(literal, " ");
    }

    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sanitize a loosely typed value. Anything that is not a string yields `""`.
pub fn sanitize_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => sanitize(s),
        _ => String::new(),
    }
}
