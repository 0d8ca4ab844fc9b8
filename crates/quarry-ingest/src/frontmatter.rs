//! Leading metadata block parsing.
//!
//! A document may open with a block delimited by `---` markers:
//!
//! ```text
//! ---
//! id: doc-42
//! title: Founders
//! ---
//! Body text...
//! ```

use quarry_core::Metadata;
use serde_json::Value;

/// Delimiter opening and closing the metadata block.
pub const MARKER: &str = "---";

/// Split `text` into its metadata mapping and body.
///
/// Without a leading marker, or without a closing one, the metadata is empty
/// and the body is `text` unchanged.
pub fn parse(text: &str) -> (Metadata, String) {
    let Some(rest) = text.strip_prefix(MARKER) else {
        return (Metadata::new(), text.to_string());
    };
    let Some(end) = rest.find(MARKER) else {
        return (Metadata::new(), text.to_string());
    };

    let block = &rest[..end];
    let body = rest[end + MARKER.len()..].trim();
    (parse_block(block), body.to_string())
}

/// String form of the metadata `id`, if present and non-empty.
pub fn document_id(metadata: &Metadata) -> Option<String> {
    let id = match metadata.get("id")? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

fn parse_block(block: &str) -> Metadata {
    if block.trim().is_empty() {
        return Metadata::new();
    }

    match serde_yaml::from_str::<serde_yaml::Value>(block) {
        Ok(yaml @ serde_yaml::Value::Mapping(_)) => match serde_json::to_value(&yaml) {
            Ok(Value::Object(map)) => map,
            _ => parse_lines(block),
        },
        _ => parse_lines(block),
    }
}

/// `key: value` per line, values kept as strings.
fn parse_lines(block: &str) -> Metadata {
    block
        .lines()
        .filter_map(|line| line.split_once(':'))
        .filter_map(|(key, value)| {
            let key = key.trim();
            (!key.is_empty()).then(|| (key.to_string(), Value::String(value.trim().to_string())))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn no_frontmatter_returns_input_unchanged() {
        let (meta, body) = parse("plain text, no frontmatter");
        assert!(meta.is_empty());
        assert_eq!(body, "plain text, no frontmatter");
    }

    #[test]
    fn yaml_block_is_parsed_and_body_trimmed() {
        let (meta, body) = parse("---\nid: doc-1\ntitle: Founders\ntags: [a, b]\n---\n\n  Body here.  \n");
        assert_eq!(meta.get("id"), Some(&json!("doc-1")));
        assert_eq!(meta.get("tags"), Some(&json!(["a", "b"])));
        assert_eq!(body, "Body here.");
    }

    #[test]
    fn metadata_keeps_source_order() {
        let (meta, _) = parse("---\nzeta: 1\nalpha: 2\n---\nbody");
        let keys: Vec<&str> = meta.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }

    #[test]
    fn unclosed_block_is_not_frontmatter() {
        let input = "---\nid: doc-1\nno closing marker";
        let (meta, body) = parse(input);
        assert!(meta.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn leading_whitespace_means_no_frontmatter() {
        let input = "\n---\nid: x\n---\nbody";
        let (meta, body) = parse(input);
        assert!(meta.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn empty_block_gives_empty_metadata() {
        let (meta, body) = parse("---\n---\nbody");
        assert!(meta.is_empty());
        assert_eq!(body, "body");
    }

    #[test]
    fn invalid_yaml_falls_back_to_lines() {
        let (meta, body) = parse("---\nid: doc-7\ntitle: [unclosed\n---\nbody");
        assert_eq!(meta.get("id"), Some(&json!("doc-7")));
        assert_eq!(meta.get("title"), Some(&json!("[unclosed")));
        assert_eq!(body, "body");
    }

    #[test]
    fn document_id_accepts_strings_and_numbers() {
        let (meta, _) = parse("---\nid: 42\n---\nbody");
        assert_eq!(document_id(&meta), Some("42".to_string()));

        let (meta, _) = parse("---\nid: \"  \"\n---\nbody");
        assert_eq!(document_id(&meta), None);

        let (meta, _) = parse("---\ntitle: no id\n---\nbody");
        assert_eq!(document_id(&meta), None);
    }
}
