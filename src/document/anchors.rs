//! Recovery of anchor names from YAML source text.
//!
//! The event parser reports anchors by number only. Anchored nodes arrive in
//! the same order as the anchor tokens appear in the source, so running the
//! `yaml-rust2` scanner over the text and pairing its `Anchor` tokens with the
//! anchored nodes in order restores the names.

use yaml_rust2::scanner::{Scanner, Token, TokenType};

/// Returns the anchor names in the order they appear in `source`.
///
/// Scanning stops at the first scanner error; the caller notices the short
/// list because it no longer matches the number of anchored nodes.
pub(crate) fn scan_anchor_names(source: &str) -> Vec<String> {
    Scanner::new(source.chars())
        .filter_map(|Token(_, token)| match token {
            TokenType::Anchor(name) => Some(name),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_anchors() {
        assert!(scan_anchor_names("name: Alice\nage: 30\n").is_empty());
    }

    #[test]
    fn test_block_anchors_in_order() {
        let yaml = r#"
defaults: &config
  timeout: 30
list:
  - &first one
  - two
other: !!map &tagged
  k: v
"#;
        assert_eq!(scan_anchor_names(yaml), vec!["config", "first", "tagged"]);
    }

    #[test]
    fn test_ampersand_inside_values_is_ignored() {
        let yaml = r#"
url: http://example.com/?a=1&b=2
text: fish &chips
quoted: "not &anchor"
single: 'it''s &fine'
comment: value # &nope
"#;
        assert!(scan_anchor_names(yaml).is_empty());
    }

    #[test]
    fn test_flow_anchors() {
        let yaml = "items: [&a 1, {k: &b 2}, *a]\n";
        assert_eq!(scan_anchor_names(yaml), vec!["a", "b"]);
    }

    #[test]
    fn test_block_scalar_body_is_skipped() {
        let yaml = r#"
script: |
  echo &notanchor
  - &nope
after: &real 1
"#;
        assert_eq!(scan_anchor_names(yaml), vec!["real"]);
    }

    #[test]
    fn test_block_scalar_in_compact_mapping() {
        let yaml = "- k: |\n    body\n  j: &x 1\n- r: *x\n";
        assert_eq!(scan_anchor_names(yaml), vec!["x"]);
    }

    #[test]
    fn test_plain_continuation_line_is_not_an_anchor() {
        let yaml = "a: &real 1\nb: fish\n  &chips\nc: *real\n";
        assert_eq!(scan_anchor_names(yaml), vec!["real"]);
    }

    #[test]
    fn test_multiline_double_quoted() {
        let yaml = "a: \"line one\n  &still quoted\"\nb: &x 2\n";
        assert_eq!(scan_anchor_names(yaml), vec!["x"]);
    }
}
