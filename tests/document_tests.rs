//! Loading YAML text into the document arena.

use yt::document::{Document, NodeKind, ParseError, ScalarValue, YamlNumber};

#[test]
fn test_typed_scalars() {
    let doc = Document::parse("i: 42\nf: 1.5\nb: true\nn: null\ns: hello\nq: '42'\n").unwrap();
    let typed = |key: &str| {
        let id = doc.mapping_get(doc.root(), key).unwrap();
        let node = doc.get(id).unwrap();
        node.as_scalar().unwrap().typed(node.tag())
    };
    assert_eq!(typed("i"), ScalarValue::Number(YamlNumber::Integer(42)));
    assert_eq!(typed("f"), ScalarValue::Number(YamlNumber::Float(1.5)));
    assert_eq!(typed("b"), ScalarValue::Boolean(true));
    assert_eq!(typed("n"), ScalarValue::Null);
    assert_eq!(typed("s"), ScalarValue::String("hello".to_string()));
    assert_eq!(typed("q"), ScalarValue::String("42".to_string()));
}

#[test]
fn test_mapping_order_is_preserved() {
    let doc = Document::parse("zeta: 1\nalpha: 2\nmid: 3\n").unwrap();
    let keys: Vec<&str> = match doc.get(doc.root()).unwrap().kind() {
        NodeKind::Mapping(pairs) => pairs.iter().filter_map(|(k, _)| doc.key_text(*k)).collect(),
        other => panic!("Expected mapping, got {:?}", other),
    };
    assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
}

#[test]
fn test_multi_document_stream() {
    let docs = Document::parse_all("---\nname: first\n---\nname: second\n...\n").unwrap();
    assert_eq!(docs.len(), 2);
    let names: Vec<&str> = docs
        .iter()
        .map(|doc| {
            let id = doc.mapping_get(doc.root(), "name").unwrap();
            doc.scalar(id).unwrap().value()
        })
        .collect();
    assert_eq!(names, vec!["first", "second"]);
}

#[test]
fn test_parse_takes_first_document() {
    let doc = Document::parse("a: 1\n---\nb: 2\n").unwrap();
    assert!(doc.mapping_get(doc.root(), "a").is_some());
    assert!(doc.mapping_get(doc.root(), "b").is_none());
}

#[test]
fn test_empty_input() {
    let doc = Document::parse("").unwrap();
    assert_eq!(doc.len(), 1);
    let root = doc.get(doc.root()).unwrap();
    assert_eq!(root.as_scalar().unwrap().typed(root.tag()), ScalarValue::Null);
}

#[test]
fn test_aliases_share_their_target() {
    let doc = Document::parse("base: &b\n  port: 80\ncopy: *b\n").unwrap();
    let base = doc.mapping_get(doc.root(), "base").unwrap();
    let copy = doc.mapping_get(doc.root(), "copy").unwrap();
    assert_ne!(base, copy);
    assert_eq!(doc.get(base).unwrap().anchor(), Some("b"));
    assert!(matches!(doc.get(copy).unwrap().kind(), NodeKind::Alias(target) if *target == base));
    assert_eq!(doc.resolve(copy), Some(base));
    assert!(doc.subtree_eq(base, &doc, copy));
}

#[test]
fn test_recursive_anchor() {
    let doc = Document::parse("node: &n\n  next: *n\n").unwrap();
    let node = doc.mapping_get(doc.root(), "node").unwrap();
    let next = doc.mapping_get(node, "next").unwrap();
    assert_eq!(doc.resolve(next), Some(node));
    assert!(doc.subtree_eq(node, &doc, next));
}

#[test]
fn test_undefined_alias() {
    match Document::parse("a: 1\nb: *missing\n").unwrap_err() {
        ParseError::Syntax { line, .. } => assert_eq!(line, 2),
        other => panic!("Expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_duplicate_keys() {
    let err = Document::parse("a: 1\nb:\n  c: 1\n  c: 2\n").unwrap_err();
    assert_eq!(
        err,
        ParseError::DuplicateKey {
            key: "c".to_string(),
            path: "$['b']".to_string(),
            line: 4,
            column: 2,
            index: 17,
        }
    );
    assert!(err.to_string().contains("'c'"));
    assert!(err.to_string().contains("line 4"));
}

#[test]
fn test_distinct_key_types() {
    let doc = Document::parse("true: a\n'true': b\n").unwrap();
    assert_eq!(doc.children(doc.root()).len(), 2);
}

#[test]
fn test_syntax_error_location() {
    let err = Document::parse("key: [1, 2\nother: 3\n").unwrap_err();
    match err {
        ParseError::Syntax { line, .. } => assert!(line >= 1),
        other => panic!("Expected syntax error, got {:?}", other),
    }
}

#[test]
fn test_subtree_eq_ignores_style() {
    let a = Document::parse("x: [1, 'two', {k: v}]\n").unwrap();
    let b = Document::parse("x:\n  - 1\n  - \"two\"\n  - k: v\n").unwrap();
    assert!(a.subtree_eq(a.root(), &b, b.root()));

    let c = Document::parse("x: [1, '2', {k: v}]\n").unwrap();
    assert!(!a.subtree_eq(a.root(), &c, c.root()));
}
