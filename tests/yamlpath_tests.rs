//! End-to-end query tests: parse a document, compile an expression,
//! evaluate it and inspect the matches.

use yt::document::Document;
use yt::yamlpath::{self, Evaluator, MatchSet, Parser, YamlPathError};

const STORE: &str = r#"
store:
  book:
    - category: reference
      author: Nigel Rees
      title: Sayings of the Century
      price: 8.95
    - category: fiction
      author: Evelyn Waugh
      title: Sword of Honour
      price: 12.99
    - category: fiction
      author: Herman Melville
      title: Moby Dick
      isbn: 0-553-21311-3
      price: 8.99
    - category: fiction
      author: J. R. R. Tolkien
      title: The Lord of the Rings
      isbn: 0-395-19395-8
      price: 22.99
  bicycle:
    color: red
    price: 19.95
expensive: 10
"#;

/// Scalar text of every match, in order.
fn texts(doc: &Document, matches: &MatchSet) -> Vec<String> {
    matches
        .iter()
        .map(|m| {
            doc.scalar(m.node)
                .map(|s| s.value().to_string())
                .unwrap_or_else(|| "<collection>".to_string())
        })
        .collect()
}

fn run(yaml: &str, expr: &str) -> Vec<String> {
    let doc = Document::parse(yaml).unwrap();
    let matches = yamlpath::find(&doc, expr).unwrap();
    texts(&doc, &matches)
}

/// `$` selects exactly the root.
#[test]
fn test_root_only() {
    let doc = Document::parse(STORE).unwrap();
    let matches = yamlpath::find(&doc, "$").unwrap();
    assert_eq!(matches.nodes(), vec![doc.root()]);
}

/// `$.*` yields the mapping's values in key order.
#[test]
fn test_wildcard_order() {
    assert_eq!(run("a: 1\nb: 2\nc: 3\n", "$.*"), vec!["1", "2", "3"]);
}

/// Every author, via child, wildcard and recursive descent.
#[test]
fn test_all_authors() {
    let expected = vec![
        "Nigel Rees",
        "Evelyn Waugh",
        "Herman Melville",
        "J. R. R. Tolkien",
    ];
    assert_eq!(run(STORE, "$.store.book[*].author"), expected);
    assert_eq!(run(STORE, "$..author"), expected);
}

/// `$..x` reports every `x` value once, in pre-order.
#[test]
fn test_recursive_descent_preorder() {
    let yaml = "x: 1\na:\n  x: 2\n  b:\n    - x: 3\n    - y: {x: 4}\n";
    assert_eq!(run(yaml, "$..x"), vec!["1", "2", "3", "4"]);
}

/// Negative indices count from the end; out of range selects nothing.
#[test]
fn test_index_bounds() {
    assert_eq!(run("[10, 20, 30]", "$[-1]"), vec!["30"]);
    assert_eq!(run("[10, 20, 30]", "$[0]"), vec!["10"]);
    assert!(run("[10, 20, 30]", "$[-5]").is_empty());
    assert!(run("[10, 20, 30]", "$[3]").is_empty());
}

/// Slices follow Python semantics.
#[test]
fn test_slices() {
    let yaml = "[0, 1, 2, 3, 4]";
    assert_eq!(run(yaml, "$[1:4]"), vec!["1", "2", "3"]);
    assert_eq!(run(yaml, "$[::2]"), vec!["0", "2", "4"]);
    assert_eq!(run(yaml, "$[-2:]"), vec!["3", "4"]);
    assert_eq!(run(yaml, "$[::-2]"), vec!["4", "2", "0"]);
    assert!(run(yaml, "$[3:1]").is_empty());
}

/// Steps far larger than the sequence select a single item.
#[test]
fn test_huge_slice_steps() {
    assert_eq!(run("[0, 1, 2]", "$[1::9223372036854775807]"), vec!["1"]);
    assert_eq!(run("[0, 1, 2]", "$[::-9223372036854775808]"), vec!["2"]);
}

/// A depth cap does not hide nodes that an alias brings within reach.
#[test]
fn test_max_depth_through_alias() {
    let doc = Document::parse("deep: {x: {y: &s {z: {w: 1}}}}\nshallow: *s\n").unwrap();
    let evaluator = Evaluator::new(&doc).with_max_depth(Some(3));
    let everywhere = evaluator.evaluate(&Parser::parse("$..w").unwrap());
    let via_alias = evaluator.evaluate(&Parser::parse("$.shallow..w").unwrap());
    assert_eq!(everywhere.len(), 1);
    assert_eq!(everywhere.nodes(), via_alias.nodes());
}

/// Top-level union concatenates the alternatives in order.
#[test]
fn test_top_level_union() {
    assert_eq!(run("a: 1\nb: 2\nc: 3\n", "$.a,$.b"), vec!["1", "2"]);
    assert_eq!(run("a: 1\nb: 2\nc: 3\n", "$.b, $.a, $.b"), vec!["2", "1"]);
}

/// Bracket unions of names and indices.
#[test]
fn test_bracket_union() {
    assert_eq!(
        run(STORE, "$.store.book[0, -1].title"),
        vec!["Sayings of the Century", "The Lord of the Rings"]
    );
    assert_eq!(run(STORE, "$.store.bicycle['color', 'price']"), vec!["red", "19.95"]);
}

/// Filters over sequences, including existence tests and root references.
#[test]
fn test_filters() {
    assert_eq!(
        run(STORE, "$.store.book[?(@.isbn)].title"),
        vec!["Moby Dick", "The Lord of the Rings"]
    );
    assert_eq!(
        run(STORE, "$.store.book[?(@.price < $.expensive)].title"),
        vec!["Sayings of the Century", "Moby Dick"]
    );
    assert_eq!(
        run(STORE, "$..book[?(@.category == 'fiction' && @.price > 20)].author"),
        vec!["J. R. R. Tolkien"]
    );
    assert_eq!(
        run(STORE, "$..book[?(@.author =~ /^[EH]/)].price"),
        vec!["12.99", "8.99"]
    );
}

/// A filter combined with an index in one bracket is a union of the two.
#[test]
fn test_filter_in_union() {
    assert_eq!(
        run(STORE, "$.store.book[?(@.price > 20), 0].title"),
        vec!["The Lord of the Rings", "Sayings of the Century"]
    );
}

/// Type mismatches never match, and never fail.
#[test]
fn test_type_mismatch_is_no_match() {
    let yaml = "items:\n  - v: 1\n  - v: '1'\n  - v: true\n  - v: [1]\n";
    assert_eq!(run(yaml, "$.items[?(@.v == 1)].v"), vec!["1"]);
    assert_eq!(run(yaml, "$.items[?(@.v == '1')].v"), vec!["1"]);
    assert_eq!(run(yaml, "$.items[?(@.v == true)].v"), vec!["true"]);
    assert!(run(yaml, "$.items[0].v.x").is_empty());
    assert!(run(yaml, "$.items.v").is_empty());
}

/// Keys that are not plain identifiers need bracket notation.
#[test]
fn test_quoted_keys() {
    let yaml = "\"a.b\": 1\n\"with space\": 2\n'it''s': 3\n";
    assert_eq!(run(yaml, "$['a.b']"), vec!["1"]);
    assert_eq!(run(yaml, "$[\"with space\"]"), vec!["2"]);
    assert_eq!(run(yaml, r"$['it\'s']"), vec!["3"]);
}

/// Aliased subtrees are reached through the alias but reported once.
#[test]
fn test_aliases_are_followed_and_deduplicated() {
    let yaml = "defaults: &d\n  timeout: 30\ndev: *d\nprod: *d\n";
    assert_eq!(run(yaml, "$.prod.timeout"), vec!["30"]);
    assert_eq!(run(yaml, "$..timeout"), vec!["30"]);
    assert_eq!(run(yaml, "$.*").len(), 1);
}

/// A structure that refers to itself through an alias terminates.
#[test]
fn test_alias_cycle_terminates() {
    let yaml = "node: &n\n  name: loop\n  self: *n\n";
    let doc = Document::parse(yaml).unwrap();
    let matches = yamlpath::find(&doc, "$..name").unwrap();
    assert_eq!(texts(&doc, &matches), vec!["loop"]);
    let all = yamlpath::find(&doc, "$..*").unwrap();
    assert_eq!(all.len(), 2);
}

/// Repeated evaluation is deterministic.
#[test]
fn test_deterministic() {
    let doc = Document::parse(STORE).unwrap();
    let path = Parser::parse("$..*").unwrap();
    let first = Evaluator::new(&doc).evaluate(&path);
    for _ in 0..3 {
        assert_eq!(Evaluator::new(&doc).evaluate(&path), first);
    }
}

/// Normalized paths describe how each match was reached.
#[test]
fn test_match_paths() {
    let doc = Document::parse(STORE).unwrap();
    let matches = yamlpath::find(&doc, "$..book[?(@.isbn)]").unwrap();
    let paths: Vec<String> = matches.iter().map(|m| m.path.to_string()).collect();
    assert_eq!(
        paths,
        vec!["$['store']['book'][2]", "$['store']['book'][3]"]
    );
}

/// `$[` is rejected at the unterminated bracket.
#[test]
fn test_unterminated_bracket() {
    let err = Parser::parse("$[").unwrap_err();
    assert!(matches!(err, YamlPathError::UnexpectedEnd { .. }));
    assert_eq!(err.position(), 1);
}

/// Compile errors point at the first bad character.
#[test]
fn test_syntax_error_positions() {
    assert_eq!(Parser::parse("$.a[0:1:0]").unwrap_err().position(), 8);
    assert_eq!(Parser::parse("$.a.").unwrap_err().position(), 4);
    assert_eq!(Parser::parse("a").unwrap_err().position(), 0);
    assert_eq!(Parser::parse("$[?(@.a ==)]").unwrap_err().position(), 10);
}

/// The canonical rendering compiles back to the same path.
#[test]
fn test_canonical_form() {
    let path = Parser::parse("$.a[0:2:1]").unwrap();
    assert_eq!(path.to_string(), "$['a'][0:2:1]");
    let path = Parser::parse("$..book[?(@.price<10)]").unwrap();
    assert_eq!(path.to_string(), "$..['book'][?(@['price'] < 10)]");
    assert_eq!(Parser::parse(&path.to_string()).unwrap(), path);
}
