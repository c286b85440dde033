//! YAMLPath evaluation over a document arena.
//!
//! The evaluator keeps a candidate set, starting with the document root, and
//! maps it through one segment at a time. Candidates are always resolved
//! nodes: every alias is followed before a segment looks at it, so shared
//! subtrees are reported once and alias cycles cannot loop forever.

use std::collections::HashMap;

use indexmap::IndexMap;
use tracing::debug;

use super::ast::{Comparator, Operand, PathSegment, Predicate, YamlPath};
use crate::document::node::{NodeKind, ScalarValue, YamlNumber};
use crate::document::path::{NodePath, PathStep};
use crate::document::tree::Document;
use crate::document::NodeId;

/// A node selected by a query, with the route taken to reach it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub node: NodeId,
    pub path: NodePath,
}

/// The ordered result of one evaluation, unique by node identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchSet {
    matches: Vec<Match>,
}

impl MatchSet {
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Match> {
        self.matches.iter()
    }

    pub fn get(&self, index: usize) -> Option<&Match> {
        self.matches.get(index)
    }

    /// The matched node ids, in order.
    pub fn nodes(&self) -> Vec<NodeId> {
        self.matches.iter().map(|m| m.node).collect()
    }
}

impl IntoIterator for MatchSet {
    type Item = Match;
    type IntoIter = std::vec::IntoIter<Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.into_iter()
    }
}

impl<'m> IntoIterator for &'m MatchSet {
    type Item = &'m Match;
    type IntoIter = std::slice::Iter<'m, Match>;

    fn into_iter(self) -> Self::IntoIter {
        self.matches.iter()
    }
}

type Candidate = (NodeId, NodePath);

pub struct Evaluator<'a> {
    doc: &'a Document,
    max_depth: Option<usize>,
}

impl<'a> Evaluator<'a> {
    pub fn new(doc: &'a Document) -> Self {
        Evaluator {
            doc,
            max_depth: None,
        }
    }

    /// Limits how far below its starting node a recursive descent goes.
    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Evaluates a compiled path and returns the matching nodes.
    pub fn evaluate(&self, path: &YamlPath) -> MatchSet {
        let mut current = vec![self.root_candidate()];
        for segment in &path.segments {
            if matches!(segment, PathSegment::Root) {
                continue;
            }
            current = self.apply_segment(current, segment);
            debug!(segment = %segment, candidates = current.len(), "applied segment");
        }

        MatchSet {
            matches: current
                .into_iter()
                .map(|(node, path)| Match { node, path })
                .collect(),
        }
    }

    fn root_candidate(&self) -> Candidate {
        (self.resolve(self.doc.root()), NodePath::root())
    }

    /// Follows aliases; an alias that cannot be resolved is kept as is.
    fn resolve(&self, id: NodeId) -> NodeId {
        self.doc.resolve(id).unwrap_or(id)
    }

    fn apply_segments(&self, candidates: Vec<Candidate>, segments: &[PathSegment]) -> Vec<Candidate> {
        segments
            .iter()
            .fold(candidates, |current, segment| self.apply_segment(current, segment))
    }

    fn apply_segment(&self, candidates: Vec<Candidate>, segment: &PathSegment) -> Vec<Candidate> {
        match segment {
            PathSegment::Root => vec![self.root_candidate()],
            PathSegment::Child(name) => dedup(
                candidates
                    .iter()
                    .filter_map(|(id, path)| self.child(*id, path, name)),
            ),
            PathSegment::Wildcard => dedup(
                candidates
                    .iter()
                    .flat_map(|(id, path)| self.children(*id, path)),
            ),
            PathSegment::Index(index) => dedup(
                candidates
                    .iter()
                    .filter_map(|(id, path)| self.index(*id, path, *index)),
            ),
            PathSegment::Slice(start, end, step) => dedup(candidates.iter().flat_map(|(id, path)| {
                self.slice(*id, path, *start, *end, step.unwrap_or(1))
            })),
            PathSegment::RecursiveDescent => self.descend(candidates),
            PathSegment::Filter(predicate) => dedup(candidates.iter().flat_map(|(id, path)| {
                self.children(*id, path)
                    .into_iter()
                    .filter(|(child, _)| self.test(predicate, *child))
            })),
            PathSegment::Union(alternatives) => dedup(
                alternatives
                    .iter()
                    .flat_map(|alt| self.apply_segments(candidates.clone(), alt)),
            ),
        }
    }

    fn child(&self, id: NodeId, path: &NodePath, name: &str) -> Option<Candidate> {
        let value = self.doc.mapping_get(id, name)?;
        Some((self.resolve(value), path.child(PathStep::Key(name.to_string()))))
    }

    fn children(&self, id: NodeId, path: &NodePath) -> Vec<Candidate> {
        self.doc
            .child_entries(id)
            .into_iter()
            .map(|(step, child)| (self.resolve(child), path.child(step)))
            .collect()
    }

    fn sequence_items(&self, id: NodeId) -> &'a [NodeId] {
        match self.doc.get(id).map(|node| node.kind()) {
            Some(NodeKind::Sequence(items)) => items,
            _ => &[],
        }
    }

    fn index(&self, id: NodeId, path: &NodePath, index: isize) -> Option<Candidate> {
        let items = self.sequence_items(id);
        let len = items.len() as isize;
        let normalized = if index < 0 { len + index } else { index };
        if normalized < 0 || normalized >= len {
            return None;
        }
        let i = normalized as usize;
        Some((self.resolve(items[i]), path.child(PathStep::Index(i))))
    }

    fn slice(
        &self,
        id: NodeId,
        path: &NodePath,
        start: Option<isize>,
        end: Option<isize>,
        step: isize,
    ) -> Vec<Candidate> {
        let items = self.sequence_items(id);
        slice_indices(items.len(), start, end, step)
            .into_iter()
            .map(|i| (self.resolve(items[i]), path.child(PathStep::Index(i))))
            .collect()
    }

    /// Each candidate followed by its descendants in pre-order; a node
    /// reached twice is only reported the first time.
    ///
    /// With a depth cap, a node first reached at the cap and later reached
    /// higher up is expanded again from the shallower depth, so aliases
    /// cannot hide descendants that are within reach.
    fn descend(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        // Shallowest depth each node has been expanded from.
        let mut visited: HashMap<NodeId, usize> = HashMap::new();
        let mut out = Vec::new();
        for (id, path) in candidates {
            let mut stack = vec![(id, path, 0usize)];
            while let Some((id, path, depth)) = stack.pop() {
                let first_visit = match visited.get(&id) {
                    None => true,
                    Some(&seen) if self.max_depth.is_some() && depth < seen => false,
                    Some(_) => continue,
                };
                visited.insert(id, depth);
                if self.max_depth.map_or(true, |max| depth < max) {
                    for (child, child_path) in self.children(id, &path).into_iter().rev() {
                        stack.push((child, child_path, depth + 1));
                    }
                }
                if first_visit {
                    out.push((id, path));
                }
            }
        }
        out
    }

    fn test(&self, predicate: &Predicate, current: NodeId) -> bool {
        match predicate {
            Predicate::Or(left, right) => self.test(left, current) || self.test(right, current),
            Predicate::And(left, right) => self.test(left, current) && self.test(right, current),
            Predicate::Not(inner) => !self.test(inner, current),
            Predicate::Exists(Operand::Literal(value)) => value.is_truthy(),
            Predicate::Exists(operand) => !self.operand_nodes(operand, current).is_empty(),
            Predicate::Compare(left, op, right) => {
                let lhs = self.operand_values(left, current);
                let rhs = self.operand_values(right, current);
                lhs.iter()
                    .any(|l| rhs.iter().any(|r| compare(l, *op, r)))
            }
            Predicate::Matches(operand, pattern) => self
                .operand_nodes(operand, current)
                .into_iter()
                .filter_map(|id| self.doc.scalar(id))
                .any(|scalar| pattern.is_match(scalar.value())),
        }
    }

    fn operand_nodes(&self, operand: &Operand, current: NodeId) -> Vec<NodeId> {
        let (start, segments) = match operand {
            Operand::Current(segments) => ((current, NodePath::root()), segments),
            Operand::Root(segments) => (self.root_candidate(), segments),
            Operand::Literal(_) => return vec![],
        };
        self.apply_segments(vec![start], segments)
            .into_iter()
            .map(|(id, _)| id)
            .collect()
    }

    /// Typed values of the scalars an operand refers to.
    fn operand_values(&self, operand: &Operand, current: NodeId) -> Vec<ScalarValue> {
        if let Operand::Literal(value) = operand {
            return vec![value.clone()];
        }
        self.operand_nodes(operand, current)
            .into_iter()
            .filter_map(|id| {
                let node = self.doc.get(id)?;
                node.as_scalar().map(|scalar| scalar.typed(node.tag()))
            })
            .collect()
    }
}

/// Keeps the first occurrence of each node.
fn dedup(candidates: impl IntoIterator<Item = Candidate>) -> Vec<Candidate> {
    let mut seen: IndexMap<NodeId, NodePath> = IndexMap::new();
    for (id, path) in candidates {
        seen.entry(id).or_insert(path);
    }
    seen.into_iter().collect()
}

/// Indices selected by `[start:end:step]` over a sequence of `len` items,
/// using Python slice semantics. `step` must not be zero.
fn slice_indices(len: usize, start: Option<isize>, end: Option<isize>, step: isize) -> Vec<usize> {
    let len = len as isize;
    let mut indices = Vec::new();
    if step > 0 {
        let clamp = |i: isize| if i < 0 { (len + i).max(0) } else { i.min(len) };
        let mut i = start.map_or(0, clamp);
        let stop = end.map_or(len, clamp);
        while i < stop {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    } else if step < 0 {
        let clamp = |i: isize| if i < 0 { (len + i).max(-1) } else { i.min(len - 1) };
        let mut i = start.map_or(len - 1, clamp);
        let stop = end.map_or(-1, clamp);
        while i > stop {
            indices.push(i as usize);
            match i.checked_add(step) {
                Some(next) => i = next,
                None => break,
            }
        }
    }
    indices
}

fn values_equal(left: &ScalarValue, right: &ScalarValue) -> bool {
    match (left, right) {
        (ScalarValue::Number(YamlNumber::Integer(a)), ScalarValue::Number(YamlNumber::Integer(b))) => {
            a == b
        }
        (ScalarValue::Number(a), ScalarValue::Number(b)) => a.as_f64() == b.as_f64(),
        (ScalarValue::String(a), ScalarValue::String(b)) => a == b,
        (ScalarValue::Boolean(a), ScalarValue::Boolean(b)) => a == b,
        (ScalarValue::Null, ScalarValue::Null) => true,
        _ => false,
    }
}

/// Numbers order with numbers and strings with strings; nothing else orders.
fn less_than(left: &ScalarValue, right: &ScalarValue) -> bool {
    match (left, right) {
        (ScalarValue::Number(YamlNumber::Integer(a)), ScalarValue::Number(YamlNumber::Integer(b))) => {
            a < b
        }
        (ScalarValue::Number(a), ScalarValue::Number(b)) => a.as_f64() < b.as_f64(),
        (ScalarValue::String(a), ScalarValue::String(b)) => a < b,
        _ => false,
    }
}

fn compare(left: &ScalarValue, op: Comparator, right: &ScalarValue) -> bool {
    match op {
        Comparator::Eq => values_equal(left, right),
        Comparator::Ne => !values_equal(left, right),
        Comparator::Lt => less_than(left, right),
        Comparator::Le => less_than(left, right) || values_equal(left, right),
        Comparator::Gt => less_than(right, left),
        Comparator::Ge => less_than(right, left) || values_equal(left, right),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yamlpath::parser::Parser;

    fn query(doc: &Document, expr: &str) -> MatchSet {
        let path = Parser::parse(expr).unwrap();
        Evaluator::new(doc).evaluate(&path)
    }

    /// Scalar text of each match, `<kind>` for collections.
    fn texts(doc: &Document, matches: &MatchSet) -> Vec<String> {
        matches
            .iter()
            .map(|m| match doc.scalar(m.node) {
                Some(scalar) => scalar.value().to_string(),
                None => format!("<{}>", doc.get(m.node).map_or("?", |n| n.kind_name())),
            })
            .collect()
    }

    fn store() -> Document {
        Document::parse(
            r#"
store:
  book:
    - title: Sayings
      price: 8.95
      category: reference
    - title: Sword
      price: 12.99
      category: fiction
    - title: Moby
      price: 8.99
      category: fiction
      isbn: 0-553
  bicycle:
    color: red
    price: 19.95
limit: 10
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_root_matches_root() {
        let doc = store();
        let matches = query(&doc, "$");
        assert_eq!(matches.nodes(), vec![doc.root()]);
        assert_eq!(matches.get(0).unwrap().path.to_string(), "$");
    }

    #[test]
    fn test_child_and_index() {
        let doc = store();
        let matches = query(&doc, "$.store.book[1].title");
        assert_eq!(texts(&doc, &matches), vec!["Sword"]);
        assert_eq!(
            matches.get(0).unwrap().path.to_string(),
            "$['store']['book'][1]['title']"
        );
    }

    #[test]
    fn test_child_on_non_mapping_is_empty() {
        let doc = store();
        assert!(query(&doc, "$.store.book.title").is_empty());
        assert!(query(&doc, "$.limit.x").is_empty());
    }

    #[test]
    fn test_wildcard_mapping_values_in_order() {
        let doc = Document::parse("a: 1\nb: 2\nc: 3\n").unwrap();
        assert_eq!(texts(&doc, &query(&doc, "$.*")), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_negative_and_out_of_range_index() {
        let doc = Document::parse("[10, 20, 30]").unwrap();
        assert_eq!(texts(&doc, &query(&doc, "$[-1]")), vec!["30"]);
        assert!(query(&doc, "$[-5]").is_empty());
        assert!(query(&doc, "$[3]").is_empty());
    }

    #[test]
    fn test_slices() {
        let doc = Document::parse("[0, 1, 2, 3, 4]").unwrap();
        assert_eq!(texts(&doc, &query(&doc, "$[1:4]")), vec!["1", "2", "3"]);
        assert_eq!(texts(&doc, &query(&doc, "$[::2]")), vec!["0", "2", "4"]);
        assert_eq!(texts(&doc, &query(&doc, "$[::-1]")), vec!["4", "3", "2", "1", "0"]);
        assert_eq!(texts(&doc, &query(&doc, "$[-2:]")), vec!["3", "4"]);
        assert_eq!(texts(&doc, &query(&doc, "$[3:1:-1]")), vec!["3", "2"]);
        assert!(query(&doc, "$[4:1]").is_empty());
        assert_eq!(texts(&doc, &query(&doc, "$[-100:100]")).len(), 5);
    }

    #[test]
    fn test_slice_indices_python_semantics() {
        assert_eq!(slice_indices(5, None, None, 1), vec![0, 1, 2, 3, 4]);
        assert_eq!(slice_indices(5, Some(10), None, -1), vec![4, 3, 2, 1, 0]);
        assert_eq!(slice_indices(5, Some(-1), Some(-10), -2), vec![4, 2, 0]);
        assert!(slice_indices(0, None, None, -1).is_empty());
    }

    #[test]
    fn test_slice_extreme_steps() {
        assert_eq!(slice_indices(3, Some(1), None, isize::MAX), vec![1]);
        assert_eq!(slice_indices(3, None, None, isize::MIN), vec![2]);
        assert_eq!(slice_indices(3, Some(isize::MIN), Some(isize::MAX), isize::MAX), vec![0]);

        let doc = Document::parse("[0, 1, 2]").unwrap();
        assert_eq!(texts(&doc, &query(&doc, "$[1::9223372036854775807]")), vec!["1"]);
        assert_eq!(texts(&doc, &query(&doc, "$[::-9223372036854775808]")), vec!["2"]);
    }

    #[test]
    fn test_recursive_descent_preorder() {
        let doc = store();
        assert_eq!(
            texts(&doc, &query(&doc, "$..price")),
            vec!["8.95", "12.99", "8.99", "19.95"]
        );
    }

    #[test]
    fn test_recursive_descent_includes_start_node() {
        let doc = Document::parse("a:\n  b: 1\n").unwrap();
        let matches = query(&doc, "$.a..*");
        assert_eq!(texts(&doc, &matches), vec!["1"]);
        let matches = query(&doc, "$..[0]");
        assert!(matches.is_empty());
    }

    #[test]
    fn test_recursive_descent_max_depth() {
        let doc = Document::parse("a:\n  b:\n    c: deep\n  x: shallow\n").unwrap();
        let deep = Parser::parse("$..c").unwrap();
        let shallow = Parser::parse("$..x").unwrap();
        assert_eq!(texts(&doc, &Evaluator::new(&doc).evaluate(&deep)), vec!["deep"]);

        let limited = Evaluator::new(&doc).with_max_depth(Some(1));
        assert!(limited.evaluate(&deep).is_empty());
        assert_eq!(texts(&doc, &limited.evaluate(&shallow)), vec!["shallow"]);
    }

    #[test]
    fn test_max_depth_reexpands_alias_reached_higher_up() {
        let doc = Document::parse(
            "deep:\n  x:\n    y: &s\n      z:\n        w: 1\nshallow: *s\n",
        )
        .unwrap();
        let limited = Evaluator::new(&doc).with_max_depth(Some(3));
        let everywhere = limited.evaluate(&Parser::parse("$..w").unwrap());
        let through_alias = limited.evaluate(&Parser::parse("$.shallow..w").unwrap());
        assert_eq!(texts(&doc, &everywhere), vec!["1"]);
        assert_eq!(everywhere.nodes(), through_alias.nodes());

        // The shared node itself is still reported once.
        let all = limited.evaluate(&Parser::parse("$..*").unwrap());
        let unique: std::collections::HashSet<NodeId> = all.nodes().into_iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn test_alias_shared_subtree_reported_once() {
        let doc = Document::parse("base: &b {port: 80}\ndev: *b\nprod: *b\n").unwrap();
        let matches = query(&doc, "$..port");
        assert_eq!(texts(&doc, &matches), vec!["80"]);
        assert_eq!(matches.get(0).unwrap().path.to_string(), "$['base']['port']");

        let values = query(&doc, "$.*");
        assert_eq!(values.len(), 1);
    }

    #[test]
    fn test_alias_resolved_before_segment() {
        let doc = Document::parse("base: &b {port: 80}\nprod: *b\n").unwrap();
        let matches = query(&doc, "$.prod.port");
        assert_eq!(texts(&doc, &matches), vec!["80"]);
        assert_eq!(matches.get(0).unwrap().path.to_string(), "$['prod']['port']");
    }

    #[test]
    fn test_union_concatenates_and_dedups() {
        let doc = Document::parse("a: 1\nb: 2\nc: 3\n").unwrap();
        assert_eq!(texts(&doc, &query(&doc, "$.a,$.b")), vec!["1", "2"]);
        assert_eq!(texts(&doc, &query(&doc, "$['b', 'a', 'b']")), vec!["2", "1"]);
        assert_eq!(texts(&doc, &query(&doc, "$.c, $.*")), vec!["3", "1", "2"]);
    }

    #[test]
    fn test_filter_comparisons() {
        let doc = store();
        let cheap = query(&doc, "$.store.book[?(@.price < 10)].title");
        assert_eq!(texts(&doc, &cheap), vec!["Sayings", "Moby"]);

        let fiction = query(&doc, "$.store.book[?(@.category == 'fiction')].title");
        assert_eq!(texts(&doc, &fiction), vec!["Sword", "Moby"]);

        let not_fiction = query(&doc, "$.store.book[?(@.category != 'fiction')].title");
        assert_eq!(texts(&doc, &not_fiction), vec!["Sayings"]);
    }

    #[test]
    fn test_filter_missing_key_is_false() {
        let doc = store();
        let with_isbn = query(&doc, "$.store.book[?(@.isbn)].title");
        assert_eq!(texts(&doc, &with_isbn), vec!["Moby"]);
        let ne = query(&doc, "$.store.book[?(@.isbn != 'x')].title");
        assert_eq!(texts(&doc, &ne), vec!["Moby"]);
    }

    #[test]
    fn test_filter_root_reference_and_logic() {
        let doc = store();
        let matches = query(
            &doc,
            "$.store.book[?(@.price < $.limit && !(@.category == 'reference'))].title",
        );
        assert_eq!(texts(&doc, &matches), vec!["Moby"]);
    }

    #[test]
    fn test_filter_regex() {
        let doc = store();
        let matches = query(&doc, "$.store.book[?(@.title =~ /^S/)].title");
        assert_eq!(texts(&doc, &matches), vec!["Sayings", "Sword"]);
    }

    #[test]
    fn test_filter_on_scalar_candidate_is_empty() {
        let doc = store();
        assert!(query(&doc, "$.limit[?(@ == 10)]").is_empty());
    }

    #[test]
    fn test_filter_over_mapping_values() {
        let doc = Document::parse("a: 1\nb: 5\nc: x\n").unwrap();
        assert_eq!(texts(&doc, &query(&doc, "$[?(@ > 2)]")), vec!["5"]);
    }

    #[test]
    fn test_incompatible_comparisons() {
        let s = ScalarValue::String("1".to_string());
        let n = ScalarValue::Number(YamlNumber::Integer(1));
        assert!(!compare(&s, Comparator::Eq, &n));
        assert!(compare(&s, Comparator::Ne, &n));
        assert!(!compare(&s, Comparator::Lt, &n));
        assert!(!compare(&s, Comparator::Ge, &n));
        assert!(compare(&n, Comparator::Eq, &ScalarValue::Number(YamlNumber::Float(1.0))));
        assert!(!compare(&ScalarValue::Null, Comparator::Lt, &ScalarValue::Null));
        assert!(compare(&ScalarValue::Null, Comparator::Le, &ScalarValue::Null));
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let doc = store();
        let path = Parser::parse("$..*").unwrap();
        let evaluator = Evaluator::new(&doc);
        assert_eq!(evaluator.evaluate(&path), evaluator.evaluate(&path));
    }
}
