//! The document arena.
//!
//! A `Document` owns every node of one parsed YAML document in a flat vector.
//! Nodes are addressed by [`NodeId`], collections hold the ids of their
//! children, and aliases hold the id of their target. The arena is built once
//! by the loader and is immutable afterwards.
//!
//! # Example
//!
//! ```
//! use yt::document::Document;
//!
//! let doc = Document::parse("name: Alice\ntags: [a, b]\n").unwrap();
//! let name = doc.mapping_get(doc.root(), "name").unwrap();
//! assert_eq!(doc.scalar(name).unwrap().value(), "Alice");
//!
//! let tags = doc.mapping_get(doc.root(), "tags").unwrap();
//! assert_eq!(doc.children(tags).len(), 2);
//! ```

use super::error::ParseError;
use super::node::{NodeId, NodeKind, YamlNode, YamlScalar};
use super::path::PathStep;

/// A complete YAML document stored as an index-addressed arena.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    nodes: Vec<YamlNode>,
    root: NodeId,
}

impl Default for Document {
    /// An empty document: a single plain null scalar.
    fn default() -> Self {
        let mut doc = Self::empty();
        let root = doc.push(YamlNode::new(NodeKind::Scalar(YamlScalar::plain("~"))));
        doc.set_root(root);
        doc
    }
}

impl Document {
    /// Parses the first document of a YAML stream.
    ///
    /// An empty stream yields a document whose root is a null scalar.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        super::parser::parse_yaml(text)
    }

    /// Parses every document of a (possibly multi-document) YAML stream.
    pub fn parse_all(text: &str) -> Result<Vec<Self>, ParseError> {
        super::parser::parse_yaml_stream(text)
    }

    /// Creates an arena with no nodes; the root must be set before use.
    pub(crate) fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    /// Appends a node and returns its id.
    pub fn push(&mut self, node: YamlNode) -> NodeId {
        self.nodes.push(node);
        NodeId(self.nodes.len() - 1)
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> Option<&mut YamlNode> {
        self.nodes.get_mut(id.0)
    }

    /// Returns the id of the root node.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Returns the node with the given id, or `None` if it is not in this arena.
    pub fn get(&self, id: NodeId) -> Option<&YamlNode> {
        self.nodes.get(id.0)
    }

    /// Number of nodes in the arena.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Follows aliases until a non-alias node is reached.
    ///
    /// Returns `None` for a dangling alias or an alias chain that loops back
    /// on itself.
    pub fn resolve(&self, id: NodeId) -> Option<NodeId> {
        let mut current = id;
        // A chain longer than the arena must contain a loop.
        for _ in 0..=self.nodes.len() {
            match self.get(current)?.kind() {
                NodeKind::Alias(target) => current = *target,
                _ => return Some(current),
            }
        }
        None
    }

    /// Returns the scalar payload of a node, looking through aliases.
    pub fn scalar(&self, id: NodeId) -> Option<&YamlScalar> {
        self.get(self.resolve(id)?)?.as_scalar()
    }

    /// Returns the text a mapping key is matched by, if the key is a scalar.
    pub fn key_text(&self, key: NodeId) -> Option<&str> {
        self.scalar(key).map(|s| s.value())
    }

    /// Looks up the value bound to `key` in a mapping node.
    ///
    /// Returns `None` if the node is not a mapping or has no such key.
    pub fn mapping_get(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.get(self.resolve(id)?)?.kind() {
            NodeKind::Mapping(pairs) => pairs
                .iter()
                .find(|(k, _)| self.key_text(*k) == Some(key))
                .map(|(_, v)| *v),
            _ => None,
        }
    }

    /// Returns the direct children of a node (sequence elements or mapping
    /// values), each paired with the step that reaches it.
    ///
    /// Aliases are looked through; scalars have no children.
    pub fn child_entries(&self, id: NodeId) -> Vec<(PathStep, NodeId)> {
        let node = match self.resolve(id).and_then(|r| self.get(r)) {
            Some(node) => node,
            None => return vec![],
        };
        match node.kind() {
            NodeKind::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, child)| (PathStep::Index(i), *child))
                .collect(),
            NodeKind::Mapping(pairs) => pairs
                .iter()
                .map(|(k, v)| (PathStep::Key(self.step_key(*k)), *v))
                .collect(),
            NodeKind::Scalar(_) | NodeKind::Alias(_) => vec![],
        }
    }

    /// Returns the ids of the direct children of a node.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.child_entries(id).into_iter().map(|(_, c)| c).collect()
    }

    /// Text used for a mapping key in a normalized path.
    pub(crate) fn step_key(&self, key: NodeId) -> String {
        match self.key_text(key) {
            Some(text) => text.to_string(),
            None => format!("<{}>", self.get(key).map_or("node", |n| n.kind_name())),
        }
    }

    /// Compares the subtree at `id` with the subtree at `other_id` in `other`.
    ///
    /// Aliases are resolved on both sides, so a node and an alias of an equal
    /// node compare equal. Node kind, child order, scalar text and the
    /// resolved scalar type must all match; anchors, tags and styles that do
    /// not change the value are ignored.
    pub fn subtree_eq(&self, id: NodeId, other: &Document, other_id: NodeId) -> bool {
        let mut in_progress = Vec::new();
        self.subtree_eq_inner(id, other, other_id, &mut in_progress)
    }

    fn subtree_eq_inner(
        &self,
        id: NodeId,
        other: &Document,
        other_id: NodeId,
        in_progress: &mut Vec<(NodeId, NodeId)>,
    ) -> bool {
        let (a, b) = match (self.resolve(id), other.resolve(other_id)) {
            (Some(a), Some(b)) => (a, b),
            _ => return false,
        };
        // Recursive structures: assume equal while the pair is being compared.
        if in_progress.contains(&(a, b)) {
            return true;
        }
        let (node_a, node_b) = match (self.get(a), other.get(b)) {
            (Some(x), Some(y)) => (x, y),
            _ => return false,
        };
        in_progress.push((a, b));
        let equal = match (node_a.kind(), node_b.kind()) {
            (NodeKind::Scalar(x), NodeKind::Scalar(y)) => {
                let tx = x.typed(node_a.tag());
                let ty = y.typed(node_b.tag());
                x.value() == y.value() && std::mem::discriminant(&tx) == std::mem::discriminant(&ty)
            }
            (NodeKind::Sequence(xs), NodeKind::Sequence(ys)) => {
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .zip(ys)
                        .all(|(x, y)| self.subtree_eq_inner(*x, other, *y, in_progress))
            }
            (NodeKind::Mapping(xs), NodeKind::Mapping(ys)) => {
                xs.len() == ys.len()
                    && xs.iter().zip(ys).all(|((kx, vx), (ky, vy))| {
                        self.subtree_eq_inner(*kx, other, *ky, in_progress)
                            && self.subtree_eq_inner(*vx, other, *vy, in_progress)
                    })
            }
            _ => false,
        };
        in_progress.pop();
        equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::node::ScalarStyle;

    fn make_test_doc() -> Document {
        // {name: test, items: [a, b], ref: *items}
        let mut doc = Document::empty();
        let root = doc.push(YamlNode::new(NodeKind::Mapping(vec![])));
        let k_name = doc.push(YamlNode::new(NodeKind::Scalar(YamlScalar::plain("name"))));
        let v_name = doc.push(YamlNode::new(NodeKind::Scalar(YamlScalar::new(
            "test",
            ScalarStyle::DoubleQuoted,
        ))));
        let k_items = doc.push(YamlNode::new(NodeKind::Scalar(YamlScalar::plain("items"))));
        let a = doc.push(YamlNode::new(NodeKind::Scalar(YamlScalar::plain("a"))));
        let b = doc.push(YamlNode::new(NodeKind::Scalar(YamlScalar::plain("b"))));
        let items = doc.push(
            YamlNode::new(NodeKind::Sequence(vec![a, b])).with_anchor(Some("items".to_string())),
        );
        let k_ref = doc.push(YamlNode::new(NodeKind::Scalar(YamlScalar::plain("ref"))));
        let alias = doc.push(YamlNode::new(NodeKind::Alias(items)));
        if let Some(node) = doc.node_mut(root) {
            node.kind = NodeKind::Mapping(vec![(k_name, v_name), (k_items, items), (k_ref, alias)]);
        }
        doc.set_root(root);
        doc
    }

    #[test]
    fn test_default_document_is_null() {
        let doc = Document::default();
        assert_eq!(doc.len(), 1);
        assert_eq!(doc.scalar(doc.root()).unwrap().value(), "~");
    }

    #[test]
    fn test_mapping_get() {
        let doc = make_test_doc();
        let name = doc.mapping_get(doc.root(), "name").unwrap();
        assert_eq!(doc.scalar(name).unwrap().value(), "test");
        assert!(doc.mapping_get(doc.root(), "missing").is_none());
        assert!(doc.mapping_get(name, "name").is_none());
    }

    #[test]
    fn test_resolve_alias() {
        let doc = make_test_doc();
        let items = doc.mapping_get(doc.root(), "items").unwrap();
        let alias = doc.mapping_get(doc.root(), "ref").unwrap();
        assert_ne!(items, alias);
        assert_eq!(doc.resolve(alias), Some(items));
        assert_eq!(doc.children(alias), doc.children(items));
    }

    #[test]
    fn test_resolve_dangling_alias() {
        let mut doc = Document::empty();
        let alias = doc.push(YamlNode::new(NodeKind::Alias(NodeId(99))));
        doc.set_root(alias);
        assert_eq!(doc.resolve(alias), None);
    }

    #[test]
    fn test_resolve_alias_loop() {
        let mut doc = Document::empty();
        let first = doc.push(YamlNode::new(NodeKind::Alias(NodeId(1))));
        doc.push(YamlNode::new(NodeKind::Alias(NodeId(0))));
        assert_eq!(doc.resolve(first), None);
    }

    #[test]
    fn test_child_entries_steps() {
        let doc = make_test_doc();
        let entries = doc.child_entries(doc.root());
        let steps: Vec<_> = entries.iter().map(|(s, _)| s.clone()).collect();
        assert_eq!(
            steps,
            vec![
                PathStep::Key("name".to_string()),
                PathStep::Key("items".to_string()),
                PathStep::Key("ref".to_string()),
            ]
        );
        let items = doc.mapping_get(doc.root(), "items").unwrap();
        let steps: Vec<_> = doc.child_entries(items).into_iter().map(|(s, _)| s).collect();
        assert_eq!(steps, vec![PathStep::Index(0), PathStep::Index(1)]);
    }

    #[test]
    fn test_subtree_eq_through_alias() {
        let doc = make_test_doc();
        let items = doc.mapping_get(doc.root(), "items").unwrap();
        let alias = doc.mapping_get(doc.root(), "ref").unwrap();
        assert!(doc.subtree_eq(items, &doc, alias));
        let name = doc.mapping_get(doc.root(), "name").unwrap();
        assert!(!doc.subtree_eq(items, &doc, name));
    }
}
