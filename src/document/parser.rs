//! YAML parsing into the document arena.
//!
//! This module drives the `yaml-rust2` event parser and builds a
//! [`Document`] from the event stream. Unlike the high-level `YamlLoader`,
//! the event stream keeps scalar styles, tags and aliases intact, which the
//! projector needs to write matches back out faithfully.
//!
//! # Example
//!
//! ```
//! use yt::document::parser::parse_yaml;
//! use yt::document::node::NodeKind;
//!
//! let doc = parse_yaml("base: &b {port: 80}\nprod: *b\n").unwrap();
//! let prod = doc.mapping_get(doc.root(), "prod").unwrap();
//! assert!(matches!(doc.get(prod).unwrap().kind(), NodeKind::Alias(_)));
//! assert_eq!(doc.resolve(prod), doc.mapping_get(doc.root(), "base"));
//! ```

use std::collections::{HashMap, HashSet};

use tracing::debug;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser as EventParser};
use yaml_rust2::scanner::{Marker, TScalarStyle};

use super::anchors::scan_anchor_names;
use super::error::ParseError;
use super::node::{NodeId, NodeKind, ScalarStyle, ScalarValue, YamlNode, YamlScalar};
use super::path::{NodePath, PathStep};
use super::tree::Document;

/// Parses the first document of a YAML stream.
///
/// An empty stream yields a document whose root is a null scalar.
///
/// # Errors
///
/// Returns a [`ParseError`] if the text is not well-formed YAML (including an
/// alias to an unknown anchor), or if a mapping repeats a key.
pub fn parse_yaml(text: &str) -> Result<Document, ParseError> {
    Ok(parse_yaml_stream(text)?.into_iter().next().unwrap_or_default())
}

/// Parses every document of a YAML stream, in order.
pub fn parse_yaml_stream(text: &str) -> Result<Vec<Document>, ParseError> {
    let mut builder = TreeBuilder::default();
    let mut parser = EventParser::new_from_str(text);
    let loaded = parser.load(&mut builder, true);

    // Our own errors happen earlier in the stream than anything the scanner
    // reports after them.
    if let Some(err) = builder.error.take() {
        return Err(err);
    }
    loaded?;

    let mut documents = builder.documents;
    name_anchors(text, &mut documents, &builder.anchored);
    debug!(
        documents = documents.len(),
        anchors = builder.anchored.len(),
        "parsed YAML stream"
    );
    Ok(documents)
}

/// Assigns anchor names to anchored nodes, in order of appearance.
fn name_anchors(text: &str, documents: &mut [Document], anchored: &[(usize, NodeId)]) {
    if anchored.is_empty() {
        return;
    }
    let scanned = scan_anchor_names(text);
    let names: Vec<String> = if scanned.len() == anchored.len() {
        scanned
    } else {
        debug!(
            scanned = scanned.len(),
            expected = anchored.len(),
            "anchor names could not be recovered, generating names"
        );
        (1..=anchored.len()).map(|n| format!("anchor{}", n)).collect()
    };
    for ((doc_index, id), name) in anchored.iter().zip(names) {
        if let Some(node) = documents.get_mut(*doc_index).and_then(|d| d.node_mut(*id)) {
            node.anchor = Some(name);
        }
    }
}

fn scalar_style(style: TScalarStyle) -> ScalarStyle {
    match style {
        TScalarStyle::SingleQuoted => ScalarStyle::SingleQuoted,
        TScalarStyle::DoubleQuoted => ScalarStyle::DoubleQuoted,
        TScalarStyle::Literal => ScalarStyle::Literal,
        TScalarStyle::Folded => ScalarStyle::Folded,
        _ => ScalarStyle::Plain,
    }
}

/// Turns a resolved tag back into the shorthand it was most likely written as.
fn normalize_tag(handle: &str, suffix: &str) -> String {
    match handle {
        "tag:yaml.org,2002:" | "!!" => format!("!!{}", suffix),
        "" => format!("!<{}>", suffix),
        _ => format!("{}{}", handle, suffix),
    }
}

/// A collection whose children are still arriving.
enum Frame {
    Sequence {
        id: NodeId,
        items: Vec<NodeId>,
    },
    Mapping {
        id: NodeId,
        pairs: Vec<(NodeId, NodeId)>,
        /// Key waiting for its value, with where the key starts
        pending_key: Option<(NodeId, Marker)>,
        seen: HashSet<String>,
    },
}

/// Receives parser events with their source positions and assembles documents.
#[derive(Default)]
struct TreeBuilder {
    documents: Vec<Document>,
    current: Option<Document>,
    stack: Vec<Frame>,
    /// Parser anchor id to the node that defined it (current document only)
    anchors: HashMap<usize, NodeId>,
    /// Anchored nodes as (document index, node) in order of appearance
    anchored: Vec<(usize, NodeId)>,
    /// Locations of the open collections, innermost last
    paths: Vec<NodePath>,
    error: Option<ParseError>,
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, ev: Event, mark: Marker) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.handle(ev, mark) {
            self.error = Some(err);
        }
    }
}

impl TreeBuilder {
    fn handle(&mut self, ev: Event, mark: Marker) -> Result<(), ParseError> {
        match ev {
            Event::Scalar(value, style, anchor_id, tag) => {
                let tag = tag.map(|t| normalize_tag(&t.handle, &t.suffix));
                let scalar = YamlScalar::new(value, scalar_style(style));
                let node = YamlNode::new(NodeKind::Scalar(scalar)).with_tag(tag);
                let id = self.push_node(node, anchor_id);
                self.attach(id, mark)
            }
            Event::SequenceStart(anchor_id, tag) => {
                let tag = tag.map(|t| normalize_tag(&t.handle, &t.suffix));
                let path = self.child_path();
                let node = YamlNode::new(NodeKind::Sequence(vec![])).with_tag(tag);
                let id = self.push_node(node, anchor_id);
                self.paths.push(path);
                self.stack.push(Frame::Sequence { id, items: vec![] });
                Ok(())
            }
            Event::MappingStart(anchor_id, tag) => {
                let tag = tag.map(|t| normalize_tag(&t.handle, &t.suffix));
                let path = self.child_path();
                let node = YamlNode::new(NodeKind::Mapping(vec![])).with_tag(tag);
                let id = self.push_node(node, anchor_id);
                self.paths.push(path);
                self.stack.push(Frame::Mapping {
                    id,
                    pairs: vec![],
                    pending_key: None,
                    seen: HashSet::new(),
                });
                Ok(())
            }
            Event::SequenceEnd | Event::MappingEnd => {
                self.paths.pop();
                let (id, kind) = match self.stack.pop() {
                    Some(Frame::Sequence { id, items }) => (id, NodeKind::Sequence(items)),
                    Some(Frame::Mapping { id, pairs, .. }) => (id, NodeKind::Mapping(pairs)),
                    None => return Ok(()),
                };
                if let Some(node) = self.doc().node_mut(id) {
                    node.kind = kind;
                }
                self.attach(id, mark)
            }
            Event::Alias(anchor_id) => {
                // Unknown anchors are rejected by the event parser already.
                let target = *self.anchors.get(&anchor_id).ok_or(ParseError::Syntax {
                    message: "alias refers to an undefined anchor".to_string(),
                    line: mark.line(),
                    column: mark.col(),
                    index: mark.index(),
                })?;
                let id = self.doc().push(YamlNode::new(NodeKind::Alias(target)));
                self.attach(id, mark)
            }
            _ => Ok(()),
        }
    }

    fn doc(&mut self) -> &mut Document {
        self.current.get_or_insert_with(Document::empty)
    }

    fn push_node(&mut self, node: YamlNode, anchor_id: usize) -> NodeId {
        let id = self.doc().push(node);
        if anchor_id != 0 {
            self.anchors.insert(anchor_id, id);
            self.anchored.push((self.documents.len(), id));
        }
        id
    }

    /// Location of the node that is about to be attached to the open collection.
    fn child_path(&self) -> NodePath {
        let parent = match self.paths.last() {
            Some(path) => path,
            None => return NodePath::root(),
        };
        match (self.stack.last(), self.current.as_ref()) {
            (Some(Frame::Sequence { items, .. }), _) => parent.child(PathStep::Index(items.len())),
            (
                Some(Frame::Mapping {
                    pending_key: Some((key, _)),
                    ..
                }),
                Some(doc),
            ) => parent.child(PathStep::Key(doc.step_key(*key))),
            _ => parent.clone(),
        }
    }

    /// Hands a finished node to the innermost open collection, or completes
    /// the document if there is none. `mark` is where the node's last event
    /// starts, which for a scalar key is the key itself.
    fn attach(&mut self, id: NodeId, mark: Marker) -> Result<(), ParseError> {
        if self.stack.is_empty() {
            self.finish_document(id);
            return Ok(());
        }
        let doc = match self.current.as_ref() {
            Some(doc) => doc,
            None => return Ok(()),
        };
        match self.stack.last_mut() {
            Some(Frame::Sequence { items, .. }) => items.push(id),
            Some(Frame::Mapping {
                pairs,
                pending_key,
                seen,
                ..
            }) => match pending_key.take() {
                None => *pending_key = Some((id, mark)),
                Some((key, key_mark)) => {
                    if let Some(identity) = key_identity(doc, key) {
                        if !seen.insert(identity) {
                            let path = self.paths.last().cloned().unwrap_or_default();
                            return Err(ParseError::DuplicateKey {
                                key: doc.step_key(key),
                                path: path.to_string(),
                                line: key_mark.line(),
                                column: key_mark.col(),
                                index: key_mark.index(),
                            });
                        }
                    }
                    pairs.push((key, id));
                }
            },
            None => {}
        }
        Ok(())
    }

    fn finish_document(&mut self, root: NodeId) {
        let mut doc = self.current.take().unwrap_or_else(Document::empty);
        doc.set_root(root);
        self.documents.push(doc);
        self.anchors.clear();
    }
}

/// Identity used to detect repeated scalar keys; `None` for collection keys.
fn key_identity(doc: &Document, key: NodeId) -> Option<String> {
    let resolved = doc.resolve(key)?;
    let node = doc.get(resolved)?;
    let scalar = node.as_scalar()?;
    match scalar.typed(node.tag()) {
        ScalarValue::String(s) => Some(format!("str:{}", s)),
        typed => Some(format!("val:{:?}", typed)),
    }
}
