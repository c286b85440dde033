//! Block-style YAML writer for document subtrees.
//!
//! The emitter writes one node and everything below it as a standalone YAML
//! document. Collections are written in block style, mapping keys inline
//! (collection keys in flow style), and each scalar in the closest style to
//! the one it was read in that can represent its text.

use std::collections::HashMap;

use super::EncodingError;
use crate::document::node::{NodeKind, ScalarStyle, YamlScalar};
use crate::document::tree::Document;
use crate::document::NodeId;

/// Where a node is written relative to the token before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    /// At the start of the document
    Root,
    /// After `key:`
    Value,
    /// After `-`
    Item,
}

/// What to write for a node reference.
enum Target {
    Node(NodeId),
    /// An anchor that is already defined in the output
    Alias(String),
}

pub(crate) struct Emitter<'a> {
    doc: &'a Document,
    indent: usize,
    out: String,
    /// Anchor name to the node that most recently defined it
    emitted: HashMap<String, NodeId>,
    /// Nodes currently being written, outermost first
    active: Vec<NodeId>,
}

impl<'a> Emitter<'a> {
    pub(crate) fn new(doc: &'a Document, indent: usize) -> Self {
        Self {
            doc,
            indent: indent.max(1),
            out: String::new(),
            emitted: HashMap::new(),
            active: Vec::new(),
        }
    }

    /// Writes the subtree at `id` and returns the YAML text.
    pub(crate) fn emit(mut self, id: NodeId) -> Result<String, EncodingError> {
        self.write_node(id, 0, Slot::Root)?;
        Ok(self.out)
    }

    /// Follows aliases from `id` and decides whether the target is written
    /// out or referenced by an alias.
    fn target(&self, id: NodeId) -> Result<Target, EncodingError> {
        let mut current = id;
        let mut chain = Vec::new();
        loop {
            let node = self.doc.get(current).ok_or(if current == id {
                EncodingError::UnknownNode { node: id }
            } else {
                EncodingError::UnresolvedAlias {
                    alias: id,
                    target: current,
                }
            })?;
            match node.kind() {
                NodeKind::Alias(next) => {
                    chain.push(current);
                    if chain.contains(next) {
                        return Err(EncodingError::RecursiveAlias { alias: id });
                    }
                    current = *next;
                }
                _ => break,
            }
        }
        if current == id {
            return Ok(Target::Node(id));
        }

        if let Some(name) = self.doc.get(current).and_then(|n| n.anchor()) {
            if self.emitted.get(name) == Some(&current) {
                return Ok(Target::Alias(name.to_string()));
            }
        }
        if self.active.contains(&current) {
            return Err(EncodingError::RecursiveAlias { alias: id });
        }
        Ok(Target::Node(current))
    }

    /// Anchor and tag of a node about to be written, e.g. `&base !!map`.
    fn properties(&mut self, id: NodeId) -> String {
        let node = match self.doc.get(id) {
            Some(node) => node,
            None => return String::new(),
        };
        let mut parts = Vec::new();
        if let Some(anchor) = node.anchor() {
            parts.push(format!("&{}", anchor));
            self.emitted.insert(anchor.to_string(), id);
        }
        if let Some(tag) = node.tag() {
            parts.push(tag.to_string());
        }
        parts.join(" ")
    }

    fn write_inline(&mut self, slot: Slot, text: &str) {
        if slot != Slot::Root {
            self.out.push(' ');
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    /// Writes a node. `column` is the indentation of the collection that
    /// holds it (0 for the root).
    fn write_node(&mut self, id: NodeId, column: usize, slot: Slot) -> Result<(), EncodingError> {
        let target = match self.target(id)? {
            Target::Alias(name) => {
                self.write_inline(slot, &format!("*{}", name));
                return Ok(());
            }
            Target::Node(target) => target,
        };
        let doc = self.doc;
        let node = doc.get(target).ok_or(EncodingError::UnknownNode { node: target })?;
        let props = self.properties(target);

        self.active.push(target);
        let result = match node.kind() {
            NodeKind::Scalar(scalar) => {
                self.write_scalar(scalar, &props, column, slot);
                Ok(())
            }
            NodeKind::Sequence(items) if items.is_empty() => {
                self.write_inline(slot, &with_props(&props, "[]"));
                Ok(())
            }
            NodeKind::Mapping(pairs) if pairs.is_empty() => {
                self.write_inline(slot, &with_props(&props, "{}"));
                Ok(())
            }
            NodeKind::Sequence(items) => {
                let (child_column, compact) = self.open_collection(&props, column, slot);
                self.write_sequence(items, child_column, compact)
            }
            NodeKind::Mapping(pairs) => {
                let (child_column, compact) = self.open_collection(&props, column, slot);
                self.write_mapping(pairs, child_column, compact)
            }
            NodeKind::Alias(_) => Err(EncodingError::RecursiveAlias { alias: id }),
        };
        self.active.pop();
        result
    }

    /// Writes whatever precedes the first entry of a non-empty block
    /// collection. Returns the column of its entries and whether the first
    /// entry continues the current line.
    fn open_collection(&mut self, props: &str, column: usize, slot: Slot) -> (usize, bool) {
        match slot {
            Slot::Root => {
                if !props.is_empty() {
                    self.out.push_str(props);
                    self.out.push('\n');
                }
                (0, false)
            }
            Slot::Item if props.is_empty() => {
                self.out.push(' ');
                (column + 2, true)
            }
            Slot::Value | Slot::Item => {
                if !props.is_empty() {
                    self.out.push(' ');
                    self.out.push_str(props);
                }
                self.out.push('\n');
                (column + self.indent, false)
            }
        }
    }

    fn write_sequence(&mut self, items: &[NodeId], column: usize, compact: bool) -> Result<(), EncodingError> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 || !compact {
                self.out.push_str(&" ".repeat(column));
            }
            self.out.push('-');
            self.write_node(*item, column, Slot::Item)?;
        }
        Ok(())
    }

    fn write_mapping(
        &mut self,
        pairs: &[(NodeId, NodeId)],
        column: usize,
        compact: bool,
    ) -> Result<(), EncodingError> {
        for (i, (key, value)) in pairs.iter().enumerate() {
            if i > 0 || !compact {
                self.out.push_str(&" ".repeat(column));
            }
            let key_text = self.flow_node(*key, false)?;
            self.out.push_str(&key_text);
            // `*name:` would read the colon as part of the alias name.
            if key_text.starts_with('*') {
                self.out.push(' ');
            }
            self.out.push(':');
            self.write_node(*value, column, Slot::Value)?;
        }
        Ok(())
    }

    fn write_scalar(&mut self, scalar: &YamlScalar, props: &str, column: usize, slot: Slot) {
        if scalar.style().is_block() {
            if let Some((header, body)) = block_scalar(scalar, self.indent) {
                let prefix = " ".repeat(column + self.indent);
                self.write_inline(slot, &with_props(props, &header));
                for line in body.split('\n') {
                    if !line.is_empty() {
                        self.out.push_str(&prefix);
                        self.out.push_str(line);
                    }
                    self.out.push('\n');
                }
                return;
            }
        }
        let text = inline_scalar(scalar, false);
        self.write_inline(slot, &with_props(props, &text));
    }

    /// Writes a node on one line: keys, and collections inside keys.
    fn flow_node(&mut self, id: NodeId, in_flow: bool) -> Result<String, EncodingError> {
        let target = match self.target(id)? {
            Target::Alias(name) => return Ok(format!("*{}", name)),
            Target::Node(target) => target,
        };
        let doc = self.doc;
        let node = doc.get(target).ok_or(EncodingError::UnknownNode { node: target })?;
        let props = self.properties(target);

        self.active.push(target);
        let body = match node.kind() {
            NodeKind::Scalar(scalar) => Ok(inline_scalar(scalar, in_flow)),
            NodeKind::Sequence(items) => items
                .iter()
                .map(|item| self.flow_node(*item, true))
                .collect::<Result<Vec<_>, _>>()
                .map(|parts| format!("[{}]", parts.join(", "))),
            NodeKind::Mapping(pairs) => pairs
                .iter()
                .map(|(k, v)| {
                    let key = self.flow_node(*k, true)?;
                    let value = self.flow_node(*v, true)?;
                    let sep = if key.starts_with('*') { " :" } else { ":" };
                    Ok(format!("{}{} {}", key, sep, value))
                })
                .collect::<Result<Vec<_>, _>>()
                .map(|parts| format!("{{{}}}", parts.join(", "))),
            NodeKind::Alias(_) => Err(EncodingError::RecursiveAlias { alias: id }),
        };
        self.active.pop();
        Ok(with_props(&props, &body?))
    }
}

fn with_props(props: &str, text: &str) -> String {
    if props.is_empty() {
        text.to_string()
    } else {
        format!("{} {}", props, text)
    }
}

/// Renders a scalar on a single line, keeping its style where possible.
fn inline_scalar(scalar: &YamlScalar, in_flow: bool) -> String {
    let text = scalar.value();
    match scalar.style() {
        ScalarStyle::Plain if text.is_empty() => "~".to_string(),
        ScalarStyle::Plain if is_plain_safe(text, in_flow) => text.to_string(),
        ScalarStyle::SingleQuoted if is_single_quote_safe(text) => {
            format!("'{}'", text.replace('\'', "''"))
        }
        _ => format!("\"{}\"", escape_double_quoted(text)),
    }
}

/// Header and body of a block scalar, or `None` if the text cannot be
/// written as one.
///
/// Folded text containing line breaks is written as a literal block, which
/// reads back to the same string.
fn block_scalar(scalar: &YamlScalar, indent: usize) -> Option<(String, String)> {
    let text = scalar.value();
    if text.chars().any(|c| c != '\n' && c != '\t' && needs_escape(c)) {
        return None;
    }
    let body = text.trim_end_matches('\n');
    if body.is_empty() {
        return None;
    }
    let trailing = text.len() - body.len();

    let indicator = if scalar.style() == ScalarStyle::Folded && !body.contains('\n') {
        '>'
    } else {
        '|'
    };
    // Leading spaces on the first line would be taken for indentation.
    let first_line = body.split('\n').find(|line| !line.is_empty()).unwrap_or("");
    let indentation = if first_line.starts_with(' ') {
        if indent > 9 {
            return None;
        }
        indent.to_string()
    } else {
        String::new()
    };
    let chomping = match trailing {
        0 => "-",
        1 => "",
        _ => "+",
    };

    let mut body = body.to_string();
    // Kept trailing line breaks beyond the first become empty lines.
    for _ in 1..trailing {
        body.push('\n');
    }
    Some((format!("{}{}{}", indicator, indentation, chomping), body))
}

/// Characters that can only appear in a double-quoted scalar.
fn needs_escape(c: char) -> bool {
    c.is_control() || matches!(c, '\u{feff}' | '\u{2028}' | '\u{2029}')
}

/// Whether `text` reads back as the same plain scalar.
fn is_plain_safe(text: &str, in_flow: bool) -> bool {
    let first = match text.chars().next() {
        Some(c) => c,
        None => return false,
    };
    if text.starts_with(char::is_whitespace) || text.ends_with(char::is_whitespace) {
        return false;
    }
    if text.chars().any(needs_escape) {
        return false;
    }
    if text.starts_with("---") || text.starts_with("...") {
        return false;
    }
    if text.contains(": ") || text.contains(" #") || text.ends_with(':') {
        return false;
    }
    let flow_indicator = |c: char| matches!(c, ',' | '[' | ']' | '{' | '}');
    if in_flow && text.chars().any(flow_indicator) {
        return false;
    }
    match first {
        '-' | '?' | ':' => text
            .chars()
            .nth(1)
            .is_some_and(|c| !c.is_whitespace() && !(in_flow && flow_indicator(c))),
        ',' | '[' | ']' | '{' | '}' | '#' | '&' | '*' | '!' | '|' | '>' | '\'' | '"' | '%' | '@'
        | '`' => false,
        _ => true,
    }
}

fn is_single_quote_safe(text: &str) -> bool {
    !text.chars().any(needs_escape)
}

/// Escapes special characters for a double-quoted YAML scalar.
fn escape_double_quoted(s: &str) -> String {
    let mut result = String::with_capacity(s.len());

    for c in s.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            '\r' => result.push_str("\\r"),
            '\t' => result.push_str("\\t"),
            '\0' => result.push_str("\\0"),
            '\x07' => result.push_str("\\a"),
            '\x08' => result.push_str("\\b"),
            '\x0B' => result.push_str("\\v"),
            '\x0C' => result.push_str("\\f"),
            '\x1B' => result.push_str("\\e"),
            '\u{85}' => result.push_str("\\N"),
            '\u{2028}' => result.push_str("\\L"),
            '\u{2029}' => result.push_str("\\P"),
            c if needs_escape(c) => {
                if (c as u32) < 0x100 {
                    result.push_str(&format!("\\x{:02x}", c as u32));
                } else {
                    result.push_str(&format!("\\u{:04x}", c as u32));
                }
            }
            c => result.push(c),
        }
    }

    result
}
