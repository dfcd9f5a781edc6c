//! Arena-backed XML tree for TEI documents
//!
//! # Architecture
//!
//! Parsing uses quick-xml (event-based parser) and builds an index arena:
//! every node stores its parent and its ordered children as [`NodeId`]s.
//!
//! - Removing a node only detaches it from its parent. The slot stays in the
//!   arena, so ids collected by an earlier query remain valid while the tree
//!   is rewritten (collect first, then mutate).
//! - Names are stored as written (`persName`, `tei:persName`); queries match
//!   on the local part. Attributes keep their qualified names (`xml:id`).
//! - Everything before the root element (XML declaration, processing
//!   instructions, comments, DOCTYPE) is kept as verbatim source text, in
//!   order, and written back unchanged.

use crate::error::{BackmatterError, Result};
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fmt::Write as FmtWrite;

/// Default XML declaration written when the source had none.
pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Index of a node inside a [`TeiDocument`] arena.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single attribute, name as written in the source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// Node payload.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },
    /// Unescaped character data.
    Text(String),
    /// Content of a CDATA section (without the markers).
    CData(String),
    /// Comment or processing instruction inside the root, verbatim markup.
    Markup(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A parsed TEI document (or a standalone record fragment).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeiDocument {
    nodes: Vec<Node>,
    root: NodeId,
    prolog: Vec<String>,
    epilog: Vec<String>,
}

/// Local part of a qualified name (`tei:persName` → `persName`).
#[inline]
#[must_use]
pub fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map_or(name, |(_, local)| local)
}

impl TeiDocument {
    /// Create a fragment consisting of a single empty element.
    #[must_use]
    pub fn new(root_name: &str) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element {
                    name: root_name.to_string(),
                    attributes: Vec::new(),
                },
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
            prolog: Vec::new(),
            epilog: Vec::new(),
        }
    }

    /// Parse a document from UTF-8 bytes (a leading BOM is skipped).
    ///
    /// # Errors
    ///
    /// Returns [`BackmatterError::Encoding`] for invalid UTF-8, otherwise the
    /// errors of [`TeiDocument::parse`].
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
        Self::parse(std::str::from_utf8(bytes)?)
    }

    /// Parse a document from a string.
    ///
    /// # Errors
    ///
    /// - [`BackmatterError::Xml`] on syntax errors (mismatched end tags,
    ///   bad attributes, unknown entities)
    /// - [`BackmatterError::Malformed`] when there is no root element, an
    ///   element is left open, or content follows the root element
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        reader.trim_text(false);
        reader.expand_empty_elements(false);
        reader.check_end_names(true);

        let mut builder = TreeBuilder::default();

        loop {
            let start = reader.buffer_position() as usize;
            let event = reader.read_event()?;
            let end = reader.buffer_position() as usize;
            let raw = xml.get(start..end).unwrap_or_default();

            match event {
                Event::Start(e) => builder.open(&e)?,
                Event::Empty(e) => {
                    builder.open(&e)?;
                    builder.close()?;
                }
                Event::End(_) => builder.close()?,
                Event::Text(e) => builder.text(&e.unescape()?)?,
                Event::CData(e) => {
                    let content = std::str::from_utf8(&e)?;
                    builder.cdata(content)?;
                }
                Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_) => {
                    builder.markup(raw);
                }
                Event::Eof => break,
            }
        }

        builder.finish()
    }

    #[inline]
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Verbatim markup preceding the root element, in source order.
    #[must_use]
    pub fn prolog(&self) -> &[String] {
        &self.prolog
    }

    /// Processing instructions in the prolog (excluding the XML declaration).
    pub fn processing_instructions(&self) -> impl Iterator<Item = &str> {
        self.prolog
            .iter()
            .map(String::as_str)
            .filter(|m| m.starts_with("<?") && !is_xml_declaration(m))
    }

    #[inline]
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    #[inline]
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.kind(id), NodeKind::Element { .. })
    }

    /// Qualified element name, `None` for non-element nodes.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::Element { name, .. } => Some(name),
            _ => None,
        }
    }

    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id).map(local_part)
    }

    /// True if `id` is an element with the given local name.
    #[inline]
    #[must_use]
    pub fn is_named(&self, id: NodeId, local: &str) -> bool {
        self.local_name(id) == Some(local)
    }

    #[must_use]
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match self.kind(id) {
            NodeKind::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    #[must_use]
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    /// Set an attribute, replacing the value in place if it already exists.
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.index()].kind {
            if let Some(existing) = attributes.iter_mut().find(|a| a.name == name) {
                existing.value = value.to_string();
            } else {
                attributes.push(Attribute {
                    name: name.to_string(),
                    value: value.to_string(),
                });
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.index()].kind {
            let pos = attributes.iter().position(|a| a.name == name)?;
            return Some(attributes.remove(pos).value);
        }
        None
    }

    /// Replace attribute `from` by `to` carrying `value`.
    ///
    /// If `to` already exists its value is overwritten and `from` is dropped;
    /// otherwise `from` is renamed where it stands, keeping attribute order.
    pub fn rename_attr(&mut self, id: NodeId, from: &str, to: &str, value: &str) {
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.index()].kind {
            if attributes.iter().any(|a| a.name == to) {
                attributes.retain(|a| a.name != from);
                if let Some(target) = attributes.iter_mut().find(|a| a.name == to) {
                    target.value = value.to_string();
                }
            } else if let Some(source) = attributes.iter_mut().find(|a| a.name == from) {
                source.name = to.to_string();
                source.value = value.to_string();
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.index()].parent
    }

    #[inline]
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&c| self.is_element(c))
    }

    /// Element children with the given local name.
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        local: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.element_children(id)
            .filter(move |&c| self.is_named(c, local))
    }

    #[must_use]
    pub fn first_child_named(&self, id: NodeId, local: &str) -> Option<NodeId> {
        self.children_named(id, local).next()
    }

    /// All nodes below `id` in document order (not including `id`).
    ///
    /// Returns a snapshot, so the tree may be mutated while iterating it.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Descendant elements with the given local name, in document order.
    #[must_use]
    pub fn descendants_named(&self, id: NodeId, local: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&n| self.is_named(n, local))
            .collect()
    }

    /// Every element of the document, root included, in document order.
    #[must_use]
    pub fn elements(&self) -> Vec<NodeId> {
        let mut out = vec![self.root];
        out.extend(
            self.descendants(self.root)
                .into_iter()
                .filter(|&n| self.is_element(n)),
        );
        out
    }

    /// First element of the document (root included) with the given local name.
    #[must_use]
    pub fn find_first(&self, local: &str) -> Option<NodeId> {
        if self.is_named(self.root, local) {
            return Some(self.root);
        }
        self.descendants(self.root)
            .into_iter()
            .find(|&n| self.is_named(n, local))
    }

    /// Parent chain of `id`, nearest first.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// True if `ancestor` is a proper ancestor of `id`.
    #[must_use]
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// True if the node is reachable from the root.
    #[must_use]
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.root || self.is_descendant_of(id, self.root)
    }

    /// Concatenated text of the node and all its descendants.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Text(t) | NodeKind::CData(t) => out.push_str(t),
            NodeKind::Element { .. } => {
                for &child in self.children(id) {
                    self.collect_text(child, out);
                }
            }
            NodeKind::Markup(_) => {}
        }
    }

    /// Element name for `local` using the prefix of the root element, so new
    /// elements land in the same namespace as the document.
    #[must_use]
    pub fn qualify(&self, local: &str) -> String {
        match self.name(self.root).and_then(|n| n.split_once(':')) {
            Some((prefix, _)) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }

    fn push_node(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Create a detached element named `local` (qualified like the root).
    pub fn create_element(&mut self, local: &str) -> NodeId {
        let name = self.qualify(local);
        self.push_node(NodeKind::Element {
            name,
            attributes: Vec::new(),
        })
    }

    /// Create and append a new element under `parent`.
    pub fn append_element(&mut self, parent: NodeId, local: &str) -> NodeId {
        let id = self.create_element(local);
        self.append_child(parent, id);
        id
    }

    /// Append a text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.push_node(NodeKind::Text(text.to_string()));
        self.append_child(parent, id);
        id
    }

    /// Attach `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.index()].parent = Some(parent);
        self.nodes[parent.index()].children.push(child);
    }

    /// Put `new` where `old` stands and detach `old`.
    pub fn replace_with(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        self.detach(new);
        if let Some(pos) = self.nodes[parent.index()]
            .children
            .iter()
            .position(|&c| c == old)
        {
            self.nodes[parent.index()].children[pos] = new;
            self.nodes[new.index()].parent = Some(parent);
            self.nodes[old.index()].parent = None;
        }
    }

    /// Remove a node from its parent. The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != id);
        }
    }

    /// Drop all children of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.index()].children);
        for child in children {
            self.nodes[child.index()].parent = None;
        }
    }

    /// Drop all attributes and children of an element.
    pub fn clear_element(&mut self, id: NodeId) {
        self.clear_children(id);
        if let NodeKind::Element { attributes, .. } = &mut self.nodes[id.index()].kind {
            attributes.clear();
        }
    }

    /// Deep-copy `src_id` from `src` into this arena; the copy is detached.
    pub fn import_node(&mut self, src: &Self, src_id: NodeId) -> NodeId {
        let copy = self.push_node(src.kind(src_id).clone());
        for &child in src.children(src_id) {
            let child_copy = self.import_node(src, child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Deep-copy every child node of `src_id` and append the copies to `parent`.
    ///
    /// Returns the number of copied nodes at the first level.
    pub fn import_children(&mut self, parent: NodeId, src: &Self, src_id: NodeId) -> usize {
        let mut copied = 0;
        for &child in src.children(src_id) {
            let copy = self.import_node(src, child);
            self.append_child(parent, copy);
            copied += 1;
        }
        copied
    }

    /// Serialize the document: prolog verbatim, then the root element.
    #[must_use]
    pub fn to_xml_string(&self) -> String {
        let mut out = String::new();
        for markup in &self.prolog {
            out.push_str(markup);
            out.push('\n');
        }
        self.write_node(self.root, &mut out);
        for markup in &self.epilog {
            out.push('\n');
            out.push_str(markup);
        }
        out.push('\n');
        out
    }

    /// Serialize for storage: like [`to_xml_string`](Self::to_xml_string) but
    /// guarantees a leading XML declaration.
    #[must_use]
    pub fn to_file_string(&self) -> String {
        let serialized = self.to_xml_string();
        if self.prolog.first().is_some_and(|m| is_xml_declaration(m)) {
            serialized
        } else {
            format!("{XML_DECLARATION}\n{serialized}")
        }
    }

    /// Serialize a single node and its subtree.
    #[must_use]
    pub fn node_to_string(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        match self.kind(id) {
            NodeKind::Element { name, attributes } => {
                out.push('<');
                out.push_str(name);
                for attr in attributes {
                    let _ = write!(out, " {}=\"{}\"", attr.name, escape(attr.value.as_str()));
                }
                let children = self.children(id);
                if children.is_empty() {
                    out.push_str("/>");
                } else {
                    out.push('>');
                    for &child in children {
                        self.write_node(child, out);
                    }
                    out.push_str("</");
                    out.push_str(name);
                    out.push('>');
                }
            }
            NodeKind::Text(text) => out.push_str(&partial_escape(text.as_str())),
            NodeKind::CData(text) => {
                out.push_str("<![CDATA[");
                out.push_str(text);
                out.push_str("]]>");
            }
            NodeKind::Markup(raw) => out.push_str(raw),
        }
    }
}

fn is_xml_declaration(markup: &str) -> bool {
    markup
        .strip_prefix("<?xml")
        .and_then(|rest| rest.chars().next())
        .is_some_and(char::is_whitespace)
}

/// Incremental tree construction from parser events.
///
/// Shared by the full-document parser and the streaming record extractor.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<Node>,
    stack: Vec<NodeId>,
    root: Option<NodeId>,
    closed: bool,
    prolog: Vec<String>,
    epilog: Vec<String>,
}

impl TreeBuilder {
    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        let parent = self.stack.last().copied();
        self.nodes.push(Node {
            kind,
            parent,
            children: Vec::new(),
        });
        if let Some(parent) = parent {
            self.nodes[parent.index()].children.push(id);
        }
        id
    }

    /// Open an element from a quick-xml start tag.
    ///
    /// # Errors
    ///
    /// Fails on invalid attributes or a second root element.
    pub fn open(&mut self, start: &BytesStart<'_>) -> Result<()> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_string();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            attributes.push(Attribute {
                name: std::str::from_utf8(attr.key.as_ref())?.to_string(),
                value: attr.unescape_value()?.into_owned(),
            });
        }
        self.open_element(name, attributes)
    }

    /// Open an element from already decoded parts.
    ///
    /// # Errors
    ///
    /// Fails if the root element has already been closed.
    pub fn open_element(&mut self, name: String, attributes: Vec<Attribute>) -> Result<()> {
        if self.closed {
            return Err(BackmatterError::Malformed(format!(
                "element <{name}> after the root element"
            )));
        }
        let id = self.push(NodeKind::Element { name, attributes });
        if self.root.is_none() {
            self.root = Some(id);
        }
        self.stack.push(id);
        Ok(())
    }

    /// Close the innermost open element.
    ///
    /// # Errors
    ///
    /// Fails on an end tag without an open element.
    pub fn close(&mut self) -> Result<()> {
        self.stack
            .pop()
            .ok_or_else(|| BackmatterError::Malformed("unexpected end tag".to_string()))?;
        if self.stack.is_empty() {
            self.closed = true;
        }
        Ok(())
    }

    /// Add character data. Whitespace outside the root is ignored.
    ///
    /// # Errors
    ///
    /// Fails on non-whitespace text outside the root element.
    pub fn text(&mut self, text: &str) -> Result<()> {
        if self.stack.is_empty() {
            if text.trim().is_empty() {
                return Ok(());
            }
            return Err(BackmatterError::Malformed(
                "text outside the root element".to_string(),
            ));
        }
        self.push(NodeKind::Text(text.to_string()));
        Ok(())
    }

    /// Add a CDATA section.
    ///
    /// # Errors
    ///
    /// Fails outside the root element.
    pub fn cdata(&mut self, content: &str) -> Result<()> {
        if self.stack.is_empty() {
            return Err(BackmatterError::Malformed(
                "CDATA outside the root element".to_string(),
            ));
        }
        self.push(NodeKind::CData(content.to_string()));
        Ok(())
    }

    /// Add verbatim markup (comment, PI, declaration, DOCTYPE).
    pub fn markup(&mut self, raw: &str) {
        if self.stack.is_empty() {
            if self.closed {
                self.epilog.push(raw.to_string());
            } else {
                self.prolog.push(raw.to_string());
            }
        } else {
            self.push(NodeKind::Markup(raw.to_string()));
        }
    }

    /// True once the root element has been closed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.closed
    }

    /// Finish building.
    ///
    /// # Errors
    ///
    /// Fails when no root element was seen or elements are still open.
    pub fn finish(self) -> Result<TeiDocument> {
        let root = self
            .root
            .ok_or_else(|| BackmatterError::Malformed("no root element".to_string()))?;
        if !self.stack.is_empty() {
            return Err(BackmatterError::Malformed(format!(
                "{} unclosed element(s)",
                self.stack.len()
            )));
        }
        Ok(TeiDocument {
            nodes: self.nodes,
            root,
            prolog: self.prolog,
            epilog: self.epilog,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LETTER: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<?xml-model href="tei.rng" type="application/xml"?>
<?xml-stylesheet type="text/xsl" href="letter.xsl"?>
<TEI xmlns="http://www.tei-c.org/ns/1.0">
  <text><body><p>Lieber <persName ref="#pmb11">Hugo</persName> &amp; Co.</p></body></text>
</TEI>"##;

    #[test]
    fn test_parse_keeps_prolog_in_order() {
        let doc = TeiDocument::parse(LETTER).unwrap();
        assert_eq!(doc.prolog().len(), 3);
        let pis: Vec<&str> = doc.processing_instructions().collect();
        assert_eq!(
            pis,
            vec![
                r#"<?xml-model href="tei.rng" type="application/xml"?>"#,
                r#"<?xml-stylesheet type="text/xsl" href="letter.xsl"?>"#,
            ]
        );
    }

    #[test]
    fn test_round_trip_is_stable() {
        let doc = TeiDocument::parse(LETTER).unwrap();
        let once = doc.to_file_string();
        let twice = TeiDocument::parse(&once).unwrap().to_file_string();
        assert_eq!(once, twice);
        assert!(once.contains("&amp; Co."));
        assert!(once.starts_with(XML_DECLARATION));
    }

    #[test]
    fn test_declaration_added_when_missing() {
        let doc = TeiDocument::parse("<TEI/>").unwrap();
        assert_eq!(doc.to_file_string(), format!("{XML_DECLARATION}\n<TEI/>\n"));
        assert_eq!(doc.to_xml_string(), "<TEI/>\n");
    }

    #[test]
    fn test_queries_match_local_names() {
        let doc = TeiDocument::parse(
            r#"<tei:TEI xmlns:tei="http://www.tei-c.org/ns/1.0"><tei:persName ref="a"/></tei:TEI>"#,
        )
        .unwrap();
        let pers = doc.find_first("persName").unwrap();
        assert_eq!(doc.attr(pers, "ref"), Some("a"));
        assert_eq!(doc.qualify("back"), "tei:back");
    }

    #[test]
    fn test_detach_keeps_collected_ids_valid() {
        let mut doc = TeiDocument::parse("<r><a/><b/><c/></r>").unwrap();
        let all = doc.descendants(doc.root());
        for &id in &all {
            if doc.is_named(id, "b") {
                doc.detach(id);
            }
        }
        assert_eq!(doc.node_to_string(doc.root()), "<r><a/><c/></r>");
        assert!(!doc.is_attached(all[1]));
        assert!(doc.is_attached(all[2]));
    }

    #[test]
    fn test_replace_with_keeps_position() {
        let mut doc = TeiDocument::parse("<r><a/><b/><c/></r>").unwrap();
        let b = doc.find_first("b").unwrap();
        let x = doc.create_element("x");
        doc.append_text(x, "1 < 2");
        doc.replace_with(b, x);
        assert_eq!(doc.node_to_string(doc.root()), "<r><a/><x>1 &lt; 2</x><c/></r>");
    }

    #[test]
    fn test_rename_attr_in_place() {
        let mut doc = TeiDocument::parse(r#"<d when-iso="862" n="1"/>"#).unwrap();
        let root = doc.root();
        doc.rename_attr(root, "when-iso", "when", "0862");
        assert_eq!(doc.node_to_string(root), r#"<d when="0862" n="1"/>"#);
    }

    #[test]
    fn test_rename_attr_overwrites_existing_target() {
        let mut doc = TeiDocument::parse(r#"<d when="1" when-iso="2"/>"#).unwrap();
        let root = doc.root();
        doc.rename_attr(root, "when-iso", "when", "2");
        assert_eq!(doc.node_to_string(root), r#"<d when="2"/>"#);
    }

    #[test]
    fn test_import_node_deep_copies_between_documents() {
        let src = TeiDocument::parse(r#"<person xml:id="p"><persName>A<b/></persName></person>"#)
            .unwrap();
        let mut dst = TeiDocument::new("listPerson");
        let root = dst.root();
        dst.import_children(root, &src, src.root());
        assert_eq!(
            dst.node_to_string(root),
            "<listPerson><persName>A<b/></persName></listPerson>"
        );
    }

    #[test]
    fn test_rejects_unclosed_document() {
        assert!(TeiDocument::parse("<TEI><text>").is_err());
        assert!(TeiDocument::parse("").is_err());
        assert!(TeiDocument::parse("<a/><b/>").is_err());
    }

    #[test]
    fn test_comments_and_cdata_survive() {
        let xml = "<r><!-- note --><![CDATA[x < y]]></r>";
        let doc = TeiDocument::parse(xml).unwrap();
        assert_eq!(doc.node_to_string(doc.root()), xml);
        assert_eq!(doc.text_content(doc.root()), "x < y");
    }
}
