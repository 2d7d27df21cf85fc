//! Arena-backed XML document for MSBuild manifests
//!
//! Nodes live in one `Vec` and refer to each other by [`NodeId`]. Detached
//! nodes stay in the arena but are unreachable from the document node, so
//! ids handed out earlier never dangle.
//!
//! Attribute values and text are stored in their escaped source form; the
//! accessors unescape on read and escape on write. Whitespace-only text is
//! dropped on parse since the writer re-indents everything.

use crate::error::{Error, Result};
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::Event;
use quick_xml::Reader;

/// Index of a node in a [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element's tag, attributes and original empty form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Tag name
    pub name: String,
    /// `(name, escaped value)` pairs in source order
    pub attributes: Vec<(String, String)>,
    /// Whether the source wrote the element as `<X/>`
    pub self_closing: bool,
}

/// Content of one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The document itself; parent of the root element
    Document,
    /// An element
    Element(Element),
    /// Escaped character data
    Text(String),
    /// Comment body
    Comment(String),
    /// CDATA body
    CData(String),
    /// Processing instruction body
    Instruction(String),
    /// Doctype body
    DocType(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Line terminator used when writing a document back
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineEnding {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// Terminator text
    pub fn as_str(self) -> &'static str {
        match self {
            LineEnding::Lf => "\n",
            LineEnding::CrLf => "\r\n",
        }
    }
}

/// A parsed manifest
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    pub(crate) declaration: Option<String>,
    pub(crate) bom: bool,
    pub(crate) line_ending: LineEnding,
    pub(crate) trailing_newline: bool,
}

const DOCUMENT: NodeId = NodeId(0);
const BOM: char = '\u{feff}';

impl Document {
    /// Parse manifest text
    ///
    /// # Errors
    ///
    /// Returns an error on malformed XML or when no root element is present.
    pub fn parse(text: &str) -> Result<Self> {
        let (bom, text) = match text.strip_prefix(BOM) {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let line_ending = if text.contains("\r\n") {
            LineEnding::CrLf
        } else {
            LineEnding::Lf
        };
        let normalized = text.replace("\r\n", "\n");
        let trailing_newline = normalized.ends_with('\n');

        let (declaration, body) = split_declaration(&normalized);

        let mut document = Self {
            nodes: vec![Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
            declaration,
            bom,
            line_ending,
            trailing_newline,
        };

        let mut reader = Reader::from_str(body);
        reader.config_mut().trim_text(false);

        let mut open = vec![DOCUMENT];
        loop {
            let parent = *open.last().unwrap_or(&DOCUMENT);
            match reader.read_event()? {
                Event::Start(start) => {
                    let element = read_element(&start, false)?;
                    let id = document.push(NodeKind::Element(element), parent);
                    open.push(id);
                }
                Event::Empty(start) => {
                    let element = read_element(&start, true)?;
                    document.push(NodeKind::Element(element), parent);
                }
                Event::End(_) => {
                    if open.len() <= 1 {
                        return Err(Error::InvalidManifest("unbalanced closing tag".into()));
                    }
                    open.pop();
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(&text);
                    if !raw.trim().is_empty() {
                        document.push(NodeKind::Text(raw.into_owned()), parent);
                    }
                }
                Event::CData(data) => {
                    let raw = String::from_utf8_lossy(&data).into_owned();
                    document.push(NodeKind::CData(raw), parent);
                }
                Event::Comment(comment) => {
                    let raw = String::from_utf8_lossy(&comment).into_owned();
                    document.push(NodeKind::Comment(raw), parent);
                }
                Event::PI(instruction) => {
                    let raw = String::from_utf8_lossy(&instruction).into_owned();
                    document.push(NodeKind::Instruction(raw), parent);
                }
                Event::DocType(doctype) => {
                    let raw = String::from_utf8_lossy(&doctype).trim().to_string();
                    document.push(NodeKind::DocType(raw), parent);
                }
                Event::Decl(_) => {
                    return Err(Error::InvalidManifest(
                        "XML declaration must come first".into(),
                    ))
                }
                Event::Eof => break,
            }
        }

        if open.len() > 1 {
            return Err(Error::InvalidManifest("unclosed element at end of file".into()));
        }
        if document.root().is_none() {
            return Err(Error::InvalidManifest("no root element".into()));
        }
        Ok(document)
    }

    fn push(&mut self, kind: NodeKind, parent: NodeId) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: Some(parent),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// The document node (parent of the root element and prolog comments)
    pub fn document_node(&self) -> NodeId {
        DOCUMENT
    }

    /// The root element (`<Project>`)
    pub fn root(&self) -> Option<NodeId> {
        self.child_elements(DOCUMENT).next()
    }

    /// Content of a node
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Element content of a node, if it is an element
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Tag name of an element node
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// Whether `id` is an element named `name` (MSBuild names are case-insensitive)
    pub fn is_named(&self, id: NodeId, name: &str) -> bool {
        self.name(id).is_some_and(|n| n.eq_ignore_ascii_case(name))
    }

    /// Parent of a node; `None` for the document node and detached nodes
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    /// Children of a node in document order
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Element children of a node
    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
    }

    /// Element children named `name`
    pub fn children_named<'a>(
        &'a self,
        id: NodeId,
        name: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.child_elements(id).filter(move |c| self.is_named(*c, name))
    }

    /// Every element below `id` named `name`, in document order
    pub fn descendants_named(&self, id: NodeId, name: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            if self.is_named(node, name) {
                found.push(node);
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
        found
    }

    /// Unescaped value of an attribute, matched case-insensitively
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<String> {
        let element = self.element(id)?;
        element
            .attributes
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, raw)| unescape_lossy(raw))
    }

    /// Set an attribute, keeping its position when it already exists
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let escaped = escape(value).into_owned();
        match element
            .attributes
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
        {
            Some((_, raw)) => *raw = escaped,
            None => element.attributes.push((name.to_string(), escaped)),
        }
    }

    /// Unescaped character content of an element, `None` if it has none
    pub fn text(&self, id: NodeId) -> Option<String> {
        let mut text = String::new();
        let mut found = false;
        for child in self.children(id) {
            match self.kind(*child) {
                NodeKind::Text(raw) => {
                    text.push_str(&unescape_lossy(raw));
                    found = true;
                }
                NodeKind::CData(raw) => {
                    text.push_str(raw);
                    found = true;
                }
                _ => {}
            }
        }
        found.then(|| text.trim().to_string())
    }

    /// Replace an element's content with a single text node
    pub fn set_text(&mut self, id: NodeId, value: &str) {
        let previous = std::mem::take(&mut self.nodes[id.0].children);
        for child in previous {
            self.nodes[child.0].parent = None;
        }
        let raw = partial_escape(value).into_owned();
        self.push(NodeKind::Text(raw), id);
    }

    /// Create a detached element
    pub fn create_element(&mut self, name: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind: NodeKind::Element(Element {
                name: name.to_string(),
                attributes: Vec::new(),
                self_closing: true,
            }),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append a detached node as the last child of `parent`
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        let index = self.nodes[parent.0].children.len();
        self.insert_child(parent, index, child);
    }

    /// Insert a node as child `index` of `parent`, detaching it first
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.nodes[parent.0].children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.nodes[child.0].parent = Some(parent);
    }

    /// Remove a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != id);
        }
    }

    /// Line ending the document was read with
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }
}

fn read_element(start: &quick_xml::events::BytesStart<'_>, self_closing: bool) -> Result<Element> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        attributes.push((
            String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
            String::from_utf8_lossy(&attribute.value).into_owned(),
        ));
    }
    Ok(Element {
        name,
        attributes,
        self_closing,
    })
}

/// Split a leading `<?xml ...?>` off the (BOM-free, LF-normalised) source
fn split_declaration(text: &str) -> (Option<String>, &str) {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("<?xml") {
        if rest.starts_with(|c: char| c.is_whitespace()) {
            if let Some(end) = trimmed.find("?>") {
                let declaration = trimmed[..end + 2].to_string();
                return (Some(declaration), &trimmed[end + 2..]);
            }
        }
    }
    (None, text)
}

fn unescape_lossy(raw: &str) -> String {
    unescape(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
