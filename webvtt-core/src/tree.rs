//! Tree representation of cue payload markup.
//!
//! The tree uses an index-based arena so nodes can point at their parent
//! without reference cycles. Each node attaches to exactly one parent when
//! it is created, and the root is a plain container that is never itself
//! formatted.
//!
//! # Example
//!
//! ```
//! use webvtt_core::payload;
//! use webvtt_core::tree::NodeKind;
//!
//! let body = payload::parse_text("Hello <b>World</b>");
//! let bold = body.root().children().nth(1).unwrap();
//! assert!(matches!(bold.kind(), NodeKind::Bold));
//! assert_eq!(bold.all_text(), "World");
//! ```

use std::fmt;

use crate::timestamp::Timestamp;

// ============================================================================
// Core Types
// ============================================================================

/// Index into the payload's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    const ROOT: NodeId = NodeId(0);

    fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Internal node storage.
#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeData {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
    /// Subclasses from `<tag.class.other>`.
    classes: Vec<String>,
    /// Language in effect for this node.
    lang: Option<String>,
}

/// The kind of node in the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Payload container.
    Root,

    /// Text run, entities already decoded.
    Text(String),

    /// `<hh:mm:ss.fff>` inside the payload.
    Timestamp(Timestamp),

    /// `<b>`
    Bold,
    /// `<i>`
    Italic,
    /// `<u>`
    Underline,
    /// `<ruby>`
    Ruby,
    /// `<rt>`, only inside `<ruby>`
    RubyText,
    /// `<v annotation>`: the speaker.
    Voice(String),
    /// `<lang code>`
    Lang(String),
    /// `<c>`
    Class,
}

impl NodeKind {
    /// Tag name used in markup, if this kind comes from a tag.
    pub fn tag_name(&self) -> Option<&'static str> {
        Some(match self {
            NodeKind::Bold => "b",
            NodeKind::Italic => "i",
            NodeKind::Underline => "u",
            NodeKind::Ruby => "ruby",
            NodeKind::RubyText => "rt",
            NodeKind::Voice(_) => "v",
            NodeKind::Lang(_) => "lang",
            NodeKind::Class => "c",
            NodeKind::Root | NodeKind::Text(_) | NodeKind::Timestamp(_) => return None,
        })
    }

    /// Whether two kinds come from the same tag, ignoring annotations.
    pub fn same_tag(&self, other: &NodeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn is_leaf(&self) -> bool {
        matches!(self, NodeKind::Text(_) | NodeKind::Timestamp(_))
    }
}

// ============================================================================
// CueText
// ============================================================================

/// A parsed cue payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueText {
    nodes: Vec<NodeData>,
}

impl Default for CueText {
    fn default() -> Self {
        TreeBuilder::new().finish()
    }
}

impl CueText {
    /// Get the root node.
    pub fn root(&self) -> Node<'_> {
        Node { tree: self, id: NodeId::ROOT }
    }

    /// Get a node by ID.
    pub fn get(&self, id: NodeId) -> Option<Node<'_>> {
        (id.index() < self.nodes.len()).then_some(Node { tree: self, id })
    }

    /// Total number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when the root has no children.
    pub fn is_empty(&self) -> bool {
        self.nodes[NodeId::ROOT.index()].children.is_empty()
    }

    fn node_data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }
}

impl fmt::Display for CueText {
    /// Normalized markup: entities re-escaped, implied end tags written out.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for child in self.root().children() {
            write_markup(child, f)?;
        }
        Ok(())
    }
}

fn write_markup(node: Node<'_>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match node.kind() {
        NodeKind::Root => {}
        NodeKind::Text(text) => {
            for ch in text.chars() {
                match ch {
                    '&' => f.write_str("&amp;")?,
                    '<' => f.write_str("&lt;")?,
                    '>' => f.write_str("&gt;")?,
                    _ => write!(f, "{ch}")?,
                }
            }
        }
        NodeKind::Timestamp(ts) => write!(f, "<{ts}>")?,
        kind => {
            let name = kind.tag_name().unwrap_or_default();
            write!(f, "<{name}")?;
            for class in node.classes() {
                write!(f, ".{class}")?;
            }
            if let NodeKind::Voice(annotation) | NodeKind::Lang(annotation) = kind {
                if !annotation.is_empty() {
                    write!(f, " {annotation}")?;
                }
            }
            f.write_str(">")?;
            for child in node.children() {
                write_markup(child, f)?;
            }
            write!(f, "</{name}>")?;
        }
    }
    Ok(())
}

// ============================================================================
// Node (navigation handle)
// ============================================================================

/// A handle for navigating the payload tree.
///
/// This is a lightweight reference that borrows from the tree.
#[derive(Clone, Copy)]
pub struct Node<'t> {
    tree: &'t CueText,
    id: NodeId,
}

impl<'t> Node<'t> {
    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Get the node's kind.
    pub fn kind(&self) -> &'t NodeKind {
        &self.tree.node_data(self.id).kind
    }

    /// Subclasses attached by `<tag.class>` syntax.
    pub fn classes(&self) -> &'t [String] {
        &self.tree.node_data(self.id).classes
    }

    /// Check if the node has a specific class.
    pub fn has_class(&self, class: &str) -> bool {
        self.classes().iter().any(|c| c == class)
    }

    /// Language in effect, inherited from the nearest `<lang>` ancestor.
    pub fn lang(&self) -> Option<&'t str> {
        self.tree.node_data(self.id).lang.as_deref()
    }

    /// Get the parent node, if any.
    pub fn parent(&self) -> Option<Node<'t>> {
        let tree = self.tree;
        tree.node_data(self.id).parent.map(|id| Node { tree, id })
    }

    /// Iterate over child nodes.
    pub fn children(&self) -> impl Iterator<Item = Node<'t>> + 't {
        let tree = self.tree;
        tree.node_data(self.id).children.iter().map(move |&id| Node { tree, id })
    }

    /// Get the first child node.
    pub fn first_child(&self) -> Option<Node<'t>> {
        let tree = self.tree;
        tree.node_data(self.id).children.first().map(|&id| Node { tree, id })
    }

    /// Get the next sibling node.
    pub fn next_sibling(&self) -> Option<Node<'t>> {
        let parent_id = self.tree.node_data(self.id).parent?;
        let siblings = &self.tree.node_data(parent_id).children;
        let pos = siblings.iter().position(|&id| id == self.id)?;
        siblings.get(pos + 1).map(|&id| Node { tree: self.tree, id })
    }

    /// Check if this is a text node.
    pub fn is_text(&self) -> bool {
        matches!(self.kind(), NodeKind::Text(_))
    }

    /// Get text content if this is a text node.
    pub fn text_content(&self) -> Option<&'t str> {
        if let NodeKind::Text(s) = self.kind() {
            Some(s.as_str())
        } else {
            None
        }
    }

    /// Voice or language annotation, if any.
    pub fn annotation(&self) -> Option<&'t str> {
        match self.kind() {
            NodeKind::Voice(s) | NodeKind::Lang(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Recursively collect all text content under this node.
    pub fn all_text(&self) -> String {
        let mut result = String::new();
        self.collect_text(&mut result);
        result
    }

    fn collect_text(&self, buf: &mut String) {
        match self.kind() {
            NodeKind::Text(s) => buf.push_str(s),
            _ => {
                for child in self.children() {
                    child.collect_text(buf);
                }
            }
        }
    }
}

impl fmt::Debug for Node<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id)
            .field("kind", self.kind())
            .field("classes", &self.classes())
            .field("lang", &self.lang())
            .finish()
    }
}

// ============================================================================
// TreeBuilder
// ============================================================================

/// Builds a payload tree from open/close/leaf calls.
#[derive(Debug)]
pub(crate) struct TreeBuilder {
    nodes: Vec<NodeData>,
    /// Stack of open node IDs, root at the bottom.
    stack: Vec<NodeId>,
}

impl TreeBuilder {
    pub(crate) fn new() -> Self {
        let root = NodeData {
            parent: None,
            children: Vec::new(),
            kind: NodeKind::Root,
            classes: Vec::new(),
            lang: None,
        };
        TreeBuilder { nodes: vec![root], stack: vec![NodeId::ROOT] }
    }

    pub(crate) fn current(&self) -> NodeId {
        self.stack.last().copied().unwrap_or(NodeId::ROOT)
    }

    pub(crate) fn current_kind(&self) -> &NodeKind {
        &self.nodes[self.current().index()].kind
    }

    fn push_node(&mut self, kind: NodeKind, classes: Vec<String>) -> NodeId {
        let parent = self.current();
        let lang = match &kind {
            NodeKind::Lang(code) => Some(code.clone()),
            _ => self.nodes[parent.index()].lang.clone(),
        };
        let id = NodeId::new(self.nodes.len());
        self.nodes.push(NodeData { parent: Some(parent), children: Vec::new(), kind, classes, lang });
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Open a formatting node; later content goes inside it.
    pub(crate) fn open(&mut self, kind: NodeKind, classes: Vec<String>) {
        debug_assert!(!kind.is_leaf());
        let id = self.push_node(kind, classes);
        self.stack.push(id);
    }

    /// Close the innermost open node of the same tag and everything opened
    /// inside it. Returns false when no such node is open.
    pub(crate) fn close(&mut self, kind: &NodeKind) -> bool {
        let found = self
            .stack
            .iter()
            .rposition(|&id| id != NodeId::ROOT && self.nodes[id.index()].kind.same_tag(kind));
        match found {
            Some(depth) => {
                self.stack.truncate(depth);
                true
            }
            None => false,
        }
    }

    /// Append text, merging with a preceding text sibling.
    pub(crate) fn text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let parent = self.current();
        if let Some(&last) = self.nodes[parent.index()].children.last() {
            if let NodeKind::Text(existing) = &mut self.nodes[last.index()].kind {
                existing.push_str(text);
                return;
            }
        }
        self.push_node(NodeKind::Text(text.to_string()), Vec::new());
    }

    /// Append a leaf timestamp.
    pub(crate) fn timestamp(&mut self, ts: Timestamp) {
        self.push_node(NodeKind::Timestamp(ts), Vec::new());
    }

    pub(crate) fn finish(self) -> CueText {
        CueText { nodes: self.nodes }
    }
}
