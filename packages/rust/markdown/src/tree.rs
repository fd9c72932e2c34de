//! Arena-backed document tree.
//!
//! Nodes live in an [`indextree::Arena`] and are addressed by [`NodeId`].
//! Removing a node only unlinks it from its parent, so handles held
//! elsewhere stay valid. Every traversal helper returns a snapshot
//! (`Vec<NodeId>`) that callers can iterate while mutating the tree.

use indextree::{Arena, NodeId};

/// Column alignment of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    None,
    Left,
    Center,
    Right,
}

/// How a link reference names its definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceKind {
    /// `[text][label]`
    Full,
    /// `[label][]`
    Collapsed,
    /// `[label]`
    Shortcut,
}

/// Type tag and payload of a tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Root,

    // Blocks
    Heading { depth: u8 },
    Paragraph,
    BlockQuote,
    List { start: Option<u64> },
    ListItem,
    CodeBlock { info: String, literal: String },
    Html { raw: String },
    ThematicBreak,
    Table { alignments: Vec<Alignment> },
    TableHead,
    TableRow,
    TableCell,
    /// `[label]: url "title"`
    Definition {
        label: String,
        url: String,
        title: Option<String>,
    },
    /// A `---` delimited YAML block at the top of a document.
    FrontMatter { raw: String },

    // Inlines
    Text(String),
    Code(String),
    Emphasis,
    Strong,
    Strikethrough,
    Link { url: String, title: Option<String> },
    LinkReference { label: String, kind: ReferenceKind },
    Image { url: String, title: Option<String> },
    InlineHtml(String),
    SoftBreak,
    HardBreak,
}

impl NodeKind {
    pub fn is_inline(&self) -> bool {
        matches!(
            self,
            Self::Text(_)
                | Self::Code(_)
                | Self::Emphasis
                | Self::Strong
                | Self::Strikethrough
                | Self::Link { .. }
                | Self::LinkReference { .. }
                | Self::Image { .. }
                | Self::InlineHtml(_)
                | Self::SoftBreak
                | Self::HardBreak
        )
    }
}

/// An ordered tree of [`NodeKind`] values with a single root.
#[derive(Debug, Clone)]
pub struct Tree {
    arena: Arena<NodeKind>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// An empty tree holding only its root.
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(NodeKind::Root);
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        self.arena[id].get()
    }

    pub fn kind_mut(&mut self, id: NodeId) -> &mut NodeKind {
        self.arena[id].get_mut()
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena[id].parent()
    }

    /// Snapshot of the direct children of `id`.
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        id.children(&self.arena).collect()
    }

    /// Snapshot of the root's children, in reading order.
    pub fn top_level(&self) -> Vec<NodeId> {
        self.children(self.root)
    }

    /// Snapshot of every node below `id` in document order, excluding `id`.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        id.descendants(&self.arena).skip(1).collect()
    }

    /// Ancestors of `id`, nearest first, excluding `id`.
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        id.ancestors(&self.arena).skip(1).collect()
    }

    /// Every attached node (root excluded) for which `pred` holds.
    pub fn find_all(&self, mut pred: impl FnMut(&Tree, NodeId) -> bool) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| pred(self, id))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.arena[self.root].first_child().is_none()
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id.ancestors(&self.arena).any(|ancestor| ancestor == self.root)
    }

    /// Append a new node as the last child of `parent`.
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let node = self.arena.new_node(kind);
        parent.append(node, &mut self.arena);
        node
    }

    /// Insert a new node immediately before `sibling`.
    pub fn insert_before(&mut self, sibling: NodeId, kind: NodeKind) -> NodeId {
        let node = self.arena.new_node(kind);
        sibling.insert_before(node, &mut self.arena);
        node
    }

    /// Unlink `id` (and its subtree) from its parent.
    pub fn detach(&mut self, id: NodeId) {
        id.detach(&mut self.arena);
    }

    /// Plain text of a subtree: text, code, and code block literals.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in id.descendants(&self.arena) {
            match self.kind(node) {
                NodeKind::Text(text) | NodeKind::Code(text) => out.push_str(text),
                NodeKind::CodeBlock { literal, .. } => out.push_str(literal),
                NodeKind::SoftBreak | NodeKind::HardBreak => out.push(' '),
                _ => {}
            }
        }
        out
    }

    /// Deep-copy `ids` (with their subtrees) under the root of a new tree.
    pub fn extract(&self, ids: &[NodeId]) -> Tree {
        let mut out = Tree::new();
        let root = out.root();
        // (source node, parent in `out`); popped in document order.
        let mut stack: Vec<(NodeId, NodeId)> = ids.iter().rev().map(|&id| (id, root)).collect();
        while let Some((src, parent)) = stack.pop() {
            let copy = out.append(parent, self.kind(src).clone());
            stack.extend(self.children(src).into_iter().rev().map(|child| (child, copy)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId) {
        let mut tree = Tree::new();
        let root = tree.root();
        let heading = tree.append(root, NodeKind::Heading { depth: 1 });
        tree.append(heading, NodeKind::Text("Title".into()));
        let para = tree.append(root, NodeKind::Paragraph);
        tree.append(para, NodeKind::Text("Hello ".into()));
        tree.append(para, NodeKind::Code("world".into()));
        (tree, heading, para)
    }

    #[test]
    fn top_level_preserves_order() {
        let (tree, heading, para) = sample();
        assert_eq!(tree.top_level(), vec![heading, para]);
        assert_eq!(tree.text_content(para), "Hello world");
    }

    #[test]
    fn detach_unlinks_but_keeps_handle_valid() {
        let (mut tree, heading, para) = sample();
        tree.detach(heading);

        assert_eq!(tree.top_level(), vec![para]);
        assert!(!tree.is_attached(heading));
        // The detached subtree is still readable.
        assert_eq!(tree.text_content(heading), "Title");
        assert!(tree.find_all(|t, id| matches!(t.kind(id), NodeKind::Heading { .. })).is_empty());
    }

    #[test]
    fn insert_before_places_sibling() {
        let (mut tree, heading, para) = sample();
        let rule = tree.insert_before(para, NodeKind::ThematicBreak);
        assert_eq!(tree.top_level(), vec![heading, rule, para]);
        assert_eq!(tree.parent(rule), Some(tree.root()));
    }

    #[test]
    fn extract_copies_independent_subtrees() {
        let (tree, _heading, para) = sample();
        let mut section = tree.extract(&[para]);

        let copied = section.top_level();
        assert_eq!(copied.len(), 1);
        assert_eq!(section.text_content(copied[0]), "Hello world");

        section.detach(copied[0]);
        assert!(section.is_empty());
        // The original is untouched.
        assert_eq!(tree.top_level().len(), 2);
    }

    #[test]
    fn extract_keeps_sibling_order() {
        let (tree, heading, para) = sample();
        let copy = tree.extract(&[heading, para]);

        let kinds: Vec<NodeKind> = copy
            .descendants(copy.root())
            .into_iter()
            .map(|id| copy.kind(id).clone())
            .collect();
        let expected: Vec<NodeKind> = tree
            .descendants(tree.root())
            .into_iter()
            .map(|id| tree.kind(id).clone())
            .collect();
        assert_eq!(kinds, expected);
    }

    #[test]
    fn extract_handles_deep_nesting() {
        let mut tree = Tree::new();
        let mut parent = tree.root();
        for _ in 0..5000 {
            parent = tree.append(parent, NodeKind::BlockQuote);
        }
        tree.append(parent, NodeKind::Text("deep".into()));
        let top = tree.top_level()[0];

        let copy = tree.extract(&[top]);
        assert_eq!(copy.descendants(copy.root()).len(), 5001);
        assert_eq!(copy.text_content(copy.top_level()[0]), "deep");
    }
}
