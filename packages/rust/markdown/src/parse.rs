//! Markdown text → [`Tree`] using `pulldown-cmark`.
//!
//! `pulldown-cmark` resolves reference links while parsing and never emits
//! events for their definitions. The builder undoes both: every
//! reference-style link becomes a [`NodeKind::LinkReference`] (whether or
//! not its label is defined), and every definition is re-inserted as a
//! top-level [`NodeKind::Definition`] at its source position.

use std::collections::VecDeque;
use std::ops::Range;

use indextree::NodeId;
use pulldown_cmark::{BrokenLink, CodeBlockKind, Event, LinkType, Options, Parser, Tag};
use tracing::trace;

use crate::tree::{Alignment, NodeKind, ReferenceKind, Tree};

/// Extensions enabled for every document.
fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_YAML_STYLE_METADATA_BLOCKS
}

/// Parse markdown text into a tree.
pub(crate) fn parse(text: &str) -> Tree {
    // Keep undefined `[label]` references as links so they survive as
    // LinkReference nodes instead of collapsing into plain text.
    let callback = |_link: BrokenLink| Some(("".into(), "".into()));
    let parser = Parser::new_with_broken_link_callback(text, options(), Some(callback));

    let mut definitions: Vec<PendingDefinition> = parser
        .reference_definitions()
        .iter()
        .map(|(label, def)| PendingDefinition {
            offset: def.span.start,
            kind: NodeKind::Definition {
                label: label.to_string(),
                url: def.dest.to_string(),
                title: def.title.as_ref().map(|t| t.to_string()),
            },
        })
        .collect();
    definitions.sort_by_key(|d| d.offset);

    let mut builder = TreeBuilder::new(definitions.into());
    for (event, range) in parser.into_offset_iter() {
        builder.event(event, range);
    }
    builder.finish()
}

struct PendingDefinition {
    offset: usize,
    kind: NodeKind,
}

struct TreeBuilder {
    tree: Tree,
    stack: Vec<NodeId>,
    definitions: VecDeque<PendingDefinition>,
}

impl TreeBuilder {
    fn new(definitions: VecDeque<PendingDefinition>) -> Self {
        let tree = Tree::new();
        let stack = vec![tree.root()];
        Self {
            tree,
            stack,
            definitions,
        }
    }

    fn current(&self) -> NodeId {
        *self.stack.last().unwrap_or(&self.tree.root())
    }

    fn at_top_level(&self) -> bool {
        self.stack.len() == 1
    }

    /// Emit every definition that starts before `offset` at the top level.
    fn flush_definitions(&mut self, offset: usize) {
        while self.definitions.front().is_some_and(|d| d.offset < offset) {
            if let Some(def) = self.definitions.pop_front() {
                let root = self.tree.root();
                self.tree.append(root, def.kind);
            }
        }
    }

    fn open(&mut self, kind: NodeKind) {
        let parent = self.current();
        let node = self.tree.append(parent, kind);
        self.stack.push(node);
    }

    fn leaf(&mut self, kind: NodeKind) {
        let parent = self.current();
        self.tree.append(parent, kind);
    }

    fn event(&mut self, event: Event<'_>, range: Range<usize>) {
        if self.at_top_level() && matches!(event, Event::Start(_) | Event::Rule) {
            self.flush_definitions(range.start);
        }

        match event {
            Event::Start(tag) => {
                let kind = tag_kind(tag);
                self.open(kind);
            }
            Event::End(_) => {
                if self.stack.len() > 1 {
                    self.stack.pop();
                }
            }
            Event::Text(text) => {
                let current = self.current();
                match self.tree.kind_mut(current) {
                    NodeKind::CodeBlock { literal, .. } => literal.push_str(&text),
                    NodeKind::FrontMatter { raw } | NodeKind::Html { raw } => raw.push_str(&text),
                    _ => self.leaf(NodeKind::Text(text.to_string())),
                }
            }
            Event::Html(html) => {
                let current = self.current();
                match self.tree.kind_mut(current) {
                    NodeKind::Html { raw } => raw.push_str(&html),
                    _ => self.leaf(NodeKind::Html {
                        raw: html.to_string(),
                    }),
                }
            }
            Event::Code(code) | Event::InlineMath(code) | Event::DisplayMath(code) => {
                self.leaf(NodeKind::Code(code.to_string()))
            }
            Event::InlineHtml(html) => self.leaf(NodeKind::InlineHtml(html.to_string())),
            Event::FootnoteReference(name) => self.leaf(NodeKind::Text(format!("[^{name}]"))),
            Event::SoftBreak => self.leaf(NodeKind::SoftBreak),
            Event::HardBreak => self.leaf(NodeKind::HardBreak),
            Event::Rule => self.leaf(NodeKind::ThematicBreak),
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.leaf(NodeKind::Text(marker.to_string()))
            }
        }
    }

    fn finish(mut self) -> Tree {
        self.flush_definitions(usize::MAX);
        self.tree
    }
}

fn tag_kind(tag: Tag<'_>) -> NodeKind {
    match tag {
        Tag::Paragraph => NodeKind::Paragraph,
        Tag::Heading { level, .. } => NodeKind::Heading { depth: level as u8 },
        Tag::BlockQuote(_) => NodeKind::BlockQuote,
        Tag::CodeBlock(CodeBlockKind::Fenced(info)) => NodeKind::CodeBlock {
            info: info.to_string(),
            literal: String::new(),
        },
        Tag::CodeBlock(CodeBlockKind::Indented) => NodeKind::CodeBlock {
            info: String::new(),
            literal: String::new(),
        },
        Tag::HtmlBlock => NodeKind::Html { raw: String::new() },
        Tag::List(start) => NodeKind::List { start },
        Tag::Item => NodeKind::ListItem,
        Tag::Table(alignments) => NodeKind::Table {
            alignments: alignments.into_iter().map(alignment).collect(),
        },
        Tag::TableHead => NodeKind::TableHead,
        Tag::TableRow => NodeKind::TableRow,
        Tag::TableCell => NodeKind::TableCell,
        Tag::Emphasis => NodeKind::Emphasis,
        Tag::Strong => NodeKind::Strong,
        Tag::Strikethrough => NodeKind::Strikethrough,
        Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        } => match reference_kind(link_type) {
            Some(kind) => NodeKind::LinkReference {
                label: id.to_string(),
                kind,
            },
            None => NodeKind::Link {
                url: dest_url.to_string(),
                title: non_empty(&title),
            },
        },
        Tag::Image {
            dest_url, title, ..
        } => NodeKind::Image {
            url: dest_url.to_string(),
            title: non_empty(&title),
        },
        Tag::MetadataBlock(_) => NodeKind::FrontMatter { raw: String::new() },
        other => {
            trace!(tag = ?other, "unsupported block, keeping its content as a paragraph");
            NodeKind::Paragraph
        }
    }
}

fn reference_kind(link_type: LinkType) -> Option<ReferenceKind> {
    match link_type {
        LinkType::Reference | LinkType::ReferenceUnknown => Some(ReferenceKind::Full),
        LinkType::Collapsed | LinkType::CollapsedUnknown => Some(ReferenceKind::Collapsed),
        LinkType::Shortcut | LinkType::ShortcutUnknown => Some(ReferenceKind::Shortcut),
        _ => None,
    }
}

fn alignment(a: pulldown_cmark::Alignment) -> Alignment {
    match a {
        pulldown_cmark::Alignment::None => Alignment::None,
        pulldown_cmark::Alignment::Left => Alignment::Left,
        pulldown_cmark::Alignment::Center => Alignment::Center,
        pulldown_cmark::Alignment::Right => Alignment::Right,
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(tree: &Tree) -> Vec<NodeKind> {
        tree.top_level()
            .into_iter()
            .map(|id| tree.kind(id).clone())
            .collect()
    }

    #[test]
    fn parses_headings_and_paragraphs() {
        let tree = parse("# Title\n\nSome text\n\n## Sub\n");
        let top = kinds(&tree);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0], NodeKind::Heading { depth: 1 });
        assert_eq!(top[1], NodeKind::Paragraph);
        assert_eq!(top[2], NodeKind::Heading { depth: 2 });
    }

    #[test]
    fn keeps_reference_links_and_definitions() {
        let tree = parse("# A\nSee [x].\n\n[x]: /b.md \"B\"");
        let top = tree.top_level();
        assert_eq!(top.len(), 3);
        assert_eq!(
            tree.kind(top[2]),
            &NodeKind::Definition {
                label: "x".into(),
                url: "/b.md".into(),
                title: Some("B".into()),
            }
        );

        let refs = tree.find_all(|t, id| matches!(t.kind(id), NodeKind::LinkReference { .. }));
        assert_eq!(refs.len(), 1);
        assert_eq!(
            tree.kind(refs[0]),
            &NodeKind::LinkReference {
                label: "x".into(),
                kind: ReferenceKind::Shortcut,
            }
        );
        assert_eq!(tree.text_content(refs[0]), "x");
    }

    #[test]
    fn definitions_keep_their_position() {
        let tree = parse("# A\n\n[a]: /a\n\nText\n\n[b]: /b\n\n# B\n");
        let top = kinds(&tree);
        assert!(matches!(top[1], NodeKind::Definition { ref label, .. } if label == "a"));
        assert_eq!(top[2], NodeKind::Paragraph);
        assert!(matches!(top[3], NodeKind::Definition { ref label, .. } if label == "b"));
        assert_eq!(top[4], NodeKind::Heading { depth: 1 });
    }

    #[test]
    fn undefined_reference_stays_a_reference() {
        let tree = parse("See [missing][nowhere].");
        let refs = tree.find_all(|t, id| matches!(t.kind(id), NodeKind::LinkReference { .. }));
        assert_eq!(refs.len(), 1);
        assert!(matches!(
            tree.kind(refs[0]),
            NodeKind::LinkReference { label, kind: ReferenceKind::Full } if label == "nowhere"
        ));
    }

    #[test]
    fn html_blocks_are_single_nodes() {
        let tree = parse("<!-- YAML\nadded: v1.0.0\n-->\n\nBody\n");
        let top = tree.top_level();
        match tree.kind(top[0]) {
            NodeKind::Html { raw } => {
                assert!(raw.starts_with("<!-- YAML"));
                assert!(raw.contains("added: v1.0.0"));
            }
            other => panic!("expected html block, got {other:?}"),
        }
    }

    #[test]
    fn code_blocks_collect_literal() {
        let tree = parse("```js\nconst a = 1;\n```\n");
        let top = tree.top_level();
        assert_eq!(
            tree.kind(top[0]),
            &NodeKind::CodeBlock {
                info: "js".into(),
                literal: "const a = 1;\n".into(),
            }
        );
    }

    #[test]
    fn yaml_metadata_block_becomes_front_matter() {
        let tree = parse("---\ntitle: fs\n---\n\n# fs\n");
        let top = kinds(&tree);
        assert!(matches!(&top[0], NodeKind::FrontMatter { raw } if raw.contains("title: fs")));
    }
}
