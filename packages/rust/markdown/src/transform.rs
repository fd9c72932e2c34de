//! Normalization transforms applied to a parsed tree.
//!
//! Each transform mutates the tree in place. The engine runs the registered
//! transforms in order, once over a whole document and again over each
//! section after its metadata nodes have been removed.

use tracing::trace;

use crate::tree::{NodeKind, Tree};

/// A single normalization pass.
pub trait Transform: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &'static str;

    /// Rewrite `tree` in place.
    fn apply(&self, tree: &mut Tree);
}

/// The transforms every engine starts with, in order.
pub fn default_transforms() -> Vec<Box<dyn Transform>> {
    vec![Box::new(MergeText), Box::new(PruneEmpty)]
}

// ---------------------------------------------------------------------------
// Pass 1: Merge adjacent text
// ---------------------------------------------------------------------------

/// Coalesce runs of sibling text nodes into one node.
///
/// The parser splits text at escapes and entity references, and
/// rewrites that replace or remove inline nodes leave fragments behind.
pub struct MergeText;

impl Transform for MergeText {
    fn name(&self) -> &'static str {
        "merge-text"
    }

    fn apply(&self, tree: &mut Tree) {
        let mut merged = 0usize;
        let parents: Vec<_> = std::iter::once(tree.root())
            .chain(tree.descendants(tree.root()))
            .collect();

        for parent in parents {
            let mut previous: Option<indextree::NodeId> = None;
            for child in tree.children(parent) {
                let NodeKind::Text(text) = tree.kind(child) else {
                    previous = None;
                    continue;
                };
                match previous {
                    Some(prev) => {
                        let text = text.clone();
                        if let NodeKind::Text(into) = tree.kind_mut(prev) {
                            into.push_str(&text);
                        }
                        tree.detach(child);
                        merged += 1;
                    }
                    None => previous = Some(child),
                }
            }
        }

        trace!(merged, "merged adjacent text nodes");
    }
}

// ---------------------------------------------------------------------------
// Pass 2: Prune empty containers
// ---------------------------------------------------------------------------

/// Drop paragraphs, block quotes, and list items with nothing left in them.
///
/// Runs bottom-up so a block quote whose only paragraph was emptied goes too.
/// Empty lists are removed once all their items are gone.
pub struct PruneEmpty;

impl Transform for PruneEmpty {
    fn name(&self) -> &'static str {
        "prune-empty"
    }

    fn apply(&self, tree: &mut Tree) {
        let mut pruned = 0usize;
        for id in tree.descendants(tree.root()).into_iter().rev() {
            let prunable = match tree.kind(id) {
                NodeKind::Paragraph => tree.text_content(id).trim().is_empty() && !has_media(tree, id),
                NodeKind::BlockQuote | NodeKind::ListItem | NodeKind::List { .. } => {
                    tree.children(id).is_empty()
                }
                NodeKind::Text(text) => text.is_empty(),
                _ => false,
            };
            if prunable {
                tree.detach(id);
                pruned += 1;
            }
        }

        trace!(pruned, "pruned empty nodes");
    }
}

/// Whether a paragraph holds something visible besides text.
fn has_media(tree: &Tree, id: indextree::NodeId) -> bool {
    tree.descendants(id).into_iter().any(|node| {
        matches!(
            tree.kind(node),
            NodeKind::Image { .. } | NodeKind::InlineHtml(_) | NodeKind::HardBreak
        )
    })
}
