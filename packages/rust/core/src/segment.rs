//! Section segmentation.
//!
//! Every top-level heading owns the run of top-level siblings after it, up
//! to the next heading of any depth or the end of the document.

use std::ops::Range;

use apidoc_markdown::{NodeId, NodeKind, Tree};
use tracing::{debug, instrument};

use crate::classify::Classify;

/// Title and depth of a section's heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Heading {
    pub title: String,
    pub depth: u8,
}

/// A heading and an independent copy of the content it owns.
#[derive(Debug)]
pub struct Section {
    pub heading: Heading,
    pub tree: Tree,
}

/// For each heading in `top_level`, its index and the half-open range of
/// sibling indices it owns.
pub fn section_ranges(
    top_level: &[NodeId],
    is_heading: impl Fn(NodeId) -> bool,
) -> Vec<(usize, Range<usize>)> {
    let headings: Vec<usize> = top_level
        .iter()
        .enumerate()
        .filter(|&(_, &id)| is_heading(id))
        .map(|(i, _)| i)
        .collect();

    headings
        .iter()
        .enumerate()
        .map(|(n, &i)| {
            let end = headings.get(n + 1).copied().unwrap_or(top_level.len());
            (i, i + 1..end)
        })
        .collect()
}

/// Split `tree` into one [`Section`] per top-level heading, in document order.
#[instrument(skip_all)]
pub fn segment(tree: &Tree, classifier: &dyn Classify) -> Vec<Section> {
    let top_level = tree.top_level();
    let ranges = section_ranges(&top_level, |id| classifier.is_heading(tree, id));

    match ranges.first() {
        Some(&(first, _)) if first > 0 => {
            debug!(dropped = first, "content before the first heading belongs to no section");
        }
        _ => {}
    }

    let sections: Vec<Section> = ranges
        .into_iter()
        .map(|(i, range)| Section {
            heading: heading_of(tree, top_level[i]),
            tree: tree.extract(&top_level[range]),
        })
        .collect();

    debug!(sections = sections.len(), "segmented document");
    sections
}

fn heading_of(tree: &Tree, id: NodeId) -> Heading {
    let depth = match tree.kind(id) {
        NodeKind::Heading { depth } => *depth,
        _ => 1,
    };
    Heading {
        title: tree.text_content(id).trim().to_string(),
        depth,
    }
}
