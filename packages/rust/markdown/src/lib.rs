//! Markdown document tree engine.
//!
//! Parses markdown into an arena-backed [`Tree`], runs a registered list of
//! normalization [`Transform`]s over it, and serializes it back to
//! CommonMark text. Also provides the per-document [`Slugger`].

mod parse;
mod render;
mod slug;
mod transform;
mod tree;

pub use indextree::NodeId;
pub use slug::{Slugger, slugify};
pub use transform::{MergeText, PruneEmpty, Transform, default_transforms};
pub use tree::{Alignment, NodeKind, ReferenceKind, Tree};

use tracing::{debug, instrument};

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

/// Parse, transform, and stringify markdown trees.
pub struct TreeEngine {
    transforms: Vec<Box<dyn Transform>>,
}

impl Default for TreeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TreeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TreeEngine")
            .field("transforms", &self.transform_names())
            .finish()
    }
}

impl TreeEngine {
    /// An engine with the default transforms registered.
    pub fn new() -> Self {
        Self {
            transforms: default_transforms(),
        }
    }

    /// Register an additional transform, run after the existing ones.
    pub fn with_transform(mut self, transform: impl Transform + 'static) -> Self {
        self.transforms.push(Box::new(transform));
        self
    }

    pub fn transform_names(&self) -> Vec<&'static str> {
        self.transforms.iter().map(|t| t.name()).collect()
    }

    /// Parse markdown text into a tree. No transforms are applied.
    #[instrument(skip_all, fields(len = text.len()))]
    pub fn parse(&self, text: &str) -> Tree {
        let tree = parse::parse(text);
        debug!(top_level = tree.top_level().len(), "parsed document");
        tree
    }

    /// Run every registered transform over `tree`, in registration order.
    pub fn run_transforms(&self, tree: &mut Tree) {
        for transform in &self.transforms {
            transform.apply(tree);
        }
    }

    /// Serialize a tree back to markdown.
    pub fn stringify(&self, tree: &Tree) -> String {
        render::stringify(tree)
    }
}

/// Serialize a tree to markdown without an engine instance.
pub fn stringify(tree: &Tree) -> String {
    render::stringify(tree)
}
