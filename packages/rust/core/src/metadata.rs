//! Per-section metadata records.
//!
//! A [`MetadataBuilder`] is seeded from a section's heading, accumulates
//! stability and front matter while the section is enriched, and is sealed
//! together with the section's content into an immutable [`MetadataRecord`].

use std::fmt;

use apidoc_markdown::{Slugger, Tree};
use apidoc_shared::{FrontMatter, Stability};
use serde::{Serialize, Serializer};

use crate::segment::Heading;

// ---------------------------------------------------------------------------
// Content
// ---------------------------------------------------------------------------

/// A section's content tree. Renders to markdown each time it is asked.
#[derive(Debug, Clone)]
pub struct Content(Tree);

impl Content {
    pub fn new(tree: Tree) -> Self {
        Self(tree)
    }

    pub fn tree(&self) -> &Tree {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_markdown(&self) -> String {
        apidoc_markdown::stringify(&self.0)
    }
}

impl fmt::Display for Content {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_markdown())
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_markdown())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// Sealed metadata and content of one section.
#[derive(Debug, Clone, Serialize)]
pub struct MetadataRecord {
    api: String,
    title: String,
    slug: String,
    depth: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    stability: Option<Stability>,
    #[serde(skip_serializing_if = "Option::is_none")]
    front_matter: Option<FrontMatter>,
    content: Content,
}

impl MetadataRecord {
    /// Name of the API module the section belongs to.
    pub fn api(&self) -> &str {
        &self.api
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Anchor slug, unique within the document.
    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn stability(&self) -> Option<&Stability> {
        self.stability.as_ref()
    }

    pub fn front_matter(&self) -> Option<&FrontMatter> {
        self.front_matter.as_ref()
    }

    pub fn content(&self) -> &Content {
        &self.content
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates a section's metadata until it is sealed with [`build`](Self::build).
#[derive(Debug)]
pub struct MetadataBuilder {
    api: String,
    title: String,
    slug: String,
    depth: u8,
    stability: Option<Stability>,
    front_matter: FrontMatter,
}

impl MetadataBuilder {
    /// Seed a builder from `heading`. The slug is taken from `slugger`, which
    /// must be shared by every section of the document.
    pub fn new(api: impl Into<String>, heading: &Heading, slugger: &mut Slugger) -> Self {
        Self {
            api: api.into(),
            title: heading.title.clone(),
            slug: slugger.slug(&heading.title),
            depth: heading.depth.max(1),
            stability: None,
            front_matter: FrontMatter::new(),
        }
    }

    /// Replace any stability set earlier.
    pub fn set_stability(&mut self, stability: Stability) -> &mut Self {
        self.stability = Some(stability);
        self
    }

    /// Merge keys into the front matter; new values win.
    pub fn merge_front_matter(&mut self, front_matter: FrontMatter) -> &mut Self {
        self.front_matter.merge(front_matter);
        self
    }

    pub fn build(self, content: Content) -> MetadataRecord {
        MetadataRecord {
            api: self.api,
            title: self.title,
            slug: self.slug,
            depth: self.depth,
            stability: self.stability,
            front_matter: (!self.front_matter.is_empty()).then_some(self.front_matter),
            content,
        }
    }
}
