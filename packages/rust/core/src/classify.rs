//! Node classification by semantic role.
//!
//! The pipeline never matches on node shapes directly; it asks a
//! [`Classify`] implementation. Structural roles have default
//! implementations keyed on the node tag, content-based roles
//! (stability markers, front matter, typed text, internal links) are
//! supplied by [`DocClassifier`].

use std::sync::LazyLock;

use apidoc_markdown::{NodeId, NodeKind, Tree};
use apidoc_shared::ParserConfig;
use regex::Regex;

/// `{string}`, `{Buffer|URL}`, `{Object[]}` style type annotations.
pub(crate) static TYPED_TEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{([A-Za-z_$][\w.$]*(?:\[\])*(?:\s*\|\s*[A-Za-z_$][\w.$]*(?:\[\])*)*)\}")
        .expect("valid regex")
});

/// `Stability: 1.1 - Active development`
static STABILITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^Stability:\s*(\d+(?:\.\d+)?)\s*(?:-\s*(.*))?$").expect("valid regex")
});

/// `<!-- YAML ... -->`
static YAML_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^\s*<!--\s*YAML\s*?\r?\n(.*?)-->\s*$").expect("valid regex")
});

/// `<!-- introduced_in=v0.10.0 -->`
static PAIR_COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*<!--\s*([A-Za-z][\w-]*)\s*=\s*(.*?)\s*-->\s*$").expect("valid regex")
});

/// Predicates over tree nodes, one per semantic role.
pub trait Classify: Send + Sync {
    fn is_heading(&self, tree: &Tree, id: NodeId) -> bool {
        matches!(tree.kind(id), NodeKind::Heading { .. })
    }

    fn is_definition(&self, tree: &Tree, id: NodeId) -> bool {
        matches!(tree.kind(id), NodeKind::Definition { .. })
    }

    fn is_link_reference(&self, tree: &Tree, id: NodeId) -> bool {
        matches!(tree.kind(id), NodeKind::LinkReference { .. })
    }

    /// A text node containing at least one `{Type}` annotation.
    fn is_typed_text(&self, tree: &Tree, id: NodeId) -> bool;

    /// A link to another document in the source markup format.
    fn is_internal_markup_link(&self, tree: &Tree, id: NodeId) -> bool;

    fn is_stability_marker(&self, tree: &Tree, id: NodeId) -> bool;

    fn is_front_matter(&self, tree: &Tree, id: NodeId) -> bool;
}

/// Classifier for API reference documents.
#[derive(Debug, Clone)]
pub struct DocClassifier {
    source_suffix: String,
}

impl DocClassifier {
    pub fn new(config: &ParserConfig) -> Self {
        Self {
            source_suffix: format!(".{}", config.source_extension),
        }
    }
}

impl Default for DocClassifier {
    fn default() -> Self {
        Self::new(&ParserConfig::default())
    }
}

impl Classify for DocClassifier {
    fn is_typed_text(&self, tree: &Tree, id: NodeId) -> bool {
        matches!(tree.kind(id), NodeKind::Text(text) if TYPED_TEXT_RE.is_match(text))
    }

    fn is_internal_markup_link(&self, tree: &Tree, id: NodeId) -> bool {
        match tree.kind(id) {
            NodeKind::Link { url, .. } => {
                is_internal(url) && split_target(url).0.ends_with(&self.source_suffix)
            }
            _ => false,
        }
    }

    fn is_stability_marker(&self, tree: &Tree, id: NodeId) -> bool {
        matches!(tree.kind(id), NodeKind::BlockQuote)
            && STABILITY_RE.is_match(tree.text_content(id).trim_start())
    }

    fn is_front_matter(&self, tree: &Tree, id: NodeId) -> bool {
        front_matter_source(tree.kind(id)).is_some()
    }
}

// ---------------------------------------------------------------------------
// Payload helpers shared with the enricher
// ---------------------------------------------------------------------------

/// Index and description of a stability marker's text.
pub(crate) fn stability_parts(text: &str) -> Option<(&str, &str)> {
    let caps = STABILITY_RE.captures(text.trim())?;
    let index = caps.get(1)?.as_str();
    let description = caps.get(2).map_or("", |m| m.as_str().trim());
    Some((index, description))
}

/// Where a front-matter node keeps its key-value payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FrontMatterSource<'a> {
    /// A YAML mapping.
    Yaml(&'a str),
    /// A single `key=value` pair.
    Pair(&'a str, &'a str),
}

pub(crate) fn front_matter_source(kind: &NodeKind) -> Option<FrontMatterSource<'_>> {
    match kind {
        NodeKind::FrontMatter { raw } => Some(FrontMatterSource::Yaml(raw)),
        NodeKind::Html { raw } => {
            if let Some(caps) = YAML_COMMENT_RE.captures(raw) {
                return caps.get(1).map(|m| FrontMatterSource::Yaml(m.as_str()));
            }
            let caps = PAIR_COMMENT_RE.captures(raw)?;
            Some(FrontMatterSource::Pair(caps.get(1)?.as_str(), caps.get(2)?.as_str()))
        }
        _ => None,
    }
}

/// Split a link target into its path and its `?query#fragment` suffix.
pub(crate) fn split_target(url: &str) -> (&str, &str) {
    let cut = url.find(['#', '?']).unwrap_or(url.len());
    url.split_at(cut)
}

/// Relative and root-relative targets are internal; anything with a
/// scheme or a protocol-relative host is not.
fn is_internal(url: &str) -> bool {
    if url.starts_with("//") || url.starts_with('#') {
        return false;
    }
    matches!(
        url::Url::parse(url),
        Err(url::ParseError::RelativeUrlWithoutBase)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use apidoc_markdown::TreeEngine;

    fn first_of(md: &str, pred: impl Fn(&Tree, NodeId) -> bool) -> Option<(Tree, NodeId)> {
        let tree = TreeEngine::new().parse(md);
        let found = tree.find_all(|t, id| pred(t, id)).into_iter().next()?;
        Some((tree, found))
    }

    #[test]
    fn detects_stability_markers() {
        let classifier = DocClassifier::default();
        let found = first_of("> Stability: 2 - Stable", |t, id| {
            classifier.is_stability_marker(t, id)
        });
        assert!(found.is_some());

        let plain = first_of("> Just a quote", |t, id| classifier.is_stability_marker(t, id));
        assert!(plain.is_none());
    }

    #[test]
    fn stability_parts_split_index_and_description() {
        assert_eq!(stability_parts("Stability: 1.1 - Active development"), Some(("1.1", "Active development")));
        assert_eq!(stability_parts("Stability: 2"), Some(("2", "")));
        assert_eq!(stability_parts("Stable"), None);
    }

    #[test]
    fn detects_front_matter_comments() {
        let yaml = NodeKind::Html {
            raw: "<!-- YAML\nadded: v0.1.90\n-->\n".into(),
        };
        assert_eq!(
            front_matter_source(&yaml),
            Some(FrontMatterSource::Yaml("added: v0.1.90\n"))
        );

        let pair = NodeKind::Html {
            raw: "<!--introduced_in=v0.10.0-->\n".into(),
        };
        assert_eq!(
            front_matter_source(&pair),
            Some(FrontMatterSource::Pair("introduced_in", "v0.10.0"))
        );

        let lint = NodeKind::Html {
            raw: "<!-- lint disable maximum-line-length -->\n".into(),
        };
        assert_eq!(front_matter_source(&lint), None);
    }

    #[test]
    fn detects_typed_text() {
        let classifier = DocClassifier::default();
        assert!(first_of("* `path` {string|Buffer|URL}", |t, id| classifier.is_typed_text(t, id)).is_some());
        assert!(first_of("An object literal { a: 1 }", |t, id| classifier.is_typed_text(t, id)).is_none());
    }

    #[test]
    fn internal_links_need_source_extension() {
        let classifier = DocClassifier::default();
        let is_internal_link = |md: &str| {
            first_of(md, |t, id| classifier.is_internal_markup_link(t, id)).is_some()
        };

        assert!(is_internal_link("[fs](fs.md)"));
        assert!(is_internal_link("[dir](/api/fs.md#class-fsdir)"));
        assert!(!is_internal_link("[gh](https://github.com/nodejs/node/blob/main/README.md)"));
        assert!(!is_internal_link("[cdn](//example.com/a.md)"));
        assert!(!is_internal_link("[page](fs.html)"));
        assert!(!is_internal_link("[anchor](#fsreadfile)"));
    }

    #[test]
    fn split_target_keeps_fragment() {
        assert_eq!(split_target("fs.md#class-fsdir"), ("fs.md", "#class-fsdir"));
        assert_eq!(split_target("fs.md"), ("fs.md", ""));
        assert_eq!(split_target("a.md?x=1#y"), ("a.md", "?x=1#y"));
    }
}
