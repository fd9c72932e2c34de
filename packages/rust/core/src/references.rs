//! Reference normalization over a whole document tree.
//!
//! Runs, in this order:
//! 1. collect every definition node
//! 2. rewrite each link reference with a matching definition into a direct link
//! 3. remove the definitions
//! 4. turn `{Type}` annotations into links to the type's reference page
//! 5. point links at other source documents to their published counterpart
//!
//! Step 3 must not start before step 2 has visited the whole tree.

use std::collections::{BTreeMap, HashMap, HashSet};

use apidoc_markdown::{NodeId, NodeKind, Tree};
use apidoc_shared::{ParserConfig, TypeLinkConfig};
use tracing::{debug, instrument};

use crate::classify::{Classify, TYPED_TEXT_RE, split_target};

/// Primitive types, linked as `<primitive_base_url>#<name>_type`.
const PRIMITIVES: [&str; 7] = [
    "bigint",
    "boolean",
    "null",
    "number",
    "string",
    "symbol",
    "undefined",
];

/// Counts of what a normalization pass changed.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NormalizeReport {
    pub resolved: usize,
    pub unresolved: usize,
    pub definitions_removed: usize,
    pub typed_spans: usize,
    pub internal_links: usize,
}

/// Rewrites references, type annotations, and internal links.
#[derive(Debug, Clone)]
pub struct ReferenceNormalizer {
    source_suffix: String,
    output_suffix: String,
    types: TypeLinker,
}

impl ReferenceNormalizer {
    pub fn new(parser: &ParserConfig, type_links: &TypeLinkConfig) -> Self {
        Self {
            source_suffix: format!(".{}", parser.source_extension),
            output_suffix: format!(".{}", parser.output_extension),
            types: TypeLinker::new(type_links),
        }
    }

    /// Run every step over `tree`.
    #[instrument(skip_all)]
    pub fn normalize(&self, tree: &mut Tree, classifier: &dyn Classify) -> NormalizeReport {
        let mut report = NormalizeReport::default();

        let definitions = collect_definitions(tree, classifier);
        (report.resolved, report.unresolved) = resolve_references(tree, classifier, &definitions);
        report.definitions_removed = remove_definitions(tree, classifier);
        report.typed_spans = self.link_types(tree, classifier);
        report.internal_links = self.rewrite_internal_links(tree, classifier);

        debug!(?report, "normalized references");
        report
    }

    /// Replace the source extension of an internal target, keeping any
    /// query or fragment. Targets without the extension come back unchanged.
    pub fn rewrite_target(&self, url: &str) -> String {
        let (path, suffix) = split_target(url);
        match path.strip_suffix(&self.source_suffix) {
            Some(stem) => format!("{stem}{}{suffix}", self.output_suffix),
            None => url.to_string(),
        }
    }

    fn link_types(&self, tree: &mut Tree, classifier: &dyn Classify) -> usize {
        let mut rewritten = 0;

        for id in tree.find_all(|t, id| classifier.is_typed_text(t, id)) {
            if inside_link(tree, id) {
                continue;
            }
            let NodeKind::Text(text) = tree.kind(id).clone() else {
                continue;
            };

            let pieces = self.types.split(&text);
            let linked = pieces
                .iter()
                .filter(|p| matches!(p, Piece::Type { url: Some(_), .. }))
                .count();
            if linked == 0 {
                continue;
            }

            for piece in pieces {
                match piece {
                    Piece::Text(text) => {
                        tree.insert_before(id, NodeKind::Text(text));
                    }
                    Piece::Type { name, url: Some(url) } => {
                        let link = tree.insert_before(id, NodeKind::Link { url, title: None });
                        tree.append(link, NodeKind::Code(format!("<{name}>")));
                    }
                    Piece::Type { name, url: None } => {
                        tree.insert_before(id, NodeKind::Code(format!("<{name}>")));
                    }
                }
            }
            tree.detach(id);
            rewritten += linked;
        }

        rewritten
    }

    fn rewrite_internal_links(&self, tree: &mut Tree, classifier: &dyn Classify) -> usize {
        let links = tree.find_all(|t, id| classifier.is_internal_markup_link(t, id));
        for &id in &links {
            let rewritten = match tree.kind(id) {
                NodeKind::Link { url, .. } => self.rewrite_target(url),
                _ => continue,
            };
            if let NodeKind::Link { url, .. } = tree.kind_mut(id) {
                *url = rewritten;
            }
        }
        links.len()
    }
}

// ---------------------------------------------------------------------------
// Definitions and link references
// ---------------------------------------------------------------------------

/// Target and title of a definition.
type Target = (String, Option<String>);

/// Definition labels are matched case-insensitively with collapsed
/// whitespace. The first definition of a label wins.
fn collect_definitions(tree: &Tree, classifier: &dyn Classify) -> HashMap<String, Target> {
    let mut definitions = HashMap::new();
    for id in tree.find_all(|t, id| classifier.is_definition(t, id)) {
        if let NodeKind::Definition { label, url, title } = tree.kind(id) {
            definitions
                .entry(normalize_label(label))
                .or_insert_with(|| (url.clone(), title.clone()));
        }
    }
    definitions
}

fn resolve_references(
    tree: &mut Tree,
    classifier: &dyn Classify,
    definitions: &HashMap<String, Target>,
) -> (usize, usize) {
    let mut resolved = 0;
    let mut unresolved = 0;

    for id in tree.find_all(|t, id| classifier.is_link_reference(t, id)) {
        let NodeKind::LinkReference { label, .. } = tree.kind(id) else {
            continue;
        };
        match definitions.get(&normalize_label(label)) {
            Some((url, title)) => {
                *tree.kind_mut(id) = NodeKind::Link {
                    url: url.clone(),
                    title: title.clone(),
                };
                resolved += 1;
            }
            None => {
                debug!(label = %label, "link reference has no definition, leaving it as is");
                unresolved += 1;
            }
        }
    }

    (resolved, unresolved)
}

fn remove_definitions(tree: &mut Tree, classifier: &dyn Classify) -> usize {
    let definitions = tree.find_all(|t, id| classifier.is_definition(t, id));
    for &id in &definitions {
        tree.detach(id);
    }
    definitions.len()
}

fn normalize_label(label: &str) -> String {
    label
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn inside_link(tree: &Tree, id: NodeId) -> bool {
    tree.ancestors(id).into_iter().any(|a| {
        matches!(
            tree.kind(a),
            NodeKind::Link { .. } | NodeKind::LinkReference { .. } | NodeKind::Image { .. }
        )
    })
}

// ---------------------------------------------------------------------------
// Type links
// ---------------------------------------------------------------------------

/// Piece of a text node after splitting out type annotations.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Piece {
    Text(String),
    Type { name: String, url: Option<String> },
}

/// Maps type names to the URL of their reference documentation.
#[derive(Debug, Clone)]
pub struct TypeLinker {
    primitive_base_url: String,
    global_base_url: String,
    globals: HashSet<String>,
    custom: BTreeMap<String, String>,
}

impl TypeLinker {
    pub fn new(config: &TypeLinkConfig) -> Self {
        Self {
            primitive_base_url: config.primitive_base_url.clone(),
            global_base_url: config.global_base_url.clone(),
            globals: config.globals.iter().cloned().collect(),
            custom: config.custom.clone(),
        }
    }

    /// URL for a type name; array suffixes (`Foo[]`) resolve like `Foo`.
    pub fn resolve(&self, name: &str) -> Option<String> {
        let base = name.trim_end_matches("[]");
        if let Some(url) = self.custom.get(base) {
            return Some(url.clone());
        }
        let lower = base.to_lowercase();
        if PRIMITIVES.contains(&lower.as_str()) {
            return Some(format!("{}#{lower}_type", self.primitive_base_url));
        }
        if self.globals.contains(base) {
            return Some(format!("{}{base}", self.global_base_url));
        }
        None
    }

    /// Split text around `{A|B}` annotations, separating union members
    /// with ` | ` text pieces.
    fn split(&self, text: &str) -> Vec<Piece> {
        let mut pieces = Vec::new();
        let mut last = 0;

        for caps in TYPED_TEXT_RE.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if whole.start() > last {
                pieces.push(Piece::Text(text[last..whole.start()].to_string()));
            }
            for (i, name) in inner.as_str().split('|').map(str::trim).enumerate() {
                if i > 0 {
                    pieces.push(Piece::Text(" | ".to_string()));
                }
                pieces.push(Piece::Type {
                    name: name.to_string(),
                    url: self.resolve(name),
                });
            }
            last = whole.end();
        }

        if last < text.len() {
            pieces.push(Piece::Text(text[last..].to_string()));
        }
        pieces
    }
}
