//! Section enrichment: lift metadata nodes out of a section's content.

use apidoc_markdown::{NodeId, Slugger, Tree, TreeEngine};
use apidoc_shared::{FrontMatter, Stability, StabilityIndex};
use tracing::{debug, instrument, warn};

use crate::classify::{Classify, FrontMatterSource, front_matter_source, stability_parts};
use crate::metadata::{Content, MetadataBuilder, MetadataRecord};
use crate::segment::Section;

/// Turns a raw [`Section`] into a sealed [`MetadataRecord`].
pub struct SectionEnricher<'a> {
    classifier: &'a dyn Classify,
    engine: &'a TreeEngine,
}

impl<'a> SectionEnricher<'a> {
    pub fn new(classifier: &'a dyn Classify, engine: &'a TreeEngine) -> Self {
        Self { classifier, engine }
    }

    /// Collect stability and front matter into the record, remove their
    /// nodes, then re-run the engine's transforms over what is left.
    ///
    /// Malformed metadata nodes are logged and skipped.
    #[instrument(skip_all, fields(title = %section.heading.title))]
    pub fn enrich(&self, api: &str, section: Section, slugger: &mut Slugger) -> MetadataRecord {
        let mut builder = MetadataBuilder::new(api, &section.heading, slugger);
        let mut tree = section.tree;

        let markers = tree.find_all(|t, id| self.classifier.is_stability_marker(t, id));
        for &id in &markers {
            if let Some(stability) = read_stability(&tree, id) {
                builder.set_stability(stability);
            }
        }

        let blocks = tree.find_all(|t, id| self.classifier.is_front_matter(t, id));
        for &id in &blocks {
            if let Some(front_matter) = read_front_matter(&tree, id) {
                builder.merge_front_matter(front_matter);
            }
        }

        for id in markers.into_iter().chain(blocks) {
            tree.detach(id);
        }
        self.engine.run_transforms(&mut tree);

        let record = builder.build(Content::new(tree));
        debug!(
            slug = record.slug(),
            stability = record.stability().is_some(),
            front_matter = record.front_matter().map_or(0, FrontMatter::len),
            "enriched section"
        );
        record
    }
}

/// Each block of the marker is one paragraph of the stability text.
fn read_stability(tree: &Tree, id: NodeId) -> Option<Stability> {
    let text = tree
        .children(id)
        .into_iter()
        .map(|child| tree.text_content(child))
        .collect::<Vec<_>>()
        .join("\n\n");

    let Some((index, description)) = stability_parts(&text) else {
        warn!(text = %text, "stability marker without an index, skipping");
        return None;
    };
    match index.parse::<StabilityIndex>() {
        Ok(index) => Some(Stability {
            index,
            description: description.to_string(),
        }),
        Err(e) => {
            warn!(error = %e, "malformed stability marker, skipping");
            None
        }
    }
}

fn read_front_matter(tree: &Tree, id: NodeId) -> Option<FrontMatter> {
    match front_matter_source(tree.kind(id))? {
        FrontMatterSource::Yaml(yaml) => match FrontMatter::from_yaml(yaml) {
            Ok(front_matter) => Some(front_matter),
            Err(e) => {
                warn!(error = %e, "malformed front matter, skipping");
                None
            }
        },
        FrontMatterSource::Pair(key, value) => {
            let mut front_matter = FrontMatter::new();
            front_matter.insert(key, serde_yaml::Value::String(value.to_string()));
            Some(front_matter)
        }
    }
}
