//! End-to-end document parsing: text → normalized tree → sections → records.

use std::future::IntoFuture;

use apidoc_markdown::{Slugger, TreeEngine};
use apidoc_shared::{ApiDocError, AppConfig, Result, SourceDocument};
use tokio::task::JoinSet;
use tracing::{debug, info, instrument};

use crate::classify::{Classify, DocClassifier};
use crate::enrich::SectionEnricher;
use crate::metadata::MetadataRecord;
use crate::references::ReferenceNormalizer;
use crate::segment::segment;

/// Parses API reference documents into ordered [`MetadataRecord`]s.
///
/// Each document is parsed on its own tree with its own [`Slugger`]; the
/// parser itself holds no per-document state.
pub struct DocumentParser {
    engine: TreeEngine,
    classifier: Box<dyn Classify>,
    references: ReferenceNormalizer,
}

impl std::fmt::Debug for DocumentParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentParser")
            .field("engine", &self.engine)
            .field("references", &self.references)
            .finish_non_exhaustive()
    }
}

impl DocumentParser {
    /// A parser using the default engine and classifier for `config`.
    pub fn new(config: &AppConfig) -> Result<Self> {
        config.parser.validate()?;
        Ok(Self::with_parts(
            TreeEngine::new(),
            Box::new(DocClassifier::new(&config.parser)),
            ReferenceNormalizer::new(&config.parser, &config.type_links),
        ))
    }

    /// A parser assembled from explicit collaborators.
    pub fn with_parts(
        engine: TreeEngine,
        classifier: Box<dyn Classify>,
        references: ReferenceNormalizer,
    ) -> Self {
        Self {
            engine,
            classifier,
            references,
        }
    }

    /// Parse one loaded document. Records come back in document order.
    #[instrument(skip_all, fields(path = %doc.path.display()))]
    pub fn parse_source(&self, doc: &SourceDocument) -> Vec<MetadataRecord> {
        let api = doc.api();
        let classifier = self.classifier.as_ref();

        let mut tree = self.engine.parse(&doc.text);
        self.engine.run_transforms(&mut tree);
        self.references.normalize(&mut tree, classifier);

        let sections = segment(&tree, classifier);
        let enricher = SectionEnricher::new(classifier, &self.engine);
        let mut slugger = Slugger::new();

        let records: Vec<MetadataRecord> = sections
            .into_iter()
            .map(|section| enricher.enrich(&api, section, &mut slugger))
            .collect();

        debug!(api = %api, records = records.len(), "parsed document");
        records
    }

    /// Resolve `doc`, then parse it.
    pub async fn parse_document<D>(&self, doc: D) -> Result<Vec<MetadataRecord>>
    where
        D: IntoFuture<Output = Result<SourceDocument>>,
    {
        let doc = doc.await?;
        Ok(self.parse_source(&doc))
    }

    /// Resolve every document concurrently, then parse them in input order
    /// and concatenate their records.
    ///
    /// The first resolution failure fails the whole batch.
    #[instrument(skip_all)]
    pub async fn parse_documents<I, D>(&self, docs: I) -> Result<Vec<MetadataRecord>>
    where
        I: IntoIterator<Item = D>,
        D: IntoFuture<Output = Result<SourceDocument>> + Send + 'static,
        D::IntoFuture: Send + 'static,
    {
        let mut pending = JoinSet::new();
        let mut count = 0;
        for (index, doc) in docs.into_iter().enumerate() {
            pending.spawn(async move { (index, doc.await) });
            count += 1;
        }

        let mut resolved: Vec<Option<SourceDocument>> = (0..count).map(|_| None).collect();
        while let Some(joined) = pending.join_next().await {
            let (index, doc) = joined
                .map_err(|e| ApiDocError::resolve("document batch", e.to_string()))?;
            resolved[index] = Some(doc?);
        }

        let mut records = Vec::new();
        for doc in resolved.into_iter().flatten() {
            records.extend(self.parse_source(&doc));
        }

        info!(documents = count, records = records.len(), "parsed document batch");
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::path::Path;
    use std::time::Duration;

    use super::*;
    use crate::source::read_source;
    use apidoc_markdown::{NodeKind, Tree};

    fn parser() -> DocumentParser {
        DocumentParser::new(&AppConfig::default()).unwrap()
    }

    fn parse(path: &str, text: &str) -> Vec<MetadataRecord> {
        parser().parse_source(&SourceDocument::new(path, text))
    }

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("../../../fixtures/markdown")
            .join(name)
    }

    async fn delayed(doc: SourceDocument, ms: u64) -> Result<SourceDocument> {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(doc)
    }

    fn count(tree: &Tree, pred: impl Fn(&NodeKind) -> bool) -> usize {
        tree.find_all(|t, id| pred(t.kind(id))).len()
    }

    // -- Scenarios ---------------------------------------------------------

    #[test]
    fn inlines_reference_and_rewrites_extension() {
        let records = parse("doc/api/a.md", "# A\nSee [x].\n\n[x]: /b.md \"B\"");
        assert_eq!(records.len(), 1);

        let record = &records[0];
        assert_eq!(record.title(), "A");
        assert_eq!(record.slug(), "a");
        assert_eq!(record.api(), "a");

        let tree = record.content().tree();
        let links: Vec<(String, Option<String>)> = tree
            .find_all(|t, id| matches!(t.kind(id), NodeKind::Link { .. }))
            .into_iter()
            .filter_map(|id| match tree.kind(id) {
                NodeKind::Link { url, title } => Some((url.clone(), title.clone())),
                _ => None,
            })
            .collect();
        assert_eq!(links, vec![("/b.html".to_string(), Some("B".to_string()))]);
        assert_eq!(record.content().to_markdown(), "See [x](/b.html \"B\").\n");
    }

    #[test]
    fn extracts_stability_from_section() {
        let records = parse("a.md", "# A\n> Stability: 2 - Stable\n\nBody");
        assert_eq!(records.len(), 1);

        let stability = records[0].stability().unwrap();
        assert_eq!(stability.index.major, 2);
        assert_eq!(stability.description, "Stable");
        assert_eq!(records[0].content().to_markdown(), "Body\n");
    }

    #[test]
    fn adjacent_headings_give_empty_content() {
        let records = parse("a.md", "# A\n\n# B\nBody");
        assert_eq!(records.len(), 2);
        assert!(records[0].content().is_empty());
        assert_eq!(records[0].content().to_markdown(), "");
        assert_eq!(records[1].content().to_markdown(), "Body\n");
    }

    #[test]
    fn no_headings_no_records() {
        assert!(parse("a.md", "Just text.\n\n[x]: /b.md").is_empty());
        assert!(parse("a.md", "").is_empty());
    }

    // -- Properties --------------------------------------------------------

    #[tokio::test]
    async fn sections_partition_content() {
        let doc = read_source(fixture("fs.md")).await.unwrap();
        let engine = TreeEngine::new();
        let classifier = DocClassifier::default();

        let mut tree = engine.parse(&doc.text);
        engine.run_transforms(&mut tree);
        parser().references.normalize(&mut tree, &classifier);

        let top_level = tree.top_level();
        let first_heading = top_level
            .iter()
            .position(|&id| classifier.is_heading(&tree, id))
            .unwrap();
        let expected: Vec<String> = top_level[first_heading..]
            .iter()
            .filter(|&&id| !classifier.is_heading(&tree, id))
            .map(|&id| apidoc_markdown::stringify(&tree.extract(&[id])))
            .collect();

        let actual: Vec<String> = segment(&tree, &classifier)
            .into_iter()
            .flat_map(|section| {
                section
                    .tree
                    .top_level()
                    .into_iter()
                    .map(|id| apidoc_markdown::stringify(&section.tree.extract(&[id])))
                    .collect::<Vec<_>>()
            })
            .collect();

        assert!(!actual.is_empty());
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn fixture_has_no_metadata_or_references_left() {
        let records = parser().parse_document(read_source(fixture("fs.md"))).await.unwrap();
        assert!(records.len() > 3);

        for record in &records {
            let tree = record.content().tree();
            assert_eq!(count(tree, |k| matches!(k, NodeKind::Definition { .. })), 0);
            assert_eq!(count(tree, |k| matches!(k, NodeKind::FrontMatter { .. })), 0);
            assert_eq!(count(tree, |k| matches!(k, NodeKind::LinkReference { .. })), 0);

            let markdown = record.content().to_markdown();
            assert!(!markdown.contains("Stability:"), "{}: {markdown}", record.slug());
            assert!(!markdown.contains("<!-- YAML"), "{}: {markdown}", record.slug());
            assert!(!markdown.contains(".md"), "{}: {markdown}", record.slug());
        }
    }

    #[tokio::test]
    async fn fixture_metadata_is_extracted() {
        let records = parser().parse_document(read_source(fixture("fs.md"))).await.unwrap();

        let top = &records[0];
        assert_eq!(top.title(), "File system");
        assert_eq!(top.slug(), "file-system");
        assert_eq!(top.stability().unwrap().index.name(), "Stable");
        assert_eq!(
            top.front_matter().and_then(|fm| fm.introduced_in()),
            Some("v0.10.0")
        );
        assert_eq!(
            top.front_matter().and_then(|fm| fm.source_link()),
            Some("lib/fs.js")
        );

        let access = records
            .iter()
            .find(|r| r.slug() == "fsaccesspath-mode-callback")
            .unwrap();
        assert_eq!(access.depth(), 3);
        let front_matter = access.front_matter().unwrap();
        assert_eq!(front_matter.added(), vec!["v0.11.15"]);
        assert_eq!(front_matter.changes().len(), 1);
        assert!(access.content().to_markdown().contains("[`<string>`]("));

        let exists = records.iter().find(|r| r.slug() == "fsexistspath-callback").unwrap();
        assert!(exists.stability().unwrap().index.is_deprecated());
    }

    #[test]
    fn slugs_are_unique_and_deterministic() {
        let text = "# Events\n\n## Event: 'close'\n\nA\n\n## Event: 'close'\n\nB\n\n## Event: 'close'\n";
        let slugs = |records: Vec<MetadataRecord>| {
            records.iter().map(|r| r.slug().to_string()).collect::<Vec<_>>()
        };

        let first = slugs(parse("events.md", text));
        let second = slugs(parse("events.md", text));

        assert_eq!(first, vec!["events", "event-close", "event-close-1", "event-close-2"]);
        assert_eq!(first, second);
        assert_eq!(first.iter().collect::<HashSet<_>>().len(), first.len());
    }

    #[test]
    fn slugs_restart_per_document() {
        let a = parse("a.md", "# Intro\n");
        let b = parse("b.md", "# Intro\n");
        assert_eq!(a[0].slug(), "intro");
        assert_eq!(b[0].slug(), "intro");
    }

    #[test]
    fn escaped_block_markers_stay_text() {
        let records = parse(
            "a.md",
            "# A\n\n\\# not a heading\n\n1\\. not a list\n\nAT&amp;T &amp;lt;x&amp;gt;\n",
        );
        assert_eq!(records.len(), 1);

        let markdown = records[0].content().to_markdown();
        assert!(markdown.starts_with("\\# not a heading\n"), "{markdown}");
        assert!(markdown.contains("1\\. not a list"), "{markdown}");
        assert!(markdown.contains("AT&amp;T &amp;lt;x&amp;gt;"), "{markdown}");

        let reparsed = parse("b.md", &format!("# B\n\n{markdown}"));
        assert_eq!(reparsed.len(), 1);
        assert_eq!(reparsed[0].content().to_markdown(), markdown);
    }

    #[test]
    fn deeply_nested_quotes_do_not_overflow() {
        let records = parse("a.md", &format!("# A\n\n{}deep", "> ".repeat(5000)));
        assert_eq!(records.len(), 1);

        let content = records[0].content();
        assert!(content.to_markdown().trim_end().ends_with("deep"));
    }

    #[test]
    fn unresolved_references_survive() {
        let records = parse("a.md", "# A\n\nSee [missing][nowhere].");
        assert_eq!(records[0].content().to_markdown(), "See [missing][nowhere].\n");
    }

    // -- Batches -----------------------------------------------------------

    #[tokio::test]
    async fn parse_documents_keeps_input_order() {
        let d1 = SourceDocument::new("one.md", "# One\n\nFirst\n\n# Two\n");
        let d2 = SourceDocument::new("two.md", "# Three\n");

        let records = parser()
            .parse_documents([delayed(d1, 50), delayed(d2, 0)])
            .await
            .unwrap();

        let titles: Vec<(&str, &str)> = records.iter().map(|r| (r.api(), r.title())).collect();
        assert_eq!(titles, vec![("one", "One"), ("one", "Two"), ("two", "Three")]);
    }

    #[tokio::test]
    async fn ready_documents_are_accepted() {
        let records = parser()
            .parse_documents(vec![SourceDocument::new("a.md", "# A\n")])
            .await
            .unwrap();
        assert_eq!(records.len(), 1);

        let records = parser()
            .parse_document(SourceDocument::new("b.md", "# B\n"))
            .await
            .unwrap();
        assert_eq!(records[0].slug(), "b");
    }

    #[tokio::test]
    async fn one_failed_resolution_fails_the_batch() {
        let result = parser()
            .parse_documents([
                read_source(fixture("fs.md")),
                read_source(fixture("missing.md")),
            ])
            .await;

        assert!(matches!(result, Err(ApiDocError::Resolve { .. })));
    }

    #[tokio::test]
    async fn empty_batch_is_empty() {
        let records = parser()
            .parse_documents(Vec::<SourceDocument>::new())
            .await
            .unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn invalid_extension_config_is_rejected() {
        let mut config = AppConfig::default();
        config.parser.output_extension = String::new();
        assert!(DocumentParser::new(&config).is_err());
    }
}
