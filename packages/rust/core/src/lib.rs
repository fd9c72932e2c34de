//! Segmentation and enrichment pipeline for apidoc.
//!
//! This crate turns an API reference document into an ordered list of
//! [`MetadataRecord`]s, one per heading: references are normalized across
//! the whole document, the tree is split into sections, and each section's
//! metadata nodes are lifted into its record.

pub mod classify;
pub mod enrich;
pub mod metadata;
pub mod pipeline;
pub mod references;
pub mod segment;
pub mod source;

pub use classify::{Classify, DocClassifier};
pub use enrich::SectionEnricher;
pub use metadata::{Content, MetadataBuilder, MetadataRecord};
pub use pipeline::DocumentParser;
pub use references::{NormalizeReport, ReferenceNormalizer, TypeLinker};
pub use segment::{Heading, Section, section_ranges, segment};
pub use source::read_source;
