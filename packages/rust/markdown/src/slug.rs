//! GitHub-style anchor slugs.

use std::collections::HashMap;

/// Produces unique slugs for one document.
///
/// Repeated titles get `-1`, `-2`, ... suffixes in the order they are
/// slugged, so the same sequence of titles always yields the same slugs.
#[derive(Debug, Default, Clone)]
pub struct Slugger {
    occurrences: HashMap<String, usize>,
}

impl Slugger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Slug `text`, suffixing it if an identical slug was already handed out.
    pub fn slug(&mut self, text: &str) -> String {
        let base = slugify(text);
        let mut slug = base.clone();

        while self.occurrences.contains_key(&slug) {
            let count = self.occurrences.entry(base.clone()).or_insert(0);
            *count += 1;
            slug = format!("{base}-{count}");
        }

        self.occurrences.insert(slug.clone(), 0);
        slug
    }
}

/// Lowercase, drop punctuation, and turn spaces into dashes.
pub fn slugify(text: &str) -> String {
    text.to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' {
                Some(c)
            } else if c.is_whitespace() {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}
