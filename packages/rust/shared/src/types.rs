//! Core domain value types shared by the apidoc crates.

use std::collections::BTreeMap;
use std::future::{IntoFuture, Ready, ready};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{ApiDocError, Result};

// ---------------------------------------------------------------------------
// SourceDocument
// ---------------------------------------------------------------------------

/// Raw markup text plus the path it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    /// Identifying path; its stem names the API module.
    pub path: PathBuf,
    /// Raw markup text.
    pub text: String,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            text: text.into(),
        }
    }

    /// API module name, e.g. `fs` for `doc/api/fs.md`.
    pub fn api(&self) -> String {
        api_name(&self.path)
    }
}

fn api_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// An already-loaded document resolves immediately.
impl IntoFuture for SourceDocument {
    type Output = Result<SourceDocument>;
    type IntoFuture = Ready<Result<SourceDocument>>;

    fn into_future(self) -> Self::IntoFuture {
        ready(Ok(self))
    }
}

// ---------------------------------------------------------------------------
// Stability
// ---------------------------------------------------------------------------

/// A stability index such as `2` or `1.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StabilityIndex {
    pub major: u8,
    pub minor: Option<u8>,
}

impl StabilityIndex {
    /// Highest major level with a defined meaning.
    pub const MAX_MAJOR: u8 = 3;

    /// Human-readable name of the major level.
    pub fn name(&self) -> &'static str {
        match self.major {
            0 => "Deprecated",
            1 => "Experimental",
            2 => "Stable",
            _ => "Legacy",
        }
    }

    pub fn is_deprecated(&self) -> bool {
        self.major == 0
    }
}

impl std::fmt::Display for StabilityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.minor {
            Some(minor) => write!(f, "{}.{minor}", self.major),
            None => write!(f, "{}", self.major),
        }
    }
}

impl std::str::FromStr for StabilityIndex {
    type Err = ApiDocError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ApiDocError::validation(format!("invalid stability index {s:?}"));
        let (major, minor) = match s.trim().split_once('.') {
            Some((major, minor)) => (major, Some(minor)),
            None => (s.trim(), None),
        };
        let major: u8 = major.parse().map_err(|_| invalid())?;
        if major > Self::MAX_MAJOR {
            return Err(invalid());
        }
        let minor = minor
            .map(|m| m.parse::<u8>().map_err(|_| invalid()))
            .transpose()?;
        Ok(Self { major, minor })
    }
}

impl TryFrom<String> for StabilityIndex {
    type Error = ApiDocError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<StabilityIndex> for String {
    fn from(index: StabilityIndex) -> Self {
        index.to_string()
    }
}

/// Stability level and the free-text description that follows it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stability {
    pub index: StabilityIndex,
    pub description: String,
}

// ---------------------------------------------------------------------------
// FrontMatter
// ---------------------------------------------------------------------------

/// Key-value metadata attached to a section.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FrontMatter(BTreeMap<String, serde_yaml::Value>);

impl FrontMatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a YAML mapping. An empty document yields an empty map.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(yaml)
            .map_err(|e| ApiDocError::parse(format!("invalid front matter: {e}")))?;

        match value {
            serde_yaml::Value::Null => Ok(Self::new()),
            serde_yaml::Value::Mapping(mapping) => {
                let mut front_matter = Self::new();
                for (key, value) in mapping {
                    front_matter.insert(key_to_string(&key)?, value);
                }
                Ok(front_matter)
            }
            other => Err(ApiDocError::parse(format!(
                "front matter must be a mapping, got {}",
                value_kind(&other)
            ))),
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: serde_yaml::Value) {
        self.0.insert(key.into(), value);
    }

    /// Merge `other` into `self`; keys in `other` win.
    pub fn merge(&mut self, other: FrontMatter) {
        self.0.extend(other.0);
    }

    pub fn get(&self, key: &str) -> Option<&serde_yaml::Value> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Versions in which the API was added.
    pub fn added(&self) -> Vec<String> {
        self.versions("added")
    }

    pub fn deprecated(&self) -> Vec<String> {
        self.versions("deprecated")
    }

    pub fn removed(&self) -> Vec<String> {
        self.versions("removed")
    }

    /// Entries of the `changes` list, empty when absent.
    pub fn changes(&self) -> &[serde_yaml::Value] {
        match self.0.get("changes") {
            Some(serde_yaml::Value::Sequence(changes)) => changes,
            _ => &[],
        }
    }

    pub fn introduced_in(&self) -> Option<&str> {
        self.get("introduced_in").and_then(|v| v.as_str())
    }

    pub fn source_link(&self) -> Option<&str> {
        self.get("source_link").and_then(|v| v.as_str())
    }

    /// A version field may be a single scalar or a list of scalars.
    fn versions(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(serde_yaml::Value::Sequence(items)) => {
                items.iter().filter_map(scalar_to_string).collect()
            }
            Some(value) => scalar_to_string(value).into_iter().collect(),
            None => Vec::new(),
        }
    }
}

fn key_to_string(key: &serde_yaml::Value) -> Result<String> {
    scalar_to_string(key)
        .ok_or_else(|| ApiDocError::parse(format!("unsupported front matter key ({})", value_kind(key))))
}

fn scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn value_kind(value: &serde_yaml::Value) -> &'static str {
    match value {
        serde_yaml::Value::Null => "null",
        serde_yaml::Value::Bool(_) => "bool",
        serde_yaml::Value::Number(_) => "number",
        serde_yaml::Value::String(_) => "string",
        serde_yaml::Value::Sequence(_) => "sequence",
        serde_yaml::Value::Mapping(_) => "mapping",
        serde_yaml::Value::Tagged(_) => "tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_name_is_file_stem() {
        let doc = SourceDocument::new("doc/api/child_process.md", "# child_process");
        assert_eq!(doc.api(), "child_process");
    }

    #[test]
    fn stability_index_parses_major_and_minor() {
        let index: StabilityIndex = "1.1".parse().expect("parse");
        assert_eq!(index, StabilityIndex { major: 1, minor: Some(1) });
        assert_eq!(index.to_string(), "1.1");
        assert_eq!(index.name(), "Experimental");

        let stable: StabilityIndex = "2".parse().expect("parse");
        assert_eq!(stable.minor, None);
        assert_eq!(stable.name(), "Stable");
        assert!(!stable.is_deprecated());
    }

    #[test]
    fn stability_index_rejects_garbage() {
        assert!("9".parse::<StabilityIndex>().is_err());
        assert!("two".parse::<StabilityIndex>().is_err());
        assert!("1.x".parse::<StabilityIndex>().is_err());
    }

    #[test]
    fn stability_serializes_index_as_string() {
        let stability = Stability {
            index: "0".parse().expect("parse"),
            description: "Deprecated: Use `fs.rm()` instead.".into(),
        };
        let json = serde_json::to_value(&stability).expect("serialize");
        assert_eq!(json["index"], "0");
    }

    #[test]
    fn front_matter_from_yaml() {
        let fm = FrontMatter::from_yaml(
            "added: v0.1.90\ndeprecated:\n  - v14.0.0\n  - v12.16.0\nchanges:\n  - version: v10.0.0\n    description: Added options.\n",
        )
        .expect("parse");

        assert_eq!(fm.added(), vec!["v0.1.90"]);
        assert_eq!(fm.deprecated(), vec!["v14.0.0", "v12.16.0"]);
        assert!(fm.removed().is_empty());
        assert_eq!(fm.changes().len(), 1);
    }

    #[test]
    fn front_matter_rejects_non_mapping() {
        assert!(FrontMatter::from_yaml("- a\n- b\n").is_err());
        assert!(FrontMatter::from_yaml("").expect("empty").is_empty());
    }

    #[test]
    fn front_matter_merge_later_wins() {
        let mut first = FrontMatter::from_yaml("added: v1.0.0\nnapiVersion: 3").expect("parse");
        let second = FrontMatter::from_yaml("added: v2.0.0").expect("parse");
        first.merge(second);

        assert_eq!(first.added(), vec!["v2.0.0"]);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn ready_document_resolves_to_itself() {
        let doc = SourceDocument::new("a.md", "# A");
        let resolved = doc.clone().await.expect("resolve");
        assert_eq!(resolved, doc);
    }
}
