use std::collections::HashSet;

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("tunnel {0} is already indexed")]
    DuplicateName(String),

    #[error("unreadable tunnel index: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TunnelIndexEntry {
    pub name: String,
    /// Body file location, relative to the storage base directory
    pub path: String,
}

/// Directory of the tunnels that exist, in insertion order
///
/// Names are unique at all times; [`TunnelIndex::insert`] refuses a name
/// that is already present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TunnelIndex {
    entries: Vec<TunnelIndexEntry>,
}

impl TunnelIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.path.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn insert(&mut self, name: &str, path: &str) -> Result<(), IndexError> {
        if self.contains(name) {
            return Err(IndexError::DuplicateName(name.to_string()));
        }
        self.entries.push(TunnelIndexEntry {
            name: name.to_string(),
            path: path.to_string(),
        });
        Ok(())
    }

    /// Remove `name`, returning its entry; absent names are not an error
    pub fn remove(&mut self, name: &str) -> Option<TunnelIndexEntry> {
        let position = self.entries.iter().position(|entry| entry.name == name)?;
        Some(self.entries.remove(position))
    }

    pub fn entries(&self) -> &[TunnelIndexEntry] {
        &self.entries
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn serialize(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.entries)
    }

    /// Parse a stored index, refusing malformed content and repeated names
    pub fn parse(content: &str) -> Result<TunnelIndex, IndexError> {
        let entries: Vec<TunnelIndexEntry> =
            serde_json::from_str(content).map_err(|e| IndexError::Malformed(e.to_string()))?;
        let duplicate = {
            let mut seen = HashSet::new();
            entries
                .iter()
                .find(|entry| !seen.insert(entry.name.as_str()))
                .map(|entry| entry.name.clone())
        };
        match duplicate {
            Some(name) => Err(IndexError::DuplicateName(name)),
            None => Ok(TunnelIndex { entries }),
        }
    }

    /// Parse a stored index leniently
    ///
    /// Unreadable content, or content listing a name twice, yields an empty
    /// index so the application still starts.
    pub fn deserialize(content: &str) -> TunnelIndex {
        Self::parse(content).unwrap_or_else(|e| {
            warn!("Discarding tunnel index: {}", e);
            TunnelIndex::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_lookup_remove() {
        let mut index = TunnelIndex::new();
        index.insert("home", ".conf/home.json").unwrap();
        index.insert("work", ".conf/work.json").unwrap();

        assert_eq!(index.lookup("work"), Some(".conf/work.json"));
        assert_eq!(index.lookup("cafe"), None);
        assert_eq!(index.names().collect::<Vec<_>>(), vec!["home", "work"]);

        let removed = index.remove("home").unwrap();
        assert_eq!(removed.path, ".conf/home.json");
        assert_eq!(index.len(), 1);
        assert!(index.remove("home").is_none());
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_duplicate_insert_is_refused() {
        let mut index = TunnelIndex::new();
        index.insert("home", "a.json").unwrap();
        assert_eq!(
            index.insert("home", "b.json"),
            Err(IndexError::DuplicateName("home".into()))
        );
        assert_eq!(index.len(), 1);
        assert_eq!(index.lookup("home"), Some("a.json"));
    }

    #[test]
    fn test_serialized_layout() {
        let mut index = TunnelIndex::new();
        index.insert("home", "a/home.json").unwrap();
        let text = index.serialize().unwrap();
        let raw: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(raw, serde_json::json!([{"name": "home", "path": "a/home.json"}]));
        assert_eq!(TunnelIndex::deserialize(&text), index);
    }

    #[test]
    fn test_malformed_content_gives_empty_index() {
        assert!(TunnelIndex::deserialize("").is_empty());
        assert!(TunnelIndex::deserialize("{\"name\": 1}").is_empty());
        assert!(TunnelIndex::deserialize("[{\"name\": \"a\"}]").is_empty());
        let twice = r#"[{"name":"a","path":"x"},{"name":"a","path":"y"}]"#;
        assert!(TunnelIndex::deserialize(twice).is_empty());
    }

    #[test]
    fn test_strict_parse_reports_why() {
        let twice = r#"[{"name":"a","path":"x"},{"name":"a","path":"y"}]"#;
        assert_eq!(
            TunnelIndex::parse(twice),
            Err(IndexError::DuplicateName("a".into()))
        );
        assert!(matches!(
            TunnelIndex::parse("not json"),
            Err(IndexError::Malformed(_))
        ));
        assert_eq!(TunnelIndex::parse("[]"), Ok(TunnelIndex::new()));
    }
}
