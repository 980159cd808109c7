//! Bidirectional value/placeholder mapping for one masking session.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::detection::PiiCategory;

/// Flat, transportable copy of the mapping state.
///
/// This is the only artifact that crosses the masking/restoration boundary.
/// Either side may be absent in stored data; a missing side deserializes as
/// empty rather than failing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingSnapshot {
    #[serde(default)]
    pub forward: HashMap<String, String>,
    #[serde(default)]
    pub reverse: HashMap<String, String>,
}

impl MappingSnapshot {
    pub fn is_empty(&self) -> bool {
        self.forward.is_empty() && self.reverse.is_empty()
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Parse from the JSON wire format.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Session-scoped bidirectional store: original value <-> placeholder token.
///
/// The single source of truth for "have we seen this value before". Forward
/// and reverse are exact inverses after every operation. Each category keeps
/// a monotonically increasing counter; counter values are never reused, and
/// survive `load` so that future masking in a resumed session cannot mint a
/// token that collides with a transported one.
#[derive(Debug, Default)]
pub struct MappingTable {
    forward: HashMap<String, String>,
    reverse: HashMap<String, String>,
    counters: HashMap<PiiCategory, u64>,
}

impl MappingTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the placeholder for `original`, minting a new one if unseen.
    ///
    /// Idempotent reuse: a value that already has a token keeps it, whatever
    /// category it is re-detected as this time. First assignment wins.
    pub fn get_or_assign(&mut self, category: PiiCategory, original: &str) -> String {
        if let Some(token) = self.forward.get(original) {
            return token.clone();
        }
        let counter = self.counters.entry(category).or_insert(0);
        *counter += 1;
        let token = format!("[PII_{}_{}]", category.as_str(), counter);
        self.forward.insert(original.to_string(), token.clone());
        self.reverse.insert(token.clone(), original.to_string());
        token
    }

    /// Look up the token for an original value, if assigned.
    pub fn token_for(&self, original: &str) -> Option<&str> {
        self.forward.get(original).map(String::as_str)
    }

    /// Look up the original value behind a token, if known.
    pub fn original_for(&self, token: &str) -> Option<&str> {
        self.reverse.get(token).map(String::as_str)
    }

    /// All tokens currently assigned.
    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.forward.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.forward.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forward.is_empty()
    }

    /// Flat copy suitable for transport.
    pub fn snapshot(&self) -> MappingSnapshot {
        MappingSnapshot {
            forward: self.forward.clone(),
            reverse: self.reverse.clone(),
        }
    }

    /// Replace the mappings wholesale with the snapshot's contents.
    ///
    /// Counters are untouched: they only matter for future masking in this
    /// table, not for restoring with transported mappings.
    pub fn load(&mut self, snapshot: MappingSnapshot) {
        debug!(
            forward = snapshot.forward.len(),
            reverse = snapshot.reverse.len(),
            "Loading mapping snapshot"
        );
        self.forward = snapshot.forward;
        self.reverse = snapshot.reverse;
    }

    /// Clear mappings and counters; the start of a wholly new session.
    pub fn reset(&mut self) {
        self.forward.clear();
        self.reverse.clear();
        self.counters.clear();
    }
}
