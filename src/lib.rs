//! Reversible PII masking engine.
//!
//! Detects spans of sensitive data in free-form text, substitutes each
//! distinct value with a stable typed placeholder such as `[PII_EMAIL_1]`,
//! and restores the originals from those placeholders in arbitrary
//! downstream text (for example a model response that echoes them back).
//!
//! Detection combines two stages:
//! - an [`EntityRecognizer`] capability for unstructured categories
//!   (people, organizations, places, dates, money mentions)
//! - a [`PatternLibrary`] of regex detectors for structurally regular
//!   values (emails, phones, SSNs, cards, accounts, IPs, URLs, passports,
//!   licenses)
//!
//! A [`MappingTable`] keeps the bidirectional value/placeholder mapping for
//! one session and serializes to a flat [`MappingSnapshot`] for transport.
//! [`PiiFilter`] ties it all together for a hosting shell that owns the
//! session lifetime.

pub mod detection;
pub mod mapping;
pub mod masking;
pub mod restore;

use std::sync::RwLock;

use serde::Deserialize;

pub use detection::{
    DetectedSpan, EntityKind, EntityRecognizer, HeuristicRecognizer, PatternLibrary, PiiCategory,
    RecognizerError,
};
pub use mapping::{MappingSnapshot, MappingTable};
pub use masking::MaskingEngine;
pub use restore::{RestorationEngine, RestoreOutcome};

/// JSON-serializable configuration for the PII filter.
///
/// Used when configuration arrives from stored settings. Field names use
/// kebab-case to match typical YAML/JSON config style.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct PiiFilterConfigJson {
    /// Enable the entity recognizer stage
    #[serde(default = "default_true")]
    pub entity_recognition_enabled: bool,
    /// Enable the pattern library stage
    #[serde(default = "default_true")]
    pub pattern_detection_enabled: bool,
    /// Append the placeholder-preservation instruction when masking
    #[serde(default = "default_true")]
    pub annotate_instructions: bool,
    /// Organization marker vocabulary for the built-in recognizer
    #[serde(default = "default_org_markers")]
    pub org_markers: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_org_markers() -> Vec<String> {
    ["inc", "corp", "llc", "ltd"].iter().map(|m| m.to_string()).collect()
}

impl Default for PiiFilterConfigJson {
    fn default() -> Self {
        Self {
            entity_recognition_enabled: true,
            pattern_detection_enabled: true,
            annotate_instructions: true,
            org_markers: default_org_markers(),
        }
    }
}

impl From<PiiFilterConfigJson> for PiiFilterConfig {
    fn from(json: PiiFilterConfigJson) -> Self {
        Self {
            entity_recognition_enabled: json.entity_recognition_enabled,
            pattern_detection_enabled: json.pattern_detection_enabled,
            annotate_instructions: json.annotate_instructions,
            org_markers: json.org_markers,
        }
    }
}

/// Configuration for the PII filter.
#[derive(Debug, Clone)]
pub struct PiiFilterConfig {
    /// Enable the entity recognizer stage
    pub entity_recognition_enabled: bool,
    /// Enable the pattern library stage
    pub pattern_detection_enabled: bool,
    /// Append the placeholder-preservation instruction when masking
    pub annotate_instructions: bool,
    /// Organization marker vocabulary for the built-in recognizer
    pub org_markers: Vec<String>,
}

impl Default for PiiFilterConfig {
    fn default() -> Self {
        Self {
            entity_recognition_enabled: true,
            pattern_detection_enabled: true,
            annotate_instructions: true,
            org_markers: default_org_markers(),
        }
    }
}

/// One masking session: engines plus the mapping table they share.
///
/// The table is guarded by a reader/writer lock; `mask` holds the write lock
/// for the whole call, so concurrent calls against the same session see
/// at-most-one in-flight mutation. `contains_pii` never touches the table.
pub struct PiiFilter {
    config: PiiFilterConfig,
    masking: MaskingEngine,
    restoration: RestorationEngine,
    table: RwLock<MappingTable>,
}

impl Default for PiiFilter {
    fn default() -> Self {
        Self::new(PiiFilterConfig::default())
    }
}

impl PiiFilter {
    /// Create a session with the built-in heuristic recognizer.
    pub fn new(config: PiiFilterConfig) -> Self {
        let recognizer = HeuristicRecognizer::with_org_markers(&config.org_markers);
        Self::with_recognizer(config, Box::new(recognizer))
    }

    /// Create a session with a custom recognizer implementation.
    pub fn with_recognizer(config: PiiFilterConfig, recognizer: Box<dyn EntityRecognizer>) -> Self {
        let masking = MaskingEngine::new(recognizer).with_detection_flags(
            config.entity_recognition_enabled,
            config.pattern_detection_enabled,
        );
        Self {
            config,
            masking,
            restoration: RestorationEngine::new(),
            table: RwLock::new(MappingTable::new()),
        }
    }

    /// Mask all detected PII in `text`, accumulating mappings in the session
    /// table.
    pub fn mask(&self, text: &str) -> String {
        let mut table = self.write_table();
        self.masking.mask(text, &mut table)
    }

    /// Mask and append the placeholder-preservation instruction, when
    /// configured and at least one mapping exists.
    pub fn mask_with_annotation(&self, text: &str) -> String {
        let mut table = self.write_table();
        let masked = self.masking.mask(text, &mut table);
        if !self.config.annotate_instructions {
            return masked;
        }
        let annotation = masking::instruction_annotation(&table);
        if annotation.is_empty() {
            masked
        } else {
            masked + &annotation
        }
    }

    /// Cheap side-effect-free check used before paying for a full mask.
    pub fn contains_pii(&self, text: &str) -> bool {
        self.masking.contains_pii(text)
    }

    /// The instruction annotation for the session's current mappings.
    pub fn instruction_annotation(&self) -> String {
        masking::instruction_annotation(&self.read_table())
    }

    /// Restore placeholders in `text` using the session's own mappings.
    pub fn restore(&self, text: &str) -> RestoreOutcome {
        let snapshot = self.snapshot();
        self.restoration.restore(text, &snapshot)
    }

    /// Restore placeholders in `text` using a transported snapshot.
    pub fn restore_with(&self, text: &str, snapshot: &MappingSnapshot) -> RestoreOutcome {
        self.restoration.restore(text, snapshot)
    }

    /// Flat copy of the session mappings for transport.
    pub fn snapshot(&self) -> MappingSnapshot {
        self.read_table().snapshot()
    }

    /// Replace the session mappings wholesale from a snapshot.
    pub fn load_snapshot(&self, snapshot: MappingSnapshot) {
        self.write_table().load(snapshot);
    }

    /// Clear mappings and counters for a wholly new session.
    pub fn reset(&self) {
        self.write_table().reset();
    }

    fn read_table(&self) -> std::sync::RwLockReadGuard<'_, MappingTable> {
        match self.table.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_table(&self) -> std::sync::RwLockWriteGuard<'_, MappingTable> {
        match self.table.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PiiFilterConfig::default();
        assert!(config.entity_recognition_enabled);
        assert!(config.pattern_detection_enabled);
        assert!(config.annotate_instructions);
        assert_eq!(config.org_markers, vec!["inc", "corp", "llc", "ltd"]);
    }

    #[test]
    fn test_config_json_kebab_case() {
        let json = r#"{
            "entity-recognition-enabled": false,
            "org-markers": ["inc", "gmbh"]
        }"#;
        let parsed: PiiFilterConfigJson = serde_json::from_str(json).unwrap();
        let config: PiiFilterConfig = parsed.into();
        assert!(!config.entity_recognition_enabled);
        assert!(config.pattern_detection_enabled);
        assert_eq!(config.org_markers, vec!["inc", "gmbh"]);
    }

    #[test]
    fn test_session_round_trip() {
        let filter = PiiFilter::default();
        let input = "Server IP: 192.168.1.1";
        assert!(filter.contains_pii(input));
        let masked = filter.mask(input);
        assert_eq!(masked, "Server IP: [PII_IPADDRESS_1]");
        let outcome = filter.restore(&masked);
        assert_eq!(outcome.text, input);
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_session_reuses_tokens_across_calls() {
        let filter = PiiFilter::default();
        let first = filter.mask("mail john@example.com");
        let second = filter.mask("again john@example.com and new jane@example.com");
        assert!(first.contains("[PII_EMAIL_1]"));
        assert!(second.contains("[PII_EMAIL_1]"));
        assert!(second.contains("[PII_EMAIL_2]"));
    }

    #[test]
    fn test_reset_starts_numbering_over() {
        let filter = PiiFilter::default();
        filter.mask("mail john@example.com");
        filter.reset();
        let masked = filter.mask("mail jane@example.com");
        assert!(masked.contains("[PII_EMAIL_1]"));
    }

    #[test]
    fn test_mask_with_annotation() {
        let filter = PiiFilter::default();
        let masked = filter.mask_with_annotation("mail john@example.com");
        assert!(masked.starts_with("mail [PII_EMAIL_1]"));
        assert!(masked.contains("IMPORTANT: This prompt contains masked PII placeholders"));
        assert!(masked.contains("([PII_EMAIL_1])"));
    }

    #[test]
    fn test_annotation_disabled() {
        let config = PiiFilterConfig {
            annotate_instructions: false,
            ..Default::default()
        };
        let filter = PiiFilter::new(config);
        let masked = filter.mask_with_annotation("mail john@example.com");
        assert_eq!(masked, "mail [PII_EMAIL_1]");
    }

    #[test]
    fn test_no_annotation_for_clean_text() {
        let filter = PiiFilter::default();
        let masked = filter.mask_with_annotation("nothing sensitive");
        assert_eq!(masked, "nothing sensitive");
        assert_eq!(filter.instruction_annotation(), "");
    }

    #[test]
    fn test_load_snapshot_replaces_mappings() {
        let source = PiiFilter::default();
        source.mask("mail john@example.com");
        let snapshot = source.snapshot();

        let other = PiiFilter::default();
        other.load_snapshot(snapshot);
        let outcome = other.restore("reply to [PII_EMAIL_1]");
        assert_eq!(outcome.text, "reply to john@example.com");
    }
}
