//! Masking engine: detection orchestration and placeholder substitution.

use tracing::{debug, warn};

use crate::detection::{DetectedSpan, EntityKind, EntityRecognizer, PatternLibrary};
use crate::mapping::MappingTable;

/// Orchestrates the entity recognizer and the pattern library against input
/// text, assigning or reusing placeholders through the mapping table.
///
/// Entity kinds run first, in a fixed order, then the pattern categories in
/// their fixed order, so placeholder numbering is deterministic for identical
/// input and identical prior table state.
pub struct MaskingEngine {
    patterns: PatternLibrary,
    recognizer: Box<dyn EntityRecognizer>,
    entity_recognition: bool,
    pattern_detection: bool,
}

impl MaskingEngine {
    /// Create an engine with all detection enabled.
    pub fn new(recognizer: Box<dyn EntityRecognizer>) -> Self {
        Self {
            patterns: PatternLibrary::new(),
            recognizer,
            entity_recognition: true,
            pattern_detection: true,
        }
    }

    /// Toggle the two detection stages.
    pub fn with_detection_flags(mut self, entity_recognition: bool, pattern_detection: bool) -> Self {
        self.entity_recognition = entity_recognition;
        self.pattern_detection = pattern_detection;
        self
    }

    /// Mask all detected PII in `text`, reusing or minting placeholders in
    /// `table`. Entries are only ever added, never removed.
    ///
    /// Substitution is literal: each detected span replaces the first
    /// remaining occurrence of its matched substring in the working copy.
    /// A value that is a substring of another detected value, or that recurs
    /// with different surrounding context, can therefore be replaced
    /// inconsistently; this is an accepted heuristic trade-off.
    pub fn mask(&self, text: &str, table: &mut MappingTable) -> String {
        if text.trim().is_empty() {
            return text.to_string();
        }

        let before = table.len();
        let mut masked = text.to_string();

        if self.entity_recognition {
            for kind in EntityKind::ALL {
                match self.recognizer.match_category(text, kind) {
                    Ok(spans) => {
                        for span in spans {
                            if !span_is_valid(text, &span) {
                                warn!(
                                    kind = kind.as_str(),
                                    start = span.start,
                                    end = span.end,
                                    "Dropping malformed recognizer span"
                                );
                                continue;
                            }
                            let token = table.get_or_assign(kind.category(), &span.text);
                            replace_first(&mut masked, &span.text, &token);
                        }
                    }
                    Err(e) => {
                        warn!(
                            kind = kind.as_str(),
                            error = %e,
                            "Entity recognizer failed, continuing with pattern detection"
                        );
                    }
                }
            }
        }

        if self.pattern_detection {
            // Patterns scan the original input, not the substituted copy.
            for span in self.patterns.detect(text) {
                let token = table.get_or_assign(span.category, &span.text);
                replace_first(&mut masked, &span.text, &token);
            }
        }

        let added = table.len() - before;
        if added > 0 {
            debug!(added = added, total = table.len(), "Masked text with new mappings");
        }
        masked
    }

    /// Side-effect-free check: does `text` contain anything maskable?
    ///
    /// True when the recognizer finds any entity span or any pattern regex
    /// matches. A recognizer failure degrades to the pattern sweep alone.
    pub fn contains_pii(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            return false;
        }

        if self.entity_recognition {
            for kind in EntityKind::ALL {
                match self.recognizer.match_category(text, kind) {
                    Ok(spans) => {
                        if !spans.is_empty() {
                            return true;
                        }
                    }
                    Err(e) => {
                        warn!(
                            kind = kind.as_str(),
                            error = %e,
                            "Entity recognizer failed, falling back to pattern check"
                        );
                        break;
                    }
                }
            }
        }

        self.pattern_detection && self.patterns.matches_any(text)
    }
}

/// Build the instruction annotation for a downstream consumer.
///
/// Lists every placeholder currently known to the table and directs the
/// consumer to keep them verbatim. Empty string when the table is empty.
pub fn instruction_annotation(table: &MappingTable) -> String {
    if table.is_empty() {
        return String::new();
    }
    let mut tokens: Vec<&str> = table.tokens().collect();
    tokens.sort_unstable();
    format!(
        "\n\nIMPORTANT: This prompt contains masked PII placeholders ({}). \
         Please maintain these exact placeholders in your response and do not \
         attempt to replace or modify them. Treat them as specific identifiers \
         that must remain unchanged.",
        tokens.join(", ")
    )
}

fn span_is_valid(text: &str, span: &DetectedSpan) -> bool {
    !span.text.is_empty() && text.get(span.start..span.end) == Some(span.text.as_str())
}

fn replace_first(haystack: &mut String, needle: &str, replacement: &str) {
    if let Some(pos) = haystack.find(needle) {
        haystack.replace_range(pos..pos + needle.len(), replacement);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{HeuristicRecognizer, PiiCategory, RecognizerError};

    fn engine() -> MaskingEngine {
        MaskingEngine::new(Box::new(HeuristicRecognizer::new()))
    }

    /// Recognizer that always fails, for degradation tests.
    struct FailingRecognizer;

    impl EntityRecognizer for FailingRecognizer {
        fn match_category(
            &self,
            _text: &str,
            _kind: EntityKind,
        ) -> Result<Vec<DetectedSpan>, RecognizerError> {
            Err(RecognizerError::Backend("stub failure".to_string()))
        }
    }

    /// Recognizer that returns spans with bogus offsets.
    struct MalformedRecognizer;

    impl EntityRecognizer for MalformedRecognizer {
        fn match_category(
            &self,
            _text: &str,
            kind: EntityKind,
        ) -> Result<Vec<DetectedSpan>, RecognizerError> {
            if kind == EntityKind::Person {
                Ok(vec![DetectedSpan {
                    category: PiiCategory::Person,
                    text: "Nobody".to_string(),
                    start: 500,
                    end: 506,
                }])
            } else {
                Ok(Vec::new())
            }
        }
    }

    #[test]
    fn test_blank_input_unchanged() {
        let engine = engine();
        let mut table = MappingTable::new();
        assert_eq!(engine.mask("", &mut table), "");
        assert_eq!(engine.mask("   ", &mut table), "   ");
        assert!(table.is_empty());
    }

    #[test]
    fn test_masks_email_with_typed_token() {
        let engine = engine();
        let mut table = MappingTable::new();
        let masked = engine.mask("Write to john@example.com today", &mut table);
        assert_eq!(masked, "Write to [PII_EMAIL_1] today");
    }

    #[test]
    fn test_repeated_value_uses_one_token() {
        let engine = engine();
        let mut table = MappingTable::new();
        let masked = engine.mask(
            "Send to john@example.com and cc john@example.com as well",
            &mut table,
        );
        assert_eq!(
            masked,
            "Send to [PII_EMAIL_1] and cc [PII_EMAIL_1] as well"
        );
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_entities_numbered_before_patterns() {
        let engine = engine();
        let mut table = MappingTable::new();
        let masked = engine.mask("John Smith lives at 192.168.1.1", &mut table);
        assert_eq!(masked, "[PII_PERSON_1] lives at [PII_IPADDRESS_1]");
    }

    #[test]
    fn test_recognizer_failure_degrades_to_patterns() {
        let engine = MaskingEngine::new(Box::new(FailingRecognizer));
        let mut table = MappingTable::new();
        let masked = engine.mask("John Smith at john@example.com", &mut table);
        assert_eq!(masked, "John Smith at [PII_EMAIL_1]");
        assert!(engine.contains_pii("reach me at john@example.com"));
    }

    #[test]
    fn test_malformed_spans_dropped() {
        let engine = MaskingEngine::new(Box::new(MalformedRecognizer));
        let mut table = MappingTable::new();
        let masked = engine.mask("nothing sensitive here", &mut table);
        assert_eq!(masked, "nothing sensitive here");
        assert!(table.is_empty());
    }

    #[test]
    fn test_contains_pii_has_no_side_effects() {
        let engine = engine();
        assert!(engine.contains_pii("SSN 123-45-6789"));
        assert!(!engine.contains_pii("just plain words"));
        assert!(!engine.contains_pii(""));
    }

    #[test]
    fn test_masking_disabled_stages() {
        let engine = MaskingEngine::new(Box::new(HeuristicRecognizer::new()))
            .with_detection_flags(false, true);
        let mut table = MappingTable::new();
        let masked = engine.mask("John Smith at john@example.com", &mut table);
        assert_eq!(masked, "John Smith at [PII_EMAIL_1]");
    }

    #[test]
    fn test_annotation_lists_tokens() {
        let engine = engine();
        let mut table = MappingTable::new();
        engine.mask("mail john@example.com", &mut table);
        let annotation = instruction_annotation(&table);
        assert!(annotation.contains("[PII_EMAIL_1]"));
        assert!(annotation.contains("masked PII placeholders"));
    }

    #[test]
    fn test_annotation_empty_without_mappings() {
        let table = MappingTable::new();
        assert_eq!(instruction_annotation(&table), "");
    }
}
