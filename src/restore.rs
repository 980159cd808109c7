//! Restoration engine: placeholder-to-original rewriting.

use regex::Regex;
use tracing::{debug, warn};

use crate::mapping::{MappingSnapshot, MappingTable};

/// Result of a restoration pass.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    /// The rewritten text.
    pub text: String,
    /// Distinct placeholder tokens that had no reverse-mapping entry.
    pub unresolved: Vec<String>,
    remaining: usize,
}

impl RestoreOutcome {
    /// True when no placeholder-shaped token survived in the output.
    ///
    /// False indicates an incomplete mapping snapshot or a cross-session
    /// mismatch; never a fatal condition.
    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

/// Rewrites recognized placeholder tokens in arbitrary downstream text back
/// to their original values.
///
/// Tokens without a mapping entry are left untouched and reported; nothing
/// here is ever fatal.
pub struct RestorationEngine {
    placeholder: Regex,
}

impl Default for RestorationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl RestorationEngine {
    pub fn new() -> Self {
        Self {
            placeholder: Regex::new(r"\[PII_[A-Z_]+_[0-9]+\]")
                .expect("Invalid placeholder regex"),
        }
    }

    /// Restore original values in `text` using the snapshot's reverse side.
    ///
    /// Found tokens are substituted longest-first so that a token whose text
    /// is a substring of another token cannot clobber it partway. Every
    /// literal occurrence of a known token is replaced.
    pub fn restore(&self, text: &str, snapshot: &MappingSnapshot) -> RestoreOutcome {
        if text.is_empty() {
            return RestoreOutcome {
                text: String::new(),
                unresolved: Vec::new(),
                remaining: 0,
            };
        }

        let mut table = MappingTable::new();
        table.load(snapshot.clone());

        let mut found: Vec<&str> = self.placeholder.find_iter(text).map(|m| m.as_str()).collect();
        found.sort_unstable();
        found.dedup();
        if found.is_empty() {
            debug!("No placeholders found in text");
            return RestoreOutcome {
                text: text.to_string(),
                unresolved: Vec::new(),
                remaining: 0,
            };
        }

        // Longest first; ties broken lexically for determinism.
        found.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));

        let mut restored = text.to_string();
        let mut unresolved = Vec::new();
        for token in found {
            match table.original_for(token) {
                Some(original) => {
                    restored = restored.replace(token, original);
                }
                None => {
                    warn!(token = token, "No mapping entry for placeholder");
                    unresolved.push(token.to_string());
                }
            }
        }

        let remaining = self.placeholder.find_iter(&restored).count();
        if remaining > 0 {
            warn!(remaining = remaining, "Placeholders remain after restoration");
        } else {
            debug!("All placeholders restored");
        }

        RestoreOutcome {
            text: restored,
            unresolved,
            remaining,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::PiiCategory;

    fn snapshot_with(entries: &[(PiiCategory, &str)]) -> MappingSnapshot {
        let mut table = MappingTable::new();
        for (category, value) in entries {
            table.get_or_assign(*category, value);
        }
        table.snapshot()
    }

    #[test]
    fn test_restores_known_token() {
        let snapshot = snapshot_with(&[(PiiCategory::IpAddress, "192.168.1.1")]);
        let engine = RestorationEngine::new();
        let outcome = engine.restore("Server IP: [PII_IPADDRESS_1]", &snapshot);
        assert_eq!(outcome.text, "Server IP: 192.168.1.1");
        assert!(outcome.unresolved.is_empty());
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_restores_every_occurrence() {
        let snapshot = snapshot_with(&[(PiiCategory::Person, "John Smith")]);
        let engine = RestorationEngine::new();
        let outcome = engine.restore(
            "[PII_PERSON_1] said that [PII_PERSON_1] would attend",
            &snapshot,
        );
        assert_eq!(outcome.text, "John Smith said that John Smith would attend");
    }

    #[test]
    fn test_unknown_token_left_in_place() {
        let engine = RestorationEngine::new();
        let outcome = engine.restore("Call [PII_PERSON_99] now", &MappingSnapshot::default());
        assert_eq!(outcome.text, "Call [PII_PERSON_99] now");
        assert_eq!(outcome.unresolved, vec!["[PII_PERSON_99]".to_string()]);
        assert!(!outcome.is_complete());
    }

    #[test]
    fn test_longer_token_not_clobbered_by_shorter() {
        let mut table = MappingTable::new();
        for i in 0..10 {
            table.get_or_assign(PiiCategory::Date, &format!("2024-01-{:02}", i + 1));
        }
        let snapshot = table.snapshot();
        let engine = RestorationEngine::new();
        let outcome = engine.restore("from [PII_DATE_1] until [PII_DATE_10]", &snapshot);
        assert_eq!(outcome.text, "from 2024-01-01 until 2024-01-10");
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_empty_text_unchanged() {
        let engine = RestorationEngine::new();
        let snapshot = snapshot_with(&[(PiiCategory::Email, "a@example.com")]);
        let outcome = engine.restore("", &snapshot);
        assert_eq!(outcome.text, "");
        assert!(outcome.is_complete());
    }

    #[test]
    fn test_text_without_placeholders_unchanged() {
        let engine = RestorationEngine::new();
        let snapshot = snapshot_with(&[(PiiCategory::Email, "a@example.com")]);
        let outcome = engine.restore("no tokens here", &snapshot);
        assert_eq!(outcome.text, "no tokens here");
    }

    #[test]
    fn test_malformed_tokens_ignored() {
        let engine = RestorationEngine::new();
        let snapshot = snapshot_with(&[(PiiCategory::Email, "a@example.com")]);
        let outcome = engine.restore("[PII_email_1] and [PII_EMAIL_] and [PII_EMAIL_1]", &snapshot);
        // only the well-formed token is touched
        assert_eq!(outcome.text, "[PII_email_1] and [PII_EMAIL_] and a@example.com");
    }

    #[test]
    fn test_mixed_known_and_unknown() {
        let snapshot = snapshot_with(&[(PiiCategory::Email, "a@example.com")]);
        let engine = RestorationEngine::new();
        let outcome = engine.restore("[PII_EMAIL_1] vs [PII_PHONE_7]", &snapshot);
        assert_eq!(outcome.text, "a@example.com vs [PII_PHONE_7]");
        assert_eq!(outcome.unresolved, vec!["[PII_PHONE_7]".to_string()]);
        assert!(!outcome.is_complete());
    }
}
