//! Regex detectors for structurally regular PII.
//!
//! Covers the values an entity recognizer tends to miss: emails, phone
//! numbers, SSNs, credit cards, money amounts, bank accounts, IP addresses,
//! URLs, passport and license numbers.

use regex::Regex;

use super::{DetectedSpan, PiiCategory};

/// Pattern categories in masking order.
const PATTERN_ORDER: [PiiCategory; 10] = [
    PiiCategory::Email,
    PiiCategory::Phone,
    PiiCategory::Ssn,
    PiiCategory::CreditCard,
    PiiCategory::Money,
    PiiCategory::BankAccount,
    PiiCategory::IpAddress,
    PiiCategory::Url,
    PiiCategory::Passport,
    PiiCategory::License,
];

/// Fixed set of named regex detectors for structurally recognizable PII.
///
/// Each detector is a global, non-anchored scan; a pure function of the text
/// with no state. The numeric patterns deliberately favor recall over
/// precision: a bank-account match can overlap what the phone or credit-card
/// patterns would also accept, and the fixed category order decides which
/// one masks it first.
pub struct PatternLibrary {
    email: Regex,
    phone: Regex,
    ssn: Regex,
    credit_card: Regex,
    money: Regex,
    bank_account: Regex,
    ip_address: Regex,
    url: Regex,
    passport: Regex,
    license: Regex,
}

impl Default for PatternLibrary {
    fn default() -> Self {
        Self::new()
    }
}

impl PatternLibrary {
    /// Compile the pattern set.
    pub fn new() -> Self {
        Self {
            email: Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b")
                .expect("Invalid email regex"),
            phone: Regex::new(r"(?:\+?1[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b")
                .expect("Invalid phone regex"),
            ssn: Regex::new(r"\b\d{3}-?\d{2}-?\d{4}\b").expect("Invalid SSN regex"),
            credit_card: Regex::new(
                r"\b\d{3,4}[-\s]?\d{3,4}[-\s]?\d{4}[-\s]?\d{4}\b|\b\d{13,16}\b",
            )
            .expect("Invalid credit card regex"),
            money: Regex::new(
                r"(?:[$€£¥]|USD|EUR|GBP|JPY|AUD|CAD|CHF|CNY|INR|rs)\s*\d{1,3}(?:,\d{3})*(?:\.\d{2})?|\d{1,3}(?:,\d{3})*(?:\.\d{2})?\s*(?:[$€£¥]|USD|EUR|GBP|JPY|AUD|CAD|CHF|CNY|INR|rs)\b",
            )
            .expect("Invalid money regex"),
            bank_account: Regex::new(r"\b[1-9]\d{7,16}\b").expect("Invalid bank account regex"),
            ip_address: Regex::new(
                r"\b(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\b",
            )
            .expect("Invalid IP regex"),
            url: Regex::new(
                r"https?://(?:www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b[-a-zA-Z0-9()@:%_+.~#?&/=]*",
            )
            .expect("Invalid URL regex"),
            passport: Regex::new(r"\b(?:[A-Z]{1,2}[0-9]{6,7}|[0-9]{9})\b")
                .expect("Invalid passport regex"),
            license: Regex::new(r"\b[A-Z][0-9]{7}\b").expect("Invalid license regex"),
        }
    }

    fn regex_for(&self, category: PiiCategory) -> Option<&Regex> {
        match category {
            PiiCategory::Email => Some(&self.email),
            PiiCategory::Phone => Some(&self.phone),
            PiiCategory::Ssn => Some(&self.ssn),
            PiiCategory::CreditCard => Some(&self.credit_card),
            PiiCategory::Money => Some(&self.money),
            PiiCategory::BankAccount => Some(&self.bank_account),
            PiiCategory::IpAddress => Some(&self.ip_address),
            PiiCategory::Url => Some(&self.url),
            PiiCategory::Passport => Some(&self.passport),
            PiiCategory::License => Some(&self.license),
            // Entity categories have no fixed shape; the recognizer owns them.
            PiiCategory::Person | PiiCategory::Org | PiiCategory::Location | PiiCategory::Date => {
                None
            }
        }
    }

    /// Detect all pattern matches, in category order then text order.
    pub fn detect(&self, text: &str) -> Vec<DetectedSpan> {
        let mut spans = Vec::new();
        for category in PATTERN_ORDER {
            spans.extend(self.detect_category(text, category));
        }
        spans
    }

    /// Detect matches for a single pattern category.
    pub fn detect_category(&self, text: &str, category: PiiCategory) -> Vec<DetectedSpan> {
        let Some(regex) = self.regex_for(category) else {
            return Vec::new();
        };

        let mut spans = Vec::new();
        for m in regex.find_iter(text) {
            // A numeric match glued to a longer digit run is a fragment of
            // that run, not a standalone value.
            if is_numeric_category(category) && part_of_digit_run(text, m.start(), m.end()) {
                continue;
            }
            spans.push(DetectedSpan {
                category,
                text: m.as_str().to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
        spans
    }

    /// Cheap raw sweep: does any pattern match at all?
    pub fn matches_any(&self, text: &str) -> bool {
        self.email.is_match(text)
            || self.phone.is_match(text)
            || self.ssn.is_match(text)
            || self.credit_card.is_match(text)
            || self.money.is_match(text)
            || self.bank_account.is_match(text)
            || self.ip_address.is_match(text)
            || self.url.is_match(text)
            || self.passport.is_match(text)
            || self.license.is_match(text)
    }
}

fn is_numeric_category(category: PiiCategory) -> bool {
    matches!(
        category,
        PiiCategory::Phone | PiiCategory::Ssn | PiiCategory::CreditCard | PiiCategory::BankAccount
    )
}

/// True when the match is flanked by more of a digit/dash run on either side.
fn part_of_digit_run(text: &str, start: usize, end: usize) -> bool {
    let bytes = text.as_bytes();
    let before = start > 0
        && (bytes[start - 1].is_ascii_digit()
            || (bytes[start - 1] == b'-' && start > 1 && bytes[start - 2].is_ascii_digit()));
    let after = end < bytes.len()
        && (bytes[end].is_ascii_digit()
            || (bytes[end] == b'-' && end + 1 < bytes.len() && bytes[end + 1].is_ascii_digit()));
    before || after
}
