//! Detection modules for PII analysis.

pub mod patterns;
pub mod recognizer;

pub use patterns::PatternLibrary;
pub use recognizer::{EntityRecognizer, HeuristicRecognizer, RecognizerError};

/// Categories of PII tracked by the engine.
///
/// Each category has its own placeholder counter in the mapping table, so
/// tokens read `[PII_EMAIL_1]`, `[PII_PERSON_2]` and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PiiCategory {
    Person,
    Org,
    Location,
    Date,
    Money,
    Email,
    Phone,
    Ssn,
    CreditCard,
    BankAccount,
    IpAddress,
    Url,
    Passport,
    License,
}

impl PiiCategory {
    /// The uppercase tag used inside placeholder tokens.
    pub fn as_str(&self) -> &'static str {
        match self {
            PiiCategory::Person => "PERSON",
            PiiCategory::Org => "ORG",
            PiiCategory::Location => "LOCATION",
            PiiCategory::Date => "DATE",
            PiiCategory::Money => "MONEY",
            PiiCategory::Email => "EMAIL",
            PiiCategory::Phone => "PHONE",
            PiiCategory::Ssn => "SSN",
            PiiCategory::CreditCard => "CREDITCARD",
            PiiCategory::BankAccount => "BANKACCOUNT",
            PiiCategory::IpAddress => "IPADDRESS",
            PiiCategory::Url => "URL",
            PiiCategory::Passport => "PASSPORT",
            PiiCategory::License => "LICENSE",
        }
    }
}

/// Entity kinds the recognizer capability is asked about.
///
/// These are the unstructured categories that need linguistic context rather
/// than a fixed shape. `Organization` and `Place` map onto the `ORG` and
/// `LOCATION` mapping-table categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Person,
    Organization,
    Place,
    Date,
    Money,
}

impl EntityKind {
    /// All kinds, in masking order.
    pub const ALL: [EntityKind; 5] = [
        EntityKind::Person,
        EntityKind::Organization,
        EntityKind::Place,
        EntityKind::Date,
        EntityKind::Money,
    ];

    /// The mapping-table category for spans of this kind.
    pub fn category(&self) -> PiiCategory {
        match self {
            EntityKind::Person => PiiCategory::Person,
            EntityKind::Organization => PiiCategory::Org,
            EntityKind::Place => PiiCategory::Location,
            EntityKind::Date => PiiCategory::Date,
            EntityKind::Money => PiiCategory::Money,
        }
    }

    /// Lowercase display name for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Person => "person",
            EntityKind::Organization => "organization",
            EntityKind::Place => "place",
            EntityKind::Date => "date",
            EntityKind::Money => "money",
        }
    }
}

/// A span of detected PII in text.
///
/// `start`/`end` are byte offsets into the scanned text and `text` is the
/// exact matched substring. Spans are transient; only the matched value ends
/// up in the mapping table.
#[derive(Debug, Clone)]
pub struct DetectedSpan {
    pub category: PiiCategory,
    pub text: String,
    pub start: usize,
    pub end: usize,
}
