//! Entity recognition capability.
//!
//! The engine does not implement linguistic analysis itself; it consumes the
//! narrow [`EntityRecognizer`] interface so the concrete recognizer is
//! swappable and testable with a stub. [`HeuristicRecognizer`] is the
//! built-in implementation: a deterministic lexicon-and-shape analyzer for
//! person names, organizations, places, dates, and money mentions.

use regex::Regex;
use thiserror::Error;

use super::{DetectedSpan, EntityKind};

/// Error raised by a recognizer backend.
///
/// The masking engine treats any recognizer failure as "no entity spans this
/// call" and continues with pattern detection alone.
#[derive(Debug, Error)]
pub enum RecognizerError {
    /// The backend itself failed.
    #[error("recognizer backend failed: {0}")]
    Backend(String),
    /// The backend returned data that could not be interpreted.
    #[error("recognizer produced unusable output: {0}")]
    Malformed(String),
}

/// Capability: detect spans of one entity kind in text.
///
/// Implementations must be deterministic for identical input and return
/// non-overlapping spans whose `text` is the exact matched substring.
pub trait EntityRecognizer: Send + Sync {
    fn match_category(&self, text: &str, kind: EntityKind)
        -> Result<Vec<DetectedSpan>, RecognizerError>;
}

const HONORIFICS: &[&str] = &["mr", "mrs", "ms", "dr", "prof"];

const GIVEN_NAMES: &[&str] = &[
    "Alice", "Andrew", "Anna", "Anthony", "Bob", "Carol", "Charlie", "Daniel", "David", "Emily",
    "Emma", "George", "Grace", "Henry", "James", "Jane", "Jennifer", "Jessica", "John", "Joseph",
    "Karen", "Laura", "Liam", "Linda", "Mark", "Mary", "Matthew", "Michael", "Noah", "Olivia",
    "Patricia", "Paul", "Peter", "Richard", "Robert", "Sarah", "Sophia", "Steven", "Susan",
    "Thomas", "William",
];

const PLACES: &[&str] = &[
    "Amsterdam", "Australia", "Berlin", "Boston", "California", "Canada", "Chicago", "Delhi",
    "Dubai", "England", "Florida", "France", "Germany", "India", "Japan", "London", "Los Angeles",
    "Madrid", "Miami", "Mumbai", "New York", "New York City", "Paris", "Rome", "San Francisco",
    "Seattle", "Singapore", "Sydney", "Texas", "Tokyo", "Toronto", "Washington",
];

const STREET_SUFFIXES: &[&str] = &[
    "street", "st", "avenue", "ave", "road", "rd", "boulevard", "blvd", "lane", "drive",
];

/// Default organization markers; extensible per instance.
const DEFAULT_ORG_MARKERS: &[&str] = &["inc", "corp", "llc", "ltd"];

/// A word of the scanned text, with its byte offsets.
#[derive(Debug, Clone, Copy)]
struct Word<'a> {
    text: &'a str,
    start: usize,
    end: usize,
}

/// Built-in deterministic entity recognizer.
///
/// Works on capitalized-word runs plus small lexicons: honorifics and given
/// names for people, suffix markers for organizations, a place lexicon and
/// street suffixes for locations, and regexes for dates and spelled-out
/// money mentions. Best-effort by design; the pattern library carries the
/// structurally regular categories.
pub struct HeuristicRecognizer {
    org_markers: Vec<String>,
    month_date: Regex,
    day_date: Regex,
    iso_date: Regex,
    slash_date: Regex,
    money_mention: Regex,
}

impl Default for HeuristicRecognizer {
    fn default() -> Self {
        Self::new()
    }
}

const MONTHS: &str = "January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|Jun|Jul|Aug|Sep|Sept|Oct|Nov|Dec";

impl HeuristicRecognizer {
    /// Create a recognizer with the default organization markers.
    pub fn new() -> Self {
        let defaults: Vec<String> = DEFAULT_ORG_MARKERS.iter().map(|m| m.to_string()).collect();
        Self::with_org_markers(&defaults)
    }

    /// Create a recognizer with a custom organization marker vocabulary.
    pub fn with_org_markers(markers: &[String]) -> Self {
        Self {
            org_markers: markers.iter().map(|m| m.to_lowercase()).collect(),
            month_date: Regex::new(&format!(
                r"\b(?:{MONTHS})\.?\s+\d{{1,2}}(?:st|nd|rd|th)?(?:,\s*\d{{4}})?\b"
            ))
            .expect("Invalid month date regex"),
            day_date: Regex::new(&format!(
                r"\b\d{{1,2}}(?:st|nd|rd|th)?\s+(?:{MONTHS})\.?(?:,?\s*\d{{4}})?\b"
            ))
            .expect("Invalid day date regex"),
            iso_date: Regex::new(r"\b\d{4}-\d{2}-\d{2}\b").expect("Invalid ISO date regex"),
            slash_date: Regex::new(r"\b\d{1,2}/\d{1,2}/\d{2,4}\b")
                .expect("Invalid slash date regex"),
            money_mention: Regex::new(
                r"(?i)\b\d+(?:,\d{3})*(?:\.\d+)?\s*(?:dollars?|euros?|pounds?|rupees?|yen|bucks?|cents?|crores?|lakhs?|millions?|billions?|thousand)\b",
            )
            .expect("Invalid money mention regex"),
        }
    }

    /// Add a marker word to the organization vocabulary.
    pub fn add_org_marker(&mut self, marker: &str) {
        let marker = marker.to_lowercase();
        if !self.org_markers.contains(&marker) {
            self.org_markers.push(marker);
        }
    }

    fn is_org_marker(&self, word: &str) -> bool {
        let lowered = word.to_lowercase();
        self.org_markers.contains(&lowered)
    }

    fn persons(&self, text: &str) -> Vec<DetectedSpan> {
        let words = words(text);
        let mut spans = Vec::new();
        for run in capitalized_runs(text, &words) {
            let last = run[run.len() - 1];
            if self.is_org_marker(last.text) {
                continue;
            }
            // A name is anchored by an honorific or a known given name; the
            // anchor need not start the run ("Contact John Smith").
            let mut i = 0;
            while i < run.len() {
                if is_honorific(run[i].text) && i + 1 < run.len() {
                    // honorific plus up to three following words
                    let end = (i + 4).min(run.len()) - 1;
                    spans.push(span(text, EntityKind::Person, run[i].start, run[end].end));
                    i = end + 1;
                } else if GIVEN_NAMES.contains(&run[i].text) {
                    let end = (i + 3).min(run.len()) - 1;
                    spans.push(span(text, EntityKind::Person, run[i].start, run[end].end));
                    i = end + 1;
                } else {
                    i += 1;
                }
            }
        }
        spans
    }

    fn organizations(&self, text: &str) -> Vec<DetectedSpan> {
        let words = words(text);
        let mut spans: Vec<DetectedSpan> = Vec::new();
        for idx in 1..words.len() {
            let marker = words[idx];
            if !self.is_org_marker(marker.text) {
                continue;
            }
            let prev = words[idx - 1];
            let gap = &text[prev.end..marker.start];
            if !(gap == " " || gap == ", ") || !is_capitalized(prev.text) {
                continue;
            }
            // extend left over the capitalized run
            let mut j = idx - 1;
            while j > 0
                && is_capitalized(words[j - 1].text)
                && &text[words[j - 1].end..words[j].start] == " "
            {
                j -= 1;
            }
            let start = words[j].start;
            if spans.last().map_or(false, |s| start < s.end) {
                continue;
            }
            spans.push(span(text, EntityKind::Organization, start, marker.end));
        }
        spans
    }

    fn places(&self, text: &str) -> Vec<DetectedSpan> {
        let words = words(text);
        let mut spans = Vec::new();
        for run in capitalized_runs(text, &words) {
            let mut matched_lexicon = false;
            let mut k = 0;
            while k < run.len() {
                let mut advanced = 0;
                for size in (1..=3.min(run.len() - k)).rev() {
                    let candidate = &text[run[k].start..run[k + size - 1].end];
                    if PLACES.contains(&candidate) {
                        spans.push(span(
                            text,
                            EntityKind::Place,
                            run[k].start,
                            run[k + size - 1].end,
                        ));
                        advanced = size;
                        matched_lexicon = true;
                        break;
                    }
                }
                k += if advanced > 0 { advanced } else { 1 };
            }
            if !matched_lexicon && run.len() >= 2 {
                let last = run[run.len() - 1];
                let suffix = last.text.to_lowercase();
                if STREET_SUFFIXES.contains(&suffix.as_str()) {
                    spans.push(span(text, EntityKind::Place, run[0].start, last.end));
                }
            }
        }
        spans
    }

    fn dates(&self, text: &str) -> Vec<DetectedSpan> {
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for regex in [&self.month_date, &self.day_date, &self.iso_date, &self.slash_date] {
            for m in regex.find_iter(text) {
                ranges.push((m.start(), m.end()));
            }
        }
        // keep leftmost-longest, non-overlapping
        ranges.sort_by(|a, b| a.0.cmp(&b.0).then(b.1.cmp(&a.1)));
        let mut spans = Vec::new();
        let mut last_end = 0;
        for (start, end) in ranges {
            if start < last_end {
                continue;
            }
            spans.push(span(text, EntityKind::Date, start, end));
            last_end = end;
        }
        spans
    }

    fn money_mentions(&self, text: &str) -> Vec<DetectedSpan> {
        self.money_mention
            .find_iter(text)
            .map(|m| span(text, EntityKind::Money, m.start(), m.end()))
            .collect()
    }
}

impl EntityRecognizer for HeuristicRecognizer {
    fn match_category(
        &self,
        text: &str,
        kind: EntityKind,
    ) -> Result<Vec<DetectedSpan>, RecognizerError> {
        if text.is_empty() {
            return Ok(Vec::new());
        }
        Ok(match kind {
            EntityKind::Person => self.persons(text),
            EntityKind::Organization => self.organizations(text),
            EntityKind::Place => self.places(text),
            EntityKind::Date => self.dates(text),
            EntityKind::Money => self.money_mentions(text),
        })
    }
}

fn span(text: &str, kind: EntityKind, start: usize, end: usize) -> DetectedSpan {
    DetectedSpan {
        category: kind.category(),
        text: text[start..end].to_string(),
        start,
        end,
    }
}

fn words(text: &str) -> Vec<Word<'_>> {
    let mut out = Vec::new();
    let mut start = None;
    for (i, ch) in text.char_indices() {
        if ch.is_alphabetic() {
            if start.is_none() {
                start = Some(i);
            }
        } else if let Some(s) = start.take() {
            out.push(Word { text: &text[s..i], start: s, end: i });
        }
    }
    if let Some(s) = start {
        out.push(Word { text: &text[s..], start: s, end: text.len() });
    }
    out
}

fn is_capitalized(word: &str) -> bool {
    word.chars().next().map_or(false, |c| c.is_uppercase())
}

fn is_honorific(word: &str) -> bool {
    let lowered = word.to_lowercase();
    HONORIFICS.contains(&lowered.as_str())
}

/// Group consecutive capitalized words into runs.
///
/// Words join a run across exactly one space, or across ". " when the left
/// word is an honorific ("Mr. John"). Anything else (punctuation, newlines,
/// multiple spaces) breaks the run, so label text like "Name: John Smith"
/// keeps the label out of the name.
fn capitalized_runs<'a>(text: &str, words: &[Word<'a>]) -> Vec<Vec<Word<'a>>> {
    let mut runs = Vec::new();
    let mut current: Vec<Word<'a>> = Vec::new();
    for &word in words {
        if is_capitalized(word.text) {
            if let Some(prev) = current.last() {
                let gap = &text[prev.end..word.start];
                let joins = gap == " "
                    || ((gap == ". " || gap == ".") && is_honorific(prev.text));
                if joins {
                    current.push(word);
                    continue;
                }
                runs.push(std::mem::take(&mut current));
            }
            current.push(word);
        } else if !current.is_empty() {
            runs.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}
