use std::fmt;

use serde::Serialize;

/// Written in place of any review field that could not be read.
pub const FIELD_SENTINEL: &str = "NA";
pub const UNKNOWN_ITEM: &str = "Unknown Product";
pub const UNKNOWN_RATING: &str = "N/A";

/// Outcome of reading one field off a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field {
    Value(String),
    Unavailable,
}

impl Field {
    /// Inverse of the export convention: the sentinel reads back as unavailable.
    pub fn from_export(text: &str) -> Self {
        if text == FIELD_SENTINEL {
            Field::Unavailable
        } else {
            Field::Value(text.to_string())
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Field::Value(_))
    }

    pub fn as_str_or<'a>(&'a self, sentinel: &'a str) -> &'a str {
        match self {
            Field::Value(v) => v,
            Field::Unavailable => sentinel,
        }
    }

    pub fn into_string_or(self, sentinel: &str) -> String {
        match self {
            Field::Value(v) => v,
            Field::Unavailable => sentinel.to_string(),
        }
    }

    /// Text as it appears in exports and scoring: the value, or `"NA"`.
    pub fn text(&self) -> &str {
        self.as_str_or(FIELD_SENTINEL)
    }
}

/// One review block as read from a listing page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReview {
    pub declared_rating: Field,
    pub title: Field,
    pub body: Field,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingMetadata {
    pub item_name: String,
    pub aggregate_rating: String,
}

impl Default for ListingMetadata {
    fn default() -> Self {
        Self {
            item_name: UNKNOWN_ITEM.to_string(),
            aggregate_rating: UNKNOWN_RATING.to_string(),
        }
    }
}

/// A star class, always in 1..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(into = "u8")]
pub struct Stars(u8);

impl Stars {
    pub const ONE: Stars = Stars(1);
    pub const TWO: Stars = Stars(2);
    pub const THREE: Stars = Stars(3);
    pub const FOUR: Stars = Stars(4);
    pub const FIVE: Stars = Stars(5);
    pub const ALL: [Stars; 5] = [
        Stars::ONE,
        Stars::TWO,
        Stars::THREE,
        Stars::FOUR,
        Stars::FIVE,
    ];

    pub fn new(n: u8) -> Option<Self> {
        (1..=5).contains(&n).then_some(Stars(n))
    }

    /// Parse a reviewer's declared rating. Anything that is not a base-10
    /// integer in 1..=5 is rejected.
    pub fn parse_declared(text: &str) -> Option<Self> {
        let n: i64 = text.trim().parse().ok()?;
        u8::try_from(n).ok().and_then(Stars::new)
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Zero-based row/column index into per-class tables.
    pub fn index(self) -> usize {
        usize::from(self.0 - 1)
    }
}

impl From<Stars> for u8 {
    fn from(s: Stars) -> u8 {
        s.0
    }
}

impl fmt::Display for Stars {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A review that survived the declared-rating filter, with its prediction.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredReview {
    /// Position in the raw sequence it came from.
    pub position: usize,
    pub review: RawReview,
    pub sentiment: f64,
    pub declared: Stars,
    pub predicted: Stars,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declared_rating_parsing() {
        assert_eq!(Stars::parse_declared("5"), Stars::new(5));
        assert_eq!(Stars::parse_declared(" 1 "), Stars::new(1));
        assert_eq!(Stars::parse_declared("0"), None);
        assert_eq!(Stars::parse_declared("6"), None);
        assert_eq!(Stars::parse_declared("-3"), None);
        assert_eq!(Stars::parse_declared("4.5"), None);
        assert_eq!(Stars::parse_declared("abc"), None);
        assert_eq!(Stars::parse_declared(FIELD_SENTINEL), None);
        assert_eq!(Stars::parse_declared("99999999999999999999"), None);
    }

    #[test]
    fn field_sentinel_round_trip() {
        assert_eq!(Field::Unavailable.text(), "NA");
        assert_eq!(Field::from_export("NA"), Field::Unavailable);
        assert_eq!(Field::from_export(""), Field::Value(String::new()));
        assert_eq!(Field::Value("ok".into()).into_string_or("x"), "ok");
    }

    #[test]
    fn star_index_matches_class() {
        let idx: Vec<usize> = Stars::ALL.iter().map(|s| s.index()).collect();
        assert_eq!(idx, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn named_classes_are_valid() {
        let named = [Stars::ONE, Stars::TWO, Stars::THREE, Stars::FOUR, Stars::FIVE];
        for (n, s) in (1u8..=5).zip(named) {
            assert_eq!(Stars::new(n), Some(s));
        }
        assert_eq!(named, Stars::ALL);
        assert_eq!(Stars::new(0), None);
    }
}
