use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

use crate::review::{ScoredReview, Stars};

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{L}\p{N}']+").unwrap());

const STOPWORDS: &[&str] = &[
    "a", "about", "after", "all", "also", "am", "an", "and", "any", "are", "as", "at", "be",
    "been", "but", "by", "can", "could", "did", "do", "does", "for", "from", "had", "has",
    "have", "he", "her", "his", "how", "i", "i'm", "if", "in", "into", "is", "it", "it's",
    "its", "just", "me", "more", "my", "no", "not", "of", "on", "one", "only", "or", "our",
    "product", "she", "so", "than", "that", "the", "their", "them", "then", "there", "these",
    "they", "this", "to", "too", "up", "us", "very", "was", "we", "were", "what", "when",
    "which", "who", "will", "with", "would", "you", "your",
];

/// Sentiment band of a predicted class, used to group texts for word clouds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Negative,
    Neutral,
    Positive,
}

impl Band {
    pub const ALL: [Band; 3] = [Band::Negative, Band::Neutral, Band::Positive];

    pub fn of(predicted: Stars) -> Self {
        match predicted.get() {
            0..=2 => Band::Negative,
            3 => Band::Neutral,
            _ => Band::Positive,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Band::Negative => "negative",
            Band::Neutral => "neutral",
            Band::Positive => "positive",
        }
    }
}

/// Review bodies grouped by predicted band, in scored order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TextGroups {
    pub negative: Vec<String>,
    pub neutral: Vec<String>,
    pub positive: Vec<String>,
}

impl TextGroups {
    pub fn get(&self, band: Band) -> &[String] {
        match band {
            Band::Negative => &self.negative,
            Band::Neutral => &self.neutral,
            Band::Positive => &self.positive,
        }
    }

    fn push(&mut self, band: Band, text: String) {
        match band {
            Band::Negative => self.negative.push(text),
            Band::Neutral => self.neutral.push(text),
            Band::Positive => self.positive.push(text),
        }
    }

    /// All texts of a band joined by spaces; `None` when the band is empty
    /// and its renderer should be skipped.
    pub fn joined(&self, band: Band) -> Option<String> {
        let texts = self.get(band);
        (!texts.is_empty()).then(|| texts.join(" "))
    }

    /// Most frequent non-stopword terms of a band, by count then term.
    pub fn top_terms(&self, band: Band, n: usize) -> Vec<(String, usize)> {
        let Some(text) = self.joined(band) else {
            return Vec::new();
        };
        let mut counts: HashMap<String, usize> = HashMap::new();
        for m in WORD_RE.find_iter(&text) {
            let word = m.as_str().trim_matches('\'').to_lowercase();
            if word.chars().count() < 2 || STOPWORDS.contains(&word.as_str()) {
                continue;
            }
            *counts.entry(word).or_default() += 1;
        }
        let mut terms: Vec<(String, usize)> = counts.into_iter().collect();
        terms.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        terms.truncate(n);
        terms
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationSummary {
    pub total: usize,
    pub matches: usize,
    pub accuracy_percent: f64,
    pub labels: [u8; 5],
    /// Rows are declared stars, columns predicted stars.
    pub confusion_matrix: [[u32; 5]; 5],
    pub declared_histogram: [u32; 5],
    pub predicted_histogram: [u32; 5],
    pub groups: TextGroups,
}

/// Agreement between declared and predicted stars. A pure function of the
/// scored sequence; an empty sequence yields 0% and an all-zero matrix.
pub fn evaluate(scored: &[ScoredReview]) -> EvaluationSummary {
    let mut confusion_matrix = [[0u32; 5]; 5];
    let mut declared_histogram = [0u32; 5];
    let mut predicted_histogram = [0u32; 5];
    let mut groups = TextGroups::default();
    let mut matches = 0;

    for s in scored {
        confusion_matrix[s.declared.index()][s.predicted.index()] += 1;
        declared_histogram[s.declared.index()] += 1;
        predicted_histogram[s.predicted.index()] += 1;
        if s.declared == s.predicted {
            matches += 1;
        }
        groups.push(Band::of(s.predicted), s.review.body.text().to_string());
    }

    EvaluationSummary {
        total: scored.len(),
        matches,
        accuracy_percent: accuracy_percent(matches, scored.len()),
        labels: Stars::ALL.map(Stars::get),
        confusion_matrix,
        declared_histogram,
        predicted_histogram,
        groups,
    }
}

fn accuracy_percent(matches: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let pct = 100.0 * matches as f64 / total as f64;
    (pct * 100.0).round() / 100.0
}
