pub mod lexicon;

use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::info;

use lexicon::{booster, is_negation, Lexicon};

const CAPS_EMPHASIS: f64 = 0.733;
const NEGATION_SCALAR: f64 = -0.74;
const NORMALIZE_ALPHA: f64 = 15.0;

/// Polarity of one text under the VADER rules. `neg`, `neu` and `pos` are
/// proportions summing to ~1; `compound` is the normalised overall score in
/// [-1, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PolarityScores {
    pub neg: f64,
    pub neu: f64,
    pub pos: f64,
    pub compound: f64,
}

struct Token<'a> {
    raw: &'a str,
    lower: String,
}

impl Token<'_> {
    fn is_all_caps(&self) -> bool {
        self.raw.chars().any(char::is_alphabetic) && self.raw.to_uppercase() == self.raw
    }
}

#[derive(Debug, Clone)]
pub struct SentimentAnalyzer {
    lexicon: Lexicon,
}

impl SentimentAnalyzer {
    pub fn new(lexicon: Lexicon) -> Self {
        Self { lexicon }
    }

    /// Built-in lexicon unless `path` names a replacement file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let lexicon = match path {
            Some(p) => Lexicon::load(p)?,
            None => Lexicon::builtin(),
        };
        info!("Sentiment lexicon: {} entries", lexicon.len());
        Ok(Self::new(lexicon))
    }

    pub fn compound(&self, text: &str) -> f64 {
        self.polarity_scores(text).compound
    }

    pub fn polarity_scores(&self, text: &str) -> PolarityScores {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return PolarityScores::default();
        }

        let caps = tokens.iter().filter(|t| t.is_all_caps()).count();
        let cap_diff = caps > 0 && caps < tokens.len();

        let mut sentiments: Vec<f64> = tokens
            .iter()
            .enumerate()
            .map(|(i, tok)| self.valence_at(&tokens, i, tok, cap_diff))
            .collect();

        apply_but(&tokens, &mut sentiments);
        let amplifier = punctuation_emphasis(text);
        score(&sentiments, amplifier)
    }

    fn valence_at(&self, tokens: &[Token<'_>], i: usize, tok: &Token<'_>, cap_diff: bool) -> f64 {
        if booster(&tok.lower).is_some() {
            return 0.0;
        }
        let Some(mut valence) = self.lexicon.valence(&tok.lower) else {
            return 0.0;
        };

        if cap_diff && tok.is_all_caps() {
            valence += if valence > 0.0 { CAPS_EMPHASIS } else { -CAPS_EMPHASIS };
        }

        for back in 1..=3 {
            if i < back {
                break;
            }
            let prev = &tokens[i - back];
            if self.lexicon.contains(&prev.lower) {
                continue;
            }
            let mut shift = scalar_inc_dec(prev, valence, cap_diff);
            if back == 2 {
                shift *= 0.95;
            } else if back == 3 {
                shift *= 0.9;
            }
            valence += shift;
            if is_negation(&prev.lower) {
                valence *= NEGATION_SCALAR;
            }
        }
        valence
    }
}

fn tokenize(text: &str) -> Vec<Token<'_>> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .map(|raw| Token {
            raw,
            lower: raw.to_lowercase(),
        })
        .collect()
}

fn scalar_inc_dec(prev: &Token<'_>, valence: f64, cap_diff: bool) -> f64 {
    let Some(mut scalar) = booster(&prev.lower) else {
        return 0.0;
    };
    if valence < 0.0 {
        scalar = -scalar;
    }
    if cap_diff && prev.is_all_caps() {
        scalar += if valence > 0.0 { CAPS_EMPHASIS } else { -CAPS_EMPHASIS };
    }
    scalar
}

/// Contrastive "but": what precedes it counts half, what follows 1.5×.
fn apply_but(tokens: &[Token<'_>], sentiments: &mut [f64]) {
    let Some(pivot) = tokens.iter().position(|t| t.lower == "but") else {
        return;
    };
    for (i, s) in sentiments.iter_mut().enumerate() {
        if i < pivot {
            *s *= 0.5;
        } else if i > pivot {
            *s *= 1.5;
        }
    }
}

fn punctuation_emphasis(text: &str) -> f64 {
    let exclaims = text.matches('!').count().min(4) as f64 * 0.292;
    let questions = match text.matches('?').count() {
        0 | 1 => 0.0,
        n @ 2..=3 => n as f64 * 0.18,
        _ => 0.96,
    };
    exclaims + questions
}

fn normalize(score: f64) -> f64 {
    (score / (score * score + NORMALIZE_ALPHA).sqrt()).clamp(-1.0, 1.0)
}

fn round_to(x: f64, places: i32) -> f64 {
    let f = 10f64.powi(places);
    (x * f).round() / f
}

fn score(sentiments: &[f64], amplifier: f64) -> PolarityScores {
    let mut sum: f64 = sentiments.iter().sum();
    if sum > 0.0 {
        sum += amplifier;
    } else if sum < 0.0 {
        sum -= amplifier;
    }

    let mut pos = 0.0;
    let mut neg = 0.0;
    let mut neu = 0.0;
    for &s in sentiments {
        if s > 0.0 {
            pos += s + 1.0;
        } else if s < 0.0 {
            neg += s - 1.0;
        } else {
            neu += 1.0;
        }
    }
    if pos > neg.abs() {
        pos += amplifier;
    } else if pos < neg.abs() {
        neg -= amplifier;
    }

    let total = pos + neg.abs() + neu;
    if total == 0.0 {
        return PolarityScores::default();
    }
    PolarityScores {
        neg: round_to((neg / total).abs(), 3),
        neu: round_to(neu / total, 3),
        pos: round_to(pos / total, 3),
        compound: round_to(normalize(sum), 4),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyzer() -> SentimentAnalyzer {
        SentimentAnalyzer::new(Lexicon::builtin())
    }

    #[test]
    fn strong_positive_and_negative() {
        let a = analyzer();
        // (2.7 + 2.9) / sqrt(5.6² + 15)
        assert_eq!(a.compound("Excellent product, loved it"), 0.8225);
        // -(2.1 + 1.8) / sqrt(3.9² + 15)
        assert_eq!(a.compound("Terrible, broke immediately"), -0.7096);
    }

    #[test]
    fn matches_reference_vader_scores() {
        let a = analyzer();
        assert_eq!(a.compound("The book was good."), 0.4404);
        assert_eq!(a.compound("VADER is smart, handsome, and funny."), 0.8316);
        assert_eq!(a.compound("VADER is smart, handsome, and funny!"), 0.8439);
        assert_eq!(a.compound("Not bad at all"), 0.431);
        assert_eq!(a.compound("At least it isn't a horrible book."), 0.431);
        assert_eq!(a.compound("Today SUX!"), -0.5461);
    }

    #[test]
    fn neutral_and_empty_text() {
        let a = analyzer();
        let s = a.polarity_scores("The box arrived on Tuesday");
        assert_eq!(s.compound, 0.0);
        assert_eq!(s.neu, 1.0);
        assert_eq!(a.polarity_scores(""), PolarityScores::default());
        assert_eq!(a.polarity_scores("  ... "), PolarityScores::default());
    }

    #[test]
    fn negation_flips_polarity() {
        let a = analyzer();
        assert!(a.compound("good") > 0.0);
        assert!(a.compound("not good") < 0.0);
        assert!(a.compound("it doesn't work well") < 0.0);
    }

    #[test]
    fn boosters_and_dampeners() {
        let a = analyzer();
        let plain = a.compound("good");
        assert!(a.compound("very good") > plain);
        assert!(a.compound("slightly good") < plain);
        assert!(a.compound("very bad") < a.compound("bad"));
    }

    #[test]
    fn caps_and_exclamations_emphasise() {
        let a = analyzer();
        let plain = a.compound("the kettle is good");
        assert!(a.compound("the kettle is GOOD") > plain);
        assert!(a.compound("the kettle is good!!!") > plain);
        // all-caps text has no contrast, so no emphasis
        assert_eq!(a.compound("THE KETTLE IS GOOD"), plain);
    }

    #[test]
    fn but_shifts_weight_to_second_clause() {
        let a = analyzer();
        assert!(a.compound("The design is good but the battery is terrible") < 0.0);
        assert!(a.compound("The battery is terrible but the design is good") < 0.6);
    }

    #[test]
    fn proportions_sum_to_one() {
        let s = analyzer().polarity_scores("Great price, bad packaging, fast delivery");
        assert!((s.neg + s.neu + s.pos - 1.0).abs() < 0.01);
        assert!(s.pos > 0.0 && s.neg > 0.0);
    }

    #[test]
    fn compound_stays_in_range() {
        let a = analyzer();
        let gush = "amazing ".repeat(200);
        let rant = "worst ".repeat(200);
        assert!(a.compound(&gush) <= 1.0);
        assert!(a.compound(&rant) >= -1.0);
    }
}
