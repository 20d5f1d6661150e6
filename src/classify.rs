use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::review::{RawReview, ScoredReview, Stars};
use crate::sentiment::SentimentAnalyzer;

/// Maps a compound sentiment score to a predicted star class.
pub type StarPolicy = fn(f64) -> Stars;

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "kebab-case")]
pub enum StarScheme {
    /// Observed mapping: 1 / 2 / 4 / 5, the 3-star band is empty
    #[default]
    Legacy,
    /// Evenly spaced bands at -0.6 / -0.2 / 0.2 / 0.6
    FiveBand,
}

impl StarScheme {
    pub fn policy(self) -> StarPolicy {
        match self {
            StarScheme::Legacy => legacy_stars,
            StarScheme::FiveBand => five_band_stars,
        }
    }
}

/// The mapping the listing pipeline has always produced. Its 3-star band
/// sits between two identical 0.2 cut points, so 3 is never predicted.
pub fn legacy_stars(compound: f64) -> Stars {
    if compound <= -0.6 {
        Stars::ONE
    } else if compound <= 0.2 {
        Stars::TWO
    } else if compound <= 0.6 {
        Stars::FOUR
    } else {
        Stars::FIVE
    }
}

pub fn five_band_stars(compound: f64) -> Stars {
    if compound <= -0.6 {
        Stars::ONE
    } else if compound <= -0.2 {
        Stars::TWO
    } else if compound <= 0.2 {
        Stars::THREE
    } else if compound <= 0.6 {
        Stars::FOUR
    } else {
        Stars::FIVE
    }
}

#[derive(Debug, Clone)]
pub struct Classified {
    pub scored: Vec<ScoredReview>,
    /// Records whose declared rating was not an integer in 1..=5.
    pub dropped: usize,
}

/// Score every review body, predict its stars, and keep only records with a
/// usable declared rating. Input order is preserved.
pub fn classify(
    reviews: &[RawReview],
    analyzer: &SentimentAnalyzer,
    policy: StarPolicy,
) -> Classified {
    let scored: Vec<ScoredReview> = reviews
        .par_iter()
        .enumerate()
        .filter_map(|(position, review)| {
            let declared = Stars::parse_declared(review.declared_rating.text())?;
            let sentiment = analyzer.compound(review.body.text());
            Some(ScoredReview {
                position,
                review: review.clone(),
                sentiment,
                declared,
                predicted: policy(sentiment),
            })
        })
        .collect();

    let dropped = reviews.len() - scored.len();
    if dropped > 0 {
        info!("Dropped {} of {} reviews with no usable rating", dropped, reviews.len());
    }
    Classified { scored, dropped }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::review::Field;

    fn raw(declared: &str, body: &str) -> RawReview {
        RawReview {
            declared_rating: Field::Value(declared.into()),
            title: Field::Value("t".into()),
            body: Field::Value(body.into()),
        }
    }

    fn grid() -> impl Iterator<Item = f64> {
        (-1000..=1000).map(|i| i as f64 / 1000.0)
    }

    #[test]
    fn legacy_bands() {
        assert_eq!(legacy_stars(-1.0).get(), 1);
        assert_eq!(legacy_stars(-0.6).get(), 1);
        assert_eq!(legacy_stars(-0.5999).get(), 2);
        assert_eq!(legacy_stars(0.0).get(), 2);
        assert_eq!(legacy_stars(0.2).get(), 2);
        assert_eq!(legacy_stars(0.2001).get(), 4);
        assert_eq!(legacy_stars(0.6).get(), 4);
        assert_eq!(legacy_stars(0.6001).get(), 5);
        assert_eq!(legacy_stars(1.0).get(), 5);
    }

    #[test]
    fn legacy_never_predicts_three() {
        assert!(grid().all(|s| legacy_stars(s).get() != 3));
        assert!(grid().filter(|s| *s <= -0.6).all(|s| legacy_stars(s).get() == 1));
        assert!(grid().filter(|s| *s > 0.6).all(|s| legacy_stars(s).get() == 5));
    }

    #[test]
    fn five_band_reaches_every_class() {
        let mut seen: Vec<u8> = grid().map(|s| five_band_stars(s).get()).collect();
        seen.dedup();
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
        assert_eq!(five_band_stars(-0.2).get(), 2);
        assert_eq!(five_band_stars(0.2).get(), 3);
    }

    #[test]
    fn scheme_selects_policy() {
        assert_eq!(StarScheme::Legacy.policy()(0.0).get(), 2);
        assert_eq!(StarScheme::FiveBand.policy()(0.0).get(), 3);
    }

    #[test]
    fn drops_unusable_declared_ratings() {
        let reviews = vec![
            raw("5", "Excellent product, loved it"),
            raw("abc", "fine"),
            raw("0", "good"),
            raw("6", "good"),
            RawReview {
                declared_rating: Field::Unavailable,
                ..raw("x", "good")
            },
            raw("1", "Terrible, broke immediately"),
        ];
        let out = classify(&reviews, &SentimentAnalyzer::load(None).unwrap(), legacy_stars);

        assert_eq!(out.dropped, 4);
        let kept: Vec<(usize, u8, u8)> = out
            .scored
            .iter()
            .map(|s| (s.position, s.declared.get(), s.predicted.get()))
            .collect();
        assert_eq!(kept, vec![(0, 5, 5), (5, 1, 1)]);
    }

    #[test]
    fn unavailable_body_scores_as_neutral_sentinel() {
        let reviews = vec![RawReview {
            body: Field::Unavailable,
            ..raw("3", "")
        }];
        let out = classify(&reviews, &SentimentAnalyzer::load(None).unwrap(), legacy_stars);
        assert_eq!(out.scored[0].sentiment, 0.0);
        assert_eq!(out.scored[0].predicted.get(), 2);
    }
}
