use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use anyhow::{bail, Context, Result};

const BUILTIN: &str = include_str!("lexicon.txt");

static BUILTIN_LEXICON: LazyLock<Lexicon> = LazyLock::new(|| Lexicon::parse(BUILTIN).unwrap());

pub const B_INCR: f64 = 0.293;
pub const B_DECR: f64 = -0.293;

const BOOSTERS_UP: &[&str] = &[
    "absolutely", "amazingly", "awfully", "completely", "considerably", "decidedly", "deeply",
    "effing", "enormously", "entirely", "especially", "exceptionally", "extremely", "fabulously",
    "flipping", "freaking", "fully", "greatly", "highly", "hugely", "incredibly", "intensely",
    "majorly", "more", "most", "particularly", "purely", "quite", "really", "remarkably", "so",
    "substantially", "thoroughly", "totally", "tremendously", "uber", "unbelievably",
    "unusually", "utterly", "very",
];

const BOOSTERS_DOWN: &[&str] = &[
    "almost", "barely", "hardly", "less", "little", "marginally", "occasionally", "partly",
    "scarcely", "slightly", "somewhat",
];

const NEGATIONS: &[&str] = &[
    "aint", "arent", "cannot", "cant", "couldnt", "darent", "didnt", "doesnt", "dont", "hadnt",
    "hasnt", "havent", "isnt", "mightnt", "mustnt", "neither", "neednt", "never", "none",
    "nope", "nor", "not", "nothing", "nowhere", "oughtnt", "shant", "shouldnt", "wasnt",
    "werent", "without", "wont", "wouldnt", "rarely", "seldom", "despite",
];

/// Word → mean valence, in the VADER `vader_lexicon.txt` layout
/// (`token<TAB>mean[<TAB>stddev<TAB>ratings]`).
///
/// The built-in table is a review-oriented subset of VADER's lexicon with
/// VADER's mean valences. Point `lexicon_path` at the full
/// `vader_lexicon.txt` for complete coverage.
#[derive(Debug, Clone)]
pub struct Lexicon {
    valences: HashMap<String, f64>,
}

impl Lexicon {
    pub fn builtin() -> Self {
        BUILTIN_LEXICON.clone()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read lexicon {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("bad lexicon {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut valences = HashMap::new();
        for (n, line) in text.lines().enumerate() {
            let line = line.trim_end();
            if line.is_empty() {
                continue;
            }
            let mut cols = line.split('\t');
            let word = cols.next().unwrap_or_default();
            let Some(value) = cols.next() else {
                bail!("line {}: expected <word><TAB><valence>", n + 1);
            };
            let valence: f64 = value
                .trim()
                .parse()
                .with_context(|| format!("line {}: bad valence {:?}", n + 1, value))?;
            valences.insert(word.to_lowercase(), valence);
        }
        if valences.is_empty() {
            bail!("lexicon is empty");
        }
        Ok(Self { valences })
    }

    pub fn valence(&self, word: &str) -> Option<f64> {
        self.valences.get(word).copied()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.valences.contains_key(word)
    }

    pub fn len(&self) -> usize {
        self.valences.len()
    }
}

/// Intensity shift contributed by a booster or dampener word.
pub fn booster(word: &str) -> Option<f64> {
    if BOOSTERS_UP.contains(&word) {
        Some(B_INCR)
    } else if BOOSTERS_DOWN.contains(&word) {
        Some(B_DECR)
    } else {
        None
    }
}

pub fn is_negation(word: &str) -> bool {
    let bare: String = word.chars().filter(|c| *c != '\'').collect();
    NEGATIONS.contains(&bare.as_str()) || word.ends_with("n't")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_parses() {
        let lex = Lexicon::parse(BUILTIN).unwrap();
        assert!(lex.len() > 150);
        assert_eq!(lex.valence("excellent"), Some(2.7));
        assert_eq!(lex.valence("terrible"), Some(-2.1));
        assert_eq!(lex.valence("good"), Some(1.9));
    }

    #[test]
    fn parses_vader_layout() {
        let lex = Lexicon::parse("Good\t1.9\t0.9\t[2, 2, 1]\nmeh\t-0.3\n").unwrap();
        assert_eq!(lex.valence("good"), Some(1.9));
        assert_eq!(lex.valence("meh"), Some(-0.3));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert!(Lexicon::parse("good 1.9").is_err());
        assert!(Lexicon::parse("good\tvery").is_err());
        assert!(Lexicon::parse("\n\n").is_err());
    }

    #[test]
    fn negations_and_boosters() {
        assert!(is_negation("not"));
        assert!(is_negation("don't"));
        assert!(is_negation("wouldn't"));
        assert!(!is_negation("note"));
        assert_eq!(booster("very"), Some(B_INCR));
        assert_eq!(booster("slightly"), Some(B_DECR));
        assert_eq!(booster("product"), None);
    }
}
