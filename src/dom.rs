use anyhow::{anyhow, Result};
use scraper::{ElementRef, Html, Selector};

use crate::config::SelectorConfig;
use crate::review::Field;

/// Compiled form of [`SelectorConfig`].
#[derive(Debug, Clone)]
pub struct Selectors {
    pub item_name: Selector,
    pub aggregate_rating: Selector,
    pub review_block: Selector,
    pub rating: Selector,
    pub title: Selector,
    pub body: Selector,
}

impl Selectors {
    pub fn compile(cfg: &SelectorConfig) -> Result<Self> {
        Ok(Self {
            item_name: parse(&cfg.item_name)?,
            aggregate_rating: parse(&cfg.aggregate_rating)?,
            review_block: parse(&cfg.review_block)?,
            rating: parse(&cfg.rating)?,
            title: parse(&cfg.title)?,
            body: parse(&cfg.body)?,
        })
    }
}

fn parse(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {:?}: {:?}", css, e))
}

/// Parsed view of one loaded page.
pub struct Snapshot {
    html: Html,
}

impl Snapshot {
    pub fn parse(content: &str) -> Self {
        Self {
            html: Html::parse_document(content),
        }
    }

    pub fn query_all(&self, pattern: &Selector) -> Vec<ElementRef<'_>> {
        self.html.select(pattern).collect()
    }

    /// Text of the first element on the page matching `locator`.
    pub fn read_first(&self, locator: &Selector) -> Field {
        match self.html.select(locator).next() {
            Some(el) => text_of(el),
            None => Field::Unavailable,
        }
    }
}

/// Text of the single descendant of `scope` matching `locator`. An
/// ambiguous locator (more than one match) reads as unavailable.
pub fn read_text(scope: ElementRef<'_>, locator: &Selector) -> Field {
    let mut matches = scope.select(locator);
    match (matches.next(), matches.next()) {
        (Some(el), None) => text_of(el),
        _ => Field::Unavailable,
    }
}

/// Whitespace-collapsed text content; empty text is unavailable.
fn text_of(el: ElementRef<'_>) -> Field {
    let text = el
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ");
    if text.is_empty() {
        Field::Unavailable
    } else {
        Field::Value(text)
    }
}
