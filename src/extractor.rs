use std::fmt;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::browser::{Browser, PageError};
use crate::config::Settings;
use crate::dom::{self, Selectors, Snapshot};
use crate::review::{ListingMetadata, RawReview, UNKNOWN_ITEM, UNKNOWN_RATING};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to load listing root: {0}")]
    RootLoad(#[source] PageError),
}

#[derive(Debug, Clone)]
pub struct ExtractOptions {
    pub settle: Duration,
    pub max_pages: u32,
    pub deadline: Duration,
    pub page_param: String,
}

impl From<&Settings> for ExtractOptions {
    fn from(s: &Settings) -> Self {
        Self {
            settle: s.settle(),
            max_pages: s.max_pages,
            deadline: s.deadline(),
            page_param: s.page_param.clone(),
        }
    }
}

/// Why pagination ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "page")]
pub enum StopReason {
    /// The page had no review blocks: normal end of data.
    EmptyPage(u32),
    /// The page failed to load; treated as end of data, never retried.
    PageLoadFailed(u32),
    MaxPages,
    Deadline,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::EmptyPage(n) => write!(f, "empty page {}", n),
            StopReason::PageLoadFailed(n) => write!(f, "page {} failed to load", n),
            StopReason::MaxPages => write!(f, "page limit reached"),
            StopReason::Deadline => write!(f, "deadline reached"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub metadata: ListingMetadata,
    pub reviews: Vec<RawReview>,
    pub pages_visited: u32,
    pub stop: StopReason,
}

/// Walk the listing's pages in order until one comes back without review
/// blocks. The session is closed on every return path.
pub async fn extract<B: Browser + ?Sized>(
    browser: &mut B,
    root: &str,
    selectors: &Selectors,
    opts: &ExtractOptions,
) -> Result<Extraction, ExtractError> {
    let result = run(browser, root, selectors, opts).await;
    browser.close().await;
    result
}

async fn run<B: Browser + ?Sized>(
    browser: &mut B,
    root: &str,
    selectors: &Selectors,
    opts: &ExtractOptions,
) -> Result<Extraction, ExtractError> {
    let started = Instant::now();
    let root_url = Url::parse(root).map_err(|source| {
        ExtractError::RootLoad(PageError::InvalidUrl {
            url: root.to_string(),
            source,
        })
    })?;

    info!("Loading listing root: {}", root_url);
    match tokio::time::timeout(opts.deadline, browser.navigate(root_url.as_str())).await {
        Err(_) => {
            return Err(ExtractError::RootLoad(PageError::Timeout {
                url: root_url.to_string(),
                after: opts.deadline,
            }))
        }
        Ok(result) => result.map_err(ExtractError::RootLoad)?,
    }
    let metadata = read_metadata(browser.content(), selectors);
    info!(item = %metadata.item_name, rating = %metadata.aggregate_rating, "listing metadata");

    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );

    let mut reviews = Vec::new();
    let mut pages_visited = 0;
    let mut page = 1u32;

    let stop = loop {
        if page > opts.max_pages {
            warn!("Stopping at page limit ({} pages)", opts.max_pages);
            break StopReason::MaxPages;
        }
        let elapsed = started.elapsed();
        if elapsed >= opts.deadline {
            warn!("Stopping: deadline of {:?} reached before page {}", opts.deadline, page);
            break StopReason::Deadline;
        }
        let remaining = opts.deadline - elapsed;

        let url = page_url(&root_url, &opts.page_param, page);
        debug!("Navigating to page {}: {}", page, url);
        match tokio::time::timeout(remaining, browser.navigate(url.as_str())).await {
            Err(_) => {
                warn!("Stopping: deadline reached while loading page {}", page);
                break StopReason::Deadline;
            }
            Ok(Err(e)) => {
                warn!("Page {} failed to load, treating as end of listing: {}", page, e);
                break StopReason::PageLoadFailed(page);
            }
            Ok(Ok(())) => {}
        }
        let remaining = opts.deadline.saturating_sub(started.elapsed());
        browser.wait_settled(opts.settle.min(remaining)).await;
        pages_visited += 1;

        let found = read_reviews(browser.content(), selectors);
        debug!("Page {}: {} review blocks", page, found.len());
        if found.is_empty() {
            break StopReason::EmptyPage(page);
        }
        reviews.extend(found);

        pb.set_message(format!("page {} · {} reviews", page, reviews.len()));
        pb.tick();
        page += 1;
    };

    pb.finish_and_clear();
    info!(
        "Extracted {} reviews from {} pages ({})",
        reviews.len(),
        pages_visited,
        stop
    );

    Ok(Extraction {
        metadata,
        reviews,
        pages_visited,
        stop,
    })
}

/// Root address with the page parameter set to `page`, replacing any
/// occurrence already present.
pub fn page_url(root: &Url, param: &str, page: u32) -> Url {
    let kept: Vec<(String, String)> = root
        .query_pairs()
        .filter(|(k, _)| k != param)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut url = root.clone();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(&kept)
        .append_pair(param, &page.to_string());
    url
}

fn read_metadata(content: &str, selectors: &Selectors) -> ListingMetadata {
    let snapshot = Snapshot::parse(content);
    ListingMetadata {
        item_name: snapshot.read_first(&selectors.item_name).into_string_or(UNKNOWN_ITEM),
        aggregate_rating: snapshot
            .read_first(&selectors.aggregate_rating)
            .into_string_or(UNKNOWN_RATING),
    }
}

fn read_reviews(content: &str, selectors: &Selectors) -> Vec<RawReview> {
    let snapshot = Snapshot::parse(content);
    snapshot
        .query_all(&selectors.review_block)
        .into_iter()
        .enumerate()
        .map(|(i, block)| {
            let review = RawReview {
                declared_rating: dom::read_text(block, &selectors.rating),
                title: dom::read_text(block, &selectors.title),
                body: dom::read_text(block, &selectors.body),
            };
            if !(review.declared_rating.is_available()
                && review.title.is_available()
                && review.body.is_available())
            {
                debug!("Block {} has unreadable fields: {:?}", i, review);
            }
            review
        })
        .collect()
}
