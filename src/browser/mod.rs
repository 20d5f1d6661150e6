pub mod http;
pub mod spider;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::config::{Backend, Settings};

#[derive(Debug, Error)]
pub enum PageError {
    #[error("failed to create page client: {0}")]
    Client(String),
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("remote render of {url} failed: {message}")]
    Remote { url: String, message: String },
    #[error("no content returned for {0}")]
    Empty(String),
    #[error("invalid page address {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("loading {url} timed out after {after:?}")]
    Timeout { url: String, after: Duration },
}

/// Page-automation capability the extractor drives.
///
/// One session is exclusively owned for a whole extraction run. `navigate`
/// replaces the current content; `close` releases the client and must be
/// safe to call once the session is in any state.
#[async_trait]
pub trait Browser: Send {
    async fn navigate(&mut self, url: &str) -> Result<(), PageError>;

    /// Give client-side rendering time to finish before the content is read.
    async fn wait_settled(&mut self, settle: Duration) {
        if !settle.is_zero() {
            tokio::time::sleep(settle).await;
        }
    }

    /// HTML of the most recently loaded page.
    fn content(&self) -> &str;

    async fn close(&mut self);
}

pub fn open(settings: &Settings) -> Result<Box<dyn Browser>> {
    let browser: Box<dyn Browser> = match settings.backend {
        Backend::Http => Box::new(http::HttpBrowser::new(settings.nav_timeout())?),
        Backend::Spider => Box::new(spider::SpiderBrowser::from_env(settings.nav_timeout())?),
    };
    Ok(browser)
}
