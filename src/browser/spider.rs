use std::time::Duration;

use async_trait::async_trait;
use spider_client::shapes::request::{ReturnFormat, ReturnFormatHandling};
use spider_client::{RequestParams, Spider};
use tracing::debug;

use super::{Browser, PageError};

/// Renders pages in spider.cloud's headless browser and keeps the raw HTML.
pub struct SpiderBrowser {
    spider: Option<Spider>,
    timeout: Duration,
    content: String,
}

impl SpiderBrowser {
    pub fn from_env(timeout: Duration) -> Result<Self, PageError> {
        let api_key = std::env::var("SPIDER_API_KEY")
            .map_err(|_| PageError::Client("SPIDER_API_KEY environment variable must be set".into()))?;
        let spider = Spider::new(Some(api_key))
            .map_err(|e| PageError::Client(format!("failed to create Spider client: {}", e)))?;
        Ok(Self {
            spider: Some(spider),
            timeout,
            content: String::new(),
        })
    }
}

#[async_trait]
impl Browser for SpiderBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        let spider = self
            .spider
            .as_ref()
            .ok_or_else(|| PageError::Client("session already closed".into()))?;

        let params = RequestParams {
            return_format: Some(ReturnFormatHandling::Single(ReturnFormat::Raw)),
            ..Default::default()
        };

        let response = tokio::time::timeout(
            self.timeout,
            spider.scrape_url(url, Some(params), "application/json"),
        )
        .await
        .map_err(|_| PageError::Timeout {
            url: url.to_string(),
            after: self.timeout,
        })?
        .map_err(|e| PageError::Remote {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        let (content, status) = parse_response(response);
        if let Some(status) = status {
            if !(200..300).contains(&status) {
                return Err(PageError::Status {
                    url: url.to_string(),
                    status,
                });
            }
        }

        self.content = content.ok_or_else(|| PageError::Empty(url.to_string()))?;
        debug!(url, bytes = self.content.len(), "page rendered");
        Ok(())
    }

    fn content(&self) -> &str {
        &self.content
    }

    async fn close(&mut self) {
        self.spider = None;
        self.content.clear();
    }
}

/// Pull `(content, status)` out of the first result of a scrape response.
fn parse_response(value: serde_json::Value) -> (Option<String>, Option<u16>) {
    let parsed: serde_json::Value = match value.as_str() {
        Some(s) => serde_json::from_str(s).unwrap_or(value.clone()),
        None => value,
    };

    let first = parsed.as_array().and_then(|arr| arr.first());

    let content = first
        .and_then(|obj| obj.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string);

    let status = first
        .and_then(|obj| obj.get("status"))
        .and_then(|s| s.as_u64())
        .and_then(|s| u16::try_from(s).ok());

    (content, status)
}
