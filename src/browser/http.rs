use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE};
use tracing::debug;

use super::{Browser, PageError};

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Fetches server-rendered HTML. Listings that build their review blocks
/// client-side need the spider backend instead.
pub struct HttpBrowser {
    client: Option<reqwest::Client>,
    content: String,
}

impl HttpBrowser {
    pub fn new(nav_timeout: Duration) -> Result<Self, PageError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));

        let client = reqwest::Client::builder()
            .timeout(nav_timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| PageError::Client(e.to_string()))?;

        Ok(Self {
            client: Some(client),
            content: String::new(),
        })
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PageError::Client("session already closed".into()))?;

        let response = client.get(url).send().await.map_err(|source| PageError::Request {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(PageError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        self.content = response.text().await.map_err(|source| PageError::Request {
            url: url.to_string(),
            source,
        })?;
        debug!(url, bytes = self.content.len(), "page loaded");
        Ok(())
    }

    fn content(&self) -> &str {
        &self.content
    }

    async fn close(&mut self) {
        self.client = None;
        self.content.clear();
    }
}
