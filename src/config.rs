use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use ::config::Config;
use serde::Deserialize;

use crate::classify::StarScheme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// Plain HTTP fetch of server-rendered HTML
    Http,
    /// spider.cloud, rendered in a remote browser
    Spider,
}

/// CSS selectors locating the listing fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub item_name: String,
    pub aggregate_rating: String,
    pub review_block: String,
    pub rating: String,
    pub title: String,
    pub body: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            item_name: "div.Vu3-9u.eCtPz5".into(),
            aggregate_rating: "div.ipqd2A".into(),
            review_block: "div.col.EPCmJX.Ma1fCG".into(),
            rating: "div.XQDdHH.Ga3i8K".into(),
            title: "p.z9E0IG".into(),
            body: "div.ZmyHeo > div > div".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub backend: Backend,
    pub settle_ms: u64,
    pub max_pages: u32,
    pub deadline_secs: u64,
    pub nav_timeout_secs: u64,
    pub page_param: String,
    pub scheme: StarScheme,
    pub lexicon_path: Option<PathBuf>,
    pub db_path: PathBuf,
    pub selectors: SelectorConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            backend: Backend::Http,
            settle_ms: 2000,
            max_pages: 200,
            deadline_secs: 600,
            nav_timeout_secs: 30,
            page_param: "page".into(),
            scheme: StarScheme::Legacy,
            lexicon_path: None,
            db_path: PathBuf::from("data/reviews.sqlite"),
            selectors: SelectorConfig::default(),
        }
    }
}

impl Settings {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }

    pub fn nav_timeout(&self) -> Duration {
        Duration::from_secs(self.nav_timeout_secs)
    }
}

/// Per-invocation overrides taken from the command line.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub backend: Option<Backend>,
    pub settle_ms: Option<u64>,
    pub max_pages: Option<u32>,
    pub scheme: Option<StarScheme>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(b) = self.backend {
            settings.backend = b;
        }
        if let Some(ms) = self.settle_ms {
            settings.settle_ms = ms;
        }
        if let Some(n) = self.max_pages {
            settings.max_pages = n;
        }
        if let Some(s) = self.scheme {
            settings.scheme = s;
        }
    }
}

/// Defaults, then the optional settings file, then `REVIEWS_*` variables.
/// Nested keys use a double underscore: `REVIEWS_SELECTORS__BODY`.
pub fn load(file: Option<&Path>) -> Result<Settings> {
    let mut builder = Config::builder();
    if let Some(path) = file {
        builder = builder.add_source(::config::File::from(path));
    }
    let settings = builder
        .add_source(
            ::config::Environment::with_prefix("REVIEWS")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("failed to read settings")?
        .try_deserialize::<Settings>()
        .context("invalid settings")?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sources_yield_defaults() {
        let settings = Config::builder()
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap();
        assert_eq!(settings.backend, Backend::Http);
        assert_eq!(settings.settle_ms, 2000);
        assert_eq!(settings.page_param, "page");
        assert_eq!(settings.selectors.body, "div.ZmyHeo > div > div");
    }

    #[test]
    fn partial_overrides_keep_other_defaults() {
        let settings = Config::builder()
            .set_override("max_pages", 3)
            .unwrap()
            .set_override("scheme", "five-band")
            .unwrap()
            .set_override("selectors.title", "h3.title")
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize::<Settings>()
            .unwrap();
        assert_eq!(settings.max_pages, 3);
        assert_eq!(settings.scheme, StarScheme::FiveBand);
        assert_eq!(settings.selectors.title, "h3.title");
        assert_eq!(settings.selectors.rating, "div.XQDdHH.Ga3i8K");
        assert_eq!(settings.deadline_secs, 600);
    }

    #[test]
    fn cli_overrides_win() {
        let mut settings = Settings::default();
        Overrides {
            max_pages: Some(1),
            settle_ms: Some(0),
            ..Default::default()
        }
        .apply(&mut settings);
        assert_eq!(settings.max_pages, 1);
        assert_eq!(settings.settle(), Duration::ZERO);
        assert_eq!(settings.backend, Backend::Http);
    }
}
