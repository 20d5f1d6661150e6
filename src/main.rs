mod browser;
mod classify;
mod config;
mod db;
mod dom;
mod evaluate;
mod export;
mod extractor;
mod report;
mod review;
mod sentiment;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use crate::classify::{Classified, StarScheme};
use crate::config::{Backend, Overrides, Settings};
use crate::evaluate::EvaluationSummary;
use crate::extractor::{ExtractOptions, Extraction, StopReason};
use crate::review::ListingMetadata;
use crate::sentiment::SentimentAnalyzer;

#[derive(Parser)]
#[command(
    name = "review_sentiment",
    about = "Scrape product reviews and compare sentiment-predicted stars with declared ratings"
)]
struct Cli {
    /// Settings file (TOML, JSON or YAML); REVIEWS_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ScrapeArgs {
    /// Listing root address (without the page parameter)
    url: String,
    /// Stop after this many listing pages
    #[arg(short = 'n', long)]
    max_pages: Option<u32>,
    /// Wait after each navigation, in milliseconds
    #[arg(long)]
    settle_ms: Option<u64>,
    #[arg(long, value_enum)]
    backend: Option<Backend>,
}

#[derive(Subcommand)]
enum Commands {
    /// Scrape a listing, classify its reviews and report agreement
    Run {
        #[command(flatten)]
        scrape: ScrapeArgs,
        #[arg(long, value_enum)]
        scheme: Option<StarScheme>,
        /// Also export the raw review table to this CSV file
        #[arg(long)]
        csv: Option<PathBuf>,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
        /// Do not record the run in the history database
        #[arg(long)]
        no_save: bool,
    },
    /// Scrape a listing into a CSV file without classifying
    Scrape {
        #[command(flatten)]
        scrape: ScrapeArgs,
        #[arg(short, long)]
        out: PathBuf,
    },
    /// Classify reviews from a previously exported CSV file
    Analyze {
        csv: PathBuf,
        #[arg(long, value_enum)]
        scheme: Option<StarScheme>,
        #[arg(long)]
        json: bool,
    },
    /// Show recorded runs
    History {
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
}

#[derive(Serialize)]
struct JsonReport<'a> {
    metadata: &'a ListingMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pages_visited: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<StopReason>,
    dropped: usize,
    summary: &'a EvaluationSummary,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = config::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Run {
            scrape,
            scheme,
            csv,
            json,
            no_save,
        } => {
            overrides(&scrape, scheme).apply(&mut settings);
            let started_at = Utc::now();
            let extraction = scrape_listing(&settings, &scrape.url).await?;
            if let Some(path) = &csv {
                export::save_csv(path, &extraction.metadata, &extraction.reviews)?;
                println!("Wrote {} reviews to {}", extraction.reviews.len(), path.display());
            }

            let (classified, summary) = analyze(&settings, &extraction.reviews)?;
            if !no_save {
                let run = db::RunRecord {
                    url: scrape.url.clone(),
                    item_name: extraction.metadata.item_name.clone(),
                    aggregate_rating: extraction.metadata.aggregate_rating.clone(),
                    pages_visited: extraction.pages_visited,
                    stop_reason: extraction.stop.to_string(),
                    total_reviews: extraction.reviews.len(),
                    scored_reviews: summary.total,
                    accuracy: summary.accuracy_percent,
                    scheme: scheme_name(settings.scheme),
                    started_at,
                    finished_at: Utc::now(),
                };
                let conn = open_db(&settings.db_path)?;
                let id = db::save_run(&conn, &run, &extraction.reviews, &classified.scored)?;
                info!("Recorded run #{} in {}", id, settings.db_path.display());
            }

            if json {
                print_json(&JsonReport {
                    metadata: &extraction.metadata,
                    pages_visited: Some(extraction.pages_visited),
                    stop: Some(extraction.stop),
                    dropped: classified.dropped,
                    summary: &summary,
                })?;
            } else {
                println!(
                    "Scraped {} reviews from {} pages ({}).\n",
                    extraction.reviews.len(),
                    extraction.pages_visited,
                    extraction.stop
                );
                report::print_summary(&extraction.metadata, &summary, classified.dropped);
            }
            Ok(())
        }
        Commands::Scrape { scrape, out } => {
            overrides(&scrape, None).apply(&mut settings);
            let extraction = scrape_listing(&settings, &scrape.url).await?;
            export::save_csv(&out, &extraction.metadata, &extraction.reviews)?;
            println!(
                "Wrote {} reviews from {} pages to {} ({}).",
                extraction.reviews.len(),
                extraction.pages_visited,
                out.display(),
                extraction.stop
            );
            Ok(())
        }
        Commands::Analyze { csv, scheme, json } => {
            if let Some(s) = scheme {
                settings.scheme = s;
            }
            let (metadata, reviews) = export::load_csv(&csv)?;
            println!("Loaded {} reviews from {}", reviews.len(), csv.display());
            let (classified, summary) = analyze(&settings, &reviews)?;
            if json {
                print_json(&JsonReport {
                    metadata: &metadata,
                    pages_visited: None,
                    stop: None,
                    dropped: classified.dropped,
                    summary: &summary,
                })?;
            } else {
                report::print_summary(&metadata, &summary, classified.dropped);
            }
            Ok(())
        }
        Commands::History { limit } => {
            let conn = open_db(&settings.db_path)?;
            let rows = db::fetch_runs(&conn, limit)?;
            if rows.is_empty() {
                println!("No runs recorded yet.");
                return Ok(());
            }
            report::print_history(&rows);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("\nDone in {}", report::format_duration(elapsed));
    }

    result
}

fn overrides(args: &ScrapeArgs, scheme: Option<StarScheme>) -> Overrides {
    Overrides {
        backend: args.backend,
        settle_ms: args.settle_ms,
        max_pages: args.max_pages,
        scheme,
    }
}

async fn scrape_listing(settings: &Settings, url: &str) -> Result<Extraction> {
    let selectors = dom::Selectors::compile(&settings.selectors)?;
    let mut browser = browser::open(settings)?;
    let extraction = extractor::extract(
        browser.as_mut(),
        url,
        &selectors,
        &ExtractOptions::from(settings),
    )
    .await
    .with_context(|| format!("failed to scrape {}", url))?;
    Ok(extraction)
}

fn analyze(
    settings: &Settings,
    reviews: &[review::RawReview],
) -> Result<(Classified, EvaluationSummary)> {
    let analyzer = SentimentAnalyzer::load(settings.lexicon_path.as_deref())?;
    let classified = classify::classify(reviews, &analyzer, settings.scheme.policy());
    let summary = evaluate::evaluate(&classified.scored);
    Ok((classified, summary))
}

fn open_db(path: &Path) -> Result<rusqlite::Connection> {
    let conn = db::connect(path)?;
    db::init_schema(&conn)?;
    Ok(conn)
}

fn scheme_name(scheme: StarScheme) -> String {
    match scheme {
        StarScheme::Legacy => "legacy".into(),
        StarScheme::FiveBand => "five-band".into(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
