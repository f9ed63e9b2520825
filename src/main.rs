//! youtube-fetcher command line
//!
//! Runs scrapes, thumbnail fetches and Data API lookups directly, or acts as
//! a job worker reading requests from stdin.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{info, warn};
use youtube_fetcher::api::YoutubeApiClient;
use youtube_fetcher::database::SqliteJobStore;
use youtube_fetcher::downloader::{DownloadConfig, ThumbnailPipeline};
use youtube_fetcher::extractor::{OutputFormat, SearchExtractor, YoutubeScraper};
use youtube_fetcher::jobs::{run_worker, JobHandler, JobParams, JobStore, MemoryJobStore};
use youtube_fetcher::utils::logging::init_logging;
use youtube_fetcher::utils::Settings;

#[derive(Parser)]
#[command(name = "youtube-fetcher", version, about = "Fetch YouTube search results, thumbnails and metadata")]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "LOG_LEVEL")]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape search results for a query
    Scrape {
        query: String,
        #[arg(long, default_value_t = 20)]
        max_results: usize,
        /// `standard` or `tubebuddy`
        #[arg(long, default_value = "standard")]
        format: OutputFormat,
    },
    /// Download thumbnails for a query's results
    Thumbnails {
        query: String,
        #[arg(long, default_value_t = 20)]
        max_thumbnails: usize,
    },
    /// Full descriptions for video ids
    Videos {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Subscriber counts for channel ids
    Channels {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Process job requests read as JSON lines from stdin
    Worker,
    /// Print a job record
    Status { job_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let settings = Settings::from_env().context("Invalid configuration")?;

    let level = args.log_level.as_deref().unwrap_or(&settings.log_level);
    init_logging(level)?;

    match args.command {
        Command::Scrape {
            query,
            max_results,
            format,
        } => {
            check_params(&JobParams::Scrape {
                query: query.clone(),
                max_results,
                format,
            })?;
            let scraper = YoutubeScraper::new(&settings.scraper)?;
            let result = scraper
                .scrape(&query, max_results, format)
                .await
                .with_context(|| format!("YouTube scrape failed for query: {}", query))?;
            print_json(&result)?;
        }
        Command::Thumbnails {
            query,
            max_thumbnails,
        } => {
            check_params(&JobParams::Thumbnail {
                query: query.clone(),
                max_thumbnails,
            })?;
            let pipeline = thumbnail_pipeline(&settings)?;
            let batch = pipeline
                .fetch(&query, max_thumbnails)
                .await
                .with_context(|| format!("Thumbnail fetch failed for query: {}", query))?;
            print_json(&batch)?;
        }
        Command::Videos { ids } => {
            let client = YoutubeApiClient::new(&settings.api)?;
            print_json(&client.get_video_descriptions(&ids).await?)?;
        }
        Command::Channels { ids } => {
            let client = YoutubeApiClient::new(&settings.api)?;
            print_json(&client.get_channel_subscribers(&ids).await?)?;
        }
        Command::Worker => {
            let store = job_store(&settings).await?;
            let scraper: Arc<dyn SearchExtractor> = Arc::new(YoutubeScraper::new(&settings.scraper)?);
            let pipeline = Arc::new(ThumbnailPipeline::new(
                Arc::clone(&scraper),
                DownloadConfig::from(&settings.download),
            )?);
            let handler = JobHandler::new(store, scraper, pipeline, settings.jobs.deadline);

            info!("Worker waiting for job requests on stdin");
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            let stats = run_worker(&handler, stdin).await?;
            println!(
                "completed={} failed={} skipped={}",
                stats.completed, stats.failed, stats.skipped
            );
        }
        Command::Status { job_id } => {
            let url = status_database_url(&settings)?;
            let store = SqliteJobStore::connect(url, &settings.jobs).await?;
            match store.get_status(&job_id).await? {
                Some(record) => print_json(&record.view())?,
                None => anyhow::bail!("Job not found: {}", job_id),
            }
        }
    }

    Ok(())
}

/// Apply the same bounds a queued job would get
fn check_params(params: &JobParams) -> Result<()> {
    params.validate().map_err(anyhow::Error::msg)
}

/// Records from another process are only visible through the database
fn status_database_url(settings: &Settings) -> Result<&str> {
    settings
        .jobs
        .database_url
        .as_deref()
        .context("status requires JOB_DATABASE_URL")
}

fn thumbnail_pipeline(settings: &Settings) -> Result<ThumbnailPipeline> {
    let scraper: Arc<dyn SearchExtractor> = Arc::new(YoutubeScraper::new(&settings.scraper)?);
    Ok(ThumbnailPipeline::new(
        scraper,
        DownloadConfig::from(&settings.download),
    )?)
}

async fn job_store(settings: &Settings) -> Result<Arc<dyn JobStore>> {
    match &settings.jobs.database_url {
        Some(url) => {
            let store = SqliteJobStore::connect(url, &settings.jobs).await?;
            let purged = store.purge_expired().await?;
            info!(purged, "Job database ready");
            Ok(Arc::new(store))
        }
        None => {
            warn!("JOB_DATABASE_URL not set; job records live only in this process");
            Ok(Arc::new(MemoryJobStore::from_settings(&settings.jobs)))
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
