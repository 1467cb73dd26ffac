use chrono::{DateTime, FixedOffset};
use clap::Parser;
use dotenv::dotenv;
use log::{LevelFilter, error, info};
use ryoshoku::{
    Clock, DocumentLocator, FixedClock, JsonFileStore, LineNotifier, MenuPipeline,
    NotificationRequest, Notify, PdfTableParser, RunMode, SystemClock, WeekCache,
    config::{LineEnv, LoadFromEnv, MenuConfig},
    requests::RequestClient,
    start_of_week,
};

/// Sends today's dormitory menu to LINE.
#[derive(Parser)]
#[command(name = "ryoshoku")]
struct Cli {
    /// Send all three meals regardless of the time of day.
    #[arg(long)]
    force: bool,

    /// Pretend it is this moment (RFC 3339, e.g. 2025-05-19T07:00:00+09:00).
    #[arg(long, value_parser = DateTime::parse_from_rfc3339)]
    at: Option<DateTime<FixedOffset>>,

    /// Read the menu from this PDF instead of guessing the URL.
    #[arg(long)]
    url: Option<String>,

    /// Print the message instead of sending it.
    #[arg(long)]
    dry_run: bool,

    /// Neither read nor update the weekly URL cache.
    #[arg(long)]
    no_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();
    let config = MenuConfig::new()?;

    let now = match cli.at {
        Some(at) => FixedClock(at).now(),
        None => SystemClock::new(config.offset).now(),
    };
    let week_start = start_of_week(now.date_naive());

    let cache = if cli.no_cache {
        WeekCache::disabled()
    } else {
        WeekCache::new(Some(JsonFileStore::new(config.cache_path.clone())))
    };
    let cached_url = cache.lookup(week_start);

    let request_client = RequestClient::new(config.fetch_timeout)?;
    let http = request_client.client().clone();
    let pipeline = MenuPipeline {
        locator: DocumentLocator::new(request_client, config.builder.clone()),
        parser: PdfTableParser::new(),
        strategy: config.strategy.clone(),
        rows: config.meal_rows,
        windows: config.windows,
    };

    let outcome = pipeline
        .produce_notification(NotificationRequest {
            now,
            cached_url: cached_url.as_deref(),
            force_url: cli.url.as_deref(),
            mode: if cli.force { RunMode::Forced } else { RunMode::Scheduled },
        })
        .await;

    if let Some(url) = &outcome.url_to_cache {
        cache.remember(week_start, url, now);
    }

    let Some(message) = outcome.message else {
        info!("nothing to send at {now}");
        return Ok(());
    };

    if cli.dry_run {
        println!("{message}");
        return Ok(());
    }

    let line_env = LineEnv::load_from_env()?;
    let delivery = line_env.delivery();
    let notifier = LineNotifier::new(http, line_env.line_channel_access_token, delivery);
    // Logged, never retried.
    if let Err(e) = notifier.notify(&message).await {
        error!("{e}");
    }

    Ok(())
}
