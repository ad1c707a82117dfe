use anyhow::Result;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use driftnet_common::Config;
use driftnet_crawler::fetch::{HackerNewsClient, RedditClient};
use driftnet_crawler::Crawler;
use driftnet_store::StoreWriter;

/// Focused topical crawler for threaded and flat-feed platforms.
#[derive(Parser, Debug)]
#[command(name = "driftnet", version, about)]
struct Args {
    /// Platform to crawl: "reddit" or "hn". Overrides the config file.
    #[arg(long)]
    platform: Option<String>,

    /// Stop after writing this many items. Overrides the config file.
    #[arg(long)]
    max_items: Option<u64>,

    /// Lookback horizon in hours. Overrides the config file.
    #[arg(long)]
    hours: Option<u32>,

    /// Path to the TOML config file.
    #[arg(long, default_value = "config.toml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("driftnet=info".parse()?))
        .init();

    let args = Args::parse();
    let mut config = Config::load(&args.config)?;
    if let Some(platform) = args.platform {
        config.run.platform = platform;
    }
    if let Some(max_items) = args.max_items {
        config.run.max_items = max_items;
    }
    if let Some(hours) = args.hours {
        config.run.hours = hours;
    }

    info!(
        platform = config.run.platform.as_str(),
        max_items = config.run.max_items,
        hours = config.run.hours,
        out_dir = config.run.out_dir.as_str(),
        "Driftnet starting"
    );

    let writer = StoreWriter::open(&config.run.out_dir)?;
    let crawler = Crawler::new(&config, writer);

    let stats = match config.run.platform.as_str() {
        "reddit" => {
            match RedditClient::login(
                &config.reddit.client_id,
                &config.reddit.client_secret,
                &config.reddit.user_agent,
                config.crawler.qps,
            )
            .await
            {
                Ok(client) => crawler.run_threaded(&client).await?,
                Err(e) => {
                    // Metrics still get their row even when the client never
                    // came up.
                    error!(error = %e, "Reddit client initialization failed");
                    let stats = crawler.abort_without_crawl()?;
                    info!("{stats}");
                    anyhow::bail!("reddit client initialization failed: {e}");
                }
            }
        }
        "hn" => {
            let client = HackerNewsClient::new(config.crawler.qps);
            crawler.run_feed(&client).await?
        }
        other => {
            anyhow::bail!("unknown platform {other:?}, expected \"reddit\" or \"hn\"");
        }
    };

    info!("{stats}");
    Ok(())
}
