mod classify;
mod config;
mod download;
mod feed;
mod matcher;
mod pipeline;
mod resolver;

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::feed::RedditFeed;
use crate::matcher::Reference;
use crate::pipeline::Pipeline;
use crate::resolver::ResolverRegistry;

// The run is strictly sequential; a single-threaded runtime is all it needs.
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_args();

    tracing::info!(
        "searching {} subreddit(s), top {} posts each",
        config.subreddits.len(),
        config.count,
    );

    let output_dir = PathBuf::from(config::OUTPUT_DIR);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;

    // Loaded once; shared read-only by every match call.
    let reference = Reference::load(&config.reference_path)?;
    let (width, height) = reference.dimensions();
    tracing::info!("reference image {} ({width}x{height})", config.reference_path);

    let client = reqwest::Client::builder()
        .user_agent(config::USER_AGENT)
        .build()
        .context("failed to build http client")?;

    let feed = RedditFeed::new(client.clone());
    let registry = ResolverRegistry::with_default_hosts(client.clone());

    let pipeline = Pipeline::new(feed, registry, client, reference, output_dir);
    pipeline.run(&config.subreddits, config.count).await;

    Ok(())
}
