//! Photo Frame Daemon
//!
//! Two independent services for a fixed-resolution photo frame:
//! `sync` mirrors the frame's image list into a local directory, `proxy`
//! serves letterboxed, captioned frames built from a photo server album.

mod cache;
mod compose;
mod config;
mod photos;
mod proxy;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use cache::{CacheStore, Synchronizer};
use compose::{CaptionRenderer, CaptionStyle, DEFAULT_JPEG_QUALITY};
use config::{
    ClientConfig, ProxyConfig, SyncConfig, DEFAULT_HEIGHT, DEFAULT_REQUEST_TIMEOUT, DEFAULT_WIDTH,
};
use photos::{FrameSource, PhotoClient};
use proxy::{ProxyServer, ProxyState};

#[derive(Parser)]
#[command(name = "photoframe-daemon")]
#[command(version)]
#[command(about = "Mirror a photo collection locally and serve captioned frames")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Keep a local directory in step with the remote image list
    Sync(SyncArgs),
    /// Serve letterboxed, captioned images from a photo server album
    Proxy(ProxyArgs),
}

/// Connection options shared by both services
#[derive(Args)]
struct ClientArgs {
    /// Base URL of the upstream API
    #[arg(long, env = "PHOTOFRAME_API_URL")]
    api_url: String,

    /// API key sent as `x-api-key`
    #[arg(long, env = "PHOTOFRAME_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Per-request timeout (e.g. "30s")
    #[arg(long, env = "PHOTOFRAME_REQUEST_TIMEOUT", value_parser = humantime::parse_duration)]
    request_timeout: Option<Duration>,
}

impl ClientArgs {
    fn client_config(&self) -> ClientConfig {
        ClientConfig::new(
            &self.api_url,
            self.api_key.clone(),
            self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        )
    }
}

#[derive(Args)]
struct SyncArgs {
    #[command(flatten)]
    client: ClientArgs,

    /// Directory holding cached `{id}.jpg` files
    #[arg(long, env = "PHOTOFRAME_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    /// Width requested for stored images
    #[arg(long, env = "PHOTOFRAME_IMAGE_WIDTH", default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Height requested for stored images
    #[arg(long, env = "PHOTOFRAME_IMAGE_HEIGHT", default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Pause between synchronization passes (e.g. "60s", "5m")
    #[arg(long, env = "PHOTOFRAME_REFRESH_INTERVAL", default_value = "60s", value_parser = humantime::parse_duration)]
    interval: Duration,

    /// Path of the image list endpoint
    #[arg(long, env = "PHOTOFRAME_LIST_PATH", default_value = "/images")]
    list_path: String,
}

#[derive(Args)]
struct ProxyArgs {
    #[command(flatten)]
    client: ClientArgs,

    /// Album whose images are served
    #[arg(long, env = "PHOTOFRAME_ALBUM_ID")]
    album_id: String,

    /// Address to listen on
    #[arg(long, env = "PHOTOFRAME_LISTEN", default_value = "127.0.0.1:5000")]
    listen: SocketAddr,

    /// Width used when a request does not give one
    #[arg(long, env = "PHOTOFRAME_DEFAULT_WIDTH", default_value_t = DEFAULT_WIDTH)]
    default_width: u32,

    /// Height used when a request does not give one
    #[arg(long, env = "PHOTOFRAME_DEFAULT_HEIGHT", default_value_t = DEFAULT_HEIGHT)]
    default_height: u32,

    /// Caption font family list
    #[arg(long, env = "PHOTOFRAME_FONT_FAMILY", default_value = "Ubuntu, sans-serif")]
    font_family: String,

    /// Extra directory to load caption fonts from
    #[arg(long, env = "PHOTOFRAME_FONT_DIR")]
    font_dir: Option<PathBuf>,

    /// JPEG quality of served frames (1-100)
    #[arg(long, env = "PHOTOFRAME_JPEG_QUALITY", default_value_t = DEFAULT_JPEG_QUALITY,
          value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Sync(args) => run_sync(args).await,
        Command::Proxy(args) => run_proxy(args).await,
    }
}

async fn run_sync(args: SyncArgs) -> Result<()> {
    let config = SyncConfig {
        cache_dir: args.cache_dir.unwrap_or_else(SyncConfig::default_cache_dir),
        image_width: args.width,
        image_height: args.height,
        refresh_interval: args.interval,
        list_path: args.list_path,
    };

    let source = FrameSource::new(args.client.client_config(), &config.list_path)
        .context("Failed to create API client")?;
    let store = CacheStore::open(&config.cache_dir).context("Failed to open cache directory")?;

    let synchronizer = Synchronizer::new(
        Arc::new(source),
        store,
        config.image_width,
        config.image_height,
        config.refresh_interval,
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sync_handle = tokio::spawn(async move { synchronizer.run(shutdown_rx).await });

    // Wait for Ctrl+C
    tokio::signal::ctrl_c().await?;
    info!("Received shutdown signal, stopping synchronizer...");
    let _ = shutdown_tx.send(true);

    if let Err(e) = sync_handle.await {
        error!(error = %e, "Synchronizer task failed");
    }
    info!("Shutdown complete.");
    Ok(())
}

async fn run_proxy(args: ProxyArgs) -> Result<()> {
    let config = ProxyConfig {
        listen: args.listen,
        album_id: args.album_id,
        default_width: args.default_width,
        default_height: args.default_height,
        font_family: args.font_family,
        font_dir: args.font_dir,
        jpeg_quality: args.jpeg_quality,
    };

    let client = PhotoClient::new(args.client.client_config()).context("Failed to create API client")?;

    let style = CaptionStyle {
        font_family: config.font_family.clone(),
        ..CaptionStyle::default()
    };
    let captions = Arc::new(CaptionRenderer::new(style, config.font_dir.as_deref()));

    let server = ProxyServer::new(ProxyState::new(client, captions, config));
    server
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "Failed to listen for shutdown signal");
            }
            info!("Received shutdown signal, stopping proxy...");
        })
        .await
}
