use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use error::AppError;
use indicatif::MultiProgress;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use transglide_engine::{DownloaderConfig, HttpDownloader, ImageLoader, LoaderConfig};

mod cli;
mod commands;
mod error;
mod utils;

use cli::{CliArgs, Command};
use utils::progress::ProgressManager;
use utils::{parse_headers, parse_size};

fn main() {
    if let Err(e) = bootstrap() {
        eprintln!("Error: {e}");
        // Log the full error for debugging
        error!(error = ?e, "Application failed");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn bootstrap() -> Result<(), AppError> {
    // Parse command-line arguments
    let args = CliArgs::parse();

    // Setup logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("transglide.log")?;

    let multi_writer = MakeWriterExt::and(std::io::stderr, log_file);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(multi_writer)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| AppError::Initialization(e.to_string()))?;

    info!(
        "HTTP configuration: timeout={}s, connect={}s, retries={}",
        args.timeout, args.connect_timeout, args.retries
    );

    let downloader_config = DownloaderConfig::builder()
        .with_timeout(Duration::from_secs(args.timeout))
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_headers(parse_headers(&args.headers))
        .with_max_retries(args.retries)
        .with_max_memory_cache_size(parse_size(&args.memory_cache)?)
        .build();

    let mut loader_config = LoaderConfig::builder();
    if let Some(cache_dir) = args.cache_dir {
        loader_config = loader_config.with_cache_root(cache_dir);
    }
    let loader_config = loader_config.build();
    info!(dir = %loader_config.cache_dir().display(), "Using cache directory");

    let downloader = Arc::new(HttpDownloader::new(downloader_config)?);
    let loader = ImageLoader::new(loader_config, downloader)?;

    match args.command {
        Command::Fetch { urls, progress } => {
            let multi = MultiProgress::new();
            let progress_manager = if progress {
                ProgressManager::new(multi)
            } else {
                ProgressManager::new_disabled(multi)
            };
            commands::fetch(&loader, &urls, &progress_manager).await
        }
        Command::Get { url } => commands::get(&loader, url).await,
        Command::Path { url } => commands::path(&loader, &url).map(|_| ()),
        Command::Clear => commands::clear(&loader).await,
    }
}
