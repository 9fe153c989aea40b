use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Define CLI arguments
#[derive(Parser)]
#[command(
    version,
    about = "Image download and cache tool",
    long_about = "Downloads images into a flat, durable cache directory and reads them back.\n\
                  \n\
                  Cache entries are named after the last path segment of their URL, so\n\
                  two URLs ending in the same file name share one entry."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Directory the cache folder is created in
    #[arg(
        long,
        global = true,
        help = "Directory the TransGlide cache folder is created in (default: the user cache directory)"
    )]
    pub cache_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, help = "Enable detailed debug logging")]
    pub verbose: bool,

    /// Overall timeout in seconds
    #[arg(
        long,
        global = true,
        default_value = "30",
        help = "Overall timeout in seconds for HTTP requests (0 disables it)"
    )]
    pub timeout: u64,

    /// Connection timeout in seconds
    #[arg(
        long,
        global = true,
        default_value = "10",
        help = "Connection timeout in seconds (time to establish initial connection)"
    )]
    pub connect_timeout: u64,

    /// HTTP headers to include in requests
    #[arg(
        short = 'H',
        long = "header",
        global = true,
        help = "Add custom HTTP header (format: 'Name: Value'). Can be specified multiple times."
    )]
    pub headers: Vec<String>,

    /// Retry count for transient download failures
    #[arg(
        long,
        global = true,
        default_value = "2",
        help = "Number of retries for connect errors, timeouts and 5xx responses"
    )]
    pub retries: u32,

    /// In-memory byte cache size with optional unit (B, KB, MB, GB)
    #[arg(
        long,
        global = true,
        default_value = "30MB",
        help = "Size of the downloader's in-memory cache with optional unit (B, KB, MB, GB). Use 0 to disable."
    )]
    pub memory_cache: String,
}

#[derive(Subcommand)]
pub enum Command {
    /// Download images and store them in the cache
    Fetch {
        #[arg(required = true, help = "URL(s) of the images to download")]
        urls: Vec<String>,

        /// Show per-download progress bars
        #[arg(short, long, help = "Display progress bars while downloading")]
        progress: bool,
    },

    /// Decode a cached image and print its dimensions
    Get {
        #[arg(help = "URL of a previously fetched image")]
        url: String,
    },

    /// Print the cache path of an image
    Path {
        #[arg(help = "URL of a previously fetched image")]
        url: String,
    },

    /// Remove every cached image
    Clear,
}
