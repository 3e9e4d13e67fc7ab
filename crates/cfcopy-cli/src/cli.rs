use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cfcopy")]
#[command(about = "Chunked, parallel copies between Cloud Files regions")]
#[command(after_help = "Locations are written REGION:container/key, e.g. IAD:backups/db.tar")]
pub struct Cli {
    /// Override the configuration directory for this invocation
    #[arg(long, global = true, value_name = "PATH")]
    pub config_dir: Option<PathBuf>,
    /// Log chunk-level activity
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Copy an object to another location as a segmented object
    Copy(CopyArgs),
    /// Show the size and etag of an object
    Stat(StatArgs),
    /// Download an object (or a byte range of it) to a local file
    Get(GetArgs),
    /// Upload a local file as a single object
    Put(PutArgs),
}

#[derive(Args, Clone, Debug)]
pub struct CopyArgs {
    /// Source object (REGION:container/key)
    pub source: String,
    /// Destination object (REGION:container/key)
    pub destination: String,
    /// Bytes per chunk (defaults to the config file, then 256 MiB)
    #[arg(long, value_name = "BYTES")]
    pub chunk_size: Option<u64>,
    /// Maximum number of chunks in flight (defaults to the config file, then 5)
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,
    /// Number of times to re-run the copy after a retryable failure (0-255, default: 1)
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8))]
    pub retries: u8,
    /// Show an interactive progress indicator
    #[arg(long, short = 'p')]
    pub progress: bool,
}

#[derive(Args, Clone, Debug)]
pub struct StatArgs {
    /// Object to inspect (REGION:container/key)
    pub target: String,
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct GetArgs {
    /// Object to download (REGION:container/key)
    pub source: String,
    /// Local file to write
    #[arg(long, short = 'o', value_name = "FILE")]
    pub output: PathBuf,
    /// First byte to read
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
    /// Number of bytes to read (0 = through the end of the object)
    #[arg(long, default_value_t = 0)]
    pub length: u64,
}

#[derive(Args, Clone, Debug)]
pub struct PutArgs {
    /// Local file to upload
    pub file: PathBuf,
    /// Destination object (REGION:container/key)
    pub destination: String,
}
