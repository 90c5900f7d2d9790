use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "shelf",
    about = "Inspect and edit object shelf storage",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage directory
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub store: PathBuf,

    /// TOML file with buffer sizes and codec
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a new storage
    Init(InitArgs),
    /// Show the version stamp and contents summary
    Info(InfoArgs),
    /// List rack keys or slots with blob sizes
    Ls(LsArgs),
    /// Store a JSON value under a key
    Put(PutArgs),
    /// Print the JSON value stored under a key
    Get(KeyArgs),
    /// Remove a key from a rack
    Rm(KeyArgs),
    /// Hex dump the head of a stored blob
    Dump(DumpArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
    /// Truncate an existing storage
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct InfoArgs {}

#[derive(Args)]
pub struct LsArgs {
    #[arg(short, long)]
    pub rack: Option<String>,
    /// List slots instead of rack keys
    #[arg(long, conflicts_with = "rack")]
    pub slots: bool,
}

#[derive(Args)]
pub struct KeyArgs {
    pub key: String,
    #[arg(short, long)]
    pub rack: Option<String>,
}

#[derive(Args)]
pub struct PutArgs {
    pub key: String,
    /// JSON document, e.g. '{"a": [1, 2]}'
    pub value: String,
    #[arg(short, long)]
    pub rack: Option<String>,
}

#[derive(Args)]
pub struct DumpArgs {
    pub key: String,
    #[arg(short, long)]
    pub rack: Option<String>,
    /// Read from a slot instead of a rack
    #[arg(long, conflicts_with = "rack")]
    pub slot: bool,
    #[arg(short = 'n', long, default_value = "256")]
    pub limit: usize,
}
