use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "mdt",
    about = "Compare, merge, and synchronize text files and directory trees",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Compare two files or two directories
    Diff(DiffArgs),
    /// Three-way merge of a base file and two edited descendants
    Merge(MergeArgs),
    /// Plan synchronization between two directory trees
    Sync(SyncArgs),
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum DiffFormat {
    /// Colored, human-readable hunks
    Text,
    /// Unified diff with ---/+++ file headers
    Patch,
    /// Unified hunks without file headers
    Unified,
    /// Machine-readable hunk list
    Json,
}

/// Normalization flags shared by diff and merge.
#[derive(Args, Clone, Debug, Default)]
pub struct IgnoreFlags {
    /// Ignore whitespace differences within lines
    #[arg(long)]
    pub ignore_whitespace: bool,

    /// Ignore letter case
    #[arg(long)]
    pub ignore_case: bool,

    /// Ignore insertions and deletions of blank lines
    #[arg(long)]
    pub ignore_blank_lines: bool,

    /// Ignore comments, using the comment syntax for the file extension
    #[arg(long)]
    pub ignore_comments: bool,
}

#[derive(Args)]
pub struct DiffArgs {
    pub left: PathBuf,
    pub right: PathBuf,

    #[arg(long, default_value = "text")]
    pub format: DiffFormat,

    /// Context lines around each hunk
    #[arg(long, default_value_t = 3)]
    pub context: usize,

    #[command(flatten)]
    pub ignore: IgnoreFlags,

    /// Glob patterns of paths to skip when comparing directories
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore_patterns: Vec<String>,

    /// Line-count ceiling before falling back to coarse anchor alignment
    #[arg(long)]
    pub max_units: Option<usize>,
}

#[derive(Args)]
pub struct MergeArgs {
    pub base: PathBuf,
    pub left: PathBuf,
    pub right: PathBuf,

    /// Write merged output to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Emit conflict markers for unresolved conflicts instead of failing
    #[arg(long)]
    pub marked: bool,

    #[command(flatten)]
    pub ignore: IgnoreFlags,
}

#[derive(Clone, Debug, clap::ValueEnum)]
pub enum PolicyArg {
    Newer,
    Left,
    Right,
    Manual,
}

#[derive(Args)]
pub struct SyncArgs {
    pub left: PathBuf,
    pub right: PathBuf,

    /// Prior snapshot directory, enabling deletion propagation
    #[arg(long)]
    pub base: Option<PathBuf>,

    #[arg(long, default_value = "manual")]
    pub policy: PolicyArg,

    /// Glob patterns of paths to skip
    #[arg(long = "ignore", value_name = "GLOB")]
    pub ignore_patterns: Vec<String>,
}
