use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "omni-pool")]
#[command(about = "Feed stdin lines into a shared pool and stream them to N readers on stdout.")]
pub(crate) struct Cli {
    /// Path to a YAML pool config (policy + channel capacities).
    #[arg(long)]
    pub(crate) config: Option<PathBuf>,

    /// Keep at most this many elements (overrides config).
    #[arg(long)]
    pub(crate) max_count: Option<usize>,

    /// Keep at most this many bytes of elements (overrides config; 0 disables).
    #[arg(long)]
    pub(crate) max_bytes: Option<u64>,

    /// Number of concurrent readers (default: 1)
    #[arg(long, default_value_t = 1)]
    pub(crate) readers: usize,

    /// Start offset for every reader; negative means earliest available (default: -1)
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    pub(crate) from: i64,

    /// Stop after this many seconds (default: run until Ctrl+C)
    #[arg(long)]
    pub(crate) run_secs: Option<u64>,

    /// Elements seeded into the pool before stdin is fed.
    pub(crate) seed: Vec<String>,
}
