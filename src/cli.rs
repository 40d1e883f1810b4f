//! CLI argument surfaces for the inference and checker binaries. Kept
//! dependency-free beyond `clap`/std so this file can be `include!`d
//! directly by `build.rs` for completion/man generation, mirroring the
//! `cli.rs`/`shells.rs` split used elsewhere for clap-based binaries.

use clap::Parser;
use std::path::PathBuf;

/// Infers error-return specifications for C library functions from
/// path-sensitive trace logs.
#[derive(Parser, Debug)]
#[command(name = "retspec-infer", version, about)]
pub struct InferCli {
    /// Path to write the inferred error specification to.
    pub output: PathBuf,

    /// Input trace log files. Reads stdin if none are given.
    pub inputs: Vec<PathBuf>,

    /// Std-dev multiplier for inverted (minimum-seeking) threshold votes.
    #[arg(long)]
    pub low_ratio: Option<f64>,

    /// Std-dev multiplier used by the normalized inter-program route and
    /// the final inter-program election vote.
    #[arg(long)]
    pub high_ratio: Option<f64>,

    /// Std-dev multiplier for the final inter-program election vote.
    #[arg(long)]
    pub vote_ratio: Option<f64>,

    /// Maximum number of distinct observed constraints before a function is
    /// declared infallible by default.
    #[arg(long)]
    pub bin_limit: Option<usize>,

    /// Override the `RETSPEC_LOG` diagnostic verbosity for this run.
    #[arg(long)]
    pub log_level: Option<String>,
}

/// Applies an inferred error specification to freshly parsed call sites and
/// reports unchecked-return bugs.
#[derive(Parser, Debug)]
#[command(name = "retspec-check", version, about)]
pub struct CheckCli {
    /// Directory to write one `<log-stem>.bugs` report file per input log.
    pub bugs_out_dir: PathBuf,

    /// The error specification file produced by `retspec-infer`.
    pub error_spec: PathBuf,

    /// Input trace log files to check.
    pub inputs: Vec<PathBuf>,

    /// Std-dev multiplier above which a function's unchecked call sites are
    /// suppressed as conventionally-unchecked.
    #[arg(long)]
    pub threshold_ratio: Option<f64>,

    /// Minimum number of call sites a function must have before its
    /// unchecked verdict is trusted.
    #[arg(long)]
    pub min_sites: Option<usize>,

    /// Override the `RETSPEC_LOG` diagnostic verbosity for this run.
    #[arg(long)]
    pub log_level: Option<String>,
}
