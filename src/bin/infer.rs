//! `retspec-infer`: infers an error-return specification from one or more
//! call-path trace logs (§6).

use clap::Parser;
use retspec::aggregator::PerProgramAggregator;
use retspec::cli::InferCli;
use retspec::config::Tunables;
use retspec::context::ParseContext;
use retspec::error::{ErrorContext, Result};
use retspec::inter_election::InterProgramElection;
use retspec::path::{InputLine, classify_line};
use retspec::spec::ErrorSpec;
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env("RETSPEC_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn tunables_from(cli: &InferCli) -> Tunables {
    let mut tunables = Tunables::from_env();
    if let Some(v) = cli.low_ratio {
        tunables.low_ratio = v;
    }
    if let Some(v) = cli.high_ratio {
        tunables.high_ratio = v;
    }
    if let Some(v) = cli.vote_ratio {
        tunables.vote_ratio = v;
    }
    if let Some(v) = cli.bin_limit {
        tunables.bin_limit = v;
    }
    tunables
}

/// Parses one input source into a fresh [`PerProgramAggregator`] and runs
/// the per-program election over every function it observed.
fn run_program<R: BufRead>(name: &str, input: R, tunables: Tunables) -> Result<PerProgramAggregator> {
    let mut aggregator = PerProgramAggregator::new(tunables);
    let mut ctx = ParseContext::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line.context("reading input log line")?;
        ctx.push_line(idx + 1, &line);
        let is_new_file = matches!(classify_line(&line), Some(InputLine::NewFile));
        match aggregator.handle_line(&line, &mut ctx) {
            Ok(true) => {
                tracing::debug!(source = name, line = idx + 1, "parsed path line");
                ctx.clear();
            }
            Ok(false) if is_new_file => {
                tracing::debug!(source = name, line = idx + 1, "reset wrapping state at file boundary");
                ctx.clear();
            }
            Ok(false) => {
                tracing::warn!(source = name, line = idx + 1, "skipped line without recognized prefix");
            }
            Err(err) => {
                tracing::error!(source = name, line = idx + 1, context = ?ctx.snapshot(), "{err}");
                return Err(err);
            }
        }
    }
    for (_, record) in aggregator.functions_mut() {
        match record.generate_votes() {
            Ok(()) => tracing::debug!(source = name, "{}", record.vote_summary()),
            Err(err) => tracing::debug!(source = name, "{err}"),
        }
    }
    tracing::info!(source = name, "aggregation complete");
    Ok(aggregator)
}

fn open_input(path: &PathBuf) -> Result<Box<dyn BufRead>> {
    let file = File::open(path).with_context(|| format!("opening input log {}", path.display()))?;
    Ok(Box::new(BufReader::new(file)))
}

fn run(cli: InferCli) -> Result<()> {
    let tunables = tunables_from(&cli);
    let mut election = InterProgramElection::new(tunables);

    if cli.inputs.is_empty() {
        let stdin = io::stdin();
        let aggregator = run_program("<stdin>", stdin.lock(), tunables)?;
        election.add_program(aggregator.functions());
    } else {
        for path in &cli.inputs {
            let input = open_input(path)?;
            let aggregator = run_program(&path.display().to_string(), input, tunables)?;
            election.add_program(aggregator.functions());
        }
    }

    let spec: ErrorSpec = election.finish();
    tracing::info!(functions = spec.len(), "election complete");

    let output = File::create(&cli.output).with_context(|| format!("creating output spec {}", cli.output.display()))?;
    spec.write_to(BufWriter::new(output))?;
    tracing::info!(path = %cli.output.display(), "spec written");

    Ok(())
}

fn main() {
    let cli = InferCli::parse();
    init_logging(cli.log_level.as_deref());

    if let Err(err) = run(cli) {
        tracing::error!("{err}");
        eprintln!("retspec-infer: {err}");
        std::process::exit(1);
    }
}
