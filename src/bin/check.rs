//! `retspec-check`: applies a persisted error specification to one or more
//! call-path trace logs, reporting unchecked-return-value bugs (§6).

use clap::Parser;
use retspec::aggregator::PerProgramAggregator;
use retspec::checker::SpecChecker;
use retspec::cli::CheckCli;
use retspec::config::Tunables;
use retspec::context::ParseContext;
use retspec::error::{ErrorContext, Result, RetSpecError};
use retspec::path::{InputLine, classify_line};
use retspec::spec::ErrorSpec;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

fn init_logging(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_env("RETSPEC_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn parse_log<R: BufRead>(name: &str, input: R) -> Result<PerProgramAggregator> {
    let mut aggregator = PerProgramAggregator::new(Tunables::default());
    let mut ctx = ParseContext::new();
    for (idx, line) in input.lines().enumerate() {
        let line = line.context("reading input log line")?;
        ctx.push_line(idx + 1, &line);
        let is_new_file = matches!(classify_line(&line), Some(InputLine::NewFile));
        match aggregator.handle_line(&line, &mut ctx) {
            Ok(true) => ctx.clear(),
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
    Ok(aggregator)
}

/// The stem of `path` with its extension(s) stripped, matching the
/// upstream tool's `<log-stem>.bugs` output naming (§6).
fn extensionless_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
        .split('.')
        .next()
        .unwrap_or_default()
        .to_string()
}

fn run(cli: CheckCli) -> Result<()> {
    let spec_file =
        File::open(&cli.error_spec).with_context(|| format!("opening error spec {}", cli.error_spec.display()))?;
    let spec: ErrorSpec = ErrorSpec::read_from(BufReader::new(spec_file))?;
    tracing::info!(functions = spec.len(), "error specification loaded");

    if cli.inputs.is_empty() {
        return Err(RetSpecError::Usage("no input log files given".to_string()));
    }

    fs::create_dir_all(&cli.bugs_out_dir)
        .with_context(|| format!("creating bugs output directory {}", cli.bugs_out_dir.display()))?;

    let checker = match (cli.threshold_ratio, cli.min_sites) {
        (None, None) => SpecChecker::new(&spec),
        (threshold_ratio, min_sites) => SpecChecker::with_options(
            &spec,
            threshold_ratio.unwrap_or(1.0),
            min_sites.unwrap_or(2) as u64,
        ),
    };

    let mut total_bugs = 0u64;
    for path in &cli.inputs {
        let file = File::open(path).with_context(|| format!("opening input log {}", path.display()))?;
        let aggregator = parse_log(&path.display().to_string(), BufReader::new(file))?;
        tracing::info!(source = %path.display(), "aggregation complete");

        let report = checker.check(&aggregator);
        tracing::info!(source = %path.display(), bugs = report.total(), "check complete");
        total_bugs += report.total();

        let out_name = format!("{}.bugs", extensionless_name(path));
        let out_path: PathBuf = cli.bugs_out_dir.join(out_name);
        let out_file =
            File::create(&out_path).with_context(|| format!("creating bugs report {}", out_path.display()))?;
        let mut writer = BufWriter::new(out_file);
        report.write_to(&mut writer)?;
        writer.flush().context("flushing bugs report")?;
    }

    tracing::info!(total = total_bugs, "all programs checked");
    Ok(())
}

fn main() {
    let cli = CheckCli::parse();
    init_logging(cli.log_level.as_deref());

    if let Err(err) = run(cli) {
        tracing::error!("{err}");
        eprintln!("retspec-check: {err}");
        std::process::exit(1);
    }
}
