//! Clone Benchmark CLI
//!
//! Clones a repository (single branch, depth 1) and reports memory usage
//! before the clone, right after it, and after a 10 second settle interval.
//!
//! Usage:
//!   clone-bench [OPTIONS] <REPO_URL> <DEST_DIR>
//!
//! Examples:
//!   clone-bench https://github.com/rust-lang/log.git /tmp/log
//!   clone-bench --strategy libgit2 https://github.com/rust-lang/log.git /tmp/log
//!   clone-bench --no-prepare --output json https://github.com/rust-lang/log.git /tmp/log

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use clone_bench::{
    Harness, HarnessConfig, OutputFormat, ProcessSampler, Reporter, StrategyKind, TokioDelay,
    SETTLE_DELAY,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// jemalloc also serves C malloc, so heap stats cover libgit2's allocations
#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[derive(Parser)]
#[command(name = "clone-bench", version)]
#[command(about = "Measure memory usage of a shallow git clone")]
struct Cli {
    /// Repository URL to clone
    repo_url: String,

    /// Destination directory for the clone
    dest_dir: PathBuf,

    /// Clone strategy
    #[arg(short, long, value_enum, default_value_t = StrategyKind::GitCli)]
    strategy: StrategyKind,

    /// Keep an existing destination instead of deleting it first
    #[arg(long)]
    no_prepare: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Terminal)]
    output: OutputFormat,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Settle interval before the final sample, in seconds
    #[arg(long, default_value_t = SETTLE_DELAY.as_secs(), hide = true)]
    settle_secs: u64,
}

/// Parse arguments, exiting with status 1 on any usage error
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            e.exit()
        }
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    }
}

/// Log to stderr; `RUST_LOG` overrides the level, `LOG_FORMAT=json` switches to JSON lines
fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(format!("clone_bench={level}")),
    };

    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);

    if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init()?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = parse_cli();
    init_tracing(cli.verbose)?;

    let reporter = Reporter::new(cli.output);

    let config = HarnessConfig {
        prepare: !cli.no_prepare,
        settle_delay: Duration::from_secs(cli.settle_secs),
    };

    let mut harness = Harness::new(
        config,
        ProcessSampler::new(),
        cli.strategy.build(),
        TokioDelay,
    );

    tracing::info!(
        repo_url = %cli.repo_url,
        dest = %cli.dest_dir.display(),
        strategy = harness.strategy_name(),
        "Starting clone benchmark"
    );

    let report = harness.run(&cli.repo_url, &cli.dest_dir).await;

    println!("{}", reporter.report(&report));

    Ok(())
}
