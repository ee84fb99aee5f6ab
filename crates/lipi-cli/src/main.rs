//! Lipi CLI: validate a transliteration page from the terminal.
//!
//! ## Usage
//!
//! ```bash
//! lipi run                          # Run the built-in suite headlessly
//! lipi run --cases suite.json       # Run a user-supplied suite
//! lipi run --format json            # Machine-readable summary
//! lipi cases                        # Print the built-in suite as JSON
//! ```

mod cases;
mod error;
mod output;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use lipi::HarnessConfig;

use crate::cases::builtin_suite;
use crate::error::{CliError, CliResult};
use crate::output::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "lipi", version, about = "DOM-heuristic transliteration validation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run a suite against the target page
    Run(RunArgs),
    /// Print the built-in suite as JSON
    Cases,
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Target page URL
    #[arg(long)]
    url: Option<String>,

    /// JSON file with the case suite (defaults to the built-in suite)
    #[arg(long)]
    cases: Option<PathBuf>,

    /// Run with a visible browser window
    #[arg(long)]
    headed: bool,

    /// Chromium executable override
    #[arg(long, env = "CHROMIUM_PATH")]
    chromium_path: Option<String>,

    /// Disable the browser sandbox (containers/CI)
    #[arg(long)]
    no_sandbox: bool,

    /// Settle timeout in milliseconds
    #[arg(long, default_value_t = lipi::config::DEFAULT_SETTLE_TIMEOUT_MS)]
    settle_timeout_ms: u64,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let outcome = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::from)
        .and_then(|runtime| runtime.block_on(dispatch(&cli)));

    match outcome {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn dispatch(cli: &Cli) -> CliResult<bool> {
    match &cli.command {
        Commands::Run(args) => run_suite(args, cli.quiet).await,
        Commands::Cases => {
            println!("{}", serde_json::to_string_pretty(&builtin_suite())?);
            Ok(true)
        }
    }
}

fn init_tracing(verbose: u8) {
    let default_filter = match verbose {
        0 => "warn",
        1 => "lipi=info,lipi_cli=info",
        _ => "lipi=debug,lipi_cli=debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn harness_config(args: &RunArgs) -> HarnessConfig {
    let mut config = HarnessConfig::new().with_settle_timeout_ms(args.settle_timeout_ms);
    if let Some(url) = &args.url {
        config = config.with_target_url(url.clone());
    }
    config
}

#[cfg(feature = "browser")]
async fn run_suite(args: &RunArgs, quiet: bool) -> CliResult<bool> {
    use lipi::{Browser, BrowserConfig, Runner, RunSummary, ScenarioReport};

    use crate::cases::load_cases;
    use crate::output::{print_summary, ProgressReporter};

    let suite = match &args.cases {
        Some(path) => load_cases(path)?,
        None => builtin_suite(),
    };

    let mut browser_config = BrowserConfig::default().with_headless(!args.headed);
    if let Some(path) = &args.chromium_path {
        browser_config = browser_config.with_chromium_path(path.clone());
    }
    if args.no_sandbox {
        browser_config = browser_config.with_no_sandbox();
    }

    let browser = Browser::launch(browser_config).await?;
    let runner = Runner::new(harness_config(args));

    let mut progress = ProgressReporter::new(quiet);
    progress.start(suite.len() as u64);

    // One fresh page handle per scenario; a handle that fails to
    // materialize fails that scenario only.
    let mut reports = Vec::with_capacity(suite.len());
    for case in &suite {
        progress.begin_case(&case.name);
        let report = match browser.new_page().await {
            Ok(mut page) => runner.run_case(&mut page, case).await,
            Err(err) => ScenarioReport::page_failure(case, &err),
        };
        progress.finish_case(&report);
        reports.push(report);
    }
    progress.finish();

    let summary = RunSummary::from_reports(reports);
    browser.close().await?;
    print_summary(&summary, args.format)?;
    Ok(summary.all_passed())
}

#[cfg(not(feature = "browser"))]
async fn run_suite(_args: &RunArgs, _quiet: bool) -> CliResult<bool> {
    Err(CliError::Generic(
        "browser control not enabled. Rebuild with --features browser".to_string(),
    ))
}
