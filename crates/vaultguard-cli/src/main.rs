mod constructor;
mod errors;
mod explain;
mod parser;
mod runner;
mod writer;

use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

use crate::runner::{RunStatus, run};

/// Output format for reconciliation results
#[derive(Debug, Clone, ValueEnum)]
enum OutputFormat {
    /// Print results to standard output (human-readable)
    Stdout,
    /// Write results to a JSON file
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "vaultguard",
    version,
    author = "VaultGuard Contributors",
    about = "VaultGuard CLI - Source to data vault reconciliation",
    long_about = "VaultGuard compares record counts and content between source tables, their \
                  data vault hubs and satellites, and the business views built on top of them. \
                  Differences are classified as missing records, representation differences or \
                  intentional business filtering.\n\n\
                  Example usage:\n  \
                  vaultguard --config reconciliation.toml --output json --output-path reports/"
)]
struct Args {
    /// Path to the TOML configuration file that defines sources and mappings
    #[arg(short, long, value_name = "FILE", required_unless_present = "explain")]
    config: Option<String>,

    /// Output format for reconciliation results
    #[arg(short, long, value_enum, default_value = "stdout")]
    output: OutputFormat,

    /// File or directory for the JSON report
    #[arg(long, value_name = "PATH")]
    output_path: Option<String>,

    /// Log every query issued
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug mode with detailed error backtraces and stack traces
    #[arg(short, long)]
    debug: bool,

    /// Print the classification heuristics and their thresholds, then exit
    #[arg(long)]
    explain: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let args = Args::parse();

    // Enable backtraces in debug mode. No other thread is running yet.
    if args.debug {
        unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
    }
    init_logging(args.verbose);

    match run(&args) {
        Ok(RunStatus::Clean) => {}
        Ok(RunStatus::Discrepancies) => std::process::exit(2),
        Err(err) => {
            if std::env::var("RUST_BACKTRACE").is_ok() {
                eprintln!("Error: {:?}", err);
            } else {
                eprintln!("Error: {:#}", err);
                eprintln!("\nHint: Run with --debug flag for detailed stack traces");
            }
            std::process::exit(1);
        }
    }
}
