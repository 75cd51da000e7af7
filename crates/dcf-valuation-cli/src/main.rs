mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use dcf_valuation_core::config::ValuationInputs;

use commands::batch::BatchArgs;
use commands::sensitivity::SensitivityArgs;
use commands::valuation::{GrowthPathArgs, ValueArgs, WaccArgs};

/// Intrinsic-value DCF engine
#[derive(Parser)]
#[command(
    name = "dcfv",
    version,
    about = "Faded-growth DCF valuations with WACC x terminal-growth sensitivity",
    long_about = "Values listed companies from market snapshots with decimal precision: \
                  derives ratios from financial statements, builds a CAPM/WACC discount \
                  rate, projects unlevered free cash flow under three growth scenarios and \
                  reports a sensitivity grid on the base case."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Valuation assumptions file (JSON or YAML); missing fields take defaults
    #[arg(long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Value one ticker under every growth scenario, with the base-case grid
    Value(ValueArgs),
    /// WACC x terminal-growth sensitivity grid for one scenario
    Sensitivity(SensitivityArgs),
    /// Cost of equity and WACC from explicit inputs
    Wacc(WaccArgs),
    /// Print the faded growth path
    GrowthPath(GrowthPathArgs),
    /// Value many tickers and write the result CSVs
    Batch(BatchArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_inputs(path: Option<&str>) -> Result<ValuationInputs, Box<dyn std::error::Error>> {
    match path {
        Some(path) => input::file::read_config(path),
        None => Ok(ValuationInputs::default()),
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let inputs = match load_inputs(cli.config.as_deref()) {
        Ok(inputs) => inputs,
        Err(e) => fail(e),
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Value(args) => commands::valuation::run_value(args, &inputs),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args, &inputs),
        Commands::Wacc(args) => commands::valuation::run_wacc(args, &inputs),
        Commands::GrowthPath(args) => commands::valuation::run_growth_path(args, &inputs),
        Commands::Batch(args) => commands::batch::run_batch(args, &inputs),
        Commands::Version => {
            println!("dcfv {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => fail(e),
    }
}

fn fail(e: Box<dyn std::error::Error>) -> ! {
    eprintln!("{}: {}", "error".red().bold(), e);
    process::exit(1);
}
