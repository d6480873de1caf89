use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use marketpeek::core::SeriesRange;
use marketpeek::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for marketpeek::AppCommand {
    fn from(cmd: Commands) -> marketpeek::AppCommand {
        match cmd {
            Commands::Convert { amount, from, to } => {
                marketpeek::AppCommand::Convert { amount, from, to }
            }
            Commands::Currencies { base } => marketpeek::AppCommand::Currencies { base },
            Commands::Series {
                symbol,
                range,
                table,
            } => marketpeek::AppCommand::Series {
                symbol,
                range,
                show_bars: table,
            },
            Commands::Search { query } => marketpeek::AppCommand::Search {
                query: query.join(" "),
            },
            Commands::Pick { range } => marketpeek::AppCommand::Pick { range },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Convert an amount between two currencies
    Convert {
        /// Amount to convert
        amount: Option<f64>,
        /// Currency code to convert from
        #[arg(short, long)]
        from: Option<String>,
        /// Currency code to convert to
        #[arg(short, long)]
        to: Option<String>,
    },
    /// List supported currency codes
    Currencies {
        /// Base currency code
        #[arg(short, long)]
        base: Option<String>,
    },
    /// Show recent price history for a symbol
    Series {
        /// Ticker symbol, e.g. AAPL, MSFT or X:BTCUSD
        symbol: Option<String>,
        /// Days of history: 7, 30, 90, 180 or 365
        #[arg(short, long)]
        range: Option<SeriesRange>,
        /// Also list every daily bar
        #[arg(long)]
        table: bool,
    },
    /// Search for ticker symbols
    Search {
        /// Text to search for
        #[arg(required = true)]
        query: Vec<String>,
    },
    /// Search interactively and pick a symbol to chart
    Pick {
        /// Days of history: 7, 30, 90, 180 or 365
        #[arg(short, long)]
        range: Option<SeriesRange>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => marketpeek::cli::setup::setup(),
        Some(cmd) => marketpeek::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
