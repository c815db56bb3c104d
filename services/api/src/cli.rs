use crate::report::{run_recalculate, run_score, run_states, RecalculateArgs, ScoreArgs};
use crate::server;
use auction_scoring::error::AppError;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "Auction Scoring",
    about = "Score tax-sale properties across state regimes and serve the results",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Rescore every property in a scraped CSV export
    Recalculate(RecalculateArgs),
    /// Score a single property from command-line values
    Score(ScoreArgs),
    /// List the registered state regimes
    States,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
    /// Serve properties loaded from this CSV instead of the built-in samples
    #[arg(long)]
    pub(crate) data: Option<PathBuf>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Recalculate(args) => run_recalculate(args),
        Command::Score(args) => run_score(args),
        Command::States => run_states(),
    }
}
