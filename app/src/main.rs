#![deny(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod command;

use command::{
    CommandStrategy, InfoStrategy, InitStrategy, QueryInput, QueryStrategy, RulesInput,
    RulesStrategy, SeedStrategy, VersionStrategy,
};

#[derive(Parser)]
#[command(name = "inspecta")]
#[command(about = "Natural-language queries over manufacturing inspection data", long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize configuration
    Init,
    /// Show configuration, database status and rule snapshot
    Info,
    /// Ask a question, or start an interactive session
    Query {
        /// Single query to answer
        #[arg(short, long)]
        query: Option<String>,

        /// Session id for follow-up context
        #[arg(short, long)]
        session: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage intent rules
    Rules {
        #[command(subcommand)]
        action: RulesAction,
    },
    /// Create tables and load the demo rules and sample records
    SeedDemo,
    /// Show version
    Version,
}

#[derive(Subcommand)]
enum RulesAction {
    /// List stored rules
    List,
    /// Insert or update rules from a JSON array file
    Import { file: PathBuf },
}

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    match cli.command {
        Commands::Init => InitStrategy.execute(()).await,
        Commands::Info => InfoStrategy.execute(()).await,
        Commands::Query {
            query,
            session,
            json,
        } => {
            QueryStrategy
                .execute(QueryInput {
                    query,
                    session,
                    json,
                })
                .await
        }
        Commands::Rules { action } => {
            let input = match action {
                RulesAction::List => RulesInput::List,
                RulesAction::Import { file } => RulesInput::Import(file),
            };
            RulesStrategy.execute(input).await
        }
        Commands::SeedDemo => SeedStrategy.execute(()).await,
        Commands::Version => VersionStrategy.execute(()).await,
    }
}
