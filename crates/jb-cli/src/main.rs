//! Job Blocker CLI
//!
//! Developer tool for running the filtering engine against fixtures.

mod classify;
mod logger;
mod replay;

use clap::{ArgAction, Parser, Subcommand};
use jb_core::EngineConfig;
use tokio::runtime::{Builder, Runtime};

#[derive(Parser)]
#[command(name = "jb-cli")]
#[command(about = "Job Blocker filtering engine tools")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run two passes over a listing fixture and show the outcome
    Classify {
        /// Store values (JSON object, e.g. {"blockedCompanies": ["Acme"], "applied": true})
        #[arg(short, long)]
        settings: String,

        /// Listings (JSON array)
        #[arg(short, long)]
        listings: String,

        /// Engine configuration (JSON); defaults when omitted
        #[arg(short, long)]
        config: Option<String>,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay a timed event script on a virtual clock
    Replay {
        /// Script file (JSON)
        #[arg(short, long)]
        script: String,
    },

    /// Print the default engine configuration
    Config,
}

/// Single-threaded runtime for driving store futures to completion.
pub(crate) fn runtime() -> Result<Runtime, String> {
    Builder::new_current_thread()
        .build()
        .map_err(|e| format!("Failed to start runtime: {}", e))
}

fn main() {
    let cli = Cli::parse();
    logger::init(cli.verbose);

    let result = match cli.command {
        Commands::Classify {
            settings,
            listings,
            config,
            json,
        } => classify::cmd_classify(&settings, &listings, config.as_deref(), json),
        Commands::Replay { script } => replay::cmd_replay(&script),
        Commands::Config => cmd_config(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn cmd_config() -> Result<(), String> {
    let text = serde_json::to_string_pretty(&EngineConfig::default())
        .map_err(|e| format!("Failed to encode config: {}", e))?;
    println!("{}", text);
    Ok(())
}
