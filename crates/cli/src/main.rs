//! qrtag CLI - Database migrations and code management.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! qrtag-cli migrate
//!
//! # Generate codes for a bracelet print run
//! qrtag-cli codes generate --count 100
//!
//! # Check whether a code has been claimed
//! qrtag-cli codes status ab12cd34
//! ```
//!
//! # Commands
//!
//! - `migrate` - Run database migrations
//! - `codes generate` - Print fresh codes, distinct within the batch
//! - `codes status` - Report claimed / unclaimed for one code

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;

use clap::{Parser, Subcommand};
use qrtag_core::ClaimStatus;

mod commands;

#[derive(Parser)]
#[command(name = "qrtag-cli")]
#[command(author, version, about = "qrtag CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Generate and inspect codes
    Codes {
        #[command(subcommand)]
        action: CodesAction,
    },
}

#[derive(Subcommand)]
enum CodesAction {
    /// Print fresh codes, one per line
    Generate {
        /// Number of codes to generate
        #[arg(short, long, default_value_t = 1)]
        count: usize,
    },
    /// Report whether a code has been claimed
    Status {
        /// The code printed on the tag
        code: String,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so generated codes can be piped
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let mut out = std::io::stdout().lock();
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Codes { action } => match action {
            CodesAction::Generate { count } => {
                for code in commands::codes::generate(count)? {
                    writeln!(out, "{code}")?;
                }
            }
            CodesAction::Status { code } => match commands::codes::status(&code).await? {
                ClaimStatus::Unclaimed => writeln!(out, "{code}: unclaimed")?,
                ClaimStatus::Claimed {
                    claimed_by,
                    claimed_at,
                } => writeln!(
                    out,
                    "{code}: claimed by {claimed_by} at {}",
                    claimed_at.to_rfc3339()
                )?,
            },
        },
    }
    Ok(())
}
