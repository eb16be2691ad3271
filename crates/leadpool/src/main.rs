// SPDX-FileCopyrightText: 2026 Leadpool Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Leadpool - contact allocation and lead deduplication.
//!
//! This is the operator command line for the Leadpool engine.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use leadpool_config::LeadpoolConfig;
use leadpool_core::{LeadStatus, LeadpoolError};
use leadpool_engine::LeadEngine;
use tracing::debug;

mod leads;
mod output;
mod pool;
mod text;

use output::Output;

/// Leadpool - contact allocation and lead deduplication.
#[derive(Parser, Debug)]
#[command(name = "leadpool", version, about, long_about = None)]
struct Cli {
    /// Configuration file, instead of the standard search path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the normalized key of a contact.
    Normalize { raw: String },
    /// List the contacts found in a message.
    Extract { text: String },
    /// Find the category a contact belongs to.
    Classify {
        #[arg(long)]
        worker: String,
        raw: String,
        /// Surrounding message text for the keyword fallback.
        #[arg(long)]
        context: Option<String>,
    },
    /// Import contacts from a CSV or plain text file (first column).
    Import {
        #[arg(long)]
        category: String,
        file: PathBuf,
    },
    /// Hand a worker every contact they are still entitled to.
    Allocate {
        #[arg(long)]
        category: String,
        #[arg(long)]
        worker: String,
    },
    /// Submit a lead.
    Claim {
        #[arg(long)]
        worker: String,
        contact: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, default_value = "")]
        source: String,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Resubmit a lead sent back for rework.
    Resubmit {
        #[arg(long)]
        lead: i64,
        #[arg(long)]
        worker: String,
        contact: String,
    },
    /// Moderate a pending lead: approved, rejected, or rework.
    Review {
        #[arg(long)]
        lead: i64,
        status: LeadStatus,
    },
    /// Grant a worker extra quota in a category.
    Grant {
        #[arg(long)]
        worker: String,
        #[arg(long)]
        category: String,
        #[arg(allow_hyphen_values = true)]
        delta: i64,
    },
    /// Show free and total contacts per category.
    Stats {
        #[arg(long)]
        category: Option<String>,
    },
    /// Delete the lead holding a contact's key.
    Release { contact: String },
    /// Return every contact of a category to the free pool.
    Reset {
        #[arg(long)]
        category: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => leadpool_config::load_and_validate_path(path),
        None => leadpool_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            leadpool_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&config.engine.log_level);
    debug!(
        categories = config.categories.len(),
        database = %config.storage.database_path,
        "configuration loaded"
    );

    let out = Output::new(cli.json);
    match run(cli.command, &config, &out).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            out.error(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config: &LeadpoolConfig,
    out: &Output,
) -> Result<(), LeadpoolError> {
    // Text commands never touch the database.
    match command {
        Commands::Normalize { raw } => text::run_normalize(config, &raw, out),
        Commands::Extract { text } => text::run_extract(config, &text, out),
        command => {
            let engine = LeadEngine::open(config).await?;
            let result = dispatch(command, config, &engine, out).await;
            engine.shutdown().await?;
            result
        }
    }
}

async fn dispatch(
    command: Commands,
    config: &LeadpoolConfig,
    engine: &LeadEngine,
    out: &Output,
) -> Result<(), LeadpoolError> {
    match command {
        // Served by `run` without opening the store.
        Commands::Normalize { .. } | Commands::Extract { .. } => Ok(()),
        Commands::Classify {
            worker,
            raw,
            context,
        } => text::run_classify(engine, &worker, &raw, context.as_deref(), out).await,
        Commands::Import { category, file } => pool::run_import(engine, &category, &file, out).await,
        Commands::Allocate { category, worker } => {
            pool::run_allocate(engine, &category, &worker, out).await
        }
        Commands::Claim {
            worker,
            contact,
            category,
            source,
            comment,
        } => {
            let payload = leadpool_core::LeadPayload {
                worker_id: worker.into(),
                category,
                raw_contact: contact,
                source,
                comment,
            };
            leads::run_claim(engine, &payload, out).await
        }
        Commands::Resubmit {
            lead,
            worker,
            contact,
        } => leads::run_resubmit(engine, lead, &worker, &contact, out).await,
        Commands::Review { lead, status } => leads::run_review(engine, lead, status, out).await,
        Commands::Grant {
            worker,
            category,
            delta,
        } => pool::run_grant(engine, &worker, &category, delta, out).await,
        Commands::Stats { category } => {
            let low_water = config.allocation.low_water_percent;
            pool::run_stats(engine, category.as_deref(), low_water, out).await
        }
        Commands::Release { contact } => leads::run_release(engine, &contact, out).await,
        Commands::Reset { category } => pool::run_reset(engine, &category, out).await,
    }
}

/// Install the global subscriber. `RUST_LOG` wins over `engine.log_level`.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("leadpool={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn review_parses_status_names() {
        let cli = Cli::try_parse_from(["leadpool", "review", "--lead", "7", "rework"]).unwrap();
        match cli.command {
            Commands::Review { lead, status } => {
                assert_eq!(lead, 7);
                assert_eq!(status, LeadStatus::Rework);
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(Cli::try_parse_from(["leadpool", "review", "--lead", "7", "maybe"]).is_err());
    }

    #[test]
    fn grant_accepts_negative_numbers_for_validation() {
        let cli = Cli::try_parse_from([
            "leadpool", "grant", "--worker", "w1", "--category", "vk", "-5",
        ])
        .unwrap();
        assert!(matches!(cli.command, Commands::Grant { delta: -5, .. }));
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["leadpool", "normalize", "@anna", "--json"]).unwrap();
        assert!(cli.json);
    }

    #[test]
    fn binary_loads_config_defaults() {
        let config = leadpool_config::load_and_validate_str("")
            .expect("default config should be valid");
        assert_eq!(config.categories.len(), 8);
    }
}
