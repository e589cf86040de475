//! # Psi CLI Module
//!
//! This module implements the CLI interface for psi.
//!
//! ## Available Commands
//!
//! - `load` - Register a rulebook and print the rule handles
//! - `rules` - Print each rule's decomposition from the index
//! - `check` - Evaluate each rule's context against the store
//! - `status` - Show store contents

mod commands;

use clap::{Parser, Subcommand};
use psi::PsiConfig;
use psi_core::{AtomSpace, PsiError, PsiRules, RedbAtomSpace};
use std::path::PathBuf;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Psi - rule index over a hypergraph atom store
///
/// Loads (context, action) => goal rules from TOML rulebooks and reports on
/// their decomposition and current satisfiability.
#[derive(Parser, Debug)]
#[command(name = "psi")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress summary lines
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a redb database (in-memory store when absent)
    #[arg(short = 'D', long, global = true)]
    pub database: Option<PathBuf>,

    /// Path to a psi.toml config file
    #[arg(short = 'c', long, global = true)]
    pub config: Option<PathBuf>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Register a rulebook and print the rule handles
    Load {
        /// Path to the rulebook (TOML)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Print each rule's context, action and goal
    Rules {
        /// Path to the rulebook (TOML)
        #[arg(short, long)]
        file: PathBuf,

        /// Only rules of this demand
        #[arg(short, long)]
        demand: Option<String>,
    },

    /// Evaluate each rule's context against the store
    Check {
        /// Path to the rulebook (TOML)
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Show store contents
    Status,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub fn execute(cli: Cli) -> Result<(), PsiError> {
    let config =
        PsiConfig::load(cli.config.as_deref())?.with_overrides(cli.database, cli.json_mode);
    let output = Output {
        json_mode: config.json_mode,
        verbose: cli.verbose,
        quiet: cli.quiet,
    };
    let command = cli.command.unwrap_or(Commands::Status);

    match &config.database {
        Some(path) => {
            tracing::debug!(database = %path.display(), "opening redb store");
            let psi = PsiRules::new(RedbAtomSpace::open(path)?)?;
            dispatch(psi, &config, output, command)
        }
        None => {
            tracing::debug!("using in-memory store");
            let psi = PsiRules::new(AtomSpace::new())?;
            dispatch(psi, &config, output, command)
        }
    }
}

fn dispatch<S: psi_core::AtomStore>(
    mut psi: PsiRules<S>,
    config: &PsiConfig,
    output: Output,
    command: Commands,
) -> Result<(), PsiError> {
    match command {
        Commands::Load { file } => cmd_load(&mut psi, config, output, &file),
        Commands::Rules { file, demand } => {
            cmd_rules(&mut psi, config, output, &file, demand.as_deref())
        }
        Commands::Check { file } => cmd_check(&mut psi, config, output, &file),
        Commands::Status => cmd_status(&psi, output),
    }
}
