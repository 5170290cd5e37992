// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # vlmbench
//!
//! Command-line interface for the VLM benchmark pipeline.
//!
//! ## Usage
//! ```bash
//! # Benchmark and evaluate every run of the user config
//! vlmbench run --user-config vlmhyperbench/user_config.csv
//!
//! # Same, with settings from a file and containers kept for debugging
//! vlmbench -c vlmbench.toml run --keep-containers --report report.json
//!
//! # Show the joined runs and their stages without starting anything
//! vlmbench plan
//!
//! # Check the Docker daemon
//! vlmbench status
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "vlmbench",
    about = "Sequential Docker-based benchmark runner for vision-language models",
    version,
    author
)]
struct Cli {
    /// Path to a TOML configuration file (CLI arguments override it).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the benchmark and evaluation stages of every configured run.
    Run {
        #[command(flatten)]
        tables: commands::TableArgs,

        /// Leave containers running after their script exits; Ctrl-C detaches
        /// from a kept container and moves on to the next stage.
        #[arg(long)]
        keep_containers: bool,

        /// Directory receiving one JSON dump per run.
        #[arg(long)]
        cfg_dir: Option<PathBuf>,

        /// Write the run report as JSON to this file.
        #[arg(long)]
        report: Option<PathBuf>,

        /// Record container launches instead of talking to Docker, and write
        /// no run dumps.
        #[arg(long)]
        dry_run: bool,
    },

    /// Join the tables and print the planned stages without running them.
    Plan {
        #[command(flatten)]
        tables: commands::TableArgs,

        /// Print the plan as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Display the Docker daemon version and GPU runtime support.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            tables,
            keep_containers,
            cfg_dir,
            report,
            dry_run,
        } => {
            let mut config = commands::load_config(cli.config.as_deref(), &tables)?;
            config.keep_containers |= keep_containers;
            if cfg_dir.is_some() {
                config.cfg_dir = cfg_dir;
            }
            commands::run::execute(config, report, dry_run).await
        }
        Commands::Plan { tables, json } => {
            let config = commands::load_config(cli.config.as_deref(), &tables)?;
            commands::plan::execute(config, json).await
        }
        Commands::Status => commands::status::execute().await,
    }
}
