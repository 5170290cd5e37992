// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommand implementations and shared CLI helpers.

pub mod plan;
pub mod run;
pub mod status;

use orchestrator::OrchestratorConfig;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Table locations shared by `run` and `plan`.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct TableArgs {
    /// Path to the `;`-separated user config.
    #[arg(short, long)]
    pub user_config: Option<PathBuf>,

    /// Path to the `;`-separated VLM base.
    #[arg(long)]
    pub vlm_base: Option<PathBuf>,
}

/// Installs the global fmt subscriber.
///
/// `RUST_LOG` takes precedence over the `-v` count.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads the config file, if any, and applies table overrides.
pub fn load_config(path: Option<&Path>, tables: &TableArgs) -> anyhow::Result<OrchestratorConfig> {
    let mut config = match path {
        Some(path) => OrchestratorConfig::from_file(path)?,
        None => OrchestratorConfig::default(),
    };
    if let Some(user_config) = &tables.user_config {
        config.user_config = user_config.clone();
    }
    if let Some(vlm_base) = &tables.vlm_base {
        config.vlm_base = vlm_base.clone();
    }
    Ok(config)
}

/// Prints a boxed command banner.
pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║{:^54}║", title);
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}
