// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # run-config
//!
//! Builds the list of benchmark runs from two `;`-separated tables:
//!
//! - **User config** (`user_config.csv`): one row per run the user wants,
//!   naming the dataset, the framework + model pair, the prompt collection
//!   and the metrics to evaluate.
//! - **VLM base** (`vlm_base.csv`): the reference table that maps each
//!   framework + model pair to its image and Python entry point.
//!
//! [`UserConfigReader`] joins the two into [`BenchmarkRunConfig`]s, which
//! the orchestrator turns into container stages.
//!
//! # Example
//! ```no_run
//! use run_config::UserConfigReader;
//! use std::path::Path;
//!
//! let runs = UserConfigReader::new(
//!     Path::new("vlmhyperbench/user_config.csv"),
//!     Path::new(run_config::DEFAULT_VLM_BASE_PATH),
//! )
//! .and_then(|r| r.read_user_config())
//! .unwrap();
//! println!("{} runs", runs.len());
//! ```

mod error;
mod literal;
mod reader;
mod run_config;
pub mod tables;

pub use error::ConfigError;
pub use reader::{UserConfigReader, DEFAULT_VLM_BASE_PATH};
pub use run_config::BenchmarkRunConfig;
pub use tables::{UserConfigRow, VlmBaseEntry};
