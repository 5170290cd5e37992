// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the benchmark pipeline.

/// Errors that abort a pipeline before or between container launches.
///
/// A stage container exiting non-zero is not an error: it is recorded in
/// the [`crate::BenchmarkReport`] and the pipeline moves on.
#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    /// The orchestrator configuration is unreadable or inconsistent.
    #[error("configuration error: {0}")]
    ConfigError(String),

    /// The user config or VLM base could not be loaded or joined.
    #[error("run config error: {0}")]
    RunConfig(#[from] run_config::ConfigError),

    /// Volume resolution or another container-side step failed.
    #[error("container error: {0}")]
    Container(#[from] container_runner::ContainerError),

    /// A file or directory could not be written.
    #[error("cannot write '{path}': {source}")]
    WriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The report could not be serialised.
    #[error("report serialisation failed: {0}")]
    JsonError(#[from] serde_json::Error),
}
