// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for reading benchmark configuration tables.

/// Errors that can occur while loading or joining benchmark configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A configuration file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadError {
        path: String,
        source: std::io::Error,
    },

    /// A CSV record could not be decoded.
    #[error("malformed {table} at row {row}: {source}")]
    CsvError {
        table: &'static str,
        row: usize,
        source: csv::Error,
    },

    /// A required cell is missing or empty.
    #[error("{table} row {row}: missing required column '{column}'")]
    MissingColumn {
        table: &'static str,
        row: usize,
        column: &'static str,
    },

    /// A cell holds a value that cannot be interpreted.
    #[error("{table} row {row}: invalid value in column '{column}': {detail}")]
    InvalidValue {
        table: &'static str,
        row: usize,
        column: &'static str,
        detail: String,
    },

    /// The user config references a model that the VLM base does not know.
    #[error(
        "user config row {row}: no VLM base entry for framework '{framework}' and model '{model_name}'"
    )]
    ModelNotInBase {
        row: usize,
        framework: String,
        model_name: String,
    },

    /// A run config could not be written to disk.
    #[error("failed to write {path}: {source}")]
    WriteError {
        path: String,
        source: std::io::Error,
    },

    /// A run config JSON document is malformed.
    #[error("run config JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}
