// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Joins the user config against the VLM base.
//!
//! Each user row names a `(framework, model_name)` pair. The VLM base maps
//! that pair to the image and Python entry point needed to run the model;
//! the join produces one [`BenchmarkRunConfig`] per user row.

use crate::tables::{parse_user_config, parse_vlm_base, UserConfigRow, VlmBaseEntry};
use crate::{BenchmarkRunConfig, ConfigError};
use std::path::Path;

/// Default location of the VLM base table.
pub const DEFAULT_VLM_BASE_PATH: &str = "vlmhyperbench/vlm_base.csv";

/// Reads `user_config.csv` and completes every row from the VLM base.
///
/// # Example
/// ```no_run
/// use run_config::UserConfigReader;
/// use std::path::Path;
///
/// let reader = UserConfigReader::new(
///     Path::new("vlmhyperbench/user_config.csv"),
///     Path::new("vlmhyperbench/vlm_base.csv"),
/// )
/// .unwrap();
/// for run in reader.read_user_config().unwrap() {
///     println!("{}", run.summary());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct UserConfigReader {
    user_rows: Vec<UserConfigRow>,
    vlm_base: Vec<VlmBaseEntry>,
}

impl UserConfigReader {
    /// Loads both tables from disk.
    pub fn new(config_path: &Path, vlm_base_path: &Path) -> Result<Self, ConfigError> {
        let user_rows = Self::load_user_config(config_path)?;
        let vlm_base = Self::load_vlm_base(vlm_base_path)?;
        Ok(Self::from_tables(user_rows, vlm_base))
    }

    /// Builds a reader from already-parsed tables.
    pub fn from_tables(user_rows: Vec<UserConfigRow>, vlm_base: Vec<VlmBaseEntry>) -> Self {
        warn_on_duplicate_models(&vlm_base);
        Self {
            user_rows,
            vlm_base,
        }
    }

    /// Builds a reader from the CSV text of both tables.
    pub fn from_csv(user_config: &str, vlm_base: &str) -> Result<Self, ConfigError> {
        Ok(Self::from_tables(
            parse_user_config(user_config)?,
            parse_vlm_base(vlm_base)?,
        ))
    }

    /// Loads the user config table from a file.
    pub fn load_user_config(path: &Path) -> Result<Vec<UserConfigRow>, ConfigError> {
        let rows = parse_user_config(&read_table(path)?)?;
        tracing::debug!("loaded {} user config rows from {}", rows.len(), path.display());
        Ok(rows)
    }

    /// Loads the VLM base table from a file.
    pub fn load_vlm_base(path: &Path) -> Result<Vec<VlmBaseEntry>, ConfigError> {
        let entries = parse_vlm_base(&read_table(path)?)?;
        tracing::debug!("loaded {} VLM base entries from {}", entries.len(), path.display());
        Ok(entries)
    }

    /// Parsed user config rows, in file order.
    pub fn user_rows(&self) -> &[UserConfigRow] {
        &self.user_rows
    }

    /// Parsed VLM base entries, in file order.
    pub fn vlm_base(&self) -> &[VlmBaseEntry] {
        &self.vlm_base
    }

    /// Returns the first VLM base entry for the given framework and model.
    pub fn lookup(&self, framework: &str, model_name: &str) -> Option<&VlmBaseEntry> {
        self.vlm_base
            .iter()
            .find(|e| e.matches(framework, model_name))
    }

    /// Builds one run config per user row, preserving file order.
    ///
    /// Fails on the first row whose model is missing from the VLM base.
    pub fn read_user_config(&self) -> Result<Vec<BenchmarkRunConfig>, ConfigError> {
        self.user_rows
            .iter()
            .map(|row| -> Result<BenchmarkRunConfig, ConfigError> {
                let entry = self.lookup(&row.framework, &row.model_name).ok_or_else(|| {
                    ConfigError::ModelNotInBase {
                        row: row.row,
                        framework: row.framework.clone(),
                        model_name: row.model_name.clone(),
                    }
                })?;
                Ok(join_row(row, entry))
            })
            .collect()
    }
}

fn join_row(row: &UserConfigRow, entry: &VlmBaseEntry) -> BenchmarkRunConfig {
    let docker_image = match &row.docker_image {
        Some(image) => {
            tracing::debug!(
                "row {}: image override '{image}' replaces '{}'",
                row.row,
                entry.docker_image,
            );
            image.clone()
        }
        None => entry.docker_image.clone(),
    };

    BenchmarkRunConfig {
        dataset: row.dataset.clone(),
        framework: row.framework.clone(),
        model_name: row.model_name.clone(),
        prompt_collection: row.prompt_collection.clone(),
        docker_image,
        python_package: entry.python_package.clone(),
        module: entry.module.clone(),
        class_name: entry.class_name.clone(),
        system_prompt: row.system_prompt.clone(),
        metrics: row.metrics.clone(),
        only_evaluate_metrics: row.only_evaluate_metrics,
        metrics_aggregators: row.metrics_aggregators.clone(),
        filter_doc_class: row.filter_doc_class.clone(),
        filter_question_type: row.filter_question_type.clone(),
    }
}

fn read_table(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })
}

fn warn_on_duplicate_models(vlm_base: &[VlmBaseEntry]) {
    let mut seen = std::collections::HashSet::new();
    for entry in vlm_base {
        if !seen.insert((entry.framework.as_str(), entry.model_name.as_str())) {
            tracing::warn!(
                "VLM base lists '{}' in '{}' more than once; the first entry wins",
                entry.model_name,
                entry.framework,
            );
        }
    }
}
