// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The flat record describing one benchmark run.
//!
//! A [`BenchmarkRunConfig`] is what the orchestrator hands to the stage
//! containers: which model to load (package, module, class), which image
//! to run it in, which dataset and prompts to evaluate, and which metrics
//! to compute afterwards.
//!
//! # JSON Format
//! ```json
//! {
//!   "dataset": "Passport_MINI",
//!   "framework": "Hugging Face",
//!   "model_name": "Qwen2-VL-2B",
//!   "prompt_collection": "AntonShiryaev.csv",
//!   "docker_image": "ghcr.io/vlmhyperbenchteam/qwen2-vl:ubuntu22.04-cu124-torch2.4.0_v0.1.0",
//!   "python_package": "model_qwen2-vl",
//!   "module": "models",
//!   "class_name": "Qwen2VL_model",
//!   "system_prompt": null,
//!   "metrics": ["WER", "CER"],
//!   "only_evaluate_metrics": false,
//!   "metrics_aggregators": ["by_id", "overall"],
//!   "filter_doc_class": null,
//!   "filter_question_type": null
//! }
//! ```

use crate::ConfigError;
use std::path::Path;

/// All parameters of a single "model over dataset" benchmark run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BenchmarkRunConfig {
    /// Dataset the model is evaluated on.
    pub dataset: String,
    /// Inference framework (e.g. `"Hugging Face"`, `"vLLM"`, `"SgLang"`).
    pub framework: String,
    /// Model identifier (e.g. `"Qwen2-VL-2B"`).
    pub model_name: String,
    /// CSV file holding the prompt collection used for this run.
    pub prompt_collection: String,
    /// Image the benchmark stage runs in.
    pub docker_image: String,
    /// Python package that provides the model class.
    pub python_package: String,
    /// Module inside [`Self::python_package`] that defines the model class.
    pub module: String,
    /// Model class name.
    pub class_name: String,

    /// Text file with the system prompt passed at model initialisation.
    #[serde(default)]
    pub system_prompt: Option<String>,
    /// Metrics computed over the model answers (e.g. `WER`, `CER`, `BLEU`).
    #[serde(default)]
    pub metrics: Option<Vec<String>>,
    /// Skip the benchmark stage and only evaluate existing answers.
    #[serde(default)]
    pub only_evaluate_metrics: bool,
    /// Aggregation levels for the metrics (e.g. `by_id`, `by_doc_type`, `overall`).
    #[serde(default)]
    pub metrics_aggregators: Option<Vec<String>>,
    /// Keep only annotation rows whose `doc_class` equals this value.
    #[serde(default)]
    pub filter_doc_class: Option<String>,
    /// Keep only annotation rows whose `question_type` equals this value.
    #[serde(default)]
    pub filter_question_type: Option<String>,
}

impl BenchmarkRunConfig {
    /// Returns `true` if the model must be run over the dataset.
    pub fn runs_benchmark(&self) -> bool {
        !self.only_evaluate_metrics
    }

    /// Returns `true` if metrics must be computed over the model answers.
    ///
    /// Both the metric list and the aggregator list have to be non-empty.
    pub fn runs_evaluation(&self) -> bool {
        let non_empty = |v: &Option<Vec<String>>| v.as_ref().is_some_and(|v| !v.is_empty());
        non_empty(&self.metrics) && non_empty(&self.metrics_aggregators)
    }

    /// Short human-readable name, `model@dataset`.
    pub fn label(&self) -> String {
        format!("{}@{}", self.model_name, self.dataset)
    }

    /// Filesystem-safe stem built from the model and dataset names.
    pub fn file_stem(&self) -> String {
        format!("{}_{}", self.model_name, self.dataset)
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect()
    }

    /// Returns a one-line summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let list = |v: &Option<Vec<String>>| match v {
            Some(items) if !items.is_empty() => items.join(","),
            _ => "-".to_string(),
        };
        format!(
            "{} [{}] image={} class={}.{}.{} metrics={} aggregators={}",
            self.label(),
            self.framework,
            self.docker_image,
            self.python_package,
            self.module,
            self.class_name,
            list(&self.metrics),
            list(&self.metrics_aggregators),
        )
    }

    /// Serialises the config to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parses a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Writes the config as JSON to `path`.
    pub fn to_json_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|e| ConfigError::WriteError {
            path: path.display().to_string(),
            source: e,
        })
    }

    /// Loads a config from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }
}
