// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Row types for the two input tables and their CSV decoding.
//!
//! Both tables are `;`-separated UTF-8 files, optionally starting with a
//! byte-order mark (spreadsheet exports usually add one).
//!
//! # User config (`user_config.csv`)
//! ```text
//! dataset;framework;model_name;prompt_collection;system_prompt;metrics;only_evaluate_metrics;metrics_aggregators;filter_doc_class;filter_question_type
//! Passport_MINI;Hugging Face;Qwen2-VL-2B;AntonShiryaev.csv;;['WER', 'CER'];False;['by_id', 'overall'];;
//! ```
//!
//! # VLM base (`vlm_base.csv`)
//! ```text
//! framework;model_name;docker_image;python_package;module;class_name
//! Hugging Face;Qwen2-VL-2B;ghcr.io/vlmhyperbenchteam/qwen2-vl:...;model_qwen2-vl;models;Qwen2VL_model
//! ```

use crate::literal::{is_null, parse_flag, parse_str_list};
use crate::ConfigError;

/// Field separator used by both tables.
pub const DELIMITER: u8 = b';';

const USER_TABLE: &str = "user config";
const BASE_TABLE: &str = "VLM base";

/// One parsed row of the user config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserConfigRow {
    /// 1-based data row number (header excluded).
    pub row: usize,
    pub dataset: String,
    pub framework: String,
    pub model_name: String,
    pub prompt_collection: String,
    pub system_prompt: Option<String>,
    pub metrics: Option<Vec<String>>,
    pub only_evaluate_metrics: bool,
    pub metrics_aggregators: Option<Vec<String>>,
    pub filter_doc_class: Option<String>,
    pub filter_question_type: Option<String>,
    /// Overrides the image from the VLM base when set.
    pub docker_image: Option<String>,
}

/// One row of the VLM base: how to run a model in a given framework.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VlmBaseEntry {
    pub framework: String,
    pub model_name: String,
    pub docker_image: String,
    pub python_package: String,
    pub module: String,
    pub class_name: String,
}

impl VlmBaseEntry {
    /// Returns `true` if this entry describes `model_name` in `framework`.
    pub fn matches(&self, framework: &str, model_name: &str) -> bool {
        self.framework == framework && self.model_name == model_name
    }
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RawUserRow {
    dataset: Option<String>,
    framework: Option<String>,
    model_name: Option<String>,
    prompt_collection: Option<String>,
    system_prompt: Option<String>,
    metrics: Option<String>,
    only_evaluate_metrics: Option<String>,
    metrics_aggregators: Option<String>,
    filter_doc_class: Option<String>,
    filter_question_type: Option<String>,
    docker_image: Option<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct RawBaseRow {
    framework: Option<String>,
    model_name: Option<String>,
    docker_image: Option<String>,
    python_package: Option<String>,
    module: Option<String>,
    class_name: Option<String>,
}

/// Parses the content of a user config table.
pub fn parse_user_config(content: &str) -> Result<Vec<UserConfigRow>, ConfigError> {
    decode_rows::<RawUserRow>(content, USER_TABLE)?
        .into_iter()
        .map(|(row, raw)| -> Result<UserConfigRow, ConfigError> {
            let required = |value: Option<String>, column: &'static str| {
                required(value, USER_TABLE, row, column)
            };
            let list = |value: Option<String>, column: &'static str| {
                parse_str_list(value.as_deref().unwrap_or_default()).map_err(|detail| {
                    ConfigError::InvalidValue {
                        table: USER_TABLE,
                        row,
                        column,
                        detail,
                    }
                })
            };

            let only_evaluate_metrics =
                parse_flag(raw.only_evaluate_metrics.as_deref().unwrap_or_default()).map_err(
                    |detail| ConfigError::InvalidValue {
                        table: USER_TABLE,
                        row,
                        column: "only_evaluate_metrics",
                        detail,
                    },
                )?;

            Ok(UserConfigRow {
                row,
                dataset: required(raw.dataset, "dataset")?,
                framework: required(raw.framework, "framework")?,
                model_name: required(raw.model_name, "model_name")?,
                prompt_collection: required(raw.prompt_collection, "prompt_collection")?,
                system_prompt: optional(raw.system_prompt),
                metrics: list(raw.metrics, "metrics")?,
                only_evaluate_metrics,
                metrics_aggregators: list(raw.metrics_aggregators, "metrics_aggregators")?,
                filter_doc_class: optional(raw.filter_doc_class),
                filter_question_type: optional(raw.filter_question_type),
                docker_image: optional(raw.docker_image),
            })
        })
        .collect()
}

/// Parses the content of a VLM base table.
pub fn parse_vlm_base(content: &str) -> Result<Vec<VlmBaseEntry>, ConfigError> {
    decode_rows::<RawBaseRow>(content, BASE_TABLE)?
        .into_iter()
        .map(|(row, raw)| -> Result<VlmBaseEntry, ConfigError> {
            let required = |value: Option<String>, column: &'static str| {
                required(value, BASE_TABLE, row, column)
            };
            Ok(VlmBaseEntry {
                framework: required(raw.framework, "framework")?,
                model_name: required(raw.model_name, "model_name")?,
                docker_image: required(raw.docker_image, "docker_image")?,
                python_package: required(raw.python_package, "python_package")?,
                module: required(raw.module, "module")?,
                class_name: required(raw.class_name, "class_name")?,
            })
        })
        .collect()
}

/// Decodes every data row of a `;`-separated table, numbering rows from 1.
fn decode_rows<T: serde::de::DeserializeOwned>(
    content: &str,
    table: &'static str,
) -> Result<Vec<(usize, T)>, ConfigError> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(DELIMITER)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    reader
        .deserialize::<T>()
        .enumerate()
        .map(|(i, record)| {
            let row = i + 1;
            record
                .map(|r| (row, r))
                .map_err(|source| ConfigError::CsvError { table, row, source })
        })
        .collect()
}

fn optional(value: Option<String>) -> Option<String> {
    value.filter(|v| !is_null(v))
}

fn required(
    value: Option<String>,
    table: &'static str,
    row: usize,
    column: &'static str,
) -> Result<String, ConfigError> {
    optional(value).ok_or(ConfigError::MissingColumn { table, row, column })
}
