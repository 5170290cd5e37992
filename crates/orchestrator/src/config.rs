// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pipeline configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! user_config = "vlmhyperbench/user_config.csv"
//! vlm_base = "vlmhyperbench/vlm_base.csv"
//! cfg_dir = "pipeline/data/cfg"
//! keep_containers = false
//! forward_env = ["HUGGING_FACE_TOKEN"]
//!
//! [env]
//! HF_HOME = "/workspace/data/hf_cache"
//!
//! [[volumes]]
//! host = "pipeline/data"
//! container = "/workspace/data"
//!
//! [benchmark_stage]
//! script = "/workspace/bench_stages/run_vlm.py"
//! packages = ["wheels/benchmark_scheduler-0.1.0-py3-none-any.whl"]
//! use_gpu = true
//!
//! [evaluation_stage]
//! script = "/workspace/bench_stages/run_eval.py"
//! ```
//!
//! Every key is optional; missing keys take the values of
//! [`OrchestratorConfig::default`].

use container_runner::VolumeMount;
use run_config::DEFAULT_VLM_BASE_PATH;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default location of the user config table.
pub const DEFAULT_USER_CONFIG_PATH: &str = "vlmhyperbench/user_config.csv";

/// How one pipeline stage is launched.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StageConfig {
    /// Script path inside the container, run with `python -u`.
    pub script: String,
    /// Packages installed with `pip` before the script starts.
    #[serde(default)]
    pub packages: Vec<String>,
    /// Whether the container gets access to every GPU.
    #[serde(default)]
    pub use_gpu: bool,
    /// Image override. Defaults to the run's `docker_image`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl StageConfig {
    /// Model inference over the dataset.
    pub fn benchmark() -> Self {
        Self {
            script: "/workspace/bench_stages/run_vlm.py".to_string(),
            packages: vec!["wheels/benchmark_scheduler-0.1.0-py3-none-any.whl".to_string()],
            use_gpu: true,
            image: None,
        }
    }

    /// Metric computation over the stored answers.
    pub fn evaluation() -> Self {
        Self {
            script: "/workspace/bench_stages/run_eval.py".to_string(),
            packages: Vec::new(),
            use_gpu: false,
            image: None,
        }
    }
}

/// Configuration for the benchmark pipeline.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Path to the `;`-separated user config table.
    pub user_config: PathBuf,
    /// Path to the `;`-separated VLM base table.
    pub vlm_base: PathBuf,
    /// Directory receiving one JSON dump per run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cfg_dir: Option<PathBuf>,
    /// Leave containers running after their script exits.
    pub keep_containers: bool,
    /// Host environment variables copied into every container when set.
    pub forward_env: Vec<String>,
    /// Bind mounts shared by every stage. Relative host paths are resolved
    /// against the working directory.
    pub volumes: Vec<VolumeMount>,
    /// Benchmark stage launch parameters.
    pub benchmark_stage: StageConfig,
    /// Evaluation stage launch parameters.
    pub evaluation_stage: StageConfig,
    /// Extra variables passed to every container.
    pub env: BTreeMap<String, String>,
}

impl OrchestratorConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, super::OrchestratorError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            super::OrchestratorError::ConfigError(format!(
                "cannot read config '{}': {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, super::OrchestratorError> {
        let config: Self = toml::from_str(toml_str).map_err(|e| {
            super::OrchestratorError::ConfigError(format!("TOML parse error: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, super::OrchestratorError> {
        toml::to_string_pretty(self).map_err(|e| {
            super::OrchestratorError::ConfigError(format!("TOML serialise error: {e}"))
        })
    }

    /// Checks values that TOML typing alone cannot rule out.
    pub fn validate(&self) -> Result<(), super::OrchestratorError> {
        let invalid = |msg: String| Err(super::OrchestratorError::ConfigError(msg));

        for (name, stage) in [
            ("benchmark_stage", &self.benchmark_stage),
            ("evaluation_stage", &self.evaluation_stage),
        ] {
            if stage.script.trim().is_empty() {
                return invalid(format!("{name}.script is empty"));
            }
            if stage.image.as_deref().is_some_and(|i| i.trim().is_empty()) {
                return invalid(format!("{name}.image is empty"));
            }
        }
        for name in self.forward_env.iter().chain(self.env.keys()) {
            if name.is_empty() || name.contains('=') {
                return invalid(format!("invalid environment variable name '{name}'"));
            }
        }
        for v in &self.volumes {
            if !v.container.starts_with('/') {
                return invalid(format!(
                    "volume container path '{}' is not absolute",
                    v.container
                ));
            }
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            user_config: PathBuf::from(DEFAULT_USER_CONFIG_PATH),
            vlm_base: PathBuf::from(DEFAULT_VLM_BASE_PATH),
            cfg_dir: None,
            keep_containers: false,
            forward_env: Vec::new(),
            volumes: vec![
                VolumeMount::new("pipeline/data", "/workspace/data"),
                VolumeMount::new("pipeline/bench_stages", "/workspace/bench_stages"),
                VolumeMount::new("pipeline/wheels", "/workspace/wheels"),
            ],
            benchmark_stage: StageConfig::benchmark(),
            evaluation_stage: StageConfig::evaluation(),
            env: BTreeMap::new(),
        }
    }
}
