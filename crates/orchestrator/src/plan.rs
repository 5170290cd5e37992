// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Stage plan: which containers each run needs, in which order.
//!
//! Every run goes through at most two stages, always in the same order:
//! the benchmark stage runs the model over the dataset, then the
//! evaluation stage computes metrics over the stored answers. A run
//! configured to only evaluate metrics skips the first stage; a run
//! without metrics or aggregators skips the second.

use crate::config::{OrchestratorConfig, StageConfig};
use run_config::BenchmarkRunConfig;
use std::fmt;

/// One of the two pipeline stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Benchmark,
    Evaluation,
}

impl StageKind {
    /// Lowercase name, also exported to containers as `BENCH_STAGE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::Benchmark => "benchmark",
            StageKind::Evaluation => "evaluation",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single container launch within a run.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StagePlan {
    pub kind: StageKind,
    pub image: String,
    pub script: String,
    pub packages: Vec<String>,
    pub use_gpu: bool,
}

impl StagePlan {
    fn from_config(kind: StageKind, stage: &StageConfig, run: &BenchmarkRunConfig) -> Self {
        Self {
            kind,
            image: stage
                .image
                .clone()
                .unwrap_or_else(|| run.docker_image.clone()),
            script: stage.script.clone(),
            packages: stage.packages.clone(),
            use_gpu: stage.use_gpu,
        }
    }
}

/// The stages of one benchmark run.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RunPlan {
    /// 1-based position in the user config.
    pub index: usize,
    pub run: BenchmarkRunConfig,
    pub stages: Vec<StagePlan>,
}

impl RunPlan {
    pub fn label(&self) -> String {
        self.run.label()
    }

    /// Returns `true` if the run has nothing to execute.
    pub fn is_skipped(&self) -> bool {
        self.stages.is_empty()
    }

    /// Name of the JSON dump written for this run.
    pub fn dump_file_name(&self) -> String {
        format!("{}_{}.json", self.index, self.run.file_stem())
    }

    pub fn summary(&self) -> String {
        let stages = if self.stages.is_empty() {
            "nothing to run".to_string()
        } else {
            self.stages
                .iter()
                .map(|s| format!("{} ({})", s.kind, s.image))
                .collect::<Vec<_>>()
                .join(" -> ")
        };
        format!("#{} {}: {}", self.index, self.label(), stages)
    }
}

/// Builds the stage list of one run.
pub fn plan_run(index: usize, run: BenchmarkRunConfig, config: &OrchestratorConfig) -> RunPlan {
    let mut stages = Vec::with_capacity(2);
    if run.runs_benchmark() {
        stages.push(StagePlan::from_config(
            StageKind::Benchmark,
            &config.benchmark_stage,
            &run,
        ));
    }
    if run.runs_evaluation() {
        stages.push(StagePlan::from_config(
            StageKind::Evaluation,
            &config.evaluation_stage,
            &run,
        ));
    }
    RunPlan { index, run, stages }
}

/// Ordered plan for every run of the user config.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BenchmarkPlan {
    pub runs: Vec<RunPlan>,
}

impl BenchmarkPlan {
    /// Plans `runs` in order, numbering them from 1.
    pub fn new(runs: Vec<BenchmarkRunConfig>, config: &OrchestratorConfig) -> Self {
        let runs = runs
            .into_iter()
            .enumerate()
            .map(|(i, run)| plan_run(i + 1, run, config))
            .collect();
        Self { runs }
    }

    pub fn num_runs(&self) -> usize {
        self.runs.len()
    }

    /// Total number of container launches.
    pub fn num_stages(&self) -> usize {
        self.runs.iter().map(|r| r.stages.len()).sum()
    }

    /// Number of stages of the given kind.
    pub fn count(&self, kind: StageKind) -> usize {
        self.runs
            .iter()
            .flat_map(|r| &r.stages)
            .filter(|s| s.kind == kind)
            .count()
    }

    /// Runs that have no stage at all.
    pub fn skipped_runs(&self) -> usize {
        self.runs.iter().filter(|r| r.is_skipped()).count()
    }

    /// Returns a human-readable summary of the plan.
    pub fn summary(&self) -> String {
        format!(
            "Plan: {} runs, {} containers ({} benchmark, {} evaluation), {} skipped",
            self.num_runs(),
            self.num_stages(),
            self.count(StageKind::Benchmark),
            self.count(StageKind::Evaluation),
            self.skipped_runs(),
        )
    }
}
