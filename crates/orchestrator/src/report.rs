// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Per-stage outcomes of a pipeline run.
//!
//! [`BenchmarkReport`] collects one [`StageRecord`] per stage the
//! pipeline reached, plus aggregate counts and wall-clock time.

use crate::plan::StageKind;
use crate::OrchestratorError;
use std::path::Path;
use std::time::Duration;

/// Final state of one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    /// The container exited with code 0.
    Succeeded,
    /// Non-zero exit code or engine error.
    Failed,
    /// Not launched.
    Skipped,
    /// Stopped by the user while running.
    Interrupted,
    /// Kept container left running after the user stopped streaming it.
    Detached,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Succeeded => "succeeded",
            StageStatus::Failed => "failed",
            StageStatus::Skipped => "skipped",
            StageStatus::Interrupted => "interrupted",
            StageStatus::Detached => "detached",
        }
    }
}

/// Outcome of a single stage.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StageRecord {
    /// 1-based run index.
    pub run_index: usize,
    /// Run label, `model@dataset`.
    pub run: String,
    /// `None` for a run without any stage.
    pub stage: Option<StageKind>,
    pub image: Option<String>,
    pub container_id: Option<String>,
    pub exit_code: Option<i64>,
    pub status: StageStatus,
    /// Error message or skip reason.
    pub detail: Option<String>,
    pub duration: Duration,
}

impl StageRecord {
    /// Returns a one-line description suitable for CLI output.
    pub fn summary(&self) -> String {
        let stage = self.stage.map_or("-", |s| s.as_str());
        let mut line = format!(
            "#{} {} {}: {}",
            self.run_index,
            self.run,
            stage,
            self.status.as_str()
        );
        if let Some(code) = self.exit_code {
            line.push_str(&format!(" (exit {code})"));
        }
        if self.duration > Duration::ZERO {
            line.push_str(&format!(" in {:.1}s", self.duration.as_secs_f64()));
        }
        if let Some(detail) = &self.detail {
            line.push_str(&format!(": {detail}"));
        }
        line
    }
}

/// Aggregate outcome of a pipeline run.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct BenchmarkReport {
    /// Stage records in execution order.
    pub records: Vec<StageRecord>,
    /// Total wall-clock time.
    pub total_duration: Duration,
    /// Whether the user stopped the pipeline.
    pub interrupted: bool,
    /// Stages never reached because of the interrupt.
    pub not_started: usize,
}

impl BenchmarkReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a stage record.
    pub fn record(&mut self, record: StageRecord) {
        tracing::debug!("{}", record.summary());
        self.records.push(record);
    }

    /// Finalises the report with the total wall-clock time.
    pub fn finalise(&mut self, total: Duration) {
        self.total_duration = total;
    }

    /// Number of records with the given status.
    pub fn count(&self, status: StageStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// Returns `true` if any stage failed.
    pub fn has_failures(&self) -> bool {
        self.count(StageStatus::Failed) > 0
    }

    /// Returns `true` if every reached stage succeeded or was skipped and
    /// the pipeline was not interrupted.
    pub fn is_success(&self) -> bool {
        !self.interrupted && !self.has_failures() && self.count(StageStatus::Interrupted) == 0
    }

    /// Records of the given run, in order.
    pub fn run_records(&self, run_index: usize) -> impl Iterator<Item = &StageRecord> {
        self.records.iter().filter(move |r| r.run_index == run_index)
    }

    /// Returns a human-readable summary suitable for CLI output.
    pub fn summary(&self) -> String {
        let mut s = format!(
            "Pipeline: {:.1}s total, {} stages: {} succeeded, {} failed, {} skipped, {} interrupted",
            self.total_duration.as_secs_f64(),
            self.records.len(),
            self.count(StageStatus::Succeeded),
            self.count(StageStatus::Failed),
            self.count(StageStatus::Skipped),
            self.count(StageStatus::Interrupted),
        );
        let detached = self.count(StageStatus::Detached);
        if detached > 0 {
            s.push_str(&format!(", {detached} detached"));
        }
        if self.interrupted {
            s.push_str(&format!(", stopped by user ({} not started)", self.not_started));
        }
        s
    }

    /// Writes the report as pretty-printed JSON to `path`.
    pub fn to_json_file(&self, path: &Path) -> Result<(), OrchestratorError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|e| OrchestratorError::WriteError {
            path: path.display().to_string(),
            source: e,
        })
    }
}
