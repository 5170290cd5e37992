// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # orchestrator
//!
//! Drives the benchmark pipeline: one or two containers per run of the
//! user config, strictly one after the other.
//!
//! The orchestrator takes:
//! - An [`OrchestratorConfig`] naming the input tables, volumes,
//!   environment and stage scripts.
//! - The joined runs from `run-config`.
//! - A [`container_runner::ContainerEngine`] to launch containers on.
//!
//! And produces a [`BenchmarkReport`] with the outcome of every stage.
//!
//! # Type-State Pipeline
//! ```text
//! BenchmarkOrchestrator<Idle> → BenchmarkOrchestrator<Planned> → BenchmarkOrchestrator<Ready>
//! ```
//! Transitions are compile-time checked.

mod config;
mod error;
mod pipeline;
mod plan;
mod report;

pub use config::{OrchestratorConfig, StageConfig, DEFAULT_USER_CONFIG_PATH};
pub use error::OrchestratorError;
pub use pipeline::{BenchmarkOrchestrator, Idle, PipelineState, Planned, Ready};
pub use plan::{plan_run, BenchmarkPlan, RunPlan, StageKind, StagePlan};
pub use report::{BenchmarkReport, StageRecord, StageStatus};
