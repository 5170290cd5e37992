// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The benchmark pipeline with type-state–enforced setup.
//!
//! ```text
//! BenchmarkOrchestrator<Idle>
//!     │  .load_runs()
//!     ▼
//! BenchmarkOrchestrator<Planned>
//!     │  .prepare()
//!     ▼
//! BenchmarkOrchestrator<Ready>
//!     │  .run()
//!     ▼
//!   BenchmarkReport
//! ```
//!
//! Each state transition consumes the old value and returns a new one,
//! so a pipeline cannot launch containers before its volumes and
//! environment are resolved.

use crate::plan::{BenchmarkPlan, RunPlan, StageKind, StagePlan};
use crate::{BenchmarkReport, OrchestratorConfig, OrchestratorError, StageRecord, StageStatus};
use container_runner::{
    host_paths_to_abs, run_container, ContainerEngine, ContainerError, ContainerSpec, Interrupt,
    VolumeMount,
};
use run_config::{BenchmarkRunConfig, UserConfigReader};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Instant;

// ── Type-state markers ─────────────────────────────────────────

/// Pipeline is created but no runs are loaded.
#[derive(Debug)]
pub struct Idle;

/// Runs are loaded and their stages planned.
#[derive(Debug)]
pub struct Planned;

/// Volumes and environment are resolved; containers can be launched.
#[derive(Debug)]
pub struct Ready;

/// Sealed trait for pipeline states.
pub trait PipelineState: std::fmt::Debug {}
impl PipelineState for Idle {}
impl PipelineState for Planned {}
impl PipelineState for Ready {}

/// Host-side values resolved by `prepare`.
#[derive(Debug, Clone)]
struct Prepared {
    volumes: Vec<VolumeMount>,
    env: Vec<(String, String)>,
    cfg_dir: Option<PathBuf>,
    /// `cfg_dir` as seen from inside the containers, when it is mounted.
    cfg_mount: Option<String>,
}

// ── Orchestrator ───────────────────────────────────────────────

/// Sequential two-stage benchmark pipeline.
///
/// # Example
/// ```no_run
/// use container_runner::{DockerEngine, Interrupt};
/// use orchestrator::{BenchmarkOrchestrator, OrchestratorConfig};
///
/// # async fn example() -> Result<(), orchestrator::OrchestratorError> {
/// let pipeline = BenchmarkOrchestrator::new(OrchestratorConfig::default())
///     .load_runs()?
///     .prepare()?;
/// let engine = DockerEngine::connect()?;
/// let report = pipeline
///     .run(&engine, &mut std::io::stdout(), &Interrupt::new())
///     .await?;
/// println!("{}", report.summary());
/// # Ok(())
/// # }
/// ```
pub struct BenchmarkOrchestrator<S: PipelineState = Idle> {
    config: OrchestratorConfig,
    _state: std::marker::PhantomData<S>,
    plan: BenchmarkPlan,
    prepared: Option<Prepared>,
    /// Leave the host filesystem untouched.
    dry_run: bool,
}

// ── Idle → Planned ─────────────────────────────────────────────

impl BenchmarkOrchestrator<Idle> {
    /// Creates a new pipeline from the given configuration.
    pub fn new(config: OrchestratorConfig) -> Self {
        tracing::info!(
            "pipeline created for '{}' against '{}'",
            config.user_config.display(),
            config.vlm_base.display()
        );
        Self {
            config,
            _state: std::marker::PhantomData,
            plan: BenchmarkPlan::default(),
            prepared: None,
            dry_run: false,
        }
    }

    /// Reads and joins the user config, then plans every run.
    /// Transitions to the `Planned` state.
    pub fn load_runs(self) -> Result<BenchmarkOrchestrator<Planned>, OrchestratorError> {
        let reader = UserConfigReader::new(&self.config.user_config, &self.config.vlm_base)?;
        let runs = reader.read_user_config()?;
        Ok(BenchmarkOrchestrator::from_runs(self.config, runs))
    }

    /// Plans already-joined runs directly.
    pub fn from_runs(
        config: OrchestratorConfig,
        runs: Vec<BenchmarkRunConfig>,
    ) -> BenchmarkOrchestrator<Planned> {
        let plan = BenchmarkPlan::new(runs, &config);
        tracing::info!("{}", plan.summary());
        BenchmarkOrchestrator {
            config,
            _state: std::marker::PhantomData,
            plan,
            prepared: None,
            dry_run: false,
        }
    }
}

// ── Planned → Ready ────────────────────────────────────────────

impl BenchmarkOrchestrator<Planned> {
    /// Returns the stage plan.
    pub fn plan(&self) -> &BenchmarkPlan {
        &self.plan
    }

    /// Skips every host write: `cfg_dir` is not created and run dumps are
    /// not written, while `BENCH_RUN_CONFIG` is still computed.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Resolves host paths against the working directory.
    /// Transitions to the `Ready` state.
    pub fn prepare(self) -> Result<BenchmarkOrchestrator<Ready>, OrchestratorError> {
        let cwd = std::env::current_dir().map_err(ContainerError::CurrentDir)?;
        self.prepare_in(&cwd)
    }

    /// Resolves host paths against `base_dir`.
    ///
    /// Steps:
    /// 1. Make every volume host path absolute.
    /// 2. Collect forwarded host variables and the `[env]` table.
    /// 3. Create `cfg_dir` (unless dry-running) and find its mount point
    ///    inside the containers.
    pub fn prepare_in(
        self,
        base_dir: &Path,
    ) -> Result<BenchmarkOrchestrator<Ready>, OrchestratorError> {
        let volumes = host_paths_to_abs(&self.config.volumes, Some(base_dir))?;
        for v in &volumes {
            if !v.host.exists() {
                tracing::warn!("host path '{}' does not exist", v.host.display());
            }
        }

        let mut env = Vec::new();
        for name in &self.config.forward_env {
            match std::env::var(name) {
                Ok(value) => env.push((name.clone(), value)),
                Err(_) => tracing::warn!("'{name}' is not set in the host environment"),
            }
        }
        env.extend(
            self.config
                .env
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        tracing::debug!("forwarding {} environment variables", env.len());

        let cfg_dir = match &self.config.cfg_dir {
            Some(dir) if self.dry_run => Some(base_dir.join(dir)),
            Some(dir) => {
                let dir = base_dir.join(dir);
                std::fs::create_dir_all(&dir).map_err(|e| OrchestratorError::WriteError {
                    path: dir.display().to_string(),
                    source: e,
                })?;
                Some(dir)
            }
            None => None,
        };
        let cfg_mount = cfg_dir
            .as_deref()
            .and_then(|dir| container_path_for(&volumes, dir));
        if let (Some(dir), None) = (&cfg_dir, &cfg_mount) {
            tracing::info!(
                "cfg_dir '{}' is not under a mounted volume; BENCH_RUN_CONFIG will not be set",
                dir.display()
            );
        }

        Ok(BenchmarkOrchestrator {
            config: self.config,
            _state: std::marker::PhantomData,
            plan: self.plan,
            prepared: Some(Prepared {
                volumes,
                env,
                cfg_dir,
                cfg_mount,
            }),
            dry_run: self.dry_run,
        })
    }
}

// ── Ready: run the pipeline ────────────────────────────────────

impl BenchmarkOrchestrator<Ready> {
    /// Returns the stage plan.
    pub fn plan(&self) -> &BenchmarkPlan {
        &self.plan
    }

    /// Volumes with absolute host paths.
    pub fn volumes(&self) -> &[VolumeMount] {
        &self.prepared().volumes
    }

    /// Environment shared by every container.
    pub fn env(&self) -> &[(String, String)] {
        &self.prepared().env
    }

    /// Absolute directory receiving the per-run JSON dumps.
    pub fn cfg_dir(&self) -> Option<&Path> {
        self.prepared().cfg_dir.as_deref()
    }

    /// Builds the container launch for one stage of a run.
    pub fn container_spec(
        &self,
        run_plan: &RunPlan,
        stage: &StagePlan,
        run_config_path: Option<&str>,
    ) -> ContainerSpec {
        let prepared = self.prepared();
        let run = &run_plan.run;
        let spec = ContainerSpec::new(stage.image.clone(), stage.script.clone())
            .packages(stage.packages.clone())
            .volumes(prepared.volumes.clone())
            .use_gpu(stage.use_gpu)
            .keep_container(self.config.keep_containers)
            .envs(prepared.env.iter().cloned())
            .env("BENCH_STAGE", stage.kind.as_str())
            .env("BENCH_DATASET", &run.dataset)
            .env("BENCH_MODEL_NAME", &run.model_name)
            .env("BENCH_FRAMEWORK", &run.framework);
        match run_config_path {
            Some(path) => spec.env("BENCH_RUN_CONFIG", path),
            None => spec,
        }
    }

    /// Executes every planned stage, one container at a time.
    ///
    /// A failed benchmark stage skips the evaluation stage of the same
    /// run; later runs still execute. Once `interrupt` fires, no further
    /// container is started, unless it only detached from a kept container.
    pub async fn run(
        &self,
        engine: &dyn ContainerEngine,
        sink: &mut (dyn Write + Send),
        interrupt: &Interrupt,
    ) -> Result<BenchmarkReport, OrchestratorError> {
        let pipeline_start = Instant::now();
        let mut report = BenchmarkReport::new();
        let total = self.plan.num_runs();
        let mut stopped = false;

        tracing::info!(
            "starting {} runs ({} containers) on '{}'",
            total,
            self.plan.num_stages(),
            engine.name()
        );

        'runs: for run_plan in &self.plan.runs {
            if interrupt.is_triggered() {
                stopped = true;
                break;
            }
            tracing::info!("[{}/{}] {}", run_plan.index, total, run_plan.summary());

            if run_plan.is_skipped() {
                tracing::warn!(
                    "{}: benchmark disabled and no metrics to evaluate",
                    run_plan.label()
                );
                report.record(StageRecord {
                    run_index: run_plan.index,
                    run: run_plan.label(),
                    stage: None,
                    image: None,
                    container_id: None,
                    exit_code: None,
                    status: StageStatus::Skipped,
                    detail: Some("no stage selected".to_string()),
                    duration: std::time::Duration::ZERO,
                });
                continue;
            }

            let run_config_path = self.dump_run_config(run_plan)?;
            let mut benchmark_failed = false;

            for stage in &run_plan.stages {
                if interrupt.is_triggered() {
                    stopped = true;
                    break 'runs;
                }
                if stage.kind == StageKind::Evaluation && benchmark_failed {
                    tracing::warn!("{}: benchmark failed, skipping evaluation", run_plan.label());
                    report.record(stage_record(
                        run_plan,
                        stage,
                        StageStatus::Skipped,
                        Some("benchmark stage failed".to_string()),
                    ));
                    continue;
                }

                let record = self
                    .run_stage(engine, run_plan, stage, run_config_path.as_deref(), sink, interrupt)
                    .await;
                // A detached benchmark is still running its kept shell; evaluation proceeds.
                if stage.kind == StageKind::Benchmark
                    && !matches!(record.status, StageStatus::Succeeded | StageStatus::Detached)
                {
                    benchmark_failed = true;
                }
                let interrupted = record.status == StageStatus::Interrupted;
                report.record(record);
                if interrupted {
                    stopped = true;
                    break 'runs;
                }
            }
        }

        if stopped {
            let reached = report.records.iter().filter(|r| r.stage.is_some()).count();
            report.interrupted = true;
            report.not_started = self.plan.num_stages().saturating_sub(reached);
            tracing::warn!(
                "pipeline stopped by user, {} stages not started",
                report.not_started
            );
        }

        report.finalise(pipeline_start.elapsed());
        tracing::info!("{}", report.summary());
        Ok(report)
    }

    // ── Private helpers ────────────────────────────────────────

    async fn run_stage(
        &self,
        engine: &dyn ContainerEngine,
        run_plan: &RunPlan,
        stage: &StagePlan,
        run_config_path: Option<&str>,
        sink: &mut (dyn Write + Send),
        interrupt: &Interrupt,
    ) -> StageRecord {
        let spec = self.container_spec(run_plan, stage, run_config_path);
        let stage_start = Instant::now();

        match run_container(engine, &spec, sink, interrupt).await {
            Ok(outcome) => {
                let status = if outcome.interrupted {
                    StageStatus::Interrupted
                } else if outcome.detached {
                    StageStatus::Detached
                } else if outcome.succeeded() {
                    StageStatus::Succeeded
                } else {
                    StageStatus::Failed
                };
                if status == StageStatus::Failed {
                    tracing::error!(
                        "{} {} stage exited with {:?}",
                        run_plan.label(),
                        stage.kind,
                        outcome.exit_code
                    );
                }
                StageRecord {
                    container_id: outcome.id,
                    exit_code: outcome.exit_code,
                    duration: outcome.duration,
                    ..stage_record(run_plan, stage, status, None)
                }
            }
            Err(e) => {
                tracing::error!("{} {} stage failed: {e}", run_plan.label(), stage.kind);
                StageRecord {
                    duration: stage_start.elapsed(),
                    ..stage_record(run_plan, stage, StageStatus::Failed, Some(e.to_string()))
                }
            }
        }
    }

    /// Writes the run's JSON dump and returns its path inside the containers.
    fn dump_run_config(&self, run_plan: &RunPlan) -> Result<Option<String>, OrchestratorError> {
        let prepared = self.prepared();
        let Some(dir) = &prepared.cfg_dir else {
            return Ok(None);
        };

        let file_name = run_plan.dump_file_name();
        let path = dir.join(&file_name);
        if self.dry_run {
            tracing::debug!("dry run: not writing {}", path.display());
        } else {
            run_plan.run.to_json_file(&path)?;
            tracing::debug!("run config written to {}", path.display());
        }

        Ok(prepared
            .cfg_mount
            .as_ref()
            .map(|mount| format!("{}/{}", mount.trim_end_matches('/'), file_name)))
    }

    fn prepared(&self) -> &Prepared {
        self.prepared
            .as_ref()
            .expect("prepared environment exists in Ready state")
    }
}

impl<S: PipelineState> std::fmt::Debug for BenchmarkOrchestrator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkOrchestrator")
            .field("state", &std::any::type_name::<S>())
            .field("user_config", &self.config.user_config)
            .field("runs", &self.plan.num_runs())
            .field("prepared", &self.prepared.is_some())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

/// Record for a stage that has not produced an outcome yet.
fn stage_record(
    run_plan: &RunPlan,
    stage: &StagePlan,
    status: StageStatus,
    detail: Option<String>,
) -> StageRecord {
    StageRecord {
        run_index: run_plan.index,
        run: run_plan.label(),
        stage: Some(stage.kind),
        image: Some(stage.image.clone()),
        container_id: None,
        exit_code: None,
        status,
        detail,
        duration: std::time::Duration::ZERO,
    }
}

/// Maps an absolute host path to its location inside the containers.
fn container_path_for(volumes: &[VolumeMount], host_path: &Path) -> Option<String> {
    volumes.iter().find_map(|v| {
        let rel = host_path.strip_prefix(&v.host).ok()?;
        let mut path = v.container.trim_end_matches('/').to_string();
        for component in rel.components() {
            path.push('/');
            path.push_str(&component.as_os_str().to_string_lossy());
        }
        if path.is_empty() {
            path.push('/');
        }
        Some(path)
    })
}
