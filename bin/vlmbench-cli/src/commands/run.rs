// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `vlmbench run` command: execute the full pipeline.
//!
//! Walks the type-state pipeline:
//! ```text
//! BenchmarkOrchestrator<Idle> → load_runs → <Planned> → prepare → <Ready> → run
//! ```
//! Ctrl-C stops the running container and skips the rest of the queue,
//! or detaches from a kept container and moves on. A second Ctrl-C while
//! the first is still pending exits immediately.

use anyhow::Context;
use container_runner::{ContainerEngine, DockerEngine, DryRunEngine, EngineCall, Interrupt};
use orchestrator::{BenchmarkOrchestrator, BenchmarkReport, OrchestratorConfig, Ready, StageStatus};
use std::path::PathBuf;

/// Exit status used when the user force-quits.
const FORCE_QUIT_CODE: i32 = 130;

pub async fn execute(
    config: OrchestratorConfig,
    report_path: Option<PathBuf>,
    dry_run: bool,
) -> anyhow::Result<()> {
    super::banner("vlmbench · Benchmark Runner");

    println!("  Config:");
    println!("   User config: {}", config.user_config.display());
    println!("   VLM base:    {}", config.vlm_base.display());
    if let Some(dir) = &config.cfg_dir {
        println!("   Run dumps:   {}", dir.display());
    }
    println!("   Keep:        {}", config.keep_containers);
    if dry_run {
        println!("   Dry run:     no containers, no files written");
    }
    println!();

    // Step 1: Idle → Planned (join tables + plan stages).
    println!("  [1/3] Reading user config...");
    let planned = BenchmarkOrchestrator::new(config).load_runs()?;
    println!("        {}", planned.plan().summary());
    println!();

    // Step 2: Planned → Ready (resolve volumes + environment).
    println!("  [2/3] Resolving volumes and environment...");
    let planned = if dry_run { planned.dry_run() } else { planned };
    let ready = planned.prepare()?;
    for v in ready.volumes() {
        println!("        {}", v.bind());
    }
    println!();

    let interrupt = Interrupt::new();
    spawn_ctrl_c_handler(interrupt.clone());

    let report = if dry_run {
        let engine = DryRunEngine::new();
        let report = run_pipeline(&ready, &engine, &interrupt, false).await?;
        print_planned_containers(&engine.calls());
        report
    } else {
        let engine = DockerEngine::connect()?;
        run_pipeline(&ready, &engine, &interrupt, true).await?
    };

    print_report(&report);

    if let Some(path) = report_path {
        report.to_json_file(&path)?;
        println!("  Report written to {}", path.display());
    }

    if report.interrupted {
        anyhow::bail!("stopped by user");
    }
    let failed = report.count(StageStatus::Failed);
    if failed > 0 {
        anyhow::bail!("{failed} stage(s) failed");
    }
    Ok(())
}

/// Step 3: Ready → Run (one container at a time).
async fn run_pipeline(
    ready: &BenchmarkOrchestrator<Ready>,
    engine: &dyn ContainerEngine,
    interrupt: &Interrupt,
    check_gpu: bool,
) -> anyhow::Result<BenchmarkReport> {
    let info = engine
        .info()
        .await
        .context("container engine is not reachable; is the Docker daemon running?")?;
    tracing::info!("{}", info.summary());
    let needs_gpu = ready
        .plan()
        .runs
        .iter()
        .flat_map(|r| &r.stages)
        .any(|s| s.use_gpu);
    if check_gpu && needs_gpu && !info.gpu_runtime_available() {
        tracing::warn!("no nvidia runtime registered; GPU stages may fail to start");
    }

    println!(
        "  [3/3] Running {} containers on {}...",
        ready.plan().num_stages(),
        engine.name()
    );
    println!();
    let mut stdout = std::io::stdout();
    let report = ready.run(engine, &mut stdout, interrupt).await?;
    println!();
    Ok(report)
}

/// Forwards Ctrl-C to `interrupt` for as long as the process runs.
fn spawn_ctrl_c_handler(interrupt: Interrupt) {
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if on_ctrl_c(&interrupt) {
                eprintln!("interrupted again, exiting");
                std::process::exit(FORCE_QUIT_CODE);
            }
        }
    });
}

/// Handles one Ctrl-C. Returns true when the process should exit because
/// the previous interrupt has not been handled yet.
fn on_ctrl_c(interrupt: &Interrupt) -> bool {
    if interrupt.is_triggered() {
        return true;
    }
    tracing::warn!("interrupt received, stopping (Ctrl-C again to exit immediately)");
    interrupt.trigger();
    false
}

/// One block per container the dry run would have created.
fn planned_containers(calls: &[EngineCall]) -> Vec<String> {
    calls
        .iter()
        .filter_map(|call| match call {
            EngineCall::Create {
                image,
                command,
                binds,
                env,
                use_gpu,
            } => Some((image, command, binds, env, use_gpu)),
            _ => None,
        })
        .enumerate()
        .map(|(n, (image, command, binds, env, use_gpu))| {
            let mut block = format!(
                "   #{} {}{}\n      command: {}",
                n + 1,
                image,
                if *use_gpu { " (all GPUs)" } else { "" },
                command
            );
            for bind in binds {
                block.push_str(&format!("\n      bind:    {bind}"));
            }
            for var in env {
                block.push_str(&format!("\n      env:     {}", mask_secret(var)));
            }
            block
        })
        .collect()
}

fn print_planned_containers(calls: &[EngineCall]) {
    println!("  Containers:");
    for block in planned_containers(calls) {
        println!("{block}");
    }
    println!();
}

/// Hides the value of `KEY=VALUE` when the key looks like a credential.
fn mask_secret(var: &str) -> String {
    match var.split_once('=') {
        Some((key, value)) if !value.is_empty() && is_secret_name(key) => format!("{key}=***"),
        _ => var.to_string(),
    }
}

fn is_secret_name(key: &str) -> bool {
    let key = key.to_ascii_uppercase();
    ["TOKEN", "SECRET", "PASSWORD", "API_KEY"]
        .iter()
        .any(|marker| key.contains(marker))
}

fn print_report(report: &BenchmarkReport) {
    println!("  Results:");
    for record in &report.records {
        println!("   {}", record.summary());
    }
    println!();
    println!("  {}", report.summary());
    println!();
}
