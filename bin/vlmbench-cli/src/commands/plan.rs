// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `vlmbench plan` command: show the joined runs and their stages.

use orchestrator::{BenchmarkOrchestrator, OrchestratorConfig};

pub async fn execute(config: OrchestratorConfig, json: bool) -> anyhow::Result<()> {
    let planned = BenchmarkOrchestrator::new(config).load_runs()?;
    let plan = planned.plan();

    if json {
        println!("{}", serde_json::to_string_pretty(plan)?);
        return Ok(());
    }

    super::banner("vlmbench · Run Plan");

    for run_plan in &plan.runs {
        println!("  {}", run_plan.summary());
        println!("     {}", run_plan.run.summary());
        for stage in &run_plan.stages {
            println!(
                "     - {:<10} {} (gpu: {})",
                stage.kind.as_str(),
                stage.script,
                if stage.use_gpu { "yes" } else { "no" },
            );
        }
    }
    if !plan.runs.is_empty() {
        println!();
    }
    println!("  {}", plan.summary());

    Ok(())
}
