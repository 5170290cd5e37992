// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end benchmark pipeline.
//!
//! These tests exercise the complete flow from the CSV tables on disk →
//! join → stage planning → host preparation → container launches,
//! using the call-recording engine in place of a Docker daemon.

use container_runner::{ContainerSpec, DryRunEngine, EngineCall, Interrupt, ScriptedRun};
use orchestrator::{
    BenchmarkOrchestrator, OrchestratorConfig, OrchestratorError, StageKind, StageStatus,
};
use run_config::BenchmarkRunConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ── Helpers ────────────────────────────────────────────────────

const USER_CONFIG: &str = "\u{feff}dataset;framework;model_name;prompt_collection;system_prompt;\
metrics;only_evaluate_metrics;metrics_aggregators;filter_doc_class;filter_question_type\n\
Passport_MINI;Hugging Face;Qwen2-VL-2B;AntonShiryaev.csv;;['WER', 'CER'];False;['overall'];;\n\
Passport_MINI;Hugging Face;Qwen2-VL-7B;AntonShiryaev.csv;;;False;;;\n\
Snils_MINI;Hugging Face;Qwen2-VL-2B;Default.csv;;['BLEU'];True;['by_id'];;\n\
Snils_MINI;Hugging Face;Qwen2-VL-7B;Default.csv;;;True;;;\n";

const VLM_BASE: &str = "framework;model_name;docker_image;python_package;module;class_name\n\
Hugging Face;Qwen2-VL-2B;ghcr.io/team/qwen2-vl:cu124;model_qwen2-vl;models;Qwen2VL_model\n\
Hugging Face;Qwen2-VL-7B;ghcr.io/team/qwen2-vl-7b:cu124;model_qwen2-vl;models;Qwen2VL_model\n";

/// Writes both tables and the default volume directories under `dir`.
fn fixture(dir: &Path, user_config: &str) -> OrchestratorConfig {
    for sub in ["pipeline/data", "pipeline/bench_stages", "pipeline/wheels"] {
        std::fs::create_dir_all(dir.join(sub)).unwrap();
    }
    let user_path = dir.join("user_config.csv");
    let base_path = dir.join("vlm_base.csv");
    std::fs::write(&user_path, user_config).unwrap();
    std::fs::write(&base_path, VLM_BASE).unwrap();

    OrchestratorConfig {
        user_config: user_path,
        vlm_base: base_path,
        cfg_dir: Some(PathBuf::from("pipeline/data/cfg")),
        ..Default::default()
    }
}

fn env_value<'a>(spec: &'a ContainerSpec, key: &str) -> Option<&'a str> {
    spec.env
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn is_stage(spec: &ContainerSpec, model: &str, script: &str) -> bool {
    spec.script_path.ends_with(script) && env_value(spec, "BENCH_MODEL_NAME") == Some(model)
}

/// Scripts and images of every container created, in order.
fn launches(engine: &DryRunEngine) -> Vec<(String, String)> {
    engine
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            EngineCall::Create { image, command, .. } => Some((image, command)),
            _ => None,
        })
        .collect()
}

type StatusRow = (usize, Option<StageKind>, StageStatus);

fn statuses(report: &orchestrator::BenchmarkReport) -> Vec<StatusRow> {
    report
        .records
        .iter()
        .map(|r| (r.run_index, r.stage, r.status))
        .collect()
}

// ── Pipeline tests ─────────────────────────────────────────────

#[tokio::test]
async fn test_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), USER_CONFIG);

    let pipeline = BenchmarkOrchestrator::new(config)
        .load_runs()
        .unwrap()
        .prepare_in(dir.path())
        .unwrap();
    assert_eq!(pipeline.plan().num_runs(), 4);
    assert_eq!(pipeline.plan().num_stages(), 4);

    let engine = DryRunEngine::new()
        .script(|_| true, ScriptedRun::printing(&["Processing: 100%"], 0));
    let mut sink = Vec::new();
    let report = pipeline
        .run(&engine, &mut sink, &Interrupt::new())
        .await
        .unwrap();

    use StageKind::*;
    use StageStatus::*;
    assert_eq!(
        statuses(&report),
        vec![
            (1, Some(Benchmark), Succeeded),
            (1, Some(Evaluation), Succeeded),
            (2, Some(Benchmark), Succeeded),
            (3, Some(Evaluation), Succeeded),
            (4, None, Skipped),
        ]
    );
    assert!(report.is_success());
    assert!(!report.interrupted);

    let launched = launches(&engine);
    assert_eq!(launched.len(), 4);
    assert_eq!(launched[0].0, "ghcr.io/team/qwen2-vl:cu124");
    assert_eq!(
        launched[0].1,
        "sh -c 'pip install wheels/benchmark_scheduler-0.1.0-py3-none-any.whl \
         && python -u /workspace/bench_stages/run_vlm.py'"
    );
    assert_eq!(
        launched[1].1,
        "sh -c 'python -u /workspace/bench_stages/run_eval.py'"
    );
    assert_eq!(launched[2].0, "ghcr.io/team/qwen2-vl-7b:cu124");

    // Every container is removed again.
    assert!(engine.created().is_empty());

    // One JSON dump per executed run, readable back.
    let cfg_dir = dir.path().join("pipeline/data/cfg");
    let dumped =
        BenchmarkRunConfig::from_json_file(&cfg_dir.join("1_Qwen2-VL-2B_Passport_MINI.json"))
            .unwrap();
    assert_eq!(dumped.metrics, Some(vec!["WER".to_string(), "CER".to_string()]));
    assert!(cfg_dir.join("3_Qwen2-VL-2B_Snils_MINI.json").exists());
    assert!(!cfg_dir.join("4_Qwen2-VL-7B_Snils_MINI.json").exists());

    let output = String::from_utf8(sink).unwrap();
    assert_eq!(output.matches("Processing: 100%").count(), 4);
}

#[tokio::test]
async fn test_container_environment() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture(dir.path(), USER_CONFIG);
    config.env.insert("HF_HOME".into(), "/workspace/data/hf".into());

    let pipeline = BenchmarkOrchestrator::new(config)
        .load_runs()
        .unwrap()
        .prepare_in(dir.path())
        .unwrap();
    let engine = DryRunEngine::new();
    pipeline
        .run(&engine, &mut Vec::new(), &Interrupt::new())
        .await
        .unwrap();

    let creates: Vec<_> = engine
        .calls()
        .into_iter()
        .filter_map(|c| match c {
            EngineCall::Create { env, binds, use_gpu, .. } => Some((env, binds, use_gpu)),
            _ => None,
        })
        .collect();

    let (env, binds, use_gpu) = &creates[0];
    assert!(*use_gpu);
    assert_eq!(
        env,
        &vec![
            "HF_HOME=/workspace/data/hf".to_string(),
            "BENCH_STAGE=benchmark".to_string(),
            "BENCH_DATASET=Passport_MINI".to_string(),
            "BENCH_MODEL_NAME=Qwen2-VL-2B".to_string(),
            "BENCH_FRAMEWORK=Hugging Face".to_string(),
            "BENCH_RUN_CONFIG=/workspace/data/cfg/1_Qwen2-VL-2B_Passport_MINI.json".to_string(),
        ]
    );
    let data = dir.path().join("pipeline/data");
    assert_eq!(binds[0], format!("{}:/workspace/data:rw", data.display()));
    assert_eq!(binds.len(), 3);

    let (env, _, use_gpu) = &creates[1];
    assert!(!*use_gpu);
    assert!(env.contains(&"BENCH_STAGE=evaluation".to_string()));
}

#[tokio::test]
async fn test_failed_benchmark_skips_evaluation() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), USER_CONFIG);

    let pipeline = BenchmarkOrchestrator::new(config)
        .load_runs()
        .unwrap()
        .prepare_in(dir.path())
        .unwrap();
    let engine = DryRunEngine::new().script(
        |s| is_stage(s, "Qwen2-VL-2B", "run_vlm.py"),
        ScriptedRun::printing(&["CUDA out of memory"], 1),
    );
    let report = pipeline
        .run(&engine, &mut Vec::new(), &Interrupt::new())
        .await
        .unwrap();

    let first: Vec<_> = report.run_records(1).collect();
    assert_eq!(first[0].status, StageStatus::Failed);
    assert_eq!(first[0].exit_code, Some(1));
    assert_eq!(first[1].status, StageStatus::Skipped);
    assert_eq!(first[1].detail.as_deref(), Some("benchmark stage failed"));

    // Later runs are unaffected.
    assert_eq!(report.run_records(2).next().unwrap().status, StageStatus::Succeeded);
    assert_eq!(report.run_records(3).next().unwrap().status, StageStatus::Succeeded);
    assert!(report.has_failures());
    assert_eq!(launches(&engine).len(), 3);
}

#[tokio::test]
async fn test_engine_error_is_recorded() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), USER_CONFIG);

    let pipeline = BenchmarkOrchestrator::new(config)
        .load_runs()
        .unwrap()
        .prepare_in(dir.path())
        .unwrap();
    let engine = DryRunEngine::new().script(
        |s| s.use_gpu,
        ScriptedRun {
            create_error: Some("could not select device driver with capabilities [[gpu]]".into()),
            ..Default::default()
        },
    );
    let report = pipeline
        .run(&engine, &mut Vec::new(), &Interrupt::new())
        .await
        .unwrap();

    assert_eq!(report.count(StageStatus::Failed), 2);
    let failed = &report.records[0];
    assert!(failed.container_id.is_none());
    assert!(failed.detail.as_deref().unwrap().contains("device driver"));
    // The evaluation-only run needs no GPU and still succeeds.
    assert_eq!(report.run_records(3).next().unwrap().status, StageStatus::Succeeded);
}

#[tokio::test]
async fn test_interrupt_stops_queue() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), USER_CONFIG);

    let pipeline = BenchmarkOrchestrator::new(config)
        .load_runs()
        .unwrap()
        .prepare_in(dir.path())
        .unwrap();
    let engine = DryRunEngine::new().script(
        |s| is_stage(s, "Qwen2-VL-2B", "run_vlm.py"),
        ScriptedRun {
            output: vec![b"epoch 1/3\n".to_vec()],
            hang: true,
            ..Default::default()
        },
    );
    let interrupt = Interrupt::new();
    {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            interrupt.trigger();
        });
    }

    let mut sink = Vec::new();
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.run(&engine, &mut sink, &interrupt),
    )
    .await
    .expect("interrupt should stop the pipeline")
    .unwrap();

    assert!(report.interrupted);
    assert_eq!(report.records.len(), 1);
    assert_eq!(report.records[0].status, StageStatus::Interrupted);
    assert_eq!(report.not_started, 3);
    assert!(!report.is_success());
    assert_eq!(launches(&engine).len(), 1);
    // The interrupted container is still cleaned up.
    assert!(engine.created().is_empty());
    assert!(String::from_utf8(sink).unwrap().contains("stopped by user"));
}

#[tokio::test]
async fn test_keep_containers_detach_and_continue() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture(dir.path(), USER_CONFIG);
    config.keep_containers = true;
    config.cfg_dir = None;

    let pipeline = BenchmarkOrchestrator::new(config)
        .load_runs()
        .unwrap()
        .prepare_in(dir.path())
        .unwrap();
    // A kept container ends in an interactive shell, so its output never closes.
    let engine = Arc::new(DryRunEngine::new().script(
        |_| true,
        ScriptedRun {
            output: vec![b"stage done\n".to_vec()],
            hang: true,
            ..Default::default()
        },
    ));
    let interrupt = Interrupt::new();

    // One Ctrl-C per attached container.
    let user = {
        let engine = Arc::clone(&engine);
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            let mut sent = 0;
            loop {
                tokio::time::sleep(Duration::from_millis(10)).await;
                let attached = engine
                    .calls()
                    .iter()
                    .filter(|c| matches!(c, EngineCall::Attach(_)))
                    .count();
                if attached > sent {
                    sent += 1;
                    interrupt.trigger();
                }
            }
        })
    };

    let mut sink = Vec::new();
    let report = tokio::time::timeout(
        Duration::from_secs(5),
        pipeline.run(&*engine, &mut sink, &interrupt),
    )
    .await
    .expect("every kept container should be detached from")
    .unwrap();
    user.abort();

    use StageKind::*;
    use StageStatus::*;
    assert_eq!(
        statuses(&report),
        vec![
            (1, Some(Benchmark), Detached),
            (1, Some(Evaluation), Detached),
            (2, Some(Benchmark), Detached),
            (3, Some(Evaluation), Detached),
            (4, None, Skipped),
        ]
    );
    assert!(!report.interrupted);
    assert_eq!(report.not_started, 0);
    assert!(report.is_success());
    assert!(report.records[0].container_id.is_some());

    assert_eq!(engine.created().len(), 4);
    assert!(launches(&engine).iter().all(|(_, cmd)| cmd.ends_with("&& exec bash'")));
    assert!(!engine.calls().iter().any(|c| matches!(c, EngineCall::Remove(_))));
    assert!(!dir.path().join("pipeline/data/cfg").exists());

    let output = String::from_utf8(sink).unwrap();
    assert_eq!(output.matches("detached from container").count(), 4);
    assert_eq!(output.matches("docker exec -it").count(), 4);
}

#[tokio::test]
async fn test_keep_containers_exited_shell() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = fixture(dir.path(), USER_CONFIG);
    config.keep_containers = true;
    config.cfg_dir = None;

    let pipeline = BenchmarkOrchestrator::new(config)
        .load_runs()
        .unwrap()
        .prepare_in(dir.path())
        .unwrap();
    // The script fails, so `exec bash` never runs and the container exits.
    let engine = DryRunEngine::new().script(
        |s| is_stage(s, "Qwen2-VL-2B", "run_vlm.py"),
        ScriptedRun::printing(&["ImportError"], 1),
    );
    let report = pipeline
        .run(&engine, &mut Vec::new(), &Interrupt::new())
        .await
        .unwrap();

    let first: Vec<_> = report.run_records(1).collect();
    assert_eq!(first[0].status, StageStatus::Failed);
    assert_eq!(first[1].status, StageStatus::Skipped);
    assert_eq!(engine.created().len(), 3);
}

// ── Loading errors ─────────────────────────────────────────────

#[test]
fn test_unknown_model_fails_loading() {
    let dir = tempfile::tempdir().unwrap();
    let user = "dataset;framework;model_name;prompt_collection\n\
                Passport_MINI;Hugging Face;Qwen2-VL-2B;p.csv\n\
                Passport_MINI;SgLang;Llava-1.6;p.csv\n";
    let config = fixture(dir.path(), user);

    let err = BenchmarkOrchestrator::new(config).load_runs().unwrap_err();
    assert!(matches!(err, OrchestratorError::RunConfig(_)));
    let msg = err.to_string();
    assert!(msg.contains("SgLang"));
    assert!(msg.contains("Llava-1.6"));
}

#[test]
fn test_missing_table_fails_loading() {
    let dir = tempfile::tempdir().unwrap();
    let config = OrchestratorConfig {
        user_config: dir.path().join("absent.csv"),
        ..Default::default()
    };
    let err = BenchmarkOrchestrator::new(config).load_runs().unwrap_err();
    assert!(err.to_string().contains("absent.csv"));
}

#[test]
fn test_header_only_config_plans_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let config = fixture(dir.path(), "dataset;framework;model_name;prompt_collection\n");
    let planned = BenchmarkOrchestrator::new(config).load_runs().unwrap();
    assert_eq!(planned.plan().num_runs(), 0);
}
