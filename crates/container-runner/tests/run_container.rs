// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! End-to-end tests for `run_container` against the call-recording engine.

use container_runner::{
    host_paths_to_abs, run_container, ContainerError, ContainerSpec, DryRunEngine, EngineCall,
    Interrupt, ScriptedRun, VolumeMount,
};
use std::time::Duration;

fn spec() -> ContainerSpec {
    let volumes = host_paths_to_abs(
        &[VolumeMount::new("pipeline/data", "/workspace/data")],
        Some(std::path::Path::new("/srv/bench")),
    )
    .unwrap();
    ContainerSpec::new("ghcr.io/team/vlm:cu124", "/workspace/bench_stages/run_vlm.py")
        .packages(vec!["wheels/scheduler.whl".into()])
        .volumes(volumes)
        .use_gpu(true)
        .env("BENCH_STAGE", "benchmark")
}

fn sink_text(sink: &[u8]) -> String {
    String::from_utf8_lossy(sink).into_owned()
}

#[tokio::test]
async fn test_full_lifecycle() {
    let engine = DryRunEngine::new().script(
        |_| true,
        ScriptedRun {
            output: vec![
                b"loading model\r\n".to_vec(),
                b"progress 50%\rprogress 10".to_vec(),
                b"0%\n\n   \ndone".to_vec(),
            ],
            exit_code: 0,
            ..Default::default()
        },
    );
    let mut sink = Vec::new();

    let outcome = run_container(&engine, &spec(), &mut sink, &Interrupt::new())
        .await
        .unwrap();

    assert!(outcome.succeeded());
    assert!(outcome.removed);
    assert_eq!(outcome.image, "ghcr.io/team/vlm:cu124");

    let id = outcome.id.clone().unwrap();
    let text = sink_text(&sink);
    let lines: Vec<&str> = text.lines().collect();
    let started = format!("started container {id}");
    let removed = format!("container {id} removed");
    assert_eq!(
        lines,
        vec![
            "sh -c 'pip install wheels/scheduler.whl && python -u /workspace/bench_stages/run_vlm.py'",
            started.as_str(),
            "loading model",
            "progress 50%",
            "progress 100%",
            "done",
            removed.as_str(),
        ]
    );

    let calls = engine.calls();
    assert_eq!(calls[0], EngineCall::EnsureImage("ghcr.io/team/vlm:cu124".into()));
    match &calls[1] {
        EngineCall::Create {
            binds,
            env,
            use_gpu,
            ..
        } => {
            assert_eq!(binds, &vec!["/srv/bench/pipeline/data:/workspace/data:rw".to_string()]);
            assert_eq!(env, &vec!["BENCH_STAGE=benchmark".to_string()]);
            assert!(*use_gpu);
        }
        other => panic!("expected create, got {other:?}"),
    }
    assert_eq!(
        &calls[2..],
        &[
            EngineCall::Start(id.clone()),
            EngineCall::Attach(id.clone()),
            EngineCall::Wait(id.clone()),
            EngineCall::Remove(id),
        ]
    );
    assert!(engine.created().is_empty());
}

#[tokio::test]
async fn test_nonzero_exit_is_reported_not_raised() {
    let engine = DryRunEngine::new().script(|_| true, ScriptedRun::printing(&["Traceback"], 2));
    let mut sink = Vec::new();

    let outcome = run_container(&engine, &spec(), &mut sink, &Interrupt::new())
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, Some(2));
    assert!(!outcome.succeeded());
    assert!(outcome.removed);
}

#[tokio::test]
async fn test_keep_container_skips_removal() {
    let engine = DryRunEngine::new();
    let mut sink = Vec::new();
    let spec = spec().keep_container(true);

    let outcome = run_container(&engine, &spec, &mut sink, &Interrupt::new())
        .await
        .unwrap();

    assert!(!outcome.removed);
    assert!(!outcome.detached);
    assert!(!engine
        .calls()
        .iter()
        .any(|c| matches!(c, EngineCall::Remove(_))));
    let id = outcome.id.unwrap();
    let text = sink_text(&sink);
    assert!(text.starts_with("sh -c 'pip install wheels/scheduler.whl && python -u"));
    assert!(text.contains("&& exec bash'"));
    assert!(text.contains(&format!("docker exec -it {id} bash")));
    assert_eq!(engine.created(), vec![id]);
}

#[tokio::test]
async fn test_interrupt_detaches_from_kept_container() {
    let engine = DryRunEngine::new().script(
        |_| true,
        ScriptedRun {
            output: vec![b"benchmark done\n".to_vec()],
            hang: true,
            ..Default::default()
        },
    );
    let interrupt = Interrupt::new();
    let trigger = {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            interrupt.trigger();
        })
    };
    let mut sink = Vec::new();
    let spec = spec().keep_container(true);

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        run_container(&engine, &spec, &mut sink, &interrupt),
    )
    .await
    .expect("interrupt should detach from the kept container")
    .unwrap();
    trigger.await.unwrap();

    assert!(outcome.detached);
    assert!(!outcome.interrupted);
    assert!(!outcome.removed);
    assert_eq!(outcome.exit_code, None);
    assert!(!interrupt.is_triggered(), "interrupt is re-armed after detaching");

    let id = outcome.id.unwrap();
    let text = sink_text(&sink);
    assert!(text.contains("benchmark done\n"));
    assert!(text.contains(&format!("detached from container {id}\n")));
    assert!(text.contains(&format!("docker exec -it {id} bash")));
    assert_eq!(engine.created(), vec![id]);
}

#[tokio::test]
async fn test_interrupt_during_pull_creates_nothing() {
    let engine = DryRunEngine::new().pull_delay(Duration::from_millis(300));
    let interrupt = Interrupt::new();
    let trigger = {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            interrupt.trigger();
        })
    };
    let mut sink = Vec::new();

    let outcome = run_container(&engine, &spec(), &mut sink, &interrupt)
        .await
        .unwrap();
    trigger.await.unwrap();

    assert!(outcome.interrupted);
    assert_eq!(outcome.id, None);
    assert!(!outcome.removed);
    assert!(outcome.duration < Duration::from_millis(300));
    assert_eq!(
        engine.calls(),
        vec![EngineCall::EnsureImage("ghcr.io/team/vlm:cu124".into())]
    );
    assert!(sink_text(&sink).contains("stopped by user before container creation"));
}

#[tokio::test]
async fn test_pending_interrupt_prevents_launch() {
    let engine = DryRunEngine::new();
    let interrupt = Interrupt::new();
    interrupt.trigger();
    let mut sink = Vec::new();

    let outcome = run_container(&engine, &spec().keep_container(true), &mut sink, &interrupt)
        .await
        .unwrap();

    assert!(outcome.interrupted);
    assert!(!outcome.detached);
    assert!(engine.created().is_empty());
    assert!(!engine
        .calls()
        .iter()
        .any(|c| matches!(c, EngineCall::Create { .. } | EngineCall::Start(_))));
}

#[tokio::test]
async fn test_interrupt_stops_streaming_and_removes() {
    let engine = DryRunEngine::new().script(
        |_| true,
        ScriptedRun {
            output: vec![b"epoch 1\n".to_vec()],
            hang: true,
            ..Default::default()
        },
    );
    let interrupt = Interrupt::new();
    let trigger = {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            interrupt.trigger();
        })
    };
    let mut sink = Vec::new();

    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        run_container(&engine, &spec(), &mut sink, &interrupt),
    )
    .await
    .expect("interrupt should end the run")
    .unwrap();
    trigger.await.unwrap();

    assert!(outcome.interrupted);
    assert_eq!(outcome.exit_code, None);
    assert!(outcome.removed);
    let text = sink_text(&sink);
    assert!(text.contains("epoch 1\n"));
    assert!(text.contains("stopped by user\n"));
    assert!(!engine
        .calls()
        .iter()
        .any(|c| matches!(c, EngineCall::Wait(_))));
}

#[tokio::test]
async fn test_create_failure_propagates() {
    let engine = DryRunEngine::new().script(
        |s| s.use_gpu,
        ScriptedRun {
            create_error: Some("could not select device driver".into()),
            ..Default::default()
        },
    );
    let mut sink = Vec::new();

    let err = run_container(&engine, &spec(), &mut sink, &Interrupt::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ContainerError::CreateFailed { .. }));
    assert!(err.to_string().contains("device driver"));
    assert!(!engine
        .calls()
        .iter()
        .any(|c| matches!(c, EngineCall::Start(_))));
}

#[tokio::test]
async fn test_invalid_spec_never_reaches_engine() {
    let engine = DryRunEngine::new();
    let spec = ContainerSpec::new("img", "/run.py")
        .volumes(vec![VolumeMount::new("relative/dir", "/workspace/data")]);
    let mut sink = Vec::new();

    let err = run_container(&engine, &spec, &mut sink, &Interrupt::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ContainerError::InvalidSpec(_)));
    assert!(engine.calls().is_empty());
    assert!(sink.is_empty());
}
