// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Run one container to completion, streaming its output.

use crate::output::LineSplitter;
use crate::{ContainerEngine, ContainerError, ContainerSpec, Interrupt};
use futures::StreamExt;
use std::io::Write;
use std::time::{Duration, Instant};

/// What happened to a container launched by [`run_container`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerOutcome {
    /// `None` when the interrupt fired before a container was created.
    pub id: Option<String>,
    pub image: String,
    /// `None` when the run was interrupted or detached before the container exited.
    pub exit_code: Option<i64>,
    pub interrupted: bool,
    /// The user stopped streaming a kept container, which is still running.
    pub detached: bool,
    /// Whether the container was removed afterwards.
    pub removed: bool,
    pub duration: Duration,
}

impl ContainerOutcome {
    /// True when the container ran to completion with exit code 0.
    pub fn succeeded(&self) -> bool {
        !self.interrupted && self.exit_code == Some(0)
    }
}

/// How streaming and waiting ended.
enum Execution {
    Exited(i64),
    Interrupted,
    Detached,
}

/// Launches `spec` on `engine` and blocks until the container exits or
/// `interrupt` fires.
///
/// Output lines go to `sink` as they arrive. Unless `spec` keeps the
/// container, it is force-removed afterwards, also when streaming or
/// waiting failed; in that case the first error is returned.
///
/// An interrupt during the image pull returns before any container is
/// created. An interrupt while a kept container is streaming detaches
/// from it: the container keeps running, the interrupt is cleared and the
/// outcome is marked `detached` rather than `interrupted`.
pub async fn run_container(
    engine: &dyn ContainerEngine,
    spec: &ContainerSpec,
    sink: &mut (dyn Write + Send),
    interrupt: &Interrupt,
) -> Result<ContainerOutcome, ContainerError> {
    spec.validate()?;

    let command = spec.command();
    tracing::info!(image = %spec.image, gpu = spec.use_gpu, "Launching: {command}");
    writeln!(sink, "{command}")?;

    let start = Instant::now();
    let pulled = tokio::select! {
        biased;
        _ = interrupt.triggered() => None,
        pulled = engine.ensure_image(&spec.image) => Some(pulled),
    };
    match pulled {
        Some(pulled) => pulled?,
        None => {
            writeln!(sink, "stopped by user before container creation")?;
            tracing::warn!("Interrupted while preparing image {}", spec.image);
            return Ok(ContainerOutcome {
                id: None,
                image: spec.image.clone(),
                exit_code: None,
                interrupted: true,
                detached: false,
                removed: false,
                duration: start.elapsed(),
            });
        }
    }

    // Create is not raced: a dropped request could leave a container behind
    // whose ID was never returned.
    let id = engine.create(spec).await?;

    if interrupt.is_triggered() {
        engine.remove(&id).await?;
        writeln!(sink, "stopped by user, container {id} removed before start")?;
        tracing::warn!("Interrupted before starting container {id}");
        return Ok(ContainerOutcome {
            id: Some(id),
            image: spec.image.clone(),
            exit_code: None,
            interrupted: true,
            detached: false,
            removed: true,
            duration: start.elapsed(),
        });
    }

    if let Err(e) = engine.start(&id).await {
        if let Err(cleanup) = engine.remove(&id).await {
            tracing::warn!("Failed to remove container {id} after start error: {cleanup}");
        }
        return Err(e);
    }
    tracing::debug!("Container {id} started");

    let executed = execute(engine, spec, &id, sink, interrupt).await;
    let cleaned = cleanup(engine, spec, &id, sink).await;

    let execution = match (executed, cleaned.as_ref()) {
        (Err(e), Err(cleanup)) => {
            tracing::warn!("Cleanup of container {id} failed: {cleanup}");
            return Err(e);
        }
        (Err(e), Ok(_)) => return Err(e),
        (Ok(execution), _) => execution,
    };
    let removed = cleaned?;

    let (exit_code, interrupted, detached) = match execution {
        Execution::Exited(code) => (Some(code), false, false),
        Execution::Interrupted => (None, true, false),
        Execution::Detached => (None, false, true),
    };
    let outcome = ContainerOutcome {
        id: Some(id),
        image: spec.image.clone(),
        exit_code,
        interrupted,
        detached,
        removed,
        duration: start.elapsed(),
    };
    tracing::info!(
        "Container {} finished: exit={:?} interrupted={} detached={} in {:.1}s",
        outcome.id.as_deref().unwrap_or("-"),
        outcome.exit_code,
        outcome.interrupted,
        outcome.detached,
        outcome.duration.as_secs_f64()
    );
    Ok(outcome)
}

/// Streams output and waits for the exit code.
async fn execute(
    engine: &dyn ContainerEngine,
    spec: &ContainerSpec,
    id: &str,
    sink: &mut (dyn Write + Send),
    interrupt: &Interrupt,
) -> Result<Execution, ContainerError> {
    writeln!(sink, "started container {id}")?;

    if stream_output(engine, id, sink, interrupt).await? {
        if spec.keep_container {
            interrupt.clear();
            writeln!(sink, "detached from container {id}")?;
            tracing::info!("Detached from kept container {id}");
            return Ok(Execution::Detached);
        }
        writeln!(sink, "stopped by user")?;
        tracing::warn!("Container {id} interrupted by user");
        return Ok(Execution::Interrupted);
    }

    tokio::select! {
        biased;
        _ = interrupt.triggered() => {
            writeln!(sink, "stopped by user")?;
            tracing::warn!("Interrupted while waiting for container {id}");
            Ok(Execution::Interrupted)
        }
        code = engine.wait(id) => Ok(Execution::Exited(code?)),
    }
}

/// Copies output lines to `sink` until the stream ends. Returns true if
/// the interrupt fired first.
async fn stream_output(
    engine: &dyn ContainerEngine,
    id: &str,
    sink: &mut (dyn Write + Send),
    interrupt: &Interrupt,
) -> Result<bool, ContainerError> {
    let mut output = engine.attach(id).await?;
    let mut splitter = LineSplitter::new();

    loop {
        tokio::select! {
            biased;
            _ = interrupt.triggered() => return Ok(true),
            chunk = output.next() => match chunk {
                Some(chunk) => {
                    for line in splitter.push(&chunk?) {
                        writeln!(sink, "{line}")?;
                    }
                    sink.flush()?;
                }
                None => break,
            },
        }
    }

    if let Some(line) = splitter.finish() {
        writeln!(sink, "{line}")?;
    }
    sink.flush()?;
    Ok(false)
}

/// Removes the container, or explains how to reach it when kept.
/// Returns whether it was removed.
async fn cleanup(
    engine: &dyn ContainerEngine,
    spec: &ContainerSpec,
    id: &str,
    sink: &mut (dyn Write + Send),
) -> Result<bool, ContainerError> {
    if spec.keep_container {
        writeln!(sink, "container {id} left running")?;
        writeln!(sink, "attach with: docker exec -it {id} bash")?;
        return Ok(false);
    }

    engine.remove(id).await?;
    writeln!(sink, "container {id} removed")?;
    Ok(true)
}
