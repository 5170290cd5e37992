// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! An engine that records calls instead of launching containers.
//!
//! Used for `--dry-run` and as the engine behind the runner and
//! orchestrator tests. Each created container follows a [`ScriptedRun`]:
//! the first registered script whose matcher accepts the `ContainerSpec`, or a
//! silent run exiting with code 0.

use crate::{ContainerEngine, ContainerError, ContainerSpec, EngineInfo, OutputStream};
use futures::stream::{self, StreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    EnsureImage(String),
    Create {
        image: String,
        command: String,
        binds: Vec<String>,
        env: Vec<String>,
        use_gpu: bool,
    },
    Start(String),
    Attach(String),
    Wait(String),
    Remove(String),
}

/// Scripted behaviour of a fake container.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRun {
    /// Raw output chunks emitted on attach.
    pub output: Vec<Vec<u8>>,
    /// Exit code reported by `wait`.
    pub exit_code: i64,
    /// Refuse to create the container with this message.
    pub create_error: Option<String>,
    /// Keep the output stream open after the last chunk.
    pub hang: bool,
}

impl ScriptedRun {
    /// A run that prints `lines` and exits with `exit_code`.
    pub fn printing(lines: &[&str], exit_code: i64) -> Self {
        Self {
            output: lines.iter().map(|l| format!("{l}\n").into_bytes()).collect(),
            exit_code,
            ..Default::default()
        }
    }
}

type SpecMatcher = Box<dyn Fn(&ContainerSpec) -> bool + Send + Sync>;

/// Call-recording [`ContainerEngine`].
#[derive(Default)]
pub struct DryRunEngine {
    scripts: Vec<(SpecMatcher, ScriptedRun)>,
    containers: Mutex<HashMap<String, ScriptedRun>>,
    calls: Mutex<Vec<EngineCall>>,
    next_id: AtomicUsize,
    pull_delay: Duration,
}

impl DryRunEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a script for every spec accepted by `matcher`.
    pub fn script<F>(mut self, matcher: F, run: ScriptedRun) -> Self
    where
        F: Fn(&ContainerSpec) -> bool + Send + Sync + 'static,
    {
        self.scripts.push((Box::new(matcher), run));
        self
    }

    /// Makes every `ensure_image` take `delay`, like a slow registry pull.
    pub fn pull_delay(mut self, delay: Duration) -> Self {
        self.pull_delay = delay;
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<EngineCall> {
        match self.calls.lock() {
            Ok(calls) => calls.clone(),
            Err(_) => Vec::new(),
        }
    }

    /// IDs of containers created so far.
    pub fn created(&self) -> Vec<String> {
        match self.containers.lock() {
            Ok(containers) => {
                let mut ids: Vec<String> = containers.keys().cloned().collect();
                ids.sort();
                ids
            }
            Err(_) => Vec::new(),
        }
    }

    fn record(&self, call: EngineCall) {
        tracing::debug!("dry-run: {call:?}");
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    fn scripted(&self, id: &str) -> Result<ScriptedRun, ContainerError> {
        self.containers
            .lock()
            .ok()
            .and_then(|c| c.get(id).cloned())
            .ok_or_else(|| ContainerError::OperationFailed {
                id: id.to_string(),
                op: "lookup",
                detail: "no such container".into(),
            })
    }
}

impl std::fmt::Debug for DryRunEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DryRunEngine")
            .field("scripts", &self.scripts.len())
            .field("calls", &self.calls().len())
            .finish()
    }
}

#[async_trait::async_trait]
impl ContainerEngine for DryRunEngine {
    fn name(&self) -> &str {
        "dry-run"
    }

    async fn info(&self) -> Result<EngineInfo, ContainerError> {
        Ok(EngineInfo {
            engine: self.name().to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            api_version: "-".to_string(),
            platform: format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH),
            runtimes: Vec::new(),
            default_runtime: None,
        })
    }

    async fn ensure_image(&self, image: &str) -> Result<(), ContainerError> {
        self.record(EngineCall::EnsureImage(image.to_string()));
        if !self.pull_delay.is_zero() {
            tokio::time::sleep(self.pull_delay).await;
        }
        Ok(())
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        self.record(EngineCall::Create {
            image: spec.image.clone(),
            command: spec.command().to_string(),
            binds: spec.binds(),
            env: spec.env_list(),
            use_gpu: spec.use_gpu,
        });

        let run = self
            .scripts
            .iter()
            .find(|(matches, _)| matches(spec))
            .map(|(_, run)| run.clone())
            .unwrap_or_default();

        if let Some(detail) = run.create_error.clone() {
            return Err(ContainerError::CreateFailed {
                image: spec.image.clone(),
                detail,
            });
        }

        let id = format!("dryrun-{:04}", self.next_id.fetch_add(1, Ordering::SeqCst));
        if let Ok(mut containers) = self.containers.lock() {
            containers.insert(id.clone(), run);
        }
        Ok(id)
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.record(EngineCall::Start(id.to_string()));
        self.scripted(id).map(|_| ())
    }

    async fn attach(&self, id: &str) -> Result<OutputStream, ContainerError> {
        self.record(EngineCall::Attach(id.to_string()));
        let run = self.scripted(id)?;
        let chunks = stream::iter(run.output.into_iter().map(Ok));
        Ok(if run.hang {
            chunks.chain(stream::pending()).boxed()
        } else {
            chunks.boxed()
        })
    }

    async fn wait(&self, id: &str) -> Result<i64, ContainerError> {
        self.record(EngineCall::Wait(id.to_string()));
        Ok(self.scripted(id)?.exit_code)
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        self.record(EngineCall::Remove(id.to_string()));
        let removed = self
            .containers
            .lock()
            .ok()
            .and_then(|mut c| c.remove(id));
        match removed {
            Some(_) => Ok(()),
            None => Err(ContainerError::OperationFailed {
                id: id.to_string(),
                op: "remove",
                detail: "no such container".into(),
            }),
        }
    }
}
