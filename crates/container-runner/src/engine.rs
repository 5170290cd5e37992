// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`ContainerEngine`] trait and engine metadata.

use crate::{ContainerError, ContainerSpec};
use futures::stream::BoxStream;

/// Raw output chunks from an attached container, in arrival order.
pub type OutputStream = BoxStream<'static, Result<Vec<u8>, ContainerError>>;

/// Operations the runner needs from a container engine.
///
/// [`crate::DockerEngine`] talks to a local Docker daemon;
/// [`crate::DryRunEngine`] records calls without launching anything.
/// The runner only ever drives one container at a time through this trait.
#[async_trait::async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Human-readable engine name.
    fn name(&self) -> &str;

    /// Returns version and runtime information about the engine.
    async fn info(&self) -> Result<EngineInfo, ContainerError>;

    /// Makes sure `image` is available locally, pulling it if needed.
    async fn ensure_image(&self, image: &str) -> Result<(), ContainerError>;

    /// Creates a container for `spec` and returns its ID.
    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError>;

    /// Starts a created container.
    async fn start(&self, id: &str) -> Result<(), ContainerError>;

    /// Attaches to the container output, including anything already logged.
    async fn attach(&self, id: &str) -> Result<OutputStream, ContainerError>;

    /// Blocks until the container exits and returns its exit code.
    async fn wait(&self, id: &str) -> Result<i64, ContainerError>;

    /// Force-removes the container.
    async fn remove(&self, id: &str) -> Result<(), ContainerError>;
}

/// Version and runtime details reported by an engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct EngineInfo {
    /// Engine name (e.g. `"docker"`).
    pub engine: String,
    /// Server version.
    pub version: String,
    /// API version negotiated with the server.
    pub api_version: String,
    /// Server operating system and architecture.
    pub platform: String,
    /// Registered container runtimes (e.g. `runc`, `nvidia`).
    pub runtimes: Vec<String>,
    /// Runtime used when none is requested.
    pub default_runtime: Option<String>,
}

impl EngineInfo {
    /// Returns `true` if a GPU-capable runtime is registered.
    pub fn gpu_runtime_available(&self) -> bool {
        self.runtimes.iter().any(|r| r.contains("nvidia"))
    }

    /// Returns a one-line summary suitable for CLI output.
    pub fn summary(&self) -> String {
        format!(
            "{} {} (API {}, {}), runtimes: [{}]{}",
            self.engine,
            self.version,
            self.api_version,
            self.platform,
            self.runtimes.join(", "),
            match &self.default_runtime {
                Some(r) => format!(", default: {r}"),
                None => String::new(),
            },
        )
    }
}
