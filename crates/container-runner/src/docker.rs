// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! [`ContainerEngine`] backed by the local Docker daemon.
//!
//! Connection settings follow the usual Docker client conventions
//! (`DOCKER_HOST`, falling back to the local Unix socket).

use crate::{ContainerEngine, ContainerError, ContainerSpec, EngineInfo, OutputStream};
use bollard::container::{
    AttachContainerOptions, AttachContainerResults, Config, RemoveContainerOptions,
    StartContainerOptions, WaitContainerOptions,
};
use bollard::image::CreateImageOptions;
use bollard::models::{DeviceRequest, HostConfig};
use bollard::Docker;
use futures::StreamExt;

/// Tag assumed for image references that carry neither tag nor digest.
const DEFAULT_TAG: &str = "latest";

/// Docker engine client.
#[derive(Debug, Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connects using the local defaults.
    ///
    /// No request is sent yet; an unreachable daemon surfaces on the
    /// first operation (use [`ContainerEngine::info`] to probe it).
    pub fn connect() -> Result<Self, ContainerError> {
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ContainerError::EngineUnavailable(e.to_string()))?;
        Ok(Self { docker })
    }

    /// Wraps an existing client.
    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }

    fn op_error(id: &str, op: &'static str, e: bollard::errors::Error) -> ContainerError {
        ContainerError::OperationFailed {
            id: id.to_string(),
            op,
            detail: e.to_string(),
        }
    }

    async fn pull(&self, image: &str) -> Result<(), ContainerError> {
        let reference = with_default_tag(image);
        tracing::info!("pulling image {reference}");

        let options = CreateImageOptions {
            from_image: reference.as_str(),
            ..Default::default()
        };
        let progress = self.docker.create_image(Some(options), None, None);
        futures::pin_mut!(progress);
        while let Some(update) = progress.next().await {
            let update = update.map_err(|e| ContainerError::ImagePull {
                image: reference.clone(),
                detail: e.to_string(),
            })?;
            if let Some(status) = update.status {
                tracing::debug!(
                    "pull {reference}: {status}{}",
                    update.progress.map(|p| format!(" {p}")).unwrap_or_default(),
                );
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl ContainerEngine for DockerEngine {
    fn name(&self) -> &str {
        "docker"
    }

    async fn info(&self) -> Result<EngineInfo, ContainerError> {
        let unavailable =
            |e: bollard::errors::Error| ContainerError::EngineUnavailable(e.to_string());
        let version = self.docker.version().await.map_err(unavailable)?;
        let system = self.docker.info().await.map_err(unavailable)?;

        let mut runtimes: Vec<String> = system
            .runtimes
            .map(|r| r.into_keys().collect())
            .unwrap_or_default();
        runtimes.sort();

        Ok(EngineInfo {
            engine: self.name().to_string(),
            version: version.version.unwrap_or_default(),
            api_version: version.api_version.unwrap_or_default(),
            platform: format!(
                "{}/{}",
                version.os.unwrap_or_default(),
                version.arch.unwrap_or_default()
            ),
            runtimes,
            default_runtime: system.default_runtime,
        })
    }

    async fn ensure_image(&self, image: &str) -> Result<(), ContainerError> {
        match self.docker.inspect_image(image).await {
            Ok(_) => {
                tracing::debug!("image {image} present locally");
                Ok(())
            }
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => self.pull(image).await,
            Err(e) => Err(ContainerError::ImagePull {
                image: image.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    async fn create(&self, spec: &ContainerSpec) -> Result<String, ContainerError> {
        let device_requests = spec.use_gpu.then(|| {
            vec![DeviceRequest {
                count: Some(-1),
                capabilities: Some(vec![vec!["gpu".to_string()]]),
                ..Default::default()
            }]
        });

        let host_config = HostConfig {
            binds: Some(spec.binds()),
            device_requests,
            ..Default::default()
        };

        let config = Config {
            image: Some(spec.image.clone()),
            cmd: Some(spec.command().argv()),
            env: Some(spec.env_list()),
            tty: Some(true),
            attach_stdout: Some(true),
            attach_stderr: Some(true),
            open_stdin: Some(spec.keep_container),
            host_config: Some(host_config),
            ..Default::default()
        };

        let response = self
            .docker
            .create_container::<String, String>(None, config)
            .await
            .map_err(|e| ContainerError::CreateFailed {
                image: spec.image.clone(),
                detail: e.to_string(),
            })?;

        for warning in &response.warnings {
            tracing::warn!("docker: {warning}");
        }
        Ok(response.id)
    }

    async fn start(&self, id: &str) -> Result<(), ContainerError> {
        self.docker
            .start_container(id, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| Self::op_error(id, "start", e))
    }

    async fn attach(&self, id: &str) -> Result<OutputStream, ContainerError> {
        let options = AttachContainerOptions::<String> {
            stdout: Some(true),
            stderr: Some(true),
            stream: Some(true),
            logs: Some(true),
            ..Default::default()
        };

        let AttachContainerResults { output, .. } = self
            .docker
            .attach_container(id, Some(options))
            .await
            .map_err(|e| Self::op_error(id, "attach", e))?;

        let id = id.to_string();
        Ok(output
            .map(move |chunk| {
                chunk
                    .map(|log| log.into_bytes().to_vec())
                    .map_err(|e| Self::op_error(&id, "attach", e))
            })
            .boxed())
    }

    async fn wait(&self, id: &str) -> Result<i64, ContainerError> {
        let statuses = self
            .docker
            .wait_container(id, None::<WaitContainerOptions<String>>);
        futures::pin_mut!(statuses);

        match statuses.next().await {
            Some(Ok(response)) => Ok(response.status_code),
            // Non-zero exits are reported as errors by the client.
            Some(Err(bollard::errors::Error::DockerContainerWaitError { code, .. })) => Ok(code),
            Some(Err(e)) => Err(Self::op_error(id, "wait", e)),
            None => Err(ContainerError::OperationFailed {
                id: id.to_string(),
                op: "wait",
                detail: "engine closed the wait stream without an exit status".into(),
            }),
        }
    }

    async fn remove(&self, id: &str) -> Result<(), ContainerError> {
        let options = RemoveContainerOptions {
            force: true,
            ..Default::default()
        };
        self.docker
            .remove_container(id, Some(options))
            .await
            .map_err(|e| Self::op_error(id, "remove", e))
    }
}

/// Appends `:latest` to references without a tag or digest, so a pull
/// fetches one image instead of every tag of the repository.
pub(crate) fn with_default_tag(image: &str) -> String {
    let last_segment = image.rsplit('/').next().unwrap_or(image);
    if image.contains('@') || last_segment.contains(':') {
        image.to_string()
    } else {
        format!("{image}:{DEFAULT_TAG}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tag() {
        assert_eq!(with_default_tag("python"), "python:latest");
        assert_eq!(with_default_tag("python:3.10"), "python:3.10");
        assert_eq!(
            with_default_tag("localhost:5000/team/image"),
            "localhost:5000/team/image:latest"
        );
        assert_eq!(
            with_default_tag("ghcr.io/vlmhyperbenchteam/qwen2-vl:ubuntu22.04-cu124-torch2.4.0_v0.1.0"),
            "ghcr.io/vlmhyperbenchteam/qwen2-vl:ubuntu22.04-cu124-torch2.4.0_v0.1.0"
        );
        assert_eq!(with_default_tag("alpine@sha256:abc"), "alpine@sha256:abc");
    }

    #[test]
    fn test_connect_is_lazy() {
        // Building the client does not contact the daemon.
        let engine = DockerEngine::connect();
        if let Ok(engine) = engine {
            assert_eq!(engine.name(), "docker");
        }
    }
}
