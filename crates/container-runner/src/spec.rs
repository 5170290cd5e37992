// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Everything the engine needs to launch one stage container.

use crate::{ContainerCommand, ContainerError, VolumeMount};

/// Description of a single container run.
///
/// # Example
/// ```
/// use container_runner::{ContainerSpec, VolumeMount};
///
/// let spec = ContainerSpec::new("python:3.10", "/workspace/scripts/run.py")
///     .volumes(vec![VolumeMount::new("/host/scripts", "/workspace/scripts")])
///     .packages(vec!["numpy".into(), "pandas".into()])
///     .use_gpu(true)
///     .env("HUGGING_FACE_TOKEN", "hf_xxx");
/// assert_eq!(spec.binds(), vec!["/host/scripts:/workspace/scripts:rw"]);
/// assert!(spec.command().to_string().starts_with("sh -c 'pip install numpy pandas"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    /// Image reference.
    pub image: String,
    /// Python script executed inside the container.
    pub script_path: String,
    /// Packages installed with `pip` before the script runs.
    pub packages: Vec<String>,
    /// Host directories mounted into the container.
    pub volumes: Vec<VolumeMount>,
    /// Request every GPU the engine exposes.
    pub use_gpu: bool,
    /// Leave the container running with an interactive shell afterwards.
    pub keep_container: bool,
    /// Environment variables, in insertion order.
    pub env: Vec<(String, String)>,
}

impl ContainerSpec {
    /// Creates a spec running `script_path` in `image` with no mounts.
    pub fn new(image: impl Into<String>, script_path: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            script_path: script_path.into(),
            packages: Vec::new(),
            volumes: Vec::new(),
            use_gpu: false,
            keep_container: false,
            env: Vec::new(),
        }
    }

    pub fn packages(mut self, packages: Vec<String>) -> Self {
        self.packages = packages;
        self
    }

    pub fn volumes(mut self, volumes: Vec<VolumeMount>) -> Self {
        self.volumes = volumes;
        self
    }

    pub fn use_gpu(mut self, use_gpu: bool) -> Self {
        self.use_gpu = use_gpu;
        self
    }

    pub fn keep_container(mut self, keep: bool) -> Self {
        self.keep_container = keep;
        self
    }

    /// Adds one environment variable. A later value for the same key wins.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.env.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.env.push((key, value)),
        }
        self
    }

    /// Adds several environment variables.
    pub fn envs<I, K, V>(self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        vars.into_iter().fold(self, |spec, (k, v)| spec.env(k, v))
    }

    /// The shell command derived from the script, packages and keep flag.
    pub fn command(&self) -> ContainerCommand {
        ContainerCommand::new(&self.script_path, &self.packages, self.keep_container)
    }

    /// Bind strings for every mount.
    pub fn binds(&self) -> Vec<String> {
        self.volumes.iter().map(VolumeMount::bind).collect()
    }

    /// Environment as `KEY=VALUE` strings.
    pub fn env_list(&self) -> Vec<String> {
        self.env.iter().map(|(k, v)| format!("{k}={v}")).collect()
    }

    /// Checks that the launch can be handed to an engine.
    ///
    /// Checks:
    /// - Image and script path are non-empty.
    /// - Host paths are absolute (relative ones would be taken as named volumes).
    /// - Container mount points are absolute.
    /// - Environment keys are non-empty and contain no `=`.
    pub fn validate(&self) -> Result<(), ContainerError> {
        if self.image.trim().is_empty() {
            return Err(ContainerError::InvalidSpec("image is empty".into()));
        }
        if self.script_path.trim().is_empty() {
            return Err(ContainerError::InvalidSpec("script path is empty".into()));
        }
        for v in &self.volumes {
            if !v.host.is_absolute() {
                return Err(ContainerError::InvalidSpec(format!(
                    "host path '{}' is not absolute",
                    v.host.display()
                )));
            }
            if !v.container.starts_with('/') {
                return Err(ContainerError::InvalidSpec(format!(
                    "container path '{}' is not absolute",
                    v.container
                )));
            }
        }
        if let Some((key, _)) = self
            .env
            .iter()
            .find(|(k, _)| k.is_empty() || k.contains('='))
        {
            return Err(ContainerError::InvalidSpec(format!(
                "invalid environment variable name '{key}'"
            )));
        }
        Ok(())
    }
}
