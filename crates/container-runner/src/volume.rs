// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bind mounts between host directories and container paths.

use crate::ContainerError;
use std::path::{Path, PathBuf};

/// A host directory mounted into a container.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct VolumeMount {
    /// Directory on the host. Must be absolute before it reaches the engine.
    pub host: PathBuf,
    /// Mount point inside the container.
    pub container: String,
    /// Mount read-only instead of read-write.
    #[serde(default)]
    pub read_only: bool,
}

impl VolumeMount {
    /// Creates a read-write mount.
    pub fn new(host: impl Into<PathBuf>, container: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            container: container.into(),
            read_only: false,
        }
    }

    /// Returns the mount mode string used in bind specs.
    pub fn mode(&self) -> &'static str {
        if self.read_only {
            "ro"
        } else {
            "rw"
        }
    }

    /// Returns the engine bind string, `host:container:mode`.
    pub fn bind(&self) -> String {
        format!("{}:{}:{}", self.host.display(), self.container, self.mode())
    }
}

/// Makes every host path absolute by joining it onto `current_dir`.
///
/// Falls back to the process working directory when `current_dir` is
/// `None`. Absolute host paths and all container paths are left as they
/// are, and the mount order is preserved.
///
/// # Example
/// ```
/// use container_runner::{host_paths_to_abs, VolumeMount};
/// use std::path::Path;
///
/// let volumes = vec![VolumeMount::new("pipeline/data", "/workspace/data")];
/// let abs = host_paths_to_abs(&volumes, Some(Path::new("/home/user/project"))).unwrap();
/// assert_eq!(abs[0].host, Path::new("/home/user/project/pipeline/data"));
/// assert_eq!(abs[0].container, "/workspace/data");
/// ```
pub fn host_paths_to_abs(
    volumes: &[VolumeMount],
    current_dir: Option<&Path>,
) -> Result<Vec<VolumeMount>, ContainerError> {
    let base = match current_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().map_err(ContainerError::CurrentDir)?,
    };

    Ok(volumes
        .iter()
        .map(|v| VolumeMount {
            host: base.join(&v.host),
            ..v.clone()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline_volumes() -> Vec<VolumeMount> {
        vec![
            VolumeMount::new("pipeline/data", "/workspace/data"),
            VolumeMount::new("pipeline/bench_stages", "/workspace/bench_stages"),
            VolumeMount::new("pipeline/wheels", "/workspace/wheels"),
        ]
    }

    #[test]
    fn test_join_with_explicit_dir() {
        let abs = host_paths_to_abs(&pipeline_volumes(), Some(Path::new("/home/user/project")))
            .unwrap();
        let hosts: Vec<_> = abs.iter().map(|v| v.host.clone()).collect();
        assert_eq!(
            hosts,
            vec![
                PathBuf::from("/home/user/project/pipeline/data"),
                PathBuf::from("/home/user/project/pipeline/bench_stages"),
                PathBuf::from("/home/user/project/pipeline/wheels"),
            ]
        );
        assert_eq!(abs[1].container, "/workspace/bench_stages");
    }

    #[test]
    fn test_defaults_to_working_directory() {
        let abs = host_paths_to_abs(&pipeline_volumes(), None).unwrap();
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(abs[0].host, cwd.join("pipeline/data"));
        assert!(abs.iter().all(|v| v.host.is_absolute()));
    }

    #[test]
    fn test_absolute_host_kept() {
        let volumes = vec![VolumeMount::new("/data/models", "/workspace/models")];
        let abs = host_paths_to_abs(&volumes, Some(Path::new("/home/user"))).unwrap();
        assert_eq!(abs[0].host, PathBuf::from("/data/models"));
    }

    #[test]
    fn test_empty_volumes() {
        assert!(host_paths_to_abs(&[], Some(Path::new("/x"))).unwrap().is_empty());
    }

    #[test]
    fn test_bind_string() {
        let mut v = VolumeMount::new("/host/data", "/workspace/data");
        assert_eq!(v.bind(), "/host/data:/workspace/data:rw");
        v.read_only = true;
        assert_eq!(v.bind(), "/host/data:/workspace/data:ro");
    }
}
