// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Shell command executed inside a stage container.
//!
//! Every stage container runs the same shape of command:
//! ```text
//! sh -c 'pip install <packages> && python -u <script> && exec bash'
//! ```
//! The install step is dropped when there are no packages, and the
//! trailing interactive shell only appears when the container is kept
//! alive after the script finishes.

use std::fmt;

/// Install step + unbuffered Python script + optional interactive shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerCommand {
    script_path: String,
    packages: Vec<String>,
    keep_shell: bool,
}

impl ContainerCommand {
    /// Creates a command running `script_path` with `python -u`.
    pub fn new(script_path: impl Into<String>, packages: &[String], keep_shell: bool) -> Self {
        Self {
            script_path: script_path.into(),
            packages: packages.to_vec(),
            keep_shell,
        }
    }

    /// Script executed inside the container.
    pub fn script_path(&self) -> &str {
        &self.script_path
    }

    /// Ordered shell steps, empty steps removed.
    pub fn steps(&self) -> Vec<String> {
        let install = if self.packages.is_empty() {
            String::new()
        } else {
            format!("pip install {}", self.packages.join(" "))
        };
        let run = format!("python -u {}", self.script_path);
        let shell = if self.keep_shell { "exec bash" } else { "" }.to_string();

        [install, run, shell]
            .into_iter()
            .filter(|step| !step.is_empty())
            .collect()
    }

    /// The steps joined with `&&`, as passed to `sh -c`.
    pub fn shell_line(&self) -> String {
        self.steps().join(" && ")
    }

    /// Argument vector handed to the engine.
    pub fn argv(&self) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), self.shell_line()]
    }
}

impl fmt::Display for ContainerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sh -c '{}'", self.shell_line())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_only() {
        let cmd = ContainerCommand::new("/workspace/bench_stages/run_eval.py", &[], false);
        assert_eq!(cmd.to_string(), "sh -c 'python -u /workspace/bench_stages/run_eval.py'");
    }

    #[test]
    fn test_with_packages() {
        let pkgs = vec!["numpy".to_string(), "pandas".to_string()];
        let cmd = ContainerCommand::new("/workspace/run.py", &pkgs, false);
        assert_eq!(
            cmd.shell_line(),
            "pip install numpy pandas && python -u /workspace/run.py"
        );
    }

    #[test]
    fn test_keep_shell() {
        let pkgs = vec!["wheels/benchmark_scheduler-0.1.0-py3-none-any.whl".to_string()];
        let cmd = ContainerCommand::new("/workspace/bench_stages/run_vlm.py", &pkgs, true);
        assert_eq!(
            cmd.to_string(),
            "sh -c 'pip install wheels/benchmark_scheduler-0.1.0-py3-none-any.whl \
             && python -u /workspace/bench_stages/run_vlm.py && exec bash'"
        );
        assert_eq!(cmd.steps().len(), 3);
    }

    #[test]
    fn test_argv() {
        let cmd = ContainerCommand::new("/workspace/run.py", &[], true);
        assert_eq!(
            cmd.argv(),
            vec!["sh", "-c", "python -u /workspace/run.py && exec bash"]
        );
    }
}
