// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # container-runner
//!
//! Launches stage scripts inside containers and streams their output.
//!
//! A [`ContainerSpec`] describes one launch: image, bind mounts, the
//! script to run (optionally after a `pip install`), GPU access and
//! environment. [`run_container`] drives it through a [`ContainerEngine`]:
//! make sure the image exists, create, start, stream output line by line,
//! wait for the exit code and remove the container.
//!
//! [`DockerEngine`] talks to the local Docker daemon. [`DryRunEngine`]
//! records calls without launching anything.
//!
//! ```no_run
//! use container_runner::{run_container, ContainerSpec, DockerEngine, Interrupt, VolumeMount};
//!
//! # async fn demo() -> Result<(), container_runner::ContainerError> {
//! let volumes = container_runner::host_paths_to_abs(
//!     &[VolumeMount::new("pipeline/data", "/workspace/data")],
//!     None,
//! )?;
//! let spec = ContainerSpec::new("python:3.11", "/workspace/data/hello.py").volumes(volumes);
//! let engine = DockerEngine::connect()?;
//! let outcome = run_container(&engine, &spec, &mut std::io::stdout(), &Interrupt::new()).await?;
//! assert!(outcome.succeeded());
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod docker;
pub mod dry_run;
pub mod engine;
pub mod error;
pub mod interrupt;
pub mod output;
pub mod run;
pub mod spec;
pub mod volume;

pub use command::ContainerCommand;
pub use docker::DockerEngine;
pub use dry_run::{DryRunEngine, EngineCall, ScriptedRun};
pub use engine::{ContainerEngine, EngineInfo, OutputStream};
pub use error::ContainerError;
pub use interrupt::Interrupt;
pub use run::{run_container, ContainerOutcome};
pub use spec::ContainerSpec;
pub use volume::{host_paths_to_abs, VolumeMount};
