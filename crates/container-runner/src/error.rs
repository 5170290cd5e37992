// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for container execution.

/// Errors that can occur while preparing, running or cleaning up a container.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// The container spec cannot be handed to the engine as-is.
    #[error("invalid container spec: {0}")]
    InvalidSpec(String),

    /// The current working directory could not be determined.
    #[error("cannot resolve current directory: {0}")]
    CurrentDir(#[source] std::io::Error),

    /// The container engine could not be reached.
    #[error("container engine unavailable: {0}")]
    EngineUnavailable(String),

    /// The image is missing locally and could not be pulled.
    #[error("failed to pull image '{image}': {detail}")]
    ImagePull { image: String, detail: String },

    /// The engine refused to create the container.
    #[error("failed to create container from '{image}': {detail}")]
    CreateFailed { image: String, detail: String },

    /// An operation on an existing container failed.
    #[error("{op} failed for container {id}: {detail}")]
    OperationFailed {
        id: String,
        op: &'static str,
        detail: String,
    },

    /// Container output could not be written to the sink.
    #[error("failed to write container output: {0}")]
    OutputError(#[from] std::io::Error),
}
