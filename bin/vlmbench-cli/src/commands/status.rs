// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `vlmbench status` command: check the container engine.
//!
//! Connects to the local Docker daemon and reports its version and
//! whether a GPU-capable runtime is registered.

use anyhow::Context;
use container_runner::{ContainerEngine, DockerEngine};

pub async fn execute() -> anyhow::Result<()> {
    super::banner("vlmbench · Engine Status");

    let engine = DockerEngine::connect()?;
    let info = engine
        .info()
        .await
        .context("cannot reach the Docker daemon")?;

    println!("  Engine");
    println!("   Name:         {}", info.engine);
    println!("   Version:      {}", info.version);
    println!("   API:          {}", info.api_version);
    println!("   Platform:     {}", info.platform);
    println!();

    println!("  Runtimes");
    for runtime in &info.runtimes {
        let marker = if info.default_runtime.as_deref() == Some(runtime.as_str()) {
            " (default)"
        } else {
            ""
        };
        println!("   {runtime}{marker}");
    }
    if info.runtimes.is_empty() {
        println!("   none reported");
    }
    println!();

    println!("  Assessment");
    if info.gpu_runtime_available() {
        println!("   GPU:          nvidia runtime available");
    } else {
        println!("   GPU:          no nvidia runtime; use_gpu stages will fail");
    }
    println!();
    println!("{}", info.summary());

    Ok(())
}
