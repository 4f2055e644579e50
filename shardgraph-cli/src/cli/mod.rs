// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI module for ShardGraph
//!
//! Provides one-shot analysis commands over JSON edge and point files:
//! shortest paths, clustering and degree ranking.

pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{Cli, Commands};
pub use handlers::{handle_cluster, handle_degree, handle_sssp, handle_version, load_config};
