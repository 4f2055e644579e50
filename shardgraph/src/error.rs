// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Crate-level error type

use thiserror::Error;

use crate::cluster::ClusterError;
use crate::config::ConfigError;
use crate::exec::ExecutionError;
use crate::graph::GraphError;
use crate::storage::StorageError;

/// Any error raised by ShardGraph
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Cluster(#[from] ClusterError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
