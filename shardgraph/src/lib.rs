// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! # ShardGraph
//!
//! Partitioned, lazily evaluated tables plus the graph and clustering
//! analytics that run over them.
//!
//! - [`storage`]: typed columnar tables split into partitions
//! - [`plan`]: deferred operation graphs (`LazyFrame`) executed partition-parallel
//! - [`exec`]: worker pool, cancellation and execution errors
//! - [`graph`]: graph building and single-source shortest paths
//! - [`cluster`]: DBSCAN over 2-D points
//!
//! ```ignore
//! use shardgraph::prelude::*;
//!
//! let ctx = ExecutionContext::new(EngineConfig::default())?;
//! let table = Table::ingest(schema, rows, ctx.config().partition_count)?;
//! let north = table.lazy().filter(col("lat").gt(lit(1.0))).compute(&ctx)?;
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod exec;
pub mod graph;
pub mod plan;
pub mod storage;

pub use error::{Error, Result};

/// Commonly used types
pub mod prelude {
    pub use crate::cluster::{cluster, cluster_table, ClusterAssignment, ClusterParams, NOISE};
    pub use crate::config::EngineConfig;
    pub use crate::exec::{CancellationToken, ExecutionContext, ExecutionError};
    pub use crate::graph::{sssp, sssp_many, DistanceVector, Edge, Graph, GraphBuilder, UNREACHABLE};
    pub use crate::plan::{col, lit, AggregateFunction, Expr, JoinType, LazyFrame};
    pub use crate::storage::{DataType, Field, Row, Schema, Table, Value};
}
