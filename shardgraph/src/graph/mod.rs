// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Weighted graphs over a dense vertex identifier space
//!
//! Edges are validated and deduplicated by [`GraphBuilder`], stored in
//! compressed sparse row form by [`Graph`], and queried by the single-source
//! shortest path engine in [`sssp`].

pub mod builder;
pub mod csr;
pub mod sssp;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use builder::{GraphBuilder, MAX_VERTICES};
pub use csr::Graph;
pub use sssp::{sssp, sssp_many, DistanceSummary, DistanceVector, UNREACHABLE};

/// Vertex identifier, dense in `[0, node_count)`
pub type VertexId = u32;

/// Directed weighted edge
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub src: VertexId,
    pub dst: VertexId,
    pub weight: f64,
}

impl Edge {
    pub fn new(src: VertexId, dst: VertexId, weight: f64) -> Self {
        Self { src, dst, weight }
    }

    pub fn reversed(&self) -> Self {
        Self {
            src: self.dst,
            dst: self.src,
            weight: self.weight,
        }
    }
}

impl From<(VertexId, VertexId, f64)> for Edge {
    fn from((src, dst, weight): (VertexId, VertexId, f64)) -> Self {
        Edge::new(src, dst, weight)
    }
}

/// Graph construction and traversal errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GraphError {
    #[error("Invalid node id {id} in edge {edge}: must be below node count {node_count}")]
    InvalidNodeId {
        edge: usize,
        id: i64,
        node_count: usize,
    },

    #[error("Unknown source vertex {source_id}: graph has {node_count} vertices")]
    UnknownSource { source_id: i64, node_count: usize },

    #[error("Invalid weight in edge {edge}: {reason}")]
    InvalidWeight { edge: usize, reason: String },

    #[error("Node count {node_count} exceeds the {max} vertices addressable by u32 ids")]
    TooManyVertices { node_count: usize, max: usize },

    #[error("Total edge weight {total} must stay below the unreachable sentinel")]
    TotalWeightTooLarge { total: f64 },

    #[error("Cannot build graph from column '{column}': {reason}")]
    Column { column: String, reason: String },
}
