// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Edge list validation, symmetrization and deduplication

use log::{debug, info, warn};
use std::collections::HashMap;

use super::csr::Graph;
use super::sssp::UNREACHABLE;
use super::{Edge, GraphError, VertexId};
use crate::config::GraphConfig;
use crate::storage::{Table, Value};

/// Largest accepted node count; ids run over `0..u32::MAX`
pub const MAX_VERTICES: usize = VertexId::MAX as usize;

/// Builds validated [`Graph`]s from edge lists
#[derive(Debug, Clone, Default)]
pub struct GraphBuilder {
    symmetrize: bool,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &GraphConfig) -> Self {
        Self {
            symmetrize: config.symmetrize,
        }
    }

    /// Add the reverse of every edge so the graph is undirected
    pub fn symmetrize(mut self, symmetrize: bool) -> Self {
        self.symmetrize = symmetrize;
        self
    }

    /// Validate `edges` against `[0, node_count)` and lay them out.
    ///
    /// Duplicate edges keep the weight of their first occurrence. When
    /// symmetrizing, `(u, v)` and `(v, u)` count as the same edge, so both
    /// directions always end up with one weight.
    pub fn build(&self, edges: &[Edge], node_count: usize) -> Result<Graph, GraphError> {
        // Vertex ids stay below u32::MAX so `node_count` itself fits a VertexId
        if node_count > MAX_VERTICES {
            return Err(GraphError::TooManyVertices {
                node_count,
                max: MAX_VERTICES,
            });
        }

        for (i, edge) in edges.iter().enumerate() {
            for id in [edge.src, edge.dst] {
                if id as usize >= node_count {
                    return Err(GraphError::InvalidNodeId {
                        edge: i,
                        id: id as i64,
                        node_count,
                    });
                }
            }
            if !edge.weight.is_finite() || edge.weight < 0.0 {
                return Err(GraphError::InvalidWeight {
                    edge: i,
                    reason: format!("{} is not a finite non-negative number", edge.weight),
                });
            }
        }

        let (accepted, conflicts) = if self.symmetrize {
            symmetrized(edges)
        } else {
            deduplicated(edges)
        };
        if conflicts > 0 {
            warn!(
                "Dropped {} duplicate edges with conflicting weights (kept first occurrence)",
                conflicts
            );
        }

        let total: f64 = accepted.iter().map(|e| e.weight).sum();
        if !total.is_finite() || total >= UNREACHABLE {
            return Err(GraphError::TotalWeightTooLarge { total });
        }

        let graph = Graph::from_edges(node_count, &accepted, self.symmetrize);
        match graph.edge_id_range() {
            Some((min, max)) => {
                debug!("Edge ids span [{}, {}] of [0, {})", min, max, node_count);
                if (max as usize) + 1 < node_count || min > 0 {
                    debug!("Graph has vertices outside the edge id span (isolated)");
                }
            }
            None => debug!("Graph has no edges"),
        }
        info!(
            "Built graph: {} vertices, {} edges (from {} input edges, symmetrize={})",
            node_count,
            graph.edge_count(),
            edges.len(),
            self.symmetrize
        );
        Ok(graph)
    }

    /// Build from a materialized table with integer `src`/`dst` columns.
    ///
    /// Without a weight column every edge weighs 1.0.
    pub fn from_table(
        &self,
        table: &Table,
        src: &str,
        dst: &str,
        weight: Option<&str>,
        node_count: usize,
    ) -> Result<Graph, GraphError> {
        let srcs = column(table, src)?;
        let dsts = column(table, dst)?;
        let weights = match weight {
            Some(name) => Some((name, column(table, name)?)),
            None => None,
        };

        let mut edges = Vec::with_capacity(srcs.len());
        for (i, (s, d)) in srcs.iter().zip(&dsts).enumerate() {
            let s = vertex(src, s, i, node_count)?;
            let d = vertex(dst, d, i, node_count)?;
            let w = match &weights {
                Some((name, values)) => values[i].as_f64().ok_or_else(|| GraphError::Column {
                    column: name.to_string(),
                    reason: format!("row {} has non-numeric weight {}", i, values[i]),
                })?,
                None => 1.0,
            };
            edges.push(Edge::new(s, d, w));
        }

        self.build(&edges, node_count)
    }
}

/// Drop repeated `(src, dst)` pairs, keeping the first weight
fn deduplicated(edges: &[Edge]) -> (Vec<Edge>, usize) {
    let mut seen: HashMap<(VertexId, VertexId), f64> = HashMap::with_capacity(edges.len());
    let mut accepted = Vec::with_capacity(edges.len());
    let mut conflicts = 0;
    for edge in edges {
        match seen.get(&(edge.src, edge.dst)) {
            Some(&weight) => {
                if weight != edge.weight {
                    conflicts += 1;
                }
            }
            None => {
                seen.insert((edge.src, edge.dst), edge.weight);
                accepted.push(*edge);
            }
        }
    }
    (accepted, conflicts)
}

/// Deduplicate on unordered pairs, then append every reverse edge
fn symmetrized(edges: &[Edge]) -> (Vec<Edge>, usize) {
    let mut seen: HashMap<(VertexId, VertexId), f64> = HashMap::with_capacity(edges.len());
    let mut forward = Vec::with_capacity(edges.len());
    let mut conflicts = 0;
    for edge in edges {
        let key = (edge.src.min(edge.dst), edge.src.max(edge.dst));
        match seen.get(&key) {
            Some(&weight) => {
                if weight != edge.weight {
                    conflicts += 1;
                }
            }
            None => {
                seen.insert(key, edge.weight);
                forward.push(*edge);
            }
        }
    }

    let reverse: Vec<Edge> = forward
        .iter()
        .filter(|e| e.src != e.dst)
        .map(Edge::reversed)
        .collect();
    forward.extend(reverse);
    (forward, conflicts)
}

fn column(table: &Table, name: &str) -> Result<Vec<Value>, GraphError> {
    table.column_values(name).map_err(|e| GraphError::Column {
        column: name.to_string(),
        reason: e.to_string(),
    })
}

fn vertex(column: &str, value: &Value, row: usize, node_count: usize) -> Result<VertexId, GraphError> {
    let id = match value {
        Value::Integer(id) => *id,
        other => {
            return Err(GraphError::Column {
                column: column.to_string(),
                reason: format!("row {} has non-integer vertex id {}", row, other),
            })
        }
    };
    if id < 0 || id as u64 >= node_count as u64 {
        return Err(GraphError::InvalidNodeId {
            edge: row,
            id,
            node_count,
        });
    }
    Ok(id as VertexId)
}
