// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Single-source shortest paths (Dijkstra)

use log::{debug, info};
use rayon::prelude::*;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::Arc;

use super::csr::Graph;
use super::{GraphError, VertexId};
use crate::exec::ExecutionContext;
use crate::storage::{DataType, Field, Schema, Table, Value};

/// Distance of vertices with no path from the source.
///
/// The graph builder rejects edge sets whose total weight is not strictly
/// below this value, so no real path length can reach it.
pub const UNREACHABLE: f64 = f64::MAX;

/// Frontier entry; ordered so that `BinaryHeap` pops the smallest distance first
#[derive(Debug, Clone, Copy, PartialEq)]
struct State {
    distance: f64,
    vertex: VertexId,
}

impl Eq for State {}

impl Ord for State {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .distance
            .total_cmp(&self.distance)
            .then_with(|| other.vertex.cmp(&self.vertex))
    }
}

impl PartialOrd for State {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Shortest distances from one source, with predecessors for path recovery
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceVector {
    source: VertexId,
    distances: Vec<f64>,
    predecessors: Vec<Option<VertexId>>,
}

impl DistanceVector {
    pub fn source(&self) -> VertexId {
        self.source
    }

    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }

    /// Distance per vertex; unreachable vertices hold [`UNREACHABLE`]
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    pub fn distance(&self, v: VertexId) -> Option<f64> {
        self.distances.get(v as usize).copied()
    }

    pub fn predecessor(&self, v: VertexId) -> Option<VertexId> {
        self.predecessors.get(v as usize).copied().flatten()
    }

    pub fn is_reachable(&self, v: VertexId) -> bool {
        self.distance(v).is_some_and(|d| d < UNREACHABLE)
    }

    /// `(vertex, distance)` of every reachable vertex, the source included
    pub fn reachable(&self) -> impl Iterator<Item = (VertexId, f64)> + '_ {
        self.distances
            .iter()
            .enumerate()
            .filter(|(_, d)| **d < UNREACHABLE)
            .map(|(v, &d)| (v as VertexId, d))
    }

    /// One shortest path from the source to `target`, both ends included
    pub fn path_to(&self, target: VertexId) -> Option<Vec<VertexId>> {
        if !self.is_reachable(target) {
            return None;
        }
        let mut path = vec![target];
        let mut current = target;
        while let Some(prev) = self.predecessor(current) {
            path.push(prev);
            current = prev;
        }
        path.reverse();
        Some(path)
    }

    /// `(vertex, distance, predecessor)` rows, one per vertex
    pub fn to_table(&self) -> Table {
        let schema = Schema::new(vec![
            Field::new("vertex", DataType::Integer),
            Field::new("distance", DataType::Float),
            Field::nullable("predecessor", DataType::Integer),
        ]);
        let vertices = (0..self.len()).map(|v| Value::Integer(v as i64)).collect();
        let distances = self.distances.iter().map(|&d| Value::Float(d)).collect();
        let predecessors = self
            .predecessors
            .iter()
            .map(|p| p.map_or(Value::Null, |v| Value::Integer(v as i64)))
            .collect();
        Table::split_columns(Arc::new(schema), vec![vertices, distances, predecessors], 1)
    }

    /// Statistics over reachable vertices
    pub fn summary(&self) -> DistanceSummary {
        DistanceSummary::from_distances(self.reachable().map(|(_, d)| d))
    }
}

/// count / mean / std / min / max over the reachable distances
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceSummary {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation; needs at least two values
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl DistanceSummary {
    fn from_distances(distances: impl Iterator<Item = f64>) -> Self {
        let values: Vec<f64> = distances.collect();
        let count = values.len();
        if count == 0 {
            return Self {
                count,
                mean: None,
                std: None,
                min: None,
                max: None,
            };
        }

        let mean = values.iter().sum::<f64>() / count as f64;
        let std = (count > 1).then(|| {
            let variance =
                values.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / (count - 1) as f64;
            variance.sqrt()
        });
        Self {
            count,
            mean: Some(mean),
            std,
            min: values.iter().copied().reduce(f64::min),
            max: values.iter().copied().reduce(f64::max),
        }
    }
}

/// Dijkstra from `source` over non-negative weights
pub fn sssp(graph: &Graph, source: VertexId) -> Result<DistanceVector, GraphError> {
    if !graph.contains(source) {
        return Err(GraphError::UnknownSource {
            source_id: source as i64,
            node_count: graph.node_count(),
        });
    }

    let n = graph.node_count();
    let mut distances = vec![UNREACHABLE; n];
    let mut predecessors: Vec<Option<VertexId>> = vec![None; n];
    let mut heap = BinaryHeap::new();

    distances[source as usize] = 0.0;
    heap.push(State {
        distance: 0.0,
        vertex: source,
    });

    let mut settled = 0usize;
    while let Some(State { distance, vertex }) = heap.pop() {
        // Stale entry
        if distance > distances[vertex as usize] {
            continue;
        }
        settled += 1;

        for (next, weight) in graph.neighbors(vertex) {
            let candidate = distance + weight;
            if candidate < distances[next as usize] {
                distances[next as usize] = candidate;
                predecessors[next as usize] = Some(vertex);
                heap.push(State {
                    distance: candidate,
                    vertex: next,
                });
            }
        }
    }

    let result = DistanceVector {
        source,
        distances,
        predecessors,
    };
    info!(
        "sssp from {}: {} of {} vertices reachable",
        source,
        result.reachable().count(),
        n
    );
    debug!("sssp from {} settled {} frontier entries", source, settled);
    Ok(result)
}

/// Independent sssp runs, one per source, on the context's worker pool
pub fn sssp_many(
    ctx: &ExecutionContext,
    graph: &Graph,
    sources: &[VertexId],
) -> Result<Vec<DistanceVector>, GraphError> {
    ctx.install(|| sources.par_iter().map(|&s| sssp(graph, s)).collect())
}
