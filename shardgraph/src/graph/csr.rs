// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Compressed sparse row storage for validated graphs

use std::sync::Arc;

use super::{Edge, VertexId};
use crate::storage::{DataType, Field, Schema, Table, Value};

/// Immutable weighted graph in compressed sparse row form.
///
/// Outgoing edges of vertex `v` occupy `targets[offsets[v]..offsets[v + 1]]`
/// (and the same range of `weights`), in the order the builder accepted them.
#[derive(Debug, Clone)]
pub struct Graph {
    node_count: usize,
    offsets: Vec<usize>,
    targets: Vec<VertexId>,
    weights: Vec<f64>,
    in_degrees: Vec<usize>,
    symmetric: bool,
}

impl Graph {
    /// Lay out already validated, deduplicated edges
    pub(crate) fn from_edges(node_count: usize, edges: &[Edge], symmetric: bool) -> Self {
        let mut offsets = vec![0usize; node_count + 1];
        let mut in_degrees = vec![0usize; node_count];
        for edge in edges {
            offsets[edge.src as usize + 1] += 1;
            in_degrees[edge.dst as usize] += 1;
        }
        for v in 0..node_count {
            offsets[v + 1] += offsets[v];
        }

        // Counting sort keeps the accepted order within each source
        let mut cursor = offsets.clone();
        let mut targets = vec![0; edges.len()];
        let mut weights = vec![0.0; edges.len()];
        for edge in edges {
            let slot = &mut cursor[edge.src as usize];
            targets[*slot] = edge.dst;
            weights[*slot] = edge.weight;
            *slot += 1;
        }

        Self {
            node_count,
            offsets,
            targets,
            weights,
            in_degrees,
            symmetric,
        }
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn edge_count(&self) -> usize {
        self.targets.len()
    }

    /// Whether the reverse of every edge was added at build time
    pub fn is_symmetric(&self) -> bool {
        self.symmetric
    }

    pub fn contains(&self, v: VertexId) -> bool {
        (v as usize) < self.node_count
    }

    /// Outgoing `(target, weight)` pairs of `v`; empty for unknown vertices
    pub fn neighbors(&self, v: VertexId) -> impl Iterator<Item = (VertexId, f64)> + '_ {
        let range = self.range(v);
        self.targets[range.clone()]
            .iter()
            .copied()
            .zip(self.weights[range].iter().copied())
    }

    fn range(&self, v: VertexId) -> std::ops::Range<usize> {
        let v = v as usize;
        if v < self.node_count {
            self.offsets[v]..self.offsets[v + 1]
        } else {
            0..0
        }
    }

    /// All edges, grouped by source vertex
    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        (0..self.node_count as VertexId).flat_map(move |src| {
            self.neighbors(src)
                .map(move |(dst, weight)| Edge { src, dst, weight })
        })
    }

    pub fn out_degree(&self, v: VertexId) -> usize {
        self.range(v).len()
    }

    pub fn in_degree(&self, v: VertexId) -> usize {
        self.in_degrees.get(v as usize).copied().unwrap_or(0)
    }

    /// Number of incident edges.
    ///
    /// On a symmetric graph every undirected edge is stored in both
    /// directions, so the out-degree already is the undirected degree.
    pub fn degree(&self, v: VertexId) -> usize {
        if self.symmetric {
            self.out_degree(v)
        } else {
            self.out_degree(v) + self.in_degree(v)
        }
    }

    /// Smallest and largest vertex id that appears in any edge
    pub fn edge_id_range(&self) -> Option<(VertexId, VertexId)> {
        let mut range: Option<(VertexId, VertexId)> = None;
        for edge in self.edges() {
            let lo = edge.src.min(edge.dst);
            let hi = edge.src.max(edge.dst);
            range = Some(match range {
                Some((min, max)) => (min.min(lo), max.max(hi)),
                None => (lo, hi),
            });
        }
        range
    }

    /// Sum of all edge weights
    pub fn total_weight(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// `(vertex, degree)` for every vertex, as a single-partition table
    pub fn degree_table(&self) -> Table {
        let schema = Schema::new(vec![
            Field::new("vertex", DataType::Integer),
            Field::new("degree", DataType::Integer),
        ]);
        let vertices = (0..self.node_count as VertexId)
            .map(|v| Value::Integer(v as i64))
            .collect();
        let degrees = (0..self.node_count as VertexId)
            .map(|v| Value::Integer(self.degree(v) as i64))
            .collect();
        Table::split_columns(Arc::new(schema), vec![vertices, degrees], 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path() -> Graph {
        let edges = [Edge::new(0, 1, 1.0), Edge::new(1, 2, 2.0), Edge::new(0, 2, 5.0)];
        Graph::from_edges(4, &edges, false)
    }

    #[test]
    fn test_csr_layout() {
        let graph = path();
        assert_eq!(graph.node_count(), 4);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(
            graph.neighbors(0).collect::<Vec<_>>(),
            vec![(1, 1.0), (2, 5.0)]
        );
        assert_eq!(graph.neighbors(3).count(), 0);
        assert_eq!(graph.neighbors(99).count(), 0);
        assert_eq!(graph.total_weight(), 8.0);
    }

    #[test]
    fn test_degrees() {
        let graph = path();
        assert_eq!(graph.out_degree(0), 2);
        assert_eq!(graph.in_degree(2), 2);
        assert_eq!(graph.degree(1), 2);
        assert_eq!(graph.degree(3), 0);
    }

    #[test]
    fn test_edge_id_range_ignores_isolated_vertices() {
        assert_eq!(path().edge_id_range(), Some((0, 2)));
        assert_eq!(Graph::from_edges(3, &[], false).edge_id_range(), None);
    }

    #[test]
    fn test_degree_table() {
        let table = path().degree_table();
        assert_eq!(table.num_rows(), 4);
        assert_eq!(
            table.column_values("degree").unwrap(),
            vec![Value::Integer(2), Value::Integer(2), Value::Integer(2), Value::Integer(0)]
        );
    }
}
