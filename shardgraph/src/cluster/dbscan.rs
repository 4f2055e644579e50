// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! DBSCAN with deterministic labels
//!
//! Clusters are numbered in the order of their lowest-index core point, and a
//! border point reachable from several clusters joins the one numbered first.
//! Identical input and parameters therefore always reproduce identical labels,
//! however the neighbor queries were scheduled.

use log::{debug, info};
use rayon::prelude::*;
use std::collections::VecDeque;
use std::sync::Arc;

use super::grid::Grid;
use super::{ClusterError, ClusterParams, NOISE};
use crate::exec::ExecutionContext;
use crate::storage::{DataType, Field, Schema, Table, Value};

/// 2-D coordinate
pub type Point = [f64; 2];

/// Cluster label per input point; [`NOISE`] for points in no cluster
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterAssignment {
    labels: Vec<i64>,
    core: Vec<bool>,
    num_clusters: usize,
}

impl ClusterAssignment {
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    pub fn label(&self, i: usize) -> Option<i64> {
        self.labels.get(i).copied()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn num_clusters(&self) -> usize {
        self.num_clusters
    }

    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|&&l| l == NOISE).count()
    }

    /// Number of points per cluster, indexed by label
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.num_clusters];
        for &label in &self.labels {
            if label != NOISE {
                sizes[label as usize] += 1;
            }
        }
        sizes
    }

    pub fn is_core(&self, i: usize) -> bool {
        self.core.get(i).copied().unwrap_or(false)
    }

    /// `(row, cluster, core)` per input point
    pub fn to_table(&self) -> Table {
        let schema = Schema::new(vec![
            Field::new("row", DataType::Integer),
            Field::new("cluster", DataType::Integer),
            Field::new("core", DataType::Boolean),
        ]);
        let rows = (0..self.len()).map(|i| Value::Integer(i as i64)).collect();
        let labels = self.labels.iter().map(|&l| Value::Integer(l)).collect();
        let core = self.core.iter().map(|&c| Value::Boolean(c)).collect();
        Table::split_columns(Arc::new(schema), vec![rows, labels, core], 1)
    }
}

/// Cluster `points` with DBSCAN; neighbor queries run on the context's pool
pub fn cluster(
    ctx: &ExecutionContext,
    points: &[Point],
    params: &ClusterParams,
) -> Result<ClusterAssignment, ClusterError> {
    params.validate()?;
    if points.is_empty() {
        return Err(ClusterError::EmptyInput);
    }
    if let Some(i) = points
        .iter()
        .position(|p| !p[0].is_finite() || !p[1].is_finite())
    {
        return Err(ClusterError::InvalidParameter(format!(
            "point {} has non-finite coordinates {:?}",
            i, points[i]
        )));
    }

    let grid = Grid::new(points, params.eps);
    debug!(
        "Indexed {} points into {} grid cells (eps={})",
        points.len(),
        grid.num_cells(),
        params.eps
    );

    let neighborhoods: Vec<Vec<usize>> = ctx.install(|| {
        (0..points.len())
            .into_par_iter()
            .map(|i| grid.neighbors(i))
            .collect()
    });
    let core: Vec<bool> = neighborhoods
        .iter()
        .map(|n| n.len() >= params.min_samples)
        .collect();

    let mut labels = vec![NOISE; points.len()];
    let mut next_label = 0i64;
    let mut queue = VecDeque::new();

    for seed in 0..points.len() {
        if !core[seed] || labels[seed] != NOISE {
            continue;
        }
        labels[seed] = next_label;
        queue.push_back(seed);

        while let Some(p) = queue.pop_front() {
            for &q in &neighborhoods[p] {
                if labels[q] != NOISE {
                    continue;
                }
                labels[q] = next_label;
                if core[q] {
                    queue.push_back(q);
                }
            }
        }
        next_label += 1;
    }

    let assignment = ClusterAssignment {
        labels,
        core,
        num_clusters: next_label as usize,
    };
    info!(
        "DBSCAN: {} points, {} clusters, {} noise (eps={}, min_samples={})",
        points.len(),
        assignment.num_clusters(),
        assignment.noise_count(),
        params.eps,
        params.min_samples
    );
    Ok(assignment)
}

/// Cluster two numeric columns of a materialized table, row by row in global order
pub fn cluster_table(
    ctx: &ExecutionContext,
    table: &Table,
    x: &str,
    y: &str,
    params: &ClusterParams,
) -> Result<ClusterAssignment, ClusterError> {
    let xs = coordinates(table, x)?;
    let ys = coordinates(table, y)?;
    let points: Vec<Point> = xs.into_iter().zip(ys).map(|(x, y)| [x, y]).collect();
    cluster(ctx, &points, params)
}

fn coordinates(table: &Table, column: &str) -> Result<Vec<f64>, ClusterError> {
    let values = table
        .column_values(column)
        .map_err(|e| ClusterError::InvalidParameter(e.to_string()))?;
    values
        .iter()
        .enumerate()
        .map(|(row, v)| {
            v.as_f64().ok_or_else(|| {
                ClusterError::InvalidParameter(format!(
                    "column '{}' row {} is not numeric: {}",
                    column, row, v
                ))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(EngineConfig {
            worker_threads: Some(2),
            ..EngineConfig::default()
        })
        .unwrap()
    }

    fn two_blobs() -> Vec<Point> {
        vec![
            [10.0, 10.0],
            [0.0, 0.0],
            [0.5, 0.0],
            [0.0, 0.5],
            [10.5, 10.0],
            [10.0, 10.5],
            [50.0, 50.0],
        ]
    }

    #[test]
    fn test_two_clusters_and_noise() {
        let result = cluster(&ctx(), &two_blobs(), &ClusterParams::new(1.0, 3)).unwrap();
        // The blob containing point 0 is numbered first
        assert_eq!(result.labels(), &[0, 1, 1, 1, 0, 0, NOISE]);
        assert_eq!(result.num_clusters(), 2);
        assert_eq!(result.noise_count(), 1);
        assert_eq!(result.cluster_sizes(), vec![3, 3]);
        assert!(result.is_core(0));
        assert!(!result.is_core(6));
    }

    #[test]
    fn test_border_point_joins_first_cluster() {
        // Point 4 is within eps of one core point of each cluster
        let points = [
            [1.8, 0.0],
            [1.8, 0.5],
            [1.8, -0.5],
            [2.3, 0.0],
            [0.9, 0.0],
            [0.0, 0.0],
            [0.0, 0.5],
            [0.0, -0.5],
            [-0.5, 0.0],
        ];
        let result = cluster(&ctx(), &points, &ClusterParams::new(1.0, 4)).unwrap();
        assert_eq!(result.labels(), &[0, 0, 0, 0, 0, 1, 1, 1, 1]);
        assert!(!result.is_core(4));
        assert_eq!(result.cluster_sizes(), vec![5, 4]);
    }

    #[test]
    fn test_rejects_invalid_input() {
        let ctx = ctx();
        assert_eq!(
            cluster(&ctx, &[], &ClusterParams::new(1.0, 1)).unwrap_err(),
            ClusterError::EmptyInput
        );
        assert!(matches!(
            cluster(&ctx, &two_blobs(), &ClusterParams::new(0.0, 3)),
            Err(ClusterError::InvalidParameter(_))
        ));
        assert!(matches!(
            cluster(&ctx, &two_blobs(), &ClusterParams::new(1.0, 0)),
            Err(ClusterError::InvalidParameter(_))
        ));
        assert!(matches!(
            cluster(&ctx, &[[f64::NAN, 0.0]], &ClusterParams::new(1.0, 1)),
            Err(ClusterError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_to_table() {
        let result = cluster(&ctx(), &two_blobs(), &ClusterParams::new(1.0, 3)).unwrap();
        let table = result.to_table();
        assert_eq!(table.num_rows(), 7);
        assert_eq!(table.column_values("cluster").unwrap()[6], Value::Integer(NOISE));
    }
}
