// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Uniform grid index for fixed-radius neighbor queries

use std::collections::HashMap;

use super::dbscan::Point;

type Cell = (i64, i64);

/// Buckets point indices by square cells of side `eps`.
///
/// Every point within `eps` of a query lies in the query's cell or one of
/// its eight neighbors.
#[derive(Debug)]
pub struct Grid<'a> {
    points: &'a [Point],
    eps: f64,
    cells: HashMap<Cell, Vec<usize>>,
}

impl<'a> Grid<'a> {
    pub fn new(points: &'a [Point], eps: f64) -> Self {
        let mut cells: HashMap<Cell, Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            cells.entry(cell_of(p, eps)).or_default().push(i);
        }
        Self { points, eps, cells }
    }

    pub fn num_cells(&self) -> usize {
        self.cells.len()
    }

    /// Indices of all points within `eps` of point `i` (itself included), ascending
    pub fn neighbors(&self, i: usize) -> Vec<usize> {
        let p = self.points[i];
        let (cx, cy) = cell_of(&p, self.eps);
        let eps_sq = self.eps * self.eps;

        let mut found = Vec::new();
        for dx in -1..=1 {
            for dy in -1..=1 {
                let Some(bucket) = self.cells.get(&(cx.saturating_add(dx), cy.saturating_add(dy)))
                else {
                    continue;
                };
                found.extend(bucket.iter().copied().filter(|&j| {
                    let q = self.points[j];
                    let (ex, ey) = (p[0] - q[0], p[1] - q[1]);
                    ex * ex + ey * ey <= eps_sq
                }));
            }
        }
        found.sort_unstable();
        found
    }
}

fn cell_of(p: &Point, eps: f64) -> Cell {
    ((p[0] / eps).floor() as i64, (p[1] / eps).floor() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_cross_cell_borders() {
        let points = [[0.0, 0.0], [0.9, 0.0], [1.1, 0.0], [3.0, 3.0], [-0.5, -0.5]];
        let grid = Grid::new(&points, 1.0);
        assert_eq!(grid.neighbors(0), vec![0, 1, 4]);
        assert_eq!(grid.neighbors(1), vec![0, 1, 2]);
        assert_eq!(grid.neighbors(3), vec![3]);
    }

    #[test]
    fn test_radius_is_inclusive() {
        let points = [[0.0, 0.0], [2.0, 0.0]];
        let grid = Grid::new(&points, 2.0);
        assert_eq!(grid.neighbors(0), vec![0, 1]);
    }
}
