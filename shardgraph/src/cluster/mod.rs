// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Density-based clustering of 2-D points

pub mod dbscan;
pub mod grid;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use dbscan::{cluster, cluster_table, ClusterAssignment, Point};

/// Label of points that belong to no cluster
pub const NOISE: i64 = -1;

/// Clustering errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusterError {
    #[error("Cannot cluster an empty point set")]
    EmptyInput,

    #[error("Invalid clustering parameter: {0}")]
    InvalidParameter(String),
}

/// DBSCAN sensitivity
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterParams {
    /// Neighborhood radius (Euclidean, inclusive)
    pub eps: f64,
    /// Points within `eps` (the point itself included) needed for a core point
    pub min_samples: usize,
}

impl ClusterParams {
    pub fn new(eps: f64, min_samples: usize) -> Self {
        Self { eps, min_samples }
    }

    pub fn validate(&self) -> Result<(), ClusterError> {
        if !self.eps.is_finite() || self.eps <= 0.0 {
            return Err(ClusterError::InvalidParameter(format!(
                "eps must be a positive finite number, got {}",
                self.eps
            )));
        }
        if self.min_samples < 1 {
            return Err(ClusterError::InvalidParameter(
                "min_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
