// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Engine configuration
//!
//! Partitioning layout and algorithm sensitivity are performance and tuning
//! parameters, not part of any data format. They are grouped here so the CLI
//! and library callers can load them from a single JSON document.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::cluster::ClusterParams;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Graph construction settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Add the reverse of every edge before deduplication
    pub symmetrize: bool,
}

/// Clustering sensitivity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Neighborhood radius
    pub eps: f64,
    /// Minimum neighborhood size (including the point itself) for a core point
    pub min_samples: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            eps: 1.0,
            min_samples: 5,
        }
    }
}

impl ClusterConfig {
    pub fn params(&self) -> ClusterParams {
        ClusterParams::new(self.eps, self.min_samples)
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Number of shards tables are split into at ingestion
    pub partition_count: usize,
    /// Worker threads for partition-parallel stages; `None` uses one per core
    pub worker_threads: Option<usize>,
    pub graph: GraphConfig,
    pub cluster: ClusterConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partition_count: 4,
            worker_threads: None,
            graph: GraphConfig::default(),
            cluster: ClusterConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// Parse and validate a JSON configuration document
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.partition_count == 0 {
            return Err(ConfigError::Invalid(
                "partition_count must be at least 1".to_string(),
            ));
        }
        if self.worker_threads == Some(0) {
            return Err(ConfigError::Invalid(
                "worker_threads must be at least 1 when set".to_string(),
            ));
        }
        self.cluster
            .params()
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}
