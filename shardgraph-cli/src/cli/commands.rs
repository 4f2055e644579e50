// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! CLI command definitions for ShardGraph

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only errors
    Error,
    /// Warnings and errors
    Warn,
    /// Info, warnings, and errors
    Info,
    /// Debug messages and above (verbose)
    Debug,
    /// All messages including trace (very verbose)
    Trace,
    /// Disable all logging
    Off,
}

impl LogLevel {
    /// Convert to log::LevelFilter
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
            LogLevel::Off => log::LevelFilter::Off,
        }
    }
}

/// ShardGraph CLI - partitioned graph analytics
#[derive(Parser)]
#[command(name = "shardgraph")]
#[command(about = "ShardGraph - shortest paths, clustering and degree analysis over partitioned tables")]
#[command(version)]
pub struct Cli {
    /// Engine configuration file (JSON)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Set log level (error, warn, info, debug, trace, off)
    #[arg(short = 'l', long = "log-level", global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Verbose mode (equivalent to --log-level debug)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Effective log level: `--verbose` wins, then `--log-level`, then warnings only
    pub fn level_filter(&self) -> log::LevelFilter {
        if self.verbose {
            log::LevelFilter::Debug
        } else {
            self.log_level
                .map(LogLevel::to_level_filter)
                .unwrap_or(log::LevelFilter::Warn)
        }
    }
}

/// Available CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Show detailed version information
    Version,

    /// Shortest distances from one source vertex
    Sssp {
        /// Edge list: JSON array of {"src", "dst", "weight"}
        #[arg(long)]
        edges: PathBuf,

        /// Number of vertices; ids must lie in [0, nodes)
        #[arg(long)]
        nodes: usize,

        /// Source vertex
        #[arg(long)]
        source: u32,

        /// Treat edges as undirected
        #[arg(long)]
        symmetrize: bool,

        /// Only list vertices reachable from the source
        #[arg(long)]
        reachable_only: bool,

        /// Print distance statistics instead of the full vector
        #[arg(long)]
        summary: bool,

        /// Print one shortest path to this vertex
        #[arg(long)]
        path_to: Option<u32>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// DBSCAN clustering of 2-D points
    Cluster {
        /// Points: JSON array of [x, y]
        #[arg(long)]
        points: PathBuf,

        /// Neighborhood radius (overrides config)
        #[arg(long)]
        eps: Option<f64>,

        /// Core point threshold (overrides config)
        #[arg(long)]
        min_samples: Option<usize>,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Vertices with the highest degree
    Degree {
        /// Edge list: JSON array of {"src", "dst", "weight"}
        #[arg(long)]
        edges: PathBuf,

        /// Number of vertices; ids must lie in [0, nodes)
        #[arg(long)]
        nodes: usize,

        /// How many vertices to list
        #[arg(long, default_value_t = 10)]
        top: usize,

        /// Treat edges as undirected
        #[arg(long)]
        symmetrize: bool,

        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(OutputFormat::Table),
            "json" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}
