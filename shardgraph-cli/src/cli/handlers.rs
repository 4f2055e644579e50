// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Command handlers

use colored::Colorize;
use log::info;
use std::path::{Path, PathBuf};

use super::commands::OutputFormat;
use super::output::ResultFormatter;
use shardgraph::cluster::{cluster, Point};
use shardgraph::config::EngineConfig;
use shardgraph::exec::ExecutionContext;
use shardgraph::graph::{sssp, Edge, GraphBuilder, UNREACHABLE};
use shardgraph::plan::{col, lit};

type HandlerResult = Result<(), Box<dyn std::error::Error>>;

/// Load the configuration file if given, otherwise defaults
pub fn load_config(path: Option<&Path>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            let config = EngineConfig::from_file(path)?;
            info!("Loaded configuration from {:?}", path);
            Ok(config)
        }
        None => Ok(EngineConfig::default()),
    }
}

pub fn handle_version() -> HandlerResult {
    println!("{}", "ShardGraph".bold().green());
    println!("  version: {}", env!("CARGO_PKG_VERSION"));
    println!("  library: shardgraph {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub fn handle_sssp(
    config: EngineConfig,
    edges: PathBuf,
    nodes: usize,
    source: u32,
    symmetrize: bool,
    reachable_only: bool,
    summary: bool,
    path_to: Option<u32>,
    format: OutputFormat,
) -> HandlerResult {
    let edges = read_edges(&edges)?;
    let mut builder = GraphBuilder::from_config(&config.graph);
    if symmetrize {
        builder = builder.symmetrize(true);
    }
    let graph = builder.build(&edges, nodes)?;
    let distances = sssp(&graph, source)?;

    if let Some(target) = path_to {
        match distances.path_to(target) {
            Some(path) => {
                let hops: Vec<String> = path.iter().map(|v| v.to_string()).collect();
                println!("{}", hops.join(" -> "));
            }
            None => println!("{}", format!("Vertex {} is unreachable from {}", target, source).yellow()),
        }
        return Ok(());
    }

    if summary {
        let stats = distances.summary();
        match format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&stats)?),
            _ => {
                println!("count {}", stats.count);
                for (name, value) in [
                    ("mean", stats.mean),
                    ("std", stats.std),
                    ("min", stats.min),
                    ("max", stats.max),
                ] {
                    match value {
                        Some(v) => println!("{:<5} {}", name, v),
                        None => println!("{:<5} NULL", name),
                    }
                }
            }
        }
        return Ok(());
    }

    let mut table = distances.to_table();
    if reachable_only {
        let ctx = ExecutionContext::new(config)?;
        table = table
            .lazy()
            .filter(col("distance").lt(lit(UNREACHABLE)))
            .compute(&ctx)?;
    }
    println!("{}", ResultFormatter::format(&table, format));
    Ok(())
}

pub fn handle_cluster(
    config: EngineConfig,
    points: PathBuf,
    eps: Option<f64>,
    min_samples: Option<usize>,
    format: OutputFormat,
) -> HandlerResult {
    let mut params = config.cluster.params();
    if let Some(eps) = eps {
        params.eps = eps;
    }
    if let Some(min_samples) = min_samples {
        params.min_samples = min_samples;
    }

    let text = std::fs::read_to_string(&points)?;
    let points: Vec<Point> = serde_json::from_str(&text)?;

    let ctx = ExecutionContext::new(config)?;
    let assignment = cluster(&ctx, &points, &params)?;

    println!("{}", ResultFormatter::format(&assignment.to_table(), format));
    if format == OutputFormat::Table {
        println!(
            "{}",
            format!(
                "{} clusters, {} noise points",
                assignment.num_clusters(),
                assignment.noise_count()
            )
            .green()
        );
    }
    Ok(())
}

pub fn handle_degree(
    config: EngineConfig,
    edges: PathBuf,
    nodes: usize,
    top: usize,
    symmetrize: bool,
    format: OutputFormat,
) -> HandlerResult {
    let edges = read_edges(&edges)?;
    let mut builder = GraphBuilder::from_config(&config.graph);
    if symmetrize {
        builder = builder.symmetrize(true);
    }
    let graph = builder.build(&edges, nodes)?;

    let degrees = graph.degree_table().repartition(config.partition_count)?;
    let ctx = ExecutionContext::new(config)?;
    let table = degrees.lazy().nlargest(top, "degree").compute(&ctx)?;

    println!("{}", ResultFormatter::format(&table, format));
    Ok(())
}

fn read_edges(path: &Path) -> Result<Vec<Edge>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read edge file {:?}: {}", path, e))?;
    let edges: Vec<Edge> = serde_json::from_str(&text)?;
    info!("Read {} edges from {:?}", edges.len(), path);
    Ok(edges)
}
