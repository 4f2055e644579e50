// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! ShardGraph command-line entry point

mod cli;

use clap::Parser;
use colored::Colorize;

use cli::{handle_cluster, handle_degree, handle_sssp, handle_version, load_config, Cli, Commands};

fn main() {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.level_filter())
        .format_timestamp_millis()
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Version => handle_version(),
        Commands::Sssp {
            edges,
            nodes,
            source,
            symmetrize,
            reachable_only,
            summary,
            path_to,
            format,
        } => handle_sssp(
            config,
            edges,
            nodes,
            source,
            symmetrize,
            reachable_only,
            summary,
            path_to,
            format,
        ),
        Commands::Cluster {
            points,
            eps,
            min_samples,
            format,
        } => handle_cluster(config, points, eps, min_samples, format),
        Commands::Degree {
            edges,
            nodes,
            top,
            symmetrize,
            format,
        } => handle_degree(config, edges, nodes, top, symmetrize, format),
    }
}
