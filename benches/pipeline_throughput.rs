// Benchmark for ShardGraph ingest, query pipelines, shortest paths and clustering

use shardgraph::prelude::*;
use std::time::{Duration, Instant};

const ROWS: usize = 200_000;
const VERTICES: usize = 50_000;
const EDGES: usize = 200_000;
const POINTS: usize = 20_000;

fn main() {
    println!("=== ShardGraph Pipeline Benchmark ===\n");

    let mut rng = fastrand::Rng::with_seed(42);

    for partitions in [1, 4, 16] {
        let ctx = ExecutionContext::new(EngineConfig {
            partition_count: partitions,
            ..EngineConfig::default()
        })
        .unwrap();
        println!(
            "Partitions: {} (worker threads: {})",
            partitions,
            ctx.num_threads()
        );

        // Ingest
        let schema = Schema::new(vec![
            Field::new("county", DataType::Categorical),
            Field::new("age", DataType::Integer),
            Field::new("lat", DataType::Float),
        ]);
        let rows: Vec<Row> = (0..ROWS)
            .map(|_| {
                vec![
                    format!("county-{}", rng.usize(..50)).into(),
                    (rng.i64(0..100)).into(),
                    (rng.f64() * 10.0 + 50.0).into(),
                ]
            })
            .collect();
        let start = Instant::now();
        let table = Table::ingest(schema, rows, partitions).unwrap();
        report("ingest", start.elapsed());

        // Filter + groupby mean + sort
        let start = Instant::now();
        let result = table
            .lazy()
            .filter(col("age").lt(lit(30i64)))
            .groupby(["county"])
            .mean("lat")
            .sort("lat", false)
            .compute(&ctx)
            .unwrap();
        report("filter/groupby/sort", start.elapsed());
        assert_eq!(result.num_rows(), 50);

        // Top-k
        let start = Instant::now();
        table.lazy().nlargest(10, "lat").compute(&ctx).unwrap();
        report("nlargest(10)", start.elapsed());
        println!();
    }

    // Shortest paths
    let edges: Vec<Edge> = (0..EDGES)
        .map(|_| {
            Edge::new(
                rng.u32(..VERTICES as u32),
                rng.u32(..VERTICES as u32),
                rng.f64() * 100.0,
            )
        })
        .collect();
    let start = Instant::now();
    let graph = GraphBuilder::new()
        .symmetrize(true)
        .build(&edges, VERTICES)
        .unwrap();
    report("graph build (symmetrized)", start.elapsed());

    let start = Instant::now();
    let distances = sssp(&graph, 0).unwrap();
    report("sssp", start.elapsed());
    println!("  reachable: {}", distances.reachable().count());

    // Clustering
    let ctx = ExecutionContext::new(EngineConfig::default()).unwrap();
    let points: Vec<[f64; 2]> = (0..POINTS)
        .map(|_| [rng.f64() * 100.0, rng.f64() * 100.0])
        .collect();
    let start = Instant::now();
    let assignment = cluster(&ctx, &points, &ClusterParams::new(1.0, 5)).unwrap();
    report("dbscan", start.elapsed());
    println!(
        "  clusters: {}, noise: {}",
        assignment.num_clusters(),
        assignment.noise_count()
    );
}

fn report(name: &str, elapsed: Duration) {
    println!("  {:<28} {:?} ({:.2} ms)", name, elapsed, elapsed.as_secs_f64() * 1000.0);
}
