//! Integration tests for DBSCAN clustering
//!
//! Checks label determinism across reruns, worker counts and table
//! partitioning, and the structural invariants of an assignment.

use shardgraph::cluster::ClusterError;
use shardgraph::prelude::*;
use std::collections::HashSet;

fn ctx(threads: usize) -> ExecutionContext {
    let _ = env_logger::builder().is_test(true).try_init();
    ExecutionContext::new(EngineConfig {
        worker_threads: Some(threads),
        ..EngineConfig::default()
    })
    .expect("Failed to create execution context")
}

/// Three gaussian-ish blobs plus uniform background noise
fn blobs(rng: &mut fastrand::Rng) -> Vec<[f64; 2]> {
    let centers = [[0.0, 0.0], [20.0, 5.0], [8.0, 30.0]];
    let mut points = Vec::new();
    for _ in 0..150 {
        let c = centers[rng.usize(..centers.len())];
        points.push([c[0] + rng.f64() * 3.0, c[1] + rng.f64() * 3.0]);
    }
    for _ in 0..30 {
        points.push([rng.f64() * 60.0 - 10.0, rng.f64() * 60.0 - 10.0]);
    }
    points
}

fn points_table(points: &[[f64; 2]], partitions: usize) -> Table {
    let schema = Schema::new(vec![
        Field::new("x", DataType::Float),
        Field::new("y", DataType::Float),
    ]);
    let rows = points
        .iter()
        .map(|p| vec![Value::Float(p[0]), Value::Float(p[1])])
        .collect();
    Table::ingest(schema, rows, partitions).unwrap()
}

#[test]
fn test_labels_are_deterministic() {
    let mut rng = fastrand::Rng::with_seed(5);
    let points = blobs(&mut rng);
    let params = ClusterParams::new(1.0, 4);

    let baseline = cluster(&ctx(1), &points, &params).unwrap();
    for threads in [1, 2, 8] {
        assert_eq!(cluster(&ctx(threads), &points, &params).unwrap(), baseline);
    }
}

#[test]
fn test_assignment_is_disjoint_and_exhaustive() {
    let mut rng = fastrand::Rng::with_seed(17);
    let points = blobs(&mut rng);
    let result = cluster(&ctx(4), &points, &ClusterParams::new(1.0, 4)).unwrap();

    assert_eq!(result.len(), points.len());
    assert!(result.num_clusters() >= 3);
    assert_eq!(
        result.cluster_sizes().iter().sum::<usize>() + result.noise_count(),
        points.len()
    );

    // Labels are contiguous from 0 and numbered by lowest-index core point
    let mut first_core = vec![usize::MAX; result.num_clusters()];
    for (i, &label) in result.labels().iter().enumerate() {
        assert!(label == NOISE || (0..result.num_clusters() as i64).contains(&label));
        if label != NOISE && result.is_core(i) {
            first_core[label as usize] = first_core[label as usize].min(i);
        }
        if label == NOISE {
            assert!(!result.is_core(i));
        }
    }
    assert!(first_core.windows(2).all(|w| w[0] < w[1]));
    let distinct: HashSet<i64> = result.labels().iter().copied().filter(|&l| l != NOISE).collect();
    assert_eq!(distinct.len(), result.num_clusters());
}

#[test]
fn test_cluster_table_ignores_partitioning() {
    let mut rng = fastrand::Rng::with_seed(23);
    let points = blobs(&mut rng);
    let params = ClusterParams::new(1.2, 5);
    let ctx = ctx(4);

    let direct = cluster(&ctx, &points, &params).unwrap();
    for partitions in [1, 3, 10] {
        let table = points_table(&points, partitions);
        assert_eq!(cluster_table(&ctx, &table, "x", "y", &params).unwrap(), direct);
    }
}

#[test]
fn test_core_points_of_noise_free_blob() {
    let points: Vec<[f64; 2]> = (0..5)
        .flat_map(|i| (0..5).map(move |j| [i as f64 * 0.5, j as f64 * 0.5]))
        .collect();
    let result = cluster(&ctx(2), &points, &ClusterParams::new(0.5, 3)).unwrap();
    assert_eq!(result.num_clusters(), 1);
    assert_eq!(result.noise_count(), 0);
    assert!((0..points.len()).all(|i| result.is_core(i)));

    let table = result.to_table();
    assert_eq!(table.schema().names(), vec!["row", "cluster", "core"]);
}

#[test]
fn test_invalid_inputs() {
    let ctx = ctx(2);
    assert_eq!(
        cluster(&ctx, &[], &ClusterParams::new(1.0, 1)),
        Err(ClusterError::EmptyInput)
    );
    assert!(matches!(
        cluster(&ctx, &[[0.0, 0.0]], &ClusterParams::new(-1.0, 1)),
        Err(ClusterError::InvalidParameter(_))
    ));
    assert!(matches!(
        cluster(&ctx, &[[0.0, f64::INFINITY]], &ClusterParams::new(1.0, 1)),
        Err(ClusterError::InvalidParameter(_))
    ));

    let table = points_table(&[[0.0, 0.0]], 1);
    assert!(matches!(
        cluster_table(&ctx, &table, "x", "z", &ClusterParams::new(1.0, 1)),
        Err(ClusterError::InvalidParameter(_))
    ));
}
