//! Integration tests for graph building and shortest paths
//!
//! Random graphs are checked against petgraph's Dijkstra as a brute-force
//! oracle; the road-network style scenarios exercise the table bridge
//! (planner output -> graph -> distances -> planner input).

use petgraph::graph::{DiGraph, NodeIndex};
use shardgraph::graph::{GraphError, VertexId};
use shardgraph::prelude::*;

fn ctx() -> ExecutionContext {
    let _ = env_logger::builder().is_test(true).try_init();
    ExecutionContext::new(EngineConfig {
        worker_threads: Some(4),
        ..EngineConfig::default()
    })
    .expect("Failed to create execution context")
}

fn random_edges(rng: &mut fastrand::Rng, nodes: u32, count: usize) -> Vec<Edge> {
    (0..count)
        .map(|_| Edge::new(rng.u32(..nodes), rng.u32(..nodes), rng.u32(1..20) as f64))
        .collect()
}

/// Distances from `source` computed by petgraph over the accepted edge set
fn oracle(graph: &Graph, source: VertexId) -> Vec<f64> {
    let mut reference: DiGraph<(), f64> = DiGraph::new();
    let nodes: Vec<NodeIndex> = (0..graph.node_count())
        .map(|_| reference.add_node(()))
        .collect();
    for edge in graph.edges() {
        reference.add_edge(nodes[edge.src as usize], nodes[edge.dst as usize], edge.weight);
    }

    let found = petgraph::algo::dijkstra(&reference, nodes[source as usize], None, |e| *e.weight());
    nodes
        .iter()
        .map(|n| found.get(n).copied().unwrap_or(UNREACHABLE))
        .collect()
}

#[test]
fn test_symmetrize_scenario() {
    let graph = GraphBuilder::new()
        .symmetrize(true)
        .build(&[Edge::new(0, 1, 1.0)], 2)
        .unwrap();

    let mut edges: Vec<_> = graph.edges().collect();
    edges.sort_by_key(|e| (e.src, e.dst));
    assert_eq!(edges, vec![Edge::new(0, 1, 1.0), Edge::new(1, 0, 1.0)]);
    assert_eq!(graph.edge_id_range(), Some((0, 1)));
    assert_eq!(graph.node_count(), 2);
}

#[test]
fn test_sssp_scenario_with_isolated_vertex() {
    let graph = GraphBuilder::new()
        .build(&[Edge::new(0, 1, 1.0), Edge::new(1, 2, 1.0)], 4)
        .unwrap();
    let distances = sssp(&graph, 0).unwrap();
    assert_eq!(distances.distances(), &[0.0, 1.0, 2.0, UNREACHABLE]);
}

#[test]
fn test_symmetrized_edges_are_paired() {
    let mut rng = fastrand::Rng::with_seed(3);
    let edges = random_edges(&mut rng, 25, 120);
    let graph = GraphBuilder::new().symmetrize(true).build(&edges, 25).unwrap();

    let all: Vec<Edge> = graph.edges().collect();
    for edge in &all {
        assert!(
            all.contains(&edge.reversed()),
            "missing reverse of {:?}",
            edge
        );
    }

    let again = GraphBuilder::new().symmetrize(true).build(&all, 25).unwrap();
    let mut first: Vec<_> = all.iter().map(|e| (e.src, e.dst, e.weight as u64)).collect();
    let mut second: Vec<_> = again.edges().map(|e| (e.src, e.dst, e.weight as u64)).collect();
    first.sort();
    second.sort();
    assert_eq!(first, second);
}

#[test]
fn test_sssp_matches_oracle_on_random_graphs() {
    let mut rng = fastrand::Rng::with_seed(42);
    for round in 0..20 {
        let nodes = rng.u32(2..40);
        let edge_count = rng.usize(0..120);
        let edges = random_edges(&mut rng, nodes, edge_count);
        let graph = GraphBuilder::new()
            .symmetrize(round % 2 == 0)
            .build(&edges, nodes as usize)
            .unwrap();

        let source = rng.u32(..nodes);
        let distances = sssp(&graph, source).unwrap();
        assert_eq!(distances.distance(source), Some(0.0));
        assert_eq!(
            distances.distances(),
            oracle(&graph, source).as_slice(),
            "round {} source {}",
            round,
            source
        );

        for (v, d) in distances.reachable() {
            let path = distances.path_to(v).unwrap();
            assert_eq!(path.first(), Some(&source));
            assert_eq!(path.last(), Some(&v));
            let length: f64 = path
                .windows(2)
                .map(|hop| {
                    graph
                        .neighbors(hop[0])
                        .find(|(next, _)| *next == hop[1])
                        .map(|(_, w)| w)
                        .unwrap()
                })
                .sum();
            assert_eq!(length, d);
        }
    }
}

#[test]
fn test_sssp_many_matches_single_runs() {
    let ctx = ctx();
    let mut rng = fastrand::Rng::with_seed(9);
    let edges = random_edges(&mut rng, 30, 90);
    let graph = GraphBuilder::new().symmetrize(true).build(&edges, 30).unwrap();

    let sources: Vec<VertexId> = (0..30).step_by(3).collect();
    let batch = sssp_many(&ctx, &graph, &sources).unwrap();
    for (source, distances) in sources.iter().zip(&batch) {
        assert_eq!(distances, &sssp(&graph, *source).unwrap());
    }

    assert!(matches!(
        sssp_many(&ctx, &graph, &[0, 30]),
        Err(GraphError::UnknownSource { source_id: 30, .. })
    ));
}

#[test]
fn test_table_bridge_round_trip() {
    let ctx = ctx();
    let schema = Schema::new(vec![
        Field::new("src", DataType::Integer),
        Field::new("dst", DataType::Integer),
        Field::new("length_s", DataType::Float),
    ]);
    let rows: Vec<Row> = vec![
        vec![0i64.into(), 1i64.into(), 10.0.into()],
        vec![1i64.into(), 2i64.into(), 5.0.into()],
        vec![2i64.into(), 3i64.into(), 1.0.into()],
        vec![0i64.into(), 1i64.into(), 10.0.into()],
    ];
    let roads = Table::ingest(schema, rows, 2).unwrap();

    // Make undirected with the planner: concat the reversed edges, drop duplicates
    let reversed = roads
        .lazy()
        .map_partitions(Schema::clone(roads.schema()), |partition| {
            Ok(partition
                .rows()
                .map(|r| vec![r[1].clone(), r[0].clone(), r[2].clone()])
                .collect())
        });
    let undirected = LazyFrame::concat(&[roads.lazy(), reversed])
        .drop_duplicates(["src", "dst"])
        .compute(&ctx)
        .unwrap();
    assert_eq!(undirected.num_rows(), 6);

    let graph = GraphBuilder::new()
        .from_table(&undirected, "src", "dst", Some("length_s"), 4)
        .unwrap();
    let distances = sssp(&graph, 3).unwrap();
    assert_eq!(distances.distances(), &[16.0, 6.0, 1.0, 0.0]);

    // Farthest reachable vertices, back through the planner
    let farthest = distances
        .to_table()
        .lazy()
        .filter(col("distance").lt(lit(UNREACHABLE)))
        .nlargest(2, "distance")
        .select(["vertex"])
        .compute(&ctx)
        .unwrap();
    assert_eq!(
        farthest.column_values("vertex").unwrap(),
        vec![Value::Integer(0), Value::Integer(1)]
    );
}

#[test]
fn test_degree_ranking_through_planner() {
    let ctx = ctx();
    let edges = [
        Edge::new(0, 1, 1.0),
        Edge::new(0, 2, 1.0),
        Edge::new(0, 3, 1.0),
        Edge::new(2, 3, 1.0),
    ];
    let graph = GraphBuilder::new().symmetrize(true).build(&edges, 5).unwrap();
    let top = graph
        .degree_table()
        .repartition(3)
        .unwrap()
        .lazy()
        .nlargest(3, "degree")
        .compute(&ctx)
        .unwrap();

    assert_eq!(
        top.rows(),
        vec![
            vec![Value::Integer(0), Value::Integer(3)],
            vec![Value::Integer(2), Value::Integer(2)],
            vec![Value::Integer(3), Value::Integer(2)],
        ]
    );
}

#[test]
fn test_invalid_edges_rejected() {
    let builder = GraphBuilder::new();
    assert!(matches!(
        builder.build(&[Edge::new(0, 4, 1.0)], 4),
        Err(GraphError::InvalidNodeId { id: 4, .. })
    ));
    assert!(matches!(
        builder.build(&[Edge::new(0, 1, f64::INFINITY)], 2),
        Err(GraphError::InvalidWeight { .. })
    ));

    let graph = builder.build(&[], 3).unwrap();
    assert_eq!(graph.edge_count(), 0);
    assert!(matches!(
        sssp(&graph, 3),
        Err(GraphError::UnknownSource { .. })
    ));
}
