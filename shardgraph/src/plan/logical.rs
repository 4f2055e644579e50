// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Deferred operation graph
//!
//! Each `OpNode` is an immutable node of an acyclic operation graph. Nodes
//! reference their inputs through `Arc`, so subgraphs can be shared by
//! several downstream operations without being copied. Creating a node never
//! executes anything.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::expr::Expr;
use crate::storage::{Partition, Row, Schema, Table};

static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of an operation node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    fn next() -> Self {
        NodeId(NEXT_NODE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Lightweight reference to a node used in error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeRef {
    pub id: NodeId,
    pub op: &'static str,
}

impl fmt::Display for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} ({})", self.id, self.op)
    }
}

/// Aggregation functions for groupby and scalar reductions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Mean,
    Count,
    Sum,
    Min,
    Max,
    /// Number of distinct non-null values
    NUnique,
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunction::Mean => "mean",
            AggregateFunction::Count => "count",
            AggregateFunction::Sum => "sum",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::NUnique => "nunique",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for AggregateFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mean" | "avg" => Ok(AggregateFunction::Mean),
            "count" => Ok(AggregateFunction::Count),
            "sum" => Ok(AggregateFunction::Sum),
            "min" => Ok(AggregateFunction::Min),
            "max" => Ok(AggregateFunction::Max),
            "nunique" => Ok(AggregateFunction::NUnique),
            _ => Err(format!("Unknown aggregate function: {}", s)),
        }
    }
}

/// One output column of an aggregation
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateItem {
    pub output: String,
    pub column: String,
    pub function: AggregateFunction,
}

impl AggregateItem {
    pub fn new(
        output: impl Into<String>,
        column: impl Into<String>,
        function: AggregateFunction,
    ) -> Self {
        Self {
            output: output.into(),
            column: column.into(),
            function,
        }
    }
}

impl<O: Into<String>, C: Into<String>> From<(O, C, AggregateFunction)> for AggregateItem {
    fn from((output, column, function): (O, C, AggregateFunction)) -> Self {
        AggregateItem::new(output, column, function)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
}

/// User function applied to each partition independently
#[derive(Clone)]
pub struct PartitionFn(pub(crate) Arc<dyn Fn(&Partition) -> Result<Vec<Row>, String> + Send + Sync>);

impl PartitionFn {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&Partition) -> Result<Vec<Row>, String> + Send + Sync + 'static,
    {
        PartitionFn(Arc::new(f))
    }
}

impl fmt::Debug for PartitionFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PartitionFn")
    }
}

/// Operator kinds of the deferred graph
#[derive(Debug, Clone)]
pub enum OpKind {
    /// Leaf over an ingested table
    Scan { table: Table },
    /// Materialized result of `input`, reused by downstream computes
    Persisted { table: Table, input: Arc<OpNode> },
    Filter { input: Arc<OpNode>, predicate: Expr },
    Select { input: Arc<OpNode>, columns: Vec<String> },
    Aggregate {
        input: Arc<OpNode>,
        keys: Vec<String>,
        aggregates: Vec<AggregateItem>,
    },
    Sort {
        input: Arc<OpNode>,
        column: String,
        ascending: bool,
    },
    TopK {
        input: Arc<OpNode>,
        n: usize,
        column: String,
        ascending: bool,
    },
    Join {
        left: Arc<OpNode>,
        right: Arc<OpNode>,
        on: Vec<String>,
        join_type: JoinType,
    },
    Unique { input: Arc<OpNode>, column: String },
    DropDuplicates { input: Arc<OpNode>, subset: Vec<String> },
    Head { input: Arc<OpNode>, n: usize },
    MapPartitions {
        input: Arc<OpNode>,
        schema: Arc<Schema>,
        func: PartitionFn,
    },
    Concat { inputs: Vec<Arc<OpNode>> },
}

impl OpKind {
    pub fn name(&self) -> &'static str {
        match self {
            OpKind::Scan { .. } => "scan",
            OpKind::Persisted { .. } => "persisted",
            OpKind::Filter { .. } => "filter",
            OpKind::Select { .. } => "select",
            OpKind::Aggregate { .. } => "aggregate",
            OpKind::Sort { .. } => "sort",
            OpKind::TopK { .. } => "topk",
            OpKind::Join { .. } => "join",
            OpKind::Unique { .. } => "unique",
            OpKind::DropDuplicates { .. } => "drop_duplicates",
            OpKind::Head { .. } => "head",
            OpKind::MapPartitions { .. } => "map_partitions",
            OpKind::Concat { .. } => "concat",
        }
    }

    /// Inputs that must be computed before this operator runs.
    ///
    /// A persisted node has no pending inputs: its table is already materialized.
    pub fn inputs(&self) -> Vec<&Arc<OpNode>> {
        match self {
            OpKind::Scan { .. } | OpKind::Persisted { .. } => vec![],
            OpKind::Filter { input, .. }
            | OpKind::Select { input, .. }
            | OpKind::Aggregate { input, .. }
            | OpKind::Sort { input, .. }
            | OpKind::TopK { input, .. }
            | OpKind::Unique { input, .. }
            | OpKind::DropDuplicates { input, .. }
            | OpKind::Head { input, .. }
            | OpKind::MapPartitions { input, .. } => vec![input],
            OpKind::Join { left, right, .. } => vec![left, right],
            OpKind::Concat { inputs } => inputs.iter().collect(),
        }
    }

    fn describe(&self) -> String {
        match self {
            OpKind::Scan { table } => format!(
                "Scan rows={} partitions={}",
                table.num_rows(),
                table.num_partitions()
            ),
            OpKind::Persisted { table, input } => {
                format!("Persisted rows={} from={}", table.num_rows(), input.id())
            }
            OpKind::Filter { predicate, .. } => format!("Filter {}", predicate),
            OpKind::Select { columns, .. } => format!("Select [{}]", columns.join(", ")),
            OpKind::Aggregate {
                keys, aggregates, ..
            } => {
                let aggs: Vec<String> = aggregates
                    .iter()
                    .map(|a| format!("{}={}({})", a.output, a.function, a.column))
                    .collect();
                format!("Aggregate by [{}] {}", keys.join(", "), aggs.join(", "))
            }
            OpKind::Sort {
                column, ascending, ..
            } => format!("Sort {} {}", column, direction(*ascending)),
            OpKind::TopK {
                n,
                column,
                ascending,
                ..
            } => format!("TopK {} by {} {}", n, column, direction(*ascending)),
            OpKind::Join { on, join_type, .. } => {
                format!("Join {:?} on [{}]", join_type, on.join(", "))
            }
            OpKind::Unique { column, .. } => format!("Unique {}", column),
            OpKind::DropDuplicates { subset, .. } => {
                format!("DropDuplicates [{}]", subset.join(", "))
            }
            OpKind::Head { n, .. } => format!("Head {}", n),
            OpKind::MapPartitions { schema, .. } => format!("MapPartitions -> {}", schema),
            OpKind::Concat { inputs } => format!("Concat {} inputs", inputs.len()),
        }
    }
}

fn direction(ascending: bool) -> &'static str {
    if ascending {
        "ASC"
    } else {
        "DESC"
    }
}

/// Immutable node of the deferred operation graph
#[derive(Debug)]
pub struct OpNode {
    id: NodeId,
    kind: OpKind,
}

impl OpNode {
    pub fn new(kind: OpKind) -> Arc<Self> {
        Arc::new(Self {
            id: NodeId::next(),
            kind,
        })
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn kind(&self) -> &OpKind {
        &self.kind
    }

    pub fn node_ref(&self) -> NodeRef {
        NodeRef {
            id: self.id,
            op: self.kind.name(),
        }
    }

    /// Render the subgraph rooted here as an indented plan
    pub fn explain(&self) -> String {
        let mut out = String::new();
        self.explain_into(&mut out, 0);
        out
    }

    fn explain_into(&self, out: &mut String, depth: usize) {
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{} {}\n", self.id, self.kind.describe()));
        for input in self.kind.inputs() {
            input.explain_into(out, depth + 1);
        }
    }
}
