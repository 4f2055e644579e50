// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Deferred dataframe handle
//!
//! A `LazyFrame` wraps one node of the operation graph. Every transformation
//! returns a new frame whose node references the previous one; nothing runs
//! until `compute`, `persist` or `compute_scalar` is called.
//!
//! ```ignore
//! let youngest = frame
//!     .groupby(["name"])
//!     .agg([("age", "age", AggregateFunction::Mean)])
//!     .sort("age", true)
//!     .head(10)
//!     .compute(&ctx)?;
//! ```

use log::info;
use std::sync::Arc;

use super::expr::Expr;
use super::logical::{AggregateFunction, AggregateItem, JoinType, OpKind, OpNode, PartitionFn};
use super::physical_executor::PhysicalExecutor;
use super::typecheck::SchemaResolver;
use crate::exec::{ExecutionContext, ExecutionError};
use crate::storage::{Partition, Row, Schema, Table, Value};

/// Handle to a deferred computation producing a table
#[derive(Debug, Clone)]
pub struct LazyFrame {
    node: Arc<OpNode>,
}

impl LazyFrame {
    /// Leaf frame over an ingested table
    pub fn scan(table: Table) -> Self {
        Self::from_kind(OpKind::Scan { table })
    }

    fn from_kind(kind: OpKind) -> Self {
        Self {
            node: OpNode::new(kind),
        }
    }

    pub fn node(&self) -> &Arc<OpNode> {
        &self.node
    }

    /// Keep rows where `predicate` evaluates to true
    pub fn filter(&self, predicate: Expr) -> Self {
        Self::from_kind(OpKind::Filter {
            input: self.node.clone(),
            predicate,
        })
    }

    pub fn select<I, S>(&self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_kind(OpKind::Select {
            input: self.node.clone(),
            columns: columns.into_iter().map(Into::into).collect(),
        })
    }

    /// Start a groupby on `keys`; finish it with [`GroupBy::agg`]
    pub fn groupby<I, S>(&self, keys: I) -> GroupBy
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        GroupBy {
            input: self.node.clone(),
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    /// Stable global sort by one column; nulls go last in both directions
    pub fn sort(&self, column: impl Into<String>, ascending: bool) -> Self {
        Self::from_kind(OpKind::Sort {
            input: self.node.clone(),
            column: column.into(),
            ascending,
        })
    }

    /// First `n` rows of the stable sort by `column`
    pub fn topk(&self, n: usize, column: impl Into<String>, ascending: bool) -> Self {
        Self::from_kind(OpKind::TopK {
            input: self.node.clone(),
            n,
            column: column.into(),
            ascending,
        })
    }

    pub fn nlargest(&self, n: usize, column: impl Into<String>) -> Self {
        self.topk(n, column, false)
    }

    pub fn nsmallest(&self, n: usize, column: impl Into<String>) -> Self {
        self.topk(n, column, true)
    }

    /// Equality join on columns present on both sides
    pub fn join<I, S>(&self, right: &LazyFrame, on: I, join_type: JoinType) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_kind(OpKind::Join {
            left: self.node.clone(),
            right: right.node.clone(),
            on: on.into_iter().map(Into::into).collect(),
            join_type,
        })
    }

    /// Distinct values of `column` in first-appearance order, as a one-column table
    pub fn unique(&self, column: impl Into<String>) -> Self {
        Self::from_kind(OpKind::Unique {
            input: self.node.clone(),
            column: column.into(),
        })
    }

    /// Drop rows whose `subset` columns repeat an earlier row; an empty subset means all columns
    pub fn drop_duplicates<I, S>(&self, subset: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_kind(OpKind::DropDuplicates {
            input: self.node.clone(),
            subset: subset.into_iter().map(Into::into).collect(),
        })
    }

    pub fn head(&self, n: usize) -> Self {
        Self::from_kind(OpKind::Head {
            input: self.node.clone(),
            n,
        })
    }

    /// Apply `func` to every partition independently.
    ///
    /// The rows it returns must conform to `schema`. Within one compute the
    /// function is called exactly once per input partition.
    pub fn map_partitions<F>(&self, schema: Schema, func: F) -> Self
    where
        F: Fn(&Partition) -> Result<Vec<Row>, String> + Send + Sync + 'static,
    {
        Self::from_kind(OpKind::MapPartitions {
            input: self.node.clone(),
            schema: Arc::new(schema),
            func: PartitionFn::new(func),
        })
    }

    /// Row-wise union; all inputs must share one schema
    pub fn concat(frames: &[LazyFrame]) -> Self {
        Self::from_kind(OpKind::Concat {
            inputs: frames.iter().map(|f| f.node.clone()).collect(),
        })
    }

    /// Output schema, typechecking the whole graph without executing it
    pub fn schema(&self) -> Result<Arc<Schema>, ExecutionError> {
        SchemaResolver::new().resolve(&self.node)
    }

    pub fn explain(&self) -> String {
        self.node.explain()
    }

    /// Materialize this frame
    pub fn compute(&self, ctx: &ExecutionContext) -> Result<Table, ExecutionError> {
        PhysicalExecutor::new(ctx).execute(&self.node)
    }

    /// Materialize now and return a frame over the result.
    ///
    /// Downstream computes reuse the materialized table instead of re-executing
    /// the graph under this node.
    pub fn persist(&self, ctx: &ExecutionContext) -> Result<Self, ExecutionError> {
        let table = self.compute(ctx)?;
        info!("Persisted {} ({} rows)", self.node.node_ref(), table.num_rows());
        Ok(Self::from_kind(OpKind::Persisted {
            table,
            input: self.node.clone(),
        }))
    }

    /// Reduce one column to a single value
    pub fn compute_scalar(
        &self,
        ctx: &ExecutionContext,
        column: impl Into<String>,
        function: AggregateFunction,
    ) -> Result<Value, ExecutionError> {
        let column = column.into();
        let reduced = Self::from_kind(OpKind::Aggregate {
            input: self.node.clone(),
            keys: Vec::new(),
            aggregates: vec![AggregateItem::new(column.clone(), column, function)],
        })
        .compute(ctx)?;

        Ok(reduced
            .partitions()
            .first()
            .filter(|p| p.num_rows() > 0)
            .map(|p| p.value(0, 0).clone())
            .unwrap_or(Value::Null))
    }
}

impl Table {
    /// Start a deferred computation over this table
    pub fn lazy(&self) -> LazyFrame {
        LazyFrame::scan(self.clone())
    }
}

/// Pending groupby, completed by [`GroupBy::agg`]
#[derive(Debug, Clone)]
pub struct GroupBy {
    input: Arc<OpNode>,
    keys: Vec<String>,
}

impl GroupBy {
    /// Aggregate each group. Groups with a null key are dropped.
    pub fn agg<I, A>(self, aggregates: I) -> LazyFrame
    where
        I: IntoIterator<Item = A>,
        A: Into<AggregateItem>,
    {
        LazyFrame::from_kind(OpKind::Aggregate {
            input: self.input,
            keys: self.keys,
            aggregates: aggregates.into_iter().map(Into::into).collect(),
        })
    }

    pub fn mean(self, column: impl Into<String>) -> LazyFrame {
        let column = column.into();
        self.agg([(column.clone(), column, AggregateFunction::Mean)])
    }

    pub fn count(self, column: impl Into<String>) -> LazyFrame {
        let column = column.into();
        self.agg([(column.clone(), column, AggregateFunction::Count)])
    }
}
