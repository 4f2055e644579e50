// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Physical execution of deferred operation graphs
//!
//! This module materializes an operation graph bottom-up. Every operator is a
//! stage: its partition work items run in parallel on the context's worker
//! pool and the stage completes only when all of them have finished (a
//! barrier). Operators that need a global view (sort, top-k, unique,
//! drop_duplicates, head, aggregate merge) first do partition-local work in
//! parallel and then merge the partial results in partition order.

use log::{debug, info};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Instant;

use super::aggregate::{AggregateSpec, GroupState};
use super::expr::{Expr, ExprError};
use super::logical::{AggregateItem, JoinType, NodeId, NodeRef, OpKind, OpNode, PartitionFn};
use super::typecheck::{aggregate_schema, JoinLayout, SchemaResolver};
use crate::exec::{ExecutionContext, ExecutionError};
use crate::storage::{Partition, Schema, Table, Value};

/// Physical plan executor
///
/// One executor serves one `compute` call: every node reachable from the root
/// is executed at most once, and nothing is retained afterwards.
pub struct PhysicalExecutor<'a> {
    ctx: &'a ExecutionContext,
    results: HashMap<NodeId, Table>,
}

impl<'a> PhysicalExecutor<'a> {
    /// Create a new physical executor
    pub fn new(ctx: &'a ExecutionContext) -> Self {
        Self {
            ctx,
            results: HashMap::new(),
        }
    }

    /// Typecheck the graph rooted at `root`, then materialize it
    pub fn execute(&mut self, root: &OpNode) -> Result<Table, ExecutionError> {
        self.ctx.cancellation().check()?;
        SchemaResolver::new().resolve(root)?;

        let start = Instant::now();
        let table = self.execute_node(root)?;
        info!(
            "Computed {}: {} rows in {} partitions ({:.2} ms)",
            root.node_ref(),
            table.num_rows(),
            table.num_partitions(),
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(table)
    }

    /// Execute a node and return its materialized table
    fn execute_node(&mut self, node: &OpNode) -> Result<Table, ExecutionError> {
        if let Some(table) = self.results.get(&node.id()) {
            return Ok(table.clone());
        }

        let at = node.node_ref();
        let table = match node.kind() {
            OpKind::Scan { table } | OpKind::Persisted { table, .. } => table.clone(),

            OpKind::Filter { input, predicate } => {
                let input = self.execute_node(input)?;
                self.execute_filter(at, &input, predicate)?
            }

            OpKind::Select { input, columns } => {
                let input = self.execute_node(input)?;
                self.execute_select(at, &input, columns)?
            }

            OpKind::Aggregate {
                input,
                keys,
                aggregates,
            } => {
                let input = self.execute_node(input)?;
                self.execute_aggregate(at, &input, keys, aggregates)?
            }

            OpKind::Sort {
                input,
                column,
                ascending,
            } => {
                let input = self.execute_node(input)?;
                self.execute_sort(at, &input, column, *ascending, None)?
            }

            OpKind::TopK {
                input,
                n,
                column,
                ascending,
            } => {
                let input = self.execute_node(input)?;
                self.execute_sort(at, &input, column, *ascending, Some(*n))?
            }

            OpKind::Join {
                left,
                right,
                on,
                join_type,
            } => {
                let left = self.execute_node(left)?;
                let right = self.execute_node(right)?;
                self.execute_join(at, &left, &right, on, *join_type)?
            }

            OpKind::Unique { input, column } => {
                let input = self.execute_node(input)?;
                self.execute_unique(at, &input, column)?
            }

            OpKind::DropDuplicates { input, subset } => {
                let input = self.execute_node(input)?;
                self.execute_drop_duplicates(at, &input, subset)?
            }

            OpKind::Head { input, n } => {
                let input = self.execute_node(input)?;
                self.execute_head(at, &input, *n)?
            }

            OpKind::MapPartitions {
                input,
                schema,
                func,
            } => {
                let input = self.execute_node(input)?;
                self.execute_map_partitions(at, &input, schema, func)?
            }

            OpKind::Concat { inputs } => {
                let mut tables = Vec::with_capacity(inputs.len());
                for input in inputs {
                    tables.push(self.execute_node(input)?);
                }
                self.barrier()?;
                Table::concat(&tables)?
            }
        };

        debug!(
            "{} produced {} rows in {} partitions",
            at,
            table.num_rows(),
            table.num_partitions()
        );
        self.results.insert(node.id(), table.clone());
        Ok(table)
    }

    /// Execute filter predicate, preserving row order within each partition
    fn execute_filter(
        &self,
        at: NodeRef,
        input: &Table,
        predicate: &Expr,
    ) -> Result<Table, ExecutionError> {
        let bound = predicate
            .bind(input.schema())
            .map_err(|e| bind_error(at, e))?;

        let parts = self.run_stage(at, input, |partition| {
            let keep: Vec<usize> = (0..partition.num_rows())
                .filter(|&row| bound.matches(partition, row))
                .collect();
            Ok(partition.take(&keep))
        })?;

        Ok(Table::from_partition_columns(input.schema().clone(), parts))
    }

    /// Execute column projection
    fn execute_select(
        &self,
        at: NodeRef,
        input: &Table,
        columns: &[String],
    ) -> Result<Table, ExecutionError> {
        let indices = column_indices(at, input.schema(), columns)?;
        let schema = Arc::new(input.schema().project(columns).unwrap_or_default());

        let parts = self.run_stage(at, input, |partition| Ok(partition.project(&indices)))?;
        Ok(Table::from_partition_columns(schema, parts))
    }

    /// Execute groupby-aggregate (or a scalar reduction when `keys` is empty)
    fn execute_aggregate(
        &self,
        at: NodeRef,
        input: &Table,
        keys: &[String],
        aggregates: &[AggregateItem],
    ) -> Result<Table, ExecutionError> {
        let schema = Arc::new(aggregate_schema(at, input.schema(), keys, aggregates)?);
        let key_indices = column_indices(at, input.schema(), keys)?;
        let specs = aggregates
            .iter()
            .map(|item| {
                let column = input
                    .schema()
                    .index_of(&item.column)
                    .ok_or_else(|| ExecutionError::column_not_found(at, &item.column))?;
                Ok(AggregateSpec {
                    column,
                    function: item.function,
                    input_type: input.schema().fields()[column].data_type,
                })
            })
            .collect::<Result<Vec<_>, ExecutionError>>()?;

        // Phase 1: partial aggregation per partition
        let partials = self.run_stage(at, input, |partition| {
            let mut state = GroupState::new();
            state.update_partition(partition, &key_indices, &specs);
            Ok(state)
        })?;

        // Phase 2: merge in partition order
        self.barrier()?;
        let mut merged = GroupState::new();
        for partial in partials {
            merged.merge(partial, &specs);
        }
        debug!("{} merged into {} groups", at, merged.num_groups());

        let columns = merged.finish(key_indices.len(), &specs).map_err(|overflow| {
            ExecutionError::Overflow {
                node: at,
                detail: format!(
                    "sum of '{}' is {}, outside the integer range",
                    aggregates[overflow.aggregate].column, overflow.total
                ),
            }
        })?;
        Ok(Table::from_partition_columns(schema, vec![columns]))
    }

    /// Execute global sort, or top-k when `limit` is set.
    ///
    /// Partitions are sorted locally in parallel, then merged under a total
    /// order: the column value first, then the global row position.
    fn execute_sort(
        &self,
        at: NodeRef,
        input: &Table,
        column: &str,
        ascending: bool,
        limit: Option<usize>,
    ) -> Result<Table, ExecutionError> {
        let index = input
            .schema()
            .index_of(column)
            .ok_or_else(|| ExecutionError::column_not_found(at, column))?;

        let runs = self.run_stage(at, input, |partition| {
            let mut run: Vec<SortEntry> = partition
                .column(index)
                .iter()
                .enumerate()
                .map(|(row, key)| SortEntry {
                    key: key.clone(),
                    position: partition.offset() + row,
                    partition: partition.id(),
                    row,
                })
                .collect();
            run.sort_by(|a, b| a.cmp_with(b, ascending));
            if let Some(n) = limit {
                run.truncate(n);
            }
            Ok(run)
        })?;

        self.barrier()?;
        let order = merge_sorted_runs(runs, ascending, limit);
        let columns = gather_rows(input, &order);

        let partition_count = if limit.is_some() {
            1
        } else {
            input.num_partitions()
        };
        Ok(Table::split_columns(
            input.schema().clone(),
            columns,
            partition_count,
        ))
    }

    /// Execute hash equality join; the right side is the build side
    fn execute_join(
        &self,
        at: NodeRef,
        left: &Table,
        right: &Table,
        on: &[String],
        join_type: JoinType,
    ) -> Result<Table, ExecutionError> {
        let layout = JoinLayout::new(at, left.schema(), right.schema(), on, join_type)?;

        // Build: per-partition hash tables, merged in partition order
        let partial_builds = self.run_stage(at, right, |partition| {
            let mut local: HashMap<Vec<Value>, Vec<(usize, usize)>> = HashMap::new();
            for row in 0..partition.num_rows() {
                let key = partition.key(row, &layout.right_keys);
                if key.iter().any(Value::is_null) {
                    continue;
                }
                local.entry(key).or_default().push((partition.id(), row));
            }
            Ok(local)
        })?;

        self.barrier()?;
        let mut build: HashMap<Vec<Value>, Vec<(usize, usize)>> = HashMap::new();
        for partial in partial_builds {
            for (key, rows) in partial {
                build.entry(key).or_default().extend(rows);
            }
        }

        // Probe: every left partition independently
        let right_partitions = right.partitions();
        let width = layout.schema.len();
        let parts = self.run_stage(at, left, |partition| {
            let mut columns: Vec<Vec<Value>> = (0..width).map(|_| Vec::new()).collect();
            let left_width = partition.schema().len();

            for row in 0..partition.num_rows() {
                let key = partition.key(row, &layout.left_keys);
                let matches = if key.iter().any(Value::is_null) {
                    None
                } else {
                    build.get(&key)
                };

                match matches {
                    Some(rows) => {
                        for &(rp, rr) in rows {
                            for (c, column) in columns.iter_mut().enumerate().take(left_width) {
                                column.push(partition.value(row, c).clone());
                            }
                            for (j, &payload) in layout.right_payload.iter().enumerate() {
                                columns[left_width + j]
                                    .push(right_partitions[rp].value(rr, payload).clone());
                            }
                        }
                    }
                    None if join_type == JoinType::Left => {
                        for (c, column) in columns.iter_mut().enumerate() {
                            if c < left_width {
                                column.push(partition.value(row, c).clone());
                            } else {
                                column.push(Value::Null);
                            }
                        }
                    }
                    None => {}
                }
            }
            Ok(columns)
        })?;

        Ok(Table::from_partition_columns(layout.schema.clone(), parts))
    }

    /// Execute unique: distinct values of one column in first-appearance order
    fn execute_unique(
        &self,
        at: NodeRef,
        input: &Table,
        column: &str,
    ) -> Result<Table, ExecutionError> {
        let index = input
            .schema()
            .index_of(column)
            .ok_or_else(|| ExecutionError::column_not_found(at, column))?;

        let partials = self.run_stage(at, input, |partition| {
            let mut seen = HashSet::new();
            Ok(partition
                .column(index)
                .iter()
                .filter(|v| seen.insert((*v).clone()))
                .cloned()
                .collect::<Vec<_>>())
        })?;

        self.barrier()?;
        let mut seen = HashSet::new();
        let mut values = Vec::new();
        for value in partials.into_iter().flatten() {
            if seen.insert(value.clone()) {
                values.push(value);
            }
        }

        let field = input.schema().fields()[index].clone();
        Ok(Table::from_partition_columns(
            Arc::new(Schema::new(vec![field])),
            vec![vec![values]],
        ))
    }

    /// Execute drop_duplicates: keep the first row of each distinct subset key
    fn execute_drop_duplicates(
        &self,
        at: NodeRef,
        input: &Table,
        subset: &[String],
    ) -> Result<Table, ExecutionError> {
        let key_indices = if subset.is_empty() {
            (0..input.schema().len()).collect()
        } else {
            column_indices(at, input.schema(), subset)?
        };

        // Local pass: first occurrence within each partition
        let candidates = self.run_stage(at, input, |partition| {
            let mut seen = HashSet::new();
            Ok((0..partition.num_rows())
                .filter_map(|row| {
                    let key = partition.key(row, &key_indices);
                    seen.insert(key.clone()).then_some((row, key))
                })
                .collect::<Vec<_>>())
        })?;

        // Global pass: earlier partitions win
        self.barrier()?;
        let mut seen = HashSet::new();
        let parts = candidates
            .into_iter()
            .zip(input.partitions())
            .map(|(rows, partition)| {
                let keep: Vec<usize> = rows
                    .into_iter()
                    .filter_map(|(row, key)| seen.insert(key).then_some(row))
                    .collect();
                partition.take(&keep)
            })
            .collect();

        Ok(Table::from_partition_columns(input.schema().clone(), parts))
    }

    /// Execute head: the first `n` rows in global order
    fn execute_head(&self, at: NodeRef, input: &Table, n: usize) -> Result<Table, ExecutionError> {
        self.barrier()?;
        let mut remaining = n;
        let mut order = Vec::with_capacity(n.min(input.num_rows()));
        for partition in input.partitions() {
            if remaining == 0 {
                break;
            }
            let take = remaining.min(partition.num_rows());
            order.extend((0..take).map(|row| (partition.id(), row)));
            remaining -= take;
        }
        debug!("{} took {} of {} rows", at, order.len(), input.num_rows());

        let columns = gather_rows(input, &order);
        Ok(Table::split_columns(input.schema().clone(), columns, 1))
    }

    /// Apply a user function to every partition independently
    fn execute_map_partitions(
        &self,
        at: NodeRef,
        input: &Table,
        schema: &Arc<Schema>,
        func: &PartitionFn,
    ) -> Result<Table, ExecutionError> {
        let parts = self.run_stage(at, input, |partition| {
            let rows = (func.0)(partition).map_err(|message| ExecutionError::UserFunction {
                node: at,
                partition: partition.id(),
                message,
            })?;
            let output = Partition::from_rows(schema.clone(), rows, partition.offset())?;
            Ok(output.into_columns())
        })?;

        Ok(Table::from_partition_columns(schema.clone(), parts))
    }

    // ===== Helper Methods =====

    /// Stage barrier: stop before starting new work if cancellation was requested
    fn barrier(&self) -> Result<(), ExecutionError> {
        self.ctx.cancellation().check()
    }

    /// Run one work item per partition on the worker pool and wait for all of them.
    ///
    /// After the first failure the remaining, not yet started, work items are
    /// skipped. The error of the lowest-numbered failed partition is returned
    /// with node and partition context; no partial output escapes.
    fn run_stage<T, F>(&self, at: NodeRef, input: &Table, work: F) -> Result<Vec<T>, ExecutionError>
    where
        T: Send,
        F: Fn(&Partition) -> Result<T, ExecutionError> + Sync,
    {
        self.barrier()?;

        let abort = AtomicBool::new(false);
        let partitions = input.partitions();
        let outcomes: Vec<Option<Result<T, ExecutionError>>> = self.ctx.install(|| {
            partitions
                .par_iter()
                .map(|partition| {
                    if abort.load(AtomicOrdering::Relaxed) {
                        return None;
                    }
                    let outcome = work(partition);
                    if outcome.is_err() {
                        abort.store(true, AtomicOrdering::Relaxed);
                    }
                    Some(outcome)
                })
                .collect()
        });

        let mut results = Vec::with_capacity(outcomes.len());
        for (partition, outcome) in outcomes.into_iter().enumerate() {
            match outcome {
                Some(Ok(value)) => results.push(value),
                Some(Err(err)) => return Err(with_partition_context(at, partition, err)),
                None => {}
            }
        }

        debug!("{} stage finished over {} partitions", at, partitions.len());
        Ok(results)
    }
}

fn bind_error(at: NodeRef, err: ExprError) -> ExecutionError {
    match err {
        ExprError::ColumnNotFound(column) => ExecutionError::column_not_found(at, column),
        ExprError::TypeMismatch(detail) => ExecutionError::type_mismatch(at, detail),
    }
}

fn with_partition_context(at: NodeRef, partition: usize, err: ExecutionError) -> ExecutionError {
    match err {
        err @ (ExecutionError::UserFunction { .. }
        | ExecutionError::Partition { .. }
        | ExecutionError::Cancelled) => err,
        other => ExecutionError::Partition {
            node: at,
            partition,
            source: Box::new(other),
        },
    }
}

fn column_indices(
    at: NodeRef,
    schema: &Schema,
    columns: &[String],
) -> Result<Vec<usize>, ExecutionError> {
    columns
        .iter()
        .map(|c| {
            schema
                .index_of(c)
                .ok_or_else(|| ExecutionError::column_not_found(at, c))
        })
        .collect()
}

/// Collect the given (partition, row) pairs into full-length columns
fn gather_rows(input: &Table, order: &[(usize, usize)]) -> Vec<Vec<Value>> {
    let partitions = input.partitions();
    (0..input.schema().len())
        .map(|c| {
            order
                .iter()
                .map(|&(p, r)| partitions[p].value(r, c).clone())
                .collect()
        })
        .collect()
}

/// One row of a partition-local sorted run
#[derive(Debug, Clone)]
struct SortEntry {
    key: Value,
    position: usize,
    partition: usize,
    row: usize,
}

impl SortEntry {
    /// Total order: key in the requested direction with nulls last, then global position
    fn cmp_with(&self, other: &SortEntry, ascending: bool) -> Ordering {
        let by_key = match (self.key.is_null(), other.key.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Greater,
            (false, true) => Ordering::Less,
            (false, false) if ascending => self.key.compare(&other.key),
            (false, false) => other.key.compare(&self.key),
        };
        by_key.then(self.position.cmp(&other.position))
    }
}

/// Heap cursor over one sorted run; reversed so `BinaryHeap` pops the smallest
struct MergeCursor {
    entry: SortEntry,
    run: usize,
    next: usize,
    ascending: bool,
}

impl PartialEq for MergeCursor {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MergeCursor {}

impl PartialOrd for MergeCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MergeCursor {
    fn cmp(&self, other: &Self) -> Ordering {
        other.entry.cmp_with(&self.entry, self.ascending)
    }
}

/// K-way merge of sorted runs into (partition, row) order
fn merge_sorted_runs(
    runs: Vec<Vec<SortEntry>>,
    ascending: bool,
    limit: Option<usize>,
) -> Vec<(usize, usize)> {
    let total: usize = runs.iter().map(Vec::len).sum();
    let wanted = limit.map_or(total, |n| n.min(total));
    let mut order = Vec::with_capacity(wanted);

    let mut heap = BinaryHeap::with_capacity(runs.len());
    for (run, entries) in runs.iter().enumerate() {
        if let Some(first) = entries.first() {
            heap.push(MergeCursor {
                entry: first.clone(),
                run,
                next: 1,
                ascending,
            });
        }
    }

    while order.len() < wanted {
        let Some(cursor) = heap.pop() else { break };
        order.push((cursor.entry.partition, cursor.entry.row));
        if let Some(entry) = runs[cursor.run].get(cursor.next) {
            heap.push(MergeCursor {
                entry: entry.clone(),
                run: cursor.run,
                next: cursor.next + 1,
                ascending,
            });
        }
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::plan::expr::{col, lit};
    use crate::plan::logical::AggregateFunction;
    use crate::storage::{DataType, Field, Row};

    fn ctx() -> ExecutionContext {
        ExecutionContext::new(EngineConfig {
            worker_threads: Some(2),
            ..EngineConfig::default()
        })
        .unwrap()
    }

    fn scan(rows: Vec<Row>, partitions: usize) -> Arc<OpNode> {
        let schema = Schema::new(vec![
            Field::new("county", DataType::Categorical),
            Field::nullable("lat", DataType::Float),
        ]);
        OpNode::new(OpKind::Scan {
            table: Table::ingest(schema, rows, partitions).unwrap(),
        })
    }

    fn counties() -> Vec<Row> {
        vec![
            vec!["Sunderland".into(), 1.0.into()],
            vec!["A".into(), 5.0.into()],
            vec!["B".into(), 0.0.into()],
            vec!["C".into(), 6.0.into()],
            vec!["D".into(), 2.0.into()],
        ]
    }

    #[test]
    fn test_filter_keeps_relative_order() {
        let ctx = ctx();
        let filter = OpNode::new(OpKind::Filter {
            input: scan(counties(), 3),
            predicate: col("lat").gt(lit(1.0)),
        });

        let table = PhysicalExecutor::new(&ctx).execute(&filter).unwrap();
        assert_eq!(
            table.column_values("county").unwrap(),
            vec![Value::from("A"), "C".into(), "D".into()]
        );
        assert_eq!(table.num_partitions(), 3);
    }

    #[test]
    fn test_sort_is_stable_across_partitions() {
        let ctx = ctx();
        let rows = vec![
            vec!["x".into(), 2.0.into()],
            vec!["y".into(), 1.0.into()],
            vec!["z".into(), 2.0.into()],
            vec!["w".into(), Value::Null],
            vec!["v".into(), 1.0.into()],
        ];
        let sort = OpNode::new(OpKind::Sort {
            input: scan(rows, 2),
            column: "lat".to_string(),
            ascending: false,
        });

        let table = PhysicalExecutor::new(&ctx).execute(&sort).unwrap();
        assert_eq!(
            table.column_values("county").unwrap(),
            vec![Value::from("x"), "z".into(), "y".into(), "v".into(), "w".into()]
        );
        assert_eq!(table.num_partitions(), 2);
    }

    #[test]
    fn test_topk_merges_partition_candidates() {
        let ctx = ctx();
        let topk = OpNode::new(OpKind::TopK {
            input: scan(counties(), 4),
            n: 2,
            column: "lat".to_string(),
            ascending: true,
        });

        let table = PhysicalExecutor::new(&ctx).execute(&topk).unwrap();
        assert_eq!(
            table.column_values("county").unwrap(),
            vec![Value::from("B"), "Sunderland".into()]
        );
    }

    #[test]
    fn test_unknown_column_names_node() {
        let ctx = ctx();
        let filter = OpNode::new(OpKind::Filter {
            input: scan(counties(), 1),
            predicate: col("northing").gt(lit(1.0)),
        });
        let err = PhysicalExecutor::new(&ctx).execute(&filter).unwrap_err();
        match err {
            ExecutionError::ColumnNotFound { node, column } => {
                assert_eq!(node.id, filter.id());
                assert_eq!(node.op, "filter");
                assert_eq!(column, "northing");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_mean_of_text_column_is_type_mismatch() {
        let ctx = ctx();
        let agg = OpNode::new(OpKind::Aggregate {
            input: scan(counties(), 1),
            keys: vec![],
            aggregates: vec![AggregateItem::new("m", "county", AggregateFunction::Mean)],
        });
        let err = PhysicalExecutor::new(&ctx).execute(&agg).unwrap_err();
        assert!(matches!(err, ExecutionError::TypeMismatch { .. }));
    }

    #[test]
    fn test_merge_sorted_runs_respects_limit() {
        let entry = |key: f64, position: usize| SortEntry {
            key: Value::Float(key),
            position,
            partition: position / 2,
            row: position % 2,
        };
        let runs = vec![vec![entry(1.0, 0), entry(3.0, 1)], vec![entry(2.0, 2), entry(4.0, 3)]];
        let order = merge_sorted_runs(runs, true, Some(3));
        assert_eq!(order, vec![(0, 0), (1, 0), (0, 1)]);
    }
}
