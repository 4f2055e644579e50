// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Two-phase aggregation state
//!
//! Every partition builds a private `GroupState` (partial aggregation), then
//! the partial states are merged in partition order. Merging in order keeps
//! the output deterministic: groups appear in the order their first row
//! appears in the table.

use std::collections::{HashMap, HashSet};

use super::logical::AggregateFunction;
use crate::storage::{DataType, Partition, Value};

/// Running state of one aggregate over one group
#[derive(Debug, Clone)]
pub(crate) enum Accumulator {
    Count(i64),
    /// Exact integer sum; checked against the `i64` range on finish
    SumInt(i128),
    SumFloat(f64),
    Mean { sum: f64, count: u64 },
    Min(Option<Value>),
    Max(Option<Value>),
    NUnique(HashSet<Value>),
}

impl Accumulator {
    pub fn new(function: AggregateFunction, input_type: DataType) -> Self {
        match function {
            AggregateFunction::Count => Accumulator::Count(0),
            AggregateFunction::Sum if input_type == DataType::Integer => Accumulator::SumInt(0),
            AggregateFunction::Sum => Accumulator::SumFloat(0.0),
            AggregateFunction::Mean => Accumulator::Mean { sum: 0.0, count: 0 },
            AggregateFunction::Min => Accumulator::Min(None),
            AggregateFunction::Max => Accumulator::Max(None),
            AggregateFunction::NUnique => Accumulator::NUnique(HashSet::new()),
        }
    }

    /// Fold one value in; nulls and NaN are skipped by every aggregator
    pub fn update(&mut self, value: &Value) {
        if value.is_null() || value.is_nan() {
            return;
        }
        match self {
            Accumulator::Count(n) => *n += 1,
            Accumulator::SumInt(total) => {
                *total += i128::from(value.as_i64().unwrap_or(0));
            }
            Accumulator::SumFloat(total) => *total += value.as_f64().unwrap_or(0.0),
            Accumulator::Mean { sum, count } => {
                *sum += value.as_f64().unwrap_or(0.0);
                *count += 1;
            }
            Accumulator::Min(current) => {
                if current.as_ref().map_or(true, |c| value.compare(c).is_lt()) {
                    *current = Some(value.clone());
                }
            }
            Accumulator::Max(current) => {
                if current.as_ref().map_or(true, |c| value.compare(c).is_gt()) {
                    *current = Some(value.clone());
                }
            }
            Accumulator::NUnique(seen) => {
                seen.insert(value.clone());
            }
        }
    }

    /// Combine with the partial state of a later partition
    pub fn merge(&mut self, other: Accumulator) {
        match (self, other) {
            (Accumulator::Count(a), Accumulator::Count(b)) => *a += b,
            (Accumulator::SumInt(a), Accumulator::SumInt(b)) => *a += b,
            (Accumulator::SumFloat(a), Accumulator::SumFloat(b)) => *a += b,
            (
                Accumulator::Mean { sum, count },
                Accumulator::Mean {
                    sum: other_sum,
                    count: other_count,
                },
            ) => {
                *sum += other_sum;
                *count += other_count;
            }
            (Accumulator::Min(current), Accumulator::Min(Some(v))) => {
                if current.as_ref().map_or(true, |c| v.compare(c).is_lt()) {
                    *current = Some(v);
                }
            }
            (Accumulator::Max(current), Accumulator::Max(Some(v))) => {
                if current.as_ref().map_or(true, |c| v.compare(c).is_gt()) {
                    *current = Some(v);
                }
            }
            (Accumulator::NUnique(a), Accumulator::NUnique(b)) => a.extend(b),
            _ => {}
        }
    }

    /// Final value, or the exact total when an integer sum leaves the `i64` range
    pub fn finish(self) -> Result<Value, i128> {
        Ok(match self {
            Accumulator::Count(n) => Value::Integer(n),
            Accumulator::SumInt(total) => Value::Integer(i64::try_from(total).map_err(|_| total)?),
            Accumulator::SumFloat(total) => Value::Float(total),
            Accumulator::Mean { count: 0, .. } => Value::Null,
            Accumulator::Mean { sum, count } => Value::Float(sum / count as f64),
            Accumulator::Min(v) | Accumulator::Max(v) => v.unwrap_or(Value::Null),
            Accumulator::NUnique(seen) => Value::Integer(seen.len() as i64),
        })
    }
}

/// Resolved aggregate: input column position, function, and input type
#[derive(Debug, Clone, Copy)]
pub(crate) struct AggregateSpec {
    pub column: usize,
    pub function: AggregateFunction,
    pub input_type: DataType,
}

/// Groups of one partition (or of several merged partitions), in first-seen order
#[derive(Debug, Clone, Default)]
pub(crate) struct GroupState {
    keys: Vec<Vec<Value>>,
    index: HashMap<Vec<Value>, usize>,
    accumulators: Vec<Vec<Accumulator>>,
}

impl GroupState {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh(specs: &[AggregateSpec]) -> Vec<Accumulator> {
        specs
            .iter()
            .map(|s| Accumulator::new(s.function, s.input_type))
            .collect()
    }

    fn group_slot(&mut self, key: Vec<Value>, specs: &[AggregateSpec]) -> usize {
        if let Some(&slot) = self.index.get(&key) {
            return slot;
        }
        let slot = self.keys.len();
        self.index.insert(key.clone(), slot);
        self.keys.push(key);
        self.accumulators.push(Self::fresh(specs));
        slot
    }

    /// Fold every row of `partition` in. Rows with a null key are skipped.
    pub fn update_partition(&mut self, partition: &Partition, keys: &[usize], specs: &[AggregateSpec]) {
        for row in 0..partition.num_rows() {
            let key = partition.key(row, keys);
            if key.iter().any(Value::is_null) {
                continue;
            }
            let slot = self.group_slot(key, specs);
            for (acc, spec) in self.accumulators[slot].iter_mut().zip(specs) {
                acc.update(partition.value(row, spec.column));
            }
        }
    }

    /// Merge the state of a later partition into this one
    pub fn merge(&mut self, other: GroupState, specs: &[AggregateSpec]) {
        for (key, accs) in other.keys.into_iter().zip(other.accumulators) {
            let slot = self.group_slot(key, specs);
            for (acc, partial) in self.accumulators[slot].iter_mut().zip(accs) {
                acc.merge(partial);
            }
        }
    }

    pub fn num_groups(&self) -> usize {
        self.keys.len()
    }

    /// Output columns: keys first, then one column per aggregate.
    ///
    /// With no key columns there is always exactly one output row, even for
    /// empty input (a scalar reduction). An integer sum outside the `i64`
    /// range fails with the aggregate's position and the exact total.
    pub fn finish(
        mut self,
        num_keys: usize,
        specs: &[AggregateSpec],
    ) -> Result<Vec<Vec<Value>>, SumOverflow> {
        if num_keys == 0 && self.keys.is_empty() {
            self.group_slot(Vec::new(), specs);
        }

        let mut columns: Vec<Vec<Value>> = (0..num_keys + specs.len())
            .map(|_| Vec::with_capacity(self.keys.len()))
            .collect();

        for (key, accs) in self.keys.into_iter().zip(self.accumulators) {
            for (i, v) in key.into_iter().enumerate() {
                columns[i].push(v);
            }
            for (j, acc) in accs.into_iter().enumerate() {
                let value = acc
                    .finish()
                    .map_err(|total| SumOverflow { aggregate: j, total })?;
                columns[num_keys + j].push(value);
            }
        }
        Ok(columns)
    }
}

/// An integer sum that does not fit the output column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SumOverflow {
    /// Index of the aggregate in its spec list
    pub aggregate: usize,
    pub total: i128,
}
