// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Immutable partitioned tables
//!
//! A `Table` is an ordered list of partitions sharing one schema. Tables are
//! never modified in place: every operation that changes rows or shard
//! boundaries produces a new table. Cloning a table only clones `Arc`s.

use log::debug;
use std::collections::BTreeSet;
use std::sync::Arc;

use super::error::StorageError;
use super::partition::{Partition, Row};
use super::schema::Schema;
use super::value::Value;

#[derive(Debug, Clone)]
pub struct Table {
    schema: Arc<Schema>,
    partitions: Vec<Arc<Partition>>,
}

impl Table {
    /// Validate typed rows against `schema` and split them into
    /// `partition_count` contiguous shards of near-equal size.
    pub fn ingest(
        schema: Schema,
        rows: Vec<Row>,
        partition_count: usize,
    ) -> Result<Self, StorageError> {
        if partition_count == 0 {
            return Err(StorageError::InvalidPartitionCount(partition_count));
        }

        let schema = Arc::new(schema);
        let total = rows.len();
        let mut partitions = Vec::with_capacity(partition_count);
        let mut rows = rows.into_iter();
        let mut row_base = 0;

        for size in shard_sizes(total, partition_count) {
            let chunk: Vec<Row> = rows.by_ref().take(size).collect();
            partitions.push(Partition::from_rows(schema.clone(), chunk, row_base)?);
            row_base += size;
        }

        debug!(
            "Ingested {} rows into {} partitions ({})",
            total, partition_count, schema
        );
        Ok(Self::assemble(schema, partitions))
    }

    /// Ingest several sources into one table.
    ///
    /// Every source must declare exactly the same schema; each contributes
    /// `partitions_per_source` shards, in source order.
    pub fn from_sources(
        sources: Vec<(Schema, Vec<Row>)>,
        partitions_per_source: usize,
    ) -> Result<Self, StorageError> {
        let mut iter = sources.into_iter();
        let (first_schema, first_rows) = iter
            .next()
            .ok_or_else(|| StorageError::SchemaMismatch("no sources given".to_string()))?;

        let mut tables = vec![Self::ingest(first_schema, first_rows, partitions_per_source)?];
        for (index, (schema, rows)) in iter.enumerate() {
            if schema != *tables[0].schema {
                return Err(StorageError::SchemaMismatch(format!(
                    "source {} declares {}, expected {}",
                    index + 1,
                    schema,
                    tables[0].schema
                )));
            }
            tables.push(Self::ingest(schema, rows, partitions_per_source)?);
        }

        Self::concat(&tables)
    }

    /// An empty table with a single empty partition
    pub fn empty(schema: Schema) -> Self {
        let schema = Arc::new(schema);
        let columns = (0..schema.len()).map(|_| Vec::new()).collect();
        let partition = Partition::from_columns(schema.clone(), columns);
        Self::assemble(schema, vec![partition])
    }

    /// Append tables with identical schemas, keeping every source partition
    pub fn concat(tables: &[Table]) -> Result<Self, StorageError> {
        let first = tables
            .first()
            .ok_or_else(|| StorageError::SchemaMismatch("nothing to concatenate".to_string()))?;

        let mut partitions = Vec::new();
        for table in tables {
            if table.schema != first.schema {
                return Err(StorageError::SchemaMismatch(format!(
                    "cannot concatenate {} with {}",
                    table.schema, first.schema
                )));
            }
            partitions.extend(table.partitions.iter().map(|p| p.as_ref().clone()));
        }

        Ok(Self::assemble(first.schema.clone(), partitions))
    }

    /// Re-split all rows into `partition_count` shards, preserving global order
    pub fn repartition(&self, partition_count: usize) -> Result<Self, StorageError> {
        if partition_count == 0 {
            return Err(StorageError::InvalidPartitionCount(partition_count));
        }
        let columns = self.gather_columns();
        Ok(Self::split_columns(self.schema.clone(), columns, partition_count))
    }

    /// Build a table from per-partition column sets, assigning ids and offsets
    pub(crate) fn from_partition_columns(
        schema: Arc<Schema>,
        parts: Vec<Vec<Vec<Value>>>,
    ) -> Self {
        let partitions = if parts.is_empty() {
            vec![Partition::from_columns(
                schema.clone(),
                (0..schema.len()).map(|_| Vec::new()).collect(),
            )]
        } else {
            parts
                .into_iter()
                .map(|columns| Partition::from_columns(schema.clone(), columns))
                .collect()
        };
        Self::assemble(schema, partitions)
    }

    /// Split one set of full-length columns into `partition_count` shards
    pub(crate) fn split_columns(
        schema: Arc<Schema>,
        columns: Vec<Vec<Value>>,
        partition_count: usize,
    ) -> Self {
        let total = columns.first().map(|c| c.len()).unwrap_or(0);
        let mut iters: Vec<_> = columns.into_iter().map(|c| c.into_iter()).collect();
        let parts = shard_sizes(total, partition_count.max(1))
            .into_iter()
            .map(|size| {
                iters
                    .iter_mut()
                    .map(|it| it.by_ref().take(size).collect())
                    .collect()
            })
            .collect();
        Self::from_partition_columns(schema, parts)
    }

    fn assemble(schema: Arc<Schema>, partitions: Vec<Partition>) -> Self {
        let mut offset = 0;
        let partitions = partitions
            .into_iter()
            .enumerate()
            .map(|(id, p)| {
                let rows = p.num_rows();
                let placed = p.placed(id, offset);
                offset += rows;
                Arc::new(placed)
            })
            .collect();
        Self { schema, partitions }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Partitions in table order
    pub fn partitions(&self) -> &[Arc<Partition>] {
        &self.partitions
    }

    pub fn num_partitions(&self) -> usize {
        self.partitions.len()
    }

    pub fn num_rows(&self) -> usize {
        self.partitions.iter().map(|p| p.num_rows()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// All rows in global order
    pub fn rows(&self) -> Vec<Row> {
        self.partitions.iter().flat_map(|p| p.rows()).collect()
    }

    /// All values of one column in global order
    pub fn column_values(&self, name: &str) -> Result<Vec<Value>, StorageError> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| StorageError::ColumnNotFound(name.to_string()))?;
        Ok(self
            .partitions
            .iter()
            .flat_map(|p| p.column(index).iter().cloned())
            .collect())
    }

    /// Distinct non-null levels of a text column, sorted
    pub fn categories(&self, name: &str) -> Result<Vec<String>, StorageError> {
        let levels: BTreeSet<String> = self
            .column_values(name)?
            .into_iter()
            .filter_map(|v| match v {
                Value::String(s) => Some(s),
                _ => None,
            })
            .collect();
        Ok(levels.into_iter().collect())
    }

    /// Concatenate every partition's columns into full-length columns
    pub(crate) fn gather_columns(&self) -> Vec<Vec<Value>> {
        let mut columns: Vec<Vec<Value>> = (0..self.schema.len())
            .map(|_| Vec::with_capacity(self.num_rows()))
            .collect();
        for partition in &self.partitions {
            for (i, column) in columns.iter_mut().enumerate() {
                column.extend_from_slice(partition.column(i));
            }
        }
        columns
    }
}

/// Near-equal contiguous shard sizes; the first `total % count` shards get one extra row
pub(crate) fn shard_sizes(total: usize, count: usize) -> Vec<usize> {
    let base = total / count;
    let extra = total % count;
    (0..count).map(|i| base + usize::from(i < extra)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DataType, Field};

    fn people_schema() -> Schema {
        Schema::new(vec![
            Field::new("county", DataType::Categorical),
            Field::new("lat", DataType::Float),
        ])
    }

    fn people_rows() -> Vec<Row> {
        vec![
            vec!["Sunderland".into(), 1.0.into()],
            vec!["A".into(), 5.0.into()],
            vec!["B".into(), 0.0.into()],
            vec!["C".into(), 6.0.into()],
            vec!["D".into(), 2.0.into()],
        ]
    }

    #[test]
    fn test_ingest_splits_into_contiguous_shards() {
        let table = Table::ingest(people_schema(), people_rows(), 2).unwrap();

        assert_eq!(table.num_partitions(), 2);
        assert_eq!(table.partitions()[0].num_rows(), 3);
        assert_eq!(table.partitions()[1].num_rows(), 2);
        assert_eq!(table.partitions()[1].offset(), 3);
        assert_eq!(table.rows(), people_rows());
    }

    #[test]
    fn test_ingest_more_partitions_than_rows() {
        let table = Table::ingest(people_schema(), people_rows(), 8).unwrap();
        assert_eq!(table.num_partitions(), 8);
        assert_eq!(table.num_rows(), 5);
        assert!(table.partitions()[7].is_empty());
    }

    #[test]
    fn test_ingest_rejects_zero_partitions() {
        let err = Table::ingest(people_schema(), people_rows(), 0).unwrap_err();
        assert_eq!(err, StorageError::InvalidPartitionCount(0));
    }

    #[test]
    fn test_from_sources_rejects_disagreeing_types() {
        let other = Schema::new(vec![
            Field::new("county", DataType::Categorical),
            Field::new("lat", DataType::Integer),
        ]);
        let err = Table::from_sources(
            vec![(people_schema(), people_rows()), (other, vec![])],
            1,
        )
        .unwrap_err();
        assert!(matches!(err, StorageError::SchemaMismatch(_)));
    }

    #[test]
    fn test_from_sources_keeps_source_order() {
        let table = Table::from_sources(
            vec![
                (people_schema(), people_rows()[..2].to_vec()),
                (people_schema(), people_rows()[2..].to_vec()),
            ],
            1,
        )
        .unwrap();
        assert_eq!(table.num_partitions(), 2);
        assert_eq!(table.rows(), people_rows());
    }

    #[test]
    fn test_repartition_preserves_order() {
        let table = Table::ingest(people_schema(), people_rows(), 1).unwrap();
        let wide = table.repartition(3).unwrap();
        assert_eq!(wide.num_partitions(), 3);
        assert_eq!(wide.rows(), people_rows());
    }

    #[test]
    fn test_categories() {
        let table = Table::ingest(people_schema(), people_rows(), 2).unwrap();
        assert_eq!(
            table.categories("county").unwrap(),
            vec!["A", "B", "C", "D", "Sunderland"]
        );
        assert!(table.categories("nope").is_err());
    }
}
