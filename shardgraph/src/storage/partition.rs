// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! A partition is one self-contained, column-oriented row batch of a table.
//!
//! Partitions know their position inside the owning table through `offset`,
//! the global row position of their first row. Global positions are what
//! sorts and top-k use to break ties stably across partitions.

use std::sync::Arc;

use super::error::StorageError;
use super::schema::Schema;
use super::value::Value;

/// A single row, one value per schema field
pub type Row = Vec<Value>;

/// Horizontally sharded chunk of a table
#[derive(Debug, Clone)]
pub struct Partition {
    id: usize,
    offset: usize,
    schema: Arc<Schema>,
    columns: Vec<Vec<Value>>,
    num_rows: usize,
}

impl Partition {
    /// Build a partition from typed rows, validating each value against the schema.
    ///
    /// `row_base` is only used to report the global row number in errors.
    pub fn from_rows(
        schema: Arc<Schema>,
        rows: Vec<Row>,
        row_base: usize,
    ) -> Result<Self, StorageError> {
        let width = schema.len();
        let mut columns: Vec<Vec<Value>> = (0..width).map(|_| Vec::with_capacity(rows.len())).collect();
        let num_rows = rows.len();

        for (i, row) in rows.into_iter().enumerate() {
            if row.len() != width {
                return Err(StorageError::ArityMismatch {
                    row: row_base + i,
                    expected: width,
                    found: row.len(),
                });
            }
            for ((value, field), column) in row.into_iter().zip(schema.fields()).zip(columns.iter_mut()) {
                if value.is_null() && !field.nullable {
                    return Err(StorageError::NullViolation {
                        column: field.name.clone(),
                        row: row_base + i,
                    });
                }
                let found = value
                    .data_type()
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "null".to_string());
                let coerced = value.coerce(field.data_type).ok_or_else(|| StorageError::TypeMismatch {
                    column: field.name.clone(),
                    row: row_base + i,
                    expected: field.data_type,
                    found,
                })?;
                column.push(coerced);
            }
        }

        Ok(Self {
            id: 0,
            offset: 0,
            schema,
            columns,
            num_rows,
        })
    }

    /// Assemble a partition from columns that already conform to `schema`.
    pub(crate) fn from_columns(schema: Arc<Schema>, columns: Vec<Vec<Value>>) -> Self {
        debug_assert_eq!(schema.len(), columns.len());
        let num_rows = columns.first().map(|c| c.len()).unwrap_or(0);
        debug_assert!(columns.iter().all(|c| c.len() == num_rows));
        Self {
            id: 0,
            offset: 0,
            schema,
            columns,
            num_rows,
        }
    }

    pub(crate) fn placed(mut self, id: usize, offset: usize) -> Self {
        self.id = id;
        self.offset = offset;
        self
    }

    pub(crate) fn into_columns(self) -> Vec<Vec<Value>> {
        self.columns
    }

    pub fn id(&self) -> usize {
        self.id
    }

    /// Global row position of this partition's first row
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows == 0
    }

    pub fn column(&self, index: usize) -> &[Value] {
        &self.columns[index]
    }

    pub fn column_by_name(&self, name: &str) -> Option<&[Value]> {
        self.schema.index_of(name).map(|i| self.column(i))
    }

    pub fn value(&self, row: usize, column: usize) -> &Value {
        &self.columns[column][row]
    }

    /// Materialize one row
    pub fn row(&self, row: usize) -> Row {
        self.columns.iter().map(|c| c[row].clone()).collect()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.num_rows).map(move |i| self.row(i))
    }

    /// Values of the given columns for one row
    pub fn key(&self, row: usize, columns: &[usize]) -> Vec<Value> {
        columns.iter().map(|&c| self.columns[c][row].clone()).collect()
    }

    /// Gather the given rows, in the given order, column by column
    pub fn take(&self, indices: &[usize]) -> Vec<Vec<Value>> {
        self.columns
            .iter()
            .map(|column| indices.iter().map(|&i| column[i].clone()).collect())
            .collect()
    }

    /// Keep only the given column positions
    pub fn project(&self, columns: &[usize]) -> Vec<Vec<Value>> {
        columns.iter().map(|&c| self.columns[c].clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{DataType, Field};

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("name", DataType::String),
            Field::nullable("age", DataType::Float),
        ]))
    }

    #[test]
    fn test_from_rows_coerces_integers_into_float_columns() {
        let part = Partition::from_rows(
            schema(),
            vec![vec!["ann".into(), Value::Integer(31)], vec!["bo".into(), Value::Null]],
            0,
        )
        .unwrap();

        assert_eq!(part.num_rows(), 2);
        assert_eq!(part.value(0, 1), &Value::Float(31.0));
        assert!(part.value(1, 1).is_null());
    }

    #[test]
    fn test_from_rows_rejects_nulls_in_required_column() {
        let err = Partition::from_rows(schema(), vec![vec![Value::Null, Value::Float(1.0)]], 10)
            .unwrap_err();
        assert_eq!(
            err,
            StorageError::NullViolation {
                column: "name".to_string(),
                row: 10
            }
        );
    }

    #[test]
    fn test_from_rows_rejects_wrong_width() {
        let err = Partition::from_rows(schema(), vec![vec!["x".into()]], 0).unwrap_err();
        assert!(matches!(err, StorageError::ArityMismatch { expected: 2, found: 1, .. }));
    }

    #[test]
    fn test_take_preserves_requested_order() {
        let part = Partition::from_rows(
            schema(),
            vec![
                vec!["a".into(), Value::Float(1.0)],
                vec!["b".into(), Value::Float(2.0)],
                vec!["c".into(), Value::Float(3.0)],
            ],
            0,
        )
        .unwrap();

        let cols = part.take(&[2, 0]);
        assert_eq!(cols[0], vec![Value::from("c"), Value::from("a")]);
    }
}
