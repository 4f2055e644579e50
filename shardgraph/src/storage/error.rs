// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Errors raised while ingesting and assembling partitioned tables

use thiserror::Error;

use super::value::DataType;

/// Partition store errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StorageError {
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("Type mismatch in column '{column}' (row {row}): expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        row: usize,
        expected: DataType,
        found: String,
    },

    #[error("Null value in non-nullable column '{column}' (row {row})")]
    NullViolation { column: String, row: usize },

    #[error("Row {row} has {found} values, schema has {expected} columns")]
    ArityMismatch {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Column not found: {0}")]
    ColumnNotFound(String),

    #[error("Invalid partition count: {0}")]
    InvalidPartitionCount(usize),
}
