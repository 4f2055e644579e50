// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Errors raised while typechecking and executing deferred operation graphs

use thiserror::Error;

use crate::plan::logical::NodeRef;
use crate::storage::StorageError;

/// Query execution errors
///
/// Every planning or execution failure names the operation node it came from;
/// failures inside a parallel stage also name the partition.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Column '{column}' not found (at {node})")]
    ColumnNotFound { node: NodeRef, column: String },

    #[error("Type mismatch at {node}: {detail}")]
    TypeMismatch { node: NodeRef, detail: String },

    #[error("Arithmetic overflow at {node}: {detail}")]
    Overflow { node: NodeRef, detail: String },

    #[error("{node} failed on partition {partition}: {source}")]
    Partition {
        node: NodeRef,
        partition: usize,
        #[source]
        source: Box<ExecutionError>,
    },

    #[error("Partition function at {node} failed on partition {partition}: {message}")]
    UserFunction {
        node: NodeRef,
        partition: usize,
        message: String,
    },

    #[error("Computation cancelled")]
    Cancelled,

    #[error("Failed to build worker pool: {0}")]
    ThreadPool(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ExecutionError {
    pub fn column_not_found(node: NodeRef, column: impl Into<String>) -> Self {
        ExecutionError::ColumnNotFound {
            node,
            column: column.into(),
        }
    }

    pub fn type_mismatch(node: NodeRef, detail: impl Into<String>) -> Self {
        ExecutionError::TypeMismatch {
            node,
            detail: detail.into(),
        }
    }

    /// The node this error is attributed to, if any
    pub fn node(&self) -> Option<NodeRef> {
        match self {
            ExecutionError::ColumnNotFound { node, .. }
            | ExecutionError::TypeMismatch { node, .. }
            | ExecutionError::Overflow { node, .. }
            | ExecutionError::Partition { node, .. }
            | ExecutionError::UserFunction { node, .. } => Some(*node),
            _ => None,
        }
    }
}
