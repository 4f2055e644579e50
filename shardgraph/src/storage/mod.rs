// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Partition store for tabular data
//!
//! This module provides:
//! - Value and column type system
//! - Schemas with explicit per-column nullability
//! - Column-oriented partitions that know their global row offset
//! - Immutable, horizontally sharded tables

pub mod error;
pub mod partition;
pub mod schema;
pub mod table;
pub mod value;

pub use error::StorageError;
pub use partition::{Partition, Row};
pub use schema::{Field, Schema};
pub use table::Table;
pub use value::{DataType, Value};
