// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Query execution support
//!
//! This module provides the execution context (worker pool, configuration,
//! cancellation) that physical execution of deferred operation graphs runs in,
//! and the execution error taxonomy.

pub mod context;
pub mod error;

pub use context::{CancellationToken, ExecutionContext};
pub use error::ExecutionError;
