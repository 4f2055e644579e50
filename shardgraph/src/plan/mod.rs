// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Lazy query planning and partition-parallel execution
//!
//! Frames build an immutable operation graph ([`logical`]), the graph is
//! typechecked ([`typecheck`]) and then materialized stage by stage on the
//! worker pool ([`physical_executor`]).

pub mod aggregate;
pub mod expr;
pub mod lazy_frame;
pub mod logical;
pub mod physical_executor;
pub mod typecheck;

pub use expr::{col, lit, BinaryOperator, BoundExpr, Expr, ExprError};
pub use lazy_frame::{GroupBy, LazyFrame};
pub use logical::{AggregateFunction, AggregateItem, JoinType, NodeId, NodeRef, OpKind, OpNode};
pub use physical_executor::PhysicalExecutor;
pub use typecheck::{SchemaResolver, JOIN_RIGHT_SUFFIX};
