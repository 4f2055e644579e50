// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Output schema resolution for deferred operation graphs
//!
//! Resolution walks the graph bottom-up before any partition work starts, so
//! a missing column or an ill-typed operand is reported against the node that
//! introduced it and never surfaces halfway through a compute.

use std::collections::HashMap;
use std::sync::Arc;

use super::expr::ExprError;
use super::logical::{AggregateFunction, AggregateItem, JoinType, NodeId, NodeRef, OpKind, OpNode};
use crate::exec::ExecutionError;
use crate::storage::{DataType, Field, Schema};

/// Suffix appended to right-side join columns whose names collide with the left side.
/// A counter follows it when the suffixed name is itself taken.
pub const JOIN_RIGHT_SUFFIX: &str = "_right";

/// Resolves and caches output schemas per node
#[derive(Debug, Default)]
pub struct SchemaResolver {
    cache: HashMap<NodeId, Arc<Schema>>,
}

impl SchemaResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output schema of `node`, typechecking the whole subgraph under it
    pub fn resolve(&mut self, node: &OpNode) -> Result<Arc<Schema>, ExecutionError> {
        if let Some(schema) = self.cache.get(&node.id()) {
            return Ok(schema.clone());
        }
        let schema = self.resolve_uncached(node)?;
        self.cache.insert(node.id(), schema.clone());
        Ok(schema)
    }

    fn resolve_uncached(&mut self, node: &OpNode) -> Result<Arc<Schema>, ExecutionError> {
        let at = node.node_ref();

        match node.kind() {
            OpKind::Scan { table } | OpKind::Persisted { table, .. } => Ok(table.schema().clone()),

            OpKind::Filter { input, predicate } => {
                let schema = self.resolve(input)?;
                let bound = predicate.bind(&schema).map_err(|e| expr_error(at, e))?;
                match bound.data_type() {
                    None | Some(DataType::Boolean) => Ok(schema),
                    Some(other) => Err(ExecutionError::type_mismatch(
                        at,
                        format!("predicate {} evaluates to {}, expected boolean", predicate, other),
                    )),
                }
            }

            OpKind::Select { input, columns } => {
                let schema = self.resolve(input)?;
                require_columns(at, &schema, columns)?;
                Ok(Arc::new(schema.project(columns).unwrap_or_default()))
            }

            OpKind::Aggregate {
                input,
                keys,
                aggregates,
            } => {
                let schema = self.resolve(input)?;
                aggregate_schema(at, &schema, keys, aggregates).map(Arc::new)
            }

            OpKind::Sort { input, column, .. } | OpKind::TopK { input, column, .. } => {
                let schema = self.resolve(input)?;
                require_columns(at, &schema, std::slice::from_ref(column))?;
                Ok(schema)
            }

            OpKind::Join {
                left,
                right,
                on,
                join_type,
            } => {
                let left = self.resolve(left)?;
                let right = self.resolve(right)?;
                JoinLayout::new(at, &left, &right, on, *join_type).map(|layout| layout.schema)
            }

            OpKind::Unique { input, column } => {
                let schema = self.resolve(input)?;
                let field = schema
                    .field(column)
                    .ok_or_else(|| ExecutionError::column_not_found(at, column))?;
                Ok(Arc::new(Schema::new(vec![field.clone()])))
            }

            OpKind::DropDuplicates { input, subset } => {
                let schema = self.resolve(input)?;
                require_columns(at, &schema, subset)?;
                Ok(schema)
            }

            OpKind::Head { input, .. } => self.resolve(input),

            OpKind::MapPartitions { input, schema, .. } => {
                self.resolve(input)?;
                Ok(schema.clone())
            }

            OpKind::Concat { inputs } => {
                let mut schemas = Vec::with_capacity(inputs.len());
                for input in inputs {
                    schemas.push(self.resolve(input)?);
                }
                let first = schemas.first().cloned().ok_or_else(|| {
                    ExecutionError::type_mismatch(at, "concat needs at least one input")
                })?;
                if let Some(other) = schemas.iter().find(|s| **s != first) {
                    return Err(ExecutionError::type_mismatch(
                        at,
                        format!("cannot concatenate {} with {}", other, first),
                    ));
                }
                Ok(first)
            }
        }
    }
}

fn expr_error(at: NodeRef, err: ExprError) -> ExecutionError {
    match err {
        ExprError::ColumnNotFound(column) => ExecutionError::column_not_found(at, column),
        ExprError::TypeMismatch(detail) => ExecutionError::type_mismatch(at, detail),
    }
}

fn require_columns(at: NodeRef, schema: &Schema, columns: &[String]) -> Result<(), ExecutionError> {
    match columns.iter().find(|c| schema.index_of(c).is_none()) {
        Some(missing) => Err(ExecutionError::column_not_found(at, missing)),
        None => Ok(()),
    }
}

/// Output schema of a groupby-aggregate: key columns first, then one column per aggregate
pub(crate) fn aggregate_schema(
    at: NodeRef,
    input: &Schema,
    keys: &[String],
    aggregates: &[AggregateItem],
) -> Result<Schema, ExecutionError> {
    require_columns(at, input, keys)?;

    let mut fields: Vec<Field> = keys
        .iter()
        .filter_map(|k| input.field(k).cloned())
        .collect();

    for item in aggregates {
        let source = input
            .field(&item.column)
            .ok_or_else(|| ExecutionError::column_not_found(at, &item.column))?;

        let field = match item.function {
            AggregateFunction::Count | AggregateFunction::NUnique => {
                Field::new(&item.output, DataType::Integer)
            }
            AggregateFunction::Sum | AggregateFunction::Mean => {
                if !source.data_type.is_numeric() {
                    return Err(ExecutionError::type_mismatch(
                        at,
                        format!(
                            "{} requires a numeric column, '{}' is {}",
                            item.function, item.column, source.data_type
                        ),
                    ));
                }
                if item.function == AggregateFunction::Sum {
                    Field::new(&item.output, source.data_type)
                } else {
                    Field::nullable(&item.output, DataType::Float)
                }
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                Field::nullable(&item.output, source.data_type)
            }
        };

        if fields.iter().any(|f| f.name == field.name) {
            return Err(ExecutionError::type_mismatch(
                at,
                format!("duplicate output column '{}'", field.name),
            ));
        }
        fields.push(field);
    }

    Ok(Schema::new(fields))
}

/// `<name>_right`, or `<name>_right_<n>` for the first `n` whose name is not
/// yet taken by an output column or by any right-side column
fn free_name(name: &str, taken: &[Field], right: &Schema) -> String {
    let is_free = |candidate: &str| {
        !taken.iter().any(|f| f.name == candidate) && right.index_of(candidate).is_none()
    };
    let base = format!("{}{}", name, JOIN_RIGHT_SUFFIX);
    let mut candidate = base.clone();
    let mut n = 0;
    while !is_free(&candidate) {
        n += 1;
        candidate = format!("{}_{}", base, n);
    }
    candidate
}

/// Column positions and output schema of an equality join
#[derive(Debug, Clone)]
pub(crate) struct JoinLayout {
    pub schema: Arc<Schema>,
    pub left_keys: Vec<usize>,
    pub right_keys: Vec<usize>,
    /// Right-side columns carried into the output (every non-key column)
    pub right_payload: Vec<usize>,
}

impl JoinLayout {
    pub fn new(
        at: NodeRef,
        left: &Schema,
        right: &Schema,
        on: &[String],
        join_type: JoinType,
    ) -> Result<Self, ExecutionError> {
        if on.is_empty() {
            return Err(ExecutionError::type_mismatch(at, "join needs at least one key column"));
        }

        let mut left_keys = Vec::with_capacity(on.len());
        let mut right_keys = Vec::with_capacity(on.len());
        for key in on {
            let l = left
                .index_of(key)
                .ok_or_else(|| ExecutionError::column_not_found(at, key))?;
            let r = right
                .index_of(key)
                .ok_or_else(|| ExecutionError::column_not_found(at, key))?;
            let lt = left.fields()[l].data_type;
            let rt = right.fields()[r].data_type;
            if lt != rt && !(lt.is_textual() && rt.is_textual()) {
                return Err(ExecutionError::type_mismatch(
                    at,
                    format!("join key '{}' is {} on the left and {} on the right", key, lt, rt),
                ));
            }
            left_keys.push(l);
            right_keys.push(r);
        }

        let mut fields = left.fields().to_vec();
        let mut right_payload = Vec::new();
        for (i, field) in right.fields().iter().enumerate() {
            if right_keys.contains(&i) {
                continue;
            }
            let mut out = if left.index_of(&field.name).is_some() {
                field.with_name(free_name(&field.name, &fields, right))
            } else {
                field.clone()
            };
            if join_type == JoinType::Left {
                out = out.as_nullable();
            }
            fields.push(out);
            right_payload.push(i);
        }

        Ok(Self {
            schema: Arc::new(Schema::new(fields)),
            left_keys,
            right_keys,
            right_payload,
        })
    }
}
