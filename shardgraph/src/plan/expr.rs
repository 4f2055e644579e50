// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Row-level expressions used by filter predicates
//!
//! Expressions are written against column names and bound to a concrete
//! schema before execution. Binding resolves column positions and checks
//! operand types once, so evaluation over partition rows cannot fail.
//!
//! Null handling is three-valued: comparisons and arithmetic with a null
//! operand yield null, `AND`/`OR` follow Kleene logic, and a filter keeps a
//! row only when its predicate evaluates to `true`.

use std::fmt;
use std::ops;

use crate::storage::{DataType, Partition, Schema, Value};

/// Binary operators supported in expressions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    And,
    Or,
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOperator {
    fn is_comparison(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Equal
                | BinaryOperator::NotEqual
                | BinaryOperator::LessThan
                | BinaryOperator::LessEqual
                | BinaryOperator::GreaterThan
                | BinaryOperator::GreaterEqual
        )
    }

    fn is_logical(&self) -> bool {
        matches!(self, BinaryOperator::And | BinaryOperator::Or)
    }

    fn symbol(&self) -> &'static str {
        match self {
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterEqual => ">=",
            BinaryOperator::And => "AND",
            BinaryOperator::Or => "OR",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
        }
    }
}

/// An unbound expression over named columns
#[derive(Debug, Clone)]
pub enum Expr {
    Column(String),
    Literal(Value),
    Binary {
        left: Box<Expr>,
        operator: BinaryOperator,
        right: Box<Expr>,
    },
    Not(Box<Expr>),
    IsNull(Box<Expr>),
}

/// Reference a column by name
pub fn col(name: impl Into<String>) -> Expr {
    Expr::Column(name.into())
}

/// A literal value
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Literal(value.into())
}

impl Expr {
    fn binary(self, operator: BinaryOperator, right: Expr) -> Expr {
        Expr::Binary {
            left: Box::new(self),
            operator,
            right: Box::new(right),
        }
    }

    pub fn eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Equal, other)
    }

    pub fn not_eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::NotEqual, other)
    }

    pub fn lt(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::LessThan, other)
    }

    pub fn lt_eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::LessEqual, other)
    }

    pub fn gt(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::GreaterThan, other)
    }

    pub fn gt_eq(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::GreaterEqual, other)
    }

    pub fn and(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::And, other)
    }

    pub fn or(self, other: Expr) -> Expr {
        self.binary(BinaryOperator::Or, other)
    }

    pub fn is_null(self) -> Expr {
        Expr::IsNull(Box::new(self))
    }

    pub fn is_not_null(self) -> Expr {
        Expr::Not(Box::new(Expr::IsNull(Box::new(self))))
    }

    /// Column names referenced by this expression
    pub fn columns(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_columns(&mut out);
        out
    }

    fn collect_columns<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Column(name) => out.push(name),
            Expr::Literal(_) => {}
            Expr::Binary { left, right, .. } => {
                left.collect_columns(out);
                right.collect_columns(out);
            }
            Expr::Not(inner) | Expr::IsNull(inner) => inner.collect_columns(out),
        }
    }

    /// Resolve columns against `schema` and typecheck every operator.
    pub fn bind(&self, schema: &Schema) -> Result<BoundExpr, ExprError> {
        match self {
            Expr::Column(name) => {
                let index = schema
                    .index_of(name)
                    .ok_or_else(|| ExprError::ColumnNotFound(name.clone()))?;
                Ok(BoundExpr {
                    data_type: Some(schema.fields()[index].data_type),
                    kind: BoundKind::Column(index),
                })
            }
            Expr::Literal(value) => Ok(BoundExpr {
                data_type: value.data_type(),
                kind: BoundKind::Literal(value.clone()),
            }),
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = left.bind(schema)?;
                let right = right.bind(schema)?;
                let data_type = Self::binary_result_type(&left, *operator, &right, self)?;
                Ok(BoundExpr {
                    data_type,
                    kind: BoundKind::Binary {
                        left: Box::new(left),
                        operator: *operator,
                        right: Box::new(right),
                    },
                })
            }
            Expr::Not(inner) => {
                let inner = inner.bind(schema)?;
                match inner.data_type {
                    None | Some(DataType::Boolean) => Ok(BoundExpr {
                        data_type: Some(DataType::Boolean),
                        kind: BoundKind::Not(Box::new(inner)),
                    }),
                    Some(other) => Err(ExprError::TypeMismatch(format!(
                        "NOT expects a boolean operand, found {} in {}",
                        other, self
                    ))),
                }
            }
            Expr::IsNull(inner) => Ok(BoundExpr {
                data_type: Some(DataType::Boolean),
                kind: BoundKind::IsNull(Box::new(inner.bind(schema)?)),
            }),
        }
    }

    fn binary_result_type(
        left: &BoundExpr,
        operator: BinaryOperator,
        right: &BoundExpr,
        expr: &Expr,
    ) -> Result<Option<DataType>, ExprError> {
        let mismatch = |what: &str| {
            ExprError::TypeMismatch(format!(
                "{} in {} (left: {}, right: {})",
                what,
                expr,
                type_name(left.data_type),
                type_name(right.data_type)
            ))
        };

        match (left.data_type, right.data_type) {
            _ if operator.is_comparison() => match (left.data_type, right.data_type) {
                (Some(l), Some(r)) if !l.is_comparable_with(&r) => {
                    Err(mismatch("operands are not comparable"))
                }
                _ => Ok(Some(DataType::Boolean)),
            },
            (l, r) if operator.is_logical() => {
                let is_bool = |t: Option<DataType>| matches!(t, None | Some(DataType::Boolean));
                if is_bool(l) && is_bool(r) {
                    Ok(Some(DataType::Boolean))
                } else {
                    Err(mismatch("logical operator expects boolean operands"))
                }
            }
            (l, r) => {
                let is_num = |t: Option<DataType>| t.map(|t| t.is_numeric()).unwrap_or(true);
                if !is_num(l) || !is_num(r) {
                    return Err(mismatch("arithmetic expects numeric operands"));
                }
                let float = operator == BinaryOperator::Divide
                    || l == Some(DataType::Float)
                    || r == Some(DataType::Float);
                Ok(Some(if float {
                    DataType::Float
                } else {
                    DataType::Integer
                }))
            }
        }
    }
}

fn type_name(t: Option<DataType>) -> String {
    t.map(|t| t.to_string()).unwrap_or_else(|| "null".to_string())
}

impl ops::Not for Expr {
    type Output = Expr;

    fn not(self) -> Expr {
        Expr::Not(Box::new(self))
    }
}

impl ops::Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Expr) -> Expr {
        self.binary(BinaryOperator::Add, rhs)
    }
}

impl ops::Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Expr) -> Expr {
        self.binary(BinaryOperator::Subtract, rhs)
    }
}

impl ops::Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Expr) -> Expr {
        self.binary(BinaryOperator::Multiply, rhs)
    }
}

impl ops::Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Expr) -> Expr {
        self.binary(BinaryOperator::Divide, rhs)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Column(name) => write!(f, "{}", name),
            Expr::Literal(Value::String(s)) => write!(f, "'{}'", s),
            Expr::Literal(value) => write!(f, "{}", value),
            Expr::Binary {
                left,
                operator,
                right,
            } => write!(f, "({} {} {})", left, operator.symbol(), right),
            Expr::Not(inner) => write!(f, "NOT {}", inner),
            Expr::IsNull(inner) => write!(f, "{} IS NULL", inner),
        }
    }
}

/// Expression binding failures, attributed to a plan node by the caller
#[derive(Debug, Clone, PartialEq)]
pub enum ExprError {
    ColumnNotFound(String),
    TypeMismatch(String),
}

#[derive(Debug, Clone)]
enum BoundKind {
    Column(usize),
    Literal(Value),
    Binary {
        left: Box<BoundExpr>,
        operator: BinaryOperator,
        right: Box<BoundExpr>,
    },
    Not(Box<BoundExpr>),
    IsNull(Box<BoundExpr>),
}

/// An expression resolved against a schema, ready for evaluation
#[derive(Debug, Clone)]
pub struct BoundExpr {
    data_type: Option<DataType>,
    kind: BoundKind,
}

impl BoundExpr {
    /// Result type; `None` when the expression is the null literal
    pub fn data_type(&self) -> Option<DataType> {
        self.data_type
    }

    /// Evaluate against one row of a partition
    pub fn evaluate(&self, partition: &Partition, row: usize) -> Value {
        match &self.kind {
            BoundKind::Column(index) => partition.value(row, *index).clone(),
            BoundKind::Literal(value) => value.clone(),
            BoundKind::Not(inner) => match inner.evaluate(partition, row) {
                Value::Boolean(b) => Value::Boolean(!b),
                _ => Value::Null,
            },
            BoundKind::IsNull(inner) => Value::Boolean(inner.evaluate(partition, row).is_null()),
            BoundKind::Binary {
                left,
                operator,
                right,
            } => {
                let l = left.evaluate(partition, row);
                // AND/OR short-circuit on a decisive left operand
                match (operator, &l) {
                    (BinaryOperator::And, Value::Boolean(false)) => return Value::Boolean(false),
                    (BinaryOperator::Or, Value::Boolean(true)) => return Value::Boolean(true),
                    _ => {}
                }
                let r = right.evaluate(partition, row);
                evaluate_binary(*operator, l, r)
            }
        }
    }

    /// Whether the row satisfies this predicate
    pub fn matches(&self, partition: &Partition, row: usize) -> bool {
        matches!(self.evaluate(partition, row), Value::Boolean(true))
    }
}

fn evaluate_binary(operator: BinaryOperator, l: Value, r: Value) -> Value {
    use std::cmp::Ordering;

    match operator {
        BinaryOperator::And => match (l, r) {
            (Value::Boolean(false), _) | (_, Value::Boolean(false)) => Value::Boolean(false),
            (Value::Boolean(true), Value::Boolean(true)) => Value::Boolean(true),
            _ => Value::Null,
        },
        BinaryOperator::Or => match (l, r) {
            (Value::Boolean(true), _) | (_, Value::Boolean(true)) => Value::Boolean(true),
            (Value::Boolean(false), Value::Boolean(false)) => Value::Boolean(false),
            _ => Value::Null,
        },
        _ if l.is_null() || r.is_null() => Value::Null,
        op if op.is_comparison() => {
            if l.is_nan() || r.is_nan() {
                return Value::Null;
            }
            let ord = l.compare(&r);
            let result = match op {
                BinaryOperator::Equal => ord == Ordering::Equal,
                BinaryOperator::NotEqual => ord != Ordering::Equal,
                BinaryOperator::LessThan => ord == Ordering::Less,
                BinaryOperator::LessEqual => ord != Ordering::Greater,
                BinaryOperator::GreaterThan => ord == Ordering::Greater,
                _ => ord != Ordering::Less,
            };
            Value::Boolean(result)
        }
        op => arithmetic(op, &l, &r),
    }
}

fn arithmetic(operator: BinaryOperator, l: &Value, r: &Value) -> Value {
    if let (Value::Integer(a), Value::Integer(b)) = (l, r) {
        let exact = match operator {
            BinaryOperator::Add => a.checked_add(*b),
            BinaryOperator::Subtract => a.checked_sub(*b),
            BinaryOperator::Multiply => a.checked_mul(*b),
            _ => None,
        };
        if let Some(v) = exact {
            return Value::Integer(v);
        }
    }

    match (l.as_f64(), r.as_f64()) {
        (Some(a), Some(b)) => Value::Float(match operator {
            BinaryOperator::Add => a + b,
            BinaryOperator::Subtract => a - b,
            BinaryOperator::Multiply => a * b,
            _ => a / b,
        }),
        _ => Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Field, Row};
    use std::sync::Arc;

    fn partition() -> Partition {
        let schema = Arc::new(Schema::new(vec![
            Field::new("county", DataType::String),
            Field::nullable("lat", DataType::Float),
            Field::new("infected", DataType::Integer),
        ]));
        let rows: Vec<Row> = vec![
            vec!["Sunderland".into(), 1.0.into(), 1i64.into()],
            vec!["A".into(), Value::Null, 0i64.into()],
        ];
        Partition::from_rows(schema, rows, 0).unwrap()
    }

    #[test]
    fn test_comparison_mixes_int_and_float() {
        let part = partition();
        let pred = col("lat").gt_eq(lit(1i64)).bind(part.schema()).unwrap();
        assert!(pred.matches(&part, 0));
    }

    #[test]
    fn test_null_comparison_never_matches() {
        let part = partition();
        let pred = col("lat").lt(lit(100.0)).bind(part.schema()).unwrap();
        assert!(!pred.matches(&part, 1));

        let negated = (!col("lat").lt(lit(100.0))).bind(part.schema()).unwrap();
        assert!(!negated.matches(&part, 1));
    }

    #[test]
    fn test_nan_comparison_never_matches() {
        let schema = Arc::new(Schema::new(vec![Field::new("lat", DataType::Float)]));
        let part = Partition::from_rows(schema, vec![vec![f64::NAN.into()]], 0).unwrap();

        for pred in [
            col("lat").gt(lit(1.0)),
            col("lat").lt(lit(1.0)),
            col("lat").eq(col("lat")),
            col("lat").not_eq(lit(1i64)),
        ] {
            let bound = pred.bind(part.schema()).unwrap();
            assert_eq!(bound.evaluate(&part, 0), Value::Null);
            assert!(!bound.matches(&part, 0));
        }
    }

    #[test]
    fn test_kleene_logic() {
        let part = partition();
        let pred = col("lat")
            .gt(lit(0.0))
            .or(col("infected").eq(lit(0i64)))
            .bind(part.schema())
            .unwrap();
        assert!(pred.matches(&part, 1));
    }

    #[test]
    fn test_bind_reports_missing_column() {
        let part = partition();
        let err = col("northing").gt(lit(1.0)).bind(part.schema()).unwrap_err();
        assert_eq!(err, ExprError::ColumnNotFound("northing".to_string()));
    }

    #[test]
    fn test_bind_rejects_string_number_comparison() {
        let part = partition();
        let err = col("county").gt(lit(1.0)).bind(part.schema()).unwrap_err();
        assert!(matches!(err, ExprError::TypeMismatch(_)));
    }

    #[test]
    fn test_arithmetic_types() {
        let part = partition();
        let sum = (col("infected") + lit(2i64)).bind(part.schema()).unwrap();
        assert_eq!(sum.data_type(), Some(DataType::Integer));
        assert_eq!(sum.evaluate(&part, 0), Value::Integer(3));

        let ratio = (col("infected") / lit(2i64)).bind(part.schema()).unwrap();
        assert_eq!(ratio.data_type(), Some(DataType::Float));
        assert_eq!(ratio.evaluate(&part, 0), Value::Float(0.5));
    }

    #[test]
    fn test_display() {
        let e = col("county").eq(lit("Sunderland")).and(col("lat").gt(lit(1.0)));
        assert_eq!(e.to_string(), "((county == 'Sunderland') AND (lat > 1))");
    }
}
