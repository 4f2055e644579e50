// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Scalar value and column type system for partitioned tables

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Boolean,
    Integer,
    Float,
    String,
    /// String values drawn from a bounded set of levels
    Categorical,
}

impl DataType {
    /// Integer and float columns take part in arithmetic and numeric aggregates
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    /// String and categorical columns hold text
    pub fn is_textual(&self) -> bool {
        matches!(self, DataType::String | DataType::Categorical)
    }

    /// Whether values of `self` and `other` can be compared with each other
    pub fn is_comparable_with(&self, other: &DataType) -> bool {
        (self.is_numeric() && other.is_numeric())
            || (self.is_textual() && other.is_textual())
            || (self == other)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Boolean => "boolean",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::String => "string",
            DataType::Categorical => "categorical",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "boolean" | "bool" => Ok(DataType::Boolean),
            "integer" | "int" | "int32" | "int64" => Ok(DataType::Integer),
            "float" | "float32" | "float64" => Ok(DataType::Float),
            "string" | "str" => Ok(DataType::String),
            "categorical" | "category" => Ok(DataType::Categorical),
            _ => Err(format!(
                "Unknown data type: {}. Valid options: boolean, integer, float, string, categorical",
                s
            )),
        }
    }
}

/// A single cell value
///
/// Equality and hashing are exact: `Integer(1)` and `Float(1.0)` are different
/// keys, and floats compare by bit pattern (with `-0.0` folded into `0.0`).
/// Use [`Value::compare`] for the numeric ordering used by predicates and sorts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// A float NaN; predicates and aggregates treat it as missing
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Float(f) if f.is_nan())
    }

    /// Runtime type of the value; `None` for null
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(DataType::Boolean),
            Value::Integer(_) => Some(DataType::Integer),
            Value::Float(_) => Some(DataType::Float),
            Value::String(_) => Some(DataType::String),
        }
    }

    /// Numeric view of the value
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Convert the value into the representation of a column of type `dtype`.
    ///
    /// Integers widen into float columns; text goes into string or categorical
    /// columns. Returns `None` if the value does not fit. Null always fits here;
    /// nullability is checked by the caller.
    pub fn coerce(self, dtype: DataType) -> Option<Value> {
        match (self, dtype) {
            (Value::Null, _) => Some(Value::Null),
            (Value::Boolean(b), DataType::Boolean) => Some(Value::Boolean(b)),
            (Value::Integer(i), DataType::Integer) => Some(Value::Integer(i)),
            (Value::Integer(i), DataType::Float) => Some(Value::Float(i as f64)),
            (Value::Float(f), DataType::Float) => Some(Value::Float(f)),
            (Value::String(s), DataType::String | DataType::Categorical) => {
                Some(Value::String(s))
            }
            _ => None,
        }
    }

    /// Total order used by sorts and range predicates.
    ///
    /// Numbers compare numerically across integer/float, text lexicographically,
    /// `false < true`. Null sorts after every non-null value. Values of
    /// unrelated types order by a fixed type rank. NaN sorts above every
    /// number; predicates and aggregates check [`Value::is_nan`] first.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Greater,
            (_, Value::Null) => Ordering::Less,
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Integer(_) | Value::Float(_), Value::Integer(_) | Value::Float(_)) => {
                let a = self.as_f64().unwrap_or(f64::NAN);
                let b = other.as_f64().unwrap_or(f64::NAN);
                a.total_cmp(&b)
            }
            (Value::String(a), Value::String(b)) => a.cmp(b),
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            _ => self.type_rank().cmp(&other.type_rank()),
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            Value::Boolean(_) => 0,
            Value::Integer(_) | Value::Float(_) => 1,
            Value::String(_) => 2,
            Value::Null => 3,
        }
    }

    fn normalized_float_bits(f: f64) -> u64 {
        if f == 0.0 {
            0.0f64.to_bits()
        } else {
            f.to_bits()
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => {
                Self::normalized_float_bits(*a) == Self::normalized_float_bits(*b)
            }
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::Null => 0u8.hash(state),
            Value::Boolean(b) => {
                1u8.hash(state);
                b.hash(state);
            }
            Value::Integer(i) => {
                2u8.hash(state);
                i.hash(state);
            }
            Value::Float(f) => {
                3u8.hash(state);
                Self::normalized_float_bits(*f).hash(state);
            }
            Value::String(s) => {
                4u8.hash(state);
                s.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Integer(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_numeric_compare_across_types() {
        assert_eq!(Value::Integer(2).compare(&Value::Float(1.5)), Ordering::Greater);
        assert_eq!(Value::Float(2.0).compare(&Value::Integer(2)), Ordering::Equal);
    }

    #[test]
    fn test_null_sorts_last() {
        assert_eq!(Value::Null.compare(&Value::Integer(i64::MAX)), Ordering::Greater);
        assert_eq!(Value::from("a").compare(&Value::Null), Ordering::Less);
    }

    #[test]
    fn test_exact_equality_for_keys() {
        assert_ne!(Value::Integer(1), Value::Float(1.0));
        assert_eq!(Value::Float(0.0), Value::Float(-0.0));

        let mut set = HashSet::new();
        set.insert(Value::Float(0.0));
        assert!(set.contains(&Value::Float(-0.0)));
    }

    #[test]
    fn test_coerce() {
        assert_eq!(Value::Integer(3).coerce(DataType::Float), Some(Value::Float(3.0)));
        assert_eq!(
            Value::from("x").coerce(DataType::Categorical),
            Some(Value::from("x"))
        );
        assert_eq!(Value::Float(1.0).coerce(DataType::Integer), None);
    }

    #[test]
    fn test_data_type_from_str() {
        assert_eq!("int32".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("category".parse::<DataType>().unwrap(), DataType::Categorical);
        assert!("blob".parse::<DataType>().is_err());
    }
}
