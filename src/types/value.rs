//! Scalar values carried in tuples and parameter vectors
//!
//! NULL handling follows grouping semantics: two NULLs compare equal and
//! NULL sorts before every non-NULL value.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column and expression types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// Boolean
    Boolean,
    /// 8-bit signed integer
    TinyInt,
    /// 32-bit signed integer
    Integer,
    /// 64-bit signed integer
    BigInt,
    /// 64-bit floating point
    Double,
    /// Variable-length UTF-8 string
    Varchar,
    /// Microseconds since the Unix epoch
    Timestamp,
}

impl ValueType {
    /// Returns the type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            ValueType::Boolean => "BOOLEAN",
            ValueType::TinyInt => "TINYINT",
            ValueType::Integer => "INTEGER",
            ValueType::BigInt => "BIGINT",
            ValueType::Double => "DOUBLE",
            ValueType::Varchar => "VARCHAR",
            ValueType::Timestamp => "TIMESTAMP",
        }
    }

    /// Default storage size in bytes
    pub fn default_size(&self) -> u32 {
        match self {
            ValueType::Boolean | ValueType::TinyInt => 1,
            ValueType::Integer => 4,
            ValueType::BigInt | ValueType::Double | ValueType::Timestamp => 8,
            ValueType::Varchar => 64,
        }
    }

    /// Whether values of this type live out of line
    pub fn is_variable_length(&self) -> bool {
        matches!(self, ValueType::Varchar)
    }

    /// Whether this is an exact integer type
    pub fn is_integral(&self) -> bool {
        matches!(
            self,
            ValueType::TinyInt | ValueType::Integer | ValueType::BigInt | ValueType::Timestamp
        )
    }

    fn tag(&self) -> u8 {
        match self {
            ValueType::Boolean => 1,
            ValueType::TinyInt => 2,
            ValueType::Integer => 3,
            ValueType::BigInt => 4,
            ValueType::Double => 5,
            ValueType::Varchar => 6,
            ValueType::Timestamp => 7,
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// Errors raised by casts and arithmetic
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("numeric overflow: {0}")]
    Overflow(String),

    #[error("cannot cast {from} to {to}")]
    InvalidCast { from: String, to: ValueType },

    #[error("type mismatch: {0}")]
    TypeMismatch(String),
}

/// Result type for value operations
pub type ValueResult<T> = Result<T, ValueError>;

/// A single typed scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Boolean(bool),
    TinyInt(i8),
    Integer(i32),
    BigInt(i64),
    Double(f64),
    Varchar(String),
    Timestamp(i64),
}

impl Value {
    /// Whether this value is SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Type of this value, `None` for NULL
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Null => None,
            Value::Boolean(_) => Some(ValueType::Boolean),
            Value::TinyInt(_) => Some(ValueType::TinyInt),
            Value::Integer(_) => Some(ValueType::Integer),
            Value::BigInt(_) => Some(ValueType::BigInt),
            Value::Double(_) => Some(ValueType::Double),
            Value::Varchar(_) => Some(ValueType::Varchar),
            Value::Timestamp(_) => Some(ValueType::Timestamp),
        }
    }

    /// Integer view of an exact numeric value
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(*v as i64),
            Value::Integer(v) => Some(*v as i64),
            Value::BigInt(v) | Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Double(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// Estimated in-memory footprint, used for arena accounting
    pub fn estimated_size(&self) -> usize {
        match self {
            Value::Null => 1,
            Value::Boolean(_) | Value::TinyInt(_) => 1,
            Value::Integer(_) => 4,
            Value::BigInt(_) | Value::Double(_) | Value::Timestamp(_) => 8,
            Value::Varchar(s) => 8 + s.len(),
        }
    }

    /// Total order used for key comparison.
    ///
    /// NULL == NULL, NULL < anything else. Numerics compare by value across
    /// widths; otherwise values of different types order by type.
    pub fn compare(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
            (Value::Varchar(a), Value::Varchar(b)) => a.cmp(b),
            (Value::Double(_), _) | (_, Value::Double(_)) => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a.total_cmp(&b),
                _ => self.type_order(other),
            },
            _ => match (self.as_i64(), other.as_i64()) {
                (Some(a), Some(b)) => a.cmp(&b),
                _ => self.type_order(other),
            },
        }
    }

    fn type_order(&self, other: &Value) -> Ordering {
        let a = self.value_type().map(|t| t.tag()).unwrap_or(0);
        let b = other.value_type().map(|t| t.tag()).unwrap_or(0);
        a.cmp(&b)
    }

    /// Casts to the given type, failing on overflow or impossible conversions.
    /// NULL casts to NULL.
    pub fn cast_as(&self, target: ValueType) -> ValueResult<Value> {
        if self.is_null() {
            return Ok(Value::Null);
        }
        if self.value_type() == Some(target) {
            return Ok(self.clone());
        }
        let invalid = || ValueError::InvalidCast {
            from: self.to_string(),
            to: target,
        };
        match target {
            ValueType::TinyInt => {
                let v = self.integral_for_cast().ok_or_else(invalid)?;
                i8::try_from(v)
                    .map(Value::TinyInt)
                    .map_err(|_| ValueError::Overflow(format!("{} does not fit TINYINT", v)))
            }
            ValueType::Integer => {
                let v = self.integral_for_cast().ok_or_else(invalid)?;
                i32::try_from(v)
                    .map(Value::Integer)
                    .map_err(|_| ValueError::Overflow(format!("{} does not fit INTEGER", v)))
            }
            ValueType::BigInt => self.integral_for_cast().map(Value::BigInt).ok_or_else(invalid),
            ValueType::Timestamp => self
                .integral_for_cast()
                .map(Value::Timestamp)
                .ok_or_else(invalid),
            ValueType::Double => self.as_f64().map(Value::Double).ok_or_else(invalid),
            ValueType::Varchar => Ok(Value::Varchar(self.to_string())),
            ValueType::Boolean => Err(invalid()),
        }
    }

    fn integral_for_cast(&self) -> Option<i64> {
        match self {
            Value::Double(d) if d.is_finite() && d.fract() == 0.0 => {
                if *d >= i64::MIN as f64 && *d <= i64::MAX as f64 {
                    Some(*d as i64)
                } else {
                    None
                }
            }
            other => other.as_i64(),
        }
    }

    /// Checked addition; NULL propagates
    pub fn checked_add(&self, other: &Value) -> ValueResult<Value> {
        self.arith(other, "+", i64::checked_add, |a, b| a + b)
    }

    /// Checked subtraction; NULL propagates
    pub fn checked_sub(&self, other: &Value) -> ValueResult<Value> {
        self.arith(other, "-", i64::checked_sub, |a, b| a - b)
    }

    /// Checked multiplication; NULL propagates
    pub fn checked_mul(&self, other: &Value) -> ValueResult<Value> {
        self.arith(other, "*", i64::checked_mul, |a, b| a * b)
    }

    fn arith(
        &self,
        other: &Value,
        op: &str,
        int_op: fn(i64, i64) -> Option<i64>,
        float_op: fn(f64, f64) -> f64,
    ) -> ValueResult<Value> {
        if self.is_null() || other.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = || ValueError::TypeMismatch(format!("{} {} {}", self, op, other));
        if matches!(self, Value::Double(_)) || matches!(other, Value::Double(_)) {
            let a = self.as_f64().ok_or_else(mismatch)?;
            let b = other.as_f64().ok_or_else(mismatch)?;
            let result = float_op(a, b);
            if !result.is_finite() {
                return Err(ValueError::Overflow(format!("{} {} {}", a, op, b)));
            }
            return Ok(Value::Double(result));
        }
        let a = self.as_i64().ok_or_else(mismatch)?;
        let b = other.as_i64().ok_or_else(mismatch)?;
        int_op(a, b)
            .map(Value::BigInt)
            .ok_or_else(|| ValueError::Overflow(format!("{} {} {}", a, op, b)))
    }

    /// Appends a canonical byte encoding (type tag + payload)
    pub fn write_bytes(&self, buf: &mut Vec<u8>) {
        match self {
            Value::Null => buf.push(0),
            Value::Boolean(b) => {
                buf.push(ValueType::Boolean.tag());
                buf.push(*b as u8);
            }
            Value::TinyInt(v) => {
                buf.push(ValueType::TinyInt.tag());
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Value::Integer(v) => {
                buf.push(ValueType::Integer.tag());
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Value::BigInt(v) => {
                buf.push(ValueType::BigInt.tag());
                buf.extend_from_slice(&v.to_le_bytes());
            }
            Value::Double(v) => {
                buf.push(ValueType::Double.tag());
                buf.extend_from_slice(&v.to_bits().to_le_bytes());
            }
            Value::Varchar(s) => {
                buf.push(ValueType::Varchar.tag());
                buf.extend_from_slice(&(s.len() as u32).to_le_bytes());
                buf.extend_from_slice(s.as_bytes());
            }
            Value::Timestamp(v) => {
                buf.push(ValueType::Timestamp.tag());
                buf.extend_from_slice(&v.to_le_bytes());
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::TinyInt(v) => write!(f, "{}", v),
            Value::Integer(v) => write!(f, "{}", v),
            Value::BigInt(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Varchar(s) => write!(f, "{}", s),
            Value::Timestamp(micros) => match DateTime::<Utc>::from_timestamp_micros(*micros) {
                Some(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S%.6f")),
                None => write!(f, "{}", micros),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_compares_equal_and_first() {
        assert_eq!(Value::Null.compare(&Value::Null), Ordering::Equal);
        assert_eq!(Value::Null.compare(&Value::BigInt(-5)), Ordering::Less);
        assert_eq!(Value::Integer(0).compare(&Value::Null), Ordering::Greater);
    }

    #[test]
    fn test_numeric_compare_across_widths() {
        assert_eq!(Value::Integer(10).compare(&Value::BigInt(10)), Ordering::Equal);
        assert_eq!(Value::TinyInt(3).compare(&Value::Double(3.5)), Ordering::Less);
    }

    #[test]
    fn test_cast_overflow() {
        let err = Value::BigInt(1 << 40).cast_as(ValueType::Integer).unwrap_err();
        assert!(matches!(err, ValueError::Overflow(_)));
        assert_eq!(
            Value::BigInt(7).cast_as(ValueType::Integer).unwrap(),
            Value::Integer(7)
        );
    }

    #[test]
    fn test_cast_null_stays_null() {
        assert_eq!(Value::Null.cast_as(ValueType::BigInt).unwrap(), Value::Null);
    }

    #[test]
    fn test_checked_add_overflow() {
        let err = Value::BigInt(i64::MAX).checked_add(&Value::BigInt(1)).unwrap_err();
        assert!(matches!(err, ValueError::Overflow(_)));
    }

    #[test]
    fn test_arith_null_propagates() {
        assert_eq!(Value::Null.checked_mul(&Value::BigInt(2)).unwrap(), Value::Null);
    }

    #[test]
    fn test_encoding_distinguishes_types() {
        let mut a = Vec::new();
        let mut b = Vec::new();
        Value::Integer(1).write_bytes(&mut a);
        Value::BigInt(1).write_bytes(&mut b);
        assert_ne!(a, b);
    }
}
