//! Expression nodes and evaluation

use thiserror::Error;

use crate::types::{ParameterSet, Tuple, Value, ValueError, ValueType};

/// Expression evaluation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    #[error("column {index} out of range for tuple of width {width}")]
    ColumnOutOfRange { index: usize, width: usize },

    #[error("column {0} referenced without an input tuple")]
    MissingTuple(usize),

    #[error("parameter {index} not bound ({bound} parameters supplied)")]
    ParameterOutOfRange { index: usize, bound: usize },

    #[error(transparent)]
    Value(#[from] ValueError),
}

/// Result type for expression evaluation
pub type ExprResult<T> = Result<T, ExprError>;

/// Binary arithmetic operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
}

/// A resolved scalar expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Value of an input column
    Column { index: usize, value_type: ValueType },
    /// Value of a bound parameter
    Parameter { index: usize, value_type: ValueType },
    /// Literal; a typed NULL is `Constant { value: Null, .. }`
    Constant { value: Value, value_type: ValueType },
    /// Checked arithmetic
    Arithmetic {
        op: ArithmeticOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// `expr IS NULL`
    IsNull(Box<Expression>),
}

impl Expression {
    /// Column reference
    pub fn column(index: usize, value_type: ValueType) -> Self {
        Expression::Column { index, value_type }
    }

    /// Parameter reference
    pub fn parameter(index: usize, value_type: ValueType) -> Self {
        Expression::Parameter { index, value_type }
    }

    /// Typed literal. NULL literals default to BIGINT.
    pub fn constant(value: Value) -> Self {
        let value_type = value.value_type().unwrap_or(ValueType::BigInt);
        Expression::Constant { value, value_type }
    }

    /// Checked arithmetic node
    pub fn arithmetic(op: ArithmeticOp, left: Expression, right: Expression) -> Self {
        Expression::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// `IS NULL` test
    pub fn is_null(inner: Expression) -> Self {
        Expression::IsNull(Box::new(inner))
    }

    /// Static result type
    pub fn value_type(&self) -> ValueType {
        match self {
            Expression::Column { value_type, .. }
            | Expression::Parameter { value_type, .. }
            | Expression::Constant { value_type, .. } => *value_type,
            Expression::Arithmetic { left, right, .. } => {
                let (l, r) = (left.value_type(), right.value_type());
                if l == ValueType::Double || r == ValueType::Double {
                    ValueType::Double
                } else {
                    ValueType::BigInt
                }
            }
            Expression::IsNull(_) => ValueType::Boolean,
        }
    }

    /// Declared size of the result
    pub fn value_size(&self) -> u32 {
        self.value_type().default_size()
    }

    /// Whether the result size counts bytes
    pub fn in_bytes(&self) -> bool {
        false
    }

    /// Ordinal if this is a plain column reference
    pub fn as_column(&self) -> Option<usize> {
        match self {
            Expression::Column { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Position if this is a plain parameter reference
    pub fn as_parameter(&self) -> Option<usize> {
        match self {
            Expression::Parameter { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Whether any node references a parameter
    pub fn has_parameter(&self) -> bool {
        match self {
            Expression::Parameter { .. } => true,
            Expression::Column { .. } | Expression::Constant { .. } => false,
            Expression::Arithmetic { left, right, .. } => {
                left.has_parameter() || right.has_parameter()
            }
            Expression::IsNull(inner) => inner.has_parameter(),
        }
    }

    /// Evaluates against an optional input tuple and the parameter vector
    pub fn eval(&self, tuple: Option<&Tuple>, params: &ParameterSet) -> ExprResult<Value> {
        match self {
            Expression::Column { index, .. } => {
                let tuple = tuple.ok_or(ExprError::MissingTuple(*index))?;
                tuple
                    .get(*index)
                    .cloned()
                    .ok_or(ExprError::ColumnOutOfRange {
                        index: *index,
                        width: tuple.len(),
                    })
            }
            Expression::Parameter { index, .. } => {
                params
                    .get(*index)
                    .cloned()
                    .ok_or(ExprError::ParameterOutOfRange {
                        index: *index,
                        bound: params.len(),
                    })
            }
            Expression::Constant { value, .. } => Ok(value.clone()),
            Expression::Arithmetic { op, left, right } => {
                let l = left.eval(tuple, params)?;
                let r = right.eval(tuple, params)?;
                let result = match op {
                    ArithmeticOp::Add => l.checked_add(&r),
                    ArithmeticOp::Subtract => l.checked_sub(&r),
                    ArithmeticOp::Multiply => l.checked_mul(&r),
                };
                Ok(result?)
            }
            Expression::IsNull(inner) => Ok(Value::Boolean(inner.eval(tuple, params)?.is_null())),
        }
    }
}
