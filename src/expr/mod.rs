//! Expression trees evaluated by the executors
//!
//! Expressions are resolved by the planner: column references carry their
//! input ordinal and type, parameters their position in the parameter
//! vector. Evaluation never panics; out-of-range references and arithmetic
//! overflow surface as `ExprError`.

mod expression;

pub use expression::{ArithmeticOp, ExprError, ExprResult, Expression};

use crate::types::{ColumnInfo, TupleSchema};

/// Builds a key schema from a list of key-extraction expressions.
///
/// Every key column is nullable; type, size and in-bytes flag come from the
/// expression.
pub fn schema_from_expressions(exprs: &[Expression]) -> TupleSchema {
    TupleSchema::new(
        exprs
            .iter()
            .map(|expr| ColumnInfo {
                value_type: expr.value_type(),
                size: expr.value_size(),
                allow_null: true,
                in_bytes: expr.in_bytes(),
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ValueType;

    #[test]
    fn test_key_schema_is_nullable_and_ordered() {
        let exprs = vec![
            Expression::column(2, ValueType::Varchar),
            Expression::column(0, ValueType::BigInt),
        ];
        let schema = schema_from_expressions(&exprs);
        assert_eq!(schema.column_count(), 2);
        assert_eq!(schema.column_type(0), Some(ValueType::Varchar));
        assert_eq!(schema.column_type(1), Some(ValueType::BigInt));
        assert!(schema.columns().iter().all(|c| c.allow_null));
    }

    #[test]
    fn test_empty_expression_list_gives_empty_schema() {
        assert_eq!(schema_from_expressions(&[]).column_count(), 0);
    }
}
