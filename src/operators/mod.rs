//! Operator implementations
//!
//! Each operator owns its output temp table, created in `init` against the
//! partition's arena. Operators that read an input consume it: after a
//! successful `execute` the input table is empty.

mod insert;
mod materialize;
mod projection;
mod seq_scan;
mod swap_tables;
pub mod window;

pub use insert::InsertOperator;
pub use materialize::MaterializeOperator;
pub use projection::ProjectionOperator;
pub use seq_scan::SeqScanOperator;
pub use swap_tables::SwapTablesOperator;
pub use window::{WindowAggregateSpec, WindowFunctionKind, WindowFunctionOperator, WindowScanStats};

use std::sync::Arc;

use crate::executor::{ExecutorError, ExecutorResult, OperatorKind};
use crate::storage::TempTable;
use crate::types::{ColumnInfo, Tuple, TupleSchema, Value, ValueType};

/// Schema of the single-row, single-column count that DML operators report
pub fn modified_count_schema() -> Arc<TupleSchema> {
    Arc::new(TupleSchema::new(vec![ColumnInfo::not_null(ValueType::BigInt)]))
}

fn output_mut(output: &mut Option<TempTable>, kind: OperatorKind) -> ExecutorResult<&mut TempTable> {
    output
        .as_mut()
        .ok_or_else(|| ExecutorError::execution_failed(format!("{} executed before init", kind)))
}

fn single_input<'a, 'b>(
    inputs: &'a mut [&'b mut TempTable],
    kind: OperatorKind,
) -> ExecutorResult<&'a mut TempTable> {
    match inputs {
        [input] => Ok(&mut **input),
        _ => Err(ExecutorError::execution_failed(format!(
            "{} expects exactly one input table, got {}",
            kind,
            inputs.len()
        ))),
    }
}

fn write_modified_count(output: &mut TempTable, modified: i64) -> ExecutorResult<()> {
    output.insert_temp_tuple(Tuple::new(vec![Value::BigInt(modified)]))?;
    Ok(())
}
