//! The operator contract the chain runner drives

use std::fmt;

use crate::context::ExecutionContext;
use crate::storage::{TableHandle, TempTable};
use crate::types::ParameterSet;

use super::errors::{ExecutorError, ExecutorResult};

/// Operator kinds known to the runner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorKind {
    SeqScan,
    Projection,
    Materialize,
    Insert,
    SwapTables,
    WindowFunction,
}

impl OperatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatorKind::SeqScan => "SEQSCAN",
            OperatorKind::Projection => "PROJECTION",
            OperatorKind::Materialize => "MATERIALIZE",
            OperatorKind::Insert => "INSERT",
            OperatorKind::SwapTables => "SWAPTABLES",
            OperatorKind::WindowFunction => "WINDOWFUNCTION",
        }
    }
}

impl fmt::Display for OperatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One step of an executor chain.
///
/// `execute` receives the output tables of the operators named by
/// `input_indices`, in that order. Successful execution leaves the result in
/// the operator's own output table; inputs it consumed are left empty.
pub trait Operator: Send {
    fn kind(&self) -> OperatorKind;

    /// Chain positions whose output this operator reads
    fn input_indices(&self) -> &[usize] {
        &[]
    }

    /// Validates configuration and creates the output table.
    ///
    /// Unsupported configurations fail here, never during `execute`.
    fn init(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()>;

    fn execute(
        &mut self,
        ctx: &ExecutionContext,
        params: &ParameterSet,
        inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<()>;

    fn output_table(&self) -> Option<&TempTable>;

    fn output_table_mut(&mut self) -> Option<&mut TempTable>;

    /// Operators evaluated inside this one rather than as chain steps
    fn inline_operators_mut(&mut self) -> Vec<&mut dyn Operator> {
        Vec::new()
    }

    /// Empties the output table, returning its rows' memory to the arena
    fn cleanup_temp_output_table(&mut self) {
        if let Some(output) = self.output_table_mut() {
            output.delete_all_temp_tuples();
        }
    }

    /// Releases per-execution scratch memory
    fn cleanup_memory_pool(&mut self) {}

    fn output_temp_table_is_empty(&self) -> bool {
        self.output_table().map_or(true, |output| output.is_empty())
    }

    /// Table this operator writes when it is replicated on every partition
    fn replicated_target(&self) -> Option<&TableHandle> {
        None
    }

    /// Performs the replicated write on the designated partition.
    /// Returns the number of rows modified.
    fn execute_replicated(
        &mut self,
        _ctx: &ExecutionContext,
        _params: &ParameterSet,
        _inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<i64> {
        Err(ExecutorError::execution_failed(format!(
            "{} does not write replicated tables",
            self.kind()
        )))
    }

    /// Completes a replicated write on a partition that waited for the
    /// designated partition, given the count it reported
    fn complete_replicated_write(
        &mut self,
        _ctx: &ExecutionContext,
        _modified: i64,
        _inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<()> {
        Err(ExecutorError::execution_failed(format!(
            "{} does not write replicated tables",
            self.kind()
        )))
    }
}
