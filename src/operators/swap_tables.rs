//! Swap the contents of two persistent tables

use crate::context::ExecutionContext;
use crate::executor::{ExecutorResult, Operator, OperatorKind};
use crate::storage::{swap_tables, TableHandle, TempTable};
use crate::types::ParameterSet;

use super::{modified_count_schema, output_mut, write_modified_count};

/// Exchanges the rows of two tables with compatible schemas and reports the
/// number of rows touched (the sum of both tables' visible counts)
#[derive(Debug)]
pub struct SwapTablesOperator {
    left: TableHandle,
    right: TableHandle,
    output: Option<TempTable>,
}

impl SwapTablesOperator {
    pub fn new(left: TableHandle, right: TableHandle) -> Self {
        Self {
            left,
            right,
            output: None,
        }
    }
}

impl Operator for SwapTablesOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::SwapTables
    }

    fn init(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        let name = format!("swap:{}:{}", self.left.name(), self.right.name());
        self.output = Some(TempTable::new(name, modified_count_schema(), ctx.arena()));
        Ok(())
    }

    fn execute(
        &mut self,
        ctx: &ExecutionContext,
        _params: &ParameterSet,
        _inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<()> {
        let touched = swap_tables(self.left.as_ref(), self.right.as_ref())? as i64;
        ctx.add_tuples_modified(touched);
        write_modified_count(output_mut(&mut self.output, OperatorKind::SwapTables)?, touched)
    }

    fn output_table(&self) -> Option<&TempTable> {
        self.output.as_ref()
    }

    fn output_table_mut(&mut self) -> Option<&mut TempTable> {
        self.output.as_mut()
    }
}
