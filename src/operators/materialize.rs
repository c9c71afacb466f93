//! Materialize: one row built from parameters and constants

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::executor::{ExecutorError, ExecutorResult, Operator, OperatorKind};
use crate::expr::{schema_from_expressions, Expression};
use crate::storage::TempTable;
use crate::types::{ParameterSet, Tuple, TupleSchema};

use super::output_mut;

/// Source of `INSERT ... VALUES`: evaluates its expressions once per execution
#[derive(Debug)]
pub struct MaterializeOperator {
    exprs: Vec<Expression>,
    output_schema: Arc<TupleSchema>,
    output: Option<TempTable>,
}

impl MaterializeOperator {
    pub fn new(exprs: Vec<Expression>) -> Self {
        let output_schema = Arc::new(schema_from_expressions(&exprs));
        Self {
            exprs,
            output_schema,
            output: None,
        }
    }
}

impl Operator for MaterializeOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Materialize
    }

    fn init(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        if let Some(index) = self.exprs.iter().find_map(Expression::as_column) {
            return Err(ExecutorError::configuration_invalid(format!(
                "materialize cannot reference input column {}",
                index
            )));
        }
        self.output = Some(TempTable::new("materialize", Arc::clone(&self.output_schema), ctx.arena()));
        Ok(())
    }

    fn execute(
        &mut self,
        _ctx: &ExecutionContext,
        params: &ParameterSet,
        _inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<()> {
        let values = self
            .exprs
            .iter()
            .map(|expr| expr.eval(None, params))
            .collect::<Result<Vec<_>, _>>()?;
        output_mut(&mut self.output, OperatorKind::Materialize)?.insert_temp_tuple(Tuple::new(values))?;
        Ok(())
    }

    fn output_table(&self) -> Option<&TempTable> {
        self.output.as_ref()
    }

    fn output_table_mut(&mut self) -> Option<&mut TempTable> {
        self.output.as_mut()
    }
}
