//! Projection: evaluates output expressions over each input row

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::executor::{ExecutorError, ExecutorResult, Operator, OperatorKind};
use crate::expr::{schema_from_expressions, Expression};
use crate::storage::TempTable;
use crate::types::{ParameterSet, Tuple, TupleSchema};

use super::{output_mut, single_input};

/// How output rows are built, decided once at construction
#[derive(Debug, Clone, PartialEq)]
enum ProjectionMode {
    /// Every expression is a column reference
    Columns(Vec<usize>),
    /// Every expression is a parameter reference
    Parameters(Vec<usize>),
    Expressions,
}

#[derive(Debug)]
pub struct ProjectionOperator {
    inputs: Vec<usize>,
    exprs: Vec<Expression>,
    mode: ProjectionMode,
    output_schema: Arc<TupleSchema>,
    output: Option<TempTable>,
}

impl ProjectionOperator {
    /// Projection over the output of chain position `input`
    pub fn new(input: usize, exprs: Vec<Expression>) -> Self {
        Self::build(vec![input], exprs)
    }

    /// Projection evaluated inside another operator (no input of its own)
    pub fn inline(exprs: Vec<Expression>) -> Self {
        Self::build(Vec::new(), exprs)
    }

    fn build(inputs: Vec<usize>, exprs: Vec<Expression>) -> Self {
        let columns: Option<Vec<usize>> = exprs.iter().map(Expression::as_column).collect();
        let parameters: Option<Vec<usize>> = exprs.iter().map(Expression::as_parameter).collect();
        let mode = match (columns, parameters) {
            (Some(columns), _) if !columns.is_empty() => ProjectionMode::Columns(columns),
            (_, Some(parameters)) if !parameters.is_empty() => ProjectionMode::Parameters(parameters),
            _ => ProjectionMode::Expressions,
        };
        let output_schema = Arc::new(schema_from_expressions(&exprs));
        Self {
            inputs,
            exprs,
            mode,
            output_schema,
            output: None,
        }
    }

    pub fn output_schema(&self) -> &Arc<TupleSchema> {
        &self.output_schema
    }

    /// Builds the projected row for one input row
    pub fn project_row(&self, row: &Tuple, params: &ParameterSet) -> ExecutorResult<Tuple> {
        let values = match &self.mode {
            ProjectionMode::Columns(columns) => columns
                .iter()
                .map(|&index| {
                    row.get(index).cloned().ok_or_else(|| {
                        ExecutorError::execution_failed(format!(
                            "projection column {} out of range for width {}",
                            index,
                            row.len()
                        ))
                    })
                })
                .collect::<ExecutorResult<Vec<_>>>()?,
            _ => self
                .exprs
                .iter()
                .map(|expr| expr.eval(Some(row), params))
                .collect::<Result<Vec<_>, _>>()?,
        };
        Ok(Tuple::new(values))
    }

    fn parameter_row(&self, params: &ParameterSet) -> ExecutorResult<Option<Tuple>> {
        match &self.mode {
            ProjectionMode::Parameters(_) => {
                let values = self
                    .exprs
                    .iter()
                    .map(|expr| expr.eval(None, params))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Some(Tuple::new(values)))
            }
            _ => Ok(None),
        }
    }
}

impl Operator for ProjectionOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Projection
    }

    fn input_indices(&self) -> &[usize] {
        &self.inputs
    }

    fn init(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        if self.exprs.is_empty() {
            return Err(ExecutorError::configuration_invalid("projection without output columns"));
        }
        self.output = Some(TempTable::new("projection", Arc::clone(&self.output_schema), ctx.arena()));
        Ok(())
    }

    fn execute(
        &mut self,
        _ctx: &ExecutionContext,
        params: &ParameterSet,
        inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<()> {
        let input = single_input(inputs, self.kind())?;
        let parameter_row = self.parameter_row(params)?;
        // Input rows are released as they are consumed.
        let rows = input.take_rows();
        let mut projected = Vec::with_capacity(rows.len());
        for row in &rows {
            projected.push(match &parameter_row {
                Some(fixed) => fixed.clone(),
                None => self.project_row(row, params)?,
            });
        }
        let output = output_mut(&mut self.output, OperatorKind::Projection)?;
        for row in projected {
            output.insert_temp_tuple(row)?;
        }
        Ok(())
    }

    fn output_table(&self) -> Option<&TempTable> {
        self.output.as_ref()
    }

    fn output_table_mut(&mut self) -> Option<&mut TempTable> {
        self.output.as_mut()
    }
}
