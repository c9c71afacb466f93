//! Sequential scan over a persistent table

use std::sync::Arc;

use crate::context::ExecutionContext;
use crate::executor::{ExecutorError, ExecutorResult, Operator, OperatorKind};
use crate::expr::Expression;
use crate::storage::{TableHandle, TempTable};
use crate::types::{ParameterSet, Tuple, TupleSchema, Value};

use super::output_mut;
use super::projection::ProjectionOperator;

/// Copies the rows of a persistent table that pass an optional predicate,
/// optionally through an inline projection
#[derive(Debug)]
pub struct SeqScanOperator {
    table: TableHandle,
    predicate: Option<Expression>,
    projection: Option<ProjectionOperator>,
    output: Option<TempTable>,
}

impl SeqScanOperator {
    pub fn new(table: TableHandle) -> Self {
        Self {
            table,
            predicate: None,
            projection: None,
            output: None,
        }
    }

    /// Keeps only rows for which `predicate` is TRUE
    pub fn with_predicate(mut self, predicate: Expression) -> Self {
        self.predicate = Some(predicate);
        self
    }

    pub fn with_inline_projection(mut self, projection: ProjectionOperator) -> Self {
        self.projection = Some(projection);
        self
    }

    fn output_schema(&self) -> Arc<TupleSchema> {
        match &self.projection {
            Some(projection) => Arc::clone(projection.output_schema()),
            None => Arc::clone(self.table.schema()),
        }
    }

    fn passes(&self, row: &Tuple, params: &ParameterSet) -> ExecutorResult<bool> {
        match &self.predicate {
            None => Ok(true),
            Some(predicate) => match predicate.eval(Some(row), params)? {
                Value::Boolean(pass) => Ok(pass),
                Value::Null => Ok(false),
                other => Err(ExecutorError::execution_failed(format!(
                    "scan predicate on {} produced non-boolean {}",
                    self.table.name(),
                    other
                ))),
            },
        }
    }
}

impl Operator for SeqScanOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::SeqScan
    }

    fn init(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        if let Some(projection) = self.projection.as_mut() {
            projection.init(ctx)?;
        }
        let name = format!("scan:{}", self.table.name());
        self.output = Some(TempTable::new(name, self.output_schema(), ctx.arena()));
        Ok(())
    }

    fn execute(
        &mut self,
        _ctx: &ExecutionContext,
        params: &ParameterSet,
        _inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<()> {
        let mut selected = Vec::new();
        let mut failure = None;
        self.table.scan(&mut |row| {
            let outcome = self.passes(row, params).and_then(|pass| match (pass, &self.projection) {
                (false, _) => Ok(None),
                (true, Some(projection)) => projection.project_row(row, params).map(Some),
                (true, None) => Ok(Some(row.clone())),
            });
            match outcome {
                Ok(Some(tuple)) => {
                    selected.push(tuple);
                    true
                }
                Ok(None) => true,
                Err(err) => {
                    failure = Some(err);
                    false
                }
            }
        });
        if let Some(err) = failure {
            return Err(err);
        }

        let output = output_mut(&mut self.output, OperatorKind::SeqScan)?;
        for tuple in selected {
            output.insert_temp_tuple(tuple)?;
        }
        Ok(())
    }

    fn output_table(&self) -> Option<&TempTable> {
        self.output.as_ref()
    }

    fn output_table_mut(&mut self) -> Option<&mut TempTable> {
        self.output.as_mut()
    }

    fn inline_operators_mut(&mut self) -> Vec<&mut dyn Operator> {
        self.projection
            .iter_mut()
            .map(|projection| projection as &mut dyn Operator)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::{EngineRegistry, PartitionEngine};
    use crate::storage::{MemoryTable, PersistentTable};
    use crate::types::{TupleSchema, ValueType};

    fn table() -> TableHandle {
        let table = MemoryTable::partitioned(
            "t",
            TupleSchema::of_types(&[ValueType::BigInt, ValueType::BigInt]),
        );
        for (a, b) in [(1, 10), (2, 20), (3, 30)] {
            table
                .insert_tuple(Tuple::new(vec![Value::BigInt(a), Value::BigInt(b)]))
                .unwrap();
        }
        table.into_handle()
    }

    #[test]
    fn test_scan_with_predicate_and_projection() {
        let registry = EngineRegistry::new(EngineConfig::default());
        let engine = PartitionEngine::install(&registry, 0, 0).unwrap();
        let ctx = engine.context();

        let predicate = Expression::IsNull(Box::new(Expression::column(0, ValueType::BigInt)));
        let mut none = SeqScanOperator::new(table()).with_predicate(predicate);
        none.init(ctx).unwrap();
        none.execute(ctx, &ParameterSet::empty(), &mut []).unwrap();
        assert!(none.output_table().unwrap().is_empty());

        let mut scan = SeqScanOperator::new(table())
            .with_inline_projection(ProjectionOperator::inline(vec![Expression::column(1, ValueType::BigInt)]));
        scan.init(ctx).unwrap();
        scan.execute(ctx, &ParameterSet::empty(), &mut []).unwrap();
        let out = scan.output_table().unwrap();
        assert_eq!(out.schema().column_count(), 1);
        assert_eq!(out.row(2).unwrap(), &Tuple::new(vec![Value::BigInt(30)]));
        assert_eq!(scan.inline_operators_mut().len(), 1);
    }
}
