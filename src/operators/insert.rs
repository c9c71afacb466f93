//! Insert into a persistent table
//!
//! Reports the number of inserted rows as a one-row BIGINT table. When the
//! target is replicated the chain runner routes the write through the host
//! barrier: one partition inserts, the others report its count.

use crate::context::ExecutionContext;
use crate::executor::{ExecutorResult, Operator, OperatorKind};
use crate::storage::{TableHandle, TempTable};
use crate::types::{ParameterSet, Tuple, Value};

use super::{modified_count_schema, output_mut, single_input, write_modified_count};

#[derive(Debug)]
pub struct InsertOperator {
    inputs: [usize; 1],
    target: TableHandle,
    output: Option<TempTable>,
}

impl InsertOperator {
    /// Inserts the rows produced by chain position `input` into `target`
    pub fn new(input: usize, target: TableHandle) -> Self {
        Self {
            inputs: [input],
            target,
            output: None,
        }
    }

    pub fn target(&self) -> &TableHandle {
        &self.target
    }

    /// Casts each value to the target column type, then inserts
    fn insert_rows(&self, rows: Vec<Tuple>) -> ExecutorResult<i64> {
        let schema = self.target.schema();
        let mut inserted = 0i64;
        for row in rows {
            let values = row
                .into_values()
                .into_iter()
                .enumerate()
                .map(|(index, value)| match schema.column_type(index) {
                    Some(target) if !value.is_null() && value.value_type() != Some(target) => {
                        value.cast_as(target)
                    }
                    _ => Ok(value),
                })
                .collect::<Result<Vec<Value>, _>>()?;
            self.target.insert_tuple(Tuple::new(values))?;
            inserted += 1;
        }
        Ok(inserted)
    }

    fn apply(&mut self, ctx: &ExecutionContext, inputs: &mut [&mut TempTable]) -> ExecutorResult<i64> {
        let rows = single_input(inputs, OperatorKind::Insert)?.take_rows();
        let inserted = self.insert_rows(rows)?;
        ctx.add_tuples_modified(inserted);
        write_modified_count(output_mut(&mut self.output, OperatorKind::Insert)?, inserted)?;
        Ok(inserted)
    }
}

impl Operator for InsertOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::Insert
    }

    fn input_indices(&self) -> &[usize] {
        &self.inputs
    }

    fn init(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        let name = format!("insert:{}", self.target.name());
        self.output = Some(TempTable::new(name, modified_count_schema(), ctx.arena()));
        Ok(())
    }

    fn execute(
        &mut self,
        ctx: &ExecutionContext,
        _params: &ParameterSet,
        inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<()> {
        self.apply(ctx, inputs).map(|_| ())
    }

    fn output_table(&self) -> Option<&TempTable> {
        self.output.as_ref()
    }

    fn output_table_mut(&mut self) -> Option<&mut TempTable> {
        self.output.as_mut()
    }

    fn replicated_target(&self) -> Option<&TableHandle> {
        self.target.is_replicated().then_some(&self.target)
    }

    fn execute_replicated(
        &mut self,
        ctx: &ExecutionContext,
        _params: &ParameterSet,
        inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<i64> {
        self.apply(ctx, inputs)
    }

    fn complete_replicated_write(
        &mut self,
        _ctx: &ExecutionContext,
        modified: i64,
        inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<()> {
        single_input(inputs, OperatorKind::Insert)?.delete_all_temp_tuples();
        write_modified_count(output_mut(&mut self.output, OperatorKind::Insert)?, modified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::context::{EngineRegistry, PartitionEngine};
    use crate::executor::ExecutorErrorCode;
    use crate::storage::MemoryTable;
    use crate::types::{ColumnInfo, TupleSchema, ValueType};
    use std::sync::Arc;

    fn target() -> TableHandle {
        MemoryTable::partitioned(
            "people",
            TupleSchema::new(vec![
                ColumnInfo::not_null(ValueType::BigInt),
                ColumnInfo::nullable(ValueType::Varchar),
            ]),
        )
        .into_handle()
    }

    fn input(engine: &PartitionEngine, rows: Vec<Vec<Value>>) -> TempTable {
        let schema = Arc::new(TupleSchema::of_types(&[ValueType::Integer, ValueType::Varchar]));
        let mut table = TempTable::new("src", schema, engine.arena());
        for values in rows {
            table.insert_temp_tuple(Tuple::new(values)).unwrap();
        }
        table
    }

    #[test]
    fn test_insert_casts_and_counts() {
        let registry = EngineRegistry::new(EngineConfig::default());
        let engine = PartitionEngine::install(&registry, 0, 0).unwrap();
        let target = target();
        let mut insert = InsertOperator::new(0, Arc::clone(&target));
        insert.init(engine.context()).unwrap();
        assert!(insert.replicated_target().is_none());

        let mut src = input(
            &engine,
            vec![
                vec![Value::Integer(1), Value::Varchar("ada".into())],
                vec![Value::Integer(2), Value::Null],
            ],
        );
        insert
            .execute(engine.context(), &ParameterSet::empty(), &mut [&mut src])
            .unwrap();

        assert!(src.is_empty());
        assert_eq!(target.visible_tuple_count(), 2);
        assert_eq!(
            insert.output_table().unwrap().rows(),
            &[Tuple::new(vec![Value::BigInt(2)])]
        );
        assert_eq!(engine.context().tuples_modified(), 2);
    }

    #[test]
    fn test_insert_null_key_violates_constraint() {
        let registry = EngineRegistry::new(EngineConfig::default());
        let engine = PartitionEngine::install(&registry, 0, 0).unwrap();
        let mut insert = InsertOperator::new(0, target());
        insert.init(engine.context()).unwrap();
        let mut src = input(&engine, vec![vec![Value::Null, Value::Null]]);
        let err = insert
            .execute(engine.context(), &ParameterSet::empty(), &mut [&mut src])
            .unwrap_err();
        assert_eq!(err.code(), ExecutorErrorCode::AeroConstraintViolation);
    }
}
