//! Executor-chain runner
//!
//! Runs the operators of one fragment (or subquery) in order. Every
//! operator's inputs appear earlier in the chain; this is checked once, when
//! the chain is built, not on every run.
//!
//! On success the last operator's output table is returned and cleaning it
//! up is the caller's job. On failure the runner empties every output table
//! and memory pool of the chain, inline operators included, before returning
//! the error, so a failed fragment leaves the arena as it found it.

use crate::context::{BarrierRole, ExecutionContext, PartitionEngine};
use crate::observability::{log_event_with_fields, Event};
use crate::storage::TempTable;
use crate::types::ParameterSet;

use super::errors::{ExecutorError, ExecutorResult};
use super::operator::Operator;

/// Ordered list of operators for one subquery
pub struct ExecutorChain {
    subquery_id: i32,
    operators: Vec<Box<dyn Operator>>,
    initialized: bool,
}

impl std::fmt::Debug for ExecutorChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kinds: Vec<_> = self.operators.iter().map(|op| op.kind()).collect();
        f.debug_struct("ExecutorChain")
            .field("subquery_id", &self.subquery_id)
            .field("operators", &kinds)
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl ExecutorChain {
    /// Builds a chain, checking that it is non-empty and that every input
    /// reference points at an earlier operator, at most once per consumer
    pub fn new(subquery_id: i32, operators: Vec<Box<dyn Operator>>) -> ExecutorResult<Self> {
        if operators.is_empty() {
            return Err(ExecutorError::configuration_invalid(format!(
                "subquery {} has no operators",
                subquery_id
            )));
        }
        for (index, op) in operators.iter().enumerate() {
            let inputs = op.input_indices();
            for (n, &input) in inputs.iter().enumerate() {
                if input >= index {
                    return Err(ExecutorError::configuration_invalid(format!(
                        "{} at position {} reads operator {} which does not precede it",
                        op.kind(),
                        index,
                        input
                    ))
                    .with_operator(index));
                }
                if inputs[..n].contains(&input) {
                    return Err(ExecutorError::configuration_invalid(format!(
                        "{} at position {} reads operator {} twice",
                        op.kind(),
                        index,
                        input
                    ))
                    .with_operator(index));
                }
            }
        }
        Ok(Self {
            subquery_id,
            operators,
            initialized: false,
        })
    }

    pub fn subquery_id(&self) -> i32 {
        self.subquery_id
    }

    pub fn len(&self) -> usize {
        self.operators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operators.is_empty()
    }

    pub fn operator(&self, index: usize) -> Option<&dyn Operator> {
        self.operators.get(index).map(|op| op.as_ref())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Initializes every operator against the partition's context
    pub fn init(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        for (index, op) in self.operators.iter_mut().enumerate() {
            op.init(ctx)
                .map_err(|e| e.with_operator(index).with_subquery(self.subquery_id))?;
        }
        self.initialized = true;
        Ok(())
    }

    /// Runs the chain and returns the last operator's output
    pub fn run(&mut self, engine: &PartitionEngine, params: &ParameterSet) -> ExecutorResult<&TempTable> {
        if !self.initialized {
            self.init(engine.context())?;
        }
        for index in 0..self.operators.len() {
            if let Err(err) = self.run_operator(engine, index, params) {
                let err = err.with_operator(index).with_subquery(self.subquery_id);
                self.cleanup_after_failure();
                log_event_with_fields(
                    Event::OperatorFailed,
                    &[
                        ("code", err.code().code()),
                        ("operator", &index.to_string()),
                        ("kind", self.operators[index].kind().as_str()),
                        ("partition", &engine.context().partition_id().to_string()),
                        ("reason", err.message()),
                        ("subquery", &self.subquery_id.to_string()),
                    ],
                );
                return Err(err);
            }
            engine.context().metrics().increment_operators_executed();
        }
        self.output_table().ok_or_else(|| {
            ExecutorError::execution_failed(format!(
                "last operator of subquery {} has no output table",
                self.subquery_id
            ))
        })
    }

    fn run_operator(&mut self, engine: &PartitionEngine, index: usize, params: &ParameterSet) -> ExecutorResult<()> {
        let ctx = engine.context();
        let (before, rest) = self.operators.split_at_mut(index);
        let op = &mut rest[0];

        let wanted = op.input_indices().to_vec();
        let mut available: Vec<Option<&mut TempTable>> =
            before.iter_mut().map(|prior| prior.output_table_mut()).collect();
        let mut inputs = Vec::with_capacity(wanted.len());
        for input in wanted {
            let table = available
                .get_mut(input)
                .and_then(Option::take)
                .ok_or_else(|| {
                    ExecutorError::execution_failed(format!(
                        "input operator {} has no output table",
                        input
                    ))
                })?;
            inputs.push(table);
        }

        if op.replicated_target().is_none() {
            return op.execute(ctx, params, &mut inputs);
        }

        let registry = engine.registry();
        let (role, modified) = registry
            .run_replicated_write(|mp_ctx| op.execute_replicated(mp_ctx, params, &mut inputs))?;
        match role {
            BarrierRole::Designated => Ok(()),
            BarrierRole::Follower => op.complete_replicated_write(ctx, modified, &mut inputs),
        }
    }

    /// Output of the last operator
    pub fn output_table(&self) -> Option<&TempTable> {
        self.operators.last().and_then(|op| op.output_table())
    }

    /// Empties every operator's output table
    pub fn cleanup_temp_output_tables(&mut self) {
        for op in self.operators.iter_mut() {
            op.cleanup_temp_output_table();
        }
    }

    fn cleanup_after_failure(&mut self) {
        for op in self.operators.iter_mut() {
            op.cleanup_temp_output_table();
            op.cleanup_memory_pool();
            for inline in op.inline_operators_mut() {
                inline.cleanup_temp_output_table();
                inline.cleanup_memory_pool();
            }
        }
    }

    pub fn all_output_temp_tables_are_empty(&self) -> bool {
        self.operators.iter().all(|op| op.output_temp_table_is_empty())
    }
}
