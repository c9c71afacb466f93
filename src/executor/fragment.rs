//! Plan fragments: the top-level chain plus its subquery chains

use std::collections::BTreeMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::context::{ExecutionContext, PartitionEngine};
use crate::observability::ObservationScope;
use crate::storage::TempTable;
use crate::types::{ParameterSet, Tuple, TupleSchema};

use super::chain::ExecutorChain;
use super::errors::{ExecutorError, ExecutorResult};

/// Subquery id of the top-level chain
pub const TOP_LEVEL_SUBQUERY: i32 = 0;

/// Rows a fragment produced, copied out of the engine's temp storage
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentResult {
    /// Identifies this execution in the fragment's log records
    pub execution_id: Uuid,
    pub schema: Arc<TupleSchema>,
    pub rows: Vec<Tuple>,
    /// CRC32 of the output rows
    pub checksum: u32,
    /// Rows modified on this partition's own context
    pub tuples_modified: i64,
}

/// Executor chains of one plan fragment, keyed by subquery id
#[derive(Debug)]
pub struct FragmentPlan {
    chains: BTreeMap<i32, ExecutorChain>,
}

impl FragmentPlan {
    /// Plan whose top-level chain is `top`; its subquery id is forced to 0
    pub fn new(top: ExecutorChain) -> ExecutorResult<Self> {
        if top.subquery_id() != TOP_LEVEL_SUBQUERY {
            return Err(ExecutorError::configuration_invalid(format!(
                "top-level chain must be subquery {}, got {}",
                TOP_LEVEL_SUBQUERY,
                top.subquery_id()
            )));
        }
        let mut chains = BTreeMap::new();
        chains.insert(TOP_LEVEL_SUBQUERY, top);
        Ok(Self { chains })
    }

    /// Adds a subquery chain
    pub fn with_subquery(mut self, chain: ExecutorChain) -> ExecutorResult<Self> {
        let id = chain.subquery_id();
        if self.chains.contains_key(&id) {
            return Err(ExecutorError::configuration_invalid(format!(
                "subquery {} defined twice",
                id
            )));
        }
        self.chains.insert(id, chain);
        Ok(self)
    }

    pub fn subquery_ids(&self) -> Vec<i32> {
        self.chains.keys().copied().collect()
    }

    /// Initializes every chain; configuration errors surface here
    pub fn init(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        for chain in self.chains.values_mut() {
            chain.init(ctx)?;
        }
        Ok(())
    }

    /// Runs the top-level chain and copies its output.
    ///
    /// Every temp table of the plan is emptied before returning, whether the
    /// fragment succeeded or not.
    pub fn execute(&mut self, engine: &PartitionEngine, params: &ParameterSet) -> ExecutorResult<FragmentResult> {
        let ctx = engine.context();
        let partition = ctx.partition_id().to_string();
        let txn = ctx.txn_id().to_string();
        let execution_id = Uuid::new_v4();
        let execution = execution_id.to_string();
        let scope = ObservationScope::with_fields(
            "FRAGMENT",
            &[("execution_id", &execution), ("partition", &partition), ("txn", &txn)],
        );
        ctx.take_tuples_modified();

        let outcome = self.execute_subquery(engine, TOP_LEVEL_SUBQUERY, params).map(|output| {
            (output.schema().clone(), output.rows().to_vec(), output.checksum())
        });
        self.cleanup_all_executors();

        match outcome {
            Ok((schema, rows, checksum)) => {
                ctx.metrics().increment_fragments_executed();
                scope.complete_with_fields(&[("rows", &rows.len().to_string())]);
                Ok(FragmentResult {
                    execution_id,
                    schema,
                    rows,
                    checksum,
                    tuples_modified: ctx.take_tuples_modified(),
                })
            }
            Err(err) => {
                ctx.metrics().increment_fragments_failed();
                scope.fail(&err.to_string());
                Err(err)
            }
        }
    }

    /// Runs one subquery chain, leaving its output in place
    pub fn execute_subquery(
        &mut self,
        engine: &PartitionEngine,
        subquery_id: i32,
        params: &ParameterSet,
    ) -> ExecutorResult<&TempTable> {
        let chain = self.chains.get_mut(&subquery_id).ok_or_else(|| {
            ExecutorError::execution_failed(format!("unknown subquery {}", subquery_id))
        })?;
        chain.run(engine, params)
    }

    /// Output left by the last run of a subquery
    pub fn subquery_output_table(&self, subquery_id: i32) -> Option<&TempTable> {
        self.chains.get(&subquery_id).and_then(|chain| chain.output_table())
    }

    /// Empties the output tables of every chain
    pub fn cleanup_all_executors(&mut self) {
        for chain in self.chains.values_mut() {
            chain.cleanup_temp_output_tables();
        }
    }

    pub fn all_output_temp_tables_are_empty(&self) -> bool {
        self.chains
            .values()
            .all(|chain| chain.all_output_temp_tables_are_empty())
    }
}
