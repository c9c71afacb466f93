//! Executor chain and plan fragment tests
//!
//! Covers operator wiring through a chain, subquery chains, failure cleanup
//! (no temp memory survives a failed fragment) and repeatable results.

use std::sync::Arc;

use aerodb_exec::config::EngineConfig;
use aerodb_exec::context::{EngineRegistry, PartitionEngine};
use aerodb_exec::executor::{
    ExecutorChain, ExecutorErrorCode, FragmentPlan, Operator, OperatorKind, TOP_LEVEL_SUBQUERY,
};
use aerodb_exec::expr::{ArithmeticOp, Expression};
use aerodb_exec::operators::{
    MaterializeOperator, ProjectionOperator, SeqScanOperator, SwapTablesOperator,
};
use aerodb_exec::storage::{MemoryTable, PersistentTable, TableHandle};
use aerodb_exec::types::{ColumnInfo, ParameterSet, Tuple, TupleSchema, Value, ValueType};

fn engine_with(config: EngineConfig) -> PartitionEngine {
    let registry = EngineRegistry::new(config);
    PartitionEngine::install(&registry, 0, 0).unwrap()
}

fn engine() -> PartitionEngine {
    engine_with(EngineConfig::default())
}

fn accounts(rows: &[(i64, &str)]) -> TableHandle {
    let table = MemoryTable::partitioned(
        "accounts",
        TupleSchema::new(vec![
            ColumnInfo::not_null(ValueType::BigInt),
            ColumnInfo::nullable(ValueType::Varchar),
        ]),
    );
    for (id, owner) in rows {
        table
            .insert_tuple(Tuple::new(vec![Value::BigInt(*id), Value::Varchar(owner.to_string())]))
            .unwrap();
    }
    table.into_handle()
}

fn id_column() -> Expression {
    Expression::column(0, ValueType::BigInt)
}

fn plus(expr: Expression, value: i64) -> Expression {
    Expression::arithmetic(ArithmeticOp::Add, expr, Expression::constant(Value::BigInt(value)))
}

fn chain(subquery_id: i32, operators: Vec<Box<dyn Operator>>) -> ExecutorChain {
    ExecutorChain::new(subquery_id, operators).unwrap()
}

fn ids(rows: &[Tuple]) -> Vec<i64> {
    rows.iter()
        .map(|row| row.get(0).and_then(Value::as_i64).unwrap())
        .collect()
}

// =============================================================================
// CHAIN CONSTRUCTION
// =============================================================================

#[test]
fn test_chain_rejects_forward_references() {
    let table = accounts(&[]);
    let err = ExecutorChain::new(
        0,
        vec![
            Box::new(ProjectionOperator::new(1, vec![id_column()])),
            Box::new(SeqScanOperator::new(table)),
        ],
    )
    .unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::AeroConfigurationInvalid);
}

#[test]
fn test_chain_rejects_empty_operator_list() {
    let err = ExecutorChain::new(0, Vec::new()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::AeroConfigurationInvalid);
}

#[test]
fn test_plan_requires_top_level_chain() {
    let err = FragmentPlan::new(chain(3, vec![Box::new(MaterializeOperator::new(vec![
        Expression::constant(Value::BigInt(1)),
    ]))]))
    .unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::AeroConfigurationInvalid);
}

// =============================================================================
// EXECUTION
// =============================================================================

#[test]
fn test_scan_filter_project() {
    let engine = engine();
    let table = accounts(&[(1, "ann"), (2, "bob"), (3, "cy")]);
    let mut plan = FragmentPlan::new(chain(
        TOP_LEVEL_SUBQUERY,
        vec![
            Box::new(SeqScanOperator::new(table)),
            Box::new(ProjectionOperator::new(0, vec![plus(id_column(), 100)])),
        ],
    ))
    .unwrap();
    let result = plan.execute(&engine, &ParameterSet::empty()).unwrap();

    assert_eq!(ids(&result.rows), vec![101, 102, 103]);
    assert_eq!(result.tuples_modified, 0);
    assert!(plan.all_output_temp_tables_are_empty());
    assert_eq!(engine.arena().used(), 0);
}

#[test]
fn test_scan_predicate_drops_rows() {
    let engine = engine();
    let table = MemoryTable::partitioned(
        "contacts",
        TupleSchema::new(vec![
            ColumnInfo::not_null(ValueType::BigInt),
            ColumnInfo::nullable(ValueType::Varchar),
        ]),
    );
    table
        .insert_tuple(Tuple::new(vec![Value::BigInt(1), Value::Null]))
        .unwrap();
    table
        .insert_tuple(Tuple::new(vec![Value::BigInt(2), Value::Varchar("x".into())]))
        .unwrap();

    let scan = SeqScanOperator::new(table.into_handle())
        .with_predicate(Expression::is_null(Expression::column(1, ValueType::Varchar)))
        .with_inline_projection(ProjectionOperator::inline(vec![id_column()]));
    let mut plan = FragmentPlan::new(chain(0, vec![Box::new(scan)])).unwrap();
    let result = plan.execute(&engine, &ParameterSet::empty()).unwrap();

    assert_eq!(ids(&result.rows), vec![1]);
    assert_eq!(result.schema.column_count(), 1);
}

#[test]
fn test_parameters_flow_into_materialize() {
    let engine = engine();
    let mut plan = FragmentPlan::new(chain(
        0,
        vec![Box::new(MaterializeOperator::new(vec![
            Expression::parameter(1, ValueType::BigInt),
            Expression::parameter(0, ValueType::Varchar),
        ]))],
    ))
    .unwrap();
    let params = ParameterSet::new(vec![Value::Varchar("p".into()), Value::BigInt(42)]);
    let result = plan.execute(&engine, &params).unwrap();
    assert_eq!(
        result.rows,
        vec![Tuple::new(vec![Value::BigInt(42), Value::Varchar("p".into())])]
    );
}

#[test]
fn test_subquery_runs_independently() {
    let engine = engine();
    let table = accounts(&[(7, "g")]);
    let mut plan = FragmentPlan::new(chain(
        0,
        vec![Box::new(MaterializeOperator::new(vec![Expression::constant(
            Value::BigInt(0),
        )]))],
    ))
    .unwrap()
    .with_subquery(chain(2, vec![Box::new(SeqScanOperator::new(table))]))
    .unwrap();
    assert_eq!(plan.subquery_ids(), vec![0, 2]);

    let output = plan.execute_subquery(&engine, 2, &ParameterSet::empty()).unwrap();
    assert_eq!(ids(output.rows()), vec![7]);
    assert_eq!(plan.subquery_output_table(2).map(|t| t.active_tuple_count()), Some(1));

    // executing the fragment empties every chain, subqueries included
    plan.execute(&engine, &ParameterSet::empty()).unwrap();
    assert!(plan.all_output_temp_tables_are_empty());

    let err = plan
        .execute_subquery(&engine, 9, &ParameterSet::empty())
        .unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::AeroExecutionFailed);
}

#[test]
fn test_swap_tables_reports_touched_rows() {
    let engine = engine();
    let left = accounts(&[(1, "a"), (2, "b")]);
    let right = accounts(&[(3, "c")]);
    let mut plan = FragmentPlan::new(chain(
        0,
        vec![Box::new(SwapTablesOperator::new(Arc::clone(&left), Arc::clone(&right)))],
    ))
    .unwrap();

    let result = plan.execute(&engine, &ParameterSet::empty()).unwrap();
    assert_eq!(ids(&result.rows), vec![3]);
    assert_eq!(result.tuples_modified, 3);
    assert_eq!(left.visible_tuple_count(), 1);
    assert_eq!(right.visible_tuple_count(), 2);
}

#[test]
fn test_swap_table_with_itself_keeps_rows() {
    let engine = engine();
    let table = accounts(&[(1, "a"), (2, "b")]);
    let mut plan = FragmentPlan::new(chain(
        0,
        vec![Box::new(SwapTablesOperator::new(Arc::clone(&table), Arc::clone(&table)))],
    ))
    .unwrap();

    let err = plan.execute(&engine, &ParameterSet::empty()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::AeroExecutionFailed);
    assert_eq!(err.operator_index(), Some(0));
    assert_eq!(table.visible_tuple_count(), 2);
    assert_eq!(engine.context().tuples_modified(), 0);
    assert!(plan.all_output_temp_tables_are_empty());
}

#[test]
fn test_repeat_execution_is_identical() {
    let engine = engine();
    let table = accounts(&[(5, "e"), (6, "f")]);
    let mut plan = FragmentPlan::new(chain(
        0,
        vec![
            Box::new(SeqScanOperator::new(table)),
            Box::new(ProjectionOperator::new(0, vec![Expression::column(1, ValueType::Varchar), id_column()])),
        ],
    ))
    .unwrap();

    let first = plan.execute(&engine, &ParameterSet::empty()).unwrap();
    let second = plan.execute(&engine, &ParameterSet::empty()).unwrap();
    assert_eq!(first.checksum, second.checksum);
    assert_eq!(first.rows, second.rows);
    assert_ne!(first.execution_id, second.execution_id);
}

// =============================================================================
// FAILURE CLEANUP
// =============================================================================

#[test]
fn test_overflow_mid_chain_releases_temp_memory() {
    let engine = engine();
    let table = accounts(&[(1, "a"), (i64::MAX, "z")]);
    let baseline = engine.arena().used();
    let mut plan = FragmentPlan::new(chain(
        0,
        vec![
            Box::new(SeqScanOperator::new(table)),
            Box::new(ProjectionOperator::new(0, vec![id_column()])),
            Box::new(ProjectionOperator::new(1, vec![plus(id_column(), 1)])),
            Box::new(ProjectionOperator::new(2, vec![id_column()])),
        ],
    ))
    .unwrap();

    let err = plan.execute(&engine, &ParameterSet::empty()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::AeroExecutionFailed);
    assert_eq!(err.operator_index(), Some(2));
    assert_eq!(err.subquery_id(), Some(0));
    assert!(plan.all_output_temp_tables_are_empty());
    assert_eq!(engine.arena().used(), baseline);
    assert_eq!(engine.registry().metrics().snapshot().fragments_failed, 1);
}

#[test]
fn test_temp_limit_failure_releases_temp_memory() {
    let engine = engine_with(EngineConfig {
        temp_table_memory_limit: 256,
        ..EngineConfig::default()
    });
    let rows: Vec<(i64, &str)> = (0..64).map(|id| (id, "a fairly long owner name")).collect();
    let table = accounts(&rows);
    let mut plan = FragmentPlan::new(chain(
        0,
        vec![
            Box::new(SeqScanOperator::new(table)),
            Box::new(ProjectionOperator::new(0, vec![id_column()])),
        ],
    ))
    .unwrap();

    let err = plan.execute(&engine, &ParameterSet::empty()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::AeroTempLimitExceeded);
    assert_eq!(err.operator_index(), Some(0));
    assert_eq!(engine.arena().used(), 0);
    assert!(plan.all_output_temp_tables_are_empty());
}

#[test]
fn test_plan_recovers_after_failure() {
    let engine = engine();
    let table = accounts(&[(1, "a")]);
    let mut plan = FragmentPlan::new(chain(
        0,
        vec![
            Box::new(SeqScanOperator::new(table)),
            Box::new(ProjectionOperator::new(0, vec![plus(id_column(), 1)])),
        ],
    ))
    .unwrap();

    let ok = plan.execute(&engine, &ParameterSet::empty()).unwrap();
    assert_eq!(ids(&ok.rows), vec![2]);

    let mut broken = FragmentPlan::new(chain(
        0,
        vec![Box::new(MaterializeOperator::new(vec![Expression::parameter(
            3,
            ValueType::BigInt,
        )]))],
    ))
    .unwrap();
    let err = broken.execute(&engine, &ParameterSet::empty()).unwrap_err();
    assert_eq!(err.operator_index(), Some(0));
    assert_eq!(engine.arena().used(), 0);

    let again = plan.execute(&engine, &ParameterSet::empty()).unwrap();
    assert_eq!(again.checksum, ok.checksum);
}

#[test]
fn test_materialize_rejects_column_references_at_init() {
    let engine = engine();
    let mut plan = FragmentPlan::new(chain(0, vec![Box::new(MaterializeOperator::new(vec![id_column()]))]))
        .unwrap();
    let err = plan.init(engine.context()).unwrap_err();
    assert_eq!(err.code(), ExecutorErrorCode::AeroConfigurationInvalid);
    assert_eq!(err.operator_index(), Some(0));
}

#[test]
fn test_chain_reports_operator_kinds() {
    let table = accounts(&[]);
    let chain = chain(
        0,
        vec![
            Box::new(SeqScanOperator::new(table)),
            Box::new(ProjectionOperator::new(0, vec![id_column()])),
        ],
    );
    assert_eq!(chain.len(), 2);
    assert_eq!(chain.operator(0).map(|op| op.kind()), Some(OperatorKind::SeqScan));
    assert_eq!(chain.operator(1).map(|op| op.kind()), Some(OperatorKind::Projection));
    assert!(!chain.is_initialized());
}
