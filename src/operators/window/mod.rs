//! Window-function operator
//!
//! Computes RANK, DENSE_RANK and COUNT over an input already ordered by the
//! partition-by keys and then the order-by keys. The input is walked once by
//! four cursors (see [`TableWindow`]): the leading cursor finds the end of a
//! partition, the order-by cursor the end of each peer group inside it, and
//! the middle cursor emits the rows of each closed peer group in input order.
//! Nothing is buffered beyond the current peer group's aggregate state.

mod aggregate;
mod keys;
mod table_window;

pub use aggregate::{WindowAggregate, WindowFunctionKind};
pub use keys::KeyBuffer;
pub use table_window::TableWindow;

use std::cmp::Ordering;
use std::sync::Arc;

use crate::arena::ScratchPool;
use crate::context::ExecutionContext;
use crate::executor::{ExecutorError, ExecutorResult, Operator, OperatorKind};
use crate::expr::{schema_from_expressions, Expression};
use crate::observability::{log_event_with_fields, Event};
use crate::storage::TempTable;
use crate::types::{ColumnInfo, ParameterSet, Tuple, TupleSchema, Value, ValueType};

use super::{output_mut, single_input};

/// One requested window aggregate
#[derive(Debug, Clone, PartialEq)]
pub struct WindowAggregateSpec {
    pub kind: WindowFunctionKind,
    pub arguments: Vec<Expression>,
    pub distinct: bool,
    /// Type of the aggregate's output column
    pub output_type: ValueType,
}

impl WindowAggregateSpec {
    pub fn rank() -> Self {
        Self::of(WindowFunctionKind::Rank, Vec::new())
    }

    pub fn dense_rank() -> Self {
        Self::of(WindowFunctionKind::DenseRank, Vec::new())
    }

    /// COUNT over one argument; rows where it is NULL are not counted
    pub fn count(argument: Expression) -> Self {
        Self::of(WindowFunctionKind::Count, vec![argument])
    }

    /// COUNT(*)
    pub fn count_star() -> Self {
        Self::of(WindowFunctionKind::Count, Vec::new())
    }

    pub fn of(kind: WindowFunctionKind, arguments: Vec<Expression>) -> Self {
        Self {
            kind,
            arguments,
            distinct: false,
            output_type: ValueType::BigInt,
        }
    }

    fn validate(&self) -> ExecutorResult<()> {
        let unsupported = |reason: String| Err(ExecutorError::configuration_invalid(reason));
        match self.kind {
            kind if kind.is_ranking() && !self.arguments.is_empty() => {
                unsupported(format!("{} takes no arguments", kind))
            }
            WindowFunctionKind::Count if self.distinct => {
                unsupported("COUNT(DISTINCT) is not supported as a window function".into())
            }
            WindowFunctionKind::Count if self.arguments.len() > 1 => {
                unsupported(format!("COUNT takes at most one argument, got {}", self.arguments.len()))
            }
            WindowFunctionKind::Rank | WindowFunctionKind::DenseRank | WindowFunctionKind::Count => {
                if self.output_type.is_integral() {
                    Ok(())
                } else {
                    unsupported(format!("{} cannot produce {}", self.kind, self.output_type))
                }
            }
            other => unsupported(format!("unsupported window aggregate {}", other)),
        }
    }
}

/// Counters of the most recent scan
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowScanStats {
    pub partitions: u64,
    pub peer_groups: u64,
    pub rows_emitted: u64,
}

/// What a window operator computes, fixed at plan time
#[derive(Debug)]
struct WindowConfig {
    partition_by: Vec<Expression>,
    order_by: Vec<Expression>,
    aggregates: Vec<WindowAggregateSpec>,
    pass_through: Vec<Expression>,
}

#[derive(Debug)]
pub struct WindowFunctionOperator {
    inputs: [usize; 1],
    config: WindowConfig,
    output_schema: Arc<TupleSchema>,
    partition_key_schema: Option<TupleSchema>,
    order_key_schema: Option<TupleSchema>,
    output: Option<TempTable>,
    pool: ScratchPool<WindowAggregate>,
    partition_keys: KeyBuffer,
    order_keys: KeyBuffer,
    last_scan: WindowScanStats,
}

impl WindowFunctionOperator {
    /// Output rows hold one column per aggregate, then one per pass-through
    /// expression evaluated over the input row.
    pub fn new(
        input: usize,
        partition_by: Vec<Expression>,
        order_by: Vec<Expression>,
        aggregates: Vec<WindowAggregateSpec>,
        pass_through: Vec<Expression>,
    ) -> Self {
        let mut columns: Vec<ColumnInfo> = aggregates
            .iter()
            .map(|agg| ColumnInfo::not_null(agg.output_type))
            .collect();
        columns.extend(schema_from_expressions(&pass_through).columns().iter().cloned());
        Self {
            inputs: [input],
            config: WindowConfig {
                partition_by,
                order_by,
                aggregates,
                pass_through,
            },
            output_schema: Arc::new(TupleSchema::new(columns)),
            partition_key_schema: None,
            order_key_schema: None,
            output: None,
            pool: ScratchPool::new(),
            partition_keys: KeyBuffer::new(),
            order_keys: KeyBuffer::new(),
            last_scan: WindowScanStats::default(),
        }
    }

    pub fn output_schema(&self) -> &Arc<TupleSchema> {
        &self.output_schema
    }

    pub fn last_scan_stats(&self) -> WindowScanStats {
        self.last_scan
    }

    /// Whether any scratch state outlived the last scan
    pub fn holds_scan_state(&self) -> bool {
        !self.pool.is_empty() || self.partition_keys.is_active() || self.order_keys.is_active()
    }

    fn allocate_aggregates(&mut self) -> ExecutorResult<()> {
        for spec in &self.config.aggregates {
            let agg = WindowAggregate::for_kind(spec.kind).ok_or_else(|| {
                ExecutorError::configuration_invalid(format!("unsupported window aggregate {}", spec.kind))
            })?;
            self.pool.allocate(agg, std::mem::size_of::<WindowAggregate>())?;
        }
        Ok(())
    }

    fn release_scan_state(&mut self) {
        self.partition_keys.finish();
        self.order_keys.finish();
        self.pool.purge();
    }
}

impl Operator for WindowFunctionOperator {
    fn kind(&self) -> OperatorKind {
        OperatorKind::WindowFunction
    }

    fn input_indices(&self) -> &[usize] {
        &self.inputs
    }

    fn init(&mut self, ctx: &ExecutionContext) -> ExecutorResult<()> {
        if self.config.aggregates.is_empty() {
            return Err(ExecutorError::configuration_invalid("window operator without aggregates"));
        }
        for spec in &self.config.aggregates {
            spec.validate()?;
        }
        self.partition_key_schema = Some(schema_from_expressions(&self.config.partition_by));
        self.order_key_schema = Some(schema_from_expressions(&self.config.order_by));
        self.pool.bind(ctx.arena());
        self.output = Some(TempTable::new("window", Arc::clone(&self.output_schema), ctx.arena()));
        Ok(())
    }

    fn execute(
        &mut self,
        ctx: &ExecutionContext,
        params: &ParameterSet,
        inputs: &mut [&mut TempTable],
    ) -> ExecutorResult<()> {
        let input = single_input(inputs, OperatorKind::WindowFunction)?;

        let (Some(partition_schema), Some(order_schema)) = (&self.partition_key_schema, &self.order_key_schema)
        else {
            return Err(ExecutorError::execution_failed("window operator executed before init"));
        };
        self.partition_keys.init(partition_schema);
        self.order_keys.init(order_schema);
        let outcome = self.allocate_aggregates().and_then(|()| {
            let output = output_mut(&mut self.output, OperatorKind::WindowFunction)?;
            let output_types: Vec<ValueType> = output.schema().columns().iter().map(|c| c.value_type).collect();
            WindowScan {
                config: &self.config,
                params,
                input: &*input,
                output,
                output_types: &output_types,
                aggregates: self.pool.as_mut_slice(),
                partition_keys: &mut self.partition_keys,
                order_keys: &mut self.order_keys,
                stats: WindowScanStats::default(),
            }
            .run()
        });
        self.release_scan_state();
        let stats = outcome?;

        input.delete_all_temp_tuples();
        self.last_scan = stats;
        ctx.metrics().add_window_rows_emitted(stats.rows_emitted);
        log_event_with_fields(
            Event::WindowScanComplete,
            &[
                ("partitions", &stats.partitions.to_string()),
                ("peer_groups", &stats.peer_groups.to_string()),
                ("rows", &stats.rows_emitted.to_string()),
            ],
        );
        Ok(())
    }

    fn output_table(&self) -> Option<&TempTable> {
        self.output.as_ref()
    }

    fn output_table_mut(&mut self) -> Option<&mut TempTable> {
        self.output.as_mut()
    }

    fn cleanup_memory_pool(&mut self) {
        self.release_scan_state();
    }
}

/// One pass over the input
struct WindowScan<'a> {
    config: &'a WindowConfig,
    params: &'a ParameterSet,
    input: &'a TempTable,
    output: &'a mut TempTable,
    output_types: &'a [ValueType],
    aggregates: &'a mut [WindowAggregate],
    partition_keys: &'a mut KeyBuffer,
    order_keys: &'a mut KeyBuffer,
    stats: WindowScanStats,
}

impl<'a> WindowScan<'a> {
    fn run(mut self) -> ExecutorResult<WindowScanStats> {
        let mut window = TableWindow::new();
        let mut first_row = true;
        while self.find_leading_edge(&mut window, &mut first_row)? {
            self.stats.partitions += 1;
            self.aggregates.iter_mut().for_each(WindowAggregate::reset);
            let mut first_group = true;
            while self.find_order_by_edge(&mut window, first_group)? {
                first_group = false;
                self.stats.peer_groups += 1;
                self.close_peer_group(&mut window)?;
            }
        }
        Ok(self.stats)
    }

    /// Moves the leading cursor past every row of the partition that starts
    /// at the trailing cursor. Returns false once the input is exhausted.
    fn find_leading_edge(&mut self, window: &mut TableWindow, first_row: &mut bool) -> ExecutorResult<bool> {
        debug_assert_eq!(window.middle, window.leading);
        window.trailing = window.leading;
        if !window.leading.has_next(self.input) {
            window.order_by = window.leading;
            window.middle = window.leading;
            return Ok(false);
        }
        // The boundary row of the previous partition was already evaluated
        // and is re-evaluated here, so it compares equal to itself.
        while let Some(row) = window.leading.peek(self.input) {
            self.partition_keys
                .evaluate(&self.config.partition_by, row, self.params)?;
            if !*first_row && self.partition_keys.compare()? != Ordering::Equal {
                break;
            }
            *first_row = false;
            window.leading.next(self.input);
        }
        debug_assert!(window.is_ordered(), "cursor order violated at {}", window);
        Ok(true)
    }

    /// Moves the order-by cursor to the end of the next peer group of the
    /// current partition. Returns false when the partition is exhausted.
    fn find_order_by_edge(&mut self, window: &mut TableWindow, first_group: bool) -> ExecutorResult<bool> {
        debug_assert_eq!(window.middle, window.order_by);
        if window.order_by == window.leading {
            return Ok(false);
        }
        // The previous order-by key belongs to another partition when this
        // is the partition's first group.
        let mut skip_compare = first_group;
        while window.order_by < window.leading {
            let row = window
                .order_by
                .peek(self.input)
                .ok_or_else(|| ExecutorError::execution_failed("window input shrank during scan"))?;
            self.order_keys.evaluate(&self.config.order_by, row, self.params)?;
            if !skip_compare && self.order_keys.compare()? != Ordering::Equal {
                break;
            }
            skip_compare = false;
            window.order_by.next(self.input);
        }
        debug_assert!(window.is_ordered(), "cursor order violated at {}", window);
        Ok(true)
    }

    /// Looks ahead over the peer group, emits its rows, then fires the
    /// group-close hooks
    fn close_peer_group(&mut self, window: &mut TableWindow) -> ExecutorResult<()> {
        let group_size = window.pending_group_rows();
        let start = window.middle.position();

        if self.aggregates.iter().any(WindowAggregate::needs_row_lookahead) {
            for position in start..start + group_size {
                let row = self.row_at(position)?;
                for (agg, spec) in self.aggregates.iter_mut().zip(&self.config.aggregates) {
                    if agg.needs_row_lookahead() {
                        let arguments = spec
                            .arguments
                            .iter()
                            .map(|expr| expr.eval(Some(row), self.params))
                            .collect::<Result<Vec<Value>, _>>()?;
                        agg.lookahead_row(&arguments);
                    }
                }
            }
        }

        while window.middle != window.order_by {
            let row = window
                .middle
                .next(self.input)
                .ok_or_else(|| ExecutorError::execution_failed("window input shrank during scan"))?;
            self.emit(row)?;
        }
        debug_assert!(window.is_ordered(), "cursor order violated at {}", window);

        for agg in self.aggregates.iter_mut() {
            agg.lookahead_next_group(group_size);
        }
        for agg in self.aggregates.iter_mut() {
            agg.end_group();
        }
        Ok(())
    }

    fn row_at(&self, position: usize) -> ExecutorResult<&'a Tuple> {
        self.input
            .row(position)
            .ok_or_else(|| ExecutorError::execution_failed(format!("window input has no row {}", position)))
    }

    fn emit(&mut self, row: &Tuple) -> ExecutorResult<()> {
        let mut values = Vec::with_capacity(self.output_types.len());
        for (agg, output_type) in self.aggregates.iter().zip(self.output_types) {
            values.push(agg.finalize(*output_type)?);
        }
        for expr in &self.config.pass_through {
            values.push(expr.eval(Some(row), self.params)?);
        }
        self.output.insert_temp_tuple(Tuple::new(values))?;
        self.stats.rows_emitted += 1;
        Ok(())
    }
}
