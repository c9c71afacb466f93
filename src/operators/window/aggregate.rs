//! Window aggregate kinds and their running state

use std::fmt;

use crate::types::{Value, ValueResult, ValueType};

/// Window functions a plan can request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowFunctionKind {
    Rank,
    DenseRank,
    Count,
    Min,
    Max,
    Sum,
    Avg,
}

impl WindowFunctionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowFunctionKind::Rank => "RANK",
            WindowFunctionKind::DenseRank => "DENSE_RANK",
            WindowFunctionKind::Count => "COUNT",
            WindowFunctionKind::Min => "MIN",
            WindowFunctionKind::Max => "MAX",
            WindowFunctionKind::Sum => "SUM",
            WindowFunctionKind::Avg => "AVG",
        }
    }

    pub fn is_ranking(&self) -> bool {
        matches!(self, WindowFunctionKind::Rank | WindowFunctionKind::DenseRank)
    }
}

impl fmt::Display for WindowFunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Running state of one window aggregate within the current partition.
///
/// Per peer group the scan calls, in order: `lookahead_row` for every row of
/// the group (kinds that need it), `finalize` once per emitted row, then
/// `lookahead_next_group` and `end_group`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowAggregate {
    /// Advances by one per peer group
    DenseRank { rank: i64 },
    /// Advances by the size of the closing peer group
    Rank { rank: i64, pending: i64 },
    /// Non-null arguments seen so far in the partition, current group included
    Count { count: i64 },
}

impl WindowAggregate {
    /// Fresh state for a supported kind
    pub fn for_kind(kind: WindowFunctionKind) -> Option<Self> {
        let mut agg = match kind {
            WindowFunctionKind::DenseRank => WindowAggregate::DenseRank { rank: 0 },
            WindowFunctionKind::Rank => WindowAggregate::Rank { rank: 0, pending: 0 },
            WindowFunctionKind::Count => WindowAggregate::Count { count: 0 },
            _ => return None,
        };
        agg.reset();
        Some(agg)
    }

    /// Back to the start of a partition
    pub fn reset(&mut self) {
        match self {
            WindowAggregate::DenseRank { rank } => *rank = 1,
            WindowAggregate::Rank { rank, pending } => {
                *rank = 1;
                *pending = 0;
            }
            WindowAggregate::Count { count } => *count = 0,
        }
    }

    /// Whether every row of a peer group must be seen before any is emitted
    pub fn needs_row_lookahead(&self) -> bool {
        matches!(self, WindowAggregate::Count { .. })
    }

    /// Consumes a row's evaluated arguments ahead of emission.
    /// An empty argument list counts the row itself.
    pub fn lookahead_row(&mut self, arguments: &[Value]) {
        if let WindowAggregate::Count { count } = self {
            if arguments.iter().all(|value| !value.is_null()) {
                *count += 1;
            }
        }
    }

    /// Sees the size of the peer group that is closing
    pub fn lookahead_next_group(&mut self, group_size: usize) {
        if let WindowAggregate::Rank { pending, .. } = self {
            *pending = group_size as i64;
        }
    }

    /// Applies what the closing peer group contributes to the next one
    pub fn end_group(&mut self) {
        match self {
            WindowAggregate::DenseRank { rank } => *rank += 1,
            WindowAggregate::Rank { rank, pending } => {
                *rank += *pending;
                *pending = 0;
            }
            WindowAggregate::Count { .. } => {}
        }
    }

    /// Current value cast to the output column type
    pub fn finalize(&self, output_type: ValueType) -> ValueResult<Value> {
        let value = match self {
            WindowAggregate::DenseRank { rank } | WindowAggregate::Rank { rank, .. } => *rank,
            WindowAggregate::Count { count } => *count,
        };
        Value::BigInt(value).cast_as(output_type)
    }
}
