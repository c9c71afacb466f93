//! The four cursors of a window scan
//!
//! `trailing` marks the start of the current partition, `middle` the next row
//! to emit, `order_by` the end of the current peer group and `leading` the
//! end of the current partition. At every step
//! `trailing <= middle <= order_by <= leading`, and no cursor moves backward.

use crate::storage::TableCursor;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TableWindow {
    pub trailing: TableCursor,
    pub middle: TableCursor,
    pub order_by: TableCursor,
    pub leading: TableCursor,
}

impl TableWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the cursors are in their required order
    pub fn is_ordered(&self) -> bool {
        self.trailing <= self.middle && self.middle <= self.order_by && self.order_by <= self.leading
    }

    /// Rows between the emitting cursor and the end of the peer group
    pub fn pending_group_rows(&self) -> usize {
        self.order_by.position() - self.middle.position()
    }
}

impl std::fmt::Display for TableWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}, {}, {}, {}]",
            self.trailing.position(),
            self.middle.position(),
            self.order_by.position(),
            self.leading.position()
        )
    }
}
