//! Forward-only table cursors
//!
//! A cursor is a position, not a borrow, so several cursors can walk the
//! same table at different paces. Cursors only ever move forward.

use crate::types::Tuple;

use super::temp_table::TempTable;

/// Position of the next row to be read
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct TableCursor {
    position: usize,
}

impl TableCursor {
    /// Cursor before the first row
    pub fn start() -> Self {
        Self { position: 0 }
    }

    /// Index of the next row to be read
    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether a row remains
    pub fn has_next(&self, table: &TempTable) -> bool {
        self.position < table.active_tuple_count()
    }

    /// Next row without moving
    pub fn peek<'t>(&self, table: &'t TempTable) -> Option<&'t Tuple> {
        table.row(self.position)
    }

    /// Reads the next row and moves past it
    pub fn next<'t>(&mut self, table: &'t TempTable) -> Option<&'t Tuple> {
        let row = table.row(self.position)?;
        self.position += 1;
        Some(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::types::{TupleSchema, Value, ValueType};
    use std::sync::Arc;

    #[test]
    fn test_cursors_move_independently() {
        let arena = Arc::new(Arena::unlimited("p0"));
        let mut table = TempTable::new(
            "t",
            Arc::new(TupleSchema::of_types(&[ValueType::BigInt])),
            &arena,
        );
        for v in 0..3 {
            table.insert_temp_tuple(Tuple::new(vec![Value::BigInt(v)])).unwrap();
        }
        let mut lead = table.iterator();
        let mut trail = table.iterator();
        assert_eq!(lead.next(&table).unwrap().get(0), Some(&Value::BigInt(0)));
        lead.next(&table);
        assert_eq!(trail.peek(&table).unwrap().get(0), Some(&Value::BigInt(0)));
        assert!(trail < lead);
        trail = lead;
        assert_eq!(trail.position(), 2);
        assert!(lead.next(&table).is_some());
        assert!(!lead.has_next(&table));
        assert!(lead.next(&table).is_none());
        assert_eq!(lead.position(), 3);
    }
}
