//! Temp tables: per-operator output storage charged to the arena

use std::sync::Arc;

use crate::arena::{Arena, ArenaCharge, ArenaResult};
use crate::types::{Tuple, TupleSchema};

use super::cursor::TableCursor;

/// Scratch table holding one operator's output rows.
///
/// Rows are append-only until the table is cleaned up as a whole.
#[derive(Debug)]
pub struct TempTable {
    name: String,
    schema: Arc<TupleSchema>,
    rows: Vec<Tuple>,
    charge: ArenaCharge,
}

impl TempTable {
    /// Creates an empty table whose rows are charged to `arena`
    pub fn new(name: impl Into<String>, schema: Arc<TupleSchema>, arena: &Arc<Arena>) -> Self {
        Self {
            name: name.into(),
            schema,
            rows: Vec::new(),
            charge: arena.charge(),
        }
    }

    /// Table name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Row layout
    pub fn schema(&self) -> &Arc<TupleSchema> {
        &self.schema
    }

    /// Number of rows held
    pub fn active_tuple_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at `position`
    pub fn row(&self, position: usize) -> Option<&Tuple> {
        self.rows.get(position)
    }

    /// All rows in insertion order
    pub fn rows(&self) -> &[Tuple] {
        &self.rows
    }

    /// Cursor positioned before the first row
    pub fn iterator(&self) -> TableCursor {
        TableCursor::start()
    }

    /// Bytes this table holds in its arena
    pub fn charged_bytes(&self) -> usize {
        self.charge.bytes()
    }

    /// Appends a row, charging its footprint to the arena
    pub fn insert_temp_tuple(&mut self, tuple: Tuple) -> ArenaResult<()> {
        debug_assert_eq!(tuple.len(), self.schema.column_count());
        self.charge.grow(tuple.estimated_size())?;
        self.rows.push(tuple);
        Ok(())
    }

    /// Removes and returns every row, releasing the charge
    /// (delete-as-you-go consumption)
    pub fn take_rows(&mut self) -> Vec<Tuple> {
        self.charge.release_all();
        std::mem::take(&mut self.rows)
    }

    /// Drops every row and releases the charge
    pub fn delete_all_temp_tuples(&mut self) {
        self.rows.clear();
        self.charge.release_all();
    }

    /// CRC32 over the canonical encoding of all rows, in order
    pub fn checksum(&self) -> u32 {
        let mut hasher = crc32fast::Hasher::new();
        let mut buf = Vec::with_capacity(64);
        for row in &self.rows {
            buf.clear();
            row.write_bytes(&mut buf);
            hasher.update(&buf);
        }
        hasher.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Value, ValueType};

    fn table(arena: &Arc<Arena>) -> TempTable {
        TempTable::new("t", Arc::new(TupleSchema::of_types(&[ValueType::BigInt])), arena)
    }

    #[test]
    fn test_insert_charges_and_cleanup_releases() {
        let arena = Arc::new(Arena::unlimited("p0"));
        let mut t = table(&arena);
        t.insert_temp_tuple(Tuple::new(vec![Value::BigInt(1)])).unwrap();
        t.insert_temp_tuple(Tuple::new(vec![Value::BigInt(2)])).unwrap();
        assert_eq!(t.active_tuple_count(), 2);
        assert!(arena.used() > 0);
        t.delete_all_temp_tuples();
        assert!(t.is_empty());
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_take_rows_releases() {
        let arena = Arc::new(Arena::unlimited("p0"));
        let mut t = table(&arena);
        t.insert_temp_tuple(Tuple::new(vec![Value::BigInt(9)])).unwrap();
        let rows = t.take_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn test_checksum_depends_on_order() {
        let arena = Arc::new(Arena::unlimited("p0"));
        let mut a = table(&arena);
        let mut b = table(&arena);
        for v in [1, 2] {
            a.insert_temp_tuple(Tuple::new(vec![Value::BigInt(v)])).unwrap();
        }
        for v in [2, 1] {
            b.insert_temp_tuple(Tuple::new(vec![Value::BigInt(v)])).unwrap();
        }
        assert_ne!(a.checksum(), b.checksum());
    }
}
