//! Persistent table contract
//!
//! Real table storage and its indexes live outside the execution engine.
//! Executors only need forward iteration, a visible row count, insert, and
//! the replicated flag, which is what `PersistentTable` exposes.
//! `MemoryTable` is the in-memory implementation.

use std::sync::{Arc, RwLock};

use crate::types::{Tuple, TupleSchema};

use super::errors::{StorageError, StorageResult};

/// Storage collaborator used by scan, insert and swap executors
pub trait PersistentTable: Send + Sync + std::fmt::Debug {
    /// Table name
    fn name(&self) -> &str;

    /// Row layout
    fn schema(&self) -> &Arc<TupleSchema>;

    /// Whether every partition holds a full copy of this table
    fn is_replicated(&self) -> bool;

    /// Number of rows visible to readers
    fn visible_tuple_count(&self) -> usize;

    /// Inserts one row, validating it against the schema
    fn insert_tuple(&self, tuple: Tuple) -> StorageResult<()>;

    /// Visits rows in storage order until `visitor` returns `false`
    fn scan(&self, visitor: &mut dyn FnMut(&Tuple) -> bool);

    /// Replaces the entire row set, returning the previous one
    fn replace_rows(&self, rows: Vec<Tuple>) -> Vec<Tuple>;
}

/// Shared handle to a persistent table
pub type TableHandle = Arc<dyn PersistentTable>;

/// In-memory persistent table
#[derive(Debug)]
pub struct MemoryTable {
    name: String,
    schema: Arc<TupleSchema>,
    replicated: bool,
    rows: RwLock<Vec<Tuple>>,
}

impl MemoryTable {
    /// Creates a partitioned table
    pub fn partitioned(name: impl Into<String>, schema: TupleSchema) -> Self {
        Self {
            name: name.into(),
            schema: Arc::new(schema),
            replicated: false,
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Creates a replicated table
    pub fn replicated(name: impl Into<String>, schema: TupleSchema) -> Self {
        Self {
            replicated: true,
            ..Self::partitioned(name, schema)
        }
    }

    /// Shares the table as a handle
    pub fn into_handle(self) -> TableHandle {
        Arc::new(self)
    }

    /// Copies every row, in storage order
    pub fn snapshot(&self) -> Vec<Tuple> {
        let mut out = Vec::new();
        self.scan(&mut |row| {
            out.push(row.clone());
            true
        });
        out
    }
}

impl PersistentTable for MemoryTable {
    fn name(&self) -> &str {
        &self.name
    }

    fn schema(&self) -> &Arc<TupleSchema> {
        &self.schema
    }

    fn is_replicated(&self) -> bool {
        self.replicated
    }

    fn visible_tuple_count(&self) -> usize {
        self.rows.read().map(|rows| rows.len()).unwrap_or_else(|e| e.into_inner().len())
    }

    fn insert_tuple(&self, tuple: Tuple) -> StorageResult<()> {
        self.schema
            .check_tuple(&tuple)
            .map_err(|reason| StorageError::constraint(&self.name, reason))?;
        let mut rows = self.rows.write().unwrap_or_else(|e| e.into_inner());
        rows.push(tuple);
        Ok(())
    }

    fn scan(&self, visitor: &mut dyn FnMut(&Tuple) -> bool) {
        let rows = self.rows.read().unwrap_or_else(|e| e.into_inner());
        for row in rows.iter() {
            if !visitor(row) {
                break;
            }
        }
    }

    fn replace_rows(&self, rows: Vec<Tuple>) -> Vec<Tuple> {
        let mut current = self.rows.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *current, rows)
    }
}

/// Swaps the contents of two tables with compatible schemas.
///
/// Returns the number of rows touched: the sum of both visible counts.
/// Swapping a table with itself is rejected and leaves its rows in place.
pub fn swap_tables(left: &dyn PersistentTable, right: &dyn PersistentTable) -> StorageResult<usize> {
    if std::ptr::eq(left as *const _ as *const (), right as *const _ as *const ()) {
        return Err(StorageError::SelfSwap(left.name().to_string()));
    }
    if !left.schema().is_compatible_with(right.schema()) {
        return Err(StorageError::IncompatibleSchemas {
            left: left.name().to_string(),
            right: right.name().to_string(),
        });
    }
    let touched = left.visible_tuple_count() + right.visible_tuple_count();
    let left_rows = left.replace_rows(Vec::new());
    let right_rows = right.replace_rows(left_rows);
    left.replace_rows(right_rows);
    Ok(touched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ColumnInfo, Value, ValueType};

    fn schema() -> TupleSchema {
        TupleSchema::new(vec![
            ColumnInfo::not_null(ValueType::BigInt),
            ColumnInfo::nullable(ValueType::Varchar),
        ])
    }

    fn row(id: i64) -> Tuple {
        Tuple::new(vec![Value::BigInt(id), Value::Varchar(format!("r{}", id))])
    }

    #[test]
    fn test_insert_and_scan() {
        let table = MemoryTable::partitioned("orders", schema());
        table.insert_tuple(row(1)).unwrap();
        table.insert_tuple(row(2)).unwrap();
        assert_eq!(table.visible_tuple_count(), 2);
        assert_eq!(table.snapshot(), vec![row(1), row(2)]);
        assert!(!table.is_replicated());
    }

    #[test]
    fn test_insert_rejects_null_key() {
        let table = MemoryTable::replicated("regions", schema());
        let err = table
            .insert_tuple(Tuple::new(vec![Value::Null, Value::Null]))
            .unwrap_err();
        assert!(matches!(err, StorageError::ConstraintViolation { .. }));
        assert_eq!(table.visible_tuple_count(), 0);
    }

    #[test]
    fn test_swap_tables() {
        let a = MemoryTable::partitioned("a", schema());
        let b = MemoryTable::partitioned("b", schema());
        a.insert_tuple(row(1)).unwrap();
        b.insert_tuple(row(2)).unwrap();
        b.insert_tuple(row(3)).unwrap();
        assert_eq!(swap_tables(&a, &b).unwrap(), 3);
        assert_eq!(a.snapshot(), vec![row(2), row(3)]);
        assert_eq!(b.snapshot(), vec![row(1)]);
    }

    #[test]
    fn test_swap_rejects_incompatible() {
        let a = MemoryTable::partitioned("a", schema());
        let b = MemoryTable::partitioned("b", TupleSchema::of_types(&[ValueType::Double]));
        assert!(matches!(
            swap_tables(&a, &b),
            Err(StorageError::IncompatibleSchemas { .. })
        ));
    }

    #[test]
    fn test_swap_with_itself_keeps_rows() {
        let a = MemoryTable::partitioned("a", schema());
        a.insert_tuple(row(1)).unwrap();
        a.insert_tuple(row(2)).unwrap();
        assert_eq!(swap_tables(&a, &a), Err(StorageError::SelfSwap("a".into())));
        assert_eq!(a.snapshot(), vec![row(1), row(2)]);
    }
}
