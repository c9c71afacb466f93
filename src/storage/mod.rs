//! Storage seen from the execution engine
//!
//! - `TempTable`: per-operator output rows, charged to the partition arena
//! - `TableCursor`: forward-only position over a temp table
//! - `PersistentTable`: the contract the engine needs from table storage
//! - `DrStream`: the flush / sequence-number surface of the DR log

mod cursor;
mod dr_stream;
mod errors;
mod persistent;
mod temp_table;

pub use cursor::TableCursor;
pub use dr_stream::{DrStream, MemoryDrStream};
pub use errors::{StorageError, StorageResult};
pub use persistent::{swap_tables, MemoryTable, PersistentTable, TableHandle};
pub use temp_table::TempTable;
