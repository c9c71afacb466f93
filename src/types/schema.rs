//! Tuple schemas
//!
//! A schema is an ordered list of column descriptors. Schemas are immutable
//! once built and shared behind `Arc` by every tuple and table using them.

use serde::{Deserialize, Serialize};

use super::tuple::Tuple;
use super::value::ValueType;

/// Descriptor for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnInfo {
    /// Column type
    pub value_type: ValueType,
    /// Declared size in bytes (max length for variable-length types)
    pub size: u32,
    /// Whether NULL is permitted
    pub allow_null: bool,
    /// Whether `size` counts bytes rather than characters
    pub in_bytes: bool,
}

impl ColumnInfo {
    /// Nullable column with the type's default size
    pub fn nullable(value_type: ValueType) -> Self {
        Self {
            value_type,
            size: value_type.default_size(),
            allow_null: true,
            in_bytes: false,
        }
    }

    /// Non-nullable column with the type's default size
    pub fn not_null(value_type: ValueType) -> Self {
        Self {
            allow_null: false,
            ..Self::nullable(value_type)
        }
    }

    /// Whether the value lives out of line
    pub fn is_inlined(&self) -> bool {
        !self.value_type.is_variable_length()
    }
}

/// Ordered column layout of a tuple
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TupleSchema {
    columns: Vec<ColumnInfo>,
}

impl TupleSchema {
    /// Creates a schema from column descriptors
    pub fn new(columns: Vec<ColumnInfo>) -> Self {
        Self { columns }
    }

    /// Schema of nullable columns with default sizes
    pub fn of_types(types: &[ValueType]) -> Self {
        Self::new(types.iter().map(|t| ColumnInfo::nullable(*t)).collect())
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column descriptors in order
    pub fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    /// Descriptor of one column
    pub fn column(&self, index: usize) -> Option<&ColumnInfo> {
        self.columns.get(index)
    }

    /// Type of one column
    pub fn column_type(&self, index: usize) -> Option<ValueType> {
        self.columns.get(index).map(|c| c.value_type)
    }

    /// Nominal fixed width of one row, used for scratch accounting
    pub fn tuple_length(&self) -> usize {
        self.columns
            .iter()
            .map(|c| if c.is_inlined() { c.size as usize } else { 8 })
            .sum()
    }

    /// Whether two schemas hold the same column types in the same order
    pub fn is_compatible_with(&self, other: &TupleSchema) -> bool {
        self.columns.len() == other.columns.len()
            && self
                .columns
                .iter()
                .zip(other.columns.iter())
                .all(|(a, b)| a.value_type == b.value_type)
    }

    /// Checks a tuple against this schema.
    ///
    /// Returns a description of the first violation.
    pub fn check_tuple(&self, tuple: &Tuple) -> Result<(), String> {
        if tuple.len() != self.columns.len() {
            return Err(format!(
                "expected {} columns, got {}",
                self.columns.len(),
                tuple.len()
            ));
        }
        for (index, (column, value)) in self.columns.iter().zip(tuple.values()).enumerate() {
            match value.value_type() {
                None if !column.allow_null => {
                    return Err(format!("column {} does not allow NULL", index));
                }
                Some(actual) if actual != column.value_type => {
                    return Err(format!(
                        "column {} expects {}, got {}",
                        index, column.value_type, actual
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
