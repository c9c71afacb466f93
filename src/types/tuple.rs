//! Rows

use super::value::Value;

/// A fixed-arity row of values.
///
/// The "null tuple" (no storage at all) is modelled as `Option<Tuple>::None`
/// by the code that needs it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tuple {
    values: Vec<Value>,
}

impl Tuple {
    /// Creates a tuple from values
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// A tuple of `width` NULLs
    pub fn with_nulls(width: usize) -> Self {
        Self {
            values: vec![Value::Null; width],
        }
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the tuple has no columns
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value at `index`
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Overwrites the value at `index`; out-of-range writes are ignored
    pub fn set(&mut self, index: usize, value: Value) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value;
        }
    }

    /// All values in column order
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Consumes the tuple
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    /// Estimated in-memory footprint
    pub fn estimated_size(&self) -> usize {
        16 + self.values.iter().map(Value::estimated_size).sum::<usize>()
    }

    /// Appends the canonical encoding of every value
    pub fn write_bytes(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&(self.values.len() as u32).to_le_bytes());
        for value in &self.values {
            value.write_bytes(buf);
        }
    }
}

impl From<Vec<Value>> for Tuple {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}
