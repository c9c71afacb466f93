//! Bound parameter vector

use super::value::Value;

/// Ordered parameter values supplied once per fragment execution
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParameterSet {
    values: Vec<Value>,
}

impl ParameterSet {
    /// Creates a parameter set
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// An empty parameter set
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parameter at `index`
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no parameters are bound
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for ParameterSet {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}
