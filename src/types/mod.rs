//! Tuple and schema layer
//!
//! Fixed-arity rows described by schemas of typed, nullable columns, plus
//! the scalar values and parameter vectors the executors evaluate.

mod params;
mod schema;
mod tuple;
mod value;

pub use params::ParameterSet;
pub use schema::{ColumnInfo, TupleSchema};
pub use tuple::Tuple;
pub use value::{Value, ValueError, ValueResult, ValueType};
