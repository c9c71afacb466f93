//! Double-buffered key storage for group-boundary detection
//!
//! Two slots per key kind: the key being evaluated and the previous one.
//! Starting a new evaluation flips which slot is current, so the old current
//! key becomes the previous key without copying. Both slots exist only while
//! a scan is active.

use std::cmp::Ordering;

use crate::executor::{ExecutorError, ExecutorResult};
use crate::expr::Expression;
use crate::types::{ParameterSet, Tuple, TupleSchema};

#[derive(Debug, Default)]
pub struct KeyBuffer {
    slots: [Option<Tuple>; 2],
    current: usize,
}

impl KeyBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates both slots for keys shaped by `schema`
    pub fn init(&mut self, schema: &TupleSchema) {
        debug_assert!(!self.is_active(), "key buffer initialized twice");
        let width = schema.column_count();
        self.slots = [Some(Tuple::with_nulls(width)), Some(Tuple::with_nulls(width))];
        self.current = 0;
    }

    pub fn is_active(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Releases both slots at the end of a scan
    pub fn finish(&mut self) {
        self.slots = [None, None];
    }

    fn swap(&mut self) -> ExecutorResult<()> {
        if !self.is_active() {
            return Err(ExecutorError::execution_failed("window key buffer used outside a scan"));
        }
        self.current ^= 1;
        Ok(())
    }

    /// Makes the current key the previous one, then evaluates `exprs` over
    /// `row` into the current slot
    pub fn evaluate(&mut self, exprs: &[Expression], row: &Tuple, params: &ParameterSet) -> ExecutorResult<()> {
        self.swap()?;
        let slot = self.slots[self.current]
            .as_mut()
            .ok_or_else(|| ExecutorError::execution_failed("window key slot released mid-scan"))?;
        for (index, expr) in exprs.iter().enumerate() {
            slot.set(index, expr.eval(Some(row), params)?);
        }
        Ok(())
    }

    pub fn current(&self) -> Option<&Tuple> {
        self.slots[self.current].as_ref()
    }

    pub fn previous(&self) -> Option<&Tuple> {
        self.slots[self.current ^ 1].as_ref()
    }

    /// Compares the previous key with the current one, last column first;
    /// the first differing column decides
    pub fn compare(&self) -> ExecutorResult<Ordering> {
        let (Some(previous), Some(current)) = (self.previous(), self.current()) else {
            return Err(ExecutorError::execution_failed("window key compared outside a scan"));
        };
        for (before, now) in previous.values().iter().zip(current.values()).rev() {
            let cmp = before.compare(now);
            if cmp != Ordering::Equal {
                return Ok(cmp);
            }
        }
        Ok(Ordering::Equal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Value, ValueType};

    #[test]
    fn test_swap_keeps_previous_key() {
        let exprs = vec![Expression::column(0, ValueType::BigInt)];
        let params = ParameterSet::empty();
        let mut keys = KeyBuffer::new();
        keys.init(&TupleSchema::of_types(&[ValueType::BigInt]));

        keys.evaluate(&exprs, &Tuple::new(vec![Value::BigInt(1)]), &params).unwrap();
        keys.evaluate(&exprs, &Tuple::new(vec![Value::BigInt(2)]), &params).unwrap();
        assert_eq!(keys.previous().unwrap().get(0), Some(&Value::BigInt(1)));
        assert_eq!(keys.current().unwrap().get(0), Some(&Value::BigInt(2)));
        assert_eq!(keys.compare().unwrap(), Ordering::Less);

        keys.evaluate(&exprs, &Tuple::new(vec![Value::BigInt(2)]), &params).unwrap();
        assert_eq!(keys.compare().unwrap(), Ordering::Equal);
    }

    #[test]
    fn test_last_column_decides_first() {
        let exprs = vec![
            Expression::column(0, ValueType::BigInt),
            Expression::column(1, ValueType::BigInt),
        ];
        let params = ParameterSet::empty();
        let mut keys = KeyBuffer::new();
        keys.init(&TupleSchema::of_types(&[ValueType::BigInt, ValueType::BigInt]));
        keys.evaluate(&exprs, &Tuple::new(vec![Value::BigInt(1), Value::BigInt(9)]), &params).unwrap();
        keys.evaluate(&exprs, &Tuple::new(vec![Value::BigInt(5), Value::BigInt(3)]), &params).unwrap();
        assert_eq!(keys.compare().unwrap(), Ordering::Greater);
    }

    #[test]
    fn test_inactive_buffer_rejects_use() {
        let mut keys = KeyBuffer::new();
        assert!(keys.compare().is_err());
        keys.init(&TupleSchema::of_types(&[]));
        assert!(keys.is_active());
        assert_eq!(keys.compare().unwrap(), Ordering::Equal);
        keys.finish();
        assert!(!keys.is_active());
        assert!(keys
            .evaluate(&[], &Tuple::new(vec![]), &ParameterSet::empty())
            .is_err());
    }
}
