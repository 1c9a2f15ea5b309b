// Decoding accumulator and the increment callback bound to it.
//
// One Counter per decode. The Increment native holds the only other handle;
// both go away once the decode has read the final count.

use crate::error::RuntimeError;
use crate::runtime::machine::Machine;
use crate::runtime::value::{Native, Value};
use std::cell::Cell;
use std::rc::Rc;

#[derive(Debug, Default)]
pub struct Counter {
    count: Cell<u64>,
}

impl Counter {
    pub fn new() -> Self {
        Counter::default()
    }

    #[cfg(test)]
    pub(crate) fn starting_at(count: u64) -> Self {
        Counter {
            count: Cell::new(count),
        }
    }

    pub fn increment(&self) -> Result<(), RuntimeError> {
        let next = self
            .count
            .get()
            .checked_add(1)
            .ok_or(RuntimeError::CounterOverflow)?;
        self.count.set(next);
        Ok(())
    }

    pub fn read(&self) -> u64 {
        self.count.get()
    }
}

/// The successor stand-in handed to a numeral while it is being decoded.
pub struct Increment {
    counter: Rc<Counter>,
}

impl Increment {
    pub fn bound_to(counter: Rc<Counter>) -> Self {
        Increment { counter }
    }
}

impl Native for Increment {
    fn name(&self) -> &str {
        "increment"
    }

    // The witness value threaded through by the numeral is never inspected.
    fn invoke(&self, _witness: Value, _machine: &mut Machine) -> Result<Value, RuntimeError> {
        self.counter.increment()?;
        Ok(Value::Unit)
    }
}
