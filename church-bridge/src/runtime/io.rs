// `show` as seen from inside a compiled program.
//
// Bound in the global environment; decodes its argument, prints it as one
// line to the sink and returns unit.

use super::decode::to_native_number;
use super::machine::Machine;
use super::value::{Native, Value};
use crate::error::RuntimeError;
use std::cell::RefCell;
use std::io::Write;

pub struct ShowPrimitive<W: Write> {
    sink: RefCell<W>,
    shown: RefCell<Vec<u64>>,
}

impl<W: Write> ShowPrimitive<W> {
    pub fn new(sink: W) -> Self {
        ShowPrimitive {
            sink: RefCell::new(sink),
            shown: RefCell::new(Vec::new()),
        }
    }

    /// Every value printed so far, in call order.
    pub fn shown(&self) -> Vec<u64> {
        self.shown.borrow().clone()
    }

    pub fn into_sink(self) -> W {
        self.sink.into_inner()
    }
}

impl<W: Write> Native for ShowPrimitive<W> {
    fn name(&self) -> &str {
        "show"
    }

    fn invoke(&self, number: Value, machine: &mut Machine) -> Result<Value, RuntimeError> {
        // Decode before touching the sink: the numeral may call show itself.
        let count = to_native_number(machine, &number)?;
        {
            let mut sink = self.sink.borrow_mut();
            writeln!(sink, "{}", count)?;
            sink.flush()?;
        }
        self.shown.borrow_mut().push(count);
        Ok(Value::Unit)
    }
}
