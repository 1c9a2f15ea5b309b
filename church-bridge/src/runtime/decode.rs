// Church numeral decoding.
//
// A numeral `n` is a function that takes a successor `f` and a zero `x` and
// applies `f` to `x` exactly `n` times. Decoding hands it an `Increment`
// bound to a fresh `Counter` as `f` and the seed `0` as `x`, then reads the
// counter. The shape of the value is not checked up front: a non-function
// anywhere along the way surfaces as `ShapeMismatch` from the machine, and a
// numeral that never stops applying surfaces as `Divergence`.

use crate::config::Limits;
use crate::error::RuntimeError;
use crate::runtime::counter::{Counter, Increment};
use crate::runtime::machine::Machine;
use crate::runtime::value::Value;
use std::io::{self, Write};
use std::rc::Rc;
use tracing::debug;

/// Zero argument handed to every numeral. Never inspected.
pub const SEED: i64 = 0;

pub fn to_native_number(machine: &mut Machine, number: &Value) -> Result<u64, RuntimeError> {
    let counter = Rc::new(Counter::new());
    let increment = Value::native(Increment::bound_to(Rc::clone(&counter)));

    let started_at = machine.steps();
    let awaiting_zero = machine.apply(number.clone(), increment)?;
    machine.apply(awaiting_zero, Value::Int(SEED))?;

    let count = counter.read();
    debug!(count, steps = machine.steps() - started_at, "decoded numeral");
    Ok(count)
}

/// Decode on a fresh machine.
///
/// ```
/// use church_bridge::runtime::{decode, prelude, Env, Machine};
/// use church_bridge::Limits;
/// use std::rc::Rc;
///
/// let mut machine = Machine::default();
/// let seven = machine
///     .eval(&Rc::new(prelude::numeral(7)), &Env::empty())
///     .unwrap();
/// assert_eq!(decode(&seven, Limits::default()).unwrap(), 7);
/// ```
pub fn decode(number: &Value, limits: Limits) -> Result<u64, RuntimeError> {
    to_native_number(&mut Machine::new(limits), number)
}

/// Decode `number` and write it as one decimal line.
pub fn show_to<W: Write + ?Sized>(
    machine: &mut Machine,
    number: &Value,
    out: &mut W,
) -> Result<(), RuntimeError> {
    let count = to_native_number(machine, number)?;
    writeln!(out, "{}", count)?;
    out.flush()?;
    Ok(())
}

pub fn show(machine: &mut Machine, number: &Value) -> Result<(), RuntimeError> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    show_to(machine, number, &mut out)
}
