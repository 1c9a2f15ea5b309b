// Executes a loaded program against the runtime.
//
// Global scope: `show`, then the prelude when enabled, then the program's own
// definitions in order. The root is evaluated last and must call `show`.

use super::io::ShowPrimitive;
use super::machine::Machine;
use super::prelude;
use super::value::{Env, Native, Value};
use crate::config::Limits;
use crate::core_ir::Program;
use crate::error::RuntimeError;
use std::io::Write;
use std::rc::Rc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub limits: Limits,
    /// Bind the standard constructions before the program's definitions.
    pub prelude: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Values printed by `show`, in order.
    pub shown: Vec<u64>,
    pub steps: u64,
}

pub fn run_program<W: Write + 'static>(
    program: &Program,
    options: &RunOptions,
    sink: W,
) -> Result<RunReport, RuntimeError> {
    let mut machine = Machine::new(options.limits);
    let show = Rc::new(ShowPrimitive::new(sink));
    let show_native: Rc<dyn Native> = show.clone();

    let mut env = Env::empty().bind("show".into(), Value::Native(show_native));
    if options.prelude {
        env = prelude::install(&mut machine, env)?;
    }

    for def in &program.definitions {
        let value = machine.eval(&def.term, &env)?;
        debug!(name = %def.name, steps = machine.steps(), "definition evaluated");
        env = env.bind(Rc::clone(&def.name), value);
    }

    machine.eval(&program.root, &env)?;

    let shown = show.shown();
    match shown.len() {
        0 => return Err(RuntimeError::MissingShow),
        1 => {}
        calls => warn!(calls, "program called show more than once"),
    }
    Ok(RunReport {
        shown,
        steps: machine.steps(),
    })
}
