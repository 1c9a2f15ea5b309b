// Runtime module
// Everything a compiled Church-encoded program needs at run time: values,
// the evaluator, numeral decoding and the `show` entry point.

pub mod value;
pub mod machine;
pub mod counter;
pub mod decode;
pub mod io;
pub mod prelude;
pub mod runner;


// Re-export runtime items for convenient use
pub use value::{Closure, Env, Native, Value};
pub use machine::Machine;
pub use counter::{Counter, Increment};
pub use decode::{decode, show, show_to, to_native_number, SEED};
pub use io::ShowPrimitive;
pub use runner::{run_program, RunOptions, RunReport};
