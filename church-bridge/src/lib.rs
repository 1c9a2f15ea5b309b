// Runtime bridge for programs compiled from the untyped lambda calculus.
//
// Compiled programs encode every piece of data as curried one-argument
// functions. This crate evaluates such programs and turns the Church numerals
// they produce back into host integers.

pub mod config;
pub mod core_ir;
pub mod core_loader;
pub mod error;
pub mod runtime;
pub mod trace;

pub use config::Limits;
pub use core_ir::{Definition, Program, Term};
pub use error::{Budget, ConfigError, LoadError, RuntimeError};
