// Runtime values for compiled lambda programs.
//
// A compiled program only ever manipulates one-argument functions. Closures
// are interpreted by the machine; natives are host callbacks (the decoder's
// increment, `show`) plugged in through the `Native` capability.

use crate::core_ir::Term;
use crate::error::RuntimeError;
use crate::runtime::machine::Machine;
use std::fmt;
use std::mem;
use std::rc::Rc;

/// Host function callable with exactly one argument.
pub trait Native {
    fn name(&self) -> &str;

    /// `machine` is available so a native can itself apply values it receives.
    fn invoke(&self, arg: Value, machine: &mut Machine) -> Result<Value, RuntimeError>;
}

pub struct Closure {
    pub param: Rc<str>,
    pub body: Rc<Term>,
    pub env: Env,
}

#[derive(Clone)]
pub enum Value {
    Closure(Rc<Closure>),
    Native(Rc<dyn Native>),
    Int(i64),
    Unit,
}

impl Value {
    pub fn closure(param: Rc<str>, body: Rc<Term>, env: Env) -> Self {
        Value::Closure(Rc::new(Closure { param, body, env }))
    }

    pub fn native(native: impl Native + 'static) -> Self {
        Value::Native(Rc::new(native))
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Closure(_) | Value::Native(_))
    }

    /// Short description used in shape-mismatch errors.
    pub fn describe(&self) -> String {
        match self {
            Value::Closure(closure) => format!("closure λ{}", closure.param),
            Value::Native(native) => format!("native `{}`", native.name()),
            Value::Int(n) => format!("integer {}", n),
            Value::Unit => "unit".to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Closure(closure) => write!(f, "<closure λ{}.{}>", closure.param, closure.body),
            Value::Native(native) => write!(f, "<native {}>", native.name()),
            Value::Int(n) => write!(f, "{}", n),
            Value::Unit => write!(f, "()"),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.describe())
    }
}

/// Persistent environment; `bind` shares the tail with the parent.
#[derive(Clone, Default)]
pub struct Env(Option<Rc<Binding>>);

struct Binding {
    name: Rc<str>,
    value: Value,
    next: Env,
}

impl Env {
    pub fn empty() -> Self {
        Env(None)
    }

    pub fn bind(&self, name: Rc<str>, value: Value) -> Env {
        Env(Some(Rc::new(Binding {
            name,
            value,
            next: self.clone(),
        })))
    }

    /// Innermost binding wins.
    pub fn lookup(&self, name: &str) -> Option<&Value> {
        let mut cur = self.0.as_deref();
        while let Some(binding) = cur {
            if &*binding.name == name {
                return Some(&binding.value);
            }
            cur = binding.next.0.as_deref();
        }
        None
    }

    pub fn len(&self) -> usize {
        let mut cur = self.0.as_deref();
        let mut len = 0;
        while let Some(binding) = cur {
            len += 1;
            cur = binding.next.0.as_deref();
        }
        len
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_none()
    }
}

// A numeral built by repeated successor application is a chain of closures,
// each holding the previous one in its environment. Dropping it recursively
// would walk the whole chain on the Rust stack.
impl Drop for Env {
    fn drop(&mut self) {
        let mut pending: Vec<Rc<Binding>> = self.0.take().into_iter().collect();
        while let Some(binding) = pending.pop() {
            let Ok(mut binding) = Rc::try_unwrap(binding) else {
                continue;
            };
            pending.extend(binding.next.0.take());
            if let Value::Closure(closure) = mem::replace(&mut binding.value, Value::Unit) {
                if let Ok(mut closure) = Rc::try_unwrap(closure) {
                    pending.extend(closure.env.0.take());
                }
            }
        }
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Env({} bindings)", self.len())
    }
}
