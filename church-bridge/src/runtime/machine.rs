// Explicit-stack, call-by-value evaluator for compiled lambda terms.
//
// The machine alternates between three states: evaluating a term in an
// environment, applying a function value to an argument value, and returning
// a value to the innermost pending frame. Pending work lives in a heap
// `Vec<Frame>`, so nested applications never grow the Rust call stack and
// closure calls in tail position run in constant space.
//
// Every transition costs one step against `Limits::max_steps`; the frame
// stack is bounded by `Limits::max_depth`, counting the frames of every run
// suspended underneath a native call. A native that applies values (`show`
// decoding its argument) starts a nested run on the Rust stack, so those are
// bounded separately by `Limits::max_nesting`. Running out of any budget is
// reported as `RuntimeError::Divergence`.

use crate::config::Limits;
use crate::core_ir::Term;
use crate::error::{Budget, RuntimeError};
use crate::runtime::value::{Env, Value};
use std::rc::Rc;
use tracing::trace;

const PROGRESS_INTERVAL: u64 = 100_000;

enum State {
    Eval(Rc<Term>, Env),
    Apply(Value, Value),
    Return(Value),
}

enum Frame {
    /// Function is being evaluated; argument comes next.
    Arg(Rc<Term>, Env),
    /// Argument is being evaluated; then call this function with it.
    Call(Value),
    /// Bound value is being evaluated; then continue with the body.
    Let(Rc<str>, Rc<Term>, Env),
}

#[derive(Debug)]
pub struct Machine {
    limits: Limits,
    steps: u64,
    /// Runs currently active on the Rust stack.
    nesting: usize,
    /// Frames held by runs waiting on a native call.
    suspended: usize,
}

impl Default for Machine {
    fn default() -> Self {
        Machine::new(Limits::default())
    }
}

impl Machine {
    pub fn new(limits: Limits) -> Self {
        Machine {
            limits,
            steps: 0,
            nesting: 0,
            suspended: 0,
        }
    }

    pub fn limits(&self) -> Limits {
        self.limits
    }

    /// Transitions taken so far, across every `eval`/`apply` on this machine.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn eval(&mut self, term: &Rc<Term>, env: &Env) -> Result<Value, RuntimeError> {
        self.run(State::Eval(Rc::clone(term), env.clone()))
    }

    pub fn apply(&mut self, func: Value, arg: Value) -> Result<Value, RuntimeError> {
        self.run(State::Apply(func, arg))
    }

    fn tick(&mut self) -> Result<(), RuntimeError> {
        if self.steps >= self.limits.max_steps {
            return Err(RuntimeError::Divergence {
                budget: Budget::Steps,
                limit: self.limits.max_steps,
            });
        }
        self.steps += 1;
        if self.steps % PROGRESS_INTERVAL == 0 {
            trace!(steps = self.steps, "machine progress");
        }
        Ok(())
    }

    fn run(&mut self, start: State) -> Result<Value, RuntimeError> {
        if self.nesting >= self.limits.max_nesting {
            return Err(RuntimeError::Divergence {
                budget: Budget::Nesting,
                limit: self.limits.max_nesting as u64,
            });
        }
        self.nesting += 1;
        let result = self.run_frames(start);
        self.nesting -= 1;
        result
    }

    fn run_frames(&mut self, start: State) -> Result<Value, RuntimeError> {
        let mut stack: Vec<Frame> = Vec::new();
        let mut state = start;

        loop {
            self.tick()?;

            state = match state {
                State::Eval(term, env) => match term.as_ref() {
                    Term::Var(name) => match env.lookup(name) {
                        Some(value) => State::Return(value.clone()),
                        None => return Err(RuntimeError::UnboundVariable(name.to_string())),
                    },
                    Term::Int(n) => State::Return(Value::Int(*n)),
                    Term::Lam(param, body) => {
                        State::Return(Value::closure(Rc::clone(param), Rc::clone(body), env))
                    }
                    Term::App(func, arg) => {
                        stack.push(Frame::Arg(Rc::clone(arg), env.clone()));
                        State::Eval(Rc::clone(func), env)
                    }
                    Term::Let(name, value, body) => {
                        stack.push(Frame::Let(Rc::clone(name), Rc::clone(body), env.clone()));
                        State::Eval(Rc::clone(value), env)
                    }
                },

                State::Apply(func, arg) => match func {
                    Value::Closure(closure) => State::Eval(
                        Rc::clone(&closure.body),
                        closure.env.bind(Rc::clone(&closure.param), arg),
                    ),
                    Value::Native(native) => {
                        let held = stack.len();
                        self.suspended += held;
                        let result = native.invoke(arg, self);
                        self.suspended -= held;
                        State::Return(result?)
                    }
                    other => {
                        return Err(RuntimeError::ShapeMismatch {
                            found: other.describe(),
                        })
                    }
                },

                State::Return(value) => match stack.pop() {
                    None => return Ok(value),
                    Some(Frame::Arg(arg, env)) => {
                        stack.push(Frame::Call(value));
                        State::Eval(arg, env)
                    }
                    Some(Frame::Call(func)) => State::Apply(func, value),
                    Some(Frame::Let(name, body, env)) => State::Eval(body, env.bind(name, value)),
                },
            };

            if self.suspended + stack.len() > self.limits.max_depth {
                return Err(RuntimeError::Divergence {
                    budget: Budget::Depth,
                    limit: self.limits.max_depth as u64,
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_ir::{app, apps, lam, let_in, var};
    use crate::runtime::value::Native;
    use std::cell::RefCell;

    fn eval(term: crate::core_ir::Term) -> Result<Value, RuntimeError> {
        Machine::default().eval(&Rc::new(term), &Env::empty())
    }

    fn omega() -> crate::core_ir::Term {
        let half = lam("x", app(var("x"), var("x")));
        app(half.clone(), half)
    }

    #[test]
    fn identity_application_returns_its_argument() {
        let value = eval(app(lam("x", var("x")), Term::Int(5))).unwrap();
        assert!(matches!(value, Value::Int(5)));
    }

    #[test]
    fn identity_application_takes_eight_steps() {
        let term = Rc::new(app(lam("x", var("x")), Term::Int(5)));

        let mut machine = Machine::default();
        machine.eval(&term, &Env::empty()).unwrap();
        assert_eq!(machine.steps(), 8);

        let mut tight = Machine::new(Limits::default().with_max_steps(7));
        let err = tight.eval(&term, &Env::empty()).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Divergence { budget: Budget::Steps, limit: 7 }
        ));
    }

    #[test]
    fn closures_capture_their_defining_environment() {
        // (λx. λy. x) 1 2
        let value = eval(apps(lam("x", lam("y", var("x"))), [Term::Int(1), Term::Int(2)])).unwrap();
        assert!(matches!(value, Value::Int(1)));
    }

    #[test]
    fn let_binds_for_the_body_only() {
        let value = eval(let_in("k", Term::Int(9), var("k"))).unwrap();
        assert!(matches!(value, Value::Int(9)));

        let err = eval(app(lam("_", var("k")), let_in("k", Term::Int(9), var("k")))).unwrap_err();
        assert!(matches!(err, RuntimeError::UnboundVariable(name) if name == "k"));
    }

    #[test]
    fn applying_an_integer_is_a_shape_mismatch() {
        let err = eval(app(Term::Int(3), Term::Int(4))).unwrap_err();
        assert!(matches!(err, RuntimeError::ShapeMismatch { found } if found == "integer 3"));
    }

    #[test]
    fn self_application_loop_hits_the_step_budget() {
        let mut machine = Machine::new(Limits::default().with_max_steps(10_000));
        let err = machine.eval(&Rc::new(omega()), &Env::empty()).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Divergence { budget: Budget::Steps, limit: 10_000 }
        ));
        assert_eq!(machine.steps(), 10_000);
    }

    #[test]
    fn tail_calls_do_not_grow_the_frame_stack() {
        // omega only ever calls in tail position, so a depth of 4 is plenty
        let limits = Limits::default().with_max_steps(5_000).with_max_depth(4);
        let err = Machine::new(limits)
            .eval(&Rc::new(omega()), &Env::empty())
            .unwrap_err();
        assert!(matches!(err, RuntimeError::Divergence { budget: Budget::Steps, .. }));
    }

    #[test]
    fn non_tail_recursion_hits_the_depth_budget() {
        // w = λx. f (x x), applied to itself: every round leaves a pending call to f
        let w = lam("x", app(var("f"), app(var("x"), var("x"))));
        let term = lam("f", app(w.clone(), w));
        let grow = app(term, lam("y", var("y")));

        let limits = Limits::default().with_max_depth(256);
        let err = Machine::new(limits).eval(&Rc::new(grow), &Env::empty()).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Divergence { budget: Budget::Depth, limit: 256 }
        ));
    }

    struct Recorder(RefCell<Vec<i64>>);

    impl Native for Recorder {
        fn name(&self) -> &str {
            "record"
        }

        fn invoke(&self, arg: Value, _machine: &mut Machine) -> Result<Value, RuntimeError> {
            if let Value::Int(n) = arg {
                self.0.borrow_mut().push(n);
            }
            Ok(arg)
        }
    }

    #[test]
    fn natives_run_in_argument_order() {
        let recorder = Rc::new(Recorder(RefCell::new(Vec::new())));
        let native: Rc<dyn Native> = recorder.clone();
        let env = Env::empty().bind("record".into(), Value::Native(native));

        // (λa. λb. b) (record 1) (record 2)
        let term = apps(
            lam("a", lam("b", var("b"))),
            [app(var("record"), Term::Int(1)), app(var("record"), Term::Int(2))],
        );
        let value = Machine::default().eval(&Rc::new(term), &env).unwrap();

        assert!(matches!(value, Value::Int(2)));
        assert_eq!(*recorder.0.borrow(), vec![1, 2]);
    }

    #[test]
    fn apply_runs_a_value_directly() {
        let mut machine = Machine::default();
        let identity = machine.eval(&Rc::new(lam("x", var("x"))), &Env::empty()).unwrap();
        let value = machine.apply(identity, Value::Int(11)).unwrap();
        assert!(matches!(value, Value::Int(11)));
        assert!(machine.apply(Value::Unit, Value::Int(0)).unwrap_err().is_shape_mismatch());
    }

    /// Applies its argument to itself from inside a native call.
    struct Reenter;

    impl Native for Reenter {
        fn name(&self) -> &str {
            "reenter"
        }

        fn invoke(&self, arg: Value, machine: &mut Machine) -> Result<Value, RuntimeError> {
            machine.apply(arg.clone(), arg)
        }
    }

    fn reentry_loop() -> (Term, Env) {
        // w = λx. reenter x, then w w re-enters the machine on every round
        let w = lam("x", app(var("reenter"), var("x")));
        let env = Env::empty().bind("reenter".into(), Value::native(Reenter));
        (app(w.clone(), w), env)
    }

    #[test]
    fn native_reentry_hits_the_nesting_budget() {
        let (term, env) = reentry_loop();
        let mut machine = Machine::new(Limits::default().with_max_nesting(32));
        let err = machine.eval(&Rc::new(term), &env).unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Divergence { budget: Budget::Nesting, limit: 32 }
        ));

        // the counters unwind with the error, so the machine is reusable
        let value = machine.eval(&Rc::new(Term::Int(1)), &Env::empty()).unwrap();
        assert!(matches!(value, Value::Int(1)));
    }

    #[test]
    fn suspended_frames_count_toward_depth() {
        // every round leaves a pending call to `f` before re-entering
        let w = lam("x", app(var("f"), app(var("reenter"), var("x"))));
        let env = Env::empty()
            .bind("reenter".into(), Value::native(Reenter))
            .bind("f".into(), Value::native(Reenter));
        let limits = Limits::default().with_max_depth(20).with_max_nesting(1_000);
        let err = Machine::new(limits)
            .eval(&Rc::new(app(w.clone(), w)), &env)
            .unwrap_err();
        assert!(matches!(
            err,
            RuntimeError::Divergence { budget: Budget::Depth, limit: 20 }
        ));
    }
}
