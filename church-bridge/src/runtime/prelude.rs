// Standard Church constructions.
//
// Each builder returns a closed term; compound definitions inline the ones
// they are built from, the same way compiled programs arrive fully expanded.
// `install` evaluates the whole library into an environment for programs
// run with the prelude enabled.
//
// Recursion goes through `y`, the strict (eta-expanded) fixed-point
// combinator. Conditionals take thunks (`λ_. ...`) for both branches and are
// forced with `null`, since evaluation is call-by-value.

use crate::core_ir::{app, apps, lam, var, Term};
use crate::error::RuntimeError;
use crate::runtime::machine::Machine;
use crate::runtime::value::Env;
use std::rc::Rc;
use tracing::debug;

pub fn identity() -> Term {
    lam("x", var("x"))
}

pub fn zero() -> Term {
    lam("f", lam("x", var("x")))
}

/// `λn.λf.λx. f (n f x)`
pub fn succ() -> Term {
    lam(
        "n",
        lam(
            "f",
            lam("x", app(var("f"), apps(var("n"), [var("f"), var("x")]))),
        ),
    )
}

/// Kleene's predecessor; `pred 0` is `0`.
pub fn pred() -> Term {
    lam(
        "n",
        lam(
            "f",
            lam(
                "x",
                apps(
                    var("n"),
                    [
                        lam("g", lam("h", app(var("h"), app(var("g"), var("f"))))),
                        lam("_", var("x")),
                        lam("u", var("u")),
                    ],
                ),
            ),
        ),
    )
}

pub fn plus() -> Term {
    lam("m", lam("n", apps(var("n"), [succ(), var("m")])))
}

/// Truncated subtraction.
pub fn minus() -> Term {
    lam("m", lam("n", apps(var("n"), [pred(), var("m")])))
}

pub fn mult() -> Term {
    lam("m", lam("n", lam("f", app(var("m"), app(var("n"), var("f"))))))
}

/// `power x y` is `x` raised to `y`.
pub fn power() -> Term {
    lam("x", lam("y", app(var("y"), var("x"))))
}

pub fn abs_diff() -> Term {
    lam(
        "x",
        lam(
            "y",
            apps(
                plus(),
                [
                    apps(minus(), [var("x"), var("y")]),
                    apps(minus(), [var("y"), var("x")]),
                ],
            ),
        ),
    )
}

pub fn tru() -> Term {
    lam("t", lam("f", var("t")))
}

pub fn fls() -> Term {
    lam("t", lam("f", var("f")))
}

pub fn and() -> Term {
    lam("p", lam("q", apps(var("p"), [var("q"), var("p")])))
}

pub fn or() -> Term {
    lam("p", lam("q", apps(var("p"), [var("p"), var("q")])))
}

pub fn not() -> Term {
    lam("c", apps(var("c"), [fls(), tru()]))
}

pub fn if_then_else() -> Term {
    lam("c", lam("t", lam("f", apps(var("c"), [var("t"), var("f")]))))
}

pub fn is_zero() -> Term {
    lam("n", apps(var("n"), [lam("_", fls()), tru()]))
}

pub fn leq() -> Term {
    lam(
        "m",
        lam("n", app(is_zero(), apps(minus(), [var("m"), var("n")]))),
    )
}

pub fn lt() -> Term {
    lam("m", lam("n", app(not(), apps(leq(), [var("n"), var("m")]))))
}

pub fn eq() -> Term {
    lam(
        "m",
        lam(
            "n",
            apps(
                and(),
                [
                    apps(leq(), [var("m"), var("n")]),
                    apps(leq(), [var("n"), var("m")]),
                ],
            ),
        ),
    )
}

pub fn neq() -> Term {
    lam(
        "m",
        lam(
            "n",
            apps(
                or(),
                [
                    app(not(), apps(leq(), [var("m"), var("n")])),
                    app(not(), apps(leq(), [var("n"), var("m")])),
                ],
            ),
        ),
    )
}

pub fn gt() -> Term {
    lam("m", lam("n", app(not(), apps(leq(), [var("m"), var("n")]))))
}

pub fn geq() -> Term {
    lam("m", lam("n", apps(leq(), [var("n"), var("m")])))
}

/// Forces a conditional's selected thunk.
pub fn null() -> Term {
    lam("x", tru())
}

/// `λf. (λx. f (λy. x x y)) (λx. f (λy. x x y))`
pub fn y() -> Term {
    let half = lam(
        "x",
        app(var("f"), lam("y", apps(var("x"), [var("x"), var("y")]))),
    );
    lam("f", app(half.clone(), half))
}

pub fn pair() -> Term {
    lam("x", lam("y", lam("f", apps(var("f"), [var("x"), var("y")]))))
}

pub fn left() -> Term {
    lam("p", app(var("p"), tru()))
}

pub fn right() -> Term {
    lam("p", app(var("p"), fls()))
}

pub fn triple() -> Term {
    lam(
        "x",
        lam(
            "y",
            lam("z", lam("f", apps(var("f"), [var("x"), var("y"), var("z")]))),
        ),
    )
}

/// A list cell is `triple head tail is_empty`.
pub fn cons() -> Term {
    lam("h", lam("t", apps(triple(), [var("h"), var("t"), fls()])))
}

pub fn empty() -> Term {
    apps(triple(), [zero(), zero(), tru()])
}

fn select(field: &str) -> Term {
    lam("l", app(var("l"), lam("h", lam("t", lam("n", var(field))))))
}

pub fn head() -> Term {
    select("h")
}

pub fn tail() -> Term {
    select("t")
}

pub fn is_empty() -> Term {
    select("n")
}

/// `if c (λ_. then) (λ_. otherwise) null`
fn branch(cond: Term, then: Term, otherwise: Term) -> Term {
    apps(
        if_then_else(),
        [cond, lam("_", then), lam("_", otherwise), null()],
    )
}

pub fn nth() -> Term {
    app(
        y(),
        lam(
            "f",
            lam(
                "l",
                lam(
                    "n",
                    branch(
                        app(is_zero(), var("n")),
                        app(head(), var("l")),
                        apps(
                            var("f"),
                            [app(tail(), var("l")), app(pred(), var("n"))],
                        ),
                    ),
                ),
            ),
        ),
    )
}

/// Left fold: `fold l m a`.
pub fn fold() -> Term {
    app(
        y(),
        lam(
            "f",
            lam(
                "l",
                lam(
                    "m",
                    lam(
                        "a",
                        branch(
                            app(is_empty(), var("l")),
                            var("a"),
                            apps(
                                var("f"),
                                [
                                    app(tail(), var("l")),
                                    var("m"),
                                    apps(var("m"), [var("a"), app(head(), var("l"))]),
                                ],
                            ),
                        ),
                    ),
                ),
            ),
        ),
    )
}

/// Maps and reverses in one pass.
pub fn map_right() -> Term {
    lam(
        "l",
        lam(
            "f",
            apps(
                fold(),
                [
                    var("l"),
                    lam(
                        "nl",
                        lam("m", apps(cons(), [app(var("f"), var("m")), var("nl")])),
                    ),
                    empty(),
                ],
            ),
        ),
    )
}

pub fn reverse() -> Term {
    lam("l", apps(map_right(), [var("l"), identity()]))
}

pub fn map() -> Term {
    lam(
        "l",
        lam("f", app(reverse(), apps(map_right(), [var("l"), var("f")]))),
    )
}

pub fn length() -> Term {
    lam(
        "l",
        apps(
            fold(),
            [var("l"), lam("len", lam("_", app(succ(), var("len")))), zero()],
        ),
    )
}

/// Keeps the elements satisfying `p`, in reverse order.
pub fn filter() -> Term {
    lam(
        "l",
        lam(
            "p",
            apps(
                fold(),
                [
                    var("l"),
                    lam(
                        "acc",
                        lam(
                            "m",
                            branch(
                                app(var("p"), var("m")),
                                apps(cons(), [var("m"), var("acc")]),
                                var("acc"),
                            ),
                        ),
                    ),
                    empty(),
                ],
            ),
        ),
    )
}

pub fn fibonacci() -> Term {
    app(
        y(),
        lam(
            "f",
            lam(
                "n",
                branch(
                    apps(leq(), [var("n"), numeral(1)]),
                    var("n"),
                    apps(
                        plus(),
                        [
                            app(var("f"), apps(minus(), [var("n"), numeral(1)])),
                            app(var("f"), apps(minus(), [var("n"), numeral(2)])),
                        ],
                    ),
                ),
            ),
        ),
    )
}

/// `succ (succ (... zero))`, `n` applications deep.
pub fn numeral(n: u64) -> Term {
    let succ = Rc::new(succ());
    let mut term = Rc::new(zero());
    for _ in 0..n {
        term = Rc::new(Term::App(Rc::clone(&succ), term));
    }
    Rc::try_unwrap(term).unwrap_or_else(|shared| (*shared).clone())
}

/// Every prelude definition, in the order `install` binds them.
pub fn definitions() -> Vec<(&'static str, Term)> {
    vec![
        ("identity", identity()),
        ("zero", zero()),
        ("succ", succ()),
        ("pred", pred()),
        ("plus", plus()),
        ("minus", minus()),
        ("mult", mult()),
        ("power", power()),
        ("abs_diff", abs_diff()),
        ("true", tru()),
        ("false", fls()),
        ("and", and()),
        ("or", or()),
        ("not", not()),
        ("if", if_then_else()),
        ("is_zero", is_zero()),
        ("leq", leq()),
        ("lt", lt()),
        ("eq", eq()),
        ("neq", neq()),
        ("gt", gt()),
        ("geq", geq()),
        ("null", null()),
        ("Y", y()),
        ("pair", pair()),
        ("left", left()),
        ("right", right()),
        ("triple", triple()),
        ("cons", cons()),
        ("empty", empty()),
        ("head", head()),
        ("tail", tail()),
        ("is_empty", is_empty()),
        ("nth", nth()),
        ("fold", fold()),
        ("map_right", map_right()),
        ("reverse", reverse()),
        ("map", map()),
        ("length", length()),
        ("filter", filter()),
        ("fibonacci", fibonacci()),
    ]
}

/// Evaluates every definition and binds it on top of `env`.
pub fn install(machine: &mut Machine, env: Env) -> Result<Env, RuntimeError> {
    let mut env = env;
    let started_at = machine.steps();
    for (name, term) in definitions() {
        let value = machine.eval(&Rc::new(term), &env)?;
        env = env.bind(name.into(), value);
    }
    debug!(steps = machine.steps() - started_at, "prelude installed");
    Ok(env)
}
