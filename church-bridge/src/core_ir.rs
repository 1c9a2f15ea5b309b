use std::collections::BTreeSet;
use std::fmt;
use std::mem;
use std::rc::Rc;

/// Untyped lambda terms as handed over by the code generator.
#[derive(Clone, Debug, PartialEq)]
pub enum Term {
    Var(Rc<str>),
    Lam(Rc<str>, Rc<Term>),
    App(Rc<Term>, Rc<Term>),
    /// `let name = value in body`, the lowered form of a top-level definition.
    Let(Rc<str>, Rc<Term>, Rc<Term>),
    /// Host integer. Only ever meaningful as a seed; never a function.
    Int(i64),
}

pub fn var(name: &str) -> Term {
    Term::Var(name.into())
}

pub fn lam(param: &str, body: Term) -> Term {
    Term::Lam(param.into(), Rc::new(body))
}

pub fn app(func: Term, arg: Term) -> Term {
    Term::App(Rc::new(func), Rc::new(arg))
}

/// Left-nested application: `apps(f, [a, b])` is `((f a) b)`.
pub fn apps(func: Term, args: impl IntoIterator<Item = Term>) -> Term {
    args.into_iter().fold(func, app)
}

pub fn let_in(name: &str, value: Term, body: Term) -> Term {
    Term::Let(name.into(), Rc::new(value), Rc::new(body))
}

impl Term {
    /// Number of nodes, counted without recursion.
    pub fn size(&self) -> usize {
        let mut pending = vec![self];
        let mut count = 0;
        while let Some(term) = pending.pop() {
            count += 1;
            match term {
                Term::Var(_) | Term::Int(_) => {}
                Term::Lam(_, body) => pending.push(body),
                Term::App(func, arg) => {
                    pending.push(func);
                    pending.push(arg);
                }
                Term::Let(_, value, body) => {
                    pending.push(value);
                    pending.push(body);
                }
            }
        }
        count
    }

    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut free = BTreeSet::new();
        let mut bound: Vec<&str> = Vec::new();
        let mut pending = vec![Walk::Visit(self)];
        while let Some(step) = pending.pop() {
            match step {
                Walk::Bind(name) => bound.push(name),
                Walk::Unbind => {
                    bound.pop();
                }
                Walk::Visit(term) => match term {
                    Term::Var(name) => {
                        if !bound.contains(&&**name) {
                            free.insert(name.to_string());
                        }
                    }
                    Term::Int(_) => {}
                    Term::Lam(param, body) => {
                        pending.push(Walk::Unbind);
                        pending.push(Walk::Visit(body));
                        pending.push(Walk::Bind(param));
                    }
                    Term::App(func, arg) => {
                        pending.push(Walk::Visit(arg));
                        pending.push(Walk::Visit(func));
                    }
                    Term::Let(name, value, body) => {
                        pending.push(Walk::Unbind);
                        pending.push(Walk::Visit(body));
                        pending.push(Walk::Bind(name));
                        pending.push(Walk::Visit(value));
                    }
                },
            }
        }
        free
    }

    pub fn is_closed(&self) -> bool {
        self.free_variables().is_empty()
    }

    /// Compact JSON in the tagged Core form read back by `core_loader`.
    pub fn to_json(&self) -> String {
        let mut out = String::new();
        self.write_json(&mut out);
        out
    }

    pub fn write_json(&self, out: &mut String) {
        let mut pending = vec![Piece::Term(self)];
        while let Some(piece) = pending.pop() {
            let term = match piece {
                Piece::Text(text) => {
                    out.push_str(text);
                    continue;
                }
                Piece::Term(term) => term,
            };
            match term {
                Term::Var(name) => {
                    out.push_str(r#"{"tag":"CVar","name":"#);
                    push_quoted(out, name);
                    out.push('}');
                }
                Term::Int(n) => out.push_str(&format!(r#"{{"tag":"CIntLit","value":{}}}"#, n)),
                Term::Lam(param, body) => {
                    out.push_str(r#"{"tag":"CLam","param":"#);
                    push_quoted(out, param);
                    out.push_str(r#","body":"#);
                    pending.push(Piece::Text("}"));
                    pending.push(Piece::Term(body));
                }
                Term::App(func, arg) => {
                    out.push_str(r#"{"tag":"CApp","func":"#);
                    pending.push(Piece::Text("}"));
                    pending.push(Piece::Term(arg));
                    pending.push(Piece::Text(r#","arg":"#));
                    pending.push(Piece::Term(func));
                }
                Term::Let(name, value, body) => {
                    out.push_str(r#"{"tag":"CLet","name":"#);
                    push_quoted(out, name);
                    out.push_str(r#","value":"#);
                    pending.push(Piece::Text("}"));
                    pending.push(Piece::Term(body));
                    pending.push(Piece::Text(r#","body":"#));
                    pending.push(Piece::Term(value));
                }
            }
        }
    }
}

enum Walk<'a> {
    Visit(&'a Term),
    Bind(&'a str),
    Unbind,
}

/// Output fragment still to be written; terms expand into more pieces.
enum Piece<'a> {
    Term(&'a Term),
    Text(&'static str),
}

fn push_quoted(out: &mut String, text: &str) {
    out.push_str(&serde_json::Value::from(text).to_string());
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pending = vec![Piece::Term(self)];
        while let Some(piece) = pending.pop() {
            let term = match piece {
                Piece::Text(text) => {
                    f.write_str(text)?;
                    continue;
                }
                Piece::Term(term) => term,
            };
            match term {
                Term::Var(name) => f.write_str(name)?,
                Term::Int(n) => write!(f, "{}", n)?,
                Term::Lam(param, body) => {
                    write!(f, "(λ{}.", param)?;
                    pending.push(Piece::Text(")"));
                    pending.push(Piece::Term(body));
                }
                Term::App(func, arg) => {
                    f.write_str("(")?;
                    pending.push(Piece::Text(")"));
                    pending.push(Piece::Term(arg));
                    pending.push(Piece::Text(" "));
                    pending.push(Piece::Term(func));
                }
                Term::Let(name, value, body) => {
                    write!(f, "(let {} = ", name)?;
                    pending.push(Piece::Text(")"));
                    pending.push(Piece::Term(body));
                    pending.push(Piece::Text(" in "));
                    pending.push(Piece::Term(value));
                }
            }
        }
        Ok(())
    }
}

// Successor chains run hundreds of thousands of nodes deep, so uniquely owned
// children are unlinked onto a worklist instead of dropped recursively.
impl Drop for Term {
    fn drop(&mut self) {
        let mut pending: Vec<Rc<Term>> = Vec::new();
        detach_children(self, &mut pending);
        while let Some(child) = pending.pop() {
            if let Ok(mut term) = Rc::try_unwrap(child) {
                detach_children(&mut term, &mut pending);
            }
        }
    }
}

fn detach_children(term: &mut Term, pending: &mut Vec<Rc<Term>>) {
    match term {
        Term::Var(_) | Term::Int(_) => {}
        Term::Lam(_, body) => detach(body, pending),
        Term::App(func, arg) => {
            detach(func, pending);
            detach(arg, pending);
        }
        Term::Let(_, value, body) => {
            detach(value, pending);
            detach(body, pending);
        }
    }
}

fn detach(child: &mut Rc<Term>, pending: &mut Vec<Rc<Term>>) {
    // shared children only lose a count here
    if Rc::strong_count(child) == 1 {
        pending.push(mem::replace(child, Rc::new(Term::Int(0))));
    }
}

/// A named top-level definition of a compiled program.
#[derive(Clone, Debug, PartialEq)]
pub struct Definition {
    pub name: Rc<str>,
    pub term: Rc<Term>,
}

impl Definition {
    pub fn new(name: &str, term: Term) -> Self {
        Definition {
            name: name.into(),
            term: Rc::new(term),
        }
    }
}

/// Compiled program: definitions in order, then the root term that is
/// expected to end in a single call to `show`.
#[derive(Clone, Debug, PartialEq)]
pub struct Program {
    pub definitions: Vec<Definition>,
    pub root: Rc<Term>,
}

impl Program {
    pub fn new(root: Term) -> Self {
        Program {
            definitions: Vec::new(),
            root: Rc::new(root),
        }
    }

    pub fn define(mut self, name: &str, term: Term) -> Self {
        self.definitions.push(Definition::new(name, term));
        self
    }

    /// Names the program uses but neither defines nor binds.
    pub fn free_variables(&self) -> BTreeSet<String> {
        let mut free = BTreeSet::new();
        let mut defined: Vec<&str> = Vec::new();
        for def in &self.definitions {
            free.extend(
                def.term
                    .free_variables()
                    .into_iter()
                    .filter(|name| !defined.contains(&name.as_str())),
            );
            defined.push(&def.name);
        }
        free.extend(
            self.root
                .free_variables()
                .into_iter()
                .filter(|name| !defined.contains(&name.as_str())),
        );
        free
    }

    /// The program file form: `{"definitions":[{"name":..,"term":..}],"root":..}`.
    pub fn to_json(&self) -> String {
        let mut out = String::from(r#"{"definitions":["#);
        for (idx, def) in self.definitions.iter().enumerate() {
            if idx > 0 {
                out.push(',');
            }
            out.push_str(r#"{"name":"#);
            push_quoted(&mut out, &def.name);
            out.push_str(r#","term":"#);
            def.term.write_json(&mut out);
            out.push('}');
        }
        out.push_str(r#"],"root":"#);
        self.root.write_json(&mut out);
        out.push('}');
        out
    }

    /// Human-readable overview used by `church-bridge inspect`.
    pub fn summary(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("definitions: {}\n", self.definitions.len()));
        for def in &self.definitions {
            out.push_str(&format!("  {} (size {})\n", def.name, def.term.size()));
        }
        out.push_str(&format!("root size: {}\n", self.root.size()));
        let free: Vec<String> = self.free_variables().into_iter().collect();
        if free.is_empty() {
            out.push_str("free variables: none\n");
        } else {
            out.push_str(&format!("free variables: {}\n", free.join(", ")));
        }
        out.push_str(&format!("root: {}\n", self.root));
        out
    }
}
