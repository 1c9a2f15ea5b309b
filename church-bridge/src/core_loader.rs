// Program loading from the JSON interchange form.
//
// Terms are tagged objects (CVar, CLam, CApp, CLet, CIntLit). Deserialization
// walks an explicit work stack so deeply nested terms never recurse. The
// parser itself runs without serde_json's recursion limit on a stack that
// serde_stacker grows on demand, and parsed documents are consumed node by
// node so they are torn down iteratively too.

use crate::core_ir::{Definition, Program, Term};
use crate::error::LoadError;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value as Json};
use std::fs;
use std::mem;
use std::path::Path;
use std::rc::Rc;
use std::sync::OnceLock;

static IDENTIFIER: OnceLock<Regex> = OnceLock::new();

fn identifier(name: &str) -> Result<Rc<str>, LoadError> {
    let pattern = IDENTIFIER
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_']*$").expect("identifier pattern"));
    if pattern.is_match(name) {
        Ok(name.into())
    } else {
        Err(LoadError::InvalidIdentifier(name.to_string()))
    }
}

fn malformed(msg: impl Into<String>) -> LoadError {
    LoadError::Malformed(msg.into())
}

/// Owned piece of a parsed document, dismantled without recursion on drop.
struct Node(Json);

impl Drop for Node {
    fn drop(&mut self) {
        let mut pending = vec![self.0.take()];
        while let Some(json) = pending.pop() {
            match json {
                Json::Array(items) => pending.extend(items),
                Json::Object(fields) => pending.extend(fields.into_iter().map(|(_, v)| v)),
                _ => {}
            }
        }
    }
}

pub fn load_program(path: impl AsRef<Path>) -> Result<Program, LoadError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.display().to_string(),
        source,
    })?;
    parse_program(&text)
}

pub fn parse_program(text: &str) -> Result<Program, LoadError> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    deserializer.disable_recursion_limit();
    let doc = Json::deserialize(serde_stacker::Deserializer::new(&mut deserializer))?;
    let doc = Node(doc);
    deserializer.end()?;
    program_from_json(doc.take())
}

impl Node {
    fn take(mut self) -> Json {
        self.0.take()
    }

    fn object(&mut self, what: &str) -> Result<&mut Map<String, Json>, LoadError> {
        self.0
            .as_object_mut()
            .ok_or_else(|| malformed(format!("{} must be an object", what)))
    }
}

pub fn program_from_json(doc: Json) -> Result<Program, LoadError> {
    let mut doc = Node(doc);
    let obj = doc.object("program")?;
    let defs = obj.remove("definitions").map(Node);
    let root = obj
        .remove("root")
        .map(Node)
        .ok_or_else(|| malformed("program missing root"))?;

    let mut definitions = Vec::new();
    if let Some(mut defs) = defs {
        let items: Vec<Node> = match &mut defs.0 {
            Json::Array(items) => mem::take(items).into_iter().map(Node).collect(),
            _ => return Err(malformed("'definitions' must be an array")),
        };
        for (idx, mut def) in items.into_iter().enumerate() {
            let fields = def.object(&format!("definition {}", idx))?;
            let name = match fields.remove("name") {
                Some(Json::String(name)) => name,
                _ => return Err(malformed(format!("definition {} missing name", idx))),
            };
            let term = fields
                .remove("term")
                .ok_or_else(|| malformed(format!("definition `{}` missing term", name)))?;
            definitions.push(Definition {
                name: identifier(&name)?,
                term: Rc::new(term_from_json(term)?),
            });
        }
    }

    Ok(Program {
        definitions,
        root: Rc::new(term_from_json(root.take())?),
    })
}

enum Work {
    Visit(Node),
    BuildLam(Rc<str>),
    BuildApp,
    BuildLet(Rc<str>),
}

fn field(obj: &mut Map<String, Json>, tag: &str, key: &str) -> Result<Node, LoadError> {
    obj.remove(key)
        .map(Node)
        .ok_or_else(|| malformed(format!("{} missing {}", tag, key)))
}

fn name_field(obj: &mut Map<String, Json>, tag: &str, key: &str) -> Result<Rc<str>, LoadError> {
    let node = field(obj, tag, key)?;
    let name = node
        .0
        .as_str()
        .ok_or_else(|| malformed(format!("{} {} must be a string", tag, key)))?;
    identifier(name)
}

fn pop_built(built: &mut Vec<Term>, what: &str) -> Result<Rc<Term>, LoadError> {
    built
        .pop()
        .map(Rc::new)
        .ok_or_else(|| malformed(format!("stack underflow: {}", what)))
}

pub fn term_from_json(json: Json) -> Result<Term, LoadError> {
    let mut work = vec![Work::Visit(Node(json))];
    let mut built: Vec<Term> = Vec::new();

    while let Some(item) = work.pop() {
        match item {
            Work::Visit(mut node) => {
                let obj = node.object("term")?;
                let tag = match obj.remove("tag") {
                    Some(Json::String(tag)) => tag,
                    _ => return Err(malformed("term missing 'tag' field")),
                };
                match tag.as_str() {
                    "CVar" => built.push(Term::Var(name_field(obj, &tag, "name")?)),
                    "CIntLit" => {
                        let n = field(obj, &tag, "value")?
                            .0
                            .as_i64()
                            .ok_or_else(|| malformed("CIntLit value must be an integer"))?;
                        built.push(Term::Int(n));
                    }
                    "CLam" => {
                        let param = name_field(obj, &tag, "param")?;
                        let body = field(obj, &tag, "body")?;
                        work.push(Work::BuildLam(param));
                        work.push(Work::Visit(body));
                    }
                    "CApp" => {
                        let arg = field(obj, &tag, "arg")?;
                        let func = field(obj, &tag, "func")?;
                        // func is visited first, so it sits below arg on `built`
                        work.push(Work::BuildApp);
                        work.push(Work::Visit(arg));
                        work.push(Work::Visit(func));
                    }
                    "CLet" => {
                        let name = name_field(obj, &tag, "name")?;
                        let value = field(obj, &tag, "value")?;
                        let body = field(obj, &tag, "body")?;
                        work.push(Work::BuildLet(name));
                        work.push(Work::Visit(body));
                        work.push(Work::Visit(value));
                    }
                    other => return Err(LoadError::UnknownTag(other.to_string())),
                }
            }
            Work::BuildLam(param) => {
                let body = pop_built(&mut built, "CLam body")?;
                built.push(Term::Lam(param, body));
            }
            Work::BuildApp => {
                let arg = pop_built(&mut built, "CApp arg")?;
                let func = pop_built(&mut built, "CApp func")?;
                built.push(Term::App(func, arg));
            }
            Work::BuildLet(name) => {
                let body = pop_built(&mut built, "CLet body")?;
                let value = pop_built(&mut built, "CLet value")?;
                built.push(Term::Let(name, value, body));
            }
        }
    }

    built
        .pop()
        .ok_or_else(|| malformed("empty result stack after deserialization"))
}
