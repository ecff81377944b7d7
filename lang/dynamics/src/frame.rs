//! Variable scopes. A frame maps names to values and falls back to its
//! parent; upvar references alias a caller-visible name to a variable in
//! another frame.

use crate::{err::*, list::List, value::*};
use blox_syntax::prelude::Binding;
use indexmap::IndexMap;
use std::{cell::RefCell, fmt, rc::Rc};

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VarKey {
    Name(Rc<str>),
    /// the n-th empty slot of a closure
    Binding(usize),
    /// the whole argument list of a closure call
    Arguments,
}

impl From<&str> for VarKey {
    fn from(name: &str) -> Self {
        VarKey::Name(name.into())
    }
}

impl From<Rc<str>> for VarKey {
    fn from(name: Rc<str>) -> Self {
        VarKey::Name(name)
    }
}

impl From<Binding> for VarKey {
    fn from(binding: Binding) -> Self {
        match binding {
            | Binding::Slot(n) => VarKey::Binding(n),
            | Binding::Arguments => VarKey::Arguments,
        }
    }
}

impl fmt::Display for VarKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            | VarKey::Name(name) => f.write_str(name),
            | VarKey::Binding(n) => write!(f, "{}", n),
            | VarKey::Arguments => f.write_str("arguments"),
        }
    }
}

/* ---------------------------------- Frame --------------------------------- */

#[derive(Default)]
pub struct VariableFrame {
    vars: IndexMap<VarKey, Value>,
    parent: Option<FrameRef>,
}

#[derive(Clone)]
pub struct FrameRef(Rc<RefCell<VariableFrame>>);

/// Reading a declared but unset variable gives 0.
fn or_zero(value: Value) -> Value {
    match value {
        | Value::Nothing => Value::Number(0.0),
        | value => value,
    }
}

impl FrameRef {
    pub fn new(parent: Option<FrameRef>) -> Self {
        FrameRef(Rc::new(RefCell::new(VariableFrame { vars: IndexMap::new(), parent })))
    }

    pub fn parent(&self) -> Option<FrameRef> {
        self.0.borrow().parent.clone()
    }

    pub fn ptr_eq(&self, other: &FrameRef) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// the nearest frame on the parent chain that declares `key`
    pub fn silent_find(&self, key: &VarKey) -> Option<FrameRef> {
        let mut frame = self.clone();
        loop {
            let parent = {
                let inner = frame.0.borrow();
                if inner.vars.contains_key(key) {
                    drop(inner);
                    return Some(frame);
                }
                inner.parent.clone()
            };
            frame = parent?;
        }
    }

    pub fn find(&self, key: &VarKey) -> Result<FrameRef> {
        self.silent_find(key).ok_or_else(|| EvalError::UndeclaredVariable(key.to_string()))
    }

    /// declares `key` in this frame, shadowing any outer declaration
    pub fn add_var(&self, key: impl Into<VarKey>, value: Value) {
        self.0.borrow_mut().vars.insert(key.into(), value);
    }

    /// the value stored in this frame itself, ignoring parents
    pub fn local(&self, key: &VarKey) -> Option<Value> {
        self.0.borrow().vars.get(key).cloned()
    }

    pub fn get_var(&self, key: &VarKey, upvars: Option<&UpvarReference>) -> Result<Value> {
        if let Some(frame) = self.silent_find(key) {
            return Ok(or_zero(frame.local(key).unwrap_or(Value::Nothing)));
        }
        match key {
            | VarKey::Binding(_) => Ok(Value::text("")),
            | VarKey::Arguments => Ok(List::default().into()),
            | VarKey::Name(name) => match upvars.and_then(|upvars| upvars.resolve(name)) {
                | Some((target, frame)) => {
                    Ok(or_zero(frame.local(&VarKey::Name(target)).unwrap_or(Value::Nothing)))
                }
                | None => Err(EvalError::UndeclaredVariable(name.to_string())),
            },
        }
    }

    /// The frame and key that a write to `key` lands in: the lexical
    /// declaration if there is one, else the aliased variable.
    fn target(&self, key: &VarKey, upvars: Option<&UpvarReference>) -> Result<(FrameRef, VarKey)> {
        if let Some(frame) = self.silent_find(key) {
            return Ok((frame, key.clone()));
        }
        if let (VarKey::Name(name), Some(upvars)) = (key, upvars) {
            if let Some((target, frame)) = upvars.resolve(name) {
                return Ok((frame, VarKey::Name(target)));
            }
        }
        Err(EvalError::UndeclaredVariable(key.to_string()))
    }

    pub fn set_var(&self, key: &VarKey, value: Value, upvars: Option<&UpvarReference>) -> Result<()> {
        let (frame, key) = self.target(key, upvars)?;
        frame.add_var(key, value);
        Ok(())
    }

    /// Adds `delta` to a variable; a variable that does not read as a
    /// number is overwritten with `delta` instead.
    pub fn change_var(
        &self, key: &VarKey, delta: &Value, upvars: Option<&UpvarReference>,
    ) -> Result<()> {
        let (frame, key) = self.target(key, upvars)?;
        let old = frame.local(&key).unwrap_or(Value::Nothing).parse_float();
        let new = if old.is_nan() { delta.clone() } else { Value::Number(old + delta.parse_float()) };
        frame.add_var(key, new);
        Ok(())
    }

    /// names declared in this frame, in declaration order
    pub fn names(&self) -> Vec<Rc<str>> {
        self.0
            .borrow()
            .vars
            .keys()
            .filter_map(|key| match key {
                | VarKey::Name(name) => Some(name.clone()),
                | _ => None,
            })
            .collect()
    }

    /// a shallow copy with the same parent
    pub fn copy(&self) -> FrameRef {
        let inner = self.0.borrow();
        FrameRef(Rc::new(RefCell::new(VariableFrame {
            vars: inner.vars.clone(),
            parent: inner.parent.clone(),
        })))
    }
}

impl fmt::Debug for FrameRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Frame").field(&self.names()).finish()
    }
}

/* --------------------------------- Upvars --------------------------------- */

pub type UpvarRef = Rc<UpvarReference>;

/// Aliases from a caller-visible name to a variable held elsewhere.
#[derive(Debug, Default)]
pub struct UpvarReference {
    vars: IndexMap<Rc<str>, (Rc<str>, FrameRef)>,
    parent: Option<UpvarRef>,
}

impl UpvarReference {
    pub fn new(parent: Option<UpvarRef>) -> Self {
        UpvarReference { vars: IndexMap::new(), parent }
    }

    pub fn add_reference(&mut self, alias: Rc<str>, target: Rc<str>, frame: FrameRef) {
        self.vars.insert(alias, (target, frame));
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn resolve(&self, alias: &str) -> Option<(Rc<str>, FrameRef)> {
        let mut layer = self;
        loop {
            if let Some((target, frame)) = layer.vars.get(alias) {
                return Some((target.clone(), frame.clone()));
            }
            layer = layer.parent.as_deref()?;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_walks_the_parents() {
        let globals = FrameRef::new(None);
        globals.add_var("score", Value::Number(4.0));
        let local = FrameRef::new(Some(globals.clone()));
        local.add_var("tmp", Value::Nothing);
        assert_eq!(local.get_var(&"score".into(), None).unwrap().to_string(), "4");
        assert_eq!(local.get_var(&"tmp".into(), None).unwrap().to_string(), "0");
        assert!(local.silent_find(&"score".into()).unwrap().ptr_eq(&globals));
        assert_eq!(local.names(), vec![Rc::from("tmp")]);
    }

    #[test]
    fn undeclared_names_fail() {
        let frame = FrameRef::new(None);
        assert_eq!(
            frame.set_var(&"ghost".into(), Value::Nothing, None),
            Err(EvalError::UndeclaredVariable("ghost".into()))
        );
        assert_eq!(frame.get_var(&VarKey::Binding(2), None).unwrap().to_string(), "");
    }

    #[test]
    fn change_parses_the_old_value() {
        let frame = FrameRef::new(None);
        frame.add_var("n", Value::text("3 apples"));
        frame.change_var(&"n".into(), &Value::Number(2.0), None).unwrap();
        assert_eq!(frame.local(&"n".into()).unwrap().to_string(), "5");
        frame.add_var("w", Value::text("word"));
        frame.change_var(&"w".into(), &Value::text("7"), None).unwrap();
        assert_eq!(frame.local(&"w".into()).unwrap().to_string(), "7");
    }

    #[test]
    fn upvars_read_and_write_through() {
        let block = FrameRef::new(None);
        block.add_var("item", Value::Number(1.0));
        let mut upvars = UpvarReference::new(None);
        upvars.add_reference("x".into(), "item".into(), block.clone());
        let caller = FrameRef::new(None);
        assert_eq!(caller.get_var(&"x".into(), Some(&upvars)).unwrap().to_string(), "1");
        caller.set_var(&"x".into(), Value::Number(9.0), Some(&upvars)).unwrap();
        assert_eq!(block.local(&"item".into()).unwrap().to_string(), "9");
    }
}
