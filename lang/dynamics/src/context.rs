//! Contexts are the frames of a process's stack; reified closures and
//! continuations are the values that capture them.

use crate::{err::*, frame::*, list::*, stage::ReceiverId, value::*};
use blox_syntax::prelude::*;
use im::Vector;
use std::{rc::Rc, time::Instant};

/* ------------------------------- Expression ------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Marker {
    /// end the current step, unless warping
    Yield,
    /// leave the innermost warp region
    StopWarping,
    /// stop the process
    Stop,
}

/// What a context is evaluating.
#[derive(Clone, Debug)]
pub enum Expression {
    Block(RcBlock),
    Sequence(Script),
    /// the items of a variadic slot, collected into a list
    Variadic(Rc<[Slot]>),
    /// a lone slot captured by an unevaluated input
    Slot(Rc<Slot>),
    Marker(Marker),
    Empty,
}

impl Expression {
    pub fn block(&self) -> Option<&RcBlock> {
        match self {
            | Expression::Block(block) => Some(block),
            | _ => None,
        }
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, Expression::Sequence(_))
    }

    pub fn is_marker(&self, marker: Marker) -> bool {
        matches!(self, Expression::Marker(m) if *m == marker)
    }

    pub fn mark_empty_slots(&self, counter: &mut usize) -> Expression {
        match self {
            | Expression::Block(block) => Expression::Block(Rc::new(block.mark_empty_slots(counter))),
            | Expression::Sequence(script) => Expression::Sequence(script.mark_empty_slots(counter)),
            | Expression::Variadic(items) => {
                Expression::Variadic(items.iter().map(|item| item.mark_empty_slots(counter)).collect())
            }
            | other => other.clone(),
        }
    }

    /// a copy whose `idx`-th input reads the first argument of a call
    fn with_bound_input(&self, idx: usize) -> Option<Expression> {
        match self {
            | Expression::Block(block) => {
                block.with_bound_input(idx).map(|block| Expression::Block(Rc::new(block)))
            }
            | Expression::Variadic(items) => {
                let mut items = items.to_vec();
                items.get_mut(idx)?.bind_first();
                Some(Expression::Variadic(items.into()))
            }
            | _ => None,
        }
    }
}

/* --------------------------------- Context -------------------------------- */

/// Progress of a `map` over a list, kept across steps.
#[derive(Clone, Debug, Default)]
pub struct MapState {
    pub results: Vec<Value>,
    /// the unvisited part of a linked source
    pub cursor: Option<ListRef>,
    /// a call is out and its result has not been collected
    pub pending: bool,
}

#[derive(Clone, Debug)]
pub struct Context {
    pub expression: Expression,
    pub pc: usize,
    pub inputs: Vec<Value>,
    pub scope: FrameRef,
    pub upvars: Option<UpvarRef>,
    pub receiver: ReceiverId,
    pub is_lambda: bool,
    pub is_implicit_lambda: bool,
    pub empty_slots: usize,
    pub start_time: Option<Instant>,
    /// processes a broadcast-and-wait is waiting on
    pub active_sends: Option<Vec<crate::threads::ProcessId>>,
    pub map: Option<MapState>,
}

impl Context {
    pub fn new(expression: Expression, scope: FrameRef, receiver: ReceiverId) -> Self {
        Context {
            expression,
            pc: 0,
            inputs: Vec::new(),
            scope,
            upvars: None,
            receiver,
            is_lambda: false,
            is_implicit_lambda: false,
            empty_slots: 0,
            start_time: None,
            active_sends: None,
            map: None,
        }
    }

    /// a context for a sub-expression, in the same scope
    pub fn child(&self, expression: Expression) -> Context {
        Context {
            upvars: self.upvars.clone(),
            ..Context::new(expression, self.scope.clone(), self.receiver)
        }
    }

    /// a child that takes over this context's boundary flags
    pub fn branch(&self, expression: Expression) -> Context {
        Context {
            is_lambda: self.is_lambda,
            is_implicit_lambda: self.is_implicit_lambda,
            ..self.child(expression)
        }
    }

    /// whether this context is collecting inputs and expects a value next
    pub fn awaits_input(&self) -> bool {
        match &self.expression {
            | Expression::Block(block) => {
                block.ring_kind().is_none() && self.inputs.len() < block.inputs.len()
            }
            | Expression::Variadic(items) => self.inputs.len() < items.len(),
            | _ => false,
        }
    }
}

/* --------------------------------- Reified -------------------------------- */

#[derive(Debug)]
pub enum Reified {
    Lambda(Lambda),
    Continuation(Continuation),
}

#[derive(Debug)]
pub struct Lambda {
    pub expression: Expression,
    pub kind: RingKind,
    /// formal parameter names; empty means implicit binding
    pub params: Vec<Rc<str>>,
    pub empty_slots: usize,
    pub scope: FrameRef,
    pub receiver: ReceiverId,
    /// reified from a C-slot or reporter slot rather than a ring
    pub is_implicit: bool,
}

#[derive(Clone, Debug)]
pub struct Continuation {
    pub stack: Vector<Context>,
}

impl Reified {
    pub fn kind(&self) -> RingKind {
        match self {
            | Reified::Lambda(lambda) => lambda.kind,
            | Reified::Continuation(cont) => match cont.stack.back() {
                | Some(top) if !top.expression.is_sequence() => RingKind::Reporter,
                | _ => RingKind::Command,
            },
        }
    }
}

impl Lambda {
    /// Binds `args` into a fresh scope: to the formals when there are any,
    /// else to the empty slots. The whole list is always bound as well.
    pub fn bind(&self, args: &[Value]) -> Result<FrameRef> {
        let outer = FrameRef::new(Some(self.scope.clone()));
        outer.add_var(VarKey::Arguments, Value::list(args.to_vec()));
        if args.is_empty() {
            return Ok(outer);
        }
        for (i, name) in self.params.iter().enumerate() {
            let value = match args.get(i) {
                | Some(Value::Nothing) | None => Value::Number(0.0),
                | Some(value) => value.clone(),
            };
            outer.add_var(name.clone(), value);
        }
        if self.params.is_empty() {
            if args.len() == 1 {
                for slot in 1..=self.empty_slots {
                    outer.add_var(VarKey::Binding(slot), args[0].clone());
                }
            } else if args.len() == self.empty_slots {
                for (i, arg) in args.iter().enumerate() {
                    outer.add_var(VarKey::Binding(i + 1), arg.clone());
                }
            } else if self.empty_slots != 1 {
                Err(EvalError::Arity { expected: self.empty_slots, found: args.len() })?
            }
        }
        Ok(outer)
    }

    /// The context that runs this closure with `args`. Command bodies run as
    /// sequences, even when reified from a single block.
    pub fn runnable(&self, args: &[Value], upvars: Option<UpvarRef>) -> Result<Context> {
        let scope = self.bind(args)?;
        let expression = match &self.expression {
            | Expression::Block(block) if !block.is_reporter() => {
                Expression::Sequence(Script::new(vec![block.clone()]))
            }
            | expression => expression.clone(),
        };
        Ok(Context {
            is_lambda: true,
            is_implicit_lambda: self.is_implicit,
            upvars,
            ..Context::new(expression, scope, self.receiver)
        })
    }

    /// whether the body reports a value
    pub fn is_reporter(&self) -> bool {
        matches!(&self.expression, Expression::Block(block) if block.is_reporter())
    }
}

impl Continuation {
    /// The rest of the computation after the block on top of `stack`. A
    /// reporter continuation is primed so that calling it with one argument
    /// fills the slot the block's value would have gone to.
    pub fn capture(stack: &Vector<Context>) -> Continuation {
        let mut below = stack.clone();
        let Some(top) = below.pop_back() else { return Continuation { stack: below } };
        if top.expression.is_sequence() {
            below.push_back(top);
            return Continuation { stack: below };
        }
        let Some(parent) = below.back_mut() else {
            below.push_back(top.child(Expression::Marker(Marker::Stop)));
            return Continuation { stack: below };
        };
        if !parent.expression.is_sequence() {
            let pos = parent.inputs.len();
            if let Some(bound) = parent.expression.with_bound_input(pos) {
                parent.expression = bound;
            }
            parent.empty_slots = 1;
            for ctx in below.iter_mut() {
                ctx.inputs.clear();
            }
        }
        Continuation { stack: below }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn lambda(empty_slots: usize, params: &[&str]) -> Lambda {
        Lambda {
            expression: Expression::Empty,
            kind: RingKind::Reporter,
            params: params.iter().map(|p| Rc::from(*p)).collect(),
            empty_slots,
            scope: FrameRef::new(None),
            receiver: ReceiverId::default(),
            is_implicit: false,
        }
    }

    fn read(frame: &FrameRef, key: VarKey) -> String {
        frame.get_var(&key, None).unwrap().to_string()
    }

    #[test]
    fn one_argument_fills_every_empty_slot() {
        let frame = lambda(2, &[]).bind(&[Value::Number(5.0)]).unwrap();
        assert_eq!(read(&frame, VarKey::Binding(1)), "5");
        assert_eq!(read(&frame, VarKey::Binding(2)), "5");
        assert_eq!(read(&frame, VarKey::Arguments), "[5]");
    }

    #[test]
    fn matching_counts_bind_in_order() {
        let frame = lambda(2, &[]).bind(&["a".into(), "b".into()]).unwrap();
        assert_eq!(read(&frame, VarKey::Binding(2)), "b");
    }

    #[test]
    fn mismatched_counts_are_arity_errors() {
        let err = lambda(2, &[]).bind(&[1.0.into(), 2.0.into(), 3.0.into()]).unwrap_err();
        assert_eq!(err, EvalError::Arity { expected: 2, found: 3 });
        assert!(lambda(1, &[]).bind(&[1.0.into(), 2.0.into()]).is_ok());
    }

    #[test]
    fn formals_take_precedence() {
        let frame = lambda(3, &["x", "y"]).bind(&[7.0.into()]).unwrap();
        assert_eq!(read(&frame, "x".into()), "7");
        assert_eq!(read(&frame, "y".into()), "0");
        assert_eq!(read(&frame, VarKey::Binding(1)), "");
    }

    #[test]
    fn reporter_continuation_binds_the_waiting_slot() {
        let scope = FrameRef::new(None);
        let join = Block::build(Selector::ReportJoinWords, vec![Arg::Items(vec![
            Arg::text("a"),
            Arg::Empty,
        ])])
        .unwrap();
        let Content::Items(items) = &join.inputs[0].content else { panic!("variadic") };
        let seq = Context::new(Expression::Sequence(Script::default()), scope.clone(), ReceiverId::default());
        let mut words = seq.child(Expression::Variadic(items.clone()));
        words.inputs.push("a".into());
        let call = words.child(Expression::Empty);
        let stack: Vector<Context> = vec![seq, words, call].into_iter().collect();
        let cont = Continuation::capture(&stack);
        assert_eq!(cont.stack.len(), 2);
        let top = cont.stack.back().unwrap();
        assert!(top.inputs.is_empty());
        assert_eq!(top.empty_slots, 1);
        let Expression::Variadic(items) = &top.expression else { panic!("variadic") };
        assert_eq!(items[1].binding, Some(Binding::Slot(1)));
        assert_eq!(Reified::Continuation(cont).kind(), RingKind::Reporter);
    }
}
