//! A process evaluates one script cooperatively. Its stack of contexts is a
//! persistent vector, so capturing a continuation is a cheap copy that
//! later evaluation never disturbs.

use crate::{
    context::*,
    err::*,
    frame::*,
    prims::{self, Outcome},
    stage::*,
    threads::*,
    value::*,
};
use blox_syntax::prelude::*;
use derive_more::From;
use im::Vector;
use std::{
    rc::Rc,
    time::{Duration, Instant},
};

/// How reading a slot turns out: a value right away, or an expression that
/// must be evaluated in a context of its own first.
#[derive(From)]
enum Read {
    Value(Value),
    Push(Expression),
}

pub struct Process {
    pub id: ProcessId,
    /// the script this process runs, if it was started from one
    pub script: Option<ScriptId>,
    /// the receiver the process was started on
    pub receiver: ReceiverId,
    stack: Vector<Context>,
    /// values reported past the bottom of the stack
    home: Vec<Value>,
    reports_result: bool,
    ready_to_yield: bool,
    ready_to_terminate: bool,
    pub is_dead: bool,
    error: Option<EvalError>,
    is_atomic: bool,
    is_paused: bool,
    pause_offset: Option<Duration>,
    last_yield: Instant,
    frame_count: u64,
}

impl Process {
    /// A process for a top-level script. Its first step only yields, so a
    /// fresh process never runs ahead of the ones started with it.
    pub fn new(
        script: Option<ScriptId>, body: &Script, receiver: ReceiverId, frame: &FrameRef,
    ) -> Self {
        let home = FrameRef::new(Some(frame.clone()));
        let top = Context::new(Expression::Sequence(body.body()), home, receiver);
        let mut proc = Process::with_stack(receiver, vec![top]);
        proc.script = script;
        proc.reports_result = body.lone_reporter().is_some();
        proc.push_marker(Marker::Yield);
        proc
    }

    pub fn with_stack(receiver: ReceiverId, contexts: Vec<Context>) -> Self {
        let stack: Vector<Context> = contexts.into_iter().collect();
        Process {
            id: ProcessId::default(),
            script: None,
            receiver,
            stack,
            home: Vec::new(),
            reports_result: false,
            ready_to_yield: false,
            ready_to_terminate: false,
            is_dead: false,
            error: None,
            is_atomic: false,
            is_paused: false,
            pause_offset: None,
            last_yield: Instant::now(),
            frame_count: 0,
        }
    }

    /* --------------------------------- Queries -------------------------------- */

    pub fn is_running(&self) -> bool {
        !self.stack.is_empty() && !self.ready_to_terminate
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn is_atomic(&self) -> bool {
        self.is_atomic
    }

    pub fn error(&self) -> Option<&EvalError> {
        self.error.as_ref()
    }

    /// the first value reported past the bottom of the stack
    pub fn result(&self) -> Option<&Value> {
        self.home.first()
    }

    /// whether the script is a lone reporter run for its value
    pub fn reports_result(&self) -> bool {
        self.reports_result
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /* ---------------------------------- Stack --------------------------------- */

    pub(crate) fn top(&self) -> Option<&Context> {
        self.stack.back()
    }

    pub(crate) fn top_mut(&mut self) -> Option<&mut Context> {
        self.stack.back_mut()
    }

    /// the context below the top one
    pub(crate) fn parent(&self) -> Option<&Context> {
        self.stack.len().checked_sub(2).and_then(|idx| self.stack.get(idx))
    }

    pub(crate) fn push(&mut self, ctx: Context) {
        self.stack.push_back(ctx);
    }

    pub(crate) fn pop(&mut self) -> Option<Context> {
        self.stack.pop_back()
    }

    pub(crate) fn stack(&self) -> &Vector<Context> {
        &self.stack
    }

    pub(crate) fn replace_stack(&mut self, stack: Vector<Context>) {
        self.stack = stack;
    }

    /// pushes a marker in the scope of the current top
    pub(crate) fn push_marker(&mut self, marker: Marker) {
        if let Some(ctx) = self.top().map(|top| top.child(Expression::Marker(marker))) {
            self.push(ctx);
        }
    }

    pub(crate) fn set_atomic(&mut self, atomic: bool) {
        self.is_atomic = atomic;
    }

    /// Hands a value to whatever waits below the top context.
    fn return_value_to_parent(&mut self, value: Value) {
        let len = self.stack.len();
        match len.checked_sub(2).and_then(|idx| self.stack.get_mut(idx)) {
            | Some(parent) => parent.inputs.push(value),
            | None => self.home.push(value),
        }
    }

    /// the top context reports `value` and is done
    fn report(&mut self, value: Value) {
        self.return_value_to_parent(value);
        self.pop();
    }

    /// The top context is done without a value. A closure body ending this
    /// way still answers a caller that waits for a value, with nothing.
    pub(crate) fn finish(&mut self) {
        let Some(done) = self.pop() else { return };
        if !done.is_lambda {
            return;
        }
        // an atomic custom block answers past its warp marker
        let len = self.stack.len();
        let caller = match self.top() {
            | Some(top) if top.expression.is_marker(Marker::StopWarping) => len.checked_sub(2),
            | _ => len.checked_sub(1),
        };
        if let Some(caller) = caller.and_then(|idx| self.stack.get_mut(idx)) {
            if caller.awaits_input() {
                caller.inputs.push(Value::Nothing);
            }
        }
    }

    /// the script in the `idx`-th C-slot of the block on top
    pub(crate) fn script_at(&self, idx: usize) -> Script {
        (self.top().and_then(|top| top.expression.block()))
            .and_then(|block| block.script_at(idx))
            .unwrap_or_default()
    }

    /// Keeps the top context for another round with fresh inputs.
    pub(crate) fn rearm(&mut self, inputs: Vec<Value>) {
        if let Some(top) = self.top_mut() {
            top.inputs = inputs;
        }
    }

    /// pushes `script` to run in the scope of the top context
    pub(crate) fn push_script(&mut self, script: Script) {
        if let Some(ctx) = self.top().map(|top| top.child(Expression::Sequence(script))) {
            self.push(ctx);
        }
    }

    /* --------------------------------- Control -------------------------------- */

    /// Ends the process at its next check; the error flag is cleared.
    pub fn stop(&mut self) {
        self.ready_to_yield = true;
        self.ready_to_terminate = true;
        self.error = None;
    }

    pub fn pause(&mut self) {
        self.is_paused = true;
        if let Some(start) = self.top().and_then(|top| top.start_time) {
            self.pause_offset = Some(start.elapsed());
        }
    }

    pub fn resume(&mut self) {
        self.hold_timer();
        self.is_paused = false;
        self.pause_offset = None;
    }

    pub(crate) fn apply(&mut self, signal: Signal) {
        match signal {
            | Signal::Stop => self.stop(),
            | Signal::Kill => {
                self.stop();
                self.is_dead = true;
            }
            | Signal::Pause => self.pause(),
            | Signal::Resume => self.resume(),
        }
    }

    fn pause_step(&mut self) {
        self.last_yield = Instant::now();
        self.hold_timer();
    }

    /// Keeps the wait timer of the top context where it was at the pause.
    fn hold_timer(&mut self) {
        let offset = self.pause_offset;
        if let (Some(top), Some(offset)) = (self.top_mut(), offset) {
            if top.start_time.is_some() {
                top.start_time = Instant::now().checked_sub(offset);
            }
        }
    }

    /// Runs until the next yield. Warping processes run through yields, but
    /// only until the atomic timeout.
    pub fn run_step(&mut self, world: &mut World) {
        if self.is_paused {
            return self.pause_step();
        }
        if self.ready_to_terminate {
            self.stack.clear();
            return;
        }
        self.ready_to_yield = false;
        let timeout = world.stage.settings.atomic_timeout;
        while !self.ready_to_yield
            && !self.stack.is_empty()
            && (!self.is_atomic || self.last_yield.elapsed() < timeout)
        {
            if self.is_paused {
                return self.pause_step();
            }
            self.evaluate_context(world);
            for signal in world.threads.take_signals(self.id) {
                self.apply(signal);
            }
        }
        self.last_yield = Instant::now();
        if self.ready_to_terminate {
            self.stack.clear();
        }
    }

    fn evaluate_context(&mut self, world: &mut World) {
        self.frame_count += 1;
        if let Err(err) = self.evaluate(world) {
            self.handle_error(world, err);
        }
    }

    fn handle_error(&mut self, world: &mut World, error: EvalError) {
        let block = match self.top().map(|top| &top.expression) {
            | Some(Expression::Block(block)) => block.ugly(&Formatter::default()),
            | _ => String::new(),
        };
        let receiver = world.stage.name_of(self.top().map_or(self.receiver, |top| top.receiver));
        self.stop();
        log::error!("process {} of {} failed at `{}`: {}", self.id, receiver, block, error);
        world.stage.effects().report_error(self.id, &receiver, &error.to_string());
        world.threads.record_failure(Failure {
            process: self.id,
            receiver,
            block,
            error: error.clone(),
        });
        self.error = Some(error);
    }

    /* ------------------------------- Evaluation ------------------------------- */

    fn evaluate(&mut self, world: &mut World) -> Result<()> {
        let Some(expression) = self.top().map(|top| top.expression.clone()) else { return Ok(()) };
        match expression {
            | Expression::Block(block) => self.evaluate_block(world, block),
            | Expression::Sequence(script) => {
                self.evaluate_sequence(script);
                Ok(())
            }
            | Expression::Variadic(items) => self.evaluate_variadic(&items),
            | Expression::Slot(slot) => {
                match self.read_slot(&slot)? {
                    | Read::Value(value) => self.report(value),
                    | Read::Push(expression) => {
                        if let Some(top) = self.top_mut() {
                            top.expression = expression;
                        }
                    }
                }
                Ok(())
            }
            | Expression::Marker(marker) => {
                self.evaluate_marker(world, marker);
                Ok(())
            }
            | Expression::Empty => {
                self.finish();
                Ok(())
            }
        }
    }

    fn evaluate_marker(&mut self, world: &mut World, marker: Marker) {
        match marker {
            | Marker::Yield => {
                self.pop();
                if !self.is_atomic {
                    self.ready_to_yield = true;
                }
            }
            | Marker::StopWarping => self.stop_warping(world),
            | Marker::Stop => self.stop(),
        }
    }

    /// Leaves a warp region. A value reported into the region passes on.
    pub(crate) fn stop_warping(&mut self, world: &mut World) {
        let Some(mut marker) = self.pop() else { return };
        self.is_atomic = false;
        world.stage.end_warp(marker.receiver);
        if let Some(value) = marker.inputs.pop() {
            match self.top_mut() {
                | Some(parent) if parent.awaits_input() => parent.inputs.push(value),
                | Some(_) => {}
                | None => self.home.push(value),
            }
        }
    }

    /// Steps through a statement sequence. The last statement replaces the
    /// sequence's own context, so loops and recursion in tail position run
    /// in constant stack.
    fn evaluate_sequence(&mut self, script: Script) {
        let Some(top) = self.top_mut() else { return };
        let pc = top.pc;
        if pc >= script.len() {
            return self.finish();
        }
        let next = Expression::Block(script[pc].clone());
        if pc + 1 == script.len() {
            *top = Context {
                is_lambda: top.is_lambda,
                is_implicit_lambda: top.is_implicit_lambda,
                ..top.child(next)
            };
        } else {
            top.pc += 1;
            let child = top.child(next);
            self.push(child);
        }
    }

    fn evaluate_variadic(&mut self, items: &[Slot]) -> Result<()> {
        let filled = self.top().map_or(0, |top| top.inputs.len());
        match items.get(filled) {
            | Some(item) => self.evaluate_next_input(item),
            | None => {
                let values = self.top().map(|top| top.inputs.clone()).unwrap_or_default();
                self.report(Value::list(values));
                Ok(())
            }
        }
    }

    fn evaluate_next_input(&mut self, slot: &Slot) -> Result<()> {
        match self.read_slot(slot)? {
            | Read::Value(value) => {
                if let Some(top) = self.top_mut() {
                    top.inputs.push(value);
                }
            }
            | Read::Push(expression) => {
                if let Some(ctx) = self.top().map(|top| top.child(expression)) {
                    self.push(ctx);
                }
            }
        }
        Ok(())
    }

    fn read_slot(&self, slot: &Slot) -> Result<Read> {
        let Some(top) = self.top() else { return Ok(Read::Value(Value::Nothing)) };
        if let Some(binding) = slot.binding {
            return Ok(Read::Value(top.scope.get_var(&binding.into(), None)?));
        }
        let value = match (&slot.shape, &slot.content) {
            | (SlotShape::Command(CommandSlot::Static) | SlotShape::RingBody(_), _) => Value::Nothing,
            | (shape, _) if shape.is_unevaluated() => self.reify_slot(slot),
            | (SlotShape::Template { .. }, _) => Value::text(slot.name().map_or("", |name| name)),
            | (SlotShape::Command(_), Content::Script(script)) if !script.is_empty() => {
                self.reify(Expression::Sequence(script.clone()), RingKind::Command, Vec::new(), true)
            }
            | (SlotShape::Command(_), _) => Value::Nothing,
            | (SlotShape::Reporter { predicate, .. }, Content::Nested(block)) => {
                let kind = if *predicate { RingKind::Predicate } else { RingKind::Reporter };
                self.reify(Expression::Block(block.clone()), kind, Vec::new(), true)
            }
            | (SlotShape::Reporter { .. }, _) => Value::Nothing,
            | (_, Content::Items(items)) => return Ok(Read::Push(Expression::Variadic(items.clone()))),
            | (SlotShape::Variadic { .. }, _) => Value::list(Vec::new()),
            | (_, Content::Nested(block)) => return Ok(Read::Push(Expression::Block(block.clone()))),
            | (SlotShape::Input { .. }, Content::Empty) => Value::text(""),
            | (_, Content::Empty) => Value::Nothing,
            | (SlotShape::Input { numeric: true, .. }, Content::Literal(Literal::Text(text)))
                if !text.trim().is_empty() =>
            {
                parse_number(text).map_or_else(|| Value::Text(text.clone()), Value::Number)
            }
            | (_, Content::Literal(lit)) => Value::from(lit),
            | (_, Content::Name(name)) => Value::Text(name.clone()),
            | (_, Content::Script(_)) => Value::Nothing,
        };
        Ok(value.into())
    }

    /// A closure over `expression` in the scope of the current context,
    /// with its empty slots numbered for implicit parameters.
    fn reify(
        &self, expression: Expression, kind: RingKind, params: Vec<Rc<str>>, is_implicit: bool,
    ) -> Value {
        let Some(top) = self.top() else { return Value::Nothing };
        let mut empty_slots = 0;
        let expression = expression.mark_empty_slots(&mut empty_slots);
        Value::Context(Rc::new(Reified::Lambda(Lambda {
            expression,
            kind,
            params,
            empty_slots,
            scope: top.scope.clone(),
            receiver: top.receiver,
            is_implicit,
        })))
    }

    /// the closure an unevaluated slot stands for
    fn reify_slot(&self, slot: &Slot) -> Value {
        let predicate = matches!(slot.shape, SlotShape::Boolean { .. });
        match &slot.content {
            | Content::Nested(block) => {
                let kind = match block.kind {
                    | BlockKind::Predicate => RingKind::Predicate,
                    | _ if predicate => RingKind::Predicate,
                    | _ => RingKind::Reporter,
                };
                self.reify(Expression::Block(block.clone()), kind, Vec::new(), false)
            }
            | _ => {
                let kind = if predicate { RingKind::Predicate } else { RingKind::Reporter };
                let Some(top) = self.top() else { return Value::Nothing };
                Value::Context(Rc::new(Reified::Lambda(Lambda {
                    expression: Expression::Slot(Rc::new(slot.clone())),
                    kind,
                    params: Vec::new(),
                    empty_slots: 0,
                    scope: top.scope.clone(),
                    receiver: top.receiver,
                    is_implicit: false,
                })))
            }
        }
    }

    /// A ring evaluates to a closure over its contents, parameterized by
    /// the names in its second slot.
    fn reify_ring(&self, ring: &Block, kind: RingKind) -> Value {
        let body = match ring.inputs.first().map(|slot| &slot.content) {
            | Some(Content::Nested(block)) => Expression::Block(block.clone()),
            | Some(Content::Script(script)) => Expression::Sequence(script.clone()),
            | _ if kind == RingKind::Command => Expression::Sequence(Script::default()),
            | _ => Expression::Empty,
        };
        let params = match ring.inputs.get(1).map(|slot| &slot.content) {
            | Some(Content::Items(items)) => items.iter().filter_map(|item| item.name().cloned()).collect(),
            | _ => Vec::new(),
        };
        self.reify(body, kind, params, false)
    }

    fn evaluate_block(&mut self, world: &mut World, block: RcBlock) -> Result<()> {
        if let Some(kind) = block.ring_kind() {
            let closure = self.reify_ring(&block, kind);
            self.report(closure);
            return Ok(());
        }
        let filled = self.top().map_or(0, |top| top.inputs.len());
        if matches!(block.selector, Selector::ReportAnd | Selector::ReportOr) {
            return self.evaluate_junction(&block, filled);
        }
        if let Some(slot) = block.inputs.get(filled) {
            return self.evaluate_next_input(slot);
        }
        match block.selector {
            | Selector::ReportGetVar => {
                let Some(top) = self.top() else { return Ok(()) };
                let name = block.label.clone().ok_or(EvalError::NamelessGetter)?;
                let value = top.scope.get_var(&VarKey::Name(name), top.upvars.as_deref())?;
                self.report(value);
                Ok(())
            }
            | Selector::EvaluateCustomBlock => self.evaluate_custom_block(world, &block),
            | selector => {
                let prim = prims::lookup(selector).ok_or(EvalError::NoPrimitive(selector))?;
                let args = self.top().map(|top| top.inputs.clone()).unwrap_or_default();
                let outcome = prim(self, world, args)?;
                self.apply_outcome(outcome);
                Ok(())
            }
        }
    }

    pub(crate) fn apply_outcome(&mut self, outcome: Outcome) {
        match outcome {
            | Outcome::Report(value) => match self.stack.is_empty() {
                | true => self.home.push(value),
                | false => self.report(value),
            },
            | Outcome::Done => self.finish(),
            | Outcome::Rearm => {}
        }
    }

    /// `and` and `or` only evaluate their second input when it matters.
    fn evaluate_junction(&mut self, block: &Block, filled: usize) -> Result<()> {
        let is_or = block.selector == Selector::ReportOr;
        let inputs = self.top().map(|top| top.inputs.clone()).unwrap_or_default();
        match (filled, inputs.first()) {
            | (0, _) | (_, None) => self.evaluate_next_input(&block.inputs[0]),
            | (1, Some(first)) if first.to_bool() == is_or => {
                self.report(Value::Bool(is_or));
                Ok(())
            }
            | (1, Some(_)) => self.evaluate_next_input(&block.inputs[1]),
            | _ => {
                self.report(Value::Bool(inputs.get(1).is_some_and(Value::to_bool)));
                Ok(())
            }
        }
    }

    /* -------------------------------- Closures -------------------------------- */

    /// Calls a closure or continuation. With `replace`, the calling context
    /// is popped first and the callee reports to the caller's parent.
    pub(crate) fn invoke(
        &mut self, callee: &Value, args: Vec<Value>, is_command: bool, replace: bool,
    ) -> Result<()> {
        let reified = match callee {
            | Value::Context(reified) => reified.clone(),
            | other => Err(EvalError::NotARing(other.describe()))?,
        };
        let lambda = match &*reified {
            | Reified::Continuation(cont) => {
                self.run_continuation(cont, args);
                return Ok(());
            }
            | Reified::Lambda(lambda) => lambda,
        };
        let upvars = self.top().and_then(|top| top.upvars.clone());
        let runnable = lambda.runnable(&args, upvars)?;
        if replace {
            self.pop();
        }
        self.push(runnable);
        if is_command || lambda.is_reporter() {
            self.push_marker(Marker::Yield);
        }
        Ok(())
    }

    /// Resumes a continuation on a fresh copy of its stack, with one
    /// argument filling the slot it was captured at.
    fn run_continuation(&mut self, cont: &Continuation, args: Vec<Value>) {
        self.replace_stack(cont.stack.clone());
        if let ([value], Some(top)) = (&args[..], self.top()) {
            top.scope.add_var(VarKey::Binding(1), value.clone());
        }
    }

    /// Unwinds to the nearest closure boundary, leaving warp regions on the
    /// way. A C-slot closure is not a boundary of its own: reporting from
    /// one returns from the block that received it. Without a value the
    /// boundary simply finishes.
    pub(crate) fn do_report(
        &mut self, world: &mut World, value: Option<Value>, is_cslot: bool,
    ) -> Outcome {
        while self.top().is_some_and(|top| !top.is_lambda) {
            self.unwind_one(world);
        }
        if self.top().is_some_and(|top| top.is_implicit_lambda) {
            self.unwind_one(world);
            return self.do_report(world, value, true);
        }
        if is_cslot && self.parent().is_some_and(|parent| parent.expression.is_sequence()) {
            self.pop();
        }
        match value {
            | Some(value) => Outcome::Report(value),
            | None => Outcome::Done,
        }
    }

    fn unwind_one(&mut self, world: &mut World) {
        match self.top() {
            | Some(top) if top.expression.is_marker(Marker::StopWarping) => self.stop_warping(world),
            | _ => {
                self.pop();
            }
        }
    }

    pub(crate) fn capture_continuation(&self) -> Value {
        Value::Context(Rc::new(Reified::Continuation(Continuation::capture(&self.stack))))
    }

    /// The body of a custom block runs in a fresh frame under the
    /// receiver's, with upvar parameters aliased to the names the caller
    /// gave them.
    fn evaluate_custom_block(&mut self, world: &mut World, block: &Block) -> Result<()> {
        let spec = block.label.clone().unwrap_or_default();
        let Some(caller) = self.top() else { return Ok(()) };
        let def = world
            .stage
            .custom_block(caller.receiver, &spec)
            .cloned()
            .ok_or_else(|| EvalError::UnknownCustomBlock(spec.to_string()))?;
        let Some(caller) = self.pop() else { return Ok(()) };
        let outer = FrameRef::new(Some(world.stage.frame_of(caller.receiver)));
        let mut refs = UpvarReference::new(caller.upvars.clone());
        for (i, (param, shape)) in def.declarations().enumerate() {
            let arg = caller.inputs.get(i).cloned().unwrap_or(Value::Nothing);
            match shape {
                | SlotShape::Template { upvar: true } => {
                    let alias = match &arg {
                        | Value::Text(alias) if !alias.is_empty() => alias.clone(),
                        | _ => param.clone(),
                    };
                    outer.add_var(param.clone(), Value::Number(0.0));
                    refs.add_reference(alias, param.clone(), outer.clone());
                }
                | _ => {
                    let value = if arg.is_nothing() { Value::Number(0.0) } else { arg };
                    outer.add_var(param.clone(), value);
                }
            }
        }
        let upvars = if refs.is_empty() { caller.upvars.clone() } else { Some(Rc::new(refs)) };
        let body = def.body.clone().unwrap_or_default();
        let runnable = Context {
            is_lambda: true,
            upvars,
            ..Context::new(Expression::Sequence(body), outer, caller.receiver)
        };
        if def.is_atomic && !self.is_atomic {
            self.push(caller.child(Expression::Marker(Marker::StopWarping)));
            world.stage.start_warp(caller.receiver);
            self.is_atomic = true;
        }
        self.push(runnable);
        self.push_marker(Marker::Yield);
        Ok(())
    }
}
