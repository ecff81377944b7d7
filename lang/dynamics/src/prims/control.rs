//! Control flow: conditionals, loops, waits, warp, closures, stopping,
//! messages and clones.

use super::*;
use crate::{
    context::*,
    threads::{ProcessId, World},
};
use blox_syntax::prelude::Script;
use std::time::Instant;

pub(super) const PRIMS: &[(Selector, Prim)] = &[
    (Selector::DoIf, do_if),
    (Selector::DoIfElse, do_if_else),
    (Selector::DoForever, do_forever),
    (Selector::DoRepeat, do_repeat),
    (Selector::DoUntil, do_until),
    (Selector::DoWaitUntil, do_wait_until),
    (Selector::DoWait, do_wait),
    (Selector::DoWarp, do_warp),
    (Selector::DoStop, do_stop),
    (Selector::DoStopAll, do_stop_all),
    (Selector::DoStopThis, do_stop_this),
    (Selector::DoStopOthers, do_stop_others),
    (Selector::DoStopBlock, do_stop_block),
    (Selector::DoReport, do_report),
    (Selector::DoRun, do_run),
    (Selector::Evaluate, evaluate),
    (Selector::Fork, fork),
    (Selector::DoCallCC, do_call_cc),
    (Selector::ReportCallCC, do_call_cc),
    (Selector::DoBroadcast, do_broadcast),
    (Selector::DoBroadcastAndWait, do_broadcast_and_wait),
    (Selector::GetLastMessage, get_last_message),
    (Selector::CreateClone, create_clone),
    (Selector::RemoveClone, remove_clone),
    (Selector::DoPauseAll, do_pause_all),
];

/* ------------------------------ Conditionals ------------------------------ */

/// Runs `body` in place of the block on top, which ends here. The body takes
/// over the block's boundary flags, so a conditional in tail position keeps
/// the stack flat.
fn branch_into(proc: &mut Process, body: Script) -> Outcome {
    if let Some(ctx) = proc.pop() {
        proc.push(ctx.branch(Expression::Sequence(body)));
    }
    Outcome::Rearm
}

fn do_if(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    if !arg(&args, 0).to_bool() {
        return Ok(Outcome::Done);
    }
    let body = proc.script_at(1);
    Ok(branch_into(proc, body))
}

fn do_if_else(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let body = proc.script_at(if arg(&args, 0).to_bool() { 1 } else { 2 });
    Ok(branch_into(proc, body))
}

/* ---------------------------------- Loops --------------------------------- */

fn do_forever(proc: &mut Process, _: &mut World, _: Vec<Value>) -> Result<Outcome> {
    let body = proc.script_at(0);
    proc.push_marker(Marker::Yield);
    proc.push_script(body);
    Ok(Outcome::Rearm)
}

fn do_repeat(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let counter = arg(&args, 0).to_number();
    if counter.is_nan() || counter < 1.0 {
        return Ok(Outcome::Done);
    }
    let body = proc.script_at(1);
    proc.rearm(vec![Value::Number(counter - 1.0)]);
    proc.push_marker(Marker::Yield);
    proc.push_script(body);
    Ok(Outcome::Rearm)
}

/// The loop is over; yield once more before going on.
fn leave_loop(proc: &mut Process) -> Outcome {
    proc.finish();
    proc.push_marker(Marker::Yield);
    Outcome::Rearm
}

fn do_until(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    if arg(&args, 0).to_bool() {
        return Ok(leave_loop(proc));
    }
    let body = proc.script_at(1);
    proc.rearm(Vec::new());
    proc.push_marker(Marker::Yield);
    proc.push_script(body);
    Ok(Outcome::Rearm)
}

fn do_wait_until(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    if arg(&args, 0).to_bool() {
        return Ok(leave_loop(proc));
    }
    proc.rearm(Vec::new());
    proc.push_marker(Marker::Yield);
    Ok(Outcome::Rearm)
}

/// Waits until `secs` have passed since the block on top first ran. Returns
/// whether the time is up.
pub(super) fn wait_secs(proc: &mut Process, secs: f64) -> bool {
    let Some(top) = proc.top_mut() else { return true };
    let start = *top.start_time.get_or_insert_with(Instant::now);
    let secs = if secs.is_nan() { 0.0 } else { secs };
    if start.elapsed().as_secs_f64() >= secs {
        return true;
    }
    proc.push_marker(Marker::Yield);
    false
}

fn do_wait(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    match wait_secs(proc, arg(&args, 0).to_number()) {
        | true => Ok(Outcome::Done),
        | false => Ok(Outcome::Rearm),
    }
}

/// Runs the body as a warp region. Only the outermost region installs the
/// marker that ends it.
fn do_warp(proc: &mut Process, world: &mut World, _: Vec<Value>) -> Result<Outcome> {
    let body = proc.script_at(0);
    if body.is_empty() {
        return Ok(Outcome::Done);
    }
    let Some(ctx) = proc.pop() else { return Ok(Outcome::Rearm) };
    proc.push(ctx.branch(Expression::Marker(Marker::Yield)));
    if !proc.is_atomic() {
        proc.push(ctx.child(Expression::Marker(Marker::StopWarping)));
        world.stage.start_warp(ctx.receiver);
    }
    proc.push(ctx.child(Expression::Sequence(body)));
    proc.set_atomic(true);
    Ok(Outcome::Rearm)
}

/* -------------------------------- Stopping -------------------------------- */

fn do_stop(proc: &mut Process, _: &mut World, _: Vec<Value>) -> Result<Outcome> {
    proc.stop();
    Ok(Outcome::Done)
}

fn do_stop_all(_: &mut Process, world: &mut World, _: Vec<Value>) -> Result<Outcome> {
    world.stop_everything();
    Ok(Outcome::Done)
}

fn do_stop_this(proc: &mut Process, world: &mut World, args: Vec<Value>) -> Result<Outcome> {
    match &*arg(&args, 0).to_string() {
        | "all" => do_stop_all(proc, world, args),
        | "this script" => do_stop(proc, world, args),
        | "this block" => do_stop_block(proc, world, args),
        | _ => Ok(Outcome::Done),
    }
}

fn do_stop_others(proc: &mut Process, world: &mut World, args: Vec<Value>) -> Result<Outcome> {
    match &*arg(&args, 0).to_string() {
        | "all but this script" => world.threads.stop_all(Some(proc.id)),
        | "other scripts in sprite" => {
            world.threads.stop_all_for_receiver(proc.receiver, Some(proc.id), false)
        }
        | _ => {}
    }
    Ok(Outcome::Done)
}

fn do_stop_block(proc: &mut Process, world: &mut World, _: Vec<Value>) -> Result<Outcome> {
    Ok(proc.do_report(world, None, false))
}

fn do_report(proc: &mut Process, world: &mut World, args: Vec<Value>) -> Result<Outcome> {
    Ok(proc.do_report(world, Some(arg(&args, 0)), false))
}

/* -------------------------------- Closures -------------------------------- */

/// the arguments of a call, from its variadic inputs slot
fn call_args(args: &[Value]) -> Vec<Value> {
    match args.get(1) {
        | Some(Value::List(list)) => list.borrow().items(),
        | _ => Vec::new(),
    }
}

fn do_run(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let callee = arg(&args, 0);
    if callee.is_nothing() {
        return Ok(Outcome::Done);
    }
    proc.invoke(&callee, call_args(&args), true, true)?;
    Ok(Outcome::Rearm)
}

fn evaluate(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let callee = arg(&args, 0);
    if callee.is_nothing() {
        return Ok(Outcome::Report(Value::Nothing));
    }
    proc.invoke(&callee, call_args(&args), false, true)?;
    Ok(Outcome::Rearm)
}

/// Starts the closure as a process of its own, which first yields.
fn fork(_: &mut Process, world: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let reified = match arg(&args, 0) {
        | Value::Nothing => return Ok(Outcome::Done),
        | Value::Context(reified) => reified,
        | other => Err(EvalError::NotARing(other.describe()))?,
    };
    let Reified::Lambda(lambda) = &*reified else {
        return Err(EvalError::ForkedContinuation);
    };
    let runnable = lambda.runnable(&call_args(&args), None)?;
    let mut forked = Process::with_stack(lambda.receiver, vec![runnable]);
    forked.push_marker(Marker::Yield);
    world.threads.add(forked);
    Ok(Outcome::Done)
}

/// Calls the closure with the rest of the computation as its argument.
fn do_call_cc(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let callee = arg(&args, 0);
    let continuation = proc.capture_continuation();
    proc.invoke(&callee, vec![continuation], false, true)?;
    Ok(Outcome::Rearm)
}

/* -------------------------------- Messages -------------------------------- */

fn do_broadcast(_: &mut Process, world: &mut World, args: Vec<Value>) -> Result<Outcome> {
    world.broadcast(&arg(&args, 0).to_string());
    Ok(Outcome::Done)
}

/// A barrier: broadcasts once, gives the receivers their first step right
/// away, then waits until none of them is running.
fn do_broadcast_and_wait(
    proc: &mut Process, world: &mut World, args: Vec<Value>,
) -> Result<Outcome> {
    let sends = match proc.top().and_then(|top| top.active_sends.clone()) {
        | Some(sends) => sends,
        | None => {
            let started = world.broadcast(&arg(&args, 0).to_string());
            for id in &started {
                world.threads.run_step(world.stage, *id);
            }
            started
        }
    };
    let pending: Vec<ProcessId> =
        sends.into_iter().filter(|id| world.threads.is_running(*id)).collect();
    if pending.is_empty() {
        return Ok(Outcome::Done);
    }
    if let Some(top) = proc.top_mut() {
        top.active_sends = Some(pending);
    }
    proc.push_marker(Marker::Yield);
    Ok(Outcome::Rearm)
}

fn get_last_message(_: &mut Process, world: &mut World, _: Vec<Value>) -> Result<Outcome> {
    Ok(Outcome::Report(Value::Text(world.stage.last_message.clone())))
}

/* --------------------------------- Clones --------------------------------- */

fn create_clone(proc: &mut Process, world: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let name = arg(&args, 0).to_string();
    let origin = match &*name {
        | "" => None,
        | "myself" => proc.top().map(|top| top.receiver),
        | name => world.stage.find(name),
    };
    if let Some(origin) = origin {
        world.create_clone(origin);
    }
    Ok(Outcome::Done)
}

fn remove_clone(proc: &mut Process, world: &mut World, _: Vec<Value>) -> Result<Outcome> {
    let receiver = proc.top().map_or(proc.receiver, |top| top.receiver);
    world.remove_clone(receiver);
    Ok(Outcome::Done)
}

fn do_pause_all(_: &mut Process, world: &mut World, _: Vec<Value>) -> Result<Outcome> {
    world.threads.pause_all();
    Ok(Outcome::Done)
}
