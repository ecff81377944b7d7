//! The scheduler. Processes live in an arena and are stepped round-robin;
//! the process being stepped is taken out of the arena, so it can reach
//! every other process through the [`World`] it is handed.

use crate::{err::EvalError, process::Process, stage::*, value::Value};
use blox_utils::prelude::*;
use std::{collections::HashMap, rc::Rc};

new_key_type! {
    pub struct ProcessId;
}

/// Requests for a process that is being stepped right now. It picks them
/// up after its current evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Signal {
    Stop,
    /// stop, and never step again
    Kill,
    Pause,
    Resume,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Failure {
    pub process: ProcessId,
    pub receiver: Rc<str>,
    /// the block that was being evaluated
    pub block: String,
    pub error: EvalError,
}

/// A process out of the arena for its step.
#[derive(Clone, Copy, Debug)]
struct Stepping {
    id: ProcessId,
    script: Option<ScriptId>,
    receiver: ReceiverId,
}

#[derive(Default)]
pub struct ThreadManager {
    procs: ArenaSparse<ProcessId, Process>,
    /// stepping order
    queue: Vec<ProcessId>,
    stepping: Vec<Stepping>,
    signals: HashMap<ProcessId, Vec<Signal>>,
    failures: Vec<Failure>,
}

impl ThreadManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn get(&self, id: ProcessId) -> Option<&Process> {
        self.procs.get(&id)
    }

    pub fn processes(&self) -> impl Iterator<Item = &Process> + '_ {
        self.procs.values()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub(crate) fn record_failure(&mut self, failure: Failure) {
        self.failures.push(failure);
    }

    /// Takes over a new process and queues it behind the others.
    pub fn add(&mut self, proc: Process) -> ProcessId {
        let id = self.procs.alloc(proc);
        self.procs[&id].id = id;
        self.queue.push(id);
        log::debug!("started process {}", id);
        id
    }

    fn process_for(&self, script: ScriptId) -> Option<ProcessId> {
        let stepping = self.stepping.iter().find(|s| s.script == Some(script)).map(|s| s.id);
        stepping.or_else(|| {
            (self.queue.iter().copied())
                .find(|id| {
                    self.procs.get(id).is_some_and(|p| p.script == Some(script) && p.is_running())
                })
        })
    }

    /// Starts `script` on its receiver. If it is already running, the
    /// receiver's thread-safety policy decides between keeping that process
    /// and starting over.
    pub fn start_process(&mut self, stage: &Stage, script: ScriptId) -> Option<ProcessId> {
        let body = stage.script(script)?;
        if let Some(active) = self.process_for(script) {
            if stage.thread_safety(script.receiver) == crate::settings::ThreadSafety::KeepRunning {
                return Some(active);
            }
            log::debug!("restarting the script of process {}", active);
            self.signal(active, Signal::Stop);
            self.discard(active);
        }
        let frame = stage.frame_of(script.receiver);
        Some(self.add(Process::new(Some(script), body, script.receiver, &frame)))
    }

    /// Drops a process off the queue. One that is stepping stays until the
    /// end of the tick.
    fn discard(&mut self, id: ProcessId) {
        if self.procs.remove(&id).is_some() {
            self.queue.retain(|queued| *queued != id);
            log::debug!("discarded process {}", id);
        }
    }

    /// Applies a signal now, or leaves it for a process that is stepping.
    pub fn signal(&mut self, id: ProcessId, signal: Signal) {
        if let Some(proc) = self.procs.get_mut(&id) {
            proc.apply(signal);
        } else if self.stepping.iter().any(|s| s.id == id) {
            self.signals.entry(id).or_default().push(signal);
        }
    }

    pub(crate) fn take_signals(&mut self, id: ProcessId) -> Vec<Signal> {
        self.signals.remove(&id).unwrap_or_default()
    }

    fn all_ids(&self) -> Vec<ProcessId> {
        self.queue.clone()
    }

    pub fn stop_all(&mut self, except: Option<ProcessId>) {
        for id in self.all_ids() {
            if Some(id) != except {
                self.signal(id, Signal::Stop);
            }
        }
    }

    /// Stops the processes started on `receiver`; a clone's are killed.
    pub fn stop_all_for_receiver(
        &mut self, receiver: ReceiverId, except: Option<ProcessId>, is_clone: bool,
    ) {
        let signal = if is_clone { Signal::Kill } else { Signal::Stop };
        let matching = (self.all_ids().into_iter())
            .filter(|id| Some(*id) != except && self.home_of(*id) == Some(receiver))
            .collect::<Vec<_>>();
        for id in matching {
            self.signal(id, signal);
        }
    }

    fn home_of(&self, id: ProcessId) -> Option<ReceiverId> {
        match self.procs.get(&id) {
            | Some(proc) => Some(proc.receiver),
            | None => self.stepping.iter().find(|s| s.id == id).map(|s| s.receiver),
        }
    }

    pub fn pause_all(&mut self) {
        for id in self.all_ids() {
            self.signal(id, Signal::Pause);
        }
    }

    pub fn resume_all(&mut self) {
        for id in self.all_ids() {
            self.signal(id, Signal::Resume);
        }
    }

    /// whether there are processes and every one of them is paused
    pub fn is_paused(&self) -> bool {
        !self.procs.is_empty() && self.procs.values().all(Process::is_paused)
    }

    pub fn is_running(&self, id: ProcessId) -> bool {
        self.stepping.iter().any(|s| s.id == id)
            || self.procs.get(&id).is_some_and(Process::is_running)
    }

    /// One tick: every live process gets one step, in start order. Processes
    /// started during the tick wait for the next one.
    pub fn step(&mut self, stage: &mut Stage) {
        for id in self.all_ids() {
            self.run_step(stage, id);
        }
        for proc in self.reap() {
            if let (true, Some(value)) = (proc.reports_result(), proc.result()) {
                if !matches!(value, Value::List(_)) {
                    stage.bubble(proc.receiver, value, false);
                }
            }
        }
    }

    /// Steps one process. Also used to give freshly started processes their
    /// first step from within another's.
    pub fn run_step(&mut self, stage: &mut Stage, id: ProcessId) {
        if self.procs.get(&id).is_none_or(|p| p.is_dead) {
            return;
        }
        let Some(mut proc) = self.procs.remove(&id) else { return };
        self.stepping.push(Stepping { id, script: proc.script, receiver: proc.receiver });
        proc.run_step(&mut World { stage, threads: self });
        self.stepping.pop();
        for signal in self.take_signals(id) {
            proc.apply(signal);
        }
        self.procs.replace(id, proc);
    }

    /// Drops every process that is no longer running, and hands them back.
    pub fn reap(&mut self) -> Vec<Process> {
        let mut reaped = Vec::new();
        let queue = std::mem::take(&mut self.queue);
        for id in queue {
            if self.stepping.iter().any(|s| s.id == id) {
                self.queue.push(id);
                continue;
            }
            match self.procs.get(&id) {
                | Some(proc) if proc.is_running() && !proc.is_dead => self.queue.push(id),
                | _ => {
                    if let Some(proc) = self.procs.remove(&id) {
                        log::debug!("reaped process {}", id);
                        reaped.push(proc);
                    }
                }
            }
        }
        reaped
    }
}

/* ---------------------------------- World --------------------------------- */

/// Everything a stepping process may touch besides itself.
pub struct World<'w> {
    pub stage: &'w mut Stage,
    pub threads: &'w mut ThreadManager,
}

impl World<'_> {
    fn start_all(&mut self, scripts: Vec<ScriptId>) -> Vec<ProcessId> {
        scripts.into_iter().filter_map(|script| self.threads.start_process(self.stage, script)).collect()
    }

    pub fn start_hats(&mut self, event: &Event) -> Vec<ProcessId> {
        let scripts = self.stage.hats_for(event);
        self.start_all(scripts)
    }

    pub fn start_hats_of(&mut self, receiver: ReceiverId, event: &Event) -> Vec<ProcessId> {
        let scripts = self.stage.hats_of(receiver, event);
        self.start_all(scripts)
    }

    /// Starts every script waiting for `message`. The empty message is not
    /// sent at all.
    pub fn broadcast(&mut self, message: &str) -> Vec<ProcessId> {
        if message.is_empty() {
            return Vec::new();
        }
        log::debug!("broadcast `{}`", message);
        self.stage.last_message = message.into();
        self.start_hats(&Event::Message(message.into()))
    }

    pub fn create_clone(&mut self, origin: ReceiverId) -> Option<ReceiverId> {
        let clone = self.stage.make_clone(origin)?;
        log::debug!("cloned {} as receiver {}", self.stage.name_of(origin), clone);
        self.start_hats_of(clone, &Event::CloneInit);
        Some(clone)
    }

    pub fn remove_clone(&mut self, clone: ReceiverId) {
        if !self.stage.receiver(clone).is_some_and(Receiver::is_clone) {
            return;
        }
        self.threads.stop_all_for_receiver(clone, None, true);
        self.stage.destroy(clone);
        log::debug!("removed clone {}", clone);
    }

    pub fn remove_all_clones(&mut self) {
        for clone in self.stage.clones() {
            self.remove_clone(clone);
        }
    }

    /// what the stop sign does: nothing keeps running, and clones are gone
    pub fn stop_everything(&mut self) {
        self.threads.resume_all();
        self.threads.stop_all(None);
        self.remove_all_clones();
    }
}
