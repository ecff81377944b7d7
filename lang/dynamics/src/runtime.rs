//! The runtime facade: a stage, its processes, and the events that start
//! and stop them.

use crate::{settings::*, stage::*, threads::*, value::Value};
use derive_more::Display;
use std::time::Instant;

/// Why [`Runtime::run_until_idle`] came back.
#[derive(Clone, Copy, Debug, Display, PartialEq, Eq)]
pub enum Halt {
    #[display("idle")]
    Idle,
    #[display("paused")]
    Paused,
    #[display("out of ticks")]
    TickLimit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: usize,
    pub halt: Halt,
}

pub struct Runtime {
    pub stage: Stage,
    pub threads: ThreadManager,
}

impl Runtime {
    pub fn new(stage: Stage) -> Self {
        Runtime { stage, threads: ThreadManager::new() }
    }

    pub fn world(&mut self) -> World<'_> {
        World { stage: &mut self.stage, threads: &mut self.threads }
    }

    pub fn settings(&self) -> &Settings {
        &self.stage.settings
    }

    /// one scheduler tick
    pub fn step(&mut self) {
        self.threads.step(&mut self.stage);
    }

    /// Ticks as fast as possible for one budget, with every sprite warped.
    pub fn fast_track_step(&mut self) {
        let warped = (self.stage.receivers())
            .filter(|(_, r)| r.warp_depth == 0)
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        for id in &warped {
            self.stage.start_warp(*id);
        }
        let budget = self.stage.settings.fast_track_budget;
        let start = Instant::now();
        loop {
            self.step();
            if self.threads.is_empty() || self.threads.is_paused() || start.elapsed() >= budget {
                break;
            }
        }
        for id in warped {
            self.stage.end_warp(id);
        }
    }

    /* --------------------------------- Events --------------------------------- */

    pub fn fire_green_flag(&mut self) -> Vec<ProcessId> {
        log::info!("green flag");
        self.world().start_hats(&Event::GreenFlag)
    }

    /// `ctrl enter` is the green flag and `esc` the stop sign.
    pub fn fire_key(&mut self, key: &str) -> Vec<ProcessId> {
        match key {
            | "ctrl enter" => self.fire_green_flag(),
            | "esc" => {
                self.fire_stop_all();
                Vec::new()
            }
            | key => self.world().start_hats(&Event::Key(key.into())),
        }
    }

    pub fn fire_click(&mut self, receiver: ReceiverId) -> Vec<ProcessId> {
        self.world().start_hats_of(receiver, &Event::Click)
    }

    pub fn fire_stop_all(&mut self) {
        log::info!("stop all");
        self.world().stop_everything();
        self.threads.reap();
    }

    /// Starts a script whether or not it has a hat.
    pub fn start_script(&mut self, script: ScriptId) -> Option<ProcessId> {
        self.threads.start_process(&self.stage, script)
    }

    pub fn pause_all(&mut self) {
        self.threads.pause_all();
    }

    pub fn resume_all(&mut self) {
        self.threads.resume_all();
    }

    pub fn is_paused(&self) -> bool {
        self.threads.is_paused()
    }

    /* ---------------------------------- Runs ---------------------------------- */

    /// Ticks until no process is left, all are paused, or `max_ticks` ticks
    /// have run.
    pub fn run_until_idle(&mut self, max_ticks: usize) -> RunSummary {
        self.run_with(max_ticks, Runtime::step)
    }

    /// like [`Runtime::run_until_idle`], a fast-track step per tick
    pub fn fast_track_until_idle(&mut self, max_ticks: usize) -> RunSummary {
        self.run_with(max_ticks, Runtime::fast_track_step)
    }

    fn run_with(&mut self, max_ticks: usize, tick: fn(&mut Runtime)) -> RunSummary {
        let mut ticks = 0;
        let halt = loop {
            if self.threads.is_empty() {
                break Halt::Idle;
            }
            if self.threads.is_paused() {
                break Halt::Paused;
            }
            if ticks >= max_ticks {
                break Halt::TickLimit;
            }
            tick(self);
            ticks += 1;
        };
        log::debug!("run ended after {} ticks: {}", ticks, halt);
        RunSummary { ticks, halt }
    }

    /* --------------------------------- Queries -------------------------------- */

    pub fn global(&self, name: &str) -> Option<Value> {
        self.stage.globals.local(&name.into())
    }

    /// A variable of the stage or an original sprite, by their names.
    pub fn variable(&self, receiver: &str, name: &str) -> Option<Value> {
        let id = self.stage.find(receiver)?;
        self.stage.frame_of(id).local(&name.into())
    }

    pub fn failures(&self) -> &[Failure] {
        self.threads.failures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effects::Transcript;
    use blox_syntax::prelude::*;
    use pretty_assertions::assert_eq;
    use std::rc::Rc;

    fn block(selector: Selector, args: Vec<Arg>) -> Arg {
        Arg::block(Block::build(selector, args).unwrap())
    }

    fn script(blocks: Vec<Arg>) -> Script {
        let blocks = blocks
            .into_iter()
            .map(|arg| match arg {
                | Arg::Block(block) => block,
                | _ => panic!("not a block"),
            })
            .collect::<Vec<Rc<Block>>>();
        Script::new(blocks)
    }

    fn runtime(transcript: &Transcript) -> Runtime {
        Runtime::new(Stage::new(Settings::default(), Box::new(transcript.clone())))
    }

    #[test]
    fn green_flag_runs_to_idle() {
        let transcript = Transcript::default();
        let mut rt = runtime(&transcript);
        rt.stage.globals.add_var("n", Value::Number(0.0));
        let cat = rt.stage.add_sprite("Cat");
        let count = block(Selector::DoChangeVar, vec![Arg::text("n"), Arg::Number(1.0)]);
        rt.stage.add_script(
            cat,
            script(vec![
                block(Selector::ReceiveGo, vec![]),
                block(Selector::DoRepeat, vec![Arg::Number(3.0), Arg::Script(script(vec![count]))]),
                block(Selector::Bubble, vec![Arg::block(Block::getter("n"))]),
            ]),
        );
        assert_eq!(rt.fire_green_flag().len(), 1);
        let summary = rt.run_until_idle(100);
        assert_eq!(summary.halt, Halt::Idle);
        assert_eq!(rt.global("n").unwrap().to_string(), "3");
        assert_eq!(transcript.lines(), vec!["Cat says: 3".to_owned()]);
    }

    #[test]
    fn escape_stops_forever_loops() {
        let mut rt = runtime(&Transcript::default());
        let stage = rt.stage.id();
        let forever = block(Selector::DoForever, vec![Arg::Script(Script::default())]);
        rt.stage.add_script(stage, script(vec![block(Selector::ReceiveGo, vec![]), forever]));
        rt.fire_key("ctrl enter");
        assert_eq!(rt.run_until_idle(5).halt, Halt::TickLimit);
        rt.fire_key("esc");
        assert!(rt.threads.is_empty());
        assert_eq!(rt.run_until_idle(5), RunSummary { ticks: 0, halt: Halt::Idle });
    }

    #[test]
    fn pausing_halts_the_run() {
        let mut rt = runtime(&Transcript::default());
        let stage = rt.stage.id();
        let pause = block(Selector::DoPauseAll, vec![]);
        let forever = block(Selector::DoForever, vec![Arg::Script(Script::default())]);
        rt.stage.add_script(stage, script(vec![block(Selector::ReceiveGo, vec![]), pause, forever]));
        rt.fire_green_flag();
        assert_eq!(rt.run_until_idle(10).halt, Halt::Paused);
        assert!(rt.is_paused());
        rt.resume_all();
        assert!(!rt.is_paused());
    }

    #[test]
    fn scripts_without_hats_start_explicitly() {
        let mut rt = runtime(&Transcript::default());
        let stage = rt.stage.id();
        rt.stage.globals.add_var("x", Value::Number(0.0));
        let set = block(Selector::DoSetVar, vec![Arg::text("x"), Arg::text("done")]);
        let id = rt.stage.add_script(stage, script(vec![set])).unwrap();
        assert!(rt.fire_green_flag().is_empty());
        assert!(rt.start_script(id).is_some());
        rt.run_until_idle(10);
        assert_eq!(rt.global("x").unwrap().to_string(), "done");
        assert!(rt.failures().is_empty());
    }
}
