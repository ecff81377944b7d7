#![allow(clippy::style)]

pub mod context;
pub mod effects;
pub mod err;
pub mod frame;
pub mod list;
pub mod prims;
pub mod process;
pub mod runtime;
pub mod settings;
pub mod stage;
pub mod threads;
pub mod value;

pub mod prelude {
    pub use crate::{
        effects::{Console, Effects, Silent, Transcript},
        err::EvalError,
        frame::{FrameRef, VarKey},
        list::{List, ListRef},
        process::Process,
        runtime::{Halt, RunSummary, Runtime},
        settings::{Settings, ThreadSafety},
        stage::{Event, ReceiverId, ScriptId, Stage},
        threads::{Failure, ProcessId, ThreadManager, World},
        value::{Value, snap_equals},
    };
}
