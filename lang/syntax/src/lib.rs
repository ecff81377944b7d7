#![allow(clippy::style)]

pub mod block;
pub mod build;
pub mod code;
pub mod custom;
pub mod err;
pub mod fmt;
pub mod selector;
pub mod shape;

pub mod prelude {
    pub use crate::{
        block::*,
        build::{Arg, commands, top_level},
        code::{CodeMappings, ListKind, ListPart},
        custom::CustomBlockDefinition,
        err::SyntaxError,
        fmt::{Formatter, Ugly},
        selector::{Category, Selector},
        shape::*,
    };
}
