#![allow(clippy::style)]

pub mod arena;

pub mod prelude {
    pub use crate::arena::*;
}
