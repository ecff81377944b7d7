//! Loading and running blox projects.

pub mod conf;
pub mod err;
pub mod load;
pub mod project;
pub mod run;

pub use conf::Conf;
pub use err::*;
pub use project::Project;
pub use run::{RunOptions, check_file, execute, run_file, test_file, test_project};
