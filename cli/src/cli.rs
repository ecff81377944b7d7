use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a blox project
    Run {
        /// Path to the project file
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Fast-track: every sprite warped, many ticks per step
        #[arg(short, long, default_value_t = false)]
        fast: bool,
        /// Ticks to run before giving up
        #[arg(long)]
        max_ticks: Option<usize>,
        /// Level of verbosity
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
    /// Check that a blox project loads
    Check {
        /// Path to the project file
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Level of verbosity
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
    /// Run blox projects and compare their `[expect]` tables
    Test {
        /// Paths to the project files
        #[arg(value_name = "FILE")]
        files: Vec<PathBuf>,
        /// Fast-track every project
        #[arg(short, long, default_value_t = false)]
        fast: bool,
        /// Level of verbosity
        #[arg(short, long, default_value_t = false)]
        verbose: bool,
    },
}
