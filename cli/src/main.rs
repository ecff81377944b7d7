mod cli;

use blox_driver::{BuildError, Conf, RunOptions};
use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process::ExitCode;

/// `--verbose` sets the default level; `RUST_LOG` directives apply on top.
fn logger(verbose: bool, directives: Option<&str>) -> env_logger::Builder {
    let level = if verbose { log::LevelFilter::Debug } else { log::LevelFilter::Warn };
    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    if let Some(directives) = directives {
        builder.parse_filters(directives);
    }
    builder
}

fn init_logger(verbose: bool) {
    logger(verbose, std::env::var("RUST_LOG").ok().as_deref()).init();
}

fn main() -> ExitCode {
    match run(Cli::parse().command) {
        | Ok(()) => ExitCode::SUCCESS,
        | Err(err) => {
            eprintln!("{} {}", "error:".red().bold(), err);
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<(), BuildError> {
    match command {
        | Commands::Run { file, fast, max_ticks, verbose } => {
            init_logger(verbose);
            blox_driver::run_file(&file, &Conf::load(), RunOptions { fast, max_ticks })
        }
        | Commands::Check { file, verbose } => {
            init_logger(verbose);
            let project = blox_driver::check_file(&file, &Conf::load())?;
            println!("{} `{}`", "ok".green(), project.name);
            Ok(())
        }
        | Commands::Test { files, fast, verbose } => {
            init_logger(verbose);
            let conf = Conf::load();
            let opts = RunOptions { fast, max_ticks: None };
            let mut failed = Vec::new();
            for file in &files {
                if let Err(err) = blox_driver::test_file(file, &conf, opts) {
                    eprintln!("{}", err);
                    failed.push(file.display().to_string());
                }
            }
            println!("{} / {} projects passed", files.len() - failed.len(), files.len());
            match failed.is_empty() {
                | true => Ok(()),
                | false => Err(BuildError::TestFailed(failed.join(", "))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::LevelFilter;
    use pretty_assertions::assert_eq;

    #[test]
    fn verbosity_defaults() {
        assert_eq!(logger(false, None).build().filter(), LevelFilter::Warn);
        assert_eq!(logger(true, None).build().filter(), LevelFilter::Debug);
    }

    #[test]
    fn rust_log_overrides_the_default() {
        assert_eq!(logger(false, Some("debug")).build().filter(), LevelFilter::Debug);
        assert_eq!(logger(true, Some("error")).build().filter(), LevelFilter::Error);
    }
}
