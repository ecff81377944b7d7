//! Driving a loaded project: green flag, ticks until idle, then the
//! errored processes and the expected values.

use crate::{conf::Conf, err::*, load, project::Project};
use blox_dynamics::prelude::*;
use colored::Colorize;

#[derive(Clone, Copy, Debug, Default)]
pub struct RunOptions {
    /// fast-track every tick
    pub fast: bool,
    /// overrides [`Conf::max_ticks`]
    pub max_ticks: Option<usize>,
}

/// Runs a project to completion and hands back the runtime for inspection.
/// A project that does not load is an error; failing processes are not.
pub fn execute(
    project: &Project, conf: &Conf, opts: RunOptions, effects: Box<dyn Effects>,
) -> Result<Runtime> {
    let stage = load::build_stage(project, conf.settings(), effects)?;
    let mut runtime = Runtime::new(stage);
    runtime.fire_green_flag();
    let max_ticks = opts.max_ticks.unwrap_or(conf.max_ticks);
    let summary = match opts.fast {
        | true => runtime.fast_track_until_idle(max_ticks),
        | false => runtime.run_until_idle(max_ticks),
    };
    log::info!("`{}` {} after {} tick(s)", project.name, summary.halt, summary.ticks);
    if summary.halt == Halt::TickLimit {
        log::warn!("`{}` still had {} process(es) running", project.name, runtime.threads.len());
    }
    Ok(runtime)
}

/// Prints every recorded process error; any error fails the run.
pub fn report_failures(runtime: &Runtime) -> Result<()> {
    let failures = runtime.failures();
    for failure in failures {
        eprintln!(
            "{} process {} of {} at `{}`: {}",
            "error:".red().bold(),
            failure.process,
            failure.receiver,
            failure.block,
            failure.error
        );
    }
    match failures.len() {
        | 0 => Ok(()),
        | n => Err(BuildError::ProcessesFailed(n)),
    }
}

/// Compares the final globals with the project's `[expect]` table.
pub fn check_expectations(project: &Project, runtime: &Runtime) -> Result<()> {
    let mut mismatches = Vec::new();
    for (name, expected) in &project.expect {
        let expected = load::value_of(expected).map_err(BuildError::from)?;
        match runtime.global(name) {
            | Some(found) if snap_equals(&found, &expected) => {}
            | Some(found) => {
                mismatches.push(format!("\t`{}`: expected {}, found {}", name, expected, found))
            }
            | None => mismatches.push(format!("\t`{}`: expected {}, but it is not declared", name, expected)),
        }
    }
    match mismatches.is_empty() {
        | true => Ok(()),
        | false => Err(BuildError::TestFailed(mismatches.join("\n"))),
    }
}

/// `run`: executes a project file with console output.
pub fn run_file(path: &std::path::Path, conf: &Conf, opts: RunOptions) -> Result<()> {
    let project = Project::new(path)?;
    let runtime = execute(&project, conf, opts, Box::new(Console::stdout()))?;
    report_failures(&runtime)
}

/// `check`: loads a project file without running it.
pub fn check_file(path: &std::path::Path, conf: &Conf) -> Result<Project> {
    let project = Project::new(path)?;
    load::build_stage(&project, conf.settings(), Box::new(Silent))?;
    Ok(project)
}

/// `test`: runs a project quietly, then checks its failures and
/// expectations.
pub fn test_project(project: &Project, conf: &Conf, opts: RunOptions) -> Result<()> {
    let runtime = execute(project, conf, opts, Box::new(Silent))?;
    let result = report_failures(&runtime).and_then(|()| check_expectations(project, &runtime));
    let verdict = match &result {
        | Ok(()) => "ok".green(),
        | Err(_) => "FAILED".red(),
    };
    println!("test {} ... {}", project.name, verdict);
    result
}

pub fn test_file(path: &std::path::Path, conf: &Conf, opts: RunOptions) -> Result<()> {
    test_project(&Project::new(path)?, conf, opts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const COUNTER: &str = r#"
        name = "counter"
        [variables]
        n = 0
        [stage]
        scripts = [[["receiveGo"], ["doRepeat", 4, [["doChangeVar", "n", 1]]]]]
        [expect]
        n = 4
    "#;

    #[test]
    fn expectations_pass() {
        let project = Project::parse(COUNTER).unwrap();
        test_project(&project, &Conf::default(), RunOptions::default()).unwrap();
    }

    #[test]
    fn expectations_report_mismatches() {
        let project = Project::parse(&COUNTER.replace("n = 4", "n = 5")).unwrap();
        let err = test_project(&project, &Conf::default(), RunOptions::default()).unwrap_err();
        assert!(matches!(err, BuildError::TestFailed(msg) if msg.contains("expected 5, found 4")));
    }

    #[test]
    fn failing_processes_fail_the_run() {
        let project = Project::parse(
            r#"
            name = "broken"
            [stage]
            scripts = [[["receiveGo"], ["doSetVar", "ghost", 1]]]
            "#,
        )
        .unwrap();
        let runtime = execute(&project, &Conf::default(), RunOptions::default(), Box::new(Silent)).unwrap();
        assert_eq!(runtime.failures().len(), 1);
        assert!(matches!(report_failures(&runtime), Err(BuildError::ProcessesFailed(1))));
    }

    #[test]
    fn fast_track_reaches_the_same_state() {
        let project = Project::parse(COUNTER).unwrap();
        let opts = RunOptions { fast: true, max_ticks: Some(10) };
        let runtime = execute(&project, &Conf::default(), opts, Box::new(Silent)).unwrap();
        assert_eq!(runtime.global("n").unwrap().to_string(), "4");
    }
}
