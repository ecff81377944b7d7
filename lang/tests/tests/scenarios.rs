use blox_driver::{Conf, Project, RunOptions, execute};
use blox_dynamics::prelude::*;
use pretty_assertions::assert_eq;
use std::time::Duration;

fn boot(source: &str, settings: Settings) -> (Runtime, Transcript) {
    let project = Project::parse(source).unwrap();
    let transcript = Transcript::default();
    let stage =
        blox_driver::load::build_stage(&project, settings, Box::new(transcript.clone())).unwrap();
    (Runtime::new(stage), transcript)
}

fn run(source: &str) -> (Runtime, Vec<String>) {
    let project = Project::parse(source).unwrap();
    let transcript = Transcript::default();
    let runtime =
        execute(&project, &Conf::default(), RunOptions::default(), Box::new(transcript.clone()))
            .unwrap();
    (runtime, transcript.lines())
}

#[test]
fn processes_interleave_one_step_per_tick() {
    let (runtime, _) = run(r#"
        name = "interleave"
        [variables]
        trace = []
        [[sprites]]
        name = "A"
        scripts = [[["receiveGo"], ["doRepeat", 3, [["doAddToList", "a", { var = "trace" }]]]]]
        [[sprites]]
        name = "B"
        scripts = [[["receiveGo"], ["doRepeat", 3, [["doAddToList", "b", { var = "trace" }]]]]]
    "#);
    assert_eq!(runtime.global("trace").unwrap().to_string(), "[a, b, a, b, a, b]");
}

#[test]
fn bubbles_name_their_sprite() {
    let (_, lines) = run(r#"
        name = "bubbles"
        [[sprites]]
        name = "Cat"
        scripts = [[["receiveGo"], ["bubble", ["reportJoinWords", ["meow", " ", 3]]], ["doThink", "hmm"]]]
    "#);
    assert_eq!(lines, vec!["Cat says: meow 3".to_owned(), "Cat thinks: hmm".to_owned()]);
}

#[test]
fn errors_stop_only_their_process() {
    let (runtime, lines) = run(r#"
        name = "errors"
        [variables]
        laps = 0
        done = false
        [[sprites]]
        name = "Broken"
        scripts = [[
            ["receiveGo"],
            ["doRepeat", 2, [["doChangeVar", "laps", 1]]],
            ["doSetVar", "missing", 1],
            ["doSetVar", "done", "oops"],
        ]]
        [[sprites]]
        name = "Fine"
        scripts = [[["receiveGo"], ["doRepeat", 5, [["doChangeVar", "laps", 1]]], ["doSetVar", "done", true]]]
    "#);
    let failures = runtime.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(&*failures[0].receiver, "Broken");
    assert!(lines.iter().any(|line| line.starts_with("error in Broken")));
    assert_eq!(runtime.global("done").unwrap().to_string(), "true");
    assert_eq!(runtime.global("laps").unwrap().to_string(), "7");
}

#[test]
fn warp_regions_are_announced_once() {
    let (_, lines) = run(r#"
        name = "warp"
        [[sprites]]
        name = "Cat"
        scripts = [[["receiveGo"], ["doWarp", [["doWarp", [["log", ["inner"]]]]]]]]
    "#);
    assert_eq!(lines, vec![
        "Cat warps".to_owned(),
        "log: inner".to_owned(),
        "Cat unwarps".to_owned(),
    ]);
}

#[test]
fn a_reporting_script_bubbles_its_result() {
    let project = Project::parse(
        r#"
        name = "lone"
        [[sprites]]
        name = "Cat"
        scripts = [[["reportSum", 1, 2]]]
        "#,
    )
    .unwrap();
    let transcript = Transcript::default();
    let stage = blox_driver::load::build_stage(
        &project,
        Settings::default(),
        Box::new(transcript.clone()),
    )
    .unwrap();
    let mut runtime = Runtime::new(stage);
    let cat = runtime.stage.find("Cat").unwrap();
    runtime.start_script(ScriptId { receiver: cat, index: 0 }).unwrap();
    runtime.run_until_idle(10);
    assert_eq!(transcript.lines(), vec!["Cat says: 3".to_owned()]);
}

#[test]
fn thread_safe_sprites_keep_running_scripts() {
    let source = r#"
        name = "restart"
        [variables]
        starts = 0
        [[sprites]]
        name = "Cat"
        scripts = [[["receiveMessage", "go"], ["doChangeVar", "starts", 1], ["doWaitUntil", false]]]
    "#;
    for thread_safe in [false, true] {
        let mut project = Project::parse(source).unwrap();
        project.thread_safe = Some(thread_safe);
        let stage =
            blox_driver::load::build_stage(&project, Settings::default(), Box::new(Silent)).unwrap();
        let mut runtime = Runtime::new(stage);
        runtime.world().broadcast("go");
        runtime.run_until_idle(3);
        runtime.world().broadcast("go");
        runtime.run_until_idle(3);
        let starts = runtime.global("starts").unwrap().to_string();
        assert_eq!(runtime.threads.len(), 1);
        assert_eq!(starts, if thread_safe { "1" } else { "2" });
    }
}

#[test]
fn arity_errors_stop_only_their_process() {
    let (runtime, _) = run(r#"
        name = "arity"
        [variables]
        r = 0
        laps = 0
        done = false
        [[sprites]]
        name = "Broken"
        scripts = [[
            ["receiveGo"],
            ["doSetVar", "r", ["evaluate", { ring = ["reportSum", {}, {}] }, [1, 2, 3]]],
            ["doSetVar", "done", "oops"],
        ]]
        [[sprites]]
        name = "Fine"
        scripts = [[["receiveGo"], ["doRepeat", 3, [["doChangeVar", "laps", 1]]], ["doSetVar", "done", true]]]
    "#);
    let failures = runtime.failures();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].error, EvalError::Arity { expected: 2, found: 3 });
    assert_eq!(runtime.global("r").unwrap().to_string(), "0");
    assert_eq!(runtime.global("laps").unwrap().to_string(), "3");
    assert_eq!(runtime.global("done").unwrap().to_string(), "true");
}

#[test]
fn a_warped_forever_loop_still_yields() {
    let settings = Settings { atomic_timeout: Duration::from_millis(5), ..Settings::default() };
    let (mut runtime, _) = boot(
        r#"
        name = "starve"
        [variables]
        spins = 0
        n = 0
        [[sprites]]
        name = "Spinner"
        scripts = [[["receiveGo"], ["doWarp", [["doForever", [["doChangeVar", "spins", 1]]]]]]]
        [[sprites]]
        name = "Counter"
        scripts = [[["receiveGo"], ["doRepeat", 3, [["doChangeVar", "n", 1]]]]]
        "#,
        settings,
    );
    runtime.fire_green_flag();
    let summary = runtime.run_until_idle(20);
    assert_eq!(summary.halt, Halt::TickLimit);
    assert_eq!(runtime.global("n").unwrap().to_string(), "3");
    assert_eq!(runtime.threads.len(), 1);
}

#[test]
fn pausing_holds_wait_timers() {
    let (mut runtime, _) = boot(
        r#"
        name = "pause"
        [variables]
        done = false
        [stage]
        scripts = [[["receiveGo"], ["doWait", 0.2], ["doSetVar", "done", true]]]
        "#,
        Settings::default(),
    );
    runtime.fire_green_flag();
    runtime.step();
    runtime.step();
    runtime.pause_all();
    assert!(runtime.is_paused());
    std::thread::sleep(Duration::from_millis(300));
    runtime.resume_all();
    runtime.step();
    assert_eq!(runtime.global("done").unwrap().to_string(), "false");
    std::thread::sleep(Duration::from_millis(250));
    assert_eq!(runtime.run_until_idle(10).halt, Halt::Idle);
    assert_eq!(runtime.global("done").unwrap().to_string(), "true");
}

#[test]
fn restarting_a_script_keeps_finished_results() {
    let (mut runtime, transcript) = boot(
        r#"
        name = "restart-bubble"
        [[sprites]]
        name = "Cat"
        scripts = [
            [["receiveMessage", "go"], ["doWaitUntil", false]],
            [["reportSum", 1, 2]],
            [["doBroadcast", "go"]],
        ]
        "#,
        Settings::default(),
    );
    let cat = runtime.stage.find("Cat").unwrap();
    runtime.world().broadcast("go");
    runtime.start_script(ScriptId { receiver: cat, index: 1 }).unwrap();
    runtime.start_script(ScriptId { receiver: cat, index: 2 }).unwrap();
    runtime.run_until_idle(3);
    assert_eq!(transcript.lines(), vec!["Cat says: 3".to_owned()]);
    assert_eq!(runtime.threads.len(), 1);
}
