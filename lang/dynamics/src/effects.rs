//! Where primitives with visible side effects send their output.

use crate::threads::ProcessId;
use std::{
    cell::RefCell,
    io::{self, Write},
    rc::Rc,
};

pub trait Effects {
    fn bubble(&mut self, receiver: &str, text: &str, thought: bool);
    fn alert(&mut self, text: &str);
    fn log(&mut self, text: &str);
    fn start_warp(&mut self, _receiver: &str) {}
    fn end_warp(&mut self, _receiver: &str) {}
    fn report_error(&mut self, process: ProcessId, receiver: &str, message: &str);
}

fn bubble_line(receiver: &str, text: &str, thought: bool) -> String {
    let verb = if thought { "thinks" } else { "says" };
    format!("{} {}: {}", receiver, verb, text)
}

/* --------------------------------- Console -------------------------------- */

/// Writes bubbles and alerts as lines of text.
pub struct Console<W = io::Stdout> {
    out: W,
}

impl Console {
    pub fn stdout() -> Self {
        Console { out: io::stdout() }
    }
}

impl<W: Write> Console<W> {
    pub fn new(out: W) -> Self {
        Console { out }
    }

    fn line(&mut self, line: String) {
        if let Err(err) = writeln!(self.out, "{}", line) {
            log::warn!("console output failed: {}", err);
        }
    }
}

impl<W: Write> Effects for Console<W> {
    fn bubble(&mut self, receiver: &str, text: &str, thought: bool) {
        self.line(bubble_line(receiver, text, thought))
    }
    fn alert(&mut self, text: &str) {
        self.line(format!("alert: {}", text))
    }
    fn log(&mut self, text: &str) {
        log::info!("{}", text);
        self.line(format!("log: {}", text))
    }
    fn report_error(&mut self, process: ProcessId, receiver: &str, message: &str) {
        self.line(format!("error in {} ({}): {}", receiver, process, message))
    }
}

/* ------------------------------- Transcript ------------------------------- */

/// Records every effect as a line. Clones share the same record, so a test
/// can keep one and hand another to the stage.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    lines: Rc<RefCell<Vec<String>>>,
}

impl Transcript {
    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }
    fn push(&self, line: String) {
        self.lines.borrow_mut().push(line);
    }
}

impl Effects for Transcript {
    fn bubble(&mut self, receiver: &str, text: &str, thought: bool) {
        self.push(bubble_line(receiver, text, thought))
    }
    fn alert(&mut self, text: &str) {
        self.push(format!("alert: {}", text))
    }
    fn log(&mut self, text: &str) {
        log::info!("{}", text);
        self.push(format!("log: {}", text))
    }
    fn start_warp(&mut self, receiver: &str) {
        self.push(format!("{} warps", receiver))
    }
    fn end_warp(&mut self, receiver: &str) {
        self.push(format!("{} unwarps", receiver))
    }
    fn report_error(&mut self, _process: ProcessId, receiver: &str, message: &str) {
        self.push(format!("error in {}: {}", receiver, message))
    }
}

/* --------------------------------- Silent --------------------------------- */

#[derive(Clone, Copy, Debug, Default)]
pub struct Silent;

impl Effects for Silent {
    fn bubble(&mut self, _receiver: &str, _text: &str, _thought: bool) {}
    fn alert(&mut self, _text: &str) {}
    fn log(&mut self, text: &str) {
        log::info!("{}", text);
    }
    fn report_error(&mut self, _process: ProcessId, _receiver: &str, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn console_prints_bubbles() {
        let mut console = Console::new(Vec::new());
        console.bubble("Sprite", "hi", false);
        console.bubble("Sprite", "hmm", true);
        assert_eq!(String::from_utf8(console.out).unwrap(), "Sprite says: hi\nSprite thinks: hmm\n");
    }

    #[test]
    fn transcript_clones_share_lines() {
        let kept = Transcript::default();
        let mut given = kept.clone();
        given.alert("careful");
        assert_eq!(kept.lines(), vec!["alert: careful".to_owned()]);
    }
}
