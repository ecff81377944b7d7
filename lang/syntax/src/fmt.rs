//! One-line renderings of blocks, for logs and error reports.

use crate::{block::*, shape::*};

#[impl_tools::autoimpl(for<T: trait + ?Sized> &T, &mut T, Box<T>, std::rc::Rc<T>)]
pub trait Ugly<'a, Fmter> {
    fn ugly(&self, f: &'a Fmter) -> String;
}

/// Nesting beyond `max_depth` renders as `...`.
#[derive(Clone, Copy, Debug)]
pub struct Formatter {
    pub max_depth: usize,
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter { max_depth: 3 }
    }
}

impl Formatter {
    fn deeper(&self) -> Option<Formatter> {
        self.max_depth.checked_sub(1).map(|max_depth| Formatter { max_depth })
    }
}

impl<'a> Ugly<'a, Formatter> for Literal {
    fn ugly(&self, _f: &'a Formatter) -> String {
        match self {
            | Literal::Text(text) => text.to_string(),
            | Literal::Number(n) => n.to_string(),
            | Literal::Bool(b) => b.to_string(),
            | Literal::Option(choice) => format!("[{}]", choice),
        }
    }
}

impl<'a> Ugly<'a, Formatter> for Slot {
    fn ugly(&self, f: &'a Formatter) -> String {
        let Some(inner) = f.deeper() else { return "...".to_owned() };
        match &self.content {
            | Content::Empty => "[]".to_owned(),
            | Content::Literal(lit) => lit.ugly(f),
            | Content::Nested(block) => format!("({})", block.ugly(&inner)),
            | Content::Script(script) => format!("{{ {} }}", script.ugly(&inner)),
            | Content::Items(items) => {
                items.iter().map(|item| item.ugly(f)).collect::<Vec<_>>().join(" ")
            }
            | Content::Name(name) => name.to_string(),
        }
    }
}

impl<'a> Ugly<'a, Formatter> for Script {
    fn ugly(&self, f: &'a Formatter) -> String {
        self.iter().map(|block| block.ugly(f)).collect::<Vec<_>>().join("; ")
    }
}

impl<'a> Ugly<'a, Formatter> for Block {
    fn ugly(&self, f: &'a Formatter) -> String {
        let mut slots = self.inputs.iter();
        let mut words = Vec::new();
        for part in parse_spec(self.spec()) {
            match part {
                | SpecPart::Label(label) => words.push(label.to_owned()),
                | SpecPart::Slot(_) => match slots.next() {
                    | Some(slot) => words.push(slot.ugly(f)),
                    | None => words.push("[]".to_owned()),
                },
            }
        }
        words.join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build::Arg, selector::Selector};
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_nested_reporters() {
        let sum = Block::build(Selector::ReportSum, vec![Arg::block(Block::getter("n")), Arg::Number(1.0)])
            .unwrap();
        let set = Block::build(Selector::DoSetVar, vec![Arg::text("n"), Arg::block(sum)]).unwrap();
        assert_eq!(set.ugly(&Formatter::default()), "set n to (n + 1)");
    }
}
