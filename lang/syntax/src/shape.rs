//! Slot shapes, read off the `%` tokens of a block spec.

/* ---------------------------------- Shape --------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RingKind {
    Command,
    Reporter,
    Predicate,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandSlot {
    /// `%c`, the body of a control primitive; never evaluated as an input
    Static,
    /// `%cs`, a body handed to a custom block as a closure
    Dynamic,
    /// `%cmd`
    Plain,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ItemShape {
    Input,
    Template,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SlotShape {
    Input { numeric: bool, unevaluated: bool },
    /// `%l`, a hole that accepts any reporter, typically a list
    Argument,
    Boolean { unevaluated: bool },
    Command(CommandSlot),
    Reporter { predicate: bool, function: bool },
    /// the content of a ring block
    RingBody(RingKind),
    /// a slot pre-filled with a nested ring
    Ring(RingKind),
    Variadic { item: ItemShape, can_be_empty: bool },
    Template { upvar: bool },
}

const TEXT_INPUTS: &[&str] = &[
    "%s", "%txt", "%msg", "%var", "%idx", "%ida", "%fun", "%typ", "%delim", "%dates",
    "%stopChoices", "%stopOthersChoices", "%cln", "%spr", "%att", "%msgHat", "%keyHat", "%txtfun",
    "%code", "%codeKind", "%codeListPart", "%codeListKind",
];

impl SlotShape {
    /// `None` for words that are labels, including symbols such as `%greenflag`
    pub fn parse(token: &str) -> Option<SlotShape> {
        use SlotShape::*;
        let shape = match token {
            | "%n" => Input { numeric: true, unevaluated: false },
            | "%anyUE" => Input { numeric: false, unevaluated: true },
            | "%l" | "%obj" => Argument,
            | "%b" => Boolean { unevaluated: false },
            | "%boolUE" => Boolean { unevaluated: true },
            | "%c" => Command(CommandSlot::Static),
            | "%cs" => Command(CommandSlot::Dynamic),
            | "%cmd" => Command(CommandSlot::Plain),
            | "%r" => Reporter { predicate: false, function: false },
            | "%p" => Reporter { predicate: true, function: false },
            | "%f" => Reporter { predicate: false, function: true },
            | "%rc" => RingBody(RingKind::Command),
            | "%rr" => RingBody(RingKind::Reporter),
            | "%rp" => RingBody(RingKind::Predicate),
            | "%cmdRing" => Ring(RingKind::Command),
            | "%repRing" => Ring(RingKind::Reporter),
            | "%predRing" => Ring(RingKind::Predicate),
            | "%mult%s" | "%words" => Variadic { item: ItemShape::Input, can_be_empty: true },
            | "%inputs" | "%exp" => Variadic { item: ItemShape::Input, can_be_empty: false },
            | "%ringparms" => Variadic { item: ItemShape::Template, can_be_empty: true },
            | "%scriptVars" | "%parms" => {
                Variadic { item: ItemShape::Template, can_be_empty: false }
            }
            | "%t" => Template { upvar: false },
            | "%upvar" => Template { upvar: true },
            | _ if TEXT_INPUTS.contains(&token) => Input { numeric: false, unevaluated: false },
            | _ => return None,
        };
        Some(shape)
    }

    /// special-form slots are reified instead of evaluated
    pub fn is_unevaluated(&self) -> bool {
        matches!(
            self,
            SlotShape::Input { unevaluated: true, .. }
                | SlotShape::Boolean { unevaluated: true }
                | SlotShape::Reporter { function: true, .. }
        )
    }

    pub fn is_static(&self) -> bool {
        matches!(self, SlotShape::Command(CommandSlot::Static))
    }

    pub fn is_template(&self) -> bool {
        matches!(self, SlotShape::Template { .. })
    }

    pub fn describe(&self) -> &'static str {
        match self {
            | SlotShape::Input { numeric: true, .. } => "a number input",
            | SlotShape::Input { .. } => "a text input",
            | SlotShape::Argument => "an argument hole",
            | SlotShape::Boolean { .. } => "a boolean slot",
            | SlotShape::Command(_) => "a command slot",
            | SlotShape::Reporter { .. } => "a reporter slot",
            | SlotShape::RingBody(_) => "a ring body",
            | SlotShape::Ring(_) => "a ring slot",
            | SlotShape::Variadic { .. } => "a variadic slot",
            | SlotShape::Template { .. } => "a template",
        }
    }
}

/* ---------------------------------- Spec ---------------------------------- */

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpecPart<'s> {
    Label(&'s str),
    Slot(SlotShape),
}

/// Splits a spec such as `repeat %n %c` into labels and slots.
pub fn parse_spec(spec: &str) -> Vec<SpecPart<'_>> {
    spec.split_whitespace()
        .map(|word| match SlotShape::parse(word) {
            | Some(shape) => SpecPart::Slot(shape),
            | None => SpecPart::Label(word),
        })
        .collect()
}

pub fn spec_shapes(spec: &str) -> Vec<SlotShape> {
    parse_spec(spec)
        .into_iter()
        .filter_map(|part| match part {
            | SpecPart::Slot(shape) => Some(shape),
            | SpecPart::Label(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn symbols_are_labels() {
        assert_eq!(
            parse_spec("when %greenflag clicked"),
            vec![SpecPart::Label("when"), SpecPart::Label("%greenflag"), SpecPart::Label("clicked")]
        );
    }

    #[test]
    fn custom_spec_shapes() {
        assert_eq!(
            spec_shapes("for each %upvar in %l %cs"),
            vec![
                SlotShape::Template { upvar: true },
                SlotShape::Argument,
                SlotShape::Command(CommandSlot::Dynamic)
            ]
        );
    }
}
