//! Constructing block trees. Every constructor checks the slot shapes, so a
//! tree that builds is a tree the evaluator can run.

use crate::{block::*, custom::CustomBlockDefinition, err::*, selector::Selector, shape::*};
use std::rc::Rc;

/// One input as a loader sees it, before its slot shape is applied.
#[derive(Clone, Debug)]
pub enum Arg {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Option(String),
    Block(RcBlock),
    Script(Script),
    Items(Vec<Arg>),
    /// a ring written out with its formal parameters
    Ring { body: Box<Arg>, params: Vec<String> },
}

impl Arg {
    pub fn block(block: Block) -> Self {
        Arg::Block(Rc::new(block))
    }
    pub fn text(s: impl Into<String>) -> Self {
        Arg::Text(s.into())
    }
    fn describe(&self) -> &'static str {
        match self {
            | Arg::Empty => "nothing",
            | Arg::Text(_) => "text",
            | Arg::Number(_) => "a number",
            | Arg::Bool(_) => "a boolean",
            | Arg::Option(_) => "a menu option",
            | Arg::Block(block) if block.is_reporter() => "a reporter",
            | Arg::Block(_) => "a command",
            | Arg::Script(_) => "a script",
            | Arg::Items(_) => "a list of inputs",
            | Arg::Ring { .. } => "a ring",
        }
    }
}

impl Block {
    pub fn build(selector: Selector, args: Vec<Arg>) -> Result<Block> {
        if matches!(selector, Selector::ReportGetVar | Selector::EvaluateCustomBlock) {
            Err(SyntaxError::Arity { block: selector.to_string(), expected: 0, found: args.len() })?
        }
        let inputs = fill(selector.as_str(), &selector.shapes(), args)?;
        Ok(Block { selector, kind: selector.kind(), label: None, inputs })
    }

    pub fn getter(name: impl AsRef<str>) -> Block {
        Block {
            selector: Selector::ReportGetVar,
            kind: BlockKind::Reporter,
            label: Some(name.as_ref().into()),
            inputs: Vec::new(),
        }
    }

    /// A ring around `body`, which may be empty, a reporter, or a script.
    pub fn ring(kind: RingKind, body: Arg, params: Vec<String>) -> Result<Block> {
        let selector = match kind {
            | RingKind::Command => Selector::ReifyScript,
            | RingKind::Reporter => Selector::ReifyReporter,
            | RingKind::Predicate => Selector::ReifyPredicate,
        };
        let content = match (kind, body) {
            | (_, Arg::Empty) => Content::Empty,
            | (RingKind::Command, Arg::Script(script)) => Content::Script(commands(script)?),
            | (RingKind::Command, Arg::Block(block)) if !block.is_reporter() => {
                Content::Script(commands(Script::new(vec![block]))?)
            }
            | (RingKind::Reporter | RingKind::Predicate, Arg::Block(block))
                if block.is_reporter() =>
            {
                Content::Nested(block)
            }
            | (_, arg) => Err(SyntaxError::BadSlot {
                block: selector.to_string(),
                index: 0,
                shape: SlotShape::RingBody(kind).describe(),
                found: arg.describe(),
            })?,
        };
        let params = params
            .into_iter()
            .map(|name| Slot::new(SlotShape::Template { upvar: false }, Content::Name(name.into())))
            .collect::<Vec<_>>();
        let inputs = vec![
            Slot::new(SlotShape::RingBody(kind), content),
            Slot::new(
                SlotShape::Variadic { item: ItemShape::Template, can_be_empty: true },
                Content::Items(params.into()),
            ),
        ];
        Ok(Block { selector, kind: BlockKind::Ring(kind), label: None, inputs })
    }

    pub fn custom(def: &CustomBlockDefinition, args: Vec<Arg>) -> Result<Block> {
        let shapes = def.shapes();
        let inputs = fill(&def.spec, &shapes, args)?;
        Ok(Block {
            selector: Selector::EvaluateCustomBlock,
            kind: def.kind,
            label: Some(def.spec.clone()),
            inputs,
        })
    }
}

/// Checks a sequence meant for a C-slot or ring: commands only, no hats.
pub fn commands(script: Script) -> Result<Script> {
    for block in script.iter() {
        if block.is_hat() {
            Err(SyntaxError::MisplacedHat(block.spec().to_owned()))?
        }
        if block.is_reporter() {
            Err(SyntaxError::NotACommand(block.spec().to_owned()))?
        }
    }
    Ok(script)
}

/// Checks a receiver's script: a hat may lead, and a lone reporter is allowed.
pub fn top_level(script: Script) -> Result<Script> {
    if script.is_empty() {
        Err(SyntaxError::EmptyScript)?
    }
    if script.lone_reporter().is_some() {
        return Ok(script);
    }
    commands(script.body())?;
    Ok(script)
}

fn fill(owner: &str, shapes: &[SlotShape], args: Vec<Arg>) -> Result<Vec<Slot>> {
    if shapes.len() != args.len() {
        Err(SyntaxError::Arity { block: owner.to_owned(), expected: shapes.len(), found: args.len() })?
    }
    shapes
        .iter()
        .zip(args)
        .enumerate()
        .map(|(index, (shape, arg))| slot(owner, index, *shape, arg))
        .collect()
}

fn slot(owner: &str, index: usize, shape: SlotShape, arg: Arg) -> Result<Slot> {
    let bad = |arg: &Arg| SyntaxError::BadSlot {
        block: owner.to_owned(),
        index,
        shape: shape.describe(),
        found: arg.describe(),
    };
    let content = match (shape, arg) {
        | (_, Arg::Empty) => Content::Empty,
        | (SlotShape::Input { .. } | SlotShape::Argument, Arg::Text(text)) => {
            Content::Literal(Literal::Text(text.into()))
        }
        | (SlotShape::Input { .. } | SlotShape::Argument, Arg::Number(n)) => {
            Content::Literal(Literal::Number(n))
        }
        | (SlotShape::Input { .. }, Arg::Option(choice)) => {
            Content::Literal(Literal::Option(choice.into()))
        }
        | (SlotShape::Input { .. } | SlotShape::Argument | SlotShape::Boolean { .. }, Arg::Bool(b)) => {
            Content::Literal(Literal::Bool(b))
        }
        | (
            SlotShape::Input { .. }
            | SlotShape::Argument
            | SlotShape::Boolean { .. }
            | SlotShape::Reporter { .. }
            | SlotShape::Ring(_),
            Arg::Block(block),
        ) => {
            if !block.is_reporter() {
                Err(SyntaxError::NotAReporter(block.spec().to_owned()))?
            }
            Content::Nested(block)
        }
        | (SlotShape::Command(_), Arg::Script(script)) => Content::Script(commands(script)?),
        | (SlotShape::Command(_), Arg::Block(block)) if !block.is_reporter() => {
            Content::Script(commands(Script::new(vec![block]))?)
        }
        | (SlotShape::Ring(kind), Arg::Ring { body, params }) => {
            Content::Nested(Rc::new(Block::ring(kind, *body, params)?))
        }
        | (SlotShape::Ring(RingKind::Command), Arg::Script(script)) => {
            Content::Nested(Rc::new(Block::ring(RingKind::Command, Arg::Script(script), vec![])?))
        }
        | (SlotShape::Variadic { item, .. }, Arg::Items(items)) => {
            let item_shape = match item {
                | ItemShape::Input => SlotShape::Input { numeric: false, unevaluated: false },
                | ItemShape::Template => SlotShape::Template { upvar: false },
            };
            let items = items
                .into_iter()
                .map(|arg| slot(owner, index, item_shape, arg))
                .collect::<Result<Vec<_>>>()?;
            Content::Items(items.into())
        }
        | (SlotShape::Template { .. }, Arg::Text(name)) => Content::Name(name.into()),
        | (_, arg) => Err(bad(&arg))?,
    };
    // empty rings and variadics read as their empty forms
    let content = match (shape, content) {
        | (SlotShape::Ring(kind), Content::Empty) => {
            Content::Nested(Rc::new(Block::ring(kind, Arg::Empty, vec![])?))
        }
        | (SlotShape::Variadic { .. }, Content::Empty) => Content::Items(Rc::new([])),
        | (_, content) => content,
    };
    Ok(Slot::new(shape, content))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn arity_is_checked() {
        let err = Block::build(Selector::DoRepeat, vec![Arg::Number(3.0)]).unwrap_err();
        assert_eq!(err, SyntaxError::Arity { block: "doRepeat".into(), expected: 2, found: 1 });
    }

    #[test]
    fn commands_cannot_fill_inputs() {
        let stop = Block::build(Selector::DoStop, vec![]).unwrap();
        let err = Block::build(Selector::Bubble, vec![Arg::block(stop)]).unwrap_err();
        assert_eq!(err, SyntaxError::NotAReporter("stop script".into()));
    }

    #[test]
    fn hats_only_lead_scripts() {
        let go = Rc::new(Block::build(Selector::ReceiveGo, vec![]).unwrap());
        let stop = Rc::new(Block::build(Selector::DoStop, vec![]).unwrap());
        assert!(top_level(Script::new(vec![go.clone(), stop.clone()])).is_ok());
        assert!(top_level(Script::new(vec![stop, go])).is_err());
    }

    #[test]
    fn empty_ring_slot_holds_an_empty_ring() {
        let run = Block::build(Selector::DoRun, vec![Arg::Empty, Arg::Items(vec![])]).unwrap();
        let ring = run.inputs[0].nested().unwrap();
        assert_eq!(ring.ring_kind(), Some(RingKind::Command));
    }
}
