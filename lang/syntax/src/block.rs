use crate::{selector::Selector, shape::*};
use derive_more::{Deref, From};
use std::rc::Rc;

/* ---------------------------------- Block --------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BlockKind {
    Command,
    /// a trigger; skipped when its script runs
    Hat,
    Reporter,
    Predicate,
    /// a reporter that evaluates to a closure over its contents
    Ring(RingKind),
}

impl BlockKind {
    pub fn is_reporter(&self) -> bool {
        matches!(self, BlockKind::Reporter | BlockKind::Predicate | BlockKind::Ring(_))
    }
}

pub type RcBlock = Rc<Block>;

#[derive(Clone, Debug)]
pub struct Block {
    pub selector: Selector,
    pub kind: BlockKind,
    /// the variable name of a getter, or the spec of a custom block
    pub label: Option<Rc<str>>,
    pub inputs: Vec<Slot>,
}

/// A statement sequence. Only the first block of a top-level script may be a
/// hat.
#[derive(Clone, Debug, Default, Deref, From)]
pub struct Script(pub Rc<[RcBlock]>);

/* ---------------------------------- Slot ---------------------------------- */

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    /// the n-th empty slot of a closure, counting from 1
    Slot(usize),
    /// all arguments of the call, as a list
    Arguments,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Literal {
    Text(Rc<str>),
    Number(f64),
    Bool(bool),
    /// a menu choice such as "last" or "all"
    Option(Rc<str>),
}

#[derive(Clone, Debug)]
pub enum Content {
    Empty,
    Literal(Literal),
    Nested(RcBlock),
    Script(Script),
    Items(Rc<[Slot]>),
    /// the declared name of a template
    Name(Rc<str>),
}

#[derive(Clone, Debug)]
pub struct Slot {
    pub shape: SlotShape,
    pub content: Content,
    /// set on empty slots when their block is reified
    pub binding: Option<Binding>,
}

/* ---------------------------------- Impls --------------------------------- */

impl Block {
    pub fn is_hat(&self) -> bool {
        self.kind == BlockKind::Hat
    }
    pub fn is_reporter(&self) -> bool {
        self.kind.is_reporter()
    }
    pub fn ring_kind(&self) -> Option<RingKind> {
        match self.kind {
            | BlockKind::Ring(kind) => Some(kind),
            | _ => None,
        }
    }
    pub fn is_custom(&self) -> bool {
        self.selector == Selector::EvaluateCustomBlock
    }
    /// the user-facing label: the spec for custom blocks, the name for getters
    pub fn spec(&self) -> &str {
        match &self.label {
            | Some(label) => label,
            | None => self.selector.spec(),
        }
    }
    /// the script held by a C-slot; an empty slot reads as an empty script
    pub fn script_at(&self, idx: usize) -> Option<Script> {
        match &self.inputs.get(idx)?.content {
            | Content::Script(script) => Some(script.clone()),
            | Content::Empty => Some(Script::default()),
            | _ => None,
        }
    }
    pub fn literal_at(&self, idx: usize) -> Option<&Literal> {
        match &self.inputs.get(idx)?.content {
            | Content::Literal(lit) => Some(lit),
            | _ => None,
        }
    }
    /// a copy of this block whose `idx`-th slot reads the first argument of
    /// the closure it ends up in
    pub fn with_bound_input(&self, idx: usize) -> Option<Block> {
        let mut block = self.clone();
        let slot = block.inputs.get_mut(idx)?;
        slot.bind_first();
        Some(block)
    }
    /// Copies the block, numbering its empty slots in evaluation order.
    /// Rings nested inside keep their own empty slots.
    pub fn mark_empty_slots(&self, counter: &mut usize) -> Block {
        let inputs = self.inputs.iter().map(|slot| slot.mark_empty_slots(counter)).collect();
        Block { selector: self.selector, kind: self.kind, label: self.label.clone(), inputs }
    }
}

impl Script {
    pub fn new(blocks: Vec<RcBlock>) -> Self {
        Script(blocks.into())
    }
    pub fn hat(&self) -> Option<&RcBlock> {
        self.first().filter(|block| block.is_hat())
    }
    /// the runnable part of a script: everything after its hat
    pub fn body(&self) -> Script {
        match self.hat() {
            | Some(_) => Script(self[1..].iter().cloned().collect()),
            | None => self.clone(),
        }
    }
    /// a top-level script made of one reporter, run for its value
    pub fn lone_reporter(&self) -> Option<&RcBlock> {
        match &self[..] {
            | [block] if block.is_reporter() => Some(block),
            | _ => None,
        }
    }
    pub fn mark_empty_slots(&self, counter: &mut usize) -> Script {
        Script(self.iter().map(|block| Rc::new(block.mark_empty_slots(counter))).collect())
    }
    pub fn ptr_eq(&self, other: &Script) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Slot {
    pub fn new(shape: SlotShape, content: Content) -> Self {
        Slot { shape, content, binding: None }
    }
    pub fn empty(shape: SlotShape) -> Self {
        Slot::new(shape, Content::Empty)
    }
    pub fn nested(&self) -> Option<&RcBlock> {
        match &self.content {
            | Content::Nested(block) => Some(block),
            | _ => None,
        }
    }
    pub fn name(&self) -> Option<&Rc<str>> {
        match &self.content {
            | Content::Name(name) => Some(name),
            | Content::Literal(Literal::Text(name)) => Some(name),
            | _ => None,
        }
    }
    /// Whether the slot counts as unfilled when its block is reified.
    pub fn is_empty_slot(&self) -> bool {
        match (&self.shape, &self.content) {
            | (SlotShape::Input { .. }, Content::Empty) => true,
            | (SlotShape::Input { .. }, Content::Literal(Literal::Text(text))) => text.is_empty(),
            | (SlotShape::Argument, Content::Empty) => true,
            | (SlotShape::Boolean { .. }, Content::Empty) => true,
            | (SlotShape::Command(CommandSlot::Static), _) => false,
            | (SlotShape::Command(_), Content::Empty) => true,
            | (SlotShape::Reporter { .. }, Content::Empty) => true,
            | (SlotShape::Variadic { can_be_empty: true, .. }, Content::Items(items)) => {
                items.is_empty()
            }
            | (SlotShape::Variadic { can_be_empty: true, .. }, Content::Empty) => true,
            | _ => false,
        }
    }
    /// empties the slot and binds it to the first argument of a call
    pub fn bind_first(&mut self) {
        self.content = Content::Empty;
        self.binding = Some(Binding::Slot(1));
    }
    pub fn mark_empty_slots(&self, counter: &mut usize) -> Slot {
        if self.binding.is_none() && self.is_empty_slot() {
            *counter += 1;
            let binding = match self.shape {
                | SlotShape::Variadic { .. } => Binding::Arguments,
                | _ => Binding::Slot(*counter),
            };
            return Slot { binding: Some(binding), ..self.clone() };
        }
        let content = match &self.content {
            | Content::Nested(block) if block.ring_kind().is_none() => {
                Content::Nested(Rc::new(block.mark_empty_slots(counter)))
            }
            | Content::Script(script) => Content::Script(script.mark_empty_slots(counter)),
            | Content::Items(items) => {
                Content::Items(items.iter().map(|item| item.mark_empty_slots(counter)).collect())
            }
            | content => content.clone(),
        };
        Slot { content, ..self.clone() }
    }
}

impl Literal {
    pub fn text(s: impl AsRef<str>) -> Self {
        Literal::Text(s.as_ref().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::Arg;
    use pretty_assertions::assert_eq;

    fn bindings(block: &Block) -> Vec<Option<Binding>> {
        block.inputs.iter().map(|slot| slot.binding).collect()
    }

    #[test]
    fn empty_slots_number_in_evaluation_order() {
        let sum =
            Block::build(Selector::ReportSum, vec![Arg::Empty, Arg::Number(3.0)]).unwrap();
        let outer =
            Block::build(Selector::ReportProduct, vec![Arg::Empty, Arg::block(sum)]).unwrap();
        let mut counter = 0;
        let marked = outer.mark_empty_slots(&mut counter);
        assert_eq!(counter, 2);
        assert_eq!(bindings(&marked), vec![Some(Binding::Slot(1)), None]);
        let inner = marked.inputs[1].nested().unwrap();
        assert_eq!(bindings(inner), vec![Some(Binding::Slot(2)), None]);
    }

    #[test]
    fn nested_rings_keep_their_holes() {
        let sum = Block::build(Selector::ReportSum, vec![Arg::Empty, Arg::Empty]).unwrap();
        let ring = Block::ring(RingKind::Reporter, Arg::block(sum), vec![]).unwrap();
        let call =
            Block::build(Selector::Evaluate, vec![Arg::block(ring), Arg::Items(vec![])]).unwrap();
        let mut counter = 0;
        call.mark_empty_slots(&mut counter);
        assert_eq!(counter, 0);
    }

    #[test]
    fn empty_variadic_binds_all_arguments() {
        let list = Block::build(Selector::ReportJoinWords, vec![Arg::Items(vec![])]).unwrap();
        let mut counter = 0;
        let marked = list.mark_empty_slots(&mut counter);
        assert_eq!(bindings(&marked), vec![Some(Binding::Arguments)]);
    }

    #[test]
    fn hat_is_not_part_of_the_body() {
        let hat = Rc::new(Block::build(Selector::ReceiveGo, vec![]).unwrap());
        let stop = Rc::new(Block::build(Selector::DoStop, vec![]).unwrap());
        let script = Script::new(vec![hat, stop]);
        assert!(script.hat().is_some());
        assert_eq!(script.body().len(), 1);
    }
}
