use crate::{block::*, err::*, shape::*};
use std::rc::Rc;

/// A user-defined block. Calls refer to it by spec, which keeps recursive
/// definitions free of reference cycles.
#[derive(Clone, Debug)]
pub struct CustomBlockDefinition {
    pub spec: Rc<str>,
    pub kind: BlockKind,
    pub params: Vec<Rc<str>>,
    pub body: Option<Script>,
    /// run the body as one warp region
    pub is_atomic: bool,
}

impl CustomBlockDefinition {
    pub fn new(spec: &str, kind: BlockKind, params: Vec<String>) -> Result<Self> {
        if !matches!(kind, BlockKind::Command | BlockKind::Reporter | BlockKind::Predicate) {
            Err(SyntaxError::BadCustomKind(spec.to_owned()))?
        }
        let slots = spec_shapes(spec).len();
        if slots != params.len() {
            Err(SyntaxError::ParamMismatch { spec: spec.to_owned(), slots, names: params.len() })?
        }
        Ok(CustomBlockDefinition {
            spec: spec.into(),
            kind,
            params: params.into_iter().map(Into::into).collect(),
            body: None,
            is_atomic: false,
        })
    }

    pub fn with_body(mut self, body: Script) -> Result<Self> {
        self.body = Some(crate::build::commands(body)?);
        Ok(self)
    }

    pub fn atomic(mut self, is_atomic: bool) -> Self {
        self.is_atomic = is_atomic;
        self
    }

    pub fn shapes(&self) -> Vec<SlotShape> {
        spec_shapes(&self.spec)
    }

    /// parameters paired with their slot shapes, in spec order
    pub fn declarations(&self) -> impl Iterator<Item = (&Rc<str>, SlotShape)> + '_ {
        self.params.iter().zip(self.shapes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{build::Arg, selector::Selector};
    use pretty_assertions::assert_eq;

    #[test]
    fn params_must_cover_the_slots() {
        let err = CustomBlockDefinition::new("double %n", BlockKind::Reporter, vec![]).unwrap_err();
        assert_eq!(
            err,
            SyntaxError::ParamMismatch { spec: "double %n".into(), slots: 1, names: 0 }
        );
    }

    #[test]
    fn calls_take_the_spec_shapes() {
        let def =
            CustomBlockDefinition::new("swap %upvar with %l", BlockKind::Command, vec![
                "a".into(),
                "b".into(),
            ])
            .unwrap();
        let call = Block::custom(&def, vec![Arg::text("x"), Arg::block(Block::getter("ys"))])
            .unwrap();
        assert_eq!(call.selector, Selector::EvaluateCustomBlock);
        assert_eq!(call.spec(), "swap %upvar with %l");
        assert_eq!(call.inputs[0].name().map(|n| n.to_string()), Some("x".to_owned()));
    }
}
