//! Code mapping, for rendering scripts as text. The templates live on the
//! stage and outlast the processes that set them.

use super::*;
use crate::context::{Expression, Lambda, Reified};
use blox_syntax::prelude::{ListKind, ListPart};

pub(super) const PRIMS: &[(Selector, Prim)] = &[
    (Selector::DoMapCodeOrHeader, map_code_or_header),
    (Selector::DoMapStringCode, |_, world, args| {
        world.stage.code.map_string(&arg(&args, 0).to_string());
        Ok(Outcome::Done)
    }),
    (Selector::DoMapListCode, |_, world, args| {
        let part = ListPart::from_option(&arg(&args, 0).to_string());
        let kind = ListKind::from_option(&arg(&args, 1).to_string());
        world.stage.code.map_list(part, kind, &arg(&args, 2).to_string());
        Ok(Outcome::Done)
    }),
    (Selector::ReportMappedCode, report_mapped_code),
];

fn lambda(value: &Value) -> Option<&Lambda> {
    match value {
        | Value::Context(reified) => match &**reified {
            | Reified::Lambda(lambda) => Some(lambda),
            | Reified::Continuation(_) => None,
        },
        | _ => None,
    }
}

/// Maps the block kind at the head of a ring to a code template or a header.
fn map_code_or_header(_: &mut Process, world: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let option = arg(&args, 1).to_string();
    let text = arg(&args, 2).to_string();
    let ring = arg(&args, 0);
    let head = match lambda(&ring).map(|lambda| &lambda.expression) {
        | Some(Expression::Block(block)) => Some(block.clone()),
        | Some(Expression::Sequence(script)) => script.first().cloned(),
        | _ => None,
    };
    match (&*option, head) {
        | ("code", Some(block)) => world.stage.code.map_code(&block, &text),
        | ("header", Some(block)) => world.stage.code.map_header(&block, &text),
        | ("code" | "header", None) => {}
        | (other, _) => Err(EvalError::BadOption(other.to_owned()))?,
    }
    Ok(Outcome::Done)
}

/// The mapped text of a ring's contents; anything else maps to nothing.
fn report_mapped_code(_: &mut Process, world: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let ring = arg(&args, 0);
    let Some(lambda) = lambda(&ring) else { return Ok(Outcome::Report(Value::text(""))) };
    let stage = &*world.stage;
    let lookup = |spec: &str| stage.custom_block(lambda.receiver, spec);
    let code = match &lambda.expression {
        | Expression::Block(block) => stage.code.mapped_code(block, lookup),
        | Expression::Sequence(script) => stage.code.mapped_script(script, lookup),
        | _ => String::new(),
    };
    Ok(Outcome::Report(Value::text(code)))
}
