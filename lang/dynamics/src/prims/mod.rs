//! Primitive operations, keyed by selector. Each one receives the process
//! whose top context is the block being applied, with that block's
//! evaluated inputs.

use crate::{err::*, process::Process, threads::World, value::*};
use blox_syntax::prelude::Selector;
use once_cell::sync::Lazy;
use std::collections::HashMap;

mod code;
mod control;
mod lists;
mod looks;
mod operators;
mod variables;

/// What applying a primitive did to its own context.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// the block reports a value to its parent and is done
    Report(Value),
    /// the block is done without a value
    Done,
    /// the primitive arranged the stack itself; the block stays or was
    /// already replaced
    Rearm,
}

pub type Prim = fn(&mut Process, &mut World, Vec<Value>) -> Result<Outcome>;

static PRIMS: Lazy<HashMap<Selector, Prim>> = Lazy::new(|| {
    let tables: [&[(Selector, Prim)]; 6] = [
        control::PRIMS,
        operators::PRIMS,
        lists::PRIMS,
        variables::PRIMS,
        looks::PRIMS,
        code::PRIMS,
    ];
    tables.into_iter().flatten().copied().collect()
});

pub fn lookup(selector: Selector) -> Option<Prim> {
    PRIMS.get(&selector).copied()
}

/* --------------------------------- Inputs --------------------------------- */

/// the `idx`-th input, or nothing when it is missing
fn arg(args: &[Value], idx: usize) -> Value {
    args.get(idx).cloned().unwrap_or(Value::Nothing)
}

fn list_arg(args: &[Value], idx: usize) -> Result<crate::list::ListRef> {
    match args.get(idx) {
        | Some(Value::List(list)) => Ok(list.clone()),
        | Some(other) => Err(EvalError::NotAList(other.describe())),
        | None => Err(EvalError::NotAList(Value::Nothing.describe())),
    }
}

/// Where an index input points in a list of `len` items. Menu choices are
/// resolved; `None` means the input was left blank.
fn index_arg(index: &Value, len: usize, last: usize) -> Option<usize> {
    match index {
        | Value::Text(text) if text.is_empty() => None,
        | Value::Nothing => None,
        | Value::Text(text) if &**text == "last" => Some(last),
        | Value::Text(text) if &**text == "any" => Some(random_index(len)),
        | other => {
            let n = other.to_number();
            if n.is_nan() || n < 1.0 { Some(0) } else { Some(n as usize) }
        }
    }
}

/// a position between 1 and `len`, both included
fn random_index(len: usize) -> usize {
    use rand::Rng;
    if len == 0 {
        return 1;
    }
    rand::rng().random_range(1..=len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_evaluated_selector_has_a_primitive() {
        // hats never run, rings and getters are handled by the evaluator
        let special = |sel: Selector| {
            sel.is_hat()
                || sel.is_ring()
                || matches!(
                    sel,
                    Selector::ReportGetVar
                        | Selector::EvaluateCustomBlock
                        | Selector::ReportAnd
                        | Selector::ReportOr
                )
        };
        let missing = (Selector::ALL.iter().copied())
            .filter(|sel| !special(*sel) && lookup(*sel).is_none())
            .collect::<Vec<_>>();
        assert_eq!(missing, vec![]);
    }

    #[test]
    fn index_choices() {
        assert_eq!(index_arg(&Value::text("last"), 4, 4), Some(4));
        assert_eq!(index_arg(&Value::text(""), 4, 4), None);
        assert_eq!(index_arg(&Value::text("2"), 4, 4), Some(2));
        let any = index_arg(&Value::text("any"), 4, 4).unwrap();
        assert!((1..=4).contains(&any));
    }
}
