use super::*;
use crate::frame::VarKey;

pub(super) const PRIMS: &[(Selector, Prim)] = &[
    (Selector::DoSetVar, do_set_var),
    (Selector::DoChangeVar, do_change_var),
    (Selector::DoDeclareVariables, do_declare_variables),
];

fn var_key(args: &[Value]) -> VarKey {
    VarKey::Name(arg(args, 0).to_string().into())
}

fn do_set_var(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let Some(top) = proc.top() else { return Ok(Outcome::Done) };
    top.scope.set_var(&var_key(&args), arg(&args, 1), top.upvars.as_deref())?;
    Ok(Outcome::Done)
}

fn do_change_var(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let Some(top) = proc.top() else { return Ok(Outcome::Done) };
    top.scope.change_var(&var_key(&args), &arg(&args, 1), top.upvars.as_deref())?;
    Ok(Outcome::Done)
}

/// Script variables start out as nothing, in the scope of the script.
fn do_declare_variables(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let Some(top) = proc.top() else { return Ok(Outcome::Done) };
    let names = match arg(&args, 0) {
        | Value::List(list) => list.borrow().items(),
        | _ => Vec::new(),
    };
    for name in names {
        top.scope.add_var(VarKey::Name(name.to_string().into()), Value::Nothing);
    }
    Ok(Outcome::Done)
}
