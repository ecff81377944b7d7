//! List primitives, including `map`, which calls its ring once per step.

use super::*;
use crate::{
    context::MapState,
    list::{List, ListRef},
};

pub(super) const PRIMS: &[(Selector, Prim)] = &[
    (Selector::ReportNewList, report_new_list),
    (Selector::ReportCons, report_cons),
    (Selector::ReportCdr, report_cdr),
    (Selector::ReportListItem, report_list_item),
    (Selector::ReportListLength, |_, _, args| {
        let list = list_arg(&args, 0)?;
        let len = list.borrow().length();
        Ok(Outcome::Report(Value::Number(len as f64)))
    }),
    (Selector::ReportListContainsItem, |_, _, args| {
        let list = list_arg(&args, 0)?;
        let found = list.borrow().contains(&arg(&args, 1));
        Ok(Outcome::Report(found.into()))
    }),
    (Selector::DoAddToList, do_add_to_list),
    (Selector::DoDeleteFromList, do_delete_from_list),
    (Selector::DoInsertInList, do_insert_in_list),
    (Selector::DoReplaceInList, do_replace_in_list),
    (Selector::ReportMap, report_map),
];

fn report_new_list(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let list = match arg(&args, 0) {
        | Value::List(list) => Value::List(list),
        | _ => Value::list(Vec::new()),
    };
    Ok(Outcome::Report(list))
}

fn report_cons(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let tail = list_arg(&args, 1)?;
    Ok(Outcome::Report(List::cons(arg(&args, 0), tail).into()))
}

fn report_cdr(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let list = list_arg(&args, 0)?;
    let tail = list.borrow().cdr();
    Ok(Outcome::Report(Value::List(tail)))
}

/// A blank index reads as empty text.
fn report_list_item(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let list = list_arg(&args, 1)?;
    let list = list.borrow();
    let len = list.length();
    let item = match index_arg(&arg(&args, 0), len, len) {
        | Some(idx) => list.at(idx),
        | None => Value::text(""),
    };
    Ok(Outcome::Report(item))
}

fn do_add_to_list(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let list = list_arg(&args, 1)?;
    list.borrow_mut().add(arg(&args, 0), None);
    Ok(Outcome::Done)
}

/// `all` empties the list; a blank index does nothing.
fn do_delete_from_list(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let list = list_arg(&args, 1)?;
    let index = arg(&args, 0);
    if matches!(&index, Value::Text(text) if &**text == "all") {
        list.borrow_mut().clear();
        return Ok(Outcome::Done);
    }
    let len = list.borrow().length();
    if let Some(idx) = index_arg(&index, len, len) {
        list.borrow_mut().remove(idx);
    }
    Ok(Outcome::Done)
}

/// `last` appends after the final item.
fn do_insert_in_list(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let list = list_arg(&args, 2)?;
    let len = list.borrow().length();
    if let Some(idx) = index_arg(&arg(&args, 1), len, len + 1) {
        list.borrow_mut().add(arg(&args, 0), Some(idx));
    }
    Ok(Outcome::Done)
}

fn do_replace_in_list(_: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let list = list_arg(&args, 1)?;
    let len = list.borrow().length();
    if let Some(idx) = index_arg(&arg(&args, 0), len, len) {
        list.borrow_mut().put(arg(&args, 2), idx);
    }
    Ok(Outcome::Done)
}

/* ----------------------------------- Map ---------------------------------- */

/// Calls the ring on one element per step. Each call reports into a third
/// input of the map block, which is collected on the next round; a call
/// that ends without a value contributes nothing as its result. A linked
/// source gives a linked result.
fn report_map(proc: &mut Process, _: &mut World, args: Vec<Value>) -> Result<Outcome> {
    let ring = arg(&args, 0);
    let source = list_arg(&args, 1)?;
    let Some(top) = proc.top_mut() else { return Ok(Outcome::Done) };
    let mut state = top.map.take().unwrap_or_else(|| MapState {
        cursor: source.borrow().is_linked().then(|| source.clone()),
        ..MapState::default()
    });
    if state.pending {
        state.results.push(arg(&args, 2));
        state.pending = false;
        top.inputs.truncate(2);
    }
    let Some(element) = next_element(&source, &mut state) else {
        let linked = source.borrow().is_linked();
        return Ok(Outcome::Report(collect(state.results, linked)));
    };
    state.pending = true;
    top.map = Some(state);
    proc.invoke(&ring, vec![element], false, false)?;
    Ok(Outcome::Rearm)
}

fn next_element(source: &ListRef, state: &mut MapState) -> Option<Value> {
    let Some(cursor) = state.cursor.take() else {
        let source = source.borrow();
        let idx = state.results.len() + 1;
        return (idx <= source.length()).then(|| source.at(idx));
    };
    let cursor = cursor.borrow();
    if !cursor.is_linked() && cursor.length() == 0 {
        return None;
    }
    state.cursor = Some(cursor.cdr());
    Some(cursor.at(1))
}

fn collect(results: Vec<Value>, linked: bool) -> Value {
    if !linked {
        return Value::list(results);
    }
    let mut tail = List::default().into_ref();
    for item in results.into_iter().rev() {
        tail = List::cons(item, tail).into_ref();
    }
    Value::List(tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn linked_sources_are_walked_by_cursor() {
        let tail = List::new(vec![Value::Number(2.0), Value::Number(3.0)]).into_ref();
        let source = List::cons(Value::Number(1.0), tail).into_ref();
        let mut state = MapState { cursor: Some(source.clone()), ..MapState::default() };
        let mut seen = Vec::new();
        while let Some(element) = next_element(&source, &mut state) {
            seen.push(element.to_string());
            state.results.push(element);
        }
        assert_eq!(seen, vec!["1", "2", "3"]);
    }

    #[test]
    fn arrayed_sources_are_walked_by_position() {
        let source = List::new(vec!["a".into(), "b".into()]).into_ref();
        let mut state = MapState::default();
        let first = next_element(&source, &mut state).unwrap();
        assert_eq!(first.to_string(), "a");
        state.results.push(first);
        let second = next_element(&source, &mut state).unwrap();
        state.results.push(second);
        assert!(next_element(&source, &mut state).is_none());
        let Value::List(result) = collect(state.results, false) else { panic!("a list") };
        assert!(!result.borrow().is_linked());
        let Value::List(result) = collect(vec![Value::Number(1.0)], true) else { panic!("a list") };
        assert!(result.borrow().is_linked());
    }
}
