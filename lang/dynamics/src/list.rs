//! Lists are either arrayed (a dense vector) or linked (a head in front of a
//! shared tail). `cons` builds linked lists in constant time; mutation
//! flattens to the arrayed form first.

use crate::value::*;
use std::{cell::RefCell, rc::Rc};

pub type ListRef = Rc<RefCell<List>>;

#[derive(Clone, Debug)]
enum Repr {
    Arrayed(Vec<Value>),
    Linked { first: Value, rest: ListRef },
}

#[derive(Clone, Debug)]
pub struct List {
    repr: Repr,
}

impl Default for List {
    fn default() -> Self {
        List::new(Vec::new())
    }
}

impl List {
    pub fn new(items: Vec<Value>) -> Self {
        List { repr: Repr::Arrayed(items) }
    }

    pub fn into_ref(self) -> ListRef {
        Rc::new(RefCell::new(self))
    }

    pub fn cons(head: Value, tail: ListRef) -> Self {
        List { repr: Repr::Linked { first: head, rest: tail } }
    }

    pub fn is_linked(&self) -> bool {
        matches!(self.repr, Repr::Linked { .. })
    }

    /// The tail. A linked list shares its rest; an arrayed one is rebuilt as
    /// a fresh linked chain.
    pub fn cdr(&self) -> ListRef {
        match &self.repr {
            | Repr::Linked { rest, .. } => rest.clone(),
            | Repr::Arrayed(items) if items.len() < 2 => List::default().into_ref(),
            | Repr::Arrayed(items) => {
                let mut tail = List::default().into_ref();
                for item in items[1..].iter().rev() {
                    tail = List::cons(item.clone(), tail).into_ref();
                }
                tail
            }
        }
    }

    /// Walks linked pairs until `f` is satisfied or an arrayed tail is
    /// reached, which is handed to `f` as well.
    fn walk<R>(&self, mut f: impl FnMut(Option<&Value>, Option<&[Value]>) -> Option<R>) -> Option<R> {
        match &self.repr {
            | Repr::Arrayed(items) => return f(None, Some(items)),
            | Repr::Linked { first, rest } => {
                if let Some(found) = f(Some(first), None) {
                    return Some(found);
                }
                let mut pair = rest.clone();
                loop {
                    let next = {
                        let list = pair.borrow();
                        match &list.repr {
                            | Repr::Arrayed(items) => return f(None, Some(items)),
                            | Repr::Linked { first, rest } => {
                                if let Some(found) = f(Some(first), None) {
                                    return Some(found);
                                }
                                rest.clone()
                            }
                        }
                    };
                    pair = next;
                }
            }
        }
    }

    pub fn items(&self) -> Vec<Value> {
        let mut out = Vec::new();
        self.walk::<()>(|first, tail| {
            if let Some(first) = first {
                out.push(first.clone());
            }
            if let Some(tail) = tail {
                out.extend(tail.iter().cloned());
            }
            None
        });
        out
    }

    pub fn length(&self) -> usize {
        let mut count = 0;
        self.walk::<()>(|first, tail| {
            count += usize::from(first.is_some()) + tail.map_or(0, <[Value]>::len);
            None
        });
        count
    }

    /// 1-based; anything out of range reads as empty text.
    pub fn at(&self, idx: usize) -> Value {
        let mut remaining = idx;
        self.walk(|first, tail| {
            match (first, tail) {
                | (Some(first), _) if remaining == 1 => Some(first.clone()),
                | (Some(_), _) => {
                    remaining = remaining.saturating_sub(1);
                    None
                }
                | (None, Some(tail)) => remaining.checked_sub(1).and_then(|i| tail.get(i)).cloned(),
                | (None, None) => None,
            }
        })
        .unwrap_or_else(|| Value::text(""))
    }

    pub fn contains(&self, element: &Value) -> bool {
        self.walk(|first, tail| {
            if first.is_some_and(|first| snap_equals(first, element)) {
                return Some(true);
            }
            tail.map(|tail| tail.iter().any(|item| snap_equals(item, element)))
        })
        .unwrap_or(false)
    }

    /// structural equality under [`snap_equals`], regardless of representation
    pub fn equal_to(&self, other: &List) -> bool {
        let (ours, theirs) = (self.items(), other.items());
        ours.len() == theirs.len() && ours.iter().zip(&theirs).all(|(a, b)| snap_equals(a, b))
    }

    pub fn become_array(&mut self) {
        if self.is_linked() {
            let items = self.items();
            self.set_repr(Repr::Arrayed(items));
        }
    }

    /// Rebuilds the contents as a linked chain ending in an empty arrayed list.
    pub fn become_linked(&mut self) {
        let Repr::Arrayed(items) = &self.repr else { return };
        let Some((first, others)) = items.split_first() else { return };
        let mut tail = List::default().into_ref();
        for item in others.iter().rev() {
            tail = List::cons(item.clone(), tail).into_ref();
        }
        let first = first.clone();
        self.set_repr(Repr::Linked { first, rest: tail });
    }

    fn arrayed(&mut self) -> &mut Vec<Value> {
        self.become_array();
        match &mut self.repr {
            | Repr::Arrayed(items) => items,
            | Repr::Linked { .. } => unreachable!("flattened above"),
        }
    }

    fn set_repr(&mut self, repr: Repr) {
        let old = std::mem::replace(&mut self.repr, repr);
        drop_chain(old);
    }

    /// Inserts at a 1-based position, clamped to the ends; `None` appends.
    pub fn add(&mut self, element: Value, idx: Option<usize>) {
        let items = self.arrayed();
        let at = idx.map_or(items.len(), |idx| idx.saturating_sub(1).min(items.len()));
        items.insert(at, element);
    }

    /// Replaces an existing element; positions out of range are ignored.
    pub fn put(&mut self, element: Value, idx: usize) {
        let items = self.arrayed();
        if let Some(slot) = idx.checked_sub(1).and_then(|i| items.get_mut(i)) {
            *slot = element;
        }
    }

    pub fn remove(&mut self, idx: usize) {
        let items = self.arrayed();
        if (1..=items.len()).contains(&idx) {
            items.remove(idx - 1);
        }
    }

    pub fn clear(&mut self) {
        self.arrayed().clear();
    }

    /// concatenated text of the items, as `join` reads a list
    pub fn as_text(&self) -> String {
        self.items()
            .iter()
            .map(|item| match item {
                | Value::List(list) => list.borrow().as_text(),
                | other => other.to_string(),
            })
            .collect()
    }
}

/// Unlinks a chain pair by pair, so dropping a long linked list does not
/// recurse once per element.
fn drop_chain(repr: Repr) {
    let mut next = match repr {
        | Repr::Linked { rest, .. } => Some(rest),
        | Repr::Arrayed(_) => None,
    };
    while let Some(pair) = next {
        next = match Rc::try_unwrap(pair) {
            | Ok(cell) => {
                let mut list = cell.into_inner();
                match std::mem::replace(&mut list.repr, Repr::Arrayed(Vec::new())) {
                    | Repr::Linked { rest, .. } => Some(rest),
                    | Repr::Arrayed(_) => None,
                }
            }
            | Err(_) => None,
        };
    }
}

impl Drop for List {
    fn drop(&mut self) {
        let repr = std::mem::replace(&mut self.repr, Repr::Arrayed(Vec::new()));
        drop_chain(repr);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn nums(ns: &[f64]) -> List {
        List::new(ns.iter().map(|n| Value::Number(*n)).collect())
    }

    #[test]
    fn equality_coerces_numeric_text() {
        let a = List::new(vec![1.0.into(), "2".into(), 3.0.into()]);
        assert!(a.equal_to(&nums(&[1.0, 2.0, 3.0])));
    }

    #[test]
    fn equality_keeps_spaced_text_apart() {
        let a = List::new(vec![" a".into()]);
        let b = List::new(vec!["a".into()]);
        assert!(!a.equal_to(&b));
    }

    #[test]
    fn cons_then_cdr() {
        let empty = || List::default().into_ref();
        let three = List::cons(3.0.into(), empty()).into_ref();
        let two = List::cons(2.0.into(), three).into_ref();
        let one = List::cons(1.0.into(), two);
        let rest = one.cdr();
        let rest = rest.borrow().cdr();
        assert!(snap_equals(&rest.borrow().at(1), &Value::Number(3.0)));
        assert_eq!(one.length(), 3);
    }

    #[test]
    fn cdr_of_arrayed_is_linked() {
        let list = nums(&[1.0, 2.0, 3.0]);
        let rest = list.cdr();
        assert!(rest.borrow().is_linked());
        assert!(rest.borrow().equal_to(&nums(&[2.0, 3.0])));
        assert_eq!(nums(&[1.0]).cdr().borrow().length(), 0);
    }

    #[test]
    fn representations_compare_equal() {
        let mut linked = nums(&[4.0, 5.0]);
        linked.become_linked();
        assert!(linked.is_linked());
        assert!(linked.equal_to(&nums(&[4.0, 5.0])));
        assert_eq!(linked.at(2).to_string(), "5");
        assert_eq!(linked.at(7).to_string(), "");
    }

    #[test]
    fn mutation_flattens() {
        let mut list = List::cons(1.0.into(), nums(&[2.0]).into_ref());
        list.add(0.0.into(), Some(1));
        list.put("two".into(), 3);
        list.remove(9);
        assert!(!list.is_linked());
        assert_eq!(Value::from(list).to_string(), "[0, 1, two]");
    }

    #[test]
    fn contains_is_loose() {
        let list = List::cons("X".into(), nums(&[2.0]).into_ref());
        assert!(list.contains(&"x".into()));
        assert!(list.contains(&"2".into()));
        assert!(!list.contains(&"3".into()));
    }

    #[test]
    fn long_chains_drop_without_recursing() {
        let mut list = List::default().into_ref();
        for i in 0..200_000 {
            list = List::cons(Value::Number(i as f64), list).into_ref();
        }
        assert_eq!(list.borrow().length(), 200_000);
        drop(list);
    }
}
