use indexmap::IndexMap;
use std::{
    hash::Hash,
    ops::{Index, IndexMut},
};

/* ---------------------------------- Index --------------------------------- */

pub use crate::new_key_type;

/// A handle minted by an [`IndexAlloc`]; `Meta` records which allocator.
pub unsafe trait IndexLike: Clone + Copy + Eq + Hash {
    type Meta;
    fn new(meta: Self::Meta, idx: usize) -> Self;
    fn index(&self) -> usize;
}

/* -------------------------------- Allocator ------------------------------- */

#[derive(Debug, Clone)]
pub struct IndexAlloc<Meta>(Meta, usize);

impl<Meta: Copy> IndexAlloc<Meta> {
    pub fn new(meta: Meta) -> Self {
        IndexAlloc(meta, 0)
    }
    /// hands out the next fresh index; never repeats
    pub fn fresh(&mut self) -> (Meta, usize) {
        let IndexAlloc(meta, idx) = self;
        let old = *idx;
        *idx += 1;
        (*meta, old)
    }
    /// number of indices handed out so far
    pub fn allocated(&self) -> usize {
        self.1
    }
}

impl Default for IndexAlloc<()> {
    fn default() -> Self {
        IndexAlloc((), 0)
    }
}

/* ---------------------------------- Arena --------------------------------- */

pub trait ArenaAccess<Id, T> {
    fn get(&self, id: &Id) -> Option<&T>;
    fn get_mut(&mut self, id: &Id) -> Option<&mut T>;
}

/// Storage that supports removal. Iteration follows allocation order, so
/// walking an arena is deterministic across runs.
#[derive(Debug, Clone)]
pub struct ArenaSparse<Id, T, Meta = ()> {
    allocator: IndexAlloc<Meta>,
    map: IndexMap<Id, T>,
}

mod impls {
    use super::*;

    /* ------------------------------- ArenaSparse ------------------------------ */

    impl<Id, T> Default for ArenaSparse<Id, T, ()>
    where
        Id: IndexLike<Meta = ()>,
    {
        fn default() -> Self {
            Self::new(IndexAlloc::default())
        }
    }

    impl<Id, T, Meta> ArenaSparse<Id, T, Meta>
    where
        Meta: Copy,
        Id: IndexLike<Meta = Meta>,
    {
        pub fn new(allocator: IndexAlloc<Meta>) -> Self {
            ArenaSparse { allocator, map: IndexMap::new() }
        }
        pub fn alloc(&mut self, val: T) -> Id {
            let (meta, idx) = self.allocator.fresh();
            let id = IndexLike::new(meta, idx);
            self.map.insert(id, val);
            id
        }
        /// puts a value back under an id this arena handed out earlier
        pub fn replace(&mut self, id: Id, val: T) -> Option<T> {
            debug_assert!(id.index() < self.allocator.allocated(), "foreign id");
            self.map.insert(id, val)
        }
        pub fn remove(&mut self, id: &Id) -> Option<T> {
            self.map.shift_remove(id)
        }
        pub fn is_empty(&self) -> bool {
            self.map.is_empty()
        }
        pub fn keys(&self) -> impl Iterator<Item = Id> + '_ {
            self.map.keys().copied()
        }
        pub fn iter(&self) -> impl Iterator<Item = (Id, &T)> + '_ {
            self.map.iter().map(|(id, val)| (*id, val))
        }
        pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
            self.map.values()
        }
    }

    impl<Id, T, Meta> ArenaAccess<Id, T> for ArenaSparse<Id, T, Meta>
    where
        Meta: Copy,
        Id: IndexLike<Meta = Meta>,
    {
        fn get(&self, id: &Id) -> Option<&T> {
            self.map.get(id)
        }
        fn get_mut(&mut self, id: &Id) -> Option<&mut T> {
            self.map.get_mut(id)
        }
    }

    impl<Id, T, Meta> Index<&Id> for ArenaSparse<Id, T, Meta>
    where
        Meta: Copy,
        Id: IndexLike<Meta = Meta>,
    {
        type Output = T;
        fn index(&self, id: &Id) -> &Self::Output {
            &self.map[id]
        }
    }

    impl<Id, T, Meta> IndexMut<&Id> for ArenaSparse<Id, T, Meta>
    where
        Meta: Copy,
        Id: IndexLike<Meta = Meta>,
    {
        fn index_mut(&mut self, id: &Id) -> &mut Self::Output {
            &mut self.map[id]
        }
    }
}

/* --------------------------------- Key Type -------------------------------- */

#[macro_export]
macro_rules! new_key_type {
    ( $(#[$outer:meta])* $vis:vis struct $name:ident < $meta:ty > ; $($rest:tt)* ) => {
        $(#[$outer])*
        #[derive(Copy, Clone, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
        $vis struct $name($meta, usize);

        unsafe impl $crate::arena::IndexLike for $name {
            type Meta = $meta;
            fn new(meta: Self::Meta, idx: usize) -> Self {
                Self(meta, idx)
            }
            fn index(&self) -> usize {
                self.1
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", stringify!($name), self.1)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "#{}", self.1)
            }
        }

        $crate::new_key_type!($($rest)*);
    };

    ( $(#[$outer:meta])* $vis:vis struct $name:ident ; $($rest:tt)* ) => {
        $crate::new_key_type!( $(#[$outer])* $vis struct $name<()> ; $($rest)* );
    };

    () => {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    new_key_type! {
        struct ThingId;
    }

    #[test]
    fn sparse_keeps_allocation_order_after_removal() {
        let mut arena: ArenaSparse<ThingId, &str> = ArenaSparse::default();
        let a = arena.alloc("a");
        let b = arena.alloc("b");
        let c = arena.alloc("c");
        assert_eq!(arena.remove(&b), Some("b"));
        assert_eq!(arena.values().copied().collect::<Vec<_>>(), vec!["a", "c"]);
        let d = arena.alloc("d");
        assert!(d != b);
        assert_eq!(arena.keys().collect::<Vec<_>>(), vec![a, c, d]);
    }

    #[test]
    fn sparse_replace_reuses_the_slot() {
        let mut arena: ArenaSparse<ThingId, u32> = ArenaSparse::default();
        let a = arena.alloc(1);
        arena[&a] += 1;
        assert_eq!(arena.replace(a, 10), Some(2));
        assert_eq!(arena.get(&a), Some(&10));
        assert_eq!(format!("{:?} {}", a, a), "ThingId#0 #0");
    }
}
