use std::num::NonZeroU32;
use std::marker::PhantomData;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::{Index, IndexMut};
use std::fmt::{Debug, Formatter};

/// Typed handle into an `IdArena<T>`.
pub struct Id<T> {
    idx: NonZeroU32,
    _ty: PhantomData<fn() -> T>
}

// #[derive] bug means we have to impl these manually because of PhantomData
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.idx.cmp(&other.idx)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.idx.hash(state)
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Id({})", self.index())
    }
}

impl<T> Id<T> {
    /// Zero-based insertion index of the item.
    pub fn index(&self) -> usize {
        self.idx.get() as usize - 1
    }
}

/// Append-only storage addressed by `Id`s. Items are never removed, so an id handed out by an
/// arena stays valid for the arena's whole lifetime.
pub struct IdArena<T> {
    items: Vec<T>,
}

impl<T> IdArena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
        }
    }

    pub fn insert(&mut self, item: T) -> Id<T> {
        assert!(self.items.len() < u32::MAX as usize, "IdArena is full");
        self.items.push(item);
        let idx = NonZeroU32::new(self.items.len() as u32)
            .unwrap_or_else(|| unreachable!());
        Id {
            idx,
            _ty: PhantomData
        }
    }

    pub fn get(&self, id: Id<T>) -> &T {
        &self.items[id.index()]
    }

    pub fn get_mut(&mut self, id: Id<T>) -> &mut T {
        &mut self.items[id.index()]
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Id<T>, &T)> {
        self.items.iter().enumerate().map(|(i, item)| {
            let idx = NonZeroU32::new(i as u32 + 1).unwrap_or_else(|| unreachable!());
            (Id { idx, _ty: PhantomData }, item)
        })
    }
}

impl<T> Default for IdArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<Id<T>> for IdArena<T> {
    type Output = T;

    fn index(&self, index: Id<T>) -> &Self::Output {
        self.get(index)
    }
}

impl<T> IndexMut<Id<T>> for IdArena<T> {
    fn index_mut(&mut self, index: Id<T>) -> &mut Self::Output {
        self.get_mut(index)
    }
}
