//! Densely numbered entity references as set keys.

use alloc::vec::Vec;
use core::fmt;
use core::marker::PhantomData;

use super::EntityRef;

/// Word type used in the bit set.
type Word = usize;

/// A set of entities implemented as a bit vector.
///
/// This is conceptually equivalent to a `HashSet<K>` or a
/// `SecondaryMap<K, bool>` but is encoded much more efficiently as a bit
/// vector.
#[derive(Clone, PartialEq, Eq)]
pub struct EntitySet<T>
where
    T: EntityRef,
{
    storage: Vec<Word>,
    marker: PhantomData<T>,
}

impl<T> EntitySet<T>
where
    T: EntityRef,
{
    /// Creates an empty set.
    ///
    /// The set must be grown with [`EntitySet::clear_and_resize`] before any
    /// elements can be inserted.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            storage: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Removes all elements from the set and resizes it to be large enough to
    /// hold entity references with an index below `max_index`.
    #[inline]
    pub fn clear_and_resize(&mut self, max_index: usize) {
        self.storage.clear();
        self.storage
            .resize(max_index.div_ceil(Word::BITS as usize), 0);
    }

    /// Returns whether the given entity is in the set.
    #[inline]
    #[must_use]
    pub fn contains(&self, entity: T) -> bool {
        let word = entity.index() / Word::BITS as usize;
        let bit = entity.index() % Word::BITS as usize;
        self.storage[word] & (1 << bit) != 0
    }

    /// Inserts the given entity into the set.
    ///
    /// Returns whether the entity was newly inserted.
    #[inline]
    pub fn insert(&mut self, entity: T) -> bool {
        let word = entity.index() / Word::BITS as usize;
        let bit = entity.index() % Word::BITS as usize;
        let newly = self.storage[word] & (1 << bit) == 0;
        self.storage[word] |= 1 << bit;
        newly
    }

    /// Removes the given entity from the set.
    #[inline]
    pub fn remove(&mut self, entity: T) {
        let word = entity.index() / Word::BITS as usize;
        let bit = entity.index() % Word::BITS as usize;
        self.storage[word] &= !(1 << bit);
    }
}

impl<T> Default for EntitySet<T>
where
    T: EntityRef,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for EntitySet<T>
where
    T: EntityRef + fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = (0..self.storage.len() * Word::BITS as usize)
            .map(T::new)
            .filter(|&e| self.contains(e));
        f.debug_set().entries(entries).finish()
    }
}
