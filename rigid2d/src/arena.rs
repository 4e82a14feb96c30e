// Copyright 2025 John Brosnihan
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//! Generational arenas and typed handles
//!
//! Bodies, fixtures, contacts and joints live in slab arrays. Every
//! cross-reference is a handle made of a slot index plus a generation
//! counter; the generation is bumped when a slot is freed so that old handles
//! stop resolving instead of silently aliasing a newer object. Slots are
//! visited in index order, which keeps iteration independent of hashing and
//! of allocation addresses.

use std::fmt;
use std::marker::PhantomData;

/// Raw slot index with generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Index {
    slot: u32,
    generation: u32,
}

impl Index {
    /// Create an index from its parts
    pub fn new(slot: u32, generation: u32) -> Self {
        Index { slot, generation }
    }

    /// Slot number in the arena
    pub fn slot(&self) -> u32 {
        self.slot
    }

    /// Generation of the slot when the handle was issued
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

/// Typed handle into an [`Arena`]
pub trait ArenaKey: Copy + Eq + fmt::Debug {
    /// Human readable object kind, used in error messages
    const KIND: &'static str;

    /// Wrap a raw index
    fn from_index(index: Index) -> Self;

    /// Unwrap to the raw index
    fn index(self) -> Index;
}

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(Index);

        impl $name {
            /// Slot number of this handle
            pub fn slot(&self) -> u32 {
                self.0.slot
            }

            /// Generation of this handle
            pub fn generation(&self) -> u32 {
                self.0.generation
            }
        }

        impl ArenaKey for $name {
            const KIND: &'static str = $kind;

            fn from_index(index: Index) -> Self {
                $name(index)
            }

            fn index(self) -> Index {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({}v{})", stringify!($name), self.0.slot, self.0.generation)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }
    };
}

define_handle!(
    /// Handle to a rigid body
    BodyHandle,
    "body"
);
define_handle!(
    /// Handle to a fixture attached to a body
    FixtureHandle,
    "fixture"
);
define_handle!(
    /// Handle to a joint between two bodies
    JointHandle,
    "joint"
);
define_handle!(
    /// Key of a persistent contact between two fixtures
    ContactKey,
    "contact"
);

enum Entry<T> {
    Occupied { generation: u32, value: T },
    Vacant { generation: u32 },
}

/// Slab storage addressed by generational handles
pub struct Arena<K: ArenaKey, T> {
    entries: Vec<Entry<T>>,
    free: Vec<u32>,
    len: usize,
    _marker: PhantomData<K>,
}

impl<K: ArenaKey, T> Arena<K, T> {
    /// Create an empty arena
    pub fn new() -> Self {
        Arena {
            entries: Vec::new(),
            free: Vec::new(),
            len: 0,
            _marker: PhantomData,
        }
    }

    /// Insert a value and return its handle
    pub fn insert(&mut self, value: T) -> K {
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            let generation = match self.entries[slot as usize] {
                Entry::Vacant { generation } => generation,
                Entry::Occupied { .. } => unreachable!("free list points at an occupied slot"),
            };
            self.entries[slot as usize] = Entry::Occupied { generation, value };
            return K::from_index(Index::new(slot, generation));
        }
        let slot = self.entries.len() as u32;
        self.entries.push(Entry::Occupied { generation: 0, value });
        K::from_index(Index::new(slot, 0))
    }

    /// Remove a value, invalidating its handle
    pub fn remove(&mut self, key: K) -> Option<T> {
        let index = key.index();
        let slot = index.slot as usize;
        match self.entries.get(slot) {
            Some(Entry::Occupied { generation, .. }) if *generation == index.generation => {}
            _ => return None,
        }
        let next = Entry::Vacant {
            generation: index.generation.wrapping_add(1),
        };
        let old = std::mem::replace(&mut self.entries[slot], next);
        self.free.push(index.slot);
        self.len -= 1;
        match old {
            Entry::Occupied { value, .. } => Some(value),
            Entry::Vacant { .. } => None,
        }
    }

    /// Get a reference to a value
    pub fn get(&self, key: K) -> Option<&T> {
        let index = key.index();
        match self.entries.get(index.slot as usize)? {
            Entry::Occupied { generation, value } if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// Get a mutable reference to a value
    pub fn get_mut(&mut self, key: K) -> Option<&mut T> {
        let index = key.index();
        match self.entries.get_mut(index.slot as usize)? {
            Entry::Occupied { generation, value } if *generation == index.generation => Some(value),
            _ => None,
        }
    }

    /// Get mutable references to two distinct values
    ///
    /// # Panics
    ///
    /// Panics if the handles are equal or either one is stale.
    pub fn get2_mut(&mut self, a: K, b: K) -> (&mut T, &mut T) {
        let (ia, ib) = (a.index().slot as usize, b.index().slot as usize);
        assert_ne!(ia, ib, "get2_mut called with the same {} twice", K::KIND);
        assert!(self.contains(a), "stale {} handle {:?}", K::KIND, a);
        assert!(self.contains(b), "stale {} handle {:?}", K::KIND, b);
        let (first, second) = if ia < ib {
            let (lo, hi) = self.entries.split_at_mut(ib);
            (&mut lo[ia], &mut hi[0])
        } else {
            let (lo, hi) = self.entries.split_at_mut(ia);
            (&mut hi[0], &mut lo[ib])
        };
        match (first, second) {
            (Entry::Occupied { value: va, .. }, Entry::Occupied { value: vb, .. }) => (va, vb),
            _ => unreachable!("checked above"),
        }
    }

    /// Whether the handle refers to a live value
    pub fn contains(&self, key: K) -> bool {
        self.get(key).is_some()
    }

    /// Number of live values
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the arena holds no values
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterate live values in slot order
    pub fn iter(&self) -> impl Iterator<Item = (K, &T)> {
        self.entries.iter().enumerate().filter_map(|(slot, entry)| match entry {
            Entry::Occupied { generation, value } => {
                Some((K::from_index(Index::new(slot as u32, *generation)), value))
            }
            Entry::Vacant { .. } => None,
        })
    }

    /// Iterate live values mutably in slot order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (K, &mut T)> {
        self.entries
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Entry::Occupied { generation, value } => {
                    Some((K::from_index(Index::new(slot as u32, *generation)), value))
                }
                Entry::Vacant { .. } => None,
            })
    }

    /// Snapshot of live handles in slot order
    pub fn keys(&self) -> Vec<K> {
        self.iter().map(|(k, _)| k).collect()
    }

    /// Number of slots ever allocated, live or not
    pub fn capacity_slots(&self) -> usize {
        self.entries.len()
    }

    /// Remove every value
    pub fn clear(&mut self) {
        self.entries.clear();
        self.free.clear();
        self.len = 0;
    }
}

impl<K: ArenaKey, T> Default for Arena<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: ArenaKey, T: fmt::Debug> fmt::Debug for Arena<K, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: ArenaKey, T> std::ops::Index<K> for Arena<K, T> {
    type Output = T;

    fn index(&self, key: K) -> &T {
        match self.get(key) {
            Some(value) => value,
            None => panic!("stale or unknown {} handle {:?}", K::KIND, key),
        }
    }
}

impl<K: ArenaKey, T> std::ops::IndexMut<K> for Arena<K, T> {
    fn index_mut(&mut self, key: K) -> &mut T {
        match self.get_mut(key) {
            Some(value) => value,
            None => panic!("stale or unknown {} handle {:?}", K::KIND, key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_generation() {
        let mut arena: Arena<BodyHandle, &str> = Arena::new();
        let a = arena.insert("a");
        assert_eq!(arena.remove(a), Some("a"));
        let b = arena.insert("b");

        // Same slot is reused with a new generation
        assert_eq!(a.slot(), b.slot());
        assert_ne!(a.generation(), b.generation());
        assert!(arena.get(a).is_none());
        assert_eq!(arena[b], "b");
    }

    #[test]
    fn test_iteration_is_slot_ordered() {
        let mut arena: Arena<JointHandle, u32> = Arena::new();
        let keys: Vec<_> = (0..5).map(|i| arena.insert(i)).collect();
        arena.remove(keys[1]);
        arena.remove(keys[3]);
        let values: Vec<u32> = arena.iter().map(|(_, v)| *v).collect();
        assert_eq!(values, vec![0, 2, 4]);
        assert_eq!(arena.len(), 3);
    }

    #[test]
    fn test_get2_mut() {
        let mut arena: Arena<FixtureHandle, i32> = Arena::new();
        let a = arena.insert(1);
        let b = arena.insert(2);
        let (x, y) = arena.get2_mut(b, a);
        std::mem::swap(x, y);
        assert_eq!(arena[a], 2);
        assert_eq!(arena[b], 1);
    }

    #[test]
    #[should_panic(expected = "stale or unknown body handle")]
    fn test_stale_index_panics() {
        let mut arena: Arena<BodyHandle, i32> = Arena::new();
        let a = arena.insert(1);
        arena.remove(a);
        let _ = arena[a];
    }

    #[test]
    fn test_handle_display() {
        let h = BodyHandle::from_index(Index::new(3, 1));
        assert_eq!(format!("{}", h), "BodyHandle(3v1)");
    }
}
