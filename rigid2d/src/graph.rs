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
//! Per-body adjacency lists
//!
//! Contacts and joints each connect two bodies and carry one [`GraphEdge`]
//! per side. The edges of a body form an intrusive doubly linked list whose
//! head lives on the body, so linking and unlinking are O(1) and walking a
//! body's neighbours is O(degree). Links are arena keys rather than
//! pointers, which keeps the graph trivially cloneable and checkable.

use crate::arena::{Arena, ArenaKey, BodyHandle};

/// Reference to one side of an edge owner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRef<K> {
    /// Owner (contact or joint)
    pub key: K,
    /// 0 for the edge stored on body A, 1 for body B
    pub side: usize,
}

/// One body's view of a contact or joint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphEdge<K> {
    /// Body at the other end
    pub other: BodyHandle,
    /// Previous edge in this body's list
    pub prev: Option<EdgeRef<K>>,
    /// Next edge in this body's list
    pub next: Option<EdgeRef<K>>,
}

impl<K> GraphEdge<K> {
    /// Unlinked edge pointing at `other`
    pub fn new(other: BodyHandle) -> Self {
        GraphEdge {
            other,
            prev: None,
            next: None,
        }
    }
}

/// Something stored in an arena that owns two graph edges
pub trait EdgeOwner<K> {
    /// Edge for `side`
    fn edge(&self, side: usize) -> &GraphEdge<K>;

    /// Mutable edge for `side`
    fn edge_mut(&mut self, side: usize) -> &mut GraphEdge<K>;
}

/// Push `key`'s `side` edge onto the front of a body's list
pub fn link<K, T>(owners: &mut Arena<K, T>, head: &mut Option<EdgeRef<K>>, key: K, side: usize)
where
    K: ArenaKey,
    T: EdgeOwner<K>,
{
    let this = EdgeRef { key, side };
    let old_head = *head;
    {
        let edge = owners[key].edge_mut(side);
        edge.prev = None;
        edge.next = old_head;
    }
    if let Some(next) = old_head {
        owners[next.key].edge_mut(next.side).prev = Some(this);
    }
    *head = Some(this);
}

/// Remove `key`'s `side` edge from a body's list
pub fn unlink<K, T>(owners: &mut Arena<K, T>, head: &mut Option<EdgeRef<K>>, key: K, side: usize)
where
    K: ArenaKey,
    T: EdgeOwner<K>,
{
    let (prev, next) = {
        let edge = owners[key].edge(side);
        (edge.prev, edge.next)
    };
    if let Some(p) = prev {
        owners[p.key].edge_mut(p.side).next = next;
    }
    if let Some(n) = next {
        owners[n.key].edge_mut(n.side).prev = prev;
    }
    if *head == Some(EdgeRef { key, side }) {
        *head = next;
    }
    let edge = owners[key].edge_mut(side);
    edge.prev = None;
    edge.next = None;
}

/// Iterate the `(owner, other body)` pairs of a body's list, most recently
/// linked first
pub fn edges<K, T>(owners: &Arena<K, T>, head: Option<EdgeRef<K>>) -> Edges<'_, K, T>
where
    K: ArenaKey,
    T: EdgeOwner<K>,
{
    Edges {
        owners,
        cursor: head,
    }
}

/// Iterator returned by [`edges`]
pub struct Edges<'a, K: ArenaKey, T> {
    owners: &'a Arena<K, T>,
    cursor: Option<EdgeRef<K>>,
}

impl<'a, K, T> Iterator for Edges<'a, K, T>
where
    K: ArenaKey,
    T: EdgeOwner<K>,
{
    type Item = (K, BodyHandle);

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.cursor?;
        let edge = self.owners[current.key].edge(current.side);
        self.cursor = edge.next;
        Some((current.key, edge.other))
    }
}
