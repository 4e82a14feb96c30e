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
//! Persistent contacts between fixtures
//!
//! A contact exists while the two fixtures' fat AABBs overlap, their
//! filters accept each other and they belong to different bodies. Its
//! lifecycle:
//!
//! ```text
//! candidate --collide--> not touching <--> touching
//!     \                        |              |
//!      `-----------------------+--------------+--> destroyed
//! ```
//!
//! Touching transitions raise [`PhysicsEvent::BeginTouch`] and
//! [`PhysicsEvent::EndTouch`]; destroying a touching contact raises
//! `EndTouch` too.

use std::collections::BTreeMap;

use tracing::debug;

use crate::arena::{Arena, BodyHandle, ContactKey, FixtureHandle};
use crate::body::{Body, Fixture};
use crate::broadphase::BroadPhase;
use crate::collision::{self, Manifold, WorldManifold};
use crate::events::{EventQueue, PhysicsEvent};
use crate::graph::{self, EdgeOwner, GraphEdge};

/// A contact between two fixtures on different bodies
#[derive(Debug, Clone)]
pub struct Contact {
    pub(crate) fixture_a: FixtureHandle,
    pub(crate) fixture_b: FixtureHandle,
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) manifold: Manifold,
    pub(crate) friction: f64,
    pub(crate) restitution: f64,
    pub(crate) enabled: bool,
    pub(crate) touching: bool,
    pub(crate) edges: [GraphEdge<ContactKey>; 2],
}

impl Contact {
    /// Fixtures in solver order (A ranks no higher than B)
    pub fn fixtures(&self) -> (FixtureHandle, FixtureHandle) {
        (self.fixture_a, self.fixture_b)
    }

    /// Bodies owning fixture A and fixture B
    pub fn bodies(&self) -> (BodyHandle, BodyHandle) {
        (self.body_a, self.body_b)
    }

    /// Manifold from the last update
    pub fn manifold(&self) -> &Manifold {
        &self.manifold
    }

    /// Whether the manifold has points
    pub fn is_touching(&self) -> bool {
        self.touching
    }

    /// Whether the solver will act on this contact
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Mixed friction coefficient
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Mixed restitution
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Manifold in world coordinates
    pub(crate) fn world_manifold(
        &self,
        bodies: &Arena<BodyHandle, Body>,
        fixtures: &Arena<FixtureHandle, Fixture>,
    ) -> WorldManifold {
        WorldManifold::new(
            &self.manifold,
            &bodies[self.body_a].xf,
            fixtures[self.fixture_a].shape.radius(),
            &bodies[self.body_b].xf,
            fixtures[self.fixture_b].shape.radius(),
        )
    }

    /// Whether this contact is solved this tick
    pub(crate) fn is_solvable(&self) -> bool {
        self.enabled && self.touching
    }

    fn touch_event(&self, begin: bool) -> PhysicsEvent {
        if begin {
            PhysicsEvent::BeginTouch {
                fixture_a: self.fixture_a,
                fixture_b: self.fixture_b,
                body_a: self.body_a,
                body_b: self.body_b,
            }
        } else {
            PhysicsEvent::EndTouch {
                fixture_a: self.fixture_a,
                fixture_b: self.fixture_b,
                body_a: self.body_a,
                body_b: self.body_b,
            }
        }
    }
}

impl EdgeOwner<ContactKey> for Contact {
    fn edge(&self, side: usize) -> &GraphEdge<ContactKey> {
        &self.edges[side]
    }

    fn edge_mut(&mut self, side: usize) -> &mut GraphEdge<ContactKey> {
        &mut self.edges[side]
    }
}

/// Friction mixing: geometric mean
pub fn mix_friction(a: f64, b: f64) -> f64 {
    (a * b).sqrt()
}

/// Restitution mixing: the bouncier fixture wins
pub fn mix_restitution(a: f64, b: f64) -> f64 {
    a.max(b)
}

/// Owner of every contact in a world
#[derive(Debug, Default)]
pub struct ContactManager {
    pub(crate) contacts: Arena<ContactKey, Contact>,
    pairs: BTreeMap<(FixtureHandle, FixtureHandle), ContactKey>,
}

impl ContactManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live contacts
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Whether there are no contacts
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    /// Contact for a fixture pair, in either order
    pub fn find(&self, a: FixtureHandle, b: FixtureHandle) -> Option<ContactKey> {
        self.pairs.get(&pair_key(a, b)).copied()
    }

    /// Contact by key
    pub fn get(&self, key: ContactKey) -> Option<&Contact> {
        self.contacts.get(key)
    }

    /// All contacts in creation slot order
    pub fn iter(&self) -> impl Iterator<Item = (ContactKey, &Contact)> {
        self.contacts.iter()
    }

    /// Create a contact for a new broadphase pair
    ///
    /// Returns `None` when the pair already has a contact or the shape
    /// kinds can never collide. Fixtures are ordered so that A has the
    /// lower shape rank.
    pub(crate) fn add_pair(
        &mut self,
        a: FixtureHandle,
        b: FixtureHandle,
        fixtures: &Arena<FixtureHandle, Fixture>,
        bodies: &mut Arena<BodyHandle, Body>,
    ) -> Option<ContactKey> {
        let key = pair_key(a, b);
        if self.pairs.contains_key(&key) {
            return None;
        }

        let (mut fa, mut fb) = key;
        if fixtures[fa].shape.kind() > fixtures[fb].shape.kind() {
            std::mem::swap(&mut fa, &mut fb);
        }
        let fixture_a = &fixtures[fa];
        let fixture_b = &fixtures[fb];
        if !collision::can_collide(fixture_a.shape.kind(), fixture_b.shape.kind()) {
            return None;
        }

        let body_a = fixture_a.body;
        let body_b = fixture_b.body;
        let contact_key = self.contacts.insert(Contact {
            fixture_a: fa,
            fixture_b: fb,
            body_a,
            body_b,
            manifold: Manifold::default(),
            friction: mix_friction(fixture_a.friction, fixture_b.friction),
            restitution: mix_restitution(fixture_a.restitution, fixture_b.restitution),
            enabled: true,
            touching: false,
            edges: [GraphEdge::new(body_b), GraphEdge::new(body_a)],
        });
        graph::link(&mut self.contacts, &mut bodies[body_a].contact_list, contact_key, 0);
        graph::link(&mut self.contacts, &mut bodies[body_b].contact_list, contact_key, 1);
        self.pairs.insert(key, contact_key);
        Some(contact_key)
    }

    /// Destroy a contact, raising `EndTouch` if it was touching
    pub(crate) fn destroy(
        &mut self,
        key: ContactKey,
        bodies: &mut Arena<BodyHandle, Body>,
        events: &mut EventQueue,
    ) {
        let (body_a, body_b, pair) = {
            let c = &self.contacts[key];
            if c.touching {
                events.push(c.touch_event(false));
            }
            (c.body_a, c.body_b, pair_key(c.fixture_a, c.fixture_b))
        };
        graph::unlink(&mut self.contacts, &mut bodies[body_a].contact_list, key, 0);
        graph::unlink(&mut self.contacts, &mut bodies[body_b].contact_list, key, 1);
        self.pairs.remove(&pair);
        self.contacts.remove(key);
    }

    /// Destroy every contact involving `fixture`
    pub(crate) fn destroy_for_fixture(
        &mut self,
        fixture: FixtureHandle,
        body: BodyHandle,
        bodies: &mut Arena<BodyHandle, Body>,
        events: &mut EventQueue,
    ) {
        let doomed: Vec<ContactKey> = graph::edges(&self.contacts, bodies[body].contact_list)
            .map(|(key, _)| key)
            .filter(|&key| {
                let c = &self.contacts[key];
                c.fixture_a == fixture || c.fixture_b == fixture
            })
            .collect();
        for key in doomed {
            self.destroy(key, bodies, events);
        }
    }

    /// Destroy every contact touching `body`
    pub(crate) fn destroy_for_body(
        &mut self,
        body: BodyHandle,
        bodies: &mut Arena<BodyHandle, Body>,
        events: &mut EventQueue,
    ) {
        let doomed: Vec<ContactKey> = graph::edges(&self.contacts, bodies[body].contact_list)
            .map(|(key, _)| key)
            .collect();
        for key in doomed {
            self.destroy(key, bodies, events);
        }
    }

    /// Update every contact's manifold for the current transforms
    ///
    /// Contacts whose pair is no longer wanted or whose fat AABBs stopped
    /// overlapping are destroyed. Contacts between two inactive bodies are
    /// left untouched. Returns the bodies of contacts that began touching,
    /// which the caller wakes.
    pub(crate) fn collide<F>(
        &mut self,
        bodies: &mut Arena<BodyHandle, Body>,
        fixtures: &Arena<FixtureHandle, Fixture>,
        broadphase: &BroadPhase,
        events: &mut EventQueue,
        mut should_collide: F,
    ) -> Vec<BodyHandle>
    where
        F: FnMut(&Arena<BodyHandle, Body>, FixtureHandle, FixtureHandle) -> bool,
    {
        let mut woken = Vec::new();
        for key in self.contacts.keys() {
            let (fa, fb, ba, bb) = {
                let c = &self.contacts[key];
                (c.fixture_a, c.fixture_b, c.body_a, c.body_b)
            };

            if !should_collide(bodies, fa, fb) {
                self.destroy(key, bodies, events);
                continue;
            }

            let (active, map, xf_a, xf_b) = {
                let body_a = &bodies[ba];
                let body_b = &bodies[bb];
                (
                    body_a.is_active() || body_b.is_active(),
                    body_a.map,
                    body_a.xf,
                    body_b.xf,
                )
            };
            if !active {
                continue;
            }

            if !broadphase.test_overlap(map, fixtures[fa].proxy, fixtures[fb].proxy) {
                self.destroy(key, bodies, events);
                continue;
            }

            let contact = &mut self.contacts[key];
            let was_touching = contact.touching;

            let mut manifold =
                collision::collide(&fixtures[fa].shape, &xf_a, &fixtures[fb].shape, &xf_b);
            manifold.match_impulses(&contact.manifold);
            contact.manifold = manifold;
            contact.touching = contact.manifold.is_touching();

            if contact.touching && !was_touching {
                debug!(contact = ?key, fixture_a = ?fa, fixture_b = ?fb, "begin touch");
                events.push(contact.touch_event(true));
                woken.push(ba);
                woken.push(bb);
            } else if !contact.touching && was_touching {
                debug!(contact = ?key, fixture_a = ?fa, fixture_b = ?fb, "end touch");
                events.push(contact.touch_event(false));
            }
        }
        woken
    }
}

fn pair_key(a: FixtureHandle, b: FixtureHandle) -> (FixtureHandle, FixtureHandle) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixing_rules() {
        assert!((mix_friction(0.4, 0.9) - 0.6).abs() < 1e-12);
        assert_eq!(mix_friction(0.0, 1.0), 0.0);
        assert_eq!(mix_restitution(0.1, 0.7), 0.7);
    }

    #[test]
    fn test_pair_key_is_symmetric() {
        let mut arena: Arena<FixtureHandle, ()> = Arena::new();
        let a = arena.insert(());
        let b = arena.insert(());
        assert_eq!(pair_key(a, b), pair_key(b, a));
    }
}
