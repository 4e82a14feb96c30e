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
//! Notifications raised by a step
//!
//! Events are queued while the world steps and handed to the host through
//! [`crate::world::PhysicsWorld::drain_events`], in the order they happened.

use crate::arena::{BodyHandle, FixtureHandle, JointHandle};

/// Something the host may want to react to
#[derive(Debug, Clone, PartialEq)]
pub enum PhysicsEvent {
    /// Two fixtures started touching
    BeginTouch {
        /// Fixture A of the contact
        fixture_a: FixtureHandle,
        /// Fixture B of the contact
        fixture_b: FixtureHandle,
        /// Body owning fixture A
        body_a: BodyHandle,
        /// Body owning fixture B
        body_b: BodyHandle,
    },
    /// Two fixtures stopped touching, or their contact was destroyed while
    /// touching
    EndTouch {
        /// Fixture A of the contact
        fixture_a: FixtureHandle,
        /// Fixture B of the contact
        fixture_b: FixtureHandle,
        /// Body owning fixture A
        body_a: BodyHandle,
        /// Body owning fixture B
        body_b: BodyHandle,
    },
    /// A joint exceeded its break threshold and was removed
    JointBroken {
        /// Handle of the removed joint
        joint: JointHandle,
        /// First connected body
        body_a: BodyHandle,
        /// Second connected body
        body_b: BodyHandle,
        /// Reaction force magnitude at the time of breaking
        force: f64,
        /// Reaction torque magnitude at the time of breaking
        torque: f64,
    },
    /// A body produced a non-finite position or velocity and was reset
    NumericalFault {
        /// Affected body
        body: BodyHandle,
    },
}

/// Ordered queue of pending events
#[derive(Debug, Clone, Default)]
pub struct EventQueue {
    events: Vec<PhysicsEvent>,
}

impl EventQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event
    pub fn push(&mut self, event: PhysicsEvent) {
        self.events.push(event);
    }

    /// Take every pending event
    pub fn drain(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pending events without consuming them
    pub fn pending(&self) -> &[PhysicsEvent] {
        &self.events
    }

    /// Number of pending events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events are pending
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
