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
//! Island construction and wake propagation
//!
//! An island is the set of awake dynamic bodies connected through touching
//! contacts and joints. Static, kinematic and sleeping bodies are copied in
//! as anchors: they keep their velocity but act with zero inverse mass and
//! are never written back.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use super::{Position, Velocity};
use crate::arena::{Arena, BodyHandle, ContactKey, FixtureHandle, JointHandle};
use crate::body::{Body, BodyType, Fixture};
use crate::collision::Manifold;
use crate::contact::Contact;
use crate::graph;
use crate::joint::{Joint, SolverBodies};
use crate::math::Vec2;

/// Solver-facing copy of one body
#[derive(Debug, Clone)]
pub(crate) struct IslandBody {
    pub handle: BodyHandle,
    pub anchor: bool,
    pub local_center: Vec2,
    pub inv_mass: f64,
    pub inv_i: f64,
    pub force: Vec2,
    pub torque: f64,
    pub gravity_scale: f64,
    pub linear_damping: f64,
    pub angular_damping: f64,
    pub sleeping_allowed: bool,
    pub sleep_time: f64,
}

impl IslandBody {
    /// An immovable participant
    pub fn anchor(handle: BodyHandle, local_center: Vec2) -> Self {
        IslandBody {
            handle,
            anchor: true,
            local_center,
            inv_mass: 0.0,
            inv_i: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            gravity_scale: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            sleeping_allowed: true,
            sleep_time: 0.0,
        }
    }

    fn from_body(handle: BodyHandle, body: &Body, anchor: bool) -> Self {
        if anchor {
            return IslandBody::anchor(handle, body.local_center);
        }
        IslandBody {
            handle,
            anchor: false,
            local_center: body.local_center,
            inv_mass: body.inv_mass,
            inv_i: body.solver_inv_inertia(),
            force: body.force,
            torque: body.torque,
            gravity_scale: body.gravity_scale,
            linear_damping: body.linear_damping,
            angular_damping: body.angular_damping,
            sleeping_allowed: body.sleeping_allowed,
            sleep_time: body.sleep_time,
        }
    }
}

/// Solver-facing copy of one touching contact
#[derive(Debug, Clone)]
pub(crate) struct IslandContact {
    pub key: ContactKey,
    pub index_a: usize,
    pub index_b: usize,
    pub manifold: Manifold,
    pub friction: f64,
    pub restitution: f64,
    pub radius_a: f64,
    pub radius_b: f64,
}

/// Solver-facing copy of one joint
#[derive(Debug, Clone)]
pub(crate) struct IslandJoint {
    pub handle: JointHandle,
    pub joint: Joint,
    pub bodies: SolverBodies,
}

/// Result of solving an island
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct IslandOutcome {
    pub sleep: bool,
    pub position_solved: bool,
    pub velocity_residual: f64,
}

/// One independent group of bodies and constraints
#[derive(Debug, Clone, Default)]
pub(crate) struct Island {
    pub bodies: Vec<IslandBody>,
    pub positions: Vec<Position>,
    pub velocities: Vec<Velocity>,
    pub contacts: Vec<IslandContact>,
    pub joints: Vec<IslandJoint>,
    pub outcome: IslandOutcome,
}

impl Island {
    /// Handles of the bodies this island moves
    pub fn members(&self) -> impl Iterator<Item = BodyHandle> + '_ {
        self.bodies.iter().filter(|b| !b.anchor).map(|b| b.handle)
    }
}

/// Bodies that never move inside an island
fn is_anchor(body: &Body) -> bool {
    body.body_type != BodyType::Dynamic || !body.awake
}

struct IslandBuilder<'a> {
    bodies: &'a Arena<BodyHandle, Body>,
    island: Island,
    index: BTreeMap<BodyHandle, usize>,
}

impl<'a> IslandBuilder<'a> {
    fn add(&mut self, handle: BodyHandle) -> usize {
        if let Some(&i) = self.index.get(&handle) {
            return i;
        }
        let bodies = self.bodies;
        let body = &bodies[handle];
        let i = self.island.bodies.len();
        self.island
            .bodies
            .push(IslandBody::from_body(handle, body, is_anchor(body)));
        self.island.positions.push(Position::new(body.center, body.angle));
        let velocity = if body.body_type == BodyType::Static {
            Velocity::default()
        } else {
            Velocity::new(body.linear_velocity, body.angular_velocity)
        };
        self.island.velocities.push(velocity);
        self.index.insert(handle, i);
        i
    }

    fn solver_bodies(&self, joint: &Joint) -> SolverBodies {
        let a = self.index[&joint.body_a];
        let b = self.index[&joint.body_b];
        let body_a = &self.island.bodies[a];
        let body_b = &self.island.bodies[b];
        SolverBodies {
            index_a: a,
            index_b: b,
            local_center_a: body_a.local_center,
            local_center_b: body_b.local_center,
            inv_mass_a: body_a.inv_mass,
            inv_mass_b: body_b.inv_mass,
            inv_i_a: body_a.inv_i,
            inv_i_b: body_b.inv_i,
        }
    }
}

/// Partition the awake dynamic bodies into islands
///
/// Seeds are taken in body slot order and traversal is breadth first over
/// each body's adjacency lists, so the result only depends on the order in
/// which things were created.
pub(crate) fn build_islands(
    bodies: &Arena<BodyHandle, Body>,
    fixtures: &Arena<FixtureHandle, Fixture>,
    contacts: &Arena<ContactKey, Contact>,
    joints: &Arena<JointHandle, Joint>,
) -> Vec<Island> {
    let mut body_seen = vec![false; bodies.capacity_slots()];
    let mut contact_seen = vec![false; contacts.capacity_slots()];
    let mut joint_seen = vec![false; joints.capacity_slots()];
    let mut islands = Vec::new();
    let mut queue = VecDeque::new();

    for (seed, body) in bodies.iter() {
        if body_seen[seed.slot() as usize] || is_anchor(body) {
            continue;
        }

        let mut builder = IslandBuilder {
            bodies,
            island: Island::default(),
            index: BTreeMap::new(),
        };
        let mut contact_keys = Vec::new();
        let mut joint_handles = Vec::new();

        body_seen[seed.slot() as usize] = true;
        builder.add(seed);
        queue.push_back(seed);

        while let Some(current) = queue.pop_front() {
            let body = &bodies[current];

            for (key, other) in graph::edges(contacts, body.contact_list) {
                let contact = &contacts[key];
                if contact_seen[key.slot() as usize] || !contact.is_solvable() {
                    continue;
                }
                contact_seen[key.slot() as usize] = true;
                contact_keys.push(key);
                visit(&mut builder, &mut body_seen, &mut queue, other);
            }

            for (handle, other) in graph::edges(joints, body.joint_list) {
                if joint_seen[handle.slot() as usize] {
                    continue;
                }
                joint_seen[handle.slot() as usize] = true;
                joint_handles.push(handle);
                visit(&mut builder, &mut body_seen, &mut queue, other);
            }
        }

        for key in contact_keys {
            let contact = &contacts[key];
            let index_a = builder.index[&contact.body_a];
            let index_b = builder.index[&contact.body_b];
            builder.island.contacts.push(IslandContact {
                key,
                index_a,
                index_b,
                manifold: contact.manifold.clone(),
                friction: contact.friction,
                restitution: contact.restitution,
                radius_a: fixtures[contact.fixture_a].shape.radius(),
                radius_b: fixtures[contact.fixture_b].shape.radius(),
            });
        }

        for handle in joint_handles {
            let joint = &joints[handle];
            let solver_bodies = builder.solver_bodies(joint);
            builder.island.joints.push(IslandJoint {
                handle,
                joint: joint.clone(),
                bodies: solver_bodies,
            });
        }

        islands.push(builder.island);
    }

    islands
}

fn visit(
    builder: &mut IslandBuilder<'_>,
    body_seen: &mut [bool],
    queue: &mut VecDeque<BodyHandle>,
    other: BodyHandle,
) {
    if is_anchor(&builder.bodies[other]) {
        builder.add(other);
        return;
    }
    if !body_seen[other.slot() as usize] {
        body_seen[other.slot() as usize] = true;
        builder.add(other);
        queue.push_back(other);
    }
}

/// Wake `start` and every dynamic body connected to it through touching
/// contacts and joints
///
/// Static and kinematic bodies are not traversed, so two stacks resting on
/// the same ground wake independently.
pub(crate) fn wake_island(
    bodies: &mut Arena<BodyHandle, Body>,
    contacts: &Arena<ContactKey, Contact>,
    joints: &Arena<JointHandle, Joint>,
    start: BodyHandle,
) {
    let mut seen = BTreeSet::new();
    let mut queue = VecDeque::new();
    seen.insert(start);
    queue.push_back(start);

    while let Some(current) = queue.pop_front() {
        let body = &mut bodies[current];
        if body.body_type == BodyType::Static {
            continue;
        }
        body.set_awake(true);
        if body.body_type != BodyType::Dynamic {
            continue;
        }

        let contact_list = body.contact_list;
        let joint_list = body.joint_list;
        let neighbours = graph::edges(contacts, contact_list)
            .filter(|&(key, _)| contacts[key].touching)
            .map(|(_, other)| other)
            .chain(graph::edges(joints, joint_list).map(|(_, other)| other));
        for other in neighbours {
            if bodies[other].body_type == BodyType::Dynamic && seen.insert(other) {
                queue.push_back(other);
            }
        }
    }
}
