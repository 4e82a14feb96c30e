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
//! The physics world
//!
//! [`PhysicsWorld`] owns every body, fixture, joint and contact and advances
//! them one fixed tick per [`PhysicsWorld::step`]. The host refers to
//! objects through generational handles; a handle to a removed object is
//! rejected with [`PhysicsError::InvalidHandle`].
//!
//! A tick runs, in order: pair finding in the broadphase, manifold updates,
//! force providers, island building and solving, joint breaking, kinematic
//! integration, proxy synchronisation and finally clearing the force
//! accumulators. Events raised along the way are queued until
//! [`PhysicsWorld::drain_events`].

use std::fmt;

use tracing::{debug, error, trace, warn};

use crate::arena::{Arena, ArenaKey, BodyHandle, ContactKey, FixtureHandle, JointHandle};
use crate::body::{Body, BodyDef, BodyStatus, BodyType, Fixture, FixtureDef};
use crate::broadphase::{BroadPhase, MapId};
use crate::collision::WorldManifold;
use crate::config::WorldConfig;
use crate::contact::{Contact, ContactManager};
use crate::error::{PhysicsError, Result};
use crate::events::{EventQueue, PhysicsEvent};
use crate::forces::{ForceProvider, ForceRegistry};
use crate::graph;
use crate::joint::{Joint, JointDef};
use crate::math::{Aabb, RayCastInput, Transform, Vec2};
use crate::shape::MassData;
use crate::solver::island::{build_islands, wake_island, Island};
use crate::solver::{solve_islands, SolverStats, TimeStep};
use crate::state::BodyState;
use crate::tree::ProxyId;

/// Closest fixture hit by [`PhysicsWorld::ray_cast`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Fixture that was hit
    pub fixture: FixtureHandle,
    /// Body owning the fixture
    pub body: BodyHandle,
    /// World point of the hit
    pub point: Vec2,
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// Distance from the ray origin
    pub distance: f64,
}

/// A 2D rigid-body simulation
pub struct PhysicsWorld {
    config: WorldConfig,
    bodies: Arena<BodyHandle, Body>,
    fixtures: Arena<FixtureHandle, Fixture>,
    joints: Arena<JointHandle, Joint>,
    contacts: ContactManager,
    broadphase: BroadPhase,
    events: EventQueue,
    forces: ForceRegistry,
    islands: Vec<Vec<BodyHandle>>,
    stats: SolverStats,
    inv_dt0: f64,
    ticks: u64,
}

fn invalid<K: ArenaKey>(handle: K) -> PhysicsError {
    PhysicsError::InvalidHandle {
        kind: K::KIND,
        handle: format!("{:?}", handle),
    }
}

fn check_finite(name: &str, valid: bool) -> Result<()> {
    if valid {
        Ok(())
    } else {
        Err(PhysicsError::InvalidConfig(format!("{} must be finite", name)))
    }
}

/// Whether two fixtures should get a contact
fn should_collide(
    bodies: &Arena<BodyHandle, Body>,
    fixtures: &Arena<FixtureHandle, Fixture>,
    joints: &Arena<JointHandle, Joint>,
    a: FixtureHandle,
    b: FixtureHandle,
) -> bool {
    let fixture_a = &fixtures[a];
    let fixture_b = &fixtures[b];
    if fixture_a.body == fixture_b.body {
        return false;
    }
    let body_a = &bodies[fixture_a.body];
    let body_b = &bodies[fixture_b.body];
    if body_a.body_type != BodyType::Dynamic && body_b.body_type != BodyType::Dynamic {
        return false;
    }
    if !body_a.can_collide || !body_b.can_collide {
        return false;
    }
    if !fixture_a.filter_accepts(fixture_b) {
        return false;
    }
    !graph::edges(joints, body_a.joint_list)
        .any(|(joint, other)| other == fixture_b.body && !joints[joint].collide_connected)
}

impl PhysicsWorld {
    /// Create an empty world
    pub fn new(config: WorldConfig) -> Result<Self> {
        config.validate()?;
        Ok(PhysicsWorld {
            config,
            bodies: Arena::new(),
            fixtures: Arena::new(),
            joints: Arena::new(),
            contacts: ContactManager::new(),
            broadphase: BroadPhase::new(),
            events: EventQueue::new(),
            forces: ForceRegistry::new(),
            islands: Vec::new(),
            stats: SolverStats::default(),
            inv_dt0: 0.0,
            ticks: 0,
        })
    }

    /// Current configuration
    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Replace the configuration between ticks
    pub fn set_config(&mut self, config: WorldConfig) -> Result<()> {
        config.validate()?;
        if !config.allow_sleep && self.config.allow_sleep {
            let handles = self.bodies.keys();
            for handle in handles {
                self.bodies[handle].set_awake(true);
            }
        }
        self.config = config;
        Ok(())
    }

    /// Number of completed ticks
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    // Bodies

    /// Add a body
    pub fn create_body(&mut self, def: BodyDef) -> Result<BodyHandle> {
        def.validate()?;
        let handle = self.bodies.insert(Body::new(&def));
        debug!(body = ?handle, body_type = ?def.body_type, "created body");
        Ok(handle)
    }

    /// Remove a body together with its fixtures, joints and contacts
    ///
    /// Touching contacts raise `EndTouch`; bodies that were jointed to it
    /// are woken.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> Result<()> {
        let body = self.bodies.get(handle).ok_or_else(|| invalid(handle))?;
        let joints: Vec<JointHandle> = graph::edges(&self.joints, body.joint_list)
            .map(|(joint, _)| joint)
            .collect();
        for joint in joints {
            self.remove_joint(joint);
        }

        self.contacts
            .destroy_for_body(handle, &mut self.bodies, &mut self.events);

        let body = &self.bodies[handle];
        let map = body.map;
        for &fixture in &body.fixtures {
            if let Some(removed) = self.fixtures.remove(fixture) {
                self.broadphase.destroy_proxy(map, removed.proxy);
            }
        }
        self.bodies.remove(handle);
        debug!(body = ?handle, "destroyed body");
        Ok(())
    }

    /// Look up a body
    pub fn body(&self, handle: BodyHandle) -> Result<&Body> {
        self.bodies.get(handle).ok_or_else(|| invalid(handle))
    }

    /// Every body in slot order
    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &Body)> {
        self.bodies.iter()
    }

    /// Number of live bodies
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Result<&mut Body> {
        self.bodies.get_mut(handle).ok_or_else(|| invalid(handle))
    }

    /// Set the linear velocity of the centre of mass
    ///
    /// Ignored for static bodies. A non-zero velocity wakes the body's
    /// island.
    pub fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec2) -> Result<()> {
        check_finite("linear velocity", velocity.is_valid())?;
        let body = self.body_mut(handle)?;
        if body.body_type == BodyType::Static {
            return Ok(());
        }
        body.linear_velocity = velocity;
        if velocity.length_squared() > 0.0 {
            self.wake(handle);
        }
        Ok(())
    }

    /// Set the angular velocity
    pub fn set_angular_velocity(&mut self, handle: BodyHandle, omega: f64) -> Result<()> {
        check_finite("angular velocity", omega.is_finite())?;
        let body = self.body_mut(handle)?;
        if body.body_type == BodyType::Static {
            return Ok(());
        }
        body.angular_velocity = omega;
        if omega != 0.0 {
            self.wake(handle);
        }
        Ok(())
    }

    /// Teleport a body's origin
    pub fn set_transform(&mut self, handle: BodyHandle, position: Vec2, angle: f64) -> Result<()> {
        check_finite("position", position.is_valid() && angle.is_finite())?;
        let body = self.body_mut(handle)?;
        body.set_transform(position, angle);
        let xf = body.xf;
        self.synchronize_fixtures(handle, xf);
        self.wake(handle);
        Ok(())
    }

    fn dynamic_mut(&mut self, handle: BodyHandle) -> Result<Option<&mut Body>> {
        let body = self.body_mut(handle)?;
        Ok((body.body_type == BodyType::Dynamic).then_some(body))
    }

    /// Add a force at the centre of mass for the next tick
    pub fn apply_force(&mut self, handle: BodyHandle, force: Vec2) -> Result<()> {
        check_finite("force", force.is_valid())?;
        if let Some(body) = self.dynamic_mut(handle)? {
            body.force += force;
            self.wake(handle);
        }
        Ok(())
    }

    /// Add a force at a world point for the next tick
    pub fn apply_force_at_point(&mut self, handle: BodyHandle, force: Vec2, point: Vec2) -> Result<()> {
        check_finite("force", force.is_valid() && point.is_valid())?;
        if let Some(body) = self.dynamic_mut(handle)? {
            body.force += force;
            body.torque += (point - body.center).cross(force);
            self.wake(handle);
        }
        Ok(())
    }

    /// Add a torque for the next tick
    pub fn apply_torque(&mut self, handle: BodyHandle, torque: f64) -> Result<()> {
        check_finite("torque", torque.is_finite())?;
        if let Some(body) = self.dynamic_mut(handle)? {
            body.torque += torque;
            self.wake(handle);
        }
        Ok(())
    }

    /// Change velocity immediately by an impulse at a world point
    pub fn apply_linear_impulse(&mut self, handle: BodyHandle, impulse: Vec2, point: Vec2) -> Result<()> {
        check_finite("impulse", impulse.is_valid() && point.is_valid())?;
        if let Some(body) = self.dynamic_mut(handle)? {
            body.linear_velocity += impulse * body.inv_mass;
            body.angular_velocity +=
                body.solver_inv_inertia() * (point - body.center).cross(impulse);
            self.wake(handle);
        }
        Ok(())
    }

    /// Change angular velocity immediately
    pub fn apply_angular_impulse(&mut self, handle: BodyHandle, impulse: f64) -> Result<()> {
        check_finite("angular impulse", impulse.is_finite())?;
        if let Some(body) = self.dynamic_mut(handle)? {
            body.angular_velocity += body.solver_inv_inertia() * impulse;
            self.wake(handle);
        }
        Ok(())
    }

    /// Wake a body's island, or put just this body to sleep
    pub fn set_awake(&mut self, handle: BodyHandle, awake: bool) -> Result<()> {
        let body = self.body_mut(handle)?;
        if awake {
            self.wake(handle);
        } else {
            body.set_awake(false);
        }
        Ok(())
    }

    /// Change between static, kinematic and dynamic
    ///
    /// Existing contacts are dropped and found again on the next tick.
    pub fn set_body_type(&mut self, handle: BodyHandle, body_type: BodyType) -> Result<()> {
        let body = self.bodies.get_mut(handle).ok_or_else(|| invalid(handle))?;
        if body.body_type == body_type {
            return Ok(());
        }
        body.set_type(body_type, &self.fixtures);
        self.contacts
            .destroy_for_body(handle, &mut self.bodies, &mut self.events);
        self.touch_proxies(handle);
        self.wake(handle);
        debug!(body = ?handle, ?body_type, "changed body type");
        Ok(())
    }

    /// Enable or disable collisions for every fixture of a body
    pub fn set_can_collide(&mut self, handle: BodyHandle, can_collide: bool) -> Result<()> {
        let body = self.body_mut(handle)?;
        if body.can_collide == can_collide {
            return Ok(());
        }
        body.can_collide = can_collide;
        if can_collide {
            self.touch_proxies(handle);
        }
        self.wake(handle);
        Ok(())
    }

    /// Lock or unlock rotation
    pub fn set_fixed_rotation(&mut self, handle: BodyHandle, fixed: bool) -> Result<()> {
        let body = self.body_mut(handle)?;
        body.fixed_rotation = fixed;
        if fixed {
            body.angular_velocity = 0.0;
        }
        self.wake(handle);
        Ok(())
    }

    /// Allow or forbid sleeping; forbidding wakes the body
    pub fn set_sleeping_allowed(&mut self, handle: BodyHandle, allowed: bool) -> Result<()> {
        let body = self.body_mut(handle)?;
        body.sleeping_allowed = allowed;
        if !allowed {
            self.wake(handle);
        }
        Ok(())
    }

    /// Set the host movement status
    pub fn set_status(&mut self, handle: BodyHandle, status: BodyStatus) -> Result<()> {
        self.body_mut(handle)?.status = status;
        Ok(())
    }

    /// Scale world gravity for one body
    pub fn set_gravity_scale(&mut self, handle: BodyHandle, scale: f64) -> Result<()> {
        check_finite("gravity scale", scale.is_finite())?;
        self.body_mut(handle)?.gravity_scale = scale;
        self.wake(handle);
        Ok(())
    }

    /// Set linear and angular damping
    pub fn set_damping(&mut self, handle: BodyHandle, linear: f64, angular: f64) -> Result<()> {
        if !(linear.is_finite() && angular.is_finite() && linear >= 0.0 && angular >= 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "damping ({}, {}) must be finite and non-negative",
                linear, angular
            )));
        }
        let body = self.body_mut(handle)?;
        body.linear_damping = linear;
        body.angular_damping = angular;
        Ok(())
    }

    /// Override the mass properties computed from the fixtures
    ///
    /// Ignored for non-dynamic bodies. The override lasts until the next
    /// fixture is added or removed.
    pub fn set_mass_data(&mut self, handle: BodyHandle, data: &MassData) -> Result<()> {
        self.body_mut(handle)?.set_mass_data(data)?;
        self.wake(handle);
        Ok(())
    }

    // Fixtures

    /// Attach a shape to a body
    pub fn create_fixture(&mut self, body: BodyHandle, def: FixtureDef) -> Result<FixtureHandle> {
        def.validate()?;
        let owner = self.bodies.get(body).ok_or_else(|| invalid(body))?;
        let map = owner.map;
        let aabb = def.shape.compute_aabb(&owner.xf);

        let handle = self.fixtures.insert(Fixture {
            body,
            shape: def.shape,
            density: def.density,
            friction: def.friction,
            restitution: def.restitution,
            layer: def.layer,
            mask: def.mask,
            proxy: ProxyId::NULL,
            aabb,
        });
        let proxy = self.broadphase.create_proxy(map, aabb, handle);
        self.fixtures[handle].proxy = proxy;

        let owner = &mut self.bodies[body];
        owner.fixtures.push(handle);
        owner.reset_mass_data(&self.fixtures);
        self.wake(body);
        debug!(fixture = ?handle, ?body, "created fixture");
        Ok(handle)
    }

    /// Detach and drop a fixture
    pub fn destroy_fixture(&mut self, handle: FixtureHandle) -> Result<()> {
        let fixture = self.fixtures.get(handle).ok_or_else(|| invalid(handle))?;
        let body = fixture.body;
        let proxy = fixture.proxy;
        let map = self.bodies[body].map;

        self.contacts
            .destroy_for_fixture(handle, body, &mut self.bodies, &mut self.events);
        self.broadphase.destroy_proxy(map, proxy);
        self.fixtures.remove(handle);

        let owner = &mut self.bodies[body];
        owner.fixtures.retain(|&f| f != handle);
        owner.reset_mass_data(&self.fixtures);
        self.wake(body);
        debug!(fixture = ?handle, ?body, "destroyed fixture");
        Ok(())
    }

    /// Look up a fixture
    pub fn fixture(&self, handle: FixtureHandle) -> Result<&Fixture> {
        self.fixtures.get(handle).ok_or_else(|| invalid(handle))
    }

    /// Change a fixture's collision layer and mask
    ///
    /// Existing contacts are re-filtered on the next tick; newly allowed
    /// pairs are found on the next tick too.
    pub fn set_filter(&mut self, handle: FixtureHandle, layer: u32, mask: u32) -> Result<()> {
        let fixture = self.fixtures.get_mut(handle).ok_or_else(|| invalid(handle))?;
        fixture.layer = layer;
        fixture.mask = mask;
        let body = fixture.body;
        let proxy = fixture.proxy;
        self.broadphase.touch_proxy(self.bodies[body].map, proxy);
        self.wake(body);
        Ok(())
    }

    // Joints

    /// Connect two bodies
    pub fn create_joint(&mut self, def: JointDef) -> Result<JointHandle> {
        def.validate()?;
        if !self.bodies.contains(def.body_a) {
            return Err(invalid(def.body_a));
        }
        if !self.bodies.contains(def.body_b) {
            return Err(invalid(def.body_b));
        }
        let (map_a, map_b) = (self.bodies[def.body_a].map, self.bodies[def.body_b].map);
        if map_a != map_b {
            return Err(PhysicsError::InvalidJoint(format!(
                "joint connects bodies in different maps ({:?} and {:?})",
                map_a, map_b
            )));
        }

        let handle = self.joints.insert(Joint::new(&def));
        graph::link(&mut self.joints, &mut self.bodies[def.body_a].joint_list, handle, 0);
        graph::link(&mut self.joints, &mut self.bodies[def.body_b].joint_list, handle, 1);
        self.wake(def.body_a);
        self.wake(def.body_b);
        debug!(joint = ?handle, body_a = ?def.body_a, body_b = ?def.body_b, "created joint");
        Ok(handle)
    }

    /// Remove a joint, waking both bodies
    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<()> {
        if !self.joints.contains(handle) {
            return Err(invalid(handle));
        }
        self.remove_joint(handle);
        debug!(joint = ?handle, "destroyed joint");
        Ok(())
    }

    /// Look up a joint
    pub fn joint(&self, handle: JointHandle) -> Result<&Joint> {
        self.joints.get(handle).ok_or_else(|| invalid(handle))
    }

    /// Joints attached to a body, most recent first
    pub fn joints_of(&self, body: BodyHandle) -> Result<Vec<JointHandle>> {
        let body = self.body(body)?;
        Ok(graph::edges(&self.joints, body.joint_list)
            .map(|(joint, _)| joint)
            .collect())
    }

    /// Number of live joints
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    fn remove_joint(&mut self, handle: JointHandle) {
        let (body_a, body_b) = {
            let joint = &self.joints[handle];
            (joint.body_a, joint.body_b)
        };
        graph::unlink(&mut self.joints, &mut self.bodies[body_a].joint_list, handle, 0);
        graph::unlink(&mut self.joints, &mut self.bodies[body_b].joint_list, handle, 1);
        self.joints.remove(handle);
        self.wake(body_a);
        self.wake(body_b);
    }

    // Contacts

    /// Every contact in slot order
    pub fn contacts(&self) -> impl Iterator<Item = (ContactKey, &Contact)> {
        self.contacts.iter()
    }

    /// Look up a contact
    pub fn contact(&self, key: ContactKey) -> Result<&Contact> {
        self.contacts.get(key).ok_or_else(|| invalid(key))
    }

    /// A contact's manifold evaluated at the current transforms
    pub fn world_manifold(&self, key: ContactKey) -> Result<WorldManifold> {
        let contact = self.contact(key)?;
        Ok(contact.world_manifold(&self.bodies, &self.fixtures))
    }

    /// Contacts involving a body, most recent first
    pub fn contacts_of(&self, body: BodyHandle) -> Result<Vec<ContactKey>> {
        let body = self.body(body)?;
        Ok(graph::edges(&self.contacts.contacts, body.contact_list)
            .map(|(key, _)| key)
            .collect())
    }

    /// Number of live contacts, touching or not
    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }

    /// Exclude or re-include a contact from solving
    ///
    /// The flag persists for the lifetime of the contact.
    pub fn set_contact_enabled(&mut self, key: ContactKey, enabled: bool) -> Result<()> {
        let contact = self
            .contacts
            .contacts
            .get_mut(key)
            .ok_or_else(|| invalid(key))?;
        contact.enabled = enabled;
        let (body_a, body_b) = (contact.body_a, contact.body_b);
        self.wake(body_a);
        self.wake(body_b);
        Ok(())
    }

    // Queries

    /// Fixtures in `map` whose bounding box overlaps `aabb`, in handle order
    pub fn query_aabb(&self, map: MapId, aabb: Aabb) -> Vec<FixtureHandle> {
        let mut found = Vec::new();
        self.broadphase.query(map, &aabb, |fixture| {
            if self.fixtures[fixture].aabb.overlaps(&aabb) {
                found.push(fixture);
            }
            true
        });
        found.sort_unstable();
        found
    }

    /// Closest fixture in `map` hit by a ray
    ///
    /// Returns `None` for a zero direction or a non-positive distance.
    pub fn ray_cast(
        &self,
        map: MapId,
        origin: Vec2,
        direction: Vec2,
        max_distance: f64,
    ) -> Option<RayHit> {
        if !origin.is_valid() || !direction.is_valid() || !max_distance.is_finite() {
            return None;
        }
        let direction = direction.normalize();
        if direction == Vec2::ZERO || max_distance <= 0.0 {
            return None;
        }

        let input = RayCastInput {
            p1: origin,
            p2: origin + direction * max_distance,
            max_fraction: 1.0,
        };
        let mut best = None;
        self.broadphase.ray_cast(map, &input, |sub, handle| {
            let fixture = &self.fixtures[handle];
            let xf = self.bodies[fixture.body].xf;
            match fixture.shape.ray_cast(sub, &xf) {
                Some(output) => {
                    let distance = output.fraction * max_distance;
                    best = Some(RayHit {
                        fixture: handle,
                        body: fixture.body,
                        point: origin + direction * distance,
                        normal: output.normal,
                        distance,
                    });
                    output.fraction
                }
                None => -1.0,
            }
        });
        best
    }

    // Stepping

    /// Register a force provider consulted every tick
    pub fn add_force_provider(&mut self, provider: Box<dyn ForceProvider>) {
        debug!(provider = provider.name(), "registered force provider");
        self.forces.register_provider(provider);
    }

    /// Force provider registry, for adjusting its limits
    pub fn force_registry_mut(&mut self) -> &mut ForceRegistry {
        &mut self.forces
    }

    /// Advance the simulation by one fixed tick
    pub fn step(&mut self) {
        let dt = self.config.fixed_timestep;
        let step = TimeStep::new(
            dt,
            self.inv_dt0 * dt,
            self.config.velocity_iterations,
            self.config.position_iterations,
            self.config.warm_starting,
        );

        self.update_pairs();
        self.collide();
        for handle in self.forces.sleepers_pushed(&self.bodies) {
            debug!(body = ?handle, "provider force woke body");
            self.wake(handle);
        }
        self.forces.accumulate(&mut self.bodies);

        let previous: Vec<(BodyHandle, Transform)> = self
            .bodies
            .iter()
            .filter(|(_, body)| body.is_active())
            .map(|(handle, body)| (handle, body.xf))
            .collect();

        let mut islands = build_islands(
            &self.bodies,
            &self.fixtures,
            &self.contacts.contacts,
            &self.joints,
        );
        solve_islands(&mut islands, &step, &self.config);
        self.stats = SolverStats::from_islands(&islands);
        self.islands = islands.iter().map(|island| island.members().collect()).collect();

        let mut solved_joints = Vec::new();
        for island in islands {
            solved_joints.extend(island.joints.iter().map(|ij| ij.handle));
            self.write_back(island);
        }
        for handle in solved_joints {
            self.check_break(handle, step.inv_dt);
        }

        self.integrate_kinematic(dt);

        for (handle, xf) in previous {
            if self.bodies.contains(handle) {
                self.synchronize_fixtures(handle, xf);
            }
        }

        for (_, body) in self.bodies.iter_mut() {
            body.force = Vec2::ZERO;
            body.torque = 0.0;
        }

        self.inv_dt0 = step.inv_dt;
        self.ticks += 1;
        trace!(
            tick = self.ticks,
            islands = self.stats.islands,
            bodies = self.stats.bodies,
            contacts = self.stats.contacts,
            joints = self.stats.joints,
            "step complete"
        );
    }

    /// Body handles of each island solved by the last tick
    pub fn islands(&self) -> &[Vec<BodyHandle>] {
        &self.islands
    }

    /// Summary of the last tick's solve
    pub fn solver_stats(&self) -> SolverStats {
        self.stats
    }

    /// Take every event queued since the last drain
    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        self.events.drain()
    }

    /// Events queued since the last drain
    pub fn pending_events(&self) -> &[PhysicsEvent] {
        self.events.pending()
    }

    // Replication

    /// Snapshot a body's replicated state
    pub fn body_state(&self, handle: BodyHandle) -> Result<BodyState> {
        Ok(BodyState::capture(self.body(handle)?))
    }

    /// Apply replicated state received from the authority
    pub fn apply_body_state(&mut self, handle: BodyHandle, state: &BodyState) -> Result<()> {
        state.validate()?;
        if !self.bodies.contains(handle) {
            return Err(invalid(handle));
        }
        self.set_body_type(handle, state.body_type)?;
        self.set_can_collide(handle, state.can_collide)?;
        self.set_fixed_rotation(handle, state.fixed_rotation)?;
        self.set_sleeping_allowed(handle, state.sleeping_allowed)?;
        self.set_status(handle, state.status)?;
        self.set_linear_velocity(handle, state.linear_velocity)?;
        self.set_angular_velocity(handle, state.angular_velocity)?;
        Ok(())
    }

    // Internals

    /// Wake a body and everything connected to it
    ///
    /// For static and kinematic bodies the dynamic neighbours' islands are
    /// woken instead.
    fn wake(&mut self, handle: BodyHandle) {
        let body = &self.bodies[handle];
        if body.body_type == BodyType::Dynamic {
            wake_island(&mut self.bodies, &self.contacts.contacts, &self.joints, handle);
            return;
        }

        let contacts = &self.contacts.contacts;
        let neighbours: Vec<BodyHandle> = graph::edges(contacts, body.contact_list)
            .filter(|&(key, _)| contacts[key].touching)
            .map(|(_, other)| other)
            .chain(graph::edges(&self.joints, body.joint_list).map(|(_, other)| other))
            .collect();
        self.bodies[handle].set_awake(true);
        for other in neighbours {
            if self.bodies[other].body_type == BodyType::Dynamic {
                wake_island(&mut self.bodies, &self.contacts.contacts, &self.joints, other);
            }
        }
    }

    fn touch_proxies(&mut self, handle: BodyHandle) {
        let body = &self.bodies[handle];
        for &fixture in &body.fixtures {
            self.broadphase.touch_proxy(body.map, self.fixtures[fixture].proxy);
        }
    }

    fn update_pairs(&mut self) {
        let (bodies, fixtures, joints) = (&self.bodies, &self.fixtures, &self.joints);
        let pairs = self
            .broadphase
            .find_new_pairs(|a, b| should_collide(bodies, fixtures, joints, a, b));
        for (a, b) in pairs {
            self.contacts.add_pair(a, b, &self.fixtures, &mut self.bodies);
        }
    }

    fn collide(&mut self) {
        let (fixtures, joints) = (&self.fixtures, &self.joints);
        let woken = self.contacts.collide(
            &mut self.bodies,
            fixtures,
            &self.broadphase,
            &mut self.events,
            |bodies, a, b| should_collide(bodies, fixtures, joints, a, b),
        );
        for body in woken {
            wake_island(&mut self.bodies, &self.contacts.contacts, &self.joints, body);
        }
    }

    /// Copy an island's results into the arenas
    fn write_back(&mut self, island: Island) {
        for (i, ib) in island.bodies.iter().enumerate() {
            if ib.anchor {
                continue;
            }
            let position = island.positions[i];
            let velocity = island.velocities[i];
            let body = &mut self.bodies[ib.handle];

            let finite = position.c.is_valid()
                && position.a.is_finite()
                && velocity.v.is_valid()
                && velocity.w.is_finite();
            if !finite {
                error!(body = ?ib.handle, "non-finite state after solve, restoring previous position");
                body.linear_velocity = Vec2::ZERO;
                body.angular_velocity = 0.0;
                body.sleep_time = 0.0;
                self.events.push(PhysicsEvent::NumericalFault { body: ib.handle });
                continue;
            }

            body.center = position.c;
            body.angle = position.a;
            body.linear_velocity = velocity.v;
            body.angular_velocity = velocity.w;
            body.sleep_time = ib.sleep_time;
            body.synchronize_transform();
        }

        for ic in island.contacts {
            if let Some(contact) = self.contacts.contacts.get_mut(ic.key) {
                contact.manifold = ic.manifold;
            }
        }

        for ij in island.joints {
            if let Some(joint) = self.joints.get_mut(ij.handle) {
                joint.kind = ij.joint.kind;
            }
        }

        if island.outcome.sleep {
            for ib in island.bodies.iter().filter(|ib| !ib.anchor) {
                self.bodies[ib.handle].set_awake(false);
            }
        }
    }

    fn check_break(&mut self, handle: JointHandle, inv_dt: f64) {
        let Some(joint) = self.joints.get(handle) else {
            return;
        };
        let Some((force, torque)) = joint.break_load(inv_dt) else {
            return;
        };
        let (body_a, body_b) = (joint.body_a, joint.body_b);
        warn!(joint = ?handle, force, torque, "joint broke");
        self.remove_joint(handle);
        self.events.push(PhysicsEvent::JointBroken {
            joint: handle,
            body_a,
            body_b,
            force,
            torque,
        });
    }

    fn integrate_kinematic(&mut self, dt: f64) {
        for (handle, body) in self.bodies.iter_mut() {
            if body.body_type != BodyType::Kinematic || !body.awake {
                continue;
            }
            let center = body.center + body.linear_velocity * dt;
            let angle = body.angle + dt * body.angular_velocity;
            if !center.is_valid() || !angle.is_finite() {
                error!(body = ?handle, "non-finite kinematic motion, stopping body");
                body.linear_velocity = Vec2::ZERO;
                body.angular_velocity = 0.0;
                self.events.push(PhysicsEvent::NumericalFault { body: handle });
                continue;
            }
            body.center = center;
            body.angle = angle;
            body.synchronize_transform();
        }
    }

    /// Refresh a body's proxies after it moved from `xf1`
    fn synchronize_fixtures(&mut self, handle: BodyHandle, xf1: Transform) {
        let body = &self.bodies[handle];
        let xf2 = body.xf;
        let displacement = xf2.p - xf1.p;
        for &fixture_handle in &body.fixtures {
            let fixture = &mut self.fixtures[fixture_handle];
            let aabb1 = fixture.shape.compute_aabb(&xf1);
            let aabb2 = fixture.shape.compute_aabb(&xf2);
            fixture.aabb = aabb2;
            self.broadphase
                .move_proxy(body.map, fixture.proxy, aabb1.union(&aabb2), displacement);
        }
    }
}

impl fmt::Debug for PhysicsWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PhysicsWorld")
            .field("config", &self.config)
            .field("bodies", &self.bodies.len())
            .field("fixtures", &self.fixtures.len())
            .field("joints", &self.joints.len())
            .field("contacts", &self.contacts.len())
            .field("ticks", &self.ticks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;

    fn world() -> PhysicsWorld {
        PhysicsWorld::new(WorldConfig::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = WorldConfig::default().with_timestep(0.0);
        assert!(matches!(
            PhysicsWorld::new(config),
            Err(PhysicsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_stale_handles_are_rejected() {
        let mut world = world();
        let body = world.create_body(BodyDef::dynamic(Vec2::ZERO)).unwrap();
        world.destroy_body(body).unwrap();

        let err = world.body(body).unwrap_err();
        assert!(matches!(err, PhysicsError::InvalidHandle { kind: "body", .. }));
        assert!(world.set_linear_velocity(body, Vec2::new(1.0, 0.0)).is_err());
        assert!(world.destroy_body(body).is_err());
    }

    #[test]
    fn test_fixture_updates_mass() {
        let mut world = world();
        let body = world.create_body(BodyDef::dynamic(Vec2::ZERO)).unwrap();
        world
            .create_fixture(body, FixtureDef::new(Shape::cuboid(1.0, 0.5).unwrap()).with_density(2.0))
            .unwrap();
        assert!((world.body(body).unwrap().mass() - 4.0).abs() < 1e-12);

        let fixture = world.body(body).unwrap().fixtures()[0];
        world.destroy_fixture(fixture).unwrap();
        assert_eq!(world.body(body).unwrap().mass(), 1.0);
        assert!(world.fixture(fixture).is_err());
    }

    #[test]
    fn test_rejects_non_finite_input() {
        let mut world = world();
        let body = world.create_body(BodyDef::dynamic(Vec2::ZERO)).unwrap();
        assert!(world.apply_force(body, Vec2::new(f64::NAN, 0.0)).is_err());
        assert!(world.set_transform(body, Vec2::new(f64::INFINITY, 0.0), 0.0).is_err());
        assert!(world.set_angular_velocity(body, f64::NAN).is_err());
    }

    #[test]
    fn test_static_bodies_ignore_velocity() {
        let mut world = world();
        let ground = world.create_body(BodyDef::fixed(Vec2::ZERO)).unwrap();
        world.set_linear_velocity(ground, Vec2::new(3.0, 0.0)).unwrap();
        assert_eq!(world.body(ground).unwrap().linear_velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_kinematic_body_moves_at_its_velocity() {
        let mut world = world();
        let platform = world
            .create_body(BodyDef::kinematic(Vec2::ZERO).with_velocity(Vec2::new(1.0, 0.0), 0.0))
            .unwrap();
        for _ in 0..60 {
            world.step();
        }
        let x = world.body(platform).unwrap().position().x;
        assert!((x - 1.0).abs() < 1e-9);
        assert!(world.islands().is_empty());
    }

    #[test]
    fn test_query_and_ray_cast() {
        let mut world = world();
        let ground = world.create_body(BodyDef::fixed(Vec2::ZERO)).unwrap();
        let fixture = world
            .create_fixture(ground, FixtureDef::new(Shape::cuboid(5.0, 0.5).unwrap()))
            .unwrap();

        let hits = world.query_aabb(MapId(0), Aabb::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0)));
        assert_eq!(hits, vec![fixture]);
        assert!(world
            .query_aabb(MapId(1), Aabb::new(Vec2::new(-1.0, -1.0), Vec2::new(1.0, 1.0)))
            .is_empty());

        let hit = world
            .ray_cast(MapId(0), Vec2::new(0.0, 5.0), Vec2::new(0.0, -1.0), 10.0)
            .unwrap();
        assert_eq!(hit.fixture, fixture);
        assert_eq!(hit.body, ground);
        assert!((hit.distance - 4.5).abs() < 1e-9);
        assert!((hit.normal.y - 1.0).abs() < 1e-9);
        assert!(world
            .ray_cast(MapId(0), Vec2::new(0.0, 5.0), Vec2::new(0.0, 1.0), 10.0)
            .is_none());
    }

    #[test]
    fn test_non_finite_solve_is_reported_and_reset() {
        let mut world = world();
        let body = world.create_body(BodyDef::dynamic(Vec2::new(0.0, 3.0))).unwrap();
        world.bodies[body].linear_velocity = Vec2::new(f64::NAN, 0.0);

        world.step();

        let state = world.body(body).unwrap();
        assert_eq!(state.position(), Vec2::new(0.0, 3.0));
        assert_eq!(state.linear_velocity(), Vec2::ZERO);
        assert_eq!(
            world.drain_events(),
            vec![PhysicsEvent::NumericalFault { body }]
        );
    }
}
