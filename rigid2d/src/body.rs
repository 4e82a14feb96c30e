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
//! Rigid bodies and the fixtures attached to them

use serde::{Deserialize, Serialize};

use crate::arena::{Arena, BodyHandle, ContactKey, FixtureHandle, JointHandle};
use crate::broadphase::MapId;
use crate::error::{PhysicsError, Result};
use crate::graph::EdgeRef;
use crate::math::{Aabb, Rot, Transform, Vec2};
use crate::shape::{MassData, Shape};
use crate::tree::ProxyId;

/// How a body takes part in the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyType {
    /// Never moves; infinite mass
    #[default]
    Static,
    /// Moved only by its velocity; infinite mass
    Kinematic,
    /// Fully simulated
    Dynamic,
}

/// Host-facing movement status carried for replication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BodyStatus {
    /// Resting on or walking over the ground
    #[default]
    OnGround,
    /// Airborne, thrown or otherwise unsupported
    InAir,
}

/// Parameters for creating a body
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDef {
    /// Simulation type
    pub body_type: BodyType,
    /// World position of the body origin
    pub position: Vec2,
    /// Rotation in radians
    pub angle: f64,
    /// Initial linear velocity of the origin
    pub linear_velocity: Vec2,
    /// Initial angular velocity
    pub angular_velocity: f64,
    /// Linear damping coefficient
    pub linear_damping: f64,
    /// Angular damping coefficient
    pub angular_damping: f64,
    /// Multiplier on world gravity
    pub gravity_scale: f64,
    /// Prevent rotation
    pub fixed_rotation: bool,
    /// Allow this body to fall asleep
    pub sleeping_allowed: bool,
    /// Start awake
    pub awake: bool,
    /// Take part in collisions
    pub can_collide: bool,
    /// Initial replicated status
    pub status: BodyStatus,
    /// Simulation space
    pub map: MapId,
}

impl Default for BodyDef {
    fn default() -> Self {
        BodyDef {
            body_type: BodyType::Static,
            position: Vec2::ZERO,
            angle: 0.0,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            linear_damping: 0.0,
            angular_damping: 0.0,
            gravity_scale: 1.0,
            fixed_rotation: false,
            sleeping_allowed: true,
            awake: true,
            can_collide: true,
            status: BodyStatus::OnGround,
            map: MapId::default(),
        }
    }
}

impl BodyDef {
    /// Definition of a dynamic body at `position`
    pub fn dynamic(position: Vec2) -> Self {
        BodyDef {
            body_type: BodyType::Dynamic,
            position,
            ..Default::default()
        }
    }

    /// Definition of a static body at `position`
    pub fn fixed(position: Vec2) -> Self {
        BodyDef {
            position,
            ..Default::default()
        }
    }

    /// Definition of a kinematic body at `position`
    pub fn kinematic(position: Vec2) -> Self {
        BodyDef {
            body_type: BodyType::Kinematic,
            position,
            ..Default::default()
        }
    }

    /// Set the rotation
    pub fn with_angle(mut self, angle: f64) -> Self {
        self.angle = angle;
        self
    }

    /// Set the initial velocities
    pub fn with_velocity(mut self, linear: Vec2, angular: f64) -> Self {
        self.linear_velocity = linear;
        self.angular_velocity = angular;
        self
    }

    /// Set damping coefficients
    pub fn with_damping(mut self, linear: f64, angular: f64) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }

    /// Set the gravity multiplier
    pub fn with_gravity_scale(mut self, scale: f64) -> Self {
        self.gravity_scale = scale;
        self
    }

    /// Lock rotation
    pub fn with_fixed_rotation(mut self, fixed: bool) -> Self {
        self.fixed_rotation = fixed;
        self
    }

    /// Allow or forbid sleeping
    pub fn with_sleeping_allowed(mut self, allowed: bool) -> Self {
        self.sleeping_allowed = allowed;
        self
    }

    /// Place the body in a map
    pub fn with_map(mut self, map: MapId) -> Self {
        self.map = map;
        self
    }

    /// Reject non-finite or negative parameters
    pub fn validate(&self) -> Result<()> {
        if !self.position.is_valid() || !self.angle.is_finite() {
            return Err(PhysicsError::InvalidConfig(
                "body position and angle must be finite".into(),
            ));
        }
        if !self.linear_velocity.is_valid() || !self.angular_velocity.is_finite() {
            return Err(PhysicsError::InvalidConfig(
                "body velocity must be finite".into(),
            ));
        }
        for (name, value) in [
            ("linear damping", self.linear_damping),
            ("angular damping", self.angular_damping),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PhysicsError::InvalidConfig(format!(
                    "{} {} must be finite and non-negative",
                    name, value
                )));
            }
        }
        if !self.gravity_scale.is_finite() {
            return Err(PhysicsError::InvalidConfig(
                "gravity scale must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// A simulated rigid body
///
/// Bodies are owned by [`crate::world::PhysicsWorld`] and reached through
/// [`BodyHandle`]s. Position is tracked both as the origin
/// transform and as the world centre of mass, which is what the solver
/// integrates.
#[derive(Debug, Clone)]
pub struct Body {
    pub(crate) body_type: BodyType,
    pub(crate) xf: Transform,
    pub(crate) center: Vec2,
    pub(crate) angle: f64,
    pub(crate) local_center: Vec2,
    pub(crate) linear_velocity: Vec2,
    pub(crate) angular_velocity: f64,
    pub(crate) force: Vec2,
    pub(crate) torque: f64,
    pub(crate) mass: f64,
    pub(crate) inv_mass: f64,
    pub(crate) inertia: f64,
    pub(crate) inv_inertia: f64,
    pub(crate) linear_damping: f64,
    pub(crate) angular_damping: f64,
    pub(crate) gravity_scale: f64,
    pub(crate) fixed_rotation: bool,
    pub(crate) sleeping_allowed: bool,
    pub(crate) awake: bool,
    pub(crate) sleep_time: f64,
    pub(crate) can_collide: bool,
    pub(crate) status: BodyStatus,
    pub(crate) map: MapId,
    pub(crate) fixtures: Vec<FixtureHandle>,
    pub(crate) contact_list: Option<EdgeRef<ContactKey>>,
    pub(crate) joint_list: Option<EdgeRef<JointHandle>>,
}

impl Body {
    pub(crate) fn new(def: &BodyDef) -> Body {
        let xf = Transform::new(def.position, def.angle);
        let mut body = Body {
            body_type: def.body_type,
            xf,
            center: def.position,
            angle: def.angle,
            local_center: Vec2::ZERO,
            linear_velocity: Vec2::ZERO,
            angular_velocity: 0.0,
            force: Vec2::ZERO,
            torque: 0.0,
            mass: 0.0,
            inv_mass: 0.0,
            inertia: 0.0,
            inv_inertia: 0.0,
            linear_damping: def.linear_damping,
            angular_damping: def.angular_damping,
            gravity_scale: def.gravity_scale,
            fixed_rotation: def.fixed_rotation,
            sleeping_allowed: def.sleeping_allowed,
            awake: def.awake || def.body_type == BodyType::Static,
            sleep_time: 0.0,
            can_collide: def.can_collide,
            status: def.status,
            map: def.map,
            fixtures: Vec::new(),
            contact_list: None,
            joint_list: None,
        };
        if body.body_type != BodyType::Static {
            body.linear_velocity = def.linear_velocity;
            body.angular_velocity = def.angular_velocity;
        }
        if body.body_type == BodyType::Dynamic {
            // Unit mass until fixtures are attached
            body.mass = 1.0;
            body.inv_mass = 1.0;
            body.inertia = 1.0;
            body.inv_inertia = 1.0;
        }
        body
    }

    /// Simulation type
    pub fn body_type(&self) -> BodyType {
        self.body_type
    }

    /// Transform of the body origin
    pub fn transform(&self) -> Transform {
        self.xf
    }

    /// World position of the body origin
    pub fn position(&self) -> Vec2 {
        self.xf.p
    }

    /// Rotation in radians
    pub fn angle(&self) -> f64 {
        self.angle
    }

    /// World centre of mass
    pub fn world_center(&self) -> Vec2 {
        self.center
    }

    /// Centre of mass in body coordinates
    pub fn local_center(&self) -> Vec2 {
        self.local_center
    }

    /// Linear velocity of the centre of mass
    pub fn linear_velocity(&self) -> Vec2 {
        self.linear_velocity
    }

    /// Angular velocity in radians per second
    pub fn angular_velocity(&self) -> f64 {
        self.angular_velocity
    }

    /// Mass in kilograms, zero for non-dynamic bodies
    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Inverse mass, zero iff the body is not dynamic
    pub fn inv_mass(&self) -> f64 {
        self.inv_mass
    }

    /// Rotational inertia about the body origin
    pub fn inertia(&self) -> f64 {
        self.inertia + self.mass * self.local_center.dot(self.local_center)
    }

    /// Inverse rotational inertia about the centre of mass, zero iff the
    /// body is not dynamic
    pub fn inv_inertia(&self) -> f64 {
        self.inv_inertia
    }

    /// Mass properties about the body origin
    pub fn mass_data(&self) -> MassData {
        MassData {
            mass: self.mass,
            center: self.local_center,
            inertia: self.inertia(),
        }
    }

    /// Whether the body is simulated this tick
    pub fn is_awake(&self) -> bool {
        self.awake
    }

    /// Seconds spent under the sleep tolerances
    pub fn sleep_time(&self) -> f64 {
        self.sleep_time
    }

    /// Whether the body takes part in collisions
    pub fn can_collide(&self) -> bool {
        self.can_collide
    }

    /// Whether rotation is locked
    pub fn fixed_rotation(&self) -> bool {
        self.fixed_rotation
    }

    /// Whether the body may fall asleep
    pub fn sleeping_allowed(&self) -> bool {
        self.sleeping_allowed
    }

    /// Replicated movement status
    pub fn status(&self) -> BodyStatus {
        self.status
    }

    /// Simulation space
    pub fn map(&self) -> MapId {
        self.map
    }

    /// Attached fixtures in attachment order
    pub fn fixtures(&self) -> &[FixtureHandle] {
        &self.fixtures
    }

    /// Accumulated force for the next step
    pub fn force(&self) -> Vec2 {
        self.force
    }

    /// Accumulated torque for the next step
    pub fn torque(&self) -> f64 {
        self.torque
    }

    /// Gravity multiplier
    pub fn gravity_scale(&self) -> f64 {
        self.gravity_scale
    }

    /// Linear and angular damping
    pub fn damping(&self) -> (f64, f64) {
        (self.linear_damping, self.angular_damping)
    }

    /// Velocity of a world point attached to the body
    pub fn linear_velocity_at(&self, world_point: Vec2) -> Vec2 {
        self.linear_velocity + Vec2::scalar_cross(self.angular_velocity, world_point - self.center)
    }

    /// World coordinates of a body-local point
    pub fn world_point(&self, local: Vec2) -> Vec2 {
        self.xf.apply(local)
    }

    /// Body-local coordinates of a world point
    pub fn local_point(&self, world: Vec2) -> Vec2 {
        self.xf.apply_inv(world)
    }

    /// Inverse inertia as seen by the solvers
    pub(crate) fn solver_inv_inertia(&self) -> f64 {
        if self.fixed_rotation {
            0.0
        } else {
            self.inv_inertia
        }
    }

    /// Whether the body participates in solving
    pub(crate) fn is_active(&self) -> bool {
        self.awake && self.body_type != BodyType::Static
    }

    pub(crate) fn set_awake(&mut self, awake: bool) {
        if self.body_type == BodyType::Static {
            return;
        }
        if awake {
            self.awake = true;
            self.sleep_time = 0.0;
        } else {
            self.awake = false;
            self.sleep_time = 0.0;
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.force = Vec2::ZERO;
            self.torque = 0.0;
        }
    }

    /// Recompute the origin transform from the centre of mass and angle
    pub(crate) fn synchronize_transform(&mut self) {
        self.xf.q = Rot::new(self.angle);
        self.xf.p = self.center - self.xf.q.apply(self.local_center);
    }

    /// Place the body origin, keeping the centre of mass consistent
    pub(crate) fn set_transform(&mut self, position: Vec2, angle: f64) {
        self.xf = Transform::new(position, angle);
        self.angle = angle;
        self.center = self.xf.apply(self.local_center);
    }

    /// Change the simulation type, fixing up mass and velocity
    pub(crate) fn set_type(&mut self, body_type: BodyType, fixtures: &Arena<FixtureHandle, Fixture>) {
        self.body_type = body_type;
        self.reset_mass_data(fixtures);
        if body_type == BodyType::Static {
            self.linear_velocity = Vec2::ZERO;
            self.angular_velocity = 0.0;
            self.awake = true;
        }
        self.force = Vec2::ZERO;
        self.torque = 0.0;
        self.sleep_time = 0.0;
    }

    /// Recompute mass, centre and inertia from the attached fixtures
    ///
    /// Non-dynamic bodies get zero mass. A dynamic body whose fixtures have
    /// no area gets unit mass and unit inertia.
    pub(crate) fn reset_mass_data(&mut self, fixtures: &Arena<FixtureHandle, Fixture>) {
        self.mass = 0.0;
        self.inv_mass = 0.0;
        self.inertia = 0.0;
        self.inv_inertia = 0.0;
        self.local_center = Vec2::ZERO;

        if self.body_type != BodyType::Dynamic {
            self.center = self.xf.p;
            return;
        }

        let mut local_center = Vec2::ZERO;
        let mut rotational = 0.0;
        for &handle in &self.fixtures {
            let fixture = &fixtures[handle];
            if fixture.density == 0.0 {
                continue;
            }
            let md = fixture.shape.compute_mass(fixture.density);
            self.mass += md.mass;
            local_center += md.center * md.mass;
            rotational += md.inertia;
        }

        if self.mass > 0.0 {
            self.inv_mass = 1.0 / self.mass;
            local_center *= self.inv_mass;
        } else {
            self.mass = 1.0;
            self.inv_mass = 1.0;
        }

        // Shift to the centre of mass
        rotational -= self.mass * local_center.dot(local_center);
        if rotational > 0.0 {
            self.inertia = rotational;
            self.inv_inertia = 1.0 / rotational;
        } else {
            self.inertia = 1.0;
            self.inv_inertia = 1.0;
        }

        self.move_center(local_center);
    }

    /// Override the mass properties of a dynamic body
    pub(crate) fn set_mass_data(&mut self, data: &MassData) -> Result<()> {
        if self.body_type != BodyType::Dynamic {
            return Ok(());
        }
        if !data.mass.is_finite() || data.mass <= 0.0 {
            return Err(PhysicsError::InvalidMass(format!(
                "mass {} must be positive and finite",
                data.mass
            )));
        }
        if !data.center.is_valid() || !data.inertia.is_finite() {
            return Err(PhysicsError::InvalidMass(
                "centre and inertia must be finite".into(),
            ));
        }
        let about_center = data.inertia - data.mass * data.center.dot(data.center);
        if about_center <= 0.0 {
            return Err(PhysicsError::InvalidMass(format!(
                "inertia {} about the centre of mass must be positive",
                about_center
            )));
        }
        self.mass = data.mass;
        self.inv_mass = 1.0 / data.mass;
        self.inertia = about_center;
        self.inv_inertia = 1.0 / about_center;
        self.move_center(data.center);
        Ok(())
    }

    fn move_center(&mut self, local_center: Vec2) {
        let old_center = self.center;
        self.local_center = local_center;
        self.center = self.xf.apply(local_center);
        // Keep the origin's velocity unchanged
        self.linear_velocity +=
            Vec2::scalar_cross(self.angular_velocity, self.center - old_center);
    }
}

/// Parameters for attaching a fixture to a body
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDef {
    /// Collision shape in body coordinates
    pub shape: Shape,
    /// Mass per unit area
    pub density: f64,
    /// Coulomb friction coefficient
    pub friction: f64,
    /// Bounciness, 0 to 1
    pub restitution: f64,
    /// Layers this fixture is on
    pub layer: u32,
    /// Layers this fixture collides with
    pub mask: u32,
}

impl FixtureDef {
    /// Fixture with default material and filtering
    pub fn new(shape: Shape) -> Self {
        FixtureDef {
            shape,
            density: 1.0,
            friction: 0.2,
            restitution: 0.0,
            layer: 1,
            mask: u32::MAX,
        }
    }

    /// Set the density
    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    /// Set the friction coefficient
    pub fn with_friction(mut self, friction: f64) -> Self {
        self.friction = friction;
        self
    }

    /// Set the restitution
    pub fn with_restitution(mut self, restitution: f64) -> Self {
        self.restitution = restitution;
        self
    }

    /// Set the collision layer and mask bits
    pub fn with_filter(mut self, layer: u32, mask: u32) -> Self {
        self.layer = layer;
        self.mask = mask;
        self
    }

    /// Check shape and material parameters
    pub fn validate(&self) -> Result<()> {
        self.shape.validate()?;
        if !self.density.is_finite() || self.density < 0.0 {
            return Err(PhysicsError::InvalidMass(format!(
                "density {} must be finite and non-negative",
                self.density
            )));
        }
        if !self.friction.is_finite() || self.friction < 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "friction {} must be finite and non-negative",
                self.friction
            )));
        }
        if !self.restitution.is_finite() || self.restitution < 0.0 {
            return Err(PhysicsError::InvalidConfig(format!(
                "restitution {} must be finite and non-negative",
                self.restitution
            )));
        }
        Ok(())
    }
}

/// A shape attached to a body
#[derive(Debug, Clone)]
pub struct Fixture {
    pub(crate) body: BodyHandle,
    pub(crate) shape: Shape,
    pub(crate) density: f64,
    pub(crate) friction: f64,
    pub(crate) restitution: f64,
    pub(crate) layer: u32,
    pub(crate) mask: u32,
    pub(crate) proxy: ProxyId,
    pub(crate) aabb: Aabb,
}

impl Fixture {
    /// Owning body
    pub fn body(&self) -> BodyHandle {
        self.body
    }

    /// Collision shape
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Density
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Friction coefficient
    pub fn friction(&self) -> f64 {
        self.friction
    }

    /// Restitution
    pub fn restitution(&self) -> f64 {
        self.restitution
    }

    /// Collision layer bits
    pub fn layer(&self) -> u32 {
        self.layer
    }

    /// Collision mask bits
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// Tight world AABB as of the last proxy synchronisation
    pub fn aabb(&self) -> Aabb {
        self.aabb
    }

    /// Broadphase proxy
    pub fn proxy(&self) -> ProxyId {
        self.proxy
    }

    /// Whether the layer and mask bits of two fixtures let them collide
    ///
    /// Either fixture's mask accepting the other's layer is enough.
    pub fn filter_accepts(&self, other: &Fixture) -> bool {
        (self.layer & other.mask) != 0 || (other.layer & self.mask) != 0
    }
}
