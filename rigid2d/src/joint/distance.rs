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
//! Distance joint
//!
//! Keeps an anchor on each body a fixed distance apart. With a positive
//! frequency the rod becomes a damped spring.

use super::{check_anchor, check_spring, soft_constraint, SolverBodies};
use crate::body::Body;
use crate::config::settings::{LINEAR_SLOP, MAX_LINEAR_CORRECTION};
use crate::error::{PhysicsError, Result};
use crate::math::{Rot, Vec2};
use crate::solver::SolverData;

/// Parameters of a [`DistanceJoint`]
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceJointDef {
    /// Anchor on body A in its local frame
    pub local_anchor_a: Vec2,
    /// Anchor on body B in its local frame
    pub local_anchor_b: Vec2,
    /// Rest length
    pub length: f64,
    /// Spring frequency in hertz, 0 for a rigid rod
    pub frequency_hz: f64,
    /// Spring damping ratio
    pub damping_ratio: f64,
}

impl DistanceJointDef {
    /// Rigid rod between two world anchors, using the current distance as
    /// rest length
    pub fn new(body_a: &Body, body_b: &Body, anchor_a: Vec2, anchor_b: Vec2) -> Self {
        DistanceJointDef {
            local_anchor_a: body_a.local_point(anchor_a),
            local_anchor_b: body_b.local_point(anchor_b),
            length: anchor_a.distance(anchor_b),
            frequency_hz: 0.0,
            damping_ratio: 0.0,
        }
    }

    /// Make the joint springy
    pub fn with_spring(mut self, frequency_hz: f64, damping_ratio: f64) -> Self {
        self.frequency_hz = frequency_hz;
        self.damping_ratio = damping_ratio;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_anchor("distance joint anchor A", self.local_anchor_a)?;
        check_anchor("distance joint anchor B", self.local_anchor_b)?;
        if !self.length.is_finite() || self.length <= LINEAR_SLOP {
            return Err(PhysicsError::InvalidJoint(format!(
                "distance joint length {} must be finite and longer than the linear slop",
                self.length
            )));
        }
        check_spring(self.frequency_hz, self.damping_ratio)
    }
}

/// Solver state of a distance joint
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    length: f64,
    frequency_hz: f64,
    damping_ratio: f64,

    impulse: f64,
    gamma: f64,
    bias: f64,
    u: Vec2,
    r_a: Vec2,
    r_b: Vec2,
    mass: f64,
}

impl DistanceJoint {
    pub(crate) fn new(def: &DistanceJointDef) -> Self {
        DistanceJoint {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            length: def.length,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: 0.0,
            gamma: 0.0,
            bias: 0.0,
            u: Vec2::ZERO,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            mass: 0.0,
        }
    }

    /// Rest length
    pub fn length(&self) -> f64 {
        self.length
    }

    /// Local anchors on A and B
    pub fn local_anchors(&self) -> (Vec2, Vec2) {
        (self.local_anchor_a, self.local_anchor_b)
    }

    /// Accumulated impulse along the rod
    pub fn impulse(&self) -> f64 {
        self.impulse
    }

    pub(crate) fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        self.u * (inv_dt * self.impulse)
    }

    pub(crate) fn init_velocity_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) {
        let (c_a, a_a) = (data.positions[sb.index_a].c, data.positions[sb.index_a].a);
        let (c_b, a_b) = (data.positions[sb.index_b].c, data.positions[sb.index_b].a);
        let (mut v_a, mut w_a) = (data.velocities[sb.index_a].v, data.velocities[sb.index_a].w);
        let (mut v_b, mut w_b) = (data.velocities[sb.index_b].v, data.velocities[sb.index_b].w);

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        self.r_a = q_a.apply(self.local_anchor_a - sb.local_center_a);
        self.r_b = q_b.apply(self.local_anchor_b - sb.local_center_b);
        self.u = c_b + self.r_b - c_a - self.r_a;

        let length = self.u.length();
        if length > LINEAR_SLOP {
            self.u *= 1.0 / length;
        } else {
            self.u = Vec2::ZERO;
        }

        let cr_a = self.r_a.cross(self.u);
        let cr_b = self.r_b.cross(self.u);
        let mut inv_mass =
            sb.inv_mass_a + sb.inv_i_a * cr_a * cr_a + sb.inv_mass_b + sb.inv_i_b * cr_b * cr_b;
        self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };

        if self.frequency_hz > 0.0 {
            let (gamma, bias) = soft_constraint(
                self.mass,
                length - self.length,
                self.frequency_hz,
                self.damping_ratio,
                data.step.dt,
            );
            self.gamma = gamma;
            self.bias = bias;
            inv_mass += self.gamma;
            self.mass = if inv_mass != 0.0 { 1.0 / inv_mass } else { 0.0 };
        } else {
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if data.step.warm_starting {
            self.impulse *= data.step.dt_ratio;
            let p = self.u * self.impulse;
            v_a -= p * sb.inv_mass_a;
            w_a -= sb.inv_i_a * self.r_a.cross(p);
            v_b += p * sb.inv_mass_b;
            w_b += sb.inv_i_b * self.r_b.cross(p);
        } else {
            self.impulse = 0.0;
        }

        data.velocities[sb.index_a].v = v_a;
        data.velocities[sb.index_a].w = w_a;
        data.velocities[sb.index_b].v = v_b;
        data.velocities[sb.index_b].w = w_b;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) {
        let (mut v_a, mut w_a) = (data.velocities[sb.index_a].v, data.velocities[sb.index_a].w);
        let (mut v_b, mut w_b) = (data.velocities[sb.index_b].v, data.velocities[sb.index_b].w);

        let vp_a = v_a + Vec2::scalar_cross(w_a, self.r_a);
        let vp_b = v_b + Vec2::scalar_cross(w_b, self.r_b);
        let cdot = self.u.dot(vp_b - vp_a);

        let impulse = -self.mass * (cdot + self.bias + self.gamma * self.impulse);
        self.impulse += impulse;

        let p = self.u * impulse;
        v_a -= p * sb.inv_mass_a;
        w_a -= sb.inv_i_a * self.r_a.cross(p);
        v_b += p * sb.inv_mass_b;
        w_b += sb.inv_i_b * self.r_b.cross(p);

        data.velocities[sb.index_a].v = v_a;
        data.velocities[sb.index_a].w = w_a;
        data.velocities[sb.index_b].v = v_b;
        data.velocities[sb.index_b].w = w_b;
    }

    pub(crate) fn solve_position_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) -> bool {
        // Springs are soft by definition
        if self.frequency_hz > 0.0 {
            return true;
        }

        let (mut c_a, mut a_a) = (data.positions[sb.index_a].c, data.positions[sb.index_a].a);
        let (mut c_b, mut a_b) = (data.positions[sb.index_b].c, data.positions[sb.index_b].a);

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        let r_a = q_a.apply(self.local_anchor_a - sb.local_center_a);
        let r_b = q_b.apply(self.local_anchor_b - sb.local_center_b);
        let mut u = c_b + r_b - c_a - r_a;

        let length = u.normalize_mut();
        let c = (length - self.length).clamp(-MAX_LINEAR_CORRECTION, MAX_LINEAR_CORRECTION);

        let impulse = -self.mass * c;
        let p = u * impulse;

        c_a -= p * sb.inv_mass_a;
        a_a -= sb.inv_i_a * r_a.cross(p);
        c_b += p * sb.inv_mass_b;
        a_b += sb.inv_i_b * r_b.cross(p);

        data.positions[sb.index_a].c = c_a;
        data.positions[sb.index_a].a = a_a;
        data.positions[sb.index_b].c = c_b;
        data.positions[sb.index_b].a = a_b;

        c.abs() < LINEAR_SLOP
    }
}
