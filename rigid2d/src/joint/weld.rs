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
//! Weld joint
//!
//! Removes all relative motion between two bodies. A positive frequency
//! softens the angular part into a damped spring.

use super::{check_anchor, check_spring, soft_constraint, SolverBodies};
use crate::body::Body;
use crate::config::settings::{ANGULAR_SLOP, LINEAR_SLOP};
use crate::error::{PhysicsError, Result};
use crate::math::{Mat33, Rot, Vec2, Vec3};
use crate::solver::SolverData;

/// Parameters of a [`WeldJoint`]
#[derive(Debug, Clone, PartialEq)]
pub struct WeldJointDef {
    /// Anchor on body A in its local frame
    pub local_anchor_a: Vec2,
    /// Anchor on body B in its local frame
    pub local_anchor_b: Vec2,
    /// `angle_b - angle_a` to hold
    pub reference_angle: f64,
    /// Angular spring frequency in hertz, 0 for rigid
    pub frequency_hz: f64,
    /// Angular spring damping ratio
    pub damping_ratio: f64,
}

impl WeldJointDef {
    /// Weld at a world anchor, freezing the current relative angle
    pub fn new(body_a: &Body, body_b: &Body, anchor: Vec2) -> Self {
        WeldJointDef {
            local_anchor_a: body_a.local_point(anchor),
            local_anchor_b: body_b.local_point(anchor),
            reference_angle: body_b.angle() - body_a.angle(),
            frequency_hz: 0.0,
            damping_ratio: 0.0,
        }
    }

    /// Soften the angular constraint
    pub fn with_spring(mut self, frequency_hz: f64, damping_ratio: f64) -> Self {
        self.frequency_hz = frequency_hz;
        self.damping_ratio = damping_ratio;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_anchor("weld joint anchor A", self.local_anchor_a)?;
        check_anchor("weld joint anchor B", self.local_anchor_b)?;
        if !self.reference_angle.is_finite() {
            return Err(PhysicsError::InvalidJoint("reference angle must be finite".into()));
        }
        check_spring(self.frequency_hz, self.damping_ratio)
    }
}

/// Solver state of a weld joint
#[derive(Debug, Clone, PartialEq)]
pub struct WeldJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    reference_angle: f64,
    frequency_hz: f64,
    damping_ratio: f64,

    impulse: Vec3,
    gamma: f64,
    bias: f64,
    r_a: Vec2,
    r_b: Vec2,
    mass: Mat33,
}

impl WeldJoint {
    pub(crate) fn new(def: &WeldJointDef) -> Self {
        WeldJoint {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            frequency_hz: def.frequency_hz,
            damping_ratio: def.damping_ratio,
            impulse: Vec3::default(),
            gamma: 0.0,
            bias: 0.0,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            mass: Mat33::default(),
        }
    }

    /// Local anchors on A and B
    pub fn local_anchors(&self) -> (Vec2, Vec2) {
        (self.local_anchor_a, self.local_anchor_b)
    }

    /// Reference angle
    pub fn reference_angle(&self) -> f64 {
        self.reference_angle
    }

    #[cfg(test)]
    pub(crate) fn set_accumulated_impulse(&mut self, impulse: Vec3) {
        self.impulse = impulse;
    }

    pub(crate) fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        Vec2::new(self.impulse.x, self.impulse.y) * inv_dt
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f64) -> f64 {
        inv_dt * self.impulse.z
    }

    fn effective_mass(sb: &SolverBodies, r_a: Vec2, r_b: Vec2) -> Mat33 {
        let (m_a, m_b, i_a, i_b) = (sb.inv_mass_a, sb.inv_mass_b, sb.inv_i_a, sb.inv_i_b);
        let mut k = Mat33::default();
        k.ex.x = m_a + m_b + r_a.y * r_a.y * i_a + r_b.y * r_b.y * i_b;
        k.ey.x = -r_a.y * r_a.x * i_a - r_b.y * r_b.x * i_b;
        k.ez.x = -r_a.y * i_a - r_b.y * i_b;
        k.ex.y = k.ey.x;
        k.ey.y = m_a + m_b + r_a.x * r_a.x * i_a + r_b.x * r_b.x * i_b;
        k.ez.y = r_a.x * i_a + r_b.x * i_b;
        k.ex.z = k.ez.x;
        k.ey.z = k.ez.y;
        k.ez.z = i_a + i_b;
        k
    }

    pub(crate) fn init_velocity_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) {
        let a_a = data.positions[sb.index_a].a;
        let a_b = data.positions[sb.index_b].a;
        let (mut v_a, mut w_a) = (data.velocities[sb.index_a].v, data.velocities[sb.index_a].w);
        let (mut v_b, mut w_b) = (data.velocities[sb.index_b].v, data.velocities[sb.index_b].w);
        let (i_a, i_b) = (sb.inv_i_a, sb.inv_i_b);

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        self.r_a = q_a.apply(self.local_anchor_a - sb.local_center_a);
        self.r_b = q_b.apply(self.local_anchor_b - sb.local_center_b);

        let k = Self::effective_mass(sb, self.r_a, self.r_b);

        if self.frequency_hz > 0.0 {
            self.mass = k.inverse22();

            let mut inv_m = i_a + i_b;
            let m = if inv_m > 0.0 { 1.0 / inv_m } else { 0.0 };
            let c = a_b - a_a - self.reference_angle;
            let (gamma, bias) =
                soft_constraint(m, c, self.frequency_hz, self.damping_ratio, data.step.dt);
            self.gamma = gamma;
            self.bias = bias;

            inv_m += self.gamma;
            self.mass.ez.z = if inv_m != 0.0 { 1.0 / inv_m } else { 0.0 };
        } else if k.ez.z == 0.0 {
            self.mass = k.inverse22();
            self.gamma = 0.0;
            self.bias = 0.0;
        } else {
            self.mass = k.sym_inverse33();
            self.gamma = 0.0;
            self.bias = 0.0;
        }

        if data.step.warm_starting {
            self.impulse = Vec3::new(
                self.impulse.x * data.step.dt_ratio,
                self.impulse.y * data.step.dt_ratio,
                self.impulse.z * data.step.dt_ratio,
            );
            let p = Vec2::new(self.impulse.x, self.impulse.y);
            v_a -= p * sb.inv_mass_a;
            w_a -= i_a * (self.r_a.cross(p) + self.impulse.z);
            v_b += p * sb.inv_mass_b;
            w_b += i_b * (self.r_b.cross(p) + self.impulse.z);
        } else {
            self.impulse = Vec3::default();
        }

        data.velocities[sb.index_a].v = v_a;
        data.velocities[sb.index_a].w = w_a;
        data.velocities[sb.index_b].v = v_b;
        data.velocities[sb.index_b].w = w_b;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) {
        let (mut v_a, mut w_a) = (data.velocities[sb.index_a].v, data.velocities[sb.index_a].w);
        let (mut v_b, mut w_b) = (data.velocities[sb.index_b].v, data.velocities[sb.index_b].w);
        let (m_a, m_b, i_a, i_b) = (sb.inv_mass_a, sb.inv_mass_b, sb.inv_i_a, sb.inv_i_b);

        if self.frequency_hz > 0.0 {
            let cdot2 = w_b - w_a;
            let impulse2 = -self.mass.ez.z * (cdot2 + self.bias + self.gamma * self.impulse.z);
            self.impulse.z += impulse2;
            w_a -= i_a * impulse2;
            w_b += i_b * impulse2;

            let cdot1 =
                v_b + Vec2::scalar_cross(w_b, self.r_b) - v_a - Vec2::scalar_cross(w_a, self.r_a);
            let impulse1 = -self.mass.mul22(cdot1);
            self.impulse.x += impulse1.x;
            self.impulse.y += impulse1.y;

            v_a -= impulse1 * m_a;
            w_a -= i_a * self.r_a.cross(impulse1);
            v_b += impulse1 * m_b;
            w_b += i_b * self.r_b.cross(impulse1);
        } else {
            let cdot1 =
                v_b + Vec2::scalar_cross(w_b, self.r_b) - v_a - Vec2::scalar_cross(w_a, self.r_a);
            let cdot2 = w_b - w_a;
            let impulse = -self.mass.mul(Vec3::new(cdot1.x, cdot1.y, cdot2));
            self.impulse += impulse;

            let p = Vec2::new(impulse.x, impulse.y);
            v_a -= p * m_a;
            w_a -= i_a * (self.r_a.cross(p) + impulse.z);
            v_b += p * m_b;
            w_b += i_b * (self.r_b.cross(p) + impulse.z);
        }

        data.velocities[sb.index_a].v = v_a;
        data.velocities[sb.index_a].w = w_a;
        data.velocities[sb.index_b].v = v_b;
        data.velocities[sb.index_b].w = w_b;
    }

    pub(crate) fn solve_position_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) -> bool {
        let (mut c_a, mut a_a) = (data.positions[sb.index_a].c, data.positions[sb.index_a].a);
        let (mut c_b, mut a_b) = (data.positions[sb.index_b].c, data.positions[sb.index_b].a);
        let (m_a, m_b, i_a, i_b) = (sb.inv_mass_a, sb.inv_mass_b, sb.inv_i_a, sb.inv_i_b);

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        let r_a = q_a.apply(self.local_anchor_a - sb.local_center_a);
        let r_b = q_b.apply(self.local_anchor_b - sb.local_center_b);

        let k = Self::effective_mass(sb, r_a, r_b);
        let c1 = c_b + r_b - c_a - r_a;
        let position_error = c1.length();
        let angular_error;

        if self.frequency_hz > 0.0 {
            angular_error = 0.0;
            let p = -k.solve22(c1);
            c_a -= p * m_a;
            a_a -= i_a * r_a.cross(p);
            c_b += p * m_b;
            a_b += i_b * r_b.cross(p);
        } else {
            let c2 = a_b - a_a - self.reference_angle;
            angular_error = c2.abs();

            let impulse = if k.ez.z > 0.0 {
                -k.solve33(Vec3::new(c1.x, c1.y, c2))
            } else {
                let impulse2 = -k.solve22(c1);
                Vec3::new(impulse2.x, impulse2.y, 0.0)
            };

            let p = Vec2::new(impulse.x, impulse.y);
            c_a -= p * m_a;
            a_a -= i_a * (r_a.cross(p) + impulse.z);
            c_b += p * m_b;
            a_b += i_b * (r_b.cross(p) + impulse.z);
        }

        data.positions[sb.index_a].c = c_a;
        data.positions[sb.index_a].a = a_a;
        data.positions[sb.index_b].c = c_b;
        data.positions[sb.index_b].a = a_b;

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}
