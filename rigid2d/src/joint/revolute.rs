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
//! Revolute joint
//!
//! Pins an anchor point on each body together and lets the bodies rotate
//! about it. The relative angle can be limited and driven by a motor with
//! a torque cap.

use super::{check_anchor, SolverBodies};
use crate::body::Body;
use crate::config::settings::{ANGULAR_SLOP, LINEAR_SLOP, MAX_ANGULAR_CORRECTION};
use crate::error::{PhysicsError, Result};
use crate::math::{Mat22, Rot, Vec2};
use crate::solver::SolverData;

/// Parameters of a [`RevoluteJoint`]
#[derive(Debug, Clone, PartialEq)]
pub struct RevoluteJointDef {
    /// Anchor on body A in its local frame
    pub local_anchor_a: Vec2,
    /// Anchor on body B in its local frame
    pub local_anchor_b: Vec2,
    /// `angle_b - angle_a` at which the joint angle reads zero
    pub reference_angle: f64,
    /// Enforce `lower_angle..=upper_angle`
    pub enable_limit: bool,
    /// Lower joint angle in radians
    pub lower_angle: f64,
    /// Upper joint angle in radians
    pub upper_angle: f64,
    /// Drive the joint towards `motor_speed`
    pub enable_motor: bool,
    /// Target relative angular speed
    pub motor_speed: f64,
    /// Torque available to the motor
    pub max_motor_torque: f64,
}

impl RevoluteJointDef {
    /// Hinge at a world anchor, using the current relative angle as
    /// reference
    pub fn new(body_a: &Body, body_b: &Body, anchor: Vec2) -> Self {
        RevoluteJointDef {
            local_anchor_a: body_a.local_point(anchor),
            local_anchor_b: body_b.local_point(anchor),
            reference_angle: body_b.angle() - body_a.angle(),
            enable_limit: false,
            lower_angle: 0.0,
            upper_angle: 0.0,
            enable_motor: false,
            motor_speed: 0.0,
            max_motor_torque: 0.0,
        }
    }

    /// Restrict the joint angle
    pub fn with_limit(mut self, lower: f64, upper: f64) -> Self {
        self.enable_limit = true;
        self.lower_angle = lower;
        self.upper_angle = upper;
        self
    }

    /// Add a motor
    pub fn with_motor(mut self, speed: f64, max_torque: f64) -> Self {
        self.enable_motor = true;
        self.motor_speed = speed;
        self.max_motor_torque = max_torque;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        check_anchor("revolute joint anchor A", self.local_anchor_a)?;
        check_anchor("revolute joint anchor B", self.local_anchor_b)?;
        if !self.reference_angle.is_finite() {
            return Err(PhysicsError::InvalidJoint("reference angle must be finite".into()));
        }
        if self.enable_limit
            && !(self.lower_angle.is_finite()
                && self.upper_angle.is_finite()
                && self.lower_angle <= self.upper_angle)
        {
            return Err(PhysicsError::InvalidJoint(format!(
                "revolute limit [{}, {}] must be finite and ordered",
                self.lower_angle, self.upper_angle
            )));
        }
        if self.enable_motor
            && !(self.motor_speed.is_finite()
                && self.max_motor_torque.is_finite()
                && self.max_motor_torque >= 0.0)
        {
            return Err(PhysicsError::InvalidJoint(
                "motor speed and torque must be finite, torque non-negative".into(),
            ));
        }
        Ok(())
    }
}

/// Solver state of a revolute joint
#[derive(Debug, Clone, PartialEq)]
pub struct RevoluteJoint {
    local_anchor_a: Vec2,
    local_anchor_b: Vec2,
    reference_angle: f64,
    enable_limit: bool,
    lower_angle: f64,
    upper_angle: f64,
    enable_motor: bool,
    motor_speed: f64,
    max_motor_torque: f64,

    impulse: Vec2,
    motor_impulse: f64,
    lower_impulse: f64,
    upper_impulse: f64,
    r_a: Vec2,
    r_b: Vec2,
    k: Mat22,
    angle: f64,
    axial_mass: f64,
}

impl RevoluteJoint {
    pub(crate) fn new(def: &RevoluteJointDef) -> Self {
        RevoluteJoint {
            local_anchor_a: def.local_anchor_a,
            local_anchor_b: def.local_anchor_b,
            reference_angle: def.reference_angle,
            enable_limit: def.enable_limit,
            lower_angle: def.lower_angle,
            upper_angle: def.upper_angle,
            enable_motor: def.enable_motor,
            motor_speed: def.motor_speed,
            max_motor_torque: def.max_motor_torque,
            impulse: Vec2::ZERO,
            motor_impulse: 0.0,
            lower_impulse: 0.0,
            upper_impulse: 0.0,
            r_a: Vec2::ZERO,
            r_b: Vec2::ZERO,
            k: Mat22::default(),
            angle: 0.0,
            axial_mass: 0.0,
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

    /// Joint angle as of the last velocity initialisation
    pub fn joint_angle(&self) -> f64 {
        self.angle
    }

    /// Angle limits if enabled
    pub fn limits(&self) -> Option<(f64, f64)> {
        self.enable_limit.then_some((self.lower_angle, self.upper_angle))
    }

    /// Accumulated motor impulse
    pub fn motor_impulse(&self) -> f64 {
        self.motor_impulse
    }

    pub(crate) fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        self.impulse * inv_dt
    }

    pub(crate) fn reaction_torque(&self, inv_dt: f64) -> f64 {
        inv_dt * (self.motor_impulse + self.lower_impulse - self.upper_impulse)
    }

    fn point_mass(sb: &SolverBodies, r_a: Vec2, r_b: Vec2) -> Mat22 {
        let (m_a, m_b, i_a, i_b) = (sb.inv_mass_a, sb.inv_mass_b, sb.inv_i_a, sb.inv_i_b);
        let off = -r_a.y * r_a.x * i_a - r_b.y * r_b.x * i_b;
        Mat22::new(
            Vec2::new(m_a + m_b + r_a.y * r_a.y * i_a + r_b.y * r_b.y * i_b, off),
            Vec2::new(off, m_a + m_b + r_a.x * r_a.x * i_a + r_b.x * r_b.x * i_b),
        )
    }

    pub(crate) fn init_velocity_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) {
        let a_a = data.positions[sb.index_a].a;
        let a_b = data.positions[sb.index_b].a;
        let (mut v_a, mut w_a) = (data.velocities[sb.index_a].v, data.velocities[sb.index_a].w);
        let (mut v_b, mut w_b) = (data.velocities[sb.index_b].v, data.velocities[sb.index_b].w);

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        self.r_a = q_a.apply(self.local_anchor_a - sb.local_center_a);
        self.r_b = q_b.apply(self.local_anchor_b - sb.local_center_b);
        self.k = Self::point_mass(sb, self.r_a, self.r_b);

        let axial = sb.inv_i_a + sb.inv_i_b;
        let fixed_rotation = axial == 0.0;
        self.axial_mass = if axial > 0.0 { 1.0 / axial } else { 0.0 };
        self.angle = a_b - a_a - self.reference_angle;

        if !self.enable_motor || fixed_rotation {
            self.motor_impulse = 0.0;
        }
        if !self.enable_limit || fixed_rotation {
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        if data.step.warm_starting {
            let ratio = data.step.dt_ratio;
            self.impulse *= ratio;
            self.motor_impulse *= ratio;
            self.lower_impulse *= ratio;
            self.upper_impulse *= ratio;

            let axial_impulse = self.motor_impulse + self.lower_impulse - self.upper_impulse;
            let p = self.impulse;
            v_a -= p * sb.inv_mass_a;
            w_a -= sb.inv_i_a * (self.r_a.cross(p) + axial_impulse);
            v_b += p * sb.inv_mass_b;
            w_b += sb.inv_i_b * (self.r_b.cross(p) + axial_impulse);
        } else {
            self.impulse = Vec2::ZERO;
            self.motor_impulse = 0.0;
            self.lower_impulse = 0.0;
            self.upper_impulse = 0.0;
        }

        data.velocities[sb.index_a].v = v_a;
        data.velocities[sb.index_a].w = w_a;
        data.velocities[sb.index_b].v = v_b;
        data.velocities[sb.index_b].w = w_b;
    }

    pub(crate) fn solve_velocity_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) {
        let (mut v_a, mut w_a) = (data.velocities[sb.index_a].v, data.velocities[sb.index_a].w);
        let (mut v_b, mut w_b) = (data.velocities[sb.index_b].v, data.velocities[sb.index_b].w);
        let (i_a, i_b) = (sb.inv_i_a, sb.inv_i_b);
        let fixed_rotation = i_a + i_b == 0.0;

        if self.enable_motor && !fixed_rotation {
            let cdot = w_b - w_a - self.motor_speed;
            let impulse = -self.axial_mass * cdot;
            let old = self.motor_impulse;
            let max_impulse = data.step.dt * self.max_motor_torque;
            self.motor_impulse = (old + impulse).clamp(-max_impulse, max_impulse);
            let impulse = self.motor_impulse - old;
            w_a -= i_a * impulse;
            w_b += i_b * impulse;
        }

        if self.enable_limit && !fixed_rotation {
            // Lower limit
            {
                let c = self.angle - self.lower_angle;
                let cdot = w_b - w_a;
                let impulse = -self.axial_mass * (cdot + c.max(0.0) * data.step.inv_dt);
                let new_impulse = (self.lower_impulse + impulse).max(0.0);
                let impulse = new_impulse - self.lower_impulse;
                self.lower_impulse = new_impulse;
                w_a -= i_a * impulse;
                w_b += i_b * impulse;
            }
            // Upper limit, with the sign flipped
            {
                let c = self.upper_angle - self.angle;
                let cdot = w_a - w_b;
                let impulse = -self.axial_mass * (cdot + c.max(0.0) * data.step.inv_dt);
                let new_impulse = (self.upper_impulse + impulse).max(0.0);
                let impulse = new_impulse - self.upper_impulse;
                self.upper_impulse = new_impulse;
                w_a += i_a * impulse;
                w_b -= i_b * impulse;
            }
        }

        // Point constraint
        let cdot = v_b + Vec2::scalar_cross(w_b, self.r_b) - v_a - Vec2::scalar_cross(w_a, self.r_a);
        let impulse = self.k.solve(-cdot);
        self.impulse += impulse;

        v_a -= impulse * sb.inv_mass_a;
        w_a -= i_a * self.r_a.cross(impulse);
        v_b += impulse * sb.inv_mass_b;
        w_b += i_b * self.r_b.cross(impulse);

        data.velocities[sb.index_a].v = v_a;
        data.velocities[sb.index_a].w = w_a;
        data.velocities[sb.index_b].v = v_b;
        data.velocities[sb.index_b].w = w_b;
    }

    pub(crate) fn solve_position_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) -> bool {
        let (mut c_a, mut a_a) = (data.positions[sb.index_a].c, data.positions[sb.index_a].a);
        let (mut c_b, mut a_b) = (data.positions[sb.index_b].c, data.positions[sb.index_b].a);
        let (i_a, i_b) = (sb.inv_i_a, sb.inv_i_b);

        let mut angular_error = 0.0;
        let fixed_rotation = i_a + i_b == 0.0;

        if self.enable_limit && !fixed_rotation {
            let angle = a_b - a_a - self.reference_angle;
            let mut c = 0.0;
            if (self.upper_angle - self.lower_angle).abs() < 2.0 * ANGULAR_SLOP {
                c = (angle - self.lower_angle).clamp(-MAX_ANGULAR_CORRECTION, MAX_ANGULAR_CORRECTION);
            } else if angle <= self.lower_angle {
                c = (angle - self.lower_angle + ANGULAR_SLOP).clamp(-MAX_ANGULAR_CORRECTION, 0.0);
            } else if angle >= self.upper_angle {
                c = (angle - self.upper_angle - ANGULAR_SLOP).clamp(0.0, MAX_ANGULAR_CORRECTION);
            }
            let limit_impulse = -self.axial_mass * c;
            a_a -= i_a * limit_impulse;
            a_b += i_b * limit_impulse;
            angular_error = c.abs();
        }

        let q_a = Rot::new(a_a);
        let q_b = Rot::new(a_b);
        let r_a = q_a.apply(self.local_anchor_a - sb.local_center_a);
        let r_b = q_b.apply(self.local_anchor_b - sb.local_center_b);

        let c = c_b + r_b - c_a - r_a;
        let position_error = c.length();

        let k = Self::point_mass(sb, r_a, r_b);
        let impulse = -k.solve(c);

        c_a -= impulse * sb.inv_mass_a;
        a_a -= i_a * r_a.cross(impulse);
        c_b += impulse * sb.inv_mass_b;
        a_b += i_b * r_b.cross(impulse);

        data.positions[sb.index_a].c = c_a;
        data.positions[sb.index_a].a = a_a;
        data.positions[sb.index_b].c = c_b;
        data.positions[sb.index_b].a = a_b;

        position_error <= LINEAR_SLOP && angular_error <= ANGULAR_SLOP
    }
}
