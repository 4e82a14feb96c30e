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
//! Joints: constraints between pairs of bodies
//!
//! The joint family is closed ([`JointKind`]). Every kind follows the same
//! three-phase protocol as contacts: initialise velocity constraints (and
//! warm start), iterate velocity constraints, then iterate position
//! constraints. Solvers run on per-island copies of body state addressed
//! by island-local indices held in [`SolverBodies`].
//!
//! A joint may carry a break threshold. After each step the world compares
//! the joint's reaction force and torque against it and removes joints
//! that exceed either.

mod distance;
mod revolute;
mod weld;

pub use distance::{DistanceJoint, DistanceJointDef};
pub use revolute::{RevoluteJoint, RevoluteJointDef};
pub use weld::{WeldJoint, WeldJointDef};

use crate::arena::{BodyHandle, JointHandle};
use crate::error::{PhysicsError, Result};
use crate::graph::{EdgeOwner, GraphEdge};
use crate::math::Vec2;
use crate::solver::SolverData;

/// Kind-specific joint parameters
#[derive(Debug, Clone, PartialEq)]
pub enum JointParams {
    /// Keep two anchor points at a fixed distance
    Distance(DistanceJointDef),
    /// Pin two bodies together at a point, optionally limited and motorised
    Revolute(RevoluteJointDef),
    /// Glue two bodies together
    Weld(WeldJointDef),
}

/// Joint type discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    /// [`DistanceJoint`]
    Distance,
    /// [`RevoluteJoint`]
    Revolute,
    /// [`WeldJoint`]
    Weld,
}

/// Parameters for creating a joint
#[derive(Debug, Clone, PartialEq)]
pub struct JointDef {
    /// First body
    pub body_a: BodyHandle,
    /// Second body
    pub body_b: BodyHandle,
    /// Let the two bodies keep colliding with each other
    pub collide_connected: bool,
    /// Break when the reaction force exceeds this many newtons
    pub max_force: Option<f64>,
    /// Break when the reaction torque exceeds this many newton-metres
    pub max_torque: Option<f64>,
    /// Kind-specific parameters
    pub params: JointParams,
}

impl JointDef {
    /// Joint between two bodies with no break threshold
    pub fn new(body_a: BodyHandle, body_b: BodyHandle, params: JointParams) -> Self {
        JointDef {
            body_a,
            body_b,
            collide_connected: false,
            max_force: None,
            max_torque: None,
            params,
        }
    }

    /// Let the connected bodies collide
    pub fn with_collide_connected(mut self, collide: bool) -> Self {
        self.collide_connected = collide;
        self
    }

    /// Break above this reaction force
    pub fn with_max_force(mut self, force: f64) -> Self {
        self.max_force = Some(force);
        self
    }

    /// Break above this reaction torque
    pub fn with_max_torque(mut self, torque: f64) -> Self {
        self.max_torque = Some(torque);
        self
    }

    /// Check the definition without looking at the bodies
    pub fn validate(&self) -> Result<()> {
        if self.body_a == self.body_b {
            return Err(PhysicsError::InvalidJoint(format!(
                "joint connects {:?} to itself",
                self.body_a
            )));
        }
        for (name, threshold) in [("max force", self.max_force), ("max torque", self.max_torque)] {
            if let Some(value) = threshold {
                if !value.is_finite() || value <= 0.0 {
                    return Err(PhysicsError::InvalidJoint(format!(
                        "{} {} must be positive and finite",
                        name, value
                    )));
                }
            }
        }
        match &self.params {
            JointParams::Distance(def) => def.validate(),
            JointParams::Revolute(def) => def.validate(),
            JointParams::Weld(def) => def.validate(),
        }
    }
}

/// Solver state of a joint's kind
#[derive(Debug, Clone, PartialEq)]
pub enum JointKind {
    /// Distance constraint
    Distance(DistanceJoint),
    /// Revolute constraint
    Revolute(RevoluteJoint),
    /// Weld constraint
    Weld(WeldJoint),
}

/// Island-local indices and mass properties of a joint's two bodies
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct SolverBodies {
    pub index_a: usize,
    pub index_b: usize,
    pub local_center_a: Vec2,
    pub local_center_b: Vec2,
    pub inv_mass_a: f64,
    pub inv_mass_b: f64,
    pub inv_i_a: f64,
    pub inv_i_b: f64,
}

/// A constraint between two bodies
#[derive(Debug, Clone)]
pub struct Joint {
    pub(crate) body_a: BodyHandle,
    pub(crate) body_b: BodyHandle,
    pub(crate) collide_connected: bool,
    pub(crate) max_force: Option<f64>,
    pub(crate) max_torque: Option<f64>,
    pub(crate) kind: JointKind,
    pub(crate) edges: [GraphEdge<JointHandle>; 2],
}

impl Joint {
    pub(crate) fn new(def: &JointDef) -> Joint {
        let kind = match &def.params {
            JointParams::Distance(d) => JointKind::Distance(DistanceJoint::new(d)),
            JointParams::Revolute(d) => JointKind::Revolute(RevoluteJoint::new(d)),
            JointParams::Weld(d) => JointKind::Weld(WeldJoint::new(d)),
        };
        Joint {
            body_a: def.body_a,
            body_b: def.body_b,
            collide_connected: def.collide_connected,
            max_force: def.max_force,
            max_torque: def.max_torque,
            kind,
            edges: [GraphEdge::new(def.body_b), GraphEdge::new(def.body_a)],
        }
    }

    /// First body
    pub fn body_a(&self) -> BodyHandle {
        self.body_a
    }

    /// Second body
    pub fn body_b(&self) -> BodyHandle {
        self.body_b
    }

    /// Kind discriminant
    pub fn joint_type(&self) -> JointType {
        match self.kind {
            JointKind::Distance(_) => JointType::Distance,
            JointKind::Revolute(_) => JointType::Revolute,
            JointKind::Weld(_) => JointType::Weld,
        }
    }

    /// Kind-specific state
    pub fn kind(&self) -> &JointKind {
        &self.kind
    }

    /// Whether the connected bodies still collide
    pub fn collide_connected(&self) -> bool {
        self.collide_connected
    }

    /// Break thresholds
    pub fn break_thresholds(&self) -> (Option<f64>, Option<f64>) {
        (self.max_force, self.max_torque)
    }

    /// Reaction force on body B at the anchor, in newtons
    pub fn reaction_force(&self, inv_dt: f64) -> Vec2 {
        match &self.kind {
            JointKind::Distance(j) => j.reaction_force(inv_dt),
            JointKind::Revolute(j) => j.reaction_force(inv_dt),
            JointKind::Weld(j) => j.reaction_force(inv_dt),
        }
    }

    /// Reaction torque on body B, in newton-metres
    pub fn reaction_torque(&self, inv_dt: f64) -> f64 {
        match &self.kind {
            JointKind::Distance(_) => 0.0,
            JointKind::Revolute(j) => j.reaction_torque(inv_dt),
            JointKind::Weld(j) => j.reaction_torque(inv_dt),
        }
    }

    /// Reaction force and torque magnitudes if either exceeds its threshold
    pub(crate) fn break_load(&self, inv_dt: f64) -> Option<(f64, f64)> {
        let force = self.reaction_force(inv_dt).length();
        let torque = self.reaction_torque(inv_dt).abs();
        let over_force = self.max_force.map_or(false, |max| force > max);
        let over_torque = self.max_torque.map_or(false, |max| torque > max);
        if over_force || over_torque {
            Some((force, torque))
        } else {
            None
        }
    }

    pub(crate) fn init_velocity_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) {
        match &mut self.kind {
            JointKind::Distance(j) => j.init_velocity_constraints(sb, data),
            JointKind::Revolute(j) => j.init_velocity_constraints(sb, data),
            JointKind::Weld(j) => j.init_velocity_constraints(sb, data),
        }
    }

    pub(crate) fn solve_velocity_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) {
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_velocity_constraints(sb, data),
            JointKind::Revolute(j) => j.solve_velocity_constraints(sb, data),
            JointKind::Weld(j) => j.solve_velocity_constraints(sb, data),
        }
    }

    /// Returns whether the position error is within tolerance
    pub(crate) fn solve_position_constraints(&mut self, sb: &SolverBodies, data: &mut SolverData) -> bool {
        match &mut self.kind {
            JointKind::Distance(j) => j.solve_position_constraints(sb, data),
            JointKind::Revolute(j) => j.solve_position_constraints(sb, data),
            JointKind::Weld(j) => j.solve_position_constraints(sb, data),
        }
    }
}

impl EdgeOwner<JointHandle> for Joint {
    fn edge(&self, side: usize) -> &GraphEdge<JointHandle> {
        &self.edges[side]
    }

    fn edge_mut(&mut self, side: usize) -> &mut GraphEdge<JointHandle> {
        &mut self.edges[side]
    }
}

/// Spring softness parameters `(gamma, bias)` for an effective mass, a
/// position error and a timestep
///
/// Returns zeros when the spring is disabled (`frequency_hz == 0`).
pub(crate) fn soft_constraint(
    mass: f64,
    error: f64,
    frequency_hz: f64,
    damping_ratio: f64,
    dt: f64,
) -> (f64, f64) {
    if frequency_hz <= 0.0 {
        return (0.0, 0.0);
    }
    let omega = 2.0 * std::f64::consts::PI * frequency_hz;
    let d = 2.0 * mass * damping_ratio * omega;
    let k = mass * omega * omega;
    let mut gamma = dt * (d + dt * k);
    if gamma != 0.0 {
        gamma = 1.0 / gamma;
    }
    (gamma, error * dt * k * gamma)
}

fn check_spring(frequency_hz: f64, damping_ratio: f64) -> Result<()> {
    if !frequency_hz.is_finite() || frequency_hz < 0.0 {
        return Err(PhysicsError::InvalidJoint(format!(
            "frequency {} must be finite and non-negative",
            frequency_hz
        )));
    }
    if !damping_ratio.is_finite() || damping_ratio < 0.0 {
        return Err(PhysicsError::InvalidJoint(format!(
            "damping ratio {} must be finite and non-negative",
            damping_ratio
        )));
    }
    Ok(())
}

fn check_anchor(name: &str, anchor: Vec2) -> Result<()> {
    if anchor.is_valid() {
        Ok(())
    } else {
        Err(PhysicsError::InvalidJoint(format!("{} must be finite", name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;

    fn two_bodies() -> (BodyHandle, BodyHandle) {
        let mut arena: Arena<BodyHandle, ()> = Arena::new();
        (arena.insert(()), arena.insert(()))
    }

    #[test]
    fn test_joint_def_validation() {
        let (a, b) = two_bodies();
        let params = JointParams::Distance(DistanceJointDef {
            local_anchor_a: Vec2::ZERO,
            local_anchor_b: Vec2::ZERO,
            length: 1.0,
            frequency_hz: 0.0,
            damping_ratio: 0.0,
        });
        assert!(JointDef::new(a, b, params.clone()).validate().is_ok());
        assert!(JointDef::new(a, a, params.clone()).validate().is_err());
        assert!(JointDef::new(a, b, params.clone())
            .with_max_force(-1.0)
            .validate()
            .is_err());
        assert!(JointDef::new(a, b, params).with_max_torque(f64::NAN).validate().is_err());
    }

    #[test]
    fn test_break_load_thresholds() {
        let (a, b) = two_bodies();
        let def = JointDef::new(
            a,
            b,
            JointParams::Weld(WeldJointDef {
                local_anchor_a: Vec2::ZERO,
                local_anchor_b: Vec2::ZERO,
                reference_angle: 0.0,
                frequency_hz: 0.0,
                damping_ratio: 0.0,
            }),
        )
        .with_max_force(10.0);
        let mut joint = Joint::new(&def);
        assert!(joint.break_load(60.0).is_none());

        if let JointKind::Weld(w) = &mut joint.kind {
            w.set_accumulated_impulse(crate::math::Vec3::new(0.2, 0.0, 0.0));
        }
        // 0.2 N*s over 1/60 s is 12 N
        let (force, _) = joint.break_load(60.0).unwrap();
        assert!((force - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_soft_constraint_disabled_without_frequency() {
        assert_eq!(soft_constraint(1.0, 0.5, 0.0, 0.7, 1.0 / 60.0), (0.0, 0.0));
        let (gamma, bias) = soft_constraint(1.0, 0.5, 4.0, 0.7, 1.0 / 60.0);
        assert!(gamma > 0.0 && bias > 0.0);
    }
}
