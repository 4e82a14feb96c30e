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
//! Sequential-impulse contact solver
//!
//! Contact constraints are prepared from the island's manifolds, warm
//! started with the impulses accumulated last tick, relaxed for a number of
//! velocity iterations and finally corrected at the position level with
//! Baumgarte stabilisation.

use super::island::{IslandBody, IslandContact};
use super::{Position, TimeStep, Velocity};
use crate::collision::{ManifoldType, WorldManifold};
use crate::config::settings::{
    BAUMGARTE, LINEAR_SLOP, MAX_CONDITION_NUMBER, MAX_LINEAR_CORRECTION, VELOCITY_THRESHOLD,
};
use crate::math::{Mat22, Rot, Transform, Vec2};

#[derive(Debug, Clone, Copy, Default)]
struct VelocityPoint {
    /// Slot of the manifold point this constraint point was built from
    manifold_index: usize,
    r_a: Vec2,
    r_b: Vec2,
    normal_impulse: f64,
    tangent_impulse: f64,
    normal_mass: f64,
    tangent_mass: f64,
    velocity_bias: f64,
}

#[derive(Debug, Clone)]
struct VelocityConstraint {
    points: [VelocityPoint; 2],
    point_count: usize,
    normal: Vec2,
    normal_mass: Mat22,
    k: Mat22,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f64,
    inv_mass_b: f64,
    inv_i_a: f64,
    inv_i_b: f64,
    friction: f64,
    restitution: f64,
}

#[derive(Debug, Clone)]
struct PositionConstraint {
    local_points: [Vec2; 2],
    point_count: usize,
    local_normal: Vec2,
    local_point: Vec2,
    kind: ManifoldType,
    index_a: usize,
    index_b: usize,
    inv_mass_a: f64,
    inv_mass_b: f64,
    inv_i_a: f64,
    inv_i_b: f64,
    local_center_a: Vec2,
    local_center_b: Vec2,
    radius_a: f64,
    radius_b: f64,
}

/// Contact constraints of one island
#[derive(Debug, Clone, Default)]
pub(crate) struct ContactSolver {
    velocity: Vec<VelocityConstraint>,
    position: Vec<PositionConstraint>,
}

fn transform_at(center: Vec2, angle: f64, local_center: Vec2) -> Transform {
    let q = Rot::new(angle);
    Transform {
        p: center - q.apply(local_center),
        q,
    }
}

impl ContactSolver {
    /// Copy the island's manifolds into solver constraints
    ///
    /// Accumulated impulses are scaled by the timestep ratio when warm
    /// starting and discarded otherwise.
    pub fn new(step: &TimeStep, contacts: &[IslandContact], bodies: &[IslandBody]) -> Self {
        let mut velocity = Vec::with_capacity(contacts.len());
        let mut position = Vec::with_capacity(contacts.len());

        for contact in contacts {
            let manifold = &contact.manifold;
            let body_a = &bodies[contact.index_a];
            let body_b = &bodies[contact.index_b];
            debug_assert!(manifold.point_count > 0);

            let mut vc = VelocityConstraint {
                points: [VelocityPoint::default(); 2],
                point_count: manifold.point_count,
                normal: Vec2::ZERO,
                normal_mass: Mat22::default(),
                k: Mat22::default(),
                index_a: contact.index_a,
                index_b: contact.index_b,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                inv_i_a: body_a.inv_i,
                inv_i_b: body_b.inv_i,
                friction: contact.friction,
                restitution: contact.restitution,
            };
            let mut pc = PositionConstraint {
                local_points: [Vec2::ZERO; 2],
                point_count: manifold.point_count,
                local_normal: manifold.local_normal,
                local_point: manifold.local_point,
                kind: manifold.kind,
                index_a: contact.index_a,
                index_b: contact.index_b,
                inv_mass_a: body_a.inv_mass,
                inv_mass_b: body_b.inv_mass,
                inv_i_a: body_a.inv_i,
                inv_i_b: body_b.inv_i,
                local_center_a: body_a.local_center,
                local_center_b: body_b.local_center,
                radius_a: contact.radius_a,
                radius_b: contact.radius_b,
            };

            for (j, mp) in manifold.active_points().iter().enumerate() {
                let vcp = &mut vc.points[j];
                vcp.manifold_index = j;
                if step.warm_starting {
                    vcp.normal_impulse = step.dt_ratio * mp.normal_impulse;
                    vcp.tangent_impulse = step.dt_ratio * mp.tangent_impulse;
                }
                pc.local_points[j] = mp.local_point;
            }

            velocity.push(vc);
            position.push(pc);
        }

        ContactSolver { velocity, position }
    }

    /// Number of contact constraints
    pub fn len(&self) -> usize {
        self.velocity.len()
    }

    /// Compute anchors, effective masses and restitution bias from the
    /// current positions and velocities
    pub fn initialize_velocity_constraints(
        &mut self,
        contacts: &[IslandContact],
        positions: &[Position],
        velocities: &[Velocity],
    ) {
        for ((vc, pc), contact) in self
            .velocity
            .iter_mut()
            .zip(self.position.iter())
            .zip(contacts.iter())
        {
            let (c_a, a_a) = (positions[vc.index_a].c, positions[vc.index_a].a);
            let (c_b, a_b) = (positions[vc.index_b].c, positions[vc.index_b].a);
            let (v_a, w_a) = (velocities[vc.index_a].v, velocities[vc.index_a].w);
            let (v_b, w_b) = (velocities[vc.index_b].v, velocities[vc.index_b].w);

            let xf_a = transform_at(c_a, a_a, pc.local_center_a);
            let xf_b = transform_at(c_b, a_b, pc.local_center_b);
            let world =
                WorldManifold::new(&contact.manifold, &xf_a, pc.radius_a, &xf_b, pc.radius_b);

            vc.normal = world.normal;
            let (m_a, m_b, i_a, i_b) = (vc.inv_mass_a, vc.inv_mass_b, vc.inv_i_a, vc.inv_i_b);
            let tangent = vc.normal.cross_scalar(1.0);

            for vcp in &mut vc.points[..vc.point_count] {
                let point = world.points[vcp.manifold_index];
                vcp.r_a = point - c_a;
                vcp.r_b = point - c_b;

                let rn_a = vcp.r_a.cross(vc.normal);
                let rn_b = vcp.r_b.cross(vc.normal);
                let k_normal = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                vcp.normal_mass = if k_normal > 0.0 { 1.0 / k_normal } else { 0.0 };

                let rt_a = vcp.r_a.cross(tangent);
                let rt_b = vcp.r_b.cross(tangent);
                let k_tangent = m_a + m_b + i_a * rt_a * rt_a + i_b * rt_b * rt_b;
                vcp.tangent_mass = if k_tangent > 0.0 { 1.0 / k_tangent } else { 0.0 };

                vcp.velocity_bias = 0.0;
                let v_rel = vc.normal.dot(
                    v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                        - v_a
                        - Vec2::scalar_cross(w_a, vcp.r_a),
                );
                if v_rel < -VELOCITY_THRESHOLD {
                    vcp.velocity_bias = -vc.restitution * v_rel;
                }
            }

            if vc.point_count == 2 {
                let p1 = vc.points[0];
                let p2 = vc.points[1];
                let rn1_a = p1.r_a.cross(vc.normal);
                let rn1_b = p1.r_b.cross(vc.normal);
                let rn2_a = p2.r_a.cross(vc.normal);
                let rn2_b = p2.r_b.cross(vc.normal);

                let k11 = m_a + m_b + i_a * rn1_a * rn1_a + i_b * rn1_b * rn1_b;
                let k22 = m_a + m_b + i_a * rn2_a * rn2_a + i_b * rn2_b * rn2_b;
                let k12 = m_a + m_b + i_a * rn1_a * rn2_a + i_b * rn1_b * rn2_b;

                if k11 * k11 < MAX_CONDITION_NUMBER * (k11 * k22 - k12 * k12) {
                    vc.k = Mat22::new(Vec2::new(k11, k12), Vec2::new(k12, k22));
                    vc.normal_mass = vc.k.inverse();
                } else {
                    // Ill-conditioned: keep only the deepest point
                    let (first, second) =
                        (vc.points[0].manifold_index, vc.points[1].manifold_index);
                    if world.separations[second] < world.separations[first] {
                        vc.points.swap(0, 1);
                    }
                    vc.point_count = 1;
                }
            }
        }
    }

    /// Apply last tick's impulses to the velocities
    pub fn warm_start(&self, velocities: &mut [Velocity]) {
        for vc in &self.velocity {
            let (m_a, m_b, i_a, i_b) = (vc.inv_mass_a, vc.inv_mass_b, vc.inv_i_a, vc.inv_i_b);
            let mut v_a = velocities[vc.index_a];
            let mut v_b = velocities[vc.index_b];
            let tangent = vc.normal.cross_scalar(1.0);

            for vcp in &vc.points[..vc.point_count] {
                let p = vc.normal * vcp.normal_impulse + tangent * vcp.tangent_impulse;
                v_a.w -= i_a * vcp.r_a.cross(p);
                v_a.v -= p * m_a;
                v_b.w += i_b * vcp.r_b.cross(p);
                v_b.v += p * m_b;
            }

            velocities[vc.index_a] = v_a;
            velocities[vc.index_b] = v_b;
        }
    }

    /// One relaxation pass over every contact
    pub fn solve_velocity_constraints(&mut self, velocities: &mut [Velocity]) {
        for vc in &mut self.velocity {
            let (m_a, m_b, i_a, i_b) = (vc.inv_mass_a, vc.inv_mass_b, vc.inv_i_a, vc.inv_i_b);
            let Velocity { v: mut v_a, w: mut w_a } = velocities[vc.index_a];
            let Velocity { v: mut v_b, w: mut w_b } = velocities[vc.index_b];

            let normal = vc.normal;
            let tangent = normal.cross_scalar(1.0);
            let friction = vc.friction;

            // Friction first so the normal constraint has the last word
            for vcp in &mut vc.points[..vc.point_count] {
                let dv = v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vcp.r_a);
                let vt = dv.dot(tangent);
                let lambda = vcp.tangent_mass * -vt;

                let max_friction = friction * vcp.normal_impulse;
                let new_impulse = (vcp.tangent_impulse + lambda).clamp(-max_friction, max_friction);
                let lambda = new_impulse - vcp.tangent_impulse;
                vcp.tangent_impulse = new_impulse;

                let p = tangent * lambda;
                v_a -= p * m_a;
                w_a -= i_a * vcp.r_a.cross(p);
                v_b += p * m_b;
                w_b += i_b * vcp.r_b.cross(p);
            }

            if vc.point_count == 1 {
                let vcp = &mut vc.points[0];
                let dv = v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vcp.r_a);
                let vn = dv.dot(normal);
                let lambda = -vcp.normal_mass * (vn - vcp.velocity_bias);

                let new_impulse = (vcp.normal_impulse + lambda).max(0.0);
                let lambda = new_impulse - vcp.normal_impulse;
                vcp.normal_impulse = new_impulse;

                let p = normal * lambda;
                v_a -= p * m_a;
                w_a -= i_a * vcp.r_a.cross(p);
                v_b += p * m_b;
                w_b += i_b * vcp.r_b.cross(p);
            } else {
                let (new_a, new_b) =
                    solve_block(vc, Velocity::new(v_a, w_a), Velocity::new(v_b, w_b));
                v_a = new_a.v;
                w_a = new_a.w;
                v_b = new_b.v;
                w_b = new_b.w;
            }

            velocities[vc.index_a] = Velocity::new(v_a, w_a);
            velocities[vc.index_b] = Velocity::new(v_b, w_b);
        }
    }

    /// Copy accumulated impulses back into the island's manifolds
    pub fn store_impulses(&self, contacts: &mut [IslandContact]) {
        for (vc, contact) in self.velocity.iter().zip(contacts.iter_mut()) {
            let count = contact.manifold.point_count;
            // A point dropped by the conditioning check keeps zero
            for point in &mut contact.manifold.points[..count] {
                point.normal_impulse = 0.0;
                point.tangent_impulse = 0.0;
            }
            for vcp in &vc.points[..vc.point_count] {
                let point = &mut contact.manifold.points[vcp.manifold_index];
                point.normal_impulse = vcp.normal_impulse;
                point.tangent_impulse = vcp.tangent_impulse;
            }
        }
    }

    /// Sum of the normal velocity errors still left after solving
    ///
    /// Each point contributes `max(0, bias - vn)`: how far its approach
    /// speed falls short of the target.
    pub fn velocity_residual(&self, velocities: &[Velocity]) -> f64 {
        let mut residual = 0.0;
        for vc in &self.velocity {
            let Velocity { v: v_a, w: w_a } = velocities[vc.index_a];
            let Velocity { v: v_b, w: w_b } = velocities[vc.index_b];
            for vcp in &vc.points[..vc.point_count] {
                let dv = v_b + Vec2::scalar_cross(w_b, vcp.r_b)
                    - v_a
                    - Vec2::scalar_cross(w_a, vcp.r_a);
                residual += (vcp.velocity_bias - dv.dot(vc.normal)).max(0.0);
            }
        }
        residual
    }

    /// One Baumgarte pass; true once no point penetrates beyond the slop
    pub fn solve_position_constraints(&self, positions: &mut [Position]) -> bool {
        let mut min_separation: f64 = 0.0;

        for pc in &self.position {
            let (m_a, m_b, i_a, i_b) = (pc.inv_mass_a, pc.inv_mass_b, pc.inv_i_a, pc.inv_i_b);
            let Position { c: mut c_a, a: mut a_a } = positions[pc.index_a];
            let Position { c: mut c_b, a: mut a_b } = positions[pc.index_b];

            for j in 0..pc.point_count {
                let xf_a = transform_at(c_a, a_a, pc.local_center_a);
                let xf_b = transform_at(c_b, a_b, pc.local_center_b);
                let (normal, point, separation) = position_manifold(pc, &xf_a, &xf_b, j);

                let r_a = point - c_a;
                let r_b = point - c_b;
                min_separation = min_separation.min(separation);

                let c = (BAUMGARTE * (separation + LINEAR_SLOP)).clamp(-MAX_LINEAR_CORRECTION, 0.0);

                let rn_a = r_a.cross(normal);
                let rn_b = r_b.cross(normal);
                let k = m_a + m_b + i_a * rn_a * rn_a + i_b * rn_b * rn_b;
                let impulse = if k > 0.0 { -c / k } else { 0.0 };

                let p = normal * impulse;
                c_a -= p * m_a;
                a_a -= i_a * r_a.cross(p);
                c_b += p * m_b;
                a_b += i_b * r_b.cross(p);
            }

            positions[pc.index_a] = Position::new(c_a, a_a);
            positions[pc.index_b] = Position::new(c_b, a_b);
        }

        // Allow some overlap so resting contacts stay warm
        min_separation >= -3.0 * LINEAR_SLOP
    }
}

/// Normal, point and separation of manifold point `index` for the solver's
/// current transforms
fn position_manifold(
    pc: &PositionConstraint,
    xf_a: &Transform,
    xf_b: &Transform,
    index: usize,
) -> (Vec2, Vec2, f64) {
    match pc.kind {
        ManifoldType::Circles => {
            let point_a = xf_a.apply(pc.local_point);
            let point_b = xf_b.apply(pc.local_points[0]);
            let normal = (point_b - point_a).normalize();
            let point = (point_a + point_b) * 0.5;
            let separation = (point_b - point_a).dot(normal) - pc.radius_a - pc.radius_b;
            (normal, point, separation)
        }
        ManifoldType::FaceA => {
            let normal = xf_a.q.apply(pc.local_normal);
            let plane_point = xf_a.apply(pc.local_point);
            let clip_point = xf_b.apply(pc.local_points[index]);
            let separation =
                (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b;
            (normal, clip_point, separation)
        }
        ManifoldType::FaceB => {
            let normal = xf_b.q.apply(pc.local_normal);
            let plane_point = xf_b.apply(pc.local_point);
            let clip_point = xf_a.apply(pc.local_points[index]);
            let separation =
                (clip_point - plane_point).dot(normal) - pc.radius_a - pc.radius_b;
            // Report A -> B
            (-normal, clip_point, separation)
        }
    }
}

/// Two-point normal solve as a linear complementarity problem
///
/// Tries the four cases (both active, only the first, only the second,
/// neither) and keeps the first whose impulses and velocities are
/// feasible. If none is, the impulses are left unchanged.
fn solve_block(vc: &mut VelocityConstraint, a: Velocity, b: Velocity) -> (Velocity, Velocity) {
    let (m_a, m_b, i_a, i_b) = (vc.inv_mass_a, vc.inv_mass_b, vc.inv_i_a, vc.inv_i_b);
    let Velocity { v: mut v_a, w: mut w_a } = a;
    let Velocity { v: mut v_b, w: mut w_b } = b;
    let normal = vc.normal;

    let cp1 = vc.points[0];
    let cp2 = vc.points[1];
    let prev = Vec2::new(cp1.normal_impulse, cp2.normal_impulse);
    debug_assert!(prev.x >= 0.0 && prev.y >= 0.0);

    let dv1 = v_b + Vec2::scalar_cross(w_b, cp1.r_b) - v_a - Vec2::scalar_cross(w_a, cp1.r_a);
    let dv2 = v_b + Vec2::scalar_cross(w_b, cp2.r_b) - v_a - Vec2::scalar_cross(w_a, cp2.r_a);
    let vn1 = dv1.dot(normal);
    let vn2 = dv2.dot(normal);

    let mut rhs = Vec2::new(vn1 - cp1.velocity_bias, vn2 - cp2.velocity_bias);
    rhs -= vc.k.mul(prev);

    let k = vc.k;
    let candidates = [
        // Both points active
        {
            let x = -vc.normal_mass.mul(rhs);
            (x.x >= 0.0 && x.y >= 0.0).then_some(x)
        },
        // Only the first point
        {
            let x = Vec2::new(-cp1.normal_mass * rhs.x, 0.0);
            let vn2 = k.ex.y * x.x + rhs.y;
            (x.x >= 0.0 && vn2 >= 0.0).then_some(x)
        },
        // Only the second point
        {
            let x = Vec2::new(0.0, -cp2.normal_mass * rhs.y);
            let vn1 = k.ey.x * x.y + rhs.x;
            (x.y >= 0.0 && vn1 >= 0.0).then_some(x)
        },
        // Neither
        (rhs.x >= 0.0 && rhs.y >= 0.0).then_some(Vec2::ZERO),
    ];

    if let Some(x) = candidates.into_iter().flatten().next() {
        let d = x - prev;
        let p1 = normal * d.x;
        let p2 = normal * d.y;
        v_a -= (p1 + p2) * m_a;
        w_a -= i_a * (cp1.r_a.cross(p1) + cp2.r_a.cross(p2));
        v_b += (p1 + p2) * m_b;
        w_b += i_b * (cp1.r_b.cross(p1) + cp2.r_b.cross(p2));
        vc.points[0].normal_impulse = x.x;
        vc.points[1].normal_impulse = x.y;
    }

    (Velocity::new(v_a, w_a), Velocity::new(v_b, w_b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{Arena, BodyHandle, ContactKey};
    use crate::collision::collide;
    use crate::shape::Shape;

    fn handles() -> (BodyHandle, BodyHandle, ContactKey) {
        let mut bodies: Arena<BodyHandle, ()> = Arena::new();
        let mut contacts: Arena<ContactKey, ()> = Arena::new();
        (bodies.insert(()), bodies.insert(()), contacts.insert(()))
    }

    /// A ground box and a unit box resting on it, with the box falling at
    /// the speed one tick of gravity gives it
    fn resting_box() -> (Vec<IslandBody>, Vec<IslandContact>, Vec<Position>, Vec<Velocity>) {
        let (ground, body, key) = handles();
        let ground_shape = Shape::cuboid(5.0, 0.5).unwrap();
        let box_shape = Shape::cuboid(0.5, 0.5).unwrap();
        let xf_ground = Transform::new(Vec2::new(0.0, -0.5), 0.0);
        let xf_box = Transform::new(Vec2::new(0.0, 0.5 - LINEAR_SLOP), 0.0);
        let manifold = collide(&ground_shape, &xf_ground, &box_shape, &xf_box);
        assert_eq!(manifold.point_count, 2);

        let bodies = vec![
            IslandBody::anchor(ground, Vec2::ZERO),
            IslandBody {
                inv_mass: 1.0,
                inv_i: 6.0,
                ..IslandBody::anchor(body, Vec2::ZERO)
            },
        ];
        let contacts = vec![IslandContact {
            key,
            index_a: 0,
            index_b: 1,
            manifold,
            friction: 0.6,
            restitution: 0.0,
            radius_a: ground_shape.radius(),
            radius_b: box_shape.radius(),
        }];
        let positions = vec![
            Position::new(xf_ground.p, 0.0),
            Position::new(xf_box.p, 0.0),
        ];
        let velocities = vec![
            Velocity::default(),
            Velocity::new(Vec2::new(0.0, -9.81 / 60.0), 0.0),
        ];
        (bodies, contacts, positions, velocities)
    }

    fn solve_once(
        step: &TimeStep,
        bodies: &[IslandBody],
        contacts: &mut [IslandContact],
        positions: &[Position],
        velocities: &mut [Velocity],
    ) -> f64 {
        let mut solver = ContactSolver::new(step, contacts, bodies);
        solver.initialize_velocity_constraints(contacts, positions, velocities);
        if step.warm_starting {
            solver.warm_start(velocities);
        }
        for _ in 0..step.velocity_iterations {
            solver.solve_velocity_constraints(velocities);
        }
        solver.store_impulses(contacts);
        solver.velocity_residual(velocities)
    }

    #[test]
    fn test_resting_box_stops_and_pushes_up() {
        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, true);
        let (bodies, mut contacts, positions, mut velocities) = resting_box();
        let residual = solve_once(&step, &bodies, &mut contacts, &positions, &mut velocities);

        assert!(velocities[1].v.y.abs() < 1e-9);
        assert!(residual < 1e-9);
        let total: f64 = contacts[0]
            .manifold
            .active_points()
            .iter()
            .map(|p| p.normal_impulse)
            .sum();
        assert!((total - 9.81 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn test_warm_start_residual_not_worse_than_cold() {
        let mut cold_step = TimeStep::new(1.0 / 60.0, 1.0, 1, 3, false);
        let (bodies, mut contacts, positions, mut velocities) = resting_box();
        let cold = solve_once(&cold_step, &bodies, &mut contacts, &positions, &mut velocities);

        // Seed a second solve with the converged impulses
        cold_step.warm_starting = true;
        let warm_step = cold_step;
        let (_, _, _, mut fresh) = resting_box();
        let warm = solve_once(&warm_step, &bodies, &mut contacts, &positions, &mut fresh);

        assert!(warm <= cold + 1e-9, "warm {} cold {}", warm, cold);
    }

    #[test]
    fn test_position_pass_separates_overlap() {
        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, false);
        let (bodies, contacts, mut positions, _) = resting_box();
        positions[1].c.y -= 0.1;
        let solver = ContactSolver::new(&step, &contacts, &bodies);
        let before = positions[1].c.y;
        let solved = solver.solve_position_constraints(&mut positions);
        assert!(!solved);
        assert!(positions[1].c.y > before);
        assert_eq!(positions[0].c, Vec2::new(0.0, -0.5));
    }

    #[test]
    fn test_ill_conditioned_pair_keeps_deepest_point() {
        // Two points a hair apart on a light, tilted sliver make the block
        // system singular enough to fall back to a single point
        let (ground, body, key) = handles();
        let ground_shape = Shape::cuboid(5.0, 0.5).unwrap();
        let sliver = Shape::cuboid(0.006, 0.006).unwrap();
        let xf_ground = Transform::new(Vec2::new(0.0, -0.5), 0.0);
        let xf_sliver = Transform::new(Vec2::new(0.0, 0.006), 0.1);
        let manifold = collide(&ground_shape, &xf_ground, &sliver, &xf_sliver);
        assert_eq!(manifold.point_count, 2);

        let bodies = vec![
            IslandBody::anchor(ground, Vec2::ZERO),
            IslandBody {
                inv_mass: 1.0,
                inv_i: 1.0,
                ..IslandBody::anchor(body, Vec2::ZERO)
            },
        ];
        let mut contacts = vec![IslandContact {
            key,
            index_a: 0,
            index_b: 1,
            manifold,
            friction: 0.6,
            restitution: 0.0,
            radius_a: ground_shape.radius(),
            radius_b: sliver.radius(),
        }];
        let positions = vec![
            Position::new(xf_ground.p, 0.0),
            Position::new(xf_sliver.p, 0.1),
        ];
        let mut velocities = vec![
            Velocity::default(),
            Velocity::new(Vec2::new(0.0, -1.0), 0.0),
        ];
        let world = WorldManifold::new(
            &contacts[0].manifold,
            &xf_ground,
            ground_shape.radius(),
            &xf_sliver,
            sliver.radius(),
        );
        let deepest = if world.separations[1] < world.separations[0] { 1 } else { 0 };

        let step = TimeStep::new(1.0 / 60.0, 1.0, 8, 3, false);
        let mut solver = ContactSolver::new(&step, &contacts, &bodies);
        solver.initialize_velocity_constraints(&contacts, &positions, &velocities);

        let vc = &solver.velocity[0];
        assert_eq!(vc.point_count, 1);
        assert_eq!(vc.points[0].manifold_index, deepest);
        let kept = positions[1].c + vc.points[0].r_b;
        assert!((kept - world.points[deepest]).length() < 1e-12);

        for _ in 0..step.velocity_iterations {
            solver.solve_velocity_constraints(&mut velocities);
        }
        solver.store_impulses(&mut contacts);
        let points = contacts[0].manifold.active_points();
        assert!(points[deepest].normal_impulse > 0.0);
        assert_eq!(points[1 - deepest].normal_impulse, 0.0);
    }
}
