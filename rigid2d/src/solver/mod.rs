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
//! Island solver
//!
//! Each island is solved in isolation: forces are integrated into
//! velocities, joints and contacts are relaxed with sequential impulses,
//! positions are integrated and then nudged apart by the position passes.
//! Islands share no data, so with the `parallel` feature they are handed to
//! rayon and written back by the world in island order.

pub(crate) mod contact_solver;
pub(crate) mod island;

use crate::config::settings::{MAX_ROTATION, MAX_TRANSLATION};
use crate::config::WorldConfig;
use crate::math::Vec2;
use contact_solver::ContactSolver;
use island::Island;

/// Timing and iteration settings of one solve
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct TimeStep {
    pub dt: f64,
    pub inv_dt: f64,
    /// `dt / previous dt`, used to rescale warm-start impulses
    pub dt_ratio: f64,
    pub velocity_iterations: u32,
    pub position_iterations: u32,
    pub warm_starting: bool,
}

impl TimeStep {
    pub fn new(
        dt: f64,
        dt_ratio: f64,
        velocity_iterations: u32,
        position_iterations: u32,
        warm_starting: bool,
    ) -> Self {
        TimeStep {
            dt,
            inv_dt: if dt > 0.0 { 1.0 / dt } else { 0.0 },
            dt_ratio,
            velocity_iterations,
            position_iterations,
            warm_starting,
        }
    }
}

/// Centre of mass and angle
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Position {
    pub c: Vec2,
    pub a: f64,
}

impl Position {
    pub fn new(c: Vec2, a: f64) -> Self {
        Position { c, a }
    }
}

/// Linear and angular velocity
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct Velocity {
    pub v: Vec2,
    pub w: f64,
}

impl Velocity {
    pub fn new(v: Vec2, w: f64) -> Self {
        Velocity { v, w }
    }
}

/// Island-local state handed to the joint solvers
pub(crate) struct SolverData<'a> {
    pub step: &'a TimeStep,
    pub positions: &'a mut [Position],
    pub velocities: &'a mut [Velocity],
}

/// Summary of the most recent step's solve
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SolverStats {
    /// Number of islands solved
    pub islands: usize,
    /// Dynamic bodies moved by the solver
    pub bodies: usize,
    /// Touching contacts solved
    pub contacts: usize,
    /// Joints solved
    pub joints: usize,
    /// Sum over contact points of the normal velocity error left after the
    /// velocity iterations
    pub velocity_residual: f64,
    /// Whether every island's position passes converged
    pub position_solved: bool,
}

impl SolverStats {
    pub(crate) fn from_islands(islands: &[Island]) -> Self {
        let mut stats = SolverStats {
            islands: islands.len(),
            position_solved: true,
            ..Default::default()
        };
        for island in islands {
            stats.bodies += island.members().count();
            stats.contacts += island.contacts.len();
            stats.joints += island.joints.len();
            stats.velocity_residual += island.outcome.velocity_residual;
            stats.position_solved &= island.outcome.position_solved;
        }
        stats
    }
}

/// Solve every island, in parallel when the `parallel` feature is on
pub(crate) fn solve_islands(islands: &mut [Island], step: &TimeStep, config: &WorldConfig) {
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        islands
            .par_iter_mut()
            .for_each(|island| solve_island(island, step, config));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for island in islands.iter_mut() {
            solve_island(island, step, config);
        }
    }
}

/// Advance one island by `step.dt`
pub(crate) fn solve_island(island: &mut Island, step: &TimeStep, config: &WorldConfig) {
    let dt = step.dt;
    let Island {
        bodies,
        positions,
        velocities,
        contacts,
        joints,
        outcome,
    } = island;

    for (body, velocity) in bodies.iter().zip(velocities.iter_mut()) {
        if body.anchor {
            continue;
        }
        let mut v = velocity.v;
        let mut w = velocity.w;
        v += (config.gravity * body.gravity_scale + body.force * body.inv_mass) * dt;
        w += dt * body.inv_i * body.torque;

        // Pade approximation of exp(-c dt), stable for large damping
        v *= 1.0 / (1.0 + dt * body.linear_damping);
        w *= 1.0 / (1.0 + dt * body.angular_damping);
        *velocity = Velocity::new(v, w);
    }

    let mut contact_solver = ContactSolver::new(step, contacts, bodies);
    contact_solver.initialize_velocity_constraints(contacts, positions, velocities);
    if step.warm_starting {
        contact_solver.warm_start(velocities);
    }

    let mut data = SolverData {
        step,
        positions,
        velocities,
    };

    for ij in joints.iter_mut() {
        ij.joint.init_velocity_constraints(&ij.bodies, &mut data);
    }

    for _ in 0..step.velocity_iterations {
        for ij in joints.iter_mut() {
            ij.joint.solve_velocity_constraints(&ij.bodies, &mut data);
        }
        contact_solver.solve_velocity_constraints(data.velocities);
    }

    contact_solver.store_impulses(contacts);
    outcome.velocity_residual = contact_solver.velocity_residual(data.velocities);

    for (i, body) in bodies.iter().enumerate() {
        if body.anchor {
            continue;
        }
        let Velocity { mut v, mut w } = data.velocities[i];

        let translation = v * dt;
        if translation.length_squared() > MAX_TRANSLATION * MAX_TRANSLATION {
            v *= MAX_TRANSLATION / translation.length();
        }
        let rotation = dt * w;
        if rotation * rotation > MAX_ROTATION * MAX_ROTATION {
            w *= MAX_ROTATION / rotation.abs();
        }

        data.positions[i].c += v * dt;
        data.positions[i].a += dt * w;
        data.velocities[i] = Velocity::new(v, w);
    }

    outcome.position_solved = false;
    for _ in 0..step.position_iterations {
        let contacts_ok = contact_solver.solve_position_constraints(data.positions);
        let mut joints_ok = true;
        for ij in joints.iter_mut() {
            let ok = ij.joint.solve_position_constraints(&ij.bodies, &mut data);
            joints_ok = joints_ok && ok;
        }
        if contacts_ok && joints_ok {
            outcome.position_solved = true;
            break;
        }
    }

    outcome.sleep = false;
    if !config.allow_sleep {
        return;
    }

    let lin_tol_sq = config.sleep_linear_tolerance * config.sleep_linear_tolerance;
    let ang_tol_sq = config.sleep_angular_tolerance * config.sleep_angular_tolerance;
    let mut min_sleep_time = f64::MAX;
    for (body, velocity) in bodies.iter_mut().zip(data.velocities.iter()) {
        let moving =
            velocity.w * velocity.w > ang_tol_sq || velocity.v.length_squared() > lin_tol_sq;
        if body.anchor {
            // A moving kinematic body keeps what it pushes awake
            if moving {
                min_sleep_time = 0.0;
            }
            continue;
        }
        if !body.sleeping_allowed || moving {
            body.sleep_time = 0.0;
            min_sleep_time = 0.0;
        } else {
            body.sleep_time += dt;
            min_sleep_time = min_sleep_time.min(body.sleep_time);
        }
    }

    outcome.sleep = min_sleep_time >= config.sleep_time && outcome.position_solved;
}
