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
//! World configuration and solver tuning constants
//!
//! [`WorldConfig`] carries the values the host injects at world construction
//! (and may replace between ticks). The [`settings`] module holds the fixed
//! tolerances used by collision and the solvers.

use crate::error::{PhysicsError, Result};
use crate::math::Vec2;

/// Fixed tuning constants, in metres, radians and seconds
pub mod settings {
    use std::f64::consts::PI;

    /// Collision and constraint tolerance
    pub const LINEAR_SLOP: f64 = 0.005;
    /// Angular collision and constraint tolerance
    pub const ANGULAR_SLOP: f64 = 2.0 / 180.0 * PI;
    /// Skin radius around polygons and edges
    pub const POLYGON_RADIUS: f64 = 2.0 * LINEAR_SLOP;
    /// Maximum number of vertices in a convex polygon
    pub const MAX_POLYGON_VERTICES: usize = 8;
    /// Margin added to every side of a fat AABB
    pub const AABB_EXTENSION: f64 = 0.1;
    /// Scale applied to the displacement when predicting a fat AABB
    pub const AABB_MULTIPLIER: f64 = 2.0;
    /// Maximum linear position correction per position iteration
    pub const MAX_LINEAR_CORRECTION: f64 = 0.2;
    /// Maximum angular position correction per position iteration
    pub const MAX_ANGULAR_CORRECTION: f64 = 8.0 / 180.0 * PI;
    /// Maximum translation of a body per step
    pub const MAX_TRANSLATION: f64 = 2.0;
    /// Maximum rotation of a body per step
    pub const MAX_ROTATION: f64 = 0.5 * PI;
    /// Position correction factor
    pub const BAUMGARTE: f64 = 0.2;
    /// Relative approach speed below which collisions are inelastic
    pub const VELOCITY_THRESHOLD: f64 = 1.0;
    /// Condition number limit for the two-point block solver
    pub const MAX_CONDITION_NUMBER: f64 = 1000.0;
}

/// Simulation configuration injected by the host
///
/// # Examples
///
/// ```
/// use rigid2d::config::WorldConfig;
/// use rigid2d::math::Vec2;
///
/// let config = WorldConfig::default()
///     .with_gravity(Vec2::new(0.0, -20.0))
///     .with_iterations(10, 4);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    /// Gravity acceleration applied to dynamic bodies
    pub gravity: Vec2,
    /// Velocity solver passes per step
    pub velocity_iterations: u32,
    /// Position correction passes per step
    pub position_iterations: u32,
    /// Linear speed (m/s) under which a body may fall asleep
    pub sleep_linear_tolerance: f64,
    /// Angular speed (rad/s) under which a body may fall asleep
    pub sleep_angular_tolerance: f64,
    /// Seconds a body must stay under both tolerances before sleeping
    pub sleep_time: f64,
    /// Duration of one simulation tick in seconds
    pub fixed_timestep: f64,
    /// Seed the solvers with the previous tick's impulses
    pub warm_starting: bool,
    /// Allow islands to fall asleep
    pub allow_sleep: bool,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            gravity: Vec2::new(0.0, -9.81),
            velocity_iterations: 8,
            position_iterations: 3,
            sleep_linear_tolerance: 0.01,
            sleep_angular_tolerance: 2.0 / 180.0 * std::f64::consts::PI,
            sleep_time: 0.5,
            fixed_timestep: 1.0 / 60.0,
            warm_starting: true,
            allow_sleep: true,
        }
    }
}

impl WorldConfig {
    /// Set the gravity vector
    pub fn with_gravity(mut self, gravity: Vec2) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the velocity and position iteration counts
    pub fn with_iterations(mut self, velocity: u32, position: u32) -> Self {
        self.velocity_iterations = velocity;
        self.position_iterations = position;
        self
    }

    /// Set the fixed timestep
    pub fn with_timestep(mut self, dt: f64) -> Self {
        self.fixed_timestep = dt;
        self
    }

    /// Set the sleep tolerances and the time required to fall asleep
    pub fn with_sleep(mut self, linear: f64, angular: f64, time: f64) -> Self {
        self.sleep_linear_tolerance = linear;
        self.sleep_angular_tolerance = angular;
        self.sleep_time = time;
        self
    }

    /// Enable or disable sleeping
    pub fn with_allow_sleep(mut self, allow: bool) -> Self {
        self.allow_sleep = allow;
        self
    }

    /// Enable or disable warm starting
    pub fn with_warm_starting(mut self, enabled: bool) -> Self {
        self.warm_starting = enabled;
        self
    }

    /// Validate the configuration
    ///
    /// Rejects non-finite values, non-positive timesteps, timesteps small
    /// enough to lose precision, timesteps large enough to destabilise the
    /// solver, and zero iteration counts.
    pub fn validate(&self) -> Result<()> {
        let dt = self.fixed_timestep;
        if dt <= 0.0 || !dt.is_finite() {
            return Err(PhysicsError::InvalidConfig(format!(
                "timestep {} must be positive and finite",
                dt
            )));
        }
        if dt < 1e-6 {
            return Err(PhysicsError::InvalidConfig(format!(
                "timestep {} is extremely small and would lose precision",
                dt
            )));
        }
        if dt > 0.25 {
            return Err(PhysicsError::InvalidConfig(format!(
                "timestep {} is too large for a stable contact solve",
                dt
            )));
        }
        if !self.gravity.is_valid() {
            return Err(PhysicsError::InvalidConfig("gravity must be finite".into()));
        }
        if self.velocity_iterations == 0 {
            return Err(PhysicsError::InvalidConfig(
                "velocity iterations must be at least 1".into(),
            ));
        }
        if self.position_iterations == 0 {
            return Err(PhysicsError::InvalidConfig(
                "position iterations must be at least 1".into(),
            ));
        }
        for (name, value) in [
            ("sleep linear tolerance", self.sleep_linear_tolerance),
            ("sleep angular tolerance", self.sleep_angular_tolerance),
            ("sleep time", self.sleep_time),
        ] {
            if value < 0.0 || !value.is_finite() {
                return Err(PhysicsError::InvalidConfig(format!(
                    "{} {} must be non-negative and finite",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
