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
//! Host-supplied force providers
//!
//! Providers are consulted once per tick for every awake dynamic body,
//! before the solver runs. Their output is summed into the body's force and
//! torque accumulators, which the world clears after the step. Gravity is
//! not a provider; it comes from [`crate::config::WorldConfig::gravity`].

use tracing::warn;

use crate::arena::{Arena, BodyHandle};
use crate::body::{Body, BodyType};
use crate::math::Vec2;

/// Force and torque applied at a body's centre of mass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Force {
    /// Linear force in newtons
    pub linear: Vec2,
    /// Torque in newton-metres
    pub torque: f64,
}

impl Force {
    /// Create a new force
    pub fn new(linear: Vec2, torque: f64) -> Self {
        Force { linear, torque }
    }

    /// A pure linear force
    pub fn linear(linear: Vec2) -> Self {
        Force::new(linear, 0.0)
    }

    /// A zero force
    pub fn zero() -> Self {
        Force::default()
    }

    /// Check if every component is finite
    pub fn is_valid(&self) -> bool {
        self.linear.is_valid() && self.torque.is_finite()
    }

    /// Add another force to this one
    pub fn add(&mut self, other: &Force) {
        self.linear += other.linear;
        self.torque += other.torque;
    }

    /// Magnitude of the linear part
    pub fn magnitude(&self) -> f64 {
        self.linear.length()
    }

    /// Whether the force and torque are both exactly zero
    pub fn is_zero(&self) -> bool {
        self.linear == Vec2::ZERO && self.torque == 0.0
    }
}

/// Something that pushes bodies around: wind, buoyancy, player thrust
///
/// Providers only see the body read-only; everything they want to do goes
/// through the returned [`Force`].
pub trait ForceProvider: Send + Sync {
    /// Force to apply to `body` this tick, or `None` if the provider does not
    /// act on it
    fn compute_force(&self, handle: BodyHandle, body: &Body) -> Option<Force>;

    /// Descriptive name used in log output
    fn name(&self) -> &str;
}

/// Registered force providers plus the limits applied to their output
pub struct ForceRegistry {
    providers: Vec<Box<dyn ForceProvider>>,
    /// Totals above this magnitude are scaled down to it
    pub max_force_magnitude: f64,
    /// Whether to log rejected or clamped provider output
    pub warn_on_invalid: bool,
}

impl ForceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        ForceRegistry {
            providers: Vec::new(),
            max_force_magnitude: 1e10,
            warn_on_invalid: true,
        }
    }

    /// Register a force provider; providers run in registration order
    pub fn register_provider(&mut self, provider: Box<dyn ForceProvider>) {
        self.providers.push(provider);
    }

    /// Remove every provider
    pub fn clear(&mut self) {
        self.providers.clear();
    }

    /// Get the number of registered providers
    pub fn provider_count(&self) -> usize {
        self.providers.len()
    }

    /// Sum every provider's force for one body
    ///
    /// Non-finite contributions are dropped and an over-limit total is
    /// scaled down to `max_force_magnitude`. Returns `None` when no provider
    /// applied.
    pub fn force_for(&self, handle: BodyHandle, body: &Body) -> Option<Force> {
        let mut total = Force::zero();
        let mut has_forces = false;

        for provider in &self.providers {
            let Some(force) = provider.compute_force(handle, body) else {
                continue;
            };
            if !force.is_valid() {
                if self.warn_on_invalid {
                    warn!(provider = provider.name(), body = ?handle, "ignoring non-finite force");
                }
                continue;
            }
            total.add(&force);
            has_forces = true;
        }

        if has_forces && total.magnitude() > self.max_force_magnitude {
            let magnitude = total.magnitude();
            if self.warn_on_invalid {
                warn!(
                    body = ?handle,
                    magnitude,
                    limit = self.max_force_magnitude,
                    "clamping total provider force"
                );
            }
            total.linear *= self.max_force_magnitude / magnitude;
        }

        has_forces.then_some(total)
    }

    /// Sleeping dynamic bodies that a provider pushes with a non-zero force
    ///
    /// The world wakes these before [`ForceRegistry::accumulate`] so that
    /// provider output is never dropped on a sleeping body.
    pub(crate) fn sleepers_pushed(&self, bodies: &Arena<BodyHandle, Body>) -> Vec<BodyHandle> {
        if self.providers.is_empty() {
            return Vec::new();
        }
        bodies
            .iter()
            .filter(|(_, body)| body.body_type == BodyType::Dynamic && !body.awake)
            .filter(|&(handle, body)| {
                self.force_for(handle, body)
                    .is_some_and(|force| !force.is_zero())
            })
            .map(|(handle, _)| handle)
            .collect()
    }

    /// Add provider forces to every awake dynamic body's accumulators
    ///
    /// Returns the number of bodies that received a force.
    pub(crate) fn accumulate(&self, bodies: &mut Arena<BodyHandle, Body>) -> usize {
        if self.providers.is_empty() {
            return 0;
        }
        let mut applied = 0;
        for (handle, body) in bodies.iter_mut() {
            if body.body_type != BodyType::Dynamic || !body.awake {
                continue;
            }
            if let Some(force) = self.force_for(handle, body) {
                body.force += force.linear;
                body.torque += force.torque;
                applied += 1;
            }
        }
        applied
    }
}

impl Default for ForceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ForceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.providers.iter().map(|p| p.name()).collect();
        f.debug_struct("ForceRegistry")
            .field("providers", &names)
            .field("max_force_magnitude", &self.max_force_magnitude)
            .finish()
    }
}
