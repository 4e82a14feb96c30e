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
//! Replicated body state
//!
//! The networking layer ships a small per-body record so that clients can
//! predict the server's simulation. [`BodyState`] is that record; a batch of
//! them travels in a [`StateEnvelope`] tagged with the format version, which
//! receivers check with [`check_format_version`] before applying anything.

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::body::{Body, BodyStatus, BodyType};
use crate::error::{PhysicsError, Result};
use crate::math::Vec2;

/// Version of the [`BodyState`] wire layout
pub const STATE_FORMAT_VERSION: &str = "0.1.0";

/// Replicated flags and velocities of one body
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BodyState {
    /// Whether the body's fixtures generate contacts
    pub can_collide: bool,
    /// Whether the body may fall asleep
    pub sleeping_allowed: bool,
    /// Whether the solver ignores the body's rotational inertia
    pub fixed_rotation: bool,
    /// Host movement status
    pub status: BodyStatus,
    /// Linear velocity of the centre of mass
    pub linear_velocity: Vec2,
    /// Angular velocity in radians per second
    pub angular_velocity: f64,
    /// Simulation type
    pub body_type: BodyType,
}

impl BodyState {
    /// Snapshot a body
    pub fn capture(body: &Body) -> Self {
        BodyState {
            can_collide: body.can_collide(),
            sleeping_allowed: body.sleeping_allowed(),
            fixed_rotation: body.fixed_rotation(),
            status: body.status(),
            linear_velocity: body.linear_velocity(),
            angular_velocity: body.angular_velocity(),
            body_type: body.body_type(),
        }
    }

    /// Reject states that would poison the solver
    pub fn validate(&self) -> Result<()> {
        if !self.linear_velocity.is_valid() || !self.angular_velocity.is_finite() {
            return Err(PhysicsError::InvalidConfig(
                "replicated velocity must be finite".into(),
            ));
        }
        Ok(())
    }
}

/// A batch of body states tagged with the format that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateEnvelope {
    /// Semver string of the producing format, see [`STATE_FORMAT_VERSION`]
    pub format_version: String,
    /// States in the order the host chose when packing
    pub bodies: Vec<BodyState>,
}

impl StateEnvelope {
    /// Wrap states with the current format version
    pub fn new(bodies: Vec<BodyState>) -> Self {
        StateEnvelope {
            format_version: STATE_FORMAT_VERSION.to_string(),
            bodies,
        }
    }

    /// Check the envelope's version against this build
    pub fn check(&self) -> Result<()> {
        check_format_version(&self.format_version)
    }
}

/// Check whether state written as `found` can be read by this build
///
/// Major versions must match. Within 0.x the minor version is treated as a
/// breaking change and must match too; from 1.0 on, older minors are
/// accepted.
pub fn check_format_version(found: &str) -> Result<()> {
    let incompatible = || PhysicsError::IncompatibleState {
        found: found.to_string(),
        expected: STATE_FORMAT_VERSION.to_string(),
    };
    let found_ver = Version::parse(found).map_err(|_| incompatible())?;
    let expected_ver = Version::parse(STATE_FORMAT_VERSION).map_err(|_| incompatible())?;

    if found_ver.major != expected_ver.major {
        return Err(incompatible());
    }
    let compatible = if found_ver.major != 0 {
        found_ver.minor <= expected_ver.minor
    } else {
        found_ver.minor == expected_ver.minor
    };
    if compatible {
        Ok(())
    } else {
        Err(incompatible())
    }
}
