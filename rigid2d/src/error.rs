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
//! Error types for the physics core
//!
//! Configuration problems (bad shapes, non-finite mass, invalid world
//! settings) are reported when an object is created, before anything is
//! registered with the broadphase. Using a handle that no longer refers to a
//! live object is reported as [`PhysicsError::InvalidHandle`].

use thiserror::Error;

/// Errors produced by the physics world and its builders
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    /// World configuration rejected by [`crate::config::WorldConfig::validate`]
    #[error("invalid world configuration: {0}")]
    InvalidConfig(String),

    /// Shape failed validation (radius, convexity, vertex count, ...)
    #[error("invalid shape: {0}")]
    InvalidShape(String),

    /// Body or fixture mass properties are not usable
    #[error("invalid mass properties: {0}")]
    InvalidMass(String),

    /// A handle does not refer to a live object
    #[error("unknown or removed {kind} handle {handle}")]
    InvalidHandle {
        /// Kind of object the handle refers to
        kind: &'static str,
        /// Debug rendering of the handle
        handle: String,
    },

    /// Joint definition rejected
    #[error("invalid joint: {0}")]
    InvalidJoint(String),

    /// Replicated state was produced by an incompatible format version
    #[error("state format version {found} is incompatible with {expected}")]
    IncompatibleState {
        /// Version found in the payload
        found: String,
        /// Version this build produces
        expected: String,
    },
}

/// Convenience alias used throughout the crate
pub type Result<T> = std::result::Result<T, PhysicsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PhysicsError::InvalidHandle {
            kind: "body",
            handle: "BodyHandle(3v1)".to_string(),
        };
        assert_eq!(err.to_string(), "unknown or removed body handle BodyHandle(3v1)");

        let err = PhysicsError::InvalidShape("circle radius must be positive".into());
        assert!(err.to_string().contains("radius"));
    }
}
