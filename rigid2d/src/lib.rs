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
//! # rigid2d
//!
//! A deterministic 2D rigid-body physics core meant to be embedded in a game
//! engine that runs client-side prediction against an authoritative server.
//!
//! ## Features
//!
//! - **Broadphase**: a balanced dynamic AABB tree per map, with fat bounds
//!   and a move buffer so only moved proxies look for new pairs
//! - **Narrow phase**: circle, convex polygon and edge manifolds with
//!   persistent feature ids for warm starting
//! - **Solver**: warm-started sequential impulses with a two-point block
//!   solver, distance, revolute and weld joints, breakable joints
//! - **Islands and sleeping**: resting groups of bodies fall asleep and are
//!   woken by new contacts or API calls
//! - **Parallelization**: optional Rayon integration solves islands on
//!   worker threads without changing results
//! - **Replication**: serde-serializable per-body state with a versioned
//!   envelope
//!
//! Iteration order never depends on hashing or thread scheduling, so two
//! worlds fed the same calls produce bit-identical results.
//!
//! ## Example
//!
//! ```rust
//! use rigid2d::{BodyDef, FixtureDef, PhysicsWorld, Shape, Vec2, WorldConfig};
//!
//! let mut world = PhysicsWorld::new(WorldConfig::default())?;
//! let ground = world.create_body(BodyDef::fixed(Vec2::new(0.0, -0.5)))?;
//! world.create_fixture(ground, FixtureDef::new(Shape::cuboid(10.0, 0.5)?))?;
//!
//! let ball = world.create_body(BodyDef::dynamic(Vec2::new(0.0, 4.0)))?;
//! world.create_fixture(ball, FixtureDef::new(Shape::circle(0.5)?))?;
//!
//! for _ in 0..120 {
//!     world.step();
//! }
//! assert!(world.body(ball)?.position().y < 4.0);
//! # Ok::<(), rigid2d::PhysicsError>(())
//! ```

#![warn(missing_docs)]

/// Generational arenas and typed handles
pub mod arena;

/// Rigid bodies and fixtures
pub mod body;

/// Pair finding over per-map AABB trees
pub mod broadphase;

/// Manifold generation between shape pairs
pub mod collision;

/// World configuration and tuning constants
pub mod config;

/// Persistent contacts between fixtures
pub mod contact;

/// Error types
pub mod error;

/// Events raised during a tick
pub mod events;

/// Host-supplied force providers
pub mod forces;

pub(crate) mod graph;

/// Joint definitions and solvers
pub mod joint;

/// Vector, rotation and bounding-box math
pub mod math;

/// Collision shapes
pub mod shape;

mod solver;

/// Replicated body state
pub mod state;

/// Dynamic AABB tree
pub mod tree;

/// The physics world
pub mod world;

pub use arena::{BodyHandle, ContactKey, FixtureHandle, JointHandle};
pub use body::{Body, BodyDef, BodyStatus, BodyType, Fixture, FixtureDef};
pub use broadphase::MapId;
pub use collision::{Manifold, ManifoldType, WorldManifold};
pub use config::WorldConfig;
pub use contact::Contact;
pub use error::{PhysicsError, Result};
pub use events::PhysicsEvent;
pub use forces::{Force, ForceProvider};
pub use joint::{
    DistanceJointDef, Joint, JointDef, JointParams, JointType, RevoluteJointDef, WeldJointDef,
};
pub use math::{Aabb, Rot, Transform, Vec2};
pub use shape::{MassData, Shape};
pub use solver::SolverStats;
pub use state::{check_format_version, BodyState, StateEnvelope, STATE_FORMAT_VERSION};
pub use world::{PhysicsWorld, RayHit};
