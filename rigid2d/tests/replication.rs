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
//! Replicated body state tests
//!
//! State captured on an authoritative world is serialized, checked against
//! the format version and applied to a replica.

use rigid2d::{
    check_format_version, BodyDef, BodyState, BodyStatus, BodyType, FixtureDef, PhysicsError,
    PhysicsWorld, Shape, StateEnvelope, Vec2, WorldConfig, STATE_FORMAT_VERSION,
};

fn world_with_box(def: BodyDef) -> (PhysicsWorld, rigid2d::BodyHandle) {
    let mut world = PhysicsWorld::new(WorldConfig::default()).unwrap();
    let body = world.create_body(def).unwrap();
    world
        .create_fixture(body, FixtureDef::new(Shape::cuboid(0.5, 0.5).unwrap()))
        .unwrap();
    (world, body)
}

fn moving_state() -> BodyState {
    let (mut world, body) = world_with_box(
        BodyDef::dynamic(Vec2::new(0.0, 10.0)).with_velocity(Vec2::new(3.0, 1.5), 0.75),
    );
    world.set_status(body, BodyStatus::InAir).unwrap();
    world.set_sleeping_allowed(body, false).unwrap();
    world.step();
    world.body_state(body).unwrap()
}

#[test]
fn test_state_survives_json() {
    let state = moving_state();
    let json = serde_json::to_string(&state).unwrap();
    let decoded: BodyState = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, state);
    assert!(json.contains("InAir"));
}

#[test]
fn test_envelope_survives_bincode() {
    let envelope = StateEnvelope::new(vec![moving_state(), moving_state()]);
    let bytes = bincode::serialize(&envelope).unwrap();
    let decoded: StateEnvelope = bincode::deserialize(&bytes).unwrap();
    assert_eq!(decoded, envelope);
    assert!(decoded.check().is_ok());
    assert_eq!(decoded.format_version, STATE_FORMAT_VERSION);
}

#[test]
fn test_envelope_from_other_version_is_rejected() {
    let mut envelope = StateEnvelope::new(vec![moving_state()]);
    envelope.format_version = "0.9.0".to_string();
    let json = serde_json::to_string(&envelope).unwrap();
    let decoded: StateEnvelope = serde_json::from_str(&json).unwrap();

    match decoded.check() {
        Err(PhysicsError::IncompatibleState { found, expected }) => {
            assert_eq!(found, "0.9.0");
            assert_eq!(expected, STATE_FORMAT_VERSION);
        }
        other => panic!("expected incompatible state, got {other:?}"),
    }
    assert!(check_format_version("").is_err());
}

#[test]
fn test_replica_takes_authority_state() {
    let authority = moving_state();
    let (mut replica, body) = world_with_box(BodyDef::dynamic(Vec2::ZERO));

    replica.apply_body_state(body, &authority).unwrap();

    assert_eq!(replica.body_state(body).unwrap(), authority);
    let applied = replica.body(body).unwrap();
    assert!(!applied.sleeping_allowed());
    assert_eq!(applied.status(), BodyStatus::InAir);
    assert!(applied.is_awake());
}

#[test]
fn test_replica_changes_body_type() {
    let (authority, source) = world_with_box(
        BodyDef::kinematic(Vec2::ZERO).with_velocity(Vec2::new(2.0, 0.0), 0.0),
    );
    let state = authority.body_state(source).unwrap();
    let (mut replica, body) = world_with_box(BodyDef::dynamic(Vec2::ZERO));

    replica.apply_body_state(body, &state).unwrap();
    for _ in 0..60 {
        replica.step();
    }

    let body = replica.body(body).unwrap();
    assert_eq!(body.body_type(), BodyType::Kinematic);
    assert!((body.position().x - 2.0).abs() < 1e-9);
    assert_eq!(body.position().y, 0.0);
}

#[test]
fn test_invalid_state_is_not_applied() {
    let (mut replica, body) = world_with_box(BodyDef::dynamic(Vec2::ZERO));
    let mut state = replica.body_state(body).unwrap();
    state.body_type = BodyType::Static;
    state.angular_velocity = f64::INFINITY;

    assert!(replica.apply_body_state(body, &state).is_err());
    assert_eq!(replica.body(body).unwrap().body_type(), BodyType::Dynamic);

    replica.destroy_body(body).unwrap();
    let fresh = BodyState {
        angular_velocity: 0.0,
        ..state
    };
    assert!(matches!(
        replica.apply_body_state(body, &fresh),
        Err(PhysicsError::InvalidHandle { .. })
    ));
}
