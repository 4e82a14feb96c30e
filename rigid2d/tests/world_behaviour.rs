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
//! End-to-end behaviour of a stepping world
//!
//! Covers resting contact, sleeping and waking, contact filtering, joint
//! breaking and the warm-starting guarantee.

use std::collections::BTreeSet;

use rigid2d::{
    Body, BodyDef, BodyHandle, BodyType, DistanceJointDef, Force, ForceProvider, FixtureDef,
    JointDef, JointParams, PhysicsEvent, PhysicsWorld, RevoluteJointDef, Shape, Vec2,
    WorldConfig,
};

fn world_with(config: WorldConfig) -> PhysicsWorld {
    PhysicsWorld::new(config).unwrap()
}

/// Static slab whose top face lies on y = 0
fn add_ground(world: &mut PhysicsWorld) -> BodyHandle {
    let ground = world.create_body(BodyDef::fixed(Vec2::new(0.0, -0.5))).unwrap();
    world
        .create_fixture(ground, FixtureDef::new(Shape::cuboid(20.0, 0.5).unwrap()))
        .unwrap();
    ground
}

/// Unit box (1 kg) centred at `position`
fn add_box(world: &mut PhysicsWorld, position: Vec2) -> BodyHandle {
    let body = world.create_body(BodyDef::dynamic(position)).unwrap();
    world
        .create_fixture(
            body,
            FixtureDef::new(Shape::cuboid(0.5, 0.5).unwrap()).with_friction(0.6),
        )
        .unwrap();
    body
}

fn step_until_asleep(world: &mut PhysicsWorld, body: BodyHandle, max_ticks: usize) -> bool {
    for _ in 0..max_ticks {
        world.step();
        if !world.body(body).unwrap().is_awake() {
            return true;
        }
    }
    false
}

#[test]
fn test_box_settles_on_ground_and_sleeps() {
    let mut world = world_with(WorldConfig::default());
    add_ground(&mut world);
    let body = add_box(&mut world, Vec2::new(0.0, 2.0));

    assert!(step_until_asleep(&mut world, body, 600), "box never fell asleep");

    let state = world.body(body).unwrap();
    assert!((state.position().y - 0.5).abs() < 0.02, "rest height {}", state.position().y);
    assert!(state.angle().abs() < 1e-3);
    assert_eq!(state.linear_velocity(), Vec2::ZERO);

    // A sleeping body is not solved and does not move
    let before = state.transform();
    world.step();
    assert!(world.islands().is_empty());
    assert_eq!(world.body(body).unwrap().transform(), before);
}

#[test]
fn test_new_touch_wakes_sleeping_island() {
    let mut world = world_with(WorldConfig::default());
    add_ground(&mut world);
    let bottom = add_box(&mut world, Vec2::new(0.0, 0.5));
    assert!(step_until_asleep(&mut world, bottom, 600));
    world.drain_events();

    let top = add_box(&mut world, Vec2::new(0.0, 2.5));
    let mut touched = false;
    for _ in 0..120 {
        world.step();
        touched = world.drain_events().iter().any(|event| {
            matches!(event, PhysicsEvent::BeginTouch { body_a, body_b, .. }
                if BTreeSet::from([*body_a, *body_b]) == BTreeSet::from([bottom, top]))
        });
        if touched {
            break;
        }
    }

    assert!(touched, "falling box never reached the sleeping one");
    assert!(world.body(bottom).unwrap().is_awake());
    assert!(world.islands().iter().any(|island| island.contains(&bottom) && island.contains(&top)));
}

#[test]
fn test_waking_one_stack_leaves_others_asleep() {
    let mut world = world_with(WorldConfig::default());
    add_ground(&mut world);
    let left = add_box(&mut world, Vec2::new(-5.0, 0.5));
    let right = add_box(&mut world, Vec2::new(5.0, 0.5));
    assert!(step_until_asleep(&mut world, left, 600));
    assert!(step_until_asleep(&mut world, right, 600));

    world.set_awake(left, true).unwrap();
    world.step();

    assert!(world.body(left).unwrap().is_awake());
    assert!(!world.body(right).unwrap().is_awake());
    assert_eq!(world.islands(), &[vec![left]]);
}

#[test]
fn test_circles_touch_only_when_overlapping() {
    let config = WorldConfig::default().with_gravity(Vec2::ZERO);

    for (gap, expect_touch) in [(1.9, true), (1.999, true), (2.05, false)] {
        let mut world = world_with(config.clone());
        let a = world.create_body(BodyDef::dynamic(Vec2::ZERO)).unwrap();
        world.create_fixture(a, FixtureDef::new(Shape::circle(1.0).unwrap())).unwrap();
        let b = world.create_body(BodyDef::dynamic(Vec2::new(gap, 0.0))).unwrap();
        world.create_fixture(b, FixtureDef::new(Shape::circle(1.0).unwrap())).unwrap();

        world.step();

        let touching: Vec<_> = world
            .contacts()
            .filter(|(_, contact)| contact.is_touching())
            .map(|(key, contact)| (key, contact.bodies()))
            .collect();
        assert_eq!(touching.len(), usize::from(expect_touch), "gap {gap}");

        if let Some(&(key, (body_a, body_b))) = touching.first() {
            assert_eq!(world.contact(key).unwrap().manifold().point_count, 1);
            let manifold = world.world_manifold(key).unwrap();
            assert!((manifold.normal.length() - 1.0).abs() < 1e-9);
            let ab = world.body(body_b).unwrap().position() - world.body(body_a).unwrap().position();
            assert!(manifold.normal.dot(ab) > 0.0, "normal must point from A to B");
        } else {
            let began = world
                .drain_events()
                .iter()
                .any(|event| matches!(event, PhysicsEvent::BeginTouch { .. }));
            assert!(!began);
        }
    }
}

#[test]
fn test_overloaded_joint_breaks_once() {
    let mut world = world_with(WorldConfig::default());
    let anchor = world.create_body(BodyDef::fixed(Vec2::new(0.0, 5.0))).unwrap();
    let bob = add_box(&mut world, Vec2::new(0.0, 3.0));
    let params = {
        let (a, b) = (world.body(anchor).unwrap(), world.body(bob).unwrap());
        JointParams::Distance(DistanceJointDef::new(a, b, a.position(), b.position()))
    };
    // The bob weighs 9.81 N
    let joint = world
        .create_joint(JointDef::new(anchor, bob, params).with_max_force(5.0))
        .unwrap();

    let mut broken = Vec::new();
    for _ in 0..30 {
        world.step();
        broken.extend(
            world
                .drain_events()
                .into_iter()
                .filter(|event| matches!(event, PhysicsEvent::JointBroken { .. })),
        );
    }

    assert_eq!(broken.len(), 1);
    match &broken[0] {
        PhysicsEvent::JointBroken { joint: handle, body_a, body_b, force, .. } => {
            assert_eq!(*handle, joint);
            assert_eq!((*body_a, *body_b), (anchor, bob));
            assert!(*force > 5.0);
        }
        other => panic!("unexpected event {other:?}"),
    }
    assert!(world.joint(joint).is_err());
    assert_eq!(world.joint_count(), 0);
    assert!(world.joints_of(bob).unwrap().is_empty());
    assert!(world.body(bob).unwrap().position().y < 2.0, "bob should fall freely");
}

#[test]
fn test_joint_within_limit_holds() {
    let mut world = world_with(WorldConfig::default());
    let anchor = world.create_body(BodyDef::fixed(Vec2::new(0.0, 5.0))).unwrap();
    let bob = add_box(&mut world, Vec2::new(0.0, 3.0));
    let params = {
        let (a, b) = (world.body(anchor).unwrap(), world.body(bob).unwrap());
        JointParams::Distance(DistanceJointDef::new(a, b, a.position(), b.position()))
    };
    let joint = world
        .create_joint(JointDef::new(anchor, bob, params).with_max_force(50.0))
        .unwrap();

    for _ in 0..120 {
        world.step();
    }

    assert!(world.joint(joint).is_ok());
    assert!(world
        .drain_events()
        .iter()
        .all(|event| !matches!(event, PhysicsEvent::JointBroken { .. })));
    let y = world.body(bob).unwrap().position().y;
    assert!((y - 3.0).abs() < 0.01, "bob drifted to {y}");
}

#[test]
fn test_connected_bodies_skip_collision_unless_requested() {
    let config = WorldConfig::default().with_gravity(Vec2::ZERO);

    for collide_connected in [false, true] {
        let mut world = world_with(config.clone());
        let a = add_box(&mut world, Vec2::ZERO);
        let b = add_box(&mut world, Vec2::new(0.5, 0.0));
        let params = {
            let (body_a, body_b) = (world.body(a).unwrap(), world.body(b).unwrap());
            JointParams::Revolute(RevoluteJointDef::new(body_a, body_b, Vec2::new(0.25, 0.0)))
        };
        world
            .create_joint(JointDef::new(a, b, params).with_collide_connected(collide_connected))
            .unwrap();

        world.step();

        let touching = world.contacts().filter(|(_, c)| c.is_touching()).count();
        assert_eq!(touching, usize::from(collide_connected));
    }
}

#[test]
fn test_filtered_fixtures_pass_through() {
    let mut world = world_with(WorldConfig::default());
    let ground = world.create_body(BodyDef::fixed(Vec2::new(0.0, -0.5))).unwrap();
    world
        .create_fixture(
            ground,
            FixtureDef::new(Shape::cuboid(20.0, 0.5).unwrap()).with_filter(1, 1),
        )
        .unwrap();
    let ghost = world.create_body(BodyDef::dynamic(Vec2::new(0.0, 1.0))).unwrap();
    world
        .create_fixture(
            ghost,
            FixtureDef::new(Shape::cuboid(0.5, 0.5).unwrap()).with_filter(2, 2),
        )
        .unwrap();

    for _ in 0..90 {
        world.step();
    }

    assert_eq!(world.contact_count(), 0);
    assert!(world.body(ghost).unwrap().position().y < -1.0);
}

#[test]
fn test_disabled_contact_stops_supporting() {
    let mut world = world_with(WorldConfig::default().with_allow_sleep(false));
    add_ground(&mut world);
    let body = add_box(&mut world, Vec2::new(0.0, 0.5));
    for _ in 0..10 {
        world.step();
    }
    let contacts = world.contacts_of(body).unwrap();
    assert_eq!(contacts.len(), 1);

    world.set_contact_enabled(contacts[0], false).unwrap();
    for _ in 0..60 {
        world.step();
    }

    assert!(world.body(body).unwrap().position().y < 0.0);
}

#[test]
fn test_destroying_touching_body_ends_contact() {
    let mut world = world_with(WorldConfig::default());
    let ground = add_ground(&mut world);
    let body = add_box(&mut world, Vec2::new(0.0, 0.5));
    for _ in 0..5 {
        world.step();
    }
    world.drain_events();

    world.destroy_body(body).unwrap();

    let events = world.drain_events();
    assert!(events.iter().any(|event| matches!(
        event,
        PhysicsEvent::EndTouch { body_a, body_b, .. }
            if BTreeSet::from([*body_a, *body_b]) == BTreeSet::from([ground, body])
    )));
    assert_eq!(world.contact_count(), 0);
    assert!(world.contacts_of(ground).unwrap().is_empty());
}

#[test]
fn test_warm_starting_never_worse_than_cold() {
    let build = || {
        let mut world = world_with(WorldConfig::default().with_allow_sleep(false));
        add_ground(&mut world);
        for level in 0..3 {
            add_box(&mut world, Vec2::new(0.0, 0.5 + level as f64));
        }
        for _ in 0..120 {
            world.step();
        }
        world
    };
    let mut warm = build();
    let mut cold = build();
    let config = cold.config().clone().with_warm_starting(false);
    cold.set_config(config).unwrap();

    warm.step();
    cold.step();

    let (warm, cold) = (warm.solver_stats(), cold.solver_stats());
    assert_eq!(warm.contacts, cold.contacts);
    assert!(warm.contacts >= 3);
    assert!(
        warm.velocity_residual <= cold.velocity_residual + 1e-9,
        "warm {} vs cold {}",
        warm.velocity_residual,
        cold.velocity_residual
    );
}

#[test]
fn test_islands_partition_awake_dynamic_bodies() {
    let mut world = world_with(WorldConfig::default());
    add_ground(&mut world);
    let mut dynamic = BTreeSet::new();
    for column in 0..4 {
        for level in 0..(column + 1) {
            let position = Vec2::new(column as f64 * 3.0, 0.5 + level as f64);
            dynamic.insert(add_box(&mut world, position));
        }
    }
    // One body that never touches anything
    dynamic.insert(add_box(&mut world, Vec2::new(-30.0, 10.0)));

    for tick in 0..400 {
        world.step();

        let mut seen = BTreeSet::new();
        for island in world.islands() {
            assert!(!island.is_empty());
            for handle in island {
                assert!(seen.insert(*handle), "{handle:?} appears in two islands");
            }
        }
        assert!(seen.is_subset(&dynamic));

        let awake: BTreeSet<_> = world
            .bodies()
            .filter(|(_, body)| body.body_type() == BodyType::Dynamic && body.is_awake())
            .map(|(handle, _)| handle)
            .collect();
        assert!(awake.is_subset(&seen), "awake body missing from islands");
        if tick == 0 {
            assert_eq!(seen, dynamic);
            // Four separate stacks plus the lone body
            assert_eq!(world.islands().len(), 5);
        }
    }
}

struct Hover;

impl ForceProvider for Hover {
    fn compute_force(&self, _handle: BodyHandle, body: &Body) -> Option<Force> {
        Some(Force::linear(Vec2::new(0.0, 9.81 * body.mass())))
    }

    fn name(&self) -> &str {
        "hover"
    }
}

#[test]
fn test_force_provider_balances_gravity() {
    let mut world = world_with(WorldConfig::default());
    let body = add_box(&mut world, Vec2::new(0.0, 10.0));
    let fixed = world.create_body(BodyDef::fixed(Vec2::ZERO)).unwrap();
    world.add_force_provider(Box::new(Hover));

    for _ in 0..120 {
        world.step();
    }

    let state = world.body(body).unwrap();
    assert!((state.position().y - 10.0).abs() < 1e-9);
    assert_eq!(world.body(fixed).unwrap().position(), Vec2::ZERO);
}

struct Push(Vec2);

impl ForceProvider for Push {
    fn compute_force(&self, _handle: BodyHandle, _body: &Body) -> Option<Force> {
        Some(Force::linear(self.0))
    }

    fn name(&self) -> &str {
        "push"
    }
}

#[test]
fn test_provider_force_wakes_sleeping_body() {
    let mut world = world_with(WorldConfig::default());
    add_ground(&mut world);
    let body = add_box(&mut world, Vec2::new(0.0, 0.5));
    assert!(step_until_asleep(&mut world, body, 600));
    let x0 = world.body(body).unwrap().position().x;

    world.add_force_provider(Box::new(Push(Vec2::new(1000.0, 0.0))));
    world.step();
    assert!(world.body(body).unwrap().is_awake());
    assert_eq!(world.islands(), &[vec![body]]);

    for _ in 0..119 {
        world.step();
    }
    let x = world.body(body).unwrap().position().x;
    assert!(x > x0 + 1.0, "pushed body only reached x = {x}");
}

#[test]
fn test_zero_provider_force_leaves_body_asleep() {
    let mut world = world_with(WorldConfig::default());
    add_ground(&mut world);
    let body = add_box(&mut world, Vec2::new(0.0, 0.5));
    assert!(step_until_asleep(&mut world, body, 600));
    let before = world.body(body).unwrap().transform();

    world.add_force_provider(Box::new(Push(Vec2::ZERO)));
    for _ in 0..60 {
        world.step();
    }

    assert!(!world.body(body).unwrap().is_awake());
    assert!(world.islands().is_empty());
    assert_eq!(world.body(body).unwrap().transform(), before);
}
