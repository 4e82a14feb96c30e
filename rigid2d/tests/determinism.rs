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
//! Determinism tests
//!
//! Two worlds built from the same calls must evolve bit for bit the same,
//! whether or not islands are solved in parallel.

use rigid2d::{
    BodyDef, BodyHandle, FixtureDef, JointDef, JointParams, PhysicsEvent, PhysicsWorld,
    RevoluteJointDef, Shape, Transform, Vec2, WorldConfig,
};

struct Scene {
    world: PhysicsWorld,
    bodies: Vec<BodyHandle>,
}

/// Two pyramids, a chain hanging from a static pin and a few circles
fn build_scene() -> Scene {
    let mut world = PhysicsWorld::new(WorldConfig::default()).unwrap();
    let mut bodies = Vec::new();

    let ground = world.create_body(BodyDef::fixed(Vec2::new(0.0, -0.5))).unwrap();
    world
        .create_fixture(ground, FixtureDef::new(Shape::cuboid(40.0, 0.5).unwrap()))
        .unwrap();

    for base_x in [-8.0, 8.0] {
        for row in 0..6 {
            for column in 0..(6 - row) {
                let x = base_x + (column as f64 - (5 - row) as f64 * 0.5) * 1.05;
                let y = 0.5 + row as f64 * 1.0;
                let body = world.create_body(BodyDef::dynamic(Vec2::new(x, y))).unwrap();
                world
                    .create_fixture(
                        body,
                        FixtureDef::new(Shape::cuboid(0.5, 0.5).unwrap()).with_friction(0.6),
                    )
                    .unwrap();
                bodies.push(body);
            }
        }
    }

    let pin = world.create_body(BodyDef::fixed(Vec2::new(0.0, 12.0))).unwrap();
    let mut previous = pin;
    for link in 0..8 {
        let position = Vec2::new(0.5 + link as f64, 12.0);
        let body = world.create_body(BodyDef::dynamic(position)).unwrap();
        world
            .create_fixture(body, FixtureDef::new(Shape::cuboid(0.5, 0.1).unwrap()))
            .unwrap();
        let params = {
            let (a, b) = (world.body(previous).unwrap(), world.body(body).unwrap());
            JointParams::Revolute(RevoluteJointDef::new(a, b, Vec2::new(link as f64, 12.0)))
        };
        world.create_joint(JointDef::new(previous, body, params)).unwrap();
        bodies.push(body);
        previous = body;
    }

    for i in 0..6 {
        let position = Vec2::new(-3.0 + i as f64 * 1.2, 15.0 + i as f64 * 0.3);
        let body = world.create_body(BodyDef::dynamic(position)).unwrap();
        world
            .create_fixture(
                body,
                FixtureDef::new(Shape::circle(0.4).unwrap()).with_restitution(0.3),
            )
            .unwrap();
        bodies.push(body);
    }

    Scene { world, bodies }
}

fn snapshot(scene: &Scene) -> Vec<(Transform, Vec2, f64, bool)> {
    scene
        .bodies
        .iter()
        .map(|&handle| {
            let body = scene.world.body(handle).unwrap();
            (
                body.transform(),
                body.linear_velocity(),
                body.angular_velocity(),
                body.is_awake(),
            )
        })
        .collect()
}

#[test]
fn test_identical_worlds_stay_identical() {
    let mut first = build_scene();
    let mut second = build_scene();

    for tick in 0..600 {
        first.world.step();
        second.world.step();

        // Exact equality: any divergence at all is a failure
        assert_eq!(snapshot(&first), snapshot(&second), "diverged at tick {tick}");
        assert_eq!(first.world.drain_events(), second.world.drain_events());
        assert_eq!(first.world.islands(), second.world.islands());
    }
}

#[test]
fn test_scene_events_are_ordered_consistently() {
    let mut scene = build_scene();
    let mut begin = 0usize;
    let mut end = 0usize;
    for _ in 0..300 {
        scene.world.step();
        for event in scene.world.drain_events() {
            match event {
                PhysicsEvent::BeginTouch { .. } => begin += 1,
                PhysicsEvent::EndTouch { .. } => end += 1,
                _ => {}
            }
        }
    }
    // Every end is preceded by a begin, and live touching contacts account
    // for the difference
    let touching = scene.world.contacts().filter(|(_, c)| c.is_touching()).count();
    assert!(begin >= end);
    assert_eq!(begin - end, touching);
}
