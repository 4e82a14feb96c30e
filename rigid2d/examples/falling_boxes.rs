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
//! Falling boxes example
//!
//! Drops a handful of boxes and circles onto the ground, prints their
//! resting positions and reports contact events and sleeping as they happen.
//!
//! Run with `RUST_LOG=rigid2d=debug` to see the engine's own log output.

use rigid2d::{
    BodyDef, BodyHandle, FixtureDef, PhysicsEvent, PhysicsWorld, Shape, Vec2, WorldConfig,
};
use tracing_subscriber::EnvFilter;

fn main() -> rigid2d::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("rigid2d - Falling Boxes Example");
    println!("===============================\n");

    let mut world = PhysicsWorld::new(WorldConfig::default())?;

    let ground = world.create_body(BodyDef::fixed(Vec2::new(0.0, -0.5)))?;
    world.create_fixture(ground, FixtureDef::new(Shape::cuboid(25.0, 0.5)?))?;

    let mut bodies: Vec<(String, BodyHandle)> = Vec::new();
    for i in 0..5 {
        let position = Vec2::new(i as f64 * 0.3 - 0.6, 2.0 + i as f64 * 1.5);
        let body = world.create_body(BodyDef::dynamic(position).with_angle(i as f64 * 0.2))?;
        world.create_fixture(
            body,
            FixtureDef::new(Shape::cuboid(0.5, 0.5)?).with_friction(0.6),
        )?;
        bodies.push((format!("box {}", i), body));
    }
    for i in 0..3 {
        let position = Vec2::new(4.0 + i as f64 * 1.1, 3.0 + i as f64);
        let body = world.create_body(BodyDef::dynamic(position))?;
        world.create_fixture(
            body,
            FixtureDef::new(Shape::circle(0.5)?).with_restitution(0.4),
        )?;
        bodies.push((format!("ball {}", i), body));
    }
    println!("Created {} bodies", world.body_count());

    let mut asleep = vec![false; bodies.len()];
    for _ in 0..900 {
        world.step();

        for event in world.drain_events() {
            match event {
                PhysicsEvent::BeginTouch { body_a, body_b, .. } => {
                    println!("  tick {:>3}: {:?} touched {:?}", world.ticks(), body_a, body_b);
                }
                PhysicsEvent::NumericalFault { body } => {
                    println!("  tick {:>3}: numerical fault on {:?}", world.ticks(), body);
                }
                _ => {}
            }
        }

        for (i, (name, handle)) in bodies.iter().enumerate() {
            let awake = world.body(*handle)?.is_awake();
            if !awake && !asleep[i] {
                println!("  tick {:>3}: {} fell asleep", world.ticks(), name);
            }
            asleep[i] = !awake;
        }

        if asleep.iter().all(|&a| a) {
            println!("\nEverything is asleep after {} ticks", world.ticks());
            break;
        }
    }

    println!("\nResting positions:");
    for (name, handle) in &bodies {
        let body = world.body(*handle)?;
        println!(
            "  {:<7} at ({:>6.3}, {:>6.3}), angle {:>6.3}",
            name,
            body.position().x,
            body.position().y,
            body.angle()
        );
    }

    let stats = world.solver_stats();
    println!(
        "\nLast tick solved {} islands, {} bodies, {} contacts",
        stats.islands, stats.bodies, stats.contacts
    );
    Ok(())
}
