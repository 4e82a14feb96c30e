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
//! Pendulum example
//!
//! A revolute-jointed chain swings from a static pin. A breakable distance
//! joint holds a weight on the end of the chain; its break is reported
//! through the event queue. The chain's mechanical energy is printed as it
//! swings so solver damping is visible.

use rigid2d::{
    BodyDef, BodyHandle, DistanceJointDef, FixtureDef, JointDef, JointParams, PhysicsEvent,
    PhysicsWorld, RevoluteJointDef, Shape, Vec2, WorldConfig,
};
use tracing_subscriber::EnvFilter;

const LINKS: usize = 6;

fn energy(world: &PhysicsWorld, bodies: &[BodyHandle], gravity: f64) -> rigid2d::Result<f64> {
    let mut total = 0.0;
    for &handle in bodies {
        let body = world.body(handle)?;
        let v = body.linear_velocity();
        let w = body.angular_velocity();
        total += 0.5 * body.mass() * v.dot(v)
            + 0.5 * body.inertia() * w * w
            + body.mass() * gravity * body.world_center().y;
    }
    Ok(total)
}

fn main() -> rigid2d::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("rigid2d - Pendulum Example");
    println!("==========================\n");

    let config = WorldConfig::default();
    let gravity = -config.gravity.y;
    let mut world = PhysicsWorld::new(config)?;

    let pin = world.create_body(BodyDef::fixed(Vec2::new(0.0, 10.0)))?;
    let mut links = Vec::with_capacity(LINKS);
    let mut previous = pin;
    for i in 0..LINKS {
        let body = world.create_body(BodyDef::dynamic(Vec2::new(0.5 + i as f64, 10.0)))?;
        world.create_fixture(body, FixtureDef::new(Shape::cuboid(0.5, 0.1)?).with_density(2.0))?;
        let params = {
            let anchor = Vec2::new(i as f64, 10.0);
            let (a, b) = (world.body(previous)?, world.body(body)?);
            JointParams::Revolute(RevoluteJointDef::new(a, b, anchor))
        };
        world.create_joint(JointDef::new(previous, body, params))?;
        links.push(body);
        previous = body;
    }

    // A heavy weight on a breakable rope at the end of the chain
    let weight = world.create_body(BodyDef::dynamic(Vec2::new(LINKS as f64 + 1.0, 10.0)))?;
    world.create_fixture(weight, FixtureDef::new(Shape::circle(0.4)?).with_density(8.0))?;
    let rope = {
        let (a, b) = (world.body(previous)?, world.body(weight)?);
        let params = DistanceJointDef::new(a, b, Vec2::new(LINKS as f64, 10.0), b.world_center());
        JointDef::new(previous, weight, JointParams::Distance(params)).with_max_force(400.0)
    };
    let rope = world.create_joint(rope)?;
    println!(
        "Chain of {} links, weight of {:.1} kg on joint {:?}\n",
        LINKS,
        world.body(weight)?.mass(),
        rope
    );

    let start = energy(&world, &links, gravity)?;
    for tick in 1..=600 {
        world.step();

        for event in world.drain_events() {
            if let PhysicsEvent::JointBroken { joint, force, .. } = event {
                println!("  tick {:>3}: joint {:?} broke under {:.1} N", tick, joint, force);
            }
        }

        if tick % 60 == 0 {
            let tip = world.body(links[LINKS - 1])?.world_center();
            println!(
                "  t = {:>4.1}s  tip ({:>6.2}, {:>6.2})  chain energy {:>8.2} J",
                tick as f64 / 60.0,
                tip.x,
                tip.y,
                energy(&world, &links, gravity)? - start
            );
        }
    }

    println!(
        "\nRope {} after 10 s",
        if world.joint(rope).is_ok() { "held" } else { "snapped" }
    );
    Ok(())
}
