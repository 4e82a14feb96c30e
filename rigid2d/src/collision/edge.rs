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
//! Edge manifolds
//!
//! Edges are two-sided. Against polygons the edge is treated as a
//! degenerate two-vertex polygon so it shares the clipping path.

use super::{collide_polygons, ContactId, FeatureType, Manifold, ManifoldType};
use crate::config::settings::POLYGON_RADIUS;
use crate::math::{Transform, Vec2};
use crate::shape::{Circle, Edge, Polygon};

/// Manifold between an edge (A) and a circle (B)
pub fn collide_edge_and_circle(
    edge: &Edge,
    xf_a: &Transform,
    circle: &Circle,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // Circle centre in the edge's frame
    let q = xf_a.apply_inv(xf_b.apply(circle.center));
    let a = edge.v1;
    let b = edge.v2;
    let e = b - a;

    // Barycentric coordinates of q along the segment
    let u = e.dot(b - q);
    let v = e.dot(q - a);

    let radius = POLYGON_RADIUS + circle.radius;

    let vertex_contact = |manifold: &mut Manifold, p: Vec2, index: u8| {
        if q.distance_squared(p) > radius * radius {
            return;
        }
        manifold.kind = ManifoldType::Circles;
        manifold.local_normal = Vec2::ZERO;
        manifold.local_point = p;
        manifold.push(
            circle.center,
            ContactId {
                index_a: index,
                index_b: 0,
                type_a: FeatureType::Vertex,
                type_b: FeatureType::Vertex,
            },
        );
    };

    if v <= 0.0 {
        vertex_contact(&mut manifold, a, 0);
        return manifold;
    }
    if u <= 0.0 {
        vertex_contact(&mut manifold, b, 1);
        return manifold;
    }

    let den = e.dot(e);
    let p = (a * u + b * v) * (1.0 / den);
    if q.distance_squared(p) > radius * radius {
        return manifold;
    }

    let mut n = Vec2::new(-e.y, e.x);
    if n.dot(q - a) < 0.0 {
        n = -n;
    }

    manifold.kind = ManifoldType::FaceA;
    manifold.local_normal = n.normalize();
    manifold.local_point = a;
    manifold.push(
        circle.center,
        ContactId {
            index_a: 0,
            index_b: 0,
            type_a: FeatureType::Face,
            type_b: FeatureType::Vertex,
        },
    );
    manifold
}

/// Manifold between an edge (A) and a polygon (B)
pub fn collide_edge_and_polygon(
    edge: &Edge,
    xf_a: &Transform,
    polygon: &Polygon,
    xf_b: &Transform,
) -> Manifold {
    let as_polygon = Polygon::from_edge(edge);
    collide_polygons(&as_polygon, xf_a, polygon, xf_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::WorldManifold;

    fn ground() -> Edge {
        Edge::new(Vec2::new(-5.0, 0.0), Vec2::new(5.0, 0.0)).unwrap()
    }

    #[test]
    fn test_circle_on_edge_interior() {
        let ball = Circle::new(Vec2::ZERO, 0.5).unwrap();
        let xf_b = Transform::new(Vec2::new(1.0, 0.49), 0.0);
        let m = collide_edge_and_circle(&ground(), &Transform::IDENTITY, &ball, &xf_b);
        assert_eq!(m.point_count, 1);
        assert_eq!(m.kind, ManifoldType::FaceA);
        assert_eq!(m.local_normal, Vec2::new(0.0, 1.0));

        // Below the edge the normal flips
        let xf_b = Transform::new(Vec2::new(1.0, -0.49), 0.0);
        let m = collide_edge_and_circle(&ground(), &Transform::IDENTITY, &ball, &xf_b);
        assert_eq!(m.local_normal, Vec2::new(0.0, -1.0));
    }

    #[test]
    fn test_circle_at_edge_end() {
        let ball = Circle::new(Vec2::ZERO, 0.5).unwrap();
        let xf_b = Transform::new(Vec2::new(5.3, 0.2), 0.0);
        let m = collide_edge_and_circle(&ground(), &Transform::IDENTITY, &ball, &xf_b);
        assert_eq!(m.point_count, 1);
        assert_eq!(m.kind, ManifoldType::Circles);
        assert_eq!(m.points[0].id.index_a, 1);

        let far = Transform::new(Vec2::new(6.0, 0.0), 0.0);
        let m = collide_edge_and_circle(&ground(), &Transform::IDENTITY, &ball, &far);
        assert_eq!(m.point_count, 0);
    }

    #[test]
    fn test_box_resting_on_edge() {
        let square = Polygon::new_box(0.5, 0.5).unwrap();
        let xf_b = Transform::new(Vec2::new(0.0, 0.5), 0.0);
        let m = collide_edge_and_polygon(&ground(), &Transform::IDENTITY, &square, &xf_b);
        assert_eq!(m.point_count, 2);

        let wm = WorldManifold::new(&m, &Transform::IDENTITY, POLYGON_RADIUS, &xf_b, square.radius());
        assert!(wm.normal.y.abs() > 0.99);
        // Normal points from the edge towards the box
        assert!(wm.normal.y > 0.0);
    }
}
