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
//! Circle-circle and polygon-circle manifolds

use super::{ContactId, Manifold, ManifoldType};
use crate::math::{Transform, Vec2};
use crate::shape::{Circle, Polygon};

/// Manifold between two circles
///
/// The circles touch only when the centre distance is strictly less than
/// the sum of the radii.
pub fn collide_circles(a: &Circle, xf_a: &Transform, b: &Circle, xf_b: &Transform) -> Manifold {
    let mut manifold = Manifold::default();

    let p_a = xf_a.apply(a.center);
    let p_b = xf_b.apply(b.center);
    let radius = a.radius + b.radius;
    if p_a.distance_squared(p_b) >= radius * radius {
        return manifold;
    }

    manifold.kind = ManifoldType::Circles;
    manifold.local_point = a.center;
    manifold.local_normal = Vec2::ZERO;
    manifold.push(b.center, ContactId::default());
    manifold
}

/// Manifold between a polygon (A) and a circle (B)
pub fn collide_polygon_and_circle(
    polygon: &Polygon,
    xf_a: &Transform,
    circle: &Circle,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();

    // Circle centre in the polygon's frame
    let c = xf_a.apply_inv(xf_b.apply(circle.center));

    let radius = polygon.radius() + circle.radius;
    let vertices = polygon.vertices();
    let normals = polygon.normals();
    let count = polygon.count();

    let mut normal_index = 0;
    let mut separation = f64::MIN;
    for i in 0..count {
        let s = normals[i].dot(c - vertices[i]);
        if s > radius {
            return manifold;
        }
        if s > separation {
            separation = s;
            normal_index = i;
        }
    }

    let v1 = vertices[normal_index];
    let v2 = vertices[(normal_index + 1) % count];

    manifold.kind = ManifoldType::FaceA;

    // Centre inside the polygon
    if separation < f64::EPSILON {
        manifold.local_normal = normals[normal_index];
        manifold.local_point = (v1 + v2) * 0.5;
        manifold.push(circle.center, ContactId::default());
        return manifold;
    }

    let u1 = (c - v1).dot(v2 - v1);
    let u2 = (c - v2).dot(v1 - v2);
    if u1 <= 0.0 {
        if c.distance_squared(v1) > radius * radius {
            return manifold;
        }
        manifold.local_normal = (c - v1).normalize();
        manifold.local_point = v1;
    } else if u2 <= 0.0 {
        if c.distance_squared(v2) > radius * radius {
            return manifold;
        }
        manifold.local_normal = (c - v2).normalize();
        manifold.local_point = v2;
    } else {
        let face_center = (v1 + v2) * 0.5;
        if (c - face_center).dot(normals[normal_index]) > radius {
            return manifold;
        }
        manifold.local_normal = normals[normal_index];
        manifold.local_point = face_center;
    }
    manifold.push(circle.center, ContactId::default());
    manifold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::WorldManifold;

    fn circle(r: f64) -> Circle {
        Circle::new(Vec2::ZERO, r).unwrap()
    }

    #[test]
    fn test_circles_touch_iff_closer_than_radii() {
        let a = circle(1.0);
        let b = circle(0.5);
        let xf_a = Transform::IDENTITY;

        for (d, touching) in [(1.49, true), (1.5, false), (1.51, false), (0.2, true)] {
            let xf_b = Transform::new(Vec2::new(0.0, d), 0.0);
            let m = collide_circles(&a, &xf_a, &b, &xf_b);
            assert_eq!(m.point_count == 1, touching, "distance {}", d);
        }
    }

    #[test]
    fn test_circle_normal_points_from_a_to_b() {
        let a = circle(1.0);
        let b = circle(1.0);
        let xf_a = Transform::new(Vec2::new(1.0, 1.0), 0.4);
        let xf_b = Transform::new(Vec2::new(2.2, 2.5), -1.0);
        let m = collide_circles(&a, &xf_a, &b, &xf_b);
        assert_eq!(m.point_count, 1);

        let wm = WorldManifold::new(&m, &xf_a, a.radius, &xf_b, b.radius);
        let d = Vec2::new(2.2, 2.5) - Vec2::new(1.0, 1.0);
        assert!((wm.normal - d.normalize()).length() < 1e-12);
        assert!((wm.normal.length() - 1.0).abs() < 1e-12);
        assert!((wm.separations[0] - (d.length() - 2.0)).abs() < 1e-12);
    }

    #[test]
    fn test_polygon_circle_regions() {
        let square = Polygon::new_box(1.0, 1.0).unwrap();
        let ball = circle(0.5);
        let xf_a = Transform::IDENTITY;

        // Face region
        let m = collide_polygon_and_circle(
            &square,
            &xf_a,
            &ball,
            &Transform::new(Vec2::new(0.0, 1.4), 0.0),
        );
        assert_eq!(m.point_count, 1);
        assert_eq!(m.local_normal, Vec2::new(0.0, 1.0));

        // Vertex region
        let m = collide_polygon_and_circle(
            &square,
            &xf_a,
            &ball,
            &Transform::new(Vec2::new(1.3, 1.3), 0.0),
        );
        assert_eq!(m.point_count, 1);
        let n = m.local_normal;
        assert!((n.x - n.y).abs() < 1e-12 && n.x > 0.0);

        // Just outside the corner
        let m = collide_polygon_and_circle(
            &square,
            &xf_a,
            &ball,
            &Transform::new(Vec2::new(1.45, 1.45), 0.0),
        );
        assert_eq!(m.point_count, 0);

        // Deep inside
        let m = collide_polygon_and_circle(&square, &xf_a, &ball, &Transform::IDENTITY);
        assert_eq!(m.point_count, 1);
    }
}
