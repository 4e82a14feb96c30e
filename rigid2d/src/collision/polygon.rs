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
//! Polygon-polygon manifolds by separating axes and incident edge clipping

use super::{clip_segment_to_line, ClipVertex, ContactId, FeatureType, Manifold, ManifoldType};
use crate::config::settings::LINEAR_SLOP;
use crate::math::Transform;
use crate::shape::Polygon;

/// Face of `poly1` with the largest separation from `poly2`
fn find_max_separation(
    poly1: &Polygon,
    xf1: &Transform,
    poly2: &Polygon,
    xf2: &Transform,
) -> (usize, f64) {
    let n1s = poly1.normals();
    let v1s = poly1.vertices();
    let v2s = poly2.vertices();

    let mut best_index = 0;
    let mut max_separation = f64::MIN;
    for i in 0..poly1.count() {
        // Work in poly2's frame
        let n = xf2.q.apply_inv(xf1.q.apply(n1s[i]));
        let v1 = xf2.apply_inv(xf1.apply(v1s[i]));

        let mut si = f64::MAX;
        for v2 in v2s {
            let sij = n.dot(*v2 - v1);
            if sij < si {
                si = sij;
            }
        }

        if si > max_separation {
            max_separation = si;
            best_index = i;
        }
    }
    (best_index, max_separation)
}

/// Edge of `poly2` most anti-parallel to reference face `edge1` of `poly1`
fn find_incident_edge(
    poly1: &Polygon,
    xf1: &Transform,
    edge1: usize,
    poly2: &Polygon,
    xf2: &Transform,
) -> [ClipVertex; 2] {
    let normal1 = xf2.q.apply_inv(xf1.q.apply(poly1.normals()[edge1]));
    let normals2 = poly2.normals();
    let vertices2 = poly2.vertices();
    let count2 = poly2.count();

    let mut index = 0;
    let mut min_dot = f64::MAX;
    for (i, n) in normals2.iter().enumerate() {
        let dot = normal1.dot(*n);
        if dot < min_dot {
            min_dot = dot;
            index = i;
        }
    }

    let i1 = index;
    let i2 = (i1 + 1) % count2;
    [
        ClipVertex {
            v: xf2.apply(vertices2[i1]),
            id: ContactId {
                index_a: edge1 as u8,
                index_b: i1 as u8,
                type_a: FeatureType::Face,
                type_b: FeatureType::Vertex,
            },
        },
        ClipVertex {
            v: xf2.apply(vertices2[i2]),
            id: ContactId {
                index_a: edge1 as u8,
                index_b: i2 as u8,
                type_a: FeatureType::Face,
                type_b: FeatureType::Vertex,
            },
        },
    ]
}

/// Manifold between two convex polygons
///
/// The reference face is the one with the largest separation; ties within
/// a tenth of the linear slop go to A so the choice does not flicker
/// between ticks.
pub fn collide_polygons(
    poly_a: &Polygon,
    xf_a: &Transform,
    poly_b: &Polygon,
    xf_b: &Transform,
) -> Manifold {
    let mut manifold = Manifold::default();
    let total_radius = poly_a.radius() + poly_b.radius();

    let (edge_a, separation_a) = find_max_separation(poly_a, xf_a, poly_b, xf_b);
    if separation_a > total_radius {
        return manifold;
    }
    let (edge_b, separation_b) = find_max_separation(poly_b, xf_b, poly_a, xf_a);
    if separation_b > total_radius {
        return manifold;
    }

    let tolerance = 0.1 * LINEAR_SLOP;
    let (poly1, xf1, poly2, xf2, edge1, flip) = if separation_b > separation_a + tolerance {
        manifold.kind = ManifoldType::FaceB;
        (poly_b, xf_b, poly_a, xf_a, edge_b, true)
    } else {
        manifold.kind = ManifoldType::FaceA;
        (poly_a, xf_a, poly_b, xf_b, edge_a, false)
    };

    let incident = find_incident_edge(poly1, xf1, edge1, poly2, xf2);

    let count1 = poly1.count();
    let iv1 = edge1;
    let iv2 = (edge1 + 1) % count1;
    let mut v11 = poly1.vertices()[iv1];
    let mut v12 = poly1.vertices()[iv2];

    let local_tangent = (v12 - v11).normalize();
    let local_normal = local_tangent.cross_scalar(1.0);
    let plane_point = (v11 + v12) * 0.5;

    let tangent = xf1.q.apply(local_tangent);
    let normal = tangent.cross_scalar(1.0);

    v11 = xf1.apply(v11);
    v12 = xf1.apply(v12);

    let front_offset = normal.dot(v11);
    let side_offset1 = -tangent.dot(v11) + total_radius;
    let side_offset2 = tangent.dot(v12) + total_radius;

    let (clip1, n1) = clip_segment_to_line(&incident, -tangent, side_offset1, iv1 as u8);
    if n1 < 2 {
        return manifold;
    }
    let (clip2, n2) = clip_segment_to_line(&clip1, tangent, side_offset2, iv2 as u8);
    if n2 < 2 {
        return manifold;
    }

    manifold.local_normal = local_normal;
    manifold.local_point = plane_point;

    for cv in &clip2 {
        let separation = normal.dot(cv.v) - front_offset;
        if separation <= total_radius {
            let id = if flip { cv.id.flipped() } else { cv.id };
            manifold.push(xf2.apply_inv(cv.v), id);
        }
    }
    manifold
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vec2;

    #[test]
    fn test_separated_boxes_have_no_points() {
        let a = Polygon::new_box(1.0, 1.0).unwrap();
        let b = Polygon::new_box(1.0, 1.0).unwrap();
        let m = collide_polygons(
            &a,
            &Transform::IDENTITY,
            &b,
            &Transform::new(Vec2::new(2.1, 0.0), 0.0),
        );
        assert_eq!(m.point_count, 0);
    }

    #[test]
    fn test_stacked_boxes_produce_two_points() {
        let a = Polygon::new_box(2.0, 0.5).unwrap();
        let b = Polygon::new_box(0.5, 0.5).unwrap();
        let m = collide_polygons(
            &a,
            &Transform::IDENTITY,
            &b,
            &Transform::new(Vec2::new(0.3, 0.99), 0.0),
        );
        assert_eq!(m.point_count, 2);
        assert_eq!(m.kind, ManifoldType::FaceA);
        assert_ne!(m.points[0].id.key(), m.points[1].id.key());
    }

    #[test]
    fn test_rotated_box_corner_contact() {
        let a = Polygon::new_box(2.0, 0.5).unwrap();
        let b = Polygon::new_box(0.5, 0.5).unwrap();
        let corner_depth = 0.5 * std::f64::consts::SQRT_2;
        let m = collide_polygons(
            &a,
            &Transform::IDENTITY,
            &b,
            &Transform::new(Vec2::new(0.0, 0.5 + corner_depth - 0.01), std::f64::consts::FRAC_PI_4),
        );
        assert_eq!(m.point_count, 1);
    }

    #[test]
    fn test_ids_stable_under_small_motion() {
        let a = Polygon::new_box(2.0, 0.5).unwrap();
        let b = Polygon::new_box(0.5, 0.5).unwrap();
        let m1 = collide_polygons(
            &a,
            &Transform::IDENTITY,
            &b,
            &Transform::new(Vec2::new(0.0, 0.99), 0.0),
        );
        let m2 = collide_polygons(
            &a,
            &Transform::IDENTITY,
            &b,
            &Transform::new(Vec2::new(0.01, 0.985), 0.001),
        );
        let keys1: Vec<u32> = m1.active_points().iter().map(|p| p.id.key()).collect();
        let keys2: Vec<u32> = m2.active_points().iter().map(|p| p.id.key()).collect();
        assert_eq!(keys1, keys2);
    }
}
