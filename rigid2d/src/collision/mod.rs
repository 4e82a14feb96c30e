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
//! Narrow phase: exact contact manifolds between pairs of shapes
//!
//! [`collide`] dispatches on the shape kinds. Callers are expected to pass
//! the lower-ranked shape (see [`ShapeKind`]) as `A`; pairs given the other
//! way round are swapped and the result is expressed from the lower rank's
//! point of view, which is what contacts store.
//!
//! Manifolds are expressed in the local frames of the two shapes so they
//! survive small motions, and every point carries a [`ContactId`] naming the
//! features that produced it. The contact solver matches points by id from
//! one tick to the next to carry accumulated impulses forward.

mod circle;
mod edge;
mod polygon;

pub use circle::{collide_circles, collide_polygon_and_circle};
pub use edge::{collide_edge_and_circle, collide_edge_and_polygon};
pub use polygon::collide_polygons;

use crate::math::{Transform, Vec2};
use crate::shape::{Shape, ShapeKind};

/// Whether a feature is a vertex or a face
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum FeatureType {
    /// A polygon vertex, circle centre or edge endpoint
    #[default]
    Vertex = 0,
    /// A polygon face or edge interior
    Face = 1,
}

/// Identifies the pair of features that produced a manifold point
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ContactId {
    /// Feature index on shape A
    pub index_a: u8,
    /// Feature index on shape B
    pub index_b: u8,
    /// Feature type on shape A
    pub type_a: FeatureType,
    /// Feature type on shape B
    pub type_b: FeatureType,
}

impl ContactId {
    /// Pack the id into a single integer for matching
    pub fn key(&self) -> u32 {
        u32::from(self.index_a)
            | u32::from(self.index_b) << 8
            | (self.type_a as u32) << 16
            | (self.type_b as u32) << 24
    }

    pub(crate) fn flipped(self) -> ContactId {
        ContactId {
            index_a: self.index_b,
            index_b: self.index_a,
            type_a: self.type_b,
            type_b: self.type_a,
        }
    }
}

/// Reference frame of a manifold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManifoldType {
    /// Point-to-point; the normal is recomputed from the two points
    #[default]
    Circles,
    /// Reference face on shape A
    FaceA,
    /// Reference face on shape B
    FaceB,
}

/// A single contact point
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ManifoldPoint {
    /// Point in the local frame of the incident shape (see [`ManifoldType`])
    pub local_point: Vec2,
    /// Accumulated normal impulse from the solver
    pub normal_impulse: f64,
    /// Accumulated friction impulse from the solver
    pub tangent_impulse: f64,
    /// Feature pair that produced the point
    pub id: ContactId,
}

/// Contact points between two shapes
///
/// Only the first `point_count` entries of `points` are meaningful.
#[derive(Debug, PartialEq, Default)]
pub struct Manifold {
    /// Contact points
    pub points: [ManifoldPoint; 2],
    /// Reference normal, unused for [`ManifoldType::Circles`]
    pub local_normal: Vec2,
    /// Reference point, meaning depends on the type
    pub local_point: Vec2,
    /// Reference frame
    pub kind: ManifoldType,
    /// Number of active points, 0 to 2
    pub point_count: usize,
}

impl Clone for Manifold {
    fn clone(&self) -> Self {
        // Inactive slots are never carried over
        let mut points = [ManifoldPoint::default(); 2];
        points[..self.point_count].copy_from_slice(&self.points[..self.point_count]);
        Manifold {
            points,
            local_normal: self.local_normal,
            local_point: self.local_point,
            kind: self.kind,
            point_count: self.point_count,
        }
    }
}

impl Manifold {
    /// Active points
    pub fn active_points(&self) -> &[ManifoldPoint] {
        &self.points[..self.point_count]
    }

    /// Whether the manifold has any points
    pub fn is_touching(&self) -> bool {
        self.point_count > 0
    }

    /// Copy accumulated impulses from `old` onto points with matching ids
    ///
    /// Points with no match keep zero impulses.
    pub fn match_impulses(&mut self, old: &Manifold) {
        for point in &mut self.points[..self.point_count] {
            point.normal_impulse = 0.0;
            point.tangent_impulse = 0.0;
            let key = point.id.key();
            if let Some(previous) = old.active_points().iter().find(|p| p.id.key() == key) {
                point.normal_impulse = previous.normal_impulse;
                point.tangent_impulse = previous.tangent_impulse;
            }
        }
    }

    pub(crate) fn push(&mut self, local_point: Vec2, id: ContactId) {
        debug_assert!(self.point_count < 2);
        self.points[self.point_count] = ManifoldPoint {
            local_point,
            normal_impulse: 0.0,
            tangent_impulse: 0.0,
            id,
        };
        self.point_count += 1;
    }
}

/// A manifold evaluated in world coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct WorldManifold {
    /// Unit normal pointing from A to B
    pub normal: Vec2,
    /// Mid-surface contact points
    pub points: [Vec2; 2],
    /// Signed separations, negative when overlapping
    pub separations: [f64; 2],
}

impl WorldManifold {
    /// Evaluate `manifold` for the given transforms and skin radii
    pub fn new(
        manifold: &Manifold,
        xf_a: &Transform,
        radius_a: f64,
        xf_b: &Transform,
        radius_b: f64,
    ) -> WorldManifold {
        let mut out = WorldManifold::default();
        if manifold.point_count == 0 {
            return out;
        }

        match manifold.kind {
            ManifoldType::Circles => {
                let point_a = xf_a.apply(manifold.local_point);
                let point_b = xf_b.apply(manifold.points[0].local_point);
                out.normal = Vec2::new(1.0, 0.0);
                if point_a.distance_squared(point_b) > f64::EPSILON * f64::EPSILON {
                    out.normal = (point_b - point_a).normalize();
                }
                let c_a = point_a + out.normal * radius_a;
                let c_b = point_b - out.normal * radius_b;
                out.points[0] = (c_a + c_b) * 0.5;
                out.separations[0] = (c_b - c_a).dot(out.normal);
            }
            ManifoldType::FaceA => {
                out.normal = xf_a.q.apply(manifold.local_normal);
                let plane_point = xf_a.apply(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_b.apply(manifold.points[i].local_point);
                    let c_a = clip_point
                        + out.normal * (radius_a - (clip_point - plane_point).dot(out.normal));
                    let c_b = clip_point - out.normal * radius_b;
                    out.points[i] = (c_a + c_b) * 0.5;
                    out.separations[i] = (c_b - c_a).dot(out.normal);
                }
            }
            ManifoldType::FaceB => {
                let normal = xf_b.q.apply(manifold.local_normal);
                let plane_point = xf_b.apply(manifold.local_point);
                for i in 0..manifold.point_count {
                    let clip_point = xf_a.apply(manifold.points[i].local_point);
                    let c_b =
                        clip_point + normal * (radius_b - (clip_point - plane_point).dot(normal));
                    let c_a = clip_point - normal * radius_a;
                    out.points[i] = (c_a + c_b) * 0.5;
                    out.separations[i] = (c_a - c_b).dot(normal);
                }
                // Always report A -> B
                out.normal = -normal;
            }
        }
        out
    }
}

/// Whether a pair of shape kinds can ever produce contact points
pub fn can_collide(a: ShapeKind, b: ShapeKind) -> bool {
    !(a == ShapeKind::Edge && b == ShapeKind::Edge)
}

/// Compute the manifold between two shapes
///
/// `shape_a` must not rank above `shape_b`; see the module docs.
pub fn collide(shape_a: &Shape, xf_a: &Transform, shape_b: &Shape, xf_b: &Transform) -> Manifold {
    match (shape_a, shape_b) {
        (Shape::Circle(a), Shape::Circle(b)) => collide_circles(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Circle(b)) => collide_polygon_and_circle(a, xf_a, b, xf_b),
        (Shape::Polygon(a), Shape::Polygon(b)) => collide_polygons(a, xf_a, b, xf_b),
        (Shape::Edge(a), Shape::Circle(b)) => collide_edge_and_circle(a, xf_a, b, xf_b),
        (Shape::Edge(a), Shape::Polygon(b)) => collide_edge_and_polygon(a, xf_a, b, xf_b),
        (Shape::Edge(_), Shape::Edge(_)) => Manifold::default(),
        _ => {
            debug_assert!(false, "shape pair passed in the wrong order");
            Manifold::default()
        }
    }
}

/// A clip vertex carrying its feature id
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ClipVertex {
    pub v: Vec2,
    pub id: ContactId,
}

/// Sutherland-Hodgman clipping of a segment against the half-plane
/// `dot(normal, x) <= offset`
pub(crate) fn clip_segment_to_line(
    input: &[ClipVertex; 2],
    normal: Vec2,
    offset: f64,
    vertex_index_a: u8,
) -> ([ClipVertex; 2], usize) {
    let mut out = [ClipVertex::default(); 2];
    let mut count = 0;

    let distance0 = normal.dot(input[0].v) - offset;
    let distance1 = normal.dot(input[1].v) - offset;

    if distance0 <= 0.0 {
        out[count] = input[0];
        count += 1;
    }
    if distance1 <= 0.0 {
        out[count] = input[1];
        count += 1;
    }

    // Endpoints straddle the plane
    if distance0 * distance1 < 0.0 {
        let interp = distance0 / (distance0 - distance1);
        out[count] = ClipVertex {
            v: input[0].v + (input[1].v - input[0].v) * interp,
            id: ContactId {
                index_a: vertex_index_a,
                index_b: input[0].id.index_b,
                type_a: FeatureType::Vertex,
                type_b: FeatureType::Face,
            },
        };
        count += 1;
    }

    (out, count)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(half: f64) -> Shape {
        Shape::cuboid(half, half).unwrap()
    }

    #[test]
    fn test_contact_id_key_is_unique_per_feature() {
        let a = ContactId {
            index_a: 1,
            index_b: 2,
            type_a: FeatureType::Face,
            type_b: FeatureType::Vertex,
        };
        let b = a.flipped();
        assert_ne!(a.key(), b.key());
        assert_eq!(b.flipped(), a);
    }

    #[test]
    fn test_clone_copies_only_active_points() {
        let mut m = Manifold::default();
        m.points[1].normal_impulse = 7.0;
        m.push(Vec2::new(1.0, 2.0), ContactId::default());
        let copy = m.clone();
        assert_eq!(copy.point_count, 1);
        assert_eq!(copy.points[0].local_point, Vec2::new(1.0, 2.0));
        assert_eq!(copy.points[1].normal_impulse, 0.0);
    }

    #[test]
    fn test_match_impulses_by_id() {
        let id0 = ContactId::default();
        let id1 = ContactId {
            index_a: 3,
            ..ContactId::default()
        };
        let mut old = Manifold::default();
        old.push(Vec2::ZERO, id0);
        old.push(Vec2::ZERO, id1);
        old.points[0].normal_impulse = 1.5;
        old.points[1].normal_impulse = 2.5;
        old.points[1].tangent_impulse = -0.5;

        let mut new = Manifold::default();
        let id2 = ContactId {
            index_b: 4,
            ..ContactId::default()
        };
        new.push(Vec2::ZERO, id1);
        new.push(Vec2::ZERO, id2);
        new.match_impulses(&old);

        assert_eq!(new.points[0].normal_impulse, 2.5);
        assert_eq!(new.points[0].tangent_impulse, -0.5);
        assert_eq!(new.points[1].normal_impulse, 0.0);
    }

    #[test]
    fn test_point_count_bounded_over_sweep() {
        let shapes = [
            Shape::circle(0.5).unwrap(),
            square(0.5),
            Shape::polygon(&[
                Vec2::new(-0.6, -0.4),
                Vec2::new(0.7, -0.5),
                Vec2::new(0.2, 0.8),
            ])
            .unwrap(),
            Shape::edge(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)).unwrap(),
        ];
        for a in &shapes {
            for b in &shapes {
                if a.kind() > b.kind() {
                    continue;
                }
                for step in 0..40 {
                    let t = step as f64 * 0.05;
                    let xf_a = Transform::new(Vec2::ZERO, 0.1 * t);
                    let xf_b = Transform::new(Vec2::new(t - 1.0, 0.3 * t - 0.3), -0.7 * t);
                    let m = collide(a, &xf_a, b, &xf_b);
                    assert!(m.point_count <= 2);
                }
            }
        }
    }

    #[test]
    fn test_world_manifold_for_resting_box() {
        let ground = square(5.0);
        let crate_box = square(0.5);
        let xf_a = Transform::new(Vec2::new(0.0, -5.0), 0.0);
        let xf_b = Transform::new(Vec2::new(0.0, 0.49), 0.0);
        let m = collide(&ground, &xf_a, &crate_box, &xf_b);
        assert_eq!(m.point_count, 2);

        let wm = WorldManifold::new(&m, &xf_a, ground.radius(), &xf_b, crate_box.radius());
        assert!((wm.normal - Vec2::new(0.0, 1.0)).length() < 1e-12);
        for i in 0..2 {
            assert!(wm.separations[i] < 0.0);
            assert!((wm.points[i].x.abs() - 0.5).abs() < 1e-9);
        }
    }

    #[test]
    fn test_edge_pairs_never_collide() {
        let e = Shape::edge(Vec2::new(-1.0, 0.0), Vec2::new(1.0, 0.0)).unwrap();
        let m = collide(&e, &Transform::IDENTITY, &e, &Transform::IDENTITY);
        assert_eq!(m.point_count, 0);
        assert!(!can_collide(ShapeKind::Edge, ShapeKind::Edge));
    }
}
