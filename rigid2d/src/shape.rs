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
//! Collision shapes
//!
//! The shape family is closed: circles, convex polygons and two-sided edges.
//! Shapes are defined in body-local coordinates; anything that needs world
//! coordinates takes a [`Transform`].

use crate::config::settings::{LINEAR_SLOP, MAX_POLYGON_VERTICES, POLYGON_RADIUS};
use crate::error::{PhysicsError, Result};
use crate::math::{Aabb, RayCastInput, RayCastOutput, Transform, Vec2};

/// Mass properties of a shape, relative to the body origin
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MassData {
    /// Mass in kilograms
    pub mass: f64,
    /// Centre of mass in body-local coordinates
    pub center: Vec2,
    /// Rotational inertia about the body origin
    pub inertia: f64,
}

/// Discriminant of a [`Shape`], ordered by narrow-phase dispatch rank
///
/// Contacts always put the lower-ranked shape in slot A, so the
/// dispatcher only needs one routine per unordered pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ShapeKind {
    /// Two-sided line segment
    Edge,
    /// Convex polygon
    Polygon,
    /// Circle
    Circle,
}

/// Collision shape attached to a fixture
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Solid circle
    Circle(Circle),
    /// Convex polygon
    Polygon(Polygon),
    /// Two-sided line segment
    Edge(Edge),
}

impl Shape {
    /// Create a circle centred on the body origin
    pub fn circle(radius: f64) -> Result<Shape> {
        Circle::new(Vec2::ZERO, radius).map(Shape::Circle)
    }

    /// Create an axis-aligned box centred on the body origin
    pub fn cuboid(half_width: f64, half_height: f64) -> Result<Shape> {
        Polygon::new_box(half_width, half_height).map(Shape::Polygon)
    }

    /// Create a convex polygon from a point cloud
    pub fn polygon(points: &[Vec2]) -> Result<Shape> {
        Polygon::new(points).map(Shape::Polygon)
    }

    /// Create an edge
    pub fn edge(v1: Vec2, v2: Vec2) -> Result<Shape> {
        Edge::new(v1, v2).map(Shape::Edge)
    }

    /// Dispatch rank of this shape
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Circle(_) => ShapeKind::Circle,
            Shape::Polygon(_) => ShapeKind::Polygon,
            Shape::Edge(_) => ShapeKind::Edge,
        }
    }

    /// Skin radius used by the narrow phase
    pub fn radius(&self) -> f64 {
        match self {
            Shape::Circle(c) => c.radius,
            Shape::Polygon(p) => p.radius,
            Shape::Edge(_) => POLYGON_RADIUS,
        }
    }

    /// Re-check the shape's parameters
    pub fn validate(&self) -> Result<()> {
        match self {
            Shape::Circle(c) => Circle::new(c.center, c.radius).map(|_| ()),
            Shape::Polygon(p) => {
                if p.vertices().iter().all(|v| v.is_valid()) {
                    Ok(())
                } else {
                    Err(PhysicsError::InvalidShape("polygon has non-finite vertices".into()))
                }
            }
            Shape::Edge(e) => Edge::new(e.v1, e.v2).map(|_| ()),
        }
    }

    /// Bounding box of the shape under `xf`
    pub fn compute_aabb(&self, xf: &Transform) -> Aabb {
        match self {
            Shape::Circle(c) => {
                let p = xf.apply(c.center);
                Aabb::from_center(p, Vec2::new(c.radius, c.radius))
            }
            Shape::Polygon(poly) => {
                let mut lower = xf.apply(poly.vertices[0]);
                let mut upper = lower;
                for v in &poly.vertices[1..poly.count] {
                    let w = xf.apply(*v);
                    lower = lower.min(w);
                    upper = upper.max(w);
                }
                Aabb::new(lower, upper).expanded(poly.radius)
            }
            Shape::Edge(e) => {
                let a = xf.apply(e.v1);
                let b = xf.apply(e.v2);
                Aabb::new(a.min(b), a.max(b)).expanded(POLYGON_RADIUS)
            }
        }
    }

    /// Mass properties for a uniform `density`
    pub fn compute_mass(&self, density: f64) -> MassData {
        match self {
            Shape::Circle(c) => {
                let mass = density * std::f64::consts::PI * c.radius * c.radius;
                MassData {
                    mass,
                    center: c.center,
                    inertia: mass * (0.5 * c.radius * c.radius + c.center.dot(c.center)),
                }
            }
            Shape::Polygon(p) => p.compute_mass(density),
            Shape::Edge(e) => MassData {
                mass: 0.0,
                center: (e.v1 + e.v2) * 0.5,
                inertia: 0.0,
            },
        }
    }

    /// Cast a ray against the shape under `xf`
    pub fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        match self {
            Shape::Circle(c) => c.ray_cast(input, xf),
            Shape::Polygon(p) => p.ray_cast(input, xf),
            Shape::Edge(e) => e.ray_cast(input, xf),
        }
    }

    /// Whether a world point lies inside the shape
    pub fn test_point(&self, xf: &Transform, point: Vec2) -> bool {
        match self {
            Shape::Circle(c) => {
                let center = xf.apply(c.center);
                (point - center).length_squared() <= c.radius * c.radius
            }
            Shape::Polygon(p) => {
                let local = xf.apply_inv(point);
                (0..p.count).all(|i| p.normals[i].dot(local - p.vertices[i]) <= 0.0)
            }
            Shape::Edge(_) => false,
        }
    }
}

/// Solid circle
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Circle {
    /// Centre in body-local coordinates
    pub center: Vec2,
    /// Radius
    pub radius: f64,
}

impl Circle {
    /// Create a circle, rejecting non-positive or non-finite radii
    pub fn new(center: Vec2, radius: f64) -> Result<Circle> {
        if !radius.is_finite() || radius <= 0.0 {
            return Err(PhysicsError::InvalidShape(format!(
                "circle radius {} must be positive and finite",
                radius
            )));
        }
        if !center.is_valid() {
            return Err(PhysicsError::InvalidShape("circle centre must be finite".into()));
        }
        Ok(Circle { center, radius })
    }

    fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let position = xf.apply(self.center);
        let s = input.p1 - position;
        let b = s.dot(s) - self.radius * self.radius;

        let r = input.p2 - input.p1;
        let c = s.dot(r);
        let rr = r.dot(r);
        let sigma = c * c - rr * b;
        if sigma < 0.0 || rr < f64::EPSILON {
            return None;
        }

        // Smallest root of the intersection quadratic
        let mut a = -(c + sigma.sqrt());
        if 0.0 <= a && a <= input.max_fraction * rr {
            a /= rr;
            return Some(RayCastOutput {
                normal: (s + r * a).normalize(),
                fraction: a,
            });
        }
        None
    }
}

/// Convex polygon with counter-clockwise winding
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Polygon {
    vertices: [Vec2; MAX_POLYGON_VERTICES],
    normals: [Vec2; MAX_POLYGON_VERTICES],
    count: usize,
    centroid: Vec2,
    radius: f64,
}

impl Polygon {
    /// Build the convex hull of `points`
    ///
    /// Points closer than half the linear slop are merged. The input must
    /// already describe a simple convex polygon (either winding): inputs
    /// whose hull drops vertices or visits them in a different cyclic order
    /// are concave or self-intersecting and are rejected.
    pub fn new(points: &[Vec2]) -> Result<Polygon> {
        if points.len() < 3 || points.len() > MAX_POLYGON_VERTICES {
            return Err(PhysicsError::InvalidShape(format!(
                "polygon needs 3..={} vertices, got {}",
                MAX_POLYGON_VERTICES,
                points.len()
            )));
        }
        if points.iter().any(|p| !p.is_valid()) {
            return Err(PhysicsError::InvalidShape("polygon has non-finite vertices".into()));
        }

        // Weld near-duplicate points
        let tolerance = (0.5 * LINEAR_SLOP) * (0.5 * LINEAR_SLOP);
        let mut welded: Vec<Vec2> = Vec::with_capacity(points.len());
        for p in points {
            if welded.iter().all(|q| p.distance_squared(*q) > tolerance) {
                welded.push(*p);
            }
        }
        if welded.len() < 3 {
            return Err(PhysicsError::InvalidShape(
                "polygon is degenerate after merging close vertices".into(),
            ));
        }

        let hull = gift_wrap(&welded);
        if hull.len() < 3 {
            return Err(PhysicsError::InvalidShape("polygon vertices are collinear".into()));
        }
        if hull.len() != welded.len() || !same_cycle(&welded, &hull) {
            return Err(PhysicsError::InvalidShape(
                "polygon is not convex or self-intersects".into(),
            ));
        }

        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let count = hull.len();
        for (i, &h) in hull.iter().enumerate() {
            vertices[i] = welded[h];
        }
        for i in 0..count {
            let edge = vertices[(i + 1) % count] - vertices[i];
            if edge.length_squared() <= f64::EPSILON * f64::EPSILON {
                return Err(PhysicsError::InvalidShape("polygon has a zero-length edge".into()));
            }
            normals[i] = edge.cross_scalar(1.0).normalize();
        }

        let centroid = compute_centroid(&vertices[..count]);
        Ok(Polygon {
            vertices,
            normals,
            count,
            centroid,
            radius: POLYGON_RADIUS,
        })
    }

    /// Axis-aligned box with the given half extents, centred on the origin
    pub fn new_box(half_width: f64, half_height: f64) -> Result<Polygon> {
        Self::new_oriented_box(half_width, half_height, Vec2::ZERO, 0.0)
    }

    /// Box with the given half extents, centre and rotation
    pub fn new_oriented_box(
        half_width: f64,
        half_height: f64,
        center: Vec2,
        angle: f64,
    ) -> Result<Polygon> {
        for (name, h) in [("half width", half_width), ("half height", half_height)] {
            if !h.is_finite() || h <= LINEAR_SLOP {
                return Err(PhysicsError::InvalidShape(format!(
                    "box {} {} must be finite and larger than the linear slop",
                    name, h
                )));
            }
        }
        if !center.is_valid() || !angle.is_finite() {
            return Err(PhysicsError::InvalidShape("box placement must be finite".into()));
        }
        let xf = Transform::new(center, angle);
        let corners = [
            Vec2::new(-half_width, -half_height),
            Vec2::new(half_width, -half_height),
            Vec2::new(half_width, half_height),
            Vec2::new(-half_width, half_height),
        ];
        let normals = [
            Vec2::new(0.0, -1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
            Vec2::new(-1.0, 0.0),
        ];
        let mut poly = Polygon {
            vertices: [Vec2::ZERO; MAX_POLYGON_VERTICES],
            normals: [Vec2::ZERO; MAX_POLYGON_VERTICES],
            count: 4,
            centroid: center,
            radius: POLYGON_RADIUS,
        };
        for i in 0..4 {
            poly.vertices[i] = xf.apply(corners[i]);
            poly.normals[i] = xf.q.apply(normals[i]);
        }
        Ok(poly)
    }

    /// Two-vertex, two-sided polygon standing in for an edge
    pub(crate) fn from_edge(edge: &Edge) -> Polygon {
        let n = (edge.v2 - edge.v1).cross_scalar(1.0).normalize();
        let mut vertices = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        let mut normals = [Vec2::ZERO; MAX_POLYGON_VERTICES];
        vertices[0] = edge.v1;
        vertices[1] = edge.v2;
        normals[0] = n;
        normals[1] = -n;
        Polygon {
            vertices,
            normals,
            count: 2,
            centroid: (edge.v1 + edge.v2) * 0.5,
            radius: POLYGON_RADIUS,
        }
    }

    /// Active vertices in counter-clockwise order
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices[..self.count]
    }

    /// Outward unit normals; `normals()[i]` belongs to the edge `v[i] -> v[i+1]`
    pub fn normals(&self) -> &[Vec2] {
        &self.normals[..self.count]
    }

    /// Number of vertices
    pub fn count(&self) -> usize {
        self.count
    }

    /// Area centroid
    pub fn centroid(&self) -> Vec2 {
        self.centroid
    }

    /// Skin radius
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn compute_mass(&self, density: f64) -> MassData {
        // Triangle fan around the first vertex keeps the sums well conditioned
        let s = self.vertices[0];
        let inv3 = 1.0 / 3.0;
        let mut area = 0.0;
        let mut center = Vec2::ZERO;
        let mut inertia = 0.0;

        for i in 0..self.count {
            let e1 = self.vertices[i] - s;
            let e2 = self.vertices[(i + 1) % self.count] - s;
            let d = e1.cross(e2);
            let triangle_area = 0.5 * d;
            area += triangle_area;
            center += (e1 + e2) * (triangle_area * inv3);

            let int_x2 = e1.x * e1.x + e2.x * e1.x + e2.x * e2.x;
            let int_y2 = e1.y * e1.y + e2.y * e1.y + e2.y * e2.y;
            inertia += (0.25 * inv3 * d) * (int_x2 + int_y2);
        }

        let mass = density * area;
        center *= 1.0 / area;
        let world_center = center + s;
        // Shift the inertia from the reference vertex to the body origin
        let inertia = density * inertia
            + mass * (world_center.dot(world_center) - center.dot(center));
        MassData {
            mass,
            center: world_center,
            inertia,
        }
    }

    fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.apply_inv(input.p1);
        let p2 = xf.apply_inv(input.p2);
        let d = p2 - p1;

        let mut lower = 0.0;
        let mut upper = input.max_fraction;
        let mut index = None;

        for i in 0..self.count {
            // p = p1 + t * d, dot(normal, p - v) = 0
            let numerator = self.normals[i].dot(self.vertices[i] - p1);
            let denominator = self.normals[i].dot(d);

            if denominator == 0.0 {
                if numerator < 0.0 {
                    return None;
                }
            } else if denominator < 0.0 && numerator < lower * denominator {
                // Entering this half-space
                lower = numerator / denominator;
                index = Some(i);
            } else if denominator > 0.0 && numerator < upper * denominator {
                // Leaving this half-space
                upper = numerator / denominator;
            }

            if upper < lower {
                return None;
            }
        }

        index.map(|i| RayCastOutput {
            normal: xf.q.apply(self.normals[i]),
            fraction: lower,
        })
    }
}

/// Two-sided line segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Edge {
    /// First vertex in body-local coordinates
    pub v1: Vec2,
    /// Second vertex in body-local coordinates
    pub v2: Vec2,
}

impl Edge {
    /// Create an edge, rejecting non-finite or coincident vertices
    pub fn new(v1: Vec2, v2: Vec2) -> Result<Edge> {
        if !v1.is_valid() || !v2.is_valid() {
            return Err(PhysicsError::InvalidShape("edge vertices must be finite".into()));
        }
        if v1.distance(v2) <= LINEAR_SLOP {
            return Err(PhysicsError::InvalidShape(
                "edge vertices must be further apart than the linear slop".into(),
            ));
        }
        Ok(Edge { v1, v2 })
    }

    fn ray_cast(&self, input: &RayCastInput, xf: &Transform) -> Option<RayCastOutput> {
        let p1 = xf.apply_inv(input.p1);
        let p2 = xf.apply_inv(input.p2);
        let d = p2 - p1;

        let e = self.v2 - self.v1;
        let normal = e.cross_scalar(1.0).normalize();

        // q = p1 + t * d, dot(normal, q - v1) = 0
        let numerator = normal.dot(self.v1 - p1);
        let denominator = normal.dot(d);
        if denominator == 0.0 {
            return None;
        }
        let t = numerator / denominator;
        if t < 0.0 || input.max_fraction < t {
            return None;
        }

        let q = p1 + d * t;
        let rr = e.dot(e);
        let s = (q - self.v1).dot(e) / rr;
        if !(0.0..=1.0).contains(&s) {
            return None;
        }

        let world_normal = xf.q.apply(normal);
        Some(RayCastOutput {
            normal: if numerator > 0.0 { -world_normal } else { world_normal },
            fraction: t,
        })
    }
}

/// Gift-wrapping convex hull, returning indices into `points` in CCW order
fn gift_wrap(points: &[Vec2]) -> Vec<usize> {
    // Rightmost point (lowest y on ties) is on the hull
    let mut i0 = 0;
    for (i, p) in points.iter().enumerate().skip(1) {
        let best = points[i0];
        if p.x > best.x || (p.x == best.x && p.y < best.y) {
            i0 = i;
        }
    }

    let mut hull = Vec::with_capacity(points.len());
    let mut ih = i0;
    loop {
        if hull.len() > points.len() {
            // Numerical trouble; let the caller reject the polygon
            return Vec::new();
        }
        hull.push(ih);

        let mut ie = 0;
        for j in 1..points.len() {
            if ie == ih {
                ie = j;
                continue;
            }
            let r = points[ie] - points[ih];
            let v = points[j] - points[ih];
            let c = r.cross(v);
            if c < 0.0 {
                ie = j;
            }
            // Collinear: keep the furthest point
            if c == 0.0 && v.length_squared() > r.length_squared() {
                ie = j;
            }
        }

        ih = ie;
        if ie == i0 {
            break;
        }
    }
    hull
}

/// Whether `hull` visits every input point in the input's cyclic order,
/// in either direction
fn same_cycle(points: &[Vec2], hull: &[usize]) -> bool {
    let n = hull.len();
    let Some(start) = hull.iter().position(|&h| h == 0) else {
        return false;
    };
    let forward = (0..n).all(|k| hull[(start + k) % n] == k);
    let backward = (0..n).all(|k| hull[(start + n - k) % n] == k);
    debug_assert_eq!(points.len(), n);
    forward || backward
}

fn compute_centroid(vertices: &[Vec2]) -> Vec2 {
    let s = vertices[0];
    let inv3 = 1.0 / 3.0;
    let mut c = Vec2::ZERO;
    let mut area = 0.0;
    for i in 0..vertices.len() {
        let e1 = vertices[i] - s;
        let e2 = vertices[(i + 1) % vertices.len()] - s;
        let a = 0.5 * e1.cross(e2);
        c += (e1 + e2) * (a * inv3);
        area += a;
    }
    c * (1.0 / area) + s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_rejects_bad_radius() {
        assert!(Shape::circle(0.0).is_err());
        assert!(Shape::circle(-1.0).is_err());
        assert!(Shape::circle(f64::NAN).is_err());
        assert!(Shape::circle(0.5).is_ok());
    }

    #[test]
    fn test_polygon_hull_winding() {
        // Clockwise input is accepted and rewound counter-clockwise
        let cw = [
            Vec2::new(-1.0, 1.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, -1.0),
            Vec2::new(-1.0, -1.0),
        ];
        let poly = Polygon::new(&cw).unwrap();
        assert_eq!(poly.count(), 4);
        for i in 0..4 {
            let a = poly.vertices()[i];
            let b = poly.vertices()[(i + 1) % 4];
            let c = poly.vertices()[(i + 2) % 4];
            assert!((b - a).cross(c - b) > 0.0);
        }
        assert!(poly.centroid().length() < 1e-12);
    }

    #[test]
    fn test_polygon_rejects_degenerate_input() {
        let collinear = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0), Vec2::new(2.0, 0.0)];
        assert!(Polygon::new(&collinear).is_err());

        let bowtie = [
            Vec2::new(0.0, 0.0),
            Vec2::new(1.0, 1.0),
            Vec2::new(1.0, 0.0),
            Vec2::new(0.0, 1.0),
        ];
        assert!(Polygon::new(&bowtie).is_err());

        let concave = [
            Vec2::new(0.0, 0.0),
            Vec2::new(2.0, 0.0),
            Vec2::new(1.0, 0.5),
            Vec2::new(2.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        assert!(Polygon::new(&concave).is_err());

        let too_few = [Vec2::new(0.0, 0.0), Vec2::new(1.0, 0.0)];
        assert!(Polygon::new(&too_few).is_err());
    }

    #[test]
    fn test_box_mass() {
        let shape = Shape::cuboid(1.0, 0.5).unwrap();
        let md = shape.compute_mass(2.0);
        // 2 x 1 box, density 2
        assert!((md.mass - 4.0).abs() < 1e-12);
        assert!(md.center.length() < 1e-12);
        let expected = 4.0 * (4.0 + 1.0) / 12.0;
        assert!((md.inertia - expected).abs() < 1e-12);
    }

    #[test]
    fn test_circle_mass_parallel_axis() {
        let shape = Shape::Circle(Circle::new(Vec2::new(2.0, 0.0), 1.0).unwrap());
        let md = shape.compute_mass(1.0);
        let m = std::f64::consts::PI;
        assert!((md.mass - m).abs() < 1e-12);
        assert!((md.inertia - m * (0.5 + 4.0)).abs() < 1e-12);
    }

    #[test]
    fn test_aabb_includes_skin() {
        let shape = Shape::cuboid(1.0, 1.0).unwrap();
        let aabb = shape.compute_aabb(&Transform::new(Vec2::new(5.0, 0.0), 0.0));
        assert!((aabb.lower.x - (4.0 - POLYGON_RADIUS)).abs() < 1e-12);
        assert!((aabb.upper.y - (1.0 + POLYGON_RADIUS)).abs() < 1e-12);
    }

    #[test]
    fn test_ray_casts() {
        let input = RayCastInput {
            p1: Vec2::new(-5.0, 0.0),
            p2: Vec2::new(5.0, 0.0),
            max_fraction: 1.0,
        };
        let xf = Transform::IDENTITY;

        let circle = Shape::circle(1.0).unwrap();
        let hit = circle.ray_cast(&input, &xf).unwrap();
        assert!((hit.fraction - 0.4).abs() < 1e-12);
        assert!((hit.normal.x + 1.0).abs() < 1e-12);

        let square = Shape::cuboid(1.0, 1.0).unwrap();
        let hit = square.ray_cast(&input, &xf).unwrap();
        assert!((hit.fraction - 0.4).abs() < 1e-12);
        assert_eq!(hit.normal, Vec2::new(-1.0, 0.0));

        let wall = Shape::edge(Vec2::new(0.0, -1.0), Vec2::new(0.0, 1.0)).unwrap();
        let hit = wall.ray_cast(&input, &xf).unwrap();
        assert!((hit.fraction - 0.5).abs() < 1e-12);
        assert!(hit.normal.x < 0.0);
    }

    #[test]
    fn test_point_containment() {
        let square = Shape::cuboid(1.0, 1.0).unwrap();
        let xf = Transform::new(Vec2::new(2.0, 0.0), 0.3);
        assert!(square.test_point(&xf, Vec2::new(2.0, 0.0)));
        assert!(!square.test_point(&xf, Vec2::new(0.0, 0.0)));
    }
}
