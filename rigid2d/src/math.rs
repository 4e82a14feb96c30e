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
//! 2D math primitives
//!
//! Double-precision vectors, rotations, rigid transforms, small dense
//! matrices used by the constraint solvers, and axis-aligned bounding boxes.
//! All operations are plain IEEE-754 arithmetic in a fixed evaluation order,
//! so identical inputs produce identical results on the same platform.

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// 2D vector with double-precision components
///
/// # Examples
///
/// ```
/// use rigid2d::math::Vec2;
///
/// let v = Vec2::new(3.0, 4.0);
/// assert_eq!(v.length(), 5.0);
/// assert!(v.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
}

impl Vec2 {
    /// The zero vector
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    /// Create a new vector
    pub const fn new(x: f64, y: f64) -> Self {
        Vec2 { x, y }
    }

    /// Dot product
    pub fn dot(self, other: Vec2) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product, returning the z component of the 3D cross product
    pub fn cross(self, other: Vec2) -> f64 {
        self.x * other.y - self.y * other.x
    }

    /// Cross product of this vector with a scalar: `v x s`
    pub fn cross_scalar(self, s: f64) -> Vec2 {
        Vec2::new(s * self.y, -s * self.x)
    }

    /// Cross product of a scalar with a vector: `s x v`
    pub fn scalar_cross(s: f64, v: Vec2) -> Vec2 {
        Vec2::new(-s * v.y, s * v.x)
    }

    /// Length of the vector
    pub fn length(self) -> f64 {
        self.length_squared().sqrt()
    }

    /// Squared length of the vector
    pub fn length_squared(self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    /// Return the unit vector in the same direction, or zero for tiny vectors
    pub fn normalize(self) -> Vec2 {
        let len = self.length();
        if len < f64::EPSILON {
            return Vec2::ZERO;
        }
        self * (1.0 / len)
    }

    /// Normalize in place and return the original length
    pub fn normalize_mut(&mut self) -> f64 {
        let len = self.length();
        if len < f64::EPSILON {
            return 0.0;
        }
        let inv = 1.0 / len;
        self.x *= inv;
        self.y *= inv;
        len
    }

    /// Perpendicular vector rotated +90 degrees
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    /// Component-wise absolute value
    pub fn abs(self) -> Vec2 {
        Vec2::new(self.x.abs(), self.y.abs())
    }

    /// Component-wise minimum
    pub fn min(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.min(other.x), self.y.min(other.y))
    }

    /// Component-wise maximum
    pub fn max(self, other: Vec2) -> Vec2 {
        Vec2::new(self.x.max(other.x), self.y.max(other.y))
    }

    /// Distance between two points
    pub fn distance(self, other: Vec2) -> f64 {
        (self - other).length()
    }

    /// Squared distance between two points
    pub fn distance_squared(self, other: Vec2) -> f64 {
        (self - other).length_squared()
    }

    /// Check if both components are finite (not NaN or infinite)
    pub fn is_valid(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl Add for Vec2 {
    type Output = Vec2;
    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;
    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl SubAssign for Vec2 {
    fn sub_assign(&mut self, rhs: Vec2) {
        self.x -= rhs.x;
        self.y -= rhs.y;
    }
}

impl Mul<f64> for Vec2 {
    type Output = Vec2;
    fn mul(self, rhs: f64) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

impl Mul<Vec2> for f64 {
    type Output = Vec2;
    fn mul(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self * rhs.x, self * rhs.y)
    }
}

impl MulAssign<f64> for Vec2 {
    fn mul_assign(&mut self, rhs: f64) {
        self.x *= rhs;
        self.y *= rhs;
    }
}

impl Neg for Vec2 {
    type Output = Vec2;
    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Rotation stored as sine/cosine pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rot {
    /// Sine of the angle
    pub s: f64,
    /// Cosine of the angle
    pub c: f64,
}

impl Rot {
    /// The identity rotation
    pub const IDENTITY: Rot = Rot { s: 0.0, c: 1.0 };

    /// Create a rotation from an angle in radians
    pub fn new(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Rot { s, c }
    }

    /// Angle in radians
    pub fn angle(self) -> f64 {
        self.s.atan2(self.c)
    }

    /// Rotate a vector
    pub fn apply(self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x - self.s * v.y, self.s * v.x + self.c * v.y)
    }

    /// Inverse-rotate a vector
    pub fn apply_inv(self, v: Vec2) -> Vec2 {
        Vec2::new(self.c * v.x + self.s * v.y, -self.s * v.x + self.c * v.y)
    }
}

impl Default for Rot {
    fn default() -> Self {
        Rot::IDENTITY
    }
}

/// Rigid transform: translation followed by rotation
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Transform {
    /// Translation
    pub p: Vec2,
    /// Rotation
    pub q: Rot,
}

impl Transform {
    /// The identity transform
    pub const IDENTITY: Transform = Transform {
        p: Vec2::ZERO,
        q: Rot::IDENTITY,
    };

    /// Create a transform from a position and an angle
    pub fn new(p: Vec2, angle: f64) -> Self {
        Transform { p, q: Rot::new(angle) }
    }

    /// Transform a local point into world space
    pub fn apply(&self, v: Vec2) -> Vec2 {
        self.q.apply(v) + self.p
    }

    /// Transform a world point into local space
    pub fn apply_inv(&self, v: Vec2) -> Vec2 {
        self.q.apply_inv(v - self.p)
    }
}

/// 2x2 matrix stored by columns
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mat22 {
    /// First column
    pub ex: Vec2,
    /// Second column
    pub ey: Vec2,
}

impl Mat22 {
    /// Create a matrix from two columns
    pub fn new(ex: Vec2, ey: Vec2) -> Self {
        Mat22 { ex, ey }
    }

    /// Inverse of the matrix, zero if singular
    pub fn inverse(&self) -> Mat22 {
        let (a, b, c, d) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Mat22::new(Vec2::new(det * d, -det * c), Vec2::new(-det * b, det * a))
    }

    /// Solve `A * x = b`, returning zero for a singular matrix
    pub fn solve(&self, b: Vec2) -> Vec2 {
        let (a11, a12, a21, a22) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }

    /// Multiply by a vector
    pub fn mul(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }
}

/// 3D vector used for the weld joint's combined point/angle constraint
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    /// X component
    pub x: f64,
    /// Y component
    pub y: f64,
    /// Z component
    pub z: f64,
}

impl Vec3 {
    /// Create a new vector
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Vec3 { x, y, z }
    }

    fn dot(self, o: Vec3) -> f64 {
        self.x * o.x + self.y * o.y + self.z * o.z
    }

    fn cross(self, o: Vec3) -> Vec3 {
        Vec3::new(
            self.y * o.z - self.z * o.y,
            self.z * o.x - self.x * o.z,
            self.x * o.y - self.y * o.x,
        )
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl AddAssign for Vec3 {
    fn add_assign(&mut self, rhs: Vec3) {
        self.x += rhs.x;
        self.y += rhs.y;
        self.z += rhs.z;
    }
}

impl Neg for Vec3 {
    type Output = Vec3;
    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

/// 3x3 matrix stored by columns
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Mat33 {
    /// First column
    pub ex: Vec3,
    /// Second column
    pub ey: Vec3,
    /// Third column
    pub ez: Vec3,
}

impl Mat33 {
    /// Multiply by a vector
    pub fn mul(&self, v: Vec3) -> Vec3 {
        Vec3::new(
            self.ex.x * v.x + self.ey.x * v.y + self.ez.x * v.z,
            self.ex.y * v.x + self.ey.y * v.y + self.ez.y * v.z,
            self.ex.z * v.x + self.ey.z * v.y + self.ez.z * v.z,
        )
    }

    /// Multiply the upper-left 2x2 block by a vector
    pub fn mul22(&self, v: Vec2) -> Vec2 {
        Vec2::new(
            self.ex.x * v.x + self.ey.x * v.y,
            self.ex.y * v.x + self.ey.y * v.y,
        )
    }

    /// Solve `A * x = b` using Cramer's rule, zero if singular
    pub fn solve33(&self, b: Vec3) -> Vec3 {
        let mut det = self.ex.dot(self.ey.cross(self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec3::new(
            det * b.dot(self.ey.cross(self.ez)),
            det * self.ex.dot(b.cross(self.ez)),
            det * self.ex.dot(self.ey.cross(b)),
        )
    }

    /// Solve the upper-left 2x2 block `A * x = b`, zero if singular
    pub fn solve22(&self, b: Vec2) -> Vec2 {
        let (a11, a12, a21, a22) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a11 * a22 - a12 * a21;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Vec2::new(det * (a22 * b.x - a12 * b.y), det * (a11 * b.y - a21 * b.x))
    }

    /// Inverse of the upper-left 2x2 block as a 3x3 matrix with a zero third row/column
    pub fn inverse22(&self) -> Mat33 {
        let (a, b, c, d) = (self.ex.x, self.ey.x, self.ex.y, self.ey.y);
        let mut det = a * d - b * c;
        if det != 0.0 {
            det = 1.0 / det;
        }
        Mat33 {
            ex: Vec3::new(det * d, -det * c, 0.0),
            ey: Vec3::new(-det * b, det * a, 0.0),
            ez: Vec3::default(),
        }
    }

    /// Inverse of a symmetric matrix, zero if singular
    pub fn sym_inverse33(&self) -> Mat33 {
        let mut det = self.ex.dot(self.ey.cross(self.ez));
        if det != 0.0 {
            det = 1.0 / det;
        }
        let (a11, a12, a13) = (self.ex.x, self.ey.x, self.ez.x);
        let (a22, a23) = (self.ey.y, self.ez.y);
        let a33 = self.ez.z;

        let mut m = Mat33::default();
        m.ex.x = det * (a22 * a33 - a23 * a23);
        m.ex.y = det * (a13 * a23 - a12 * a33);
        m.ex.z = det * (a12 * a23 - a13 * a22);

        m.ey.x = m.ex.y;
        m.ey.y = det * (a11 * a33 - a13 * a13);
        m.ey.z = det * (a13 * a12 - a11 * a23);

        m.ez.x = m.ex.z;
        m.ez.y = m.ey.z;
        m.ez.z = det * (a11 * a22 - a12 * a12);
        m
    }
}

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    /// Lower corner
    pub lower: Vec2,
    /// Upper corner
    pub upper: Vec2,
}

impl Aabb {
    /// Create a box from its corners
    pub fn new(lower: Vec2, upper: Vec2) -> Self {
        Aabb { lower, upper }
    }

    /// Create a box from a centre and half extents
    pub fn from_center(center: Vec2, half_extents: Vec2) -> Self {
        Aabb::new(center - half_extents, center + half_extents)
    }

    /// Whether lower <= upper on both axes and all values are finite
    pub fn is_valid(&self) -> bool {
        let d = self.upper - self.lower;
        d.x >= 0.0 && d.y >= 0.0 && self.lower.is_valid() && self.upper.is_valid()
    }

    /// Centre point
    pub fn center(&self) -> Vec2 {
        (self.lower + self.upper) * 0.5
    }

    /// Half extents
    pub fn extents(&self) -> Vec2 {
        (self.upper - self.lower) * 0.5
    }

    /// Perimeter, used as the surface-area heuristic cost in 2D
    pub fn perimeter(&self) -> f64 {
        2.0 * ((self.upper.x - self.lower.x) + (self.upper.y - self.lower.y))
    }

    /// Smallest box containing both boxes
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb::new(self.lower.min(other.lower), self.upper.max(other.upper))
    }

    /// Whether this box fully contains `other`
    pub fn contains(&self, other: &Aabb) -> bool {
        self.lower.x <= other.lower.x
            && self.lower.y <= other.lower.y
            && other.upper.x <= self.upper.x
            && other.upper.y <= self.upper.y
    }

    /// Whether the boxes overlap (touching edges count as overlap)
    pub fn overlaps(&self, other: &Aabb) -> bool {
        !(other.lower.x > self.upper.x
            || other.lower.y > self.upper.y
            || self.lower.x > other.upper.x
            || self.lower.y > other.upper.y)
    }

    /// Grow the box by `margin` on every side
    pub fn expanded(&self, margin: f64) -> Aabb {
        let r = Vec2::new(margin, margin);
        Aabb::new(self.lower - r, self.upper + r)
    }
}

/// Ray cast input: the segment `p1 + max_fraction * (p2 - p1)`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastInput {
    /// Segment start
    pub p1: Vec2,
    /// Segment end
    pub p2: Vec2,
    /// Fraction of the segment to consider
    pub max_fraction: f64,
}

/// Ray cast hit against a single shape
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayCastOutput {
    /// Surface normal at the hit point
    pub normal: Vec2,
    /// Fraction along the input segment
    pub fraction: f64,
}
