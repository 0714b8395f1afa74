//! Spatial primitives for container space.
//!
//! Coordinates are centimetres measured from a container's front-left-bottom
//! corner: `x` along the width, `y` along the depth, `z` up the height. The
//! open face of every container is at the top.

use std::ops::Add;

/// Tolerance for floating-point bound checks.
pub const EPSILON_GENERAL: f64 = 1e-6;

/// A point or an extent in container space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    #[inline]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Front-left-bottom corner of a container.
    #[inline]
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Product of the three extents.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.x * self.y * self.z
    }

    /// Whether this corner lies inside `bounds` on every axis, allowing
    /// `tolerance` of overshoot.
    #[inline]
    pub fn fits_within(&self, bounds: &Self, tolerance: f64) -> bool {
        self.x <= bounds.x + tolerance && self.y <= bounds.y + tolerance && self.z <= bounds.z + tolerance
    }
}

impl Add for Vec3 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self::Output {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

/// Anything with a width, depth and height.
pub trait Dimensional {
    fn dimensions(&self) -> Vec3;

    fn volume(&self) -> f64 {
        self.dimensions().volume()
    }
}

/// Space taken by a stowed item, from its origin to the opposite corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    pub min: Vec3,
    pub max: Vec3,
}

impl BoundingBox {
    #[inline]
    pub fn new(origin: Vec3, dims: Vec3) -> Self {
        Self {
            min: origin,
            max: origin + dims,
        }
    }

    /// Strict overlap of the horizontal footprints.
    #[inline]
    pub fn intersects_xy(&self, other: &Self) -> bool {
        self.min.x < other.max.x
            && other.min.x < self.max.x
            && self.min.y < other.max.y
            && other.min.y < self.max.y
    }

    /// Height of the upper face.
    #[inline]
    pub fn top_z(&self) -> f64 {
        self.max.z
    }
}
