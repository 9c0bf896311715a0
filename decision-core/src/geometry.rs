//! Planar vectors and the ego reference frame.
//!
//! World coordinates are metres in a right-handed plane. The ego frame has its
//! forward axis along the ego heading and its lateral axis pointing to the
//! ego's left, i.e. the heading rotated a quarter turn counter-clockwise.

use core::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::constants::DEGENERATE_EPSILON;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f64,
    pub y: f64,
}

impl Vec2 {
    pub const ZERO: Self = Self { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[inline]
    pub fn dot(self, other: Self) -> f64 {
        self.x * other.x + self.y * other.y
    }

    #[inline]
    pub fn length(self) -> f64 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Quarter turn counter-clockwise.
    #[inline]
    pub fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    pub fn normalized(self) -> Option<Self> {
        let len = self.length();
        if !len.is_finite() || len <= DEGENERATE_EPSILON {
            return None;
        }
        Some(Self::new(self.x / len, self.y / len))
    }

    /// Rotates counter-clockwise by `degrees`.
    pub fn rotated_deg(self, degrees: f64) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();
        Self::new(self.x * cos - self.y * sin, self.x * sin + self.y * cos)
    }
}

impl Add for Vec2 {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Vec2 {
    type Output = Self;

    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// A point or vector expressed along the ego axes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocalOffset {
    pub forward: f64,
    pub lateral: f64,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EgoFrame {
    origin: Vec2,
    forward: Vec2,
    left: Vec2,
}

impl EgoFrame {
    /// Builds the frame from an ego pose. The orientation is normalized here,
    /// so callers may pass any non-zero heading vector.
    pub fn new(origin: Vec2, orientation: Vec2) -> Option<Self> {
        let forward = orientation.normalized()?;
        Some(Self {
            origin,
            forward,
            left: forward.perp(),
        })
    }

    pub fn forward_axis(&self) -> Vec2 {
        self.forward
    }

    /// World point → ego-frame offset from the ego position.
    #[inline]
    pub fn to_local(&self, point: Vec2) -> LocalOffset {
        self.project(point - self.origin)
    }

    /// World direction → ego-frame components (no translation).
    #[inline]
    pub fn project(&self, vector: Vec2) -> LocalOffset {
        LocalOffset {
            forward: vector.dot(self.forward),
            lateral: vector.dot(self.left),
        }
    }
}
