//! Geometry primitives: [`Point`] and [`Range`].
//!
//! Coordinates are tile indices on a single grid. X grows right, Y grows
//! down.

use std::fmt;
use std::ops::{Add, Mul, Sub};

use crate::dir::Direction;

// ---------------------------------------------------------------------------
// Point
// ---------------------------------------------------------------------------

/// A 2D integer tile coordinate.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    /// Origin (0, 0).
    pub const ZERO: Self = Self { x: 0, y: 0 };

    /// Create a new point.
    #[inline]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Return a point shifted by (dx, dy).
    #[inline]
    pub const fn shift(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The adjacent point in direction `dir`.
    #[inline]
    pub fn step(self, dir: Direction) -> Self {
        self + dir.offset()
    }

    /// Floor division of both coordinates by `size`.
    ///
    /// This is the chunk index of a tile: `(-1) / 16` is `-1`, not `0`, so
    /// chunk partitioning stays total and non-overlapping across the origin.
    #[inline]
    pub fn div_floor(self, size: i32) -> Self {
        Self::new(self.x.div_euclid(size), self.y.div_euclid(size))
    }

    /// Non-negative remainder of both coordinates by `size`.
    #[inline]
    pub fn rem_floor(self, size: i32) -> Self {
        Self::new(self.x.rem_euclid(size), self.y.rem_euclid(size))
    }

    /// Absolute per-axis delta to `other`.
    #[inline]
    pub fn abs_delta(self, other: Point) -> Point {
        Point::new((self.x - other.x).abs(), (self.y - other.y).abs())
    }

    /// Chebyshev (L∞) distance.
    #[inline]
    pub fn chebyshev(self, other: Point) -> i32 {
        let d = self.abs_delta(other);
        d.x.max(d.y)
    }

    /// Manhattan (L1) distance.
    #[inline]
    pub fn manhattan(self, other: Point) -> i32 {
        let d = self.abs_delta(other);
        d.x + d.y
    }

    /// Squared Euclidean distance.
    #[inline]
    pub fn dist_sq(self, other: Point) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dy = (self.y - other.y) as i64;
        dx * dx + dy * dy
    }

    /// The direction of a unit step from `self` to `other`, if they are
    /// 8-adjacent.
    #[inline]
    pub fn direction_to(self, other: Point) -> Option<Direction> {
        Direction::from_offset(other - self)
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Row-major order.
impl Ord for Point {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.y, self.x).cmp(&(other.y, other.x))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.x, self.y)
    }
}

impl Add for Point {
    type Output = Self;
    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point {
    type Output = Self;
    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Scales both coordinates, e.g. a chunk index to its origin tile.
impl Mul<i32> for Point {
    type Output = Self;
    #[inline]
    fn mul(self, factor: i32) -> Self {
        Point {
            x: self.x * factor,
            y: self.y * factor,
        }
    }
}

// ---------------------------------------------------------------------------
// Range
// ---------------------------------------------------------------------------

/// Axis-aligned rectangle of tiles, `min` included and `max` excluded.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Range {
    pub min: Point,
    pub max: Point,
}

impl Range {
    /// Create a new range from two corners, canonicalized so that
    /// `min` ≤ `max` on each axis.
    #[inline]
    pub fn new(x0: i32, y0: i32, x1: i32, y1: i32) -> Self {
        Self {
            min: Point::new(x0.min(x1), y0.min(y1)),
            max: Point::new(x0.max(x1), y0.max(y1)),
        }
    }

    /// A `size`×`size` square whose top-left corner is `origin`.
    #[inline]
    pub fn square(origin: Point, size: i32) -> Self {
        Self {
            min: origin,
            max: origin.shift(size, size),
        }
    }

    /// Every point within Chebyshev distance `radius` of `center`, clipped
    /// to the coordinate space.
    #[inline]
    pub fn around(center: Point, radius: i32) -> Self {
        let r = radius.max(0);
        let lo = |c: i32| c.saturating_sub(r);
        let hi = |c: i32| c.saturating_add(r).saturating_add(1);
        Self {
            min: Point::new(lo(center.x), lo(center.y)),
            max: Point::new(hi(center.x), hi(center.y)),
        }
    }

    /// Width of the range.
    #[inline]
    pub fn width(self) -> i32 {
        self.max.x - self.min.x
    }

    /// Height of the range.
    #[inline]
    pub fn height(self) -> i32 {
        self.max.y - self.min.y
    }

    /// Total number of cells in the range.
    #[inline]
    pub fn len(self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.width() as usize) * (self.height() as usize)
    }

    /// Whether the range has zero or negative area.
    #[inline]
    pub fn is_empty(self) -> bool {
        self.min.x >= self.max.x || self.min.y >= self.max.y
    }

    /// Whether `p` is inside the half-open range.
    #[inline]
    pub fn contains(self, p: Point) -> bool {
        p.x >= self.min.x && p.x < self.max.x && p.y >= self.min.y && p.y < self.max.y
    }

    /// Points of the range, row by row.
    #[inline]
    pub fn iter(self) -> RangeIter {
        RangeIter {
            origin: self.min,
            width: self.width().max(0),
            next: 0,
            end: self.len(),
        }
    }
}

impl IntoIterator for Range {
    type Item = Point;
    type IntoIter = RangeIter;
    #[inline]
    fn into_iter(self) -> RangeIter {
        self.iter()
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.min, self.max)
    }
}

/// See [`Range::iter`].
#[derive(Clone, Debug)]
pub struct RangeIter {
    origin: Point,
    width: i32,
    next: usize,
    end: usize,
}

impl Iterator for RangeIter {
    type Item = Point;

    #[inline]
    fn next(&mut self) -> Option<Point> {
        if self.next >= self.end {
            return None;
        }
        let i = self.next as i32;
        self.next += 1;
        Some(self.origin.shift(i % self.width, i / self.width))
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.end - self.next;
        (n, Some(n))
    }
}

impl ExactSizeIterator for RangeIter {}
