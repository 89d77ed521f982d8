//! # Integer Geometry
//!
//! Cores report their buffer, visible rectangle and aspect in whole pixels.
//! The display layer works in points (`Bounds`), which are rounded up when
//! they become pixel sizes.

use std::fmt;

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Width and height in pixels.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct IntSize {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl IntSize {
    /// The empty size.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a size.
    #[inline]
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True if either dimension is zero.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered.
    #[inline]
    #[must_use]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl fmt::Display for IntSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Pixel offset from the top-left of a buffer.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct IntPoint {
    /// Column.
    pub x: u32,
    /// Row.
    pub y: u32,
}

impl IntPoint {
    /// The origin.
    pub const ZERO: Self = Self::new(0, 0);

    /// Creates a point.
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned pixel rectangle.
///
/// The core's "screen rect" is the visible part of its (usually larger)
/// video buffer.
#[repr(C)]
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable, Serialize, Deserialize,
)]
pub struct IntRect {
    /// Top-left corner.
    pub origin: IntPoint,
    /// Extent.
    pub size: IntSize,
}

impl IntRect {
    /// Creates a rectangle from its components.
    #[inline]
    #[must_use]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            origin: IntPoint::new(x, y),
            size: IntSize::new(width, height),
        }
    }

    /// Rectangle covering a whole buffer of `size`.
    #[inline]
    #[must_use]
    pub const fn from_size(size: IntSize) -> Self {
        Self {
            origin: IntPoint::ZERO,
            size,
        }
    }

    /// One past the last column. Computed in `u64` so it cannot overflow.
    #[inline]
    #[must_use]
    pub const fn max_x(&self) -> u64 {
        self.origin.x as u64 + self.size.width as u64
    }

    /// One past the last row.
    #[inline]
    #[must_use]
    pub const fn max_y(&self) -> u64 {
        self.origin.y as u64 + self.size.height as u64
    }

    /// True if the rectangle covers no pixels.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.size.is_empty()
    }

    /// True if the rectangle lies entirely inside a buffer of `size`.
    #[inline]
    #[must_use]
    pub const fn fits_within(&self, size: IntSize) -> bool {
        self.max_x() <= size.width as u64 && self.max_y() <= size.height as u64
    }
}

impl fmt::Display for IntRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{}, {}, {}, {}}}",
            self.origin.x, self.origin.y, self.size.width, self.size.height
        )
    }
}

/// Viewport bounds in display points, as handed down by the UI layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Width in points.
    pub width: f64,
    /// Height in points.
    pub height: f64,
}

impl Bounds {
    /// Creates bounds.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Bounds at the origin covering `size` points.
    #[inline]
    #[must_use]
    pub fn from_size(size: IntSize) -> Self {
        Self::new(0.0, 0.0, f64::from(size.width), f64::from(size.height))
    }

    /// Size in whole pixels, rounding fractional points up.
    #[must_use]
    pub fn size_rounded_up(&self) -> IntSize {
        self.pixel_size(1.0)
    }

    /// Size in device pixels for a backing scale factor, rounded up.
    #[must_use]
    pub fn pixel_size(&self, scale: f64) -> IntSize {
        IntSize::new(ceil_to_u32(self.width * scale), ceil_to_u32(self.height * scale))
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ceil_to_u32(value: f64) -> u32 {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= f64::from(u32::MAX) {
        u32::MAX
    } else {
        value.ceil() as u32
    }
}
