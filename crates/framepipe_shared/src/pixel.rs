//! # Core Pixel Descriptions
//!
//! What a core says about the memory it renders into. These mirror the
//! classic `format` / `type` pair of the legacy 3D API, since that is the
//! vocabulary cores are written against.

use serde::{Deserialize, Serialize};

/// Channel layout of a core's CPU video buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Blue, green, red, alpha.
    Bgra,
    /// Red, green, blue, alpha.
    Rgba,
    /// Red, green, blue without alpha.
    Rgb,
}

/// Component packing of a core's CPU video buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelType {
    /// One unsigned byte per component.
    UnsignedByte,
    /// One signed byte per component.
    Byte,
    /// Four bytes packed into a reversed 32-bit word (8-8-8-8 rev).
    UnsignedInt8888Rev,
    /// 16-bit 5-6-5.
    UnsignedShort565,
    /// 16-bit 5-5-5-1.
    UnsignedShort5551,
    /// 16-bit 4-4-4-4.
    UnsignedShort4444,
}

impl PixelType {
    /// True for the 16-bit packed types.
    #[inline]
    #[must_use]
    pub const fn is_packed_16(self) -> bool {
        matches!(
            self,
            Self::UnsignedShort565 | Self::UnsignedShort5551 | Self::UnsignedShort4444
        )
    }
}

impl PixelFormat {
    /// Bytes one pixel occupies in the core's buffer, or `None` for a
    /// combination no core is allowed to report.
    #[must_use]
    pub const fn bytes_per_pixel(self, pixel_type: PixelType) -> Option<u32> {
        match (self, pixel_type) {
            (_, PixelType::UnsignedShort565)
            | (_, PixelType::UnsignedShort5551)
            | (_, PixelType::UnsignedShort4444) => Some(2),
            (Self::Rgb, PixelType::UnsignedByte) => Some(3),
            (Self::Rgb, _) => None,
            (Self::Bgra | Self::Rgba, _) => Some(4),
        }
    }
}

/// The drawing API a core declares at load time.
///
/// The pipeline picks its renderer from this once and never switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingApi {
    /// The core fills a CPU buffer.
    Video2D,
    /// Legacy 3D API, version 2 profile.
    OpenGl2,
    /// Legacy 3D API, version 3 core profile.
    OpenGl3,
    /// Legacy embedded 3D API, version 3.
    OpenGles3,
    /// Explicit modern API. Not supported by this pipeline.
    Vulkan,
}

impl RenderingApi {
    /// True if the core draws through the legacy 3D API.
    #[inline]
    #[must_use]
    pub const fn is_legacy_3d(self) -> bool {
        matches!(self, Self::OpenGl2 | Self::OpenGl3 | Self::OpenGles3)
    }
}
