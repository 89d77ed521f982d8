//! # Pixel Converter
//!
//! Turns the core's pitched CPU buffer into tightly packed rows in the
//! 2D texture's layout. Only the output rect is copied.

use framepipe_core::UploadRing;
use framepipe_shared::{IntRect, PixelFormat, PixelType, UPLOAD_RING_SIZE};

use crate::error::{PipelineError, PipelineResult};
use crate::gpu::TextureFormat;

/// Staging conversion from core pixels to texture texels.
#[derive(Debug)]
pub struct PixelConverter {
    ring: UploadRing,
}

impl PixelConverter {
    /// Creates a converter with a three-slot staging ring.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ring: UploadRing::new(UPLOAD_RING_SIZE),
        }
    }

    /// Staging slots handed out so far.
    #[must_use]
    pub fn conversions(&self) -> u64 {
        self.ring.handed_out()
    }

    /// Copies `rect` of `src` into a staging slot.
    ///
    /// `src_stride` is the pitch of `src` in bytes. The returned rows are
    /// `rect.size.width * target.bytes_per_pixel()` bytes long.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnsupportedPixelFormat`] if the pixels have
    /// no texture format, or [`PipelineError::UnreadableFrame`] if `src` is
    /// shorter than `rect` requires.
    pub fn convert(
        &mut self,
        src: &[u8],
        src_stride: usize,
        rect: IntRect,
        format: PixelFormat,
        pixel_type: PixelType,
    ) -> PipelineResult<&[u8]> {
        let unsupported = || PipelineError::UnsupportedPixelFormat { format, pixel_type };
        let target = TextureFormat::for_core_pixels(format, pixel_type).ok_or_else(unsupported)?;
        let src_bpp = format.bytes_per_pixel(pixel_type).ok_or_else(unsupported)? as usize;
        let dst_bpp = target.bytes_per_pixel() as usize;

        let width = rect.size.width as usize;
        let height = rect.size.height as usize;
        let x = rect.origin.x as usize;
        let y = rect.origin.y as usize;
        let src_row_len = width * src_bpp;
        let dst_row_len = width * dst_bpp;

        if height > 0 {
            let needed = (y + height - 1) * src_stride + x * src_bpp + src_row_len;
            if src_stride < (x * src_bpp + src_row_len) || src.len() < needed {
                return Err(PipelineError::UnreadableFrame(format!(
                    "{} bytes at pitch {src_stride} cannot hold rect {rect}",
                    src.len()
                )));
            }
        }

        let staging = self.ring.next_slot(dst_row_len * height);
        let expand = src_bpp == 3;

        for row in 0..height {
            let start = (y + row) * src_stride + x * src_bpp;
            let src_row = &src[start..start + src_row_len];
            let dst_row = &mut staging[row * dst_row_len..(row + 1) * dst_row_len];

            if expand {
                let rgb: &[[u8; 3]] = bytemuck::cast_slice(src_row);
                let rgba: &mut [[u8; 4]] = bytemuck::cast_slice_mut(dst_row);
                for (dst, &[r, g, b]) in rgba.iter_mut().zip(rgb) {
                    *dst = [r, g, b, 0xFF];
                }
            } else {
                dst_row.copy_from_slice(src_row);
            }
        }

        Ok(staging.as_slice())
    }
}

impl Default for PixelConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copies_only_output_rect() {
        // 4x3 BGRA buffer with an 8-byte row pad; each pixel holds its index.
        let stride = 4 * 4 + 8;
        let mut src = vec![0u8; stride * 3];
        for y in 0..3 {
            for x in 0..4 {
                let i = y * stride + x * 4;
                src[i..i + 4].fill((y * 4 + x) as u8);
            }
        }

        let mut converter = PixelConverter::new();
        let out = converter
            .convert(
                &src,
                stride,
                IntRect::new(1, 1, 2, 2),
                PixelFormat::Bgra,
                PixelType::UnsignedByte,
            )
            .unwrap();

        assert_eq!(out.len(), 2 * 2 * 4);
        assert_eq!(out[0], 5);
        assert_eq!(out[4], 6);
        assert_eq!(out[8], 9);
        assert_eq!(out[12], 10);
    }

    #[test]
    fn test_expands_rgb888() {
        let src = [10u8, 20, 30, 40, 50, 60];
        let mut converter = PixelConverter::new();
        let out = converter
            .convert(
                &src,
                6,
                IntRect::new(0, 0, 2, 1),
                PixelFormat::Rgb,
                PixelType::UnsignedByte,
            )
            .unwrap();
        assert_eq!(out, &[10, 20, 30, 0xFF, 40, 50, 60, 0xFF]);
    }

    #[test]
    fn test_packed_16_copies_verbatim() {
        let src = [0x1F, 0xF8, 0xE0, 0x07];
        let mut converter = PixelConverter::new();
        let out = converter
            .convert(
                &src,
                4,
                IntRect::new(0, 0, 2, 1),
                PixelFormat::Rgb,
                PixelType::UnsignedShort565,
            )
            .unwrap();
        assert_eq!(out, &src);
    }

    #[test]
    fn test_short_buffer_is_unreadable() {
        let src = [0u8; 16];
        let mut converter = PixelConverter::new();
        let err = converter
            .convert(
                &src,
                16,
                IntRect::new(0, 0, 4, 2),
                PixelFormat::Bgra,
                PixelType::UnsignedByte,
            )
            .unwrap_err();
        assert!(matches!(err, PipelineError::UnreadableFrame(_)));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_unsupported_layout() {
        let mut converter = PixelConverter::new();
        let err = converter
            .convert(
                &[0u8; 4],
                4,
                IntRect::new(0, 0, 1, 1),
                PixelFormat::Bgra,
                PixelType::Byte,
            )
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_staging_rotates() {
        let src = [0u8; 4];
        let mut converter = PixelConverter::new();
        for _ in 0..4 {
            converter
                .convert(&src, 4, IntRect::new(0, 0, 1, 1), PixelFormat::Rgba, PixelType::UnsignedByte)
                .unwrap();
        }
        assert_eq!(converter.conversions(), 4);
    }
}
