//! Software execution of recorded commands.
//!
//! Every operation copies what it reads before locking what it writes, so
//! a texture used as both source and target never deadlocks.

use framepipe_shared::{IntPoint, IntRect};

use crate::gpu::{DrawPass, Texture, TextureFormat};

/// Converts a normalized color to 8-bit RGBA.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn color_to_rgba8(color: [f64; 4]) -> [u8; 4] {
    color.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8)
}

/// Fills every texel of `target`.
pub fn clear(target: &Texture, color: [f64; 4]) {
    let format = target.format();
    let bpp = format.bytes_per_pixel() as usize;
    let mut texel = [0u8; 4];
    format.encode_rgba(color_to_rgba8(color), &mut texel);

    let mut pixels = target.storage().write();
    for chunk in pixels.chunks_exact_mut(bpp) {
        chunk.copy_from_slice(&texel[..bpp]);
    }
}

/// Copies `rect` of `source` to `origin` in `target`, converting texels
/// when the formats differ. Returns false if either region does not fit.
pub fn copy(source: &Texture, rect: IntRect, target: &Texture, origin: IntPoint) -> bool {
    let Some(bytes) = source.read_pixels(rect) else {
        return false;
    };
    let bytes = if source.format() == target.format() {
        bytes
    } else {
        convert(&bytes, source.format(), target.format())
    };
    let stride = rect.size.width as usize * target.format().bytes_per_pixel() as usize;
    target.storage().write_rect(origin, rect.size, &bytes, stride)
}

fn convert(bytes: &[u8], from: TextureFormat, to: TextureFormat) -> Vec<u8> {
    let from_bpp = from.bytes_per_pixel() as usize;
    let to_bpp = to.bytes_per_pixel() as usize;
    let mut out = vec![0u8; bytes.len() / from_bpp * to_bpp];
    for (src, dst) in bytes.chunks_exact(from_bpp).zip(out.chunks_exact_mut(to_bpp)) {
        to.encode_rgba(from.decode_rgba(src), dst);
    }
    out
}

/// Draws a textured quad. Sampling is nearest for either filter mode.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn draw(pass: &DrawPass) {
    let src_rect = pass.source_rect;
    let viewport = clip(pass.viewport, pass.target.size().width, pass.target.size().height);
    if src_rect.is_empty() || viewport.is_empty() {
        return;
    }
    let Some(src) = pass.source.read_pixels(src_rect) else {
        return;
    };

    let src_format = pass.source.format();
    let dst_format = pass.target.format();
    let src_bpp = src_format.bytes_per_pixel() as usize;
    let dst_bpp = dst_format.bytes_per_pixel() as usize;
    let src_w = src_rect.size.width as usize;
    let src_h = src_rect.size.height as usize;
    let full_w = pass.viewport.size.width as f64;
    let full_h = pass.viewport.size.height as f64;
    let dst_stride = pass.target.storage().bytes_per_row();

    let mut pixels = pass.target.storage().write();
    for y in viewport.origin.y..viewport.origin.y + viewport.size.height {
        let v = (f64::from(y - pass.viewport.origin.y) + 0.5) / full_h;
        let mut row = ((v * src_h as f64) as usize).min(src_h - 1);
        if pass.flip_vertically {
            row = src_h - 1 - row;
        }
        for x in viewport.origin.x..viewport.origin.x + viewport.size.width {
            let u = (f64::from(x - pass.viewport.origin.x) + 0.5) / full_w;
            let col = ((u * src_w as f64) as usize).min(src_w - 1);
            let s = (row * src_w + col) * src_bpp;
            let d = y as usize * dst_stride + x as usize * dst_bpp;
            dst_format.encode_rgba(
                src_format.decode_rgba(&src[s..s + src_bpp]),
                &mut pixels[d..d + dst_bpp],
            );
        }
    }
}

fn clip(rect: IntRect, width: u32, height: u32) -> IntRect {
    let x = rect.origin.x.min(width);
    let y = rect.origin.y.min(height);
    let w = rect.size.width.min(width - x);
    let h = rect.size.height.min(height - y);
    IntRect::new(x, y, w, h)
}
