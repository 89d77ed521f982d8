//! # Shared Pixel Buffer
//!
//! A block of pixel memory that several texture handles may alias at once.
//! Dimensions are fixed at allocation: a resolution change allocates a new
//! buffer, it never mutates an existing one.
//!
//! Handles are cheap clones of an `Arc`. Whether two handles are views of
//! the same memory is answered by [`SharedPixelBuffer::aliases`].

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use framepipe_shared::{IntPoint, IntRect, IntSize, MAX_BUFFER_DIMENSION};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

static NEXT_BUFFER_ID: AtomicU64 = AtomicU64::new(1);

struct BufferInner {
    id: u64,
    size: IntSize,
    bytes_per_pixel: u32,
    bytes_per_row: usize,
    pixels: RwLock<Box<[u8]>>,
}

/// Shareable pixel storage.
#[derive(Clone)]
pub struct SharedPixelBuffer {
    inner: Arc<BufferInner>,
}

/// Non-owning reference used to prove a buffer has been released.
#[derive(Clone)]
pub struct WeakPixelBuffer {
    id: u64,
    inner: Weak<BufferInner>,
}

impl SharedPixelBuffer {
    /// Allocates a zeroed buffer.
    ///
    /// # Panics
    ///
    /// Panics if `size` is empty, `bytes_per_pixel` is zero, or the buffer
    /// is larger than [`MAX_BUFFER_DIMENSION`]. Sizes that come from a core
    /// go through [`SharedPixelBuffer::try_new`].
    #[must_use]
    pub fn new(size: IntSize, bytes_per_pixel: u32) -> Self {
        assert!(!size.is_empty(), "Pixel buffer size must be non-zero");
        assert!(bytes_per_pixel > 0, "Bytes per pixel must be non-zero");
        match Self::try_new(size, bytes_per_pixel) {
            Some(buffer) => buffer,
            None => panic!("Pixel buffer {size} exceeds {MAX_BUFFER_DIMENSION} pixels per side"),
        }
    }

    /// Allocates a zeroed buffer, or returns `None` if `size` is empty,
    /// `bytes_per_pixel` is zero, a side exceeds [`MAX_BUFFER_DIMENSION`] or
    /// the byte length does not fit in memory.
    #[must_use]
    pub fn try_new(size: IntSize, bytes_per_pixel: u32) -> Option<Self> {
        if size.is_empty()
            || bytes_per_pixel == 0
            || size.width > MAX_BUFFER_DIMENSION
            || size.height > MAX_BUFFER_DIMENSION
        {
            return None;
        }

        let bytes_per_row = usize::try_from(size.width)
            .ok()?
            .checked_mul(usize::try_from(bytes_per_pixel).ok()?)?;
        let len = bytes_per_row.checked_mul(usize::try_from(size.height).ok()?)?;

        Some(Self {
            inner: Arc::new(BufferInner {
                id: NEXT_BUFFER_ID.fetch_add(1, Ordering::Relaxed),
                size,
                bytes_per_pixel,
                bytes_per_row,
                pixels: RwLock::new(vec![0u8; len].into_boxed_slice()),
            }),
        })
    }

    /// Process-unique allocation id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Dimensions in pixels.
    #[inline]
    #[must_use]
    pub fn size(&self) -> IntSize {
        self.inner.size
    }

    /// Bytes per pixel.
    #[inline]
    #[must_use]
    pub fn bytes_per_pixel(&self) -> u32 {
        self.inner.bytes_per_pixel
    }

    /// Row pitch in bytes.
    #[inline]
    #[must_use]
    pub fn bytes_per_row(&self) -> usize {
        self.inner.bytes_per_row
    }

    /// Total length in bytes.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.bytes_per_row * self.inner.size.height as usize
    }

    /// Always false: empty buffers cannot be allocated.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if both handles view the same memory.
    #[inline]
    #[must_use]
    pub fn aliases(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Number of live handles to this memory.
    #[inline]
    #[must_use]
    pub fn handle_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Creates a non-owning reference.
    #[must_use]
    pub fn downgrade(&self) -> WeakPixelBuffer {
        WeakPixelBuffer {
            id: self.inner.id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Locks the pixels for reading.
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, Box<[u8]>> {
        self.inner.pixels.read()
    }

    /// Locks the pixels for writing.
    #[inline]
    pub fn write(&self) -> RwLockWriteGuard<'_, Box<[u8]>> {
        self.inner.pixels.write()
    }

    /// Fills every pixel of a 32-bit buffer with `pixel`.
    ///
    /// # Panics
    ///
    /// Panics if the buffer is not 4 bytes per pixel.
    pub fn fill(&self, pixel: [u8; 4]) {
        assert_eq!(self.inner.bytes_per_pixel, 4, "fill requires a 32-bit buffer");
        let mut pixels = self.write();
        let texels: &mut [[u8; 4]] = bytemuck::cast_slice_mut(&mut pixels[..]);
        texels.fill(pixel);
    }

    /// Copies `rect` out as tightly packed rows.
    ///
    /// Returns `None` if the rectangle does not fit the buffer.
    #[must_use]
    pub fn read_rect(&self, rect: IntRect) -> Option<Vec<u8>> {
        if !rect.fits_within(self.inner.size) {
            return None;
        }
        let bpp = self.inner.bytes_per_pixel as usize;
        let row_len = rect.size.width as usize * bpp;
        let mut out = Vec::with_capacity(row_len * rect.size.height as usize);

        let pixels = self.read();
        for row in 0..rect.size.height as usize {
            let start = (rect.origin.y as usize + row) * self.inner.bytes_per_row
                + rect.origin.x as usize * bpp;
            out.extend_from_slice(&pixels[start..start + row_len]);
        }
        Some(out)
    }

    /// Writes tightly packed or pitched rows at `origin`.
    ///
    /// `src_stride` is the pitch of `src` in bytes. Returns false, writing
    /// nothing, if the region does not fit or `src` is too short.
    pub fn write_rect(&self, origin: IntPoint, size: IntSize, src: &[u8], src_stride: usize) -> bool {
        let rect = IntRect { origin, size };
        let bpp = self.inner.bytes_per_pixel as usize;
        let row_len = size.width as usize * bpp;
        if !rect.fits_within(self.inner.size) || src_stride < row_len {
            return false;
        }
        let rows = size.height as usize;
        if rows > 0 && src.len() < (rows - 1) * src_stride + row_len {
            return false;
        }

        let mut pixels = self.write();
        for row in 0..rows {
            let dst = (origin.y as usize + row) * self.inner.bytes_per_row + origin.x as usize * bpp;
            let src_row = &src[row * src_stride..row * src_stride + row_len];
            pixels[dst..dst + row_len].copy_from_slice(src_row);
        }
        true
    }
}

impl fmt::Debug for SharedPixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedPixelBuffer")
            .field("id", &self.inner.id)
            .field("size", &self.inner.size)
            .field("bytes_per_pixel", &self.inner.bytes_per_pixel)
            .finish_non_exhaustive()
    }
}

impl WeakPixelBuffer {
    /// Allocation id of the referenced buffer.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True while any strong handle still exists.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.inner.strong_count() > 0
    }

    /// Recovers a strong handle if the buffer is still alive.
    #[must_use]
    pub fn upgrade(&self) -> Option<SharedPixelBuffer> {
        self.inner.upgrade().map(|inner| SharedPixelBuffer { inner })
    }
}

impl fmt::Debug for WeakPixelBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakPixelBuffer")
            .field("id", &self.id)
            .field("alive", &self.is_alive())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let buffer = SharedPixelBuffer::new(IntSize::new(256, 224), 4);
        assert_eq!(buffer.bytes_per_row(), 1024);
        assert_eq!(buffer.len(), 1024 * 224);
        assert!(buffer.read().iter().all(|&b| b == 0));
    }

    #[test]
    #[should_panic(expected = "Pixel buffer size must be non-zero")]
    fn test_zero_size_panics() {
        let _ = SharedPixelBuffer::new(IntSize::new(0, 224), 4);
    }

    #[test]
    fn test_impossible_sizes_are_refused() {
        assert!(SharedPixelBuffer::try_new(IntSize::new(u32::MAX, u32::MAX), 4).is_none());
        assert!(SharedPixelBuffer::try_new(IntSize::new(MAX_BUFFER_DIMENSION + 1, 1), 4).is_none());
        assert!(SharedPixelBuffer::try_new(IntSize::new(4, 4), 0).is_none());

        let edge = SharedPixelBuffer::try_new(IntSize::new(MAX_BUFFER_DIMENSION, 1), 4).unwrap();
        assert_eq!(edge.len(), MAX_BUFFER_DIMENSION as usize * 4);
    }

    #[test]
    fn test_aliasing() {
        let a = SharedPixelBuffer::new(IntSize::new(4, 4), 4);
        let b = a.clone();
        let c = SharedPixelBuffer::new(IntSize::new(4, 4), 4);

        assert!(a.aliases(&b));
        assert!(!a.aliases(&c));
        assert_ne!(a.id(), c.id());
        assert_eq!(a.handle_count(), 2);

        b.fill([1, 2, 3, 4]);
        assert_eq!(&a.read()[..4], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_weak_tracks_release() {
        let buffer = SharedPixelBuffer::new(IntSize::new(2, 2), 4);
        let weak = buffer.downgrade();
        assert!(weak.is_alive());
        drop(buffer);
        assert!(!weak.is_alive());
        assert!(weak.upgrade().is_none());
    }

    #[test]
    fn test_rect_round_trip_with_pitch() {
        let buffer = SharedPixelBuffer::new(IntSize::new(4, 4), 2);
        // 2x2 block with a 6-byte source pitch (2 bytes of padding).
        let src = [1, 1, 2, 2, 0, 0, 3, 3, 4, 4, 0, 0];
        assert!(buffer.write_rect(IntPoint::new(1, 1), IntSize::new(2, 2), &src, 6));

        let out = buffer.read_rect(IntRect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(out, vec![1, 1, 2, 2, 3, 3, 4, 4]);
        assert!(buffer.read_rect(IntRect::new(3, 3, 2, 2)).is_none());
    }

    #[test]
    fn test_write_rect_rejects_short_source() {
        let buffer = SharedPixelBuffer::new(IntSize::new(4, 4), 4);
        assert!(!buffer.write_rect(IntPoint::ZERO, IntSize::new(4, 4), &[0; 16], 16));
        assert!(!buffer.write_rect(IntPoint::ZERO, IntSize::new(2, 1), &[0; 8], 4));
    }
}
