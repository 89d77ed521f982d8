//! # Texture Handles
//!
//! A [`Texture`] is an immutable view of pixel memory owned by one graphics
//! API. Two textures from different APIs may view the same
//! [`SharedPixelBuffer`]; that is what zero-copy interop means here.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use framepipe_core::{SharedPixelBuffer, WeakPixelBuffer};
use framepipe_shared::{IntRect, IntSize, PixelFormat, PixelType};

static NEXT_TEXTURE_ID: AtomicU64 = AtomicU64::new(1);

/// Which graphics API a handle belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsApi {
    /// The API legacy cores draw with (bottom-left origin).
    Legacy,
    /// The API the presentation pipeline draws with (top-left origin).
    Modern,
}

/// GPU texel formats the pipeline uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    /// 8-bit BGRA, the swapchain and interop format.
    Bgra8Unorm,
    /// 8-bit RGBA.
    Rgba8Unorm,
    /// 8-bit signed RGBA.
    Rgba8Snorm,
    /// 16-bit 5-6-5.
    B5G6R5Unorm,
    /// 16-bit 5-5-5-1.
    A1Bgr5Unorm,
    /// 16-bit 4-4-4-4.
    Abgr4Unorm,
}

impl TextureFormat {
    /// Bytes per texel.
    #[inline]
    #[must_use]
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            Self::Bgra8Unorm | Self::Rgba8Unorm | Self::Rgba8Snorm => 4,
            Self::B5G6R5Unorm | Self::A1Bgr5Unorm | Self::Abgr4Unorm => 2,
        }
    }

    /// Texture format a 2D core's pixels are uploaded into.
    ///
    /// Packed 24-bit RGB has no GPU equivalent; it is expanded to RGBA by
    /// the pixel converter.
    #[must_use]
    pub const fn for_core_pixels(format: PixelFormat, pixel_type: PixelType) -> Option<Self> {
        match (format, pixel_type) {
            (PixelFormat::Bgra, PixelType::UnsignedByte | PixelType::UnsignedInt8888Rev) => {
                Some(Self::Bgra8Unorm)
            }
            (PixelFormat::Rgba | PixelFormat::Rgb, PixelType::UnsignedByte) => {
                Some(Self::Rgba8Unorm)
            }
            (PixelFormat::Rgba, PixelType::Byte) => Some(Self::Rgba8Snorm),
            (PixelFormat::Rgb, PixelType::UnsignedShort565) => Some(Self::B5G6R5Unorm),
            (_, PixelType::UnsignedShort5551) => Some(Self::A1Bgr5Unorm),
            (_, PixelType::UnsignedShort4444) => Some(Self::Abgr4Unorm),
            _ => None,
        }
    }

    /// Decodes one texel to `[r, g, b, a]`.
    #[must_use]
    pub fn decode_rgba(self, texel: &[u8]) -> [u8; 4] {
        match self {
            Self::Bgra8Unorm => [texel[2], texel[1], texel[0], texel[3]],
            Self::Rgba8Unorm => [texel[0], texel[1], texel[2], texel[3]],
            Self::Rgba8Snorm => [
                snorm_to_unorm(texel[0]),
                snorm_to_unorm(texel[1]),
                snorm_to_unorm(texel[2]),
                snorm_to_unorm(texel[3]),
            ],
            Self::B5G6R5Unorm => {
                let v = u16::from_le_bytes([texel[0], texel[1]]);
                [expand5(v >> 11), expand6(v >> 5), expand5(v), 0xFF]
            }
            Self::A1Bgr5Unorm => {
                let v = u16::from_le_bytes([texel[0], texel[1]]);
                let alpha = if v & 1 == 1 { 0xFF } else { 0 };
                [expand5(v >> 11), expand5(v >> 6), expand5(v >> 1), alpha]
            }
            Self::Abgr4Unorm => {
                let v = u16::from_le_bytes([texel[0], texel[1]]);
                [expand4(v >> 12), expand4(v >> 8), expand4(v >> 4), expand4(v)]
            }
        }
    }

    /// Encodes `[r, g, b, a]` into one texel.
    pub fn encode_rgba(self, rgba: [u8; 4], texel: &mut [u8]) {
        let [r, g, b, a] = rgba;
        match self {
            Self::Bgra8Unorm => texel[..4].copy_from_slice(&[b, g, r, a]),
            Self::Rgba8Unorm => texel[..4].copy_from_slice(&rgba),
            Self::Rgba8Snorm => {
                for (dst, src) in texel[..4].iter_mut().zip(rgba) {
                    *dst = src >> 1;
                }
            }
            Self::B5G6R5Unorm => {
                let v = (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
                texel[..2].copy_from_slice(&v.to_le_bytes());
            }
            Self::A1Bgr5Unorm => {
                let v = (u16::from(r >> 3) << 11)
                    | (u16::from(g >> 3) << 6)
                    | (u16::from(b >> 3) << 1)
                    | u16::from(a >> 7);
                texel[..2].copy_from_slice(&v.to_le_bytes());
            }
            Self::Abgr4Unorm => {
                let v = (u16::from(r >> 4) << 12)
                    | (u16::from(g >> 4) << 8)
                    | (u16::from(b >> 4) << 4)
                    | u16::from(a >> 4);
                texel[..2].copy_from_slice(&v.to_le_bytes());
            }
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn expand5(v: u16) -> u8 {
    let v = (v & 0x1F) as u8;
    (v << 3) | (v >> 2)
}

#[allow(clippy::cast_possible_truncation)]
fn expand6(v: u16) -> u8 {
    let v = (v & 0x3F) as u8;
    (v << 2) | (v >> 4)
}

#[allow(clippy::cast_possible_truncation)]
fn expand4(v: u16) -> u8 {
    ((v & 0x0F) as u8) * 17
}

#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]
fn snorm_to_unorm(v: u8) -> u8 {
    let signed = v as i8;
    if signed <= 0 {
        0
    } else {
        (u16::from(signed as u8) * 255 / 127) as u8
    }
}

/// What a texture will be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureUsage {
    /// Sampled by shaders.
    pub shader_read: bool,
    /// Attached as a render target.
    pub render_target: bool,
}

impl TextureUsage {
    /// Sampled only.
    pub const SAMPLED: Self = Self {
        shader_read: true,
        render_target: false,
    };
    /// Sampled and rendered into.
    pub const RENDER_TARGET: Self = Self {
        shader_read: true,
        render_target: true,
    };
}

/// Parameters for creating a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextureDescriptor {
    /// Debug label.
    pub label: &'static str,
    /// Dimensions.
    pub size: IntSize,
    /// Texel format.
    pub format: TextureFormat,
    /// Intended usage.
    pub usage: TextureUsage,
}

impl TextureDescriptor {
    /// Creates a descriptor.
    #[must_use]
    pub const fn new(
        label: &'static str,
        size: IntSize,
        format: TextureFormat,
        usage: TextureUsage,
    ) -> Self {
        Self {
            label,
            size,
            format,
            usage,
        }
    }
}

/// Memory behind a texture.
#[derive(Debug, Clone)]
pub enum TextureStorage {
    /// Memory only this texture sees.
    Private(SharedPixelBuffer),
    /// Memory that other API handles may alias.
    Shared(SharedPixelBuffer),
}

impl TextureStorage {
    fn buffer(&self) -> &SharedPixelBuffer {
        match self {
            Self::Private(buffer) | Self::Shared(buffer) => buffer,
        }
    }
}

struct TextureInner {
    id: u64,
    api: GraphicsApi,
    descriptor: TextureDescriptor,
    storage: TextureStorage,
}

/// Immutable texture handle. Cloning shares the handle.
#[derive(Clone)]
pub struct Texture {
    inner: Arc<TextureInner>,
}

impl Texture {
    /// Wraps storage in a new handle. Called by backends.
    ///
    /// # Panics
    ///
    /// Panics if the storage dimensions or texel size disagree with the
    /// descriptor.
    #[must_use]
    pub fn new(api: GraphicsApi, descriptor: TextureDescriptor, storage: TextureStorage) -> Self {
        let buffer = storage.buffer();
        assert_eq!(buffer.size(), descriptor.size, "Texture storage size mismatch");
        assert_eq!(
            buffer.bytes_per_pixel(),
            descriptor.format.bytes_per_pixel(),
            "Texture storage texel size mismatch"
        );

        Self {
            inner: Arc::new(TextureInner {
                id: NEXT_TEXTURE_ID.fetch_add(1, Ordering::Relaxed),
                api,
                descriptor,
                storage,
            }),
        }
    }

    /// Allocates private storage for `descriptor`.
    ///
    /// # Panics
    ///
    /// Panics on sizes [`SharedPixelBuffer::new`] refuses.
    #[must_use]
    pub fn new_private(api: GraphicsApi, descriptor: TextureDescriptor) -> Self {
        let buffer = SharedPixelBuffer::new(descriptor.size, descriptor.format.bytes_per_pixel());
        Self::new(api, descriptor, TextureStorage::Private(buffer))
    }

    /// Allocates private storage for `descriptor`, or `None` for a size no
    /// buffer can hold.
    #[must_use]
    pub fn try_new_private(api: GraphicsApi, descriptor: TextureDescriptor) -> Option<Self> {
        let buffer =
            SharedPixelBuffer::try_new(descriptor.size, descriptor.format.bytes_per_pixel())?;
        Some(Self::new(api, descriptor, TextureStorage::Private(buffer)))
    }

    /// Process-unique handle id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Owning API.
    #[inline]
    #[must_use]
    pub fn api(&self) -> GraphicsApi {
        self.inner.api
    }

    /// Creation parameters.
    #[inline]
    #[must_use]
    pub fn descriptor(&self) -> &TextureDescriptor {
        &self.inner.descriptor
    }

    /// Dimensions.
    #[inline]
    #[must_use]
    pub fn size(&self) -> IntSize {
        self.inner.descriptor.size
    }

    /// Texel format.
    #[inline]
    #[must_use]
    pub fn format(&self) -> TextureFormat {
        self.inner.descriptor.format
    }

    /// Backing memory.
    #[inline]
    #[must_use]
    pub fn storage(&self) -> &SharedPixelBuffer {
        self.inner.storage.buffer()
    }

    /// True if the memory may be aliased by another API's handle.
    #[inline]
    #[must_use]
    pub fn is_shared(&self) -> bool {
        matches!(self.inner.storage, TextureStorage::Shared(_))
    }

    /// True if both handles view the same memory.
    #[must_use]
    pub fn aliases(&self, other: &Self) -> bool {
        self.storage().aliases(other.storage())
    }

    /// Non-owning reference to the backing memory.
    #[must_use]
    pub fn downgrade_storage(&self) -> WeakPixelBuffer {
        self.storage().downgrade()
    }

    /// Copies `rect` out as tightly packed rows.
    #[must_use]
    pub fn read_pixels(&self, rect: IntRect) -> Option<Vec<u8>> {
        self.storage().read_rect(rect)
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Texture {}

impl fmt::Debug for Texture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Texture")
            .field("id", &self.inner.id)
            .field("api", &self.inner.api)
            .field("label", &self.inner.descriptor.label)
            .field("size", &self.inner.descriptor.size)
            .field("format", &self.inner.descriptor.format)
            .field("shared", &self.is_shared())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_pixel_mapping() {
        use PixelFormat::{Bgra, Rgb, Rgba};
        use PixelType::*;

        assert_eq!(
            TextureFormat::for_core_pixels(Bgra, UnsignedInt8888Rev),
            Some(TextureFormat::Bgra8Unorm)
        );
        assert_eq!(
            TextureFormat::for_core_pixels(Rgb, UnsignedByte),
            Some(TextureFormat::Rgba8Unorm)
        );
        assert_eq!(
            TextureFormat::for_core_pixels(Rgb, UnsignedShort565),
            Some(TextureFormat::B5G6R5Unorm)
        );
        assert_eq!(
            TextureFormat::for_core_pixels(Rgba, UnsignedShort4444),
            Some(TextureFormat::Abgr4Unorm)
        );
        assert_eq!(TextureFormat::for_core_pixels(Bgra, Byte), None);
        assert_eq!(TextureFormat::for_core_pixels(Rgba, UnsignedShort565), None);
    }

    #[test]
    fn test_texel_codecs() {
        let rgba = [0xFF, 0x80, 0x00, 0xFF];
        for format in [
            TextureFormat::Bgra8Unorm,
            TextureFormat::Rgba8Unorm,
        ] {
            let mut texel = [0u8; 4];
            format.encode_rgba(rgba, &mut texel);
            assert_eq!(format.decode_rgba(&texel), rgba);
        }

        let mut texel = [0u8; 2];
        TextureFormat::B5G6R5Unorm.encode_rgba([0xFF, 0x00, 0xFF, 0xFF], &mut texel);
        assert_eq!(u16::from_le_bytes(texel), 0xF81F);
        assert_eq!(
            TextureFormat::B5G6R5Unorm.decode_rgba(&texel),
            [0xFF, 0x00, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_aliasing_across_apis() {
        let desc = TextureDescriptor::new(
            "interop",
            IntSize::new(8, 8),
            TextureFormat::Bgra8Unorm,
            TextureUsage::RENDER_TARGET,
        );
        let buffer = SharedPixelBuffer::new(desc.size, 4);
        let legacy = Texture::new(GraphicsApi::Legacy, desc, TextureStorage::Shared(buffer.clone()));
        let modern = Texture::new(GraphicsApi::Modern, desc, TextureStorage::Shared(buffer));
        let private = Texture::new_private(GraphicsApi::Modern, desc);

        assert!(legacy.aliases(&modern));
        assert!(!modern.aliases(&private));
        assert_ne!(legacy.id(), modern.id());
        assert!(legacy.is_shared());
        assert!(!private.is_shared());
    }

    #[test]
    #[should_panic(expected = "Texture storage size mismatch")]
    fn test_storage_mismatch_panics() {
        let desc = TextureDescriptor::new(
            "bad",
            IntSize::new(8, 8),
            TextureFormat::Bgra8Unorm,
            TextureUsage::SAMPLED,
        );
        let buffer = SharedPixelBuffer::new(IntSize::new(4, 4), 4);
        let _ = Texture::new(GraphicsApi::Modern, desc, TextureStorage::Private(buffer));
    }
}
