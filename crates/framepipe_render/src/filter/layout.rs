//! Viewport placement for the final pass.

use framepipe_shared::{IntRect, IntSize};

/// Largest rect with `aspect`'s ratio that fits centered in `container`.
///
/// With `integer_scaling` the height snaps down to a whole multiple of
/// `content`'s height (never below one multiple) and the width follows the
/// aspect ratio. An empty `aspect` falls back to `content`'s ratio.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn aspect_fit(
    container: IntSize,
    aspect: IntSize,
    integer_scaling: bool,
    content: IntSize,
) -> IntRect {
    if container.is_empty() {
        return IntRect::from_size(IntSize::ZERO);
    }
    let aspect = if aspect.is_empty() { content } else { aspect };
    if aspect.is_empty() {
        return IntRect::from_size(container);
    }

    let ratio = f64::from(aspect.width) / f64::from(aspect.height);
    let cw = f64::from(container.width);
    let ch = f64::from(container.height);

    let mut height = if cw / ch > ratio { ch } else { cw / ratio };
    if integer_scaling && !content.is_empty() {
        let multiple = (height / f64::from(content.height)).floor().max(1.0);
        height = f64::from(content.height) * multiple;
    }
    let mut width = height * ratio;
    if width > cw {
        width = cw;
        height = width / ratio;
    }
    let height = height.min(ch).round().max(1.0) as u32;
    let width = width.round().max(1.0) as u32;

    let x = (container.width - width) / 2;
    let y = (container.height - height) / 2;
    IntRect::new(x, y, width, height)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pillarbox() {
        let rect = aspect_fit(
            IntSize::new(1920, 1080),
            IntSize::new(4, 3),
            false,
            IntSize::new(256, 224),
        );
        assert_eq!(rect, IntRect::new(240, 0, 1440, 1080));
    }

    #[test]
    fn test_letterbox() {
        let rect = aspect_fit(
            IntSize::new(800, 800),
            IntSize::new(4, 3),
            false,
            IntSize::new(320, 240),
        );
        assert_eq!(rect, IntRect::new(0, 100, 800, 600));
    }

    #[test]
    fn test_integer_scaling_snaps_height() {
        let rect = aspect_fit(
            IntSize::new(1920, 1080),
            IntSize::new(4, 3),
            true,
            IntSize::new(320, 240),
        );
        assert_eq!(rect.size, IntSize::new(1280, 960));
        assert_eq!(rect.origin.x, 320);
        assert_eq!(rect.origin.y, 60);
    }

    #[test]
    fn test_empty_aspect_uses_content() {
        let rect = aspect_fit(IntSize::new(512, 448), IntSize::ZERO, false, IntSize::new(256, 224));
        assert_eq!(rect, IntRect::new(0, 0, 512, 448));
    }

    #[test]
    fn test_empty_container() {
        assert!(aspect_fit(IntSize::ZERO, IntSize::new(4, 3), false, IntSize::new(1, 1)).is_empty());
    }
}
