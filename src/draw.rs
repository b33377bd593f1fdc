// Software blitting of feed buffers onto a canvas.
// Visual effects provided here:
// 1) A feed frame scaled into its preview rectangle.
// 2) Both previews composited in a fixed order (remote on top).

use tracing::trace;

use crate::layout::PreviewLayout;
use crate::types::{Feed, FeedBuffers, FrameBuffer, PreviewRect};

/// Scale the whole of `src` into `rect` on `dst` (nearest neighbour).
/// Parts of the rectangle outside `dst` are clipped.
/// Returns false without touching `dst` when there is nothing to draw:
/// a degenerate rectangle, an empty source, or a rectangle fully off-canvas.
pub fn blit_scaled(dst: &mut FrameBuffer, src: &FrameBuffer, rect: PreviewRect) -> bool {
    if rect.is_degenerate() || src.width() == 0 || src.height() == 0 {
        return false;
    }

    // Clip to the destination once so the inner loop has no bounds checks.
    let x0 = rect.left.max(0);
    let y0 = rect.top.max(0);
    let x1 = rect.right.min(dst.width() as i32);
    let y1 = rect.bottom.min(dst.height() as i32);
    if x0 >= x1 || y0 >= y1 {
        return false;
    }

    // Offsets into the rectangle can exceed i32 for extreme layouts.
    let rw = i64::from(rect.right) - i64::from(rect.left);
    let rh = i64::from(rect.bottom) - i64::from(rect.top);
    let (sw, sh) = src.dimensions();
    let dst_w = dst.width();
    let src_px = src.pixels();
    let dst_px = dst.pixels_mut();

    for y in y0..y1 {
        // Row in the source that lands on this destination row.
        let sy = scale_index(i64::from(y) - i64::from(rect.top), sh, rh);
        let src_row = &src_px[sy * sw..(sy + 1) * sw];
        let dst_row = &mut dst_px[y as usize * dst_w..(y as usize + 1) * dst_w];
        for x in x0..x1 {
            let sx = scale_index(i64::from(x) - i64::from(rect.left), sw, rw);
            dst_row[x as usize] = src_row[sx];
        }
    }
    true
}

/// Nearest source index for `offset` within a span of `span` pixels.
fn scale_index(offset: i64, src_len: usize, span: i64) -> usize {
    ((offset as u128 * src_len as u128) / span as u128) as usize
}

/// Overwrite all of `dst` with `src`, resampling when the sizes differ.
/// Capture sources use this to honour the fixed size of the feed buffers.
pub fn fit_into(dst: &mut FrameBuffer, src: &FrameBuffer) {
    if dst.dimensions() == src.dimensions() {
        dst.pixels_mut().copy_from_slice(src.pixels());
        return;
    }
    let full = PreviewRect::new(0, 0, dst.width() as i32, dst.height() as i32);
    blit_scaled(dst, src, full);
}

/// Pack tightly packed 8-bit RGB into `dst`, resampling when the sizes differ.
/// Short input leaves `dst` untouched and returns false.
pub fn fit_rgb_into(dst: &mut FrameBuffer, rgb: &[u8], width: usize, height: usize) -> bool {
    let Some(len) = width.checked_mul(height).and_then(|n| n.checked_mul(3)) else {
        return false;
    };
    if width == 0 || height == 0 || rgb.len() < len {
        return false;
    }

    let (dw, dh) = dst.dimensions();
    if dw == 0 || dh == 0 {
        return false;
    }
    let px = dst.pixels_mut();
    for y in 0..dh {
        let sy = y * height / dh;
        let row = &rgb[sy * width * 3..(sy + 1) * width * 3];
        for x in 0..dw {
            let sx = x * width / dw;
            let p = &row[sx * 3..sx * 3 + 3];
            px[y * dw + x] = (p[0] as u32) << 16 | (p[1] as u32) << 8 | p[2] as u32;
        }
    }
    true
}

/// Which previews actually made it onto the canvas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Composited {
    pub local: bool,
    pub remote: bool,
}

/// Feeds in drawing order. Remote goes last so it wins wherever they overlap.
pub const DRAW_ORDER: [Feed; 2] = [Feed::Local, Feed::Remote];

/// Draw both previews onto the canvas in [`DRAW_ORDER`].
pub fn composite(canvas: &mut FrameBuffer, feeds: &FeedBuffers, layout: &PreviewLayout) -> Composited {
    let mut done = Composited::default();
    for feed in DRAW_ORDER {
        let drawn = blit_scaled(canvas, feeds.get(feed), layout.rect(feed));
        if !drawn {
            trace!(%feed, "preview skipped");
        }
        match feed {
            Feed::Local => done.local = drawn,
            Feed::Remote => done.remote = drawn,
        }
    }
    done
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: usize, h: usize, color: u32) -> FrameBuffer {
        let mut fb = FrameBuffer::allocate(w, h).unwrap();
        fb.fill(color);
        fb
    }

    #[test]
    fn blit_fills_exactly_the_rect() {
        let mut canvas = FrameBuffer::allocate(10, 10).unwrap();
        let src = solid(4, 4, 0x00_AA_00_00);
        assert!(blit_scaled(&mut canvas, &src, PreviewRect::new(2, 3, 6, 5)));

        for y in 0..10 {
            for x in 0..10 {
                let inside = (2..6).contains(&x) && (3..5).contains(&y);
                let expected = if inside { 0x00_AA_00_00 } else { 0 };
                assert_eq!(canvas.pixel(x, y), Some(expected), "pixel ({x},{y})");
            }
        }
    }

    #[test]
    fn blit_scales_up_nearest() {
        let mut src = FrameBuffer::allocate(2, 1).unwrap();
        src.pixels_mut().copy_from_slice(&[1, 2]);
        let mut canvas = FrameBuffer::allocate(4, 2).unwrap();
        assert!(blit_scaled(&mut canvas, &src, PreviewRect::new(0, 0, 4, 2)));
        assert_eq!(canvas.pixels(), &[1, 1, 2, 2, 1, 1, 2, 2]);
    }

    #[test]
    fn fit_into_resamples_to_destination_size() {
        let mut src = FrameBuffer::allocate(4, 2).unwrap();
        src.pixels_mut().copy_from_slice(&[1, 1, 2, 2, 3, 3, 4, 4]);
        let mut dst = FrameBuffer::allocate(2, 1).unwrap();
        fit_into(&mut dst, &src);
        assert_eq!(dst.pixels(), &[1, 2]);

        let mut same = FrameBuffer::allocate(4, 2).unwrap();
        fit_into(&mut same, &src);
        assert_eq!(same.pixels(), src.pixels());
    }

    #[test]
    fn blit_clips_to_canvas() {
        let mut canvas = FrameBuffer::allocate(4, 4).unwrap();
        let src = solid(8, 8, 7);
        assert!(blit_scaled(&mut canvas, &src, PreviewRect::new(-2, -2, 2, 2)));
        assert_eq!(canvas.pixel(0, 0), Some(7));
        assert_eq!(canvas.pixel(1, 1), Some(7));
        assert_eq!(canvas.pixel(2, 2), Some(0));
    }

    #[test]
    fn degenerate_rect_is_skipped() {
        let mut canvas = solid(4, 4, 9);
        let src = solid(2, 2, 1);
        assert!(!blit_scaled(&mut canvas, &src, PreviewRect::new(3, 0, 1, 4)));
        assert!(!blit_scaled(&mut canvas, &src, PreviewRect::new(0, 2, 4, 2)));
        assert!(canvas.pixels().iter().all(|&p| p == 9));
    }

    #[test]
    fn off_canvas_rect_is_skipped() {
        let mut canvas = FrameBuffer::allocate(4, 4).unwrap();
        let src = solid(2, 2, 1);
        assert!(!blit_scaled(&mut canvas, &src, PreviewRect::new(10, 10, 20, 20)));
    }

    #[test]
    fn remote_is_drawn_on_top() {
        let feeds = FeedBuffers {
            local: solid(4, 4, 0x00_00_00_FF),
            remote: solid(4, 4, 0x00_FF_00_00),
        };
        let layout = PreviewLayout {
            local: PreviewRect::new(0, 0, 6, 6),
            remote: PreviewRect::new(3, 3, 8, 8),
        };
        let mut canvas = FrameBuffer::allocate(8, 8).unwrap();
        let done = composite(&mut canvas, &feeds, &layout);
        assert_eq!(done, Composited { local: true, remote: true });

        for y in 3..6 {
            for x in 3..6 {
                assert_eq!(canvas.pixel(x, y), Some(0x00_FF_00_00));
            }
        }
        assert_eq!(canvas.pixel(1, 1), Some(0x00_00_00_FF));
    }

    #[test]
    fn huge_rect_is_clipped_without_overflow() {
        let mut canvas = FrameBuffer::allocate(4, 4).unwrap();
        let src = solid(2, 2, 0x00_00_77_00);
        let rect = PreviewRect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX);
        assert!(blit_scaled(&mut canvas, &src, rect));
        assert!(canvas.pixels().iter().all(|&p| p == 0x00_00_77_00));
    }

    #[test]
    fn rgb_is_packed_and_resampled() {
        // 2x1: red then blue
        let rgb = [0xFF, 0x00, 0x00, 0x00, 0x00, 0xFF];
        let mut same = FrameBuffer::allocate(2, 1).unwrap();
        assert!(fit_rgb_into(&mut same, &rgb, 2, 1));
        assert_eq!(same.pixels(), &[0x00_FF_00_00, 0x00_00_00_FF]);

        let mut wide = FrameBuffer::allocate(4, 2).unwrap();
        assert!(fit_rgb_into(&mut wide, &rgb, 2, 1));
        assert_eq!(wide.pixel(1, 1), Some(0x00_FF_00_00));
        assert_eq!(wide.pixel(2, 0), Some(0x00_00_00_FF));
    }

    #[test]
    fn short_rgb_leaves_buffer_alone() {
        let mut fb = solid(2, 2, 7);
        assert!(!fit_rgb_into(&mut fb, &[0; 5], 2, 1));
        assert!(fb.pixels().iter().all(|&p| p == 7));
    }
}
