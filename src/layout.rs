// Where the two previews go on the surface.
// Local sits in the top-right corner at its preview size; remote fills the
// rest of the height on the left, stopping one margin short of the local box.

use crate::types::{Feed, PreviewRect};

/// Both preview rectangles. Always published together so the render thread
/// never sees one from an old surface size and one from a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewLayout {
    pub local: PreviewRect,
    pub remote: PreviewRect,
}

impl PreviewLayout {
    pub fn rect(&self, feed: Feed) -> PreviewRect {
        match feed {
            Feed::Local => self.local,
            Feed::Remote => self.remote,
        }
    }
}

/// Compute the layout for a surface of `surface_width` x `surface_height`.
/// No clamping: a surface smaller than the previews plus margins yields
/// degenerate rectangles, which the draw step skips.
/// Edges are worked out in `i64` and saturated to `i32`, so any input is valid.
pub fn compute_layout(
    surface_width: i32,
    surface_height: i32,
    preview_width: i32,
    preview_height: i32,
    margin: i32,
) -> PreviewLayout {
    let (sw, sh) = (i64::from(surface_width), i64::from(surface_height));
    let (pw, ph) = (i64::from(preview_width), i64::from(preview_height));
    let m = i64::from(margin);

    let local = PreviewRect {
        left: saturate(sw - pw - m),
        top: margin,
        right: saturate(sw - m),
        bottom: saturate(ph + m),
    };

    let remote = PreviewRect {
        left: margin,
        top: margin,
        right: saturate(sw - pw - 2 * m),
        bottom: saturate(sh - m),
    };

    PreviewLayout { local, remote }
}

fn saturate(v: i64) -> i32 {
    v.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}
