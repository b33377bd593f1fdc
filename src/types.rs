// Core types shared by the capture, layout and render code.

use std::fmt;

use crate::error::{Error, Result};

/// Fixed-size pixel buffer, one per feed.
/// Each pixel is 0x00RRGGBB, which is what minifb presents directly.
/// The size is fixed at allocation; pixel data is only handed out as slices.
#[derive(Clone)]
pub struct FrameBuffer {
    width: usize,
    height: usize,
    pixels: Vec<u32>,
}

impl FrameBuffer {
    /// Zero-initialized (black) buffer. Fails only if memory is exhausted.
    pub fn allocate(width: usize, height: usize) -> Result<Self> {
        let len = width
            .checked_mul(height)
            .ok_or(Error::Allocation { width, height })?;
        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| Error::Allocation { width, height })?;
        pixels.resize(len, 0);
        Ok(Self { width, height, pixels })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }

    pub fn pixels_mut(&mut self) -> &mut [u32] {
        &mut self.pixels
    }

    /// Pixel at (x, y), or None outside the buffer.
    pub fn pixel(&self, x: usize, y: usize) -> Option<u32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Paint every pixel with one colour.
    pub fn fill(&mut self, color: u32) {
        self.pixels.fill(color);
    }
}

impl fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish_non_exhaustive()
    }
}

/// The two video sources shown by the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feed {
    Local,
    Remote,
}

impl fmt::Display for Feed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Feed::Local => write!(f, "local"),
            Feed::Remote => write!(f, "remote"),
        }
    }
}

/// The pair of per-feed buffers. Moved into the render thread while it runs
/// and handed back when it exits.
#[derive(Debug)]
pub struct FeedBuffers {
    pub local: FrameBuffer,
    pub remote: FrameBuffer,
}

impl FeedBuffers {
    /// Both buffers at the capture resolution.
    pub fn allocate(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            local: FrameBuffer::allocate(width, height)?,
            remote: FrameBuffer::allocate(width, height)?,
        })
    }

    pub fn get(&self, feed: Feed) -> &FrameBuffer {
        match feed {
            Feed::Local => &self.local,
            Feed::Remote => &self.remote,
        }
    }
}

/// Axis-aligned rectangle in surface pixels. Signed so that layouts computed
/// for a too-small surface can come out inverted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl PreviewRect {
    pub const fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self { left, top, right, bottom }
    }

    pub fn width(&self) -> i32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> i32 {
        self.bottom.saturating_sub(self.top)
    }

    /// True when there is nothing to draw into.
    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0 || self.height() <= 0
    }
}

impl fmt::Display for PreviewRect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "left={} top={} right={} bottom={}",
            self.left, self.top, self.right, self.bottom
        )
    }
}
