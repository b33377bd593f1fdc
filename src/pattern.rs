// Synthetic capture source: scrolling colour bars with a little sensor noise.
// Lets the view run (and be tested) without a camera attached.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use crate::camera::{CaptureHandle, CaptureSource};
use crate::error::{Error, Result};
use crate::types::FrameBuffer;

/// Classic SMPTE-ish bar colours, 0x00RRGGBB.
const BARS: [u32; 7] = [
    0x00_C0_C0_C0,
    0x00_C0_C0_00,
    0x00_00_C0_C0,
    0x00_00_C0_00,
    0x00_C0_00_C0,
    0x00_C0_00_00,
    0x00_00_00_C0,
];

// ----------------------------- tiny RNG (no external crate) -----------------------------

/// Deterministic xorshift32 RNG for lightweight randomness.
/// Visual: the per-pixel grain on top of the bars.
#[derive(Clone)]
struct Rng32 {
    state: u32,
}

impl Rng32 {
    fn from_seed(seed: u32) -> Self {
        Self { state: seed | 1 }
    }

    #[inline]
    fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }
}

/// Per-handle animation state.
struct Pattern {
    frame_no: u64,
    rng: Rng32,
}

/// A [`CaptureSource`] that needs no hardware. Any device name is accepted.
pub struct PatternSource {
    frame_interval: Duration,
    grain: u8,
    next_handle: AtomicU64,
    streams: Mutex<HashMap<CaptureHandle, Pattern>>,
}

impl PatternSource {
    /// `fps` paces `fetch_frame` like a real camera would; 0 means no pacing.
    pub fn new(fps: u32) -> Self {
        let frame_interval = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / fps
        };
        Self {
            frame_interval,
            grain: 24,
            next_handle: AtomicU64::new(0),
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Amplitude of the per-pixel noise (0 = clean bars).
    pub fn with_grain(mut self, grain: u8) -> Self {
        self.grain = grain;
        self
    }
}

impl CaptureSource for PatternSource {
    fn preflight(&self, _device: &str) -> Result<()> {
        Ok(())
    }

    fn open(&self, device: &str, width: u32, height: u32) -> Result<CaptureHandle> {
        let handle = CaptureHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        let pattern = Pattern {
            frame_no: 0,
            rng: Rng32::from_seed(0x9E37_79B9 ^ handle.id() as u32),
        };
        self.streams.lock().insert(handle, pattern);
        info!(%handle, device, width, height, "test pattern streaming");
        Ok(handle)
    }

    fn is_attached(&self, handle: CaptureHandle) -> bool {
        self.streams.lock().contains_key(&handle)
    }

    fn fetch_frame(&self, handle: CaptureHandle, dst: &mut FrameBuffer) -> Result<()> {
        if !self.frame_interval.is_zero() {
            thread::sleep(self.frame_interval);
        }

        let mut streams = self.streams.lock();
        let pattern = streams
            .get_mut(&handle)
            .ok_or(Error::UnknownHandle(handle.id()))?;
        render_bars(dst, pattern, self.grain);
        pattern.frame_no += 1;
        Ok(())
    }

    fn close(&self, handle: CaptureHandle) {
        if self.streams.lock().remove(&handle).is_some() {
            info!(%handle, "test pattern closed");
        }
    }
}

/// Bars scroll one pixel to the left per frame.
fn render_bars(dst: &mut FrameBuffer, pattern: &mut Pattern, grain: u8) {
    let (w, h) = dst.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let bar_w = w.div_ceil(BARS.len()).max(1);
    let shift = (pattern.frame_no as usize) % w;
    let px = dst.pixels_mut();

    for y in 0..h {
        for x in 0..w {
            let bar = ((x + shift) % w) / bar_w;
            let base = BARS[bar.min(BARS.len() - 1)];
            let noise = if grain == 0 {
                0
            } else {
                pattern.rng.next_u32() % grain as u32
            };
            px[y * w + x] = add_grain(base, noise);
        }
    }
}

/// Brighten each channel by `noise`, saturating at 255.
#[inline]
fn add_grain(color: u32, noise: u32) -> u32 {
    let r = (((color >> 16) & 0xFF) + noise).min(255);
    let g = (((color >> 8) & 0xFF) + noise).min(255);
    let b = ((color & 0xFF) + noise).min(255);
    (r << 16) | (g << 8) | b
}
