// Capture source backed by a single picture on disk.
// Useful as a stand-in "remote" party: every fetch returns the same frame.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

use crate::camera::{CaptureHandle, CaptureSource};
use crate::draw::fit_into;
use crate::error::{Error, Result};
use crate::types::FrameBuffer;

/// Serves the image at the device path, decoded once at open.
pub struct StillImageSource {
    frame_interval: Duration,
    next_handle: AtomicU64,
    streams: Mutex<HashMap<CaptureHandle, Arc<FrameBuffer>>>,
}

impl StillImageSource {
    /// `fps` paces `fetch_frame`; 0 returns immediately.
    pub fn new(fps: u32) -> Self {
        let frame_interval = if fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / fps
        };
        Self {
            frame_interval,
            next_handle: AtomicU64::new(0),
            streams: Mutex::new(HashMap::new()),
        }
    }
}

/// Decode any format the `image` crate knows into 0x00RRGGBB pixels.
pub fn load_picture(path: &str) -> Result<FrameBuffer> {
    let rgb = image::open(path)
        .map_err(|e| Error::CameraInit(format!("Decode {path}: {e}")))?
        .to_rgb8();
    let (w, h) = rgb.dimensions();
    let mut out = FrameBuffer::allocate(w as usize, h as usize)?;
    for (dst, pixel) in out.pixels_mut().iter_mut().zip(rgb.pixels()) {
        let [r, g, b] = pixel.0;
        *dst = ((r as u32) << 16) | ((g as u32) << 8) | b as u32;
    }
    Ok(out)
}

impl CaptureSource for StillImageSource {
    fn open(&self, device: &str, _width: u32, _height: u32) -> Result<CaptureHandle> {
        let picture = load_picture(device)?;
        let handle = CaptureHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        info!(
            %handle,
            device,
            width = picture.width(),
            height = picture.height(),
            "still image loaded"
        );
        self.streams.lock().insert(handle, Arc::new(picture));
        Ok(handle)
    }

    fn is_attached(&self, handle: CaptureHandle) -> bool {
        self.streams.lock().contains_key(&handle)
    }

    fn fetch_frame(&self, handle: CaptureHandle, dst: &mut FrameBuffer) -> Result<()> {
        if !self.frame_interval.is_zero() {
            thread::sleep(self.frame_interval);
        }
        let picture = self
            .streams
            .lock()
            .get(&handle)
            .cloned()
            .ok_or(Error::UnknownHandle(handle.id()))?;
        fit_into(dst, &picture);
        Ok(())
    }

    fn close(&self, handle: CaptureHandle) {
        self.streams.lock().remove(&handle);
    }
}
