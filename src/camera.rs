// The capture side of the view: anything that can fill a FrameBuffer with the
// next video frame. The render loop only ever talks to this trait.

use std::fmt;
use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::FrameBuffer;

/// Opaque token returned by [`CaptureSource::open`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CaptureHandle(u64);

impl CaptureHandle {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CaptureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A frame producer shared between the lifecycle thread (open/close) and the
/// render thread (fetch). Implementations do their own internal locking.
pub trait CaptureSource: Send + Sync {
    /// Check that `device` names something we can read, before opening it.
    fn preflight(&self, device: &str) -> Result<()> {
        preflight_path(device)
    }

    /// Start capturing from `device` at (roughly) `width` x `height`.
    fn open(&self, device: &str, width: u32, height: u32) -> Result<CaptureHandle>;

    /// True while `handle` is open and still producing frames.
    fn is_attached(&self, handle: CaptureHandle) -> bool;

    /// Block until the next frame is available and write it over `dst`,
    /// resampled to `dst`'s fixed size.
    fn fetch_frame(&self, handle: CaptureHandle, dst: &mut FrameBuffer) -> Result<()>;

    /// Stop capturing. Unknown or already-closed handles are ignored.
    fn close(&self, handle: CaptureHandle);
}

/// Default preflight: the identifier must be an existing, readable path.
pub fn preflight_path(device: &str) -> Result<()> {
    let path = Path::new(device);
    if !path.exists() {
        return Err(Error::DeviceMissing(device.to_string()));
    }
    match File::open(path) {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            Err(Error::DevicePermission(device.to_string()))
        }
        Err(e) => Err(Error::CameraInit(format!("{device}: {e}"))),
    }
}
