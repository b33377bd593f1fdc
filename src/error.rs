// One error type for the whole crate.
// Every variant states *where* things went wrong.
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Creating the window failed
    #[error("Window init error: {0}")]
    WindowInit(String),

    /// Updating the window buffer failed
    #[error("Window update error: {0}")]
    WindowUpdate(String),

    /// Opening/starting the camera failed
    #[error("Camera init error: {0}")]
    CameraInit(String),

    /// Grabbing/decoding a frame failed
    #[error("Camera frame error: {0}")]
    CameraFrame(String),

    /// The capture device identifier does not name anything on this system
    #[error("{0} does not exist")]
    DeviceMissing(String),

    /// The capture device exists but this process cannot read it
    #[error("Insufficient permissions on {0}")]
    DevicePermission(String),

    /// A pixel buffer could not be allocated
    #[error("Cannot allocate {width}x{height} frame buffer")]
    Allocation { width: usize, height: usize },

    /// A capture handle was used after close (or never opened)
    #[error("Unknown capture handle {0}")]
    UnknownHandle(u64),

    /// Spawning a worker or render thread failed
    #[error("Thread error: {0}")]
    Thread(String),
}
