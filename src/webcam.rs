// Real camera capture through nokhwa.
// The nokhwa camera lives on its own worker thread for its whole life; decoded
// frames cross to the render thread through a small bounded channel, so the
// render loop blocks in `fetch_frame` exactly as long as the camera does.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::thread::{self, JoinHandle};

use nokhwa::{
    Camera,
    pixel_format::RgbFormat,
    utils::{
        CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution,
    },
};
use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::camera::{CaptureHandle, CaptureSource, preflight_path};
use crate::draw::fit_rgb_into;
use crate::error::{Error, Result};
use crate::types::FrameBuffer;

/// Target frame rate requested from the device.
const CAPTURE_FPS: u32 = 15;
/// Frames the worker may run ahead of the render loop before it starts dropping.
const FRAME_QUEUE: usize = 2;

/// One open camera.
struct Stream {
    stop: Arc<AtomicBool>,
    frames: Mutex<Receiver<RawFrame>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Stream {
    fn is_running(&self) -> bool {
        self.worker
            .lock()
            .as_ref()
            .is_some_and(|worker| !worker.is_finished())
    }

    fn shutdown(&self) {
        self.stop.store(true, Ordering::Release);
        if let Some(worker) = self.worker.lock().take() {
            // The worker notices the flag after the frame it is waiting on.
            if worker.join().is_err() {
                warn!("capture worker panicked");
            }
        }
    }
}

/// nokhwa-backed [`CaptureSource`].
/// Device identifiers are either a bare index ("0") or a V4L2 path
/// ("/dev/video0"); a trailing number in a path selects that index.
#[derive(Default)]
pub struct WebcamSource {
    next_handle: AtomicU64,
    streams: Mutex<HashMap<CaptureHandle, Arc<Stream>>>,
}

impl WebcamSource {
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&self, handle: CaptureHandle) -> Option<Arc<Stream>> {
        self.streams.lock().get(&handle).cloned()
    }
}

impl CaptureSource for WebcamSource {
    fn preflight(&self, device: &str) -> Result<()> {
        if device.parse::<u32>().is_ok() {
            // Plain indices are resolved by the OS backend; nothing to check up front.
            return Ok(());
        }
        preflight_path(device)
    }

    fn open(&self, device: &str, width: u32, height: u32) -> Result<CaptureHandle> {
        let index = camera_index(device);
        let stop = Arc::new(AtomicBool::new(false));
        let (ready_tx, ready_rx) = mpsc::channel();
        let (frame_tx, frame_rx) = mpsc::sync_channel(FRAME_QUEUE);

        let worker_stop = stop.clone();
        let worker = thread::Builder::new()
            .name("camview-capture".into())
            .spawn(move || capture_worker(index, width, height, ready_tx, frame_tx, worker_stop))
            .map_err(|e| Error::Thread(format!("spawn capture worker: {e}")))?;

        // Wait until the worker either has a streaming camera or gave up.
        let opened = ready_rx
            .recv()
            .map_err(|_| Error::CameraInit("capture worker exited during open".into()))
            .and_then(|r| r);
        let (actual_w, actual_h) = match opened {
            Ok(res) => res,
            Err(e) => {
                let _ = worker.join();
                return Err(e);
            }
        };

        let handle = CaptureHandle::new(self.next_handle.fetch_add(1, Ordering::Relaxed));
        info!(%handle, device, width = actual_w, height = actual_h, "camera streaming");

        let stream = Stream {
            stop,
            frames: Mutex::new(frame_rx),
            worker: Mutex::new(Some(worker)),
        };
        self.streams.lock().insert(handle, Arc::new(stream));
        Ok(handle)
    }

    fn is_attached(&self, handle: CaptureHandle) -> bool {
        self.stream(handle).is_some_and(|s| s.is_running())
    }

    fn fetch_frame(&self, handle: CaptureHandle, dst: &mut FrameBuffer) -> Result<()> {
        let stream = self
            .stream(handle)
            .ok_or(Error::UnknownHandle(handle.id()))?;
        let frame = stream
            .frames
            .lock()
            .recv()
            .map_err(|_| Error::CameraFrame("capture stopped".into()))?;
        if !fit_rgb_into(dst, &frame.rgb, frame.width, frame.height) {
            return Err(Error::CameraFrame(format!(
                "short frame: {} bytes for {}x{}",
                frame.rgb.len(),
                frame.width,
                frame.height
            )));
        }
        Ok(())
    }

    fn close(&self, handle: CaptureHandle) {
        let stream = self.streams.lock().remove(&handle);
        if let Some(stream) = stream {
            stream.shutdown();
            info!(%handle, "camera closed");
        }
    }
}

impl Drop for WebcamSource {
    fn drop(&mut self) {
        for (_, stream) in self.streams.lock().drain() {
            stream.shutdown();
        }
    }
}

/// "/dev/video2" -> Index(2), "1" -> Index(1), anything else by name.
fn camera_index(device: &str) -> CameraIndex {
    let digits: String = device
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    match digits.parse::<u32>() {
        Ok(n) => CameraIndex::Index(n),
        Err(_) => CameraIndex::String(device.to_string()),
    }
}

/// Open the camera the same way every time; the stream may settle on a
/// slightly different resolution than requested.
fn open_camera(index: CameraIndex, width: u32, height: u32) -> Result<Camera> {
    let fmt = CameraFormat::new(
        Resolution::new(width, height),
        FrameFormat::MJPEG, // USB cameras deliver full resolution only as MJPEG
        CAPTURE_FPS,
    );
    let req = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(fmt));

    let mut cam = Camera::new(index, req)
        .map_err(|e| Error::CameraInit(format!("Create camera: {e}")))?;
    cam.open_stream()
        .map_err(|e| Error::CameraInit(format!("Open stream: {e}")))?;
    Ok(cam)
}

fn capture_worker(
    index: CameraIndex,
    width: u32,
    height: u32,
    ready: mpsc::Sender<Result<(u32, u32)>>,
    frames: SyncSender<RawFrame>,
    stop: Arc<AtomicBool>,
) {
    let mut cam = match open_camera(index, width, height) {
        Ok(cam) => cam,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let actual = cam.resolution();
    if ready.send(Ok((actual.width(), actual.height()))).is_err() {
        return;
    }

    while !stop.load(Ordering::Acquire) {
        let frame = match grab_frame(&mut cam) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("camera lost: {e}");
                break;
            }
        };
        match frames.try_send(frame) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => trace!("render loop behind, frame dropped"),
            Err(TrySendError::Disconnected(_)) => break,
        }
    }

    if let Err(e) = cam.stop_stream() {
        debug!("stop stream: {e}");
    }
}

/// Decoded camera frame as it comes off the worker: tightly packed RGB.
/// Packing into 0x00RRGGBB happens once, straight into the feed buffer.
struct RawFrame {
    width: usize,
    height: usize,
    rgb: Vec<u8>,
}

/// Grab one frame and decode it to RGB.
fn grab_frame(cam: &mut Camera) -> Result<RawFrame> {
    // Blocks until a new frame is ready.
    let frame = cam
        .frame()
        .map_err(|e| Error::CameraFrame(format!("Fetch frame: {e}")))?;

    let rgb_img = frame
        .decode_image::<RgbFormat>()
        .map_err(|e| Error::CameraFrame(format!("Decode RGB: {e}")))?;

    let (w, h) = rgb_img.dimensions();
    Ok(RawFrame {
        width: w as usize,
        height: h as usize,
        rgb: rgb_img.into_raw(),
    })
}
