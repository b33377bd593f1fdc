// Surface lifecycle: starts the render thread when the surface appears, stops
// it when the surface goes away, and re-lays out the previews on resize.
//
// Thread policy:
// - Neither `on_surface_destroyed` nor `on_surface_created` waits for a render
//   thread. Destroy only signals.
// - Create reclaims the previous thread's feed buffers if it has already
//   exited. If it is still inside a fetch, the new thread takes its handle,
//   joins it, and only then starts its loop. At most one loop runs at a time.
// - Every render thread gets its own run flag, so a late-exiting old loop
//   never picks up the flag of its successor.
// - Dropping the controller signals and joins.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use arc_swap::ArcSwapOption;
use tracing::{debug, error, info, warn};

use crate::camera::{CaptureHandle, CaptureSource};
use crate::config::ViewConfig;
use crate::error::{Error, Result};
use crate::layout::{PreviewLayout, compute_layout};
use crate::render::RenderLoop;
use crate::surface::Surface;
use crate::types::{FeedBuffers, FrameBuffer};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// No surface, no render thread
    Idle,
    /// Surface exists, render thread running
    Active,
}

/// Counts render threads whose body is currently executing.
struct LiveGuard(Arc<AtomicUsize>);

impl LiveGuard {
    fn enter(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::AcqRel);
        Self(counter)
    }
}

impl Drop for LiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

pub struct LifecycleController {
    config: ViewConfig,
    source: Arc<dyn CaptureSource>,
    surface: Arc<dyn Surface>,
    capture: Option<CaptureHandle>,
    /// Run flag of the current render thread; only this struct writes it.
    /// Replaced on every create.
    running: Arc<AtomicBool>,
    layout: Arc<ArcSwapOption<PreviewLayout>>,
    state: LifecycleState,
    /// Held here while idle; owned by the render thread while active.
    feeds: Option<FeedBuffers>,
    /// Yields the feed buffers on exit, or None if they could not be rebuilt.
    render_thread: Option<JoinHandle<Option<FeedBuffers>>>,
    live_threads: Arc<AtomicUsize>,
}

impl LifecycleController {
    /// Allocate the feed buffers and try to bring up the capture source.
    /// A missing or unusable device is logged and leaves the view camera-less;
    /// only a failed buffer allocation is an error.
    pub fn connect(
        config: ViewConfig,
        source: Arc<dyn CaptureSource>,
        surface: Arc<dyn Surface>,
    ) -> Result<Self> {
        let mut feeds =
            FeedBuffers::allocate(config.capture_width as usize, config.capture_height as usize)?;
        let capture = open_source(source.as_ref(), &config);
        if let Some(handle) = capture {
            fetch_local(source.as_ref(), handle, &mut feeds.local);
        }

        Ok(Self {
            config,
            source,
            surface,
            capture,
            running: Arc::new(AtomicBool::new(false)),
            layout: Arc::new(ArcSwapOption::empty()),
            state: LifecycleState::Idle,
            feeds: Some(feeds),
            render_thread: None,
            live_threads: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Start a render thread. Never waits on a previous one: if that thread
    /// is still stuck in a fetch, the new thread waits for it instead.
    pub fn on_surface_created(&mut self) -> Result<()> {
        info!("Surface created!");
        if self.state == LifecycleState::Active {
            warn!("surface created while a render thread is already running; ignored");
            return Ok(());
        }

        let mut reopened = None;
        if self.capture.is_none() && self.config.reconnect_on_create {
            reopened = open_source(self.source.as_ref(), &self.config);
            self.capture = reopened;
        }

        let previous = match self.render_thread.take() {
            Some(thread) if thread.is_finished() => {
                self.collect(thread);
                None
            }
            other => other,
        };

        // The local frame of a reopened source is grabbed once the buffers are
        // in hand: here, or on the new thread after the old one lets go.
        let (handoff, local_pending) = match previous {
            Some(thread) => {
                debug!("previous render thread still busy; new thread will wait for it");
                (Handoff::After(thread), reopened)
            }
            None => {
                let mut feeds = match self.feeds.take() {
                    Some(feeds) => feeds,
                    None => {
                        warn!("feed buffers lost with the last render thread; reallocating");
                        self.allocate_feeds()?
                    }
                };
                if let Some(handle) = reopened {
                    fetch_local(self.source.as_ref(), handle, &mut feeds.local);
                }
                (Handoff::Ready(feeds), None)
            }
        };

        let running = Arc::new(AtomicBool::new(true));
        let start = RenderStart {
            running: running.clone(),
            source: self.source.clone(),
            capture: self.capture,
            surface: self.surface.clone(),
            layout: self.layout.clone(),
            capture_size: (
                self.config.capture_width as usize,
                self.config.capture_height as usize,
            ),
            live: self.live_threads.clone(),
        };

        let spawned = thread::Builder::new()
            .name("camview-render".into())
            .spawn(move || start.run(handoff, local_pending));
        match spawned {
            Ok(handle) => {
                self.running = running;
                self.render_thread = Some(handle);
                self.state = LifecycleState::Active;
                Ok(())
            }
            Err(e) => Err(Error::Thread(format!("spawn render thread: {e}"))),
        }
    }

    /// Recompute and publish both preview rectangles. Valid in any state.
    pub fn on_surface_changed(&mut self, width: i32, height: i32) {
        info!(width, height, "Surface changed!");
        let layout = compute_layout(
            width,
            height,
            self.config.preview_width,
            self.config.preview_height,
            self.config.margin,
        );
        debug!(local = %layout.local, remote = %layout.remote, "preview layout");
        if layout.local.is_degenerate() {
            debug!("local preview does not fit; it will not be drawn");
        }
        if layout.remote.is_degenerate() {
            debug!("remote preview does not fit; it will not be drawn");
        }
        self.layout.store(Some(Arc::new(layout)));
    }

    /// Signal the render thread to stop and shut the capture source down.
    pub fn on_surface_destroyed(&mut self) {
        if self.state != LifecycleState::Active {
            debug!("surface destroyed while idle");
            return;
        }
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.capture.take() {
            self.source.close(handle);
        }
        self.state = LifecycleState::Idle;
        info!("Camera closed!");
    }

    /// Wait up to `timeout` for a signalled render thread to finish.
    /// Returns true once no render thread is left (or there never was one).
    pub fn wait_for_render_exit(&mut self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            match &self.render_thread {
                None => return true,
                Some(thread) if thread.is_finished() => {
                    self.reclaim_render_thread();
                    return true;
                }
                Some(_) if Instant::now() >= deadline => return false,
                Some(_) => thread::sleep(Duration::from_millis(1)),
            }
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Current value of the run flag.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// True while a capture source is open and producing frames.
    pub fn is_attached(&self) -> bool {
        self.capture
            .is_some_and(|handle| self.source.is_attached(handle))
    }

    /// Render threads whose loop body is executing right now.
    pub fn live_render_threads(&self) -> usize {
        self.live_threads.load(Ordering::Acquire)
    }

    /// Last published layout, if the surface size is known.
    pub fn layout(&self) -> Option<PreviewLayout> {
        self.layout.load().as_deref().copied()
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    /// Feed buffers, when no render thread is holding them.
    pub fn feeds(&self) -> Option<&FeedBuffers> {
        self.feeds.as_ref()
    }

    fn allocate_feeds(&self) -> Result<FeedBuffers> {
        FeedBuffers::allocate(
            self.config.capture_width as usize,
            self.config.capture_height as usize,
        )
    }

    /// Blocks until `render_thread` exits. Only for threads known to be
    /// finished, and for drop.
    fn reclaim_render_thread(&mut self) {
        if let Some(thread) = self.render_thread.take() {
            self.collect(thread);
        }
    }

    fn collect(&mut self, thread: JoinHandle<Option<FeedBuffers>>) {
        match thread.join() {
            Ok(Some(feeds)) => self.feeds = Some(feeds),
            Ok(None) => {}
            Err(_) => error!("render thread panicked; feed buffers lost"),
        }
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        self.on_surface_destroyed();
        self.reclaim_render_thread();
        if let Some(handle) = self.capture.take() {
            self.source.close(handle);
        }
    }
}

/// Where a new render thread gets its feed buffers from.
enum Handoff {
    Ready(FeedBuffers),
    /// Still held by a previous render thread; join it first.
    After(JoinHandle<Option<FeedBuffers>>),
}

/// Everything a render thread needs besides its buffers.
struct RenderStart {
    running: Arc<AtomicBool>,
    source: Arc<dyn CaptureSource>,
    capture: Option<CaptureHandle>,
    surface: Arc<dyn Surface>,
    layout: Arc<ArcSwapOption<PreviewLayout>>,
    capture_size: (usize, usize),
    live: Arc<AtomicUsize>,
}

impl RenderStart {
    /// Render thread body.
    fn run(self, handoff: Handoff, local_pending: Option<CaptureHandle>) -> Option<FeedBuffers> {
        let mut feeds = match handoff {
            Handoff::Ready(feeds) => feeds,
            Handoff::After(previous) => match previous.join() {
                Ok(Some(feeds)) => feeds,
                outcome => {
                    if outcome.is_err() {
                        error!("previous render thread panicked; feed buffers lost");
                    }
                    let (width, height) = self.capture_size;
                    match FeedBuffers::allocate(width, height) {
                        Ok(feeds) => feeds,
                        Err(e) => {
                            error!("render thread not started: {e}");
                            return None;
                        }
                    }
                }
            },
        };
        if let Some(handle) = local_pending {
            fetch_local(self.source.as_ref(), handle, &mut feeds.local);
        }

        let _live = LiveGuard::enter(self.live);
        let render = RenderLoop::new(
            self.running,
            self.source,
            self.capture,
            self.surface,
            self.layout,
            feeds,
        );
        Some(render.run())
    }
}

/// Preflight and open the capture device. Any failure leaves the view without a
/// camera.
fn open_source(source: &dyn CaptureSource, config: &ViewConfig) -> Option<CaptureHandle> {
    let device = config.device.as_str();
    match source.preflight(device) {
        Ok(()) => {}
        Err(e @ Error::DevicePermission(_)) => {
            warn!("{e} -- does the process have access to the camera?");
            return None;
        }
        Err(e) => {
            warn!("{e}");
            return None;
        }
    }

    info!(device, "Preparing camera");
    match source.open(device, config.capture_width, config.capture_height) {
        Ok(handle) => Some(handle),
        Err(e) => {
            warn!("{e}");
            None
        }
    }
}

/// Grab the one local frame for a freshly opened source.
fn fetch_local(source: &dyn CaptureSource, handle: CaptureHandle, local: &mut FrameBuffer) {
    if !source.is_attached(handle) {
        return;
    }
    if let Err(e) = source.fetch_frame(handle, local) {
        warn!("no initial local frame: {e}");
    }
}
