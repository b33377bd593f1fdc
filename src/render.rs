// Body of the render thread.
// Each pass: pull the next remote frame, borrow a canvas, draw both previews,
// hand the canvas back. No pacing of its own; the capture source's blocking
// fetch is the only throttle.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use arc_swap::ArcSwapOption;
use tracing::{info, trace};

use crate::camera::{CaptureHandle, CaptureSource};
use crate::draw::{Composited, composite};
use crate::layout::PreviewLayout;
use crate::surface::Surface;
use crate::types::FeedBuffers;

/// What one pass of the loop managed to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Iteration {
    /// A new remote frame landed in the remote buffer
    pub fetched: bool,
    /// A canvas was acquired and committed
    pub presented: bool,
    /// Which previews were drawn onto that canvas
    pub drawn: Composited,
}

pub struct RenderLoop {
    running: Arc<AtomicBool>,
    source: Arc<dyn CaptureSource>,
    capture: Option<CaptureHandle>,
    surface: Arc<dyn Surface>,
    layout: Arc<ArcSwapOption<PreviewLayout>>,
    feeds: FeedBuffers,
}

impl RenderLoop {
    pub fn new(
        running: Arc<AtomicBool>,
        source: Arc<dyn CaptureSource>,
        capture: Option<CaptureHandle>,
        surface: Arc<dyn Surface>,
        layout: Arc<ArcSwapOption<PreviewLayout>>,
        feeds: FeedBuffers,
    ) -> Self {
        Self {
            running,
            source,
            capture,
            surface,
            layout,
            feeds,
        }
    }

    /// Iterate until the run flag drops, then give the buffers back.
    /// The flag is only checked between passes: a fetch that never returns
    /// keeps the thread alive.
    pub fn run(mut self) -> FeedBuffers {
        info!("Started running loop!");
        let mut passes: u64 = 0;
        while self.running.load(Ordering::Acquire) {
            self.step();
            passes += 1;
        }
        info!(passes, "Exiting running loop!");
        self.feeds
    }

    /// One pass. Every failure inside is treated as "nothing to draw".
    pub fn step(&mut self) -> Iteration {
        let mut done = Iteration::default();

        // Only the remote feed is refreshed; local keeps its connect-time frame.
        if let Some(handle) = self.capture {
            if self.source.is_attached(handle) {
                match self.source.fetch_frame(handle, &mut self.feeds.remote) {
                    Ok(()) => done.fetched = true,
                    Err(e) => trace!("no remote frame: {e}"),
                }
            }
        }

        let Some(layout) = self.layout.load_full() else {
            trace!("no layout yet");
            return done;
        };
        let Some(mut canvas) = self.surface.try_acquire_canvas() else {
            trace!("no canvas available");
            return done;
        };
        done.drawn = composite(canvas.frame_mut(), &self.feeds, &layout);
        self.surface.commit(canvas);
        done.presented = true;
        done
    }

    pub fn feeds(&self) -> &FeedBuffers {
        &self.feeds
    }
}
