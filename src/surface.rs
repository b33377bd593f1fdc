// The drawing destination. The windowing layer owns it; the render thread
// borrows a canvas from it once per frame.

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::error::Result;
use crate::types::FrameBuffer;

/// A writable frame lent out by a [`Surface`] until it is committed.
#[derive(Debug)]
pub struct Canvas {
    generation: u64,
    frame: FrameBuffer,
}

impl Canvas {
    pub fn new(generation: u64, frame: FrameBuffer) -> Self {
        Self { generation, frame }
    }

    /// Which surface configuration this canvas was lent under.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn frame(&self) -> &FrameBuffer {
        &self.frame
    }

    pub fn frame_mut(&mut self) -> &mut FrameBuffer {
        &mut self.frame
    }

    pub fn into_frame(self) -> FrameBuffer {
        self.frame
    }
}

/// Something the render loop can draw into.
pub trait Surface: Send + Sync {
    /// Lend out a canvas, or None if the surface cannot be drawn right now
    /// (not ready yet, torn down, or a canvas is already out).
    fn try_acquire_canvas(&self) -> Option<Canvas>;

    /// Hand a canvas back and make it the visible frame.
    fn commit(&self, canvas: Canvas);
}

struct Buffers {
    alive: bool,
    generation: u64,
    /// Lent out as the canvas; None while the render thread holds it.
    back: Option<FrameBuffer>,
    /// Last committed frame.
    front: FrameBuffer,
    commits: u64,
}

/// Double-buffered in-memory surface.
/// The render thread draws into the back buffer; the windowing layer reads
/// the front buffer with [`SharedSurface::with_front`].
pub struct SharedSurface {
    inner: Mutex<Buffers>,
}

impl SharedSurface {
    /// A live surface of `width` x `height`.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        Ok(Self {
            inner: Mutex::new(Buffers {
                alive: true,
                generation: 0,
                back: Some(FrameBuffer::allocate(width, height)?),
                front: FrameBuffer::allocate(width, height)?,
                commits: 0,
            }),
        })
    }

    /// Replace both buffers with ones of the new size. A canvas that is out
    /// at the time belongs to the old size and is dropped when committed.
    pub fn resize(&self, width: usize, height: usize) -> Result<()> {
        let back = FrameBuffer::allocate(width, height)?;
        let front = FrameBuffer::allocate(width, height)?;
        let mut inner = self.inner.lock();
        inner.generation += 1;
        inner.back = Some(back);
        inner.front = front;
        debug!(width, height, generation = inner.generation, "surface resized");
        Ok(())
    }

    /// From now on no canvas is handed out, and commits are discarded.
    pub fn tear_down(&self) {
        let mut inner = self.inner.lock();
        inner.alive = false;
        inner.generation += 1;
        debug!("surface torn down");
    }

    /// Make a torn-down surface drawable again.
    pub fn restore(&self) {
        let mut inner = self.inner.lock();
        if inner.alive {
            return;
        }
        inner.alive = true;
        inner.generation += 1;
        if inner.back.is_none() {
            let (w, h) = inner.front.dimensions();
            // Same size as a buffer that already exists, so this cannot be the
            // first allocation to fail; keep the surface undrawable if it does.
            inner.back = FrameBuffer::allocate(w, h).ok();
        }
        debug!("surface restored");
    }

    pub fn is_alive(&self) -> bool {
        self.inner.lock().alive
    }

    pub fn dimensions(&self) -> (usize, usize) {
        self.inner.lock().front.dimensions()
    }

    /// How many frames have been committed so far.
    pub fn commits(&self) -> u64 {
        self.inner.lock().commits
    }

    /// Run `f` on the last committed frame.
    pub fn with_front<R>(&self, f: impl FnOnce(&FrameBuffer) -> R) -> R {
        f(&self.inner.lock().front)
    }
}

impl Surface for SharedSurface {
    fn try_acquire_canvas(&self) -> Option<Canvas> {
        let mut inner = self.inner.lock();
        if !inner.alive {
            return None;
        }
        let generation = inner.generation;
        inner.back.take().map(|frame| Canvas::new(generation, frame))
    }

    fn commit(&self, canvas: Canvas) {
        let mut inner = self.inner.lock();
        if !inner.alive || canvas.generation() != inner.generation {
            trace!(generation = canvas.generation(), "stale canvas dropped");
            // Keep a back buffer around when only the generation moved on
            // (tear_down/restore), so the surface stays drawable.
            if inner.back.is_none() && canvas.frame().dimensions() == inner.front.dimensions() {
                inner.back = Some(canvas.into_frame());
            }
            return;
        }
        let frame = canvas.into_frame();
        let old_front = std::mem::replace(&mut inner.front, frame);
        inner.back = Some(old_front);
        inner.commits += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_swaps_buffers() {
        let surface = SharedSurface::new(2, 2).unwrap();
        let mut canvas = surface.try_acquire_canvas().unwrap();
        canvas.frame_mut().fill(5);
        // only one canvas can be out at a time
        assert!(surface.try_acquire_canvas().is_none());

        surface.commit(canvas);
        assert_eq!(surface.commits(), 1);
        surface.with_front(|fb| assert!(fb.pixels().iter().all(|&p| p == 5)));
        assert!(surface.try_acquire_canvas().is_some());
    }

    #[test]
    fn torn_down_surface_yields_no_canvas() {
        let surface = SharedSurface::new(2, 2).unwrap();
        surface.tear_down();
        assert!(!surface.is_alive());
        assert!(surface.try_acquire_canvas().is_none());

        surface.restore();
        assert!(surface.try_acquire_canvas().is_some());
    }

    #[test]
    fn commit_after_tear_down_is_discarded() {
        let surface = SharedSurface::new(2, 2).unwrap();
        let mut canvas = surface.try_acquire_canvas().unwrap();
        canvas.frame_mut().fill(9);
        surface.tear_down();
        surface.commit(canvas);
        assert_eq!(surface.commits(), 0);
        surface.with_front(|fb| assert!(fb.pixels().iter().all(|&p| p == 0)));

        // the buffer came back, so the surface is drawable after restore
        surface.restore();
        assert!(surface.try_acquire_canvas().is_some());
    }

    #[test]
    fn canvas_from_before_resize_is_dropped() {
        let surface = SharedSurface::new(2, 2).unwrap();
        let canvas = surface.try_acquire_canvas().unwrap();
        surface.resize(4, 3).unwrap();
        surface.commit(canvas);
        assert_eq!(surface.commits(), 0);
        assert_eq!(surface.dimensions(), (4, 3));

        let canvas = surface.try_acquire_canvas().unwrap();
        assert_eq!(canvas.frame().dimensions(), (4, 3));
        surface.commit(canvas);
        assert_eq!(surface.commits(), 1);
    }
}
