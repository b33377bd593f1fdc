// Desktop window that plays the part of the windowing layer.
// Visual effects provided here:
// 1) A resizable window showing whatever the render thread last committed.
// 2) Keys that drive the surface lifecycle (P pauses/resumes, ESC quits).

use camview::{Error, FrameBuffer, Result};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

pub struct Presenter {
    window: Window, // the on-screen window you see
}

impl Presenter {
    /// Create a resizable window of the given size.
    /// Visual: a new empty window appears with your chosen title.
    pub fn new(title: &str, width: usize, height: usize) -> Result<Self> {
        let options = WindowOptions {
            resize: true,
            ..WindowOptions::default()
        };
        let mut window = Window::new(title, width, height, options)
            .map_err(|e| Error::WindowInit(e.to_string()))?;
        window.set_target_fps(60);
        Ok(Self { window })
    }

    /// Push the pixels for this frame to the screen.
    /// Visual: the window immediately displays the new image (live video).
    pub fn present(&mut self, framebuffer: &FrameBuffer) -> Result<()> {
        self.window
            .update_with_buffer(framebuffer.pixels(), framebuffer.width(), framebuffer.height())
            .map_err(|e| Error::WindowUpdate(e.to_string()))?;
        Ok(())
    }

    /// Returns false when the user closes the window (so we can stop the loop).
    pub fn is_open(&self) -> bool {
        self.window.is_open()
    }

    /// True while ESC is held down (we'll exit when this is pressed).
    pub fn esc_pressed(&self) -> bool {
        self.window.is_key_down(Key::Escape)
    }

    /// Current drawable size of the window in pixels.
    pub fn size(&self) -> (usize, usize) {
        self.window.get_size()
    }

    // we tear the surface down / bring it back, like an app going to background.
    pub fn p_pressed_once(&self) -> bool {
        self.window.is_key_pressed(Key::P, KeyRepeat::No)
    }
}
