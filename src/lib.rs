//! Two-feed camera view.
//!
//! A local and a remote video feed are composited into fixed preview
//! rectangles on a drawable surface by a dedicated render thread. The
//! thread's lifetime follows the surface: it starts when the surface is
//! created and is told to stop when the surface is destroyed.
//!
//! The pieces, leaf first:
//! - [`types::FrameBuffer`]: fixed-size pixel buffer, one per feed
//! - [`camera::CaptureSource`]: where frames come from
//! - [`layout::compute_layout`]: where the previews go
//! - [`render::RenderLoop`]: the render thread body
//! - [`controller::LifecycleController`]: reacts to surface events

pub mod camera;
pub mod config;
pub mod controller;
pub mod draw;
pub mod error;
pub mod layout;
pub mod pattern;
pub mod render;
pub mod still;
pub mod surface;
pub mod types;
#[cfg(feature = "camera")]
pub mod webcam;

pub use camera::{CaptureHandle, CaptureSource};
pub use config::ViewConfig;
pub use controller::{LifecycleController, LifecycleState};
pub use error::{Error, Result};
pub use layout::{PreviewLayout, compute_layout};
pub use surface::{Canvas, SharedSurface, Surface};
pub use types::{Feed, FeedBuffers, FrameBuffer, PreviewRect};
