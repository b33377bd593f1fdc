// What you SEE:
// • Remote feed fills the left side of the window, local preview sits top-right.
// • Resize the window: both previews are laid out again.
// • P pauses (surface destroyed, camera closed) and resumes. ESC quits.

mod window;

use std::sync::Arc;
use std::time::Duration;

use camview::config::DEFAULT_DEVICE;
use camview::pattern::PatternSource;
use camview::still::StillImageSource;
use camview::{CaptureSource, Error, FrameBuffer, LifecycleController, SharedSurface, ViewConfig};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use window::Presenter;

/// Where frames come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum SourceKind {
    /// A real camera
    Webcam,
    /// Scrolling colour bars, no hardware needed
    Pattern,
    /// A picture file, given as the device
    Still,
}

#[derive(Parser, Debug)]
#[command(name = "camview", version, about = "Local and remote camera previews")]
struct CliArgs {
    /// Capture device (path, or camera index for the webcam source)
    #[arg(short = 'd', long, value_name = "DEVICE", default_value = DEFAULT_DEVICE)]
    device: String,

    /// Frame source
    #[arg(short = 's', long, value_enum, default_value_t = SourceKind::Webcam)]
    source: SourceKind,

    /// Capture width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Capture height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Local preview width
    #[arg(long, default_value_t = 320)]
    preview_width: i32,

    /// Local preview height
    #[arg(long, default_value_t = 240)]
    preview_height: i32,

    /// Gap between previews and the window edges
    #[arg(long, default_value_t = 50)]
    margin: i32,

    /// Reopen the source after resuming from pause
    #[arg(long)]
    reconnect: bool,

    /// Frame rate of the pattern and still sources
    #[arg(long, default_value_t = 15)]
    fps: u32,

    /// Initial window width
    #[arg(long, default_value_t = 1280)]
    window_width: usize,

    /// Initial window height
    #[arg(long, default_value_t = 720)]
    window_height: usize,

    /// Verbose logging (-v debug, -vv trace)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<(), Error> {
    let args = CliArgs::parse();
    init_logging(args.verbose);

    let config = ViewConfig::for_device(&args.device)
        .with_capture_size(args.width, args.height)
        .with_preview(args.preview_width, args.preview_height, args.margin)
        .with_reconnect(args.reconnect);
    let source = make_source(args.source, args.fps)?;

    /* --- Surface + window setup ---
       Visual: window opens black; previews appear once the render thread runs. */
    let (w, h) = (args.window_width, args.window_height);
    let surface = Arc::new(SharedSurface::new(w, h)?);
    let mut presenter = Presenter::new("camview", w, h)?;
    let mut controller = LifecycleController::connect(config, source, surface.clone())?;
    if !controller.is_attached() {
        warn!("no camera attached; previews stay black");
    }

    controller.on_surface_created()?;
    controller.on_surface_changed(w as i32, h as i32);

    /* --- Reusable screen buffer ---
       Visual: a copy of the last committed frame, so the window never holds
       the surface while it waits for vsync. */
    let mut screen = FrameBuffer::allocate(w, h)?;
    let mut size = (w, h);
    let mut paused = false;

    /* ------------------------------ Main loop ------------------------------ */
    while presenter.is_open() && !presenter.esc_pressed() {
        // 1) Window resized: new surface buffers, new layout.
        let now = presenter.size();
        if now != size && now.0 > 0 && now.1 > 0 {
            surface.resize(now.0, now.1)?;
            controller.on_surface_changed(now.0 as i32, now.1 as i32);
            size = now;
        }

        // 2) P: simulate the surface going away and coming back.
        if presenter.p_pressed_once() {
            if paused {
                surface.restore();
                controller.on_surface_created()?;
            } else {
                surface.tear_down();
                controller.on_surface_destroyed();
            }
            paused = !paused;
            info!(paused, "pause toggled");
        }

        // 3) Copy out the front buffer; replace the screen buffer if the size moved.
        surface.with_front(|front| {
            if screen.dimensions() != front.dimensions() {
                screen = FrameBuffer::allocate(front.width(), front.height())?;
            }
            screen.pixels_mut().copy_from_slice(front.pixels());
            Ok::<_, Error>(())
        })?;

        // 4) Present to the window (this is when the on-screen image updates).
        presenter.present(&screen)?;
    }

    surface.tear_down();
    controller.on_surface_destroyed();
    if !controller.wait_for_render_exit(Duration::from_secs(2)) {
        warn!("render thread still inside a frame fetch");
    }
    Ok(())
}

fn make_source(kind: SourceKind, fps: u32) -> Result<Arc<dyn CaptureSource>, Error> {
    match kind {
        SourceKind::Pattern => Ok(Arc::new(PatternSource::new(fps))),
        SourceKind::Still => Ok(Arc::new(StillImageSource::new(fps))),
        #[cfg(feature = "camera")]
        SourceKind::Webcam => Ok(Arc::new(camview::webcam::WebcamSource::new())),
        #[cfg(not(feature = "camera"))]
        SourceKind::Webcam => Err(Error::CameraInit(
            "built without the `camera` feature; use --source pattern".into(),
        )),
    }
}

/// Initialize logging with tracing
fn init_logging(verbose_count: u8) {
    let filter = match verbose_count {
        0 => "camview=info",
        1 => "camview=debug",
        _ => "camview=trace",
    };

    // Environment variable takes highest priority
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into());

    if let Err(err) = tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()
    {
        eprintln!("failed to initialize tracing: {}", err);
    }
}
