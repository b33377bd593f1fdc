// Fixed parameters of a view: which device, at what resolution, and where
// the previews sit on the surface.

/// Camera device used when none is given.
pub const DEFAULT_DEVICE: &str = "/dev/video0";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewConfig {
    /// Capture device identifier (path or backend-specific name)
    pub device: String,
    /// Resolution of both feed buffers; fixed for the life of the view
    pub capture_width: u32,
    pub capture_height: u32,
    /// Size of the local preview box on the surface
    pub preview_width: i32,
    pub preview_height: i32,
    /// Gap between previews and the surface edges
    pub margin: i32,
    /// Reopen the capture source when a surface comes back after a destroy
    pub reconnect_on_create: bool,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            device: DEFAULT_DEVICE.to_string(),
            capture_width: 1280,
            capture_height: 720,
            preview_width: 320,
            preview_height: 240,
            margin: 50,
            reconnect_on_create: false,
        }
    }
}

impl ViewConfig {
    /// Default config for the given device
    pub fn for_device(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    pub fn with_capture_size(mut self, width: u32, height: u32) -> Self {
        self.capture_width = width;
        self.capture_height = height;
        self
    }

    pub fn with_preview(mut self, width: i32, height: i32, margin: i32) -> Self {
        self.preview_width = width;
        self.preview_height = height;
        self.margin = margin;
        self
    }

    pub fn with_reconnect(mut self, reconnect: bool) -> Self {
        self.reconnect_on_create = reconnect;
        self
    }
}
