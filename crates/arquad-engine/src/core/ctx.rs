use winit::window::Window;

use crate::coords::Viewport;
use crate::device::Gpu;
use crate::input::InputFrame;
use crate::time::FrameTime;
use crate::window::RuntimeCtx;

/// Window handle plus size queries.
pub struct WindowCtx<'a> {
    pub window: &'a Window,
}

impl<'a> WindowCtx<'a> {
    /// Returns the logical window size as `(width, height)` in points.
    pub fn logical_size(&self) -> (f32, f32) {
        let phys = self.window.inner_size();
        let scale = self.window.scale_factor();
        let logi: winit::dpi::LogicalSize<f64> = phys.to_logical(scale);
        (logi.width as f32, logi.height as f32)
    }

    /// Drawable size in physical pixels.
    pub fn viewport(&self) -> Viewport {
        let (w, h) = self.logical_size();
        Viewport::from_logical(w, h, self.window.scale_factor() as f32)
    }

    pub fn set_title(&self, title: &str) {
        self.window.set_title(title);
    }

    /// Call right before presenting so the compositor can schedule the frame.
    pub fn pre_present_notify(&self) {
        self.window.pre_present_notify();
    }
}

/// Per-frame context passed to `core::App::on_frame`.
///
/// Lifetimes:
/// - `'a` is the duration of the callback invocation
/// - `'w` is the window-borrow lifetime carried by `Gpu<'w>`
pub struct FrameCtx<'a, 'w> {
    pub window: WindowCtx<'a>,
    pub gpu: &'a mut Gpu<'w>,
    pub input_frame: &'a InputFrame,
    pub time: FrameTime,
    pub runtime: &'a mut RuntimeCtx,
}
