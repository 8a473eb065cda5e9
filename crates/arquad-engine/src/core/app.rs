use crate::coords::Viewport;
use crate::device::Gpu;

use super::ctx::FrameCtx;

/// Control directive returned by app callbacks.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AppControl {
    Continue,
    Exit,
}

/// Application contract implemented by higher layers.
pub trait App {
    /// Called once after the GPU is ready, before the first resize or frame.
    /// An error here ends the run.
    fn setup(&mut self, gpu: &Gpu<'_>) -> anyhow::Result<()>;

    /// Called when the drawable size changes, in physical pixels.
    fn on_resize(&mut self, viewport: Viewport) {
        let _ = viewport;
    }

    /// Called once per redraw.
    fn on_frame(&mut self, ctx: &mut FrameCtx<'_, '_>) -> AppControl;
}
