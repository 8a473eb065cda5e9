use arquad_engine::input::TouchListener;
use arquad_engine::tracking::{Anchor, AnchorId, TrackingObserver};
use glam::Vec2;

/// Logs anchor deltas reported by the session.
#[derive(Debug, Default)]
pub struct AnchorLog {
    tracked: usize,
}

impl TrackingObserver for AnchorLog {
    fn anchors_added(&mut self, anchors: &[Anchor]) {
        self.tracked += anchors.len();
        for anchor in anchors {
            match anchor.as_plane() {
                Some(plane) => log::info!(
                    "plane {:?} added ({:?}, {:.2}x{:.2} m)",
                    plane.id,
                    plane.alignment,
                    plane.extent.x,
                    plane.extent.y
                ),
                None => log::info!("anchor {:?} added", anchor.id()),
            }
        }
    }

    fn anchors_updated(&mut self, anchors: &[Anchor]) {
        log::debug!("{} anchors updated", anchors.len());
    }

    fn anchors_removed(&mut self, ids: &[AnchorId]) {
        self.tracked = self.tracked.saturating_sub(ids.len());
        log::info!("anchors removed: {ids:?} ({} left)", self.tracked);
    }
}

/// Logs touches with their view bounds.
#[derive(Debug, Default)]
pub struct TouchLog;

impl TouchListener for TouchLog {
    fn touches_began(&mut self, location: Vec2, bounds: Vec2) {
        log::info!("touch began at ({:.1}, {:.1}) in {}x{}", location.x, location.y, bounds.x, bounds.y);
    }

    fn touches_moved(&mut self, location: Vec2, bounds: Vec2) {
        log::debug!("touch moved to ({:.1}, {:.1}) in {}x{}", location.x, location.y, bounds.x, bounds.y);
    }

    fn touches_ended(&mut self, location: Vec2, bounds: Vec2) {
        log::info!("touch ended at ({:.1}, {:.1}) in {}x{}", location.x, location.y, bounds.x, bounds.y);
    }
}
