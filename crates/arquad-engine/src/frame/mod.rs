//! Per-tick orchestration: session snapshot → renderers → present.

mod config;
mod coordinator;
mod pacing;
mod plan;

pub use config::{CoordinatorConfig, SceneParams};
pub use coordinator::{FrameCoordinator, FrameReport, TickOutcome};
pub use pacing::{FramePacer, FrameRelease};
pub use plan::{FramePlan, ViewportTracker};
