mod app;
mod observers;
mod presentation;
mod simulated;

use anyhow::Result;

use arquad_engine::device::GpuInit;
use arquad_engine::frame::SceneParams;
use arquad_engine::logging::{init_logging, LoggingConfig};
use arquad_engine::render::{checkerboard_decal, load_decal};
use arquad_engine::window::{Runtime, RuntimeConfig};

use crate::app::StudioApp;
use crate::observers::TouchLog;

fn main() {
    if let Err(e) = run() {
        eprintln!("arquad-studio: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    init_logging(LoggingConfig::default());

    let decal = match std::env::args_os().nth(1) {
        Some(path) => match load_decal(&path) {
            Ok(img) => img,
            Err(e) => {
                log::warn!("{e:#}; using built-in decal");
                checkerboard_decal(256, 8)
            }
        },
        None => checkerboard_decal(256, 8),
    };

    let config = RuntimeConfig {
        title: "arquad studio".to_string(),
        ..RuntimeConfig::default()
    };
    let app = StudioApp::new(decal, SceneParams::new(0.2));

    Runtime::run(config, GpuInit::default(), app, Some(Box::new(TouchLog)))
}
