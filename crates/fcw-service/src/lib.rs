//! FCW Service
//!
//! Wraps the FCW engine in a frame worker: configuration and calibration are
//! loaded once, frames of tracked objects arrive as JSON lines through a
//! bounded queue, and one JSON result per frame is published on stdout.

pub mod cli;
pub mod latency;
pub mod message;
pub mod reader;
pub mod settings;
pub mod worker;

pub use cli::Args;
pub use latency::{Clock, LatencyStats};
pub use message::{Detection, FrameMessage, FrameOutput, ReceivedFrame};
pub use reader::FrameReader;
pub use settings::{load_camera_config, load_fcw_config};
pub use worker::FrameWorker;

use tracing_subscriber::EnvFilter;

/// Initialize logging on stderr (stdout carries results)
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}
