//! Command line arguments

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::warn;

/// Frame rates above this are treated as misconfigured
pub const MAX_FPS: f64 = 60.0;
pub const DEFAULT_FPS: f64 = 30.0;

#[derive(Parser, Debug, Clone)]
#[command(name = "fcw-service", version, about = "Forward collision warning frame worker")]
pub struct Args {
    /// Algorithm config (`detector`, `tracker`, `fcw` sections); YAML, TOML or JSON
    #[arg(long, env = "FCW_CONFIG")]
    pub config: PathBuf,

    /// Camera calibration config
    #[arg(long, env = "FCW_CAMERA")]
    pub camera: PathBuf,

    /// JSON-lines frame source, `-` for stdin
    #[arg(long, default_value = "-")]
    pub input: String,

    /// Video frame rate
    #[arg(long, default_value_t = DEFAULT_FPS)]
    pub fps: f64,

    /// Capacity of the frame queue between reader and worker
    #[arg(long, env = "FCW_INPUT_QUEUE", default_value_t = 1)]
    pub queue_size: usize,

    /// Drop frames that find the queue full instead of waiting
    #[arg(long)]
    pub realtime: bool,

    /// Log as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Serve Prometheus metrics on this address
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
}

impl Args {
    /// Frame rate used for velocity estimation
    pub fn effective_fps(&self) -> f64 {
        if !(self.fps > 0.0) || self.fps > MAX_FPS {
            warn!("FPS {} is strangely high, newly set to {}", self.fps, DEFAULT_FPS);
            DEFAULT_FPS
        } else {
            self.fps
        }
    }
}
