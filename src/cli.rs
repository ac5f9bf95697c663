use clap::Parser;
use std::path::PathBuf;

/// Kiosk video wall with HTTP remote control
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Videos to add to the wall at startup (can be specified multiple times)
    #[arg(short = 'f', long = "video", value_name = "FILE")]
    pub videos: Vec<PathBuf>,

    /// HTTP API port
    #[arg(short = 'p', long = "port", value_name = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Render surface width in pixels
    #[arg(long = "width", value_name = "W", default_value_t = 1920)]
    pub width: u32,

    /// Render surface height in pixels
    #[arg(long = "height", value_name = "H", default_value_t = 1080)]
    pub height: u32,

    /// Normalized control-space size (positions from remotes map through this)
    #[arg(long = "norm-size", value_names = ["W", "H"], num_args = 2)]
    pub norm_size: Option<Vec<f32>>,

    /// Loop detection: position poll interval in milliseconds
    #[arg(long = "poll-ms", value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Loop detection: restart when remaining time drops below this
    #[arg(long = "end-threshold-ms", value_name = "MS")]
    pub end_threshold_ms: Option<u64>,

    /// Loop detection: fallback timer fires this long before expected end
    #[arg(long = "fallback-margin-ms", value_name = "MS")]
    pub fallback_margin_ms: Option<u64>,

    /// Transform recompute debounce window in milliseconds
    #[arg(long = "debounce-ms", value_name = "MS")]
    pub debounce_ms: Option<u64>,

    /// Reload the last-known-good source when a swapped source fails to load
    #[arg(long = "fallback-on-error")]
    pub fallback_on_error: bool,

    /// Simulated media duration for the built-in clock backend, in seconds
    #[arg(long = "sim-duration", value_name = "SECS", default_value_t = 30)]
    pub sim_duration_secs: u64,

    /// Stage tick rate in Hz
    #[arg(long = "tick-hz", value_name = "HZ", default_value_t = 60)]
    pub tick_hz: u32,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,
}
