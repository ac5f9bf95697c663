//! Stage configuration and loop-detection tuning.
//!
//! The millisecond thresholds for loop detection are tunables, not invariants:
//! consumer media stacks differ in how reliably they report end-of-media, so
//! deployments adjust these per device. The normalized control space (default
//! 400x300) decouples remote-control coordinates from the actual render
//! resolution; remotes keep working unchanged when the kiosk display changes.

use serde::{Deserialize, Serialize};

use crate::cli::Args;

/// Loop-detection timing knobs (see `core::looper`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoopTuning {
    /// How often playback position is polled against known duration
    pub poll_interval_ms: u64,
    /// Restart when remaining time falls under this
    pub end_threshold_ms: u64,
    /// Fallback timer fires this long before the expected end
    pub fallback_margin_ms: u64,
}

impl Default for LoopTuning {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            end_threshold_ms: 120,
            fallback_margin_ms: 150,
        }
    }
}

/// Full stage configuration, built once at startup from CLI args.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StageConfig {
    /// Normalized control-space width (remote x coordinates are 0..norm_width)
    pub norm_width: f32,
    /// Normalized control-space height
    pub norm_height: f32,
    /// Fixed on-screen footprint for every track, in pixels
    pub footprint_width: f32,
    pub footprint_height: f32,
    /// Initial render surface size
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Quiet window before a batched transform recompute
    pub debounce_ms: u64,
    /// Reload last-known-good source after a failed load
    pub fallback_on_error: bool,
    pub loop_tuning: LoopTuning,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            norm_width: 400.0,
            norm_height: 300.0,
            footprint_width: 640.0,
            footprint_height: 360.0,
            viewport_width: 1920,
            viewport_height: 1080,
            debounce_ms: 10,
            fallback_on_error: false,
            loop_tuning: LoopTuning::default(),
        }
    }
}

impl StageConfig {
    /// Default track position: center of the normalized control space.
    pub fn default_position(&self) -> (f32, f32) {
        (self.norm_width / 2.0, self.norm_height / 2.0)
    }

    /// Build config from parsed CLI args, falling back to defaults.
    pub fn from_args(args: &Args) -> Self {
        let mut cfg = Self {
            viewport_width: args.width,
            viewport_height: args.height,
            fallback_on_error: args.fallback_on_error,
            ..Self::default()
        };
        if let Some(norm) = &args.norm_size
            && norm.len() == 2
        {
            cfg.norm_width = norm[0];
            cfg.norm_height = norm[1];
        }
        if let Some(ms) = args.poll_interval_ms {
            cfg.loop_tuning.poll_interval_ms = ms;
        }
        if let Some(ms) = args.end_threshold_ms {
            cfg.loop_tuning.end_threshold_ms = ms;
        }
        if let Some(ms) = args.fallback_margin_ms {
            cfg.loop_tuning.fallback_margin_ms = ms;
        }
        if let Some(ms) = args.debounce_ms {
            cfg.debounce_ms = ms;
        }
        cfg
    }
}
