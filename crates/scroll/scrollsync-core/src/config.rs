//! Core configuration for scrollsync-core.

use serde::{Deserialize, Serialize};

use crate::breakpoint::Breakpoint;
use crate::error::{Result, ScrollSyncError};

/// Where frame callbacks come from.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FrameSource {
    /// Display-refresh callbacks; dt is measured from timestamps.
    Display,
    /// Fixed-interval polling fallback when frame callbacks are unavailable.
    Polling { interval_ms: f32 },
}

impl Default for FrameSource {
    fn default() -> Self {
        FrameSource::Display
    }
}

/// Engine configuration. Every field has a default, so partial JSON is accepted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Time for the smoothed scroll offset to settle on the native offset.
    /// Zero disables smoothing.
    pub smoothing_decay_s: f32,
    /// Upper bound on a single frame step. Long gaps (backgrounded tab)
    /// collapse to this so nothing catches up in one jump.
    pub max_frame_dt_s: f32,
    pub frame_source: FrameSource,
    /// Trailing debounce applied to resize-driven breakpoint classification.
    pub resize_debounce_ms: f32,
    /// Ascending by `min_width`; the first entry is the fallback below every threshold.
    pub breakpoints: Vec<Breakpoint>,
    /// Distance below which the smoothed offset snaps to its target.
    pub snap_epsilon: f32,
    /// Timelines wait for `Engine::mark_layout_ready` before their first measurement.
    pub require_layout_ready: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing_decay_s: 1.2,
            max_frame_dt_s: 1.0 / 30.0,
            frame_source: FrameSource::Display,
            resize_debounce_ms: 150.0,
            breakpoints: vec![
                Breakpoint::new("mobile", 0.0),
                Breakpoint::new("desktop", 768.0),
            ],
            snap_epsilon: 0.01,
            require_layout_ready: true,
        }
    }
}

impl Config {
    /// Parse a (possibly partial) JSON config and validate it.
    pub fn from_json(s: &str) -> Result<Self> {
        let cfg: Config = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.smoothing_decay_s.is_finite() || self.smoothing_decay_s < 0.0 {
            return Err(ScrollSyncError::InvalidConfig(
                "smoothing_decay_s must be finite and >= 0".into(),
            ));
        }
        if !self.max_frame_dt_s.is_finite() || self.max_frame_dt_s <= 0.0 {
            return Err(ScrollSyncError::InvalidConfig(
                "max_frame_dt_s must be finite and > 0".into(),
            ));
        }
        if let FrameSource::Polling { interval_ms } = self.frame_source {
            if !interval_ms.is_finite() || interval_ms <= 0.0 {
                return Err(ScrollSyncError::InvalidConfig(
                    "polling interval_ms must be finite and > 0".into(),
                ));
            }
        }
        if !self.resize_debounce_ms.is_finite() || self.resize_debounce_ms < 0.0 {
            return Err(ScrollSyncError::InvalidConfig(
                "resize_debounce_ms must be finite and >= 0".into(),
            ));
        }
        crate::breakpoint::validate_breakpoints(&self.breakpoints)?;
        Ok(())
    }
}
