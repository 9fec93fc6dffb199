//! Runtime configuration
//!
//! Timing constants of the viewport tracker and the resource scheduler.
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! throttle_interval_ms = 10
//! settle_window_ms = 20
//! settle_velocity = 0.03
//! swipe_delay_factor = 600.0
//! swipe_max_delay_ms = 1000
//! main_style_name = "mip-main"
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{MipError, Result};

/// Timing and stylesheet settings for a [`MipContext`](crate::MipContext)
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct MipConfig {
    /// Resource scheduler recompute throttle window
    pub throttle_interval_ms: u64,
    /// Viewport sampling window and settle-check delay
    pub settle_window_ms: u64,
    /// Scroll velocity (px/ms) under which scrolling counts as settled
    pub settle_velocity: f64,
    /// Milliseconds of delay per px/ms of swipe velocity
    pub swipe_delay_factor: f64,
    /// Upper bound for the swipe-derived recompute delay
    pub swipe_max_delay_ms: u64,
    /// Stylesheet that element stylesheets are inserted after
    pub main_style_name: String,
}

impl Default for MipConfig {
    fn default() -> Self {
        Self {
            throttle_interval_ms: 10,
            settle_window_ms: 20,
            settle_velocity: 0.03,
            swipe_delay_factor: 600.0,
            swipe_max_delay_ms: 1000,
            main_style_name: "mip-main".to_string(),
        }
    }
}

impl MipConfig {
    /// Parse and validate a TOML configuration
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: MipConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the relationships between the timing values.
    ///
    /// The throttle window must be shorter than the settle window so that a
    /// settle always produces a recompute before the next settle check.
    pub fn validate(&self) -> Result<()> {
        if self.throttle_interval_ms == 0 {
            return Err(MipError::Config(
                "throttle_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.throttle_interval_ms >= self.settle_window_ms {
            return Err(MipError::Config(format!(
                "throttle_interval_ms ({}) must be less than settle_window_ms ({})",
                self.throttle_interval_ms, self.settle_window_ms
            )));
        }
        if self.settle_velocity.is_nan() || self.settle_velocity <= 0.0 {
            return Err(MipError::Config(format!(
                "settle_velocity must be positive, got {}",
                self.settle_velocity
            )));
        }
        if self.swipe_delay_factor.is_nan() || self.swipe_delay_factor < 0.0 {
            return Err(MipError::Config(format!(
                "swipe_delay_factor must not be negative, got {}",
                self.swipe_delay_factor
            )));
        }
        Ok(())
    }

    pub fn throttle_interval(&self) -> Duration {
        Duration::from_millis(self.throttle_interval_ms)
    }

    pub fn settle_window(&self) -> Duration {
        Duration::from_millis(self.settle_window_ms)
    }

    pub fn swipe_max_delay(&self) -> Duration {
        Duration::from_millis(self.swipe_max_delay_ms)
    }
}
