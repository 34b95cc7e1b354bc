//! Runner timing configuration parsed from environment variables.
//!
//! - `WILLFLOW_STAGE_GAP_MS`: pause between one stage completing and the
//!   next starting (default 500)
//! - `WILLFLOW_TIME_SCALE`: multiplier applied to every stage duration and
//!   the gap (default 1.0). Non-positive or non-finite values fall back to
//!   the default; values above `MAX_TIME_SCALE` are clamped.

use std::time::Duration;

use tracing::warn;

pub const DEFAULT_STAGE_GAP_MS: u64 = 500;
pub const DEFAULT_TIME_SCALE: f64 = 1.0;
pub const MAX_TIME_SCALE: f64 = 1_000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunnerConfig {
    stage_gap: Duration,
    time_scale: f64,
}

impl RunnerConfig {
    #[must_use]
    pub fn new(stage_gap: Duration, time_scale: f64) -> Self {
        Self { stage_gap, time_scale: sanitize_scale(time_scale) }
    }

    #[must_use]
    pub fn from_env() -> Self {
        let gap_ms = env_parse("WILLFLOW_STAGE_GAP_MS", DEFAULT_STAGE_GAP_MS);
        let time_scale = env_parse("WILLFLOW_TIME_SCALE", DEFAULT_TIME_SCALE);
        Self::new(Duration::from_millis(gap_ms), time_scale)
    }

    #[must_use]
    pub fn with_stage_gap(mut self, stage_gap: Duration) -> Self {
        self.stage_gap = stage_gap;
        self
    }

    #[must_use]
    pub fn with_time_scale(mut self, time_scale: f64) -> Self {
        self.time_scale = sanitize_scale(time_scale);
        self
    }

    #[must_use]
    pub fn time_scale(&self) -> f64 {
        self.time_scale
    }

    /// The inter-stage pause after scaling.
    #[must_use]
    pub fn stage_gap(&self) -> Duration {
        self.scale(self.stage_gap)
    }

    /// Apply the time scale to a nominal duration, saturating at
    /// `Duration::MAX`.
    #[must_use]
    pub fn scale(&self, nominal: Duration) -> Duration {
        if (self.time_scale - DEFAULT_TIME_SCALE).abs() < f64::EPSILON {
            nominal
        } else {
            Duration::try_from_secs_f64(nominal.as_secs_f64() * self.time_scale).unwrap_or(Duration::MAX)
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self { stage_gap: Duration::from_millis(DEFAULT_STAGE_GAP_MS), time_scale: DEFAULT_TIME_SCALE }
    }
}

fn sanitize_scale(raw: f64) -> f64 {
    if !raw.is_finite() || raw <= 0.0 {
        warn!(time_scale = raw, "config: invalid time scale, using default");
        DEFAULT_TIME_SCALE
    } else if raw > MAX_TIME_SCALE {
        warn!(time_scale = raw, max = MAX_TIME_SCALE, "config: time scale clamped");
        MAX_TIME_SCALE
    } else {
        raw
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
