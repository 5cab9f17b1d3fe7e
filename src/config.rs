//! Engine tuning knobs with built-in defaults and environment overrides.

use std::{env, time::Duration};

use tracing::warn;

/// Environment variable overriding the poll interval, in milliseconds.
const POLL_INTERVAL_ENV: &str = "MINDCLASH_SYNC_POLL_INTERVAL_MS";
/// Environment variable overriding the timer check resolution, in milliseconds.
const TIMER_RESOLUTION_ENV: &str = "MINDCLASH_SYNC_TIMER_RESOLUTION_MS";

/// Lower bound on the poll interval so a misconfigured client cannot hammer
/// the server faster than the transport contract allows.
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(500);
/// Lower bound on the expiry check resolution.
const MIN_TIMER_RESOLUTION: Duration = Duration::from_millis(50);
/// Upper bound on the expiry check resolution; anything coarser makes the
/// displayed countdown visibly jumpy.
const MAX_TIMER_RESOLUTION: Duration = Duration::from_millis(200);

/// Immutable per-session configuration.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// How often a new snapshot fetch is attempted. A tick that lands while
    /// the previous fetch is still in flight is skipped, so this is also the
    /// upper bound on concurrent requests (one).
    pub poll_interval: Duration,
    /// Resolution of the recurring check that drives round-timer expiry.
    pub timer_resolution: Duration,
    /// Round duration assumed when a snapshot carries no quiz settings.
    pub default_time_per_question: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            timer_resolution: Duration::from_millis(150),
            default_time_per_question: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    /// Build a configuration from defaults plus environment overrides,
    /// falling back (with a warning) on values that fail to parse.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(value) = read_millis(POLL_INTERVAL_ENV) {
            config.poll_interval = value;
        }
        if let Some(value) = read_millis(TIMER_RESOLUTION_ENV) {
            config.timer_resolution = value;
        }
        config.normalized()
    }

    /// Clamp values into their supported ranges.
    pub fn normalized(mut self) -> Self {
        self.poll_interval = self.poll_interval.max(MIN_POLL_INTERVAL);
        self.timer_resolution = self
            .timer_resolution
            .clamp(MIN_TIMER_RESOLUTION, MAX_TIMER_RESOLUTION);
        self
    }
}

/// Read a millisecond duration from the environment, warning on garbage.
fn read_millis(var: &str) -> Option<Duration> {
    let raw = env::var(var).ok()?;
    match raw.parse::<u64>() {
        Ok(millis) => Some(Duration::from_millis(millis)),
        Err(err) => {
            warn!(var, value = %raw, error = %err, "ignoring unparseable duration override");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_within_bounds() {
        let config = SyncConfig::default().normalized();
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.timer_resolution, Duration::from_millis(150));
        assert_eq!(config.default_time_per_question, Duration::from_secs(30));
    }

    #[test]
    fn normalization_clamps_extremes() {
        let config = SyncConfig {
            poll_interval: Duration::from_millis(10),
            timer_resolution: Duration::from_secs(5),
            ..SyncConfig::default()
        }
        .normalized();

        assert_eq!(config.poll_interval, MIN_POLL_INTERVAL);
        assert_eq!(config.timer_resolution, MAX_TIMER_RESOLUTION);
    }
}
