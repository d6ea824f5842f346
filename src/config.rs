//! Engine configuration.
//!
//! A plain typed bundle, not sourced from environment variables, CLI
//! flags, or files — the core takes no part in how its host process is
//! configured, it just needs these five numbers.

use std::time::Duration;

/// Tuning knobs for the matching engine's background worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Worker sleep between iterations.
    pub worker_tick_interval: Duration,
    /// Minimum elapsed time between status snapshots.
    pub status_interval: Duration,
    /// Minimum elapsed time between GTD expiry sweeps.
    pub gtd_check_interval: Duration,
    /// Interval at which daily statistics (and DAY orders) reset.
    pub daily_reset_interval: Duration,
    /// Tick-grid tolerance used when validating externally supplied decimal prices.
    pub price_epsilon: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            worker_tick_interval: Duration::from_secs(1),
            status_interval: Duration::from_secs(30),
            gtd_check_interval: Duration::from_secs(60 * 60),
            daily_reset_interval: Duration::from_secs(24 * 60 * 60),
            price_epsilon: 1e-8,
        }
    }
}
