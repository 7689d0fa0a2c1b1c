use std::time::Duration;

/// Default target wall-clock length of one full replay.
pub const DEFAULT_REPLAY_DURATION: Duration = Duration::from_millis(300_000);

/// Delta used when a capture has fewer than two snapshots.
pub const DEFAULT_FALLBACK_DELTA: Duration = Duration::from_millis(1_000);

/// How replay ticks are spaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum Pacing {
    /// One period for the whole run, taken from the first delta.
    #[default]
    Fixed,
    /// Every step waits its own scaled delta.
    Proportional,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplayConfig {
    /// Wall-clock length a full replay is compressed (or stretched) to.
    pub total_duration: Duration,
    pub fallback_delta: Duration,
    pub pacing: Pacing,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            total_duration: DEFAULT_REPLAY_DURATION,
            fallback_delta: DEFAULT_FALLBACK_DELTA,
            pacing: Pacing::default(),
        }
    }
}

impl ReplayConfig {
    pub fn with_total_duration(mut self, total_duration: Duration) -> Self {
        self.total_duration = total_duration;
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }
}
