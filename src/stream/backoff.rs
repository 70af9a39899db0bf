//! Reconnect policy for live streams.
//!
//! The default policy never retries: a stream error closes the channel.
//! When retries are enabled the delay doubles per attempt up to `max_delay`.

use std::time::Duration;

use rand::Rng;

/// Default delay before the first retry.
pub const DEFAULT_INITIAL_DELAY_MS: u64 = 1_000;

/// Default upper bound on a single retry delay.
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// How a connection recovers from transport errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Retries per failure run; 0 disables reconnecting
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    /// Randomize each delay within `[delay / 2, delay]`
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 0,
            initial_delay: Duration::from_millis(DEFAULT_INITIAL_DELAY_MS),
            max_delay: Duration::from_millis(DEFAULT_MAX_DELAY_MS),
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// A policy that never reconnects.
    #[must_use]
    pub fn disabled() -> Self {
        Self::default()
    }

    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    #[must_use]
    pub const fn enabled(&self) -> bool {
        self.max_retries > 0
    }

    /// Delay before retry number `attempt` (0-based), or `None` once the
    /// retry budget is spent.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }

        let base = self.base_delay(attempt);
        if !self.jitter || base.is_zero() {
            return Some(base);
        }

        let ms = u64::try_from(base.as_millis()).unwrap_or(u64::MAX);
        let jittered = rand::thread_rng().gen_range(ms / 2..=ms);
        Some(Duration::from_millis(jittered))
    }

    /// [`delay_for`](Self::delay_for), raised to the server's `retry:` hint
    /// when that is longer. The hint never pushes past `max_delay`.
    #[must_use]
    pub fn delay_with_hint(&self, attempt: u32, hint: Option<Duration>) -> Option<Duration> {
        let delay = self.delay_for(attempt)?;
        Some(hint.map_or(delay, |hint| delay.max(hint.min(self.max_delay))))
    }

    /// Un-jittered exponential delay, capped at `max_delay`.
    fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}
