//! Exponential reconnect delay with a ceiling.

use std::time::Duration;

use threadly_config::RealtimeConfig;

/// `min(max, base * 2^attempts)`, unbounded retries.
///
/// `attempts` grows on every scheduled reconnect and resets only after a
/// socket opens successfully.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backoff {
	base: Duration,
	max: Duration,
	attempts: u32,
}

impl Backoff {
	pub fn new(base: Duration, max: Duration) -> Self {
		Self { base, max, attempts: 0 }
	}

	pub fn from_config(config: &RealtimeConfig) -> Self {
		Self::new(config.base_delay(), config.max_backoff())
	}

	pub fn attempts(&self) -> u32 {
		self.attempts
	}

	/// Delay for a given attempt count, without advancing.
	pub fn delay_for(&self, attempts: u32) -> Duration {
		2u32.checked_pow(attempts)
			.and_then(|factor| self.base.checked_mul(factor))
			.map_or(self.max, |delay| delay.min(self.max))
	}

	/// Delay for the next reconnect; advances the attempt counter.
	pub fn next_delay(&mut self) -> Duration {
		let delay = self.delay_for(self.attempts);
		self.attempts = self.attempts.saturating_add(1);
		delay
	}

	pub fn reset(&mut self) {
		self.attempts = 0;
	}
}

impl Default for Backoff {
	fn default() -> Self {
		Self::from_config(&RealtimeConfig::default())
	}
}
