//! Reconnect delay policy.
//!
//! The default is exponential backoff with a cap. [`ReconnectPolicy::fixed`]
//! reproduces a constant delay for deployments that want it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Reconnect delay parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectPolicy {
    /// Delay before the first reconnect attempt.
    pub initial_delay_ms: u64,
    /// Upper bound on any single delay.
    pub max_delay_ms: u64,
    /// Growth factor per consecutive failure. `1.0` means a fixed delay.
    pub multiplier: f64,
    /// Randomize each delay within `[delay/2, delay]`.
    pub jitter: bool,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay_ms: 5_000,
            max_delay_ms: 60_000,
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl ReconnectPolicy {
    /// A constant delay with no jitter.
    pub fn fixed(delay: Duration) -> Self {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self {
            initial_delay_ms: ms,
            max_delay_ms: ms,
            multiplier: 1.0,
            jitter: false,
        }
    }

    pub fn without_jitter(mut self) -> Self {
        self.jitter = false;
        self
    }

    /// Un-jittered delay for the given zero-based attempt.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let multiplier = if self.multiplier.is_finite() && self.multiplier >= 1.0 {
            self.multiplier
        } else {
            1.0
        };
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let raw = self.initial_delay_ms as f64 * multiplier.powi(exponent);
        let cap = self.max_delay_ms.max(self.initial_delay_ms) as f64;
        Duration::from_millis(raw.min(cap) as u64)
    }
}

/// Consecutive-failure counter over a [`ReconnectPolicy`].
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Delay before the next attempt; advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let base = self.policy.base_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        if !self.policy.jitter || base.is_zero() {
            return base;
        }
        let half = base / 2;
        let spread = u64::try_from((base - half).as_millis()).unwrap_or(0);
        half + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }

    /// Back to the initial delay. Called when a connection opens.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    /// Consecutive failed attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }
}
