//! Backoff for stages whose worker reports [`WorkResult::Retry`].
//!
//! [`RetryConfig`] is the serializable policy; [`Backoff`] walks it for one
//! request, handing out the wait before each rerun until the worker has run
//! `max_attempts` times.
//!
//! [`WorkResult::Retry`]: super::WorkResult::Retry

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the wait grows between reruns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// Doubles after every rerun.
    #[default]
    Exponential,
    /// Grows by the base delay after every rerun.
    Linear,
    /// Always the base delay.
    Constant,
}

/// Randomization applied on top of the computed wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Wait exactly the computed delay.
    None,
    /// Anywhere between zero and the delay.
    #[default]
    Full,
    /// Half the delay plus a random share of the other half.
    Equal,
    /// Between the base delay and three times the previous wait.
    Decorrelated,
}

/// Retry policy for the local engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total worker runs allowed per request, the first one included.
    pub max_attempts: usize,
    /// Wait before the first rerun, in milliseconds.
    pub base_delay_ms: u64,
    /// Upper bound for any wait, in milliseconds.
    pub max_delay_ms: u64,
    /// Growth of the wait.
    pub backoff_strategy: BackoffStrategy,
    /// Randomization of the wait.
    pub jitter_strategy: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30000,
            backoff_strategy: BackoffStrategy::Exponential,
            jitter_strategy: JitterStrategy::Full,
        }
    }
}

impl RetryConfig {
    /// A policy that never reruns a worker.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// A deterministic policy: `max_attempts` runs spaced by a constant wait.
    #[must_use]
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        let ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        Self {
            max_attempts,
            base_delay_ms: ms,
            max_delay_ms: ms,
            backoff_strategy: BackoffStrategy::Constant,
            jitter_strategy: JitterStrategy::None,
        }
    }

    /// Sets the growth of the wait.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff_strategy = strategy;
        self
    }

    /// Sets the randomization of the wait.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter_strategy = strategy;
        self
    }

    /// Starts tracking reruns for one request.
    #[must_use]
    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            config: self,
            reruns: 0,
            previous_delay_ms: None,
        }
    }

    fn unjittered_ms(&self, reruns: usize) -> u64 {
        let base = self.base_delay_ms;
        let step = u32::try_from(reruns).unwrap_or(u32::MAX);
        let grown = match self.backoff_strategy {
            BackoffStrategy::Exponential => base.saturating_mul(2u64.saturating_pow(step)),
            BackoffStrategy::Linear => base.saturating_mul(u64::from(step).saturating_add(1)),
            BackoffStrategy::Constant => base,
        };
        grown.min(self.max_delay_ms)
    }
}

/// Rerun bookkeeping for a single request.
#[derive(Debug)]
pub struct Backoff<'a> {
    config: &'a RetryConfig,
    reruns: usize,
    previous_delay_ms: Option<u64>,
}

impl Backoff<'_> {
    /// Number of reruns handed out so far.
    #[must_use]
    pub fn reruns(&self) -> usize {
        self.reruns
    }

    /// Number of times the worker has run, assuming it ran once per wait.
    #[must_use]
    pub fn runs(&self) -> usize {
        self.reruns + 1
    }

    /// Returns the wait before the next run, or `None` once the worker has
    /// used up `max_attempts`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.runs() >= self.config.max_attempts {
            return None;
        }
        let delay = self.config.unjittered_ms(self.reruns);
        let waited = self.jitter(delay);
        self.previous_delay_ms = Some(waited);
        self.reruns += 1;
        Some(Duration::from_millis(waited))
    }

    fn jitter(&self, delay: u64) -> u64 {
        let mut rng = rand::thread_rng();
        match self.config.jitter_strategy {
            JitterStrategy::None => delay,
            JitterStrategy::Full if delay == 0 => 0,
            JitterStrategy::Full => rng.gen_range(0..=delay),
            JitterStrategy::Equal => {
                let half = delay / 2;
                delay - half + rng.gen_range(0..=half)
            }
            JitterStrategy::Decorrelated => {
                let base = self.config.base_delay_ms.min(self.config.max_delay_ms);
                let upper = self
                    .previous_delay_ms
                    .unwrap_or(base)
                    .saturating_mul(3)
                    .min(self.config.max_delay_ms);
                if upper <= base {
                    base
                } else {
                    rng.gen_range(base..=upper)
                }
            }
        }
    }
}
