use crate::error::{FrontschemaError, Result};
use serde::{Deserialize, Serialize};

/// Thresholds for giving up on a batch of failing documents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    /// Open after this many failures in a row.
    pub max_consecutive_failures: u32,
    /// Open when the failure ratio exceeds this, once `min_attempts` documents were tried.
    pub max_failure_ratio: f64,
    pub min_attempts: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        CircuitBreakerConfig {
            enabled: true,
            max_consecutive_failures: 5,
            max_failure_ratio: 0.5,
            min_attempts: 4,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.max_failure_ratio > 0.0 && self.max_failure_ratio <= 1.0) {
            return Err(FrontschemaError::OutOfRange(format!(
                "circuit_breaker.max_failure_ratio must be in (0, 1], got {}",
                self.max_failure_ratio
            )));
        }
        if self.max_consecutive_failures == 0 {
            return Err(FrontschemaError::OutOfRange(
                "circuit_breaker.max_consecutive_failures must be at least 1".into(),
            ));
        }
        if self.min_attempts == 0 {
            return Err(FrontschemaError::OutOfRange(
                "circuit_breaker.min_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
}

/// Tracks per-document outcomes and stops admitting work once the batch
/// looks pathological. Once open it stays open for the rest of the run.
#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    attempts: u32,
    failures: u32,
    consecutive_failures: u32,
    state: BreakerState,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        CircuitBreaker {
            config,
            attempts: 0,
            failures: 0,
            consecutive_failures: 0,
            state: BreakerState::Closed,
        }
    }

    pub fn allows_attempt(&self) -> bool {
        self.state == BreakerState::Closed
    }

    pub fn state(&self) -> BreakerState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn failure_ratio(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            f64::from(self.failures) / f64::from(self.attempts)
        }
    }

    pub fn record_success(&mut self) {
        self.attempts += 1;
        self.consecutive_failures = 0;
        self.trip_if_needed();
    }

    pub fn record_failure(&mut self) {
        self.attempts += 1;
        self.failures += 1;
        self.consecutive_failures += 1;
        self.trip_if_needed();
    }

    fn trip_if_needed(&mut self) {
        if !self.config.enabled || self.state == BreakerState::Open {
            return;
        }

        let consecutive = self.consecutive_failures >= self.config.max_consecutive_failures;
        let ratio = self.attempts >= self.config.min_attempts
            && self.failure_ratio() > self.config.max_failure_ratio;

        if consecutive || ratio {
            log::warn!(
                "Circuit breaker opened after {} failure(s) in {} attempt(s) ({} consecutive)",
                self.failures,
                self.attempts,
                self.consecutive_failures
            );
            self.state = BreakerState::Open;
        }
    }
}
