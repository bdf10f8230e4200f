//! Circuit breaker policies
//!
//! A breaker tracks backend health per key (the tool id) and short-circuits
//! calls while a backend is failing.
//!
//! ```text
//!            failures >= threshold
//!   ┌────────┐ ─────────────────────▶ ┌──────┐
//!   │ Closed │                        │ Open │◀──┐
//!   └────────┘ ◀───┐                  └──┬───┘   │ trial failure
//!                  │ trial success       │       │
//!                  │                     │ recovery_timeout elapsed
//!                  │               ┌─────▼────┐  │
//!                  └───────────────│ HalfOpen │──┘
//!                                  └──────────┘
//! ```
//!
//! | Variant | Threshold |
//! |---------|-----------|
//! | [`StandardCircuitBreaker`] | fixed `failure_threshold` |
//! | [`AdaptiveCircuitBreaker`] | moves between `base_threshold` and `max_threshold` with the rolling error rate |
//! | [`DisabledCircuitBreaker`] | never opens |
//!
//! Breaker state lives inside the breaker instance. Attach the same
//! `Arc<dyn CircuitBreaker>` to a spec and every call to that tool shares it.

use crate::core::clock::{Clock, SystemClock};
use crate::core::error::InvocationError;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RECOVERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_HALF_OPEN_MAX_CALLS: u32 = 1;
pub const DEFAULT_MAX_THRESHOLD: u32 = 20;
pub const DEFAULT_ERROR_RATE_THRESHOLD: f64 = 0.5;
pub const DEFAULT_WINDOW_SIZE: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Returned by [`CircuitBreaker::acquire`] when a call may not proceed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitRejected {
    /// Time until the breaker admits a trial call (zero when half-open
    /// trial slots are all taken)
    pub retry_after: Duration,
}

/// Settings a breaker was built with
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerSettings {
    /// Consecutive failures before opening (base threshold when adaptive)
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
    pub half_open_max_calls: u32,
    pub adaptive: Option<AdaptiveSettings>,
}

/// Extra settings of an [`AdaptiveCircuitBreaker`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdaptiveSettings {
    pub max_threshold: u32,
    pub error_rate_threshold: f64,
    pub window_size: usize,
}

/// Per-key failure state machine.
pub trait CircuitBreaker: Send + Sync + std::fmt::Debug {
    /// Policy name ("standard", "adaptive", "disabled")
    fn name(&self) -> &'static str;

    fn state(&self, key: &str) -> CircuitState;

    /// Ask to dispatch a call. In `HalfOpen` this takes one trial slot,
    /// which the following `record_*` or [`release`](Self::release) frees.
    fn acquire(&self, key: &str) -> Result<(), CircuitRejected>;

    fn record_success(&self, key: &str);

    fn record_failure(&self, key: &str);

    /// Give back an acquired slot without recording an outcome
    fn release(&self, key: &str);

    /// Force the key back to `Closed`
    fn reset(&self, key: &str);

    fn consecutive_failures(&self, key: &str) -> u32;

    /// Failure count that currently trips the breaker
    fn current_threshold(&self, key: &str) -> u32;

    /// Construction settings, `None` for breakers that never open
    fn settings(&self) -> Option<BreakerSettings> {
        None
    }
}

/// Admission obtained from a breaker for one call.
///
/// Settle it with [`succeed`](Self::succeed) or [`fail`](Self::fail). A
/// permit dropped unsettled (cancelled call, non-countable error) releases
/// its slot without touching the failure count.
#[derive(Debug)]
pub struct CircuitPermit {
    breaker: Arc<dyn CircuitBreaker>,
    key: String,
    settled: bool,
}

impl CircuitPermit {
    pub fn acquire(
        breaker: &Arc<dyn CircuitBreaker>,
        key: &str,
    ) -> Result<Self, InvocationError> {
        breaker.acquire(key).map_err(|rejected| {
            InvocationError::circuit_open(key).with_retry_after(rejected.retry_after)
        })?;
        Ok(Self {
            breaker: Arc::clone(breaker),
            key: key.to_string(),
            settled: false,
        })
    }

    pub fn succeed(mut self) {
        self.settled = true;
        self.breaker.record_success(&self.key);
    }

    pub fn fail(mut self) {
        self.settled = true;
        self.breaker.record_failure(&self.key);
    }
}

impl Drop for CircuitPermit {
    fn drop(&mut self) {
        if !self.settled {
            self.breaker.release(&self.key);
        }
    }
}

impl InvocationError {
    fn with_retry_after(mut self, retry_after: Duration) -> Self {
        if !retry_after.is_zero() {
            self.message = format!("{} (retry after {}ms)", self.message, retry_after.as_millis());
        }
        self
    }
}

// ==================== Shared state machine ====================

#[derive(Debug)]
struct BreakerEntry {
    state: CircuitState,
    consecutive_failures: u32,
    threshold: u32,
    last_transition: Instant,
    trials_in_flight: u32,
    /// Rolling outcome window (`true` = failure), adaptive only
    outcomes: VecDeque<bool>,
}

impl BreakerEntry {
    fn new(now: Instant, threshold: u32) -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
            threshold,
            last_transition: now,
            trials_in_flight: 0,
            outcomes: VecDeque::new(),
        }
    }

    fn transition(&mut self, to: CircuitState, now: Instant) {
        self.state = to;
        self.last_transition = now;
        self.trials_in_flight = 0;
    }

    fn refresh(&mut self, now: Instant, recovery_timeout: Duration) {
        if self.state == CircuitState::Open
            && now.duration_since(self.last_transition) >= recovery_timeout
        {
            self.transition(CircuitState::HalfOpen, now);
        }
    }

    fn acquire(
        &mut self,
        now: Instant,
        recovery_timeout: Duration,
        half_open_max_calls: u32,
    ) -> Result<(), CircuitRejected> {
        match self.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => Err(CircuitRejected {
                retry_after: recovery_timeout
                    .saturating_sub(now.duration_since(self.last_transition)),
            }),
            CircuitState::HalfOpen if self.trials_in_flight < half_open_max_calls => {
                self.trials_in_flight += 1;
                Ok(())
            }
            CircuitState::HalfOpen => Err(CircuitRejected {
                retry_after: Duration::ZERO,
            }),
        }
    }

    fn succeed(&mut self, now: Instant) {
        match self.state {
            CircuitState::HalfOpen => {
                self.consecutive_failures = 0;
                self.transition(CircuitState::Closed, now);
            }
            CircuitState::Closed => self.consecutive_failures = 0,
            // Late result of a call admitted before the circuit opened
            CircuitState::Open => {}
        }
    }

    fn fail(&mut self, now: Instant) {
        match self.state {
            CircuitState::HalfOpen => {
                self.consecutive_failures += 1;
                self.transition(CircuitState::Open, now);
            }
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.threshold {
                    self.transition(CircuitState::Open, now);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn release(&mut self) {
        if self.state == CircuitState::HalfOpen {
            self.trials_in_flight = self.trials_in_flight.saturating_sub(1);
        }
    }

    fn push_outcome(&mut self, failed: bool, window_size: usize) {
        self.outcomes.push_back(failed);
        while self.outcomes.len() > window_size {
            self.outcomes.pop_front();
        }
    }

    fn error_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            return 0.0;
        }
        let failures = self.outcomes.iter().filter(|failed| **failed).count();
        failures as f64 / self.outcomes.len() as f64
    }
}

#[derive(Debug)]
struct BreakerTable {
    clock: Arc<dyn Clock>,
    recovery_timeout: Duration,
    half_open_max_calls: u32,
    initial_threshold: u32,
    entries: Mutex<HashMap<String, BreakerEntry>>,
}

impl BreakerTable {
    fn new(initial_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            clock: Arc::new(SystemClock),
            recovery_timeout,
            half_open_max_calls: DEFAULT_HALF_OPEN_MAX_CALLS,
            initial_threshold: initial_threshold.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn with_entry<R>(&self, key: &str, f: impl FnOnce(&mut BreakerEntry, Instant) -> R) -> R {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let now = self.clock.now();
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| BreakerEntry::new(now, self.initial_threshold));
        entry.refresh(now, self.recovery_timeout);
        f(entry, now)
    }

    fn state(&self, key: &str) -> CircuitState {
        self.with_entry(key, |entry, _| entry.state)
    }

    fn acquire(&self, key: &str) -> Result<(), CircuitRejected> {
        let (recovery, max_calls) = (self.recovery_timeout, self.half_open_max_calls);
        self.with_entry(key, |entry, now| entry.acquire(now, recovery, max_calls))
    }

    fn release(&self, key: &str) {
        self.with_entry(key, |entry, _| entry.release());
    }

    fn reset(&self, key: &str) {
        let threshold = self.initial_threshold;
        self.with_entry(key, |entry, now| {
            *entry = BreakerEntry::new(now, threshold);
        });
    }

    fn consecutive_failures(&self, key: &str) -> u32 {
        self.with_entry(key, |entry, _| entry.consecutive_failures)
    }

    fn threshold(&self, key: &str) -> u32 {
        self.with_entry(key, |entry, _| entry.threshold)
    }

    fn settings(&self, adaptive: Option<AdaptiveSettings>) -> BreakerSettings {
        BreakerSettings {
            failure_threshold: self.initial_threshold,
            recovery_timeout: self.recovery_timeout,
            half_open_max_calls: self.half_open_max_calls,
            adaptive,
        }
    }
}

// ==================== Standard ====================

/// Opens after a fixed number of consecutive failures.
#[derive(Debug)]
pub struct StandardCircuitBreaker {
    table: BreakerTable,
}

impl StandardCircuitBreaker {
    pub fn new(failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            table: BreakerTable::new(failure_threshold, recovery_timeout),
        }
    }

    pub fn with_half_open_max_calls(mut self, max_calls: u32) -> Self {
        self.table.half_open_max_calls = max_calls.max(1);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.table.clock = clock;
        self
    }

    pub fn failure_threshold(&self) -> u32 {
        self.table.initial_threshold
    }

    pub fn recovery_timeout(&self) -> Duration {
        self.table.recovery_timeout
    }
}

impl Default for StandardCircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_THRESHOLD, DEFAULT_RECOVERY_TIMEOUT)
    }
}

impl CircuitBreaker for StandardCircuitBreaker {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn state(&self, key: &str) -> CircuitState {
        self.table.state(key)
    }

    fn acquire(&self, key: &str) -> Result<(), CircuitRejected> {
        self.table.acquire(key)
    }

    fn record_success(&self, key: &str) {
        self.table.with_entry(key, |entry, now| entry.succeed(now));
    }

    fn record_failure(&self, key: &str) {
        self.table.with_entry(key, |entry, now| entry.fail(now));
    }

    fn release(&self, key: &str) {
        self.table.release(key);
    }

    fn reset(&self, key: &str) {
        self.table.reset(key);
    }

    fn consecutive_failures(&self, key: &str) -> u32 {
        self.table.consecutive_failures(key)
    }

    fn current_threshold(&self, key: &str) -> u32 {
        self.table.threshold(key)
    }

    fn settings(&self) -> Option<BreakerSettings> {
        Some(self.table.settings(None))
    }
}

// ==================== Adaptive ====================

/// Threshold follows the recent error rate: it rises toward
/// `max_threshold` while the backend is mostly healthy and falls back to
/// `base_threshold` when errors dominate the window.
#[derive(Debug)]
pub struct AdaptiveCircuitBreaker {
    table: BreakerTable,
    max_threshold: u32,
    error_rate_threshold: f64,
    window_size: usize,
}

impl AdaptiveCircuitBreaker {
    pub fn new(base_threshold: u32, max_threshold: u32, recovery_timeout: Duration) -> Self {
        let table = BreakerTable::new(base_threshold, recovery_timeout);
        let max_threshold = max_threshold.max(table.initial_threshold);
        Self {
            table,
            max_threshold,
            error_rate_threshold: DEFAULT_ERROR_RATE_THRESHOLD,
            window_size: DEFAULT_WINDOW_SIZE,
        }
    }

    pub fn with_error_rate_threshold(mut self, rate: f64) -> Self {
        self.error_rate_threshold = rate.clamp(0.0, 1.0);
        self
    }

    pub fn with_window_size(mut self, window_size: usize) -> Self {
        self.window_size = window_size.max(1);
        self
    }

    pub fn with_half_open_max_calls(mut self, max_calls: u32) -> Self {
        self.table.half_open_max_calls = max_calls.max(1);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.table.clock = clock;
        self
    }

    pub fn base_threshold(&self) -> u32 {
        self.table.initial_threshold
    }

    pub fn max_threshold(&self) -> u32 {
        self.max_threshold
    }

    fn record(&self, key: &str, failed: bool) {
        let base = self.table.initial_threshold;
        let (max, rate_threshold, window) =
            (self.max_threshold, self.error_rate_threshold, self.window_size);

        self.table.with_entry(key, |entry, now| {
            entry.push_outcome(failed, window);
            if failed {
                entry.fail(now);
            } else {
                entry.succeed(now);
            }

            let rate = entry.error_rate();
            if rate < rate_threshold / 2.0 {
                entry.threshold = (entry.threshold + 1).min(max);
            } else if rate > rate_threshold {
                entry.threshold = entry.threshold.saturating_sub(1).max(base);
            }
        });
    }
}

impl Default for AdaptiveCircuitBreaker {
    fn default() -> Self {
        Self::new(
            DEFAULT_FAILURE_THRESHOLD,
            DEFAULT_MAX_THRESHOLD,
            DEFAULT_RECOVERY_TIMEOUT,
        )
    }
}

impl CircuitBreaker for AdaptiveCircuitBreaker {
    fn name(&self) -> &'static str {
        "adaptive"
    }

    fn state(&self, key: &str) -> CircuitState {
        self.table.state(key)
    }

    fn acquire(&self, key: &str) -> Result<(), CircuitRejected> {
        self.table.acquire(key)
    }

    fn record_success(&self, key: &str) {
        self.record(key, false);
    }

    fn record_failure(&self, key: &str) {
        self.record(key, true);
    }

    fn release(&self, key: &str) {
        self.table.release(key);
    }

    fn reset(&self, key: &str) {
        self.table.reset(key);
    }

    fn consecutive_failures(&self, key: &str) -> u32 {
        self.table.consecutive_failures(key)
    }

    fn current_threshold(&self, key: &str) -> u32 {
        self.table.threshold(key)
    }

    fn settings(&self) -> Option<BreakerSettings> {
        Some(self.table.settings(Some(AdaptiveSettings {
            max_threshold: self.max_threshold,
            error_rate_threshold: self.error_rate_threshold,
            window_size: self.window_size,
        })))
    }
}

// ==================== Disabled ====================

/// Always closed; records nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCircuitBreaker;

impl CircuitBreaker for DisabledCircuitBreaker {
    fn name(&self) -> &'static str {
        "disabled"
    }

    fn state(&self, _key: &str) -> CircuitState {
        CircuitState::Closed
    }

    fn acquire(&self, _key: &str) -> Result<(), CircuitRejected> {
        Ok(())
    }

    fn record_success(&self, _key: &str) {}

    fn record_failure(&self, _key: &str) {}

    fn release(&self, _key: &str) {}

    fn reset(&self, _key: &str) {}

    fn consecutive_failures(&self, _key: &str) -> u32 {
        0
    }

    fn current_threshold(&self, _key: &str) -> u32 {
        u32::MAX
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::clock::ManualClock;
    use crate::core::error::ErrorKind;

    const KEY: &str = "flaky";

    fn standard(threshold: u32, recovery_secs: u64) -> (StandardCircuitBreaker, ManualClock) {
        let clock = ManualClock::new();
        let breaker = StandardCircuitBreaker::new(threshold, Duration::from_secs(recovery_secs))
            .with_clock(Arc::new(clock.clone()));
        (breaker, clock)
    }

    // ==================== Standard ====================

    #[test]
    fn test_opens_after_threshold_consecutive_failures() {
        let (breaker, _clock) = standard(3, 30);

        for _ in 0..2 {
            breaker.acquire(KEY).unwrap();
            breaker.record_failure(KEY);
        }
        assert_eq!(breaker.state(KEY), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(KEY), 2);

        breaker.acquire(KEY).unwrap();
        breaker.record_failure(KEY);
        assert_eq!(breaker.state(KEY), CircuitState::Open);

        let rejected = breaker.acquire(KEY).unwrap_err();
        assert_eq!(rejected.retry_after, Duration::from_secs(30));
    }

    #[test]
    fn test_success_resets_counter_while_closed() {
        let (breaker, _clock) = standard(3, 30);

        breaker.record_failure(KEY);
        breaker.record_failure(KEY);
        breaker.record_success(KEY);
        breaker.record_failure(KEY);
        breaker.record_failure(KEY);

        assert_eq!(breaker.state(KEY), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(KEY), 2);
    }

    #[test]
    fn test_open_half_open_closed_cycle() {
        let (breaker, clock) = standard(2, 30);
        breaker.record_failure(KEY);
        breaker.record_failure(KEY);
        assert_eq!(breaker.state(KEY), CircuitState::Open);

        clock.advance(Duration::from_secs(29));
        assert_eq!(breaker.state(KEY), CircuitState::Open);
        assert!(breaker.acquire(KEY).is_err());

        clock.advance(Duration::from_secs(1));
        assert_eq!(breaker.state(KEY), CircuitState::HalfOpen);

        // One trial at a time
        breaker.acquire(KEY).unwrap();
        assert_eq!(
            breaker.acquire(KEY),
            Err(CircuitRejected {
                retry_after: Duration::ZERO
            })
        );

        breaker.record_success(KEY);
        assert_eq!(breaker.state(KEY), CircuitState::Closed);
        assert_eq!(breaker.consecutive_failures(KEY), 0);
    }

    #[test]
    fn test_half_open_failure_reopens_and_restarts_timeout() {
        let (breaker, clock) = standard(1, 10);
        breaker.record_failure(KEY);
        clock.advance(Duration::from_secs(10));

        breaker.acquire(KEY).unwrap();
        breaker.record_failure(KEY);
        assert_eq!(breaker.state(KEY), CircuitState::Open);

        clock.advance(Duration::from_secs(9));
        assert_eq!(breaker.state(KEY), CircuitState::Open);
        clock.advance(Duration::from_secs(1));
        assert_eq!(breaker.state(KEY), CircuitState::HalfOpen);
    }

    #[test]
    fn test_keys_are_independent() {
        let (breaker, _clock) = standard(1, 30);
        breaker.record_failure("a");

        assert_eq!(breaker.state("a"), CircuitState::Open);
        assert_eq!(breaker.state("b"), CircuitState::Closed);
    }

    #[test]
    fn test_reset_closes_circuit() {
        let (breaker, _clock) = standard(1, 30);
        breaker.record_failure(KEY);
        breaker.reset(KEY);

        assert_eq!(breaker.state(KEY), CircuitState::Closed);
        assert!(breaker.acquire(KEY).is_ok());
    }

    // ==================== Permit ====================

    #[test]
    fn test_unsettled_permit_releases_trial_slot() {
        let clock = ManualClock::new();
        let breaker: Arc<dyn CircuitBreaker> = Arc::new(
            StandardCircuitBreaker::new(1, Duration::from_secs(5))
                .with_clock(Arc::new(clock.clone())),
        );
        breaker.record_failure(KEY);
        clock.advance(Duration::from_secs(5));

        let permit = CircuitPermit::acquire(&breaker, KEY).unwrap();
        assert!(CircuitPermit::acquire(&breaker, KEY).is_err());
        drop(permit);

        assert_eq!(breaker.state(KEY), CircuitState::HalfOpen);
        CircuitPermit::acquire(&breaker, KEY).unwrap().succeed();
        assert_eq!(breaker.state(KEY), CircuitState::Closed);
    }

    #[test]
    fn test_permit_rejection_is_circuit_open_error() {
        let breaker: Arc<dyn CircuitBreaker> = Arc::new(StandardCircuitBreaker::new(1, Duration::from_secs(30)));
        CircuitPermit::acquire(&breaker, KEY).unwrap().fail();

        let err = CircuitPermit::acquire(&breaker, KEY).unwrap_err();
        assert_eq!(err.kind, ErrorKind::CircuitOpen);
        assert!(!err.is_retryable());
    }

    // ==================== Adaptive ====================

    #[test]
    fn test_adaptive_threshold_rises_while_healthy() {
        let breaker = AdaptiveCircuitBreaker::new(2, 4, Duration::from_secs(30));
        assert_eq!(breaker.current_threshold(KEY), 2);

        for _ in 0..10 {
            breaker.record_success(KEY);
        }
        assert_eq!(breaker.current_threshold(KEY), 4);

        // Three failures would have tripped the base threshold
        for _ in 0..3 {
            breaker.record_failure(KEY);
        }
        assert_eq!(breaker.state(KEY), CircuitState::Closed);
    }

    #[test]
    fn test_adaptive_threshold_falls_back_under_errors() {
        let breaker = AdaptiveCircuitBreaker::new(2, 10, Duration::from_secs(30))
            .with_window_size(4);
        for _ in 0..4 {
            breaker.record_success(KEY);
        }
        assert_eq!(breaker.current_threshold(KEY), 6);

        for _ in 0..3 {
            breaker.record_failure(KEY);
        }
        // Window is [ok, fail, fail, fail]; rate 0.75 lowers the threshold
        assert!(breaker.current_threshold(KEY) < 6);
        assert!(breaker.current_threshold(KEY) >= breaker.base_threshold());
    }

    #[test]
    fn test_adaptive_opens_at_base_threshold_when_failing() {
        let clock = ManualClock::new();
        let breaker = AdaptiveCircuitBreaker::new(3, 20, Duration::from_secs(30))
            .with_clock(Arc::new(clock.clone()));

        for _ in 0..3 {
            breaker.record_failure(KEY);
        }
        assert_eq!(breaker.state(KEY), CircuitState::Open);

        clock.advance(Duration::from_secs(30));
        breaker.acquire(KEY).unwrap();
        breaker.record_success(KEY);
        assert_eq!(breaker.state(KEY), CircuitState::Closed);
    }

    // ==================== Disabled ====================

    #[test]
    fn test_disabled_never_opens() {
        let breaker = DisabledCircuitBreaker;
        for _ in 0..100 {
            breaker.record_failure(KEY);
        }
        assert_eq!(breaker.state(KEY), CircuitState::Closed);
        assert!(breaker.acquire(KEY).is_ok());
    }

    #[test]
    fn test_settings_report_construction_values() {
        let standard = StandardCircuitBreaker::new(4, Duration::from_secs(15)).with_half_open_max_calls(2);
        assert_eq!(
            standard.settings(),
            Some(BreakerSettings {
                failure_threshold: 4,
                recovery_timeout: Duration::from_secs(15),
                half_open_max_calls: 2,
                adaptive: None,
            })
        );

        let adaptive = AdaptiveCircuitBreaker::new(2, 8, Duration::from_secs(30)).with_window_size(20);
        let settings = adaptive.settings().unwrap();
        assert_eq!(settings.failure_threshold, 2);
        assert_eq!(
            settings.adaptive,
            Some(AdaptiveSettings {
                max_threshold: 8,
                error_rate_threshold: DEFAULT_ERROR_RATE_THRESHOLD,
                window_size: 20,
            })
        );

        assert_eq!(DisabledCircuitBreaker.settings(), None);
    }
}
