//! Circuit breaker implementation for outbound calls.
//!
//! The breaker follows the hystrix model: health is judged over a rolling
//! window, the circuit opens once enough requests have been seen and the
//! error percentage crosses a threshold, and after a sleep window a single
//! trial request decides whether to close again. Every guarded call is bounded
//! by a timeout and by a concurrency limit.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock, Semaphore};
use tracing::{debug, warn};

/// Number of buckets the rolling window is split into.
const WINDOW_BUCKETS: u32 = 10;

/// Circuit breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, requests are allowed
    Closed,
    /// Circuit is open, requests are rejected
    Open,
    /// Sleep window elapsed, one trial request is in flight
    HalfOpen,
}

impl CircuitState {
    /// Lower-case name used in log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Upper bound on a single guarded call
    pub timeout: Duration,
    /// Time an open circuit waits before letting a trial request through
    pub sleep_window: Duration,
    /// Minimum requests in the rolling window before the circuit can trip
    pub request_volume_threshold: u32,
    /// Error percentage (0-100) at or above which the circuit trips
    pub error_percent_threshold: u32,
    /// Maximum guarded calls in flight at once
    pub max_concurrent_requests: u32,
    /// Length of the rolling health window
    pub rolling_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(5000),
            sleep_window: Duration::from_millis(5000),
            request_volume_threshold: 2,
            error_percent_threshold: 50,
            max_concurrent_requests: 10,
            rolling_window: Duration::from_secs(10),
        }
    }
}

impl CircuitBreakerConfig {
    /// Set the per-call timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the sleep window.
    #[must_use]
    pub const fn with_sleep_window(mut self, sleep_window: Duration) -> Self {
        self.sleep_window = sleep_window;
        self
    }

    /// Set the request volume threshold.
    #[must_use]
    pub const fn with_volume_threshold(mut self, threshold: u32) -> Self {
        self.request_volume_threshold = threshold;
        self
    }

    /// Set the error percentage threshold (clamped to 100).
    #[must_use]
    pub fn with_error_percent_threshold(mut self, percent: u32) -> Self {
        self.error_percent_threshold = percent.min(100);
        self
    }

    /// Set the concurrency limit.
    #[must_use]
    pub const fn with_max_concurrent_requests(mut self, max: u32) -> Self {
        self.max_concurrent_requests = max;
        self
    }

    /// Set the rolling window length.
    #[must_use]
    pub const fn with_rolling_window(mut self, window: Duration) -> Self {
        self.rolling_window = window;
        self
    }
}

/// Reason a guarded call did not produce a value.
#[derive(Error, Debug)]
pub enum BreakerError<E> {
    /// The circuit is open and the call was not attempted
    #[error("circuit open")]
    Open,

    /// Too many calls in flight; the call was not attempted
    #[error("max concurrency reached")]
    MaxConcurrency,

    /// The call did not finish within the breaker timeout
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// The call ran and failed
    #[error(transparent)]
    Inner(E),
}

impl<E> BreakerError<E> {
    /// Whether the call was rejected before running.
    #[must_use]
    pub const fn is_rejection(&self) -> bool {
        matches!(self, Self::Open | Self::MaxConcurrency)
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    started: Instant,
    successes: u32,
    failures: u32,
}

/// Success/failure counts over the rolling window.
#[derive(Debug)]
struct RollingWindow {
    length: Duration,
    bucket_width: Duration,
    buckets: VecDeque<Bucket>,
}

impl RollingWindow {
    fn new(length: Duration) -> Self {
        let bucket_width = (length / WINDOW_BUCKETS).max(Duration::from_millis(1));
        Self {
            length,
            bucket_width,
            buckets: VecDeque::with_capacity(WINDOW_BUCKETS as usize + 1),
        }
    }

    fn current(&mut self, now: Instant) -> &mut Bucket {
        while let Some(front) = self.buckets.front() {
            if now.duration_since(front.started) >= self.length {
                self.buckets.pop_front();
            } else {
                break;
            }
        }

        let needs_new = self
            .buckets
            .back()
            .is_none_or(|b| now.duration_since(b.started) >= self.bucket_width);
        if needs_new {
            self.buckets.push_back(Bucket {
                started: now,
                successes: 0,
                failures: 0,
            });
        }

        // a bucket was pushed above if none existed
        let last = self.buckets.len() - 1;
        &mut self.buckets[last]
    }

    fn record(&mut self, success: bool, now: Instant) {
        let bucket = self.current(now);
        if success {
            bucket.successes += 1;
        } else {
            bucket.failures += 1;
        }
    }

    /// Returns `(total requests, failed requests)` still inside the window.
    fn totals(&mut self, now: Instant) -> (u32, u32) {
        self.current(now);
        self.buckets.iter().fold((0, 0), |(total, failed), b| {
            (total + b.successes + b.failures, failed + b.failures)
        })
    }

    fn reset(&mut self) {
        self.buckets.clear();
    }
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    opened_at: Option<Instant>,
    window: RollingWindow,
}

/// Circuit breaker guarding one command.
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerState>,
    permits: Semaphore,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration.
    #[must_use]
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let permits = Semaphore::new(config.max_concurrent_requests.max(1) as usize);
        Self {
            name: name.into(),
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                opened_at: None,
                window: RollingWindow::new(config.rolling_window),
            }),
            permits,
            config,
        }
    }

    /// Create a circuit breaker with default configuration.
    #[must_use]
    pub fn with_defaults(name: impl Into<String>) -> Self {
        Self::new(name, CircuitBreakerConfig::default())
    }

    /// Name of the guarded command.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Configuration in effect.
    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Check if a request is allowed.
    ///
    /// An open circuit whose sleep window has elapsed moves to half-open and
    /// admits exactly one trial; everything else is rejected until that trial
    /// reports back. A trial that never reports (its caller was cancelled)
    /// is replaced by a new one after another sleep window.
    pub async fn allow_request(&self) -> bool {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        let slept = inner
            .opened_at
            .is_some_and(|at| now.duration_since(at) >= self.config.sleep_window);
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open | CircuitState::HalfOpen if slept => {
                if inner.state == CircuitState::HalfOpen {
                    warn!(command = %self.name, "trial request never reported, allowing another");
                } else {
                    debug!(command = %self.name, "circuit half-open, allowing trial request");
                }
                inner.state = CircuitState::HalfOpen;
                inner.opened_at = Some(now);
                true
            }
            CircuitState::Open | CircuitState::HalfOpen => false,
        }
    }

    /// Record a successful request.
    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.opened_at = None;
                inner.window.reset();
                debug!(command = %self.name, "circuit closed after successful trial");
            }
            CircuitState::Closed => inner.window.record(true, Instant::now()),
            CircuitState::Open => {}
        }
    }

    /// Record a failed request.
    ///
    /// A failed trial re-opens the circuit; in the closed state the circuit
    /// trips once the window holds enough requests with a high enough error
    /// percentage.
    pub async fn record_failure(&self) {
        let now = Instant::now();
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(now);
                warn!(command = %self.name, "trial request failed, circuit re-opened");
            }
            CircuitState::Closed => {
                inner.window.record(false, now);
                let (total, failed) = inner.window.totals(now);
                if self.should_trip(total, failed) {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(now);
                    warn!(
                        command = %self.name,
                        requests = total,
                        failures = failed,
                        "circuit opened"
                    );
                }
            }
            CircuitState::Open => {}
        }
    }

    fn should_trip(&self, total: u32, failed: u32) -> bool {
        if total == 0 || total < self.config.request_volume_threshold {
            return false;
        }
        u64::from(failed) * 100 >= u64::from(self.config.error_percent_threshold) * u64::from(total)
    }

    /// Run `operation` under the breaker.
    ///
    /// The operation is not started when the circuit is open or the
    /// concurrency limit is reached. Errors and timeouts count as failures;
    /// rejections do not touch the health window.
    ///
    /// # Errors
    ///
    /// Returns [`BreakerError`] describing the rejection, the timeout, or the
    /// operation's own error.
    pub async fn call<F, Fut, T, E>(&self, operation: F) -> Result<T, BreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let Ok(_permit) = self.permits.try_acquire() else {
            warn!(command = %self.name, "circuit max concurrency reached");
            return Err(BreakerError::MaxConcurrency);
        };

        if !self.allow_request().await {
            return Err(BreakerError::Open);
        }

        match tokio::time::timeout(self.config.timeout, operation()).await {
            Ok(Ok(value)) => {
                self.record_success().await;
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record_failure().await;
                Err(BreakerError::Inner(err))
            }
            Err(_) => {
                self.record_failure().await;
                Err(BreakerError::Timeout(self.config.timeout))
            }
        }
    }

    /// Get the current circuit state.
    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }

    /// Requests and failures currently inside the rolling window.
    pub async fn window_counts(&self) -> (u32, u32) {
        self.inner.lock().await.window.totals(Instant::now())
    }

    /// Reset the circuit breaker to closed state.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
        inner.window.reset();
    }
}

/// Circuit breakers keyed by command name, all sharing one configuration.
pub struct CircuitBreakerGroup {
    config: CircuitBreakerConfig,
    breakers: RwLock<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerGroup {
    /// Create an empty group.
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: RwLock::new(HashMap::new()),
        }
    }

    /// Shared configuration.
    #[must_use]
    pub const fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Get the breaker for `command`, creating it on first use.
    ///
    /// Breakers are never evicted, so `command` must come from a bounded set
    /// (a service and route template such as `orders./v1/orders/{id}`, not a
    /// concrete URL path).
    pub async fn get(&self, command: &str) -> Arc<CircuitBreaker> {
        if let Some(breaker) = self.breakers.read().await.get(command) {
            return Arc::clone(breaker);
        }

        let mut breakers = self.breakers.write().await;
        Arc::clone(
            breakers
                .entry(command.to_string())
                .or_insert_with(|| Arc::new(CircuitBreaker::new(command, self.config.clone()))),
        )
    }

    /// Number of commands seen so far.
    pub async fn len(&self) -> usize {
        self.breakers.read().await.len()
    }

    /// Whether no command has been seen yet.
    pub async fn is_empty(&self) -> bool {
        self.breakers.read().await.is_empty()
    }
}
