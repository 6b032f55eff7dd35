//! # Circuit Breaker Implementation
//!
//! Ratio-based circuit breaker with three states: Closed (normal operation),
//! Open (failing fast) and Half-Open (testing recovery).
//!
//! While closed, request and failure counts accumulate in a window that is
//! discarded every `rolling_window`. Once the window holds at least
//! `min_requests` and the failure ratio reaches `failure_ratio`, the circuit
//! opens. After `timeout` it admits up to `half_open_max_calls` trial calls;
//! that many successes close it again and any trial failure reopens it.
//!
//! Every transition is logged and published on a broadcast channel
//! (see [`CircuitBreaker::subscribe`]).
//!
//! Outcomes are tagged with the window generation they started in, so a
//! slow call that completes after a transition cannot corrupt the counts of
//! the new window. A call whose future is dropped before it completes is
//! recorded as a failure.

use crate::resilience::{CircuitBreakerConfig, CircuitBreakerMetrics};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

const TRANSITION_CHANNEL_CAPACITY: usize = 64;

/// Lifetime counters, kept outside the window lock
#[derive(Debug)]
struct AtomicCircuitBreakerMetrics {
    total_calls: AtomicU64,
    success_count: AtomicU64,
    failure_count: AtomicU64,
    rejected_count: AtomicU64,
    total_duration_nanos: AtomicU64,
}

impl AtomicCircuitBreakerMetrics {
    fn new() -> Self {
        Self {
            total_calls: AtomicU64::new(0),
            success_count: AtomicU64::new(0),
            failure_count: AtomicU64::new(0),
            rejected_count: AtomicU64::new(0),
            total_duration_nanos: AtomicU64::new(0),
        }
    }

    #[inline]
    fn record(&self, success: bool, duration: Duration) {
        self.total_calls.fetch_add(1, Ordering::Relaxed);
        if success {
            self.success_count.fetch_add(1, Ordering::Relaxed);
        } else {
            self.failure_count.fetch_add(1, Ordering::Relaxed);
        }
        self.total_duration_nanos
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
    }

    #[inline]
    fn record_rejection(&self) {
        self.rejected_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Circuit breaker states representing the current operational mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    /// Normal operation - all calls are allowed through
    Closed = 0,
    /// Failure mode - all calls fail fast without executing
    Open = 1,
    /// Testing recovery - limited calls allowed to test system health
    HalfOpen = 2,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// A state change, published to every [`CircuitBreaker::subscribe`] receiver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateTransition {
    pub component: String,
    pub from: CircuitState,
    pub to: CircuitState,
    pub at: DateTime<Utc>,
}

/// Errors that can occur during circuit breaker operation
#[derive(Debug, thiserror::Error)]
pub enum CircuitBreakerError<E> {
    /// Circuit is open, rejecting all calls
    #[error("Circuit breaker is open for {component}")]
    CircuitOpen { component: String },

    /// Circuit is half-open and every trial slot is taken
    #[error("Circuit breaker for {component} is half-open and has no trial slots left")]
    TooManyTrialCalls { component: String },

    /// Operation failed and was recorded
    #[error("Operation failed: {0}")]
    OperationFailed(E),
}

impl<E> CircuitBreakerError<E> {
    /// True when the operation was never attempted
    pub fn is_rejection(&self) -> bool {
        !matches!(self, CircuitBreakerError::OperationFailed(_))
    }
}

#[derive(Debug, Clone, Copy)]
enum Rejection {
    Open,
    Saturated,
}

#[derive(Debug, Clone, Default)]
struct WindowCounts {
    requests: u32,
    failures: u32,
    consecutive_successes: u32,
    consecutive_failures: u32,
}

#[derive(Debug)]
struct Window {
    state: CircuitState,
    generation: u64,
    counts: WindowCounts,
    expiry: Option<Instant>,
}

/// Ratio-based circuit breaker
#[derive(Debug)]
pub struct CircuitBreaker {
    /// Component name for logging and events
    name: String,

    config: CircuitBreakerConfig,

    /// State plus the counts of the current generation
    window: Mutex<Window>,

    metrics: AtomicCircuitBreakerMetrics,

    transitions: broadcast::Sender<StateTransition>,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given name and configuration
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let name = name.into();
        info!(
            component = %name,
            min_requests = config.min_requests,
            failure_ratio = config.failure_ratio,
            rolling_window_seconds = config.rolling_window.as_secs(),
            timeout_seconds = config.timeout.as_secs(),
            half_open_max_calls = config.half_open_max_calls,
            "Circuit breaker initialized"
        );

        let (transitions, _) = broadcast::channel(TRANSITION_CHANNEL_CAPACITY);
        let window = Window {
            state: CircuitState::Closed,
            generation: 0,
            counts: WindowCounts::default(),
            expiry: Some(Instant::now() + config.rolling_window),
        };

        Self {
            name,
            config,
            window: Mutex::new(window),
            metrics: AtomicCircuitBreakerMetrics::new(),
            transitions,
        }
    }

    /// Get current circuit state, applying any time-based transition first
    pub fn state(&self) -> CircuitState {
        let mut window = self.window.lock();
        self.current_state(&mut window, Instant::now()).0
    }

    /// Execute an operation with circuit breaker protection
    pub async fn call<F, T, E, Fut>(&self, operation: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let generation = match self.before_request() {
            Ok(generation) => generation,
            Err(rejection) => {
                self.metrics.record_rejection();
                debug!(component = %self.name, ?rejection, "Call short-circuited");
                return Err(match rejection {
                    Rejection::Open => CircuitBreakerError::CircuitOpen {
                        component: self.name.clone(),
                    },
                    Rejection::Saturated => CircuitBreakerError::TooManyTrialCalls {
                        component: self.name.clone(),
                    },
                });
            }
        };

        let in_flight = InFlightCall::new(self, generation);
        let result = operation().await;
        in_flight.finish(result.is_ok());

        result.map_err(CircuitBreakerError::OperationFailed)
    }

    /// Receive every future state transition
    pub fn subscribe(&self) -> broadcast::Receiver<StateTransition> {
        self.transitions.subscribe()
    }

    /// Force circuit to open state (for emergency situations)
    pub fn force_open(&self) {
        warn!(component = %self.name, "Circuit breaker forced open");
        let mut window = self.window.lock();
        self.set_state(&mut window, CircuitState::Open, Instant::now());
    }

    /// Force circuit to closed state (for emergency recovery)
    pub fn force_closed(&self) {
        warn!(component = %self.name, "Circuit breaker forced closed");
        let mut window = self.window.lock();
        self.set_state(&mut window, CircuitState::Closed, Instant::now());
    }

    /// Get current metrics snapshot
    pub fn metrics(&self) -> CircuitBreakerMetrics {
        let (state, counts) = {
            let mut window = self.window.lock();
            let (state, _) = self.current_state(&mut window, Instant::now());
            (state, window.counts.clone())
        };

        let total_calls = self.metrics.total_calls.load(Ordering::Relaxed);
        let success_count = self.metrics.success_count.load(Ordering::Relaxed);
        let failure_count = self.metrics.failure_count.load(Ordering::Relaxed);
        let total_duration_nanos = self.metrics.total_duration_nanos.load(Ordering::Relaxed);

        let (failure_rate, success_rate, average_duration) = if total_calls > 0 {
            (
                failure_count as f64 / total_calls as f64,
                success_count as f64 / total_calls as f64,
                Duration::from_nanos(total_duration_nanos / total_calls),
            )
        } else {
            (0.0, 0.0, Duration::ZERO)
        };

        CircuitBreakerMetrics {
            total_calls,
            success_count,
            failure_count,
            rejected_count: self.metrics.rejected_count.load(Ordering::Relaxed),
            window_requests: counts.requests,
            window_failures: counts.failures,
            consecutive_failures: counts.consecutive_failures,
            total_duration: Duration::from_nanos(total_duration_nanos),
            current_state: state,
            failure_rate,
            success_rate,
            average_duration,
        }
    }

    /// Get component name
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Check if circuit is healthy (closed state with low failure rate)
    pub fn is_healthy(&self) -> bool {
        if self.state() != CircuitState::Closed {
            return false;
        }

        let total_calls = self.metrics.total_calls.load(Ordering::Relaxed);
        if total_calls < 10 {
            // Too few calls to determine health
            return true;
        }

        let failure_count = self.metrics.failure_count.load(Ordering::Relaxed);
        (failure_count as f64 / total_calls as f64) < 0.1
    }

    fn before_request(&self) -> Result<u64, Rejection> {
        let mut window = self.window.lock();
        let (state, generation) = self.current_state(&mut window, Instant::now());

        match state {
            CircuitState::Open => Err(Rejection::Open),
            CircuitState::HalfOpen if window.counts.requests >= self.config.half_open_max_calls => {
                Err(Rejection::Saturated)
            }
            _ => {
                window.counts.requests += 1;
                Ok(generation)
            }
        }
    }

    fn record_outcome(&self, started_in: u64, success: bool, duration: Duration) {
        self.metrics.record(success, duration);
        self.after_request(started_in, success);

        if !success {
            debug!(
                component = %self.name,
                duration_ms = duration.as_millis(),
                "Protected operation failed"
            );
        }
    }

    fn after_request(&self, started_in: u64, success: bool) {
        let mut window = self.window.lock();
        let now = Instant::now();
        let (state, generation) = self.current_state(&mut window, now);

        // Outcome belongs to a window that no longer exists
        if generation != started_in {
            return;
        }

        let counts = &mut window.counts;
        if success {
            counts.consecutive_successes += 1;
            counts.consecutive_failures = 0;
        } else {
            counts.failures += 1;
            counts.consecutive_failures += 1;
            counts.consecutive_successes = 0;
        }

        match state {
            CircuitState::Closed => {
                if self.ready_to_trip(&window.counts) {
                    self.set_state(&mut window, CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => {
                if !success {
                    self.set_state(&mut window, CircuitState::Open, now);
                } else if window.counts.consecutive_successes >= self.config.half_open_max_calls {
                    self.set_state(&mut window, CircuitState::Closed, now);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn ready_to_trip(&self, counts: &WindowCounts) -> bool {
        counts.requests >= self.config.min_requests
            && counts.failures as f64 / counts.requests as f64 >= self.config.failure_ratio
    }

    fn current_state(&self, window: &mut Window, now: Instant) -> (CircuitState, u64) {
        match window.state {
            CircuitState::Closed => {
                if window.expiry.is_some_and(|expiry| expiry <= now) {
                    self.new_generation(window, now);
                }
            }
            CircuitState::Open => {
                if window.expiry.is_some_and(|expiry| expiry <= now) {
                    self.set_state(window, CircuitState::HalfOpen, now);
                }
            }
            CircuitState::HalfOpen => {}
        }
        (window.state, window.generation)
    }

    fn new_generation(&self, window: &mut Window, now: Instant) {
        window.generation += 1;
        window.counts = WindowCounts::default();
        window.expiry = match window.state {
            CircuitState::Closed => Some(now + self.config.rolling_window),
            CircuitState::Open => Some(now + self.config.timeout),
            CircuitState::HalfOpen => None,
        };
    }

    fn set_state(&self, window: &mut Window, to: CircuitState, now: Instant) {
        let from = window.state;
        if from == to {
            return;
        }

        let failures = window.counts.failures;
        let requests = window.counts.requests;

        window.state = to;
        self.new_generation(window, now);

        match to {
            CircuitState::Open => warn!(
                component = %self.name,
                from = %from,
                window_requests = requests,
                window_failures = failures,
                timeout_seconds = self.config.timeout.as_secs(),
                "Circuit breaker opened (failing fast)"
            ),
            CircuitState::HalfOpen => info!(
                component = %self.name,
                half_open_max_calls = self.config.half_open_max_calls,
                "Circuit breaker half-open (testing recovery)"
            ),
            CircuitState::Closed => info!(
                component = %self.name,
                from = %from,
                "Circuit breaker closed (recovered)"
            ),
        }

        // No receivers is fine
        let _ = self.transitions.send(StateTransition {
            component: self.name.clone(),
            from,
            to,
            at: Utc::now(),
        });
    }
}

/// An admitted call whose outcome has not been recorded yet.
///
/// Dropping it unfinished (the caller's future was cancelled mid-call)
/// records a failure, so a half-open trial slot is always released.
struct InFlightCall<'a> {
    breaker: &'a CircuitBreaker,
    generation: u64,
    started: Instant,
    finished: bool,
}

impl<'a> InFlightCall<'a> {
    fn new(breaker: &'a CircuitBreaker, generation: u64) -> Self {
        Self {
            breaker,
            generation,
            started: Instant::now(),
            finished: false,
        }
    }

    fn finish(mut self, success: bool) {
        self.finished = true;
        self.breaker
            .record_outcome(self.generation, success, self.started.elapsed());
    }
}

impl Drop for InFlightCall<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        debug!(component = %self.breaker.name, "Protected operation cancelled");
        self.breaker
            .record_outcome(self.generation, false, self.started.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;
    use tokio::time::sleep;

    fn config(min_requests: u32, timeout_ms: u64, half_open_max_calls: u32) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            min_requests,
            failure_ratio: 0.6,
            rolling_window: Duration::from_secs(60),
            timeout: Duration::from_millis(timeout_ms),
            half_open_max_calls,
        }
    }

    async fn fail(circuit: &CircuitBreaker) {
        let _ = circuit.call(|| async { Err::<(), _>("error") }).await;
    }

    async fn succeed(circuit: &CircuitBreaker) {
        let _ = circuit.call(|| async { Ok::<_, String>(()) }).await;
    }

    #[tokio::test]
    async fn test_circuit_breaker_normal_operation() {
        let circuit = CircuitBreaker::new("test", config(5, 100, 1));
        assert_eq!(circuit.state(), CircuitState::Closed);

        let result = circuit.call(|| async { Ok::<_, String>("success") }).await;
        assert_eq!(result.unwrap(), "success");

        let metrics = circuit.metrics();
        assert_eq!(metrics.total_calls, 1);
        assert_eq!(metrics.success_count, 1);
        assert_eq!(metrics.window_requests, 1);
    }

    #[tokio::test]
    async fn test_opens_at_failure_ratio_over_minimum_sample() {
        let circuit = CircuitBreaker::new("test", config(5, 10_000, 1));

        succeed(&circuit).await;
        succeed(&circuit).await;
        fail(&circuit).await;
        fail(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Closed);

        // Fifth request, 3/5 = 60%
        fail(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Open);

        let executed = AtomicBool::new(false);
        let result = circuit
            .call(|| async {
                executed.store(true, Ordering::SeqCst);
                Ok::<_, String>(())
            })
            .await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
        assert!(!executed.load(Ordering::SeqCst));
        assert_eq!(circuit.metrics().rejected_count, 1);
    }

    #[tokio::test]
    async fn test_stays_closed_below_minimum_requests() {
        let circuit = CircuitBreaker::new("test", config(5, 10_000, 1));
        for _ in 0..4 {
            fail(&circuit).await;
        }
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_stays_closed_below_failure_ratio() {
        let circuit = CircuitBreaker::new("test", config(5, 10_000, 1));
        fail(&circuit).await;
        fail(&circuit).await;
        for _ in 0..4 {
            succeed(&circuit).await;
        }
        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(circuit.metrics().window_failures, 2);
    }

    #[tokio::test]
    async fn test_rolling_window_discards_old_counts() {
        let mut cfg = config(5, 10_000, 1);
        cfg.rolling_window = Duration::from_millis(50);
        let circuit = CircuitBreaker::new("test", cfg);

        for _ in 0..4 {
            fail(&circuit).await;
        }
        sleep(Duration::from_millis(80)).await;
        fail(&circuit).await;

        assert_eq!(circuit.state(), CircuitState::Closed);
        assert_eq!(circuit.metrics().window_requests, 1);
    }

    #[tokio::test]
    async fn test_half_open_success_closes() {
        let circuit = CircuitBreaker::new("test", config(1, 50, 2));
        fail(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Open);

        sleep(Duration::from_millis(80)).await;
        assert_eq!(circuit.state(), CircuitState::HalfOpen);

        succeed(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
        succeed(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_half_open_failure_reopens() {
        let circuit = CircuitBreaker::new("test", config(1, 50, 3));
        fail(&circuit).await;
        sleep(Duration::from_millis(80)).await;
        assert_eq!(circuit.state(), CircuitState::HalfOpen);

        fail(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_half_open_limits_trial_calls() {
        let circuit = Arc::new(CircuitBreaker::new("test", config(1, 20, 1)));
        fail(&circuit).await;
        sleep(Duration::from_millis(40)).await;

        let (started_tx, started_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();

        let trial = {
            let circuit = Arc::clone(&circuit);
            tokio::spawn(async move {
                circuit
                    .call(|| async move {
                        let _ = started_tx.send(());
                        let _ = release_rx.await;
                        Ok::<_, String>(())
                    })
                    .await
            })
        };

        started_rx.await.unwrap();
        let second = circuit.call(|| async { Ok::<_, String>(()) }).await;
        assert!(matches!(
            second,
            Err(CircuitBreakerError::TooManyTrialCalls { .. })
        ));
        assert!(second.unwrap_err().is_rejection());

        release_tx.send(()).unwrap();
        assert!(trial.await.unwrap().is_ok());
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_cancelled_trial_releases_half_open_slot() {
        let circuit = CircuitBreaker::new("test", config(1, 20, 1));
        fail(&circuit).await;
        sleep(Duration::from_millis(40)).await;
        assert_eq!(circuit.state(), CircuitState::HalfOpen);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(10),
            circuit.call(|| async {
                sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(())
            }),
        )
        .await;
        assert!(cancelled.is_err());

        // The abandoned trial counts as a failed one
        assert_eq!(circuit.state(), CircuitState::Open);
        assert_eq!(circuit.metrics().failure_count, 2);

        sleep(Duration::from_millis(40)).await;
        assert_eq!(circuit.state(), CircuitState::HalfOpen);
        succeed(&circuit).await;
        assert_eq!(circuit.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_cancelled_call_counts_toward_trip_while_closed() {
        let circuit = CircuitBreaker::new("test", config(1, 10_000, 1));
        let _ = tokio::time::timeout(
            Duration::from_millis(10),
            circuit.call(|| async {
                sleep(Duration::from_secs(10)).await;
                Ok::<_, String>(())
            }),
        )
        .await;
        assert_eq!(circuit.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn test_transitions_are_published() {
        let circuit = CircuitBreaker::new("scoring", config(1, 50, 1));
        let mut events = circuit.subscribe();

        fail(&circuit).await;
        let opened = events.recv().await.unwrap();
        assert_eq!(opened.component, "scoring");
        assert_eq!(opened.from, CircuitState::Closed);
        assert_eq!(opened.to, CircuitState::Open);

        circuit.force_closed();
        let closed = events.recv().await.unwrap();
        assert_eq!(closed.from, CircuitState::Open);
        assert_eq!(closed.to, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_force_open_rejects() {
        let circuit = CircuitBreaker::new("test", config(5, 10_000, 1));
        circuit.force_open();
        let result = circuit.call(|| async { Ok::<_, String>(()) }).await;
        assert!(matches!(result, Err(CircuitBreakerError::CircuitOpen { .. })));
        assert!(!circuit.is_healthy());
    }
}
