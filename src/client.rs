/*!
 * Resilient request client.
 *
 * Makes one logical request ("translate this payload") reliable against an
 * external, stateful, non-transactional translation operation. The service
 * exposes no completion event, only a pollable output surface, so a request
 * runs as: cooldown, submit, poll until the sampled output stabilizes,
 * retry with a full session reset on failure.
 *
 * State machine per request:
 * `IDLE -> COOLDOWN? -> SUBMIT -> POLL -> {STABLE | TIMEOUT | ERROR} -> (RETRY -> SUBMIT | FAIL)`
 */

use log::{debug, error, info, warn};
use rand::Rng;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::app_config::ClientConfig;
use crate::errors::{RequestError, SessionError};
use crate::session::TranslationSession;

/// Cancellation is cooperative: every blocking wait polls the flag at this
/// granularity
const CANCEL_TICK: Duration = Duration::from_millis(100);

/// Polled boolean cancellation signal shared between the caller and every
/// suspension point in the pipeline
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create a fresh, uncancelled token
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; observed within one poll tick
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Outcome of one logical translation request.
///
/// Every failure mode is represented here; nothing escapes the client as a
/// panic or a raw error.
#[derive(Debug, Clone)]
pub enum RequestOutcome {
    /// The service produced a stabilized (or best-known) translation
    Success(String),
    /// The caller's cancellation signal was observed
    Cancelled,
    /// The service reported its usage quota exhausted; terminal for the run
    QuotaExceeded,
    /// All recovery options were exhausted
    Failed(RequestError),
}

/// Result of one poll-until-stable pass
enum PollResult {
    /// Output held constant for the required number of cycles
    Stable(String),
    /// Wait budget exhausted; carries the best-known output if any
    BudgetExhausted(Option<String>),
    Cancelled,
    Quota,
}

/// Reliable single-flight client over a shared translation session
pub struct ResilientClient {
    session: Arc<dyn TranslationSession>,
    config: ClientConfig,
    /// Serializes logical requests: the session is a single shared mutable
    /// resource and concurrent submissions would corrupt each other's
    /// payload and output
    flight: tokio::sync::Mutex<()>,
    last_submit: parking_lot::Mutex<Option<Instant>>,
}

impl ResilientClient {
    /// Create a client over the given session with the given timing knobs
    pub fn new(session: Arc<dyn TranslationSession>, config: ClientConfig) -> Self {
        Self {
            session,
            config,
            flight: tokio::sync::Mutex::new(()),
            last_submit: parking_lot::Mutex::new(None),
        }
    }

    /// Access the underlying session
    pub fn session(&self) -> &Arc<dyn TranslationSession> {
        &self.session
    }

    /// Drive one payload through the service until it yields a stable
    /// translation, retrying with session resets on failure.
    pub async fn translate(&self, payload: &str, cancel: &CancelToken) -> RequestOutcome {
        if payload.trim().is_empty() {
            return RequestOutcome::Success(String::new());
        }

        let payload = clip_chars(payload, self.config.max_input_chars);
        let payload_chars = payload.chars().count();

        // At most one logical request in flight per session
        let _flight = self.flight.lock().await;

        let mut last_error = String::from("no attempt made");

        for attempt in 1..=self.config.retry_attempts {
            if cancel.is_cancelled() {
                info!("Stop signal detected before attempt {}, halting request", attempt);
                return RequestOutcome::Cancelled;
            }

            info!(
                "Translating payload ({} chars), attempt {}/{}",
                payload_chars, attempt, self.config.retry_attempts
            );

            match self.ensure_authenticated(cancel).await {
                AuthResult::Ok => {}
                AuthResult::Cancelled => return RequestOutcome::Cancelled,
                AuthResult::Timeout => {
                    error!(
                        "Authentication not detected within {}s",
                        self.config.auth_timeout_secs
                    );
                    return RequestOutcome::Failed(RequestError::AuthenticationTimeout(
                        self.config.auth_timeout_secs,
                    ));
                }
                AuthResult::Quota => return RequestOutcome::QuotaExceeded,
                AuthResult::Error(message) => {
                    last_error = message;
                    if self.backoff_and_reset(attempt, cancel).await {
                        return RequestOutcome::Cancelled;
                    }
                    continue;
                }
            }

            if self.cooldown(cancel).await {
                info!("Stop signal detected during cooldown, halting request");
                return RequestOutcome::Cancelled;
            }

            match self.session.submit(&payload).await {
                Ok(()) => {
                    *self.last_submit.lock() = Some(Instant::now());
                }
                Err(SessionError::QuotaExceeded(message)) => {
                    error!("Usage quota exhausted on submit: {}", message);
                    return RequestOutcome::QuotaExceeded;
                }
                Err(e) => {
                    log_session_error("submit", &e);
                    last_error = e.to_string();
                    if self.backoff_and_reset(attempt, cancel).await {
                        return RequestOutcome::Cancelled;
                    }
                    continue;
                }
            }

            match self.poll_until_stable(payload_chars, cancel).await {
                PollResult::Stable(text) => {
                    return RequestOutcome::Success(text);
                }
                PollResult::BudgetExhausted(Some(text)) => {
                    warn!("Returning best-known output after wait budget exhaustion");
                    return RequestOutcome::Success(text);
                }
                PollResult::BudgetExhausted(None) => {
                    last_error = "wait budget exhausted with no output observed".to_string();
                    warn!("Attempt {} produced no output", attempt);
                }
                PollResult::Cancelled => return RequestOutcome::Cancelled,
                PollResult::Quota => return RequestOutcome::QuotaExceeded,
            }

            if self.backoff_and_reset(attempt, cancel).await {
                return RequestOutcome::Cancelled;
            }
        }

        error!("All {} attempts failed: {}", self.config.retry_attempts, last_error);
        RequestOutcome::Failed(RequestError::Exhausted(last_error))
    }

    /// Repeatedly sample the session output until it is non-empty and
    /// identical for the required number of consecutive cycles, within an
    /// overall budget that grows with the input length.
    async fn poll_until_stable(&self, input_chars: usize, cancel: &CancelToken) -> PollResult {
        let budget = Duration::from_secs(
            self.config.base_timeout_secs + (input_chars as u64 / 80),
        );
        let deadline = Instant::now() + budget;

        info!("Waiting for translation to stabilize (budget {:?})", budget);

        let mut last_text = String::new();
        let mut stable_cycles = 0usize;

        while Instant::now() < deadline {
            if cancel.is_cancelled() {
                warn!("Stop signal detected while waiting for translation output");
                return PollResult::Cancelled;
            }

            match self.session.sample_output().await {
                Ok(sample) => {
                    let current = sample.trim().to_string();

                    if !current.is_empty() && current == last_text {
                        stable_cycles += 1;
                    } else if !current.is_empty() {
                        last_text = current;
                        stable_cycles = 1;
                    } else {
                        stable_cycles = 0;
                    }
                    debug!(
                        "Sampled {} chars, stable cycles {}/{}",
                        last_text.chars().count(),
                        stable_cycles,
                        self.config.required_stable_cycles
                    );

                    if stable_cycles >= self.config.required_stable_cycles {
                        info!("Translation stabilized");
                        return PollResult::Stable(last_text);
                    }

                    let delay = jitter(
                        self.config.poll_interval_min_secs,
                        self.config.poll_interval_max_secs,
                    );
                    if self.wait_cancellable(delay, cancel).await {
                        return PollResult::Cancelled;
                    }
                }
                Err(SessionError::QuotaExceeded(message)) => {
                    error!("Usage quota exhausted while polling: {}", message);
                    return PollResult::Quota;
                }
                Err(e) => {
                    log_session_error("poll", &e);
                    stable_cycles = 0;
                    // Give a disturbed surface a moment to settle
                    let delay = jitter(1.5, 2.0);
                    if self.wait_cancellable(delay, cancel).await {
                        return PollResult::Cancelled;
                    }
                }
            }
        }

        warn!("Wait budget of {:?} exhausted before stabilization", budget);
        if last_text.is_empty() {
            PollResult::BudgetExhausted(None)
        } else {
            PollResult::BudgetExhausted(Some(last_text))
        }
    }

    /// Enforce the minimum interval since the last submission. Returns true
    /// if cancelled while waiting.
    async fn cooldown(&self, cancel: &CancelToken) -> bool {
        let cooldown = Duration::from_secs_f64(self.config.cooldown_secs);
        let remaining = {
            let last = self.last_submit.lock();
            match *last {
                Some(at) => cooldown.checked_sub(at.elapsed()),
                None => None,
            }
        };
        match remaining {
            Some(wait) if !wait.is_zero() => {
                debug!("Cooling down for {:?} before next submission", wait);
                self.wait_cancellable(wait, cancel).await
            }
            _ => cancel.is_cancelled(),
        }
    }

    /// Wait out the inter-attempt backoff, then force a full session reset
    /// so the next attempt re-establishes authentication. Returns true if
    /// cancelled.
    async fn backoff_and_reset(&self, attempt: usize, cancel: &CancelToken) -> bool {
        if attempt >= self.config.retry_attempts {
            return cancel.is_cancelled();
        }

        let delay = jitter(self.config.backoff_min_secs, self.config.backoff_max_secs);
        info!("Retrying after {:?} with a session reset", delay);
        if self.wait_cancellable(delay, cancel).await {
            return true;
        }
        if let Err(e) = self.session.reset().await {
            warn!("Session reset failed: {}", e);
        }
        cancel.is_cancelled()
    }

    async fn ensure_authenticated(&self, cancel: &CancelToken) -> AuthResult {
        if self.session.is_authenticated().await {
            return AuthResult::Ok;
        }

        info!(
            "Session not authenticated, waiting up to {}s for login",
            self.config.auth_timeout_secs
        );
        let timeout = Duration::from_secs(self.config.auth_timeout_secs);

        tokio::select! {
            result = self.session.await_authentication(timeout) => match result {
                Ok(true) => {
                    info!("Authentication detected");
                    AuthResult::Ok
                }
                Ok(false) => AuthResult::Timeout,
                Err(SessionError::QuotaExceeded(message)) => {
                    error!("Usage quota exhausted during authentication: {}", message);
                    AuthResult::Quota
                }
                Err(e) => {
                    log_session_error("authentication", &e);
                    AuthResult::Error(e.to_string())
                }
            },
            _ = watch_cancel(cancel) => {
                warn!("Stop signal detected while waiting for authentication");
                AuthResult::Cancelled
            }
        }
    }

    /// Sleep for `duration` in cancellation-checked ticks. Returns true if
    /// cancelled.
    async fn wait_cancellable(&self, duration: Duration, cancel: &CancelToken) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if cancel.is_cancelled() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let remaining = deadline - now;
            tokio::time::sleep(remaining.min(CANCEL_TICK)).await;
        }
    }
}

enum AuthResult {
    Ok,
    Cancelled,
    Timeout,
    Quota,
    Error(String),
}

async fn watch_cancel(cancel: &CancelToken) {
    loop {
        if cancel.is_cancelled() {
            return;
        }
        tokio::time::sleep(CANCEL_TICK).await;
    }
}

/// Structural drift retries like a transient fault but is logged distinctly
fn log_session_error(stage: &str, error: &SessionError) {
    match error {
        SessionError::Structural(message) => {
            warn!("Session surface drift during {}: {}", stage, message);
        }
        _ => {
            warn!("Session error during {}: {}", stage, error);
        }
    }
}

fn jitter(min_secs: f64, max_secs: f64) -> Duration {
    let secs = if max_secs > min_secs {
        rand::rng().random_range(min_secs..max_secs)
    } else {
        min_secs
    };
    Duration::from_secs_f64(secs)
}

fn clip_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_pos, _)) => {
            warn!("Payload exceeds {} chars, clipping", max_chars);
            text[..byte_pos].to_string()
        }
        None => text.to_string(),
    }
}
