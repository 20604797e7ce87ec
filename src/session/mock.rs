/*!
 * Mock session implementations for testing and dry runs.
 *
 * Behaviors:
 * - `MockSession::echo()` - renders the submitted payload back unchanged
 * - `MockSession::scripted(samples)` - serves a fixed sequence of output samples
 * - `MockSession::quota_after(n)` - reports quota exhaustion after n submissions
 * - `MockSession::flaky(n)` - fails the first n submissions, then echoes
 * - `MockSession::unauthenticated()` - never authenticates
 * - `MockSession::silent()` - accepts payloads but never renders output
 */

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::errors::SessionError;
use crate::session::TranslationSession;

/// Behavior mode for the mock session
#[derive(Debug, Clone)]
pub enum MockBehavior {
    /// Render the submitted payload back as its own translation
    Echo,
    /// Serve a fixed sequence of samples; the last one repeats forever
    Scripted {
        /// Output returned by successive `sample_output` calls
        samples: Vec<String>,
    },
    /// Report quota exhaustion on the nth submission (1-based)
    QuotaAfter {
        /// Submissions accepted before the quota error
        accepted: usize,
    },
    /// Fail the first n submissions with a transient error, then echo
    Flaky {
        /// Number of leading submissions that fail
        failures: usize,
    },
    /// Never authenticate
    Unauthenticated,
    /// Accept payloads but always sample an empty output
    Silent,
}

/// Scripted in-process session for tests and dry runs
#[derive(Debug)]
pub struct MockSession {
    behavior: MockBehavior,
    payload: Mutex<String>,
    submit_count: AtomicUsize,
    sample_count: AtomicUsize,
    reset_count: AtomicUsize,
    authenticated: Mutex<bool>,
    /// Optional payload-to-output transform applied in echo mode
    responder: Option<fn(&str) -> String>,
}

impl MockSession {
    /// Create a mock session with the given behavior
    pub fn new(behavior: MockBehavior) -> Arc<Self> {
        Arc::new(Self::build(behavior, None))
    }

    fn build(behavior: MockBehavior, responder: Option<fn(&str) -> String>) -> Self {
        let authenticated = !matches!(behavior, MockBehavior::Unauthenticated);
        Self {
            behavior,
            payload: Mutex::new(String::new()),
            submit_count: AtomicUsize::new(0),
            sample_count: AtomicUsize::new(0),
            reset_count: AtomicUsize::new(0),
            authenticated: Mutex::new(authenticated),
            responder,
        }
    }

    /// Session that renders the payload back unchanged
    pub fn echo() -> Arc<Self> {
        Self::new(MockBehavior::Echo)
    }

    /// Session that translates payloads through a fixed transform
    pub fn with_responder(responder: fn(&str) -> String) -> Arc<Self> {
        Arc::new(Self::build(MockBehavior::Echo, Some(responder)))
    }

    /// Session that serves a fixed sample sequence
    pub fn scripted(samples: Vec<String>) -> Arc<Self> {
        Self::new(MockBehavior::Scripted { samples })
    }

    /// Session that hits its usage quota after `accepted` submissions
    pub fn quota_after(accepted: usize) -> Arc<Self> {
        Self::new(MockBehavior::QuotaAfter { accepted })
    }

    /// Session whose first `failures` submissions fail transiently
    pub fn flaky(failures: usize) -> Arc<Self> {
        Self::new(MockBehavior::Flaky { failures })
    }

    /// Session that never authenticates
    pub fn unauthenticated() -> Arc<Self> {
        Self::new(MockBehavior::Unauthenticated)
    }

    /// Session that never renders any output
    pub fn silent() -> Arc<Self> {
        Self::new(MockBehavior::Silent)
    }

    /// Number of accepted or rejected submissions so far
    pub fn submissions(&self) -> usize {
        self.submit_count.load(Ordering::SeqCst)
    }

    /// Number of output samples served so far
    pub fn samples_taken(&self) -> usize {
        self.sample_count.load(Ordering::SeqCst)
    }

    /// Number of resets so far
    pub fn resets(&self) -> usize {
        self.reset_count.load(Ordering::SeqCst)
    }

    fn render(&self, payload: &str) -> String {
        match self.responder {
            Some(f) => f(payload),
            None => payload.to_string(),
        }
    }
}

#[async_trait]
impl TranslationSession for MockSession {
    async fn is_authenticated(&self) -> bool {
        *self.authenticated.lock()
    }

    async fn await_authentication(&self, timeout: Duration) -> Result<bool, SessionError> {
        if *self.authenticated.lock() {
            return Ok(true);
        }
        match self.behavior {
            MockBehavior::Unauthenticated => {
                tokio::time::sleep(timeout).await;
                Ok(false)
            }
            _ => {
                *self.authenticated.lock() = true;
                Ok(true)
            }
        }
    }

    async fn submit(&self, payload: &str) -> Result<(), SessionError> {
        let count = self.submit_count.fetch_add(1, Ordering::SeqCst) + 1;

        if !*self.authenticated.lock() {
            return Err(SessionError::NotAuthenticated(
                "submit without authentication".to_string(),
            ));
        }

        match &self.behavior {
            MockBehavior::QuotaAfter { accepted } if count > *accepted => {
                Err(SessionError::QuotaExceeded(format!(
                    "usage limit reached after {} submissions",
                    accepted
                )))
            }
            MockBehavior::Flaky { failures } if count <= *failures => Err(
                SessionError::Transient(format!("simulated submit failure {}", count)),
            ),
            _ => {
                // Contract: clear any prior payload before writing the new one
                let mut stored = self.payload.lock();
                stored.clear();
                stored.push_str(payload);
                Ok(())
            }
        }
    }

    async fn sample_output(&self) -> Result<String, SessionError> {
        let index = self.sample_count.fetch_add(1, Ordering::SeqCst);

        match &self.behavior {
            MockBehavior::Scripted { samples } => {
                if samples.is_empty() {
                    return Ok(String::new());
                }
                let sample = samples.get(index).unwrap_or_else(|| {
                    samples.last().expect("non-empty samples")
                });
                Ok(sample.clone())
            }
            MockBehavior::Silent => Ok(String::new()),
            _ => {
                let payload = self.payload.lock().clone();
                if payload.is_empty() {
                    Ok(String::new())
                } else {
                    Ok(self.render(&payload))
                }
            }
        }
    }

    async fn reset(&self) -> Result<(), SessionError> {
        self.reset_count.fetch_add(1, Ordering::SeqCst);
        self.payload.lock().clear();
        // Contract: a reset invalidates the authenticated state
        *self.authenticated.lock() = false;
        Ok(())
    }
}
