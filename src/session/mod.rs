/*!
 * Translation session contract.
 *
 * The external translation service is a single shared, stateful resource:
 * a payload surface that can be written and a rendered output surface that
 * can only be sampled. There is no completion event and no transaction
 * semantics; the request client (`crate::client`) builds reliability on
 * top of this contract.
 *
 * Concrete backends (for example a driven web UI) live outside this crate.
 * `session::mock` provides scripted in-process sessions for tests and dry
 * runs.
 */

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::errors::SessionError;

pub mod mock;

/// Capability to submit a text payload to the translation service and to
/// sample its current rendered output.
///
/// Implementations must classify every observable failure into a
/// [`SessionError`] variant; the client's retry and halt decisions depend
/// on that classification.
#[async_trait]
pub trait TranslationSession: Send + Sync + Debug {
    /// Whether the session currently holds an authenticated state
    async fn is_authenticated(&self) -> bool;

    /// Block until an external, out-of-band action (e.g. a human login)
    /// authenticates the session, or until `timeout` elapses.
    ///
    /// Returns `Ok(true)` once authenticated, `Ok(false)` on timeout.
    async fn await_authentication(&self, timeout: Duration) -> Result<bool, SessionError>;

    /// Clear any prior payload and write a new one
    async fn submit(&self, payload: &str) -> Result<(), SessionError>;

    /// Sample the service's current rendered output, possibly partial or
    /// empty while the service is still streaming
    async fn sample_output(&self) -> Result<String, SessionError>;

    /// Force a full session reset, invalidating the authenticated state so
    /// the next submission re-establishes it
    async fn reset(&self) -> Result<(), SessionError>;
}
