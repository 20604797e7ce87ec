/*!
 * Resumable document translation pipeline.
 *
 * Translates the text content of a structured document through an
 * external, stateful translation service that exposes no completion
 * events, only a pollable output surface. Progress is checkpointed per
 * line in SQLite so an interrupted run resumes without re-translating.
 *
 * Core modules:
 * - [`whitespace`]: reversible normalization of leaf text
 * - [`chunker`]: delimiter-joined batching of segments
 * - [`client`]: retry/poll/stabilize loop over a session
 * - [`session`]: the contract a service backend implements
 * - [`checkpoint`]: SQLite persistence of translated lines
 * - [`document`]: the contract a document backend implements
 * - [`orchestrator`]: the end-to-end pipeline
 */

pub mod app_config;
pub mod checkpoint;
pub mod chunker;
pub mod client;
pub mod document;
pub mod errors;
pub mod language_utils;
pub mod orchestrator;
pub mod session;
pub mod whitespace;

pub use app_config::{ClientConfig, Config, LogLevel};
pub use client::{CancelToken, RequestOutcome, ResilientClient};
pub use errors::{AppError, PipelineError, RequestError, SessionError};
pub use orchestrator::{DialoguePredicate, Orchestrator, PipelineOptions, RunOutcome};
pub use session::TranslationSession;
