//! Webhook-triggered document generation pipeline.
//!
//! Sequences the four external calls (fetch card, create document,
//! write link back, advance phase) behind a per-card concurrency guard,
//! so webhook retries, concurrent deliveries, and network flakiness never
//! produce duplicate documents.

pub mod guard;
pub mod orchestrator;
pub mod transform;
pub mod vault;

pub use guard::{ConcurrencyGuard, InMemoryGuard};
pub use orchestrator::{Orchestrator, PipelineSettings, RunOutcome};
pub use vault::VaultRoutes;
