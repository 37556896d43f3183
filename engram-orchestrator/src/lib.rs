//! # engram-orchestrator
//!
//! The orchestrated surface of the engine: `remember` drives a state machine
//! across the four storage layers with per-layer progress events, `recall`
//! fans out multi-strategy retrieval, and `forget` cascades deletions in
//! dependency order. Admission is bounded per memory space; re-running a
//! `remember` with the same idempotency key converges instead of duplicating.

pub mod admission;
pub mod client;
pub mod events;
pub mod forget;
pub mod idempotency;
pub mod remember;

pub use client::{Engram, EngramBuilder, RememberOutcome};
