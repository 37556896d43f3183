//! # engram-retrieval
//!
//! Multi-strategy recall. Enabled sources (vector, facts, lexical, graph)
//! run as independent parallel tasks against a single read snapshot each;
//! results are keyed by `(layer, id)`, deduplicated, and merged with a
//! deterministic ordering: max source score, then importance, then recency.
//! Per-source failures never fail the call — they surface in
//! `source_failures` and the rest of the result set stands.

pub mod merge;
pub mod recall;
pub mod sources;

pub use recall::RecallEngine;
