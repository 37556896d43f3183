//! # engram-revision
//!
//! Belief revision for the facts layer. A candidate fact is matched against
//! existing active beliefs by slot signature, classified into one of
//! ADD / UPDATE / SUPERSEDE / NONE, and committed with supersession pointers
//! in a single transaction. The classifier is pluggable (rule-based or
//! LLM-backed); anything an external classifier returns outside the closed
//! action set falls back to the rules.

pub mod classifier;
pub mod engine;
pub mod matcher;
pub mod signature;

pub use engine::RevisionEngine;
