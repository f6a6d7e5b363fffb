//! Merge engine for Strata.
//!
//! Applies a diff produced by `strata-diff` onto a state map. Merging is pure:
//! the inputs are never modified.
//!
//! # Key Types
//!
//! - [`Merger`] -- Recursive merge of a change map onto a state map
//! - [`MergeContext`] -- The delete marker the merger recognises

pub mod context;
pub mod merger;

pub use context::MergeContext;
pub use merger::Merger;
