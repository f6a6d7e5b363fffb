//! Diff engine for Strata.
//!
//! Compares two versions of a value graph and produces a diff that contains
//! only what changed. Removed keys are written as a delete marker, values
//! without a counterpart in the old version are captured in full. Merging the
//! diff onto the old version (see `strata-merge`) yields the new one.
//!
//! # Quick Start
//!
//! ```rust
//! use strata_diff::{MainResolver, PathContext};
//! use strata_types::Value;
//!
//! let old: Value = [("a", 1), ("b", 2)].into_iter().collect();
//! let new: Value = [("a", 1), ("b", 3)].into_iter().collect();
//!
//! let diff = MainResolver::new().resolve(&old, &new, &PathContext::new()).unwrap();
//! assert_eq!(diff, [("b", 3)].into_iter().collect::<Value>());
//! ```
//!
//! # Key Types
//!
//! - [`MainResolver`] -- Dispatches value pairs through the resolver chain
//! - [`PathContext`] -- Current path, delete marker, associative paths and flags
//! - [`Resolution`] -- Outcome of one comparison: changed or unchanged
//! - [`DiffConfig`] -- TOML-loadable settings that build a root context

pub mod config;
pub mod context;
pub mod error;
pub mod normalizer;
pub mod resolver;
pub mod resolvers;

pub use config::DiffConfig;
pub use context::{ContextBuilder, ContextFlags, PathContext, DEFAULT_ROOT_NAME, WILDCARD};
pub use error::{DiffError, DiffResult};
pub use normalizer::{Normalizer, ValueNormalizer};
pub use resolver::MainResolver;
pub use resolvers::{Resolution, Resolver};
