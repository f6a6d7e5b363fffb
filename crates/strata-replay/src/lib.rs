//! Replay for Strata.
//!
//! This crate rebuilds objects from their recorded change sets. It provides:
//! - `ObjectDefinition`: the ordered change sets of one object
//! - `Restorer`: folds change sets through the merger and builds the result
//! - `RecordFactory` implementations for schema records and serde types
//! - `ChangeProvider` read boundary with an in-memory change log
//!
//! # Key Types
//!
//! - [`Restorer`] -- Fold and construct
//! - [`SchemaRegistry`] -- Builds [`strata_types::Record`]s, checking field kinds
//! - [`TypedFactory`] -- Builds any `Deserialize` type
//! - [`InMemoryChangeLog`] -- Append-only change streams per object

pub mod definition;
pub mod error;
pub mod factory;
pub mod provider;
pub mod restorer;

pub use definition::ObjectDefinition;
pub use error::ReplayError;
pub use factory::{RecordFactory, SchemaRegistry, TypedFactory};
pub use provider::{ChangeProvider, InMemoryChangeLog};
pub use restorer::Restorer;
