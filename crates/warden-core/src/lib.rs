//! Core types and error definitions for the Warden orchestration engine.
//!
//! This crate provides the foundational types shared across all Warden crates:
//! the unified error taxonomy and the vocabulary used to name the entities
//! the engine manages.
//!
//! # Main types
//!
//! - [`WardenError`]: Unified error enum for all Warden subsystems.
//! - [`WardenResult`]: Convenience alias for `Result<T, WardenError>`.
//! - [`EntityKind`]: The kinds of records held by the entity store.

/// Error taxonomy shared by every crate.
pub mod error;

pub use error::{EntityKind, WardenError, WardenResult};
