//! Use-case services.
//!
//! # Invariants
//! - Services stay storage-agnostic and talk to repositories through traits.

pub mod story_service;
