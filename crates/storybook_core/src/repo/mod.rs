//! Repository layer for the story store.
//!
//! # Responsibility
//! - Isolate SQLite query details from the generation service.
//!
//! # Invariants
//! - Repository writes enforce `NewStory::validate()` before persistence.

pub mod story_repo;
