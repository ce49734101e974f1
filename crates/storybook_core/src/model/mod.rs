//! Story domain model.
//!
//! # Responsibility
//! - Define the user request and the persisted story record.
//! - Build the prompts sent to the chat-completion endpoint.
//!
//! # Invariants
//! - A story record is written once per run and never updated.

pub mod story;
