//! Text condensation helpers for image prompts.
//!
//! # Responsibility
//! - Condense narrative text into a short, single-line image instruction.
//! - Bound prompt lengths without cutting words in half.
//!
//! # Invariants
//! - Extraction is pure: no I/O, no logging, no failure modes.
//! - Truncated output is always a prefix of its input.

pub mod instruction;
