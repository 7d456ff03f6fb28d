//! Deterministic, pure logic for the puzzle engine.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests. The
//! only exception is the wall-clock stamp in synthetic container logs, which
//! callers pass in explicitly.

pub mod interpreter;
pub mod manifest;
pub mod resources;
pub mod rubric;
pub mod tracker;
pub mod types;
