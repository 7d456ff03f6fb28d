//! Container escape room puzzle engine.
//!
//! Players progress through two levels: a simulated container CLI and a
//! deployment manifest checker. The crate keeps a strict separation:
//!
//! - **[`core`]**: Pure, deterministic logic (command interpreter, manifest
//!   rules, task tracking). No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (configuration, player identity,
//!   progress store client). Isolated to enable in-memory stores in tests.
//!
//! Orchestration modules ([`play`], [`check`]) coordinate core logic with I/O
//! to implement CLI commands. [`wire`] holds the progress store's JSON shapes.

pub mod check;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod play;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod wire;
