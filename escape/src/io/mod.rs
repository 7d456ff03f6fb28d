//! I/O helpers for escape commands.

pub mod config;
pub mod player;
pub mod progress;
pub mod sync;
