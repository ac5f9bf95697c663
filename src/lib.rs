//! VITRINE - Kiosk video wall core library
//!
//! Re-exports all modules for use by the binary target.

// Core engine (backend seam, commands, loop control, registry, stage)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod entities;
pub mod server;

// Re-export commonly used types from core
pub use crate::core::backend::{ClockPlayer, MediaStatus, PlayerBackend};
pub use crate::core::command::{Command, CommandError};
pub use crate::core::registry::{IdAllocator, TrackRegistry};
pub use crate::core::stage::Stage;

// Re-export entities
pub use entities::{Track, TrackInfo, TrackStatus, Viewport};
