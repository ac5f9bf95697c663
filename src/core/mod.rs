//! Core engine modules - backend seam, commands, loop control, registry, stage
//!
//! These modules form the wall engine, independent of any HTTP surface.

pub mod backend;
pub mod command;
pub mod debounce;
pub mod looper;
pub mod registry;
pub mod stage;

// Re-exports for convenience
pub use backend::{ClockPlayer, MediaStatus, PlayerBackend};
pub use command::{Command, CommandError};
pub use debounce::RecomputeDebouncer;
pub use looper::LoopController;
pub use registry::{BackendFactory, IdAllocator, TrackRegistry};
pub use stage::Stage;
