//! Stage - the owning-thread context for the whole wall.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────┐      mpsc::channel       ┌──────────────────────┐
//! │   API Server Thread     │  ───── Command ───────▶  │   Stage Thread       │
//! │   (rouille HTTP)        │                          │   (tick loop)        │
//! │                         │                          │   drain commands     │
//! │  Arc<SharedApiState>    │                          │   pump backends      │
//! │  read snapshots         │ ◀──── publish ────────── │   loop detection     │
//! └─────────────────────────┘                          │   flush recompute    │
//!                                                      └──────────────────────┘
//! ```
//!
//! One thread owns the registry, every track, and the viewport. It never
//! blocks on I/O: media loading is asynchronous behind the backend seam and
//! loop/recompute timers are deadlines checked inside the tick. The HTTP
//! side holds only the channel sender and a read handle on published
//! snapshots.
//!
//! Replaces the window/controller singletons of the early prototypes: the
//! stage is constructed once in `main` and passed around explicitly, no
//! ambient globals.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::time::Instant;

use log::warn;

use crate::config::StageConfig;
use crate::core::command::Command;
use crate::core::registry::{BackendFactory, IdAllocator, TrackRegistry};

pub struct Stage {
    registry: TrackRegistry,
    commands: Receiver<Command>,
}

impl Stage {
    pub fn new(
        config: StageConfig,
        backend_factory: BackendFactory,
        ids: std::sync::Arc<IdAllocator>,
        commands: Receiver<Command>,
    ) -> Self {
        Self {
            registry: TrackRegistry::new(config, backend_factory, ids),
            commands,
        }
    }

    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut TrackRegistry {
        &mut self.registry
    }

    /// One cooperative iteration: drain all pending commands in arrival
    /// order, then run registry maintenance. Command failures are logged;
    /// synchronous rejection already happened at the HTTP boundary, and a
    /// failed fire-and-forget command must never take the stage down.
    pub fn tick(&mut self, now: Instant) {
        loop {
            match self.commands.try_recv() {
                Ok(cmd) => {
                    if let Err(e) = self.registry.apply(cmd, now) {
                        warn!("stage: command rejected: {e}");
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
        self.registry.tick(now);
    }
}
