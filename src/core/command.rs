//! Typed commands crossing from the control threads to the stage thread.
//!
//! # Purpose
//!
//! The HTTP handlers (and any other external caller) never touch tracks or
//! the registry directly. They send one of these commands over an
//! `mpsc::Sender` and the stage thread drains the channel at the top of
//! every tick. A single FIFO channel gives the ordering guarantee for free:
//! commands targeting the same track id apply in submission order.
//!
//! # Errors
//!
//! `CommandError` is the structured failure taxonomy of the command
//! surface. Unknown ids are rejected, never silently ignored; bad source
//! paths are rejected before the registry is touched.

use std::fmt;
use std::path::PathBuf;

use uuid::Uuid;

/// Mutation requests accepted by the stage thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Update a track's position in normalized control-space coordinates
    SetPosition { id: Uuid, x: f32, y: f32 },
    /// Update a track's scale factors (must be positive)
    SetScale { id: Uuid, sx: f32, sy: f32 },
    /// Update a track's rotation in degrees
    SetRotation { id: Uuid, degrees: f32 },
    /// Create a track for `path`. The id is pre-allocated by the caller
    /// through [`IdAllocator`](crate::core::registry::IdAllocator) so the
    /// HTTP response can return it without waiting on the stage thread.
    AddVideo { id: Uuid, path: PathBuf, name: String },
    /// Stop and delete a track
    RemoveVideo { id: Uuid },
    /// Replace a track's media source, preserving its transform
    SwapVideo { id: Uuid, path: PathBuf },
    /// Render surface resized: refit every track
    Resize { width: u32, height: u32 },
}

/// Structured failures returned by the command surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The referenced track id is not in the registry
    NotFound(Uuid),
    /// The source path does not exist or is not a file
    InvalidSource(PathBuf),
    /// A field failed validation (e.g. non-positive scale)
    Invalid(String),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "no track with id {id}"),
            Self::InvalidSource(path) => {
                write!(f, "source does not exist: {}", path.display())
            }
            Self::Invalid(msg) => write!(f, "invalid command: {msg}"),
        }
    }
}

impl std::error::Error for CommandError {}
