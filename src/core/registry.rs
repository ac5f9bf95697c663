//! Track registry - owns the id -> track map and the viewport.
//!
//! # Purpose
//!
//! The registry is the single owner of all live tracks. It mediates
//! add/remove/swap, applies parameter commands, fans viewport resizes out
//! to every track, and runs the per-tick maintenance (status pumping, loop
//! detection, batched transform recompute). Everything here executes on
//! the stage thread only; callers reach it through the command channel.
//!
//! # Id policy
//!
//! Ids are v4 uuids handed out by [`IdAllocator`], which remembers every id
//! it has ever issued. A removed id is therefore never reused for the
//! lifetime of the process, and the allocator can be shared with the HTTP
//! thread so `add` responses carry the id without a round-trip to the
//! stage thread (id generation touches no render state).

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use indexmap::IndexMap;
use log::{debug, info};
use uuid::Uuid;

use crate::config::StageConfig;
use crate::core::backend::PlayerBackend;
use crate::core::command::{Command, CommandError};
use crate::core::debounce::RecomputeDebouncer;
use crate::entities::track::{Track, TrackInfo};
use crate::entities::viewport::Viewport;

/// Factory producing a fresh backend for each new track.
pub type BackendFactory = Box<dyn Fn() -> Box<dyn PlayerBackend> + Send>;

/// Process-lifetime unique id source, shareable across threads.
///
/// Issued ids are remembered forever so a removed id is never handed out
/// again. The retired set lets the HTTP layer tell a just-allocated id
/// (valid, possibly not yet visible in a published snapshot) apart from one
/// that never existed or was removed.
#[derive(Debug, Default)]
pub struct IdAllocator {
    sets: Mutex<IdSets>,
}

#[derive(Debug, Default)]
struct IdSets {
    issued: HashSet<Uuid>,
    retired: HashSet<Uuid>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an id never issued before. Collisions between random v4
    /// uuids are astronomically unlikely; the loop re-rolls anyway.
    pub fn allocate(&self) -> Uuid {
        let mut sets = self.sets.lock().expect("lock");
        loop {
            let id = Uuid::new_v4();
            if sets.issued.insert(id) {
                return id;
            }
        }
    }

    /// Mark an id terminally dead. Called by the registry on remove.
    pub fn retire(&self, id: Uuid) {
        self.sets.lock().expect("lock").retired.insert(id);
    }

    /// True for ids that have been allocated and not yet retired.
    pub fn is_active(&self, id: Uuid) -> bool {
        let sets = self.sets.lock().expect("lock");
        sets.issued.contains(&id) && !sets.retired.contains(&id)
    }
}

pub struct TrackRegistry {
    config: StageConfig,
    tracks: IndexMap<Uuid, Track>,
    viewport: Viewport,
    debouncer: RecomputeDebouncer,
    backend_factory: BackendFactory,
    ids: Arc<IdAllocator>,
}

impl TrackRegistry {
    pub fn new(config: StageConfig, backend_factory: BackendFactory, ids: Arc<IdAllocator>) -> Self {
        let viewport = Viewport::new(config.viewport_width, config.viewport_height);
        let debouncer = RecomputeDebouncer::new(config.debounce_ms);
        Self {
            config,
            tracks: IndexMap::new(),
            viewport,
            debouncer,
            backend_factory,
            ids,
        }
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn ids(&self) -> Arc<IdAllocator> {
        Arc::clone(&self.ids)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.tracks.contains_key(&id)
    }

    /// Create a track, start loading its media, return the new id.
    pub fn add(&mut self, path: PathBuf, name: String) -> Result<Uuid, CommandError> {
        let id = self.ids.allocate();
        self.add_with_id(id, path, name)?;
        Ok(id)
    }

    /// Create a track under a pre-allocated id (command-channel path).
    pub fn add_with_id(
        &mut self,
        id: Uuid,
        path: PathBuf,
        name: String,
    ) -> Result<(), CommandError> {
        if !path.is_file() {
            return Err(CommandError::InvalidSource(path));
        }
        if self.tracks.contains_key(&id) {
            return Err(CommandError::Invalid(format!("duplicate track id {id}")));
        }
        info!("registry: add track {} ({})", id, path.display());
        let player = (self.backend_factory)();
        let track = Track::new(id, name, path, player, &self.config);
        self.tracks.insert(id, track);
        Ok(())
    }

    /// Stop and delete a track. Terminal for the id.
    pub fn remove(&mut self, id: Uuid) -> Result<(), CommandError> {
        let Some(mut track) = self.tracks.shift_remove(&id) else {
            return Err(CommandError::NotFound(id));
        };
        track.stop();
        self.ids.retire(id);
        info!("registry: removed track {id}");
        Ok(())
    }

    /// Replace a track's media source, transform untouched.
    pub fn swap(&mut self, id: Uuid, path: PathBuf) -> Result<(), CommandError> {
        if !path.is_file() {
            return Err(CommandError::InvalidSource(path));
        }
        let track = self.tracks.get_mut(&id).ok_or(CommandError::NotFound(id))?;
        track.swap(path);
        Ok(())
    }

    pub fn set_position(&mut self, id: Uuid, x: f32, y: f32, now: Instant) -> Result<(), CommandError> {
        let track = self.tracks.get_mut(&id).ok_or(CommandError::NotFound(id))?;
        track.set_position(x, y);
        self.debouncer.schedule(now);
        Ok(())
    }

    pub fn set_scale(&mut self, id: Uuid, sx: f32, sy: f32, now: Instant) -> Result<(), CommandError> {
        if !(sx > 0.0 && sy > 0.0 && sx.is_finite() && sy.is_finite()) {
            return Err(CommandError::Invalid(format!(
                "scale factors must be positive, got ({sx}, {sy})"
            )));
        }
        let track = self.tracks.get_mut(&id).ok_or(CommandError::NotFound(id))?;
        track.set_scale(sx, sy);
        self.debouncer.schedule(now);
        Ok(())
    }

    pub fn set_rotation(&mut self, id: Uuid, degrees: f32, now: Instant) -> Result<(), CommandError> {
        let track = self.tracks.get_mut(&id).ok_or(CommandError::NotFound(id))?;
        track.set_rotation(degrees);
        self.debouncer.schedule(now);
        Ok(())
    }

    /// Viewport changed: every transform is stale, recompute the lot
    /// (joined into the pending batch, never lost).
    pub fn on_viewport_resize(&mut self, width: u32, height: u32, now: Instant) {
        if (width, height) == self.viewport.size() {
            return;
        }
        info!("registry: viewport resize to {width}x{height}");
        self.viewport = Viewport::new(width, height);
        for track in self.tracks.values_mut() {
            track.mark_dirty();
        }
        self.debouncer.schedule(now);
    }

    /// Apply one command from the channel. Fire-and-forget callers get the
    /// error logged; the registry state is untouched on failure.
    pub fn apply(&mut self, cmd: Command, now: Instant) -> Result<(), CommandError> {
        match cmd {
            Command::SetPosition { id, x, y } => self.set_position(id, x, y, now),
            Command::SetScale { id, sx, sy } => self.set_scale(id, sx, sy, now),
            Command::SetRotation { id, degrees } => self.set_rotation(id, degrees, now),
            Command::AddVideo { id, path, name } => self.add_with_id(id, path, name),
            Command::RemoveVideo { id } => self.remove(id),
            Command::SwapVideo { id, path } => self.swap(id, path),
            Command::Resize { width, height } => {
                self.on_viewport_resize(width, height, now);
                Ok(())
            }
        }
    }

    /// Snapshot of every live track, in insertion order. Copies, not
    /// references into live state; transforms resolve lazily here.
    pub fn list(&mut self) -> Vec<TrackInfo> {
        let norm = (self.config.norm_width, self.config.norm_height);
        let viewport = self.viewport.size();
        self.tracks
            .values_mut()
            .map(|t| t.info(norm, viewport))
            .collect()
    }

    /// Per-tick maintenance: pump every track, then flush any due
    /// recompute batch in one pass.
    pub fn tick(&mut self, now: Instant) {
        for track in self.tracks.values_mut() {
            track.tick(now);
        }

        if let Some(coalesced) = self.debouncer.tick(now) {
            let norm = (self.config.norm_width, self.config.norm_height);
            let viewport = self.viewport.size();
            let mut rebuilt = 0u32;
            for track in self.tracks.values_mut() {
                if track.is_dirty() {
                    let _ = track.transform(norm, viewport);
                    rebuilt += 1;
                }
            }
            debug!("registry: recomputed {rebuilt} transforms ({coalesced} mutations coalesced)");
        }
    }
}
