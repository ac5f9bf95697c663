//! Player backend seam - the boundary to the platform media framework.
//!
//! # Purpose
//!
//! Decoding and rendering are delegated to whatever media stack the kiosk
//! ships with. The core only needs a narrow contract: load a source
//! asynchronously, start/pause playback, seek, and report position/duration
//! plus status events. Everything above this trait (loop control, transforms,
//! registry) is backend-agnostic and testable without real media.
//!
//! # Status model
//!
//! `load()` never fails synchronously. The backend later reports
//! `MediaStatus::Loaded` (with the probed duration) or `MediaStatus::Error`.
//! `drain_status()` is pumped once per stage tick on the owning thread;
//! backends queue events internally, they never call back into the core.
//!
//! # Backends
//!
//! - [`ClockPlayer`] - wall-clock simulation shipped with the binary; lets
//!   the core run headless and exercises the full loop-detection path.
//! - `FakePlayer` (test-only) - scripted positions and statuses.

use std::mem;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Result, bail};
use log::debug;

/// Asynchronous status events reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaStatus {
    /// Media is loaded and playable; duration is now known
    Loaded { duration_ms: u64 },
    /// Playback reached the end of the media
    EndOfMedia,
    /// The source could not be loaded or playback failed
    Error(String),
}

/// Contract between the core and the platform media framework.
///
/// All methods are called on the stage thread only.
pub trait PlayerBackend: Send {
    /// Begin loading a new source. Asynchronous: success or failure arrives
    /// later as a `MediaStatus` event. Any previous media is discarded.
    fn load(&mut self, path: &Path);

    /// Start or resume playback.
    fn play(&mut self);

    /// Halt playback, keeping the current position.
    fn pause(&mut self);

    /// Seek to an absolute position.
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Current playback position. 0 while nothing is loaded.
    fn position_ms(&self) -> u64;

    /// Media duration. 0 until `Loaded` has been reported.
    fn duration_ms(&self) -> u64;

    fn is_playing(&self) -> bool;

    /// Take all status events queued since the last call.
    fn drain_status(&mut self) -> Vec<MediaStatus>;
}

/// Wall-clock simulation backend.
///
/// Advances position in real time while "playing" and emits `EndOfMedia`
/// once the simulated duration is reached. The duration is fixed at
/// construction since there is no decoder to probe the file; the file itself
/// is only checked for existence. Good enough to run the wall headless and
/// to drive an external renderer that consumes `get_videos` snapshots.
pub struct ClockPlayer {
    source: Option<PathBuf>,
    duration: Duration,
    playing: bool,
    base_position: Duration,
    resumed_at: Option<Instant>,
    pending: Vec<MediaStatus>,
    end_reported: bool,
}

impl ClockPlayer {
    pub fn new(duration: Duration) -> Self {
        Self {
            source: None,
            duration,
            playing: false,
            base_position: Duration::ZERO,
            resumed_at: None,
            pending: Vec::new(),
            end_reported: false,
        }
    }

    fn current_position(&self) -> Duration {
        let mut pos = self.base_position;
        if let Some(at) = self.resumed_at {
            pos += at.elapsed();
        }
        pos.min(self.duration)
    }
}

impl PlayerBackend for ClockPlayer {
    fn load(&mut self, path: &Path) {
        self.playing = false;
        self.resumed_at = None;
        self.base_position = Duration::ZERO;
        self.end_reported = false;

        if path.is_file() {
            debug!("clock backend: loaded {}", path.display());
            self.source = Some(path.to_path_buf());
            self.pending.push(MediaStatus::Loaded {
                duration_ms: self.duration.as_millis() as u64,
            });
        } else {
            self.source = None;
            self.pending
                .push(MediaStatus::Error(format!("no such file: {}", path.display())));
        }
    }

    fn play(&mut self) {
        if self.source.is_some() && !self.playing {
            self.playing = true;
            self.resumed_at = Some(Instant::now());
        }
    }

    fn pause(&mut self) {
        if self.playing {
            self.base_position = self.current_position();
            self.resumed_at = None;
            self.playing = false;
        }
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        if self.source.is_none() {
            bail!("seek with no media loaded");
        }
        self.base_position = Duration::from_millis(position_ms).min(self.duration);
        if self.playing {
            self.resumed_at = Some(Instant::now());
        }
        self.end_reported = false;
        Ok(())
    }

    fn position_ms(&self) -> u64 {
        self.current_position().as_millis() as u64
    }

    fn duration_ms(&self) -> u64 {
        if self.source.is_some() {
            self.duration.as_millis() as u64
        } else {
            0
        }
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn drain_status(&mut self) -> Vec<MediaStatus> {
        // End detection happens here so it lands on the stage thread
        if self.playing && !self.end_reported && self.current_position() >= self.duration {
            self.pending.push(MediaStatus::EndOfMedia);
            self.end_reported = true;
        }
        mem::take(&mut self.pending)
    }
}

#[cfg(test)]
pub(crate) mod fake {
    //! Scripted backend for unit tests: position is set by the test between
    //! ticks, seeks are recorded, and failures can be injected.

    use super::*;

    #[derive(Default)]
    pub struct FakePlayer {
        pub position_ms: u64,
        pub duration_ms: u64,
        pub playing: bool,
        pub loaded: Vec<PathBuf>,
        pub seeks: Vec<u64>,
        pub pending: Vec<MediaStatus>,
        pub fail_seeks: u32,
    }

    impl FakePlayer {
        pub fn with_duration(duration_ms: u64) -> Self {
            Self {
                duration_ms,
                ..Self::default()
            }
        }

        pub fn push_status(&mut self, status: MediaStatus) {
            self.pending.push(status);
        }
    }

    impl PlayerBackend for FakePlayer {
        fn load(&mut self, path: &Path) {
            self.loaded.push(path.to_path_buf());
            self.position_ms = 0;
        }

        fn play(&mut self) {
            self.playing = true;
        }

        fn pause(&mut self) {
            self.playing = false;
        }

        fn seek(&mut self, position_ms: u64) -> Result<()> {
            if self.fail_seeks > 0 {
                self.fail_seeks -= 1;
                bail!("injected seek failure");
            }
            self.seeks.push(position_ms);
            self.position_ms = position_ms;
            Ok(())
        }

        fn position_ms(&self) -> u64 {
            self.position_ms
        }

        fn duration_ms(&self) -> u64 {
            self.duration_ms
        }

        fn is_playing(&self) -> bool {
            self.playing
        }

        fn drain_status(&mut self) -> Vec<MediaStatus> {
            mem::take(&mut self.pending)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clock_player_reports_error_for_missing_file() {
        let mut player = ClockPlayer::new(Duration::from_secs(5));
        player.load(Path::new("/nonexistent/clip.mp4"));
        let statuses = player.drain_status();
        assert!(matches!(statuses.as_slice(), [MediaStatus::Error(_)]));
        assert_eq!(player.duration_ms(), 0);
    }

    #[test]
    fn test_clock_player_loads_real_file() {
        let path = std::env::temp_dir().join("vitrine_clock_player_test.mp4");
        std::fs::write(&path, b"stub").unwrap();

        let mut player = ClockPlayer::new(Duration::from_secs(5));
        player.load(&path);
        assert_eq!(
            player.drain_status(),
            vec![MediaStatus::Loaded { duration_ms: 5000 }]
        );
        assert!(!player.is_playing());

        player.play();
        assert!(player.is_playing());
        player.pause();
        assert!(!player.is_playing());

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_clock_player_seek_without_media_fails() {
        let mut player = ClockPlayer::new(Duration::from_secs(5));
        assert!(player.seek(0).is_err());
    }
}
