//! Playback controller.
//!
//! Owns exactly one live media sink and advances through an in-memory track
//! list mirroring the server queue. The controller itself is synchronous;
//! the embedding delivers sink events and drives the delayed auto-advance
//! after `ended` (see [`ENDED_ADVANCE_DELAY`]).

use std::time::Duration;

use crate::player::sink::{MediaSink, SinkBackend, SinkEvent};
use crate::player::types::{PlaybackState, PlaybackTrack, PlayerSnapshot};

/// Settle time between tearing down a finished track and starting the next
/// one. Long enough for the queue sync to observe the idle gap and drop the
/// finished track from the server queue.
pub const ENDED_ADVANCE_DELAY: Duration = Duration::from_millis(200);

/// Transport controller over a single media sink.
pub struct PlaybackController {
    backend: Box<dyn SinkBackend>,
    sink: Option<Box<dyn MediaSink>>,
    /// In-memory mirror of the server queue, in play order.
    playlist: Vec<PlaybackTrack>,
    current: Option<PlaybackTrack>,
    /// Index of the current track within `playlist`. `None` means "before
    /// the start": the next advance plays index 0.
    current_index: Option<usize>,
    state: PlaybackState,
    volume: f64,
    current_time: f64,
    duration: f64,
}

impl PlaybackController {
    /// Create an idle controller with an empty playlist and full volume.
    pub fn new(backend: Box<dyn SinkBackend>) -> Self {
        Self {
            backend,
            sink: None,
            playlist: Vec::new(),
            current: None,
            current_index: None,
            state: PlaybackState::Idle,
            volume: 1.0,
            current_time: 0.0,
            duration: 0.0,
        }
    }

    /// Replace the playlist mirror wholesale.
    ///
    /// The current index resets to "before the start" so the controller
    /// stays a passive mirror of the server queue; a track that is already
    /// playing keeps playing.
    pub fn set_queue(&mut self, tracks: Vec<PlaybackTrack>) {
        self.playlist = tracks;
        self.current_index = None;
    }

    /// Start playing a track, tearing down whatever was loaded before.
    ///
    /// If the track is part of the playlist mirror its index becomes the
    /// current index; otherwise the index resets.
    pub fn play_track(&mut self, track: PlaybackTrack) {
        self.current_index = self
            .playlist
            .iter()
            .position(|t| t.post_id == track.post_id);
        self.start(track);
    }

    /// Jump to an arbitrary playlist index. Out of range is a silent no-op.
    pub fn play_from_queue(&mut self, index: usize) {
        self.play_at(index);
    }

    /// Advance to the next playlist entry. Past the end is a silent no-op;
    /// there is no wraparound.
    pub fn play_next(&mut self) {
        let next = self.current_index.map_or(0, |i| i + 1);
        self.play_at(next);
    }

    /// Step back to the previous playlist entry. Before the start is a
    /// silent no-op.
    pub fn play_previous(&mut self) {
        match self.current_index {
            Some(i) if i > 0 => self.play_at(i - 1),
            _ => {}
        }
    }

    /// Pause playback. No-op if no track is loaded.
    pub fn pause(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            sink.pause();
            if self.state == PlaybackState::Playing {
                self.state = PlaybackState::Paused;
            }
        }
    }

    /// Resume playback. No-op if no track is loaded.
    pub fn resume(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            if let Err(e) = sink.play() {
                tracing::warn!("resume failed: {e}");
            }
            self.state = PlaybackState::Playing;
        }
    }

    /// Jump to a position in the current track. No-op if nothing is loaded.
    pub fn seek(&mut self, position: f64) {
        if let Some(sink) = self.sink.as_mut() {
            sink.seek(position);
            self.current_time = position;
        }
    }

    /// Set the volume, clamped to [0.0, 1.0], and push it to the live sink.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = self.sink.as_mut() {
            sink.set_volume(self.volume);
        }
    }

    /// Feed a sink event into the controller.
    ///
    /// `Ended` tears the finished track down and leaves the controller
    /// idle; the embedding calls [`Self::play_next`] after
    /// [`ENDED_ADVANCE_DELAY`] to auto-advance.
    pub fn handle_event(&mut self, event: SinkEvent) {
        match event {
            SinkEvent::MetadataLoaded { duration } => {
                self.duration = duration;
            }
            SinkEvent::TimeUpdate { position } => {
                self.current_time = position;
            }
            SinkEvent::Ended => {
                self.sink = None;
                self.current = None;
                self.state = PlaybackState::Idle;
                self.current_time = 0.0;
            }
        }
    }

    /// Take a point-in-time view of the controller state.
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            current_track: self.current.clone(),
            is_playing: self.state == PlaybackState::Playing,
            volume: self.volume,
            current_time: self.current_time,
            duration: self.duration,
            current_index: self.current_index,
        }
    }

    /// Current playback state.
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    /// Currently loaded track, if any.
    pub fn current_track(&self) -> Option<&PlaybackTrack> {
        self.current.as_ref()
    }

    /// Index of the current track within the playlist mirror.
    pub fn current_index(&self) -> Option<usize> {
        self.current_index
    }

    /// Number of tracks in the playlist mirror.
    pub fn queue_len(&self) -> usize {
        self.playlist.len()
    }

    fn play_at(&mut self, index: usize) {
        let Some(track) = self.playlist.get(index).cloned() else {
            return;
        };
        self.current_index = Some(index);
        self.start(track);
    }

    /// Tear down the previous sink and start a new one for `track`.
    ///
    /// Start failures are logged, never propagated: the playing flag may be
    /// briefly stale until the next transport action, but controller state
    /// is not corrupted.
    fn start(&mut self, track: PlaybackTrack) {
        self.sink = None;
        self.current_time = 0.0;
        self.duration = 0.0;
        self.state = PlaybackState::Playing;

        match self.backend.open(&track.url) {
            Ok(mut sink) => {
                sink.set_volume(self.volume);
                if let Err(e) = sink.play() {
                    tracing::warn!("playback start failed for post {}: {e}", track.post_id);
                }
                self.sink = Some(sink);
            }
            Err(e) => {
                tracing::warn!("failed to open media for post {}: {e}", track.post_id);
            }
        }

        self.current = Some(track);
    }
}
