//! Core types for the playback controller.

use serde::{Deserialize, Serialize};

/// A playback-ready track descriptor.
///
/// Denormalized from a queue entry and its post/uploader, shaped for the
/// player. Rebuilt from the server queue on every sync; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackTrack {
    /// Post this track plays.
    pub post_id: i32,
    /// Uploader of the post.
    pub user_id: i32,
    pub title: String,
    pub artist: String,
    /// Stream URL the media sink opens.
    pub url: String,
    pub cover_art: Option<String>,
}

/// Playback state of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    /// No track loaded
    Idle,
    /// Currently playing
    Playing,
    /// Paused mid-track
    Paused,
}

/// A point-in-time view of the controller, taken under its lock.
///
/// The sync glue compares consecutive snapshots to spot tracks that
/// finished playing.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerSnapshot {
    pub current_track: Option<PlaybackTrack>,
    pub is_playing: bool,
    /// Volume in [0.0, 1.0].
    pub volume: f64,
    /// Seconds into the current track.
    pub current_time: f64,
    /// Length of the current track in seconds (0 until metadata loads).
    pub duration: f64,
    /// Position of the current track within the playlist mirror, if it is
    /// still part of it.
    pub current_index: Option<usize>,
}
