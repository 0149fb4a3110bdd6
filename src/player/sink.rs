//! Media sink abstraction.
//!
//! The controller owns at most one live sink at a time. A deployment backs
//! the trait with the platform media element; tests plug in a scripted
//! implementation.

use thiserror::Error;

/// Errors raised by a media sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The media source could not be opened.
    #[error("Failed to open media source {url}: {reason}")]
    Open { url: String, reason: String },

    /// Playback could not start (decoding failure, autoplay policy, ...).
    #[error("Playback could not start: {0}")]
    Start(String),
}

/// Events a sink reports back to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    /// Media metadata became available.
    MetadataLoaded { duration: f64 },
    /// Playback position advanced.
    TimeUpdate { position: f64 },
    /// The current track played to completion.
    Ended,
}

/// One live media element bound to a single source URL.
pub trait MediaSink: Send {
    /// Begin or resume playback.
    fn play(&mut self) -> Result<(), SinkError>;
    /// Pause playback, keeping the position.
    fn pause(&mut self);
    /// Jump to a position in seconds.
    fn seek(&mut self, position: f64);
    /// Apply a volume in [0.0, 1.0].
    fn set_volume(&mut self, volume: f64);
}

/// Opens media sinks for track URLs.
pub trait SinkBackend: Send {
    fn open(&mut self, url: &str) -> Result<Box<dyn MediaSink>, SinkError>;
}
