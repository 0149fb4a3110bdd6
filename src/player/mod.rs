//! Playback controller and media sink abstraction.

pub mod controller;
pub mod sink;
pub mod types;

pub use controller::{ENDED_ADVANCE_DELAY, PlaybackController};
pub use sink::{MediaSink, SinkBackend, SinkError, SinkEvent};
pub use types::{PlaybackState, PlaybackTrack, PlayerSnapshot};
