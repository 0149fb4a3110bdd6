//! Playback queue models.
//!
//! The queue is the ordered list of posts a user intends to play next.
//! Positions are dense and zero-based per user; the `(user, post)` pair is
//! unique so a post cannot sit in one user's queue twice.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Maximum number of items a single user's queue may hold.
pub const QUEUE_CAPACITY: usize = 100;

/// One enqueued track (domain model).
#[derive(Debug, Clone)]
pub struct QueueItem {
    pub id: i32,
    pub user_id: i32,
    pub post_id: i32,
    /// Zero-based play order, dense per user.
    pub position: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Repeat behavior once the queue runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatMode {
    #[default]
    Off,
    One,
    All,
}

impl RepeatMode {
    /// Text form stored in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::One => "one",
            RepeatMode::All => "all",
        }
    }

    /// Parse the stored text form. Unknown values fall back to `Off` so a
    /// hand-edited database row cannot take the queue down.
    pub fn from_str_lossy(s: &str) -> Self {
        match s {
            "one" => RepeatMode::One,
            "all" => RepeatMode::All,
            _ => RepeatMode::Off,
        }
    }
}

/// Per-user queue settings, created lazily on first access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSettings {
    pub shuffle_mode: bool,
    pub repeat_mode: RepeatMode,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            shuffle_mode: false,
            repeat_mode: RepeatMode::Off,
        }
    }
}

/// Partial update for queue settings; only supplied fields change.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shuffle_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_mode: Option<RepeatMode>,
}

/// A queue item joined to its post and uploader, as returned by the API.
/// This is the shape the client turns into playback-ready track descriptors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueEntry {
    pub id: i32,
    pub post_id: i32,
    pub position: i32,
    pub title: String,
    /// Uploader id.
    pub user_id: i32,
    /// Uploader display name.
    pub artist: String,
    pub duration_secs: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<String>,
}

/// JSON queue item response format (for enqueue responses).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItemResponse {
    pub id: i32,
    pub post_id: i32,
    pub position: i32,
}

impl From<&QueueItem> for QueueItemResponse {
    fn from(item: &QueueItem) -> Self {
        Self {
            id: item.id,
            post_id: item.post_id,
            position: item.position,
        }
    }
}

/// Outcome of adding a playlist to the queue: how many tracks went in and
/// how many were skipped as already enqueued.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistQueueOutcome {
    pub added_count: usize,
    pub skipped_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeat_mode_round_trip() {
        for mode in [RepeatMode::Off, RepeatMode::One, RepeatMode::All] {
            assert_eq!(RepeatMode::from_str_lossy(mode.as_str()), mode);
        }
    }

    #[test]
    fn repeat_mode_unknown_falls_back_to_off() {
        assert_eq!(RepeatMode::from_str_lossy("bogus"), RepeatMode::Off);
    }

    #[test]
    fn settings_default_is_no_shuffle_no_repeat() {
        let settings = QueueSettings::default();
        assert!(!settings.shuffle_mode);
        assert_eq!(settings.repeat_mode, RepeatMode::Off);
    }

    #[test]
    fn settings_serialize_camel_case_with_lowercase_repeat() {
        let settings = QueueSettings {
            shuffle_mode: true,
            repeat_mode: RepeatMode::All,
        };
        let json = serde_json::to_value(settings).unwrap();
        assert_eq!(json["shuffleMode"], true);
        assert_eq!(json["repeatMode"], "all");
    }

    #[test]
    fn settings_patch_accepts_partial_bodies() {
        let patch: QueueSettingsPatch = serde_json::from_str(r#"{"repeatMode":"one"}"#).unwrap();
        assert_eq!(patch.repeat_mode, Some(RepeatMode::One));
        assert_eq!(patch.shuffle_mode, None);
    }
}
