//! Post models.
//!
//! A post is a shared piece of music: either an uploaded audio file or a
//! linked YouTube video. Only posts with a stored audio file are playable
//! through the queue.

use chrono::NaiveDateTime;
use serde::Serialize;

/// A post in the sharing feed (domain model).
#[derive(Debug, Clone)]
pub struct Post {
    pub id: i32,
    /// Uploader.
    pub user_id: i32,
    pub title: String,
    /// Path of the stored audio file, if this post carries one.
    pub audio_path: Option<String>,
    /// MIME type of the stored audio file.
    pub audio_content_type: Option<String>,
    /// Linked YouTube video, for posts without an uploaded file.
    pub youtube_url: Option<String>,
    /// Track length in seconds (0 when unknown).
    pub duration_secs: i32,
    pub cover_art: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Post {
    /// A post can be enqueued only when it has a stored audio file.
    pub fn is_playable(&self) -> bool {
        self.audio_path.is_some()
    }
}

/// Data for registering a new post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: i32,
    pub title: String,
    pub audio_path: Option<String>,
    pub audio_content_type: Option<String>,
    pub youtube_url: Option<String>,
    pub duration_secs: i32,
    pub cover_art: Option<String>,
}

/// JSON post response format.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PostResponse {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub playable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub youtube_url: Option<String>,
    pub duration_secs: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<String>,
    pub created_at: String,
}

impl From<&Post> for PostResponse {
    fn from(post: &Post) -> Self {
        Self {
            id: post.id,
            user_id: post.user_id,
            title: post.title.clone(),
            playable: post.is_playable(),
            youtube_url: post.youtube_url.clone(),
            duration_secs: post.duration_secs,
            cover_art: post.cover_art.clone(),
            created_at: post.created_at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        }
    }
}
