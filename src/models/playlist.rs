//! Playlist models.
//!
//! A playlist is a user-curated, persistent named collection of posts,
//! independent of the playback queue.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::post::{Post, PostResponse};

/// A playlist (domain model).
#[derive(Debug, Clone)]
pub struct Playlist {
    pub id: i32,
    /// Owner.
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// JSON playlist response format (without tracks).
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistResponse {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_at: String,
    pub changed_at: String,
}

impl From<&Playlist> for PlaylistResponse {
    fn from(playlist: &Playlist) -> Self {
        Self {
            id: playlist.id,
            user_id: playlist.user_id,
            name: playlist.name.clone(),
            description: playlist.description.clone(),
            created_at: playlist
                .created_at
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
            changed_at: playlist
                .updated_at
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
        }
    }
}

/// JSON playlist response format including the ordered tracks.
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistWithTracksResponse {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub track_count: usize,
    pub tracks: Vec<PostResponse>,
    pub created_at: String,
    pub changed_at: String,
}

impl PlaylistWithTracksResponse {
    pub fn from_playlist(playlist: &Playlist, tracks: &[Post]) -> Self {
        Self {
            id: playlist.id,
            user_id: playlist.user_id,
            name: playlist.name.clone(),
            description: playlist.description.clone(),
            track_count: tracks.len(),
            tracks: tracks.iter().map(PostResponse::from).collect(),
            created_at: playlist
                .created_at
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
            changed_at: playlist
                .updated_at
                .format("%Y-%m-%dT%H:%M:%S%.3fZ")
                .to_string(),
        }
    }
}
