//! Playlist API handlers, including the playlist-to-queue bulk add.

use axum::Json;
use axum::extract::Path;
use serde::{Deserialize, Serialize};

use crate::api::auth::AppAuth;
use crate::api::error::ApiError;
use crate::api::handlers::queue::MessageResponse;
use crate::models::playlist::{PlaylistResponse, PlaylistWithTracksResponse};

/// GET /playlists
///
/// Returns the caller's playlists.
pub async fn get_playlists(auth: AppAuth) -> Json<Vec<PlaylistResponse>> {
    let playlists = auth.state.playlists_for(auth.user.id);

    Json(playlists.iter().map(PlaylistResponse::from).collect())
}

/// Request body for creating a playlist.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePlaylistBody {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// POST /playlists
///
/// Creates an empty playlist owned by the caller.
pub async fn create_playlist(
    auth: AppAuth,
    Json(body): Json<CreatePlaylistBody>,
) -> Result<Json<PlaylistResponse>, ApiError> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(ApiError::Validation("name must not be empty".to_string()));
    }

    let playlist = auth
        .state
        .create_playlist(auth.user.id, name, body.description.as_deref())?;

    Ok(Json(PlaylistResponse::from(&playlist)))
}

/// GET /playlists/{id}
///
/// Returns a playlist and its ordered tracks. Playlists are visible to any
/// authenticated user so they can be followed and queued.
pub async fn get_playlist(
    Path(playlist_id): Path<i32>,
    auth: AppAuth,
) -> Result<Json<PlaylistWithTracksResponse>, ApiError> {
    let playlist = auth
        .state
        .get_playlist(playlist_id)
        .ok_or_else(|| ApiError::NotFound("Playlist not found".to_string()))?;

    let tracks = auth.state.playlist_tracks(playlist_id);

    Ok(Json(PlaylistWithTracksResponse::from_playlist(
        &playlist, &tracks,
    )))
}

/// Request body for appending a track to a playlist.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddTrackBody {
    pub post_id: i32,
}

/// POST /playlists/{id}/tracks
///
/// Appends a post to the end of the playlist. Only the owner may modify a
/// playlist.
pub async fn add_playlist_track(
    Path(playlist_id): Path<i32>,
    auth: AppAuth,
    Json(body): Json<AddTrackBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    if auth.state.get_playlist(playlist_id).is_none() {
        return Err(ApiError::NotFound("Playlist not found".to_string()));
    }
    if !auth.state.is_playlist_owner(auth.user.id, playlist_id) {
        return Err(ApiError::Forbidden);
    }

    auth.state.add_playlist_track(playlist_id, body.post_id)?;

    Ok(Json(MessageResponse {
        message: "Track added to playlist".to_string(),
    }))
}

/// Request body for the playlist-to-queue bulk add.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddPlaylistToQueueBody {
    pub shuffle: bool,
    pub play_next: bool,
}

/// Response for the playlist-to-queue bulk add.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPlaylistToQueueResponse {
    pub message: String,
    pub added_count: usize,
    pub skipped_count: usize,
}

/// POST /playlists/{id}/queue
///
/// Adds the playlist's playable tracks to the caller's queue as one ordered
/// block. Tracks already queued are skipped and reported, not rejected.
pub async fn add_playlist_to_queue(
    Path(playlist_id): Path<i32>,
    auth: AppAuth,
    Json(body): Json<AddPlaylistToQueueBody>,
) -> Result<Json<AddPlaylistToQueueResponse>, ApiError> {
    let outcome =
        auth.state
            .add_playlist_to_queue(auth.user.id, playlist_id, body.shuffle, body.play_next)?;

    let message = if outcome.skipped_count > 0 {
        format!(
            "Added {} tracks to queue ({} already queued)",
            outcome.added_count, outcome.skipped_count
        )
    } else {
        format!("Added {} tracks to queue", outcome.added_count)
    };

    Ok(Json(AddPlaylistToQueueResponse {
        message,
        added_count: outcome.added_count,
        skipped_count: outcome.skipped_count,
    }))
}
