//! Authentication extractor and application state trait.
//!
//! Every API request (except the health probe) carries a bearer token:
//!
//! ```text
//! Authorization: Bearer <token>
//! ```
//!
//! Tokens are random hex strings minted via the CLI and stored on the user
//! row. The [`AppAuth`] extractor resolves the token to a [`User`] and hands
//! handlers a shared [`AuthState`] for data access.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;

use super::error::ApiError;
use crate::db::{
    DbPool, PlaylistRepository, PostRepository, QueueError, QueueRepository,
    QueueSettingsRepository, StoreError, UserRepository,
};
use crate::models::User;
use crate::models::playlist::Playlist;
use crate::models::post::Post;
use crate::models::queue::{
    PlaylistQueueOutcome, QueueEntry, QueueItem, QueueSettings, QueueSettingsPatch,
};

/// Application state that must be available for authenticated handlers.
pub trait AuthState: Send + Sync + 'static {
    /// Resolve a bearer token to a user.
    fn find_user_by_token(&self, token: &str) -> Option<User>;

    // Queue operations
    /// Get a user's queue joined to post and uploader, in play order.
    fn queue_entries(&self, user_id: i32) -> Result<Vec<QueueEntry>, QueueError>;
    /// Add a post to the queue, at the front or the tail.
    fn enqueue(&self, user_id: i32, post_id: i32, front: bool) -> Result<QueueItem, QueueError>;
    /// Remove a post from the queue.
    fn remove_from_queue(&self, user_id: i32, post_id: i32) -> Result<(), QueueError>;
    /// Move a queue item between indices.
    fn reorder_queue(&self, user_id: i32, from: usize, to: usize) -> Result<(), QueueError>;
    /// Delete the whole queue.
    fn clear_queue(&self, user_id: i32) -> Result<(), QueueError>;
    /// Get queue settings, creating defaults lazily.
    fn queue_settings(&self, user_id: i32) -> Result<QueueSettings, QueueError>;
    /// Patch queue settings.
    fn update_queue_settings(
        &self,
        user_id: i32,
        patch: QueueSettingsPatch,
    ) -> Result<QueueSettings, QueueError>;
    /// Add a playlist's playable tracks to the queue.
    fn add_playlist_to_queue(
        &self,
        user_id: i32,
        playlist_id: i32,
        shuffle: bool,
        play_next: bool,
    ) -> Result<PlaylistQueueOutcome, QueueError>;

    // Post lookups
    /// Get a post by ID.
    fn get_post(&self, post_id: i32) -> Option<Post>;

    // Playlist operations
    /// Get all playlists owned by a user.
    fn playlists_for(&self, user_id: i32) -> Vec<Playlist>;
    /// Get a playlist by ID.
    fn get_playlist(&self, playlist_id: i32) -> Option<Playlist>;
    /// Get a playlist's ordered tracks.
    fn playlist_tracks(&self, playlist_id: i32) -> Vec<Post>;
    /// Check playlist ownership.
    fn is_playlist_owner(&self, user_id: i32, playlist_id: i32) -> bool;
    /// Create a playlist.
    fn create_playlist(
        &self,
        user_id: i32,
        name: &str,
        description: Option<&str>,
    ) -> Result<Playlist, StoreError>;
    /// Append a post to a playlist.
    fn add_playlist_track(&self, playlist_id: i32, post_id: i32) -> Result<(), StoreError>;
}

/// Authenticated user extractor.
///
/// Use this in handlers to require authentication:
///
/// ```ignore
/// async fn handler(auth: AppAuth) -> Result<Json<...>, ApiError> {
///     // auth.user is guaranteed to be authenticated
///     // auth.state provides access to repositories
/// }
/// ```
#[derive(Clone)]
pub struct AppAuth {
    pub user: User,
    /// Reference to the auth state for accessing repositories
    pub state: Arc<dyn AuthState>,
}

impl<S> FromRequestParts<S> for AppAuth
where
    S: Send + Sync,
    Arc<dyn AuthState>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(ApiError::Unauthorized)?;

        let auth_state = Arc::<dyn AuthState>::from_ref(state);
        let user = auth_state
            .find_user_by_token(&token)
            .ok_or(ApiError::Unauthorized)?;

        Ok(AppAuth {
            user,
            state: auth_state,
        })
    }
}

/// Pull the token out of an `Authorization: Bearer ...` header.
fn bearer_token(parts: &Parts) -> Option<String> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        return None;
    }
    Some(token.to_string())
}

/// Database-backed authentication state.
#[derive(Clone)]
pub struct DatabaseAuthState {
    user_repo: UserRepository,
    post_repo: PostRepository,
    playlist_repo: PlaylistRepository,
    queue_repo: QueueRepository,
    settings_repo: QueueSettingsRepository,
}

impl DatabaseAuthState {
    /// Create a new database auth state.
    pub fn new(pool: DbPool) -> Self {
        Self {
            user_repo: UserRepository::new(pool.clone()),
            post_repo: PostRepository::new(pool.clone()),
            playlist_repo: PlaylistRepository::new(pool.clone()),
            queue_repo: QueueRepository::new(pool.clone()),
            settings_repo: QueueSettingsRepository::new(pool),
        }
    }

    /// Get a reference to the user repository.
    pub fn user_repo(&self) -> &UserRepository {
        &self.user_repo
    }
}

impl AuthState for DatabaseAuthState {
    fn find_user_by_token(&self, token: &str) -> Option<User> {
        self.user_repo.find_by_token(token).ok().flatten()
    }

    fn queue_entries(&self, user_id: i32) -> Result<Vec<QueueEntry>, QueueError> {
        self.queue_repo.entries(user_id)
    }

    fn enqueue(&self, user_id: i32, post_id: i32, front: bool) -> Result<QueueItem, QueueError> {
        self.queue_repo.enqueue(user_id, post_id, front)
    }

    fn remove_from_queue(&self, user_id: i32, post_id: i32) -> Result<(), QueueError> {
        self.queue_repo.remove(user_id, post_id)
    }

    fn reorder_queue(&self, user_id: i32, from: usize, to: usize) -> Result<(), QueueError> {
        self.queue_repo.reorder(user_id, from, to)
    }

    fn clear_queue(&self, user_id: i32) -> Result<(), QueueError> {
        self.queue_repo.clear(user_id)
    }

    fn queue_settings(&self, user_id: i32) -> Result<QueueSettings, QueueError> {
        self.settings_repo.get_or_create(user_id)
    }

    fn update_queue_settings(
        &self,
        user_id: i32,
        patch: QueueSettingsPatch,
    ) -> Result<QueueSettings, QueueError> {
        self.settings_repo.update(user_id, patch)
    }

    fn add_playlist_to_queue(
        &self,
        user_id: i32,
        playlist_id: i32,
        shuffle: bool,
        play_next: bool,
    ) -> Result<PlaylistQueueOutcome, QueueError> {
        self.queue_repo
            .add_playlist(user_id, playlist_id, shuffle, play_next)
    }

    fn get_post(&self, post_id: i32) -> Option<Post> {
        self.post_repo.find_by_id(post_id).ok().flatten()
    }

    fn playlists_for(&self, user_id: i32) -> Vec<Playlist> {
        self.playlist_repo.find_by_user(user_id).unwrap_or_default()
    }

    fn get_playlist(&self, playlist_id: i32) -> Option<Playlist> {
        self.playlist_repo.find_by_id(playlist_id).ok().flatten()
    }

    fn playlist_tracks(&self, playlist_id: i32) -> Vec<Post> {
        self.playlist_repo.tracks(playlist_id).unwrap_or_default()
    }

    fn is_playlist_owner(&self, user_id: i32, playlist_id: i32) -> bool {
        self.playlist_repo
            .is_owner(user_id, playlist_id)
            .unwrap_or(false)
    }

    fn create_playlist(
        &self,
        user_id: i32,
        name: &str,
        description: Option<&str>,
    ) -> Result<Playlist, StoreError> {
        self.playlist_repo.create(user_id, name, description)
    }

    fn add_playlist_track(&self, playlist_id: i32, post_id: i32) -> Result<(), StoreError> {
        self.playlist_repo.add_track(playlist_id, post_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts_with_auth(value: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/queue");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        let (parts, ()) = builder.body(()).unwrap().into_parts();
        parts
    }

    #[test]
    fn bearer_token_extracts_value() {
        let parts = parts_with_auth(Some("Bearer abc123"));
        assert_eq!(bearer_token(&parts), Some("abc123".to_string()));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let parts = parts_with_auth(Some("bearer abc123"));
        assert_eq!(bearer_token(&parts), Some("abc123".to_string()));
    }

    #[test]
    fn missing_header_yields_none() {
        let parts = parts_with_auth(None);
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn wrong_scheme_yields_none() {
        let parts = parts_with_auth(Some("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&parts), None);
    }

    #[test]
    fn empty_token_yields_none() {
        let parts = parts_with_auth(Some("Bearer "));
        assert_eq!(bearer_token(&parts), None);
    }
}
