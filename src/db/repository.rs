//! Database repositories for users, posts, playlists, and the play queue.

use std::collections::HashSet;

use chrono::NaiveDateTime;
use diesel::prelude::*;
use rand::seq::SliceRandom;
use thiserror::Error;

use crate::db::DbPool;
use crate::db::schema::{playlist_tracks, playlists, posts, queue_items, queue_settings, users};
use crate::models::playlist::Playlist;
use crate::models::post::{NewPost, Post};
use crate::models::queue::{
    PlaylistQueueOutcome, QUEUE_CAPACITY, QueueEntry, QueueItem, QueueSettings,
    QueueSettingsPatch, RepeatMode,
};
use crate::models::User;

/// Errors that can occur during user repository operations.
#[derive(Debug, Error)]
pub enum UserRepoError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Username already exists: {0}")]
    UsernameExists(String),
}

/// Database row representation for users.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct UserRow {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub api_token: Option<String>,
    pub display_name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            api_token: row.api_token,
            display_name: row.display_name,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Data for inserting a new user.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub password_hash: &'a str,
    pub display_name: &'a str,
}

impl<'a> NewUser<'a> {
    pub fn new(username: &'a str, password_hash: &'a str, display_name: &'a str) -> Self {
        Self {
            username,
            password_hash,
            display_name,
        }
    }
}

/// Repository for user database operations.
#[derive(Clone)]
pub struct UserRepository {
    pool: DbPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a user by username.
    pub fn find_by_username(&self, username: &str) -> Result<Option<User>, UserRepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::username.eq(username))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Find a user by ID.
    pub fn find_by_id(&self, user_id: i32) -> Result<Option<User>, UserRepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::id.eq(user_id))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Find a user by bearer token.
    pub fn find_by_token(&self, token: &str) -> Result<Option<User>, UserRepoError> {
        let mut conn = self.pool.get()?;

        let result = users::table
            .filter(users::api_token.eq(token))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(User::from))
    }

    /// Create a new user.
    pub fn create(&self, new_user: &NewUser) -> Result<User, UserRepoError> {
        let mut conn = self.pool.get()?;

        // Check if username already exists
        let existing = users::table
            .filter(users::username.eq(new_user.username))
            .count()
            .get_result::<i64>(&mut conn)?;

        if existing > 0 {
            return Err(UserRepoError::UsernameExists(new_user.username.to_string()));
        }

        diesel::insert_into(users::table)
            .values(new_user)
            .execute(&mut conn)?;

        // Fetch the created user
        let user = users::table
            .filter(users::username.eq(new_user.username))
            .select(UserRow::as_select())
            .first(&mut conn)?;

        Ok(User::from(user))
    }

    /// Check if any users exist in the database.
    pub fn has_users(&self) -> Result<bool, UserRepoError> {
        let mut conn = self.pool.get()?;

        let count = users::table.count().get_result::<i64>(&mut conn)?;

        Ok(count > 0)
    }

    /// Set or clear a user's bearer token.
    pub fn set_token(&self, user_id: i32, token: Option<&str>) -> Result<bool, UserRepoError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(users::table.filter(users::id.eq(user_id)))
            .set(users::api_token.eq(token))
            .execute(&mut conn)?;

        Ok(updated > 0)
    }

    /// Generate a new bearer token for a user.
    /// Returns the generated token.
    pub fn generate_token(&self, user_id: i32) -> Result<String, UserRepoError> {
        use rand_core::{OsRng, RngCore};

        // Generate a random 32-byte token and encode as hex (64 characters)
        let mut token_bytes = [0u8; 32];
        OsRng.fill_bytes(&mut token_bytes);
        let token = hex::encode(token_bytes);

        self.set_token(user_id, Some(&token))?;
        Ok(token)
    }

    /// Revoke a user's bearer token.
    pub fn revoke_token(&self, user_id: i32) -> Result<bool, UserRepoError> {
        self.set_token(user_id, None)
    }
}

// ============================================================================
// Post Repository
// ============================================================================

/// Errors that can occur during post and playlist repository operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),
}

/// Database row representation for posts.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = posts)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct PostRow {
    pub id: i32,
    pub user_id: i32,
    pub title: String,
    pub audio_path: Option<String>,
    pub audio_content_type: Option<String>,
    pub youtube_url: Option<String>,
    pub duration_secs: i32,
    pub cover_art: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<PostRow> for Post {
    fn from(row: PostRow) -> Self {
        Post {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            audio_path: row.audio_path,
            audio_content_type: row.audio_content_type,
            youtube_url: row.youtube_url,
            duration_secs: row.duration_secs,
            cover_art: row.cover_art,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Data for inserting a new post.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = posts)]
struct NewPostRow<'a> {
    user_id: i32,
    title: &'a str,
    audio_path: Option<&'a str>,
    audio_content_type: Option<&'a str>,
    youtube_url: Option<&'a str>,
    duration_secs: i32,
    cover_art: Option<&'a str>,
}

impl<'a> From<&'a NewPost> for NewPostRow<'a> {
    fn from(post: &'a NewPost) -> Self {
        Self {
            user_id: post.user_id,
            title: &post.title,
            audio_path: post.audio_path.as_deref(),
            audio_content_type: post.audio_content_type.as_deref(),
            youtube_url: post.youtube_url.as_deref(),
            duration_secs: post.duration_secs,
            cover_art: post.cover_art.as_deref(),
        }
    }
}

/// Repository for post database operations.
#[derive(Clone)]
pub struct PostRepository {
    pool: DbPool,
}

impl PostRepository {
    /// Create a new post repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a post by ID.
    pub fn find_by_id(&self, post_id: i32) -> Result<Option<Post>, StoreError> {
        let mut conn = self.pool.get()?;

        let result = posts::table
            .filter(posts::id.eq(post_id))
            .select(PostRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Post::from))
    }

    /// Find a post by the path of its stored audio file.
    pub fn find_by_audio_path(&self, path: &str) -> Result<Option<Post>, StoreError> {
        let mut conn = self.pool.get()?;

        let result = posts::table
            .filter(posts::audio_path.eq(path))
            .select(PostRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Post::from))
    }

    /// Find all posts by a user, newest first.
    pub fn find_by_user(&self, user_id: i32) -> Result<Vec<Post>, StoreError> {
        let mut conn = self.pool.get()?;

        let results = posts::table
            .filter(posts::user_id.eq(user_id))
            .select(PostRow::as_select())
            .order(posts::created_at.desc())
            .load(&mut conn)?;

        Ok(results.into_iter().map(Post::from).collect())
    }

    /// Create a new post.
    pub fn create(&self, new_post: &NewPost) -> Result<Post, StoreError> {
        let mut conn = self.pool.get()?;

        conn.immediate_transaction(|conn| {
            if let Some(path) = new_post.audio_path.as_deref() {
                let existing = posts::table
                    .filter(posts::audio_path.eq(path))
                    .count()
                    .get_result::<i64>(conn)?;

                if existing > 0 {
                    return Err(StoreError::AlreadyExists(path.to_string()));
                }
            }

            let row: NewPostRow = new_post.into();
            diesel::insert_into(posts::table)
                .values(&row)
                .execute(conn)?;

            // Fetch the created post (same connection, same transaction)
            let post = posts::table
                .select(PostRow::as_select())
                .order(posts::id.desc())
                .first(conn)?;

            Ok(Post::from(post))
        })
    }
}

// ============================================================================
// Playlist Repository
// ============================================================================

/// Database row representation for playlists.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = playlists)]
pub struct PlaylistRow {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub description: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<PlaylistRow> for Playlist {
    fn from(row: PlaylistRow) -> Self {
        Playlist {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = playlists)]
struct NewPlaylistRow<'a> {
    user_id: i32,
    name: &'a str,
    description: Option<&'a str>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = playlist_tracks)]
struct NewPlaylistTrackRow {
    playlist_id: i32,
    post_id: i32,
    position: i32,
}

/// Repository for playlist database operations.
#[derive(Clone)]
pub struct PlaylistRepository {
    pool: DbPool,
}

impl PlaylistRepository {
    /// Create a new playlist repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Find a playlist by ID.
    pub fn find_by_id(&self, playlist_id: i32) -> Result<Option<Playlist>, StoreError> {
        let mut conn = self.pool.get()?;

        let result = playlists::table
            .filter(playlists::id.eq(playlist_id))
            .select(PlaylistRow::as_select())
            .first(&mut conn)
            .optional()?;

        Ok(result.map(Playlist::from))
    }

    /// Find all playlists owned by a user.
    pub fn find_by_user(&self, user_id: i32) -> Result<Vec<Playlist>, StoreError> {
        let mut conn = self.pool.get()?;

        let results = playlists::table
            .filter(playlists::user_id.eq(user_id))
            .select(PlaylistRow::as_select())
            .order(playlists::name.asc())
            .load(&mut conn)?;

        Ok(results.into_iter().map(Playlist::from).collect())
    }

    /// Check whether a user owns a playlist.
    pub fn is_owner(&self, user_id: i32, playlist_id: i32) -> Result<bool, StoreError> {
        let mut conn = self.pool.get()?;

        let count = playlists::table
            .filter(playlists::id.eq(playlist_id))
            .filter(playlists::user_id.eq(user_id))
            .count()
            .get_result::<i64>(&mut conn)?;

        Ok(count > 0)
    }

    /// Create a new playlist.
    pub fn create(
        &self,
        user_id: i32,
        name: &str,
        description: Option<&str>,
    ) -> Result<Playlist, StoreError> {
        let mut conn = self.pool.get()?;

        conn.immediate_transaction(|conn| {
            let row = NewPlaylistRow {
                user_id,
                name,
                description,
            };
            diesel::insert_into(playlists::table)
                .values(&row)
                .execute(conn)?;

            let playlist = playlists::table
                .select(PlaylistRow::as_select())
                .order(playlists::id.desc())
                .first(conn)?;

            Ok(Playlist::from(playlist))
        })
    }

    /// Get the ordered tracks of a playlist.
    pub fn tracks(&self, playlist_id: i32) -> Result<Vec<Post>, StoreError> {
        let mut conn = self.pool.get()?;

        let results = playlist_tracks::table
            .inner_join(posts::table)
            .filter(playlist_tracks::playlist_id.eq(playlist_id))
            .order(playlist_tracks::position.asc())
            .select(PostRow::as_select())
            .load(&mut conn)?;

        Ok(results.into_iter().map(Post::from).collect())
    }

    /// Append a post to the end of a playlist.
    pub fn add_track(&self, playlist_id: i32, post_id: i32) -> Result<(), StoreError> {
        let mut conn = self.pool.get()?;

        conn.immediate_transaction(|conn| {
            let exists = playlists::table
                .filter(playlists::id.eq(playlist_id))
                .count()
                .get_result::<i64>(conn)?;
            if exists == 0 {
                return Err(StoreError::NotFound(format!("playlist {playlist_id}")));
            }

            let post_exists = posts::table
                .filter(posts::id.eq(post_id))
                .count()
                .get_result::<i64>(conn)?;
            if post_exists == 0 {
                return Err(StoreError::NotFound(format!("post {post_id}")));
            }

            let next_position = playlist_tracks::table
                .filter(playlist_tracks::playlist_id.eq(playlist_id))
                .select(diesel::dsl::max(playlist_tracks::position))
                .first::<Option<i32>>(conn)?
                .map_or(0, |max| max + 1);

            let row = NewPlaylistTrackRow {
                playlist_id,
                post_id,
                position: next_position,
            };
            diesel::insert_into(playlist_tracks::table)
                .values(&row)
                .execute(conn)?;

            Ok(())
        })
    }
}

// ============================================================================
// Queue Repository
// ============================================================================

/// Errors that can occur during queue operations.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("Connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    #[error("Post not found")]
    PostNotFound,

    #[error("Post is not in the queue")]
    NotQueued,

    #[error("Post has no stored audio file and cannot be queued")]
    NotPlayable,

    #[error("Post is already in the queue")]
    Duplicate,

    #[error("Queue is full (limit {QUEUE_CAPACITY} tracks)")]
    QueueFull,

    #[error("Index {index} is out of range for a queue of {len} items")]
    InvalidIndex { index: usize, len: usize },

    #[error("Playlist not found")]
    PlaylistNotFound,

    #[error("Playlist has no playable tracks")]
    EmptyPlaylist,

    #[error("All playlist tracks are already in the queue")]
    AllDuplicates,
}

/// Database row representation for queue items.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = queue_items)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct QueueItemRow {
    pub id: i32,
    pub user_id: i32,
    pub post_id: i32,
    pub position: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl From<QueueItemRow> for QueueItem {
    fn from(row: QueueItemRow) -> Self {
        QueueItem {
            id: row.id,
            user_id: row.user_id,
            post_id: row.post_id,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = queue_items)]
struct NewQueueItemRow {
    user_id: i32,
    post_id: i32,
    position: i32,
}

/// Repository for the per-user play queue.
///
/// Every mutating operation runs inside a single immediate transaction so
/// the renumbering pass cannot interleave with a concurrent mutation for the
/// same user. Positions are kept dense and zero-based by renumbering after
/// every removal or reorder.
#[derive(Clone)]
pub struct QueueRepository {
    pool: DbPool,
}

impl QueueRepository {
    /// Create a new queue repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a user's queue items in play order.
    pub fn items(&self, user_id: i32) -> Result<Vec<QueueItem>, QueueError> {
        let mut conn = self.pool.get()?;

        let results = queue_items::table
            .filter(queue_items::user_id.eq(user_id))
            .select(QueueItemRow::as_select())
            .order(queue_items::position.asc())
            .load(&mut conn)?;

        Ok(results.into_iter().map(QueueItem::from).collect())
    }

    /// Get a user's queue joined to post and uploader, in play order.
    pub fn entries(&self, user_id: i32) -> Result<Vec<QueueEntry>, QueueError> {
        let mut conn = self.pool.get()?;

        let rows = queue_items::table
            .inner_join(posts::table.inner_join(users::table))
            .filter(queue_items::user_id.eq(user_id))
            .order(queue_items::position.asc())
            .select((
                QueueItemRow::as_select(),
                PostRow::as_select(),
                UserRow::as_select(),
            ))
            .load::<(QueueItemRow, PostRow, UserRow)>(&mut conn)?;

        Ok(rows
            .into_iter()
            .map(|(item, post, uploader)| QueueEntry {
                id: item.id,
                post_id: item.post_id,
                position: item.position,
                title: post.title,
                user_id: uploader.id,
                artist: uploader.display_name,
                duration_secs: post.duration_secs,
                cover_art: post.cover_art,
            })
            .collect())
    }

    /// Add a post to the queue.
    ///
    /// `front` inserts at position 0 and shifts everything else down one;
    /// otherwise the post is appended after the current tail.
    pub fn enqueue(&self, user_id: i32, post_id: i32, front: bool) -> Result<QueueItem, QueueError> {
        let mut conn = self.pool.get()?;

        conn.immediate_transaction(|conn| {
            let post = posts::table
                .filter(posts::id.eq(post_id))
                .select(PostRow::as_select())
                .first(conn)
                .optional()?
                .ok_or(QueueError::PostNotFound)?;

            if post.audio_path.is_none() {
                return Err(QueueError::NotPlayable);
            }

            let already_queued = queue_items::table
                .filter(queue_items::user_id.eq(user_id))
                .filter(queue_items::post_id.eq(post_id))
                .count()
                .get_result::<i64>(conn)?;
            if already_queued > 0 {
                return Err(QueueError::Duplicate);
            }

            let count = queue_items::table
                .filter(queue_items::user_id.eq(user_id))
                .count()
                .get_result::<i64>(conn)?;
            if count as usize >= QUEUE_CAPACITY {
                return Err(QueueError::QueueFull);
            }

            let position = if front {
                diesel::update(queue_items::table.filter(queue_items::user_id.eq(user_id)))
                    .set(queue_items::position.eq(queue_items::position + 1))
                    .execute(conn)?;
                0
            } else {
                queue_items::table
                    .filter(queue_items::user_id.eq(user_id))
                    .select(diesel::dsl::max(queue_items::position))
                    .first::<Option<i32>>(conn)?
                    .map_or(0, |max| max + 1)
            };

            let row = NewQueueItemRow {
                user_id,
                post_id,
                position,
            };
            diesel::insert_into(queue_items::table)
                .values(&row)
                .execute(conn)?;

            let created = queue_items::table
                .filter(queue_items::user_id.eq(user_id))
                .filter(queue_items::post_id.eq(post_id))
                .select(QueueItemRow::as_select())
                .first(conn)?;

            Ok(QueueItem::from(created))
        })
    }

    /// Remove a post from the queue and close the position gap.
    pub fn remove(&self, user_id: i32, post_id: i32) -> Result<(), QueueError> {
        let mut conn = self.pool.get()?;

        conn.immediate_transaction(|conn| {
            let deleted = diesel::delete(
                queue_items::table
                    .filter(queue_items::user_id.eq(user_id))
                    .filter(queue_items::post_id.eq(post_id)),
            )
            .execute(conn)?;

            if deleted == 0 {
                return Err(QueueError::NotQueued);
            }

            Self::renumber(conn, user_id)?;
            Ok(())
        })
    }

    /// Move the item at `from_index` to `to_index`, array-splice style: the
    /// item is pulled out and reinserted, so everything between the two
    /// indices shifts by one.
    pub fn reorder(
        &self,
        user_id: i32,
        from_index: usize,
        to_index: usize,
    ) -> Result<(), QueueError> {
        let mut conn = self.pool.get()?;

        conn.immediate_transaction(|conn| {
            let ids: Vec<i32> = queue_items::table
                .filter(queue_items::user_id.eq(user_id))
                .order(queue_items::position.asc())
                .select(queue_items::id)
                .load(conn)?;

            let len = ids.len();
            if from_index >= len {
                return Err(QueueError::InvalidIndex {
                    index: from_index,
                    len,
                });
            }
            if to_index >= len {
                return Err(QueueError::InvalidIndex {
                    index: to_index,
                    len,
                });
            }
            if from_index == to_index {
                return Ok(());
            }

            let mut reordered = ids;
            let moved = reordered.remove(from_index);
            reordered.insert(to_index.min(reordered.len()), moved);

            Self::write_order(conn, &reordered)?;
            Ok(())
        })
    }

    /// Delete every item in a user's queue.
    pub fn clear(&self, user_id: i32) -> Result<(), QueueError> {
        let mut conn = self.pool.get()?;

        diesel::delete(queue_items::table.filter(queue_items::user_id.eq(user_id)))
            .execute(&mut conn)?;

        Ok(())
    }

    /// Add a playlist's playable tracks to the queue as one ordered block.
    ///
    /// Tracks already in the queue are skipped rather than rejected; the
    /// outcome reports how many went in and how many were skipped. With
    /// `shuffle` the block is Fisher-Yates shuffled before insertion; with
    /// `play_next` the block lands at the front (its internal order
    /// preserved), otherwise at the tail.
    pub fn add_playlist(
        &self,
        user_id: i32,
        playlist_id: i32,
        shuffle: bool,
        play_next: bool,
    ) -> Result<PlaylistQueueOutcome, QueueError> {
        let mut conn = self.pool.get()?;

        conn.immediate_transaction(|conn| {
            let playlist_exists = playlists::table
                .filter(playlists::id.eq(playlist_id))
                .count()
                .get_result::<i64>(conn)?;
            if playlist_exists == 0 {
                return Err(QueueError::PlaylistNotFound);
            }

            let tracks = playlist_tracks::table
                .inner_join(posts::table)
                .filter(playlist_tracks::playlist_id.eq(playlist_id))
                .order(playlist_tracks::position.asc())
                .select(PostRow::as_select())
                .load::<PostRow>(conn)?;

            let playable: Vec<i32> = tracks
                .iter()
                .filter(|post| post.audio_path.is_some())
                .map(|post| post.id)
                .collect();
            if playable.is_empty() {
                return Err(QueueError::EmptyPlaylist);
            }

            let queued: HashSet<i32> = queue_items::table
                .filter(queue_items::user_id.eq(user_id))
                .select(queue_items::post_id)
                .load::<i32>(conn)?
                .into_iter()
                .collect();

            // Skip tracks already queued, and repeats within the playlist
            // itself, so the (user, post) uniqueness invariant holds.
            let mut seen = queued.clone();
            let mut fresh: Vec<i32> = Vec::new();
            for post_id in &playable {
                if seen.insert(*post_id) {
                    fresh.push(*post_id);
                }
            }
            let skipped_count = playable.len() - fresh.len();

            if fresh.is_empty() {
                return Err(QueueError::AllDuplicates);
            }

            if queued.len() + fresh.len() > QUEUE_CAPACITY {
                return Err(QueueError::QueueFull);
            }

            if shuffle {
                fresh.shuffle(&mut rand::thread_rng());
            }

            let base = if play_next {
                let block = fresh.len() as i32;
                diesel::update(queue_items::table.filter(queue_items::user_id.eq(user_id)))
                    .set(queue_items::position.eq(queue_items::position + block))
                    .execute(conn)?;
                0
            } else {
                queue_items::table
                    .filter(queue_items::user_id.eq(user_id))
                    .select(diesel::dsl::max(queue_items::position))
                    .first::<Option<i32>>(conn)?
                    .map_or(0, |max| max + 1)
            };

            let rows: Vec<NewQueueItemRow> = fresh
                .iter()
                .enumerate()
                .map(|(offset, post_id)| NewQueueItemRow {
                    user_id,
                    post_id: *post_id,
                    position: base + offset as i32,
                })
                .collect();
            diesel::insert_into(queue_items::table)
                .values(&rows)
                .execute(conn)?;

            Ok(PlaylistQueueOutcome {
                added_count: fresh.len(),
                skipped_count,
            })
        })
    }

    /// Rewrite positions 0..N-1 in current play order. Run after every
    /// removal so positions stay dense.
    fn renumber(conn: &mut SqliteConnection, user_id: i32) -> QueryResult<()> {
        let ids: Vec<i32> = queue_items::table
            .filter(queue_items::user_id.eq(user_id))
            .order(queue_items::position.asc())
            .select(queue_items::id)
            .load(conn)?;

        Self::write_order(conn, &ids)
    }

    /// Write positions 0..N-1 following the given item order.
    fn write_order(conn: &mut SqliteConnection, ids: &[i32]) -> QueryResult<()> {
        let now = chrono::Utc::now().naive_utc();
        for (index, item_id) in ids.iter().enumerate() {
            diesel::update(queue_items::table.filter(queue_items::id.eq(item_id)))
                .set((
                    queue_items::position.eq(index as i32),
                    queue_items::updated_at.eq(now),
                ))
                .execute(conn)?;
        }
        Ok(())
    }
}

// ============================================================================
// Queue Settings Repository
// ============================================================================

/// Database row representation for queue settings.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = queue_settings)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
struct QueueSettingsRow {
    #[allow(dead_code)]
    user_id: i32,
    shuffle_mode: bool,
    repeat_mode: String,
    #[allow(dead_code)]
    created_at: NaiveDateTime,
    #[allow(dead_code)]
    updated_at: NaiveDateTime,
}

impl From<QueueSettingsRow> for QueueSettings {
    fn from(row: QueueSettingsRow) -> Self {
        QueueSettings {
            shuffle_mode: row.shuffle_mode,
            repeat_mode: RepeatMode::from_str_lossy(&row.repeat_mode),
        }
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = queue_settings)]
struct NewQueueSettingsRow {
    user_id: i32,
    shuffle_mode: bool,
    repeat_mode: String,
}

/// Repository for per-user queue settings. The settings row is created
/// lazily with defaults on first read or write.
#[derive(Clone)]
pub struct QueueSettingsRepository {
    pool: DbPool,
}

impl QueueSettingsRepository {
    /// Create a new queue settings repository.
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get a user's settings, creating the default row if absent.
    pub fn get_or_create(&self, user_id: i32) -> Result<QueueSettings, QueueError> {
        let mut conn = self.pool.get()?;

        conn.immediate_transaction(|conn| Self::get_or_create_in(conn, user_id))
    }

    /// Apply a partial update; only supplied fields change.
    pub fn update(
        &self,
        user_id: i32,
        patch: QueueSettingsPatch,
    ) -> Result<QueueSettings, QueueError> {
        let mut conn = self.pool.get()?;

        conn.immediate_transaction(|conn| {
            let current = Self::get_or_create_in(conn, user_id)?;

            let next = QueueSettings {
                shuffle_mode: patch.shuffle_mode.unwrap_or(current.shuffle_mode),
                repeat_mode: patch.repeat_mode.unwrap_or(current.repeat_mode),
            };

            diesel::update(queue_settings::table.filter(queue_settings::user_id.eq(user_id)))
                .set((
                    queue_settings::shuffle_mode.eq(next.shuffle_mode),
                    queue_settings::repeat_mode.eq(next.repeat_mode.as_str()),
                    queue_settings::updated_at.eq(chrono::Utc::now().naive_utc()),
                ))
                .execute(conn)?;

            Ok(next)
        })
    }

    fn get_or_create_in(
        conn: &mut SqliteConnection,
        user_id: i32,
    ) -> Result<QueueSettings, QueueError> {
        let existing = queue_settings::table
            .filter(queue_settings::user_id.eq(user_id))
            .select(QueueSettingsRow::as_select())
            .first(conn)
            .optional()?;

        if let Some(row) = existing {
            return Ok(QueueSettings::from(row));
        }

        let defaults = QueueSettings::default();
        let row = NewQueueSettingsRow {
            user_id,
            shuffle_mode: defaults.shuffle_mode,
            repeat_mode: defaults.repeat_mode.as_str().to_string(),
        };
        diesel::insert_into(queue_settings::table)
            .values(&row)
            .execute(conn)?;

        Ok(defaults)
    }
}
