//! Database connection pool and management.

use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool, PooledConnection};
use diesel::sqlite::SqliteConnection;
use std::time::Duration;

/// Type alias for our connection pool.
pub type DbPool = Pool<ConnectionManager<SqliteConnection>>;

/// Type alias for a pooled connection.
pub type DbConn = PooledConnection<ConnectionManager<SqliteConnection>>;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_url: String,
    /// Maximum number of connections in the pool.
    pub max_connections: u32,
    /// Connection timeout in seconds.
    pub connection_timeout: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: "wavshare.db".to_string(),
            max_connections: 10,
            connection_timeout: 30,
        }
    }
}

impl DbConfig {
    /// Create a new database configuration.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Default::default()
        }
    }

    /// Build a connection pool from this configuration.
    pub fn build_pool(&self) -> Result<DbPool, Box<dyn std::error::Error>> {
        let manager = ConnectionManager::<SqliteConnection>::new(&self.database_url);

        Pool::builder()
            .max_size(self.max_connections)
            .connection_timeout(Duration::from_secs(self.connection_timeout))
            .build(manager)
            .map_err(|e| Box::new(e) as Box<dyn std::error::Error>)
    }
}

/// Run the SQL migrations to set up the database schema.
pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // Create users table
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            username TEXT NOT NULL UNIQUE,
            password_hash TEXT NOT NULL,
            api_token TEXT,
            display_name TEXT NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_users_username ON users(username)")
        .execute(conn)?;

    // Unique index for bearer token lookups (only for non-null values)
    diesel::sql_query(
        "CREATE UNIQUE INDEX IF NOT EXISTS idx_users_api_token ON users(api_token) WHERE api_token IS NOT NULL"
    )
    .execute(conn)?;

    // Create posts table
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            title TEXT NOT NULL,
            audio_path TEXT UNIQUE,
            audio_content_type TEXT,
            youtube_url TEXT,
            duration_secs INTEGER NOT NULL DEFAULT 0,
            cover_art TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_posts_user_id ON posts(user_id)")
        .execute(conn)?;

    // Create playlists table
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS playlists (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            name TEXT NOT NULL,
            description TEXT,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query("CREATE INDEX IF NOT EXISTS idx_playlists_user_id ON playlists(user_id)")
        .execute(conn)?;

    // Create playlist_tracks table
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS playlist_tracks (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            playlist_id INTEGER NOT NULL REFERENCES playlists(id),
            post_id INTEGER NOT NULL REFERENCES posts(id),
            position INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_playlist_tracks_playlist_id ON playlist_tracks(playlist_id)"
    )
    .execute(conn)?;

    // Create queue_items table.
    // (user_id, post_id) is unique: a post cannot sit in one user's queue
    // twice. Position density is maintained by the renumbering pass in the
    // queue repository, not by a constraint, so renumbering never trips a
    // transient uniqueness violation mid-update.
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
            user_id INTEGER NOT NULL REFERENCES users(id),
            post_id INTEGER NOT NULL REFERENCES posts(id),
            position INTEGER NOT NULL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(user_id, post_id)
        )
        "#,
    )
    .execute(conn)?;

    diesel::sql_query(
        "CREATE INDEX IF NOT EXISTS idx_queue_items_user_position ON queue_items(user_id, position)"
    )
    .execute(conn)?;

    // Create queue_settings table (one row per user, created lazily)
    diesel::sql_query(
        r#"
        CREATE TABLE IF NOT EXISTS queue_settings (
            user_id INTEGER PRIMARY KEY NOT NULL REFERENCES users(id),
            shuffle_mode BOOLEAN NOT NULL DEFAULT FALSE,
            repeat_mode TEXT NOT NULL DEFAULT 'off',
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(conn)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DbConfig::default();
        assert_eq!(config.database_url, "wavshare.db");
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_in_memory_pool() {
        let config = DbConfig::new(":memory:");
        let pool = config.build_pool();
        assert!(pool.is_ok());
    }

    #[test]
    fn test_migrations_run_twice() {
        let config = DbConfig::new(":memory:");
        let pool = config.build_pool().unwrap();
        let mut conn = pool.get().unwrap();
        run_migrations(&mut conn).unwrap();
        // CREATE IF NOT EXISTS keeps a second pass harmless
        run_migrations(&mut conn).unwrap();
    }
}
