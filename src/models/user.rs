//! User model and related types.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::crypto::password::verify_password;

/// A user in the system (domain model).
#[derive(Debug, Clone)]
pub struct User {
    pub id: i32,
    pub username: String,
    /// Argon2 hashed password.
    pub password_hash: String,
    /// Bearer token for API authentication. Minted via the CLI; a user
    /// without a token cannot call the API.
    pub api_token: Option<String>,
    /// Name shown as the "artist" on posts this user uploads.
    pub display_name: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl User {
    /// Verify password using Argon2.
    pub fn verify_password(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash).unwrap_or(false)
    }
}

/// JSON user response format (for GET /me).
#[derive(Debug, Serialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i32,
    pub username: String,
    pub display_name: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            display_name: user.display_name.clone(),
        }
    }
}
