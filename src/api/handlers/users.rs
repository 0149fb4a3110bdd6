//! User-facing account handlers.

use axum::Json;

use crate::api::auth::AppAuth;
use crate::models::user::UserResponse;

/// GET /me
///
/// Returns the authenticated user.
pub async fn me(auth: AppAuth) -> Json<UserResponse> {
    Json(UserResponse::from(&auth.user))
}
