//! Play queue API handlers (list, enqueue, remove, reorder, clear, settings).

use axum::Json;
use axum::extract::Path;
use serde::{Deserialize, Serialize};

use crate::api::auth::AppAuth;
use crate::api::error::ApiError;
use crate::models::queue::{
    QueueEntry, QueueItemResponse, QueueSettings, QueueSettingsPatch,
};

/// Response for GET /queue: the full ordered queue plus settings.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueResponse {
    pub queue: Vec<QueueEntry>,
    pub settings: QueueSettings,
}

/// Response for mutations that only report success.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response for enqueue operations.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueResponse {
    pub message: String,
    pub queue_item: QueueItemResponse,
}

/// GET /queue
///
/// Returns the user's queue in play order together with their settings.
pub async fn get_queue(auth: AppAuth) -> Result<Json<QueueResponse>, ApiError> {
    let queue = auth.state.queue_entries(auth.user.id)?;
    let settings = auth.state.queue_settings(auth.user.id)?;

    Ok(Json(QueueResponse { queue, settings }))
}

/// Request body for enqueue operations.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueBody {
    pub post_id: i32,
}

/// POST /queue
///
/// Appends a post to the end of the queue.
pub async fn enqueue(
    auth: AppAuth,
    Json(body): Json<EnqueueBody>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let item = auth.state.enqueue(auth.user.id, body.post_id, false)?;

    Ok(Json(EnqueueResponse {
        message: "Added to queue".to_string(),
        queue_item: QueueItemResponse::from(&item),
    }))
}

/// POST /queue/next
///
/// Inserts a post at the front of the queue, shifting everything else down.
pub async fn enqueue_next(
    auth: AppAuth,
    Json(body): Json<EnqueueBody>,
) -> Result<Json<EnqueueResponse>, ApiError> {
    let item = auth.state.enqueue(auth.user.id, body.post_id, true)?;

    Ok(Json(EnqueueResponse {
        message: "Playing next".to_string(),
        queue_item: QueueItemResponse::from(&item),
    }))
}

/// DELETE /queue/{post_id}
///
/// Removes a post from the queue and closes the position gap.
pub async fn remove_from_queue(
    Path(post_id): Path<i32>,
    auth: AppAuth,
) -> Result<Json<MessageResponse>, ApiError> {
    auth.state.remove_from_queue(auth.user.id, post_id)?;

    Ok(Json(MessageResponse {
        message: "Removed from queue".to_string(),
    }))
}

/// Request body for reorder.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderBody {
    pub from_index: i64,
    pub to_index: i64,
}

/// PUT /queue/reorder
///
/// Moves the item at `fromIndex` to `toIndex` (array-splice semantics).
pub async fn reorder_queue(
    auth: AppAuth,
    Json(body): Json<ReorderBody>,
) -> Result<Json<MessageResponse>, ApiError> {
    if body.from_index < 0 || body.to_index < 0 {
        return Err(ApiError::Validation(
            "fromIndex and toIndex must be non-negative".to_string(),
        ));
    }

    auth.state.reorder_queue(
        auth.user.id,
        body.from_index as usize,
        body.to_index as usize,
    )?;

    Ok(Json(MessageResponse {
        message: "Queue reordered".to_string(),
    }))
}

/// DELETE /queue
///
/// Empties the queue.
pub async fn clear_queue(auth: AppAuth) -> Result<Json<MessageResponse>, ApiError> {
    auth.state.clear_queue(auth.user.id)?;

    Ok(Json(MessageResponse {
        message: "Queue cleared".to_string(),
    }))
}

/// GET /queue/settings
///
/// Returns the user's shuffle/repeat settings, creating defaults on first
/// access.
pub async fn get_queue_settings(auth: AppAuth) -> Result<Json<QueueSettings>, ApiError> {
    let settings = auth.state.queue_settings(auth.user.id)?;

    Ok(Json(settings))
}

/// PUT /queue/settings
///
/// Patches the user's settings; only supplied fields change.
pub async fn update_queue_settings(
    auth: AppAuth,
    Json(patch): Json<QueueSettingsPatch>,
) -> Result<Json<QueueSettings>, ApiError> {
    let settings = auth.state.update_queue_settings(auth.user.id, patch)?;

    Ok(Json(settings))
}
