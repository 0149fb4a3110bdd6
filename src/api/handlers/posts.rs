//! Post retrieval handlers (metadata and audio streaming).

use axum::{
    Json,
    body::Body,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
};
use std::path::Path as FilePath;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::api::auth::AppAuth;
use crate::api::error::ApiError;
use crate::models::post::PostResponse;

/// GET /posts/{id}
///
/// Returns post metadata.
pub async fn get_post(
    axum::extract::Path(post_id): axum::extract::Path<i32>,
    auth: AppAuth,
) -> Result<Json<PostResponse>, ApiError> {
    let post = auth
        .state
        .get_post(post_id)
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    Ok(Json(PostResponse::from(&post)))
}

/// GET /posts/{id}/stream
///
/// Streams the post's stored audio file. Supports HTTP range requests for
/// seeking within the file. Posts without a stored file cannot be streamed.
pub async fn stream_post(
    axum::extract::Path(post_id): axum::extract::Path<i32>,
    headers: HeaderMap,
    auth: AppAuth,
) -> Response {
    let post = match auth.state.get_post(post_id) {
        Some(post) => post,
        None => return ApiError::NotFound("Post not found".to_string()).into_response(),
    };

    let Some(audio_path) = post.audio_path.as_deref() else {
        return ApiError::Validation("Post has no stored audio file".to_string()).into_response();
    };

    let path = FilePath::new(audio_path);
    if !path.exists() {
        return ApiError::NotFound("Audio file not found on disk".to_string()).into_response();
    }

    let file = match File::open(path).await {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("failed to open audio file {audio_path}: {e}");
            return ApiError::Internal.into_response();
        }
    };

    let metadata = match file.metadata().await {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("failed to read audio file metadata {audio_path}: {e}");
            return ApiError::Internal.into_response();
        }
    };

    let file_size = metadata.len();
    let content_type = post
        .audio_content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());

    // Check for Range header to support seeking
    let range_header = headers.get(header::RANGE).and_then(|v| v.to_str().ok());

    if let Some(range) = range_header {
        // Parse range header (format: "bytes=start-end" or "bytes=start-")
        if let Some(range_spec) = range.strip_prefix("bytes=") {
            let parts: Vec<&str> = range_spec.split('-').collect();
            if parts.len() == 2 {
                let start: u64 = parts[0].parse().unwrap_or(0);
                let end: u64 = if parts[1].is_empty() {
                    file_size - 1
                } else {
                    parts[1].parse().unwrap_or(file_size - 1)
                };

                // Validate range
                if start >= file_size {
                    return (
                        StatusCode::RANGE_NOT_SATISFIABLE,
                        [(header::CONTENT_RANGE, format!("bytes */{}", file_size))],
                    )
                        .into_response();
                }

                let end = end.min(file_size - 1);
                let content_length = end - start + 1;

                // Seek to start position
                let mut file = file;
                if file.seek(std::io::SeekFrom::Start(start)).await.is_err() {
                    tracing::warn!("failed to seek in audio file {audio_path}");
                    return ApiError::Internal.into_response();
                }

                // Create a limited reader for the range
                let stream = ReaderStream::new(file.take(content_length));
                let body = Body::from_stream(stream);

                return (
                    StatusCode::PARTIAL_CONTENT,
                    [
                        (header::CONTENT_TYPE, content_type),
                        (header::CONTENT_LENGTH, content_length.to_string()),
                        (
                            header::CONTENT_RANGE,
                            format!("bytes {}-{}/{}", start, end, file_size),
                        ),
                        (header::ACCEPT_RANGES, "bytes".to_string()),
                    ],
                    body,
                )
                    .into_response();
            }
        }
    }

    // No range requested, stream entire file
    let stream = ReaderStream::new(file);
    let body = Body::from_stream(stream);

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_LENGTH, file_size.to_string()),
            (header::ACCEPT_RANGES, "bytes".to_string()),
        ],
        body,
    )
        .into_response()
}
