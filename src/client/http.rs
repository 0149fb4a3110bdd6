//! HTTP client for the queue REST surface.

use reqwest::StatusCode;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::models::queue::{
    PlaylistQueueOutcome, QueueEntry, QueueItemResponse, QueueSettings, QueueSettingsPatch,
};

/// Errors raised by the queue client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never completed (DNS, connection, timeout, body decode).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server rejected the operation.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

/// The server's view of a queue: ordered entries plus settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueSnapshot {
    pub queue: Vec<QueueEntry>,
    pub settings: QueueSettings,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EnqueueReply {
    #[allow(dead_code)]
    message: String,
    queue_item: QueueItemResponse,
}

#[derive(Debug, Deserialize)]
struct MessageReply {
    #[allow(dead_code)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddPlaylistReply {
    #[allow(dead_code)]
    message: String,
    added_count: usize,
    skipped_count: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    message: String,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct EnqueueBody {
    post_id: i32,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct ReorderBody {
    from_index: usize,
    to_index: usize,
}

#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
struct AddPlaylistBody {
    shuffle: bool,
    play_next: bool,
}

/// Bearer-authenticated client for the queue endpoints.
#[derive(Clone)]
pub struct QueueClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl QueueClient {
    /// Create a client for a server base URL (e.g. `http://localhost:4533`).
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
            token: token.into(),
        }
    }

    /// Stream URL for a post; this is what playback tracks point at.
    pub fn stream_url(&self, post_id: i32) -> String {
        format!("{}/posts/{}/stream", self.base_url, post_id)
    }

    /// GET /queue
    pub async fn fetch_queue(&self) -> Result<QueueSnapshot, ClientError> {
        let response = self
            .http
            .get(self.url("/queue"))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::parse(response).await
    }

    /// POST /queue, appending a post to the queue.
    pub async fn enqueue(&self, post_id: i32) -> Result<QueueItemResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/queue"))
            .bearer_auth(&self.token)
            .json(&EnqueueBody { post_id })
            .send()
            .await?;

        let reply: EnqueueReply = Self::parse(response).await?;
        Ok(reply.queue_item)
    }

    /// POST /queue/next, inserting a post at the front of the queue.
    pub async fn enqueue_next(&self, post_id: i32) -> Result<QueueItemResponse, ClientError> {
        let response = self
            .http
            .post(self.url("/queue/next"))
            .bearer_auth(&self.token)
            .json(&EnqueueBody { post_id })
            .send()
            .await?;

        let reply: EnqueueReply = Self::parse(response).await?;
        Ok(reply.queue_item)
    }

    /// DELETE /queue/{post_id}
    pub async fn remove(&self, post_id: i32) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/queue/{post_id}")))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::parse::<MessageReply>(response).await.map(|_| ())
    }

    /// PUT /queue/reorder
    pub async fn reorder(&self, from_index: usize, to_index: usize) -> Result<(), ClientError> {
        let response = self
            .http
            .put(self.url("/queue/reorder"))
            .bearer_auth(&self.token)
            .json(&ReorderBody {
                from_index,
                to_index,
            })
            .send()
            .await?;

        Self::parse::<MessageReply>(response).await.map(|_| ())
    }

    /// DELETE /queue
    pub async fn clear(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .delete(self.url("/queue"))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::parse::<MessageReply>(response).await.map(|_| ())
    }

    /// GET /queue/settings
    pub async fn settings(&self) -> Result<QueueSettings, ClientError> {
        let response = self
            .http
            .get(self.url("/queue/settings"))
            .bearer_auth(&self.token)
            .send()
            .await?;

        Self::parse(response).await
    }

    /// PUT /queue/settings
    pub async fn update_settings(
        &self,
        patch: QueueSettingsPatch,
    ) -> Result<QueueSettings, ClientError> {
        let response = self
            .http
            .put(self.url("/queue/settings"))
            .bearer_auth(&self.token)
            .json(&patch)
            .send()
            .await?;

        Self::parse(response).await
    }

    /// POST /playlists/{id}/queue
    pub async fn add_playlist_to_queue(
        &self,
        playlist_id: i32,
        shuffle: bool,
        play_next: bool,
    ) -> Result<PlaylistQueueOutcome, ClientError> {
        let response = self
            .http
            .post(self.url(&format!("/playlists/{playlist_id}/queue")))
            .bearer_auth(&self.token)
            .json(&AddPlaylistBody { shuffle, play_next })
            .send()
            .await?;

        let reply: AddPlaylistReply = Self::parse(response).await?;
        Ok(PlaylistQueueOutcome {
            added_count: reply.added_count,
            skipped_count: reply.skipped_count,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = response
            .json::<ErrorReply>()
            .await
            .map(|e| e.message)
            .unwrap_or_else(|_| format!("Request failed with status {status}"));

        Err(ClientError::Rejected { status, message })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = QueueClient::new("http://localhost:4533/", "tok");
        assert_eq!(
            client.stream_url(7),
            "http://localhost:4533/posts/7/stream"
        );
    }
}
