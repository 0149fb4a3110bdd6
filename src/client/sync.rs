//! Queue sync glue.
//!
//! Keeps the playback controller's in-memory playlist consistent with the
//! server-authoritative queue and implements the "finished tracks leave the
//! queue" policy. The server is the single source of truth: after every
//! successful mutation the full ordered queue is mapped to playback tracks
//! and pushed into the controller wholesale.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;

use crate::client::http::{ClientError, QueueClient};
use crate::models::queue::{QueueEntry, QueueSettings, QueueSettingsPatch};
use crate::player::{ENDED_ADVANCE_DELAY, PlaybackController, PlaybackTrack, SinkEvent};

/// How often the completion watcher samples the controller.
pub const COMPLETION_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Build the playback-ready descriptor for a queue entry.
pub fn playback_track(entry: &QueueEntry, client: &QueueClient) -> PlaybackTrack {
    PlaybackTrack {
        post_id: entry.post_id,
        user_id: entry.user_id,
        title: entry.title.clone(),
        artist: entry.artist.clone(),
        url: client.stream_url(entry.post_id),
        cover_art: entry.cover_art.clone(),
    }
}

/// Detects tracks that finished playing by comparing consecutive
/// `(current track, is playing)` snapshots.
///
/// A track counts as completed when it was playing at the previous sample
/// and the controller has since gone idle with no track loaded. A pause
/// (same track still current) or a jump to a different track is not a
/// completion.
#[derive(Debug, Default)]
pub struct CompletionWatcher {
    last: Option<(Option<i32>, bool)>,
}

impl CompletionWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one snapshot; returns the post that just finished, if any.
    pub fn observe(&mut self, current: Option<i32>, is_playing: bool) -> Option<i32> {
        let completed = match self.last {
            Some((Some(prev), true)) if current.is_none() => Some(prev),
            _ => None,
        };
        self.last = Some((current, is_playing));
        completed
    }
}

/// Array-splice reorder on a local snapshot: remove at `from`, reinsert at
/// `to`. Mirrors the server's reorder semantics for optimistic updates.
pub fn splice_reorder(entries: &mut Vec<QueueEntry>, from: usize, to: usize) {
    if from >= entries.len() || from == to {
        return;
    }
    let moved = entries.remove(from);
    entries.insert(to.min(entries.len()), moved);
}

/// Client-side mirror of the server queue, feeding the playback controller.
pub struct QueueSync {
    client: QueueClient,
    player: Arc<Mutex<PlaybackController>>,
    /// Last known-good server queue, used for optimistic rollback.
    entries: Vec<QueueEntry>,
    settings: QueueSettings,
    watcher: CompletionWatcher,
}

impl QueueSync {
    pub fn new(client: QueueClient, player: Arc<Mutex<PlaybackController>>) -> Self {
        Self {
            client,
            player,
            entries: Vec::new(),
            settings: QueueSettings::default(),
            watcher: CompletionWatcher::new(),
        }
    }

    /// The last queue state received from the server.
    pub fn entries(&self) -> &[QueueEntry] {
        &self.entries
    }

    /// The last settings received from the server.
    pub fn settings(&self) -> QueueSettings {
        self.settings
    }

    /// Re-fetch the queue from the server and push it into the controller.
    pub async fn refresh(&mut self) -> Result<(), ClientError> {
        let snapshot = self.client.fetch_queue().await?;
        self.settings = snapshot.settings;
        self.apply(snapshot.queue);
        Ok(())
    }

    /// Append a post to the queue.
    pub async fn enqueue(&mut self, post_id: i32) -> Result<(), ClientError> {
        self.client.enqueue(post_id).await?;
        self.refresh().await
    }

    /// Insert a post at the front of the queue.
    pub async fn enqueue_next(&mut self, post_id: i32) -> Result<(), ClientError> {
        self.client.enqueue_next(post_id).await?;
        self.refresh().await
    }

    /// Remove a post from the queue.
    pub async fn remove(&mut self, post_id: i32) -> Result<(), ClientError> {
        self.client.remove(post_id).await?;
        self.refresh().await
    }

    /// Empty the queue.
    pub async fn clear(&mut self) -> Result<(), ClientError> {
        self.client.clear().await?;
        self.refresh().await
    }

    /// Add a playlist to the queue; returns on success after resyncing.
    pub async fn add_playlist(
        &mut self,
        playlist_id: i32,
        shuffle: bool,
        play_next: bool,
    ) -> Result<(), ClientError> {
        self.client
            .add_playlist_to_queue(playlist_id, shuffle, play_next)
            .await?;
        self.refresh().await
    }

    /// Patch the shuffle/repeat settings.
    pub async fn update_settings(&mut self, patch: QueueSettingsPatch) -> Result<(), ClientError> {
        self.settings = self.client.update_settings(patch).await?;
        Ok(())
    }

    /// Reorder with an optimistic local update.
    ///
    /// The displayed order (and the controller mirror) change immediately;
    /// if the server rejects the reorder the last known-good order is
    /// rolled back and the error surfaces to the caller.
    pub async fn reorder(&mut self, from: usize, to: usize) -> Result<(), ClientError> {
        let rollback = self.entries.clone();

        let mut optimistic = self.entries.clone();
        splice_reorder(&mut optimistic, from, to);
        self.apply(optimistic);

        match self.client.reorder(from, to).await {
            Ok(()) => {
                // Confirm against the server's ordering
                if let Err(e) = self.refresh().await {
                    tracing::warn!("queue resync after reorder failed: {e}");
                }
                Ok(())
            }
            Err(e) => {
                self.apply(rollback);
                Err(e)
            }
        }
    }

    /// Sample the controller once and, if a track finished since the last
    /// sample, remove it from the server queue. Removal failures are
    /// logged and never block playback.
    pub async fn tick(&mut self) {
        let snapshot = {
            let player = self.player.lock().expect("player lock poisoned");
            player.snapshot()
        };

        let current = snapshot.current_track.as_ref().map(|t| t.post_id);
        if let Some(finished) = self.watcher.observe(current, snapshot.is_playing) {
            match self.client.remove(finished).await {
                Ok(()) => {
                    if let Err(e) = self.refresh().await {
                        tracing::warn!("queue resync after completed track failed: {e}");
                    }
                }
                Err(e) => {
                    tracing::warn!("failed to remove completed track {finished}: {e}");
                }
            }
        }
    }

    /// Run the completion watcher until the task is dropped.
    pub async fn run(mut self) {
        let mut interval = tokio::time::interval(COMPLETION_POLL_INTERVAL);
        loop {
            interval.tick().await;
            self.tick().await;
        }
    }

    fn apply(&mut self, entries: Vec<QueueEntry>) {
        let tracks: Vec<PlaybackTrack> = entries
            .iter()
            .map(|entry| playback_track(entry, &self.client))
            .collect();

        {
            let mut player = self.player.lock().expect("player lock poisoned");
            player.set_queue(tracks);
        }

        self.entries = entries;
    }
}

/// Forward sink events from the platform into the controller.
///
/// `Ended` tears the finished track down immediately, then auto-advances
/// after a short settle delay so the completion watcher can observe the
/// idle gap.
pub async fn pump_events(
    player: Arc<Mutex<PlaybackController>>,
    mut events: mpsc::Receiver<SinkEvent>,
) {
    while let Some(event) = events.recv().await {
        match event {
            SinkEvent::Ended => {
                {
                    let mut player = player.lock().expect("player lock poisoned");
                    player.handle_event(SinkEvent::Ended);
                }
                tokio::time::sleep(ENDED_ADVANCE_DELAY).await;
                let mut player = player.lock().expect("player lock poisoned");
                player.play_next();
            }
            other => {
                let mut player = player.lock().expect("player lock poisoned");
                player.handle_event(other);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(post_id: i32, position: i32, title: &str) -> QueueEntry {
        QueueEntry {
            id: post_id * 10,
            post_id,
            position,
            title: title.to_string(),
            user_id: 1,
            artist: "Uploader".to_string(),
            duration_secs: 180,
            cover_art: None,
        }
    }

    #[test]
    fn watcher_reports_track_that_finished() {
        let mut watcher = CompletionWatcher::new();
        assert_eq!(watcher.observe(Some(1), true), None);
        assert_eq!(watcher.observe(None, false), Some(1));
    }

    #[test]
    fn watcher_fires_once_per_completion() {
        let mut watcher = CompletionWatcher::new();
        watcher.observe(Some(1), true);
        assert_eq!(watcher.observe(None, false), Some(1));
        assert_eq!(watcher.observe(None, false), None);
    }

    #[test]
    fn watcher_ignores_pause() {
        let mut watcher = CompletionWatcher::new();
        watcher.observe(Some(1), true);
        assert_eq!(watcher.observe(Some(1), false), None);
    }

    #[test]
    fn watcher_ignores_jump_to_other_track() {
        let mut watcher = CompletionWatcher::new();
        watcher.observe(Some(1), true);
        assert_eq!(watcher.observe(Some(2), true), None);
    }

    #[test]
    fn watcher_ignores_idle_controller() {
        let mut watcher = CompletionWatcher::new();
        assert_eq!(watcher.observe(None, false), None);
        assert_eq!(watcher.observe(None, false), None);
    }

    #[test]
    fn splice_moves_forward() {
        let mut entries = vec![
            entry(1, 0, "A"),
            entry(2, 1, "B"),
            entry(3, 2, "C"),
            entry(4, 3, "D"),
        ];
        splice_reorder(&mut entries, 0, 2);
        let order: Vec<i32> = entries.iter().map(|e| e.post_id).collect();
        assert_eq!(order, vec![2, 3, 1, 4]);
    }

    #[test]
    fn splice_moves_backward() {
        let mut entries = vec![
            entry(1, 0, "A"),
            entry(2, 1, "B"),
            entry(3, 2, "C"),
            entry(4, 3, "D"),
        ];
        splice_reorder(&mut entries, 3, 0);
        let order: Vec<i32> = entries.iter().map(|e| e.post_id).collect();
        assert_eq!(order, vec![4, 1, 2, 3]);
    }

    #[test]
    fn splice_same_index_is_noop() {
        let mut entries = vec![entry(1, 0, "A"), entry(2, 1, "B")];
        splice_reorder(&mut entries, 1, 1);
        let order: Vec<i32> = entries.iter().map(|e| e.post_id).collect();
        assert_eq!(order, vec![1, 2]);
    }

    #[test]
    fn splice_out_of_range_from_is_noop() {
        let mut entries = vec![entry(1, 0, "A"), entry(2, 1, "B")];
        splice_reorder(&mut entries, 5, 0);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].post_id, 1);
    }
}
