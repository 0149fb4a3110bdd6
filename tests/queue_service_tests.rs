//! Queue service integration tests against an in-memory SQLite database.
//!
//! The pool is capped at one connection so every query sees the same
//! in-memory database.

use wavshare::db::{
    DbConfig, DbPool, NewUser, PlaylistRepository, PostRepository, QueueError, QueueRepository,
    QueueSettingsRepository, UserRepository, run_migrations,
};
use wavshare::models::post::NewPost;
use wavshare::models::queue::{QUEUE_CAPACITY, QueueSettingsPatch, RepeatMode};
use wavshare::models::{Post, User};

fn test_pool() -> DbPool {
    let config = DbConfig {
        database_url: ":memory:".to_string(),
        max_connections: 1,
        connection_timeout: 5,
    };
    let pool = config.build_pool().expect("pool");
    let mut conn = pool.get().expect("conn");
    run_migrations(&mut conn).expect("migrations");
    pool
}

fn seed_user(pool: &DbPool, username: &str) -> User {
    UserRepository::new(pool.clone())
        .create(&NewUser::new(username, "$argon2id$test-hash", username))
        .expect("create user")
}

fn seed_audio_post(pool: &DbPool, user_id: i32, title: &str) -> Post {
    PostRepository::new(pool.clone())
        .create(&NewPost {
            user_id,
            title: title.to_string(),
            audio_path: Some(format!("/uploads/{user_id}/{title}.mp3")),
            audio_content_type: Some("audio/mpeg".to_string()),
            youtube_url: None,
            duration_secs: 180,
            cover_art: None,
        })
        .expect("create post")
}

fn seed_youtube_post(pool: &DbPool, user_id: i32, title: &str) -> Post {
    PostRepository::new(pool.clone())
        .create(&NewPost {
            user_id,
            title: title.to_string(),
            audio_path: None,
            audio_content_type: None,
            youtube_url: Some("https://youtube.com/watch?v=abc123".to_string()),
            duration_secs: 0,
            cover_art: None,
        })
        .expect("create post")
}

/// Assert the density invariant: positions are exactly 0..N-1 in order.
fn assert_dense(queue: &QueueRepository, user_id: i32) {
    let items = queue.items(user_id).expect("items");
    for (index, item) in items.iter().enumerate() {
        assert_eq!(
            item.position, index as i32,
            "position {} found where {} expected",
            item.position, index
        );
    }
}

#[test]
fn enqueue_appends_in_order() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let a = seed_audio_post(&pool, user.id, "A");
    let b = seed_audio_post(&pool, user.id, "B");

    let first = queue.enqueue(user.id, a.id, false).unwrap();
    let second = queue.enqueue(user.id, b.id, false).unwrap();

    assert_eq!(first.position, 0);
    assert_eq!(second.position, 1);
    assert_dense(&queue, user.id);
}

#[test]
fn front_insert_shifts_existing_items() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let a = seed_audio_post(&pool, user.id, "A");
    let b = seed_audio_post(&pool, user.id, "B");
    let c = seed_audio_post(&pool, user.id, "C");

    queue.enqueue(user.id, a.id, false).unwrap();
    queue.enqueue(user.id, b.id, false).unwrap();
    let front = queue.enqueue(user.id, c.id, true).unwrap();

    assert_eq!(front.position, 0);
    let items = queue.items(user.id).unwrap();
    let order: Vec<i32> = items.iter().map(|i| i.post_id).collect();
    assert_eq!(order, vec![c.id, a.id, b.id]);
    assert_dense(&queue, user.id);
}

#[test]
fn duplicate_enqueue_is_rejected_and_queue_unchanged() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let a = seed_audio_post(&pool, user.id, "A");
    queue.enqueue(user.id, a.id, false).unwrap();

    let err = queue.enqueue(user.id, a.id, false).unwrap_err();
    assert!(matches!(err, QueueError::Duplicate));

    let items = queue.items(user.id).unwrap();
    assert_eq!(items.len(), 1);
    assert_dense(&queue, user.id);
}

#[test]
fn youtube_only_post_is_not_playable() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let linked = seed_youtube_post(&pool, user.id, "LinkedOnly");
    let err = queue.enqueue(user.id, linked.id, false).unwrap_err();
    assert!(matches!(err, QueueError::NotPlayable));
    assert!(queue.items(user.id).unwrap().is_empty());
}

#[test]
fn enqueue_unknown_post_is_not_found() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let err = queue.enqueue(user.id, 9999, false).unwrap_err();
    assert!(matches!(err, QueueError::PostNotFound));
}

#[test]
fn capacity_ceiling_is_enforced() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    for i in 0..QUEUE_CAPACITY {
        let post = seed_audio_post(&pool, user.id, &format!("track-{i}"));
        queue.enqueue(user.id, post.id, false).unwrap();
    }

    let overflow = seed_audio_post(&pool, user.id, "overflow");
    let err = queue.enqueue(user.id, overflow.id, false).unwrap_err();
    assert!(matches!(err, QueueError::QueueFull));

    let items = queue.items(user.id).unwrap();
    assert_eq!(items.len(), QUEUE_CAPACITY);
    assert_dense(&queue, user.id);
}

#[test]
fn remove_renumbers_remaining_items() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let posts: Vec<Post> = ["A", "B", "C", "D"]
        .iter()
        .map(|t| seed_audio_post(&pool, user.id, t))
        .collect();
    for post in &posts {
        queue.enqueue(user.id, post.id, false).unwrap();
    }

    queue.remove(user.id, posts[1].id).unwrap();

    let items = queue.items(user.id).unwrap();
    let order: Vec<i32> = items.iter().map(|i| i.post_id).collect();
    assert_eq!(order, vec![posts[0].id, posts[2].id, posts[3].id]);
    assert_dense(&queue, user.id);
}

#[test]
fn remove_absent_post_is_not_found() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let a = seed_audio_post(&pool, user.id, "A");
    let err = queue.remove(user.id, a.id).unwrap_err();
    assert!(matches!(err, QueueError::NotQueued));
}

#[test]
fn reorder_moves_forward_with_splice_semantics() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let posts: Vec<Post> = ["A", "B", "C", "D"]
        .iter()
        .map(|t| seed_audio_post(&pool, user.id, t))
        .collect();
    for post in &posts {
        queue.enqueue(user.id, post.id, false).unwrap();
    }

    // [A,B,C,D] -> move index 0 to index 2 -> [B,C,A,D]
    queue.reorder(user.id, 0, 2).unwrap();

    let order: Vec<i32> = queue
        .items(user.id)
        .unwrap()
        .iter()
        .map(|i| i.post_id)
        .collect();
    assert_eq!(order, vec![posts[1].id, posts[2].id, posts[0].id, posts[3].id]);
    assert_dense(&queue, user.id);
}

#[test]
fn reorder_moves_backward_with_splice_semantics() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let posts: Vec<Post> = ["A", "B", "C", "D"]
        .iter()
        .map(|t| seed_audio_post(&pool, user.id, t))
        .collect();
    for post in &posts {
        queue.enqueue(user.id, post.id, false).unwrap();
    }

    // [A,B,C,D] -> move index 3 to index 0 -> [D,A,B,C]
    queue.reorder(user.id, 3, 0).unwrap();

    let order: Vec<i32> = queue
        .items(user.id)
        .unwrap()
        .iter()
        .map(|i| i.post_id)
        .collect();
    assert_eq!(order, vec![posts[3].id, posts[0].id, posts[1].id, posts[2].id]);
    assert_dense(&queue, user.id);
}

#[test]
fn reorder_same_index_is_a_noop() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let posts: Vec<Post> = ["A", "B"]
        .iter()
        .map(|t| seed_audio_post(&pool, user.id, t))
        .collect();
    for post in &posts {
        queue.enqueue(user.id, post.id, false).unwrap();
    }

    queue.reorder(user.id, 1, 1).unwrap();

    let order: Vec<i32> = queue
        .items(user.id)
        .unwrap()
        .iter()
        .map(|i| i.post_id)
        .collect();
    assert_eq!(order, vec![posts[0].id, posts[1].id]);
}

#[test]
fn reorder_rejects_out_of_range_indices() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let a = seed_audio_post(&pool, user.id, "A");
    queue.enqueue(user.id, a.id, false).unwrap();

    let err = queue.reorder(user.id, 0, 1).unwrap_err();
    assert!(matches!(err, QueueError::InvalidIndex { index: 1, len: 1 }));

    let err = queue.reorder(user.id, 3, 0).unwrap_err();
    assert!(matches!(err, QueueError::InvalidIndex { index: 3, len: 1 }));
}

#[test]
fn clear_empties_the_queue() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    for title in ["A", "B", "C"] {
        let post = seed_audio_post(&pool, user.id, title);
        queue.enqueue(user.id, post.id, false).unwrap();
    }

    queue.clear(user.id).unwrap();
    assert!(queue.items(user.id).unwrap().is_empty());
}

#[test]
fn queues_are_partitioned_per_user() {
    let pool = test_pool();
    let alice = seed_user(&pool, "alice");
    let bob = seed_user(&pool, "bob");
    let queue = QueueRepository::new(pool.clone());

    let shared = seed_audio_post(&pool, alice.id, "Shared");
    queue.enqueue(alice.id, shared.id, false).unwrap();
    // The same post can sit in another user's queue
    queue.enqueue(bob.id, shared.id, false).unwrap();

    queue.clear(alice.id).unwrap();
    assert!(queue.items(alice.id).unwrap().is_empty());
    assert_eq!(queue.items(bob.id).unwrap().len(), 1);
}

#[test]
fn entries_join_post_title_and_uploader_name() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let post = seed_audio_post(&pool, user.id, "Sunrise Loop");
    queue.enqueue(user.id, post.id, false).unwrap();

    let entries = queue.entries(user.id).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].title, "Sunrise Loop");
    assert_eq!(entries[0].artist, "alice");
    assert_eq!(entries[0].post_id, post.id);
    assert_eq!(entries[0].position, 0);
}

#[test]
fn density_holds_after_mixed_operation_sequence() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let posts: Vec<Post> = (0..8)
        .map(|i| seed_audio_post(&pool, user.id, &format!("t{i}")))
        .collect();

    for post in posts.iter().take(6) {
        queue.enqueue(user.id, post.id, false).unwrap();
    }
    queue.enqueue(user.id, posts[6].id, true).unwrap();
    queue.remove(user.id, posts[2].id).unwrap();
    queue.reorder(user.id, 0, 4).unwrap();
    queue.enqueue(user.id, posts[7].id, false).unwrap();
    queue.remove(user.id, posts[0].id).unwrap();
    queue.reorder(user.id, 3, 1).unwrap();

    assert_dense(&queue, user.id);
    let items = queue.items(user.id).unwrap();
    // 6 tail inserts + 1 front insert + 1 append - 2 removals
    assert_eq!(items.len(), 6);
}

// ============================================================================
// Playlist-to-queue
// ============================================================================

fn seed_playlist(pool: &DbPool, user_id: i32, name: &str, tracks: &[&Post]) -> i32 {
    let playlists = PlaylistRepository::new(pool.clone());
    let playlist = playlists.create(user_id, name, None).unwrap();
    for post in tracks {
        playlists.add_track(playlist.id, post.id).unwrap();
    }
    playlist.id
}

#[test]
fn playlist_add_skips_tracks_already_queued() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let x = seed_audio_post(&pool, user.id, "X");
    let y = seed_audio_post(&pool, user.id, "Y");
    let z = seed_audio_post(&pool, user.id, "Z");
    let playlist_id = seed_playlist(&pool, user.id, "Mix", &[&x, &y, &z]);

    queue.enqueue(user.id, y.id, false).unwrap();

    let outcome = queue.add_playlist(user.id, playlist_id, false, false).unwrap();
    assert_eq!(outcome.added_count, 2);
    assert_eq!(outcome.skipped_count, 1);

    let order: Vec<i32> = queue
        .items(user.id)
        .unwrap()
        .iter()
        .map(|i| i.post_id)
        .collect();
    assert_eq!(order, vec![y.id, x.id, z.id]);
    assert_dense(&queue, user.id);
}

#[test]
fn playlist_add_fails_when_everything_is_queued() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let x = seed_audio_post(&pool, user.id, "X");
    let y = seed_audio_post(&pool, user.id, "Y");
    let playlist_id = seed_playlist(&pool, user.id, "Mix", &[&x, &y]);

    queue.enqueue(user.id, x.id, false).unwrap();
    queue.enqueue(user.id, y.id, false).unwrap();

    let err = queue
        .add_playlist(user.id, playlist_id, false, false)
        .unwrap_err();
    assert!(matches!(err, QueueError::AllDuplicates));
    assert_eq!(queue.items(user.id).unwrap().len(), 2);
}

#[test]
fn playlist_with_no_playable_tracks_is_rejected() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let linked = seed_youtube_post(&pool, user.id, "LinkedOnly");
    let playlist_id = seed_playlist(&pool, user.id, "Videos", &[&linked]);

    let err = queue
        .add_playlist(user.id, playlist_id, false, false)
        .unwrap_err();
    assert!(matches!(err, QueueError::EmptyPlaylist));
}

#[test]
fn unknown_playlist_is_rejected() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let err = queue.add_playlist(user.id, 424242, false, false).unwrap_err();
    assert!(matches!(err, QueueError::PlaylistNotFound));
}

#[test]
fn playlist_play_next_inserts_block_at_front_in_order() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let old = seed_audio_post(&pool, user.id, "Old");
    queue.enqueue(user.id, old.id, false).unwrap();

    let x = seed_audio_post(&pool, user.id, "X");
    let y = seed_audio_post(&pool, user.id, "Y");
    let playlist_id = seed_playlist(&pool, user.id, "Mix", &[&x, &y]);

    let outcome = queue.add_playlist(user.id, playlist_id, false, true).unwrap();
    assert_eq!(outcome.added_count, 2);

    let order: Vec<i32> = queue
        .items(user.id)
        .unwrap()
        .iter()
        .map(|i| i.post_id)
        .collect();
    assert_eq!(order, vec![x.id, y.id, old.id]);
    assert_dense(&queue, user.id);
}

#[test]
fn playlist_shuffle_preserves_track_set() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    let posts: Vec<Post> = (0..10)
        .map(|i| seed_audio_post(&pool, user.id, &format!("s{i}")))
        .collect();
    let refs: Vec<&Post> = posts.iter().collect();
    let playlist_id = seed_playlist(&pool, user.id, "Mix", &refs);

    let outcome = queue.add_playlist(user.id, playlist_id, true, false).unwrap();
    assert_eq!(outcome.added_count, 10);

    let mut queued: Vec<i32> = queue
        .items(user.id)
        .unwrap()
        .iter()
        .map(|i| i.post_id)
        .collect();
    queued.sort_unstable();
    let mut expected: Vec<i32> = posts.iter().map(|p| p.id).collect();
    expected.sort_unstable();
    assert_eq!(queued, expected);
    assert_dense(&queue, user.id);
}

#[test]
fn playlist_add_respects_capacity() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let queue = QueueRepository::new(pool.clone());

    for i in 0..(QUEUE_CAPACITY - 1) {
        let post = seed_audio_post(&pool, user.id, &format!("fill-{i}"));
        queue.enqueue(user.id, post.id, false).unwrap();
    }

    let x = seed_audio_post(&pool, user.id, "X");
    let y = seed_audio_post(&pool, user.id, "Y");
    let playlist_id = seed_playlist(&pool, user.id, "Mix", &[&x, &y]);

    let err = queue
        .add_playlist(user.id, playlist_id, false, false)
        .unwrap_err();
    assert!(matches!(err, QueueError::QueueFull));
    assert_eq!(queue.items(user.id).unwrap().len(), QUEUE_CAPACITY - 1);
}

// ============================================================================
// Queue settings
// ============================================================================

#[test]
fn settings_are_created_lazily_with_defaults() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let settings = QueueSettingsRepository::new(pool.clone());

    let current = settings.get_or_create(user.id).unwrap();
    assert!(!current.shuffle_mode);
    assert_eq!(current.repeat_mode, RepeatMode::Off);

    // Second read sees the same row
    let again = settings.get_or_create(user.id).unwrap();
    assert_eq!(current, again);
}

#[test]
fn settings_patch_only_touches_supplied_fields() {
    let pool = test_pool();
    let user = seed_user(&pool, "alice");
    let settings = QueueSettingsRepository::new(pool.clone());

    let updated = settings
        .update(
            user.id,
            QueueSettingsPatch {
                repeat_mode: Some(RepeatMode::All),
                shuffle_mode: None,
            },
        )
        .unwrap();
    assert_eq!(updated.repeat_mode, RepeatMode::All);
    assert!(!updated.shuffle_mode);

    let updated = settings
        .update(
            user.id,
            QueueSettingsPatch {
                shuffle_mode: Some(true),
                repeat_mode: None,
            },
        )
        .unwrap();
    assert!(updated.shuffle_mode);
    assert_eq!(updated.repeat_mode, RepeatMode::All);
}
