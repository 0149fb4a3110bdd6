//! Database schema definitions for Diesel.

diesel::table! {
    users (id) {
        id -> Integer,
        username -> Text,
        password_hash -> Text,
        api_token -> Nullable<Text>,
        display_name -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    posts (id) {
        id -> Integer,
        user_id -> Integer,
        title -> Text,
        audio_path -> Nullable<Text>,
        audio_content_type -> Nullable<Text>,
        youtube_url -> Nullable<Text>,
        duration_secs -> Integer,
        cover_art -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    playlists (id) {
        id -> Integer,
        user_id -> Integer,
        name -> Text,
        description -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    playlist_tracks (id) {
        id -> Integer,
        playlist_id -> Integer,
        post_id -> Integer,
        position -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    queue_items (id) {
        id -> Integer,
        user_id -> Integer,
        post_id -> Integer,
        position -> Integer,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    queue_settings (user_id) {
        user_id -> Integer,
        shuffle_mode -> Bool,
        repeat_mode -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

// Define foreign key relationships
diesel::joinable!(posts -> users (user_id));
diesel::joinable!(playlists -> users (user_id));
diesel::joinable!(playlist_tracks -> playlists (playlist_id));
diesel::joinable!(playlist_tracks -> posts (post_id));
diesel::joinable!(queue_items -> posts (post_id));
diesel::joinable!(queue_settings -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(
    users,
    posts,
    playlists,
    playlist_tracks,
    queue_items,
    queue_settings,
);
