//! Upload importer.
//!
//! Walks an uploads directory, reads audio file metadata, and registers
//! each file as a playable post owned by a user. This is the ingest path
//! for audio that reached the server's disk; files already registered are
//! skipped so the importer can run repeatedly over the same directory.

use std::path::{Path, PathBuf};

use lofty::file::{AudioFile, TaggedFileExt};
use lofty::tag::Accessor;
use rayon::prelude::*;
use thiserror::Error;
use walkdir::WalkDir;

use crate::db::{DbPool, PostRepository, StoreError, UserRepoError, UserRepository};
use crate::models::post::{NewPost, Post};

/// Errors that can occur during an import run.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("User repository error: {0}")]
    User(#[from] UserRepoError),

    #[error("User not found: {0}")]
    UnknownUser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Unreadable audio file {path}: {reason}")]
    UnreadableAudio { path: PathBuf, reason: String },
}

/// Supported audio file extensions.
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac", "ogg", "opus", "m4a", "aac", "wav", "aiff"];

/// Metadata extracted from one uploaded audio file.
#[derive(Debug, Clone)]
struct ScannedUpload {
    path: PathBuf,
    content_type: String,
    title: String,
    duration_secs: i32,
}

/// Result of an import run.
#[derive(Debug, Default)]
pub struct ImportStats {
    pub files_found: usize,
    pub posts_added: usize,
    pub files_skipped: usize,
    pub files_failed: usize,
}

/// Registers uploaded audio files as posts.
pub struct Importer {
    post_repo: PostRepository,
    user_repo: UserRepository,
}

impl Importer {
    /// Create a new importer.
    pub fn new(pool: DbPool) -> Self {
        Self {
            post_repo: PostRepository::new(pool.clone()),
            user_repo: UserRepository::new(pool),
        }
    }

    /// Import every audio file under `dir` as a post owned by `username`.
    pub fn import_directory(&self, username: &str, dir: &Path) -> Result<ImportStats, ImportError> {
        let user = self
            .user_repo
            .find_by_username(username)?
            .ok_or_else(|| ImportError::UnknownUser(username.to_string()))?;

        if !dir.is_dir() {
            return Err(ImportError::NotADirectory(dir.to_path_buf()));
        }

        // Collect audio file paths first (fast, sequential walk)
        let audio_files: Vec<PathBuf> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| {
                let path = entry.into_path();
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase());

                match ext {
                    Some(ext) if AUDIO_EXTENSIONS.contains(&ext.as_str()) => Some(path),
                    _ => None,
                }
            })
            .collect();

        let mut stats = ImportStats {
            files_found: audio_files.len(),
            ..Default::default()
        };

        // Read metadata in parallel using rayon
        let scanned: Vec<Result<ScannedUpload, ImportError>> = audio_files
            .par_iter()
            .map(|path| read_upload_metadata(path))
            .collect();

        for result in scanned {
            let upload = match result {
                Ok(upload) => upload,
                Err(e) => {
                    tracing::warn!("skipping unreadable upload: {e}");
                    stats.files_failed += 1;
                    continue;
                }
            };

            let path_str = upload.path.to_string_lossy().to_string();
            if self.post_repo.find_by_audio_path(&path_str)?.is_some() {
                stats.files_skipped += 1;
                continue;
            }

            let new_post = NewPost {
                user_id: user.id,
                title: upload.title,
                audio_path: Some(path_str),
                audio_content_type: Some(upload.content_type),
                youtube_url: None,
                duration_secs: upload.duration_secs,
                cover_art: None,
            };

            match self.post_repo.create(&new_post) {
                Ok(_) => stats.posts_added += 1,
                Err(StoreError::AlreadyExists(_)) => stats.files_skipped += 1,
                Err(e) => {
                    tracing::warn!("failed to register {}: {e}", upload.path.display());
                    stats.files_failed += 1;
                }
            }
        }

        Ok(stats)
    }

    /// Register a single audio file as a post, optionally overriding the
    /// title read from its tags.
    pub fn import_file(
        &self,
        username: &str,
        path: &Path,
        title: Option<&str>,
    ) -> Result<Post, ImportError> {
        let user = self
            .user_repo
            .find_by_username(username)?
            .ok_or_else(|| ImportError::UnknownUser(username.to_string()))?;

        let upload = read_upload_metadata(path)?;

        let new_post = NewPost {
            user_id: user.id,
            title: title.map(str::to_string).unwrap_or(upload.title),
            audio_path: Some(upload.path.to_string_lossy().to_string()),
            audio_content_type: Some(upload.content_type),
            youtube_url: None,
            duration_secs: upload.duration_secs,
            cover_art: None,
        };

        Ok(self.post_repo.create(&new_post)?)
    }
}

/// Read tags and properties from one audio file.
fn read_upload_metadata(path: &Path) -> Result<ScannedUpload, ImportError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    let tagged_file = lofty::read_from_path(path).map_err(|e| ImportError::UnreadableAudio {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let properties = tagged_file.properties();
    let duration_secs = properties.duration().as_secs() as i32;

    // Get tags (try primary tag first, then any available)
    let tag = tagged_file.primary_tag().or_else(|| tagged_file.first_tag());
    let title = tag
        .and_then(|t| t.title().map(|s| s.to_string()))
        .unwrap_or_else(|| {
            path.file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Untitled")
                .to_string()
        });

    let content_type = match extension.as_str() {
        "mp3" => "audio/mpeg",
        "flac" => "audio/flac",
        "ogg" => "audio/ogg",
        "opus" => "audio/opus",
        "m4a" | "aac" => "audio/mp4",
        "wav" => "audio/wav",
        "aiff" => "audio/aiff",
        _ => "application/octet-stream",
    }
    .to_string();

    Ok(ScannedUpload {
        path: path.to_path_buf(),
        content_type,
        title,
        duration_secs,
    })
}
