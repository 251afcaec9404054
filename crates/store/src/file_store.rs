//! File-based profile store: one pretty-printed JSON file per student.
//!
//! Storage location: `~/.learnloop/profiles/<stem>.json`, where the stem is
//! an injective encoding of the student id (see [`file_stem`]).
//!
//! An unreadable or unparseable file is logged and replaced with a fresh
//! default profile; the learning loop keeps running instead of failing.

use async_trait::async_trait;
use chrono::Utc;
use learnloop_core::error::StorageError;
use learnloop_core::profile::{Profile, ProfileStore, ProfileUpdate};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::StudentLocks;

/// A directory of per-student JSON profiles.
pub struct FileProfileStore {
    dir: PathBuf,
    locks: StudentLocks,
}

impl FileProfileStore {
    /// Create a store rooted at `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        debug!(dir = %dir.display(), "File profile store opened");
        Self {
            dir,
            locks: StudentLocks::default(),
        }
    }

    /// Default directory: `~/.learnloop/profiles`
    pub fn default_dir() -> PathBuf {
        let home = std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join(".learnloop").join("profiles")
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of a student's profile file.
    pub fn path_for(&self, student_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(student_id)))
    }

    /// Read a profile without taking the student lock.
    async fn read(&self, student_id: &str) -> Profile {
        let path = self.path_for(student_id);

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(student_id, "No profile on disk, creating default");
                return self.create_default(student_id).await;
            }
            Err(e) => {
                warn!(student_id, path = %path.display(), error = %e, "Unreadable profile, replacing with default");
                return self.create_default(student_id).await;
            }
        };

        match serde_json::from_str::<Profile>(&content) {
            Ok(profile) if profile.student_id == student_id => profile,
            Ok(profile) => {
                // A hand-placed file; never hand one student's record to another
                warn!(
                    student_id,
                    found = %profile.student_id,
                    path = %path.display(),
                    "Profile file belongs to another student, using a fresh profile"
                );
                Profile::new(student_id, Utc::now())
            }
            Err(e) => {
                warn!(student_id, path = %path.display(), error = %e, "Corrupt profile, replacing with default");
                self.create_default(student_id).await
            }
        }
    }

    /// Build a default profile and persist it best-effort.
    async fn create_default(&self, student_id: &str) -> Profile {
        let profile = Profile::new(student_id, Utc::now());
        if let Err(e) = self.write(&profile).await {
            warn!(student_id, error = %e, "Failed to persist default profile");
        }
        profile
    }

    /// Write a profile via a temp file and rename so readers never see a
    /// partial file.
    async fn write(&self, profile: &Profile) -> Result<(), StorageError> {
        let student_id = &profile.student_id;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StorageError::WriteFailed {
                student_id: student_id.clone(),
                reason: format!("Failed to create profile directory: {e}"),
            })?;

        let json = serde_json::to_string_pretty(profile).map_err(|e| StorageError::SerializeFailed {
            student_id: student_id.clone(),
            reason: e.to_string(),
        })?;

        let path = self.path_for(student_id);
        let tmp = path.with_extension("json.tmp");

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| StorageError::WriteFailed {
                student_id: student_id.clone(),
                reason: e.to_string(),
            })?;

        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StorageError::WriteFailed {
                student_id: student_id.clone(),
                reason: e.to_string(),
            })?;

        debug!(student_id = %student_id, progress = profile.progress(), "Profile saved");
        Ok(())
    }
}

/// Map a student id onto a file stem that is safe on every filesystem.
///
/// ASCII letters, digits and `-` pass through; every other byte (including
/// `_` itself) becomes `_xx` in lowercase hex. The encoding is injective, so
/// distinct ids never share a file. The empty id maps to `_`, which no
/// non-empty id can produce.
pub(crate) fn file_stem(student_id: &str) -> String {
    if student_id.is_empty() {
        return "_".to_string();
    }
    let mut stem = String::with_capacity(student_id.len());
    for b in student_id.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' {
            stem.push(b as char);
        } else {
            stem.push_str(&format!("_{b:02x}"));
        }
    }
    stem
}

#[async_trait]
impl ProfileStore for FileProfileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn load(&self, student_id: &str) -> Profile {
        let lock = self.locks.lock_for(&file_stem(student_id));
        let _guard = lock.lock().await;
        self.read(student_id).await
    }

    async fn save(&self, profile: &Profile) -> Result<(), StorageError> {
        let lock = self.locks.lock_for(&file_stem(&profile.student_id));
        let _guard = lock.lock().await;
        self.write(profile).await
    }

    async fn update(&self, student_id: &str, f: ProfileUpdate) -> Result<Profile, StorageError> {
        let lock = self.locks.lock_for(&file_stem(student_id));
        let _guard = lock.lock().await;

        let current = self.read(student_id).await;
        let updated = f(current);
        self.write(&updated).await?;
        Ok(updated)
    }
}
