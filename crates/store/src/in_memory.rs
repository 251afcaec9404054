//! In-memory profile store: useful for testing and ephemeral deployments.

use async_trait::async_trait;
use chrono::Utc;
use learnloop_core::error::StorageError;
use learnloop_core::profile::{Profile, ProfileStore, ProfileUpdate};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::StudentLocks;

/// Profiles held in a map. Nothing survives the process.
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, Profile>>>,
    locks: StudentLocks,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self {
            profiles: Arc::new(RwLock::new(HashMap::new())),
            locks: StudentLocks::default(),
        }
    }

    /// Number of stored profiles.
    pub async fn len(&self) -> usize {
        self.profiles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.profiles.read().await.is_empty()
    }

    async fn read(&self, student_id: &str) -> Profile {
        if let Some(p) = self.profiles.read().await.get(student_id) {
            return p.clone();
        }
        let mut profiles = self.profiles.write().await;
        profiles
            .entry(student_id.to_string())
            .or_insert_with(|| Profile::new(student_id, Utc::now()))
            .clone()
    }
}

impl Default for InMemoryProfileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn load(&self, student_id: &str) -> Profile {
        self.read(student_id).await
    }

    async fn save(&self, profile: &Profile) -> Result<(), StorageError> {
        self.profiles
            .write()
            .await
            .insert(profile.student_id.clone(), profile.clone());
        Ok(())
    }

    async fn update(&self, student_id: &str, f: ProfileUpdate) -> Result<Profile, StorageError> {
        let lock = self.locks.lock_for(student_id);
        let _guard = lock.lock().await;

        let updated = f(self.read(student_id).await);
        self.save(&updated).await?;
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn load_creates_default_once() {
        let store = InMemoryProfileStore::new();
        let a = store.load("alice").await;
        let b = store.load("alice").await;
        assert_eq!(a, b);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn update_is_serialized_per_student() {
        let store = Arc::new(InMemoryProfileStore::new());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        "bob",
                        Box::new(|p: Profile| {
                            Profile::from_parts(
                                p.student_id.clone(),
                                p.progress() + 1,
                                p.topics().clone(),
                                p.total_questions + 1,
                                p.created_at,
                                Utc::now(),
                            )
                        }),
                    )
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        let p = store.load("bob").await;
        assert_eq!(p.progress(), 20);
        assert_eq!(p.total_questions, 20);
    }
}
