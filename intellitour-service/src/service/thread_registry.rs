//! Per-user conversation thread registry.
//!
//! Every operation on a user's thread happens inside a [`UserSession`],
//! which holds that user's lock. Requests for different users never contend.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{info, warn};

use crate::assistant::AssistantApi;
use crate::db::{RotationReason, ThreadStore};
use crate::error::ServiceResult;

pub struct ThreadRegistry {
    store: Arc<dyn ThreadStore>,
    /// Only users with a session open or waiting have an entry
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Exclusive access to one user's thread mapping
pub struct UserSession<'a> {
    registry: &'a ThreadRegistry,
    user_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl ThreadRegistry {
    pub fn new(store: Arc<dyn ThreadStore>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Wait for exclusive access to a user's thread
    pub async fn session(&self, user_id: &str) -> UserSession<'_> {
        let lock = self
            .locks
            .entry(user_id.to_string())
            .or_default()
            .value()
            .clone();

        UserSession {
            registry: self,
            user_id: user_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }
}

impl Drop for UserSession<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Clones are taken under the map's shard lock, so a count of one
        // means no other session holds or awaits this user's lock
        self.registry
            .locks
            .remove_if(&self.user_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

impl UserSession<'_> {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// The user's thread, creating and persisting one on first contact
    pub async fn get_or_create(&self, assistant: &dyn AssistantApi) -> ServiceResult<String> {
        if let Some(thread_id) = self.registry.store.get(&self.user_id)? {
            return Ok(thread_id);
        }

        let thread = assistant.create_thread().await?;
        self.registry.store.put(&self.user_id, &thread.id)?;
        info!(user_id = %self.user_id, thread_id = %thread.id, "Created thread for new user");

        Ok(thread.id)
    }

    /// Overwrite the user's mapping
    pub fn replace(&self, thread_id: &str) -> ServiceResult<()> {
        self.registry.store.put(&self.user_id, thread_id)
    }

    /// Move the user to a fresh thread. Earlier context is not carried over.
    pub async fn rotate(
        &self,
        previous_thread_id: &str,
        reason: RotationReason,
        assistant: &dyn AssistantApi,
    ) -> ServiceResult<String> {
        let thread = assistant.create_thread().await?;
        self.replace(&thread.id)?;

        if let Err(e) = self.registry.store.record_rotation(
            &self.user_id,
            Some(previous_thread_id),
            &thread.id,
            reason,
        ) {
            warn!(user_id = %self.user_id, error = %e, "Failed to record thread rotation");
        }

        info!(
            user_id = %self.user_id,
            previous_thread_id = %previous_thread_id,
            thread_id = %thread.id,
            reason = %reason,
            "Rotated user thread"
        );

        Ok(thread.id)
    }
}
