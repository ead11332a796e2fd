use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::{Mutex, RwLock};

use crate::error::ApiError;
use crate::models::message::{Message, NewMessage};
use crate::models::space_member::{SpaceMember, ROLE_MEMBER};

/// Membership lookups and chat persistence for spaces.
///
/// Backed by PostgreSQL in production and an in-memory map in tests.
#[async_trait]
pub trait SpaceStore: Send + Sync {
    /// The membership record of `user_id` in `space_id`, if any.
    async fn find_membership(
        &self,
        space_id: &str,
        user_id: &str,
    ) -> Result<Option<SpaceMember>, ApiError>;

    /// Durably store a chat message, returning it with its assigned id and timestamps.
    async fn create_message(&self, new: NewMessage<'_>) -> Result<Message, ApiError>;

    /// The most recent messages in a space, newest first.
    async fn list_messages(&self, space_id: &str, limit: i64) -> Result<Vec<Message>, ApiError>;
}

// ---------------------------------------------------------------------------
// In-memory implementation (for development / tests)
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    members: RwLock<HashMap<(String, String), SpaceMember>>,
    messages: Mutex<Vec<Message>>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user_id` to `space_id` with the default member role.
    pub fn add_member(&self, space_id: &str, user_id: &str) -> SpaceMember {
        let member = SpaceMember {
            space_id: space_id.to_string(),
            user_id: user_id.to_string(),
            role: ROLE_MEMBER.to_string(),
            joined_at: Utc::now(),
        };
        self.members
            .write()
            .insert((space_id.to_string(), user_id.to_string()), member.clone());
        member
    }

    /// Make every subsequent message write fail with an internal error.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl SpaceStore for MemoryStore {
    async fn find_membership(
        &self,
        space_id: &str,
        user_id: &str,
    ) -> Result<Option<SpaceMember>, ApiError> {
        Ok(self
            .members
            .read()
            .get(&(space_id.to_string(), user_id.to_string()))
            .cloned())
    }

    async fn create_message(&self, new: NewMessage<'_>) -> Result<Message, ApiError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            tracing::error!(space_id = %new.space_id, "message write rejected by store");
            return Err(ApiError::internal("An internal error occurred"));
        }
        let message = Message::stamp(new);
        self.messages.lock().push(message.clone());
        Ok(message)
    }

    async fn list_messages(&self, space_id: &str, limit: i64) -> Result<Vec<Message>, ApiError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(self
            .messages
            .lock()
            .iter()
            .rev()
            .filter(|m| m.space_id == space_id)
            .take(limit)
            .cloned()
            .collect())
    }
}
