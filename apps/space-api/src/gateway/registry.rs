//! Space registry: which connections are joined to which space.
//!
//! Owned exclusively by the hub task; nothing here is synchronized.

use std::collections::HashMap;
use std::sync::Arc;

use super::connection::{ConnectionKey, ConnectionRecord};

/// Outcome of fanning one frame out to a space.
#[derive(Debug, Default)]
pub struct FanOut {
    /// Number of connections a delivery was attempted on.
    pub attempted: usize,
    /// Connections removed because their delivery failed.
    pub evicted: Vec<ConnectionRecord>,
}

/// space_id → user_id → connection.
///
/// Empty space buckets are removed as soon as their last connection leaves.
#[derive(Debug, Default)]
pub struct SpaceRegistry {
    spaces: HashMap<String, HashMap<String, ConnectionRecord>>,
}

impl SpaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection in its space.
    ///
    /// Returns the record it replaced if the same user was already joined to
    /// that space. Dropping the returned record closes the older connection.
    pub fn join(&mut self, record: ConnectionRecord) -> Option<ConnectionRecord> {
        self.spaces
            .entry(record.space_id().to_string())
            .or_default()
            .insert(record.user_id().to_string(), record)
    }

    /// Remove the connection identified by `key`.
    ///
    /// Returns `None` when the connection is not registered, including when
    /// a newer connection of the same user has replaced it.
    pub fn leave(&mut self, key: &ConnectionKey) -> Option<ConnectionRecord> {
        let bucket = self.spaces.get_mut(&key.space_id)?;
        if bucket.get(&key.user_id)?.key().connection_id != key.connection_id {
            return None;
        }

        let removed = bucket.remove(&key.user_id);
        if bucket.is_empty() {
            self.spaces.remove(&key.space_id);
        }
        removed
    }

    /// Hand `frame` to every connection in `space_id`.
    ///
    /// A failed delivery evicts that connection and never stops delivery to
    /// the others.
    pub fn fan_out(&mut self, space_id: &str, frame: &Arc<str>) -> FanOut {
        let Some(bucket) = self.spaces.get_mut(space_id) else {
            return FanOut::default();
        };

        let attempted = bucket.len();
        let mut failed = Vec::new();
        for (user_id, record) in bucket.iter() {
            if let Err(err) = record.deliver(frame) {
                tracing::warn!(
                    space_id,
                    user_id = %user_id,
                    connection_id = %record.key().connection_id,
                    %err,
                    "delivery failed, evicting connection"
                );
                failed.push(user_id.clone());
            }
        }

        let evicted = failed
            .iter()
            .filter_map(|user_id| bucket.remove(user_id))
            .collect();
        if bucket.is_empty() {
            self.spaces.remove(space_id);
        }

        FanOut { attempted, evicted }
    }

    pub fn member_count(&self, space_id: &str) -> usize {
        self.spaces.get(space_id).map_or(0, HashMap::len)
    }

    /// User ids joined to `space_id`, sorted.
    pub fn members(&self, space_id: &str) -> Vec<String> {
        let mut members: Vec<String> = self
            .spaces
            .get(space_id)
            .map(|bucket| bucket.keys().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn contains_space(&self, space_id: &str) -> bool {
        self.spaces.contains_key(space_id)
    }

    pub fn space_count(&self) -> usize {
        self.spaces.len()
    }
}
