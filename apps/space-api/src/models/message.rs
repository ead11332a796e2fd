use chrono::{DateTime, Utc};
use diesel::prelude::*;
use pomohub_common::id::prefix;
use pomohub_common::PrefixedId;
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::schema::messages;

/// A persisted chat message in a space.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize, ToSchema)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: String,
    pub space_id: String,
    pub sender_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A chat message that has not been stored yet.
#[derive(Debug, Clone, Copy)]
pub struct NewMessage<'a> {
    pub space_id: &'a str,
    pub sender_id: &'a str,
    pub content: &'a str,
}

impl Message {
    /// Assign identity and timestamps to a new message.
    pub fn stamp(new: NewMessage<'_>) -> Self {
        let now = Utc::now();
        Self {
            id: Self::generate(),
            space_id: new.space_id.to_string(),
            sender_id: new.sender_id.to_string(),
            content: new.content.to_string(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl PrefixedId for Message {
    const PREFIX: &'static str = prefix::MESSAGE;
}
