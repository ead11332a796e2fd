use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::Serialize;

use crate::db::schema::space_members;

pub const ROLE_MEMBER: &str = "member";

/// A user's membership in a space. `role` is `"admin"` or `"member"`.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, Serialize)]
#[diesel(table_name = space_members)]
pub struct SpaceMember {
    pub space_id: String,
    pub user_id: String,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

