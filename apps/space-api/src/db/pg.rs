//! PostgreSQL-backed [`SpaceStore`].

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::result::OptionalExtension;
use diesel_async::pooled_connection::deadpool::Pool;
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::AsyncPgConnection;

use crate::db::schema::{messages, space_members};
use crate::db::store::SpaceStore;
use crate::error::ApiError;
use crate::models::message::{Message, NewMessage};
use crate::models::space_member::SpaceMember;

pub type DbPool = Pool<AsyncPgConnection>;

const MAX_POOL_SIZE: usize = 20;

pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    /// Build a store over a new connection pool for `database_url`.
    ///
    /// Connections are opened lazily, so this only fails on a bad pool config.
    pub fn connect(database_url: &str) -> Self {
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(database_url);
        let pool = Pool::builder(manager)
            .max_size(MAX_POOL_SIZE)
            .build()
            .expect("failed to build connection pool");

        tracing::info!(max_size = MAX_POOL_SIZE, "database pool created");

        Self { pool }
    }
}

#[async_trait]
impl SpaceStore for PgStore {
    async fn find_membership(
        &self,
        space_id: &str,
        user_id: &str,
    ) -> Result<Option<SpaceMember>, ApiError> {
        let mut conn = self.pool.get().await?;

        let member: Option<SpaceMember> = diesel_async::RunQueryDsl::get_result(
            space_members::table
                .find((space_id, user_id))
                .select(SpaceMember::as_select()),
            &mut conn,
        )
        .await
        .optional()?;

        Ok(member)
    }

    async fn create_message(&self, new: NewMessage<'_>) -> Result<Message, ApiError> {
        let mut conn = self.pool.get().await?;

        let message: Message = diesel_async::RunQueryDsl::get_result(
            diesel::insert_into(messages::table)
                .values(Message::stamp(new))
                .returning(Message::as_returning()),
            &mut conn,
        )
        .await?;

        Ok(message)
    }

    async fn list_messages(&self, space_id: &str, limit: i64) -> Result<Vec<Message>, ApiError> {
        let mut conn = self.pool.get().await?;

        let data: Vec<Message> = diesel_async::RunQueryDsl::load(
            messages::table
                .filter(messages::space_id.eq(space_id))
                .order(messages::created_at.desc())
                .limit(limit)
                .select(Message::as_select()),
            &mut conn,
        )
        .await?;

        Ok(data)
    }
}
