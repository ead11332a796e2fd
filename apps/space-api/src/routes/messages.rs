//! Space chat endpoints. Sent messages are persisted, then broadcast to the
//! space's live connections.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use pomohub_common::id::{is_prefixed_ulid, prefix};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

use crate::auth::middleware::AuthUser;
use crate::error::{ApiError, ApiErrorBody, FieldError};
use crate::gateway::events::EventType;
use crate::models::message::{Message, NewMessage};
use crate::AppState;

/// Longest accepted message, in characters.
pub const MAX_CONTENT_CHARS: usize = 4000;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/spaces/{space_id}/messages",
        get(list_messages).post(send_message),
    )
}

fn parse_space_id(raw: &str) -> Result<(), ApiError> {
    if is_prefixed_ulid(prefix::SPACE, raw) {
        Ok(())
    } else {
        Err(ApiError::bad_request("Invalid space ID"))
    }
}

async fn require_member(state: &AppState, space_id: &str, user_id: &str) -> Result<(), ApiError> {
    state
        .store
        .find_membership(space_id, user_id)
        .await?
        .ok_or_else(|| ApiError::forbidden("You are not a member of this space"))?;

    Ok(())
}

// ---------------------------------------------------------------------------
// POST /api/v1/spaces/{space_id}/messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SendMessageRequest {
    pub content: Option<String>,
}

#[utoipa::path(
    post,
    path = "/api/v1/spaces/{space_id}/messages",
    tag = "Messages",
    security(("bearer" = [])),
    params(("space_id" = String, Path, description = "Space ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message stored and broadcast", body = Message),
        (status = 400, description = "Invalid space ID or content", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Not a member of the space", body = ApiErrorBody),
        (status = 500, description = "Message could not be stored", body = ApiErrorBody),
    )
)]
pub async fn send_message(
    AuthUser { user_id }: AuthUser,
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    body: Result<Json<SendMessageRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let Json(body) = body?;
    parse_space_id(&space_id)?;

    let content = match body.content.as_deref().map(str::trim) {
        Some(c) if c.is_empty() => None,
        other => other,
    };
    let content = match content {
        None => {
            return Err(ApiError::validation(vec![FieldError {
                field: "content".to_string(),
                message: "Message content is required".to_string(),
            }]));
        }
        Some(c) if c.chars().count() > MAX_CONTENT_CHARS => {
            return Err(ApiError::validation(vec![FieldError {
                field: "content".to_string(),
                message: format!("Message content must be {MAX_CONTENT_CHARS} characters or fewer"),
            }]));
        }
        Some(c) => c,
    };

    require_member(&state, &space_id, &user_id).await?;

    // Nothing is broadcast unless the write succeeded.
    let message = state
        .store
        .create_message(NewMessage {
            space_id: &space_id,
            sender_id: &user_id,
            content,
        })
        .await?;

    match serde_json::to_value(&message) {
        Ok(payload) => state.hub.broadcast(&space_id, EventType::ChatMessage, payload),
        Err(err) => tracing::error!(?err, message_id = %message.id, "failed to encode message"),
    }

    Ok((StatusCode::CREATED, Json(message)))
}

// ---------------------------------------------------------------------------
// GET /api/v1/spaces/{space_id}/messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, IntoParams)]
pub struct ListMessagesParams {
    /// Number of messages to return (1-100, default 50).
    pub limit: Option<i64>,
}

#[utoipa::path(
    get,
    path = "/api/v1/spaces/{space_id}/messages",
    tag = "Messages",
    security(("bearer" = [])),
    params(("space_id" = String, Path, description = "Space ID"), ListMessagesParams),
    responses(
        (status = 200, description = "Recent messages, newest first", body = [Message]),
        (status = 400, description = "Invalid space ID", body = ApiErrorBody),
        (status = 401, description = "Unauthorized", body = ApiErrorBody),
        (status = 403, description = "Not a member of the space", body = ApiErrorBody),
    )
)]
pub async fn list_messages(
    AuthUser { user_id }: AuthUser,
    State(state): State<AppState>,
    Path(space_id): Path<String>,
    Query(params): Query<ListMessagesParams>,
) -> Result<Json<Vec<Message>>, ApiError> {
    parse_space_id(&space_id)?;
    require_member(&state, &space_id, &user_id).await?;

    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let data = state.store.list_messages(&space_id, limit).await?;

    Ok(Json(data))
}
