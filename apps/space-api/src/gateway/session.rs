//! Connection setup checks: authenticate, validate the space, authorize.

use pomohub_common::id::{is_prefixed_ulid, prefix};
use thiserror::Error;

use crate::AppState;

/// Close codes (4000-range for application-level).
pub const CLOSE_INTERNAL_ERROR: u16 = 4000;
pub const CLOSE_INVALID_SPACE: u16 = 4002;
pub const CLOSE_NOT_MEMBER: u16 = 4003;
pub const CLOSE_AUTH_FAILED: u16 = 4004;

/// Reasons a connection is refused before it joins the hub.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Missing token")]
    MissingToken,
    #[error("Invalid or expired token")]
    InvalidToken,
    #[error("Invalid space ID")]
    InvalidSpaceId,
    #[error("Not a member of this space")]
    NotMember,
    #[error("Membership lookup failed")]
    Internal,
}

impl SessionError {
    /// WebSocket close code sent before the connection is dropped.
    pub fn close_code(&self) -> u16 {
        match self {
            Self::MissingToken | Self::InvalidToken => CLOSE_AUTH_FAILED,
            Self::InvalidSpaceId => CLOSE_INVALID_SPACE,
            Self::NotMember => CLOSE_NOT_MEMBER,
            Self::Internal => CLOSE_INTERNAL_ERROR,
        }
    }
}

/// Who is connecting, and to which space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub user_id: String,
    pub space_id: String,
}

/// Run the setup checks in order. The first failure ends the connection.
pub async fn authorize(
    state: &AppState,
    raw_space_id: &str,
    token: Option<&str>,
) -> Result<SessionIdentity, SessionError> {
    let token = token
        .filter(|t| !t.is_empty())
        .ok_or(SessionError::MissingToken)?;
    let user_id = state
        .tokens
        .authenticate(token)
        .ok_or(SessionError::InvalidToken)?;

    if !is_prefixed_ulid(prefix::SPACE, raw_space_id) {
        return Err(SessionError::InvalidSpaceId);
    }

    let membership = state
        .store
        .find_membership(raw_space_id, &user_id)
        .await
        .map_err(|err| {
            tracing::error!(?err, space_id = %raw_space_id, "membership lookup failed");
            SessionError::Internal
        })?;
    if membership.is_none() {
        return Err(SessionError::NotMember);
    }

    Ok(SessionIdentity {
        user_id,
        space_id: raw_space_id.to_string(),
    })
}
