//! Bearer token issuance and verification (HS256 JWT carrying a `user_id` claim).

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Lifetime of an issued token in seconds (72 hours).
pub const TOKEN_TTL_SECS: i64 = 72 * 3600;

/// Claims carried by every bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub exp: i64,
}

/// Signing and verification keys derived from the shared secret.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenKeys {
    pub fn from_secret(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);

        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Issue a token for `user_id` with the standard lifetime.
    pub fn issue(&self, user_id: &str) -> Result<String, jsonwebtoken::errors::Error> {
        self.issue_with_ttl(user_id, TOKEN_TTL_SECS)
    }

    /// Issue a token expiring `ttl_secs` from now. A negative TTL yields an
    /// already-expired token.
    pub fn issue_with_ttl(
        &self,
        user_id: &str,
        ttl_secs: i64,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            user_id: user_id.to_string(),
            exp: Utc::now().timestamp() + ttl_secs,
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
    }

    /// Verify signature and expiry, returning the token's claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation).map(|data| data.claims)
    }

    /// Resolve a bearer token to the user it was issued for.
    ///
    /// Returns `None` for malformed, forged, expired, or subject-less tokens.
    pub fn authenticate(&self, token: &str) -> Option<String> {
        match self.verify(token) {
            Ok(claims) if !claims.user_id.is_empty() => Some(claims.user_id),
            Ok(_) => None,
            Err(err) => {
                tracing::debug!(?err, "token rejected");
                None
            }
        }
    }
}
