use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use sweetshop_core::UserId;

/// JWT claims model (transport-agnostic).
///
/// Field names follow the wire format clients already rely on
/// (`userId`, `username`, `isAdmin`); `iat`/`exp` are Unix seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JwtClaims {
    /// Subject: the authenticated user.
    pub user_id: UserId,

    pub username: String,

    /// Grants catalog deletion and restocking.
    pub is_admin: bool,

    /// Issued-at timestamp.
    pub iat: i64,

    /// Expiration timestamp.
    pub exp: i64,
}

impl JwtClaims {
    pub fn new(
        user_id: UserId,
        username: impl Into<String>,
        is_admin: bool,
        issued_at: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            user_id,
            username: username.into(),
            is_admin,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenValidationError {
    #[error("token has expired")]
    Expired,

    #[error("token not yet valid (issued_at is in the future)")]
    NotYetValid,

    #[error("invalid token time window (exp <= iat)")]
    InvalidTimeWindow,
}

/// Deterministically validate JWT claims.
///
/// Note: this validates the *claims* only. Signature verification happens in
/// [`crate::token`].
pub fn validate_claims(claims: &JwtClaims, now: DateTime<Utc>) -> Result<(), TokenValidationError> {
    let now = now.timestamp();
    if claims.exp <= claims.iat {
        return Err(TokenValidationError::InvalidTimeWindow);
    }
    if now < claims.iat {
        return Err(TokenValidationError::NotYetValid);
    }
    if now >= claims.exp {
        return Err(TokenValidationError::Expired);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims_at(issued_at: DateTime<Utc>) -> JwtClaims {
        JwtClaims::new(UserId::new(), "admin", true, issued_at, Duration::hours(24))
    }

    #[test]
    fn fresh_claims_are_valid() {
        let now = Utc::now();
        assert_eq!(validate_claims(&claims_at(now), now), Ok(()));
    }

    #[test]
    fn expired_claims_are_rejected() {
        let issued = Utc::now() - Duration::hours(25);
        assert_eq!(
            validate_claims(&claims_at(issued), Utc::now()),
            Err(TokenValidationError::Expired)
        );
    }

    #[test]
    fn claims_from_the_future_are_rejected() {
        let now = Utc::now();
        let claims = claims_at(now + Duration::minutes(5));
        assert_eq!(validate_claims(&claims, now), Err(TokenValidationError::NotYetValid));
    }

    #[test]
    fn empty_window_is_rejected() {
        let now = Utc::now();
        let claims = JwtClaims::new(UserId::new(), "u", false, now, Duration::zero());
        assert_eq!(
            validate_claims(&claims, now),
            Err(TokenValidationError::InvalidTimeWindow)
        );
    }

    #[test]
    fn wire_names_are_camel_case() {
        let claims = claims_at(Utc::now());
        let json = serde_json::to_value(&claims).unwrap();
        assert!(json.get("userId").is_some());
        assert_eq!(json["isAdmin"], true);
        assert_eq!(json["username"], "admin");
    }
}
