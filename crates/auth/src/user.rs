//! User identity model and registration rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sweetshop_core::{DomainError, DomainResult, Entity, UserId};

/// Shortest accepted password.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Stored user record. `password_hash` never leaves the server; use
/// [`UserProfile`] for anything client-facing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl Entity for User {
    type Id = UserId;

    fn id(&self) -> UserId {
        self.id
    }
}

/// Client-facing view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
            created_at: user.created_at,
        }
    }
}

/// Self-service sign-up request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl Registration {
    /// Normalize and validate; returns the cleaned registration.
    ///
    /// Username and email are trimmed; the password is taken verbatim.
    pub fn validate(self) -> DomainResult<Self> {
        let username = self.username.trim().to_string();
        let email = self.email.trim().to_string();

        if username.is_empty() || email.is_empty() || self.password.is_empty() {
            return Err(DomainError::validation("Please provide all required fields"));
        }
        if !looks_like_email(&email) {
            return Err(DomainError::validation("Please provide a valid email address"));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters long"
            )));
        }

        Ok(Self {
            username,
            email,
            password: self.password,
        })
    }

    /// Build the stored record once the password has been hashed.
    ///
    /// Self-registered users are never administrators.
    pub fn into_user(self, id: UserId, password_hash: String, now: DateTime<Utc>) -> User {
        User {
            id,
            username: self.username,
            email: self.email,
            password_hash,
            is_admin: false,
            created_at: now,
        }
    }
}

/// `local@domain.tld` shape: no whitespace, a single `@`, and a dot inside the domain.
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(username: &str, email: &str, password: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn valid_registration_is_normalized() {
        let reg = registration(" testuser ", " test@example.com", "password123")
            .validate()
            .unwrap();
        assert_eq!(reg.username, "testuser");
        assert_eq!(reg.email, "test@example.com");
    }

    #[test]
    fn missing_fields_are_rejected() {
        let err = registration("", "a@b.co", "password123").validate().unwrap_err();
        assert_eq!(err, DomainError::validation("Please provide all required fields"));
    }

    #[test]
    fn email_shape_is_checked() {
        for bad in ["plain", "a@b", "@b.co", "a@.co", "a@b.", "a b@c.de", "a@b@c.de"] {
            let err = registration("u", bad, "password123").validate().unwrap_err();
            assert_eq!(
                err,
                DomainError::validation("Please provide a valid email address"),
                "{bad} should be rejected"
            );
        }
        assert!(registration("u", "a@b.co", "password123").validate().is_ok());
    }

    #[test]
    fn short_password_is_rejected() {
        let err = registration("u", "a@b.co", "12345").validate().unwrap_err();
        assert_eq!(
            err,
            DomainError::validation("Password must be at least 6 characters long")
        );
    }

    #[test]
    fn registered_users_are_not_admins() {
        let user = registration("u", "a@b.co", "password123").validate().unwrap().into_user(
            UserId::new(),
            "hash".to_string(),
            Utc::now(),
        );
        assert!(!user.is_admin);
        assert_eq!(UserProfile::from(&user).username, "u");
    }

    #[test]
    fn profile_never_carries_the_hash() {
        let user = registration("u", "a@b.co", "password123").validate().unwrap().into_user(
            UserId::new(),
            "secret-hash".to_string(),
            Utc::now(),
        );
        let json = serde_json::to_string(&UserProfile::from(&user)).unwrap();
        assert!(!json.contains("secret-hash"));
        assert!(json.contains("isAdmin"));
    }
}
