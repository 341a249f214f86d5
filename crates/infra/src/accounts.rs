//! User accounts: registration, login, profile lookup, admin bootstrap.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use sweetshop_auth::{Registration, TokenIssuer, User, UserProfile, hash_password, verify_password};
use sweetshop_core::{DomainError, UserId};

use crate::config::AdminBootstrap;
use crate::error::{ServiceError, ServiceResult};
use crate::store::{StoreError, UserStore};

const DUPLICATE_USER: &str = "User with this username or email already exists";
const BAD_CREDENTIALS: &str = "Invalid credentials";

/// An authenticated user together with a freshly issued bearer token.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub user: UserProfile,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenIssuer>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self { users, tokens }
    }

    #[instrument(skip(self, registration), fields(username = %registration.username), err)]
    pub async fn register(&self, registration: Registration) -> ServiceResult<AuthSession> {
        let registration = registration.validate()?;
        let password_hash = hash_blocking(registration.password.clone()).await?;
        let user = registration.into_user(UserId::new(), password_hash, Utc::now());

        self.insert(&user).await?;
        info!(user_id = %user.id, "user registered");
        self.session_for(&user)
    }

    #[instrument(skip(self, email, password), err)]
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<AuthSession> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(DomainError::validation("Please provide email and password").into());
        }

        let Some(user) = self.users.find_user_by_email(email).await? else {
            return Err(DomainError::unauthorized(BAD_CREDENTIALS).into());
        };
        if !verify_blocking(password.to_string(), user.password_hash.clone()).await? {
            return Err(DomainError::unauthorized(BAD_CREDENTIALS).into());
        }

        info!(user_id = %user.id, "login succeeded");
        self.session_for(&user)
    }

    pub async fn profile(&self, user_id: UserId) -> ServiceResult<UserProfile> {
        let user = self
            .users
            .get_user(user_id)
            .await?
            .ok_or(DomainError::not_found("User"))?;
        Ok(UserProfile::from(&user))
    }

    /// Make sure the configured administrator exists. Safe to run on every start.
    #[instrument(skip(self, admin), fields(email = %admin.email), err)]
    pub async fn ensure_admin(&self, admin: &AdminBootstrap) -> ServiceResult<UserProfile> {
        if let Some(existing) = self.users.find_user_by_email(admin.email.trim()).await? {
            if !existing.is_admin {
                warn!(user_id = %existing.id, "configured admin email belongs to a non-admin user");
            }
            return Ok(UserProfile::from(&existing));
        }

        let registration = Registration {
            username: admin.username.clone(),
            email: admin.email.clone(),
            password: admin.password.clone(),
        }
        .validate()?;
        let password_hash = hash_blocking(registration.password.clone()).await?;
        let user = User {
            is_admin: true,
            ..registration.into_user(UserId::new(), password_hash, Utc::now())
        };

        self.insert(&user).await?;
        info!(user_id = %user.id, "admin account created");
        Ok(UserProfile::from(&user))
    }

    async fn insert(&self, user: &User) -> ServiceResult<()> {
        match self.users.insert_user(user).await {
            Ok(()) => Ok(()),
            Err(StoreError::Conflict(_)) => Err(DomainError::conflict(DUPLICATE_USER).into()),
            Err(other) => Err(other.into()),
        }
    }

    fn session_for(&self, user: &User) -> ServiceResult<AuthSession> {
        let token = self
            .tokens
            .issue(user.id, &user.username, user.is_admin, Utc::now())?;
        Ok(AuthSession {
            user: UserProfile::from(user),
            token,
        })
    }
}

async fn hash_blocking(password: String) -> ServiceResult<String> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ServiceError::Task(e.to_string()))?
        .map_err(ServiceError::from)
}

async fn verify_blocking(password: String, hash: String) -> ServiceResult<bool> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| ServiceError::Task(e.to_string()))?
        .map_err(ServiceError::from)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use sweetshop_auth::{Hs256Jwt, JwtValidator};

    use super::*;
    use crate::store::InMemoryStore;

    fn service() -> (AccountService, Arc<Hs256Jwt>) {
        let jwt = Arc::new(Hs256Jwt::new(b"test-secret", Duration::hours(24)));
        let service = AccountService::new(Arc::new(InMemoryStore::new()), jwt.clone());
        (service, jwt)
    }

    fn registration(username: &str, email: &str) -> Registration {
        Registration {
            username: username.to_string(),
            email: email.to_string(),
            password: "password123".to_string(),
        }
    }

    #[tokio::test]
    async fn register_then_login() {
        let (accounts, jwt) = service();
        let registered = accounts
            .register(registration("testuser", "test@example.com"))
            .await
            .unwrap();
        assert!(!registered.user.is_admin);

        let session = accounts.login("test@example.com", "password123").await.unwrap();
        assert_eq!(session.user.id, registered.user.id);

        let claims = jwt.validate(&session.token, Utc::now()).unwrap();
        assert_eq!(claims.user_id, registered.user.id);
        assert_eq!(claims.username, "testuser");
        assert!(!claims.is_admin);
    }

    #[tokio::test]
    async fn duplicate_registration_is_a_conflict() {
        let (accounts, _) = service();
        accounts.register(registration("a", "a@example.com")).await.unwrap();

        for dup in [registration("a", "b@example.com"), registration("b", "a@example.com")] {
            let err = accounts.register(dup).await.unwrap_err();
            assert_eq!(err.as_domain(), Some(&DomainError::conflict(DUPLICATE_USER)));
        }
    }

    #[tokio::test]
    async fn bad_credentials_are_indistinguishable() {
        let (accounts, _) = service();
        accounts.register(registration("a", "a@example.com")).await.unwrap();

        let unknown = accounts.login("nobody@example.com", "password123").await.unwrap_err();
        let wrong = accounts.login("a@example.com", "wrong-password").await.unwrap_err();
        let expected = DomainError::unauthorized(BAD_CREDENTIALS);
        assert_eq!(unknown.as_domain(), Some(&expected));
        assert_eq!(wrong.as_domain(), Some(&expected));
    }

    #[tokio::test]
    async fn login_requires_both_fields() {
        let (accounts, _) = service();
        let err = accounts.login("", "x").await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(DomainError::Validation(_))));
    }

    #[tokio::test]
    async fn profile_lookup() {
        let (accounts, _) = service();
        let session = accounts.register(registration("a", "a@example.com")).await.unwrap();
        assert_eq!(accounts.profile(session.user.id).await.unwrap(), session.user);
        assert_eq!(
            accounts.profile(UserId::new()).await.unwrap_err().as_domain(),
            Some(&DomainError::not_found("User"))
        );
    }

    #[tokio::test]
    async fn admin_bootstrap_is_idempotent() {
        let (accounts, jwt) = service();
        let admin = AdminBootstrap {
            username: "admin".to_string(),
            email: "admin@example.com".to_string(),
            password: "admin123".to_string(),
        };

        let first = accounts.ensure_admin(&admin).await.unwrap();
        let second = accounts.ensure_admin(&admin).await.unwrap();
        assert!(first.is_admin);
        assert_eq!(first.id, second.id);

        let session = accounts.login("admin@example.com", "admin123").await.unwrap();
        assert!(jwt.validate(&session.token, Utc::now()).unwrap().is_admin);
    }
}
