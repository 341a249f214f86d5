use thiserror::Error;

use sweetshop_auth::{PasswordError, TokenError};
use sweetshop_core::DomainError;

use crate::store::StoreError;

/// Failure of an application service call.
///
/// `Domain` carries caller-facing rule violations; every other variant is an
/// internal failure the caller cannot fix.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Token(#[from] TokenError),

    /// A blocking worker (password hashing) panicked or was cancelled.
    #[error("background task failed: {0}")]
    Task(String),
}

impl ServiceError {
    /// The domain error, if this failure is one the caller caused.
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) => Some(e),
            _ => None,
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
