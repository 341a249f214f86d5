//! `sweetshop-auth`: authentication boundary: tokens, passwords, user identity.
//!
//! This crate is intentionally decoupled from HTTP and storage.

pub mod claims;
pub mod password;
pub mod token;
pub mod user;

pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use password::{PasswordError, hash_password, verify_password};
pub use token::{Hs256Jwt, JwtValidator, TokenError, TokenIssuer};
pub use user::{Registration, User, UserProfile};
