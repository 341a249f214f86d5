//! Storage ports and their adapters.
//!
//! Services talk to storage only through the traits below. Two adapters
//! implement all of them:
//!
//! - [`InMemoryStore`]: one `RwLock` around every table; for tests and local runs.
//! - [`PostgresStore`]: SQLx over a connection pool, schema in `migrations/`.
//!
//! ## Stock movements
//!
//! [`StockLedgerStore::apply_movement`] is the only write path for purchases
//! and restocks. An adapter must check the stock rule, write the new quantity
//! and append the log entry as one atomic step: either all three happen or
//! none do, and two concurrent purchases can never both spend the same units.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use sweetshop_auth::User;
use sweetshop_core::{DomainError, SweetId, TransactionId, UserId};
use sweetshop_inventory::{StockMovement, Sweet, SweetChanges, SweetQuery, Transaction};

mod in_memory;
mod postgres;

pub use in_memory::InMemoryStore;
pub use postgres::PostgresStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write (names the constraint or field).
    #[error("unique constraint violated: {0}")]
    Conflict(String),

    /// Persisted data could not be mapped back into the domain model.
    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    /// The backend failed (connection, pool, SQL, poisoned lock).
    #[error("storage failure in {operation}: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },
}

impl StoreError {
    pub(crate) fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        Self::Backend {
            operation,
            message: message.into(),
        }
    }
}

/// Result of attempting a stock movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MovementOutcome {
    /// Stock was updated and the movement logged.
    Applied {
        sweet: Sweet,
        transaction: Transaction,
    },

    /// The movement broke a rule (unknown sweet, insufficient stock); nothing changed.
    Rejected(DomainError),
}

#[async_trait]
pub trait SweetStore: Send + Sync {
    async fn insert_sweet(&self, sweet: &Sweet) -> StoreResult<()>;

    async fn get_sweet(&self, id: SweetId) -> StoreResult<Option<Sweet>>;

    /// Every sweet, ordered by name then id.
    async fn list_sweets(&self) -> StoreResult<Vec<Sweet>>;

    /// Sweets matching `query`, ordered like [`SweetStore::list_sweets`].
    async fn search_sweets(&self, query: &SweetQuery) -> StoreResult<Vec<Sweet>>;

    /// Merge `changes` into the stored sweet; `None` when it does not exist.
    async fn update_sweet(
        &self,
        id: SweetId,
        changes: &SweetChanges,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Sweet>>;

    /// Returns whether a sweet was removed.
    async fn delete_sweet(&self, id: SweetId) -> StoreResult<bool>;
}

/// Append-only record of stock movements.
#[async_trait]
pub trait TransactionLog: Send + Sync {
    /// Append one entry. Stock movements go through
    /// [`StockLedgerStore::apply_movement`] instead, which appends as part of
    /// the same atomic step; this is for entries whose stock change is
    /// already accounted for.
    async fn record(&self, transaction: &Transaction) -> StoreResult<()>;

    /// A user's entries, newest first.
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Transaction>>;

    /// A sweet's entries, newest first. Survives deletion of the sweet.
    async fn list_by_sweet(&self, sweet_id: SweetId) -> StoreResult<Vec<Transaction>>;
}

#[async_trait]
pub trait StockLedgerStore: Send + Sync {
    async fn apply_movement(
        &self,
        movement: &StockMovement,
        transaction_id: TransactionId,
    ) -> StoreResult<MovementOutcome>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::Conflict`] when the username or email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;
}

/// One backend seen through each storage port.
#[derive(Clone)]
pub struct Stores {
    pub sweets: Arc<dyn SweetStore>,
    pub transactions: Arc<dyn TransactionLog>,
    pub ledger: Arc<dyn StockLedgerStore>,
    pub users: Arc<dyn UserStore>,
}

impl Stores {
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: SweetStore + TransactionLog + StockLedgerStore + UserStore + 'static,
    {
        Self {
            sweets: backend.clone(),
            transactions: backend.clone(),
            ledger: backend.clone(),
            users: backend,
        }
    }

    pub fn in_memory() -> Self {
        Self::from_backend(Arc::new(InMemoryStore::new()))
    }

    /// Connect, run pending migrations, and wrap the pool.
    pub async fn postgres(database_url: &str) -> StoreResult<Self> {
        let store = PostgresStore::connect(database_url).await?;
        store.migrate().await?;
        Ok(Self::from_backend(Arc::new(store)))
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}
