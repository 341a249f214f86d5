use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use sweetshop_auth::User;
use sweetshop_core::{DomainError, Entity, SweetId, TransactionId, UserId};
use sweetshop_inventory::{
    StockMovement, Sweet, SweetChanges, SweetQuery, Transaction, sort_by_name, sort_newest_first,
};

use super::{
    MovementOutcome, SweetStore, StockLedgerStore, StoreError, StoreResult, TransactionLog,
    UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    sweets: HashMap<SweetId, Sweet>,
    users: HashMap<UserId, User>,
    /// Append order.
    transactions: Vec<Transaction>,
}

/// In-memory implementation of every storage port.
///
/// All tables sit behind a single lock, so a stock movement's check, update
/// and log append happen under one write guard.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, operation: &'static str) -> StoreResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))
    }

    fn write(&self, operation: &'static str) -> StoreResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| StoreError::backend(operation, "lock poisoned"))
    }
}

/// Insert keyed by the entity's own id; refuses to overwrite.
fn insert_new<E: Entity + Clone>(
    table: &mut HashMap<E::Id, E>,
    entity: &E,
    what: &str,
) -> StoreResult<()> {
    let id = entity.id();
    if table.contains_key(&id) {
        return Err(StoreError::Conflict(format!("{what} id {id:?}")));
    }
    table.insert(id, entity.clone());
    Ok(())
}

fn sorted(mut sweets: Vec<Sweet>) -> Vec<Sweet> {
    sort_by_name(&mut sweets);
    sweets
}

fn newest_first(mut entries: Vec<Transaction>) -> Vec<Transaction> {
    sort_newest_first(&mut entries);
    entries
}

#[async_trait]
impl SweetStore for InMemoryStore {
    async fn insert_sweet(&self, sweet: &Sweet) -> StoreResult<()> {
        let mut tables = self.write("insert_sweet")?;
        insert_new(&mut tables.sweets, sweet, "sweet")
    }

    async fn get_sweet(&self, id: SweetId) -> StoreResult<Option<Sweet>> {
        Ok(self.read("get_sweet")?.sweets.get(&id).cloned())
    }

    async fn list_sweets(&self) -> StoreResult<Vec<Sweet>> {
        let tables = self.read("list_sweets")?;
        Ok(sorted(tables.sweets.values().cloned().collect()))
    }

    async fn search_sweets(&self, query: &SweetQuery) -> StoreResult<Vec<Sweet>> {
        let tables = self.read("search_sweets")?;
        Ok(sorted(
            tables
                .sweets
                .values()
                .filter(|s| query.matches(s))
                .cloned()
                .collect(),
        ))
    }

    async fn update_sweet(
        &self,
        id: SweetId,
        changes: &SweetChanges,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Sweet>> {
        let mut tables = self.write("update_sweet")?;
        Ok(tables.sweets.get_mut(&id).map(|sweet| {
            sweet.apply_changes(changes, now);
            sweet.clone()
        }))
    }

    async fn delete_sweet(&self, id: SweetId) -> StoreResult<bool> {
        Ok(self.write("delete_sweet")?.sweets.remove(&id).is_some())
    }
}

#[async_trait]
impl TransactionLog for InMemoryStore {
    async fn record(&self, transaction: &Transaction) -> StoreResult<()> {
        let mut tables = self.write("record_transaction")?;
        if tables.transactions.iter().any(|t| t.id == transaction.id) {
            return Err(StoreError::Conflict(format!(
                "transaction id {}",
                transaction.id
            )));
        }
        tables.transactions.push(transaction.clone());
        Ok(())
    }

    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Transaction>> {
        let tables = self.read("list_transactions_by_user")?;
        Ok(newest_first(
            tables
                .transactions
                .iter()
                .filter(|t| t.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_by_sweet(&self, sweet_id: SweetId) -> StoreResult<Vec<Transaction>> {
        let tables = self.read("list_transactions_by_sweet")?;
        Ok(newest_first(
            tables
                .transactions
                .iter()
                .filter(|t| t.sweet_id == sweet_id)
                .cloned()
                .collect(),
        ))
    }
}

#[async_trait]
impl StockLedgerStore for InMemoryStore {
    async fn apply_movement(
        &self,
        movement: &StockMovement,
        transaction_id: TransactionId,
    ) -> StoreResult<MovementOutcome> {
        let mut tables = self.write("apply_movement")?;

        let Some(current) = tables.sweets.get(&movement.sweet_id) else {
            return Ok(MovementOutcome::Rejected(DomainError::not_found("Sweet")));
        };
        let updated = match movement.apply_to(current) {
            Ok(updated) => updated,
            Err(rule) => return Ok(MovementOutcome::Rejected(rule)),
        };

        let transaction = movement.to_transaction(transaction_id);
        tables.sweets.insert(updated.id, updated.clone());
        tables.transactions.push(transaction.clone());

        Ok(MovementOutcome::Applied {
            sweet: updated,
            transaction,
        })
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut tables = self.write("insert_user")?;
        if let Some(taken) = tables.users.values().find_map(|existing| {
            if existing.username == user.username {
                Some("username")
            } else if existing.email == user.email {
                Some("email")
            } else {
                None
            }
        }) {
            return Err(StoreError::Conflict(taken.to_string()));
        }
        insert_new(&mut tables.users, user, "user")
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.read("find_user_by_email")?;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.read("get_user")?.users.get(&id).cloned())
    }
}
