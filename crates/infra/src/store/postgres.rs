//! Postgres-backed storage.
//!
//! ## Error mapping
//!
//! | SQLx error | Postgres code | `StoreError` |
//! |------------|---------------|--------------|
//! | Database (unique violation) | `23505` | `Conflict` (constraint name) |
//! | Database (check violation) | `23514` | `Backend` |
//! | Database (other) | any | `Backend` |
//! | PoolClosed / network / other | n/a | `Backend` |
//!
//! ## Stock movements
//!
//! `apply_movement` locks the sweet row with `SELECT ... FOR UPDATE`, applies
//! the domain rule, writes the new quantity and inserts the log entry in one
//! SQL transaction. Concurrent movements on the same sweet serialize on the
//! row lock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::instrument;
use uuid::Uuid;

use sweetshop_auth::User;
use sweetshop_core::{DomainError, SweetId, TransactionId, UserId};
use sweetshop_inventory::{
    StockMovement, Sweet, SweetChanges, SweetQuery, Transaction, TransactionKind,
};

use super::{
    MovementOutcome, SweetStore, StockLedgerStore, StoreError, StoreResult, TransactionLog,
    UserStore,
};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

const SWEET_COLUMNS: &str =
    "id, name, category, description, price, quantity, created_at, updated_at";

const TRANSACTION_COLUMNS: &str = "id, user_id, sweet_id, quantity, kind, created_at";

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, created_at";

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::backend("migrate", e.to_string()))
    }
}

#[async_trait]
impl SweetStore for PostgresStore {
    #[instrument(skip(self, sweet), fields(sweet_id = %sweet.id), err)]
    async fn insert_sweet(&self, sweet: &Sweet) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sweets (id, name, category, description, price, quantity, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(sweet.id.as_uuid())
        .bind(&sweet.name)
        .bind(&sweet.category)
        .bind(&sweet.description)
        .bind(sweet.price)
        .bind(to_sql_quantity(sweet.quantity)?)
        .bind(sweet.created_at)
        .bind(sweet.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_sweet", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(sweet_id = %id), err)]
    async fn get_sweet(&self, id: SweetId) -> StoreResult<Option<Sweet>> {
        let row = sqlx::query(&format!("SELECT {SWEET_COLUMNS} FROM sweets WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_sweet", e))?;
        row.as_ref().map(sweet_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn list_sweets(&self) -> StoreResult<Vec<Sweet>> {
        let rows = sqlx::query(&format!(
            r#"SELECT {SWEET_COLUMNS} FROM sweets ORDER BY name COLLATE "C", id"#
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_sweets", e))?;
        rows.iter().map(sweet_from_row).collect()
    }

    #[instrument(skip(self), err)]
    async fn search_sweets(&self, query: &SweetQuery) -> StoreResult<Vec<Sweet>> {
        // strpos instead of LIKE so user input needs no wildcard escaping.
        let rows = sqlx::query(&format!(
            r#"
            SELECT {SWEET_COLUMNS} FROM sweets
            WHERE ($1::text IS NULL OR strpos(lower(name), $1) > 0)
              AND ($2::text IS NULL OR strpos(lower(category), $2) > 0)
              AND ($3::numeric IS NULL OR price >= $3)
              AND ($4::numeric IS NULL OR price <= $4)
            ORDER BY name COLLATE "C", id
            "#
        ))
        .bind(query.name_needle())
        .bind(query.category_needle())
        .bind(query.min_price)
        .bind(query.max_price)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("search_sweets", e))?;
        rows.iter().map(sweet_from_row).collect()
    }

    #[instrument(skip(self, changes), fields(sweet_id = %id), err)]
    async fn update_sweet(
        &self,
        id: SweetId,
        changes: &SweetChanges,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Sweet>> {
        let quantity = changes.quantity.map(to_sql_quantity).transpose()?;
        let row = sqlx::query(&format!(
            r#"
            UPDATE sweets SET
                name = COALESCE($2, name),
                category = COALESCE($3, category),
                description = CASE WHEN $4 THEN $5 ELSE description END,
                price = COALESCE($6, price),
                quantity = COALESCE($7, quantity),
                updated_at = $8
            WHERE id = $1
            RETURNING {SWEET_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(&changes.name)
        .bind(&changes.category)
        .bind(changes.description.is_some())
        .bind(changes.description.clone().flatten())
        .bind(changes.price)
        .bind(quantity)
        .bind(now)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_sweet", e))?;
        row.as_ref().map(sweet_from_row).transpose()
    }

    #[instrument(skip(self), fields(sweet_id = %id), err)]
    async fn delete_sweet(&self, id: SweetId) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM sweets WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_sweet", e))?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TransactionLog for PostgresStore {
    #[instrument(skip(self, transaction), fields(transaction_id = %transaction.id), err)]
    async fn record(&self, transaction: &Transaction) -> StoreResult<()> {
        insert_transaction(&self.pool, transaction).await
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_by_user(&self, user_id: UserId) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions_by_user", e))?;
        rows.iter().map(transaction_from_row).collect()
    }

    #[instrument(skip(self), fields(sweet_id = %sweet_id), err)]
    async fn list_by_sweet(&self, sweet_id: SweetId) -> StoreResult<Vec<Transaction>> {
        let rows = sqlx::query(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE sweet_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(sweet_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_transactions_by_sweet", e))?;
        rows.iter().map(transaction_from_row).collect()
    }
}

#[async_trait]
impl StockLedgerStore for PostgresStore {
    #[instrument(
        skip(self, movement),
        fields(
            sweet_id = %movement.sweet_id,
            kind = %movement.kind,
            quantity = movement.quantity
        ),
        err
    )]
    async fn apply_movement(
        &self,
        movement: &StockMovement,
        transaction_id: TransactionId,
    ) -> StoreResult<MovementOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        let row = sqlx::query(&format!(
            "SELECT {SWEET_COLUMNS} FROM sweets WHERE id = $1 FOR UPDATE"
        ))
        .bind(movement.sweet_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("lock_sweet", e))?;

        let Some(row) = row else {
            tx.rollback()
                .await
                .map_err(|e| map_sqlx_error("rollback", e))?;
            return Ok(MovementOutcome::Rejected(DomainError::not_found("Sweet")));
        };
        let current = sweet_from_row(&row)?;

        let updated = match movement.apply_to(&current) {
            Ok(updated) => updated,
            Err(rule) => {
                tx.rollback()
                    .await
                    .map_err(|e| map_sqlx_error("rollback", e))?;
                return Ok(MovementOutcome::Rejected(rule));
            }
        };

        sqlx::query("UPDATE sweets SET quantity = $2, updated_at = $3 WHERE id = $1")
            .bind(updated.id.as_uuid())
            .bind(to_sql_quantity(updated.quantity)?)
            .bind(updated.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("update_stock", e))?;

        let transaction = movement.to_transaction(transaction_id);
        insert_transaction(&mut *tx, &transaction).await?;

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;

        Ok(MovementOutcome::Applied {
            sweet: updated,
            transaction,
        })
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, is_admin, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id.as_uuid())
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_admin)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self, email), err)]
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_user", e))?;
        row.as_ref().map(user_from_row).transpose()
    }
}

async fn insert_transaction<'e, E>(executor: E, transaction: &Transaction) -> StoreResult<()>
where
    E: sqlx::PgExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO transactions (id, user_id, sweet_id, quantity, kind, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(transaction.id.as_uuid())
    .bind(transaction.user_id.as_uuid())
    .bind(transaction.sweet_id.as_uuid())
    .bind(to_sql_quantity(transaction.quantity)?)
    .bind(transaction.kind.as_str())
    .bind(transaction.created_at)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_transaction", e))?;
    Ok(())
}

fn to_sql_quantity(quantity: u32) -> StoreResult<i32> {
    i32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt(format!("quantity {quantity} exceeds INTEGER range")))
}

fn from_sql_quantity(quantity: i32) -> StoreResult<u32> {
    u32::try_from(quantity)
        .map_err(|_| StoreError::Corrupt(format!("negative quantity {quantity} in storage")))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> StoreResult<T>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| StoreError::Corrupt(format!("column {name}: {e}")))
}

fn sweet_from_row(row: &PgRow) -> StoreResult<Sweet> {
    Ok(Sweet {
        id: SweetId::from_uuid(column::<Uuid>(row, "id")?),
        name: column(row, "name")?,
        category: column(row, "category")?,
        description: column(row, "description")?,
        price: column::<Decimal>(row, "price")?,
        quantity: from_sql_quantity(column(row, "quantity")?)?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn transaction_from_row(row: &PgRow) -> StoreResult<Transaction> {
    let kind: String = column(row, "kind")?;
    Ok(Transaction {
        id: TransactionId::from_uuid(column::<Uuid>(row, "id")?),
        user_id: UserId::from_uuid(column::<Uuid>(row, "user_id")?),
        sweet_id: SweetId::from_uuid(column::<Uuid>(row, "sweet_id")?),
        quantity: from_sql_quantity(column(row, "quantity")?)?,
        kind: kind
            .parse::<TransactionKind>()
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        created_at: column(row, "created_at")?,
    })
}

fn user_from_row(row: &PgRow) -> StoreResult<User> {
    Ok(User {
        id: UserId::from_uuid(column::<Uuid>(row, "id")?),
        username: column(row, "username")?,
        email: column(row, "email")?,
        password_hash: column(row, "password_hash")?,
        is_admin: column(row, "is_admin")?,
        created_at: column(row, "created_at")?,
    })
}

fn map_sqlx_error(operation: &'static str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                let constraint = db_err.constraint().unwrap_or("unique").to_string();
                StoreError::Conflict(constraint)
            } else {
                StoreError::backend(operation, format!("database error: {}", db_err.message()))
            }
        }
        sqlx::Error::PoolClosed => StoreError::backend(operation, "connection pool closed"),
        other => StoreError::backend(operation, other.to_string()),
    }
}
