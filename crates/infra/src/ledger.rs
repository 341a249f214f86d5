//! Inventory ledger: purchases and restocks paired with their log entries.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument};

use sweetshop_core::{SweetId, TransactionId, UserId};
use sweetshop_inventory::{StockMovement, Sweet, Transaction};

use crate::error::ServiceResult;
use crate::store::{MovementOutcome, StockLedgerStore, TransactionLog};

/// A successfully applied movement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerReceipt {
    pub sweet: Sweet,
    pub transaction: Transaction,
}

#[derive(Clone)]
pub struct InventoryLedger {
    ledger: Arc<dyn StockLedgerStore>,
    log: Arc<dyn TransactionLog>,
}

impl InventoryLedger {
    pub fn new(ledger: Arc<dyn StockLedgerStore>, log: Arc<dyn TransactionLog>) -> Self {
        Self { ledger, log }
    }

    /// Take `quantity` units out of stock on behalf of `user_id`.
    #[instrument(skip(self), err)]
    pub async fn purchase(
        &self,
        user_id: UserId,
        sweet_id: SweetId,
        quantity: i64,
    ) -> ServiceResult<LedgerReceipt> {
        let movement = StockMovement::purchase(user_id, sweet_id, quantity, Utc::now())?;
        self.apply(movement).await
    }

    /// Put `quantity` units back into stock.
    #[instrument(skip(self), err)]
    pub async fn restock(
        &self,
        user_id: UserId,
        sweet_id: SweetId,
        quantity: i64,
    ) -> ServiceResult<LedgerReceipt> {
        let movement = StockMovement::restock(user_id, sweet_id, quantity, Utc::now())?;
        self.apply(movement).await
    }

    pub async fn history_for_user(&self, user_id: UserId) -> ServiceResult<Vec<Transaction>> {
        Ok(self.log.list_by_user(user_id).await?)
    }

    pub async fn history_for_sweet(&self, sweet_id: SweetId) -> ServiceResult<Vec<Transaction>> {
        Ok(self.log.list_by_sweet(sweet_id).await?)
    }

    async fn apply(&self, movement: StockMovement) -> ServiceResult<LedgerReceipt> {
        match self
            .ledger
            .apply_movement(&movement, TransactionId::new())
            .await?
        {
            MovementOutcome::Applied { sweet, transaction } => {
                info!(
                    sweet_id = %sweet.id,
                    kind = %transaction.kind,
                    quantity = transaction.quantity,
                    stock = sweet.quantity,
                    "stock movement applied"
                );
                Ok(LedgerReceipt { sweet, transaction })
            }
            MovementOutcome::Rejected(rule) => {
                debug!(sweet_id = %movement.sweet_id, kind = %movement.kind, reason = %rule, "stock movement rejected");
                Err(rule.into())
            }
        }
    }
}
