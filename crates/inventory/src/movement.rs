//! Stock movement rules (purchase / restock).
//!
//! These functions decide whether a movement is allowed and compute the
//! resulting state. They perform no IO; storage adapters call them while
//! holding whatever lock or SQL transaction makes the movement atomic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use sweetshop_core::{DomainError, DomainResult, SweetId, TransactionId, UserId};

use crate::sweet::{MAX_QUANTITY, Sweet};
use crate::transaction::{Transaction, TransactionKind};

/// A validated request to move stock in or out of one sweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub user_id: UserId,
    pub sweet_id: SweetId,
    pub kind: TransactionKind,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Validate a requested movement size: a positive integer within stock bounds.
pub fn parse_quantity(raw: i64) -> DomainResult<u32> {
    u32::try_from(raw)
        .ok()
        .filter(|q| (1..=MAX_QUANTITY).contains(q))
        .ok_or_else(|| DomainError::validation("Please provide a valid quantity"))
}

impl StockMovement {
    pub fn purchase(
        user_id: UserId,
        sweet_id: SweetId,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Self::new(user_id, sweet_id, TransactionKind::Purchase, quantity, occurred_at)
    }

    pub fn restock(
        user_id: UserId,
        sweet_id: SweetId,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Self::new(user_id, sweet_id, TransactionKind::Restock, quantity, occurred_at)
    }

    fn new(
        user_id: UserId,
        sweet_id: SweetId,
        kind: TransactionKind,
        quantity: i64,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            user_id,
            sweet_id,
            kind,
            quantity: parse_quantity(quantity)?,
            occurred_at,
        })
    }

    /// Stock level after applying this movement to `current`.
    pub fn resulting_quantity(&self, current: u32) -> DomainResult<u32> {
        match self.kind {
            TransactionKind::Purchase => {
                current
                    .checked_sub(self.quantity)
                    .ok_or(DomainError::InsufficientStock {
                        requested: self.quantity,
                        available: current,
                    })
            }
            TransactionKind::Restock => current
                .checked_add(self.quantity)
                .filter(|q| *q <= MAX_QUANTITY)
                .ok_or_else(|| DomainError::validation("Quantity is too large")),
        }
    }

    /// Compute the updated sweet. `sweet` itself is left untouched, so a
    /// rejected movement can never leave partial state behind.
    pub fn apply_to(&self, sweet: &Sweet) -> DomainResult<Sweet> {
        if sweet.id != self.sweet_id {
            return Err(DomainError::invalid_id("movement targets a different sweet"));
        }
        let quantity = self.resulting_quantity(sweet.quantity)?;
        Ok(Sweet {
            quantity,
            updated_at: self.occurred_at,
            ..sweet.clone()
        })
    }

    /// The log entry recording this movement.
    pub fn to_transaction(&self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            user_id: self.user_id,
            sweet_id: self.sweet_id,
            quantity: self.quantity,
            kind: self.kind,
            created_at: self.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweet::NewSweet;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn sweet_with_stock(quantity: i64) -> Sweet {
        Sweet::create(
            SweetId::new(),
            NewSweet {
                name: "Kaju Katli".to_string(),
                category: "Barfi".to_string(),
                description: None,
                price: Decimal::new(980, 0),
                quantity,
            },
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn purchase_decrements_and_records() {
        let sweet = sweet_with_stock(12);
        let user = UserId::new();
        let mv = StockMovement::purchase(user, sweet.id, 5, Utc::now()).unwrap();

        let updated = mv.apply_to(&sweet).unwrap();
        assert_eq!(updated.quantity, 7);
        assert_eq!(updated.updated_at, mv.occurred_at);
        assert_eq!(updated.created_at, sweet.created_at);

        let tx = mv.to_transaction(TransactionId::new());
        assert_eq!(tx.kind, TransactionKind::Purchase);
        assert_eq!(tx.quantity, 5);
        assert_eq!(tx.sweet_id, sweet.id);
        assert_eq!(tx.user_id, user);
    }

    #[test]
    fn purchase_beyond_stock_is_rejected() {
        let sweet = sweet_with_stock(7);
        let mv = StockMovement::purchase(UserId::new(), sweet.id, 10, Utc::now()).unwrap();
        let err = mv.apply_to(&sweet).unwrap_err();
        assert_eq!(err, DomainError::InsufficientStock { requested: 10, available: 7 });
    }

    #[test]
    fn purchasing_exact_stock_empties_it() {
        let sweet = sweet_with_stock(4);
        let mv = StockMovement::purchase(UserId::new(), sweet.id, 4, Utc::now()).unwrap();
        assert_eq!(mv.apply_to(&sweet).unwrap().quantity, 0);
    }

    #[test]
    fn quantity_must_be_positive() {
        for bad in [0, -1, i64::MIN, i64::from(MAX_QUANTITY) + 1] {
            let err = StockMovement::restock(UserId::new(), SweetId::new(), bad, Utc::now())
                .unwrap_err();
            assert_eq!(err, DomainError::validation("Please provide a valid quantity"));
        }
    }

    #[test]
    fn restock_cannot_overflow_stock_bound() {
        let sweet = sweet_with_stock(i64::from(MAX_QUANTITY));
        let mv = StockMovement::restock(UserId::new(), sweet.id, 1, Utc::now()).unwrap();
        assert!(matches!(mv.apply_to(&sweet), Err(DomainError::Validation(_))));
    }

    #[test]
    fn movement_for_another_sweet_is_rejected() {
        let sweet = sweet_with_stock(4);
        let mv = StockMovement::restock(UserId::new(), SweetId::new(), 1, Utc::now()).unwrap();
        assert!(matches!(mv.apply_to(&sweet), Err(DomainError::InvalidId(_))));
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any sequence of movements keeps stock consistent with the
        /// accepted movements, and rejected purchases change nothing.
        #[test]
        fn stock_tracks_accepted_movements(
            initial in 0i64..1_000,
            ops in prop::collection::vec((any::<bool>(), 1i64..200), 1..40)
        ) {
            let mut sweet = sweet_with_stock(initial);
            let mut expected = initial;

            for (is_purchase, qty) in ops {
                let mv = if is_purchase {
                    StockMovement::purchase(UserId::new(), sweet.id, qty, Utc::now()).unwrap()
                } else {
                    StockMovement::restock(UserId::new(), sweet.id, qty, Utc::now()).unwrap()
                };

                match mv.apply_to(&sweet) {
                    Ok(next) => {
                        expected += if is_purchase { -qty } else { qty };
                        sweet = next;
                    }
                    Err(DomainError::InsufficientStock { requested, available }) => {
                        prop_assert!(is_purchase);
                        prop_assert_eq!(i64::from(requested), qty);
                        prop_assert_eq!(available, sweet.quantity);
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }

                prop_assert!(expected >= 0);
                prop_assert_eq!(i64::from(sweet.quantity), expected);
            }
        }

        /// Property: a purchase followed by a restock of the same size is a no-op on stock.
        #[test]
        fn purchase_then_restock_round_trips(stock in 1i64..10_000, pick in 1i64..10_000) {
            let qty = pick.min(stock);
            let sweet = sweet_with_stock(stock);
            let user = UserId::new();

            let after_purchase = StockMovement::purchase(user, sweet.id, qty, Utc::now())
                .unwrap()
                .apply_to(&sweet)
                .unwrap();
            let after_restock = StockMovement::restock(user, sweet.id, qty, Utc::now())
                .unwrap()
                .apply_to(&after_purchase)
                .unwrap();

            prop_assert_eq!(after_restock.quantity, sweet.quantity);
        }
    }
}
