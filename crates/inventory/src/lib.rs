//! Inventory domain module.
//!
//! This crate contains business rules for sweets and their stock ledger,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod movement;
pub mod query;
pub mod sweet;
pub mod transaction;

pub use movement::{StockMovement, parse_quantity};
pub use query::{SweetQuery, sort_by_name};
pub use sweet::{MAX_QUANTITY, NewSweet, Sweet, SweetChanges, SweetPatch};
pub use transaction::{Transaction, TransactionKind, sort_newest_first};
