//! Infrastructure layer: storage adapters, application services, config.

pub mod accounts;
pub mod catalog;
pub mod config;
pub mod error;
pub mod ledger;
pub mod store;

pub use accounts::{AccountService, AuthSession};
pub use catalog::SweetCatalog;
pub use config::{AdminBootstrap, AppConfig, ConfigError};
pub use error::{ServiceError, ServiceResult};
pub use ledger::{InventoryLedger, LedgerReceipt};
pub use store::{StoreError, Stores};
