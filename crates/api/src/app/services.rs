//! Service wiring: picks a storage backend and builds the application services.

use std::sync::Arc;

use anyhow::Context;

use sweetshop_auth::TokenIssuer;
use sweetshop_infra::{AccountService, AppConfig, InventoryLedger, Stores, SweetCatalog};

/// Everything handlers need, shared behind an `Arc` extension.
#[derive(Clone)]
pub struct AppServices {
    pub catalog: SweetCatalog,
    pub ledger: InventoryLedger,
    pub accounts: AccountService,
}

impl AppServices {
    pub fn new(stores: Stores, tokens: Arc<dyn TokenIssuer>) -> Self {
        Self {
            catalog: SweetCatalog::new(stores.sweets),
            ledger: InventoryLedger::new(stores.ledger, stores.transactions),
            accounts: AccountService::new(stores.users, tokens),
        }
    }

    /// Services over a fresh in-memory store (tests, local runs).
    pub fn in_memory(tokens: Arc<dyn TokenIssuer>) -> Self {
        Self::new(Stores::in_memory(), tokens)
    }
}

/// Build services for `config`: Postgres when `DATABASE_URL` is set, otherwise
/// in-memory. Creates the configured admin account if needed.
pub async fn build_services(
    config: &AppConfig,
    tokens: Arc<dyn TokenIssuer>,
) -> anyhow::Result<AppServices> {
    let stores = match &config.database_url {
        Some(url) => {
            tracing::info!("using postgres storage");
            Stores::postgres(url)
                .await
                .context("failed to initialize postgres storage")?
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory storage (data is lost on exit)");
            Stores::in_memory()
        }
    };

    let services = AppServices::new(stores, tokens);

    if let Some(admin) = &config.admin {
        let profile = services
            .accounts
            .ensure_admin(admin)
            .await
            .context("failed to bootstrap admin account")?;
        tracing::info!(user_id = %profile.id, "admin account ready");
    }

    Ok(services)
}
