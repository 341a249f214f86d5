//! Sweet catalog service (create / read / search / update / delete).

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument};

use sweetshop_core::{DomainError, SweetId};
use sweetshop_inventory::{NewSweet, Sweet, SweetChanges, SweetQuery};

use crate::error::ServiceResult;
use crate::store::SweetStore;

#[derive(Clone)]
pub struct SweetCatalog {
    store: Arc<dyn SweetStore>,
}

impl SweetCatalog {
    pub fn new(store: Arc<dyn SweetStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, input), fields(name = %input.name), err)]
    pub async fn create(&self, input: NewSweet) -> ServiceResult<Sweet> {
        let sweet = Sweet::create(SweetId::new(), input, Utc::now())?;
        self.store.insert_sweet(&sweet).await?;
        info!(sweet_id = %sweet.id, quantity = sweet.quantity, "sweet created");
        Ok(sweet)
    }

    pub async fn list(&self) -> ServiceResult<Vec<Sweet>> {
        Ok(self.store.list_sweets().await?)
    }

    #[instrument(skip(self), err)]
    pub async fn get(&self, id: SweetId) -> ServiceResult<Sweet> {
        self.store
            .get_sweet(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Sweet").into())
    }

    /// Inverted price bounds simply match nothing.
    #[instrument(skip(self), err)]
    pub async fn search(&self, query: SweetQuery) -> ServiceResult<Vec<Sweet>> {
        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Ok(Vec::new());
            }
        }
        Ok(self.store.search_sweets(&query).await?)
    }

    /// Apply changes produced by [`sweetshop_inventory::SweetPatch::validate`].
    #[instrument(skip(self, changes), err)]
    pub async fn update(&self, id: SweetId, changes: SweetChanges) -> ServiceResult<Sweet> {
        self.store
            .update_sweet(id, &changes, Utc::now())
            .await?
            .ok_or_else(|| DomainError::not_found("Sweet").into())
    }

    #[instrument(skip(self), err)]
    pub async fn delete(&self, id: SweetId) -> ServiceResult<()> {
        if self.store.delete_sweet(id).await? {
            info!(sweet_id = %id, "sweet deleted");
            Ok(())
        } else {
            Err(DomainError::not_found("Sweet").into())
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rust_decimal::Decimal;
    use sweetshop_inventory::SweetPatch;

    use super::*;
    use crate::error::ServiceError;
    use crate::store::InMemoryStore;

    fn catalog() -> SweetCatalog {
        SweetCatalog::new(Arc::new(InMemoryStore::new()))
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn new_sweet(name: &str, price: &str, quantity: i64) -> NewSweet {
        NewSweet {
            name: name.to_string(),
            category: "Indian".to_string(),
            description: Some("festive".to_string()),
            price: d(price),
            quantity,
        }
    }

    fn is_not_found(err: &ServiceError) -> bool {
        matches!(err.as_domain(), Some(DomainError::NotFound(_)))
    }

    #[tokio::test]
    async fn create_then_get() {
        let catalog = catalog();
        let created = catalog.create(new_sweet("  Kaju Katli ", "980", 12)).await.unwrap();
        assert_eq!(created.name, "Kaju Katli");
        assert_eq!(catalog.get(created.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn invalid_input_is_not_stored() {
        let catalog = catalog();
        let err = catalog.create(new_sweet("Ladoo", "-1", 3)).await.unwrap_err();
        assert_eq!(
            err.as_domain(),
            Some(&DomainError::validation("Price cannot be negative"))
        );
        assert!(catalog.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_by_price_range_is_inclusive() {
        let catalog = catalog();
        for (name, price) in [("A", "99.99"), ("B", "100"), ("C", "150"), ("D", "200"), ("E", "200.01")] {
            catalog.create(new_sweet(name, price, 1)).await.unwrap();
        }
        let hits = catalog
            .search(SweetQuery {
                min_price: Some(d("100")),
                max_price: Some(d("200")),
                ..SweetQuery::default()
            })
            .await
            .unwrap();
        let names: Vec<_> = hits.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["B", "C", "D"]);
    }

    #[tokio::test]
    async fn inverted_price_range_is_empty() {
        let catalog = catalog();
        catalog.create(new_sweet("A", "5", 1)).await.unwrap();
        let hits = catalog
            .search(SweetQuery {
                min_price: Some(d("10")),
                max_price: Some(d("1")),
                ..SweetQuery::default()
            })
            .await
            .unwrap();
        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn update_merges_present_fields_only() {
        let catalog = catalog();
        let created = catalog.create(new_sweet("Jalebi", "4", 10)).await.unwrap();

        let updated = catalog
            .update(
                created.id,
                SweetPatch {
                    price: Some(d("4.50")),
                    ..SweetPatch::default()
                }
                .validate()
                .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(updated.price, d("4.50"));
        assert_eq!(updated.name, "Jalebi");
        assert_eq!(updated.quantity, 10);
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[tokio::test]
    async fn blank_description_update_clears_it() {
        let catalog = catalog();
        let created = catalog.create(new_sweet("Jalebi", "4", 10)).await.unwrap();
        assert!(created.description.is_some());

        let changes = SweetPatch {
            description: Some("  ".to_string()),
            ..SweetPatch::default()
        }
        .validate()
        .unwrap();
        let updated = catalog.update(created.id, changes).await.unwrap();
        assert_eq!(updated.description, None);
        assert_eq!(catalog.get(created.id).await.unwrap().description, None);
    }

    #[tokio::test]
    async fn missing_ids_are_not_found() {
        let catalog = catalog();
        let id = SweetId::new();
        assert!(is_not_found(&catalog.get(id).await.unwrap_err()));
        assert!(is_not_found(&catalog.update(id, SweetChanges::default()).await.unwrap_err()));
        assert!(is_not_found(&catalog.delete(id).await.unwrap_err()));
    }

    #[tokio::test]
    async fn delete_removes_the_sweet() {
        let catalog = catalog();
        let created = catalog.create(new_sweet("Peda", "3", 2)).await.unwrap();
        catalog.delete(created.id).await.unwrap();
        assert!(is_not_found(&catalog.get(created.id).await.unwrap_err()));
    }
}
