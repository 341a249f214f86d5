use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use sweetshop_core::{DomainError, DomainResult, Entity, SweetId};

/// Longest accepted sweet name (after trimming).
pub const MAX_NAME_LEN: usize = 100;

/// Longest accepted category (after trimming).
pub const MAX_CATEGORY_LEN: usize = 50;

/// Upper bound for a stock level; keeps quantities representable as a SQL `INTEGER`.
pub const MAX_QUANTITY: u32 = i32::MAX as u32;

/// A sellable inventory item.
///
/// # Invariants
/// - `price >= 0`
/// - `name` and `category` are non-empty and trimmed
/// - `id` and `created_at` never change after creation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sweet {
    pub id: SweetId,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Sweet {
    type Id = SweetId;

    fn id(&self) -> SweetId {
        self.id
    }
}

/// Input for creating a sweet, as received from the caller (unvalidated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSweet {
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity: i64,
}

/// Partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweetPatch {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub quantity: Option<i64>,
}

/// A validated, normalized `SweetPatch`, ready to be merged into a stored sweet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweetChanges {
    pub name: Option<String>,
    pub category: Option<String>,
    /// `Some(None)` clears the description (a blank value was sent).
    pub description: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub quantity: Option<u32>,
}

impl Sweet {
    /// Validate `input` and build a new sweet stamped with `now`.
    pub fn create(id: SweetId, input: NewSweet, now: DateTime<Utc>) -> DomainResult<Self> {
        let name = required_text(&input.name, MAX_NAME_LEN, "Name")?;
        let category = required_text(&input.category, MAX_CATEGORY_LEN, "Category")?;
        let price = validate_price(input.price)?;
        let quantity = validate_stock_level(input.quantity)?;

        Ok(Self {
            id,
            name,
            category,
            description: normalize_description(input.description),
            price,
            quantity,
            created_at: now,
            updated_at: now,
        })
    }

    /// Merge validated changes and refresh `updated_at`.
    pub fn apply_changes(&mut self, changes: &SweetChanges, now: DateTime<Utc>) {
        if let Some(name) = &changes.name {
            self.name = name.clone();
        }
        if let Some(category) = &changes.category {
            self.category = category.clone();
        }
        if let Some(description) = &changes.description {
            self.description = description.clone();
        }
        if let Some(price) = changes.price {
            self.price = price;
        }
        if let Some(quantity) = changes.quantity {
            self.quantity = quantity;
        }
        self.updated_at = now;
    }
}

impl SweetPatch {
    /// Validate every present field with the same rules as creation.
    ///
    /// Validation is all-or-nothing: an error means nothing may be applied.
    pub fn validate(self) -> DomainResult<SweetChanges> {
        let price = self.price.map(validate_price).transpose()?;
        let quantity = self.quantity.map(validate_stock_level).transpose()?;
        let name = self
            .name
            .map(|n| patched_text(&n, MAX_NAME_LEN, "Name"))
            .transpose()?;
        let category = self
            .category
            .map(|c| patched_text(&c, MAX_CATEGORY_LEN, "Category"))
            .transpose()?;

        Ok(SweetChanges {
            name,
            category,
            description: self.description.map(|d| normalize_description(Some(d))),
            price,
            quantity,
        })
    }
}

fn validate_price(price: Decimal) -> DomainResult<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation("Price cannot be negative"));
    }
    Ok(price)
}

fn validate_stock_level(quantity: i64) -> DomainResult<u32> {
    if quantity < 0 {
        return Err(DomainError::validation("Quantity cannot be negative"));
    }
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q <= MAX_QUANTITY)
        .ok_or_else(|| DomainError::validation("Quantity is too large"))
}

fn required_text(raw: &str, max_len: usize, field: &str) -> DomainResult<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::validation("Please provide all required fields"));
    }
    check_len(value, max_len, field)
}

fn patched_text(raw: &str, max_len: usize, field: &str) -> DomainResult<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::validation(format!("{field} cannot be empty")));
    }
    check_len(value, max_len, field)
}

fn check_len(value: &str, max_len: usize, field: &str) -> DomainResult<String> {
    if value.chars().count() > max_len {
        return Err(DomainError::validation(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn kaju_katli() -> NewSweet {
        NewSweet {
            name: "  Kaju Katli ".to_string(),
            category: "Barfi".to_string(),
            description: Some("Cashew fudge".to_string()),
            price: d("980"),
            quantity: 12,
        }
    }

    #[test]
    fn create_trims_and_stamps_timestamps() {
        let now = Utc::now();
        let sweet = Sweet::create(SweetId::new(), kaju_katli(), now).unwrap();
        assert_eq!(sweet.name, "Kaju Katli");
        assert_eq!(sweet.quantity, 12);
        assert_eq!(sweet.created_at, now);
        assert_eq!(sweet.updated_at, now);
    }

    #[test]
    fn create_rejects_negative_price_and_quantity() {
        let mut input = kaju_katli();
        input.price = d("-0.01");
        let err = Sweet::create(SweetId::new(), input, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("Price cannot be negative"));

        let mut input = kaju_katli();
        input.quantity = -1;
        let err = Sweet::create(SweetId::new(), input, Utc::now()).unwrap_err();
        assert_eq!(err, DomainError::validation("Quantity cannot be negative"));
    }

    #[test]
    fn create_accepts_free_and_out_of_stock_items() {
        let mut input = kaju_katli();
        input.price = Decimal::ZERO;
        input.quantity = 0;
        let sweet = Sweet::create(SweetId::new(), input, Utc::now()).unwrap();
        assert_eq!(sweet.price, Decimal::ZERO);
        assert_eq!(sweet.quantity, 0);
    }

    #[test]
    fn create_rejects_blank_name_or_category() {
        let mut input = kaju_katli();
        input.category = "   ".to_string();
        let err = Sweet::create(SweetId::new(), input, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let mut input = kaju_katli();
        input.name = "x".repeat(MAX_NAME_LEN + 1);
        let err = Sweet::create(SweetId::new(), input, Utc::now()).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[test]
    fn patch_merges_only_present_fields() {
        let created = Utc::now();
        let mut sweet = Sweet::create(SweetId::new(), kaju_katli(), created).unwrap();
        let changes = SweetPatch {
            price: Some(d("1050.50")),
            ..Default::default()
        }
        .validate()
        .unwrap();

        let later = created + chrono::Duration::seconds(5);
        sweet.apply_changes(&changes, later);

        assert_eq!(sweet.price, d("1050.50"));
        assert_eq!(sweet.name, "Kaju Katli");
        assert_eq!(sweet.quantity, 12);
        assert_eq!(sweet.created_at, created);
        assert_eq!(sweet.updated_at, later);
    }

    #[test]
    fn blank_description_is_stored_as_absent_on_create_and_update() {
        let mut input = kaju_katli();
        input.description = Some(String::new());
        let mut sweet = Sweet::create(SweetId::new(), input, Utc::now()).unwrap();
        assert_eq!(sweet.description, None);

        let changes = SweetPatch {
            description: Some(" Saffron edition ".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        sweet.apply_changes(&changes, Utc::now());
        assert_eq!(sweet.description.as_deref(), Some("Saffron edition"));

        let changes = SweetPatch {
            description: Some("   ".to_string()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(changes.description, Some(None));
        sweet.apply_changes(&changes, Utc::now());
        assert_eq!(sweet.description, None);
    }

    #[test]
    fn invalid_patch_is_rejected_as_a_whole() {
        let err = SweetPatch {
            name: Some("Rasgulla".to_string()),
            quantity: Some(-3),
            ..Default::default()
        }
        .validate()
        .unwrap_err();
        assert_eq!(err, DomainError::validation("Quantity cannot be negative"));
    }

    #[test]
    fn serializes_price_as_json_number() {
        let sweet = Sweet::create(SweetId::new(), kaju_katli(), Utc::now()).unwrap();
        let json = serde_json::to_value(&sweet).unwrap();
        assert!(json["price"].is_number());
        assert_eq!(json["quantity"], 12);
    }
}
