//! Request DTOs and the JSON coercions applied at the boundary.
//!
//! Numeric fields arrive as `serde_json::Value` so that a missing, null,
//! fractional or non-numeric value becomes a 400 with a useful message
//! instead of a generic deserialization failure. Numeric strings such as
//! `"5"` are accepted.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use sweetshop_auth::Registration;
use sweetshop_core::SweetId;
use sweetshop_inventory::{NewSweet, SweetPatch, SweetQuery};

use crate::app::errors::ApiError;

const MISSING_FIELDS: &str = "Please provide all required fields";

#[derive(Debug, Default, Deserialize)]
pub struct CreateSweetRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<Value>,
    pub quantity: Option<Value>,
}

impl CreateSweetRequest {
    pub fn into_new_sweet(self) -> Result<NewSweet, ApiError> {
        let (Some(name), Some(category), Some(price), Some(quantity)) =
            (self.name, self.category, self.price, self.quantity)
        else {
            return Err(ApiError::bad_request(MISSING_FIELDS));
        };

        Ok(NewSweet {
            name,
            category,
            description: self.description,
            price: decimal(&price, "Price must be a number")?,
            quantity: integer(&quantity, "Quantity must be a whole number")?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateSweetRequest {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub price: Option<Value>,
    pub quantity: Option<Value>,
}

impl UpdateSweetRequest {
    pub fn into_patch(self) -> Result<SweetPatch, ApiError> {
        Ok(SweetPatch {
            name: self.name,
            category: self.category,
            description: self.description,
            price: self
                .price
                .as_ref()
                .map(|p| decimal(p, "Price must be a number"))
                .transpose()?,
            quantity: self
                .quantity
                .as_ref()
                .map(|q| integer(q, "Quantity must be a whole number"))
                .transpose()?,
        })
    }
}

/// Body of purchase and restock requests.
#[derive(Debug, Default, Deserialize)]
pub struct QuantityRequest {
    pub quantity: Option<Value>,
}

impl QuantityRequest {
    /// The requested amount; range checks happen in the ledger.
    pub fn quantity(&self) -> Result<i64, ApiError> {
        const INVALID: &str = "Please provide a valid quantity";
        let raw = self
            .quantity
            .as_ref()
            .ok_or_else(|| ApiError::bad_request(INVALID))?;
        integer(raw, INVALID)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "minPrice")]
    pub min_price: Option<String>,
    #[serde(rename = "maxPrice")]
    pub max_price: Option<String>,
}

impl SearchParams {
    pub fn into_query(self) -> Result<SweetQuery, ApiError> {
        Ok(SweetQuery {
            name: self.name,
            category: self.category,
            min_price: price_bound(self.min_price.as_deref(), "minPrice")?,
            max_price: price_bound(self.max_price.as_deref(), "maxPrice")?,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

impl RegisterRequest {
    pub fn into_registration(self) -> Registration {
        Registration {
            username: self.username.unwrap_or_default(),
            email: self.email.unwrap_or_default(),
            password: self.password.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Path ids that are not UUIDs cannot name an existing sweet.
pub fn sweet_id(raw: &str) -> Result<SweetId, ApiError> {
    raw.parse::<SweetId>()
        .map_err(|_| ApiError::not_found("Sweet not found"))
}

fn price_bound(raw: Option<&str>, param: &str) -> Result<Option<Decimal>, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => Decimal::from_str(s)
            .map(Some)
            .map_err(|_| ApiError::bad_request(format!("{param} must be a number"))),
    }
}

fn decimal(value: &Value, invalid: &'static str) -> Result<Decimal, ApiError> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return Err(ApiError::bad_request(invalid)),
    };
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|_| ApiError::bad_request(invalid))
}

fn integer(value: &Value, invalid: &'static str) -> Result<i64, ApiError> {
    let parsed = match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| ApiError::bad_request(invalid))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn create(body: Value) -> Result<NewSweet, ApiError> {
        serde_json::from_value::<CreateSweetRequest>(body)
            .unwrap()
            .into_new_sweet()
    }

    #[test]
    fn create_accepts_numbers_and_numeric_strings() {
        let sweet = create(json!({
            "name": "Kaju Katli", "category": "Barfi", "price": 980.5, "quantity": 12
        }))
        .unwrap();
        assert_eq!(sweet.price, Decimal::from_str("980.5").unwrap());
        assert_eq!(sweet.quantity, 12);

        let sweet = create(json!({
            "name": "Ladoo", "category": "Indian", "price": "15", "quantity": "3"
        }))
        .unwrap();
        assert_eq!(sweet.price, Decimal::from(15));
        assert_eq!(sweet.quantity, 3);
    }

    #[test]
    fn create_requires_every_field() {
        let err = create(json!({ "name": "Ladoo", "category": "Indian", "price": 5 })).unwrap_err();
        assert_eq!(err, ApiError::bad_request(MISSING_FIELDS));

        let err = create(json!({
            "name": "Ladoo", "category": "Indian", "price": null, "quantity": 1
        }))
        .unwrap_err();
        assert_eq!(err, ApiError::bad_request(MISSING_FIELDS));
    }

    #[test]
    fn negative_values_pass_through_to_domain_validation() {
        let sweet = create(json!({
            "name": "Ladoo", "category": "Indian", "price": -1, "quantity": -2
        }))
        .unwrap();
        assert!(sweet.price.is_sign_negative());
        assert_eq!(sweet.quantity, -2);
    }

    #[test]
    fn quantity_must_be_a_whole_number() {
        for bad in [json!(1.5), json!("many"), json!(true), json!([1])] {
            let req = QuantityRequest { quantity: Some(bad) };
            assert_eq!(
                req.quantity().unwrap_err(),
                ApiError::bad_request("Please provide a valid quantity")
            );
        }
        assert_eq!(QuantityRequest { quantity: Some(json!(4.0)) }.quantity().unwrap(), 4);
        assert!(QuantityRequest::default().quantity().is_err());
    }

    #[test]
    fn search_bounds_must_parse() {
        let params = SearchParams {
            min_price: Some("cheap".to_string()),
            ..SearchParams::default()
        };
        assert_eq!(params.into_query().unwrap_err().status(), axum::http::StatusCode::BAD_REQUEST);

        let query = SearchParams {
            name: Some("choc".to_string()),
            min_price: Some(" 100 ".to_string()),
            max_price: Some(String::new()),
            ..SearchParams::default()
        }
        .into_query()
        .unwrap();
        assert_eq!(query.min_price, Some(Decimal::from(100)));
        assert_eq!(query.max_price, None);
    }

    #[test]
    fn malformed_ids_read_as_not_found() {
        assert_eq!(sweet_id("nope").unwrap_err().status(), axum::http::StatusCode::NOT_FOUND);
        let id = SweetId::new();
        assert_eq!(sweet_id(&id.to_string()).unwrap(), id);
    }
}
