use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::sweet::Sweet;

/// Catalog search filter.
///
/// Text filters are case-insensitive substring matches; price bounds are
/// inclusive. Absent (or blank) filters match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweetQuery {
    pub name: Option<String>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
}

impl SweetQuery {
    /// Text filter for the name, lowercased; `None` when absent or blank.
    pub fn name_needle(&self) -> Option<String> {
        needle(self.name.as_deref())
    }

    /// Text filter for the category, lowercased; `None` when absent or blank.
    pub fn category_needle(&self) -> Option<String> {
        needle(self.category.as_deref())
    }

    pub fn matches(&self, sweet: &Sweet) -> bool {
        if let Some(n) = self.name_needle() {
            if !sweet.name.to_lowercase().contains(&n) {
                return false;
            }
        }
        if let Some(c) = self.category_needle() {
            if !sweet.category.to_lowercase().contains(&c) {
                return false;
            }
        }
        if self.min_price.is_some_and(|min| sweet.price < min) {
            return false;
        }
        if self.max_price.is_some_and(|max| sweet.price > max) {
            return false;
        }
        true
    }
}

fn needle(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_lowercase)
}

/// Catalog ordering: by name, ties broken by id so listings are stable.
pub fn sort_by_name(sweets: &mut [Sweet]) {
    sweets.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
}
