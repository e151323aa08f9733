//! Domain model shared across the workspace.

use serde::{Deserialize, Serialize};

/// Availability label used by the search read path to restrict results to
/// items that can actually be bought.
pub const AVAILABILITY_IN_STOCK: &str = "in_stock";

/// One advertisement, as stored in the `advertisements` table.
///
/// The identifier comes from the source dataset, never from an insert
/// sequence. A record is considered well formed when `id`, `price` and
/// `stock` carry valid values; every other field may be an empty string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Advertisement {
    pub id: i64,
    #[sqlx(rename = "product_name")]
    #[serde(rename = "product_name")]
    pub name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub price: f64,
    pub currency: String,
    pub stock: i32,
    pub ean: String,
    pub color: String,
    pub size: String,
    pub availability: String,
}

/// Index-side projection of an [`Advertisement`].
///
/// Keyed by the advertisement id in the search store, so re-indexing the same
/// id replaces the document instead of duplicating it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchDocument {
    pub id: i64,
    pub product_name: String,
    pub description: String,
    pub brand: String,
    pub category: String,
    pub price: f64,
    pub currency: String,
    pub stock: i32,
    pub ean: String,
    pub color: String,
    pub size: String,
    pub availability: String,
}

impl From<&Advertisement> for SearchDocument {
    fn from(ad: &Advertisement) -> Self {
        Self {
            id: ad.id,
            product_name: ad.name.clone(),
            description: ad.description.clone(),
            brand: ad.brand.clone(),
            category: ad.category.clone(),
            price: ad.price,
            currency: ad.currency.clone(),
            stock: ad.stock,
            ean: ad.ean.clone(),
            color: ad.color.clone(),
            size: ad.size.clone(),
            availability: ad.availability.clone(),
        }
    }
}

/// Immutable query descriptor for the search read path.
///
/// Constructed per request and consumed once; absent fields place no
/// constraint on the result set. Price bounds are inclusive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchFilters {
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
    #[serde(default)]
    pub in_stock_only: bool,
}
