//! Translation of [`SearchFilters`] into a search store query.
//!
//! A stateless mapping: text matches go into the bool query's `must`, the
//! price range and the in-stock restriction into `filter`.

use adsearch_common::{model::AVAILABILITY_IN_STOCK, SearchDocument, SearchFilters};
use serde_json::{json, Map, Value};

use super::client::{SearchClient, SearchError};

/// Build the bool query for the given filters. Absent fields contribute no
/// clause; the empty filter set yields a match-everything bool query.
pub fn build_query(filters: &SearchFilters) -> Value {
    let mut must: Vec<Value> = Vec::new();
    let mut filter: Vec<Value> = Vec::new();

    if let Some(name) = non_empty(&filters.product_name) {
        must.push(json!({ "match": { "product_name": name } }));
    }
    if let Some(brand) = non_empty(&filters.brand) {
        must.push(json!({ "match": { "brand": brand } }));
    }
    if let Some(category) = non_empty(&filters.category) {
        must.push(json!({ "match": { "category": category } }));
    }

    if filters.min_price.is_some() || filters.max_price.is_some() {
        let mut range = Map::new();
        if let Some(min) = filters.min_price {
            range.insert("gte".to_string(), json!(min));
        }
        if let Some(max) = filters.max_price {
            range.insert("lte".to_string(), json!(max));
        }
        filter.push(json!({ "range": { "price": Value::Object(range) } }));
    }

    if filters.in_stock_only {
        filter.push(json!({ "term": { "availability": AVAILABILITY_IN_STOCK } }));
    }

    json!({
        "query": {
            "bool": {
                "must": must,
                "filter": filter,
            }
        }
    })
}

/// Run the filters against the search store.
pub async fn search(
    client: &SearchClient,
    filters: &SearchFilters,
) -> Result<Vec<SearchDocument>, SearchError> {
    client.search(&build_query(filters)).await
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|value| !value.trim().is_empty())
}
