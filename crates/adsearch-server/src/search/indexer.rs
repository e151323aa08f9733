//! Bulk indexing of advertisement pages.

use adsearch_common::{Advertisement, SearchDocument};
use serde_json::json;
use tracing::warn;

use super::client::{SearchClient, SearchError};

/// Outcome of one bulk submission.
#[derive(Debug, Clone, Copy, Default)]
pub struct BulkReport {
    pub indexed: usize,
}

/// Build the newline-delimited `_bulk` body for a page: for each record an
/// action header targeting the index keyed by the record id, then the
/// document itself. Same-id submissions overwrite, never duplicate.
pub fn bulk_payload(index: &str, ads: &[Advertisement]) -> Result<String, serde_json::Error> {
    let mut payload = String::new();

    for ad in ads {
        let action = json!({
            "index": { "_index": index, "_id": ad.id.to_string() }
        });
        payload.push_str(&serde_json::to_string(&action)?);
        payload.push('\n');

        let doc = SearchDocument::from(ad);
        payload.push_str(&serde_json::to_string(&doc)?);
        payload.push('\n');
    }

    Ok(payload)
}

/// Index one page of records in a single round trip.
///
/// A transport failure or a rejected request fails the whole page. When the
/// store accepts the request but flags per-document errors, the per-item
/// results are inspected and surfaced as
/// [`SearchError::BulkPartialFailure`] with counts and a sample reason.
pub async fn bulk_index(
    client: &SearchClient,
    ads: &[Advertisement],
) -> Result<BulkReport, SearchError> {
    if ads.is_empty() {
        return Ok(BulkReport::default());
    }

    let payload = bulk_payload(client.index_name(), ads)?;
    let response = client.bulk(payload).await?;

    if response.errors {
        let failures: Vec<_> = response
            .items
            .iter()
            .filter_map(|item| item.index.as_ref())
            .filter(|status| status.error.is_some() || status.status >= 300)
            .collect();

        let sample = failures
            .first()
            .map(|status| {
                let reason = status
                    .error
                    .as_ref()
                    .map(|error| {
                        error
                            .reason
                            .clone()
                            .unwrap_or_else(|| error.kind.clone())
                    })
                    .unwrap_or_else(|| format!("status {}", status.status));
                format!("document {}: {}", status.id, reason)
            })
            .unwrap_or_else(|| "store flagged errors without item details".to_string());

        warn!(
            failed = failures.len(),
            total = ads.len(),
            sample = %sample,
            "bulk response carried per-document failures"
        );

        return Err(SearchError::BulkPartialFailure {
            failed: failures.len().max(1),
            total: ads.len(),
            sample,
        });
    }

    Ok(BulkReport {
        indexed: ads.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ad(id: i64) -> Advertisement {
        Advertisement {
            id,
            name: format!("Item {id}"),
            description: String::new(),
            brand: "Acme".to_string(),
            category: "Misc".to_string(),
            price: 10.0,
            currency: "USD".to_string(),
            stock: 3,
            ean: String::new(),
            color: String::new(),
            size: String::new(),
            availability: "in_stock".to_string(),
        }
    }

    #[test]
    fn payload_alternates_action_and_document_lines() {
        let payload = bulk_payload("advertisements", &[ad(1), ad(2)]).unwrap();
        let lines: Vec<&str> = payload.lines().collect();
        assert_eq!(lines.len(), 4);

        let action: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_index"], "advertisements");
        assert_eq!(action["index"]["_id"], "1");

        let doc: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(doc["id"], 1);
        assert_eq!(doc["product_name"], "Item 1");

        let second_action: serde_json::Value = serde_json::from_str(lines[2]).unwrap();
        assert_eq!(second_action["index"]["_id"], "2");
    }

    #[test]
    fn payload_ends_with_newline() {
        let payload = bulk_payload("advertisements", &[ad(1)]).unwrap();
        assert!(payload.ends_with('\n'));
    }

    #[test]
    fn empty_page_yields_empty_payload() {
        let payload = bulk_payload("advertisements", &[]).unwrap();
        assert!(payload.is_empty());
    }
}
