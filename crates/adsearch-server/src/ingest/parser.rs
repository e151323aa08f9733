//! Row parsing for the advertisement CSV source.
//!
//! The source layout is one header row followed by data rows of 11 positional
//! fields: id, name, description, brand, category, price, currency, stock,
//! color, size, availability. The wire/search shape additionally carries an
//! `ean`, which the CSV source does not provide.

use adsearch_common::Advertisement;
use csv_async::StringRecord;
use thiserror::Error;

/// Field position of each column in a source row.
const FIELD_ID: usize = 0;
const FIELD_NAME: usize = 1;
const FIELD_DESCRIPTION: usize = 2;
const FIELD_BRAND: usize = 3;
const FIELD_CATEGORY: usize = 4;
const FIELD_PRICE: usize = 5;
const FIELD_CURRENCY: usize = 6;
const FIELD_STOCK: usize = 7;
const FIELD_COLOR: usize = 8;
const FIELD_SIZE: usize = 9;
const FIELD_AVAILABILITY: usize = 10;

/// Fewer fields than this and the row carries nothing usable.
const MIN_FIELDS: usize = 3;

/// A single row failed to become an advertisement.
///
/// The kinds are distinct so callers can decide between skip-and-continue and
/// abort; the ingestion pipeline treats every one of them as fatal because
/// they indicate a corrupt or incompatible source file.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("malformed row: {0} fields, expected at least {MIN_FIELDS}")]
    MalformedRow(usize),
    #[error("invalid advertisement id: {0:?}")]
    InvalidId(String),
    #[error("invalid price: {0:?}")]
    InvalidPrice(String),
    #[error("invalid stock: {0:?}")]
    InvalidStock(String),
}

/// Parse one CSV row into a validated [`Advertisement`].
///
/// A record is fully formed only when the id is a positive integer and price
/// and stock are non-negative numbers; every text field may be empty. Missing
/// trailing fields parse as empty, so a short-but-valid-prefix row still
/// fails on whichever numeric field it lacks. No side effects.
pub fn parse_row(record: &StringRecord) -> Result<Advertisement, ParseError> {
    if record.len() < MIN_FIELDS {
        return Err(ParseError::MalformedRow(record.len()));
    }

    let field = |idx: usize| record.get(idx).unwrap_or("");

    let raw_id = field(FIELD_ID);
    let id: i64 = raw_id
        .parse()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| ParseError::InvalidId(raw_id.to_string()))?;

    let raw_price = field(FIELD_PRICE);
    let price: f64 = raw_price
        .parse()
        .ok()
        .filter(|price: &f64| price.is_finite() && *price >= 0.0)
        .ok_or_else(|| ParseError::InvalidPrice(raw_price.to_string()))?;

    let raw_stock = field(FIELD_STOCK);
    let stock: i32 = raw_stock
        .parse()
        .ok()
        .filter(|stock| *stock >= 0)
        .ok_or_else(|| ParseError::InvalidStock(raw_stock.to_string()))?;

    Ok(Advertisement {
        id,
        name: field(FIELD_NAME).to_string(),
        description: field(FIELD_DESCRIPTION).to_string(),
        brand: field(FIELD_BRAND).to_string(),
        category: field(FIELD_CATEGORY).to_string(),
        price,
        currency: field(FIELD_CURRENCY).to_string(),
        stock,
        ean: String::new(),
        color: field(FIELD_COLOR).to_string(),
        size: field(FIELD_SIZE).to_string(),
        availability: field(FIELD_AVAILABILITY).to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(fields: &[&str]) -> StringRecord {
        let mut record = StringRecord::new();
        for field in fields {
            record.push_field(field);
        }
        record
    }

    #[test]
    fn valid_row_round_trips_into_a_record() {
        let row = record(&[
            "1", "Name", "Desc", "Brand", "Cat", "123.45", "USD", "10", "Red", "L", "In Stock",
        ]);

        let ad = parse_row(&row).unwrap();
        assert_eq!(
            ad,
            Advertisement {
                id: 1,
                name: "Name".to_string(),
                description: "Desc".to_string(),
                brand: "Brand".to_string(),
                category: "Cat".to_string(),
                price: 123.45,
                currency: "USD".to_string(),
                stock: 10,
                ean: String::new(),
                color: "Red".to_string(),
                size: "L".to_string(),
                availability: "In Stock".to_string(),
            }
        );
    }

    #[test]
    fn too_few_fields_is_malformed() {
        let err = parse_row(&record(&["1", "Name"])).unwrap_err();
        assert!(matches!(err, ParseError::MalformedRow(2)));
    }

    #[test]
    fn non_numeric_id_is_invalid_id() {
        let err = parse_row(&record(&["abc", "Name", "Desc"])).unwrap_err();
        assert!(matches!(err, ParseError::InvalidId(_)));
    }

    #[test]
    fn zero_or_negative_id_is_invalid_id() {
        for raw in ["0", "-4"] {
            let err = parse_row(&record(&[
                raw, "Name", "Desc", "Brand", "Cat", "1.0", "USD", "1", "", "", "",
            ]))
            .unwrap_err();
            assert!(matches!(err, ParseError::InvalidId(_)), "id {raw}");
        }
    }

    #[test]
    fn non_numeric_price_is_invalid_price() {
        let err = parse_row(&record(&[
            "1", "Name", "Desc", "Brand", "Cat", "cheap", "USD", "10", "Red", "L", "In Stock",
        ]))
        .unwrap_err();
        assert!(matches!(err, ParseError::InvalidPrice(ref raw) if raw == "cheap"));
    }

    #[test]
    fn negative_price_is_invalid_price() {
        let err = parse_row(&record(&[
            "1", "Name", "Desc", "Brand", "Cat", "-9.99", "USD", "10", "Red", "L", "In Stock",
        ]))
        .unwrap_err();
        assert!(matches!(err, ParseError::InvalidPrice(_)));
    }

    #[test]
    fn non_numeric_stock_is_invalid_stock() {
        let err = parse_row(&record(&[
            "1", "Name", "Desc", "Brand", "Cat", "123.45", "USD", "many", "Red", "L", "In Stock",
        ]))
        .unwrap_err();
        assert!(matches!(err, ParseError::InvalidStock(ref raw) if raw == "many"));
    }

    #[test]
    fn missing_numeric_field_fails_on_that_field() {
        // 5 fields: id parses, price is absent and therefore invalid.
        let err = parse_row(&record(&["1", "Name", "Desc", "Brand", "Cat"])).unwrap_err();
        assert!(matches!(err, ParseError::InvalidPrice(ref raw) if raw.is_empty()));
    }

    #[test]
    fn empty_text_fields_are_allowed() {
        let ad = parse_row(&record(&["5", "", "", "", "", "0", "", "0", "", "", ""])).unwrap();
        assert_eq!(ad.id, 5);
        assert_eq!(ad.price, 0.0);
        assert_eq!(ad.stock, 0);
        assert!(ad.name.is_empty());
        assert!(ad.availability.is_empty());
    }
}
