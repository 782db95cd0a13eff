//! Turns raw line-item text into priced rows and a grand total.

use serde::Serialize;
use tracing::debug;

use crate::error::{ItemField, QuotationError, Result};
use crate::model::{LineItem, PricedLine};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PricedItems {
    pub lines: Vec<PricedLine>,
    pub total: f64,
}

/// Prices every row in input order.
///
/// Amounts are kept unrounded; two-decimal rounding happens when the
/// values are formatted for display.
pub fn price_items(items: &[LineItem]) -> Result<PricedItems> {
    if items.is_empty() {
        return Err(QuotationError::EmptyItems);
    }

    let mut lines = Vec::with_capacity(items.len());
    let mut total = 0.0;

    for (idx, item) in items.iter().enumerate() {
        let row = idx + 1;
        if item.description.trim().is_empty() {
            return Err(QuotationError::missing(format!("item {row}"), "description"));
        }
        let quantity = parse_number(&item.quantity, row, ItemField::Quantity)?;
        let rate = parse_number(&item.rate, row, ItemField::Rate)?;
        let amount = quantity * rate;
        total += amount;

        lines.push(PricedLine {
            index: row,
            description: item.description.trim().to_string(),
            quantity,
            rate,
            amount,
        });
    }

    debug!(rows = lines.len(), total, "priced line items");
    Ok(PricedItems { lines, total })
}

fn parse_number(raw: &str, row: usize, field: ItemField) -> Result<f64> {
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(QuotationError::InvalidNumber { row, field, value: raw.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn amount_is_quantity_times_rate() {
        let priced = price_items(&[LineItem::new("UI/UX Design", "2", "100.5")]).unwrap();
        assert_eq!(priced.lines[0].amount, 201.0);
        assert_eq!(priced.total, 201.0);
    }

    #[test]
    fn indices_follow_input_order() {
        let items = vec![
            LineItem::new("c", "1", "3"),
            LineItem::new("a", "1", "1"),
            LineItem::new("b", "1", "2"),
        ];
        let priced = price_items(&items).unwrap();
        let seen: Vec<(usize, &str)> =
            priced.lines.iter().map(|l| (l.index, l.description.as_str())).collect();
        assert_eq!(seen, vec![(1, "c"), (2, "a"), (3, "b")]);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(price_items(&[]), Err(QuotationError::EmptyItems)));
    }

    #[test]
    fn bad_rate_names_row_and_field() {
        let items = vec![LineItem::new("ok", "1", "10"), LineItem::new("bad", "1", "abc")];
        match price_items(&items) {
            Err(QuotationError::InvalidNumber { row, field, value }) => {
                assert_eq!(row, 2);
                assert_eq!(field, ItemField::Rate);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn quantity_is_checked_before_rate() {
        let err = price_items(&[LineItem::new("x", "two", "abc")]).unwrap_err();
        assert!(matches!(err, QuotationError::InvalidNumber { field: ItemField::Quantity, .. }));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        for raw in ["NaN", "inf", "-infinity"] {
            let err = price_items(&[LineItem::new("x", raw, "1")]).unwrap_err();
            assert!(matches!(err, QuotationError::InvalidNumber { .. }), "{raw}");
        }
    }

    #[test]
    fn surrounding_whitespace_is_ignored() {
        let priced = price_items(&[LineItem::new(" Hosting ", " 3 ", "\t12.5 ")]).unwrap();
        assert_eq!(priced.lines[0].description, "Hosting");
        assert_eq!(priced.total, 37.5);
    }

    #[test]
    fn blank_description_is_missing_field() {
        let err = price_items(&[LineItem::new("  ", "1", "1")]).unwrap_err();
        match err {
            QuotationError::MissingField { section, field } => {
                assert_eq!(section, "item 1");
                assert_eq!(field, "description");
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    fn rows() -> impl Strategy<Value = Vec<(f64, f64)>> {
        prop::collection::vec((0.0f64..1_000.0, 0.0f64..1_000_000.0), 1..40)
    }

    proptest! {
        #[test]
        fn total_is_independent_of_row_order(rows in rows(), shift in 0usize..40) {
            let items: Vec<LineItem> = rows
                .iter()
                .map(|(q, r)| LineItem::new("row", q.to_string(), r.to_string()))
                .collect();
            let expected: f64 = rows.iter().map(|(q, r)| q * r).sum();

            let mut reordered = items.clone();
            reordered.reverse();
            let len = reordered.len();
            reordered.rotate_left(shift % len);

            let a = price_items(&items).unwrap().total;
            let b = price_items(&reordered).unwrap().total;
            let tolerance = 1e-9 * expected.abs().max(1.0);
            prop_assert!((a - expected).abs() <= tolerance);
            prop_assert!((a - b).abs() <= tolerance);
        }
    }
}
