use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

use crate::model::LineItem;

static LEADING_INT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[+-]?\d+").unwrap());
static LEADING_DECIMAL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(\d+(\.\d*)?|\.\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemField {
    Description,
    Quantity,
    Rate,
}

/// One row as typed or imported, before coercion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub description: String,
    pub quantity: String,
    pub rate: String,
}

// ==========================================
// Input coercion
// ==========================================

fn leading_decimal(raw: &str) -> Option<Decimal> {
    let m = LEADING_DECIMAL.find(raw.trim())?;
    let mut text = m.as_str().trim_start_matches('+').trim_end_matches('.').to_string();
    if text.starts_with('.') {
        text.insert(0, '0');
    } else if text.starts_with("-.") {
        text.insert(1, '0');
    }
    Decimal::from_str(&text).ok()
}

/// Leading integer, at least 1 and capped at `u32::MAX`. `"2.7"` reads as 2,
/// junk reads as 1.
pub fn coerce_quantity(raw: &str) -> u32 {
    let Some(m) = LEADING_INT.find(raw.trim()) else {
        return 1;
    };
    if m.as_str().starts_with('-') {
        return 1;
    }
    // Only digits remain, so a parse failure means overflow.
    match m.as_str().trim_start_matches('+').parse::<u32>() {
        Ok(0) => 1,
        Ok(n) => n,
        Err(_) => u32::MAX,
    }
}

/// Leading decimal, never negative. Junk reads as 0.
pub fn coerce_amount(raw: &str) -> Decimal {
    leading_decimal(raw).filter(|d| !d.is_sign_negative()).unwrap_or(Decimal::ZERO)
}

/// Percentage clamped to [0, 100].
pub fn coerce_percentage(raw: &str) -> Decimal {
    coerce_amount(raw).min(Decimal::ONE_HUNDRED)
}

// ==========================================
// Structural edits
// ==========================================

pub fn add(items: &mut Vec<LineItem>) {
    items.push(LineItem::default());
}

/// The last remaining item is never removed; out-of-range indices are ignored.
pub fn remove(items: &mut Vec<LineItem>, index: usize) -> bool {
    if items.len() <= 1 || index >= items.len() {
        debug!(index, len = items.len(), "ignoring line item removal");
        return false;
    }
    items.remove(index);
    true
}

/// Inserts a copy directly after `index`.
pub fn duplicate(items: &mut Vec<LineItem>, index: usize) -> bool {
    let Some(item) = items.get(index).cloned() else {
        debug!(index, len = items.len(), "ignoring duplicate of missing line item");
        return false;
    };
    items.insert(index + 1, item);
    true
}

pub fn update(items: &mut [LineItem], index: usize, field: ItemField, raw: &str) -> bool {
    let Some(item) = items.get_mut(index) else {
        return false;
    };
    match field {
        ItemField::Description => item.description = raw.to_string(),
        ItemField::Quantity => item.quantity = coerce_quantity(raw),
        ItemField::Rate => item.rate = coerce_amount(raw),
    }
    true
}

/// Replace the whole sequence. Rows without a description are dropped; if none
/// remain the sequence is left as it was. Returns the number of rows kept.
pub fn bulk_replace(items: &mut Vec<LineItem>, rows: &[RawItem]) -> usize {
    let replacement: Vec<LineItem> = rows
        .iter()
        .filter(|row| !row.description.trim().is_empty())
        .map(|row| {
            LineItem::new(row.description.trim(), coerce_quantity(&row.quantity), coerce_amount(&row.rate))
        })
        .collect();

    if replacement.is_empty() {
        return 0;
    }
    let kept = replacement.len();
    *items = replacement;
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn named(names: &[&str]) -> Vec<LineItem> {
        names.iter().map(|n| LineItem::new(*n, 1, Decimal::ZERO)).collect()
    }

    fn descriptions(items: &[LineItem]) -> Vec<&str> {
        items.iter().map(|i| i.description.as_str()).collect()
    }

    #[test]
    fn test_add_appends_blank_item() {
        let mut items = named(&["A"]);
        add(&mut items);
        assert_eq!(items.len(), 2);
        assert_eq!(items[1], LineItem::new("", 1, Decimal::ZERO));
    }

    #[test]
    fn test_remove_keeps_last_item() {
        let mut items = named(&["only"]);
        assert!(!remove(&mut items, 0));
        assert_eq!(descriptions(&items), ["only"]);
    }

    #[test]
    fn test_remove_by_index() {
        let mut items = named(&["A", "B", "C"]);
        assert!(remove(&mut items, 1));
        assert_eq!(descriptions(&items), ["A", "C"]);
        assert!(!remove(&mut items, 5));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_duplicate_inserts_after_original() {
        let mut items = named(&["A", "B", "C"]);
        items[1].quantity = 4;
        assert!(duplicate(&mut items, 1));
        assert_eq!(descriptions(&items), ["A", "B", "B", "C"]);
        assert_eq!(items[2], items[1]);
        assert!(!duplicate(&mut items, 4));
        assert_eq!(items.len(), 4);
    }

    #[test]
    fn test_update_coerces_fields() {
        let mut items = named(&["A"]);
        update(&mut items, 0, ItemField::Quantity, "abc");
        assert_eq!(items[0].quantity, 1);
        update(&mut items, 0, ItemField::Quantity, "2.7");
        assert_eq!(items[0].quantity, 2);
        update(&mut items, 0, ItemField::Quantity, "-3");
        assert_eq!(items[0].quantity, 1);
        update(&mut items, 0, ItemField::Rate, "12.50");
        assert_eq!(items[0].rate, dec!(12.50));
        update(&mut items, 0, ItemField::Rate, "-4");
        assert_eq!(items[0].rate, Decimal::ZERO);
        update(&mut items, 0, ItemField::Description, "Design work");
        assert_eq!(items[0].description, "Design work");
        assert!(!update(&mut items, 3, ItemField::Rate, "1"));
    }

    #[test]
    fn test_coercion_edge_cases() {
        assert_eq!(coerce_amount(".5"), dec!(0.5));
        assert_eq!(coerce_amount("7."), dec!(7));
        assert_eq!(coerce_amount(" 3.25usd "), dec!(3.25));
        assert_eq!(coerce_amount(""), Decimal::ZERO);
        assert_eq!(coerce_percentage("250"), dec!(100));
        assert_eq!(coerce_percentage("8.875"), dec!(8.875));
        assert_eq!(coerce_quantity("99999999999999"), u32::MAX);
    }

    #[test]
    fn test_quantity_beyond_i64_still_caps() {
        assert_eq!(coerce_quantity("123456789012345678901234567890"), u32::MAX);
        assert_eq!(coerce_quantity("+4294967296 units"), u32::MAX);
        assert_eq!(coerce_quantity("-123456789012345678901234567890"), 1);
        assert_eq!(coerce_quantity("+0"), 1);
        assert_eq!(coerce_quantity("0007"), 7);
    }

    #[test]
    fn test_bulk_replace_drops_blank_rows() {
        let mut items = named(&["old"]);
        let rows = vec![
            RawItem { description: "Consulting".into(), quantity: "2".into(), rate: "150".into() },
            RawItem { description: "  ".into(), quantity: "5".into(), rate: "20".into() },
            RawItem { description: "Hosting".into(), quantity: "x".into(), rate: "bad".into() },
        ];
        assert_eq!(bulk_replace(&mut items, &rows), 2);
        assert_eq!(items, vec![LineItem::new("Consulting", 2, dec!(150)), LineItem::new("Hosting", 1, Decimal::ZERO)]);
    }

    #[test]
    fn test_bulk_replace_without_valid_rows_is_noop() {
        let mut items = named(&["keep"]);
        let rows = vec![RawItem { description: String::new(), quantity: "1".into(), rate: "1".into() }];
        assert_eq!(bulk_replace(&mut items, &rows), 0);
        assert_eq!(descriptions(&items), ["keep"]);
    }
}
