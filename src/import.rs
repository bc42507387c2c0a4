//! Bulk import of line items from delimited text (CSV exports, spreadsheets).

use tracing::debug;

use crate::error::ImportError;
use crate::line_items::RawItem;

const DESCRIPTION_KEYS: &[&str] = &["description"];
const QUANTITY_KEYS: &[&str] = &["quantity", "qty"];
const RATE_KEYS: &[&str] = &["rate", "price", "cost"];

fn detect_delimiter(header: &str) -> char {
    if header.contains('\t') {
        '\t'
    } else if header.contains(';') && !header.contains(',') {
        ';'
    } else {
        ','
    }
}

/// Split one record, honouring double-quoted fields and `""` escapes.
fn split_fields(line: &str, delimiter: char) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            c if c == delimiter && !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            c => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

fn find_column(header: &[String], keys: &[&str], name: &'static str) -> Result<usize, ImportError> {
    header
        .iter()
        .position(|h| {
            let h = h.to_lowercase();
            keys.iter().any(|k| h.contains(k))
        })
        .ok_or(ImportError::MissingColumn(name))
}

/// Parse a header row plus data rows into raw items. Rows whose description is
/// blank are dropped; at least one row must survive.
pub fn parse_rows(text: &str) -> Result<Vec<RawItem>, ImportError> {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.len() < 2 {
        return Err(ImportError::TooFewLines);
    }

    let delimiter = detect_delimiter(lines[0]);
    let header = split_fields(lines[0], delimiter);
    let desc_idx = find_column(&header, DESCRIPTION_KEYS, "description")?;
    let qty_idx = find_column(&header, QUANTITY_KEYS, "quantity")?;
    let rate_idx = find_column(&header, RATE_KEYS, "rate")?;

    let field = |fields: &[String], idx: usize| fields.get(idx).cloned().unwrap_or_default();

    let mut rows = Vec::new();
    for (line_no, line) in lines.iter().enumerate().skip(1) {
        let fields = split_fields(line, delimiter);
        let description = field(&fields, desc_idx);
        if description.is_empty() {
            debug!(line = line_no + 1, "dropping import row without description");
            continue;
        }
        rows.push(RawItem { description, quantity: field(&fields, qty_idx), rate: field(&fields, rate_idx) });
    }

    if rows.is_empty() {
        return Err(ImportError::NoValidItems);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::line_items::bulk_replace;
    use crate::model::LineItem;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_drops_row_without_description() {
        let rows = parse_rows("Description,Qty,Rate\nConsulting,2,150\n,5,20").unwrap();
        let mut items = vec![LineItem::default()];
        bulk_replace(&mut items, &rows);
        assert_eq!(items, vec![LineItem::new("Consulting", 2, dec!(150))]);
    }

    #[test]
    fn test_header_match_is_case_insensitive_and_ordered_by_header() {
        let text = "Unit Price;ITEM DESCRIPTION;Quantity\n9.99;Widget;3\n";
        let rows = parse_rows(text).unwrap();
        assert_eq!(rows, vec![RawItem { description: "Widget".into(), quantity: "3".into(), rate: "9.99".into() }]);
    }

    #[test]
    fn test_quoted_fields_and_tabs() {
        let rows = parse_rows("description,qty,cost\n\"Design, phase \"\"1\"\"\",1,500\n").unwrap();
        assert_eq!(rows[0].description, "Design, phase \"1\"");
        assert_eq!(rows[0].rate, "500");

        let rows = parse_rows("Description\tQty\tRate\nHosting\t12\t20\n").unwrap();
        assert_eq!(rows[0].quantity, "12");
    }

    #[test]
    fn test_short_rows_read_missing_cells_as_empty() {
        let mut items = vec![LineItem::default()];
        let rows = parse_rows("Description,Qty,Rate\nSupport\n").unwrap();
        bulk_replace(&mut items, &rows);
        assert_eq!(items, vec![LineItem::new("Support", 1, Decimal::ZERO)]);
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse_rows(""), Err(ImportError::TooFewLines));
        assert_eq!(parse_rows("Description,Qty,Rate\n\n"), Err(ImportError::TooFewLines));
        assert_eq!(parse_rows("Name,Qty,Rate\nA,1,1"), Err(ImportError::MissingColumn("description")));
        assert_eq!(parse_rows("Description,Hours,Rate\nA,1,1"), Err(ImportError::MissingColumn("quantity")));
        assert_eq!(parse_rows("Description,Qty,Amount\nA,1,1"), Err(ImportError::MissingColumn("rate")));
        assert_eq!(parse_rows("Description,Qty,Rate\n,1,1\n  ,2,2"), Err(ImportError::NoValidItems));
    }
}
