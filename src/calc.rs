//! Derivation of invoice totals.
//!
//! Everything here is a pure function of its inputs. Nothing rounds: currency
//! rounding happens only when an amount is formatted for display. Results
//! beyond the `Decimal` range saturate at `Decimal::MAX` / `Decimal::MIN`.

use rust_decimal::Decimal;

use crate::model::{LineItem, TaxConfig, TaxType, Totals};

pub fn line_total(item: &LineItem) -> Decimal {
    Decimal::from(item.quantity).saturating_mul(item.rate)
}

/// Empty input yields zero.
pub fn subtotal(items: &[LineItem]) -> Decimal {
    items.iter().map(line_total).fold(Decimal::ZERO, Decimal::saturating_add)
}

/// Percentage mode scales the subtotal; fixed mode returns the stored amount verbatim.
pub fn tax_amount(subtotal: Decimal, tax: &TaxConfig) -> Decimal {
    match tax.tax_type {
        TaxType::Percentage => subtotal.saturating_mul(tax.tax_rate) / Decimal::ONE_HUNDRED,
        TaxType::Fixed => tax.tax,
    }
}

pub fn total(subtotal: Decimal, tax_amount: Decimal) -> Decimal {
    subtotal.saturating_add(tax_amount)
}

pub fn derive(items: &[LineItem], tax: &TaxConfig) -> Totals {
    let subtotal = subtotal(items);
    let tax_amount = tax_amount(subtotal, tax);
    Totals { subtotal, tax_amount, total: total(subtotal, tax_amount) }
}
