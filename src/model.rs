use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::calc;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LineItem {
    pub description: String,
    pub quantity: u32,
    pub rate: Decimal,
}

impl LineItem {
    pub fn new(description: impl Into<String>, quantity: u32, rate: Decimal) -> Self {
        Self { description: description.into(), quantity, rate }
    }
}

impl Default for LineItem {
    fn default() -> Self {
        Self::new("", 1, Decimal::ZERO)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ContactInfo {
    pub name: String,
    pub company: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub address: String,
}

impl ContactInfo {
    /// Company if present, otherwise the person's name.
    pub fn display_name(&self) -> &str {
        if self.company.trim().is_empty() { &self.name } else { &self.company }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TaxType {
    #[default]
    Fixed,
    Percentage,
}

impl fmt::Display for TaxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaxType::Fixed => write!(f, "Fixed Amount"),
            TaxType::Percentage => write!(f, "Percentage"),
        }
    }
}

/// Only one of `tax` / `tax_rate` is read, depending on `tax_type`. The other
/// keeps its last value across mode switches.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaxConfig {
    pub tax_type: TaxType,
    pub tax: Decimal,
    pub tax_rate: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
}

impl Currency {
    pub const ALL: [Currency; 4] = [Currency::USD, Currency::EUR, Currency::GBP, Currency::CAD];

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::USD => "$",
            Currency::EUR => "€",
            Currency::GBP => "£",
            Currency::CAD => "CA$",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Currency::USD => "USD - US Dollar",
            Currency::EUR => "EUR - Euro",
            Currency::GBP => "GBP - British Pound",
            Currency::CAD => "CAD - Canadian Dollar",
        }
    }

    /// Display formatting only: symbol, thousands separators, two decimals.
    pub fn format_amount(&self, amount: Decimal) -> String {
        let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
        let digits = format!("{:.2}", rounded.abs());
        let (whole, frac) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
        format!("{}{}{}.{}", sign, self.symbol(), group_thousands(whole), frac)
    }
}

fn group_thousands(whole: &str) -> String {
    let mut out = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Currency::USD => write!(f, "USD"),
            Currency::EUR => write!(f, "EUR"),
            Currency::GBP => write!(f, "GBP"),
            Currency::CAD => write!(f, "CAD"),
        }
    }
}

impl FromStr for Currency {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(Currency::USD),
            "EUR" => Ok(Currency::EUR),
            "GBP" => Ok(Currency::GBP),
            "CAD" => Ok(Currency::CAD),
            _ => Err(format!("Unsupported currency: {}", s)),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    #[default]
    Modern,
    Classic,
    Minimal,
}

impl Template {
    pub const ALL: [Template; 3] = [Template::Modern, Template::Classic, Template::Minimal];
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Template::Modern => write!(f, "modern"),
            Template::Classic => write!(f, "classic"),
            Template::Minimal => write!(f, "minimal"),
        }
    }
}

impl FromStr for Template {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "modern" => Ok(Template::Modern),
            "classic" => Ok(Template::Classic),
            "minimal" => Ok(Template::Minimal),
            _ => Err(format!("Unknown template: {}", s)),
        }
    }
}

pub const ACCENT_PRESETS: &[(&str, &str)] = &[
    ("Primary Blue", "#2563eb"),
    ("Green", "#16a34a"),
    ("Purple", "#9333ea"),
    ("Red", "#dc2626"),
    ("Orange", "#ea580c"),
    ("Teal", "#0d9488"),
    ("Pink", "#db2777"),
    ("Gray", "#6b7280"),
];

pub const BACKGROUND_PRESETS: &[(&str, &str)] = &[
    ("White", "#ffffff"),
    ("Light Gray", "#f9fafb"),
    ("Light Blue", "#eff6ff"),
    ("Light Green", "#f0fdf4"),
    ("Light Purple", "#faf5ff"),
    ("Light Pink", "#fdf2f8"),
];

// (stored value, label)
pub const PAYMENT_METHODS: &[(&str, &str)] = &[
    ("bank-transfer", "Bank Transfer"),
    ("check", "Check"),
    ("paypal", "PayPal"),
    ("venmo", "Venmo"),
    ("zelle", "Zelle"),
    ("other", "Other"),
];

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Theme {
    pub accent: String,
    pub background: String,
}

impl Default for Theme {
    fn default() -> Self {
        Self { accent: ACCENT_PRESETS[0].1.to_string(), background: BACKGROUND_PRESETS[0].1.to_string() }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax_amount: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceData {
    pub invoice_number: String,
    pub issue_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    pub contractor: ContactInfo,
    pub client: ContactInfo,
    pub line_items: Vec<LineItem>,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub tax: TaxConfig,
    #[serde(default)]
    pub currency: Currency,
    #[serde(default)]
    pub template: Template,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default)]
    pub theme: Theme,
    // Written only by `recompute`.
    #[serde(default)]
    totals: Totals,
}

impl InvoiceData {
    /// A blank invoice: one empty line item, no due date, zero tax.
    pub fn new(invoice_number: impl Into<String>, issue_date: NaiveDate) -> Self {
        let mut data = Self {
            invoice_number: invoice_number.into(),
            issue_date,
            due_date: None,
            contractor: ContactInfo::default(),
            client: ContactInfo::default(),
            line_items: vec![LineItem::default()],
            payment_method: String::new(),
            notes: String::new(),
            tax: TaxConfig::default(),
            currency: Currency::default(),
            template: Template::default(),
            logo: None,
            theme: Theme::default(),
            totals: Totals::default(),
        };
        data.recompute();
        data
    }

    pub fn totals(&self) -> Totals {
        self.totals
    }

    /// Re-derive items → subtotal → tax amount → total. Idempotent.
    pub fn recompute(&mut self) -> Totals {
        self.totals = calc::derive(&self.line_items, &self.tax);
        self.totals
    }

    pub fn document_name(&self) -> String {
        format!("invoice-{}", self.invoice_number)
    }
}
