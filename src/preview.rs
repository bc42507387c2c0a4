use comfy_table::{Attribute, Cell, CellAlignment, Color, Table};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tera::{Context, Tera, Value};

use crate::calc;
use crate::error::Result;
use crate::export::{ExportOptions, Orientation};
use crate::model::{ContactInfo, InvoiceData, TaxType, Template, Theme, PAYMENT_METHODS};

const TEMPLATE_NAME: &str = "invoice.tera";

// Embed template at compile time to ensure availability
const DEFAULT_TEMPLATE: &str = include_str!("../templates/invoice.tera");

#[derive(Debug, Serialize)]
pub struct PageSetup {
    pub paper: &'static str,
    pub flipped: bool,
    pub margin_in: f64,
}

#[derive(Debug, Serialize)]
pub struct PreviewLine {
    pub description: String,
    pub quantity: String,
    pub rate: String,
    pub amount: String,
}

/// Everything the preview template needs, already formatted for display.
#[derive(Debug, Serialize)]
pub struct PreviewContext {
    pub number: String,
    pub issue_date: String,
    pub due_date: Option<String>,
    pub from_lines: Vec<String>,
    pub to_lines: Vec<String>,
    pub items: Vec<PreviewLine>,
    pub subtotal: String,
    pub tax_label: String,
    pub tax_amount: Option<String>,
    pub total: String,
    pub payment_method: String,
    pub notes: Vec<String>,
    pub template: Template,
    pub header_fill: bool,
    pub theme: Theme,
    pub logo: Option<String>,
    pub page: PageSetup,
}

pub fn format_date(date: chrono::NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}

pub fn payment_method_label(value: &str) -> String {
    PAYMENT_METHODS
        .iter()
        .find(|(v, _)| *v == value)
        .map(|(_, label)| label.to_string())
        .unwrap_or_else(|| value.to_string())
}

pub fn tax_label(data: &InvoiceData) -> String {
    match data.tax.tax_type {
        TaxType::Percentage => format!("Tax ({}%)", data.tax.tax_rate.normalize()),
        TaxType::Fixed => "Tax".to_string(),
    }
}

/// Company first, then the person if both are given, then the remaining details.
fn contact_lines(contact: &ContactInfo) -> Vec<String> {
    let mut lines = vec![contact.display_name().to_string()];
    if !contact.company.trim().is_empty() && !contact.name.trim().is_empty() {
        lines.push(contact.name.clone());
    }
    lines.push(contact.email.clone());
    lines.push(contact.phone.clone().unwrap_or_default());
    lines.extend(contact.address.lines().map(str::to_string));
    lines.into_iter().map(|l| l.trim().to_string()).filter(|l| !l.is_empty()).collect()
}

impl PreviewContext {
    pub fn build(data: &InvoiceData, options: &ExportOptions, logo: Option<String>) -> Self {
        let currency = data.currency;
        let totals = data.totals();

        let items = data
            .line_items
            .iter()
            .map(|item| PreviewLine {
                description: item.description.clone(),
                quantity: item.quantity.to_string(),
                rate: currency.format_amount(item.rate),
                amount: currency.format_amount(calc::line_total(item)),
            })
            .collect();

        Self {
            number: data.invoice_number.clone(),
            issue_date: format_date(data.issue_date),
            due_date: data.due_date.map(format_date),
            from_lines: contact_lines(&data.contractor),
            to_lines: contact_lines(&data.client),
            items,
            subtotal: currency.format_amount(totals.subtotal),
            tax_label: tax_label(data),
            tax_amount: (totals.tax_amount != Decimal::ZERO).then(|| currency.format_amount(totals.tax_amount)),
            total: currency.format_amount(totals.total),
            payment_method: payment_method_label(&data.payment_method),
            notes: data.notes.lines().map(str::to_string).collect(),
            template: data.template,
            header_fill: data.template != Template::Minimal,
            theme: data.theme.clone(),
            logo,
            page: PageSetup {
                paper: options.paper.typst_name(),
                flipped: options.orientation == Orientation::Landscape,
                margin_in: options.margin_in,
            },
        }
    }
}

/// Tera filter: quote any value as a Typst string literal so that user text is
/// never parsed as markup.
fn typst_string(value: &Value, _: &HashMap<String, Value>) -> tera::Result<Value> {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    };
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('"');
    Ok(Value::String(out))
}

/// Templates from `<root>/templates`, seeding the default on first use.
pub fn load_templates(root: &Path) -> Result<Tera> {
    let template_dir = root.join("templates");
    fs::create_dir_all(&template_dir)?;
    let template_path = template_dir.join(TEMPLATE_NAME);
    if !template_path.exists() {
        println!("✨ Initializing default template...");
        fs::write(&template_path, DEFAULT_TEMPLATE)?;
    }

    let mut tera = Tera::default();
    tera.add_template_file(&template_path, Some(TEMPLATE_NAME))?;
    tera.register_filter("typst", typst_string);
    Ok(tera)
}

pub fn embedded_templates() -> Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_template(TEMPLATE_NAME, DEFAULT_TEMPLATE)?;
    tera.register_filter("typst", typst_string);
    Ok(tera)
}

pub fn render_typst(tera: &Tera, context: &PreviewContext) -> Result<String> {
    let context = Context::from_serialize(context)?;
    Ok(tera.render(TEMPLATE_NAME, &context)?)
}

// ==========================================
// Terminal preview
// ==========================================

pub fn summary_table(data: &InvoiceData) -> Table {
    let currency = data.currency;
    let totals = data.totals();

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("#"),
        Cell::new("Description"),
        Cell::new("Qty"),
        Cell::new("Rate"),
        Cell::new("Amount"),
    ]);

    for (i, item) in data.line_items.iter().enumerate() {
        let description = if item.description.is_empty() {
            Cell::new("(no description)").fg(Color::DarkGrey)
        } else {
            Cell::new(&item.description)
        };
        table.add_row(vec![
            Cell::new(i + 1),
            description,
            Cell::new(item.quantity).set_alignment(CellAlignment::Right),
            Cell::new(currency.format_amount(item.rate)).set_alignment(CellAlignment::Right),
            Cell::new(currency.format_amount(calc::line_total(item))).set_alignment(CellAlignment::Right),
        ]);
    }

    let blank = || Cell::new("");
    table.add_row(vec![
        blank(),
        Cell::new("Subtotal"),
        blank(),
        blank(),
        Cell::new(currency.format_amount(totals.subtotal)).set_alignment(CellAlignment::Right),
    ]);
    if totals.tax_amount != Decimal::ZERO {
        table.add_row(vec![
            blank(),
            Cell::new(tax_label(data)),
            blank(),
            blank(),
            Cell::new(currency.format_amount(totals.tax_amount)).set_alignment(CellAlignment::Right),
        ]);
    }
    table.add_row(vec![
        blank(),
        Cell::new("Total").add_attribute(Attribute::Bold),
        blank(),
        blank(),
        Cell::new(currency.format_amount(totals.total))
            .add_attribute(Attribute::Bold)
            .fg(Color::Rgb { r: 4, g: 120, b: 87 })
            .set_alignment(CellAlignment::Right),
    ]);
    table
}

pub fn print_preview(data: &InvoiceData) {
    println!("\n--- Invoice #{} ({}) ---", data.invoice_number, data.template);
    println!("From:    {}", data.contractor.display_name());
    println!("Bill To: {}", data.client.display_name());
    match data.due_date {
        Some(due) => println!("Issued {} · Due {}", format_date(data.issue_date), format_date(due)),
        None => println!("Issued {}", format_date(data.issue_date)),
    }
    println!("{}", summary_table(data));
    if !data.payment_method.is_empty() {
        println!("Payment Method: {}", payment_method_label(&data.payment_method));
    }
    if !data.notes.is_empty() {
        println!("Notes: {}", data.notes);
    }
}
