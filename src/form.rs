//! Interactive form. Each prompt returns the edits it collected; applying them
//! is left to the caller.

use inquire::{Confirm, DateSelect, InquireError, Select, Text};
use std::fmt;

use crate::error::{InvoiceError, Result};
use crate::identity::PaymentTerms;
use crate::line_items::ItemField;
use crate::model::{
    Currency, InvoiceData, TaxType, Template, Theme, ACCENT_PRESETS, BACKGROUND_PRESETS, PAYMENT_METHODS,
};
use crate::session::{ContactField, Edit, Party};

const PICK_DATE_OPT: &str = "📅 Pick a date";
const NO_DUE_DATE_OPT: &str = "No due date";
const KEEP_OPT: &str = "Keep current";
const NO_PAYMENT_OPT: &str = "(not specified)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Details,
    Contractor,
    Client,
    AddItem,
    EditItem,
    DuplicateItem,
    RemoveItem,
    ImportItems,
    Tax,
    Payment,
    Appearance,
    Preview,
    Export,
    Reset,
    Done,
}

impl MenuAction {
    pub const ALL: [MenuAction; 15] = [
        MenuAction::Details,
        MenuAction::Contractor,
        MenuAction::Client,
        MenuAction::AddItem,
        MenuAction::EditItem,
        MenuAction::DuplicateItem,
        MenuAction::RemoveItem,
        MenuAction::ImportItems,
        MenuAction::Tax,
        MenuAction::Payment,
        MenuAction::Appearance,
        MenuAction::Preview,
        MenuAction::Export,
        MenuAction::Reset,
        MenuAction::Done,
    ];
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuAction::Details => "🧾 Invoice details (number, dates, currency, template)",
            MenuAction::Contractor => "👤 Your information",
            MenuAction::Client => "🏢 Client information",
            MenuAction::AddItem => "➕ Add item",
            MenuAction::EditItem => "✏️  Edit item",
            MenuAction::DuplicateItem => "📋 Duplicate item",
            MenuAction::RemoveItem => "🗑  Remove item",
            MenuAction::ImportItems => "📥 Import items from CSV",
            MenuAction::Tax => "💲 Tax",
            MenuAction::Payment => "🏦 Payment method & notes",
            MenuAction::Appearance => "🎨 Colors & logo",
            MenuAction::Preview => "👀 Preview",
            MenuAction::Export => "📄 Export PDF",
            MenuAction::Reset => "♻️  Start over",
            MenuAction::Done => "✅ Done",
        };
        write!(f, "{}", label)
    }
}

/// Esc / Ctrl-C inside a prompt.
pub fn is_cancel(err: &InvoiceError) -> bool {
    matches!(
        err,
        InvoiceError::Prompt(InquireError::OperationCanceled | InquireError::OperationInterrupted)
    )
}

/// One-line message for a step that did not complete. The session keeps going.
pub fn notice(err: &InvoiceError) -> String {
    if is_cancel(err) { "↩️  Cancelled".to_string() } else { format!("❌ {}", err) }
}

pub fn choose_action() -> Result<MenuAction> {
    Ok(Select::new("What next?", MenuAction::ALL.to_vec()).with_page_size(15).prompt()?)
}

fn select_index(message: &str, options: Vec<String>, current: usize) -> Result<usize> {
    let cursor = current.min(options.len().saturating_sub(1));
    Ok(Select::new(message, options).with_starting_cursor(cursor).raw_prompt()?.index)
}

// ==========================================
// 1. Invoice details
// ==========================================

pub fn details(data: &InvoiceData) -> Result<Vec<Edit>> {
    let mut edits = Vec::new();

    println!("Invoice Number: {}", data.invoice_number);
    if Confirm::new("Override the generated invoice number?").with_default(false).prompt()? {
        let number = Text::new("Invoice Number:").with_default(&data.invoice_number).prompt()?;
        if !number.trim().is_empty() {
            edits.push(Edit::InvoiceNumber(number.trim().to_string()));
        }
    }

    let issue_date = DateSelect::new("Issue Date:").with_default(data.issue_date).prompt()?;
    edits.push(Edit::IssueDate(issue_date));

    let mut options: Vec<String> = PaymentTerms::ALL
        .iter()
        .map(|t| format!("{} ({})", t, t.due_from(issue_date).format("%Y-%m-%d")))
        .collect();
    options.push(PICK_DATE_OPT.to_string());
    options.push(NO_DUE_DATE_OPT.to_string());
    if let Some(due) = data.due_date {
        options.push(format!("{} ({})", KEEP_OPT, due.format("%Y-%m-%d")));
    }
    let terms_len = PaymentTerms::ALL.len();
    let keep_idx = options.len() - 1;
    let choice = select_index("Due Date:", options, if data.due_date.is_some() { keep_idx } else { 1 })?;
    match choice {
        i if i < terms_len => edits.push(Edit::NetTerms(PaymentTerms::ALL[i])),
        i if i == terms_len => {
            let due = DateSelect::new("Due Date:").with_default(data.due_date.unwrap_or(issue_date)).prompt()?;
            edits.push(Edit::DueDate(Some(due)));
        }
        i if i == terms_len + 1 => edits.push(Edit::DueDate(None)),
        _ => {}
    }

    let current = Currency::ALL.iter().position(|c| *c == data.currency).unwrap_or(0);
    let labels = Currency::ALL.iter().map(|c| c.label().to_string()).collect();
    edits.push(Edit::Currency(Currency::ALL[select_index("Currency:", labels, current)?]));

    let current = Template::ALL.iter().position(|t| *t == data.template).unwrap_or(0);
    let labels = Template::ALL.iter().map(|t| t.to_string()).collect();
    edits.push(Edit::Template(Template::ALL[select_index("Template:", labels, current)?]));

    Ok(edits)
}

// ==========================================
// 2. Contacts
// ==========================================

pub fn contact(data: &InvoiceData, party: Party) -> Result<Vec<Edit>> {
    let (current, title) = match party {
        Party::Contractor => (&data.contractor, "Your Information"),
        Party::Client => (&data.client, "Client Information"),
    };
    println!("\n--- {} ---", title);

    let mut edits = Vec::new();
    let mut ask = |field: ContactField, label: &str, value: &str| -> Result<()> {
        let answer = Text::new(label).with_default(value).prompt()?;
        if answer != value {
            edits.push(Edit::Contact(party, field, answer));
        }
        Ok(())
    };

    ask(ContactField::Name, "Full Name:", &current.name)?;
    ask(ContactField::Company, "Company Name (Optional):", &current.company)?;
    ask(ContactField::Email, "Email:", &current.email)?;
    ask(ContactField::Phone, "Phone (Optional):", current.phone.as_deref().unwrap_or(""))?;

    let address = prompt_address(&current.address)?;
    if address != current.address {
        edits.push(Edit::Contact(party, ContactField::Address, address));
    }
    Ok(edits)
}

/// Street, then an optional ZIP lookup to pre-fill city and state.
fn prompt_address(current: &str) -> Result<String> {
    if !current.trim().is_empty() {
        println!("Current address: {}", current.replace('\n', ", "));
        if !Confirm::new("Change address?").with_default(false).prompt()? {
            return Ok(current.to_string());
        }
    }

    let street = Text::new("Street (Leave empty to skip):").prompt()?;
    if street.trim().is_empty() {
        return Ok(String::new());
    }

    let zip = Text::new("Zip Code (Leave empty to skip lookup):").prompt()?;
    let (mut def_city, mut def_state) = (String::new(), String::new());
    if !zip.trim().is_empty() {
        if let Ok(results) = zipcodes::matching(zip.trim(), None) {
            if let Some(info) = results.first() {
                println!("🚀 Found: {}, {}", info.city, info.state);
                def_city = info.city.to_string();
                def_state = info.state.to_string();
            }
        }
    }

    let city = Text::new("City:").with_default(&def_city).prompt()?;
    let state = Text::new("State:").with_default(&def_state).prompt()?;
    Ok(format_address(&street, &city, &state, &zip))
}

pub fn format_address(street: &str, city: &str, state: &str, zip: &str) -> String {
    let region = [state.trim(), zip.trim()].iter().filter(|s| !s.is_empty()).copied().collect::<Vec<_>>().join(" ");
    let locality = [city.trim(), region.as_str()].iter().filter(|s| !s.is_empty()).copied().collect::<Vec<_>>().join(", ");
    [street.trim(), locality.as_str()].iter().filter(|s| !s.is_empty()).copied().collect::<Vec<_>>().join("\n")
}

// ==========================================
// 3. Line items
// ==========================================

pub fn pick_item(data: &InvoiceData, message: &str) -> Result<usize> {
    let labels = data
        .line_items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let desc = if item.description.is_empty() { "(no description)" } else { item.description.as_str() };
            format!("{}. {} ({} × {})", i + 1, desc, item.quantity, data.currency.format_amount(item.rate))
        })
        .collect();
    select_index(message, labels, 0)
}

pub fn item_fields(data: &InvoiceData, index: usize) -> Result<Vec<Edit>> {
    let Some(item) = data.line_items.get(index) else {
        return Ok(Vec::new());
    };
    let description = Text::new("Description:")
        .with_default(&item.description)
        .with_placeholder("Web development services")
        .prompt()?;
    let quantity = Text::new("Quantity:").with_default(&item.quantity.to_string()).prompt()?;
    let rate = Text::new(&format!("Rate ({}):", data.currency)).with_default(&item.rate.to_string()).prompt()?;

    Ok(vec![
        Edit::UpdateItem(index, ItemField::Description, description),
        Edit::UpdateItem(index, ItemField::Quantity, quantity),
        Edit::UpdateItem(index, ItemField::Rate, rate),
    ])
}

// ==========================================
// 4. Tax, payment, appearance
// ==========================================

pub fn tax(data: &InvoiceData) -> Result<Vec<Edit>> {
    let types = [TaxType::Fixed, TaxType::Percentage];
    let current = types.iter().position(|t| *t == data.tax.tax_type).unwrap_or(0);
    let tax_type = types[select_index("Tax Type:", types.iter().map(|t| t.to_string()).collect(), current)?];

    let mut edits = vec![Edit::TaxType(tax_type)];
    match tax_type {
        TaxType::Fixed => {
            let label = format!("Tax Amount ({}):", data.currency);
            let raw = Text::new(&label).with_default(&data.tax.tax.to_string()).prompt()?;
            edits.push(Edit::Tax(raw));
        }
        TaxType::Percentage => {
            let raw = Text::new("Tax Rate % (e.g. 8.875):").with_default(&data.tax.tax_rate.to_string()).prompt()?;
            edits.push(Edit::TaxRate(raw));
        }
    }
    Ok(edits)
}

pub fn payment(data: &InvoiceData) -> Result<Vec<Edit>> {
    let mut labels: Vec<String> = PAYMENT_METHODS.iter().map(|(_, label)| label.to_string()).collect();
    labels.push(NO_PAYMENT_OPT.to_string());
    let current = PAYMENT_METHODS.iter().position(|(v, _)| *v == data.payment_method).unwrap_or(labels.len() - 1);
    let choice = select_index("Payment Method:", labels, current)?;
    let method = PAYMENT_METHODS.get(choice).map(|(v, _)| v.to_string()).unwrap_or_default();

    println!("💡 Tip: Use '\\n' for new lines.");
    let notes = Text::new("Notes:")
        .with_default(&data.notes.replace('\n', "\\n"))
        .with_placeholder("Payment terms, additional notes, or instructions...")
        .prompt()?;

    Ok(vec![Edit::PaymentMethod(method), Edit::Notes(notes.replace("\\n", "\n"))])
}

fn preset_labels(presets: &[(&str, &str)]) -> Vec<String> {
    presets.iter().map(|(name, hex)| format!("{} ({})", name, hex)).collect()
}

pub fn appearance(data: &InvoiceData) -> Result<Vec<Edit>> {
    let accent_idx = ACCENT_PRESETS.iter().position(|(_, hex)| *hex == data.theme.accent).unwrap_or(0);
    let accent = ACCENT_PRESETS[select_index("Accent Color:", preset_labels(ACCENT_PRESETS), accent_idx)?].1;
    let bg_idx = BACKGROUND_PRESETS.iter().position(|(_, hex)| *hex == data.theme.background).unwrap_or(0);
    let background = BACKGROUND_PRESETS[select_index("Invoice Background:", preset_labels(BACKGROUND_PRESETS), bg_idx)?].1;

    let logo = Text::new("Logo image path (Leave empty for none):")
        .with_default(data.logo.as_deref().unwrap_or(""))
        .prompt()?;
    let logo = if logo.trim().is_empty() { None } else { Some(logo.trim().to_string()) };

    Ok(vec![
        Edit::Theme(Theme { accent: accent.to_string(), background: background.to_string() }),
        Edit::Logo(logo),
    ])
}
