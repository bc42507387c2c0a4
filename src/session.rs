use chrono::NaiveDate;
use rand::Rng;

use crate::config::Settings;
use crate::identity::{generate_invoice_number, PaymentTerms};
use crate::line_items::{self, ItemField, RawItem};
use crate::model::{ContactInfo, Currency, InvoiceData, TaxType, Template, Theme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Contractor,
    Client,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Name,
    Company,
    Email,
    Phone,
    Address,
}

/// One discrete change made through the form.
#[derive(Debug, Clone, PartialEq)]
pub enum Edit {
    InvoiceNumber(String),
    IssueDate(NaiveDate),
    DueDate(Option<NaiveDate>),
    NetTerms(PaymentTerms),
    Currency(Currency),
    Template(Template),
    Contact(Party, ContactField, String),
    AddItem,
    RemoveItem(usize),
    DuplicateItem(usize),
    UpdateItem(usize, ItemField, String),
    ReplaceItems(Vec<RawItem>),
    TaxType(TaxType),
    Tax(String),
    TaxRate(String),
    PaymentMethod(String),
    Notes(String),
    Logo(Option<String>),
    Theme(Theme),
}

/// A new invoice numbered for `today`, pre-filled with the contractor profile.
pub fn fresh_invoice<R: Rng + ?Sized>(
    settings: &Settings,
    contractor: &ContactInfo,
    today: NaiveDate,
    rng: &mut R,
) -> InvoiceData {
    let number = generate_invoice_number(settings.number_pattern, today, rng);
    let mut data = InvoiceData::new(number, today);
    data.contractor = contractor.clone();
    data.currency = settings.currency;
    data.template = settings.template;
    data
}

impl InvoiceData {
    /// Returns the next snapshot with totals re-derived from scratch.
    pub fn apply(&self, edit: Edit) -> InvoiceData {
        let mut next = self.clone();
        next.apply_in_place(edit);
        next.recompute();
        next
    }

    fn contact_mut(&mut self, party: Party) -> &mut ContactInfo {
        match party {
            Party::Contractor => &mut self.contractor,
            Party::Client => &mut self.client,
        }
    }

    fn apply_in_place(&mut self, edit: Edit) {
        match edit {
            Edit::InvoiceNumber(n) => self.invoice_number = n,
            Edit::IssueDate(d) => self.issue_date = d,
            Edit::DueDate(d) => self.due_date = d,
            Edit::NetTerms(terms) => self.due_date = Some(terms.due_from(self.issue_date)),
            Edit::Currency(c) => self.currency = c,
            Edit::Template(t) => self.template = t,
            Edit::Contact(party, field, value) => {
                let contact = self.contact_mut(party);
                match field {
                    ContactField::Name => contact.name = value,
                    ContactField::Company => contact.company = value,
                    ContactField::Email => contact.email = value,
                    ContactField::Phone => {
                        contact.phone = if value.trim().is_empty() { None } else { Some(value) }
                    }
                    ContactField::Address => contact.address = value,
                }
            }
            Edit::AddItem => line_items::add(&mut self.line_items),
            Edit::RemoveItem(i) => {
                line_items::remove(&mut self.line_items, i);
            }
            Edit::DuplicateItem(i) => {
                line_items::duplicate(&mut self.line_items, i);
            }
            Edit::UpdateItem(i, field, raw) => {
                line_items::update(&mut self.line_items, i, field, &raw);
            }
            Edit::ReplaceItems(rows) => {
                line_items::bulk_replace(&mut self.line_items, &rows);
            }
            Edit::TaxType(t) => self.tax.tax_type = t,
            Edit::Tax(raw) => self.tax.tax = line_items::coerce_amount(&raw),
            Edit::TaxRate(raw) => self.tax.tax_rate = line_items::coerce_percentage(&raw),
            Edit::PaymentMethod(m) => self.payment_method = m,
            Edit::Notes(n) => self.notes = n,
            Edit::Logo(path) => self.logo = path,
            Edit::Theme(theme) => self.theme = theme,
        }
    }

    /// Back to the initial shape with a new number, keeping the contractor profile.
    pub fn reset<R: Rng + ?Sized>(&self, settings: &Settings, today: NaiveDate, rng: &mut R) -> InvoiceData {
        fresh_invoice(settings, &self.contractor, today, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LineItem;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 20).unwrap()
    }

    fn blank() -> InvoiceData {
        InvoiceData::new("INV-202401-001", today())
    }

    #[test]
    fn test_item_edits_rederive_every_total() {
        let data = blank()
            .apply(Edit::UpdateItem(0, ItemField::Description, "A".into()))
            .apply(Edit::UpdateItem(0, ItemField::Quantity, "2".into()))
            .apply(Edit::UpdateItem(0, ItemField::Rate, "10".into()))
            .apply(Edit::Tax("5".into()));
        assert_eq!(data.totals().subtotal, dec!(20));
        assert_eq!(data.totals().total, dec!(25));

        let data = data.apply(Edit::DuplicateItem(0));
        assert_eq!(data.totals().subtotal, dec!(40));
        assert_eq!(data.totals().total, dec!(45));

        let data = data.apply(Edit::RemoveItem(1));
        assert_eq!(data.totals().total, dec!(25));
    }

    #[test]
    fn test_oversized_rate_saturates_instead_of_failing() {
        let data = blank()
            .apply(Edit::UpdateItem(0, ItemField::Rate, "50000000000000000000000000000".into()))
            .apply(Edit::UpdateItem(0, ItemField::Quantity, "2".into()));
        assert_eq!(data.line_items[0].quantity, 2);
        assert_eq!(data.totals().subtotal, Decimal::MAX);

        let data = data.apply(Edit::DuplicateItem(0)).apply(Edit::Tax("10".into()));
        assert_eq!(data.line_items.len(), 2);
        assert_eq!(data.totals().total, Decimal::MAX);
        assert!(data.currency.format_amount(data.totals().total).starts_with('$'));
    }

    #[test]
    fn test_apply_leaves_previous_snapshot_untouched() {
        let before = blank();
        let after = before.apply(Edit::AddItem);
        assert_eq!(before.line_items.len(), 1);
        assert_eq!(after.line_items.len(), 2);
    }

    #[test]
    fn test_tax_mode_switch_preserves_inactive_field() {
        let data = blank()
            .apply(Edit::UpdateItem(0, ItemField::Rate, "100".into()))
            .apply(Edit::UpdateItem(0, ItemField::Quantity, "3".into()))
            .apply(Edit::Tax("12".into()))
            .apply(Edit::TaxType(TaxType::Percentage))
            .apply(Edit::TaxRate("10".into()));
        assert_eq!(data.totals().tax_amount, dec!(30));
        assert_eq!(data.totals().total, dec!(330));
        assert_eq!(data.tax.tax, dec!(12));

        let data = data.apply(Edit::TaxType(TaxType::Fixed));
        assert_eq!(data.tax.tax_rate, dec!(10));
        assert_eq!(data.totals().total, dec!(312));
    }

    #[test]
    fn test_malformed_tax_input_is_clamped() {
        let data = blank().apply(Edit::Tax("abc".into())).apply(Edit::TaxRate("140".into()));
        assert_eq!(data.tax.tax, Decimal::ZERO);
        assert_eq!(data.tax.tax_rate, dec!(100));
    }

    #[test]
    fn test_net_terms_use_issue_date() {
        let data = blank().apply(Edit::NetTerms(PaymentTerms::Net15));
        assert_eq!(data.due_date, NaiveDate::from_ymd_opt(2024, 2, 4));
        let data = data.apply(Edit::DueDate(None));
        assert_eq!(data.due_date, None);
    }

    #[test]
    fn test_contact_edits() {
        let data = blank()
            .apply(Edit::Contact(Party::Client, ContactField::Company, "Client Company Inc".into()))
            .apply(Edit::Contact(Party::Contractor, ContactField::Phone, "  ".into()));
        assert_eq!(data.client.company, "Client Company Inc");
        assert_eq!(data.contractor.phone, None);
        assert_eq!(data.contractor.company, "");
    }

    #[test]
    fn test_invoice_number_stays_editable() {
        let data = blank().apply(Edit::InvoiceNumber("CUSTOM-1".into()));
        assert_eq!(data.document_name(), "invoice-CUSTOM-1");
    }

    #[test]
    fn test_import_replaces_items() {
        let rows = vec![RawItem { description: "Consulting".into(), quantity: "2".into(), rate: "150".into() }];
        let data = blank().apply(Edit::ReplaceItems(rows));
        assert_eq!(data.line_items, vec![LineItem::new("Consulting", 2, dec!(150))]);
        assert_eq!(data.totals().total, dec!(300));
    }

    #[test]
    fn test_fresh_and_reset() {
        let settings = Settings { currency: Currency::EUR, template: Template::Minimal, ..Settings::default() };
        let me = ContactInfo { name: "John Doe".into(), ..Default::default() };
        let mut rng = StdRng::seed_from_u64(3);

        let data = fresh_invoice(&settings, &me, today(), &mut rng);
        assert!(data.invoice_number.starts_with("INV-202401-"));
        assert_eq!(data.contractor.name, "John Doe");
        assert_eq!(data.currency, Currency::EUR);
        assert_eq!(data.template, Template::Minimal);

        let edited = data.apply(Edit::AddItem).apply(Edit::Notes("thanks".into()));
        let reset = edited.reset(&settings, today(), &mut rng);
        assert_eq!(reset.line_items, vec![LineItem::default()]);
        assert_eq!(reset.notes, "");
        assert_eq!(reset.contractor.name, "John Doe");
    }
}
