use chrono::{Datelike, Days, NaiveDate};
use clap::ValueEnum;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum NumberPattern {
    /// INV-YYYYMM-RRR
    #[default]
    Monthly,
    /// INV-YYYY-RRR
    Yearly,
    /// RRR
    Simple,
}

impl fmt::Display for NumberPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NumberPattern::Monthly => write!(f, "monthly"),
            NumberPattern::Yearly => write!(f, "yearly"),
            NumberPattern::Simple => write!(f, "simple"),
        }
    }
}

/// Best effort only: two calls in the same period collide about once in a thousand.
pub fn generate_invoice_number<R: Rng + ?Sized>(pattern: NumberPattern, date: NaiveDate, rng: &mut R) -> String {
    let random = rng.gen_range(0..1000u32);
    match pattern {
        NumberPattern::Monthly => format!("INV-{}{:02}-{:03}", date.year(), date.month(), random),
        NumberPattern::Yearly => format!("INV-{}-{:03}", date.year(), random),
        NumberPattern::Simple => format!("{:03}", random),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentTerms {
    Net15,
    Net30,
    Net60,
}

impl PaymentTerms {
    pub const ALL: [PaymentTerms; 3] = [PaymentTerms::Net15, PaymentTerms::Net30, PaymentTerms::Net60];

    pub fn days(&self) -> u64 {
        match self {
            PaymentTerms::Net15 => 15,
            PaymentTerms::Net30 => 30,
            PaymentTerms::Net60 => 60,
        }
    }

    pub fn due_from(&self, issue_date: NaiveDate) -> NaiveDate {
        net_due_date(issue_date, self.days())
    }
}

impl fmt::Display for PaymentTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Net {}", self.days())
    }
}

/// Plain calendar arithmetic; saturates at the end of the supported range.
pub fn net_due_date(issue_date: NaiveDate, days: u64) -> NaiveDate {
    issue_date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use regex::Regex;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_number_patterns() {
        let mut rng = StdRng::seed_from_u64(7);
        let issued = date("2024-03-09");

        let monthly = generate_invoice_number(NumberPattern::Monthly, issued, &mut rng);
        assert!(Regex::new(r"^INV-202403-\d{3}$").unwrap().is_match(&monthly), "{monthly}");

        let yearly = generate_invoice_number(NumberPattern::Yearly, issued, &mut rng);
        assert!(Regex::new(r"^INV-2024-\d{3}$").unwrap().is_match(&yearly), "{yearly}");

        let simple = generate_invoice_number(NumberPattern::Simple, issued, &mut rng);
        assert!(Regex::new(r"^\d{3}$").unwrap().is_match(&simple), "{simple}");
    }

    #[test]
    fn test_random_part_is_zero_padded() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            let n = generate_invoice_number(NumberPattern::Simple, date("2024-01-01"), &mut rng);
            assert_eq!(n.len(), 3);
            assert!(n.parse::<u32>().unwrap() < 1000);
        }
    }

    #[test]
    fn test_net_due_date_crosses_month() {
        assert_eq!(net_due_date(date("2024-01-20"), 15), date("2024-02-04"));
        assert_eq!(PaymentTerms::Net30.due_from(date("2024-02-15")), date("2024-03-16"));
        assert_eq!(PaymentTerms::Net60.due_from(date("2023-12-01")), date("2024-01-30"));
    }

    #[test]
    fn test_terms_display() {
        let labels: Vec<String> = PaymentTerms::ALL.iter().map(|t| t.to_string()).collect();
        assert_eq!(labels, ["Net 15", "Net 30", "Net 60"]);
    }
}
