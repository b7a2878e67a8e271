// src/billing/receivables.rs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

use super::percent_of;
use crate::models::{InvoicePaymentStatus, PaymentStatus};

/// A payment reduced to what settlement needs.
#[derive(Debug, Clone, Copy)]
pub struct Settlement {
    pub amount: Decimal,
    pub status: PaymentStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Balance {
    pub total: Decimal,
    pub paid: Decimal,
    /// Amount still owed; never negative.
    pub outstanding: Decimal,
    /// Amount paid beyond the total; never negative.
    pub credit: Decimal,
}

/// Sum of COMPLETED payments. Pending and refunded payments do not count.
pub fn settled_amount(payments: &[Settlement]) -> Decimal {
    payments
        .iter()
        .filter(|p| p.status == PaymentStatus::Completed)
        .map(|p| p.amount)
        .sum()
}

pub fn balance(total: Decimal, payments: &[Settlement]) -> Balance {
    let paid = settled_amount(payments);
    let diff = total - paid;
    Balance {
        total,
        paid,
        outstanding: diff.max(Decimal::ZERO),
        credit: (-diff).max(Decimal::ZERO),
    }
}

pub fn payment_status(b: &Balance) -> InvoicePaymentStatus {
    if b.credit > Decimal::ZERO {
        InvoicePaymentStatus::Overpaid
    } else if b.outstanding.is_zero() {
        InvoicePaymentStatus::Paid
    } else if b.paid > Decimal::ZERO {
        InvoicePaymentStatus::Partial
    } else {
        InvoicePaymentStatus::Unpaid
    }
}

/// Whole days past `due_date` as of `today`; 0 when not yet due or undated.
pub fn days_overdue(today: NaiveDate, due_date: Option<NaiveDate>) -> i64 {
    due_date.map_or(0, |due| (today - due).num_days().max(0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum AgingCategory {
    #[serde(rename = "CURRENT")]
    Current,
    #[serde(rename = "1-30_DAYS")]
    Days1To30,
    #[serde(rename = "31-60_DAYS")]
    Days31To60,
    #[serde(rename = "61-90_DAYS")]
    Days61To90,
    #[serde(rename = "OVER_90_DAYS")]
    Over90Days,
}

impl AgingCategory {
    pub const ALL: [AgingCategory; 5] = [
        AgingCategory::Current,
        AgingCategory::Days1To30,
        AgingCategory::Days31To60,
        AgingCategory::Days61To90,
        AgingCategory::Over90Days,
    ];

    pub fn from_days(days_overdue: i64) -> Self {
        match days_overdue {
            i64::MIN..=0 => AgingCategory::Current,
            1..=30 => AgingCategory::Days1To30,
            31..=60 => AgingCategory::Days31To60,
            61..=90 => AgingCategory::Days61To90,
            _ => AgingCategory::Over90Days,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AgingCategory::Current => "CURRENT",
            AgingCategory::Days1To30 => "1-30_DAYS",
            AgingCategory::Days31To60 => "31-60_DAYS",
            AgingCategory::Days61To90 => "61-90_DAYS",
            AgingCategory::Over90Days => "OVER_90_DAYS",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    None,
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Risk follows the aging bucket only; amount and guest status do not move it.
    pub fn for_category(category: AgingCategory) -> Self {
        match category {
            AgingCategory::Current => RiskLevel::None,
            AgingCategory::Days1To30 => RiskLevel::Low,
            AgingCategory::Days31To60 => RiskLevel::Medium,
            AgingCategory::Days61To90 | AgingCategory::Over90Days => RiskLevel::High,
        }
    }
}

/// What the receivable view needs from an invoice row.
#[derive(Debug, Clone)]
pub struct OpenInvoice {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub client: String,
    pub currency: String,
    pub total_amount: Decimal,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountReceivable {
    pub invoice_id: i64,
    pub invoice_number: String,
    pub client: String,
    pub currency: String,
    pub due_date: Option<NaiveDate>,
    #[serde(flatten)]
    pub balance: Balance,
    pub days_overdue: i64,
    pub aging_category: AgingCategory,
    pub risk_level: RiskLevel,
}

pub fn receivable(invoice: &OpenInvoice, payments: &[Settlement], today: NaiveDate) -> AccountReceivable {
    let days = days_overdue(today, invoice.due_date);
    let category = AgingCategory::from_days(days);
    AccountReceivable {
        invoice_id: invoice.invoice_id,
        invoice_number: invoice.invoice_number.clone(),
        client: invoice.client.clone(),
        currency: invoice.currency.clone(),
        due_date: invoice.due_date,
        balance: balance(invoice.total_amount, payments),
        days_overdue: days,
        aging_category: category,
        risk_level: RiskLevel::for_category(category),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgingBucket {
    pub aging_category: AgingCategory,
    pub count: usize,
    pub outstanding: Decimal,
    pub percent_of_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgingSummary {
    pub currency: String,
    pub total_outstanding: Decimal,
    pub total_credit: Decimal,
    pub buckets: Vec<AgingBucket>,
}

/// Per-currency aging buckets over receivables, with every bucket present.
pub fn aging_summary(receivables: &[AccountReceivable]) -> Vec<AgingSummary> {
    let mut currencies: Vec<&str> = receivables.iter().map(|r| r.currency.as_str()).collect();
    currencies.sort_unstable();
    currencies.dedup();

    currencies
        .into_iter()
        .map(|currency| {
            let rows: Vec<&AccountReceivable> =
                receivables.iter().filter(|r| r.currency == currency).collect();
            let total_outstanding: Decimal = rows.iter().map(|r| r.balance.outstanding).sum();
            let total_credit: Decimal = rows.iter().map(|r| r.balance.credit).sum();

            let buckets = AgingCategory::ALL
                .iter()
                .map(|&category| {
                    let in_bucket = rows.iter().filter(|r| r.aging_category == category);
                    let (count, outstanding) = in_bucket
                        .fold((0usize, Decimal::ZERO), |(n, sum), r| (n + 1, sum + r.balance.outstanding));
                    AgingBucket {
                        aging_category: category,
                        count,
                        outstanding,
                        percent_of_total: percent_of(outstanding, total_outstanding),
                    }
                })
                .collect();

            AgingSummary { currency: currency.to_string(), total_outstanding, total_credit, buckets }
        })
        .collect()
}
