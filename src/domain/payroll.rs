//! Partner compensation types: recurring deductions, the itemized statement,
//! and the immutable monthly payroll snapshot.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable, NamedEntity};
use crate::domain::period::Period;

/// Fixed monthly subtraction from a partner's forecast pay, independent of
/// any bill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecurringDeduction {
    pub id: Uuid,
    pub partner_center_id: Uuid,
    pub label: String,
    pub amount: Decimal,
    pub active: bool,
}

impl RecurringDeduction {
    pub fn new(partner_center_id: Uuid, label: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id: Uuid::new_v4(),
            partner_center_id,
            label: label.into(),
            amount,
            active: true,
        }
    }
}

impl Identifiable for RecurringDeduction {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for RecurringDeduction {
    fn name(&self) -> &str {
        &self.label
    }
}

/// One recurring-deduction line of a compensation statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeductionLine {
    pub label: String,
    pub amount: Decimal,
}

/// One bill-backed line of a compensation statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BillLine {
    pub bill_id: Uuid,
    pub description: String,
    pub due_date: NaiveDate,
    pub amount: Decimal,
}

/// Itemized forecast-vs-actual view of a partner's net pay for one period.
///
/// Forecast deductions are the recurring lines plus pending bills; actual
/// deductions are paid (unprocessed) bills plus direct ledger postings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompensationStatement {
    pub partner_center_id: Uuid,
    pub partner_name: String,
    pub period: Period,
    pub base_pay: Decimal,
    pub recurring: Vec<DeductionLine>,
    pub pending_bills: Vec<BillLine>,
    pub paid_bills: Vec<BillLine>,
    pub direct_deductions: Decimal,
    pub forecast_deductions: Decimal,
    pub actual_deductions: Decimal,
    pub total_deductions: Decimal,
    pub net_pay: Decimal,
}

/// Immutable record of a partner's computed compensation for one period.
/// Never recomputed after creation; uniqueness per (partner, period) is
/// enforced before generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayrollSnapshot {
    pub id: Uuid,
    pub period: Period,
    pub partner_center_id: Uuid,
    pub partner_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_document: Option<String>,
    pub base_pay: Decimal,
    pub forecast_deductions: Decimal,
    pub actual_deductions: Decimal,
    pub net_pay: Decimal,
    pub statement: CompensationStatement,
    /// The payable bill generated for this snapshot.
    pub bill_id: Uuid,
    pub paid: bool,
    pub created_at: DateTime<Utc>,
}

impl Identifiable for PayrollSnapshot {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for PayrollSnapshot {
    fn display_label(&self) -> String {
        format!("{} {} net {}", self.partner_name, self.period, self.net_pay)
    }
}

/// A partner the batch could not process, with the reason it failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerFailure {
    pub partner_center_id: Uuid,
    pub partner_name: String,
    pub reason: String,
}

/// Outcome of one payroll generation batch.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PayrollRun {
    pub period: Period,
    pub generated: Vec<Uuid>,
    pub errors: Vec<PartnerFailure>,
}
