use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};
use crate::domain::ledger_entry::EntryDirection;
use crate::domain::period::Frequency;

/// A payable or receivable obligation.
///
/// Bills may stand alone, be grouped as installments under a macro parent, or
/// be stamped out of a recurring template. A bill with children is a macro:
/// it never posts to the ledger and never enters any sum — only leaves do.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bill {
    pub id: Uuid,
    pub direction: BillDirection,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub paid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_code: Option<String>,
    /// Typed partner-responsible reference, resolved at write time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_center_id: Option<Uuid>,
    /// Installment/recurring grouping parent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<Uuid>,
    /// Present only on recurring templates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Recurrence>,
    /// Card-linked bills feed the statement aggregator on every change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<Uuid>,
    #[serde(default)]
    pub processed_for_payroll: bool,
    pub created_at: DateTime<Utc>,
}

impl Bill {
    pub fn new(
        direction: BillDirection,
        description: impl Into<String>,
        amount: Decimal,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            direction,
            description: description.into(),
            amount,
            due_date,
            paid: false,
            payment_date: None,
            center_code: None,
            partner_center_id: None,
            parent_id: None,
            recurrence: None,
            card_id: None,
            processed_for_payroll: false,
            created_at: Utc::now(),
        }
    }

    pub fn with_center(mut self, code: impl Into<String>) -> Self {
        self.center_code = Some(code.into().trim().to_uppercase());
        self
    }

    pub fn with_partner(mut self, partner_center_id: Uuid) -> Self {
        self.partner_center_id = Some(partner_center_id);
        self
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_card(mut self, card_id: Uuid) -> Self {
        self.card_id = Some(card_id);
        self
    }

    pub fn is_template(&self) -> bool {
        self.recurrence.is_some()
    }
}

impl Identifiable for Bill {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for Bill {
    fn display_label(&self) -> String {
        format!("{} ({}, due {})", self.description, self.amount, self.due_date)
    }
}

/// Obligation direction: money the tenant owes vs. money owed to it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BillDirection {
    Payable,
    Receivable,
}

impl BillDirection {
    /// Cash-flow direction a payment of this bill posts to the ledger.
    pub fn entry_direction(&self) -> EntryDirection {
        match self {
            BillDirection::Payable => EntryDirection::Out,
            BillDirection::Receivable => EntryDirection::In,
        }
    }
}

/// Expansion rule carried by a recurring template bill.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Recurrence {
    pub frequency: Frequency,
    pub start: NaiveDate,
    pub end: NaiveDate,
}
