use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::{Displayable, Identifiable};

/// One posted cash movement with its running-balance snapshot.
///
/// Entries are ordered by date, ties broken by `seq` (insertion order), and
/// `balance` is rebuilt chronologically after every insert, edit, or delete.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub date: NaiveDate,
    pub direction: EntryDirection,
    pub amount: Decimal,
    pub counterpart: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bill_id: Option<Uuid>,
    #[serde(default)]
    pub balance: Decimal,
    pub seq: u64,
}

impl LedgerEntry {
    pub fn new(
        date: NaiveDate,
        direction: EntryDirection,
        amount: Decimal,
        counterpart: impl Into<String>,
        seq: u64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            date,
            direction,
            amount,
            counterpart: counterpart.into(),
            center_code: None,
            bill_id: None,
            balance: Decimal::ZERO,
            seq,
        }
    }

    pub fn with_center(mut self, code: impl Into<String>) -> Self {
        self.center_code = Some(code.into().trim().to_uppercase());
        self
    }

    pub fn with_bill(mut self, bill_id: Uuid) -> Self {
        self.bill_id = Some(bill_id);
        self
    }

    /// Amount signed by direction: inflows positive, outflows negative.
    pub fn signed_amount(&self) -> Decimal {
        match self.direction {
            EntryDirection::In => self.amount,
            EntryDirection::Out => -self.amount,
        }
    }

    pub fn sort_key(&self) -> (NaiveDate, u64) {
        (self.date, self.seq)
    }
}

impl Identifiable for LedgerEntry {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl Displayable for LedgerEntry {
    fn display_label(&self) -> String {
        format!("entry:{} {} on {}", self.id, self.amount, self.date)
    }
}

/// Cash-flow direction of a ledger entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EntryDirection {
    In,
    Out,
}
