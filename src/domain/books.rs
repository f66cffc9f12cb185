use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Bill, CostCenter, LedgerEntry, PayrollSnapshot, RecurringDeduction};

const CURRENT_SCHEMA_VERSION: u8 = 1;

/// Per-tenant aggregate holding the cost-center tree, the cash-flow ledger,
/// the bill registry, recurring deductions, and the payroll archive.
///
/// The aggregate is the unit of persistence and of locking: every multi-step
/// mutation (propagation, balance rebuild) runs against one `Books` under a
/// single writer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Books {
    pub tenant_id: Uuid,
    #[serde(default)]
    pub centers: Vec<CostCenter>,
    #[serde(default)]
    pub entries: Vec<LedgerEntry>,
    #[serde(default)]
    pub bills: Vec<Bill>,
    #[serde(default)]
    pub deductions: Vec<RecurringDeduction>,
    #[serde(default)]
    pub payroll_history: Vec<PayrollSnapshot>,
    #[serde(default)]
    next_seq: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default = "Books::schema_version_default")]
    pub schema_version: u8,
}

impl Books {
    pub fn new(tenant_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            tenant_id,
            centers: Vec::new(),
            entries: Vec::new(),
            bills: Vec::new(),
            deductions: Vec::new(),
            payroll_history: Vec::new(),
            next_seq: 0,
            created_at: now,
            updated_at: now,
            schema_version: CURRENT_SCHEMA_VERSION,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn schema_version_default() -> u8 {
        CURRENT_SCHEMA_VERSION
    }

    /// Next ledger insertion sequence; survives persistence so date ties keep
    /// their order across restarts.
    pub fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    // --- centers ---

    pub fn center(&self, code: &str) -> Option<&CostCenter> {
        let code = code.trim();
        self.centers
            .iter()
            .find(|c| c.code.eq_ignore_ascii_case(code))
    }

    pub fn center_mut(&mut self, code: &str) -> Option<&mut CostCenter> {
        let code = code.trim();
        self.centers
            .iter_mut()
            .find(|c| c.code.eq_ignore_ascii_case(code))
    }

    pub fn center_by_id(&self, id: Uuid) -> Option<&CostCenter> {
        self.centers.iter().find(|c| c.id == id)
    }

    pub fn center_by_id_mut(&mut self, id: Uuid) -> Option<&mut CostCenter> {
        self.centers.iter_mut().find(|c| c.id == id)
    }

    pub fn children_of(&self, parent_id: Uuid) -> impl Iterator<Item = &CostCenter> {
        self.centers
            .iter()
            .filter(move |c| c.parent_id == Some(parent_id))
    }

    pub fn add_center(&mut self, center: CostCenter) -> Uuid {
        let id = center.id;
        self.centers.push(center);
        self.touch();
        id
    }

    pub fn partner_centers(&self) -> impl Iterator<Item = &CostCenter> {
        self.centers.iter().filter(|c| c.is_partner() && c.active)
    }

    // --- bills ---

    pub fn bill(&self, id: Uuid) -> Option<&Bill> {
        self.bills.iter().find(|b| b.id == id)
    }

    pub fn bill_mut(&mut self, id: Uuid) -> Option<&mut Bill> {
        self.bills.iter_mut().find(|b| b.id == id)
    }

    pub fn add_bill(&mut self, bill: Bill) -> Uuid {
        let id = bill.id;
        self.bills.push(bill);
        self.touch();
        id
    }

    pub fn remove_bill(&mut self, id: Uuid) -> Option<Bill> {
        let index = self.bills.iter().position(|b| b.id == id)?;
        self.touch();
        Some(self.bills.remove(index))
    }

    pub fn bill_children(&self, parent_id: Uuid) -> Vec<&Bill> {
        self.bills
            .iter()
            .filter(|b| b.parent_id == Some(parent_id))
            .collect()
    }

    /// A macro bill owns at least one child; only its leaves post or sum.
    pub fn is_macro_bill(&self, id: Uuid) -> bool {
        self.bills.iter().any(|b| b.parent_id == Some(id))
    }

    // --- ledger entries ---

    pub fn entry(&self, id: Uuid) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entry_mut(&mut self, id: Uuid) -> Option<&mut LedgerEntry> {
        self.entries.iter_mut().find(|e| e.id == id)
    }

    pub fn remove_entry(&mut self, id: Uuid) -> Option<LedgerEntry> {
        let index = self.entries.iter().position(|e| e.id == id)?;
        self.touch();
        Some(self.entries.remove(index))
    }

    pub fn entry_for_bill(&self, bill_id: Uuid) -> Option<&LedgerEntry> {
        self.entries.iter().find(|e| e.bill_id == Some(bill_id))
    }

    /// Entries dated within `[start, end]`, in ledger order. Macro bills are
    /// filtered at write time, so reporting reads need no special casing.
    pub fn entries_between(
        &self,
        start: chrono::NaiveDate,
        end: chrono::NaiveDate,
    ) -> impl Iterator<Item = &LedgerEntry> {
        self.entries
            .iter()
            .filter(move |e| e.date >= start && e.date <= end)
    }

    /// Current running balance: the balance snapshot of the last entry.
    pub fn balance(&self) -> Decimal {
        self.entries
            .last()
            .map(|e| e.balance)
            .unwrap_or(Decimal::ZERO)
    }

    /// Re-sorts entries by `(date, seq)` and recomputes every running-balance
    /// snapshot chronologically. O(n log n), correctness-first.
    pub fn rebuild_balances(&mut self) {
        self.entries.sort_by_key(|e| e.sort_key());
        let mut balance = Decimal::ZERO;
        for entry in &mut self.entries {
            balance += entry.signed_amount();
            entry.balance = balance;
        }
        self.touch();
    }

    // --- deductions & payroll ---

    pub fn deduction_mut(&mut self, id: Uuid) -> Option<&mut RecurringDeduction> {
        self.deductions.iter_mut().find(|d| d.id == id)
    }

    pub fn add_deduction(&mut self, deduction: RecurringDeduction) -> Uuid {
        let id = deduction.id;
        self.deductions.push(deduction);
        self.touch();
        id
    }

    pub fn snapshot_for_bill(&self, bill_id: Uuid) -> Option<&PayrollSnapshot> {
        self.payroll_history.iter().find(|s| s.bill_id == bill_id)
    }

    // --- invariant checks ---

    /// Broken running-balance links, if any. Expected to be empty after every
    /// operation; surfaced as load warnings by the storage layer.
    pub fn balance_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        let mut previous = Decimal::ZERO;
        let mut last_key = None;
        for entry in &self.entries {
            if let Some(prev_key) = last_key {
                if entry.sort_key() < prev_key {
                    violations.push(format!("entry {} out of chronological order", entry.id));
                }
            }
            let expected = previous + entry.signed_amount();
            if entry.balance != expected {
                violations.push(format!(
                    "entry {} balance {} != expected {}",
                    entry.id, entry.balance, expected
                ));
            }
            previous = entry.balance;
            last_key = Some(entry.sort_key());
        }
        violations
    }

    /// Rollup invariant: each center's `actual_amount` must equal its own
    /// posted actuals plus the sum of its children's `actual_amount`.
    pub fn rollup_violations(&self) -> Vec<String> {
        let mut violations = Vec::new();
        for center in &self.centers {
            let children_sum: Decimal = self
                .children_of(center.id)
                .map(|c| c.actual_amount)
                .sum();
            let expected = center.own_actual_amount + children_sum;
            if center.actual_amount != expected {
                violations.push(format!(
                    "center {} actual {} != own + children {}",
                    center.code, center.actual_amount, expected
                ));
            }
        }
        violations
    }
}
