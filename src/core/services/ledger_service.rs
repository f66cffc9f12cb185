use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::core::collaborators::{CoreEvent, Hooks};
use crate::core::services::bill_service::BillService;
use crate::core::services::center_service::CenterService;
use crate::domain::{Books, EntryDirection, LedgerEntry};
use crate::errors::{CoreError, CoreResult};

/// Command to post a cash movement.
#[derive(Debug, Clone)]
pub struct NewEntry {
    pub date: NaiveDate,
    pub direction: EntryDirection,
    pub amount: Decimal,
    pub counterpart: String,
    pub center_code: Option<String>,
    pub bill_id: Option<Uuid>,
}

/// Partial update for an existing entry. Absent fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct EntryPatch {
    pub amount: Option<Decimal>,
    pub date: Option<NaiveDate>,
    pub counterpart: Option<String>,
}

/// Append-only cash-flow ledger with a running balance.
///
/// Every mutation ends in a full chronological rebuild of the balance chain:
/// correctness over incremental speed at this scale, with the per-tenant
/// entry cap bounding the rebuild.
pub struct LedgerService;

impl LedgerService {
    pub fn post(books: &mut Books, config: &CoreConfig, req: NewEntry) -> CoreResult<Uuid> {
        if req.amount <= Decimal::ZERO {
            return Err(CoreError::validation("entry amount must be positive"));
        }
        if req.counterpart.trim().is_empty() {
            return Err(CoreError::validation("entry counterpart must not be empty"));
        }
        if books.entries.len() >= config.max_entries_per_tenant {
            return Err(CoreError::invalid_op(format!(
                "ledger entry cap ({}) reached for tenant",
                config.max_entries_per_tenant
            )));
        }
        if let Some(bill_id) = req.bill_id {
            if books.bill(bill_id).is_none() {
                return Err(CoreError::not_found(format!("bill {bill_id}")));
            }
            if books.is_macro_bill(bill_id) {
                return Err(CoreError::invalid_op(
                    "macro bill cannot post to the ledger; only leaf bills post",
                ));
            }
        }

        let seq = books.allocate_seq();
        let mut entry = LedgerEntry::new(
            req.date,
            req.direction,
            req.amount,
            req.counterpart.trim(),
            seq,
        );
        if let Some(code) = &req.center_code {
            entry = entry.with_center(code.clone());
        }
        entry.bill_id = req.bill_id;
        let id = entry.id;

        // Direct outflows update the center accumulators here. Bill-linked
        // postings are counted once, by the bill payment path.
        if entry.bill_id.is_none() && entry.direction == EntryDirection::Out {
            if let Some(code) = entry.center_code.clone() {
                apply_direct_out(books, &code, req.amount);
            }
        }

        books.entries.push(entry);
        books.rebuild_balances();
        tracing::info!(entry = %id, amount = %req.amount, "ledger entry posted");
        Ok(id)
    }

    /// Edits an entry in place. An amount change forces the same full
    /// chronological rebuild as a delete; skipping it is the classic
    /// stale-balance bug.
    pub fn edit(books: &mut Books, id: Uuid, patch: EntryPatch) -> CoreResult<()> {
        let entry = books
            .entry(id)
            .ok_or_else(|| CoreError::not_found(format!("ledger entry {id}")))?
            .clone();

        if let Some(amount) = patch.amount {
            if amount <= Decimal::ZERO {
                return Err(CoreError::validation("entry amount must be positive"));
            }
            let delta = amount - entry.amount;
            if delta != Decimal::ZERO
                && entry.bill_id.is_none()
                && entry.direction == EntryDirection::Out
            {
                if let Some(code) = entry.center_code.clone() {
                    apply_direct_out(books, &code, delta);
                }
            }
        }

        if let Some(entry) = books.entry_mut(id) {
            if let Some(amount) = patch.amount {
                entry.amount = amount;
            }
            if let Some(date) = patch.date {
                entry.date = date;
            }
            if let Some(counterpart) = patch.counterpart {
                entry.counterpart = counterpart;
            }
        }
        books.rebuild_balances();
        tracing::info!(entry = %id, "ledger entry edited");
        Ok(())
    }

    /// Deletes an entry and unwinds everything it caused: a linked bill
    /// returns to pending, the accumulator incremented at post time is
    /// reversed, and the balance chain is rebuilt.
    pub fn reverse(books: &mut Books, id: Uuid, hooks: &Hooks) -> CoreResult<LedgerEntry> {
        let entry = books
            .remove_entry(id)
            .ok_or_else(|| CoreError::not_found(format!("ledger entry {id}")))?;

        if let Some(bill_id) = entry.bill_id {
            let bill = books.bill(bill_id).cloned();
            if let Some(bill) = bill {
                BillService::apply_payment_accumulators(books, &bill, -bill.amount);
                if let Some(bill) = books.bill_mut(bill_id) {
                    bill.paid = false;
                    bill.payment_date = None;
                }
                if let Some(snapshot_id) = books.snapshot_for_bill(bill_id).map(|s| s.id) {
                    if let Some(snapshot) = books
                        .payroll_history
                        .iter_mut()
                        .find(|s| s.id == snapshot_id)
                    {
                        snapshot.paid = false;
                    }
                }
                hooks.notify(CoreEvent::BillReversed {
                    bill_id,
                    amount: bill.amount,
                });
            } else {
                tracing::warn!(%bill_id, "reversed entry linked to a missing bill");
            }
        } else if entry.direction == EntryDirection::Out {
            if let Some(code) = entry.center_code.clone() {
                apply_direct_out(books, &code, -entry.amount);
            }
        }

        books.rebuild_balances();
        tracing::info!(entry = %id, "ledger entry reversed");
        Ok(entry)
    }
}

/// Direct (bill-less) outflow accumulator rule: partner centers take the
/// delta on their actual-deduction counter, everything else rolls into the
/// tree. Unknown codes warn and no-op inside the increment.
fn apply_direct_out(books: &mut Books, code: &str, delta: Decimal) {
    let partner_target = books
        .center(code)
        .filter(|c| c.is_partner())
        .map(|c| c.id);
    match partner_target {
        Some(partner_id) => {
            CenterService::adjust_partner_deduction(books, partner_id, Decimal::ZERO, delta);
        }
        None => CenterService::increment_actual(books, code, delta),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books() -> Books {
        Books::new(Uuid::new_v4())
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn entry(date_: NaiveDate, direction: EntryDirection, amount: i64) -> NewEntry {
        NewEntry {
            date: date_,
            direction,
            amount: Decimal::from(amount),
            counterpart: "counterpart".into(),
            center_code: None,
            bill_id: None,
        }
    }

    #[test]
    fn running_balance_chains_across_postings() {
        let mut books = books();
        let config = CoreConfig::default();
        LedgerService::post(
            &mut books,
            &config,
            entry(date(2024, 3, 1), EntryDirection::In, 1000),
        )
        .unwrap();
        LedgerService::post(
            &mut books,
            &config,
            entry(date(2024, 3, 5), EntryDirection::Out, 400),
        )
        .unwrap();
        assert_eq!(books.balance(), Decimal::from(600));
        assert!(books.balance_violations().is_empty());
    }

    #[test]
    fn out_of_order_insert_rebuilds_the_suffix() {
        let mut books = books();
        let config = CoreConfig::default();
        LedgerService::post(
            &mut books,
            &config,
            entry(date(2024, 3, 10), EntryDirection::In, 500),
        )
        .unwrap();
        // Posted later but dated earlier: must slot in before and reflow.
        LedgerService::post(
            &mut books,
            &config,
            entry(date(2024, 3, 1), EntryDirection::In, 100),
        )
        .unwrap();
        assert_eq!(books.entries[0].amount, Decimal::from(100));
        assert_eq!(books.entries[0].balance, Decimal::from(100));
        assert_eq!(books.entries[1].balance, Decimal::from(600));
    }

    #[test]
    fn entry_cap_is_enforced() {
        let mut books = books();
        let config = CoreConfig {
            max_entries_per_tenant: 1,
            ..CoreConfig::default()
        };
        LedgerService::post(
            &mut books,
            &config,
            entry(date(2024, 3, 1), EntryDirection::In, 10),
        )
        .unwrap();
        let err = LedgerService::post(
            &mut books,
            &config,
            entry(date(2024, 3, 2), EntryDirection::In, 10),
        )
        .expect_err("cap must reject");
        assert!(matches!(err, CoreError::InvalidOperation(_)), "got {err:?}");
    }

    #[test]
    fn edit_of_unknown_entry_is_not_found() {
        let mut books = books();
        let err = LedgerService::edit(&mut books, Uuid::new_v4(), EntryPatch::default())
            .expect_err("unknown id");
        assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");
    }
}
