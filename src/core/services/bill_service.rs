use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::config::CoreConfig;
use crate::core::collaborators::{CoreEvent, Hooks};
use crate::core::services::center_service::CenterService;
use crate::core::services::ledger_service::{LedgerService, NewEntry};
use crate::domain::period::add_months_clamped;
use crate::domain::{Bill, BillDirection, Books, Frequency, Recurrence};
use crate::errors::{CoreError, CoreResult};

/// Command to register an obligation. Installment and recurring creation
/// reuse it for the shared fields.
#[derive(Debug, Clone)]
pub struct NewBill {
    pub direction: BillDirection,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub center_code: Option<String>,
    pub partner_center_id: Option<Uuid>,
    pub card_id: Option<Uuid>,
}

/// Partial update for an unpaid leaf bill.
#[derive(Debug, Clone, Default)]
pub struct BillPatch {
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
}

/// Registry of payable/receivable obligations: standalone bills, installment
/// groups under a macro parent, and recurring series stamped from a template.
pub struct BillService;

impl BillService {
    pub fn create(books: &mut Books, req: NewBill, hooks: &Hooks) -> CoreResult<Uuid> {
        let bill = Self::build(books, &req, None)?;
        let id = bill.id;
        Self::apply_forecast_accumulators(books, &bill, bill.amount);
        if let Some(card_id) = bill.card_id {
            hooks.recompute_card(card_id, bill.due_date);
        }
        books.add_bill(bill);
        tracing::info!(bill = %id, "bill created");
        Ok(id)
    }

    /// One non-posting macro parent plus `count` leaf installments due on
    /// consecutive months, anchored on the first due date's day-of-month and
    /// clamped to short months. `req.amount` is the per-installment amount;
    /// the parent carries the sum.
    pub fn create_installments(
        books: &mut Books,
        req: NewBill,
        count: u32,
    ) -> CoreResult<(Uuid, Vec<Uuid>)> {
        if count < 2 {
            return Err(CoreError::validation(
                "installment sets need at least two installments",
            ));
        }
        let mut parent = Self::build(books, &req, None)?;
        parent.amount = req.amount * Decimal::from(count);
        let parent_id = parent.id;
        books.add_bill(parent);

        let mut children = Vec::with_capacity(count as usize);
        for index in 0..count {
            let mut child_req = req.clone();
            child_req.due_date = add_months_clamped(req.due_date, index as i32);
            child_req.description =
                format!("{} ({}/{})", req.description.trim(), index + 1, count);
            let child = Self::build(books, &child_req, Some(parent_id))?;
            let child_id = child.id;
            Self::apply_forecast_accumulators(books, &child, child.amount);
            books.add_bill(child);
            children.push(child_id);
        }
        tracing::info!(parent = %parent_id, count, "installment set created");
        Ok((parent_id, children))
    }

    /// A recurring template plus one dated leaf instance per occurrence in
    /// `[start, end]`, anchored on `start`.
    pub fn create_recurring(
        books: &mut Books,
        req: NewBill,
        frequency: Frequency,
        start: NaiveDate,
        end: NaiveDate,
    ) -> CoreResult<(Uuid, Vec<Uuid>)> {
        if end < start {
            return Err(CoreError::validation(
                "recurrence end must not precede its start",
            ));
        }
        let mut template_req = req.clone();
        template_req.due_date = start;
        let mut template = Self::build(books, &template_req, None)?;
        template.recurrence = Some(Recurrence {
            frequency,
            start,
            end,
        });
        let template_id = template.id;
        books.add_bill(template);

        let mut instances = Vec::new();
        for due in frequency.occurrences_between(start, end) {
            let mut instance_req = req.clone();
            instance_req.due_date = due;
            let instance = Self::build(books, &instance_req, Some(template_id))?;
            let instance_id = instance.id;
            Self::apply_forecast_accumulators(books, &instance, instance.amount);
            books.add_bill(instance);
            instances.push(instance_id);
        }
        tracing::info!(template = %template_id, instances = instances.len(), %frequency, "recurring series created");
        Ok((template_id, instances))
    }

    /// Edits an unpaid leaf bill, keeping forecast accumulators and any macro
    /// parent's derived amount in line.
    pub fn update(books: &mut Books, id: Uuid, patch: BillPatch, hooks: &Hooks) -> CoreResult<()> {
        let bill = books
            .bill(id)
            .ok_or_else(|| CoreError::not_found(format!("bill {id}")))?
            .clone();
        if books.is_macro_bill(id) {
            return Err(CoreError::invalid_op(
                "macro bill amounts derive from their installments",
            ));
        }
        if bill.paid {
            return Err(CoreError::conflict("paid bills must be reversed before editing"));
        }
        if let Some(amount) = patch.amount {
            if amount <= Decimal::ZERO {
                return Err(CoreError::validation("bill amount must be positive"));
            }
            let delta = amount - bill.amount;
            if delta != Decimal::ZERO {
                Self::apply_forecast_accumulators(books, &bill, delta);
                if let Some(parent_id) = bill.parent_id {
                    if let Some(parent) = books.bill_mut(parent_id) {
                        parent.amount += delta;
                    }
                }
            }
        }
        if let Some(bill) = books.bill_mut(id) {
            if let Some(description) = patch.description {
                bill.description = description;
            }
            if let Some(amount) = patch.amount {
                bill.amount = amount;
            }
            if let Some(due_date) = patch.due_date {
                bill.due_date = due_date;
            }
        }
        if let Some(bill) = books.bill(id) {
            if let Some(card_id) = bill.card_id {
                hooks.recompute_card(card_id, bill.due_date);
            }
        }
        books.touch();
        Ok(())
    }

    /// Marks a leaf bill paid: posts the ledger entry, rolls the actuals into
    /// the cost-center tree, and informs the collaborators.
    pub fn mark_paid(
        books: &mut Books,
        id: Uuid,
        payment_date: Option<NaiveDate>,
        config: &CoreConfig,
        hooks: &Hooks,
    ) -> CoreResult<Uuid> {
        let bill = books
            .bill(id)
            .ok_or_else(|| CoreError::not_found(format!("bill {id}")))?
            .clone();
        if books.is_macro_bill(id) || bill.is_template() {
            return Err(CoreError::invalid_op(
                "macro bill cannot be paid directly; pay its installments",
            ));
        }
        if bill.paid {
            return Err(CoreError::conflict("bill is already paid"));
        }
        let payment_date = payment_date.unwrap_or_else(|| Utc::now().date_naive());

        // The posting can still fail (entry cap); it happens before any bill
        // state changes so a rejected payment leaves nothing behind.
        let entry_id = LedgerService::post(
            books,
            config,
            NewEntry {
                date: payment_date,
                direction: bill.direction.entry_direction(),
                amount: bill.amount,
                counterpart: bill.description.clone(),
                center_code: bill.center_code.clone(),
                bill_id: Some(id),
            },
        )?;

        if let Some(bill) = books.bill_mut(id) {
            bill.paid = true;
            bill.payment_date = Some(payment_date);
        }
        Self::apply_payment_accumulators(books, &bill, bill.amount);
        if let Some(snapshot_id) = books.snapshot_for_bill(id).map(|s| s.id) {
            if let Some(snapshot) = books
                .payroll_history
                .iter_mut()
                .find(|s| s.id == snapshot_id)
            {
                snapshot.paid = true;
            }
        }
        hooks.notify(CoreEvent::BillPaid {
            bill_id: id,
            amount: bill.amount,
            payment_date,
        });
        if let Some(card_id) = bill.card_id {
            hooks.recompute_card(card_id, bill.due_date);
        }
        tracing::info!(bill = %id, entry = %entry_id, "bill paid");
        Ok(entry_id)
    }

    /// Returns a paid bill to pending by reversing its ledger entry.
    pub fn mark_unpaid(books: &mut Books, id: Uuid, hooks: &Hooks) -> CoreResult<()> {
        let bill = books
            .bill(id)
            .ok_or_else(|| CoreError::not_found(format!("bill {id}")))?;
        if !bill.paid {
            return Err(CoreError::conflict("bill is not paid"));
        }
        let entry_id = books
            .entry_for_bill(id)
            .map(|e| e.id)
            .ok_or_else(|| CoreError::conflict("paid bill has no ledger entry"))?;
        LedgerService::reverse(books, entry_id, hooks)?;
        Ok(())
    }

    /// Deletes a bill. A macro parent cascades through every installment
    /// first, reversing the paid ones; a leaf reverses its own entry when
    /// paid and unwinds its forecast contribution.
    pub fn delete(books: &mut Books, id: Uuid, hooks: &Hooks) -> CoreResult<()> {
        if books.bill(id).is_none() {
            return Err(CoreError::not_found(format!("bill {id}")));
        }
        if books.is_macro_bill(id) {
            let children: Vec<Uuid> = books.bill_children(id).iter().map(|b| b.id).collect();
            for child in children {
                Self::delete_leaf(books, child, hooks, false)?;
            }
            let removed = books.remove_bill(id);
            if let Some(parent) = removed {
                if let Some(card_id) = parent.card_id {
                    hooks.recompute_card(card_id, parent.due_date);
                }
            }
            tracing::info!(bill = %id, "macro bill deleted with installments");
            return Ok(());
        }
        Self::delete_leaf(books, id, hooks, true)
    }

    fn delete_leaf(
        books: &mut Books,
        id: Uuid,
        hooks: &Hooks,
        adjust_parent: bool,
    ) -> CoreResult<()> {
        let bill = books
            .bill(id)
            .ok_or_else(|| CoreError::not_found(format!("bill {id}")))?
            .clone();
        if bill.paid {
            if let Some(entry_id) = books.entry_for_bill(id).map(|e| e.id) {
                LedgerService::reverse(books, entry_id, hooks)?;
            }
        }
        Self::apply_forecast_accumulators(books, &bill, -bill.amount);
        if adjust_parent {
            if let Some(parent_id) = bill.parent_id {
                if let Some(parent) = books.bill_mut(parent_id) {
                    parent.amount -= bill.amount;
                }
            }
        }
        books.remove_bill(id);
        if let Some(card_id) = bill.card_id {
            hooks.recompute_card(card_id, bill.due_date);
        }
        tracing::info!(bill = %id, "bill deleted");
        Ok(())
    }

    /// One-way flag flip used exclusively by the payroll snapshotter so a
    /// bill is counted at most once across monthly runs. Idempotent.
    pub fn mark_processed_for_payroll(books: &mut Books, ids: &[Uuid]) -> CoreResult<()> {
        for id in ids {
            if books.bill(*id).is_none() {
                return Err(CoreError::not_found(format!("bill {id}")));
            }
        }
        for id in ids {
            if let Some(bill) = books.bill_mut(*id) {
                bill.processed_for_payroll = true;
            }
        }
        books.touch();
        Ok(())
    }

    /// Validates the command and assembles the bill row.
    fn build(books: &Books, req: &NewBill, parent_id: Option<Uuid>) -> CoreResult<Bill> {
        if req.amount <= Decimal::ZERO {
            return Err(CoreError::validation("bill amount must be positive"));
        }
        if req.description.trim().is_empty() {
            return Err(CoreError::validation("bill description must not be empty"));
        }
        if let Some(partner_id) = req.partner_center_id {
            let center = books
                .center_by_id(partner_id)
                .ok_or_else(|| CoreError::not_found(format!("partner center {partner_id}")))?;
            if !center.is_partner() {
                return Err(CoreError::validation(
                    "responsible center is not a partner center",
                ));
            }
        }
        if let Some(code) = &req.center_code {
            if books.center(code).is_none() {
                tracing::warn!(%code, "bill references an unknown cost center");
            }
        }
        let mut bill = Bill::new(
            req.direction,
            req.description.trim(),
            req.amount,
            req.due_date,
        );
        if let Some(code) = &req.center_code {
            bill = bill.with_center(code.clone());
        }
        bill.partner_center_id = req.partner_center_id;
        bill.card_id = req.card_id;
        bill.parent_id = parent_id;
        Ok(bill)
    }

    /// Forecast-side accumulator maintenance for a bill worth `delta`.
    /// The generic forecast increment is skipped when the bill is a partner
    /// deduction charged to its own center; the partner forecast-deduction
    /// accumulator tracks partner-responsible bills either way.
    pub(crate) fn apply_forecast_accumulators(books: &mut Books, bill: &Bill, delta: Decimal) {
        if !Self::deducts_from_own_center(books, bill) {
            if let Some(code) = &bill.center_code {
                CenterService::increment_forecast(books, code, delta);
            }
        }
        if let Some(partner_id) = bill.partner_center_id {
            CenterService::adjust_partner_deduction(books, partner_id, delta, Decimal::ZERO);
        }
    }

    /// Actual-side accumulator maintenance for a payment (or its reversal)
    /// worth `delta`. Partner deductions never count as the partner center's
    /// own expense; the actual-deduction accumulator is fed by direct ledger
    /// postings only, so bill payments leave it alone.
    pub(crate) fn apply_payment_accumulators(books: &mut Books, bill: &Bill, delta: Decimal) {
        if Self::deducts_from_own_center(books, bill) {
            return;
        }
        if let Some(code) = &bill.center_code {
            CenterService::increment_actual(books, code, delta);
        }
    }

    fn deducts_from_own_center(books: &Books, bill: &Bill) -> bool {
        match (&bill.center_code, bill.partner_center_id) {
            (Some(code), Some(partner_id)) => {
                books.center(code).map(|c| c.id) == Some(partner_id)
            }
            _ => false,
        }
    }
}
