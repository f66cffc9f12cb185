use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::core::collaborators::{CoreEvent, Hooks};
use crate::core::services::bill_service::{BillService, NewBill};
use crate::core::services::compensation_service::CompensationService;
use crate::domain::{
    BillDirection, Books, PartnerFailure, PayrollRun, PayrollSnapshot, Period,
};
use crate::errors::{CoreError, CoreResult};

/// Freezes partner compensation into immutable monthly snapshots, exactly
/// once per period. State machine per (partner, period):
/// `NotGenerated -> Generated`.
pub struct PayrollService;

impl PayrollService {
    /// Generates the payroll for `period` across every active partner.
    ///
    /// The batch is best-effort: one partner's failure is recorded in
    /// `errors` and the remaining partners still run. Per-partner work is
    /// all-or-nothing because everything fallible happens before the first
    /// mutation for that partner.
    pub fn generate(books: &mut Books, period: Period, hooks: &Hooks) -> CoreResult<PayrollRun> {
        // Idempotency guard, tenant-wide and checked before any writes.
        if books.payroll_history.iter().any(|s| s.period == period) {
            return Err(CoreError::conflict(format!(
                "payroll already generated for {period}"
            )));
        }

        let partner_ids: Vec<Uuid> = books.partner_centers().map(|c| c.id).collect();
        let mut generated = Vec::new();
        let mut errors = Vec::new();
        for partner_id in partner_ids {
            match Self::generate_for_partner(books, partner_id, period, hooks) {
                Ok(snapshot_id) => generated.push(snapshot_id),
                Err(err) => {
                    let partner_name = books
                        .center_by_id(partner_id)
                        .map(|c| c.name.clone())
                        .unwrap_or_default();
                    tracing::error!(partner = %partner_name, %err, "payroll generation failed for partner");
                    errors.push(PartnerFailure {
                        partner_center_id: partner_id,
                        partner_name,
                        reason: err.to_string(),
                    });
                }
            }
        }

        hooks.notify(CoreEvent::PayrollGenerated {
            period,
            snapshots: generated.len(),
            failures: errors.len(),
        });
        tracing::info!(%period, snapshots = generated.len(), failures = errors.len(), "payroll batch finished");
        Ok(PayrollRun {
            period,
            generated,
            errors,
        })
    }

    fn generate_for_partner(
        books: &mut Books,
        partner_center_id: Uuid,
        period: Period,
        hooks: &Hooks,
    ) -> CoreResult<Uuid> {
        let statement = CompensationService::statement(books, partner_center_id, period)?;
        let center = books
            .center_by_id(partner_center_id)
            .ok_or_else(|| CoreError::not_found(format!("partner center {partner_center_id}")))?;
        let center_code = center.code.clone();
        let partner_document = center.partner.as_ref().and_then(|p| p.document.clone());
        let consumed: Vec<Uuid> = statement.paid_bills.iter().map(|l| l.bill_id).collect();

        // The pay bill carries no partner-responsible reference: it is owed
        // TO the partner and must never feed back into later deductions.
        let bill_id = BillService::create(
            books,
            NewBill {
                direction: BillDirection::Payable,
                description: format!("Pro-labore {} {}", statement.partner_name, period),
                amount: statement.net_pay,
                due_date: period.end(),
                center_code: Some(center_code),
                partner_center_id: None,
                card_id: None,
            },
            hooks,
        )?;

        // Everything below is infallible: the partner either gets the full
        // snapshot or none of it.
        BillService::mark_processed_for_payroll(books, &consumed)?;
        let snapshot = PayrollSnapshot {
            id: Uuid::new_v4(),
            period,
            partner_center_id,
            partner_name: statement.partner_name.clone(),
            partner_document,
            base_pay: statement.base_pay,
            forecast_deductions: statement.forecast_deductions,
            actual_deductions: statement.actual_deductions,
            net_pay: statement.net_pay,
            statement,
            bill_id,
            paid: false,
            created_at: Utc::now(),
        };
        let snapshot_id = snapshot.id;
        books.payroll_history.push(snapshot);

        // Deduction counters restart for the next period; the generic
        // actual_amount stays, it belongs to the tree rollup.
        if let Some(center) = books.center_by_id_mut(partner_center_id) {
            center.partner_forecast_deduction = Decimal::ZERO;
            center.partner_actual_deduction = Decimal::ZERO;
        }
        books.touch();
        tracing::info!(partner = %partner_center_id, snapshot = %snapshot_id, "payroll snapshot written");
        Ok(snapshot_id)
    }
}
