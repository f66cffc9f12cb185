use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{
    BillLine, Books, CompensationStatement, CostCenter, DeductionLine, Period,
};
use crate::errors::{CoreError, CoreResult};

/// Pure read computation of a partner's forecast-vs-actual net pay. Holds no
/// state of its own; everything derives from the books on demand.
pub struct CompensationService;

impl CompensationService {
    /// Itemized net-pay statement for one partner and period.
    ///
    /// `net_pay = base_pay - (recurring deductions + pending bills in period
    /// + paid unprocessed bills in period + direct ledger deductions)`.
    /// Macro parents and templates never enter the sums; only leaves count.
    pub fn statement(
        books: &Books,
        partner_center_id: Uuid,
        period: Period,
    ) -> CoreResult<CompensationStatement> {
        let center = books
            .center_by_id(partner_center_id)
            .filter(|c| c.is_partner())
            .ok_or_else(|| {
                CoreError::not_found(format!("partner center {partner_center_id}"))
            })?;
        let Some(profile) = center.partner.as_ref() else {
            // Degraded read: a malformed partner record yields a
            // zero-deduction statement, not a hard failure.
            tracing::warn!(code = %center.code, "partner center without profile");
            return Ok(Self::zero_statement(center, period));
        };

        let recurring: Vec<DeductionLine> = books
            .deductions
            .iter()
            .filter(|d| d.active && d.partner_center_id == partner_center_id)
            .map(|d| DeductionLine {
                label: d.label.clone(),
                amount: d.amount,
            })
            .collect();
        let pending_bills = Self::bill_lines(books, partner_center_id, period, false);
        let paid_bills = Self::bill_lines(books, partner_center_id, period, true);

        let recurring_total: Decimal = recurring.iter().map(|l| l.amount).sum();
        let pending_total: Decimal = pending_bills.iter().map(|l| l.amount).sum();
        let paid_total: Decimal = paid_bills.iter().map(|l| l.amount).sum();
        let direct_deductions = center.partner_actual_deduction;

        let forecast_deductions = recurring_total + pending_total;
        let actual_deductions = paid_total + direct_deductions;
        let total_deductions = forecast_deductions + actual_deductions;

        Ok(CompensationStatement {
            partner_center_id,
            partner_name: profile.legal_name.clone(),
            period,
            base_pay: profile.base_pay,
            recurring,
            pending_bills,
            paid_bills,
            direct_deductions,
            forecast_deductions,
            actual_deductions,
            total_deductions,
            net_pay: profile.base_pay - total_deductions,
        })
    }

    /// One statement per active partner center. Individual failures degrade
    /// to a zero-deduction statement with a logged warning.
    pub fn statements(books: &Books, period: Period) -> Vec<CompensationStatement> {
        books
            .partner_centers()
            .map(|center| match Self::statement(books, center.id, period) {
                Ok(statement) => statement,
                Err(err) => {
                    tracing::warn!(code = %center.code, %err, "statement degraded to zero");
                    Self::zero_statement(center, period)
                }
            })
            .collect()
    }

    /// Leaf bills charged to the partner, due inside the period. Paid lines
    /// additionally exclude bills already consumed by a payroll run.
    fn bill_lines(books: &Books, partner_id: Uuid, period: Period, paid: bool) -> Vec<BillLine> {
        books
            .bills
            .iter()
            .filter(|b| {
                b.partner_center_id == Some(partner_id)
                    && b.paid == paid
                    && period.contains(b.due_date)
                    && !b.is_template()
                    && !books.is_macro_bill(b.id)
                    && (!paid || !b.processed_for_payroll)
            })
            .map(|b| BillLine {
                bill_id: b.id,
                description: b.description.clone(),
                due_date: b.due_date,
                amount: b.amount,
            })
            .collect()
    }

    fn zero_statement(center: &CostCenter, period: Period) -> CompensationStatement {
        CompensationStatement {
            partner_center_id: center.id,
            partner_name: center.name.clone(),
            period,
            base_pay: center.base_pay(),
            recurring: Vec::new(),
            pending_bills: Vec::new(),
            paid_bills: Vec::new(),
            direct_deductions: Decimal::ZERO,
            forecast_deductions: Decimal::ZERO,
            actual_deductions: Decimal::ZERO,
            total_deductions: Decimal::ZERO,
            net_pay: center.base_pay(),
        }
    }
}
