use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Books, RecurringDeduction};
use crate::errors::{CoreError, CoreResult};

/// Validated CRUD for a partner's fixed monthly deductions.
pub struct DeductionService;

impl DeductionService {
    pub fn add(
        books: &mut Books,
        partner_center_id: Uuid,
        label: impl Into<String>,
        amount: Decimal,
    ) -> CoreResult<Uuid> {
        let label = label.into();
        if label.trim().is_empty() {
            return Err(CoreError::validation("deduction label must not be empty"));
        }
        if amount <= Decimal::ZERO {
            return Err(CoreError::validation("deduction amount must be positive"));
        }
        let center = books
            .center_by_id(partner_center_id)
            .ok_or_else(|| CoreError::not_found(format!("partner center {partner_center_id}")))?;
        if !center.is_partner() {
            return Err(CoreError::validation(
                "deductions attach to partner centers only",
            ));
        }
        Ok(books.add_deduction(RecurringDeduction::new(
            partner_center_id,
            label.trim(),
            amount,
        )))
    }

    pub fn deactivate(books: &mut Books, id: Uuid) -> CoreResult<()> {
        let deduction = books
            .deduction_mut(id)
            .ok_or_else(|| CoreError::not_found(format!("deduction {id}")))?;
        deduction.active = false;
        books.touch();
        Ok(())
    }

    pub fn remove(books: &mut Books, id: Uuid) -> CoreResult<RecurringDeduction> {
        let index = books
            .deductions
            .iter()
            .position(|d| d.id == id)
            .ok_or_else(|| CoreError::not_found(format!("deduction {id}")))?;
        books.touch();
        Ok(books.deductions.remove(index))
    }

    pub fn list_for_partner<'a>(
        books: &'a Books,
        partner_center_id: Uuid,
    ) -> Vec<&'a RecurringDeduction> {
        books
            .deductions
            .iter()
            .filter(|d| d.partner_center_id == partner_center_id)
            .collect()
    }
}
