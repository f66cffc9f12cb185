use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::{Books, CenterKind, CostCenter, PartnerProfile};
use crate::errors::{CoreError, CoreResult};

/// Code of the lazily created parent grouping partner compensation centers.
pub const PRO_LABORE_CODE: &str = "PRO-LABORE";

/// Parent-chain walks stop here; deeper chains only happen with corrupt data.
const MAX_TREE_DEPTH: usize = 64;

/// Command to create a cost or revenue center.
#[derive(Debug, Clone)]
pub struct NewCenter {
    pub name: String,
    pub code: String,
    pub kind: CenterKind,
    pub parent_code: Option<String>,
    pub partner: Option<PartnerProfile>,
}

#[derive(Debug, Clone, Copy)]
enum Accumulator {
    Forecast,
    Actual,
}

/// Maintains the cost-center tree and its forecast/actual accumulators.
pub struct CenterService;

impl CenterService {
    pub fn create(books: &mut Books, req: NewCenter) -> CoreResult<Uuid> {
        let code = req.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(CoreError::validation("center code must not be empty"));
        }
        if req.name.trim().is_empty() {
            return Err(CoreError::validation("center name must not be empty"));
        }
        if books.center(&code).is_some() {
            return Err(CoreError::conflict(format!(
                "center code `{code}` already exists"
            )));
        }
        let parent_id = match &req.parent_code {
            Some(parent_code) => {
                let parent = books.center(parent_code).ok_or_else(|| {
                    CoreError::not_found(format!("parent center `{parent_code}`"))
                })?;
                Some(parent.id)
            }
            // Partner centers are grouped under the lazily created
            // pro-labore parent when no explicit parent is given.
            None if req.partner.is_some() => Some(Self::ensure(
                books,
                PRO_LABORE_CODE,
                "Pro-labore",
                CenterKind::Expense,
            )),
            None => None,
        };
        let mut center = CostCenter::new(req.name.trim(), code, req.kind);
        center.parent_id = parent_id;
        center.partner = req.partner;
        tracing::info!(code = %center.code, partner = center.is_partner(), "cost center created");
        Ok(books.add_center(center))
    }

    /// Returns the id of the center with `code`, creating a root-level center
    /// when it does not exist yet.
    pub fn ensure(books: &mut Books, code: &str, name: &str, kind: CenterKind) -> Uuid {
        if let Some(center) = books.center(code) {
            return center.id;
        }
        books.add_center(CostCenter::new(name, code, kind))
    }

    /// Applies `delta` (possibly negative) to the named center's forecast and
    /// to every ancestor up to the root. Unknown codes are a logged no-op:
    /// an unposted, centerless transaction is valid.
    pub fn increment_forecast(books: &mut Books, code: &str, delta: Decimal) {
        Self::propagate(books, code, delta, Accumulator::Forecast);
    }

    /// Same as [`Self::increment_forecast`] for the actual accumulator.
    pub fn increment_actual(books: &mut Books, code: &str, delta: Decimal) {
        Self::propagate(books, code, delta, Accumulator::Actual);
    }

    fn propagate(books: &mut Books, code: &str, delta: Decimal, which: Accumulator) {
        let Some(start) = books.center(code) else {
            tracing::warn!(code, "unknown cost center, increment skipped");
            return;
        };
        // Child-first: collect the chain, then apply bottom-up.
        let mut chain = vec![start.id];
        let mut current = start.parent_id;
        while let Some(parent_id) = current {
            if chain.len() >= MAX_TREE_DEPTH || chain.contains(&parent_id) {
                tracing::warn!(code, "parent chain cycle detected, propagation truncated");
                break;
            }
            match books.center_by_id(parent_id) {
                Some(parent) => {
                    chain.push(parent.id);
                    current = parent.parent_id;
                }
                None => {
                    tracing::warn!(code, %parent_id, "dangling parent reference");
                    break;
                }
            }
        }
        for (depth, id) in chain.into_iter().enumerate() {
            if let Some(center) = books.center_by_id_mut(id) {
                match which {
                    Accumulator::Forecast => center.forecast_amount += delta,
                    Accumulator::Actual => {
                        center.actual_amount += delta;
                        // The named center owns the posting; ancestors only
                        // carry the rollup.
                        if depth == 0 {
                            center.own_actual_amount += delta;
                        }
                    }
                }
            }
        }
        books.touch();
    }

    /// Adjusts a partner center's deduction accumulators. Partner deductions
    /// never propagate to ancestors and never touch `actual_amount`.
    pub fn adjust_partner_deduction(
        books: &mut Books,
        partner_center_id: Uuid,
        forecast_delta: Decimal,
        actual_delta: Decimal,
    ) {
        match books.center_by_id_mut(partner_center_id) {
            Some(center) => {
                center.partner_forecast_deduction += forecast_delta;
                center.partner_actual_deduction += actual_delta;
                books.touch();
            }
            None => {
                tracing::warn!(%partner_center_id, "unknown partner center, deduction skipped");
            }
        }
    }

    /// Soft delete. The center keeps its accumulators for reporting.
    pub fn deactivate(books: &mut Books, code: &str) -> CoreResult<()> {
        let center = books
            .center(code)
            .ok_or_else(|| CoreError::not_found(format!("center `{code}`")))?;
        let id = center.id;
        if books.children_of(id).any(|c| c.active) {
            return Err(CoreError::invalid_op(
                "center has active children and cannot be deactivated",
            ));
        }
        if let Some(center) = books.center_by_id_mut(id) {
            center.active = false;
        }
        books.touch();
        Ok(())
    }

    /// Hard delete, only allowed when no children exist at all.
    pub fn remove(books: &mut Books, code: &str) -> CoreResult<CostCenter> {
        let center = books
            .center(code)
            .ok_or_else(|| CoreError::not_found(format!("center `{code}`")))?;
        let id = center.id;
        if books.children_of(id).next().is_some() {
            return Err(CoreError::invalid_op(
                "center has children and cannot be deleted",
            ));
        }
        let index = books
            .centers
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| CoreError::not_found(format!("center `{code}`")))?;
        books.touch();
        Ok(books.centers.remove(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn books() -> Books {
        Books::new(Uuid::new_v4())
    }

    fn new_center(name: &str, code: &str) -> NewCenter {
        NewCenter {
            name: name.into(),
            code: code.into(),
            kind: CenterKind::Expense,
            parent_code: None,
            partner: None,
        }
    }

    #[test]
    fn duplicate_code_is_a_conflict() {
        let mut books = books();
        CenterService::create(&mut books, new_center("Fuel", "FUEL")).unwrap();
        let err = CenterService::create(&mut books, new_center("Fuel again", "fuel"))
            .expect_err("duplicate code must fail");
        assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn increments_propagate_to_ancestors() {
        let mut books = books();
        CenterService::create(&mut books, new_center("Operations", "OPS")).unwrap();
        let mut child = new_center("Fleet", "FLEET");
        child.parent_code = Some("OPS".into());
        CenterService::create(&mut books, child).unwrap();

        CenterService::increment_actual(&mut books, "FLEET", Decimal::from(250));
        assert_eq!(
            books.center("FLEET").unwrap().actual_amount,
            Decimal::from(250)
        );
        assert_eq!(
            books.center("OPS").unwrap().actual_amount,
            Decimal::from(250)
        );
        assert!(books.rollup_violations().is_empty());
    }

    #[test]
    fn unknown_code_is_a_noop() {
        let mut books = books();
        CenterService::increment_actual(&mut books, "GHOST", Decimal::from(10));
        assert!(books.centers.is_empty());
    }

    #[test]
    fn deactivate_fails_with_active_children() {
        let mut books = books();
        CenterService::create(&mut books, new_center("Operations", "OPS")).unwrap();
        let mut child = new_center("Fleet", "FLEET");
        child.parent_code = Some("OPS".into());
        CenterService::create(&mut books, child).unwrap();

        let err = CenterService::deactivate(&mut books, "OPS").expect_err("children block");
        assert!(matches!(err, CoreError::InvalidOperation(_)), "got {err:?}");

        CenterService::deactivate(&mut books, "FLEET").unwrap();
        CenterService::deactivate(&mut books, "OPS").unwrap();
    }

    #[test]
    fn partner_center_lands_under_pro_labore() {
        let mut books = books();
        let mut req = new_center("Ana", "ANA");
        req.partner = Some(PartnerProfile::new("Ana Souza", Decimal::from(8000)));
        let id = CenterService::create(&mut books, req).unwrap();

        let parent = books.center(PRO_LABORE_CODE).expect("auto-created parent");
        assert_eq!(books.center_by_id(id).unwrap().parent_id, Some(parent.id));
    }
}
