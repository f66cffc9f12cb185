//! Domain types representing cost and revenue centers.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::common::*;

/// A node in the cost-center tree, accumulating forecast and actual amounts.
///
/// `actual_amount` always equals the node's own posted actuals plus the sum of
/// its children's `actual_amount`; increments propagate up the parent chain.
/// Partner deductions live on the separate `partner_*` accumulators so a
/// partner's node never counts its own payroll deduction as a generic expense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostCenter {
    pub id: Uuid,
    pub name: String,
    pub code: String,
    pub kind: CenterKind,
    pub parent_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner: Option<PartnerProfile>,
    #[serde(default)]
    pub forecast_amount: Decimal,
    #[serde(default)]
    pub actual_amount: Decimal,
    /// The node's own posted share of `actual_amount`, excluding children.
    #[serde(default)]
    pub own_actual_amount: Decimal,
    #[serde(default)]
    pub partner_forecast_deduction: Decimal,
    #[serde(default)]
    pub partner_actual_deduction: Decimal,
    pub active: bool,
}

impl CostCenter {
    pub fn new(name: impl Into<String>, code: impl Into<String>, kind: CenterKind) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            code: code.into().trim().to_uppercase(),
            kind,
            parent_id: None,
            partner: None,
            forecast_amount: Decimal::ZERO,
            actual_amount: Decimal::ZERO,
            own_actual_amount: Decimal::ZERO,
            partner_forecast_deduction: Decimal::ZERO,
            partner_actual_deduction: Decimal::ZERO,
            active: true,
        }
    }

    pub fn with_parent(mut self, parent_id: Uuid) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_partner(mut self, partner: PartnerProfile) -> Self {
        self.partner = Some(partner);
        self
    }

    pub fn is_partner(&self) -> bool {
        self.partner.is_some()
    }

    /// Base compensation for partner centers; zero for regular centers.
    pub fn base_pay(&self) -> Decimal {
        self.partner
            .as_ref()
            .map(|p| p.base_pay)
            .unwrap_or(Decimal::ZERO)
    }
}

impl Identifiable for CostCenter {
    fn id(&self) -> Uuid {
        self.id
    }
}

impl NamedEntity for CostCenter {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Displayable for CostCenter {
    fn display_label(&self) -> String {
        format!("{} [{}] ({})", self.name, self.code, self.kind)
    }
}

/// Compensation identity attached to a partner's cost center.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PartnerProfile {
    pub legal_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    pub base_pay: Decimal,
}

impl PartnerProfile {
    pub fn new(legal_name: impl Into<String>, base_pay: Decimal) -> Self {
        Self {
            legal_name: legal_name.into(),
            document: None,
            base_pay,
        }
    }

    pub fn with_document(mut self, document: impl Into<String>) -> Self {
        self.document = Some(document.into());
        self
    }
}

/// Supported center classifications.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CenterKind {
    Expense,
    Revenue,
}

impl fmt::Display for CenterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CenterKind::Expense => "Expense",
            CenterKind::Revenue => "Revenue",
        };
        f.write_str(label)
    }
}
