pub mod bill;
pub mod books;
pub mod common;
pub mod cost_center;
pub mod ledger_entry;
pub mod payroll;
pub mod period;

pub use bill::{Bill, BillDirection, Recurrence};
pub use books::Books;
pub use common::{Displayable, Identifiable, NamedEntity, TenantContext};
pub use cost_center::{CenterKind, CostCenter, PartnerProfile};
pub use ledger_entry::{EntryDirection, LedgerEntry};
pub use payroll::{
    BillLine, CompensationStatement, DeductionLine, PartnerFailure, PayrollRun, PayrollSnapshot,
    RecurringDeduction,
};
pub use period::{Frequency, Period};
