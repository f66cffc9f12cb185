pub mod bill_service;
pub mod center_service;
pub mod compensation_service;
pub mod deduction_service;
pub mod ledger_service;
pub mod payroll_service;

pub use bill_service::{BillPatch, BillService, NewBill};
pub use center_service::{CenterService, NewCenter, PRO_LABORE_CODE};
pub use compensation_service::CompensationService;
pub use deduction_service::DeductionService;
pub use ledger_service::{EntryPatch, LedgerService, NewEntry};
pub use payroll_service::PayrollService;
