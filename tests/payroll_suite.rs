use backoffice_core::config::CoreConfig;
use backoffice_core::core::collaborators::Hooks;
use backoffice_core::core::services::{
    BillService, CenterService, CompensationService, DeductionService, NewBill, NewCenter,
    PayrollService,
};
use backoffice_core::domain::{
    BillDirection, Books, CenterKind, PartnerProfile, Period,
};
use backoffice_core::errors::CoreError;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

fn partner(books: &mut Books, name: &str, code: &str, base_pay: i64) -> Uuid {
    CenterService::create(
        books,
        NewCenter {
            name: name.into(),
            code: code.into(),
            kind: CenterKind::Expense,
            parent_code: None,
            partner: Some(PartnerProfile::new(name, dec(base_pay))),
        },
    )
    .unwrap()
}

/// Partner-responsible bill, paid on its due date.
fn paid_partner_bill(books: &mut Books, partner_id: Uuid, amount: i64, due: NaiveDate) -> Uuid {
    let config = CoreConfig::default();
    let hooks = Hooks::noop();
    let bill_id = BillService::create(
        books,
        NewBill {
            direction: BillDirection::Payable,
            description: "Personal expense".into(),
            amount: dec(amount),
            due_date: due,
            center_code: None,
            partner_center_id: Some(partner_id),
            card_id: None,
        },
        &hooks,
    )
    .unwrap();
    BillService::mark_paid(books, bill_id, Some(due), &config, &hooks).unwrap();
    bill_id
}

#[test]
fn net_pay_combines_every_deduction_source() {
    let mut books = Books::new(Uuid::new_v4());
    let period = Period::new(6, 2024).unwrap();
    let ana = partner(&mut books, "Ana Souza", "ANA", 8000);
    DeductionService::add(&mut books, ana, "Health plan", dec(200)).unwrap();
    paid_partner_bill(&mut books, ana, 150, date(2024, 6, 10));

    let statement = CompensationService::statement(&books, ana, period).unwrap();
    assert_eq!(statement.base_pay, dec(8000));
    assert_eq!(statement.forecast_deductions, dec(200));
    assert_eq!(statement.actual_deductions, dec(150));
    assert_eq!(statement.net_pay, dec(7650));
    assert_eq!(statement.recurring.len(), 1);
    assert_eq!(statement.paid_bills.len(), 1);
}

#[test]
fn generate_freezes_the_statement_and_consumes_paid_bills() {
    let mut books = Books::new(Uuid::new_v4());
    let period = Period::new(6, 2024).unwrap();
    let hooks = Hooks::noop();
    let ana = partner(&mut books, "Ana Souza", "ANA", 8000);
    DeductionService::add(&mut books, ana, "Health plan", dec(200)).unwrap();
    let paid_bill = paid_partner_bill(&mut books, ana, 150, date(2024, 6, 10));

    let run = PayrollService::generate(&mut books, period, &hooks).unwrap();
    assert_eq!(run.generated.len(), 1);
    assert!(run.errors.is_empty());

    let snapshot = &books.payroll_history[0];
    assert_eq!(snapshot.net_pay, dec(7650));
    assert_eq!(snapshot.period, period);
    assert_eq!(snapshot.statement.paid_bills.len(), 1);

    let pay_bill = books.bill(snapshot.bill_id).unwrap();
    assert_eq!(pay_bill.amount, dec(7650));
    assert_eq!(pay_bill.due_date, date(2024, 6, 30));
    assert_eq!(pay_bill.partner_center_id, None);
    assert!(!pay_bill.paid);

    assert!(books.bill(paid_bill).unwrap().processed_for_payroll);
    // Deduction counters restart for the next period.
    let center = books.center_by_id(ana).unwrap();
    assert_eq!(center.partner_forecast_deduction, dec(0));
    assert_eq!(center.partner_actual_deduction, dec(0));
}

#[test]
fn generate_is_idempotent_per_period() {
    let mut books = Books::new(Uuid::new_v4());
    let period = Period::new(6, 2024).unwrap();
    let hooks = Hooks::noop();
    partner(&mut books, "Ana Souza", "ANA", 8000);

    PayrollService::generate(&mut books, period, &hooks).unwrap();
    let err = PayrollService::generate(&mut books, period, &hooks)
        .expect_err("second run for the same period");
    assert!(matches!(err, CoreError::Conflict(_)), "got {err:?}");
    assert_eq!(books.payroll_history.len(), 1);
}

#[test]
fn processed_bills_never_count_twice() {
    let mut books = Books::new(Uuid::new_v4());
    let period = Period::new(6, 2024).unwrap();
    let hooks = Hooks::noop();
    let ana = partner(&mut books, "Ana Souza", "ANA", 8000);
    paid_partner_bill(&mut books, ana, 150, date(2024, 6, 10));

    PayrollService::generate(&mut books, period, &hooks).unwrap();

    // The same period recomputed live no longer sees the consumed bill.
    let statement = CompensationService::statement(&books, ana, period).unwrap();
    assert!(statement.paid_bills.is_empty());
    assert_eq!(statement.net_pay, dec(8000));
}

#[test]
fn the_generated_pay_bill_never_feeds_later_deductions() {
    let mut books = Books::new(Uuid::new_v4());
    let hooks = Hooks::noop();
    let ana = partner(&mut books, "Ana Souza", "ANA", 8000);
    DeductionService::add(&mut books, ana, "Health plan", dec(200)).unwrap();

    PayrollService::generate(&mut books, Period::new(6, 2024).unwrap(), &hooks).unwrap();

    let next = CompensationService::statement(&books, ana, Period::new(7, 2024).unwrap()).unwrap();
    assert!(next.pending_bills.is_empty());
    assert!(next.paid_bills.is_empty());
    assert_eq!(next.net_pay, dec(7800));
}

#[test]
fn one_partner_failing_does_not_abort_the_batch() {
    let mut books = Books::new(Uuid::new_v4());
    let period = Period::new(6, 2024).unwrap();
    let hooks = Hooks::noop();
    partner(&mut books, "Ana Souza", "ANA", 8000);
    let bia = partner(&mut books, "Bia Lima", "BIA", 1000);
    // Deductions exceeding base pay make the pay bill impossible.
    DeductionService::add(&mut books, bia, "Advance repayment", dec(1500)).unwrap();

    let run = PayrollService::generate(&mut books, period, &hooks).unwrap();
    assert_eq!(run.generated.len(), 1);
    assert_eq!(run.errors.len(), 1);
    assert_eq!(run.errors[0].partner_name, "Bia Lima");
    assert!(!run.errors[0].reason.is_empty());
    assert_eq!(books.payroll_history.len(), 1);
    assert_eq!(books.payroll_history[0].partner_name, "Ana Souza");
}

#[test]
fn paying_the_pay_bill_flips_the_snapshot() {
    let mut books = Books::new(Uuid::new_v4());
    let config = CoreConfig::default();
    let period = Period::new(6, 2024).unwrap();
    let hooks = Hooks::noop();
    partner(&mut books, "Ana Souza", "ANA", 8000);

    PayrollService::generate(&mut books, period, &hooks).unwrap();
    let bill_id = books.payroll_history[0].bill_id;

    let entry_id =
        BillService::mark_paid(&mut books, bill_id, Some(date(2024, 6, 30)), &config, &hooks)
            .unwrap();
    assert!(books.payroll_history[0].paid);

    backoffice_core::core::services::LedgerService::reverse(&mut books, entry_id, &hooks).unwrap();
    assert!(!books.payroll_history[0].paid);
    assert!(!books.bill(bill_id).unwrap().paid);
}

#[test]
fn direct_partner_postings_enter_the_actual_deductions() {
    let mut books = Books::new(Uuid::new_v4());
    let config = CoreConfig::default();
    let period = Period::new(6, 2024).unwrap();
    let ana = partner(&mut books, "Ana Souza", "ANA", 8000);

    backoffice_core::core::services::LedgerService::post(
        &mut books,
        &config,
        backoffice_core::core::services::NewEntry {
            date: date(2024, 6, 14),
            direction: backoffice_core::domain::EntryDirection::Out,
            amount: dec(320),
            counterpart: "cash withdrawal".into(),
            center_code: Some("ANA".into()),
            bill_id: None,
        },
    )
    .unwrap();

    let statement = CompensationService::statement(&books, ana, period).unwrap();
    assert_eq!(statement.direct_deductions, dec(320));
    assert_eq!(statement.net_pay, dec(7680));
}
