use std::sync::Arc;

use backoffice_core::config::CoreConfig;
use backoffice_core::core::collaborators::Hooks;
use backoffice_core::core::manager::BooksManager;
use backoffice_core::core::services::{
    BillService, CenterService, NewBill, NewCenter, PayrollService,
};
use backoffice_core::domain::{
    BillDirection, CenterKind, PartnerProfile, Period, TenantContext,
};
use backoffice_core::storage::{JsonStorage, StorageBackend};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn dec(value: i64) -> Decimal {
    Decimal::from(value)
}

#[test]
fn a_full_month_survives_the_disk_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonStorage::new(Some(dir.path().to_path_buf()), None).unwrap();
    let config = CoreConfig::default();
    let hooks = Hooks::noop();

    let mut books = backoffice_core::domain::Books::new(Uuid::new_v4());
    let tenant_id = books.tenant_id;
    CenterService::create(
        &mut books,
        NewCenter {
            name: "Fleet".into(),
            code: "FLEET".into(),
            kind: CenterKind::Expense,
            parent_code: None,
            partner: None,
        },
    )
    .unwrap();
    CenterService::create(
        &mut books,
        NewCenter {
            name: "Ana Souza".into(),
            code: "ANA".into(),
            kind: CenterKind::Expense,
            parent_code: None,
            partner: Some(PartnerProfile::new("Ana Souza", dec(8000))),
        },
    )
    .unwrap();
    let fuel = BillService::create(
        &mut books,
        NewBill {
            direction: BillDirection::Payable,
            description: "Fuel".into(),
            amount: dec(220),
            due_date: date(2024, 6, 5),
            center_code: Some("FLEET".into()),
            partner_center_id: None,
            card_id: None,
        },
        &hooks,
    )
    .unwrap();
    BillService::mark_paid(&mut books, fuel, Some(date(2024, 6, 6)), &config, &hooks).unwrap();
    PayrollService::generate(&mut books, Period::new(6, 2024).unwrap(), &hooks).unwrap();

    storage.save(&books).unwrap();
    let loaded = storage.load(tenant_id).unwrap();

    assert_eq!(loaded.entries.len(), books.entries.len());
    assert_eq!(loaded.balance(), books.balance());
    assert_eq!(
        loaded.center("FLEET").unwrap().actual_amount,
        books.center("FLEET").unwrap().actual_amount
    );
    assert_eq!(loaded.payroll_history.len(), 1);
    assert_eq!(loaded.payroll_history[0].net_pay, dec(8000));
    assert!(loaded.balance_violations().is_empty());
    assert!(loaded.rollup_violations().is_empty());
}

#[test]
fn manager_serializes_mutations_and_persists_on_success() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(JsonStorage::new(Some(dir.path().to_path_buf()), None).unwrap());
    let manager = BooksManager::new(storage.clone());
    let ctx = TenantContext::new(Uuid::new_v4(), Uuid::new_v4());
    let config = CoreConfig::default();
    let hooks = Hooks::noop();

    manager
        .mutate(ctx, |books| {
            CenterService::create(
                books,
                NewCenter {
                    name: "Fleet".into(),
                    code: "FLEET".into(),
                    kind: CenterKind::Expense,
                    parent_code: None,
                    partner: None,
                },
            )?;
            let bill = BillService::create(
                books,
                NewBill {
                    direction: BillDirection::Payable,
                    description: "Fuel".into(),
                    amount: dec(220),
                    due_date: date(2024, 6, 5),
                    center_code: Some("FLEET".into()),
                    partner_center_id: None,
                    card_id: None,
                },
                &hooks,
            )?;
            BillService::mark_paid(books, bill, Some(date(2024, 6, 6)), &config, &hooks)?;
            Ok(())
        })
        .unwrap();

    // A fresh manager over the same storage sees the committed state.
    let reopened = BooksManager::new(storage);
    let (entries, actual) = reopened
        .read(ctx, |books| {
            (
                books.entries.len(),
                books.center("FLEET").map(|c| c.actual_amount),
            )
        })
        .unwrap();
    assert_eq!(entries, 1);
    assert_eq!(actual, Some(dec(220)));
}

#[test]
fn backups_restore_an_earlier_state() {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonStorage::new(Some(dir.path().to_path_buf()), None).unwrap();
    let mut books = backoffice_core::domain::Books::new(Uuid::new_v4());
    CenterService::create(
        &mut books,
        NewCenter {
            name: "Fleet".into(),
            code: "FLEET".into(),
            kind: CenterKind::Expense,
            parent_code: None,
            partner: None,
        },
    )
    .unwrap();
    storage.save(&books).unwrap();
    let backup_path = storage.backup(&books, Some("before cleanup")).unwrap();

    books.centers.clear();
    storage.save(&books).unwrap();
    assert!(storage.load(books.tenant_id).unwrap().centers.is_empty());

    let backup_name = backup_path.file_name().unwrap().to_str().unwrap();
    let restored = storage.restore(books.tenant_id, backup_name).unwrap();
    assert_eq!(restored.centers.len(), 1);
    assert_eq!(storage.load(books.tenant_id).unwrap().centers.len(), 1);
}

#[test]
fn tenants_are_listed_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let storage = JsonStorage::new(Some(dir.path().to_path_buf()), None).unwrap();
    let a = backoffice_core::domain::Books::new(Uuid::new_v4());
    let b = backoffice_core::domain::Books::new(Uuid::new_v4());
    storage.save(&a).unwrap();
    storage.save(&b).unwrap();
    let mut expected = vec![a.tenant_id, b.tenant_id];
    expected.sort();
    assert_eq!(storage.list_tenants().unwrap(), expected);
}
