use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    domain::Books,
    errors::{CoreError, CoreResult},
    utils::{backup_dir_in, books_dir_in, ensure_dir, resolve_base},
};

use super::StorageBackend;

const BACKUP_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";
const TMP_SUFFIX: &str = "tmp";
const DEFAULT_RETENTION: usize = 5;

/// JSON persistence: one document per tenant plus timestamped backups with
/// bounded retention.
#[derive(Clone)]
pub struct JsonStorage {
    root: PathBuf,
    books_dir: PathBuf,
    backups_dir: PathBuf,
    retention: usize,
}

impl JsonStorage {
    pub fn new(root: Option<PathBuf>, retention: Option<usize>) -> CoreResult<Self> {
        let root = resolve_base(root);
        ensure_dir(&root)?;
        let books_dir = books_dir_in(&root);
        let backups_dir = backup_dir_in(&root);
        ensure_dir(&books_dir)?;
        ensure_dir(&backups_dir)?;
        Ok(Self {
            root,
            books_dir,
            backups_dir,
            retention: retention.unwrap_or(DEFAULT_RETENTION).max(1),
        })
    }

    pub fn new_default() -> CoreResult<Self> {
        Self::new(None, None)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn books_path(&self, tenant_id: Uuid) -> PathBuf {
        self.books_dir.join(format!("{tenant_id}.json"))
    }

    fn tenant_backup_dir(&self, tenant_id: Uuid) -> PathBuf {
        self.backups_dir.join(tenant_id.to_string())
    }

    fn prune_backups(&self, dir: &Path) -> CoreResult<()> {
        let mut backups: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.extension().and_then(|e| e.to_str()) == Some("json"))
            .collect();
        backups.sort();
        while backups.len() > self.retention {
            let oldest = backups.remove(0);
            if let Err(err) = fs::remove_file(&oldest) {
                tracing::warn!(path = %oldest.display(), %err, "failed to prune backup");
            }
        }
        Ok(())
    }
}

impl StorageBackend for JsonStorage {
    fn save(&self, books: &Books) -> CoreResult<()> {
        save_books_to_path(books, &self.books_path(books.tenant_id))
    }

    fn load(&self, tenant_id: Uuid) -> CoreResult<Books> {
        let path = self.books_path(tenant_id);
        if !path.exists() {
            return Err(CoreError::not_found(format!("books for tenant {tenant_id}")));
        }
        let books = load_books_from_path(&path)?;
        for warning in books_warnings(&books) {
            tracing::warn!(%tenant_id, %warning, "books loaded with inconsistency");
        }
        Ok(books)
    }

    fn list_tenants(&self) -> CoreResult<Vec<Uuid>> {
        let mut tenants = Vec::new();
        for entry in fs::read_dir(&self.books_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                if let Ok(tenant_id) = stem.parse::<Uuid>() {
                    tenants.push(tenant_id);
                }
            }
        }
        tenants.sort();
        Ok(tenants)
    }

    fn backup(&self, books: &Books, note: Option<&str>) -> CoreResult<PathBuf> {
        let dir = self.tenant_backup_dir(books.tenant_id);
        ensure_dir(&dir)?;
        let stamp = Utc::now().format(BACKUP_TIMESTAMP_FORMAT);
        let file_name = match sanitize_backup_note(note) {
            Some(note) => format!("{stamp}_{note}.json"),
            None => format!("{stamp}.json"),
        };
        let path = dir.join(file_name);
        save_books_to_path(books, &path)?;
        self.prune_backups(&dir)?;
        Ok(path)
    }

    fn restore(&self, tenant_id: Uuid, backup_name: &str) -> CoreResult<Books> {
        let path = self.tenant_backup_dir(tenant_id).join(backup_name);
        if !path.exists() {
            return Err(CoreError::not_found(format!("backup `{backup_name}`")));
        }
        let books = load_books_from_path(&path)?;
        self.save(&books)?;
        Ok(books)
    }
}

pub fn save_books_to_path(books: &Books, path: &Path) -> CoreResult<()> {
    let data = serde_json::to_string_pretty(books)?;
    write_atomic(path, &data)
}

pub fn load_books_from_path(path: &Path) -> CoreResult<Books> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn sanitize_backup_note(note: Option<&str>) -> Option<String> {
    let raw = note?.trim();
    if raw.is_empty() {
        return None;
    }
    let mut sanitized = String::new();
    let mut last_dash = false;
    for ch in raw.chars() {
        if ch.is_ascii_alphanumeric() {
            sanitized.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if (ch.is_whitespace() || matches!(ch, '-' | '.' | '_')) && !sanitized.is_empty() {
            if !last_dash {
                sanitized.push('-');
                last_dash = true;
            }
        }
    }
    let trimmed = sanitized.trim_matches('-').to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{existing}.{TMP_SUFFIX}"),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> CoreResult<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    let tmp = tmp_path(path);
    {
        let mut file = File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Referential and invariant checks run at load time. Inconsistencies warn
/// and degrade; they never fail the read.
pub fn books_warnings(books: &Books) -> Vec<String> {
    let mut warnings = Vec::new();

    for entry in &books.entries {
        if let Some(code) = &entry.center_code {
            if books.center(code).is_none() {
                warnings.push(format!(
                    "entry {} references unknown center code {}",
                    entry.id, code
                ));
            }
        }
        if let Some(bill_id) = entry.bill_id {
            if books.bill(bill_id).is_none() {
                warnings.push(format!("entry {} references missing bill {}", entry.id, bill_id));
            }
        }
    }
    for bill in &books.bills {
        if let Some(code) = &bill.center_code {
            if books.center(code).is_none() {
                warnings.push(format!(
                    "bill {} references unknown center code {}",
                    bill.id, code
                ));
            }
        }
        if let Some(parent_id) = bill.parent_id {
            if books.bill(parent_id).is_none() {
                warnings.push(format!("bill {} references missing parent {}", bill.id, parent_id));
            }
        }
        if let Some(partner_id) = bill.partner_center_id {
            if books.center_by_id(partner_id).is_none() {
                warnings.push(format!(
                    "bill {} references missing partner center {}",
                    bill.id, partner_id
                ));
            }
        }
    }
    for deduction in &books.deductions {
        if books.center_by_id(deduction.partner_center_id).is_none() {
            warnings.push(format!(
                "deduction {} references missing partner center {}",
                deduction.id, deduction.partner_center_id
            ));
        }
    }
    for snapshot in &books.payroll_history {
        if books.bill(snapshot.bill_id).is_none() {
            warnings.push(format!(
                "payroll snapshot {} references missing bill {}",
                snapshot.id, snapshot.bill_id
            ));
        }
    }

    warnings.extend(books.balance_violations());
    warnings.extend(books.rollup_violations());
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{CenterKind, CostCenter};

    fn storage_with_temp_dir() -> (JsonStorage, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonStorage::new(Some(dir.path().to_path_buf()), Some(2)).unwrap();
        (storage, dir)
    }

    fn sample_books() -> Books {
        let mut books = Books::new(Uuid::new_v4());
        books.add_center(CostCenter::new("Fleet", "FLEET", CenterKind::Expense));
        books
    }

    #[test]
    fn save_and_load_roundtrip() {
        let (storage, _dir) = storage_with_temp_dir();
        let books = sample_books();
        storage.save(&books).expect("save books");
        let loaded = storage.load(books.tenant_id).expect("load books");
        assert_eq!(loaded.tenant_id, books.tenant_id);
        assert_eq!(loaded.centers.len(), 1);
    }

    #[test]
    fn load_of_unknown_tenant_is_not_found() {
        let (storage, _dir) = storage_with_temp_dir();
        let err = storage.load(Uuid::new_v4()).expect_err("missing tenant");
        assert!(matches!(err, CoreError::NotFound(_)), "got {err:?}");
    }

    #[test]
    fn backups_are_pruned_to_retention() {
        let (storage, _dir) = storage_with_temp_dir();
        let books = sample_books();
        storage.backup(&books, Some("first")).unwrap();
        storage.backup(&books, Some("second")).unwrap();
        storage.backup(&books, Some("third")).unwrap();
        let dir = storage.tenant_backup_dir(books.tenant_id);
        let count = fs::read_dir(dir).unwrap().count();
        assert!(count <= 2, "retention of 2 exceeded: {count}");
    }

    #[test]
    fn warnings_flag_dangling_references() {
        let mut books = sample_books();
        let mut entry = crate::domain::LedgerEntry::new(
            chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            crate::domain::EntryDirection::Out,
            rust_decimal::Decimal::from(10),
            "ghost",
            0,
        );
        entry.center_code = Some("GHOST".into());
        entry.balance = entry.signed_amount();
        books.entries.push(entry);
        let warnings = books_warnings(&books);
        assert!(
            warnings.iter().any(|w| w.contains("GHOST")),
            "expected dangling-code warning, got {warnings:?}"
        );
    }
}
