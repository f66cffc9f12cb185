pub mod json_backend;

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::domain::Books;
use crate::errors::CoreResult;

/// Abstraction over persistence backends capable of storing per-tenant books
/// and their backup snapshots.
pub trait StorageBackend: Send + Sync {
    fn save(&self, books: &Books) -> CoreResult<()>;
    fn load(&self, tenant_id: Uuid) -> CoreResult<Books>;
    fn list_tenants(&self) -> CoreResult<Vec<Uuid>>;
    fn backup(&self, books: &Books, note: Option<&str>) -> CoreResult<PathBuf>;
    fn restore(&self, tenant_id: Uuid, backup_name: &str) -> CoreResult<Books>;

    /// Optional helpers for ad-hoc file operations. Default implementations
    /// forward to the JSON codec when not overridden.
    fn save_to_path(&self, books: &Books, path: &Path) -> CoreResult<()> {
        json_backend::save_books_to_path(books, path)
    }

    fn load_from_path(&self, path: &Path) -> CoreResult<Books> {
        json_backend::load_books_from_path(path)
    }
}

pub use json_backend::{books_warnings, JsonStorage};
