use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, RwLock};

use uuid::Uuid;

use crate::domain::{Books, TenantContext};
use crate::errors::{CoreError, CoreResult};
use crate::storage::StorageBackend;

/// Facade coordinating per-tenant books, locking, and persistence.
///
/// Every mutating operation for a tenant runs under that tenant's write lock:
/// propagation and balance rebuilds are multi-step and must not interleave.
/// Reads share the lock and observe the last committed state. A failed
/// mutation never leaves partial propagation behind; the committed snapshot
/// is restored wholesale.
pub struct BooksManager {
    storage: Arc<dyn StorageBackend>,
    open: Mutex<HashMap<Uuid, Arc<RwLock<Books>>>>,
}

impl BooksManager {
    pub fn new(storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            storage,
            open: Mutex::new(HashMap::new()),
        }
    }

    fn handle(&self, tenant_id: Uuid) -> CoreResult<Arc<RwLock<Books>>> {
        let mut open = self
            .open
            .lock()
            .map_err(|_| CoreError::invalid_op("tenant registry lock poisoned"))?;
        if let Some(handle) = open.get(&tenant_id) {
            return Ok(handle.clone());
        }
        let books = match self.storage.load(tenant_id) {
            Ok(books) => books,
            Err(CoreError::NotFound(_)) => {
                let books = Books::new(tenant_id);
                self.storage.save(&books)?;
                tracing::info!(%tenant_id, "created empty books for tenant");
                books
            }
            Err(err) => return Err(err),
        };
        let handle = Arc::new(RwLock::new(books));
        open.insert(tenant_id, handle.clone());
        Ok(handle)
    }

    /// Runs `f` against the tenant's committed books under a shared lock.
    pub fn read<T>(&self, ctx: TenantContext, f: impl FnOnce(&Books) -> T) -> CoreResult<T> {
        let handle = self.handle(ctx.tenant_id)?;
        let books = handle
            .read()
            .map_err(|_| CoreError::invalid_op("tenant books lock poisoned"))?;
        Ok(f(&books))
    }

    /// Runs `f` under the tenant's exclusive lock. On success the books are
    /// persisted; on failure the committed snapshot is restored so no
    /// half-applied propagation survives.
    pub fn mutate<T>(
        &self,
        ctx: TenantContext,
        f: impl FnOnce(&mut Books) -> CoreResult<T>,
    ) -> CoreResult<T> {
        let handle = self.handle(ctx.tenant_id)?;
        let mut books = handle
            .write()
            .map_err(|_| CoreError::invalid_op("tenant books lock poisoned"))?;
        match f(&mut books) {
            Ok(value) => {
                self.storage.save(&books)?;
                Ok(value)
            }
            Err(err) => {
                match self.storage.load(books.tenant_id) {
                    Ok(committed) => *books = committed,
                    Err(load_err) => {
                        tracing::error!(%load_err, "failed to restore committed snapshot");
                    }
                }
                Err(err)
            }
        }
    }

    /// Snapshot the tenant's committed books into the backup area.
    pub fn backup(&self, ctx: TenantContext, note: Option<&str>) -> CoreResult<PathBuf> {
        let handle = self.handle(ctx.tenant_id)?;
        let books = handle
            .read()
            .map_err(|_| CoreError::invalid_op("tenant books lock poisoned"))?;
        self.storage.backup(&books, note)
    }
}
