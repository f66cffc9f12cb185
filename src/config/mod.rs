use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::errors::CoreResult;
use crate::utils::ensure_dir;

const DEFAULT_MAX_ENTRIES: usize = 50_000;
const DEFAULT_BACKUP_RETENTION: usize = 5;

/// Runtime configuration for the core engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Upper bound on ledger entries per tenant. Every balance rebuild is
    /// O(n) over the tenant's entries, so the cap bounds rebuild time.
    #[serde(default = "CoreConfig::default_max_entries")]
    pub max_entries_per_tenant: usize,
    /// Backups kept per tenant before the oldest is pruned.
    #[serde(default = "CoreConfig::default_backup_retention")]
    pub backup_retention: usize,
    /// Overrides the resolved data root when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            max_entries_per_tenant: DEFAULT_MAX_ENTRIES,
            backup_retention: DEFAULT_BACKUP_RETENTION,
            data_dir: None,
        }
    }
}

impl CoreConfig {
    fn default_max_entries() -> usize {
        DEFAULT_MAX_ENTRIES
    }

    fn default_backup_retention() -> usize {
        DEFAULT_BACKUP_RETENTION
    }

    /// Loads the configuration at `path`, falling back to defaults when the
    /// file does not exist yet.
    pub fn load(path: &Path) -> CoreResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, path: &Path) -> CoreResult<()> {
        if let Some(parent) = path.parent() {
            ensure_dir(parent)?;
        }
        let data = serde_json::to_string_pretty(self)?;
        fs::write(path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = CoreConfig::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.max_entries_per_tenant, DEFAULT_MAX_ENTRIES);
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = CoreConfig {
            max_entries_per_tenant: 123,
            backup_retention: 2,
            data_dir: None,
        };
        config.save(&path).unwrap();
        let loaded = CoreConfig::load(&path).unwrap();
        assert_eq!(loaded.max_entries_per_tenant, 123);
        assert_eq!(loaded.backup_retention, 2);
    }
}
