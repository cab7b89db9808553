use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::collaborators::{SettingsStore, StateStore};
use crate::error::{ExtensionError, ExtensionResult};
use crate::settings::UserSettings;
use crate::state::{ExtensionState, STATE_STORAGE_KEY};

const SETTINGS_KEY: &str = "settings";
const SYNC_KEY: &str = "sync";

/// Schema version written into every record
const RECORD_VERSION: u8 = 1;

fn default_record_version() -> u8 {
    RECORD_VERSION
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord<T> {
    #[serde(default = "default_record_version")]
    version: u8,
    value: T,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SyncFlag {
    sync_settings: bool,
}

/// One pretty-printed JSON file per storage key inside a data directory
pub struct JsonFileStore {
    dir: PathBuf,
    write_lock: tokio::sync::Mutex<()>,
}

impl JsonFileStore {
    /// Create a store rooted at `dir`, creating the directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> ExtensionResult<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ExtensionError::Storage(format!("Failed to create data dir: {}", e)))?;
        Ok(Self {
            dir,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Load a record from disk; a missing file yields the default value
    async fn load_record<T: DeserializeOwned + Default>(&self, key: &str) -> ExtensionResult<T> {
        let path = self.path(key);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No '{}' record yet, using defaults", key);
                return Ok(T::default());
            }
            Err(e) => {
                return Err(ExtensionError::Storage(format!(
                    "Failed to read {} file: {}",
                    key, e
                )))
            }
        };

        let record: StoredRecord<T> = serde_json::from_str(&content).map_err(|e| {
            ExtensionError::Storage(format!("Failed to parse {} file: {}", key, e))
        })?;
        if record.version != RECORD_VERSION {
            log::warn!(
                "'{}' record has version {}, expected {}",
                key,
                record.version,
                RECORD_VERSION
            );
        }
        Ok(record.value)
    }

    /// Save a record to disk
    async fn save_record<T: Serialize>(&self, key: &str, value: &T) -> ExtensionResult<()> {
        let record = StoredRecord {
            version: RECORD_VERSION,
            value,
        };
        let content = serde_json::to_string_pretty(&record).map_err(|e| {
            ExtensionError::Storage(format!("Failed to serialize {}: {}", key, e))
        })?;

        let _guard = self.write_lock.lock().await;
        tokio::fs::write(self.path(key), content)
            .await
            .map_err(|e| ExtensionError::Storage(format!("Failed to write {} file: {}", key, e)))
    }

    pub async fn load_sync_flag(&self) -> ExtensionResult<Option<bool>> {
        if !self.path(SYNC_KEY).exists() {
            return Ok(None);
        }
        let flag: SyncFlag = self.load_record(SYNC_KEY).await?;
        Ok(Some(flag.sync_settings))
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn load(&self) -> ExtensionResult<UserSettings> {
        self.load_record(SETTINGS_KEY).await
    }

    async fn save(&self, settings: &UserSettings) -> ExtensionResult<()> {
        self.save_record(SETTINGS_KEY, settings).await
    }

    async fn save_sync_flag(&self, sync: bool) -> ExtensionResult<()> {
        self.save_record(SYNC_KEY, &SyncFlag { sync_settings: sync })
            .await
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> ExtensionResult<ExtensionState> {
        self.load_record(STATE_STORAGE_KEY).await
    }

    async fn save(&self, state: &ExtensionState) -> ExtensionResult<()> {
        self.save_record(STATE_STORAGE_KEY, state).await
    }
}
