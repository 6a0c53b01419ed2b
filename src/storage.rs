// Key-value blob storage backends
//
// The store persists one named blob; these backends only need to load, save
// and remove a string value by key.

use crate::config::{StorageBackend, StorageConfig};
use eyre::{Context, Result, eyre};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Durable key-value blob storage
pub trait Storage: Send {
    /// Load the value stored under `key`, if any
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`
    fn save(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;
}

/// Open the backend described by `config`
pub fn open_storage(config: &StorageConfig) -> Result<Box<dyn Storage>> {
    let storage: Box<dyn Storage> = match config.backend {
        StorageBackend::Memory => Box::new(MemoryStorage::new()),
        StorageBackend::File => Box::new(FileStorage::open(&config.path)?),
        StorageBackend::Sqlite => Box::new(SqliteStorage::open(config.path.join("todostore.db"))?),
    };
    info!(backend = ?config.backend, path = ?config.path, "Opened storage");
    Ok(storage)
}

/// Keys become file names, so they are restricted to a safe alphabet
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(eyre!("Storage key cannot be empty"));
    }
    if key.len() > 64 {
        return Err(eyre!("Storage key too long: {} (max 64 chars)", key));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(eyre!("Invalid storage key: {} (must be alphanumeric with _/-)", key));
    }
    Ok(())
}

// ============================================================================
// In-memory
// ============================================================================

/// Session-only storage; clones share the same map
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Storage for MemoryStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries().get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries().remove(key);
        Ok(())
    }
}

// ============================================================================
// JSON files
// ============================================================================

/// One `<key>.json` file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).context("Failed to create storage directory")?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn lock_file(&self) -> Result<fs::File> {
        let file = fs::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(self.dir.join(".lock"))
            .context("Failed to open storage lock file")?;
        file.lock_exclusive().context("Failed to acquire file lock")?;
        Ok(file)
    }
}

impl Storage for FileStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
        Ok(Some(content))
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let tmp_path = self.dir.join(format!(".{}.json.tmp", key));

        // Lock is released when the guard is dropped
        let _guard = self.lock_file()?;

        let mut tmp = fs::File::create(&tmp_path).context("Failed to create temp file")?;
        tmp.write_all(value.as_bytes())?;
        tmp.sync_all()?;
        fs::rename(&tmp_path, &path).with_context(|| format!("Failed to replace {:?}", path))?;

        debug!(path = ?path, bytes = value.len(), "Saved blob");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        let path = self.path_for(key);
        let _guard = self.lock_file()?;
        if path.exists() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
        }
        Ok(())
    }
}

// ============================================================================
// SQLite
// ============================================================================

/// Key-value table in a SQLite database
pub struct SqliteStorage {
    db: Connection,
}

impl SqliteStorage {
    /// Open or create the database file, creating parent directories as needed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create storage directory")?;
        }
        let db = Connection::open(path).context("Failed to open SQLite database")?;
        let storage = Self { db };
        storage.create_schema()?;
        Ok(storage)
    }

    pub fn open_in_memory() -> Result<Self> {
        let db = Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        let storage = Self { db };
        storage.create_schema()?;
        Ok(storage)
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating kv schema");
        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl Storage for SqliteStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        let value: Option<String> = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute(
            "INSERT OR REPLACE INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![key, value, chrono::Utc::now().timestamp_millis()],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.db.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(storage: &dyn Storage) {
        assert_eq!(storage.load("todo-storage").unwrap(), None);

        storage.save("todo-storage", "{\"a\":1}").unwrap();
        assert_eq!(storage.load("todo-storage").unwrap().as_deref(), Some("{\"a\":1}"));

        storage.save("todo-storage", "{\"a\":2}").unwrap();
        assert_eq!(storage.load("todo-storage").unwrap().as_deref(), Some("{\"a\":2}"));

        storage.remove("todo-storage").unwrap();
        assert_eq!(storage.load("todo-storage").unwrap(), None);

        // Removing twice is fine
        storage.remove("todo-storage").unwrap();
    }

    #[test]
    fn test_memory_storage() {
        exercise(&MemoryStorage::new());
    }

    #[test]
    fn test_memory_storage_clones_share_entries() {
        let a = MemoryStorage::new();
        let b = a.clone();
        a.save("k", "v").unwrap();
        assert_eq!(b.load("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_file_storage() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path().join("data")).unwrap();
        exercise(&storage);
        assert!(storage.dir().exists());
    }

    #[test]
    fn test_file_storage_writes_named_file() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path()).unwrap();
        storage.save("todo-storage", "{}").unwrap();

        let path = temp.path().join("todo-storage.json");
        assert_eq!(fs::read_to_string(path).unwrap(), "{}");
        assert!(!temp.path().join(".todo-storage.json.tmp").exists());
    }

    #[test]
    fn test_file_storage_rejects_bad_key() {
        let temp = TempDir::new().unwrap();
        let storage = FileStorage::open(temp.path()).unwrap();
        assert!(storage.save("../escape", "{}").is_err());
        assert!(storage.load("a/b").is_err());
    }

    #[test]
    fn test_sqlite_storage() {
        let temp = TempDir::new().unwrap();
        let storage = SqliteStorage::open(temp.path().join("nested/todostore.db")).unwrap();
        exercise(&storage);
    }

    #[test]
    fn test_sqlite_storage_persists_across_connections() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("todostore.db");
        SqliteStorage::open(&path).unwrap().save("k", "v").unwrap();
        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.load("k").unwrap().as_deref(), Some("v"));
    }

    #[test]
    fn test_sqlite_in_memory() {
        exercise(&SqliteStorage::open_in_memory().unwrap());
    }

    #[test]
    fn test_validate_key() {
        assert!(validate_key("todo-storage").is_ok());
        assert!(validate_key("todo_storage2").is_ok());
        assert!(validate_key("").is_err());
        assert!(validate_key("bad key").is_err());
        assert!(validate_key(&"a".repeat(65)).is_err());
    }

    #[test]
    fn test_persistent_backends_reject_bad_keys() {
        let temp = TempDir::new().unwrap();
        let backends: Vec<Box<dyn Storage>> = vec![
            Box::new(FileStorage::open(temp.path().join("files")).unwrap()),
            Box::new(SqliteStorage::open(temp.path().join("todostore.db")).unwrap()),
        ];

        for storage in &backends {
            for key in ["", "../escape", "bad key"] {
                assert!(storage.load(key).is_err(), "load accepted {:?}", key);
                assert!(storage.save(key, "x").is_err(), "save accepted {:?}", key);
                assert!(storage.remove(key).is_err(), "remove accepted {:?}", key);
            }
        }
    }

    #[test]
    fn test_open_storage_from_config() {
        let temp = TempDir::new().unwrap();
        for backend in [StorageBackend::Memory, StorageBackend::File, StorageBackend::Sqlite] {
            let config = StorageConfig {
                backend,
                path: temp.path().to_path_buf(),
                key: "todo-storage".to_string(),
            };
            let storage = open_storage(&config).unwrap();
            storage.save("todo-storage", "x").unwrap();
            assert_eq!(storage.load("todo-storage").unwrap().as_deref(), Some("x"));
        }
    }
}
