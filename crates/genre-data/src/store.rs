use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::builtin::builtin_record;
use crate::record::GenreRecord;
use crate::GenreStoreError;

/// Read-through genre store with a process-lifetime cache.
///
/// Lookup order: cache, JSON file under the data directory, built-in
/// table, synthesized default. Reads never fail on missing data — an
/// unknown genre degrades to a generic record. Writing a synthesized
/// record back to disk is a separate explicit step (`persist`) so the
/// read path stays side-effect free; `get_or_create` composes the two.
///
/// Thread-safe via Mutex — lookups are rare and records are small.
pub struct GenreStore {
    dir: PathBuf,
    cache: Mutex<HashMap<String, Arc<GenreRecord>>>,
}

impl GenreStore {
    pub fn open(dir: impl Into<PathBuf>) -> GenreStore {
        GenreStore {
            dir: dir.into(),
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", name))
    }

    /// Fetch a genre record, falling back through files, built-ins, and
    /// a synthesized default. Never fails on an unknown name.
    pub fn get(&self, name: &str) -> Result<Arc<GenreRecord>, GenreStoreError> {
        let key = name.to_ascii_lowercase();

        if let Some(record) = self.cached(&key) {
            debug!(genre = %key, "genre cache hit");
            return Ok(record);
        }

        let record = match self.load_from_file(&self.record_path(&key)) {
            Ok(Some(record)) => record,
            Ok(None) => match builtin_record(&key) {
                Some(record) => record,
                None => {
                    warn!(genre = %key, "no genre data found, synthesizing default");
                    GenreRecord::default_for(&key)
                }
            },
            Err(e) => {
                // A corrupt file is a degraded condition, not a failure
                warn!(genre = %key, error = %e, "unreadable genre file, using fallback");
                builtin_record(&key).unwrap_or_else(|| GenreRecord::default_for(&key))
            }
        };

        let record = Arc::new(record);
        self.cache
            .lock()
            .expect("genre cache mutex poisoned")
            .insert(key, record.clone());
        Ok(record)
    }

    /// Fetch a record and persist it if it had to be synthesized or came
    /// from the built-in table rather than the data directory.
    pub fn get_or_create(&self, name: &str) -> Result<Arc<GenreRecord>, GenreStoreError> {
        let key = name.to_ascii_lowercase();
        let had_file = self.record_path(&key).is_file();
        let record = self.get(&key)?;
        if !had_file {
            self.persist(&record)?;
            info!(genre = %key, "genre record written back");
        }
        Ok(record)
    }

    /// Write a record to the data directory as JSON.
    pub fn persist(&self, record: &GenreRecord) -> Result<(), GenreStoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let json = serde_json::to_string_pretty(record)?;
        std::fs::write(self.record_path(&record.name), json)?;
        Ok(())
    }

    fn cached(&self, key: &str) -> Option<Arc<GenreRecord>> {
        self.cache
            .lock()
            .expect("genre cache mutex poisoned")
            .get(key)
            .cloned()
    }

    fn load_from_file(&self, path: &Path) -> Result<Option<GenreRecord>, GenreStoreError> {
        if !path.is_file() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(path)?;
        let record = serde_json::from_str(&json)?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn builtin_genre_loads_without_files() {
        let dir = TempDir::new().unwrap();
        let store = GenreStore::open(dir.path());
        let jazz = store.get("jazz").unwrap();
        assert_eq!(jazz.name, "jazz");
        assert!(jazz.progressions.contains_key("turnaround"));
    }

    #[test]
    fn unknown_genre_synthesizes_default() {
        let dir = TempDir::new().unwrap();
        let store = GenreStore::open(dir.path());
        let record = store.get("zydeco-revival").unwrap();
        assert_eq!(record.name, "zydeco-revival");
        assert!(record.progressions.contains_key("standard"));
        assert!(!record.scales.is_empty());
        assert!(!record.instrumentation.essential.is_empty());
    }

    #[test]
    fn get_does_not_write_files() {
        let dir = TempDir::new().unwrap();
        let store = GenreStore::open(dir.path());
        store.get("polka").unwrap();
        assert!(!dir.path().join("polka.json").exists());
    }

    #[test]
    fn get_or_create_writes_back() {
        let dir = TempDir::new().unwrap();
        let store = GenreStore::open(dir.path());
        store.get_or_create("polka").unwrap();
        assert!(dir.path().join("polka.json").exists());

        // Round-trips through a fresh store
        let fresh = GenreStore::open(dir.path());
        let record = fresh.get("polka").unwrap();
        assert_eq!(record.name, "polka");
    }

    #[test]
    fn cache_returns_same_record() {
        let dir = TempDir::new().unwrap();
        let store = GenreStore::open(dir.path());
        let first = store.get("rock").unwrap();
        let second = store.get("rock").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn file_overrides_builtin() {
        let dir = TempDir::new().unwrap();
        let store = GenreStore::open(dir.path());

        let mut custom = GenreRecord::default_for("jazz");
        custom.tempo_range = [200, 300];
        store.persist(&custom).unwrap();

        let fresh = GenreStore::open(dir.path());
        let loaded = fresh.get("jazz").unwrap();
        assert_eq!(loaded.tempo_range, [200, 300]);
    }

    #[test]
    fn corrupt_file_degrades_to_builtin() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("jazz.json"), "{not json").unwrap();
        let store = GenreStore::open(dir.path());
        let jazz = store.get("jazz").unwrap();
        assert_eq!(jazz.name, "jazz");
        assert!(jazz.progressions.contains_key("standard"));
    }

    #[test]
    fn lookup_case_insensitive() {
        let dir = TempDir::new().unwrap();
        let store = GenreStore::open(dir.path());
        let a = store.get("Jazz").unwrap();
        let b = store.get("jazz").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
