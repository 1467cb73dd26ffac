use std::{
    collections::{BTreeMap, HashMap},
    fs,
    io::ErrorKind,
    path::PathBuf,
    sync::Mutex,
};

use chrono::{DateTime, FixedOffset, NaiveDate};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::MenuError;

const CACHE_KEY: &str = "menu_url";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, MenuError>;
    fn set(&self, key: &str, value: &str) -> Result<(), MenuError>;
}

/// A flat JSON object in a single file. A missing file reads as empty.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> Result<BTreeMap<String, String>, MenuError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => serde_json::from_str(&contents)
                .map_err(|e| MenuError::Store(format!("{}: {e}", self.path.display()))),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(MenuError::Store(format!("{}: {e}", self.path.display()))),
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, MenuError> {
        Ok(self.load()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MenuError> {
        // An unreadable file is replaced rather than blocking every later run.
        let mut entries = self.load().unwrap_or_default();
        entries.insert(key.to_string(), value.to_string());
        let json = serde_json::to_string_pretty(&entries)
            .map_err(|e| MenuError::Store(e.to_string()))?;
        fs::write(&self.path, json).map_err(|e| MenuError::Store(format!("{}: {e}", self.path.display())))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, MenuError> {
        let entries = self.entries.lock().map_err(|e| MenuError::Store(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), MenuError> {
        let mut entries = self.entries.lock().map_err(|e| MenuError::Store(e.to_string()))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// The URL that worked for a given week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedWeekUrl {
    pub week_start: NaiveDate,
    pub url: String,
    pub saved_at: DateTime<FixedOffset>,
}

/// Weekly URL cache on top of an optional store. Every failure is logged and
/// treated as a miss; the cache never stops a run.
pub struct WeekCache<S> {
    store: Option<S>,
}

impl<S: KeyValueStore> WeekCache<S> {
    pub fn new(store: Option<S>) -> Self {
        Self { store }
    }

    pub fn disabled() -> Self {
        Self { store: None }
    }

    /// The cached URL, if one was saved for `week_start`.
    pub fn lookup(&self, week_start: NaiveDate) -> Option<String> {
        let store = self.store.as_ref()?;
        let raw = match store.get(CACHE_KEY) {
            Ok(raw) => raw?,
            Err(e) => {
                warn!("{e}");
                return None;
            }
        };
        let record: CachedWeekUrl = match serde_json::from_str(&raw) {
            Ok(record) => record,
            Err(e) => {
                warn!("ignoring malformed cached url record: {e}");
                return None;
            }
        };

        if record.week_start == week_start {
            Some(record.url)
        } else {
            debug!("cached url is for week of {}, not {}", record.week_start, week_start);
            None
        }
    }

    pub fn remember(&self, week_start: NaiveDate, url: &str, now: DateTime<FixedOffset>) {
        let Some(store) = self.store.as_ref() else {
            return;
        };
        let record = CachedWeekUrl {
            week_start,
            url: url.to_string(),
            saved_at: now,
        };
        let result = serde_json::to_string(&record)
            .map_err(|e| MenuError::Store(e.to_string()))
            .and_then(|json| store.set(CACHE_KEY, &json));
        if let Err(e) = result {
            warn!("{e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn jst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn remembers_url_for_its_week_only() {
        let cache = WeekCache::new(Some(MemoryStore::default()));
        let now = jst().with_ymd_and_hms(2025, 5, 19, 7, 0, 0).unwrap();

        assert_eq!(cache.lookup(ymd(2025, 5, 19)), None);
        cache.remember(ymd(2025, 5, 19), "https://example.org/a.pdf", now);
        assert_eq!(cache.lookup(ymd(2025, 5, 19)).as_deref(), Some("https://example.org/a.pdf"));
        assert_eq!(cache.lookup(ymd(2025, 5, 26)), None);

        cache.remember(ymd(2025, 5, 26), "https://example.org/b.pdf", now);
        assert_eq!(cache.lookup(ymd(2025, 5, 19)), None);
        assert_eq!(cache.lookup(ymd(2025, 5, 26)).as_deref(), Some("https://example.org/b.pdf"));
    }

    #[test]
    fn disabled_cache_is_always_a_miss() {
        let cache: WeekCache<MemoryStore> = WeekCache::disabled();
        let now = jst().with_ymd_and_hms(2025, 5, 19, 7, 0, 0).unwrap();
        cache.remember(ymd(2025, 5, 19), "https://example.org/a.pdf", now);
        assert_eq!(cache.lookup(ymd(2025, 5, 19)), None);
    }

    #[test]
    fn malformed_record_is_a_miss() {
        let store = MemoryStore::default();
        store.set(CACHE_KEY, "{not json").unwrap();
        let cache = WeekCache::new(Some(store));
        assert_eq!(cache.lookup(ymd(2025, 5, 19)), None);
    }

    #[test]
    fn json_file_store_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");

        let store = JsonFileStore::new(path.clone());
        assert_eq!(store.get("menu_url").unwrap(), None);
        store.set("menu_url", "x").unwrap();
        store.set("other", "y").unwrap();

        let reopened = JsonFileStore::new(path.clone());
        assert_eq!(reopened.get("menu_url").unwrap().as_deref(), Some("x"));
        assert_eq!(reopened.get("other").unwrap().as_deref(), Some("y"));
    }

    #[test]
    fn corrupt_file_is_overwritten_on_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("memory.json");
        fs::write(&path, "garbage").unwrap();

        let store = JsonFileStore::new(path.clone());
        assert!(store.get("menu_url").is_err());
        store.set("menu_url", "x").unwrap();
        assert_eq!(store.get("menu_url").unwrap().as_deref(), Some("x"));
    }
}
