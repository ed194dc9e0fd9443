//! Key-value store for computed mappings.

use crate::Result;

use indexmap::IndexMap;
use std::{
    fmt::Debug,
    sync::Mutex,
    time::{Duration, Instant},
};

/// A string-keyed cache.
///
/// `ttl` is in seconds; `None` keeps the entry until it is deleted. A zero
/// or negative TTL deletes the entry instead of storing it.
pub trait Cache: Debug + Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: String, ttl: Option<i64>) -> Result<()>;

    fn delete(&self, key: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;

    fn has(&self, key: &str) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    fn get_multiple(&self, keys: &[&str]) -> Result<IndexMap<String, Option<String>>> {
        keys.iter()
            .map(|key| Ok((key.to_string(), self.get(key)?)))
            .collect()
    }

    fn set_multiple(&self, values: IndexMap<String, String>, ttl: Option<i64>) -> Result<()> {
        for (key, value) in values {
            self.set(&key, value, ttl)?;
        }
        Ok(())
    }

    fn delete_multiple(&self, keys: &[&str]) -> Result<()> {
        for key in keys {
            self.delete(key)?;
        }
        Ok(())
    }
}

/// A [`Cache`] held in process memory.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<IndexMap<String, Entry>>,
}

#[derive(Debug)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl MemoryCache {
    pub fn new() -> MemoryCache {
        MemoryCache::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, IndexMap<String, Entry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Cache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries();

        match entries.get(key) {
            Some(entry) if entry.expires_at.is_some_and(|at| at <= Instant::now()) => {
                entries.shift_remove(key);
                Ok(None)
            }
            Some(entry) => Ok(Some(entry.value.clone())),
            None => Ok(None),
        }
    }

    fn set(&self, key: &str, value: String, ttl: Option<i64>) -> Result<()> {
        let expires_at = match ttl {
            Some(ttl) if ttl <= 0 => return self.delete(key),
            Some(ttl) => Some(Instant::now() + Duration::from_secs(ttl as u64)),
            None => None,
        };

        self.entries()
            .insert(key.to_string(), Entry { value, expires_at });
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries().shift_remove(key);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries().clear();
        Ok(())
    }
}
