//! In-process store implementation.
//!
//! Backs tests and single-node deployments. Expiry is lazy: a key whose
//! deadline has passed is dropped the next time anything touches it.

use super::{KeyValueStore, StoreError, StoreResult};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// In-memory key-value store with TTL support
#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
}

struct Entry {
    value: Value,
    expires_at: Option<Instant>,
}

impl Entry {
    fn new(value: Value) -> Self {
        Self {
            value,
            expires_at: None,
        }
    }

    fn expired(&self) -> bool {
        self.expires_at
            .is_some_and(|deadline| deadline <= Instant::now())
    }
}

enum Value {
    Hash(HashMap<String, String>),
    List(Vec<String>),
    Set(HashSet<String>),
    Text(String),
}

impl Value {
    fn type_name(&self) -> &'static str {
        match self {
            Value::Hash(_) => "hash",
            Value::List(_) => "list",
            Value::Set(_) => "set",
            Value::Text(_) => "text",
        }
    }
}

fn wrong_type(key: &str, expected: &str, value: &Value) -> StoreError {
    StoreError::Backend(format!(
        "key {key} holds a {} value, expected {expected}",
        value.type_name()
    ))
}

/// Lazy TTL enforcement: drop the entry when its deadline has passed.
fn purge_expired(entries: &mut HashMap<String, Entry>, key: &str) {
    if entries.get(key).is_some_and(Entry::expired) {
        entries.remove(key);
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn guard(&self) -> StoreResult<MutexGuard<'_, HashMap<String, Entry>>> {
        self.entries
            .lock()
            .map_err(|_| StoreError::Backend("store mutex poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn hash_get_all(&self, key: &str) -> StoreResult<HashMap<String, String>> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        match entries.get(key) {
            None => Ok(HashMap::new()),
            Some(entry) => match &entry.value {
                Value::Hash(fields) => Ok(fields.clone()),
                other => Err(wrong_type(key, "hash", other)),
            },
        }
    }

    async fn hash_set(&self, key: &str, fields: Vec<(String, String)>) -> StoreResult<()> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Hash(HashMap::new())));
        match &mut entry.value {
            Value::Hash(existing) => {
                existing.extend(fields);
                Ok(())
            }
            other => Err(wrong_type(key, "hash", other)),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> StoreResult<Option<String>> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        match entries.get(key) {
            None => Ok(None),
            Some(entry) => match &entry.value {
                Value::Hash(fields) => Ok(fields.get(field).cloned()),
                other => Err(wrong_type(key, "hash", other)),
            },
        }
    }

    async fn hash_remove(&self, key: &str, fields: &[&str]) -> StoreResult<()> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        match entries.get_mut(key) {
            None => Ok(()),
            Some(entry) => match &mut entry.value {
                Value::Hash(existing) => {
                    for field in fields {
                        existing.remove(*field);
                    }
                    Ok(())
                }
                other => Err(wrong_type(key, "hash", other)),
            },
        }
    }

    async fn hash_increment(&self, key: &str, field: &str, delta: i64) -> StoreResult<i64> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Hash(HashMap::new())));
        match &mut entry.value {
            Value::Hash(existing) => {
                let current: i64 = match existing.get(field) {
                    None => 0,
                    Some(raw) => raw.parse().map_err(|_| {
                        StoreError::Backend(format!("field {field} of {key} is not an integer"))
                    })?,
                };
                let next = current + delta;
                existing.insert(field.to_string(), next.to_string());
                Ok(next)
            }
            other => Err(wrong_type(key, "hash", other)),
        }
    }

    async fn list_push(&self, key: &str, value: String) -> StoreResult<usize> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::List(Vec::new())));
        match &mut entry.value {
            Value::List(items) => {
                items.push(value);
                Ok(items.len())
            }
            other => Err(wrong_type(key, "list", other)),
        }
    }

    async fn list_range(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(entry) => match &entry.value {
                Value::List(items) => Ok(items.clone()),
                other => Err(wrong_type(key, "list", other)),
            },
        }
    }

    async fn set_add(&self, key: &str, member: String) -> StoreResult<()> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        let entry = entries
            .entry(key.to_string())
            .or_insert_with(|| Entry::new(Value::Set(HashSet::new())));
        match &mut entry.value {
            Value::Set(members) => {
                members.insert(member);
                Ok(())
            }
            other => Err(wrong_type(key, "set", other)),
        }
    }

    async fn set_remove(&self, key: &str, member: &str) -> StoreResult<()> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        match entries.get_mut(key) {
            None => Ok(()),
            Some(entry) => match &mut entry.value {
                Value::Set(members) => {
                    members.remove(member);
                    Ok(())
                }
                other => Err(wrong_type(key, "set", other)),
            },
        }
    }

    async fn set_members(&self, key: &str) -> StoreResult<Vec<String>> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        match entries.get(key) {
            None => Ok(Vec::new()),
            Some(entry) => match &entry.value {
                Value::Set(members) => Ok(members.iter().cloned().collect()),
                other => Err(wrong_type(key, "set", other)),
            },
        }
    }

    async fn put_if_absent(&self, key: &str, value: String, ttl: Duration) -> StoreResult<bool> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        if entries.contains_key(key) {
            return Ok(false);
        }
        entries.insert(
            key.to_string(),
            Entry {
                value: Value::Text(value),
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(true)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> StoreResult<()> {
        let mut entries = self.guard()?;
        purge_expired(&mut entries, key);
        if let Some(entry) = entries.get_mut(key) {
            entry.expires_at = Some(Instant::now() + ttl);
        }
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let mut entries = self.guard()?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hash_roundtrip() {
        let store = MemoryStore::new();
        store
            .hash_set(
                "lobby:1",
                vec![
                    ("status".to_string(), "forming".to_string()),
                    ("pot".to_string(), "0".to_string()),
                ],
            )
            .await
            .unwrap();

        let fields = store.hash_get_all("lobby:1").await.unwrap();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields.get("status").map(String::as_str), Some("forming"));

        store.hash_remove("lobby:1", &["pot"]).await.unwrap();
        assert_eq!(store.hash_get("lobby:1", "pot").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_hash_increment_from_absent_field() {
        let store = MemoryStore::new();
        assert_eq!(
            store.hash_increment("lobby:1", "pot", 3500).await.unwrap(),
            3500
        );
        assert_eq!(
            store.hash_increment("lobby:1", "pot", -1000).await.unwrap(),
            2500
        );
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let store = MemoryStore::new();
        for n in [7, 12, 3] {
            store.list_push("calls", n.to_string()).await.unwrap();
        }
        let items = store.list_range("calls").await.unwrap();
        assert_eq!(items, vec!["7", "12", "3"]);
    }

    #[tokio::test]
    async fn test_set_membership() {
        let store = MemoryStore::new();
        store.set_add("ids", "a".to_string()).await.unwrap();
        store.set_add("ids", "a".to_string()).await.unwrap();
        store.set_add("ids", "b".to_string()).await.unwrap();

        let mut members = store.set_members("ids").await.unwrap();
        members.sort();
        assert_eq!(members, vec!["a", "b"]);

        store.set_remove("ids", "a").await.unwrap();
        assert_eq!(store.set_members("ids").await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_wrong_type_is_rejected() {
        let store = MemoryStore::new();
        store.list_push("calls", "1".to_string()).await.unwrap();
        let err = store.hash_get_all("calls").await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_put_if_absent_holds_until_expiry() {
        let store = MemoryStore::new();
        let ttl = Duration::from_secs(30);

        assert!(
            store
                .put_if_absent("lease", "held".to_string(), ttl)
                .await
                .unwrap()
        );
        assert!(
            !store
                .put_if_absent("lease", "held".to_string(), ttl)
                .await
                .unwrap()
        );

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(
            store
                .put_if_absent("lease", "held".to_string(), ttl)
                .await
                .unwrap()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_expire_drops_key_lazily() {
        let store = MemoryStore::new();
        store
            .hash_set(
                "lobby:1",
                vec![("status".to_string(), "forming".to_string())],
            )
            .await
            .unwrap();
        store
            .expire("lobby:1", Duration::from_secs(600))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(599)).await;
        assert!(!store.hash_get_all("lobby:1").await.unwrap().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.hash_get_all("lobby:1").await.unwrap().is_empty());
    }
}
