use super::kv_store::KeyValueStore;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

// Reads fall back to the default, writes are best-effort.
pub struct PersistentStore<S: KeyValueStore> {
    store: S,
}

impl<S: KeyValueStore> PersistentStore<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[cfg(test)]
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        let raw = match self.store.get(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return default,
            Err(e) => {
                warn!("{}; using default", e);
                return default;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                warn!("Discarding unreadable value for '{}': {}", key, e);
                default
            }
        }
    }

    pub fn save<T: Serialize>(&self, key: &str, value: &T) {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize '{}': {}", key, e);
                return;
            }
        };
        if let Err(e) = self.store.set(key, &raw) {
            warn!("{}; keeping in-memory state only", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::kv_store::MemoryStore;

    #[test]
    fn test_load_missing_key_returns_default() {
        let store = PersistentStore::new(MemoryStore::default());
        let value: Vec<String> = store.load("expenses_v1", vec!["x".to_string()]);
        assert_eq!(value, vec!["x".to_string()]);
    }

    #[test]
    fn test_load_malformed_text_returns_default() {
        let store = PersistentStore::new(MemoryStore::with_entry("expenses_v1", "{not json"));
        let value: Vec<u32> = store.load("expenses_v1", Vec::new());
        assert!(value.is_empty());
    }

    #[test]
    fn test_load_wrong_shape_returns_default() {
        let store = PersistentStore::new(MemoryStore::with_entry("expenses_v1", r#"{"a":1}"#));
        let value: Vec<u32> = store.load("expenses_v1", Vec::new());
        assert!(value.is_empty());
    }

    #[test]
    fn test_load_unavailable_store_returns_default() {
        let memory = MemoryStore::with_entry("expenses_v1", "[1,2]");
        memory.set_unavailable(true);
        let store = PersistentStore::new(memory);

        let value: Vec<u32> = store.load("expenses_v1", vec![9]);
        assert_eq!(value, vec![9]);
    }

    #[test]
    fn test_save_then_load() {
        let store = PersistentStore::new(MemoryStore::default());
        store.save("expenses_v1", &vec![1u32, 2, 3]);

        assert_eq!(store.store().raw("expenses_v1").as_deref(), Some("[1,2,3]"));
        let value: Vec<u32> = store.load("expenses_v1", Vec::new());
        assert_eq!(value, vec![1, 2, 3]);
    }

    #[test]
    fn test_save_swallows_write_failure() {
        let memory = MemoryStore::default();
        memory.set_reject_writes(true);
        let store = PersistentStore::new(memory);

        store.save("expenses_v1", &vec![1u32]);
        assert_eq!(store.store().raw("expenses_v1"), None);
    }
}
