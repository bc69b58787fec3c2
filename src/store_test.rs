use super::*;

fn temp_path() -> PathBuf {
    std::env::temp_dir().join(format!("authsession-store-{}.json", uuid::Uuid::new_v4()))
}

/// Store whose removals always fail; listing still works.
struct StuckStore {
    inner: MemoryStore,
}

impl KeyValueStore for StuckStore {
    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.inner.keys()
    }
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get_item(key)
    }
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.inner.set_item(key, value)
    }
    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        if key.contains("stuck") {
            return Err(StoreError::Io {
                path: PathBuf::from("stuck"),
                source: std::io::Error::other("read-only"),
            });
        }
        self.inner.remove_item(key)
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

#[test]
fn memory_store_set_get_remove() {
    let store = MemoryStore::new();
    store.set_item("a", "1").unwrap();
    assert_eq!(store.get_item("a").unwrap().as_deref(), Some("1"));
    store.remove_item("a").unwrap();
    assert!(store.get_item("a").unwrap().is_none());
}

#[test]
fn memory_store_remove_missing_is_ok() {
    let store = MemoryStore::new();
    assert!(store.remove_item("nope").is_ok());
}

#[test]
fn memory_store_keys_are_sorted() {
    let store = MemoryStore::new();
    store.set_item("b", "2").unwrap();
    store.set_item("a", "1").unwrap();
    assert_eq!(store.keys().unwrap(), vec!["a".to_owned(), "b".to_owned()]);
}

// =============================================================================
// remove_prefixed
// =============================================================================

#[test]
fn remove_prefixed_only_touches_namespace() {
    let store = MemoryStore::new();
    store.set_item("sb-abc-auth-token", "{}").unwrap();
    store.set_item("sb-abc-code-verifier", "x").unwrap();
    store.set_item("theme", "dark").unwrap();
    store.set_item("xsb-not-really", "y").unwrap();

    let removed = remove_prefixed(&store, "sb-").unwrap();

    assert_eq!(removed, 2);
    assert_eq!(store.keys().unwrap(), vec!["theme".to_owned(), "xsb-not-really".to_owned()]);
}

#[test]
fn remove_prefixed_empty_store() {
    let store = MemoryStore::new();
    assert_eq!(remove_prefixed(&store, "sb-").unwrap(), 0);
}

#[test]
fn remove_prefixed_skips_failing_keys() {
    let store = StuckStore { inner: MemoryStore::new() };
    store.set_item("sb-stuck", "1").unwrap();
    store.set_item("sb-ok", "2").unwrap();

    let removed = remove_prefixed(&store, "sb-").unwrap();

    assert_eq!(removed, 1);
    assert_eq!(store.keys().unwrap(), vec!["sb-stuck".to_owned()]);
}

// =============================================================================
// FileStore
// =============================================================================

#[test]
fn file_store_missing_file_starts_empty() {
    let path = temp_path();
    let store = FileStore::open(&path).unwrap();
    assert!(store.keys().unwrap().is_empty());
    assert!(!path.exists());
}

#[test]
fn file_store_persists_across_reopen() {
    let path = temp_path();
    {
        let store = FileStore::open(&path).unwrap();
        store.set_item("sb-x-auth-token", "token").unwrap();
        store.set_item("other", "keep").unwrap();
        store.remove_item("other").unwrap();
    }
    let reopened = FileStore::open(&path).unwrap();
    assert_eq!(reopened.get_item("sb-x-auth-token").unwrap().as_deref(), Some("token"));
    assert!(reopened.get_item("other").unwrap().is_none());
    let _ = std::fs::remove_file(path);
}

#[test]
fn file_store_rejects_non_object_contents() {
    let path = temp_path();
    std::fs::write(&path, "[1, 2, 3]").unwrap();
    assert!(matches!(FileStore::open(&path), Err(StoreError::Encoding(_))));
    let _ = std::fs::remove_file(path);
}

#[test]
fn file_store_empty_file_starts_empty() {
    let path = temp_path();
    std::fs::write(&path, "").unwrap();
    let store = FileStore::open(&path).unwrap();
    assert!(store.keys().unwrap().is_empty());
    let _ = std::fs::remove_file(path);
}

#[test]
fn file_store_failed_write_leaves_memory_untouched() {
    let dir = std::env::temp_dir().join(format!("authsession-store-dir-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let store = FileStore::open(dir.join("store.json")).unwrap();
    store.set_item("sb-x-auth-token", "token").unwrap();
    std::fs::remove_dir_all(&dir).unwrap();

    assert!(matches!(store.set_item("k", "v"), Err(StoreError::Io { .. })));
    assert!(store.get_item("k").unwrap().is_none());

    assert!(store.remove_item("sb-x-auth-token").is_err());
    assert_eq!(store.get_item("sb-x-auth-token").unwrap().as_deref(), Some("token"));
    assert_eq!(remove_prefixed(&store, "sb-").unwrap(), 0);
    assert_eq!(store.keys().unwrap(), vec!["sb-x-auth-token".to_owned()]);
}
