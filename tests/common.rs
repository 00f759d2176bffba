//! Shared fixtures for integration tests.

use beyonder::social::UserRegistry;
use beyonder::storage::SledStore;
use tempfile::TempDir;

/// Sled store in a fresh temp dir. Keep the `TempDir` alive for the test's duration.
pub fn temp_store() -> (TempDir, SledStore) {
    let tmp = tempfile::tempdir().expect("tempdir");
    let store = SledStore::open(tmp.path().join("db")).expect("open sled store");
    (tmp, store)
}

/// Cheap Argon2 params so registration stays fast in tests.
#[allow(dead_code)]
pub fn fast_registry(store: &SledStore) -> UserRegistry<'_, SledStore> {
    let params = argon2::Params::new(1024, 1, 1, None).expect("argon2 params");
    UserRegistry::with_params(store, Some(params))
}
