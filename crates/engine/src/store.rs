use database::StateStore;
use std::ops::Deref;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};

/// The state store shared by the control loop and command handlers.
///
/// Every read-modify-write sequence over indexed symbols or the configuration
/// runs while holding the guard returned by [`SharedStore::lock`], so a symbol
/// addition can never interleave with a rebalance cycle.
#[derive(Clone)]
pub struct SharedStore {
    store: Arc<dyn StateStore>,
    lock: Arc<Mutex<()>>,
}

impl SharedStore {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// Waits for exclusive access to the store.
    pub async fn lock(&self) -> StoreGuard<'_> {
        StoreGuard {
            _permit: self.lock.lock().await,
            store: self.store.as_ref(),
        }
    }
}

/// Exclusive access to the store for as long as it is held.
pub struct StoreGuard<'a> {
    _permit: MutexGuard<'a, ()>,
    store: &'a (dyn StateStore + 'static),
}

impl Deref for StoreGuard<'_> {
    type Target = dyn StateStore;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}
