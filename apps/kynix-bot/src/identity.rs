use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::debug;

/// Which lifetime class an identity mapping belongs to.
///
/// Customer entries live until the periodic sweep; support-session
/// entries are created when a user engages support and removed when the
/// ticket closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Customer,
    SupportSession,
}

/// Ephemeral fake-id → real-id routing aid. Never persisted; losing it
/// (restart, sweep) only degrades support-message delivery — a message
/// with no mapping is dropped, never mis-delivered.
pub trait IdentityDirectory: Send + Sync {
    fn remember(&self, fake_id: i64, real_id: i64, namespace: Namespace);
    /// Removes the support-session entry only. Customer entries are not
    /// individually removable; they go away in bulk via `clear_customers`.
    fn forget_support(&self, fake_id: i64);
    /// Customer namespace wins over support-session.
    fn resolve(&self, fake_id: i64) -> Option<i64>;
    /// Empties the customer namespace. Atomic from a reader's point of
    /// view: the map is swapped out whole, not drained entry by entry.
    fn clear_customers(&self);
}

#[derive(Default)]
pub struct MemoryIdentityStore {
    customers: RwLock<HashMap<i64, i64>>,
    support: RwLock<HashMap<i64, i64>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityDirectory for MemoryIdentityStore {
    fn remember(&self, fake_id: i64, real_id: i64, namespace: Namespace) {
        let map = match namespace {
            Namespace::Customer => &self.customers,
            Namespace::SupportSession => &self.support,
        };
        map.write().expect("identity lock poisoned").insert(fake_id, real_id);
    }

    fn forget_support(&self, fake_id: i64) {
        self.support
            .write()
            .expect("identity lock poisoned")
            .remove(&fake_id);
    }

    fn resolve(&self, fake_id: i64) -> Option<i64> {
        if let Some(real_id) = self
            .customers
            .read()
            .expect("identity lock poisoned")
            .get(&fake_id)
        {
            return Some(*real_id);
        }
        self.support
            .read()
            .expect("identity lock poisoned")
            .get(&fake_id)
            .copied()
    }

    fn clear_customers(&self) {
        let dropped = {
            let mut guard = self.customers.write().expect("identity lock poisoned");
            std::mem::take(&mut *guard)
        };
        debug!("Cleared {} customer identity entries", dropped.len());
    }
}

/// Sweeps the customer namespace on a fixed interval for the lifetime
/// of the process. The schedule is not persisted across restarts.
pub fn spawn_clear_task(store: Arc<dyn IdentityDirectory>, every: Duration) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(every).await;
            store.clear_customers();
        }
    });
}
