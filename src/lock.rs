// Named short-lived mutual-exclusion leases.
//
// Serializes contest join/withdraw per (contest, user) pair so concurrent
// requests cannot double-enter, double-charge, or race fullness checks.
// Leases self-expire after their TTL so a crashed holder never starves
// later callers. Intra-process only; room and contest state is
// process-owned, so no distributed coordination is needed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Default)]
struct LockTable {
    leases: HashMap<String, Instant>,
}

/// A registry of named, TTL-bounded leases.
#[derive(Clone, Default)]
pub struct ResourceLock {
    table: Arc<Mutex<LockTable>>,
}

impl ResourceLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Try to acquire the lease for `key`. Returns `false` immediately
    /// (never blocks) if an unexpired lease already exists.
    pub fn acquire(&self, key: &str, ttl: Duration) -> bool {
        let mut table = self.table.lock().expect("lock table mutex poisoned");
        let now = Instant::now();
        match table.leases.get(key) {
            Some(expiry) if *expiry > now => false,
            _ => {
                table.leases.insert(key.to_string(), now + ttl);
                true
            }
        }
    }

    /// Release the lease for `key`. Releasing an unheld or expired key is
    /// a no-op.
    pub fn release(&self, key: &str) {
        let mut table = self.table.lock().expect("lock table mutex poisoned");
        table.leases.remove(key);
    }

    /// Acquire as an RAII guard that releases on drop, or `None` if the
    /// lease is held.
    pub fn lease(&self, key: &str, ttl: Duration) -> Option<LockGuard> {
        if self.acquire(key, ttl) {
            Some(LockGuard {
                lock: self.clone(),
                key: key.to_string(),
            })
        } else {
            None
        }
    }
}

/// Guard for a held lease; releases the key when dropped.
pub struct LockGuard {
    lock: ResourceLock,
    key: String,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.lock.release(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TTL: Duration = Duration::from_secs(5);

    #[test]
    fn acquire_then_contend() {
        let locks = ResourceLock::new();
        assert!(locks.acquire("entry:c1:u1", TTL));
        assert!(!locks.acquire("entry:c1:u1", TTL));
        // A different key is unaffected.
        assert!(locks.acquire("entry:c1:u2", TTL));
    }

    #[test]
    fn release_allows_reacquire() {
        let locks = ResourceLock::new();
        assert!(locks.acquire("k", TTL));
        locks.release("k");
        assert!(locks.acquire("k", TTL));
    }

    #[test]
    fn expired_lease_is_reacquirable() {
        let locks = ResourceLock::new();
        assert!(locks.acquire("k", Duration::from_millis(10)));
        std::thread::sleep(Duration::from_millis(20));
        assert!(locks.acquire("k", TTL), "expired lease should not block");
    }

    #[test]
    fn guard_releases_on_drop() {
        let locks = ResourceLock::new();
        {
            let _guard = locks.lease("k", TTL).expect("first lease");
            assert!(locks.lease("k", TTL).is_none());
        }
        assert!(locks.lease("k", TTL).is_some());
    }

    #[test]
    fn release_unheld_key_is_noop() {
        let locks = ResourceLock::new();
        locks.release("never-held");
        assert!(locks.acquire("never-held", TTL));
    }
}
