//! Per-switch mutual exclusion (§4.1). One `tokio::sync::Semaphore` with a
//! single permit per `SwitchKey`; `acquire_owned` queues waiters in FIFO
//! order, which gives the fair exclusive-lock behaviour of §4.1/§9 (releasing
//! a lock wakes the longest-waiting opener) without a hand-rolled wait queue.

use netman_model::SwitchKey;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};

#[derive(Default)]
pub struct SwitchLockTable {
    semaphores: Mutex<HashMap<SwitchKey, Arc<Semaphore>>>,
}

impl SwitchLockTable {
    /// Blocks (unbounded wait, per §5) until the caller holds the exclusive
    /// lock for `key`. The returned permit releases the lock when dropped.
    pub async fn acquire(&self, key: SwitchKey) -> OwnedSemaphorePermit {
        let semaphore = {
            let mut table = self.semaphores.lock().await;
            table.entry(key).or_insert_with(|| Arc::new(Semaphore::new(1))).clone()
        };
        semaphore
            .acquire_owned()
            .await
            .expect("switch semaphore is never closed")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn second_opener_waits_for_first_to_release() {
        let table = SwitchLockTable::default();
        let key = SwitchKey::new("cisco", "c1");

        let first = table.acquire(key.clone()).await;

        let blocked = timeout(Duration::from_millis(50), table.acquire(key.clone())).await;
        assert!(blocked.is_err(), "second opener must block while first holds the lock");

        drop(first);
        let second = timeout(Duration::from_millis(50), table.acquire(key)).await;
        assert!(second.is_ok(), "second opener must acquire once the lock is released");
    }

    #[tokio::test]
    async fn distinct_switches_never_contend() {
        let table = SwitchLockTable::default();
        let _a = table.acquire(SwitchKey::new("cisco", "c1")).await;
        let b = timeout(Duration::from_millis(50), table.acquire(SwitchKey::new("cisco", "c2"))).await;
        assert!(b.is_ok(), "locks for different switches must not contend");
    }
}
