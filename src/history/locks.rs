use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// One async mutex per session id; holding the guard serializes a whole
/// load, generate, append turn. An entry lives only while some turn holds
/// or waits on it.
#[derive(Debug, Default, Clone)]
pub struct SessionLocks {
    inner: Arc<Mutex<LockMap>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    fn map(&self) -> MutexGuard<'_, LockMap> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub async fn acquire(&self, session_id: &str) -> SessionGuard {
        let lock = self
            .map()
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        SessionGuard {
            guard: Some(lock.lock_owned().await),
            locks: self.clone(),
            session_id: session_id.to_string(),
        }
    }

    /// Number of sessions with a live lock entry.
    pub fn active(&self) -> usize {
        self.map().len()
    }
}

/// Held for the duration of a turn. Dropping it releases the session and
/// forgets the entry when nobody else is waiting for it.
#[derive(Debug)]
pub struct SessionGuard {
    guard: Option<OwnedMutexGuard<()>>,
    locks: SessionLocks,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.guard.take();
        let mut map = self.locks.map();
        let idle = map
            .get(&self.session_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            map.remove(&self.session_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_session_is_serialized() {
        let locks = SessionLocks::new();
        let guard = locks.acquire("s").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("s").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_sessions_do_not_block() {
        let locks = SessionLocks::new();
        let _a = locks.acquire("a").await;
        tokio::time::timeout(Duration::from_millis(100), locks.acquire("b"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn released_sessions_are_forgotten() {
        let locks = SessionLocks::new();
        let first = locks.acquire("a").await;
        let second = locks.acquire("b").await;
        assert_eq!(locks.active(), 2);

        drop(first);
        drop(second);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn entry_survives_while_a_turn_is_waiting() {
        let locks = SessionLocks::new();
        let guard = locks.acquire("s").await;

        let waiter = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("s").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locks.active(), 0);
    }
}
