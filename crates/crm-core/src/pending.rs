use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// What the next free-text message from an operator should be used for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    /// The operator picked a contact; the next message is the body to send.
    MessageBody { contact_id: i64 },
}

/// Short-lived "waiting for the operator's next message" state, keyed by
/// account id. Entries expire after the TTL and are dropped lazily on
/// access, so an abandoned prompt cannot capture an unrelated message later.
pub struct PendingIntents {
    ttl: Duration,
    inner: Mutex<HashMap<i64, (Intent, Instant)>>,
}

impl PendingIntents {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub async fn set(&self, account: i64, intent: Intent) {
        let mut map = self.inner.lock().await;
        map.insert(account, (intent, Instant::now()));
    }

    /// Removes and returns the intent for `account`, unless it has expired.
    pub async fn take(&self, account: i64) -> Option<Intent> {
        let mut map = self.inner.lock().await;
        let (intent, created) = map.remove(&account)?;
        if created.elapsed() > self.ttl {
            return None;
        }
        Some(intent)
    }

    pub async fn clear(&self, account: i64) {
        self.inner.lock().await.remove(&account);
    }
}
