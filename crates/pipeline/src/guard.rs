//! Per-card mutual exclusion and reprocessing cooldown.
//!
//! [`ConcurrencyGuard`] is the seam between the orchestrator and whatever
//! backs the lock state. The bundled [`InMemoryGuard`] is process-local:
//! horizontal scaling to multiple instances reintroduces the duplicate-
//! generation race, which is an accepted limitation of the single-instance
//! deployment. A distributed implementation (TTL cache, shared lock) can
//! slot in behind the same trait.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// How long a lock may be held before the watchdog force-releases it.
/// Guarantees forward progress when a run crashes without releasing.
pub const LOCK_RELEASE_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimum interval before an ambiguous trigger may regenerate a document
/// for the same card.
pub const REPROCESS_COOLDOWN: Duration = Duration::from_secs(180);

/// Per-card lock plus cooldown bookkeeping.
///
/// At most one orchestrator run may hold the lock for a card identity at
/// a time; concurrent webhook deliveries for that card get an immediate
/// "in progress" answer instead of duplicating work.
pub trait ConcurrencyGuard: Send + Sync {
    /// Take the lock for `card_id`. Returns `false` if it is already held.
    fn try_acquire(&self, card_id: &str) -> bool;

    /// Release the lock. Idempotent; releasing an unheld lock is a no-op.
    fn release(&self, card_id: &str);

    /// Record a successful generation for cooldown tracking.
    fn record_success(&self, card_id: &str);

    /// Whether a successful generation was recorded for `card_id` within
    /// the cooldown window.
    fn cooldown_active(&self, card_id: &str) -> bool;
}

/// In-memory [`ConcurrencyGuard`] for single-instance deployments.
pub struct InMemoryGuard {
    /// Held locks; the token cancels the auto-release watchdog.
    locks: Arc<Mutex<HashMap<String, CancellationToken>>>,
    /// Timestamp of the last successful generation per card.
    recent: Mutex<HashMap<String, Instant>>,
    lock_timeout: Duration,
    cooldown: Duration,
}

impl InMemoryGuard {
    /// Build a guard with explicit timings (tests use short ones).
    pub fn new(lock_timeout: Duration, cooldown: Duration) -> Self {
        Self {
            locks: Arc::new(Mutex::new(HashMap::new())),
            recent: Mutex::new(HashMap::new()),
            lock_timeout,
            cooldown,
        }
    }
}

impl Default for InMemoryGuard {
    fn default() -> Self {
        Self::new(LOCK_RELEASE_TIMEOUT, REPROCESS_COOLDOWN)
    }
}

impl ConcurrencyGuard for InMemoryGuard {
    fn try_acquire(&self, card_id: &str) -> bool {
        let mut locks = self.locks.lock().unwrap();
        if locks.contains_key(card_id) {
            return false;
        }

        let cancel = CancellationToken::new();
        locks.insert(card_id.to_string(), cancel.clone());
        drop(locks);

        // Watchdog: force-release after the timeout unless release() lands
        // first and cancels us.
        let locks = Arc::clone(&self.locks);
        let card = card_id.to_string();
        let timeout = self.lock_timeout;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    if locks.lock().unwrap().remove(&card).is_some() {
                        tracing::warn!(
                            card_id = %card,
                            timeout_secs = timeout.as_secs(),
                            "Lock expired without release, force-releasing"
                        );
                    }
                }
            }
        });

        true
    }

    fn release(&self, card_id: &str) {
        if let Some(cancel) = self.locks.lock().unwrap().remove(card_id) {
            cancel.cancel();
        }
    }

    fn record_success(&self, card_id: &str) {
        let now = Instant::now();
        let mut recent = self.recent.lock().unwrap();
        // Drop stale entries so the map does not grow with card traffic.
        recent.retain(|_, at| now.duration_since(*at) < self.cooldown);
        recent.insert(card_id.to_string(), now);
    }

    fn cooldown_active(&self, card_id: &str) -> bool {
        self.recent
            .lock()
            .unwrap()
            .get(card_id)
            .is_some_and(|at| at.elapsed() < self.cooldown)
    }
}
