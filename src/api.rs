//! HTTP surface: the WhatsApp webhook and admin endpoints

mod handlers;
mod types;

pub use handlers::create_router;
#[allow(unused_imports)] // Public API re-exports
pub use types::*;

use crate::runtime::{ProductionManager, ProductionRuntime, RuntimeManager};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const RECENT_MESSAGE_CAPACITY: usize = 1024;

/// How long a guest's inbox lingers without messages
const INBOX_IDLE: Duration = Duration::from_secs(300);

/// Bounded memory of recently seen inbound message IDs
pub struct RecentMessageIds {
    capacity: usize,
    inner: Mutex<(HashSet<String>, VecDeque<String>)>,
}

impl RecentMessageIds {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new((HashSet::new(), VecDeque::new())),
        }
    }

    /// Record `id`; false if it was already seen
    pub fn insert(&self, id: &str) -> bool {
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        let (seen, order) = &mut *guard;
        if seen.contains(id) {
            return false;
        }
        if order.len() == self.capacity {
            if let Some(oldest) = order.pop_front() {
                seen.remove(&oldest);
            }
        }
        seen.insert(id.to_string());
        order.push_back(id.to_string());
        true
    }
}

impl Default for RecentMessageIds {
    fn default() -> Self {
        Self::new(RECENT_MESSAGE_CAPACITY)
    }
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ProductionManager>,
    pub verify_token: Arc<str>,
    pub reminders_enabled: bool,
    pub seen: Arc<RecentMessageIds>,
}

impl AppState {
    pub fn new(runtime: Arc<ProductionRuntime>, verify_token: &str, reminders_enabled: bool) -> Self {
        Self {
            manager: Arc::new(RuntimeManager::new(runtime, INBOX_IDLE)),
            verify_token: Arc::from(verify_token),
            reminders_enabled,
            seen: Arc::new(RecentMessageIds::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recent_ids_reject_duplicates() {
        let seen = RecentMessageIds::new(4);
        assert!(seen.insert("wamid.1"));
        assert!(!seen.insert("wamid.1"));
        assert!(seen.insert("wamid.2"));
    }

    #[test]
    fn test_recent_ids_forget_oldest() {
        let seen = RecentMessageIds::new(2);
        assert!(seen.insert("a"));
        assert!(seen.insert("b"));
        assert!(seen.insert("c"));
        // "a" was evicted, "c" is still remembered
        assert!(seen.insert("a"));
        assert!(!seen.insert("c"));
    }
}
