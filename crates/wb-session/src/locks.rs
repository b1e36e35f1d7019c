// locks.rs — Per-truck exclusive sections.
//
// Every lifecycle call holds its truck's mutex across load, decide, and
// write. Calls for different trucks take different mutexes and never wait on
// each other; the outer map lock is held only long enough to look up or
// insert an entry.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::error::SessionError;

/// Entries beyond this count trigger a sweep of idle locks.
const SWEEP_THRESHOLD: usize = 1024;

/// A keyed mutex over truck ids.
#[derive(Default)]
pub struct TruckLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TruckLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mutex guarding `truck_id`, created on first use.
    pub fn lock_for(&self, truck_id: &str) -> Result<Arc<Mutex<()>>, SessionError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| SessionError::LockPoisoned("truck lock table".to_string()))?;

        if locks.len() > SWEEP_THRESHOLD {
            // Only the map holds an idle entry.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        Ok(locks
            .entry(truck_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone())
    }

    /// Number of trucks with a lock entry.
    pub fn len(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
