//! In-process exclusion per target table
//!
//! Workers in the same process queue up here before touching the database;
//! the advisory lock taken by the import session covers other processes.

use reel_common::TargetTable;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Clone, Default)]
pub struct TableLocks {
    inner: Arc<Mutex<HashMap<TargetTable, Arc<AsyncMutex<()>>>>>,
}

impl TableLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive use of `table`; released when the guard drops
    pub async fn acquire(&self, table: TargetTable) -> OwnedMutexGuard<()> {
        let lock = {
            // A poisoned map only means another thread panicked mid-insert;
            // the entries themselves are still usable.
            let mut map = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            map.entry(table).or_default().clone()
        };
        lock.lock_owned().await
    }
}
