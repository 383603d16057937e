//! Per-case operation locks.
//!
//! State-changing operations on one case run one at a time; operations on
//! different cases do not contend. The lock for a case is created on first
//! use and dropped from the map when its last holder releases it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use olympus_core::CaseId;

#[derive(Debug, Default)]
pub(crate) struct CaseLocks {
    locks: DashMap<CaseId, Arc<Mutex<()>>>,
}

/// Held for the duration of one operation. Released on drop.
pub(crate) struct CaseGuard<'a> {
    locks: &'a CaseLocks,
    case_id: CaseId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl CaseLocks {
    pub(crate) async fn acquire(&self, case_id: CaseId) -> CaseGuard<'_> {
        let lock = self.locks.entry(case_id).or_default().clone();
        let guard = lock.lock_owned().await;
        CaseGuard {
            locks: self,
            case_id,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for CaseGuard<'_> {
    fn drop(&mut self) {
        // The guard owns one Arc; release it before checking for other holders.
        drop(self.guard.take());
        self.locks
            .locks
            .remove_if(&self.case_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}
