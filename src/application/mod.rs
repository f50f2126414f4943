//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases.
//! It's responsible for:
//! - Coordinating aggregates and collaborator ports
//! - Serializing per-call read-modify-write cycles
//! - Degrading collaborator failures to safe defaults
//! - Converting between domain models and response DTOs

pub mod ivr;
pub mod router;

pub use ivr::{CallInput, IvrEngine, IvrStep, TransferReason};
pub use router::{InboundCall, InboundRouter};

use crate::domain::shared::value_objects::CallId;
use crate::domain::tenant::Tenant;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Per-call mutual exclusion
///
/// Concurrent webhooks for the same call serialize here before touching the
/// context or session stores. Different calls never contend.
#[derive(Default)]
pub struct CallLocks {
    locks: Mutex<HashMap<CallId, Arc<Mutex<()>>>>,
}

impl CallLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for one call, creating it on first use.
    pub async fn acquire(&self, call_id: CallId) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks
                .entry(call_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }

    /// Drop the lock entry once a call reaches a terminal state. A holder
    /// still in flight keeps the inner mutex alive through its own `Arc`.
    pub async fn release(&self, call_id: CallId) {
        self.locks.lock().await.remove(&call_id);
    }

    /// Drop entries nobody holds. Calls that never reach a terminal state
    /// (announcement/callback outcomes, abandoned dialogs) otherwise leave
    /// their entry behind; the periodic store sweep calls this. A strong
    /// count of one means only the map itself keeps the inner mutex alive.
    pub async fn sweep_idle(&self) -> usize {
        let mut locks = self.locks.lock().await;
        let before = locks.len();
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        before - locks.len()
    }
}

/// Tenant-local wall clock, derived from the tenant's UTC offset.
pub(crate) fn tenant_local_now(tenant: &Tenant, now: DateTime<Utc>) -> NaiveDateTime {
    (now + chrono::Duration::minutes(tenant.utc_offset_minutes as i64)).naive_utc()
}

pub(crate) fn tenant_local_hour(tenant: &Tenant, now: DateTime<Utc>) -> u32 {
    tenant_local_now(tenant, now).hour()
}
