//! In-memory stores with TTL eviction
//!
//! Call contexts and IVR sessions are hot per-call state with a bounded
//! lifetime; a `HashMap` behind a `tokio::sync::RwLock` is sufficient.
//! Reads are lazy about expiry, and a periodic sweep keeps memory bounded
//! even for call ids that are never read again.

use crate::domain::call_context::{CallContext, ContextStore};
use crate::domain::ivr::{IvrMenu, IvrSession, MenuStore, SessionStore};
use crate::domain::shared::value_objects::{CallId, TenantId};
use crate::domain::shared::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

struct Entry<T> {
    value: T,
    touched_at: DateTime<Utc>,
}

impl<T> Entry<T> {
    fn new(value: T) -> Self {
        Self {
            value,
            touched_at: Utc::now(),
        }
    }

    fn expired(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.touched_at).to_std().unwrap_or(Duration::ZERO) > ttl
    }
}

/// TTL-expiring store for call contexts
pub struct InMemoryContextStore {
    entries: RwLock<HashMap<CallId, Entry<CallContext>>>,
    ttl: Duration,
}

impl InMemoryContextStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl ContextStore for InMemoryContextStore {
    async fn get(&self, call_id: CallId) -> Result<Option<CallContext>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&call_id)
            .filter(|e| !e.expired(self.ttl, Utc::now()))
            .map(|e| e.value.clone()))
    }

    async fn put(&self, context: CallContext) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(context.call_id, Entry::new(context));
        Ok(())
    }

    async fn remove(&self, call_id: CallId) -> Result<()> {
        self.entries.write().await.remove(&call_id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.expired(self.ttl, now));
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "Expired call contexts purged");
        }
        Ok(evicted)
    }
}

/// TTL-expiring store for IVR sessions, keyed by call id
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<CallId, Entry<IvrSession>>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn get(&self, call_id: CallId) -> Result<Option<IvrSession>> {
        let entries = self.entries.read().await;
        Ok(entries
            .get(&call_id)
            .filter(|e| !e.expired(self.ttl, Utc::now()))
            .map(|e| e.value.clone()))
    }

    async fn put(&self, session: IvrSession) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(session.call_id, Entry::new(session));
        Ok(())
    }

    async fn remove(&self, call_id: CallId) -> Result<()> {
        self.entries.write().await.remove(&call_id);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<usize> {
        let now = Utc::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| !e.expired(self.ttl, now));
        Ok(before - entries.len())
    }
}

/// Menu configuration held in memory, keyed by tenant and menu id
#[derive(Default)]
pub struct InMemoryMenuStore {
    menus: RwLock<HashMap<(TenantId, String), IvrMenu>>,
}

impl InMemoryMenuStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, menu: IvrMenu) {
        let mut menus = self.menus.write().await;
        menus.insert((menu.tenant_id, menu.id.clone()), menu);
    }
}

#[async_trait]
impl MenuStore for InMemoryMenuStore {
    async fn get_menu(&self, tenant_id: TenantId, menu_id: &str) -> Result<Option<IvrMenu>> {
        let menus = self.menus.read().await;
        Ok(menus.get(&(tenant_id, menu_id.to_string())).cloned())
    }
}

/// Periodic expiry sweep over both TTL stores and the per-call lock map.
/// Calls that end without a terminal IVR state would otherwise leave their
/// lock entry behind. Spawned at startup; runs until the process exits.
pub async fn run_purge_loop(
    contexts: std::sync::Arc<InMemoryContextStore>,
    sessions: std::sync::Arc<InMemorySessionStore>,
    locks: std::sync::Arc<crate::application::CallLocks>,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let _ = contexts.purge_expired().await;
        let _ = sessions.purge_expired().await;
        let swept = locks.sweep_idle().await;
        if swept > 0 {
            debug!(swept, "Idle call locks dropped");
        }
    }
}
