//! In-memory audit sink
//!
//! Bounded FIFO retention: the sink keeps the most recent records and
//! mirrors every append to the tracing log, so the trail survives in log
//! aggregation even after eviction.

use crate::domain::audit::{AuditRecord, AuditSink};
use crate::domain::shared::value_objects::CallId;
use crate::domain::shared::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use tokio::sync::RwLock;
use tracing::info;

pub struct InMemoryAuditSink {
    records: RwLock<VecDeque<AuditRecord>>,
    capacity: usize,
}

impl InMemoryAuditSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            capacity,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditSink {
    async fn append(&self, record: AuditRecord) -> Result<()> {
        info!(
            call_id = %record.call_id,
            tenant_id = %record.tenant_id,
            event = ?record.event,
            "AUDIT"
        );

        let mut records = self.records.write().await;
        records.push_back(record);
        while records.len() > self.capacity {
            records.pop_front();
        }
        Ok(())
    }

    async fn for_call(&self, call_id: CallId) -> Result<Vec<AuditRecord>> {
        let records = self.records.read().await;
        Ok(records
            .iter()
            .filter(|r| r.call_id == call_id)
            .cloned()
            .collect())
    }
}
