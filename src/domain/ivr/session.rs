//! IVR session entity
//!
//! Per-call dialog state: the current menu pointer, the ordered input path,
//! retry counting, and the analysis context accumulated across turns.
//! Created on first menu entry, destroyed (or expired) on terminal status.

use crate::domain::analysis::CallAnalysis;
use crate::domain::customer::CustomerContext;
use crate::domain::shared::error::DomainError;
use crate::domain::shared::value_objects::{CallId, PhoneNumber, SessionId, TenantId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Transferred,
    Completed,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Transferred | Self::Completed)
    }
}

/// Analysis context carried across dialog turns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionContext {
    pub caller_number: PhoneNumber,
    /// Immutable CRM snapshot taken when the call arrived
    pub customer: CustomerContext,
    /// Concatenated transcript of all resolved inputs
    pub transcript: String,
    pub last_input: Option<String>,
    /// Refreshed by the analyzer on every turn
    pub analysis: Option<CallAnalysis>,
    pub language: String,
}

impl SessionContext {
    pub fn new(caller_number: PhoneNumber, customer: CustomerContext) -> Self {
        Self {
            caller_number,
            customer,
            transcript: String::new(),
            last_input: None,
            analysis: None,
            language: "en-US".to_string(),
        }
    }

    pub fn current_sentiment(&self) -> Option<f64> {
        self.analysis.as_ref().map(|a| a.sentiment)
    }

    pub fn analysis_or_default(&self) -> CallAnalysis {
        self.analysis.clone().unwrap_or_default()
    }
}

/// Per-call IVR dialog state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvrSession {
    pub id: SessionId,
    pub call_id: CallId,
    pub tenant_id: TenantId,
    pub current_menu: String,
    /// Ordered raw inputs received
    pub path: Vec<String>,
    pub retry_count: u32,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub context: SessionContext,
    /// Where the call went, once transferred; kept for idempotent replays
    pub transfer_target: Option<PhoneNumber>,
    pub transfer_reason: Option<String>,
    /// Closing message spoken on completion; kept for idempotent replays
    pub closing_message: Option<String>,
}

impl IvrSession {
    pub fn new(
        call_id: CallId,
        tenant_id: TenantId,
        root_menu: impl Into<String>,
        context: SessionContext,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            call_id,
            tenant_id,
            current_menu: root_menu.into(),
            path: Vec::new(),
            retry_count: 0,
            status: SessionStatus::Active,
            started_at: now,
            last_activity: now,
            context,
            transfer_target: None,
            transfer_reason: None,
            closing_message: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record a raw input on the path and touch the activity timestamp.
    pub fn record_input(&mut self, raw: impl Into<String>) {
        self.path.push(raw.into());
        self.last_activity = Utc::now();
    }

    /// Fold a resolved utterance and its fresh analysis into the context.
    pub fn absorb_turn(&mut self, resolved: &str, analysis: CallAnalysis) {
        if !resolved.is_empty() {
            if !self.context.transcript.is_empty() {
                self.context.transcript.push(' ');
            }
            self.context.transcript.push_str(resolved);
        }
        self.context.last_input = Some(resolved.to_string());
        self.context.language = analysis.language.clone();
        self.context.analysis = Some(analysis);
    }

    /// Move into a sub-menu; resets the retry counter for the new node.
    pub fn enter_menu(&mut self, menu_id: impl Into<String>) {
        self.current_menu = menu_id.into();
        self.retry_count = 0;
    }

    pub fn transfer(
        &mut self,
        target: PhoneNumber,
        reason: impl Into<String>,
    ) -> crate::domain::shared::Result<()> {
        if self.is_terminal() {
            return Err(DomainError::InvalidStateTransition(format!(
                "Session {} is already {:?}",
                self.id, self.status
            )));
        }
        self.status = SessionStatus::Transferred;
        self.transfer_target = Some(target);
        self.transfer_reason = Some(reason.into());
        self.last_activity = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self, closing: impl Into<String>) -> crate::domain::shared::Result<()> {
        if self.is_terminal() {
            return Err(DomainError::InvalidStateTransition(format!(
                "Session {} is already {:?}",
                self.id, self.status
            )));
        }
        self.status = SessionStatus::Completed;
        self.closing_message = Some(closing.into());
        self.last_activity = Utc::now();
        Ok(())
    }
}

/// Typed repository for IVR sessions, keyed by call id
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, call_id: CallId) -> crate::domain::shared::Result<Option<IvrSession>>;

    async fn put(&self, session: IvrSession) -> crate::domain::shared::Result<()>;

    async fn remove(&self, call_id: CallId) -> crate::domain::shared::Result<()>;

    /// Drop sessions idle longer than the store's TTL.
    async fn purge_expired(&self) -> crate::domain::shared::Result<usize>;
}
