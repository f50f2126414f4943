//! IVR session use case
//!
//! Drives the per-call dialog: session creation on menu entry, input
//! resolution (DTMF or transcribed speech), option matching, retry and
//! escalation handling, and action execution. All read-modify-write cycles
//! for one call are serialized through [`CallLocks`].

use crate::application::{tenant_local_hour, CallLocks};
use crate::domain::analysis::CallAnalyzer;
use crate::domain::audit::{AuditEventType, AuditRecord, AuditSink};
use crate::domain::call_context::ContextStore;
use crate::domain::escalation::{EscalationPolicy, EscalationReason, EscalationSignals, HumanHandoff};
use crate::domain::ivr::{
    IvrMenu, IvrSession, MenuStore, OptionAction, SessionContext, SessionStore, Transcriber,
};
use crate::domain::shared::value_objects::{CallId, PhoneNumber};
use crate::domain::shared::{DomainError, Result};
use crate::domain::tenant::{Tenant, TenantDirectory};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const NO_MATCH_PROMPT: &str = "I'm sorry, I didn't understand that.";
const APOLOGY_PROMPT: &str = "I'm sorry, something went wrong. Please try again.";
const DEFAULT_GOODBYE: &str = "Thank you for calling. Goodbye.";

/// Caller input, as the webhook layer received it
#[derive(Debug, Clone)]
pub enum CallInput {
    /// Keypad digits
    Dtmf(String),
    /// Reference to captured audio, resolved through the transcriber
    Speech { audio_ref: String },
}

impl CallInput {
    fn raw(&self) -> &str {
        match self {
            Self::Dtmf(digits) => digits,
            Self::Speech { audio_ref } => audio_ref,
        }
    }
}

/// Why a transfer instruction was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferReason {
    /// The caller picked a transfer option
    Direct,
    /// The escalation policy intercepted the transfer
    Escalation,
    /// Retries exhausted on the current menu
    MaxRetries,
}

impl TransferReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Escalation => "escalation",
            Self::MaxRetries => "max_retries_reached",
        }
    }
}

/// One dialog instruction for the telephony layer to render
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum IvrStep {
    /// Speak a prompt and wait for the next input on the same menu
    Speak { text: String, reprompt: bool },
    /// Collect digits with a timeout
    Gather {
        prompt: String,
        timeout_secs: u32,
        max_digits: u32,
    },
    /// Entered a menu: play its greeting and wait for input
    Menu { menu_id: String, greeting: String },
    /// Hand the call to a number and leave the IVR
    Transfer {
        target: PhoneNumber,
        reason: TransferReason,
    },
    /// End the call
    Hangup { message: String },
}

impl IvrStep {
    fn apology() -> Self {
        Self::Speak {
            text: APOLOGY_PROMPT.to_string(),
            reprompt: true,
        }
    }

    fn failed_hangup() -> Self {
        Self::Hangup {
            message: "We apologize, but we are unable to take your call right now. \
                      Please try again later."
                .to_string(),
        }
    }
}

/// Application service for the IVR dialog
pub struct IvrEngine {
    tenants: Arc<dyn TenantDirectory>,
    menus: Arc<dyn MenuStore>,
    sessions: Arc<dyn SessionStore>,
    contexts: Arc<dyn ContextStore>,
    transcriber: Arc<dyn Transcriber>,
    handoff: Arc<dyn HumanHandoff>,
    audit: Arc<dyn AuditSink>,
    locks: Arc<CallLocks>,
    analyzer: CallAnalyzer,
    policy: EscalationPolicy,
}

impl IvrEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenants: Arc<dyn TenantDirectory>,
        menus: Arc<dyn MenuStore>,
        sessions: Arc<dyn SessionStore>,
        contexts: Arc<dyn ContextStore>,
        transcriber: Arc<dyn Transcriber>,
        handoff: Arc<dyn HumanHandoff>,
        audit: Arc<dyn AuditSink>,
        locks: Arc<CallLocks>,
    ) -> Self {
        Self {
            tenants,
            menus,
            sessions,
            contexts,
            transcriber,
            handoff,
            audit,
            locks,
            analyzer: CallAnalyzer::default(),
            policy: EscalationPolicy::default(),
        }
    }

    /// Enter the tenant's root menu for a routed call. Total: failures
    /// degrade to a polite hangup instruction.
    pub async fn start_session(&self, call_id: CallId) -> IvrStep {
        let _guard = self.locks.acquire(call_id).await;

        match self.start_inner(call_id).await {
            Ok(step) => step,
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "IVR session start failed");
                IvrStep::failed_hangup()
            }
        }
    }

    async fn start_inner(&self, call_id: CallId) -> Result<IvrStep> {
        if let Some(existing) = self.sessions.get(call_id).await? {
            // duplicate start webhook: replay the current menu greeting
            if existing.is_terminal() {
                return Ok(self.replay_terminal(&existing));
            }
            let tenant = self.tenant_of(&existing).await?;
            let menu = self.menu_of(&tenant, &existing.current_menu).await?;
            return Ok(IvrStep::Menu {
                menu_id: menu.id.clone(),
                greeting: menu.greeting.clone(),
            });
        }

        let context = self.contexts.get(call_id).await?.ok_or_else(|| {
            DomainError::NotFound(format!("No call context for {}, call was never routed", call_id))
        })?;
        let tenant = self
            .tenants
            .get_tenant(context.tenant_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Unknown tenant {}", context.tenant_id)))?;
        let menu = self.menu_of(&tenant, &tenant.root_menu_id).await?;

        let session_context =
            SessionContext::new(context.caller_number.clone(), context.customer_or_default());
        let session = IvrSession::new(call_id, tenant.id, menu.id.clone(), session_context);
        info!(call_id = %call_id, tenant_id = %tenant.id, menu = %menu.id, "IVR session started");

        self.audit_transition(&session, "none", "active", "session started")
            .await;
        self.sessions.put(session).await?;

        Ok(IvrStep::Menu {
            menu_id: menu.id,
            greeting: menu.greeting,
        })
    }

    /// Handle one caller input. Total: failures degrade to an apology
    /// re-prompt and the stored session does not advance.
    pub async fn handle_input(&self, call_id: CallId, input: CallInput) -> IvrStep {
        let _guard = self.locks.acquire(call_id).await;

        match self.handle_inner(call_id, input).await {
            Ok(step) => step,
            Err(e) => {
                warn!(call_id = %call_id, error = %e, "IVR input handling failed");
                IvrStep::apology()
            }
        }
    }

    async fn handle_inner(&self, call_id: CallId, input: CallInput) -> Result<IvrStep> {
        let Some(mut session) = self.sessions.get(call_id).await? else {
            // expired or never started; nothing to resume
            return Ok(IvrStep::Hangup {
                message: DEFAULT_GOODBYE.to_string(),
            });
        };

        if session.is_terminal() {
            // duplicate webhook after transfer/hangup: repeat the terminal
            // instruction, mutate nothing
            debug!(call_id = %call_id, status = ?session.status, "Input after terminal state ignored");
            return Ok(self.replay_terminal(&session));
        }

        let tenant = self.tenant_of(&session).await?;
        let menu = self.menu_of(&tenant, &session.current_menu).await?;

        session.record_input(input.raw());
        let resolved = self.resolve_input(&session, &input).await;

        // refresh the analysis over the accumulated transcript
        let mut transcript = session.context.transcript.clone();
        if !resolved.is_empty() {
            if !transcript.is_empty() {
                transcript.push(' ');
            }
            transcript.push_str(&resolved);
        }
        let analysis = self
            .analyzer
            .analyze(&transcript, Some(&session.context.customer));
        session.absorb_turn(&resolved, analysis);

        let local_hour = tenant_local_hour(&tenant, Utc::now());
        let matched = menu
            .find_option(
                &resolved,
                &session.context.analysis_or_default(),
                session.context.customer.tier,
                &session.context.caller_number,
                local_hour,
            )
            .cloned();

        let step = match matched {
            Some(option) => {
                debug!(call_id = %call_id, key = %option.key, "Menu option matched");
                self.execute_action(&mut session, &tenant, &option.action)
                    .await?
            }
            None => self.handle_no_match(&mut session, &tenant, &menu).await?,
        };

        self.sessions.put(session.clone()).await?;
        if session.is_terminal() {
            self.locks.release(call_id).await;
        }
        Ok(step)
    }

    /// Resolve raw input to matchable text. DTMF passes through; speech is
    /// transcribed, and a dead transcriber yields unresolved (empty) text so
    /// the turn falls into the no-match path.
    async fn resolve_input(&self, session: &IvrSession, input: &CallInput) -> String {
        match input {
            CallInput::Dtmf(digits) => digits.clone(),
            CallInput::Speech { audio_ref } => {
                match self
                    .transcriber
                    .speech_to_text(audio_ref, &session.context.language)
                    .await
                {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(call_id = %session.call_id, error = %e, "Transcription failed");
                        self.audit_degraded(session, "transcriber", &e.to_string()).await;
                        String::new()
                    }
                }
            }
        }
    }

    async fn execute_action(
        &self,
        session: &mut IvrSession,
        tenant: &Tenant,
        action: &OptionAction,
    ) -> Result<IvrStep> {
        match action {
            OptionAction::Speak { text } => Ok(IvrStep::Speak {
                text: text.clone(),
                reprompt: false,
            }),

            OptionAction::Gather {
                prompt,
                timeout_secs,
                max_digits,
            } => Ok(IvrStep::Gather {
                prompt: prompt.clone(),
                timeout_secs: *timeout_secs,
                max_digits: *max_digits,
            }),

            OptionAction::Submenu { menu_id } => {
                let submenu = self.menu_of(tenant, menu_id).await?;
                let from = session.current_menu.clone();
                session.enter_menu(submenu.id.clone());
                self.audit_transition(session, &from, &submenu.id, "submenu entered")
                    .await;
                Ok(IvrStep::Menu {
                    menu_id: submenu.id,
                    greeting: submenu.greeting,
                })
            }

            OptionAction::Transfer { target } => {
                let signals = EscalationSignals {
                    sentiment: session.context.current_sentiment(),
                    transcript: &session.context.transcript,
                    started_at: session.started_at,
                };
                let (target, reason) = if self.policy.needs_escalation(&signals, Utc::now()) {
                    let target = self
                        .escalation_target(session, tenant, EscalationReason::UserRequestedTransfer)
                        .await;
                    (target, TransferReason::Escalation)
                } else {
                    (target.clone(), TransferReason::Direct)
                };

                session.transfer(target.clone(), reason.as_str())?;
                self.audit_transition(
                    session,
                    "active",
                    "transferred",
                    &format!("transfer to {}", target),
                )
                .await;
                info!(call_id = %session.call_id, target = %target, ?reason, "Call transferred");
                Ok(IvrStep::Transfer { target, reason })
            }

            OptionAction::Hangup { message } => {
                let closing = message.clone().unwrap_or_else(|| DEFAULT_GOODBYE.to_string());
                session.complete(closing.clone())?;
                self.audit_transition(session, "active", "completed", "caller hangup option")
                    .await;
                Ok(IvrStep::Hangup { message: closing })
            }
        }
    }

    /// Unmatched input: re-prompt until the menu's retry budget is spent,
    /// then escalate to a human.
    async fn handle_no_match(
        &self,
        session: &mut IvrSession,
        tenant: &Tenant,
        menu: &IvrMenu,
    ) -> Result<IvrStep> {
        session.retry_count += 1;
        debug!(
            call_id = %session.call_id,
            retries = session.retry_count,
            max = menu.max_retries,
            "No option matched"
        );

        if session.retry_count < menu.max_retries {
            return Ok(IvrStep::Speak {
                text: format!("{} {}", NO_MATCH_PROMPT, menu.greeting),
                reprompt: true,
            });
        }

        let target = self
            .escalation_target(session, tenant, EscalationReason::MaxRetriesReached)
            .await;
        session.transfer(target.clone(), TransferReason::MaxRetries.as_str())?;
        self.audit_transition(
            session,
            "active",
            "transferred",
            &format!("retries exhausted, escalated to {}", target),
        )
        .await;
        info!(call_id = %session.call_id, target = %target, "Retries exhausted, escalating");

        Ok(IvrStep::Transfer {
            target,
            reason: TransferReason::MaxRetries,
        })
    }

    /// Resolve where an escalated call lands and bump the call's escalation
    /// level. At the tenant ceiling (or on handoff failure) the overflow
    /// number is the answer.
    async fn escalation_target(
        &self,
        session: &IvrSession,
        tenant: &Tenant,
        reason: EscalationReason,
    ) -> PhoneNumber {
        let at_ceiling = match self.contexts.get(session.call_id).await {
            Ok(Some(mut context)) => {
                let at_ceiling = context.at_escalation_ceiling();
                context.escalate();
                if let Err(e) = self.contexts.put(context).await {
                    warn!(call_id = %session.call_id, error = %e, "Context update failed");
                }
                at_ceiling
            }
            Ok(None) => false,
            Err(e) => {
                warn!(call_id = %session.call_id, error = %e, "Context read failed");
                false
            }
        };

        let target = if at_ceiling {
            tenant.overflow_number.clone()
        } else {
            match self
                .handoff
                .escalate(session.call_id, tenant.id, reason, &session.context.transcript)
                .await
            {
                Ok(target) => target.target_number,
                Err(e) => {
                    warn!(call_id = %session.call_id, error = %e, "Handoff failed, using overflow target");
                    self.audit_degraded(session, "human_handoff", &e.to_string()).await;
                    tenant.overflow_number.clone()
                }
            }
        };

        let record = AuditRecord::new(
            session.call_id,
            tenant.id,
            AuditEventType::Escalated {
                reason: reason.as_str().to_string(),
                target: target.to_string(),
            },
        );
        if let Err(e) = self.audit.append(record).await {
            warn!(call_id = %session.call_id, error = %e, "Audit append failed");
        }

        target
    }

    /// Terminal sessions answer duplicate webhooks with the instruction they
    /// ended on.
    fn replay_terminal(&self, session: &IvrSession) -> IvrStep {
        if let Some(target) = session.transfer_target.clone() {
            let reason = match session.transfer_reason.as_deref() {
                Some("max_retries_reached") => TransferReason::MaxRetries,
                Some("escalation") => TransferReason::Escalation,
                _ => TransferReason::Direct,
            };
            return IvrStep::Transfer { target, reason };
        }
        IvrStep::Hangup {
            message: session
                .closing_message
                .clone()
                .unwrap_or_else(|| DEFAULT_GOODBYE.to_string()),
        }
    }

    async fn tenant_of(&self, session: &IvrSession) -> Result<Tenant> {
        self.tenants
            .get_tenant(session.tenant_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Unknown tenant {}", session.tenant_id)))
    }

    async fn menu_of(&self, tenant: &Tenant, menu_id: &str) -> Result<IvrMenu> {
        self.menus
            .get_menu(tenant.id, menu_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!(
                    "Menu '{}' is not configured for tenant {}",
                    menu_id, tenant.id
                ))
            })
    }

    async fn audit_transition(&self, session: &IvrSession, from: &str, to: &str, detail: &str) {
        let record = AuditRecord::new(
            session.call_id,
            session.tenant_id,
            AuditEventType::SessionTransition {
                from: from.to_string(),
                to: to.to_string(),
                detail: detail.to_string(),
            },
        );
        if let Err(e) = self.audit.append(record).await {
            warn!(call_id = %session.call_id, error = %e, "Audit append failed");
        }
    }

    async fn audit_degraded(&self, session: &IvrSession, collaborator: &str, message: &str) {
        let record = AuditRecord::new(
            session.call_id,
            session.tenant_id,
            AuditEventType::CollaboratorDegraded {
                collaborator: collaborator.to_string(),
                message: message.to_string(),
            },
        );
        if let Err(e) = self.audit.append(record).await {
            warn!(call_id = %session.call_id, error = %e, "Audit append failed");
        }
    }
}
