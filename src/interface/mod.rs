//! Interface layer - External interfaces
//!
//! This layer handles:
//! - Telephony provider webhooks
//! - Audit trail read API
//! - Request/response formatting

pub mod api;
