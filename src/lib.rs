//! Switchyard - multi-tenant call routing and IVR session engine
//!
//! This is a Domain-Driven Design (DDD) implementation of the routing core
//! of a shared-number telephony platform: inbound calls are attributed to a
//! tenant, classified by a deterministic heuristic analyzer, scored against
//! tenant-defined routing rules, and driven through menu-based IVR dialogs
//! until they are transferred, offered a callback, or terminated.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
