//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - Store implementations (in-memory, TTL-bounded)
//! - Collaborator adapters (tenant directory, CRM, transcriber, handoff)
//! - The caching department catalog
//! - The audit sink

pub mod audit;
pub mod catalog;
pub mod collaborators;
pub mod persistence;
