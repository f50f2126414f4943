//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Aggregates: Consistency boundaries (call context, IVR session)
//! - Value Objects: Immutable objects without identity
//! - Domain Services: The analyzer, routing engine, and escalation policy
//! - Ports: Trait interfaces to external collaborators and stores

pub mod analysis;
pub mod audit;
pub mod call_context;
pub mod customer;
pub mod department;
pub mod escalation;
pub mod ivr;
pub mod routing;
pub mod shared;
pub mod tenant;

// Re-export commonly used types
pub use shared::{DomainError, Result};
