//! Audit sink implementations

pub mod logger;

pub use logger::InMemoryAuditSink;
