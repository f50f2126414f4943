//! API interface implementations

pub mod router;
pub mod webhook;

pub use router::build_router;
pub use webhook::AppState;
