//! Persistence implementations

pub mod memory;

pub use memory::{run_purge_loop, InMemoryContextStore, InMemoryMenuStore, InMemorySessionStore};
