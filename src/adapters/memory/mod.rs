//! In-memory adapters.

pub mod state_repository;

pub use state_repository::InMemoryStateRepository;
