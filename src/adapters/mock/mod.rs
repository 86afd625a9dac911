//! Scripted adapters for tests and offline use.

pub mod backend;

pub use backend::{status_error, MockBackend, MockCall, MockOp};
