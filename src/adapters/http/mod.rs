//! HTTP adapter for the remote pipeline backend.

pub mod client;
pub mod wire;

pub use client::{HttpPipelineBackend, USER_ID_HEADER};
