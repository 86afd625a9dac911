//! Application layer: the pipeline facade over the workflow coordinators.

pub mod pipeline;

pub use pipeline::Pipeline;
