//! Question-to-answer pipeline.
//!
//! One fixed stage sequence, many independent executions: [`Pipeline`] is
//! immutable and shared across requests, while every run builds its own
//! [`PipelineState`].

mod orchestrator;
mod state;

pub use orchestrator::Pipeline;
pub use state::{Phase, PipelineState, Stage};
