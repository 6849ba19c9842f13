// core/src/pipeline/mod.rs

//! A small async step-pipeline engine: named steps, `before`/`on`/`after`
//! handlers per step, early stop, and skip conditions. Used to express the
//! checkout as an ordered, observable sequence of steps.

pub mod context_data;
pub mod control;
pub mod definition;
pub mod execution;
pub mod hooks;
pub mod step;

pub use context_data::ContextData;
pub use control::{PipelineControl, PipelineResult};
pub use definition::{Handler, Pipeline};
pub use step::{SkipCondition, StepDef};
