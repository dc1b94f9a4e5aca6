//! Pipeline assembly and execution.
//!
//! The controller owns the links between stages and is the only code that
//! flips pause/resume state; stages expose their queues and state machines
//! but never reach into each other.

mod builder;
mod completion;
mod controller;
mod singleflight;


pub use builder::PipelineBuilder;
pub use completion::CompletionHandle;
pub use controller::{PipeLink, Pipeline, PipelineReport};
pub use singleflight::SingleFlight;
